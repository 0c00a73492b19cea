//! Bearer credentials for the booking and sync endpoints.
//!
//! The endpoints accept unauthenticated calls, so every provider may return
//! `None`; requests then go out without an `Authorization` header.

use std::fmt;
use std::sync::Arc;

use crate::util::normalize_text_option;

/// Source of the bearer token attached to outgoing requests.
///
/// Called once per request so rotated credentials are picked up.
pub trait TokenProvider {
    fn bearer_token(&self) -> Option<String>;
}

impl<T: TokenProvider + ?Sized> TokenProvider for &T {
    fn bearer_token(&self) -> Option<String> {
        (**self).bearer_token()
    }
}

impl<T: TokenProvider + ?Sized> TokenProvider for Arc<T> {
    fn bearer_token(&self) -> Option<String> {
        (**self).bearer_token()
    }
}

/// Fixed token, or none at all.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StaticToken {
    token: Option<String>,
}

impl StaticToken {
    /// A blank token is treated as no token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: normalize_text_option(Some(token.into())),
        }
    }

    pub const fn anonymous() -> Self {
        Self { token: None }
    }

    pub const fn is_anonymous(&self) -> bool {
        self.token.is_none()
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("StaticToken")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
