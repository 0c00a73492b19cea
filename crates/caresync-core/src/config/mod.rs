//! Client configuration for the booking and sync endpoints.
//!
//! Values are resolved in order: explicit value, environment, built-in
//! default. Only public endpoint settings live here; bearer credentials come
//! from a [`crate::auth::TokenProvider`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::queue::DEFAULT_STORAGE_KEY;
use crate::util::{is_http_url, normalize_text_option};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

pub const API_BASE_ENV: &str = "CARESYNC_API_BASE";
pub const HTTP_TIMEOUT_ENV: &str = "CARESYNC_HTTP_TIMEOUT_SECS";
pub const STORAGE_KEY_ENV: &str = "CARESYNC_STORAGE_KEY";

pub const SYNC_PATH: &str = "/api/sync/consultations";
pub const CONSULTATIONS_PATH: &str = "/api/consultations";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncClientConfig {
    /// Base URL without a trailing slash
    pub api_base_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Key the outbox is stored under
    pub storage_key: String,
}

impl Default for SyncClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl SyncClientConfig {
    /// Config for a specific base URL with default timeout and key.
    pub fn new(api_base_url: impl Into<String>) -> Result<Self, String> {
        Ok(Self {
            api_base_url: normalize_api_base_url(api_base_url.into())?,
            ..Self::default()
        })
    }

    /// Resolve from `explicit`, then the process environment, then defaults.
    pub fn resolve(explicit_api_base_url: Option<String>) -> Result<Self, String> {
        Self::resolve_with(explicit_api_base_url, |name| std::env::var(name).ok())
    }

    /// Same as [`Self::resolve`] with a custom environment lookup.
    pub fn resolve_with<F>(explicit_api_base_url: Option<String>, env: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = normalize_text_option(explicit_api_base_url)
            .or_else(|| normalize_text_option(env(API_BASE_ENV)))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let request_timeout_secs = match normalize_text_option(env(HTTP_TIMEOUT_ENV)) {
            Some(raw) => parse_timeout_secs(&raw)?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let storage_key = normalize_text_option(env(STORAGE_KEY_ENV))
            .unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string());

        Ok(Self {
            api_base_url: normalize_api_base_url(api_base_url)?,
            request_timeout_secs,
            storage_key,
        })
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `<base>/api/sync/consultations`
    pub fn sync_endpoint(&self) -> String {
        format!("{}{SYNC_PATH}", self.api_base_url)
    }

    /// `<base>/api/consultations`
    pub fn consultations_endpoint(&self) -> String {
        format!("{}{CONSULTATIONS_PATH}", self.api_base_url)
    }
}

/// Trim, require an http(s) scheme, and drop trailing slashes.
pub fn normalize_api_base_url(raw: String) -> Result<String, String> {
    let value =
        normalize_text_option(Some(raw)).ok_or_else(|| "API base URL must not be empty".to_string())?;
    if is_http_url(&value) {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(format!(
            "API base URL '{value}' must include http:// or https://"
        ))
    }
}

fn parse_timeout_secs(raw: &str) -> Result<u64, String> {
    match raw.parse::<u64>() {
        Ok(0) | Err(_) => Err(format!(
            "{HTTP_TIMEOUT_ENV} must be a positive number of seconds, got '{raw}'"
        )),
        Ok(secs) => Ok(secs),
    }
}
