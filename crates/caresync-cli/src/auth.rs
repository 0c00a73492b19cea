//! Bearer token storage in the OS keychain, one entry per profile.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use caresync_core::auth::TokenProvider;
use caresync_core::util::normalize_text_option;

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "caresync-cli";

pub type TokenResult<T> = Result<T, String>;

#[derive(Clone, Debug)]
pub struct TokenStore {
    username: String,
}

impl TokenStore {
    pub fn new(profile_name: &str) -> Self {
        Self {
            username: format!("api_token:{profile_name}"),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> TokenResult<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username).map_err(|error| error.to_string())
    }

    #[cfg(not(test))]
    pub fn load(&self) -> TokenResult<Option<String>> {
        match self.entry()?.get_password() {
            Ok(raw) => Ok(normalize_text_option(Some(raw))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(error.to_string()),
        }
    }

    #[cfg(test)]
    pub fn load(&self) -> TokenResult<Option<String>> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| error.to_string())?;
        Ok(normalize_text_option(guard.get(&self.username).cloned()))
    }

    #[cfg(not(test))]
    pub fn save(&self, token: &str) -> TokenResult<()> {
        self.entry()?
            .set_password(token)
            .map_err(|error| error.to_string())
    }

    #[cfg(test)]
    pub fn save(&self, token: &str) -> TokenResult<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| error.to_string())?;
        guard.insert(self.username.clone(), token.to_string());
        Ok(())
    }

    #[cfg(not(test))]
    pub fn clear(&self) -> TokenResult<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(error.to_string()),
        }
    }

    #[cfg(test)]
    pub fn clear(&self) -> TokenResult<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| error.to_string())?;
        guard.remove(&self.username);
        Ok(())
    }
}

/// Reads the profile's token from the keychain on every request.
///
/// Keychain errors are logged and treated as "no token" so a locked
/// keychain degrades to unauthenticated requests instead of failing them.
#[derive(Clone, Debug)]
pub struct KeychainToken {
    store: TokenStore,
}

impl KeychainToken {
    pub fn for_profile(profile_name: &str) -> Self {
        Self {
            store: TokenStore::new(profile_name),
        }
    }
}

impl TokenProvider for KeychainToken {
    fn bearer_token(&self) -> Option<String> {
        self.store.load().unwrap_or_else(|error| {
            tracing::warn!(error = %error, "Failed to read API token from keychain");
            None
        })
    }
}
