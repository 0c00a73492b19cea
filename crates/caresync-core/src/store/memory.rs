//! In-memory key-value store

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use super::KeyValueStore;
use crate::error::Result;

/// Process-local store, mainly for tests and ephemeral sessions.
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a raw value, bypassing `update`.
    pub async fn put_raw(&self, key: &str, value: Value) {
        self.entries.lock().await.insert(key.to_string(), value);
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn update<F>(&self, key: &str, apply: F) -> Result<Value>
    where
        F: FnOnce(Option<Value>) -> Result<Value>,
    {
        let mut entries = self.entries.lock().await;
        let next = apply(entries.get(key).cloned())?;
        entries.insert(key.to_string(), next.clone());
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    #[tokio::test(flavor = "multi_thread")]
    async fn update_then_get() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store
            .update("k", |current| {
                assert!(current.is_none());
                Ok(json!([1]))
            })
            .await
            .unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some(json!([1])));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_update_leaves_value() {
        let store = MemoryStore::new();
        store.put_raw("k", json!("keep")).await;

        let result = store
            .update("k", |_| Err(Error::InvalidInput("nope".into())))
            .await;

        assert!(result.is_err());
        assert_eq!(store.get("k").await.unwrap(), Some(json!("keep")));
    }
}
