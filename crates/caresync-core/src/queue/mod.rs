//! Local durable outbox of mutations awaiting server confirmation.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{ClientId, NewMutation, QueuedMutation};
use crate::store::KeyValueStore;
use crate::util::utc_now_millis;

/// Storage key the outbox lives under.
pub const DEFAULT_STORAGE_KEY: &str = "offline_consultations_v2";

/// Ordered outbox of [`QueuedMutation`]s stored under a single key.
///
/// Every mutating call is one `update` on the store, so interleaved callers
/// never leave two entries with the same client id.
#[derive(Debug, Clone)]
pub struct OfflineQueue<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> OfflineQueue<S> {
    /// Queue under [`DEFAULT_STORAGE_KEY`].
    pub fn new(store: S) -> Self {
        Self::with_key(store, DEFAULT_STORAGE_KEY)
    }

    /// Queue under a custom storage key.
    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    /// Add or merge a mutation, stamped with the current time.
    pub async fn enqueue(&self, mutation: NewMutation) -> Result<QueuedMutation> {
        self.enqueue_at(mutation, utc_now_millis()).await
    }

    /// Add or merge a mutation, stamped with `at`.
    ///
    /// Without a client id a new one is generated and the entry is appended.
    /// With one that is already queued, the payload is shallow-merged over
    /// the existing entry in place.
    pub async fn enqueue_at(
        &self,
        mutation: NewMutation,
        at: DateTime<Utc>,
    ) -> Result<QueuedMutation> {
        let NewMutation { client_id, payload } = mutation;
        let client_id = client_id.unwrap_or_else(ClientId::generate);
        let key = self.key.clone();
        let mut stored = None;

        self.store
            .update(&self.key, |current| {
                let mut items = decode_items(&key, current)?;
                let entry = match items.iter().position(|item| item.client_id == client_id) {
                    Some(index) => {
                        items[index].merge(payload, at);
                        items[index].clone()
                    }
                    None => {
                        let entry = QueuedMutation::new(client_id.clone(), payload, at);
                        items.push(entry.clone());
                        entry
                    }
                };
                stored = Some(entry);
                encode_items(&items)
            })
            .await?;

        let entry = stored.ok_or_else(|| Error::Database("enqueue did not run".into()))?;
        tracing::debug!(client_id = %entry.client_id, "Queued offline mutation");
        Ok(entry)
    }

    /// Snapshot of the queue, read fresh from storage.
    pub async fn list(&self) -> Result<Vec<QueuedMutation>> {
        let current = self.store.get(&self.key).await?;
        decode_items(&self.key, current)
    }

    /// Number of queued mutations.
    pub async fn count(&self) -> Result<usize> {
        Ok(self.list().await?.len())
    }

    /// Drop every entry whose client id is in `ids`.
    ///
    /// Ids that are not queued are ignored. Returns how many entries went.
    pub async fn remove_by_client_ids(&self, ids: &[ClientId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let wanted = ids.iter().collect::<HashSet<_>>();
        let removed = self.retain(|item| !wanted.contains(&item.client_id)).await?;
        Ok(removed.len())
    }

    /// Drop entries that were part of a submitted snapshot.
    ///
    /// An entry is only removed if it is still exactly what was submitted, so
    /// an edit made while a sync was in flight stays queued for the next
    /// attempt. Returns the ids that were removed, in queue order.
    pub async fn remove_submitted(&self, submitted: &[QueuedMutation]) -> Result<Vec<ClientId>> {
        if submitted.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = submitted
            .iter()
            .map(|item| (&item.client_id, item))
            .collect::<HashMap<_, _>>();

        self.retain(|item| {
            snapshot
                .get(&item.client_id)
                .map_or(true, |sent| *sent != item)
        })
        .await
    }

    async fn retain<F>(&self, keep: F) -> Result<Vec<ClientId>>
    where
        F: Fn(&QueuedMutation) -> bool,
    {
        let key = self.key.clone();
        let mut removed = Vec::new();

        self.store
            .update(&self.key, |current| {
                let items = decode_items(&key, current)?;
                let (kept, dropped): (Vec<_>, Vec<_>) =
                    items.into_iter().partition(|item| keep(item));
                removed = dropped.into_iter().map(|item| item.client_id).collect();
                encode_items(&kept)
            })
            .await?;

        if !removed.is_empty() {
            tracing::debug!(removed = removed.len(), "Removed mutations from offline queue");
        }
        Ok(removed)
    }
}

/// Decode the stored list.
///
/// A missing or non-array value reads as an empty queue. An array whose
/// entries do not decode is reported as corrupt rather than dropped, so the
/// caller never overwrites data it could not read.
fn decode_items(key: &str, value: Option<Value>) -> Result<Vec<QueuedMutation>> {
    match value {
        Some(value @ Value::Array(_)) => {
            serde_json::from_value(value).map_err(|error| Error::CorruptQueue {
                key: key.to_string(),
                reason: error.to_string(),
            })
        }
        Some(other) => {
            tracing::warn!(
                key,
                kind = json_kind(&other),
                "Queue value is not a list; treating as empty"
            );
            Ok(Vec::new())
        }
        None => Ok(Vec::new()),
    }
}

fn encode_items(items: &[QueuedMutation]) -> Result<Value> {
    Ok(serde_json::to_value(items)?)
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
