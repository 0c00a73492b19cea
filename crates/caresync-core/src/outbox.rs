//! Caller-facing outbox.
//!
//! Wraps the queue and the sync coordinator with the contract UI code
//! wants: no call here returns an error. Storage failures are logged and
//! mapped to a neutral value so a broken disk never takes the screen down.

use crate::auth::TokenProvider;
use crate::config::SyncClientConfig;
use crate::models::{ClientId, NewMutation, QueuedMutation};
use crate::queue::OfflineQueue;
use crate::state::OutboxIndicator;
use crate::store::KeyValueStore;
use crate::sync::{SyncCoordinator, SyncReport, SyncTransport};

/// Result of [`Outbox::enqueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued(QueuedMutation),
    /// Storage refused the write; the mutation exists nowhere
    NotPersisted { reason: String },
}

impl EnqueueOutcome {
    pub const fn is_queued(&self) -> bool {
        matches!(self, Self::Queued(_))
    }
}

#[derive(Debug)]
pub struct Outbox<S, T, P> {
    coordinator: SyncCoordinator<S, T, P>,
}

impl<S, T, P> Outbox<S, T, P>
where
    S: KeyValueStore,
    T: SyncTransport,
    P: TokenProvider,
{
    /// Outbox under the default storage key.
    pub fn new(store: S, transport: T, tokens: P) -> Self {
        Self::from_queue(OfflineQueue::new(store), transport, tokens)
    }

    /// Outbox under the key from `config`.
    pub fn with_config(store: S, config: &SyncClientConfig, transport: T, tokens: P) -> Self {
        Self::from_queue(
            OfflineQueue::with_key(store, config.storage_key.clone()),
            transport,
            tokens,
        )
    }

    pub const fn from_queue(queue: OfflineQueue<S>, transport: T, tokens: P) -> Self {
        Self {
            coordinator: SyncCoordinator::new(queue, transport, tokens),
        }
    }

    pub const fn queue(&self) -> &OfflineQueue<S> {
        self.coordinator.queue()
    }

    pub const fn coordinator(&self) -> &SyncCoordinator<S, T, P> {
        &self.coordinator
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.coordinator.bearer_token()
    }

    pub async fn enqueue(&self, mutation: NewMutation) -> EnqueueOutcome {
        match self.queue().enqueue(mutation).await {
            Ok(queued) => EnqueueOutcome::Queued(queued),
            Err(error) => {
                tracing::warn!(error = %error, "Failed to persist offline mutation");
                EnqueueOutcome::NotPersisted {
                    reason: error.to_string(),
                }
            }
        }
    }

    /// Queue snapshot; empty if storage cannot be read.
    pub async fn list(&self) -> Vec<QueuedMutation> {
        self.queue().list().await.unwrap_or_else(|error| {
            tracing::warn!(error = %error, "Failed to read offline queue");
            Vec::new()
        })
    }

    /// Queue length; zero if storage cannot be read.
    pub async fn count(&self) -> usize {
        self.queue().count().await.unwrap_or_else(|error| {
            tracing::warn!(error = %error, "Failed to count offline queue");
            0
        })
    }

    /// Returns `false` if the removal could not be persisted.
    pub async fn remove_by_client_ids(&self, ids: &[ClientId]) -> bool {
        match self.queue().remove_by_client_ids(ids).await {
            Ok(_) => true,
            Err(error) => {
                tracing::warn!(error = %error, "Failed to remove offline mutations");
                false
            }
        }
    }

    pub async fn sync(&self) -> SyncReport {
        self.coordinator.sync().await
    }

    pub async fn indicator(&self, online: bool) -> OutboxIndicator {
        OutboxIndicator::new(online, self.count().await, self.coordinator.is_syncing())
    }
}
