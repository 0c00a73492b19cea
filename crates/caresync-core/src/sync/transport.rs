//! Transport layer abstraction for batch sync.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use crate::models::{
    QueuedMutation, SyncBatchRequest, SyncBatchResponse, SyncResult, SyncStatus,
};

/// Failures at the network boundary.
///
/// Every variant means the same thing to the coordinator: the batch did not
/// go through and the queue stays as it is.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid sync configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Sync HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Sync API error: {message}")]
    Rejected { status: u16, message: String },
    #[error("Invalid sync response payload: {0}")]
    InvalidPayload(String),
    #[error("Sync endpoint unreachable: {0}")]
    Unreachable(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Submits a batch of queued mutations to the server.
///
/// Implementations map a non-2xx reply to [`TransportError::Rejected`] and
/// return the decoded `results` otherwise.
#[allow(async_fn_in_trait)]
pub trait SyncTransport {
    async fn post_batch(
        &self,
        request: &SyncBatchRequest,
        bearer_token: Option<&str>,
    ) -> TransportResult<SyncBatchResponse>;
}

/// Scripted reply for [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Answer `created` for every submitted item
    AcceptAll,
    /// Answer with exactly these results
    Results(Vec<SyncResult>),
    /// Non-2xx response
    Status(u16),
    /// Connection-level failure (timeout, DNS, offline)
    Unreachable(String),
}

/// A request seen by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub items: Vec<QueuedMutation>,
    pub bearer_token: Option<String>,
}

#[derive(Debug, Default)]
struct MockState {
    replies: VecDeque<MockReply>,
    fallback: Option<MockReply>,
    requests: Vec<RecordedRequest>,
}

/// A mock transport for testing.
///
/// Queued replies are used first, in order; after that the fallback reply
/// (default [`MockReply::AcceptAll`]) answers every call. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Creates a mock that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock that always answers with `reply`.
    pub fn always(reply: MockReply) -> Self {
        let transport = Self::new();
        transport.lock().fallback = Some(reply);
        transport
    }

    /// Queue a one-shot reply.
    pub fn push_reply(&self, reply: MockReply) {
        self.lock().replies.push_back(reply);
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SyncTransport for MockTransport {
    async fn post_batch(
        &self,
        request: &SyncBatchRequest,
        bearer_token: Option<&str>,
    ) -> TransportResult<SyncBatchResponse> {
        let reply = {
            let mut state = self.lock();
            state.requests.push(RecordedRequest {
                items: request.items.clone(),
                bearer_token: bearer_token.map(ToString::to_string),
            });
            state
                .replies
                .pop_front()
                .or_else(|| state.fallback.clone())
                .unwrap_or(MockReply::AcceptAll)
        };

        match reply {
            MockReply::AcceptAll => Ok(SyncBatchResponse {
                results: request
                    .items
                    .iter()
                    .map(|item| SyncResult {
                        client_id: Some(item.client_id.clone()),
                        status: SyncStatus::Created,
                        server_id: None,
                        reason: None,
                    })
                    .collect(),
            }),
            MockReply::Results(results) => Ok(SyncBatchResponse { results }),
            MockReply::Status(status) => Err(TransportError::Rejected {
                status,
                message: format!("HTTP {status}"),
            }),
            MockReply::Unreachable(message) => Err(TransportError::Unreachable(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClientId;

    fn request(ids: &[&str]) -> SyncBatchRequest {
        SyncBatchRequest {
            items: ids
                .iter()
                .map(|id| QueuedMutation {
                    client_id: id.parse::<ClientId>().unwrap(),
                    updated_at: "2024-05-01T10:00:00Z".parse().unwrap(),
                    payload: serde_json::Map::new(),
                })
                .collect(),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn mock_accepts_all_by_default() {
        let transport = MockTransport::new();
        let response = transport
            .post_batch(&request(&["a", "b"]), Some("tok"))
            .await
            .unwrap();

        assert_eq!(response.results.len(), 2);
        assert!(response
            .results
            .iter()
            .all(|result| result.status == SyncStatus::Created));
        assert_eq!(transport.requests()[0].bearer_token.as_deref(), Some("tok"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn mock_uses_queued_replies_before_fallback() {
        let transport = MockTransport::always(MockReply::Status(503));
        transport.push_reply(MockReply::Unreachable("dns".into()));

        let first = transport.post_batch(&request(&["a"]), None).await;
        let second = transport.post_batch(&request(&["a"]), None).await;

        assert!(matches!(first, Err(TransportError::Unreachable(_))));
        assert!(matches!(
            second,
            Err(TransportError::Rejected { status: 503, .. })
        ));
        assert_eq!(transport.call_count(), 2);
    }
}
