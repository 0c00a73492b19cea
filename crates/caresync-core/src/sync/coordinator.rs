use std::sync::atomic::{AtomicBool, Ordering};

use super::transport::SyncTransport;
use super::{plan_reconciliation, SyncOutcome, SyncReport};
use crate::auth::TokenProvider;
use crate::models::{QueuedMutation, SyncBatchRequest};
use crate::queue::OfflineQueue;
use crate::store::KeyValueStore;
use crate::util::normalize_text_option;

/// Drives queue snapshots through a [`SyncTransport`] and reconciles the
/// results back into the queue.
///
/// At most one sync runs per coordinator; a second caller gets
/// [`SyncOutcome::AlreadyRunning`] instead of a duplicate submission.
#[derive(Debug)]
pub struct SyncCoordinator<S, T, P> {
    queue: OfflineQueue<S>,
    transport: T,
    tokens: P,
    in_flight: AtomicBool,
}

impl<S, T, P> SyncCoordinator<S, T, P>
where
    S: KeyValueStore,
    T: SyncTransport,
    P: TokenProvider,
{
    pub const fn new(queue: OfflineQueue<S>, transport: T, tokens: P) -> Self {
        Self {
            queue,
            transport,
            tokens,
            in_flight: AtomicBool::new(false),
        }
    }

    pub const fn queue(&self) -> &OfflineQueue<S> {
        &self.queue
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Current bearer token, blank values treated as absent.
    pub fn bearer_token(&self) -> Option<String> {
        normalize_text_option(self.tokens.bearer_token())
    }

    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Submit the queue and remove every item the server settled.
    ///
    /// Never fails: transport and storage problems are logged and reported
    /// through [`SyncReport::outcome`], and the queue keeps its items.
    pub async fn sync(&self) -> SyncReport {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::info!("Sync already in progress; skipping");
            return SyncReport::already_running();
        };

        self.sync_once().await
    }

    async fn sync_once(&self) -> SyncReport {
        let items = match self.queue.list().await {
            Ok(items) => items,
            Err(error) => {
                tracing::warn!(error = %error, "Could not read offline queue for sync");
                return SyncReport::postponed(format!("offline queue unavailable: {error}"));
            }
        };

        if items.is_empty() {
            tracing::debug!("Offline queue is empty; nothing to sync");
            return SyncReport::empty();
        }

        let submitted = items.len();
        let token = self.bearer_token();
        if token.is_none() {
            tracing::debug!("No bearer token available; syncing without Authorization");
        }

        let request = SyncBatchRequest { items };
        let response = match self.transport.post_batch(&request, token.as_deref()).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(submitted, error = %error, "Sync postponed; queue left intact");
                return SyncReport::postponed(error.to_string());
            }
        };

        let plan = plan_reconciliation(&response.results);
        let settled = request
            .items
            .into_iter()
            .filter(|item| plan.remove.contains(&item.client_id))
            .collect::<Vec<QueuedMutation>>();

        let removed = match self.queue.remove_submitted(&settled).await {
            Ok(removed) => removed,
            Err(error) => {
                tracing::warn!(
                    settled = settled.len(),
                    error = %error,
                    "Could not remove synced items; they will be resubmitted"
                );
                Vec::new()
            }
        };

        // Settled items that were edited mid-sync, or could not be removed,
        // are still queued.
        let mut retained = plan.retain;
        for item in &settled {
            if !removed.contains(&item.client_id) && !retained.contains(&item.client_id) {
                retained.push(item.client_id.clone());
            }
        }

        for result in response.results.iter().filter(|result| !result.status.is_resolved()) {
            tracing::warn!(
                client_id = ?result.client_id,
                status = result.status.as_str(),
                reason = result.reason.as_deref().unwrap_or_default(),
                "Server kept item queued"
            );
        }

        tracing::info!(
            submitted,
            removed = removed.len(),
            retained = retained.len(),
            "Synced offline queue"
        );

        SyncReport {
            outcome: SyncOutcome::Completed,
            results: response.results,
            removed,
            retained,
        }
    }
}

/// Clears the in-flight flag on drop, including when a sync future is
/// cancelled mid-await.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use crate::models::{
        ClientId, NewMutation, SyncBatchResponse, SyncResult, SyncStatus,
    };
    use crate::store::testing::UnavailableStore;
    use crate::store::MemoryStore;
    use crate::sync::{MockReply, MockTransport, TransportResult};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tokio::sync::Notify;

    type TestCoordinator<T = MockTransport> = SyncCoordinator<MemoryStore, T, StaticToken>;

    fn coordinator(transport: MockTransport) -> TestCoordinator {
        SyncCoordinator::new(
            OfflineQueue::new(MemoryStore::new()),
            transport,
            StaticToken::anonymous(),
        )
    }

    async fn enqueue<S: KeyValueStore>(queue: &OfflineQueue<S>, value: Value) -> ClientId {
        queue
            .enqueue(NewMutation::from_value(value).unwrap())
            .await
            .unwrap()
            .client_id
    }

    fn result(id: &ClientId, status: SyncStatus) -> SyncResult {
        SyncResult {
            client_id: Some(id.clone()),
            status,
            server_id: None,
            reason: None,
        }
    }

    async fn queued_ids<S: KeyValueStore>(queue: &OfflineQueue<S>) -> Vec<ClientId> {
        queue
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.client_id)
            .collect()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_queue_makes_no_request() {
        let transport = MockTransport::new();
        let sync = coordinator(transport.clone());

        let report = sync.sync().await;

        assert_eq!(report.outcome, SyncOutcome::Empty);
        assert!(report.results.is_empty());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn error_items_stay_queued() {
        let transport = MockTransport::new();
        let sync = coordinator(transport.clone());
        let a = enqueue(sync.queue(), json!({"n": 1})).await;
        let b = enqueue(sync.queue(), json!({"n": 2})).await;
        let c = enqueue(sync.queue(), json!({"n": 3})).await;
        transport.push_reply(MockReply::Results(vec![
            result(&a, SyncStatus::Created),
            result(&b, SyncStatus::Duplicate),
            SyncResult {
                reason: Some("Invalid date format".into()),
                ..result(&c, SyncStatus::Error)
            },
        ]));

        let report = sync.sync().await;

        assert_eq!(report.outcome, SyncOutcome::Completed);
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.removed, vec![a, b]);
        assert_eq!(report.retained, vec![c.clone()]);
        assert_eq!(queued_ids(sync.queue()).await, vec![c]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn network_failure_preserves_queue() {
        let transport = MockTransport::always(MockReply::Unreachable("connection refused".into()));
        let sync = coordinator(transport.clone());
        for n in 0..5 {
            enqueue(sync.queue(), json!({ "n": n })).await;
        }
        let before = sync.queue().list().await.unwrap();

        let report = sync.sync().await;

        assert!(report.is_postponed());
        assert!(report.results.is_empty());
        assert_eq!(sync.queue().list().await.unwrap(), before);
        assert_eq!(transport.requests()[0].items, before);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rejected_batch_preserves_queue() {
        let sync = coordinator(MockTransport::always(MockReply::Status(500)));
        enqueue(sync.queue(), json!({"n": 1})).await;

        let report = sync.sync().await;

        assert!(report.is_postponed());
        assert_eq!(sync.queue().count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn skipped_newer_server_is_dropped_locally() {
        let transport = MockTransport::new();
        let sync = coordinator(transport.clone());
        let a = enqueue(sync.queue(), json!({"symptoms": "stale"})).await;
        transport.push_reply(MockReply::Results(vec![result(
            &a,
            SyncStatus::SkippedNewerServer,
        )]));

        let report = sync.sync().await;

        assert_eq!(report.removed, vec![a]);
        assert_eq!(sync.queue().count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_status_is_retained() {
        let transport = MockTransport::new();
        let sync = coordinator(transport.clone());
        let a = enqueue(sync.queue(), json!({})).await;
        let response: SyncBatchResponse = serde_json::from_value(json!({
            "results": [{"clientId": a.as_str(), "status": "deferred"}]
        }))
        .unwrap();
        transport.push_reply(MockReply::Results(response.results));

        let report = sync.sync().await;

        assert_eq!(report.retained, vec![a]);
        assert_eq!(sync.queue().count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn edited_then_synced_sends_merged_item() {
        let transport = MockTransport::new();
        let sync = coordinator(transport.clone());
        for value in [
            json!({"clientId": "c1", "doctorId": "d7", "symptoms": "fever"}),
            json!({"clientId": "c1", "date": "2024-05-02T10:00:00Z"}),
            json!({"clientId": "c1", "symptoms": "fever, cough"}),
        ] {
            enqueue(sync.queue(), value).await;
        }
        let c1: ClientId = "c1".parse().unwrap();
        transport.push_reply(MockReply::Results(vec![SyncResult {
            server_id: Some(42),
            ..result(&c1, SyncStatus::Created)
        }]));

        let report = sync.sync().await;

        let sent = &transport.requests()[0].items;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].field_str("doctorId"), Some("d7"));
        assert_eq!(sent[0].field_str("date"), Some("2024-05-02T10:00:00Z"));
        assert_eq!(sent[0].field_str("symptoms"), Some("fever, cough"));
        assert_eq!(report.results[0].server_id, Some(42));
        assert_eq!(sync.queue().count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn merged_booking_is_cleared_by_updated_result() {
        let transport = MockTransport::new();
        let sync = coordinator(transport.clone());
        let c1: ClientId = "c1".parse().unwrap();

        enqueue(
            sync.queue(),
            json!({
                "clientId": "c1",
                "doctorId": "d7",
                "date": "2024-05-01T10:00:00Z",
                "symptoms": "fever"
            }),
        )
        .await;
        assert_eq!(sync.queue().count().await.unwrap(), 1);

        enqueue(sync.queue(), json!({"clientId": "c1", "symptoms": "fever, cough"})).await;
        let items = sync.queue().list().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].field_str("symptoms"), Some("fever, cough"));
        assert_eq!(items[0].field_str("date"), Some("2024-05-01T10:00:00Z"));

        transport.push_reply(MockReply::Results(vec![result(&c1, SyncStatus::Updated)]));
        let report = sync.sync().await;

        assert_eq!(report.outcome, SyncOutcome::Completed);
        assert_eq!(report.removed, vec![c1]);
        assert!(report.retained.is_empty());
        assert_eq!(sync.queue().count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ids_unknown_to_the_queue_are_harmless() {
        let transport = MockTransport::new();
        let sync = coordinator(transport.clone());
        let a = enqueue(sync.queue(), json!({})).await;
        transport.push_reply(MockReply::Results(vec![result(
            &"ghost".parse().unwrap(),
            SyncStatus::Created,
        )]));

        let report = sync.sync().await;

        assert_eq!(report.outcome, SyncOutcome::Completed);
        assert!(report.removed.is_empty());
        assert_eq!(queued_ids(sync.queue()).await, vec![a]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn token_is_attached_when_present() {
        let transport = MockTransport::new();
        let sync = SyncCoordinator::new(
            OfflineQueue::new(MemoryStore::new()),
            transport.clone(),
            StaticToken::new("jwt"),
        );
        enqueue(sync.queue(), json!({})).await;

        sync.sync().await;

        assert_eq!(transport.requests()[0].bearer_token.as_deref(), Some("jwt"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreadable_queue_postpones_without_request() {
        let transport = MockTransport::new();
        let sync = SyncCoordinator::new(
            OfflineQueue::new(UnavailableStore),
            transport.clone(),
            StaticToken::anonymous(),
        );

        let report = sync.sync().await;

        assert!(report.is_postponed());
        assert_eq!(transport.call_count(), 0);
    }

    /// Transport that parks until released, to hold a sync in flight.
    #[derive(Clone, Default)]
    struct GatedTransport {
        entered: Arc<Notify>,
        release: Arc<Notify>,
        inner: MockTransport,
    }

    impl SyncTransport for GatedTransport {
        async fn post_batch(
            &self,
            request: &SyncBatchRequest,
            bearer_token: Option<&str>,
        ) -> TransportResult<SyncBatchResponse> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.post_batch(request, bearer_token).await
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_sync_is_rejected_while_in_flight() {
        let transport = GatedTransport::default();
        let sync: TestCoordinator<GatedTransport> = SyncCoordinator::new(
            OfflineQueue::new(MemoryStore::new()),
            transport.clone(),
            StaticToken::anonymous(),
        );
        enqueue(sync.queue(), json!({})).await;

        let second = async {
            transport.entered.notified().await;
            assert!(sync.is_syncing());
            let report = sync.sync().await;
            transport.release.notify_one();
            report
        };
        let (first, second) = tokio::join!(sync.sync(), second);

        assert_eq!(first.outcome, SyncOutcome::Completed);
        assert_eq!(second.outcome, SyncOutcome::AlreadyRunning);
        assert_eq!(transport.inner.call_count(), 1);
        assert!(!sync.is_syncing());
        assert_eq!(sync.queue().count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn edit_during_sync_survives_reconciliation() {
        let transport = GatedTransport::default();
        let sync: TestCoordinator<GatedTransport> = SyncCoordinator::new(
            OfflineQueue::new(MemoryStore::new()),
            transport.clone(),
            StaticToken::anonymous(),
        );
        enqueue(sync.queue(), json!({"clientId": "c1", "symptoms": "fever"})).await;

        let edit = async {
            transport.entered.notified().await;
            enqueue(sync.queue(), json!({"clientId": "c1", "symptoms": "fever, rash"})).await;
            transport.release.notify_one();
        };
        let (report, ()) = tokio::join!(sync.sync(), edit);

        assert!(report.removed.is_empty());
        assert_eq!(report.retained, vec!["c1".parse::<ClientId>().unwrap()]);
        let items = sync.queue().list().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].field_str("symptoms"), Some("fever, rash"));
    }
}
