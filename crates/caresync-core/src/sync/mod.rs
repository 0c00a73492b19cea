//! Batch sync of the offline queue.
//!
//! One sync posts the full queue snapshot, reads back a result per item,
//! and removes the items the server settled. Anything that keeps the
//! response from arriving leaves the queue untouched.

mod coordinator;
mod http;
mod transport;

pub use coordinator::SyncCoordinator;
pub use http::HttpSyncTransport;
pub(crate) use http::{build_client, read_success_body, with_bearer};
pub use transport::{
    MockReply, MockTransport, RecordedRequest, SyncTransport, TransportError, TransportResult,
};

use serde::Serialize;

use crate::models::{ClientId, SyncResult};

/// How a sync attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Nothing was queued; no request was made
    Empty,
    /// The server answered and reconciliation ran
    Completed,
    /// The batch did not go through; retry later
    Postponed { reason: String },
    /// Another sync on this coordinator was still in flight
    AlreadyRunning,
}

/// Result of one [`SyncCoordinator::sync`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    /// Per-item results exactly as the server returned them
    pub results: Vec<SyncResult>,
    /// Client ids this sync removed from the queue
    pub removed: Vec<ClientId>,
    /// Client ids kept queued for the next attempt
    pub retained: Vec<ClientId>,
}

impl SyncReport {
    fn without_results(outcome: SyncOutcome) -> Self {
        Self {
            outcome,
            results: Vec::new(),
            removed: Vec::new(),
            retained: Vec::new(),
        }
    }

    pub(crate) fn empty() -> Self {
        Self::without_results(SyncOutcome::Empty)
    }

    pub(crate) fn postponed(reason: impl Into<String>) -> Self {
        Self::without_results(SyncOutcome::Postponed {
            reason: reason.into(),
        })
    }

    pub(crate) fn already_running() -> Self {
        Self::without_results(SyncOutcome::AlreadyRunning)
    }

    pub const fn is_postponed(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Postponed { .. })
    }
}

/// Split server results into ids to drop and ids to keep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub remove: Vec<ClientId>,
    pub retain: Vec<ClientId>,
}

/// Apply the status taxonomy to a result list.
///
/// `created`, `updated`, `duplicate` and `skipped_newer_server` are settled.
/// `error` and unrecognized statuses are kept. Results without a client id
/// are ignored. When one id shows up with both kinds of status, keeping it
/// wins.
pub fn plan_reconciliation(results: &[SyncResult]) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();

    for result in results {
        let Some(client_id) = &result.client_id else {
            tracing::debug!(status = result.status.as_str(), "Ignoring sync result without clientId");
            continue;
        };

        if result.status.is_resolved() {
            if !plan.remove.contains(client_id) && !plan.retain.contains(client_id) {
                plan.remove.push(client_id.clone());
            }
        } else {
            plan.remove.retain(|id| id != client_id);
            if !plan.retain.contains(client_id) {
                plan.retain.push(client_id.clone());
            }
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SyncStatus;
    use pretty_assertions::assert_eq;

    fn result(id: &str, status: SyncStatus) -> SyncResult {
        SyncResult {
            client_id: Some(id.parse().unwrap()),
            status,
            server_id: None,
            reason: None,
        }
    }

    fn ids(raw: &[&str]) -> Vec<ClientId> {
        raw.iter().map(|id| id.parse().unwrap()).collect()
    }

    #[test]
    fn settled_statuses_are_removed_and_others_retained() {
        let plan = plan_reconciliation(&[
            result("a", SyncStatus::Created),
            result("b", SyncStatus::Updated),
            result("c", SyncStatus::Duplicate),
            result("d", SyncStatus::SkippedNewerServer),
            result("e", SyncStatus::Error),
            result("f", SyncStatus::Unknown),
        ]);

        assert_eq!(plan.remove, ids(&["a", "b", "c", "d"]));
        assert_eq!(plan.retain, ids(&["e", "f"]));
    }

    #[test]
    fn conflicting_results_keep_the_item() {
        let plan = plan_reconciliation(&[
            result("a", SyncStatus::Created),
            result("a", SyncStatus::Error),
            result("a", SyncStatus::Duplicate),
        ]);

        assert!(plan.remove.is_empty());
        assert_eq!(plan.retain, ids(&["a"]));
    }

    #[test]
    fn results_without_client_id_are_ignored() {
        let plan = plan_reconciliation(&[SyncResult {
            client_id: None,
            status: SyncStatus::Created,
            server_id: Some(3),
            reason: None,
        }]);
        assert_eq!(plan, ReconcilePlan::default());
    }

    #[test]
    fn report_serializes_outcome_kind() {
        let value = serde_json::to_value(SyncReport::postponed("offline")).unwrap();
        assert_eq!(value["outcome"]["kind"], "postponed");
        assert_eq!(value["outcome"]["reason"], "offline");
    }
}
