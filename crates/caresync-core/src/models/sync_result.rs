//! Batch sync wire types

use serde::{Deserialize, Serialize};

use super::mutation::{ClientId, QueuedMutation};

/// Per-item outcome reported by the sync endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Created,
    Updated,
    Duplicate,
    /// Server holds a newer version; the queued copy is stale
    SkippedNewerServer,
    Error,
    /// Any status string this client does not recognize
    #[serde(other)]
    Unknown,
}

impl SyncStatus {
    /// Whether the server has settled this item, so the local copy can go.
    ///
    /// `SkippedNewerServer` counts as settled: the server's version wins.
    pub const fn is_resolved(self) -> bool {
        matches!(
            self,
            Self::Created | Self::Updated | Self::Duplicate | Self::SkippedNewerServer
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Duplicate => "duplicate",
            Self::SkippedNewerServer => "skipped_newer_server",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

/// One entry of the `results` array.
///
/// The failure text may arrive as `reason` or `error`; `reason` wins when a
/// result carries both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "WireSyncResult")]
pub struct SyncResult {
    pub client_id: Option<ClientId>,
    pub status: SyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSyncResult {
    #[serde(default)]
    client_id: Option<ClientId>,
    status: SyncStatus,
    #[serde(default)]
    server_id: Option<i64>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl From<WireSyncResult> for SyncResult {
    fn from(wire: WireSyncResult) -> Self {
        Self {
            client_id: wire.client_id,
            status: wire.status,
            server_id: wire.server_id,
            reason: wire.reason.or(wire.error),
        }
    }
}

/// Body of `POST /api/sync/consultations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncBatchRequest {
    pub items: Vec<QueuedMutation>,
}

/// Successful response body of the sync endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncBatchResponse {
    #[serde(default)]
    pub results: Vec<SyncResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_server_response() {
        let body = json!({
            "results": [
                {"clientId": "a", "serverId": 12, "status": "created"},
                {"clientId": "b", "serverId": 3, "status": "skipped_newer_server"},
                {"clientId": "c", "status": "error", "reason": "not_found_or_forbidden"},
                {"clientId": "d", "status": "teleported"}
            ]
        });

        let response: SyncBatchResponse = serde_json::from_value(body).unwrap();
        let statuses = response
            .results
            .iter()
            .map(|result| result.status)
            .collect::<Vec<_>>();

        assert_eq!(
            statuses,
            vec![
                SyncStatus::Created,
                SyncStatus::SkippedNewerServer,
                SyncStatus::Error,
                SyncStatus::Unknown
            ]
        );
        assert_eq!(response.results[0].server_id, Some(12));
        assert_eq!(
            response.results[2].reason.as_deref(),
            Some("not_found_or_forbidden")
        );
    }

    #[test]
    fn accepts_error_key_as_reason_and_missing_results() {
        let result: SyncResult =
            serde_json::from_value(json!({"clientId": "x", "status": "error", "error": "boom"}))
                .unwrap();
        assert_eq!(result.reason.as_deref(), Some("boom"));

        let both: SyncResult = serde_json::from_value(json!({
            "clientId": "y",
            "status": "error",
            "reason": "invalid_date",
            "error": "ValidationError"
        }))
        .unwrap();
        assert_eq!(both.reason.as_deref(), Some("invalid_date"));

        let empty: SyncBatchResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.results.is_empty());
    }

    #[test]
    fn resolved_statuses() {
        assert!(SyncStatus::Created.is_resolved());
        assert!(SyncStatus::Updated.is_resolved());
        assert!(SyncStatus::Duplicate.is_resolved());
        assert!(SyncStatus::SkippedNewerServer.is_resolved());
        assert!(!SyncStatus::Error.is_resolved());
        assert!(!SyncStatus::Unknown.is_resolved());
    }
}
