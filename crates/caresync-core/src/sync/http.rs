//! HTTP transport for `POST /api/sync/consultations`.

use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::transport::{SyncTransport, TransportError, TransportResult};
use crate::config::SyncClientConfig;
use crate::models::{SyncBatchRequest, SyncBatchResponse};
use crate::util::compact_text;

#[derive(Clone, Debug)]
pub struct HttpSyncTransport {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpSyncTransport {
    pub fn new(config: &SyncClientConfig) -> TransportResult<Self> {
        Ok(Self {
            endpoint: config.sync_endpoint(),
            client: build_client(config)?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SyncTransport for HttpSyncTransport {
    async fn post_batch(
        &self,
        request: &SyncBatchRequest,
        bearer_token: Option<&str>,
    ) -> TransportResult<SyncBatchResponse> {
        let builder = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .json(request);

        let response = with_bearer(builder, bearer_token).send().await?;
        let body = read_success_body(response).await?;

        serde_json::from_str::<SyncBatchResponse>(&body).map_err(|error| {
            TransportError::InvalidPayload(format!("{error}: {}", compact_text(&body)))
        })
    }
}

pub(crate) fn build_client(config: &SyncClientConfig) -> TransportResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()?)
}

pub(crate) fn with_bearer(builder: RequestBuilder, bearer_token: Option<&str>) -> RequestBuilder {
    match bearer_token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

/// Return the body of a 2xx response, or map anything else to `Rejected`.
pub(crate) async fn read_success_body(response: Response) -> TransportResult<String> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TransportError::Rejected {
            status: status.as_u16(),
            message: parse_api_error(status, &body),
        });
    }

    Ok(response.text().await?)
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    detail: Option<Value>,
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        let detail = payload.detail.map(|detail| match detail {
            Value::String(text) => text,
            other => other.to_string(),
        });
        if let Some(message) = payload.message.or(payload.error).or(detail) {
            return format!("{} ({})", compact_text(&message), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{trimmed} ({})", status.as_u16())
    }
}
