//! Direct booking with fallback to the offline queue.

use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::TokenProvider;
use crate::config::SyncClientConfig;
use crate::models::{ConsultationDraft, QueuedMutation};
use crate::outbox::{EnqueueOutcome, Outbox};
use crate::store::KeyValueStore;
use crate::sync::{
    build_client, read_success_body, with_bearer, SyncTransport, TransportError, TransportResult,
};
use crate::util::compact_text;

/// Server record returned by a successful booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedConsultation {
    pub id: i64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Online booking endpoint.
#[allow(async_fn_in_trait)]
pub trait BookingApi {
    async fn create_consultation(
        &self,
        draft: &ConsultationDraft,
        bearer_token: Option<&str>,
    ) -> TransportResult<BookedConsultation>;
}

#[derive(Clone, Debug)]
pub struct HttpBookingApi {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpBookingApi {
    pub fn new(config: &SyncClientConfig) -> TransportResult<Self> {
        Ok(Self {
            endpoint: config.consultations_endpoint(),
            client: build_client(config)?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl BookingApi for HttpBookingApi {
    async fn create_consultation(
        &self,
        draft: &ConsultationDraft,
        bearer_token: Option<&str>,
    ) -> TransportResult<BookedConsultation> {
        let builder = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .json(draft);

        let response = with_bearer(builder, bearer_token).send().await?;
        let body = read_success_body(response).await?;

        serde_json::from_str::<BookedConsultation>(&body).map_err(|error| {
            TransportError::InvalidPayload(format!("{error}: {}", compact_text(&body)))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingOutcome {
    /// The server created the record
    Booked(BookedConsultation),
    /// Stored locally for the next sync
    Queued(QueuedMutation),
    /// Neither the server nor local storage took it
    NotSaved(String),
}

/// Book online when possible, otherwise queue.
///
/// The draft gets a `date` of now and `symptoms` of `"General"` if those
/// are missing, and that same payload is used on both paths. When `online`
/// is false no request is made. Any failure of the direct call falls back to
/// the queue.
pub async fn book_or_queue<A, S, T, P>(
    api: &A,
    outbox: &Outbox<S, T, P>,
    draft: ConsultationDraft,
    online: bool,
) -> BookingOutcome
where
    A: BookingApi,
    S: KeyValueStore,
    T: SyncTransport,
    P: TokenProvider,
{
    let draft = draft.with_submission_defaults();

    if online {
        let token = outbox.bearer_token();
        match api.create_consultation(&draft, token.as_deref()).await {
            Ok(booked) => {
                tracing::info!(id = booked.id, "Booked consultation");
                return BookingOutcome::Booked(booked);
            }
            Err(error) => {
                tracing::warn!(error = %error, "Booking request failed; queueing for sync");
            }
        }
    }

    let mutation = match draft.into_mutation(None) {
        Ok(mutation) => mutation,
        Err(error) => return BookingOutcome::NotSaved(error.to_string()),
    };

    match outbox.enqueue(mutation).await {
        EnqueueOutcome::Queued(queued) => BookingOutcome::Queued(queued),
        EnqueueOutcome::NotPersisted { reason } => BookingOutcome::NotSaved(reason),
    }
}
