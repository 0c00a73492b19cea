//! Queued mutation model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;
use crate::util::iso_millis;

/// Payload keys owned by the queue rather than the producer.
const CLIENT_ID_KEY: &str = "clientId";
const UPDATED_AT_KEY: &str = "updatedAt";

/// Client-generated identifier used as the merge and idempotency key.
///
/// Generated ids are UUID v7 strings: a millisecond timestamp prefix followed
/// by random bits. Ids handed in by callers are accepted as-is once trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Create a new time-ordered client id
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ClientId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("client id cannot be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// A pending write that the server has not confirmed yet.
///
/// Serialized flat: `{"clientId": .., "updatedAt": .., ...payload}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedMutation {
    /// Merge key, unique within the queue
    pub client_id: ClientId,
    /// Client-side last-modified time, refreshed on every enqueue
    #[serde(with = "iso_millis")]
    pub updated_at: DateTime<Utc>,
    /// Domain fields of the mutation
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl QueuedMutation {
    /// Build a fresh entry from enqueue input.
    pub(crate) fn new(client_id: ClientId, payload: Map<String, Value>, at: DateTime<Utc>) -> Self {
        Self {
            client_id,
            updated_at: at,
            payload,
        }
    }

    /// Shallow-merge `payload` over this entry and stamp it with `at`.
    ///
    /// Keys present in `payload` replace existing values, including explicit
    /// `null`s; keys absent from it are kept. `updated_at` is always `at`.
    pub(crate) fn merge(&mut self, payload: Map<String, Value>, at: DateTime<Utc>) {
        for (key, value) in payload {
            self.payload.insert(key, value);
        }
        self.updated_at = at;
    }

    /// Look up a payload field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Look up a payload field as a string.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

/// Input to `enqueue`: an optional client id plus the domain fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewMutation {
    /// Existing id when editing an already-queued record
    pub client_id: Option<ClientId>,
    /// Domain fields
    pub payload: Map<String, Value>,
}

impl NewMutation {
    /// Create input without a client id; one is generated on enqueue.
    #[must_use]
    pub fn new(payload: Map<String, Value>) -> Self {
        Self::with_client_id(None, payload)
    }

    /// Create input targeting a specific client id.
    #[must_use]
    pub fn with_client_id(client_id: Option<ClientId>, mut payload: Map<String, Value>) -> Self {
        payload.remove(CLIENT_ID_KEY);
        payload.remove(UPDATED_AT_KEY);
        Self { client_id, payload }
    }

    /// Build input from a JSON object, lifting a `clientId` key out of it.
    ///
    /// ```
    /// use caresync_core::models::NewMutation;
    /// use serde_json::json;
    ///
    /// let input = NewMutation::from_value(json!({"clientId": "c1", "symptoms": "fever"})).unwrap();
    /// assert_eq!(input.client_id.unwrap().as_str(), "c1");
    /// assert!(!input.payload.contains_key("clientId"));
    /// ```
    pub fn from_value(value: Value) -> crate::Result<Self> {
        let Value::Object(mut payload) = value else {
            return Err(Error::InvalidInput(
                "mutation payload must be a JSON object".into(),
            ));
        };

        let client_id = match payload.remove(CLIENT_ID_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) if raw.trim().is_empty() => None,
            Some(Value::String(raw)) => Some(raw.parse()?),
            Some(other) => {
                return Err(Error::InvalidInput(format!(
                    "clientId must be a string, got {other}"
                )))
            }
        };

        Ok(Self::with_client_id(client_id, payload))
    }
}
