//! Consultation booking payload

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::mutation::{ClientId, NewMutation};

/// Symptoms text used when a booking is submitted without any.
pub const DEFAULT_SYMPTOMS: &str = "General";

/// Fields of a consultation-booking request.
///
/// Absent fields are left out of the serialized payload, so re-enqueueing a
/// partial draft under the same client id only overwrites what it sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationDraft {
    /// Target doctor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<i64>,
    /// Scheduled time, ISO-8601
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<String>,
    /// Classification tag the server uses to pick a doctor when none is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    /// Existing server record this draft edits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<i64>,
}

impl ConsultationDraft {
    /// Fill the fields the booking form defaults before submission.
    #[must_use]
    pub fn with_submission_defaults(mut self) -> Self {
        if self.date.is_none() {
            self.date = Some(
                crate::util::utc_now_millis()
                    .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            );
        }
        if self.symptoms.is_none() {
            self.symptoms = Some(DEFAULT_SYMPTOMS.to_string());
        }
        self
    }

    /// Payload map holding only the fields that are set.
    pub fn to_payload(&self) -> crate::Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    /// Turn this draft into enqueue input.
    pub fn into_mutation(self, client_id: Option<ClientId>) -> crate::Result<NewMutation> {
        Ok(NewMutation::with_client_id(client_id, self.to_payload()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn payload_omits_unset_fields() {
        let draft = ConsultationDraft {
            doctor_id: Some(7),
            symptoms: Some("fever".to_string()),
            ..ConsultationDraft::default()
        };

        let payload = Value::Object(draft.to_payload().unwrap());
        assert_eq!(payload, json!({"doctorId": 7, "symptoms": "fever"}));
    }

    #[test]
    fn submission_defaults_fill_date_and_symptoms() {
        let draft = ConsultationDraft::default().with_submission_defaults();
        assert_eq!(draft.symptoms.as_deref(), Some(DEFAULT_SYMPTOMS));
        let date = draft.date.unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&date).is_ok());
    }

    #[test]
    fn submission_defaults_keep_existing_values() {
        let draft = ConsultationDraft {
            date: Some("2024-05-01T10:00:00Z".to_string()),
            symptoms: Some("cough".to_string()),
            ..ConsultationDraft::default()
        }
        .with_submission_defaults();

        assert_eq!(draft.date.as_deref(), Some("2024-05-01T10:00:00Z"));
        assert_eq!(draft.symptoms.as_deref(), Some("cough"));
    }
}
