use caresync_core::booking::{book_or_queue, BookingOutcome};
use caresync_core::{ClientId, ConsultationDraft, EnqueueOutcome};

use crate::commands::common::{GlobalArgs, Session};
use crate::config_profiles::normalize_text_option;
use crate::error::CliError;

#[derive(Debug, Clone, Default)]
pub struct BookArgs {
    pub doctor_id: Option<i64>,
    pub date: Option<String>,
    pub symptoms: Option<String>,
    pub specialization: Option<String>,
    pub client_id: Option<String>,
    pub offline: bool,
}

pub async fn run_book(args: BookArgs, global: &GlobalArgs) -> Result<(), CliError> {
    let client_id = args.client_id.as_deref().map(parse_client_id).transpose()?;
    let offline = args.offline;
    let draft = build_draft(args)?;
    let session = Session::open(global).await?;

    // A client id names a record that only exists locally, so edits stay in the queue.
    if let Some(client_id) = client_id {
        let mutation = draft.into_mutation(Some(client_id))?;
        return match session.outbox.enqueue(mutation).await {
            EnqueueOutcome::Queued(queued) => {
                println!("Updated queued booking {}", queued.client_id);
                Ok(())
            }
            EnqueueOutcome::NotPersisted { reason } => Err(CliError::NotSaved(reason)),
        };
    }

    let api = session.booking_api()?;
    match book_or_queue(&api, &session.outbox, draft, !offline).await {
        BookingOutcome::Booked(booked) => {
            println!("Booked consultation {}", booked.id);
        }
        BookingOutcome::Queued(queued) => {
            let pending = session.outbox.count().await;
            println!(
                "Queued booking {} for sync ({pending} pending)",
                queued.client_id
            );
        }
        BookingOutcome::NotSaved(reason) => return Err(CliError::NotSaved(reason)),
    }

    Ok(())
}

pub fn build_draft(args: BookArgs) -> Result<ConsultationDraft, CliError> {
    let date = normalize_text_option(args.date);
    if let Some(date) = &date {
        chrono::DateTime::parse_from_rfc3339(date).map_err(|error| {
            CliError::InvalidPayload(format!("--date must be ISO-8601 ({error})"))
        })?;
    }

    Ok(ConsultationDraft {
        doctor_id: args.doctor_id,
        date,
        symptoms: normalize_text_option(args.symptoms),
        specialization: normalize_text_option(args.specialization),
        server_id: None,
    })
}

pub fn parse_client_id(raw: &str) -> Result<ClientId, CliError> {
    raw.parse::<ClientId>().map_err(|_| CliError::EmptyClientId)
}
