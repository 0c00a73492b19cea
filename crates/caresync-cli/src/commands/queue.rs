use caresync_core::NewMutation;

use crate::cli::QueueCommands;
use crate::commands::book::parse_client_id;
use crate::commands::common::{
    format_queue_lines, queue_to_list_item, GlobalArgs, QueueListItem, Session,
};
use crate::error::CliError;

pub async fn run_queue(command: QueueCommands, global: &GlobalArgs) -> Result<(), CliError> {
    match command {
        QueueCommands::Add { payload } => run_queue_add(&payload, global).await,
        QueueCommands::List { json } => run_queue_list(json, global).await,
        QueueCommands::Count => {
            let session = Session::open(global).await?;
            println!("{}", session.outbox.queue().count().await?);
            Ok(())
        }
        QueueCommands::Remove { ids } => run_queue_remove(&ids, global).await,
    }
}

pub fn parse_mutation(raw: &str) -> Result<NewMutation, CliError> {
    let value = serde_json::from_str(raw)
        .map_err(|error| CliError::InvalidPayload(error.to_string()))?;
    Ok(NewMutation::from_value(value)?)
}

async fn run_queue_add(raw: &str, global: &GlobalArgs) -> Result<(), CliError> {
    let mutation = parse_mutation(raw)?;
    let session = Session::open(global).await?;
    let queued = session.outbox.queue().enqueue(mutation).await?;
    println!("{}", queued.client_id);
    Ok(())
}

async fn run_queue_list(as_json: bool, global: &GlobalArgs) -> Result<(), CliError> {
    let session = Session::open(global).await?;
    let items = session.outbox.queue().list().await?;

    if as_json {
        let json_items = items
            .iter()
            .map(queue_to_list_item)
            .collect::<Vec<QueueListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("Offline queue is empty.");
        return Ok(());
    }

    for line in format_queue_lines(&items) {
        println!("{line}");
    }
    Ok(())
}

async fn run_queue_remove(raw_ids: &[String], global: &GlobalArgs) -> Result<(), CliError> {
    let ids = raw_ids
        .iter()
        .map(|raw| parse_client_id(raw))
        .collect::<Result<Vec<_>, _>>()?;
    let session = Session::open(global).await?;
    let removed = session.outbox.queue().remove_by_client_ids(&ids).await?;
    println!("Removed {removed} queued mutation(s)");
    Ok(())
}
