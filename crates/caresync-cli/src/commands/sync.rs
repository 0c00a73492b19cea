use crate::commands::common::{format_sync_report_lines, GlobalArgs, Session};
use crate::error::CliError;

pub async fn run_sync(as_json: bool, global: &GlobalArgs) -> Result<(), CliError> {
    let session = Session::open(global).await?;
    tracing::debug!(profile = %session.profile_name, "Starting sync");
    let report = session.outbox.sync().await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for line in format_sync_report_lines(&report) {
        println!("{line}");
    }
    Ok(())
}
