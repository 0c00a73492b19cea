use caresync_core::OutboxIndicator;

use crate::commands::common::{GlobalArgs, Session};
use crate::error::CliError;

pub async fn run_status(offline: bool, global: &GlobalArgs) -> Result<(), CliError> {
    let session = Session::open(global).await?;
    let indicator = session.outbox.indicator(!offline).await;

    for line in format_status_lines(indicator) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_status_lines(indicator: OutboxIndicator) -> Vec<String> {
    if !indicator.is_visible() {
        return vec!["All bookings are synced.".to_string()];
    }

    let mut lines = vec![indicator.message()];
    if let Some(label) = indicator.action_label() {
        if indicator.can_sync() {
            lines.push(format!("{label}: run `caresync sync`"));
        } else {
            lines.push(label.to_string());
        }
    }
    lines
}
