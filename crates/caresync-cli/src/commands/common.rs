use std::env;
use std::path::PathBuf;

use caresync_core::booking::HttpBookingApi;
use caresync_core::config::{SyncClientConfig, API_BASE_ENV};
use caresync_core::store::LibSqlStore;
use caresync_core::sync::{HttpSyncTransport, SyncOutcome, SyncReport};
use caresync_core::{Outbox, QueuedMutation};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::auth::KeychainToken;
use crate::config_profiles::{normalize_text_option, CliProfilesConfig};
use crate::error::CliError;

pub const DB_PATH_ENV: &str = "CARESYNC_DB_PATH";

pub type CliOutbox = Outbox<LibSqlStore, HttpSyncTransport, KeychainToken>;

/// Global flags shared by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub db_path: Option<PathBuf>,
    pub profile: Option<String>,
    pub api_base_url: Option<String>,
}

/// Everything a command needs to talk to the outbox and the server.
pub struct Session {
    pub profile_name: String,
    pub config: SyncClientConfig,
    pub outbox: CliOutbox,
}

impl Session {
    pub async fn open(args: &GlobalArgs) -> Result<Self, CliError> {
        let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
        let profile_name = profiles.resolve_profile_name(args.profile.as_deref());
        let profile_base = profiles
            .profile(&profile_name)
            .and_then(|profile| profile.api_base_url());
        let config = resolve_client_config(args.api_base_url.clone(), profile_base)?;

        let db_path = resolve_db_path(args.db_path.clone())?;
        let store = LibSqlStore::open(&db_path).await?;
        let transport = HttpSyncTransport::new(&config)?;
        let outbox = Outbox::with_config(
            store,
            &config,
            transport,
            KeychainToken::for_profile(&profile_name),
        );

        tracing::debug!(
            profile = %profile_name,
            db_path = %db_path.display(),
            api_base_url = %config.api_base_url,
            "Opened outbox"
        );

        Ok(Self {
            profile_name,
            config,
            outbox,
        })
    }

    pub fn booking_api(&self) -> Result<HttpBookingApi, CliError> {
        Ok(HttpBookingApi::new(&self.config)?)
    }
}

/// Flag, then `CARESYNC_API_BASE`, then the profile, then the default.
pub fn resolve_client_config(
    flag: Option<String>,
    profile_base: Option<String>,
) -> Result<SyncClientConfig, CliError> {
    SyncClientConfig::resolve_with(flag, |name| {
        let from_env = normalize_text_option(env::var(name).ok());
        if name == API_BASE_ENV {
            from_env.or_else(|| profile_base.clone())
        } else {
            from_env
        }
    })
    .map_err(CliError::Config)
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    match cli_db_path.or_else(|| env::var_os(DB_PATH_ENV).map(PathBuf::from)) {
        Some(path) => Ok(path),
        None => default_db_path(),
    }
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("caresync").join("outbox.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueListItem {
    pub client_id: String,
    pub updated_at: String,
    pub payload: Map<String, Value>,
}

pub fn queue_to_list_item(item: &QueuedMutation) -> QueueListItem {
    QueueListItem {
        client_id: item.client_id.to_string(),
        updated_at: format_timestamp(item),
        payload: item.payload.clone(),
    }
}

pub fn format_queue_lines(items: &[QueuedMutation]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            let summary = summarize_payload(&item.payload, 60);
            format!(
                "{:<36}  {}  {summary}",
                item.client_id.as_str(),
                format_timestamp(item)
            )
        })
        .collect()
}

pub fn format_timestamp(item: &QueuedMutation) -> String {
    item.updated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// `key=value` pairs, truncated to `max_chars`.
pub fn summarize_payload(payload: &Map<String, Value>, max_chars: usize) -> String {
    let joined = payload
        .iter()
        .map(|(key, value)| match value {
            Value::String(text) => format!("{key}={text}"),
            other => format!("{key}={other}"),
        })
        .collect::<Vec<_>>()
        .join(" ");

    if joined.chars().count() <= max_chars {
        joined
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = joined.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_sync_report_lines(report: &SyncReport) -> Vec<String> {
    let mut lines = match &report.outcome {
        SyncOutcome::Empty => vec!["Nothing to sync.".to_string()],
        SyncOutcome::AlreadyRunning => vec!["A sync is already in progress.".to_string()],
        SyncOutcome::Postponed { reason } => {
            vec![format!("Sync postponed; queue unchanged ({reason})")]
        }
        SyncOutcome::Completed => vec![format!(
            "Sync completed: {} removed, {} still queued",
            report.removed.len(),
            report.retained.len()
        )],
    };

    for result in &report.results {
        let client_id = result
            .client_id
            .as_ref()
            .map_or_else(|| "(no clientId)".to_string(), ToString::to_string);
        let mut line = format!("  {client_id:<36}  {}", result.status.as_str());
        if let Some(server_id) = result.server_id {
            line.push_str(&format!("  server={server_id}"));
        }
        if let Some(reason) = &result.reason {
            line.push_str(&format!("  {reason}"));
        }
        lines.push(line);
    }

    lines
}
