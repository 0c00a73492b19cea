use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "caresync")]
#[command(about = "Book consultations offline and sync them when back online")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local outbox database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,

    /// Server base URL (overrides profile and CARESYNC_API_BASE)
    #[arg(long, global = true, value_name = "URL")]
    pub api_base_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Book a consultation, queueing it if the server is unreachable
    Book {
        /// Doctor to book with
        #[arg(long, value_name = "ID")]
        doctor_id: Option<i64>,
        /// Scheduled time, ISO-8601 (defaults to now)
        #[arg(long, value_name = "DATETIME")]
        date: Option<String>,
        /// Symptom description (defaults to "General")
        #[arg(long)]
        symptoms: Option<String>,
        /// Specialization used when no doctor is chosen
        #[arg(long)]
        specialization: Option<String>,
        /// Edit an already queued booking instead of creating one
        #[arg(long, value_name = "ID")]
        client_id: Option<String>,
        /// Skip the direct request and queue immediately
        #[arg(long)]
        offline: bool,
    },
    /// Inspect and edit the offline queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Submit queued bookings to the server
    Sync {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the outbox banner
    Status {
        /// Report as if the device were offline
        #[arg(long)]
        offline: bool,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Manage the bearer token sent to the server
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum QueueCommands {
    /// Enqueue a raw JSON object (a "clientId" key edits that entry)
    Add {
        /// JSON object
        payload: String,
    },
    /// List queued mutations
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the number of queued mutations
    Count,
    /// Remove queued mutations by client id
    Remove {
        /// Client ids
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config from --profile and --api-base-url
    Init {
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Show the resolved configuration
    Show,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Store a bearer token for the profile in the keychain
    SetToken {
        /// Token value
        token: String,
    },
    /// Show whether the profile has a stored token
    Status,
    /// Remove the stored token
    Clear,
}
