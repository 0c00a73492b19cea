//! CareSync CLI - book consultations offline and sync them later
//!
//! Bookings that cannot reach the server are kept in a local outbox and
//! submitted in one batch by `caresync sync`.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::book::{run_book, BookArgs};
use crate::commands::common::GlobalArgs;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::queue::run_queue;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let default_directive: tracing_subscriber::filter::Directive = "caresync=info"
        .parse()
        .map_err(|error| CliError::Config(format!("invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_directive),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let global = GlobalArgs {
        db_path: cli.db_path,
        profile: cli.profile,
        api_base_url: cli.api_base_url,
    };

    match cli.command {
        Commands::Book {
            doctor_id,
            date,
            symptoms,
            specialization,
            client_id,
            offline,
        } => {
            let args = BookArgs {
                doctor_id,
                date,
                symptoms,
                specialization,
                client_id,
                offline,
            };
            run_book(args, &global).await?;
        }
        Commands::Queue { command } => run_queue(command, &global).await?,
        Commands::Sync { json } => run_sync(json, &global).await?,
        Commands::Status { offline } => run_status(offline, &global).await?,
        Commands::Config { command } => run_config(command, &global)?,
        Commands::Auth { command } => run_auth(command, &global)?,
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}
