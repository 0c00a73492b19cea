use std::env;

use caresync_core::config::{normalize_api_base_url, API_BASE_ENV, DEFAULT_API_BASE_URL};

use crate::auth::TokenStore;
use crate::cli::ConfigCommands;
use crate::commands::common::{resolve_client_config, resolve_db_path, GlobalArgs};
use crate::config_profiles::{normalize_text_option, CliProfilesConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global: &GlobalArgs) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init { no_activate } => run_config_init(global, no_activate),
        ConfigCommands::Show => run_config_show(global),
    }
}

pub fn run_config_init(global: &GlobalArgs, no_activate: bool) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global.profile.as_deref());
    let existing = config
        .profile(&profile_name)
        .and_then(|profile| profile.api_base_url());

    let merged_api_base_url = merge_api_base_url(
        global.api_base_url.clone(),
        env::var(API_BASE_ENV).ok(),
        existing,
    )?;

    let profile = config.profile_mut_or_default(&profile_name);
    profile.api_base_url.clone_from(&merged_api_base_url);

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    match merged_api_base_url {
        Some(url) => println!("Profile '{profile_name}' syncs with {url}"),
        None => println!(
            "Profile '{profile_name}' has no api_base_url; using {DEFAULT_API_BASE_URL}. Pass --api-base-url to set one."
        ),
    }

    Ok(())
}

/// Explicit flag, then environment, then the value already on the profile.
pub fn merge_api_base_url(
    explicit: Option<String>,
    from_env: Option<String>,
    existing: Option<String>,
) -> Result<Option<String>, CliError> {
    normalize_text_option(explicit)
        .or_else(|| normalize_text_option(from_env))
        .or(existing)
        .map(|url| normalize_api_base_url(url).map_err(CliError::Config))
        .transpose()
}

fn run_config_show(global: &GlobalArgs) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global.profile.as_deref());
    let profile_base = config
        .profile(&profile_name)
        .and_then(|profile| profile.api_base_url());
    let client = resolve_client_config(global.api_base_url.clone(), profile_base)?;
    let db_path = resolve_db_path(global.db_path.clone())?;
    let has_token = TokenStore::new(&profile_name)
        .load()
        .map_err(CliError::Auth)?
        .is_some();

    println!("profile:         {profile_name}");
    println!("api_base_url:    {}", client.api_base_url);
    println!("sync endpoint:   {}", client.sync_endpoint());
    println!("request timeout: {}s", client.request_timeout_secs);
    println!("storage key:     {}", client.storage_key);
    println!("database:        {}", db_path.display());
    println!("api token:       {}", if has_token { "stored" } else { "none" });
    Ok(())
}
