use crate::auth::TokenStore;
use crate::cli::AuthCommands;
use crate::commands::common::GlobalArgs;
use crate::config_profiles::{normalize_text_option, CliProfilesConfig};
use crate::error::CliError;

pub fn run_auth(command: AuthCommands, global: &GlobalArgs) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global.profile.as_deref());
    let store = TokenStore::new(&profile_name);

    match command {
        AuthCommands::SetToken { token } => {
            let token = normalize_text_option(Some(token))
                .ok_or_else(|| CliError::Auth("Token must not be empty".to_string()))?;
            store.save(&token).map_err(CliError::Auth)?;
            println!("Stored API token for profile '{profile_name}'");
        }
        AuthCommands::Status => {
            if store.load().map_err(CliError::Auth)?.is_some() {
                println!("Profile '{profile_name}' has an API token; requests are authenticated.");
            } else {
                println!("Profile '{profile_name}' has no API token; requests are sent without Authorization.");
            }
        }
        AuthCommands::Clear => {
            store.clear().map_err(CliError::Auth)?;
            println!("Cleared API token for profile '{profile_name}'");
        }
    }

    Ok(())
}
