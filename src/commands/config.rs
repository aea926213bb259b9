use anyhow::Result;
use clap::Subcommand;
use serde_json::json;
use tracing::info;

use easyfill::config::Settings;
use easyfill::types::OutputFormat;

use crate::commands::utils;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show settings and stored state
    Show {
        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// Switch between the dark and light theme
    ToggleTheme,

    /// Store the user id without going through the login page
    SetUser {
        /// User id
        id: String,
    },

    /// Delete the recorded action history
    ClearHistory,
}

pub async fn handle_config(settings: &Settings, command: ConfigCommands) -> Result<()> {
    let mut store = settings.open_store()?;

    match command {
        ConfigCommands::Show { format } => match format {
            OutputFormat::Json => utils::print_json(&json!({
                "backend_url": settings.backend_url.as_str(),
                "frontend_url": settings.frontend_url.as_str(),
                "store": store.path(),
                "state": store.data(),
            }))?,
            OutputFormat::Simple => {
                println!("Backend:   {}", settings.backend_url);
                println!("Frontend:  {}", settings.frontend_url);
                println!("Store:     {}", store.path().display());
                println!("Theme:     {:?}", store.theme());
                println!("User:      {}", store.user_id().unwrap_or("not authenticated"));
                println!(
                    "Documents: {} ({} selected)",
                    store.documents().len(),
                    store.selected_documents().len()
                );
                println!("History:   {} action(s)", store.actions().len());
            }
        },

        ConfigCommands::ToggleTheme => {
            let theme = store.toggle_theme()?;
            info!("Theme is now {:?}", theme);
            utils::print_json(&json!({ "theme": theme }))?;
        }

        ConfigCommands::SetUser { id } => {
            if id.trim().is_empty() {
                anyhow::bail!("User id must not be empty");
            }
            store.set_user_id(&id)?;
            utils::print_json(&json!({ "user_id": id }))?;
        }

        ConfigCommands::ClearHistory => {
            let cleared = store.clear_actions()?;
            utils::print_json(&json!({ "cleared": cleared }))?;
        }
    }
    Ok(())
}
