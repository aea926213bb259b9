use anyhow::Result;
use std::time::Duration;
use tracing::info;

use easyfill::auth::authenticate;
use easyfill::config::Settings;
use easyfill::errors::EasyfillError;
use easyfill::messages::ExtensionMessage;

use crate::commands::utils::{self, BrowserArgs};

pub async fn handle_auth(
    settings: &Settings,
    browser: BrowserArgs,
    timeout: Option<u64>,
) -> Result<()> {
    let mut store = settings.open_store()?;
    let policy = match timeout {
        Some(secs) => settings.poll.with_timeout(Duration::from_secs(secs)),
        None => settings.poll,
    };
    let profile_url = settings.profile_page_url()?;

    // The user has to log in, so the window is always visible
    let session = browser.connect(false).await?;
    info!("Opening {} - log in to continue", profile_url);
    let outcome = match session.goto(profile_url.as_str()).await {
        Ok(()) => authenticate(&session.surface(), &mut store, &policy)
            .await
            .map_err(anyhow::Error::from),
        Err(e) => Err(e),
    };
    session.close().await?;

    let message = outcome?;
    utils::print_json(&message)?;

    match message {
        ExtensionMessage::AuthenticationFailed { error } => {
            Err(EasyfillError::AuthenticationTimeout(error).into())
        }
        _ => Ok(()),
    }
}
