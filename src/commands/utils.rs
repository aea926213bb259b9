use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;

use easyfill::document::FormDocument;
use easyfill::errors::EasyfillError;
use easyfill::store::Store;
use easyfill::webdriver::{Browser, BrowserType};

/// WebDriver connection options
#[derive(Args, Debug, Clone)]
pub struct BrowserArgs {
    /// Browser to use (firefox or chrome)
    #[arg(short, long, default_value = "firefox")]
    pub browser: String,

    /// WebDriver URL (defaults to the browser's standard driver port)
    #[arg(long)]
    pub webdriver: Option<String>,

    /// Run browser in visible mode (disables headless)
    #[arg(long = "no-headless")]
    pub no_headless: bool,
}

impl BrowserArgs {
    pub async fn connect(&self, headless: bool) -> Result<Browser> {
        let browser_type = BrowserType::from_str(&self.browser)?;
        Browser::connect(browser_type, self.webdriver.as_deref(), headless).await
    }
}

/// Which page to work on
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct PageArgs {
    /// Live page to open over WebDriver
    #[arg(long)]
    pub url: Option<String>,

    /// Saved HTML page to work on offline
    #[arg(long)]
    pub html: Option<PathBuf>,
}

/// An opened page
pub enum Page {
    Snapshot(FormDocument),
    Live(Browser),
}

impl PageArgs {
    pub async fn open(&self, browser: &BrowserArgs) -> Result<Page> {
        match (&self.url, &self.html) {
            (_, Some(path)) => Ok(Page::Snapshot(FormDocument::from_file(path)?)),
            (Some(url), None) => {
                let session = browser.connect(!browser.no_headless).await?;
                session.goto(url).await?;
                Ok(Page::Live(session))
            }
            (None, None) => anyhow::bail!("Either --url or --html is required"),
        }
    }
}

/// The explicit user id, or the one stored by `easyfill auth`
pub fn resolve_user_id(flag: Option<String>, store: &Store) -> Result<String, EasyfillError> {
    flag.filter(|id| !id.is_empty())
        .or_else(|| store.user_id().map(str::to_string))
        .ok_or(EasyfillError::NotAuthenticated)
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_user_id_prefers_flag() {
        let dir = TempDir::new().unwrap();
        let mut store = Store::open(&dir.path().join("storage.json")).unwrap();

        let err = resolve_user_id(None, &store).unwrap_err();
        assert_eq!(err.exit_code(), 5);

        store.set_user_id("stored").unwrap();
        assert_eq!(resolve_user_id(None, &store).unwrap(), "stored");
        assert_eq!(
            resolve_user_id(Some("flag".to_string()), &store).unwrap(),
            "flag"
        );
        assert_eq!(
            resolve_user_id(Some(String::new()), &store).unwrap(),
            "stored"
        );
    }
}
