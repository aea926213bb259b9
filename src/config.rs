//! Runtime settings shared by every command

use anyhow::{Context, Result};
use std::path::PathBuf;
use url::Url;

use crate::auth::PollPolicy;
use crate::store::Store;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";

/// Where the frontend shows the logged-in user's profile
const PROFILE_PATH: &str = "app/profile";

#[derive(Debug, Clone)]
pub struct Settings {
    pub backend_url: Url,
    pub frontend_url: Url,
    pub store_path: PathBuf,
    pub poll: PollPolicy,
}

impl Settings {
    /// Validate raw values; `store_path` falls back to `~/.easyfill/storage.json`
    pub fn new(backend_url: &str, frontend_url: &str, store_path: Option<PathBuf>) -> Result<Self> {
        let backend_url = Url::parse(backend_url)
            .with_context(|| format!("Invalid backend URL: {}", backend_url))?;
        let frontend_url = Url::parse(frontend_url)
            .with_context(|| format!("Invalid frontend URL: {}", frontend_url))?;
        let store_path = match store_path {
            Some(path) => path,
            None => Store::default_path()?,
        };

        Ok(Settings {
            backend_url,
            frontend_url,
            store_path,
            poll: PollPolicy::default(),
        })
    }

    pub fn open_store(&self) -> Result<Store> {
        Store::open(&self.store_path)
    }

    /// Page that exposes the user id once logged in
    pub fn profile_page_url(&self) -> Result<Url> {
        let mut base = self.frontend_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(PROFILE_PATH)
            .context("Failed to build profile page URL")
    }
}
