//! Persistent state kept between runs

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::backend::DocumentRef;
use crate::types::{FillReport, Selector, SelectorStrategy};

/// Layout version written by this build
pub const STORE_VERSION: u32 = 1;

/// Oldest history entries are dropped past this many
pub const MAX_HISTORY: usize = 500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

/// One applied or skipped action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub at: DateTime<Utc>,
    pub selector: Selector,
    pub value: String,
    /// `filled`, or the skip kind
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<SelectorStrategy>,
}

fn current_version() -> u32 {
    STORE_VERSION
}

/// On-disk layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub documents: Vec<DocumentRef>,
    #[serde(default)]
    pub selected_documents: Vec<String>,
    #[serde(default)]
    pub actions: Vec<ActionRecord>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for StoreData {
    fn default() -> Self {
        StoreData {
            version: STORE_VERSION,
            theme: Theme::default(),
            user_id: None,
            documents: Vec::new(),
            selected_documents: Vec::new(),
            actions: Vec::new(),
            updated_at: None,
        }
    }
}

/// JSON-backed store; every mutation is written through immediately
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    data: StoreData,
}

impl Store {
    /// `~/.easyfill/storage.json`
    pub fn default_path() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().context("Unable to determine home directory")?;
        Ok(home_dir.join(".easyfill").join("storage.json"))
    }

    /// Load the store at `path`, starting empty if the file does not exist yet
    pub fn open(path: &Path) -> Result<Self> {
        let data = if path.exists() {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read store {}", path.display()))?;
            let data: StoreData = serde_json::from_str(&json)
                .with_context(|| format!("Store {} is not valid JSON", path.display()))?;
            if data.version > STORE_VERSION {
                anyhow::bail!(
                    "Store {} has version {}, this build supports up to {}",
                    path.display(),
                    data.version,
                    STORE_VERSION
                );
            }
            debug!("Loaded store from {}", path.display());
            data
        } else {
            debug!("No store at {}, starting empty", path.display());
            StoreData::default()
        };

        Ok(Store {
            path: path.to_path_buf(),
            data,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &StoreData {
        &self.data
    }

    pub fn save(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.data.version = STORE_VERSION;
        self.data.updated_at = Some(Utc::now());

        let json = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write store {}", self.path.display()))?;
        debug!("Saved store to {}", self.path.display());
        Ok(())
    }

    pub fn theme(&self) -> Theme {
        self.data.theme
    }

    /// Switch between dark and light, returning the new theme
    pub fn toggle_theme(&mut self) -> Result<Theme> {
        self.data.theme = self.data.theme.toggled();
        self.save()?;
        Ok(self.data.theme)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.data.user_id.as_deref()
    }

    pub fn set_user_id(&mut self, user_id: &str) -> Result<()> {
        self.data.user_id = Some(user_id.to_string());
        self.save()?;
        info!("Stored user id");
        Ok(())
    }

    pub fn documents(&self) -> &[DocumentRef] {
        &self.data.documents
    }

    /// Replace the document list, dropping selections that no longer exist
    pub fn set_documents(&mut self, documents: Vec<DocumentRef>) -> Result<()> {
        self.data
            .selected_documents
            .retain(|id| documents.iter().any(|d| &d.id == id));
        self.data.documents = documents;
        self.save()
    }

    pub fn selected_documents(&self) -> &[String] {
        &self.data.selected_documents
    }

    pub fn set_selected_documents(&mut self, ids: Vec<String>) -> Result<()> {
        if let Some(unknown) = ids
            .iter()
            .find(|id| !self.data.documents.iter().any(|d| &d.id == *id))
        {
            anyhow::bail!("Unknown document '{}'", unknown);
        }
        self.data.selected_documents = ids;
        self.save()
    }

    pub fn actions(&self) -> &[ActionRecord] {
        &self.data.actions
    }

    /// Append every outcome of a run to the history, in stream order
    pub fn record_report(&mut self, report: &FillReport) -> Result<()> {
        let now = Utc::now();
        let filled = report.filled.iter().map(|f| {
            let record = ActionRecord {
                at: now,
                selector: f.selector.clone(),
                value: f.value.clone(),
                outcome: "filled".to_string(),
                strategy: Some(f.strategy),
            };
            (f.seq, record)
        });
        let skipped = report.skipped.iter().map(|s| {
            let record = ActionRecord {
                at: now,
                selector: s.selector.clone(),
                value: s.value.clone(),
                outcome: s.kind.clone(),
                strategy: None,
            };
            (s.seq, record)
        });
        let mut records: Vec<(usize, ActionRecord)> = filled.chain(skipped).collect();
        records.sort_by_key(|(seq, _)| *seq);
        self.data
            .actions
            .extend(records.into_iter().map(|(_, record)| record));

        let excess = self.data.actions.len().saturating_sub(MAX_HISTORY);
        if excess > 0 {
            self.data.actions.drain(..excess);
        }
        self.save()
    }

    pub fn clear_actions(&mut self) -> Result<usize> {
        let cleared = self.data.actions.len();
        self.data.actions.clear();
        self.save()?;
        Ok(cleared)
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;
