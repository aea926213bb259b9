use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::errors::FillError;

/// Output format for CLI results
#[derive(Clone, Copy, Debug, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON format for programmatic consumption
    Json,
    /// Human-readable simple format
    Simple,
}

/// Which fields an autofill request covers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AutofillMode {
    /// Every field on the page
    #[default]
    Page,
    /// Only the focused field
    Focused,
}

/// Description of one form control, as sent to the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Lowercase tag name (input, textarea, select)
    pub tag: String,
    /// Control type as the DOM reports it (text, email, textarea, select-one, ...)
    #[serde(rename = "type")]
    pub input_type: String,
    /// Name attribute
    pub name: String,
    /// Id attribute
    pub id: String,
    /// Current value
    pub value: String,
    /// Placeholder attribute
    pub placeholder: String,
    /// Text of every associated label, space-joined
    pub label: String,
    /// Text of the nearest enclosing form, empty outside a form
    pub form_text: String,
}

/// Element lookup strategies, ordered by precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorStrategy {
    Id,
    Name,
    Label,
}

impl SelectorStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorStrategy::Id => "id",
            SelectorStrategy::Name => "name",
            SelectorStrategy::Label => "label",
        }
    }
}

impl FromStr for SelectorStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "id" => Ok(SelectorStrategy::Id),
            "name" => Ok(SelectorStrategy::Name),
            "label" => Ok(SelectorStrategy::Label),
            _ => anyhow::bail!("Unknown selector strategy: {}", s),
        }
    }
}

impl fmt::Display for SelectorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candidate lookups for one element, iterated in precedence order.
///
/// Always holds at least one strategy. Unknown keys in the source JSON are
/// ignored so backends can send strategies this build does not know yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "serde_json::Map<String, Value>",
    into = "BTreeMap<SelectorStrategy, String>"
)]
pub struct Selector {
    strategies: BTreeMap<SelectorStrategy, String>,
}

impl Selector {
    /// Build a selector from a single strategy
    pub fn new(strategy: SelectorStrategy, value: impl Into<String>) -> Self {
        let mut strategies = BTreeMap::new();
        strategies.insert(strategy, value.into());
        Selector { strategies }
    }

    /// Add another strategy, replacing any previous value for it
    pub fn with(mut self, strategy: SelectorStrategy, value: impl Into<String>) -> Self {
        self.strategies.insert(strategy, value.into());
        self
    }

    /// Parse the selector object of an action record
    pub fn from_json(raw: &str) -> Result<Self, FillError> {
        let map: serde_json::Map<String, Value> =
            serde_json::from_str(raw).map_err(|e| FillError::MalformedSelector {
                raw: raw.to_string(),
                reason: e.to_string(),
            })?;
        Selector::try_from(map).map_err(|e| match e {
            FillError::MalformedSelector { reason, .. } => FillError::MalformedSelector {
                raw: raw.to_string(),
                reason,
            },
            other => other,
        })
    }

    /// Strategies with their match values, in precedence order
    pub fn strategies(&self) -> impl Iterator<Item = (SelectorStrategy, &str)> {
        self.strategies.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn get(&self, strategy: SelectorStrategy) -> Option<&str> {
        self.strategies.get(&strategy).map(String::as_str)
    }
}

impl TryFrom<serde_json::Map<String, Value>> for Selector {
    type Error = FillError;

    fn try_from(map: serde_json::Map<String, Value>) -> Result<Self, FillError> {
        let raw = Value::Object(map.clone()).to_string();
        let mut strategies = BTreeMap::new();

        for (key, value) in map {
            let Ok(strategy) = key.parse::<SelectorStrategy>() else {
                debug!("Ignoring unknown selector strategy '{}'", key);
                continue;
            };
            match value {
                Value::String(s) => {
                    strategies.insert(strategy, s);
                }
                other => {
                    return Err(FillError::MalformedSelector {
                        raw,
                        reason: format!("value for '{}' is not a string: {}", key, other),
                    });
                }
            }
        }

        if strategies.is_empty() {
            return Err(FillError::MalformedSelector {
                raw,
                reason: "no known lookup strategy".to_string(),
            });
        }

        Ok(Selector { strategies })
    }
}

impl From<Selector> for BTreeMap<SelectorStrategy, String> {
    fn from(selector: Selector) -> Self {
        selector.strategies
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.strategies) {
            Ok(json) => f.write_str(&json),
            Err(_) => Err(fmt::Error),
        }
    }
}

/// One fill instruction parsed from the stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub selector: Selector,
    /// Value as received; `\n` escapes are expanded when written to a text control
    pub value: String,
}

/// Whether a request or run completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// An action that was applied to the page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilledField {
    /// Position of the action in the stream
    #[serde(default)]
    pub seq: usize,
    pub selector: Selector,
    /// Strategy that located the element
    pub strategy: SelectorStrategy,
    /// Value actually written (after newline expansion or option lookup)
    pub value: String,
}

/// An action that was dropped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedAction {
    #[serde(default)]
    pub seq: usize,
    pub selector: Selector,
    pub value: String,
    /// Machine-readable reason, see `FillError::kind`
    pub kind: String,
    pub reason: String,
}

/// Outcome of one autofill invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillReport {
    pub status: Status,
    pub message: String,
    pub filled: Vec<FilledField>,
    pub skipped: Vec<SkippedAction>,
    /// Records dropped because their selector could not be parsed
    pub malformed: usize,
}

impl Default for FillReport {
    fn default() -> Self {
        FillReport {
            status: Status::Success,
            message: "Stream complete".to_string(),
            filled: Vec::new(),
            skipped: Vec::new(),
            malformed: 0,
        }
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
