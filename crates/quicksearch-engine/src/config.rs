//! Configuration types for the quicksearch engine.
//!
//! The engine reads a small JSON document describing the simulated latency,
//! pagination sizes, which conversation flow to run and where to find the
//! product catalog. Every field has a default, so an empty object is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for the conversation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Simulated "thinking" latency before a loader is resolved.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Batch size for paginated product messages.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// How many products a non-paginated "many" reply shows.
    #[serde(default = "default_many_visible_count")]
    pub many_visible_count: usize,

    /// Which conversation flow produces replies.
    #[serde(default)]
    pub flow: Flow,

    /// Optional JSON catalog replacing the built-in mock products.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
}

fn default_delay_ms() -> u64 {
    900
}

fn default_page_size() -> usize {
    3
}

fn default_many_visible_count() -> usize {
    5
}

/// Conversation flow strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Flow {
    /// Every reply depends only on keywords in the current query.
    #[default]
    Scripted,
    /// Three-step intake: skin type, budget, then a product recommendation.
    GuidedIntake,
}

impl std::fmt::Display for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scripted => write!(f, "scripted"),
            Self::GuidedIntake => write!(f, "guided-intake"),
        }
    }
}

impl std::str::FromStr for Flow {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scripted" => Ok(Self::Scripted),
            "guided-intake" | "guided" | "intake" => Ok(Self::GuidedIntake),
            other => Err(ConfigError::UnknownFlow(other.to_string())),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        std::fs::write(path, content).map_err(ConfigError::Io)
    }

    /// The resolution delay as a [`Duration`].
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Page size, never zero.
    pub(crate) fn effective_page_size(&self) -> usize {
        self.page_size.max(1)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            page_size: default_page_size(),
            many_visible_count: default_many_visible_count(),
            flow: Flow::default(),
            catalog_path: None,
        }
    }
}

/// Errors that can occur when loading or saving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse error.
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Flow name not recognised.
    #[error("Unknown flow: {0} (expected scripted or guided-intake)")]
    UnknownFlow(String),
}
