//! Draft storage configuration
//!
//! Loaded from `.ecodraft/config.toml` in the project root. Every field has
//! a default, so a missing file or a partial one is fine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Directory, relative to the project root, holding config and state.
pub const STATE_DIR: &str = ".ecodraft";

/// Top-level configuration from .ecodraft/config.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub events: EventsConfig,
}

/// Where the draft snapshot lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Snapshot file, relative to the state directory unless absolute.
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: PathBuf,

    /// Optional device-local cache copy consulted at startup.
    pub cache_file: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot_file: default_snapshot_file(),
            cache_file: None,
        }
    }
}

/// Audit event log configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Write draft events as JSONL. Default: true.
    #[serde(default = "default_events_enabled")]
    pub enabled: bool,

    /// Event log file, relative to the state directory unless absolute.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: default_events_enabled(),
            log_file: default_log_file(),
        }
    }
}

// Serde default functions
fn default_snapshot_file() -> PathBuf {
    PathBuf::from("draft.json")
}

fn default_events_enabled() -> bool {
    true
}

fn default_log_file() -> PathBuf {
    PathBuf::from("events.jsonl")
}

impl DraftConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|source| StoreError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| StoreError::InvalidConfig {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Try to load config, returning the default if the file doesn't exist
    /// or doesn't parse.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(StoreError::IoError { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Self::default()
            }
            Err(e) => {
                tracing::warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    /// Load `<project_root>/.ecodraft/config.toml`.
    pub fn for_project(project_root: &Path) -> ProjectConfig {
        let state_dir = project_root.join(STATE_DIR);
        let config = Self::load_or_default(&state_dir.join("config.toml"));
        ProjectConfig { state_dir, config }
    }
}

/// A config resolved against a project's state directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    pub state_dir: PathBuf,
    pub config: DraftConfig,
}

impl ProjectConfig {
    pub fn snapshot_path(&self) -> PathBuf {
        self.resolve(&self.config.store.snapshot_file)
    }

    pub fn cache_path(&self) -> Option<PathBuf> {
        self.config.store.cache_file.as_deref().map(|p| self.resolve(p))
    }

    /// Event log path, or `None` when events are disabled.
    pub fn events_path(&self) -> Option<PathBuf> {
        self.config
            .events
            .enabled
            .then(|| self.resolve(&self.config.events.log_file))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.state_dir.join(path)
        }
    }
}
