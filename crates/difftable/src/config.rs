//! Configuration loading

use anyhow::{Context, Result};
use difftable_core::{ContextWindow, Layout, MAX_DISPLAY_LINES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings read from `config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Grid layout used when no flag picks one
    pub layout: Layout,
    /// Id of the rendered table, used by expander handles
    pub view_id: String,
    /// Refuse to render diffs with more lines than this
    pub max_lines: usize,
    /// Context window sizes
    pub context: ContextWindow,
    /// Line pairing settings
    pub pairing: PairingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layout: Layout::default(),
            view_id: "diff".to_string(),
            max_lines: MAX_DISPLAY_LINES,
            context: ContextWindow::default(),
            pairing: PairingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairingConfig {
    /// Minimum similarity (0.0 - 1.0) for a deleted line to pair with an inserted one
    pub threshold: f32,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

impl Config {
    /// `<config dir>/difftable/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("difftable").join("config.toml"))
    }

    /// Load from `path` if given, otherwise from the default location when it
    /// exists, otherwise fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
