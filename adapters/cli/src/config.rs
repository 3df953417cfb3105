//! Optional TOML configuration file read at startup.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use geomerge_core::GameRules;
use serde::Deserialize;

const APP_DIRECTORY: &str = "geomerge";
const CONFIG_FILE: &str = "config.toml";

/// Radius of the map drawn by `look` when nothing else is configured.
pub(crate) const DEFAULT_VIEW_RADIUS: u32 = 5;

/// Settings loaded from the configuration file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CliConfig {
    /// Rules of new and restored sessions.
    pub(crate) rules: GameRules,
    /// Number of cells drawn around the player.
    pub(crate) view_radius: u32,
    /// File the session is saved to. Defaults to the platform data directory.
    pub(crate) save_file: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            rules: GameRules::default(),
            view_radius: DEFAULT_VIEW_RADIUS,
            save_file: None,
        }
    }
}

impl CliConfig {
    /// Parses configuration from TOML text.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("failed to parse configuration toml")?;
        config.rules.validate().context("configuration rules are invalid")?;
        Ok(config)
    }

    /// Reads configuration from `path`.
    pub(crate) fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid configuration at {}", path.display()))
    }

    /// Reads the explicit file when given, otherwise the per-user file when it
    /// exists, otherwise falls back to defaults.
    pub(crate) fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }

        match default_path() {
            Some(path) if path.is_file() => Self::from_path(&path),
            _ => Ok(Self::default()),
        }
    }
}

fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join(APP_DIRECTORY).join(CONFIG_FILE))
}
