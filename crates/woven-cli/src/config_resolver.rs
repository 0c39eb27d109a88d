//! Locating and loading `woven.toml`.
//!
//! Lookup order:
//!
//! 1. `--config <file>`
//! 2. `woven.toml`, then `.woven.toml`, in the project directory
//! 3. `config.toml` in `$WOVEN_CONFIG_DIR`, else in `~/.woven/`
//! 4. built-in defaults

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use woven::Config;

/// Where the configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Passed with `--config`.
    Explicit(PathBuf),
    /// Found in the project directory.
    Project(PathBuf),
    /// Found in the user-wide directory.
    Global(PathBuf),
    /// Nothing found.
    Default,
}

impl ConfigSource {
    /// Returns the file, if there is one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::Global(p) => Some(p),
            Self::Default => None,
        }
    }
}

const PROJECT_FILES: &[&str] = &["woven.toml", ".woven.toml"];

const GLOBAL_FILE: &str = "config.toml";

/// Finds the configuration for `project_dir`.
#[must_use]
pub fn resolve(project_dir: &Path, explicit: Option<&Path>) -> ConfigSource {
    lookup(project_dir, explicit, global_dir().as_deref())
}

/// Finds and parses the configuration for `project_dir`.
pub fn load(project_dir: &Path, explicit: Option<&Path>) -> Result<Config> {
    let source = resolve(project_dir, explicit);
    let Some(path) = source.path() else {
        tracing::debug!("No woven.toml found, using defaults");
        return Ok(Config::default());
    };
    if matches!(source, ConfigSource::Global(_)) {
        tracing::info!("Using global config: {}", path.display());
    }
    Config::from_file(path).with_context(|| format!("Failed to load config: {}", path.display()))
}

fn lookup(project_dir: &Path, explicit: Option<&Path>, global: Option<&Path>) -> ConfigSource {
    if let Some(p) = explicit {
        return ConfigSource::Explicit(p.to_path_buf());
    }

    if let Some(found) = PROJECT_FILES
        .iter()
        .map(|name| project_dir.join(name))
        .find(|p| p.is_file())
    {
        tracing::debug!("Found project config: {}", found.display());
        return ConfigSource::Project(found);
    }

    global
        .map(|dir| dir.join(GLOBAL_FILE))
        .filter(|p| p.is_file())
        .map_or(ConfigSource::Default, ConfigSource::Global)
}

/// `$WOVEN_CONFIG_DIR`, else `~/.woven`.
fn global_dir() -> Option<PathBuf> {
    std::env::var_os("WOVEN_CONFIG_DIR")
        .map(PathBuf::from)
        .or_else(|| home::home_dir().map(|h| h.join(".woven")))
}
