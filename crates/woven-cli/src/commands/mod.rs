//! Subcommand implementations.

pub mod aspects;
pub mod cache;
pub mod init;
pub mod match_units;
pub mod output;
pub mod weave;

use anyhow::{Context, Result};
use std::path::Path;
use woven::{Config, Kernel};

/// Builds a kernel for the project at `path`.
fn kernel(path: &Path, config: &Config) -> Result<Kernel> {
    Kernel::new(config, path).context("Failed to build the weaving pipeline")
}

/// Loads the configuration for the project at `path`.
fn config(path: &Path, explicit: Option<&Path>) -> Result<Config> {
    crate::config_resolver::load(path, explicit)
}
