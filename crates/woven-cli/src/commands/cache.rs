//! Cache command implementation.

use anyhow::{Context, Result};
use std::path::Path;

/// Removes every entry from the configured cache.
pub fn clear(path: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = super::config(path, config_path)?;
    let Some(dir) = &config.weaver.cache_dir else {
        println!("No cache_dir configured; the cache lives in memory only.");
        return Ok(());
    };

    super::kernel(path, &config)?
        .clear_cache()
        .context("Failed to clear the cache")?;
    println!("Cleared {}", dir.display());
    Ok(())
}
