//! Match command implementation.

use anyhow::Result;
use std::path::Path;

use crate::OutputFormat;

/// Runs the match command.
///
/// Units that fail to parse are reported and skipped.
pub fn run(path: &Path, format: OutputFormat, config_path: Option<&Path>) -> Result<()> {
    let config = super::config(path, config_path)?;
    let kernel = super::kernel(path, &config)?;

    let units = kernel.resolver().units();
    tracing::info!("Matching {} unit(s)", units.len());

    let mut joins = Vec::new();
    for unit in &units {
        if kernel.interceptor().is_exempt(unit) {
            tracing::debug!("Skipping exempt unit {unit}");
            continue;
        }
        match kernel.match_unit(unit) {
            Ok(found) => joins.extend(found),
            Err(e) => tracing::warn!("{unit}: {e}"),
        }
    }

    super::output::print_joins(&joins, format)
}
