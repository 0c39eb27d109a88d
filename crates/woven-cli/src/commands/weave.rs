//! Weave command implementation.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use woven::{HostError, UnitId};

use crate::OutputFormat;

/// Runs the weave command.
pub fn run(
    path: &Path,
    unit: Option<&str>,
    out: Option<PathBuf>,
    format: OutputFormat,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = super::config(path, config_path)?;
    if let Some(out) = out {
        config.weaver.output_dir = out;
    }
    let kernel = super::kernel(path, &config)?;

    tracing::info!(
        "Weaving {} with {} aspect(s)",
        path.display(),
        kernel.aspects().len()
    );

    let result = match unit {
        Some(unit) => {
            let unit = UnitId::parse(unit).with_context(|| format!("Invalid unit: {unit}"))?;
            kernel.weave_tree(&unit)
        }
        None => kernel.weave_all(),
    };
    let report = match result {
        Ok(report) => report,
        Err(HostError::Weave(e)) => {
            eprintln!("{:?}", miette::Report::new(e));
            bail!("Weaving failed");
        }
        Err(e) => return Err(e).context("Weaving failed"),
    };

    super::output::print_weave(&report, format)
}
