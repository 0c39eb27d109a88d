//! Build-script integration.
//!
//! ```ignore
//! // build.rs
//! fn main() {
//!     woven::build::weave_crate().expect("weaving failed");
//! }
//! ```
//!
//! Woven units land under `$OUT_DIR/woven`. The crate compiles them through a
//! shim root that includes the woven crate root:
//!
//! ```ignore
//! // src/lib.rs, with `[roots] crate = "src/app"` in woven.toml
//! include!(concat!(env!("OUT_DIR"), "/woven/crate.rs"));
//! ```

use std::path::{Path, PathBuf};

use woven_core::{Config, WeaveReport};

use crate::host::{HostError, Kernel};

/// Config file names to search for, in priority order.
const CONFIG_CANDIDATES: &[&str] = &["woven.toml", ".woven.toml"];

/// Weaves the crate being built.
///
/// Reads `woven.toml` from the manifest directory (defaults when absent),
/// writes woven units to `$OUT_DIR/woven`, and asks Cargo to rerun when the
/// configuration or any loaded source changes.
///
/// # Errors
///
/// Returns an error if not run from a build script, or if configuration,
/// loading or writing fails.
pub fn weave_crate() -> Result<WeaveReport, HostError> {
    let manifest_dir = env_path("CARGO_MANIFEST_DIR")?;
    let out_dir = env_path("OUT_DIR")?;
    weave_into(&manifest_dir, &out_dir.join("woven"))
}

/// Weaves the crate at `manifest_dir` into `output_dir`.
///
/// # Errors
///
/// Returns an error if configuration, loading or writing fails.
pub fn weave_into(manifest_dir: &Path, output_dir: &Path) -> Result<WeaveReport, HostError> {
    let mut config = match find_config(manifest_dir) {
        Some(path) => {
            println!("cargo:rerun-if-changed={}", path.display());
            Config::from_file(&path)?
        }
        None => Config::default(),
    };
    config.weaver.output_dir = output_dir.to_path_buf();

    let kernel = Kernel::new(&config, manifest_dir)?;
    let report = kernel.weave_all()?;
    for unit in &report.units {
        println!("cargo:rerun-if-changed={}", unit.source.display());
    }
    Ok(report)
}

fn find_config(manifest_dir: &Path) -> Option<PathBuf> {
    CONFIG_CANDIDATES
        .iter()
        .map(|name| manifest_dir.join(name))
        .find(|path| path.is_file())
}

fn env_path(name: &'static str) -> Result<PathBuf, HostError> {
    std::env::var_os(name)
        .map(PathBuf::from)
        .ok_or(HostError::MissingEnv(name))
}
