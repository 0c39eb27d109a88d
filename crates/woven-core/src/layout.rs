//! Where woven units are written.
//!
//! Each unit gets its own file so nested modules can point at it with an
//! absolute `#[path]`:
//!
//! ```text
//! <root>/crate.rs
//! <root>/crate/billing.rs
//! <root>/crate/billing/invoice.rs
//! ```

use std::path::{Path, PathBuf};

use crate::types::UnitId;

/// Maps unit ids to woven output files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    /// Creates a layout under `root`, which should be absolute.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the output root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Output file for `unit`.
    #[must_use]
    pub fn path_for(&self, unit: &UnitId) -> PathBuf {
        let mut path = self.root.clone();
        let segments: Vec<&str> = unit.segments().collect();
        if let Some((last, dirs)) = segments.split_last() {
            for dir in dirs {
                path.push(dir);
            }
            path.push(format!("{last}.rs"));
        }
        path
    }

    /// The unit whose output file is `path`, if it lies under the root.
    #[must_use]
    pub fn unit_for(&self, path: &Path) -> Option<UnitId> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let last = segments.pop()?;
        segments.push(last.strip_suffix(".rs")?.to_string());
        UnitId::parse(&segments.join("::")).ok()
    }
}
