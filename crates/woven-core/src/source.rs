//! Host seams for locating and reading unit source.

use std::time::SystemTime;

use crate::error::WeaveError;
use crate::types::{SourceUnit, UnitId, UnitLocation};

/// Maps a unit id to the file it is defined in.
pub trait UnitResolver: Send + Sync {
    /// Locates `unit`.
    ///
    /// # Errors
    ///
    /// Returns [`WeaveError::UnitNotFound`] if the unit has no source file.
    fn resolve(&self, unit: &UnitId) -> Result<UnitLocation, WeaveError>;
}

/// Reads a located unit.
pub trait SourceReader: Send + Sync {
    /// Reads the text and modification time at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`WeaveError::Io`] if the file cannot be read.
    fn read(&self, unit: &UnitId, location: &UnitLocation) -> Result<SourceUnit, WeaveError>;
}

/// Reads units from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSourceReader;

impl SourceReader for FsSourceReader {
    fn read(&self, unit: &UnitId, location: &UnitLocation) -> Result<SourceUnit, WeaveError> {
        let io = |source| WeaveError::Io {
            path: location.path.clone(),
            source,
        };
        let text = std::fs::read_to_string(&location.path).map_err(io)?;
        let modified = std::fs::metadata(&location.path)
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        Ok(SourceUnit {
            id: unit.clone(),
            location: location.clone(),
            text,
            modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_text_and_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.rs");
        std::fs::write(&path, "pub fn f() {}\n").unwrap();
        let unit = FsSourceReader
            .read(&UnitId::root(), &UnitLocation::new(&path, dir.path()))
            .unwrap();
        assert_eq!(unit.text, "pub fn f() {}\n");
        assert!(unit.modified_nanos() > 0);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = FsSourceReader
            .read(&UnitId::root(), &UnitLocation::new("/no/such/lib.rs", "/no/such"))
            .unwrap_err();
        assert!(matches!(err, WeaveError::Io { .. }));
    }
}
