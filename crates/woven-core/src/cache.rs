//! Woven output cache.
//!
//! Entries are keyed by unit id, source modification time, weaver version
//! and chain fingerprint. An entry whose key does not match the request is
//! a miss, never an error. Entries are replaced whole and never mutated in
//! place, so concurrent readers see either the old or the new text.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::aspect::Fingerprint;
use crate::types::UnitId;

/// Identity of a cached unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// The unit.
    pub unit: UnitId,
    /// Source modification time, nanoseconds since the epoch.
    pub modified: u128,
    /// Weaver version that produced the entry.
    pub weaver_version: String,
    /// Chain fingerprint.
    pub fingerprint: Fingerprint,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unit={} modified={} version={} fingerprint={}",
            self.unit, self.modified, self.weaver_version, self.fingerprint
        )
    }
}

/// Cache errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Filesystem failure.
    #[error("cache IO error at {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

/// Storage for woven unit text.
pub trait CacheStore: Send + Sync {
    /// Returns the cached text for `key`, or `None` on a miss.
    fn get(&self, key: &CacheKey) -> Option<String>;

    /// Stores `text` for `key`, replacing any entry for the same unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be written.
    fn put(&self, key: &CacheKey, text: &str) -> Result<(), CacheError>;

    /// Removes every entry.
    ///
    /// # Errors
    ///
    /// Returns an error if entries cannot be removed.
    fn clear(&self) -> Result<(), CacheError>;
}

/// In-process cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<UnitId, (CacheKey, Arc<str>)>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<String> {
        let entries = self.entries.read();
        let (stored, text) = entries.get(&key.unit)?;
        (stored == key).then(|| text.to_string())
    }

    fn put(&self, key: &CacheKey, text: &str) -> Result<(), CacheError> {
        self.entries
            .write()
            .insert(key.unit.clone(), (key.clone(), Arc::from(text)));
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.entries.write().clear();
        Ok(())
    }
}

const KEY_PREFIX: &str = "// woven-cache ";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// On-disk cache, safe to delete at any time.
///
/// Layout: `<dir>/<fingerprint16>/<unit>.rs`, where the unit's `::` become
/// dots. The first line of each file holds the full key.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Creates a cache rooted at `dir`; nothing is created until a write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the entry for `key`.
    #[must_use]
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir
            .join(key.fingerprint.short())
            .join(format!("{}.rs", key.unit.as_str().replace("::", ".")))
    }
}

impl CacheStore for FileCache {
    fn get(&self, key: &CacheKey) -> Option<String> {
        let path = self.entry_path(key);
        let content = std::fs::read_to_string(&path).ok()?;
        let (header, text) = content.split_once('\n')?;
        if header.strip_prefix(KEY_PREFIX) == Some(key.to_string().as_str()) {
            Some(text.to_string())
        } else {
            debug!(unit = %key.unit, path = %path.display(), "stale cache entry");
            None
        }
    }

    fn put(&self, key: &CacheKey, text: &str) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        let io = |path: &Path| {
            let path = path.to_path_buf();
            move |source| CacheError::Io { path, source }
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io(parent))?;
        }

        let temp = path.with_extension(format!(
            "{}.{}.tmp",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::write(&temp, format!("{KEY_PREFIX}{key}\n{text}")).map_err(io(&temp))?;
        std::fs::rename(&temp, &path).map_err(|source| {
            let _ = std::fs::remove_file(&temp);
            CacheError::Io {
                path: path.clone(),
                source,
            }
        })
    }

    fn clear(&self) -> Result<(), CacheError> {
        match std::fs::remove_dir_all(&self.dir) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(CacheError::Io {
                path: self.dir.clone(),
                source: e,
            }),
            _ => Ok(()),
        }
    }
}
