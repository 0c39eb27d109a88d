//! Core value types shared by every pipeline stage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Transformed or raw source text of one unit.
pub type SourceText = String;

/// Fully qualified module path identifying a unit (e.g. `crate::billing`).
///
/// Segments are plain identifiers; raw identifiers are stored without `r#`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UnitId(String);

impl UnitId {
    /// The crate root unit.
    pub const ROOT: &'static str = "crate";

    /// Parses a `::` separated module path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is empty or a segment is not an identifier.
    pub fn parse(path: &str) -> Result<Self, UnitIdError> {
        let path = path.trim().trim_start_matches("::");
        if path.is_empty() {
            return Err(UnitIdError::Empty);
        }
        for segment in path.split("::") {
            if !is_identifier(segment) {
                return Err(UnitIdError::InvalidSegment {
                    path: path.to_string(),
                    segment: segment.to_string(),
                });
            }
        }
        Ok(Self(path.to_string()))
    }

    /// Returns the crate root unit `crate`.
    #[must_use]
    pub fn root() -> Self {
        Self(Self::ROOT.to_string())
    }

    /// Returns the unit for a module declared inside this one.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        let name = name.strip_prefix("r#").unwrap_or(name);
        Self(format!("{}::{name}", self.0))
    }

    /// Returns the enclosing unit, if any.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0
            .rsplit_once("::")
            .map(|(parent, _)| Self(parent.to_string()))
    }

    /// Returns the last segment.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.rsplit("::").next().unwrap_or(&self.0)
    }

    /// Iterates over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split("::")
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derives a unit id from a file path relative to a source root.
    ///
    /// `billing/invoice.rs` → `<crate>::billing::invoice`, `billing/mod.rs` →
    /// `<crate>::billing`, `lib.rs` and `main.rs` → `<crate>`.
    #[must_use]
    pub fn from_relative_path(relative_path: &Path, crate_name: &str) -> Option<Self> {
        if relative_path.extension().and_then(|e| e.to_str()) != Some("rs") {
            return None;
        }

        let mut parts: Vec<String> = relative_path
            .with_extension("")
            .components()
            .filter_map(|c| {
                if let Component::Normal(s) = c {
                    s.to_str().map(String::from)
                } else {
                    None
                }
            })
            .collect();

        if let Some(last) = parts.last() {
            if last == "mod" || (parts.len() == 1 && (last == "lib" || last == "main")) {
                parts.pop();
            }
        }

        parts.insert(0, crate_name.to_string());
        Self::parse(&parts.join("::")).ok()
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UnitId {
    type Error = UnitIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UnitId> for String {
    fn from(id: UnitId) -> Self {
        id.0
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    segment != "_" && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Invalid unit id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitIdError {
    /// Empty path.
    #[error("unit id must not be empty")]
    Empty,

    /// A segment is not an identifier.
    #[error("invalid unit id `{path}`: `{segment}` is not an identifier")]
    InvalidSegment {
        /// The full path.
        path: String,
        /// The offending segment.
        segment: String,
    },
}

/// Where a unit's source lives, as reported by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitLocation {
    /// Absolute path of the source file.
    pub path: PathBuf,
    /// Library root the file was found under.
    pub root: PathBuf,
}

impl UnitLocation {
    /// Creates a new location.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            root: root.into(),
        }
    }

    /// Path relative to the library root, or the full path if outside it.
    #[must_use]
    pub fn relative_path(&self) -> PathBuf {
        self.path
            .strip_prefix(&self.root)
            .map_or_else(|_| self.path.clone(), Path::to_path_buf)
    }
}

/// A unit's raw source as read from its location.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// Unit identifier.
    pub id: UnitId,
    /// Resolved location.
    pub location: UnitLocation,
    /// Raw source text.
    pub text: SourceText,
    /// Last-modified time of the source file.
    pub modified: SystemTime,
}

impl SourceUnit {
    /// Last-modified time as nanoseconds since the Unix epoch.
    #[must_use]
    pub fn modified_nanos(&self) -> u128 {
        self.modified
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos())
    }
}

/// Half-open byte range `[start, end)` into a unit's source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ByteSpan {
    /// Start offset (inclusive).
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
}

impl ByteSpan {
    /// Creates a span.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Creates an empty span at `offset`, used for insertions.
    #[must_use]
    pub fn at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns true for an empty span.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the covered text, if the span is valid for `text`.
    #[must_use]
    pub fn slice<'t>(&self, text: &'t str) -> Option<&'t str> {
        text.get(self.start..self.end)
    }

    /// Returns true if `other` lies entirely within this span.
    #[must_use]
    pub fn contains(&self, other: ByteSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for ByteSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_module_paths() {
        let id = UnitId::parse("crate::billing::invoice").unwrap();
        assert_eq!(id.name(), "invoice");
        assert_eq!(id.parent().unwrap().as_str(), "crate::billing");
        assert_eq!(id.segments().count(), 3);
    }

    #[test]
    fn parse_strips_leading_colons() {
        assert_eq!(UnitId::parse("::crate::a").unwrap().as_str(), "crate::a");
    }

    #[test]
    fn parse_rejects_bad_segments() {
        assert_eq!(UnitId::parse(""), Err(UnitIdError::Empty));
        assert!(matches!(
            UnitId::parse("crate::9lives"),
            Err(UnitIdError::InvalidSegment { .. })
        ));
        assert!(UnitId::parse("crate::a-b").is_err());
        assert!(UnitId::parse("crate::::a").is_err());
    }

    #[test]
    fn child_strips_raw_prefix() {
        assert_eq!(UnitId::root().child("r#type").as_str(), "crate::type");
    }

    #[test]
    fn from_relative_path_follows_module_conventions() {
        let id = |p: &str| UnitId::from_relative_path(Path::new(p), "crate").map(String::from);
        assert_eq!(id("lib.rs").as_deref(), Some("crate"));
        assert_eq!(id("main.rs").as_deref(), Some("crate"));
        assert_eq!(id("billing.rs").as_deref(), Some("crate::billing"));
        assert_eq!(id("billing/mod.rs").as_deref(), Some("crate::billing"));
        assert_eq!(
            id("billing/invoice.rs").as_deref(),
            Some("crate::billing::invoice")
        );
        assert_eq!(id("billing/lib.rs").as_deref(), Some("crate::billing::lib"));
        assert_eq!(id("README.md"), None);
    }

    #[test]
    fn relative_location() {
        let loc = UnitLocation::new("/p/src/billing.rs", "/p/src");
        assert_eq!(loc.relative_path(), PathBuf::from("billing.rs"));
    }

    #[test]
    fn byte_span_slices() {
        let span = ByteSpan::new(4, 9);
        assert_eq!(span.slice("pub fn save()"), Some("fn sa"));
        assert!(ByteSpan::new(0, 20).contains(span));
        assert!(ByteSpan::at(3).is_empty());
    }
}
