//! Validated aspect declarations and the ordered aspect set.
//!
//! No serde and no I/O in here; everything is checked at construction.

use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::pointcut::Pointcut;

/// When advice runs relative to the rest of the invocation chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdviceKind {
    /// Before the rest of the chain.
    Before,
    /// After the rest of the chain, also while unwinding.
    After,
    /// Wraps the rest of the chain and decides whether to proceed.
    Around,
    /// Observes a panic leaving the rest of the chain.
    AfterThrowing,
}

impl AdviceKind {
    /// Name of the `Invocation` builder method registering this kind.
    #[must_use]
    pub fn builder_method(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
            Self::Around => "around",
            Self::AfterThrowing => "after_throwing",
        }
    }
}

impl fmt::Display for AdviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Before => "before",
            Self::After => "after",
            Self::Around => "around",
            Self::AfterThrowing => "after-throwing",
        })
    }
}

impl FromStr for AdviceKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            "around" => Ok(Self::Around),
            "after-throwing" | "after_throwing" => Ok(Self::AfterThrowing),
            other => Err(ModelError::UnknownAdviceKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// Path of an advice function (e.g. `crate::aspects::log_call`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdvicePath(String);

impl AdvicePath {
    /// Validates a `::` separated path of identifiers.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is empty or a segment is not an
    /// identifier.
    pub fn new(path: &str) -> Result<Self, ModelError> {
        let trimmed = path.trim();
        let body = trimmed.strip_prefix("::").unwrap_or(trimmed);
        if body.is_empty() {
            return Err(ModelError::EmptyAdvicePath);
        }
        let valid = body.split("::").all(|seg| {
            let seg = seg.strip_prefix("r#").unwrap_or(seg);
            let mut chars = seg.chars();
            chars
                .next()
                .is_some_and(|c| c.is_alphabetic() || c == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        });
        if !valid {
            return Err(ModelError::InvalidAdvicePath {
                path: path.to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AdvicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One aspect: a pointcut bound to one advice function.
#[derive(Debug, Clone)]
pub struct AspectDeclaration {
    /// Aspect name, unique within a set.
    pub name: String,
    /// Source text of the pointcut.
    pub expression: String,
    /// Parsed pointcut, shared by every unit match.
    pub pointcut: Arc<Pointcut>,
    /// Advice function path.
    pub advice: AdvicePath,
    /// Advice kind.
    pub kind: AdviceKind,
    /// Lower values wrap outside higher ones.
    pub priority: i32,
    /// Position in the configuration.
    pub order: usize,
}

impl AspectDeclaration {
    fn sort_key(&self) -> (i32, usize, &str, &str) {
        (self.priority, self.order, &self.name, self.advice.as_str())
    }
}

/// Aspects in weaving order.
///
/// Sorted by priority ascending, then declaration order, then name, then
/// advice path. The first aspect is the outermost interceptor.
#[derive(Debug, Clone, Default)]
pub struct AspectSet {
    aspects: Vec<AspectDeclaration>,
}

impl AspectSet {
    /// Builds a set, sorting aspects into weaving order.
    ///
    /// # Errors
    ///
    /// Returns every duplicate aspect name.
    pub fn new(mut aspects: Vec<AspectDeclaration>) -> Result<Self, Vec<ModelError>> {
        let mut errors = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for aspect in &aspects {
            if !seen.insert(aspect.name.as_str()) {
                errors.push(ModelError::DuplicateAspect {
                    name: aspect.name.clone(),
                });
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        aspects.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Ok(Self { aspects })
    }

    /// Iterates in weaving order.
    pub fn iter(&self) -> std::slice::Iter<'_, AspectDeclaration> {
        self.aspects.iter()
    }

    /// Number of aspects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.aspects.len()
    }

    /// Returns true if there are no aspects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aspects.is_empty()
    }

    /// Looks up an aspect by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AspectDeclaration> {
        self.aspects.iter().find(|a| a.name == name)
    }

    /// Canonical text of the set, one aspect per line in weaving order.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.aspects
            .iter()
            .map(|a| {
                format!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    a.name, a.kind, a.priority, a.order, a.advice, a.pointcut
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<'a> IntoIterator for &'a AspectSet {
    type Item = &'a AspectDeclaration;
    type IntoIter = std::slice::Iter<'a, AspectDeclaration>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// SHA-256 identity of everything that influences woven output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hashes the given parts, each terminated by a separator byte.
    #[must_use]
    pub fn of<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_ref().as_bytes());
            hasher.update([0u8]);
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// Parses a hex digest, as read back from a header or cache file.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        (hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()))
            .then(|| Self(hex.to_ascii_lowercase()))
    }

    /// Full hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 16 hex characters, used for directory names.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..16]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Domain validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Aspect name is empty.
    #[error("aspect name must not be empty")]
    EmptyAspectName,

    /// Two aspects share a name.
    #[error("duplicate aspect name `{name}`")]
    DuplicateAspect {
        /// The repeated name.
        name: String,
    },

    /// Advice path is empty.
    #[error("advice path must not be empty")]
    EmptyAdvicePath,

    /// Advice path is not a path of identifiers.
    #[error("invalid advice path `{path}`")]
    InvalidAdvicePath {
        /// The invalid path.
        path: String,
    },

    /// Unknown advice kind.
    #[error("unknown advice kind `{kind}`, expected: before, after, around, after-throwing")]
    UnknownAdviceKind {
        /// The invalid kind.
        kind: String,
    },
}
