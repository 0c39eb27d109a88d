//! Errors raised while loading and weaving a unit.
//!
//! Every error here is local to the unit being loaded: the load fails, no
//! cache entry is written, and other units are unaffected.

use miette::{Diagnostic, SourceSpan};
use std::path::PathBuf;

use crate::types::UnitId;
use crate::weave::splice::SpliceError;

/// A unit whose text `syn` could not parse.
#[derive(Debug, Clone, thiserror::Error, Diagnostic)]
#[error("{message} (line {line}, column {column})")]
#[diagnostic(code(woven::malformed_source))]
pub struct MalformedSource {
    /// Parser message.
    pub message: String,
    /// 1-indexed line of the error.
    pub line: usize,
    /// 1-indexed column of the error.
    pub column: usize,
    #[source_code]
    source_code: String,
    #[label("{message}")]
    span: SourceSpan,
}

impl MalformedSource {
    /// Creates the error from a `syn` parse failure over `text`.
    #[must_use]
    pub fn from_syn(error: &syn::Error, text: &str) -> Self {
        let start = error.span().start();
        let index = crate::context::LineIndex::new(text);
        let offset = index.offset(start.line, start.column).unwrap_or(0);
        Self {
            message: error.to_string(),
            line: start.line,
            column: start.column + 1,
            source_code: text.to_string(),
            span: SourceSpan::from((offset, 0)),
        }
    }

    /// Byte offset the error points at.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.span.offset()
    }
}

/// Errors that abort the load of a single unit.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum WeaveError {
    /// The resolver could not locate the unit.
    #[error("unit `{unit}` not found: {reason}")]
    #[diagnostic(code(woven::unit_not_found))]
    UnitNotFound {
        /// The requested unit.
        unit: UnitId,
        /// Why it could not be located.
        reason: String,
    },

    /// The unit's text could not be structurally parsed.
    #[error("malformed source in `{unit}`")]
    #[diagnostic(code(woven::malformed_source))]
    MalformedSource {
        /// The unit being woven.
        unit: UnitId,
        /// Parse failure details.
        #[source]
        #[diagnostic_source]
        source: MalformedSource,
    },

    /// Reading the unit's source failed.
    #[error("failed to read {path}: {source}")]
    #[diagnostic(code(woven::io))]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Generated edits overlapped; nothing is emitted for the unit.
    #[error("cannot splice `{unit}`: {source}")]
    #[diagnostic(code(woven::splice))]
    Splice {
        /// The unit being woven.
        unit: UnitId,
        /// The conflicting edits.
        source: SpliceError,
    },

    /// A host-supplied transformer rejected the unit.
    #[error("transformer `{transformer}` failed on `{unit}`: {message}")]
    #[diagnostic(code(woven::transform))]
    Transform {
        /// Transformer name.
        transformer: String,
        /// The unit being woven.
        unit: UnitId,
        /// Failure message.
        message: String,
    },
}

impl WeaveError {
    /// Wraps a parse failure for `unit`.
    #[must_use]
    pub fn malformed(unit: &UnitId, source: MalformedSource) -> Self {
        Self::MalformedSource {
            unit: unit.clone(),
            source,
        }
    }

    /// Returns the unit this error is about, if known.
    #[must_use]
    pub fn unit(&self) -> Option<&UnitId> {
        match self {
            Self::UnitNotFound { unit, .. }
            | Self::MalformedSource { unit, .. }
            | Self::Splice { unit, .. }
            | Self::Transform { unit, .. } => Some(unit),
            Self::Io { .. } => None,
        }
    }
}
