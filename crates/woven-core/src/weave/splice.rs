//! Span-addressed rewriting.
//!
//! A rewrite is a set of edits over the original text, applied in a single
//! pass in order of their start offset. Bytes outside every edit are copied
//! verbatim and each edited range is replaced exactly once.

use std::fmt;

use crate::types::ByteSpan;

/// Replace `span` with `text`. An empty span is an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Range of the original text to replace.
    pub span: ByteSpan,
    /// Replacement text.
    pub text: String,
}

impl Edit {
    /// Inserts `text` at `offset`.
    #[must_use]
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self {
            span: ByteSpan::at(offset),
            text: text.into(),
        }
    }

    /// Replaces `span` with `text`.
    #[must_use]
    pub fn replace(span: ByteSpan, text: impl Into<String>) -> Self {
        Self {
            span,
            text: text.into(),
        }
    }
}

/// Edits that cannot be applied together.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpliceError {
    /// Two edits cover overlapping bytes.
    #[error("edits {first} and {second} overlap")]
    Overlap {
        /// The earlier edit.
        first: ByteSpan,
        /// The later edit.
        second: ByteSpan,
    },

    /// An edit lies outside the text or splits a character.
    #[error("edit {span} is out of bounds for {len} bytes")]
    OutOfBounds {
        /// The offending edit.
        span: ByteSpan,
        /// Length of the text.
        len: usize,
    },
}

/// Applies `edits` to `text`.
///
/// Insertions at the same offset keep the order they were given in. An
/// insertion at the start of a replaced range goes before the replacement.
///
/// # Errors
///
/// Returns an error if two edits overlap or an edit is out of bounds.
pub fn apply(text: &str, mut edits: Vec<Edit>) -> Result<String, SpliceError> {
    // Stable sort: equal starts keep caller order, insertions first.
    edits.sort_by_key(|e| (e.span.start, !e.span.is_empty()));

    let extra: usize = edits.iter().map(|e| e.text.len()).sum();
    let mut out = String::with_capacity(text.len() + extra);
    let mut cursor = 0;
    let mut previous: Option<ByteSpan> = None;

    for edit in &edits {
        let span = edit.span;
        if span.start > span.end
            || span.end > text.len()
            || !text.is_char_boundary(span.start)
            || !text.is_char_boundary(span.end)
        {
            return Err(SpliceError::OutOfBounds {
                span,
                len: text.len(),
            });
        }
        if span.start < cursor {
            return Err(SpliceError::Overlap {
                first: previous.unwrap_or(span),
                second: span,
            });
        }

        out.push_str(&text[cursor..span.start]);
        out.push_str(&edit.text);
        cursor = span.end;
        previous = Some(span);
    }

    out.push_str(&text[cursor..]);
    Ok(out)
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {:?}", self.span, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_edits_is_identity() {
        assert_eq!(apply("fn a() {}", Vec::new()).unwrap(), "fn a() {}");
    }

    #[test]
    fn applies_in_start_order() {
        let text = "fn a() { 1 }";
        let edits = vec![
            Edit::replace(ByteSpan::new(7, 12), "{ 2 }"),
            Edit::insert(0, "#[x] "),
        ];
        assert_eq!(apply(text, edits).unwrap(), "#[x] fn a() { 2 }");
    }

    #[test]
    fn insertions_at_same_offset_keep_order() {
        let edits = vec![Edit::insert(0, "a"), Edit::insert(0, "b")];
        assert_eq!(apply("c", edits).unwrap(), "abc");
    }

    #[test]
    fn insertion_goes_before_replacement_at_same_offset() {
        let edits = vec![
            Edit::replace(ByteSpan::new(0, 1), "X"),
            Edit::insert(0, "<"),
        ];
        assert_eq!(apply("ab", edits).unwrap(), "<Xb");
    }

    #[test]
    fn overlapping_edits_are_rejected() {
        let edits = vec![
            Edit::replace(ByteSpan::new(0, 5), ""),
            Edit::replace(ByteSpan::new(3, 7), ""),
        ];
        assert_eq!(
            apply("0123456789", edits),
            Err(SpliceError::Overlap {
                first: ByteSpan::new(0, 5),
                second: ByteSpan::new(3, 7),
            })
        );
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let edits = vec![Edit::insert(10, "x")];
        assert!(matches!(
            apply("short", edits),
            Err(SpliceError::OutOfBounds { .. })
        ));
        // Inside the two bytes of `é`.
        let edits = vec![Edit::insert(1, "x")];
        assert!(apply("é", edits).is_err());
    }
}
