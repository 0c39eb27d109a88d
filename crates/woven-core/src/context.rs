//! Per-unit context handed to transformers, and span → byte offset mapping.

use std::path::PathBuf;

use crate::aspect::Fingerprint;
use crate::types::{ByteSpan, UnitId, UnitLocation};

/// Context provided to every transformer in the chain.
#[derive(Debug, Clone)]
pub struct UnitContext<'a> {
    /// Unit being transformed.
    pub unit: &'a UnitId,
    /// Where the unit's source was read from.
    pub location: &'a UnitLocation,
    /// Source path relative to its library root.
    pub relative_path: PathBuf,
    /// Fingerprint of the chain the unit is transformed by.
    pub fingerprint: &'a Fingerprint,
}

impl<'a> UnitContext<'a> {
    /// Creates a new unit context.
    #[must_use]
    pub fn new(
        unit: &'a UnitId,
        location: &'a UnitLocation,
        fingerprint: &'a Fingerprint,
    ) -> Self {
        Self {
            unit,
            location,
            relative_path: location.relative_path(),
            fingerprint,
        }
    }

    /// Path to report for the original source, always `/` separated.
    #[must_use]
    pub fn display_path(&self) -> String {
        self.relative_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Maps `proc-macro2` line/column positions back to byte offsets.
///
/// Lines are 1-indexed and columns count UTF-8 characters, as reported by
/// `proc-macro2` with `span-locations`. A leading byte order mark is skipped
/// by `syn::parse_file`, so positions are taken relative to the text after it.
#[derive(Debug, Clone)]
pub struct LineIndex<'t> {
    body: &'t str,
    base: usize,
    line_starts: Vec<usize>,
}

const BOM: &str = "\u{feff}";

impl<'t> LineIndex<'t> {
    /// Indexes `text`.
    #[must_use]
    pub fn new(text: &'t str) -> Self {
        let (base, body) = match text.strip_prefix(BOM) {
            Some(rest) => (BOM.len(), rest),
            None => (0, text),
        };
        let line_starts = std::iter::once(0)
            .chain(body.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            body,
            base,
            line_starts,
        }
    }

    /// Byte offset of a 1-indexed line and 0-indexed character column.
    ///
    /// Columns past the end of the line clamp to the line end.
    #[must_use]
    pub fn offset(&self, line: usize, column: usize) -> Option<usize> {
        let start = *self.line_starts.get(line.checked_sub(1)?)?;
        let end = self
            .line_starts
            .get(line)
            .copied()
            .unwrap_or(self.body.len());
        let line_text = &self.body[start..end];
        let within = line_text
            .char_indices()
            .nth(column)
            .map_or(line_text.len(), |(i, _)| i);
        Some(self.base + start + within)
    }

    /// Converts a span produced while parsing the indexed text.
    #[must_use]
    pub fn span(&self, span: proc_macro2::Span) -> Option<ByteSpan> {
        let start = span.start();
        let end = span.end();
        Some(ByteSpan::new(
            self.offset(start.line, start.column)?,
            self.offset(end.line, end.column)?,
        ))
    }

    /// Byte offset of a span's start.
    #[must_use]
    pub fn start_of(&self, span: proc_macro2::Span) -> Option<usize> {
        let start = span.start();
        self.offset(start.line, start.column)
    }

    /// Byte offset of a span's end.
    #[must_use]
    pub fn end_of(&self, span: proc_macro2::Span) -> Option<usize> {
        let end = span.end();
        self.offset(end.line, end.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_calculation() {
        let index = LineIndex::new("line1\nline2\nline3");
        assert_eq!(index.offset(1, 0), Some(0));
        assert_eq!(index.offset(2, 0), Some(6));
        assert_eq!(index.offset(2, 2), Some(8));
        assert_eq!(index.offset(3, 5), Some(17));
        assert_eq!(index.offset(4, 0), None);
        assert_eq!(index.offset(0, 0), None);
    }

    #[test]
    fn columns_count_characters() {
        let index = LineIndex::new("// é\nfn x() {}");
        // `é` is two bytes but one column.
        assert_eq!(index.offset(1, 4), Some(5));
        assert_eq!(index.offset(2, 3), Some(9));
    }

    #[test]
    fn byte_order_mark_is_skipped() {
        let index = LineIndex::new("\u{feff}fn x() {}");
        assert_eq!(index.offset(1, 0), Some(3));
    }

    #[test]
    fn span_round_trips_through_syn() {
        let text = "struct A;\nimpl A {\n    fn go(&self) {}\n}\n";
        let file = syn::parse_file(text).unwrap();
        let syn::Item::Impl(item) = &file.items[1] else {
            panic!("expected impl");
        };
        let syn::ImplItem::Fn(f) = &item.items[0] else {
            panic!("expected fn");
        };
        let index = LineIndex::new(text);
        let ident = index.span(f.sig.ident.span()).unwrap();
        assert_eq!(ident.slice(text), Some("go"));
    }

    #[test]
    fn display_path_uses_forward_slashes() {
        let unit = UnitId::parse("crate::billing").unwrap();
        let location = UnitLocation::new("/p/src/billing/mod.rs", "/p/src");
        let fingerprint = Fingerprint::of(["test"]);
        let ctx = UnitContext::new(&unit, &location, &fingerprint);
        assert_eq!(ctx.display_path(), "billing/mod.rs");
    }
}
