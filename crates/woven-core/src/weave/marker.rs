//! The trailing header comment and the per-member marker attribute.
//!
//! A woven unit ends with:
//! ```text
//! // @woven v0.3.0 aspects=<sha256>
//! ```
//! The header goes after the last line so no line of the original moves.

use crate::aspect::Fingerprint;
use crate::WEAVER_VERSION;

const HEADER_PREFIX: &str = "// @woven v";
const FINGERPRINT_KEY: &str = " aspects=";

/// A parsed unit header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Weaver version that wrote the unit.
    pub version: String,
    /// Fingerprint of the configuration the unit was woven under.
    pub fingerprint: Fingerprint,
}

impl Header {
    /// Returns true if the header was written by this weaver under `fingerprint`.
    #[must_use]
    pub fn is_current(&self, fingerprint: &Fingerprint) -> bool {
        self.version == WEAVER_VERSION && &self.fingerprint == fingerprint
    }
}

/// Renders the header line, without a newline.
#[must_use]
pub fn header_line(fingerprint: &Fingerprint) -> String {
    format!("{HEADER_PREFIX}{WEAVER_VERSION}{FINGERPRINT_KEY}{fingerprint}")
}

/// Finds the header on the last non-blank line.
#[must_use]
pub fn find_header(text: &str) -> Option<Header> {
    let last = text.lines().rev().find(|line| !line.trim().is_empty())?;
    let rest = last.trim().strip_prefix(HEADER_PREFIX)?;
    let (version, fingerprint) = rest.split_once(FINGERPRINT_KEY)?;
    Some(Header {
        version: version.to_string(),
        fingerprint: Fingerprint::from_hex(fingerprint.trim())?,
    })
}

/// Appends the header as a new last line.
pub fn append_header(text: &mut String, fingerprint: &Fingerprint) {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(&header_line(fingerprint));
    text.push('\n');
}

/// The attribute text inserted before a woven member.
#[must_use]
pub fn marker_attribute(marker: &str) -> String {
    format!("#[{marker}]")
}

/// Counts woven members by their marker attribute.
#[must_use]
pub fn count_markers(text: &str, marker: &str) -> usize {
    text.matches(&marker_attribute(marker)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp() -> Fingerprint {
        Fingerprint::of(["aspects"])
    }

    #[test]
    fn header_round_trip() {
        let mut text = "fn main() {}".to_string();
        append_header(&mut text, &fp());
        assert!(text.starts_with("fn main() {}\n// @woven v"));
        let header = find_header(&text).unwrap();
        assert!(header.is_current(&fp()));
        assert!(!header.is_current(&Fingerprint::of(["other"])));
    }

    #[test]
    fn header_must_be_last() {
        let text = format!("{}\nfn main() {{}}\n", header_line(&fp()));
        assert_eq!(find_header(&text), None);
        let text = format!("fn main() {{}}\n{}\n\n", header_line(&fp()));
        assert!(find_header(&text).is_some());
    }

    #[test]
    fn malformed_header_is_ignored() {
        assert_eq!(find_header("// @woven v1 aspects=zz\n"), None);
        assert_eq!(find_header("// @woven\n"), None);
    }

    #[test]
    fn counts_markers() {
        let text = "#[::woven::advised] fn a() {}\n#[::woven::advised] fn b() {}\n";
        assert_eq!(count_markers(text, "::woven::advised"), 2);
        assert_eq!(count_markers(text, "other"), 0);
    }
}
