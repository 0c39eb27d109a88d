//! Name, type and module-path patterns used by pointcut predicates.
//!
//! Every pattern is compiled once when the pointcut is parsed and reused for
//! every unit.

use std::fmt;

use super::PointcutEvalError;
use crate::reflect::attributes::normalize_tokens;

/// Glob or regular expression over a single name.
///
/// `/.../` selects a regex, anything else is a glob (`*`, `?`, `[..]`).
#[derive(Debug, Clone)]
pub enum NamePattern {
    /// Shell-style glob.
    Glob {
        /// Pattern text.
        raw: String,
        /// Compiled pattern.
        compiled: glob::Pattern,
    },
    /// Regular expression, unanchored unless the pattern anchors itself.
    Regex(regex::Regex),
}

impl NamePattern {
    /// Compiles a name pattern.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty pattern or invalid glob/regex syntax.
    pub fn new(pattern: &str) -> Result<Self, PointcutEvalError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(invalid(pattern, "pattern is empty"));
        }
        if let Some(body) = pattern
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
        {
            let regex = regex::Regex::new(body).map_err(|e| invalid(pattern, &e.to_string()))?;
            return Ok(Self::Regex(regex));
        }
        let compiled = glob::Pattern::new(pattern).map_err(|e| invalid(pattern, &e.to_string()))?;
        Ok(Self::Glob {
            raw: pattern.to_string(),
            compiled,
        })
    }

    /// Tests a name.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Glob { compiled, .. } => compiled.matches(name),
            Self::Regex(regex) => regex.is_match(name),
        }
    }

    /// Returns true if the pattern is the bare `*` wildcard.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Glob { raw, .. } if raw == "*")
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Glob { raw, .. } => f.write_str(raw),
            Self::Regex(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

/// Glob over normalised type text (`&str`, `Vec<*>`, `Result<*, Error>`).
///
/// Square brackets are literal so slice types can be written directly.
#[derive(Debug, Clone, PartialEq)]
pub struct TypePattern {
    raw: String,
    compiled: glob::Pattern,
}

impl TypePattern {
    /// Compiles a type pattern.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty pattern.
    pub fn new(pattern: &str) -> Result<Self, PointcutEvalError> {
        let normalized = normalize_tokens(pattern);
        if normalized.is_empty() {
            return Err(invalid(pattern, "type pattern is empty"));
        }
        let compiled = glob::Pattern::new(&escape_brackets(&normalized))
            .map_err(|e| invalid(pattern, &e.to_string()))?;
        Ok(Self {
            raw: normalized,
            compiled,
        })
    }

    /// Tests normalised type text.
    #[must_use]
    pub fn matches(&self, ty: &str) -> bool {
        self.compiled.matches(ty)
    }
}

impl fmt::Display for TypePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn escape_brackets(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '[' => out.push_str("[[]"),
            ']' => out.push_str("[]]"),
            other => out.push(other),
        }
    }
    out
}

/// One segment of a [`ModulePattern`].
#[derive(Debug, Clone)]
enum Segment {
    /// `*`: exactly one segment.
    One,
    /// `**`: any number of segments.
    Any,
    /// Literal identifier.
    Literal(String),
    /// Segment-level glob such as `bill*`.
    Glob(glob::Pattern),
}

/// `::` separated path pattern.
///
/// `*` matches any single segment and `**` any number of segments; other
/// segments may themselves be globs.
#[derive(Debug, Clone)]
pub struct ModulePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl ModulePattern {
    /// Compiles a module path pattern.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty pattern, an empty segment, or an invalid
    /// segment glob.
    pub fn new(pattern: &str) -> Result<Self, PointcutEvalError> {
        let raw = pattern.trim().trim_start_matches("::");
        if raw.is_empty() {
            return Err(invalid(pattern, "path pattern is empty"));
        }
        let segments = raw
            .split("::")
            .map(|part| {
                let part = part.trim();
                match part {
                    "" => Err(invalid(pattern, "empty path segment")),
                    "*" => Ok(Segment::One),
                    "**" => Ok(Segment::Any),
                    p if p.contains(['*', '?', '[']) => glob::Pattern::new(p)
                        .map(Segment::Glob)
                        .map_err(|e| invalid(pattern, &e.to_string())),
                    p => Ok(Segment::Literal(p.to_string())),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Tests a `::` separated path.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.trim_start_matches("::").split("::").collect();
        match_parts(&parts, &self.segments)
    }

    /// Returns true if the pattern has a single segment.
    #[must_use]
    pub fn is_single_segment(&self) -> bool {
        self.segments.len() == 1
    }
}

impl fmt::Display for ModulePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for ModulePattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

fn match_parts(path: &[&str], pattern: &[Segment]) -> bool {
    let Some((first, rest)) = pattern.split_first() else {
        return path.is_empty();
    };

    match first {
        Segment::Any => (0..=path.len()).any(|i| match_parts(&path[i..], rest)),
        Segment::One => !path.is_empty() && match_parts(&path[1..], rest),
        Segment::Literal(literal) => {
            path.first().is_some_and(|p| p == literal) && match_parts(&path[1..], rest)
        }
        Segment::Glob(glob) => {
            path.first().is_some_and(|p| glob.matches(p)) && match_parts(&path[1..], rest)
        }
    }
}

fn invalid(pattern: &str, reason: &str) -> PointcutEvalError {
    PointcutEvalError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_glob_and_regex() {
        let glob = NamePattern::new("save*").unwrap();
        assert!(glob.matches("save_all"));
        assert!(!glob.matches("load"));

        let regex = NamePattern::new("/^(get|find)_/").unwrap();
        assert!(regex.matches("find_user"));
        assert!(!regex.matches("user_find_"));
        assert_eq!(regex.to_string(), "/^(get|find)_/");
    }

    #[test]
    fn name_pattern_errors() {
        assert!(NamePattern::new("").is_err());
        assert!(NamePattern::new("/(unclosed/").is_err());
        assert!(NamePattern::new("[a").is_err());
    }

    #[test]
    fn type_patterns_normalize_and_treat_brackets_literally() {
        let slice = TypePattern::new("& [u8]").unwrap();
        assert!(slice.matches("&[u8]"));
        assert!(!slice.matches("&u"));

        let result = TypePattern::new("Result<*>").unwrap();
        assert!(result.matches("Result<u64,Error>"));
        assert!(!result.matches("Option<u64>"));

        assert!(TypePattern::new("  ").is_err());
    }

    #[test]
    fn module_pattern_literal() {
        let p = ModulePattern::new("crate::billing").unwrap();
        assert!(p.matches("crate::billing"));
        assert!(!p.matches("crate::billing::invoice"));
    }

    #[test]
    fn module_pattern_wildcards() {
        let one = ModulePattern::new("crate::*").unwrap();
        assert!(one.matches("crate::billing"));
        assert!(!one.matches("crate::billing::invoice"));

        let any = ModulePattern::new("crate::billing::**").unwrap();
        assert!(any.matches("crate::billing"));
        assert!(any.matches("crate::billing::invoice::Line"));
        assert!(!any.matches("crate::shipping"));

        let seg = ModulePattern::new("crate::bill*::*").unwrap();
        assert!(seg.matches("crate::billing::Invoice"));
    }

    #[test]
    fn module_pattern_errors() {
        assert!(ModulePattern::new("").is_err());
        assert!(ModulePattern::new("crate::::a").is_err());
    }
}
