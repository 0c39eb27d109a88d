//! Serializable summaries of weaving runs, for the CLI and build hosts.

use serde::Serialize;
use std::path::PathBuf;

use crate::interceptor::{Intercepted, Origin};
use crate::pointcut::Match;
use crate::types::UnitId;

/// One loaded unit.
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    /// The unit.
    pub unit: UnitId,
    /// Original source file.
    pub source: PathBuf,
    /// Where the woven text was written, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// How the text was produced.
    pub origin: Origin,
    /// Number of woven members.
    pub woven: usize,
}

impl UnitReport {
    /// Summarises an intercepted unit.
    #[must_use]
    pub fn new(intercepted: &Intercepted, output: Option<PathBuf>) -> Self {
        Self {
            unit: intercepted.unit.clone(),
            source: intercepted.location.path.clone(),
            output,
            origin: intercepted.origin,
            woven: intercepted.woven,
        }
    }
}

/// Result of weaving a tree of units.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WeaveReport {
    /// Chain fingerprint the units were woven under.
    pub fingerprint: String,
    /// Units in load order.
    pub units: Vec<UnitReport>,
}

impl WeaveReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new(fingerprint: impl Into<String>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            units: Vec::new(),
        }
    }

    /// Total woven members.
    #[must_use]
    pub fn woven(&self) -> usize {
        self.units.iter().map(|u| u.woven).sum()
    }

    /// Number of units with at least one woven member.
    #[must_use]
    pub fn units_woven(&self) -> usize {
        self.units.iter().filter(|u| u.woven > 0).count()
    }

    /// Number of units served from the cache.
    #[must_use]
    pub fn cache_hits(&self) -> usize {
        self.units
            .iter()
            .filter(|u| u.origin == Origin::Cache)
            .count()
    }
}

/// A join point and the aspects that select it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinPointReport {
    /// Unit the member is declared in.
    pub unit: String,
    /// `Type::method`
    pub member: String,
    /// 1-indexed line of the method declaration.
    pub line: usize,
    /// Selecting aspects in weaving order.
    pub aspects: Vec<String>,
    /// Why the member would be skipped, if it would.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl JoinPointReport {
    /// Groups matches by member; `text` is the source they were found in.
    #[must_use]
    pub fn from_matches(unit: &UnitId, text: &str, matches: &[Match<'_>]) -> Vec<Self> {
        let mut reports: Vec<Self> = Vec::new();
        let mut previous: Option<&Match<'_>> = None;
        for m in matches {
            match (previous, reports.last_mut()) {
                (Some(p), Some(report)) if p.same_member(m) => {
                    report.aspects.push(m.aspect.name.clone());
                }
                _ => reports.push(Self {
                    unit: unit.to_string(),
                    member: format!("{}::{}", m.class.name, m.method.name),
                    line: line_of(text, m.method.decl_start),
                    aspects: vec![m.aspect.name.clone()],
                    skipped: m.method.unweavable_reason().map(str::to_string),
                }),
            }
            previous = Some(m);
        }
        reports
    }
}

fn line_of(text: &str, offset: usize) -> usize {
    text.get(..offset)
        .map_or(0, |before| before.matches('\n').count())
        + 1
}
