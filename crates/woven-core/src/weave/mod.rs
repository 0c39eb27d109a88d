//! Proxy weaving: splices advice invocation chains around matched methods.
//!
//! For each matched method the weaver makes two edits:
//!
//! - inserts `#[<marker>] ` at the start of the declaration, after any
//!   attributes and doc comments;
//! - replaces the body block with an invocation chain whose innermost step
//!   runs the original block, copied verbatim.
//!
//! The signature is never touched and every original line keeps its number.

pub mod codegen;
pub mod marker;
mod proxy;
pub mod splice;

pub use proxy::ProxyWeaver;

use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

use crate::aspect::{AspectDeclaration, Fingerprint};
use crate::error::WeaveError;
use crate::pointcut::Match;
use crate::reflect::StructuralModel;
use crate::types::UnitId;
use crate::WEAVER_VERSION;
use codegen::JoinPointSite;
use splice::Edit;

/// Paths written into generated code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeaveOptions {
    /// Path of the runtime crate (default `::woven::runtime`).
    pub runtime: String,
    /// Marker attribute path (default `::woven::advised`).
    pub marker: String,
}

impl Default for WeaveOptions {
    fn default() -> Self {
        Self {
            runtime: "::woven::runtime".to_string(),
            marker: "::woven::advised".to_string(),
        }
    }
}

/// A member the weaver found already marked in a unit without a header.
///
/// Not an error: the member is treated as already woven and left alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeaveConflict {
    /// The unit.
    pub unit: String,
    /// `Type::method`, or the unit itself for header conflicts.
    pub member: String,
    /// What disagreed.
    pub reason: String,
}

impl fmt::Display for WeaveConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}: {}", self.unit, self.member, self.reason)
    }
}

/// A woven member and the aspects applied to it, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WovenMember {
    /// Class name.
    pub class: String,
    /// Method name.
    pub method: String,
    /// Aspect names in weaving order.
    pub aspects: Vec<String>,
}

/// A matched member that could not be woven.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedMember {
    /// `Type::method`
    pub member: String,
    /// Why it was skipped.
    pub reason: String,
}

/// Result of weaving one unit.
#[derive(Debug, Clone, Default)]
pub struct WeaveOutput {
    /// The unit text, unchanged when nothing was woven.
    pub text: String,
    /// Woven members in source order.
    pub woven: Vec<WovenMember>,
    /// Matched members left unwoven.
    pub skipped: Vec<SkippedMember>,
    /// Conflicts found while weaving.
    pub conflicts: Vec<WeaveConflict>,
}

/// Weaves `matches` into `text`.
///
/// `model` must have been reflected from `text` and `matches` computed
/// from `model`. With no weavable match the text is returned byte for byte;
/// otherwise the header line is appended. A unit that already carries a
/// header is returned unchanged.
///
/// # Errors
///
/// Returns [`WeaveError::Splice`] if generated edits overlap.
pub fn weave(
    unit: &UnitId,
    text: &str,
    model: &StructuralModel,
    matches: &[Match<'_>],
    options: &WeaveOptions,
    fingerprint: &Fingerprint,
) -> Result<WeaveOutput, WeaveError> {
    let mut output = WeaveOutput {
        text: text.to_string(),
        ..WeaveOutput::default()
    };

    if let Some(header) = marker::find_header(text) {
        if !header.is_current(fingerprint) {
            let conflict = WeaveConflict {
                unit: unit.to_string(),
                member: "*".to_string(),
                reason: format!(
                    "woven by v{} under {}, current is v{WEAVER_VERSION} under {}",
                    header.version,
                    header.fingerprint.short(),
                    fingerprint.short()
                ),
            };
            warn!(%conflict, "unit already woven under another configuration");
            output.conflicts.push(conflict);
        }
        return Ok(output);
    }

    debug!(
        unit = %unit,
        classes = model.classes().len(),
        matches = matches.len(),
        "weaving unit"
    );
    let marker_attr = marker::marker_attribute(&options.marker);
    let mut edits = Vec::new();

    for group in matches.chunk_by(Match::same_member) {
        let Some(first) = group.first() else {
            continue;
        };
        let (class, method) = (first.class, first.method);
        let member = format!("{}::{}", class.name, method.name);

        if method.has_attribute(&options.marker) {
            let conflict = WeaveConflict {
                unit: unit.to_string(),
                member,
                reason: format!("already carries {marker_attr} but the unit has no header"),
            };
            warn!(%conflict, "treating member as already woven");
            output.conflicts.push(conflict);
            continue;
        }

        let body = match (method.unweavable_reason(), method.body) {
            (None, Some(body)) => body,
            (reason, _) => {
                let reason = reason.unwrap_or("method has no body");
                warn!(unit = %unit, member = %member, reason, "matched member cannot be woven");
                output.skipped.push(SkippedMember {
                    member,
                    reason: reason.to_string(),
                });
                continue;
            }
        };
        let original = body.slice(text).ok_or_else(|| WeaveError::Splice {
            unit: unit.clone(),
            source: splice::SpliceError::OutOfBounds {
                span: body,
                len: text.len(),
            },
        })?;

        let aspects: Vec<&AspectDeclaration> = group.iter().map(|m| m.aspect).collect();
        let module = class.module_in(unit.as_str());
        let site = JoinPointSite {
            module: &module,
            class: &class.name,
            method,
        };

        edits.push(Edit::insert(method.decl_start, format!("{marker_attr} ")));
        edits.push(Edit::replace(
            body,
            codegen::wrap_body(&options.runtime, &site, &aspects, original),
        ));

        debug!(
            unit = %unit,
            member = %member,
            aspects = ?aspects.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
            "weaving member"
        );
        output.woven.push(WovenMember {
            class: class.name.clone(),
            method: method.name.clone(),
            aspects: aspects.iter().map(|a| a.name.clone()).collect(),
        });
    }

    if edits.is_empty() {
        return Ok(output);
    }

    let mut woven = splice::apply(text, edits).map_err(|source| WeaveError::Splice {
        unit: unit.clone(),
        source,
    })?;
    marker::append_header(&mut woven, fingerprint);
    output.text = woven;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspect::{self, AspectDto, AspectSet};
    use crate::pointcut::match_model;
    use crate::reflect::reflect;
    use std::collections::BTreeMap;

    const BILLING: &str = "pub struct Billing;

impl Billing {
    /// Charges.
    pub fn charge(&self, amount: u64) -> u64 {
        amount * 2
    }

    pub fn refund(&self) {}
}
";

    fn set(specs: &[(&str, &str, &str, i32)]) -> AspectSet {
        let dtos: Vec<_> = specs
            .iter()
            .map(|(name, pointcut, kind, priority)| AspectDto {
                name: (*name).to_string(),
                pointcut: (*pointcut).to_string(),
                advice: format!("crate::aop::{}", name.to_lowercase()),
                kind: (*kind).to_string(),
                priority: *priority,
            })
            .collect();
        aspect::load(&BTreeMap::new(), &dtos).unwrap()
    }

    fn run(text: &str, aspects: &AspectSet) -> WeaveOutput {
        let unit = UnitId::parse("crate::billing").unwrap();
        let model = reflect(text).unwrap();
        let matches = match_model(&unit, &model, aspects);
        let fp = Fingerprint::of(["test"]);
        weave(&unit, text, &model, &matches, &WeaveOptions::default(), &fp).unwrap()
    }

    #[test]
    fn weaves_matched_member() {
        let out = run(BILLING, &set(&[("LogAll", "* charge(*)", "before", 0)]));
        assert_eq!(out.woven.len(), 1);
        assert!(out.text.contains(
            "    #[::woven::advised] pub fn charge(&self, amount: u64) -> u64 { \
             ::woven::runtime::Invocation::new(::woven::runtime::JoinPoint::new(\
             \"crate::billing\", \"Billing\", \"charge\", &[\"amount\"]))\
             .before(crate::aop::logall).proceed(move || {\n        amount * 2\n    }) }\n"
        ));
        assert!(out.text.contains("    pub fn refund(&self) {}\n"));
        assert!(marker::find_header(&out.text).is_some());
    }

    #[test]
    fn line_numbers_are_preserved() {
        let out = run(BILLING, &set(&[("LogAll", "public", "before", 0)]));
        let original: Vec<_> = BILLING.lines().collect();
        let woven: Vec<_> = out.text.lines().collect();
        assert_eq!(woven.len(), original.len() + 1);
        for (o, w) in original.iter().zip(&woven) {
            if !w.contains("#[::woven::advised]") && !w.ends_with("}) }") {
                assert_eq!(o, w);
            }
        }
        assert_eq!(woven[5], "        amount * 2");
        assert_eq!(woven[6], "    }) }");
    }

    #[test]
    fn zero_matches_is_byte_identical() {
        let out = run(BILLING, &set(&[("None", "name(nothing)", "before", 0)]));
        assert_eq!(out.text, BILLING);
        assert!(out.woven.is_empty());
    }

    #[test]
    fn weaving_twice_is_a_no_op() {
        let aspects = set(&[("LogAll", "public", "around", 0)]);
        let once = run(BILLING, &aspects);
        let twice = run(&once.text, &aspects);
        assert_eq!(once.text, twice.text);
        assert!(twice.conflicts.is_empty());
    }

    #[test]
    fn marked_member_without_header_is_a_conflict() {
        let text = BILLING.replace("pub fn refund", "#[::woven::advised] pub fn refund");
        let out = run(&text, &set(&[("All", "public", "before", 0)]));
        assert_eq!(out.conflicts.len(), 1);
        assert_eq!(out.conflicts[0].member, "Billing::refund");
        assert_eq!(out.woven.len(), 1);
        assert_eq!(marker::count_markers(&out.text, "::woven::advised"), 2);
    }

    #[test]
    fn unweavable_members_are_skipped() {
        let text = "pub struct S;\nimpl S {\n    pub const fn c() -> u8 { 1 }\n    pub async fn a(&self) {}\n}\n";
        let out = run(text, &set(&[("All", "public", "before", 0)]));
        assert_eq!(out.text, text);
        assert_eq!(out.skipped.len(), 2);
    }

    #[test]
    fn priority_orders_the_chain() {
        let out = run(
            BILLING,
            &set(&[
                ("Log", "* refund()", "around", 2),
                ("Audit", "* refund()", "around", 1),
            ]),
        );
        assert_eq!(out.woven[0].aspects, vec!["Audit", "Log"]);
        assert!(out
            .text
            .contains(".around(crate::aop::audit).around(crate::aop::log).proceed("));
    }
}
