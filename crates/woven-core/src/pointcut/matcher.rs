//! Evaluates an aspect set against a structural model.

use tracing::debug;

use super::expr::JoinPointView;
use crate::aspect::{AspectDeclaration, AspectSet};
use crate::reflect::{ClassNode, MethodNode, StructuralModel};
use crate::types::UnitId;

/// A join point selected by an aspect.
#[derive(Debug, Clone, Copy)]
pub struct Match<'a> {
    /// Declaring class.
    pub class: &'a ClassNode,
    /// The selected method.
    pub method: &'a MethodNode,
    /// The selecting aspect.
    pub aspect: &'a AspectDeclaration,
}

impl Match<'_> {
    /// Returns true if both matches select the same method.
    #[must_use]
    pub fn same_member(&self, other: &Match<'_>) -> bool {
        std::ptr::eq(self.method, other.method)
    }
}

/// Matches every method of `model` against every aspect.
///
/// Results are grouped by method in source order; within a method they
/// follow the weaving order of `aspects`. Pure: the model is only read.
#[must_use]
pub fn match_model<'a>(
    unit: &UnitId,
    model: &'a StructuralModel,
    aspects: &'a AspectSet,
) -> Vec<Match<'a>> {
    let mut matches = Vec::new();
    let mut hit = vec![false; aspects.len()];

    for (class, method) in model.methods() {
        let view = JoinPointView {
            unit: unit.as_str(),
            class,
            method,
        };
        for (i, aspect) in aspects.iter().enumerate() {
            if aspect.pointcut.matches(&view) {
                hit[i] = true;
                matches.push(Match {
                    class,
                    method,
                    aspect,
                });
            }
        }
    }

    for (aspect, _) in aspects.iter().zip(&hit).filter(|(_, hit)| !**hit) {
        debug!(
            unit = %unit,
            aspect = %aspect.name,
            pointcut = %aspect.expression,
            "aspect matched nothing"
        );
    }

    matches.sort_by_key(|m| m.method.span.start);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspect::{self, AspectDto};
    use crate::reflect::reflect;
    use std::collections::BTreeMap;

    const UNIT: &str = r#"
pub struct Users;

impl Users {
    /// @Cached
    pub fn find(&self, id: u64) -> Option<String> { None }

    /// @Cached
    fn find_private(&self, id: u64) -> Option<String> { None }

    pub fn find_plain(&self, id: u64) -> Option<String> { None }
}
"#;

    fn aspects(specs: &[(&str, &str, i32)]) -> AspectSet {
        let dtos: Vec<_> = specs
            .iter()
            .map(|(name, pointcut, priority)| AspectDto {
                name: (*name).to_string(),
                pointcut: (*pointcut).to_string(),
                advice: "crate::advice::run".to_string(),
                kind: "around".to_string(),
                priority: *priority,
            })
            .collect();
        aspect::load(&BTreeMap::new(), &dtos).unwrap()
    }

    fn matched(set: &AspectSet) -> Vec<(String, String)> {
        let model = reflect(UNIT).unwrap();
        match_model(&UnitId::parse("crate::users").unwrap(), &model, set)
            .iter()
            .map(|m| (m.method.name.clone(), m.aspect.name.clone()))
            .collect()
    }

    #[test]
    fn annotation_and_visibility() {
        let set = aspects(&[("Cache", "has-annotation(Cached) and public", 0)]);
        assert_eq!(
            matched(&set),
            vec![("find".to_string(), "Cache".to_string())]
        );
    }

    #[test]
    fn matches_follow_source_then_weaving_order() {
        let set = aspects(&[("Log", "* find*(*)", 2), ("Audit", "public", 1)]);
        assert_eq!(
            matched(&set),
            vec![
                ("find".to_string(), "Audit".to_string()),
                ("find".to_string(), "Log".to_string()),
                ("find_private".to_string(), "Log".to_string()),
                ("find_plain".to_string(), "Audit".to_string()),
                ("find_plain".to_string(), "Log".to_string()),
            ]
        );
    }

    #[test]
    fn within_module_and_type() {
        let set = aspects(&[
            ("Module", "within(crate::users)", 0),
            ("Type", "within(Users) && name(find)", 1),
            ("Elsewhere", "within(crate::billing::**)", 2),
        ]);
        let found = matched(&set);
        assert_eq!(found.iter().filter(|(_, a)| a == "Module").count(), 3);
        assert_eq!(found.iter().filter(|(_, a)| a == "Type").count(), 1);
        assert!(found.iter().all(|(_, a)| a != "Elsewhere"));
    }

    #[test]
    fn signature_types_and_arity() {
        let set = aspects(&[
            ("Typed", "Users::*(u64) -> Option<*>", 0),
            ("NoArgs", "*()", 1),
            ("Recv", "receiver(ref) && args(1)", 2),
        ]);
        let found = matched(&set);
        assert_eq!(found.iter().filter(|(_, a)| a == "Typed").count(), 3);
        assert_eq!(found.iter().filter(|(_, a)| a == "NoArgs").count(), 0);
        assert_eq!(found.iter().filter(|(_, a)| a == "Recv").count(), 3);
    }

    #[test]
    fn zero_matches_is_valid() {
        let set = aspects(&[("Nothing", "name(nothing_here)", 0)]);
        assert!(matched(&set).is_empty());
    }
}
