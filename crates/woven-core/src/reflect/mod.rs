//! Structural reflection: a static model of a unit's declarations.
//!
//! The model is built from raw source text with `syn`; nothing is compiled
//! or executed, and no dependency of the unit needs to resolve. It is shared
//! read-only by the matcher and the weaver for the same unit and dropped
//! afterwards.

pub mod attributes;
mod model;
mod visitor;

pub use model::{
    Annotation, AnnotationSource, ClassKind, ClassNode, MethodNode, ModuleDecl, Param,
    PropertyNode, Receiver, Signature, StructuralModel, Visibility,
};

use syn::visit::Visit;

use crate::error::MalformedSource;

/// Builds the structural model of one unit.
///
/// # Errors
///
/// Returns [`MalformedSource`] if the text is not a valid Rust file. No
/// partial model is ever returned.
pub fn reflect(text: &str) -> Result<StructuralModel, MalformedSource> {
    let file = syn::parse_file(text).map_err(|e| MalformedSource::from_syn(&e, text))?;
    let mut builder = visitor::ModelBuilder::new(text);
    builder.visit_file(&file);
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BILLING: &str = r#"//! Billing.

/// Charges customers.
/// @Audited
#[derive(Debug, Default)]
pub struct Billing {
    pub rate: u64,
    ledger: Vec<u64>,
}

impl Billing {
    /// Charges an amount.
    #[inline]
    pub fn charge(&mut self, amount: u64) -> u64 {
        self.ledger.push(amount);
        amount * self.rate
    }

    fn total(&self) -> u64 {
        self.ledger.iter().sum()
    }

    pub(crate) const fn zero() -> u64 {
        0
    }

    pub fn new(rate: u64) -> Self {
        fn helper() {}
        helper();
        Self { rate, ledger: Vec::new() }
    }
}

impl std::fmt::Display for Billing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.rate)
    }
}

pub trait Ledger {
    fn post(&self, entry: &'static str);
    fn flush(&self) {}
}

mod inner {
    pub struct Hidden;
    impl Hidden {
        pub async fn later(self) {}
    }
    mod deeper;
}

#[path = "custom/place.rs"]
pub mod elsewhere;
mod plain;
"#;

    #[test]
    fn collects_classes_in_order() {
        let model = reflect(BILLING).unwrap();
        let names: Vec<_> = model
            .classes()
            .iter()
            .map(|c| (c.name.as_str(), c.kind))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Billing", ClassKind::Struct),
                ("Ledger", ClassKind::Trait),
                ("Hidden", ClassKind::Struct),
            ]
        );
    }

    #[test]
    fn collects_methods_with_signatures() {
        let model = reflect(BILLING).unwrap();
        let billing = model.class("Billing").unwrap();
        let names: Vec<_> = billing.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["charge", "total", "zero", "new", "fmt"]);

        let charge = &billing.methods[0];
        assert_eq!(charge.visibility, Visibility::Public);
        assert_eq!(charge.signature.receiver, Receiver::RefMut);
        assert_eq!(charge.signature.arity(), 1);
        assert_eq!(charge.signature.params[0].name, "amount");
        assert_eq!(charge.signature.params[0].ty, "u64");
        assert_eq!(charge.signature.return_type(), "u64");
        assert!(charge.annotations.iter().any(|a| a.name == "inline"));

        let total = &billing.methods[1];
        assert_eq!(total.visibility, Visibility::Private);
        assert_eq!(total.signature.receiver, Receiver::Ref);

        let zero = &billing.methods[2];
        assert_eq!(zero.visibility, Visibility::Crate);
        assert_eq!(zero.unweavable_reason(), Some("const fn cannot call advice"));

        let fmt = &billing.methods[4];
        assert_eq!(fmt.visibility, Visibility::Public);
        assert_eq!(fmt.implements.as_deref(), Some("std::fmt::Display"));
        assert_eq!(fmt.signature.params[0].ty, "&mut std::fmt::Formatter<'_>");
    }

    #[test]
    fn spans_point_into_the_source() {
        let model = reflect(BILLING).unwrap();
        let charge = &model.class("Billing").unwrap().methods[0];
        assert!(charge.span.slice(BILLING).unwrap().starts_with("/// Charges an amount."));
        assert!(BILLING[charge.decl_start..].starts_with("pub fn charge"));
        assert_eq!(
            charge.signature_span.slice(BILLING),
            Some("fn charge(&mut self, amount: u64) -> u64")
        );
        let body = charge.body.unwrap().slice(BILLING).unwrap();
        assert!(body.starts_with('{') && body.ends_with('}'));
        assert!(body.contains("self.ledger.push(amount);"));
    }

    #[test]
    fn class_annotations_include_doc_tags() {
        let model = reflect(BILLING).unwrap();
        let billing = model.class("Billing").unwrap();
        let names: Vec<_> = billing.annotations.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Audited", "derive"]);
        assert_eq!(billing.properties.len(), 2);
        assert_eq!(billing.properties[0].name, "rate");
        assert_eq!(billing.properties[1].visibility, Visibility::Private);
    }

    #[test]
    fn trait_methods_are_public_and_may_lack_bodies() {
        let model = reflect(BILLING).unwrap();
        let ledger = model.class("Ledger").unwrap();
        assert_eq!(ledger.methods.len(), 2);
        assert!(ledger.methods.iter().all(|m| m.visibility == Visibility::Public));
        assert_eq!(ledger.methods[0].unweavable_reason(), Some("method has no body"));
        assert_eq!(ledger.methods[1].unweavable_reason(), None);
    }

    #[test]
    fn items_inside_bodies_are_ignored() {
        let model = reflect(BILLING).unwrap();
        assert!(model.methods().all(|(_, m)| m.name != "helper"));
    }

    #[test]
    fn inline_modules_nest_classes() {
        let model = reflect(BILLING).unwrap();
        let hidden = model.class("Hidden").unwrap();
        assert_eq!(hidden.module_path, vec!["inner".to_string()]);
        assert_eq!(hidden.module_in("crate::billing"), "crate::billing::inner");
        assert_eq!(
            hidden.methods[0].unweavable_reason(),
            Some("async fn is not supported")
        );
    }

    #[test]
    fn collects_out_of_line_modules() {
        let model = reflect(BILLING).unwrap();
        let modules: Vec<_> = model
            .modules()
            .iter()
            .map(|m| (m.path.join("::"), m.path_attr.clone()))
            .collect();
        assert_eq!(
            modules,
            vec![
                ("inner::deeper".to_string(), None),
                ("elsewhere".to_string(), Some("custom/place.rs".to_string())),
                ("plain".to_string(), None),
            ]
        );
        let elsewhere = &model.modules()[1];
        assert!(BILLING[elsewhere.decl_start..].starts_with("pub mod elsewhere;"));
        assert!(elsewhere.span.slice(BILLING).unwrap().starts_with("#[path"));
        assert_eq!(
            elsewhere.path_attr_span.unwrap().slice(BILLING),
            Some("\"custom/place.rs\"")
        );
    }

    #[test]
    fn impl_before_declaration_is_upgraded() {
        let text = "impl Late { fn a(&self) {} }\npub struct Late;\n";
        let model = reflect(text).unwrap();
        assert_eq!(model.classes().len(), 1);
        let late = &model.classes()[0];
        assert_eq!(late.kind, ClassKind::Struct);
        assert_eq!(late.visibility, Visibility::Public);
        assert_eq!(late.methods.len(), 1);
    }

    #[test]
    fn impl_only_types() {
        let text = "impl crate::other::Foreign { pub fn go(self: Box<Self>) {} }\n";
        let model = reflect(text).unwrap();
        let foreign = model.class("Foreign").unwrap();
        assert_eq!(foreign.kind, ClassKind::ImplOnly);
        assert_eq!(foreign.span, None);
        assert_eq!(foreign.methods[0].signature.receiver, Receiver::Value);
    }

    #[test]
    fn malformed_source_is_rejected() {
        let err = reflect("pub struct Broken {\n    field: ,\n}\n").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn empty_file_has_empty_model() {
        assert!(reflect("").unwrap().is_empty());
    }
}
