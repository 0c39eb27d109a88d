//! Text of the advice-invoking wrapper around a method body.

use proc_macro2::Literal;

use crate::aspect::AspectDeclaration;
use crate::reflect::MethodNode;

/// Identity of the woven member as written into the `JoinPoint`.
#[derive(Debug, Clone)]
pub struct JoinPointSite<'a> {
    /// Module path of the declaring class.
    pub module: &'a str,
    /// Class name.
    pub class: &'a str,
    /// The method.
    pub method: &'a MethodNode,
}

/// Wraps `body` (braces included) in an invocation chain.
///
/// The result stays on the body's first line up to the original opening
/// brace, and adds only ` }` after the original closing brace, so every line
/// of the body keeps its number.
#[must_use]
pub fn wrap_body(
    runtime: &str,
    site: &JoinPointSite<'_>,
    aspects: &[&AspectDeclaration],
    body: &str,
) -> String {
    let params = site
        .method
        .signature
        .params
        .iter()
        .map(|p| Literal::string(&p.name).to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = format!(
        "{{ {runtime}::Invocation::new({runtime}::JoinPoint::new({}, {}, {}, &[{params}]))",
        Literal::string(site.module),
        Literal::string(site.class),
        Literal::string(&site.method.name),
    );
    for aspect in aspects {
        out.push('.');
        out.push_str(aspect.kind.builder_method());
        out.push('(');
        out.push_str(aspect.advice.as_str());
        out.push(')');
    }
    out.push_str(".proceed(move || ");
    out.push_str(body);
    out.push_str(") }");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspect::{AdviceKind, AdvicePath};
    use crate::pointcut;
    use crate::reflect::reflect;
    use std::sync::Arc;

    fn aspect(name: &str, kind: AdviceKind, advice: &str) -> AspectDeclaration {
        AspectDeclaration {
            name: name.to_string(),
            expression: "async".to_string(),
            pointcut: Arc::new(pointcut::parse("async").unwrap()),
            advice: AdvicePath::new(advice).unwrap(),
            kind,
            priority: 0,
            order: 0,
        }
    }

    #[test]
    fn wraps_in_registration_order() {
        let model = reflect("impl A { fn f(&self, a: u8, (b, c): (u8, u8)) {} }").unwrap();
        let method = &model.classes()[0].methods[0];
        let site = JoinPointSite {
            module: "crate::a",
            class: "A",
            method,
        };
        let audit = aspect("Audit", AdviceKind::Around, "crate::aop::audit");
        let log = aspect("Log", AdviceKind::AfterThrowing, "crate::aop::log");
        let out = wrap_body("::woven::runtime", &site, &[&audit, &log], "{\n    1\n}");
        assert_eq!(
            out,
            "{ ::woven::runtime::Invocation::new(::woven::runtime::JoinPoint::new(\
             \"crate::a\", \"A\", \"f\", &[\"a\", \"_\"]))\
             .around(crate::aop::audit).after_throwing(crate::aop::log)\
             .proceed(move || {\n    1\n}) }"
        );
    }
}
