//! Pointcut AST and its evaluation against one join point.

use std::fmt;
use std::sync::Arc;

use super::pattern::{ModulePattern, NamePattern, TypePattern};
use crate::reflect::{ClassNode, MethodNode, Receiver, Visibility};

/// Visibility filter used by predicates and signature patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityFilter {
    /// Any visibility (`*` in a signature).
    Any,
    /// `pub`, trait methods and trait impl methods.
    Public,
    /// `pub(crate)`
    Crate,
    /// `pub(super)`, `pub(self)`, `pub(in ..)`
    Restricted,
    /// No modifier.
    Private,
}

impl VisibilityFilter {
    /// Tests a member's visibility.
    #[must_use]
    pub fn matches(self, visibility: &Visibility) -> bool {
        match (self, visibility) {
            (Self::Any, _)
            | (Self::Public, Visibility::Public)
            | (Self::Crate, Visibility::Crate)
            | (Self::Restricted, Visibility::Restricted(_))
            | (Self::Private, Visibility::Private) => true,
            _ => false,
        }
    }
}

impl fmt::Display for VisibilityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Any => "*",
            Self::Public => "public",
            Self::Crate => "crate",
            Self::Restricted => "restricted",
            Self::Private => "private",
        })
    }
}

/// Parameter list of a signature pattern, receiver excluded.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamsPattern {
    /// `(*)` or `(..)`
    Any,
    /// Exactly these parameter types; `()` is the empty list.
    Exact(Vec<TypePattern>),
    /// These leading types followed by anything (`(u64, ..)`).
    Prefix(Vec<TypePattern>),
}

impl ParamsPattern {
    fn matches(&self, method: &MethodNode) -> bool {
        let params = &method.signature.params;
        match self {
            Self::Any => true,
            Self::Exact(types) => {
                types.len() == params.len()
                    && types.iter().zip(params).all(|(t, p)| t.matches(&p.ty))
            }
            Self::Prefix(types) => {
                types.len() <= params.len()
                    && types.iter().zip(params).all(|(t, p)| t.matches(&p.ty))
            }
        }
    }
}

/// `[vis] [module::][Type::]method(params) [-> type]`
#[derive(Debug, Clone, PartialEq)]
pub struct SignaturePattern {
    /// Visibility filter, `None` when omitted.
    pub visibility: Option<VisibilityFilter>,
    /// Module path of the declaring class.
    pub module: Option<ModulePattern>,
    /// Declaring class name.
    pub class: Option<NamePattern>,
    /// Method name.
    pub method: NamePattern,
    /// Parameter list.
    pub params: ParamsPattern,
    /// Return type, `None` when omitted.
    pub returns: Option<TypePattern>,
}

impl SignaturePattern {
    fn matches(&self, jp: &JoinPointView<'_>) -> bool {
        self.visibility
            .map_or(true, |v| v.matches(&jp.method.visibility))
            && self
                .module
                .as_ref()
                .map_or(true, |m| m.matches(&jp.module_path()))
            && self.class.as_ref().map_or(true, |c| c.matches(&jp.class.name))
            && self.method.matches(&jp.method.name)
            && self.params.matches(jp.method)
            && self
                .returns
                .as_ref()
                .map_or(true, |r| r.matches(jp.method.signature.return_type()))
    }
}

impl fmt::Display for SignaturePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(vis) = self.visibility {
            write!(f, "{vis} ")?;
        }
        if let Some(module) = &self.module {
            write!(f, "{module}::")?;
        }
        if let Some(class) = &self.class {
            write!(f, "{class}::")?;
        }
        write!(f, "{}(", self.method)?;
        let join = |types: &[TypePattern]| {
            types
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        match &self.params {
            ParamsPattern::Any => write!(f, "..")?,
            ParamsPattern::Exact(types) => write!(f, "{}", join(types))?,
            ParamsPattern::Prefix(types) if types.is_empty() => write!(f, "..")?,
            ParamsPattern::Prefix(types) => write!(f, "{}, ..", join(types))?,
        }
        write!(f, ")")?;
        if let Some(returns) = &self.returns {
            write!(f, " -> {returns}")?;
        }
        Ok(())
    }
}

/// Inclusive range of parameter counts for `args(..)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgsRange {
    /// Minimum arity.
    pub min: usize,
    /// Maximum arity, `None` for unbounded.
    pub max: Option<usize>,
}

impl ArgsRange {
    fn contains(self, arity: usize) -> bool {
        arity >= self.min && self.max.map_or(true, |max| arity <= max)
    }
}

/// A parsed pointcut expression.
///
/// Evaluation is a pure function of the join point; nothing is cached or
/// mutated while matching.
#[derive(Debug, Clone, PartialEq)]
pub enum Pointcut {
    /// Any operand matches.
    Or(Vec<Pointcut>),
    /// Every operand matches.
    And(Vec<Pointcut>),
    /// Operand does not match.
    Not(Box<Pointcut>),
    /// `execution(sig)` or a bare signature.
    Execution(SignaturePattern),
    /// `within(pattern)`
    Within(ModulePattern),
    /// `has-annotation(glob)` on the method or its class.
    HasAnnotation(NamePattern),
    /// `public`, `private`, `crate`, `restricted`
    Visibility(VisibilityFilter),
    /// `name(glob)`
    Name(NamePattern),
    /// `args(N..M)`
    Args(ArgsRange),
    /// `receiver(kind)`
    Receiver(Receiver),
    /// `returns(type)`
    Returns(TypePattern),
    /// `implements(glob)`
    Implements(NamePattern),
    /// `async`
    Async,
    /// `unsafe`
    Unsafe,
    /// `pointcut(name)`, resolved when parsed.
    Named {
        /// Name in the `[pointcuts]` table.
        name: String,
        /// The referenced expression.
        expr: Arc<Pointcut>,
    },
}

/// A candidate join point: a method, its class and the unit it lives in.
#[derive(Debug, Clone, Copy)]
pub struct JoinPointView<'a> {
    /// Unit id text (e.g. `crate::billing`).
    pub unit: &'a str,
    /// Declaring class.
    pub class: &'a ClassNode,
    /// The method.
    pub method: &'a MethodNode,
}

impl JoinPointView<'_> {
    /// Module path of the class including inline modules.
    #[must_use]
    pub fn module_path(&self) -> String {
        self.class.module_in(self.unit)
    }

    /// `module::Type`
    #[must_use]
    pub fn type_path(&self) -> String {
        format!("{}::{}", self.module_path(), self.class.name)
    }
}

impl Pointcut {
    /// Evaluates the expression against one join point.
    #[must_use]
    pub fn matches(&self, jp: &JoinPointView<'_>) -> bool {
        match self {
            Self::Or(items) => items.iter().any(|p| p.matches(jp)),
            Self::And(items) => items.iter().all(|p| p.matches(jp)),
            Self::Not(inner) => !inner.matches(jp),
            Self::Execution(sig) => sig.matches(jp),
            Self::Within(pattern) => {
                if pattern.is_single_segment() {
                    pattern.matches(&jp.class.name)
                } else {
                    pattern.matches(&jp.module_path()) || pattern.matches(&jp.type_path())
                }
            }
            Self::HasAnnotation(pattern) => jp
                .method
                .annotations
                .iter()
                .chain(&jp.class.annotations)
                .any(|a| pattern.matches(&a.name) || pattern.matches(&a.path)),
            Self::Visibility(filter) => filter.matches(&jp.method.visibility),
            Self::Name(pattern) => pattern.matches(&jp.method.name),
            Self::Args(range) => range.contains(jp.method.signature.arity()),
            Self::Receiver(receiver) => jp.method.signature.receiver == *receiver,
            Self::Returns(pattern) => pattern.matches(jp.method.signature.return_type()),
            Self::Implements(pattern) => jp.method.implements.as_deref().is_some_and(|t| {
                pattern.matches(t) || pattern.matches(t.rsplit("::").next().unwrap_or(t))
            }),
            Self::Async => jp.method.signature.is_async,
            Self::Unsafe => jp.method.signature.is_unsafe,
            Self::Named { expr, .. } => expr.matches(jp),
        }
    }
}

impl fmt::Display for Pointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |f: &mut fmt::Formatter<'_>, items: &[Pointcut], op: &str| {
            write!(f, "(")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, " {op} ")?;
                }
                write!(f, "{item}")?;
            }
            write!(f, ")")
        };
        match self {
            Self::Or(items) => list(f, items, "||"),
            Self::And(items) => list(f, items, "&&"),
            Self::Not(inner) => write!(f, "!{inner}"),
            Self::Execution(sig) => write!(f, "execution({sig})"),
            Self::Within(p) => write!(f, "within({p})"),
            Self::HasAnnotation(p) => write!(f, "has-annotation({p})"),
            Self::Visibility(v) => write!(f, "{v}"),
            Self::Name(p) => write!(f, "name({p})"),
            Self::Args(ArgsRange { min, max }) => match max {
                Some(max) if max == min => write!(f, "args({min})"),
                Some(max) => write!(f, "args({min}..{max})"),
                None => write!(f, "args({min}..)"),
            },
            Self::Receiver(r) => write!(
                f,
                "receiver({})",
                match r {
                    Receiver::None => "none",
                    Receiver::Value => "value",
                    Receiver::Ref => "ref",
                    Receiver::RefMut => "mut",
                }
            ),
            Self::Returns(p) => write!(f, "returns({p})"),
            Self::Implements(p) => write!(f, "implements({p})"),
            Self::Async => write!(f, "async"),
            Self::Unsafe => write!(f, "unsafe"),
            Self::Named { name, .. } => write!(f, "pointcut({name})"),
        }
    }
}
