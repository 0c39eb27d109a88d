//! Pointcut expressions: parsing and matching against the structural model.
//!
//! Expressions are parsed once, when the configuration is loaded, and are
//! pure predicates afterwards. See [`parser`] for the grammar.

mod expr;
mod matcher;
pub mod parser;
pub mod pattern;

pub use expr::{
    ArgsRange, JoinPointView, ParamsPattern, Pointcut, SignaturePattern, VisibilityFilter,
};
pub use matcher::{match_model, Match};
pub use parser::{parse, PointcutParser};
pub use pattern::{ModulePattern, NamePattern, TypePattern};

use miette::Diagnostic;

/// A pointcut expression that cannot be evaluated.
///
/// Raised while loading the configuration, never while weaving.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Diagnostic)]
pub enum PointcutEvalError {
    /// The expression is empty.
    #[error("empty pointcut expression")]
    #[diagnostic(code(woven::pointcut::empty))]
    Empty,

    /// The expression is not well formed.
    #[error("expected {expected} at offset {offset} in `{expr}`, found {found}")]
    #[diagnostic(code(woven::pointcut::syntax))]
    Syntax {
        /// Full expression text.
        expr: String,
        /// Byte offset of the problem.
        offset: usize,
        /// What the parser expected.
        expected: String,
        /// What it found instead.
        found: String,
    },

    /// A predicate name the matcher does not support.
    #[error("unsupported predicate `{name}` in `{expr}`")]
    #[diagnostic(
        code(woven::pointcut::unknown_predicate),
        help("supported: execution, within, has-annotation, name, args, receiver, returns, implements, pointcut, public, private, crate, restricted, async, unsafe")
    )]
    UnknownPredicate {
        /// The predicate name.
        name: String,
        /// The expression it appeared in.
        expr: String,
    },

    /// A glob, regex, type or path pattern is invalid.
    #[error("invalid pattern `{pattern}`: {reason}")]
    #[diagnostic(code(woven::pointcut::pattern))]
    InvalidPattern {
        /// The pattern text.
        pattern: String,
        /// Why it is invalid.
        reason: String,
    },

    /// `pointcut(name)` refers to an undefined pointcut.
    #[error("unknown named pointcut `{name}`")]
    #[diagnostic(code(woven::pointcut::unknown_named))]
    UnknownNamed {
        /// The missing name.
        name: String,
    },

    /// Named pointcuts reference each other in a cycle.
    #[error("named pointcut cycle: {}", .chain.join(" -> "))]
    #[diagnostic(code(woven::pointcut::cycle))]
    Cycle {
        /// The names along the cycle.
        chain: Vec<String>,
    },
}
