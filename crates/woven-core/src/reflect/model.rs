//! Read-only structural model of one unit.
//!
//! Built by [`reflect`](super::reflect) and discarded once the unit is woven.
//! Nothing in here is ever mutated after construction.

use serde::Serialize;
use std::fmt;

use crate::types::ByteSpan;

/// What kind of declaration a [`ClassNode`] stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassKind {
    /// `struct`
    Struct,
    /// `enum`
    Enum,
    /// `union`
    Union,
    /// `trait`
    Trait,
    /// A type only seen as an `impl` target in this unit.
    ImplOnly,
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Struct => write!(f, "struct"),
            Self::Enum => write!(f, "enum"),
            Self::Union => write!(f, "union"),
            Self::Trait => write!(f, "trait"),
            Self::ImplOnly => write!(f, "impl"),
        }
    }
}

/// Declared visibility of a class or member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    /// `pub`, and every trait or trait-impl method.
    Public,
    /// `pub(crate)`
    Crate,
    /// `pub(super)`, `pub(self)`, `pub(in path)`
    Restricted(String),
    /// No visibility modifier.
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "pub"),
            Self::Crate => write!(f, "pub(crate)"),
            Self::Restricted(path) => write!(f, "pub({path})"),
            Self::Private => write!(f, "private"),
        }
    }
}

/// Where an annotation was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnotationSource {
    /// An ordinary attribute, named by its last path segment.
    Attribute,
    /// A name listed in `#[annotate(..)]`.
    Annotate,
    /// An `@Name` tag on a doc comment line.
    DocTag,
}

/// Attribute metadata attached to a class or member.
///
/// Arguments are kept as opaque token text; nothing is evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Annotation {
    /// Name used by `has-annotation(..)`.
    pub name: String,
    /// Full path as written, without spaces (e.g. `woven::advised`).
    pub path: String,
    /// Raw argument text, if any.
    pub args: Option<String>,
    /// Where the annotation came from.
    pub source: AnnotationSource,
}

impl Annotation {
    /// Returns true if the annotation's full path equals `path`, ignoring a
    /// leading `::`.
    #[must_use]
    pub fn has_path(&self, path: &str) -> bool {
        self.source == AnnotationSource::Attribute
            && self.path.trim_start_matches("::") == path.trim_start_matches("::")
    }
}

/// How a method takes `self`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Receiver {
    /// Associated function without `self`.
    None,
    /// `self`, `mut self`, `self: Box<Self>`, ...
    Value,
    /// `&self`
    Ref,
    /// `&mut self`
    RefMut,
}

/// One non-receiver parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Param {
    /// Binding name, `_` for destructuring patterns.
    pub name: String,
    /// Normalised type text (e.g. `&str`, `Vec<u8>`).
    pub ty: String,
}

/// The externally observable shape of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Signature {
    /// Receiver form.
    pub receiver: Receiver,
    /// Parameters after the receiver.
    pub params: Vec<Param>,
    /// Normalised return type, `None` for `()`.
    pub output: Option<String>,
    /// `async fn`
    pub is_async: bool,
    /// `const fn`
    pub is_const: bool,
    /// `unsafe fn`
    pub is_unsafe: bool,
    /// Has generic parameters.
    pub is_generic: bool,
}

impl Signature {
    /// Number of parameters, receiver excluded.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Return type text, `()` when omitted.
    #[must_use]
    pub fn return_type(&self) -> &str {
        self.output.as_deref().unwrap_or("()")
    }
}

/// A method declared in an `impl` block or a trait.
#[derive(Debug, Clone, Serialize)]
pub struct MethodNode {
    /// Method name.
    pub name: String,
    /// Declared visibility.
    pub visibility: Visibility,
    /// Signature shape.
    pub signature: Signature,
    /// Attributes, `annotate` names and doc tags.
    pub annotations: Vec<Annotation>,
    /// Trait path when declared in `impl Trait for Type`.
    pub implements: Option<String>,
    /// Whole item including attributes and doc comments.
    pub span: ByteSpan,
    /// Offset of the first token after the attributes.
    pub decl_start: usize,
    /// The `fn` signature.
    pub signature_span: ByteSpan,
    /// The body block, braces included. `None` for required trait methods.
    pub body: Option<ByteSpan>,
}

impl MethodNode {
    /// Returns true if an annotation with this exact path is present.
    #[must_use]
    pub fn has_attribute(&self, path: &str) -> bool {
        self.annotations.iter().any(|a| a.has_path(path))
    }

    /// Why the method cannot be wrapped, if it cannot.
    #[must_use]
    pub fn unweavable_reason(&self) -> Option<&'static str> {
        if self.body.is_none() {
            Some("method has no body")
        } else if self.signature.is_const {
            Some("const fn cannot call advice")
        } else if self.signature.is_async {
            Some("async fn is not supported")
        } else {
            None
        }
    }
}

/// A field of a struct or union.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyNode {
    /// Field name, or its index for tuple structs.
    pub name: String,
    /// Declared visibility.
    pub visibility: Visibility,
    /// Normalised type text.
    pub ty: String,
    /// Attributes and doc tags.
    pub annotations: Vec<Annotation>,
    /// The field declaration.
    pub span: ByteSpan,
}

/// A type-like declaration and the members found for it in this unit.
#[derive(Debug, Clone, Serialize)]
pub struct ClassNode {
    /// Type name.
    pub name: String,
    /// Declaration kind.
    pub kind: ClassKind,
    /// Inline `mod` nesting inside the unit, outermost first.
    pub module_path: Vec<String>,
    /// Declared visibility ([`Visibility::Private`] for impl-only types).
    pub visibility: Visibility,
    /// Declaration annotations.
    pub annotations: Vec<Annotation>,
    /// Declaration span, `None` for impl-only types.
    pub span: Option<ByteSpan>,
    /// Methods from the trait body or from every `impl` block in the unit.
    pub methods: Vec<MethodNode>,
    /// Fields.
    pub properties: Vec<PropertyNode>,
}

impl ClassNode {
    /// Module path of the class inside `unit` (e.g. `crate::billing::inner`).
    #[must_use]
    pub fn module_in(&self, unit: &str) -> String {
        std::iter::once(unit)
            .chain(self.module_path.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("::")
    }
}

/// An out-of-line `mod name;` declaration.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleDecl {
    /// Module path relative to the unit: enclosing inline modules, then the name.
    pub path: Vec<String>,
    /// Literal of an explicit `#[path = ".."]` attribute.
    pub path_attr: Option<String>,
    /// Span of that string literal, quotes included.
    pub path_attr_span: Option<ByteSpan>,
    /// Offset of the first token after the attributes.
    pub decl_start: usize,
    /// Whole declaration.
    pub span: ByteSpan,
}

impl ModuleDecl {
    /// Declared module name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.last().map_or("", String::as_str)
    }
}

/// Structural model of one unit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StructuralModel {
    classes: Vec<ClassNode>,
    modules: Vec<ModuleDecl>,
}

impl StructuralModel {
    pub(crate) fn new(classes: Vec<ClassNode>, modules: Vec<ModuleDecl>) -> Self {
        Self { classes, modules }
    }

    /// Classes in order of first appearance.
    #[must_use]
    pub fn classes(&self) -> &[ClassNode] {
        &self.classes
    }

    /// Out-of-line module declarations in source order.
    #[must_use]
    pub fn modules(&self) -> &[ModuleDecl] {
        &self.modules
    }

    /// Looks up a class by name, ignoring inline module nesting.
    #[must_use]
    pub fn class(&self, name: &str) -> Option<&ClassNode> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Iterates over every method with its class.
    pub fn methods(&self) -> impl Iterator<Item = (&ClassNode, &MethodNode)> {
        self.classes
            .iter()
            .flat_map(|c| c.methods.iter().map(move |m| (c, m)))
    }

    /// Returns true if the unit declares no classes and no modules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.modules.is_empty()
    }
}
