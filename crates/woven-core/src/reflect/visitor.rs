//! AST visitor that collects classes, members and module declarations.

use std::collections::HashMap;

use proc_macro2::Span;
use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::visit::Visit;

use super::attributes::{annotations, find_attr, get_attr_value, path_to_string, tokens_of};
use super::model::{
    ClassKind, ClassNode, MethodNode, ModuleDecl, Param, PropertyNode, Receiver, Signature,
    StructuralModel, Visibility,
};
use crate::context::LineIndex;
use crate::types::ByteSpan;

/// Collects the structural model of one file.
///
/// Only item-level declarations are visited: blocks are never entered, so
/// items declared inside function bodies or constants are not part of the
/// model.
pub(crate) struct ModelBuilder<'t> {
    index: LineIndex<'t>,
    scope: Vec<String>,
    classes: Vec<ClassNode>,
    class_index: HashMap<(Vec<String>, String), usize>,
    modules: Vec<ModuleDecl>,
}

/// The parts of a method shared by `impl` items and trait items.
struct MethodParts<'a> {
    attrs: &'a [syn::Attribute],
    vis: Visibility,
    vis_span: Option<Span>,
    sig: &'a syn::Signature,
    block: Option<&'a syn::Block>,
    whole: Span,
    implements: Option<String>,
}

impl<'t> ModelBuilder<'t> {
    pub(crate) fn new(text: &'t str) -> Self {
        Self {
            index: LineIndex::new(text),
            scope: Vec::new(),
            classes: Vec::new(),
            class_index: HashMap::new(),
            modules: Vec::new(),
        }
    }

    pub(crate) fn finish(self) -> StructuralModel {
        StructuralModel::new(self.classes, self.modules)
    }

    /// Returns the index of the class, creating or upgrading it.
    ///
    /// An `ImplOnly` entry is upgraded in place when its declaration appears
    /// after the `impl` block.
    fn class(
        &mut self,
        name: String,
        kind: ClassKind,
        visibility: Visibility,
        attrs: &[syn::Attribute],
        span: Option<ByteSpan>,
    ) -> usize {
        let key = (self.scope.clone(), name.clone());
        if let Some(&idx) = self.class_index.get(&key) {
            let existing = &mut self.classes[idx];
            if existing.kind == ClassKind::ImplOnly && kind != ClassKind::ImplOnly {
                existing.kind = kind;
                existing.visibility = visibility;
                existing.annotations = annotations(attrs);
                existing.span = span;
            }
            return idx;
        }

        self.classes.push(ClassNode {
            name,
            kind,
            module_path: self.scope.clone(),
            visibility,
            annotations: annotations(attrs),
            span,
            methods: Vec::new(),
            properties: Vec::new(),
        });
        let idx = self.classes.len() - 1;
        self.class_index.insert(key, idx);
        idx
    }

    fn method(&self, parts: MethodParts<'_>) -> Option<MethodNode> {
        let span = self.index.span(parts.whole)?;
        let signature_span = self.index.span(parts.sig.span())?;
        let decl_start = match parts.vis_span {
            Some(vis) => self.index.start_of(vis)?,
            None => signature_span.start,
        };
        let body = match parts.block {
            Some(block) => Some(self.index.span(block.span())?),
            None => None,
        };

        Some(MethodNode {
            name: parts.sig.ident.unraw().to_string(),
            visibility: parts.vis,
            signature: signature(parts.sig),
            annotations: annotations(parts.attrs),
            implements: parts.implements,
            span,
            decl_start,
            signature_span,
            body,
        })
    }

    fn properties(&self, fields: &syn::Fields) -> Vec<PropertyNode> {
        fields
            .iter()
            .enumerate()
            .filter_map(|(i, field)| {
                Some(PropertyNode {
                    name: field
                        .ident
                        .as_ref()
                        .map_or_else(|| i.to_string(), |ident| ident.unraw().to_string()),
                    visibility: visibility(&field.vis),
                    ty: tokens_of(&field.ty),
                    annotations: annotations(&field.attrs),
                    span: self.index.span(field.span())?,
                })
            })
            .collect()
    }
}

impl<'ast> Visit<'ast> for ModelBuilder<'_> {
    fn visit_block(&mut self, _block: &'ast syn::Block) {}

    fn visit_item_fn(&mut self, _item: &'ast syn::ItemFn) {}

    fn visit_item_struct(&mut self, item: &'ast syn::ItemStruct) {
        let span = self.index.span(item.span());
        let idx = self.class(
            item.ident.unraw().to_string(),
            ClassKind::Struct,
            visibility(&item.vis),
            &item.attrs,
            span,
        );
        self.classes[idx].properties = self.properties(&item.fields);
    }

    fn visit_item_union(&mut self, item: &'ast syn::ItemUnion) {
        let span = self.index.span(item.span());
        let idx = self.class(
            item.ident.unraw().to_string(),
            ClassKind::Union,
            visibility(&item.vis),
            &item.attrs,
            span,
        );
        self.classes[idx].properties =
            self.properties(&syn::Fields::Named(item.fields.clone()));
    }

    fn visit_item_enum(&mut self, item: &'ast syn::ItemEnum) {
        let span = self.index.span(item.span());
        self.class(
            item.ident.unraw().to_string(),
            ClassKind::Enum,
            visibility(&item.vis),
            &item.attrs,
            span,
        );
    }

    fn visit_item_trait(&mut self, item: &'ast syn::ItemTrait) {
        let span = self.index.span(item.span());
        let idx = self.class(
            item.ident.unraw().to_string(),
            ClassKind::Trait,
            visibility(&item.vis),
            &item.attrs,
            span,
        );

        let methods: Vec<_> = item
            .items
            .iter()
            .filter_map(|trait_item| match trait_item {
                syn::TraitItem::Fn(f) => self.method(MethodParts {
                    attrs: &f.attrs,
                    vis: Visibility::Public,
                    vis_span: None,
                    sig: &f.sig,
                    block: f.default.as_ref(),
                    whole: f.span(),
                    implements: None,
                }),
                _ => None,
            })
            .collect();
        self.classes[idx].methods.extend(methods);
    }

    fn visit_item_impl(&mut self, item: &'ast syn::ItemImpl) {
        let Some(name) = self_type_name(&item.self_ty) else {
            return;
        };
        let implements = item
            .trait_
            .as_ref()
            .map(|(_, path, _)| path_to_string(path));

        let methods: Vec<_> = item
            .items
            .iter()
            .filter_map(|impl_item| match impl_item {
                syn::ImplItem::Fn(f) => {
                    let (vis, first) = if implements.is_some() {
                        (Visibility::Public, None)
                    } else {
                        (visibility(&f.vis), vis_span(&f.vis))
                    };
                    self.method(MethodParts {
                        attrs: &f.attrs,
                        vis,
                        vis_span: first.or_else(|| f.defaultness.map(|d| d.span)),
                        sig: &f.sig,
                        block: Some(&f.block),
                        whole: f.span(),
                        implements: implements.clone(),
                    })
                }
                _ => None,
            })
            .collect();

        let idx = self.class(name, ClassKind::ImplOnly, Visibility::Private, &[], None);
        self.classes[idx].methods.extend(methods);
    }

    fn visit_item_mod(&mut self, item: &'ast syn::ItemMod) {
        let name = item.ident.unraw().to_string();
        match &item.content {
            Some((_, items)) => {
                self.scope.push(name);
                for inner in items {
                    self.visit_item(inner);
                }
                self.scope.pop();
            }
            None => {
                let first = vis_span(&item.vis)
                    .or_else(|| item.unsafety.map(|u| u.span))
                    .unwrap_or(item.mod_token.span);
                let (Some(span), Some(decl_start)) =
                    (self.index.span(item.span()), self.index.start_of(first))
                else {
                    return;
                };
                let path_attr_span = find_attr(&item.attrs, "path").and_then(|attr| match &attr.meta {
                    syn::Meta::NameValue(nv) => self.index.span(nv.value.span()),
                    _ => None,
                });
                let mut path = self.scope.clone();
                path.push(name);
                self.modules.push(ModuleDecl {
                    path,
                    path_attr: get_attr_value(&item.attrs, "path"),
                    path_attr_span,
                    decl_start,
                    span,
                });
            }
        }
    }
}

fn signature(sig: &syn::Signature) -> Signature {
    let receiver = sig.receiver().map_or(Receiver::None, |r| match r.ty.as_ref() {
        syn::Type::Reference(reference) if reference.mutability.is_some() => Receiver::RefMut,
        syn::Type::Reference(_) => Receiver::Ref,
        _ => Receiver::Value,
    });

    let params = sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            syn::FnArg::Typed(pat_type) => Some(Param {
                name: match pat_type.pat.as_ref() {
                    syn::Pat::Ident(pat) => pat.ident.unraw().to_string(),
                    _ => "_".to_string(),
                },
                ty: tokens_of(&pat_type.ty),
            }),
            syn::FnArg::Receiver(_) => None,
        })
        .collect();

    let output = match &sig.output {
        syn::ReturnType::Default => None,
        syn::ReturnType::Type(_, ty) => Some(tokens_of(ty)),
    };

    Signature {
        receiver,
        params,
        output,
        is_async: sig.asyncness.is_some(),
        is_const: sig.constness.is_some(),
        is_unsafe: sig.unsafety.is_some(),
        is_generic: !sig.generics.params.is_empty(),
    }
}

fn visibility(vis: &syn::Visibility) -> Visibility {
    match vis {
        syn::Visibility::Public(_) => Visibility::Public,
        syn::Visibility::Restricted(r) if r.in_token.is_none() && r.path.is_ident("crate") => {
            Visibility::Crate
        }
        syn::Visibility::Restricted(r) => {
            let path = path_to_string(&r.path);
            if r.in_token.is_some() {
                Visibility::Restricted(format!("in {path}"))
            } else {
                Visibility::Restricted(path)
            }
        }
        syn::Visibility::Inherited => Visibility::Private,
    }
}

fn vis_span(vis: &syn::Visibility) -> Option<Span> {
    match vis {
        syn::Visibility::Inherited => None,
        other => Some(other.span()),
    }
}

/// Name of the type an `impl` block targets: the last path segment,
/// looking through references, parentheses and groups.
fn self_type_name(ty: &syn::Type) -> Option<String> {
    match ty {
        syn::Type::Path(path) => path
            .path
            .segments
            .last()
            .map(|seg| seg.ident.unraw().to_string()),
        syn::Type::Reference(reference) => self_type_name(&reference.elem),
        syn::Type::Paren(paren) => self_type_name(&paren.elem),
        syn::Type::Group(group) => self_type_name(&group.elem),
        _ => None,
    }
}
