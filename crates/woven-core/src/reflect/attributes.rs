//! Attribute and doc-comment extraction.

use quote::ToTokens;
use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, Lit, Meta, Path, Token};

use super::model::{Annotation, AnnotationSource};

/// Converts a syn Path to its `::` joined form.
///
/// A leading `::` is kept so `::woven::advised` and `woven::advised` stay
/// distinguishable in diagnostics.
#[must_use]
pub fn path_to_string(path: &Path) -> String {
    let joined = path
        .segments
        .iter()
        .map(|seg| seg.ident.to_string())
        .collect::<Vec<_>>()
        .join("::");
    if path.leading_colon.is_some() {
        format!("::{joined}")
    } else {
        joined
    }
}

/// Extracts every annotation from an item's attributes.
///
/// `doc` attributes contribute `@Tag` lines only; `annotate(..)` contributes
/// one annotation per listed name in addition to itself.
#[must_use]
pub fn annotations(attrs: &[Attribute]) -> Vec<Annotation> {
    let mut out = Vec::new();
    for attr in attrs {
        if attr.path().is_ident("doc") {
            if let Some(doc) = str_value(attr) {
                out.extend(doc_tags(&doc));
            }
            continue;
        }

        let path = path_to_string(attr.path());
        let name = last_segment(&path).to_string();
        let args = match &attr.meta {
            Meta::Path(_) => None,
            Meta::List(list) => Some(normalize_tokens(&list.tokens.to_string())),
            Meta::NameValue(nv) => Some(normalize_tokens(
                &nv.value.to_token_stream().to_string(),
            )),
        };

        if name == "annotate" {
            let parser = Punctuated::<Path, Token![,]>::parse_terminated;
            if let Ok(names) = attr.parse_args_with(parser) {
                out.extend(names.iter().map(|p| {
                    let full = path_to_string(p);
                    Annotation {
                        name: last_segment(&full).to_string(),
                        path: full,
                        args: None,
                        source: AnnotationSource::Annotate,
                    }
                }));
            }
        }

        out.push(Annotation {
            name,
            path,
            args,
            source: AnnotationSource::Attribute,
        });
    }
    out
}

/// Extracts the string from `#[name = "value"]`.
#[must_use]
pub fn get_attr_value(attrs: &[Attribute], name: &str) -> Option<String> {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident(name))
        .find_map(str_value)
}

/// Returns the first attribute with the given single-segment name.
#[must_use]
pub fn find_attr<'a>(attrs: &'a [Attribute], name: &str) -> Option<&'a Attribute> {
    attrs.iter().find(|attr| attr.path().is_ident(name))
}

fn str_value(attr: &Attribute) -> Option<String> {
    if let Meta::NameValue(nv) = &attr.meta {
        if let Expr::Lit(lit) = &nv.value {
            if let Lit::Str(s) = &lit.lit {
                return Some(s.value());
            }
        }
    }
    None
}

/// Parses `@Name` and `@Name(args)` tags from doc text, one per line.
fn doc_tags(doc: &str) -> Vec<Annotation> {
    doc.lines()
        .filter_map(|line| {
            let rest = line.trim().trim_start_matches('*').trim_start().strip_prefix('@')?;
            let end = rest
                .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == ':'))
                .unwrap_or(rest.len());
            let path = rest[..end].trim_end_matches(':');
            if path.is_empty() {
                return None;
            }
            let tail = rest[end..].trim_start();
            let args = tail
                .strip_prefix('(')
                .and_then(|t| t.rfind(')').map(|close| t[..close].trim().to_string()));
            Some(Annotation {
                name: last_segment(path).to_string(),
                path: path.to_string(),
                args,
                source: AnnotationSource::DocTag,
            })
        })
        .collect()
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Removes token-stream spacing, keeping a single space only where two
/// identifier characters would otherwise merge (`&'a str`, `dyn Fn`).
#[must_use]
pub fn normalize_tokens(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            let prev_ident = out
                .chars()
                .last()
                .is_some_and(|p| p.is_alphanumeric() || p == '_');
            if prev_ident && (c.is_alphanumeric() || c == '_') {
                out.push(' ');
            }
            pending_space = false;
        }
        out.push(c);
    }
    out
}

/// Normalised token text of any syntax node.
#[must_use]
pub fn tokens_of<T: ToTokens>(node: &T) -> String {
    normalize_tokens(&node.to_token_stream().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn plain_attributes_use_last_segment() {
        let attrs: Vec<Attribute> = vec![
            parse_quote!(#[inline]),
            parse_quote!(#[tracing::instrument(skip(self))]),
        ];
        let found = annotations(&attrs);
        assert_eq!(found[0].name, "inline");
        assert_eq!(found[1].name, "instrument");
        assert_eq!(found[1].path, "tracing::instrument");
        assert_eq!(found[1].args.as_deref(), Some("skip(self)"));
    }

    #[test]
    fn annotate_lists_names() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[woven::annotate(Cached, audit::Audit)])];
        let names: Vec<_> = annotations(&attrs)
            .into_iter()
            .map(|a| (a.name, a.source))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Cached".to_string(), AnnotationSource::Annotate),
                ("Audit".to_string(), AnnotationSource::Annotate),
                ("annotate".to_string(), AnnotationSource::Attribute),
            ]
        );
    }

    #[test]
    fn doc_tags_are_annotations() {
        let attrs: Vec<Attribute> = vec![
            parse_quote!(#[doc = " Loads a user."]),
            parse_quote!(#[doc = " @Cached(ttl = 60)"]),
            parse_quote!(#[doc = " email: user@example.com"]),
        ];
        let found = annotations(&attrs);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Cached");
        assert_eq!(found[0].args.as_deref(), Some("ttl = 60"));
        assert_eq!(found[0].source, AnnotationSource::DocTag);
    }

    #[test]
    fn leading_colon_is_kept() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[::woven::advised])];
        let found = annotations(&attrs);
        assert_eq!(found[0].path, "::woven::advised");
        assert!(found[0].has_path("woven::advised"));
    }

    #[test]
    fn normalizes_type_text() {
        assert_eq!(normalize_tokens("& 'a str"), "&'a str");
        assert_eq!(normalize_tokens("Vec < u8 >"), "Vec<u8>");
        assert_eq!(normalize_tokens("& mut dyn Fn (u8) -> u8"), "&mut dyn Fn(u8)->u8");
    }

    #[test]
    fn reads_name_value() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[path = "x/y.rs"])];
        assert_eq!(get_attr_value(&attrs, "path").as_deref(), Some("x/y.rs"));
        assert!(find_attr(&attrs, "path").is_some());
    }
}
