//! Keeps `file!()` reporting the original source file.

use proc_macro2::{Delimiter, Literal, TokenStream, TokenTree};
use quote::ToTokens;

use super::SourceTransformer;
use crate::context::{LineIndex, UnitContext};
use crate::error::{MalformedSource, WeaveError};
use crate::types::{ByteSpan, SourceText};
use crate::weave::splice::{self, Edit};

/// Replaces `file!()` with the original file path as a string literal.
///
/// Woven units are compiled from the output directory, so `file!()` would
/// name the woven copy. Calls are found anywhere in the token stream,
/// including inside other macro invocations such as `panic!`, except in
/// `macro_rules!` bodies. Line numbers are already preserved by the weaver,
/// so `line!()` needs no rewrite.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceLocation;

impl SourceTransformer for SourceLocation {
    fn name(&self) -> &'static str {
        "source-location"
    }

    fn description(&self) -> &'static str {
        "Rewrites file!() to the original source path"
    }

    fn transform(
        &self,
        ctx: &UnitContext<'_>,
        text: SourceText,
    ) -> Result<SourceText, WeaveError> {
        let file = syn::parse_file(&text)
            .map_err(|e| WeaveError::malformed(ctx.unit, MalformedSource::from_syn(&e, &text)))?;
        let index = LineIndex::new(&text);
        let mut spans = Vec::new();
        collect(file.into_token_stream(), &index, &mut spans);
        if spans.is_empty() {
            return Ok(text);
        }

        let literal = Literal::string(&ctx.location.path.to_string_lossy()).to_string();
        let edits = spans
            .into_iter()
            .map(|span| Edit::replace(span, literal.clone()))
            .collect();
        splice::apply(&text, edits).map_err(|source| WeaveError::Splice {
            unit: ctx.unit.clone(),
            source,
        })
    }
}

fn collect(stream: TokenStream, index: &LineIndex<'_>, spans: &mut Vec<ByteSpan>) {
    let tokens: Vec<TokenTree> = stream.into_iter().collect();
    let mut macro_body = None;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            TokenTree::Group(_) if macro_body == Some(i) => {}
            TokenTree::Group(group) => collect(group.stream(), index, spans),
            TokenTree::Ident(ident) if ident == "macro_rules" => {
                macro_body = macro_rules_body(&tokens, i);
            }
            TokenTree::Ident(ident) if ident == "file" => {
                if let Some(span) = file_call_at(&tokens, i, index) {
                    spans.push(span);
                }
            }
            _ => {}
        }
    }
}

/// Index of the body of a `macro_rules! name { .. }` starting at `i`.
///
/// `file!()` in a macro body resolves where the macro is expanded, which may
/// be another unit, so bodies are left alone.
fn macro_rules_body(tokens: &[TokenTree], i: usize) -> Option<usize> {
    match (tokens.get(i + 1), tokens.get(i + 2), tokens.get(i + 3)) {
        (Some(TokenTree::Punct(bang)), Some(TokenTree::Ident(_)), Some(TokenTree::Group(_)))
            if bang.as_char() == '!' =>
        {
            Some(i + 3)
        }
        _ => None,
    }
}

/// Span of a `file!()` call whose name is at `i`, std/core prefix included.
fn file_call_at(tokens: &[TokenTree], i: usize, index: &LineIndex<'_>) -> Option<ByteSpan> {
    let (Some(TokenTree::Punct(bang)), Some(TokenTree::Group(args))) =
        (tokens.get(i + 1), tokens.get(i + 2))
    else {
        return None;
    };
    if bang.as_char() != '!'
        || args.delimiter() != Delimiter::Parenthesis
        || !args.stream().is_empty()
    {
        return None;
    }

    let start = path_start(tokens, i)?;
    Some(ByteSpan::new(
        index.start_of(tokens.get(start)?.span())?,
        index.end_of(args.span())?,
    ))
}

/// Index of the first token of the macro path ending at `i`.
///
/// Accepts `file`, `std::file`, `core::file` and their `::`-rooted forms;
/// any other path names a different macro.
fn path_start(tokens: &[TokenTree], i: usize) -> Option<usize> {
    let is_colon = |j: usize| matches!(tokens.get(j), Some(TokenTree::Punct(p)) if p.as_char() == ':');
    let is_dollar = |j: usize| matches!(tokens.get(j), Some(TokenTree::Punct(p)) if p.as_char() == '$');

    if i == 0 || !is_colon(i - 1) {
        return (i == 0 || !is_dollar(i - 1)).then_some(i);
    }
    if i < 3 || !is_colon(i - 2) {
        return None;
    }
    let krate = i - 3;
    match tokens.get(krate) {
        Some(TokenTree::Ident(name)) if name == "std" || name == "core" => {}
        _ => return None,
    }
    if krate >= 2 && is_colon(krate - 1) && is_colon(krate - 2) {
        let rooted = krate == 2 || !matches!(tokens.get(krate - 3), Some(TokenTree::Ident(_)));
        rooted.then_some(krate - 2)
    } else {
        Some(krate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspect::Fingerprint;
    use crate::types::{UnitId, UnitLocation};

    fn run(text: &str) -> String {
        let unit = UnitId::parse("crate::billing").unwrap();
        let location = UnitLocation::new("/p/src/billing.rs", "/p/src");
        let fingerprint = Fingerprint::of(["t"]);
        let ctx = UnitContext::new(&unit, &location, &fingerprint);
        SourceLocation.transform(&ctx, text.to_string()).unwrap()
    }

    #[test]
    fn rewrites_calls() {
        assert_eq!(
            run("fn f() -> &'static str { file!() }\n"),
            "fn f() -> &'static str { \"/p/src/billing.rs\" }\n"
        );
    }

    #[test]
    fn rewrites_nested_and_prefixed_calls() {
        let out = run(
            "fn f() {\n    panic!(\"at {}\", std::file!());\n    let _ = ::core::file!();\n}\n",
        );
        assert_eq!(
            out,
            "fn f() {\n    panic!(\"at {}\", \"/p/src/billing.rs\");\n    let _ = \"/p/src/billing.rs\";\n}\n"
        );
    }

    #[test]
    fn leaves_macro_rules_bodies_alone() {
        let text = "macro_rules! here {\n    () => { file!() };\n}\n\nfn f() -> &'static str { file!() }\n";
        assert_eq!(
            run(text),
            "macro_rules! here {\n    () => { file!() };\n}\n\nfn f() -> &'static str { \"/p/src/billing.rs\" }\n"
        );
    }

    #[test]
    fn leaves_other_macros_alone() {
        let text = "fn f() {\n    let file = 1;\n    other::file!();\n    println!(\"file!()\");\n}\n";
        assert_eq!(run(text), text);
    }
}
