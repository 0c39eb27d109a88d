//! Points every out-of-line `mod name;` at the child's woven output.

use proc_macro2::Literal;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::SourceTransformer;
use crate::context::UnitContext;
use crate::error::WeaveError;
use crate::layout::OutputLayout;
use crate::reflect::{reflect, ModuleDecl};
use crate::types::{SourceText, UnitLocation};
use crate::weave::splice::{self, Edit};

/// Rewrites nested module declarations so they load woven units.
///
/// A `mod billing;` in a woven unit would otherwise be resolved next to the
/// woven file, or next to the including file when the unit is pulled in with
/// `include!`. Each one gets an absolute `#[path]` to the layout location of
/// the child unit instead.
///
/// Declarations that already carry a different `#[path]` are loaded
/// unwoven: a relative one is rebased onto the original source tree so it
/// still resolves from the woven location.
#[derive(Debug, Clone)]
pub struct RecursiveLoadGuarantor {
    layout: OutputLayout,
}

impl RecursiveLoadGuarantor {
    /// Creates the pass for `layout`.
    #[must_use]
    pub fn new(layout: OutputLayout) -> Self {
        Self { layout }
    }
}

impl SourceTransformer for RecursiveLoadGuarantor {
    fn name(&self) -> &'static str {
        "recursive-load"
    }

    fn description(&self) -> &'static str {
        "Routes nested module loads to woven output"
    }

    fn settings(&self) -> String {
        self.layout.root().to_string_lossy().into_owned()
    }

    fn transform(
        &self,
        ctx: &UnitContext<'_>,
        text: SourceText,
    ) -> Result<SourceText, WeaveError> {
        let model = reflect(&text).map_err(|e| WeaveError::malformed(ctx.unit, e))?;
        let mut edits = Vec::new();

        for decl in model.modules() {
            let child = decl
                .path
                .iter()
                .fold(ctx.unit.clone(), |unit, segment| unit.child(segment));
            let woven = self.layout.path_for(&child);

            match (decl.path_attr.as_deref(), decl.path_attr_span) {
                (None, _) => {
                    debug!(unit = %ctx.unit, module = %child, "routing module to woven output");
                    edits.push(Edit::insert(
                        decl.decl_start,
                        format!("#[path = {}] ", path_literal(&woven)),
                    ));
                }
                (Some(existing), _) if Path::new(existing) == woven => {}
                (Some(existing), Some(span)) if Path::new(existing).is_relative() => {
                    let original = original_path(ctx.location, decl, existing);
                    warn!(
                        unit = %ctx.unit,
                        module = %child,
                        path = %original.display(),
                        "module has an explicit #[path]; it is loaded unwoven"
                    );
                    edits.push(Edit::replace(span, path_literal(&original)));
                }
                (Some(existing), _) => {
                    warn!(
                        unit = %ctx.unit,
                        module = %child,
                        path = existing,
                        "module has an explicit #[path]; it is loaded unwoven"
                    );
                }
            }
        }

        if edits.is_empty() {
            return Ok(text);
        }
        splice::apply(&text, edits).map_err(|source| WeaveError::Splice {
            unit: ctx.unit.clone(),
            source,
        })
    }
}

fn path_literal(path: &Path) -> String {
    Literal::string(&path.to_string_lossy()).to_string()
}

/// Where the compiler would have resolved a relative `#[path]` from the
/// original file.
///
/// Relative paths start at the file's directory. Inside inline modules the
/// inline names are appended, after the file's own name for a file that is
/// not `lib.rs`, `main.rs` or `mod.rs`.
fn original_path(location: &UnitLocation, decl: &ModuleDecl, value: &str) -> PathBuf {
    let mut base = location
        .path
        .parent()
        .map_or_else(PathBuf::new, Path::to_path_buf);
    let inline = &decl.path[..decl.path.len().saturating_sub(1)];
    if !inline.is_empty() {
        let stem = location
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !matches!(stem.as_str(), "lib" | "main" | "mod") {
            base.push(stem);
        }
        for segment in inline {
            base.push(segment);
        }
    }
    base.join(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspect::Fingerprint;
    use crate::types::UnitId;

    fn run(unit: &str, file: &str, text: &str) -> String {
        let unit = UnitId::parse(unit).unwrap();
        let location = UnitLocation::new(file, "/p/src");
        let fingerprint = Fingerprint::of(["t"]);
        let ctx = UnitContext::new(&unit, &location, &fingerprint);
        RecursiveLoadGuarantor::new(OutputLayout::new("/out"))
            .transform(&ctx, text.to_string())
            .unwrap()
    }

    #[test]
    fn adds_woven_paths() {
        let out = run(
            "crate",
            "/p/src/lib.rs",
            "pub mod billing;\n#[cfg(test)]\nmod tests;\nmod inline {\n    mod deep;\n}\n",
        );
        assert_eq!(
            out,
            "#[path = \"/out/crate/billing.rs\"] pub mod billing;\n\
             #[cfg(test)]\n#[path = \"/out/crate/tests.rs\"] mod tests;\n\
             mod inline {\n    #[path = \"/out/crate/inline/deep.rs\"] mod deep;\n}\n"
        );
    }

    #[test]
    fn is_idempotent() {
        let once = run("crate::billing", "/p/src/billing.rs", "mod invoice;\n");
        assert_eq!(once, "#[path = \"/out/crate/billing/invoice.rs\"] mod invoice;\n");
        assert_eq!(run("crate::billing", "/p/src/billing.rs", &once), once);
    }

    #[test]
    fn relative_paths_are_rebased() {
        let out = run(
            "crate::billing",
            "/p/src/billing.rs",
            "#[path = \"gen/tables.rs\"]\nmod tables;\nmod inline {\n    #[path = \"x.rs\"]\n    mod x;\n}\n",
        );
        assert!(out.contains("#[path = \"/p/src/gen/tables.rs\"]\nmod tables;"));
        assert!(out.contains("#[path = \"/p/src/billing/inline/x.rs\"]\n    mod x;"));
    }

    #[test]
    fn absolute_paths_are_left_alone() {
        let text = "#[path = \"/elsewhere/t.rs\"]\nmod t;\n";
        assert_eq!(run("crate", "/p/src/lib.rs", text), text);
    }

    #[test]
    fn inline_modules_need_no_rewrite() {
        let text = "mod inline {\n    fn f() {}\n}\n";
        assert_eq!(run("crate", "/p/src/lib.rs", text), text);
    }
}
