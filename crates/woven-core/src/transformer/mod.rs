//! Source transformers and the ordered chain that runs them.
//!
//! A unit's text flows through every enabled transformer in order, each
//! receiving the previous one's output. The standard chain is:
//!
//! 1. `recursive-load` makes nested `mod x;` loads resolve to woven output.
//! 2. `source-location` keeps `file!()` pointing at the original file.
//! 3. `proxy` splices advice around matched methods.
//!
//! Hosts may insert their own passes between the first and the last.

mod recursive_load;
mod source_location;

pub use recursive_load::RecursiveLoadGuarantor;
pub use source_location::SourceLocation;

use std::sync::Arc;
use tracing::{debug, warn};

use crate::aspect::{AspectSet, Fingerprint};
use crate::context::UnitContext;
use crate::error::WeaveError;
use crate::layout::OutputLayout;
use crate::types::SourceText;
use crate::weave::{marker, ProxyWeaver, WeaveOptions};
use crate::WEAVER_VERSION;

/// A source-to-source pass over one unit.
///
/// # Example
///
/// ```ignore
/// use woven_core::{SourceTransformer, UnitContext, WeaveError};
///
/// pub struct StripTodos;
///
/// impl SourceTransformer for StripTodos {
///     fn name(&self) -> &'static str { "strip-todos" }
///
///     fn transform(&self, _ctx: &UnitContext<'_>, text: String) -> Result<String, WeaveError> {
///         Ok(text.replace("// TODO", "//"))
///     }
/// }
/// ```
pub trait SourceTransformer: Send + Sync {
    /// Returns the kebab-case name of this transformer (e.g., "proxy").
    fn name(&self) -> &'static str;

    /// Returns a brief description of what this transformer does.
    fn description(&self) -> &'static str {
        ""
    }

    /// Text identifying this transformer's settings.
    ///
    /// Folded into the chain fingerprint, so a change invalidates every
    /// cached unit.
    fn settings(&self) -> String {
        String::new()
    }

    /// Transforms one unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit cannot be transformed; the load fails.
    fn transform(&self, ctx: &UnitContext<'_>, text: SourceText)
        -> Result<SourceText, WeaveError>;
}

/// Type alias for boxed `SourceTransformer` trait objects.
pub type TransformerBox = Box<dyn SourceTransformer>;

/// Ordered sequence of transformers.
#[derive(Default)]
pub struct TransformerChain {
    transformers: Vec<TransformerBox>,
}

impl TransformerChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard chain: recursive-load, source-location, proxy.
    #[must_use]
    pub fn standard(layout: OutputLayout, aspects: Arc<AspectSet>, options: WeaveOptions) -> Self {
        Self::new()
            .push(RecursiveLoadGuarantor::new(layout))
            .push(SourceLocation)
            .push(ProxyWeaver::new(aspects, options))
    }

    /// Appends a transformer.
    #[must_use]
    pub fn push<T: SourceTransformer + 'static>(self, transformer: T) -> Self {
        self.push_box(Box::new(transformer))
    }

    /// Appends a boxed transformer.
    #[must_use]
    pub fn push_box(mut self, transformer: TransformerBox) -> Self {
        self.transformers.push(transformer);
        self
    }

    /// Inserts a transformer just before the last pass.
    ///
    /// On an empty chain the transformer becomes the only pass.
    #[must_use]
    pub fn insert_middle<T: SourceTransformer + 'static>(self, transformer: T) -> Self {
        self.insert_middle_box(Box::new(transformer))
    }

    /// Inserts a boxed transformer just before the last pass.
    #[must_use]
    pub fn insert_middle_box(mut self, transformer: TransformerBox) -> Self {
        let index = self.transformers.len().saturating_sub(1);
        self.transformers.insert(index, transformer);
        self
    }

    /// Drops transformers for which `enabled` returns false.
    #[must_use]
    pub fn retain_enabled(mut self, enabled: impl Fn(&str) -> bool) -> Self {
        self.transformers.retain(|t| {
            let keep = enabled(t.name());
            if !keep {
                debug!("Skipping disabled transformer: {}", t.name());
            }
            keep
        });
        self
    }

    /// Names in chain order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.transformers.iter().map(|t| t.name()).collect()
    }

    /// Returns the transformers in chain order.
    #[must_use]
    pub fn transformers(&self) -> &[TransformerBox] {
        &self.transformers
    }

    /// Returns the number of transformers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    /// Returns true if the chain has no transformers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    /// Fingerprint of the weaver version and every pass with its settings.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        let passes = self
            .transformers
            .iter()
            .map(|t| format!("{}={}", t.name(), t.settings()));
        Fingerprint::of(std::iter::once(WEAVER_VERSION.to_string()).chain(passes))
    }

    /// Runs every transformer over `text`.
    ///
    /// A unit that already ends with a weaver header is returned as is.
    ///
    /// # Errors
    ///
    /// Returns the first transformer error.
    pub fn run(&self, ctx: &UnitContext<'_>, text: SourceText) -> Result<SourceText, WeaveError> {
        if let Some(header) = marker::find_header(&text) {
            if header.is_current(ctx.fingerprint) {
                debug!(unit = %ctx.unit, "unit already woven");
            } else {
                warn!(
                    unit = %ctx.unit,
                    version = %header.version,
                    fingerprint = header.fingerprint.short(),
                    "unit was woven under another configuration; leaving it as is"
                );
            }
            return Ok(text);
        }

        let mut text = text;
        for transformer in &self.transformers {
            debug!(unit = %ctx.unit, transformer = transformer.name(), "running transformer");
            text = transformer.transform(ctx, text)?;
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{UnitId, UnitLocation};

    struct Upper;

    impl SourceTransformer for Upper {
        fn name(&self) -> &'static str {
            "upper"
        }

        fn transform(
            &self,
            _ctx: &UnitContext<'_>,
            text: SourceText,
        ) -> Result<SourceText, WeaveError> {
            Ok(text.to_uppercase())
        }
    }

    struct Suffix(&'static str);

    impl SourceTransformer for Suffix {
        fn name(&self) -> &'static str {
            "suffix"
        }

        fn settings(&self) -> String {
            self.0.to_string()
        }

        fn transform(
            &self,
            _ctx: &UnitContext<'_>,
            text: SourceText,
        ) -> Result<SourceText, WeaveError> {
            Ok(format!("{text}{}", self.0))
        }
    }

    fn run(chain: &TransformerChain, text: &str) -> String {
        let unit = UnitId::root();
        let location = UnitLocation::new("/p/src/lib.rs", "/p/src");
        let fingerprint = chain.fingerprint();
        let ctx = UnitContext::new(&unit, &location, &fingerprint);
        chain.run(&ctx, text.to_string()).unwrap()
    }

    #[test]
    fn runs_in_order() {
        let chain = TransformerChain::new().push(Suffix("x")).push(Upper);
        assert_eq!(run(&chain, "a"), "AX");
        let chain = TransformerChain::new().push(Upper).push(Suffix("x"));
        assert_eq!(run(&chain, "a"), "Ax");
    }

    #[test]
    fn middle_passes_go_before_the_last() {
        let chain = TransformerChain::new()
            .push(Suffix("1"))
            .push(Upper)
            .insert_middle(Suffix("2"));
        assert_eq!(chain.names(), vec!["suffix", "suffix", "upper"]);
    }

    #[test]
    fn disabled_transformers_are_dropped() {
        let chain = TransformerChain::new()
            .push(Upper)
            .push(Suffix("x"))
            .retain_enabled(|name| name != "upper");
        assert_eq!(chain.names(), vec!["suffix"]);
    }

    #[test]
    fn fingerprint_covers_settings() {
        let a = TransformerChain::new().push(Suffix("a")).fingerprint();
        let b = TransformerChain::new().push(Suffix("b")).fingerprint();
        assert_ne!(a, b);
        assert_eq!(a, TransformerChain::new().push(Suffix("a")).fingerprint());
    }

    #[test]
    fn woven_units_pass_through() {
        let chain = TransformerChain::new().push(Upper);
        let mut text = "fn a() {}".to_string();
        marker::append_header(&mut text, &chain.fingerprint());
        assert_eq!(run(&chain, &text), text);

        let mut stale = "fn a() {}".to_string();
        marker::append_header(&mut stale, &Fingerprint::of(["other"]));
        assert_eq!(run(&chain, &stale), stale);
    }
}
