//! The last pass of the chain: reflect, match, weave.

use std::sync::Arc;
use tracing::debug;

use super::{weave, WeaveOptions};
use crate::aspect::AspectSet;
use crate::context::UnitContext;
use crate::error::WeaveError;
use crate::pointcut::match_model;
use crate::reflect::reflect;
use crate::transformer::SourceTransformer;
use crate::types::SourceText;

/// Weaves the configured aspects into each unit.
pub struct ProxyWeaver {
    aspects: Arc<AspectSet>,
    options: WeaveOptions,
}

impl ProxyWeaver {
    /// Creates a weaver for `aspects`.
    #[must_use]
    pub fn new(aspects: Arc<AspectSet>, options: WeaveOptions) -> Self {
        Self { aspects, options }
    }
}

impl SourceTransformer for ProxyWeaver {
    fn name(&self) -> &'static str {
        "proxy"
    }

    fn description(&self) -> &'static str {
        "Wraps matched method bodies in advice invocation chains"
    }

    fn settings(&self) -> String {
        format!(
            "runtime={}\nmarker={}\n{}",
            self.options.runtime,
            self.options.marker,
            self.aspects.canonical()
        )
    }

    fn transform(
        &self,
        ctx: &UnitContext<'_>,
        text: SourceText,
    ) -> Result<SourceText, WeaveError> {
        if self.aspects.is_empty() {
            return Ok(text);
        }
        let model = reflect(&text).map_err(|e| WeaveError::malformed(ctx.unit, e))?;
        let matches = match_model(ctx.unit, &model, &self.aspects);
        if matches.is_empty() {
            debug!(unit = %ctx.unit, "no join points matched");
            return Ok(text);
        }
        let output = weave(
            ctx.unit,
            &text,
            &model,
            &matches,
            &self.options,
            ctx.fingerprint,
        )?;
        debug!(
            unit = %ctx.unit,
            woven = output.woven.len(),
            skipped = output.skipped.len(),
            conflicts = output.conflicts.len(),
            "proxy weaving done"
        );
        Ok(output.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspect::{self, AspectDto, Fingerprint};
    use crate::types::{UnitId, UnitLocation};
    use std::collections::BTreeMap;

    fn weaver(pointcut: &str) -> ProxyWeaver {
        let dto = AspectDto {
            name: "Log".to_string(),
            pointcut: pointcut.to_string(),
            advice: "crate::aop::log".to_string(),
            kind: "before".to_string(),
            priority: 0,
        };
        let set = aspect::load(&BTreeMap::new(), &[dto]).unwrap();
        ProxyWeaver::new(Arc::new(set), WeaveOptions::default())
    }

    fn transform(weaver: &ProxyWeaver, text: &str) -> Result<String, WeaveError> {
        let unit = UnitId::parse("crate::users").unwrap();
        let location = UnitLocation::new("/p/src/users.rs", "/p/src");
        let fingerprint = Fingerprint::of(["proxy"]);
        let ctx = UnitContext::new(&unit, &location, &fingerprint);
        weaver.transform(&ctx, text.to_string())
    }

    #[test]
    fn weaves_matches() {
        let out = transform(
            &weaver("name(save)"),
            "pub struct Users;\nimpl Users {\n    pub fn save(&self) {}\n}\n",
        )
        .unwrap();
        assert!(out.contains("#[::woven::advised] pub fn save"));
        assert!(out.contains(".before(crate::aop::log)"));
    }

    #[test]
    fn malformed_unit_fails_closed() {
        let err = transform(&weaver("name(save)"), "impl Users {\n    fn save(&self) -> {}\n}\n")
            .unwrap_err();
        assert!(matches!(err, WeaveError::MalformedSource { .. }));
    }

    #[test]
    fn settings_change_with_aspects() {
        assert_ne!(weaver("name(a)").settings(), weaver("name(b)").settings());
    }
}
