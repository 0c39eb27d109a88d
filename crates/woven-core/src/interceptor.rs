//! The load interceptor: the single entry point for loading a unit.

use serde::Serialize;
use tracing::{debug, warn};

use crate::aspect::Fingerprint;
use crate::cache::{CacheKey, CacheStore, MemoryCache};
use crate::context::UnitContext;
use crate::error::WeaveError;
use crate::pointcut::{ModulePattern, PointcutEvalError};
use crate::source::{FsSourceReader, SourceReader, UnitResolver};
use crate::transformer::TransformerChain;
use crate::types::{SourceText, UnitId, UnitLocation};
use crate::weave::marker;
use crate::WEAVER_VERSION;

/// Units of the weaver's own crates, never woven.
const SELF_EXEMPT: &[&str] = &[
    "woven::**",
    "woven_core::**",
    "woven_runtime::**",
    "woven_macros::**",
];

/// Errors building a [`LoadInterceptor`].
#[derive(Debug, thiserror::Error)]
pub enum InterceptorError {
    /// No resolver was supplied.
    #[error("a unit resolver is required")]
    MissingResolver,

    /// An exempt pattern does not compile.
    #[error("invalid exempt pattern `{pattern}`: {source}")]
    InvalidExempt {
        /// The pattern text.
        pattern: String,
        /// Why it is invalid.
        source: PointcutEvalError,
    },
}

/// Where an intercepted unit's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    /// Served from the cache.
    Cache,
    /// Produced by running the chain.
    Transformed,
    /// Returned raw; the unit is exempt from weaving.
    Exempt,
}

/// A loaded unit with details about how it was produced.
#[derive(Debug, Clone)]
pub struct Intercepted {
    /// The unit.
    pub unit: UnitId,
    /// Where its source was read from.
    pub location: UnitLocation,
    /// Text to hand to the compiler.
    pub text: SourceText,
    /// How the text was produced.
    pub origin: Origin,
    /// Number of woven members in the text.
    pub woven: usize,
}

/// Builder for configuring a [`LoadInterceptor`].
#[derive(Default)]
pub struct LoadInterceptorBuilder {
    resolver: Option<Box<dyn UnitResolver>>,
    reader: Option<Box<dyn SourceReader>>,
    cache: Option<Box<dyn CacheStore>>,
    chain: TransformerChain,
    marker: Option<String>,
    exempt_patterns: Vec<String>,
}

impl LoadInterceptorBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the unit resolver.
    #[must_use]
    pub fn resolver<R: UnitResolver + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// Sets the source reader (default: [`FsSourceReader`]).
    #[must_use]
    pub fn reader<R: SourceReader + 'static>(mut self, reader: R) -> Self {
        self.reader = Some(Box::new(reader));
        self
    }

    /// Sets the cache (default: [`MemoryCache`]).
    #[must_use]
    pub fn cache<C: CacheStore + 'static>(mut self, cache: C) -> Self {
        self.cache = Some(Box::new(cache));
        self
    }

    /// Sets a boxed cache.
    #[must_use]
    pub fn cache_box(mut self, cache: Box<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the transformer chain.
    #[must_use]
    pub fn chain(mut self, chain: TransformerChain) -> Self {
        self.chain = chain;
        self
    }

    /// Sets the marker attribute path used to count woven members.
    #[must_use]
    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Adds an exempt unit pattern.
    #[must_use]
    pub fn exempt(mut self, pattern: impl Into<String>) -> Self {
        self.exempt_patterns.push(pattern.into());
        self
    }

    /// Adds multiple exempt unit patterns.
    #[must_use]
    pub fn exempts<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exempt_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Builds the interceptor.
    ///
    /// # Errors
    ///
    /// Returns an error if no resolver was set or an exempt pattern is invalid.
    pub fn build(self) -> Result<LoadInterceptor, InterceptorError> {
        let resolver = self.resolver.ok_or(InterceptorError::MissingResolver)?;
        let exempt = SELF_EXEMPT
            .iter()
            .map(|p| (*p).to_string())
            .chain(self.exempt_patterns)
            .map(|pattern| {
                ModulePattern::new(&pattern)
                    .map_err(|source| InterceptorError::InvalidExempt { pattern, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let fingerprint = self.chain.fingerprint();

        debug!(
            transformers = ?self.chain.names(),
            fingerprint = fingerprint.short(),
            "load interceptor ready"
        );

        Ok(LoadInterceptor {
            resolver,
            reader: self.reader.unwrap_or_else(|| Box::new(FsSourceReader)),
            cache: self.cache.unwrap_or_else(|| Box::new(MemoryCache::new())),
            chain: self.chain,
            fingerprint,
            marker: self
                .marker
                .unwrap_or_else(|| "::woven::advised".to_string()),
            exempt,
        })
    }
}

/// Gates every unit load through the cache and the transformer chain.
///
/// Shared by reference across threads; only the cache is mutable.
///
/// Use [`LoadInterceptor::builder()`] to construct an instance.
pub struct LoadInterceptor {
    resolver: Box<dyn UnitResolver>,
    reader: Box<dyn SourceReader>,
    cache: Box<dyn CacheStore>,
    chain: TransformerChain,
    fingerprint: Fingerprint,
    marker: String,
    exempt: Vec<ModulePattern>,
}

impl LoadInterceptor {
    /// Creates a new builder for configuring an interceptor.
    #[must_use]
    pub fn builder() -> LoadInterceptorBuilder {
        LoadInterceptorBuilder::new()
    }

    /// Fingerprint of the chain; part of every cache key.
    #[must_use]
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Returns the transformer chain.
    #[must_use]
    pub fn chain(&self) -> &TransformerChain {
        &self.chain
    }

    /// Returns the cache.
    #[must_use]
    pub fn cache(&self) -> &dyn CacheStore {
        self.cache.as_ref()
    }

    /// Returns true if `unit` is never woven.
    #[must_use]
    pub fn is_exempt(&self, unit: &UnitId) -> bool {
        self.exempt.iter().any(|p| p.matches(unit.as_str()))
    }

    /// Loads `unit` and returns the text to compile.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit cannot be located, read, or woven.
    pub fn intercept(&self, unit: &UnitId) -> Result<SourceText, WeaveError> {
        self.intercept_detailed(unit).map(|i| i.text)
    }

    /// Loads `unit` and reports how its text was produced.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit cannot be located, read, or woven. No
    /// cache entry is written on failure.
    pub fn intercept_detailed(&self, unit: &UnitId) -> Result<Intercepted, WeaveError> {
        let location = self.resolver.resolve(unit)?;
        let source = self.reader.read(unit, &location)?;

        if self.is_exempt(unit) {
            debug!(unit = %unit, "exempt unit loaded raw");
            return Ok(Intercepted {
                unit: unit.clone(),
                location,
                text: source.text,
                origin: Origin::Exempt,
                woven: 0,
            });
        }

        let key = CacheKey {
            unit: unit.clone(),
            modified: source.modified_nanos(),
            weaver_version: WEAVER_VERSION.to_string(),
            fingerprint: self.fingerprint.clone(),
        };

        let (text, origin) = if let Some(text) = self.cache.get(&key) {
            debug!(unit = %unit, "cache hit");
            (text, Origin::Cache)
        } else {
            debug!(unit = %unit, "cache miss");
            let ctx = UnitContext::new(unit, &location, &self.fingerprint);
            let text = self.chain.run(&ctx, source.text)?;
            if let Err(e) = self.cache.put(&key, &text) {
                warn!(unit = %unit, error = %e, "failed to write cache entry");
            }
            (text, Origin::Transformed)
        };

        let woven = if marker::find_header(&text).is_some() {
            marker::count_markers(&text, &self.marker)
        } else {
            0
        };
        Ok(Intercepted {
            unit: unit.clone(),
            location,
            text,
            origin,
            woven,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheError;
    use std::collections::HashMap;
    use std::path::PathBuf;

    struct MapResolver(HashMap<String, PathBuf>);

    impl UnitResolver for MapResolver {
        fn resolve(&self, unit: &UnitId) -> Result<UnitLocation, WeaveError> {
            self.0
                .get(unit.as_str())
                .map(|p| UnitLocation::new(p, "/"))
                .ok_or_else(|| WeaveError::UnitNotFound {
                    unit: unit.clone(),
                    reason: "not mapped".to_string(),
                })
        }
    }

    struct BrokenCache;

    impl CacheStore for BrokenCache {
        fn get(&self, _key: &CacheKey) -> Option<String> {
            None
        }

        fn put(&self, _key: &CacheKey, _text: &str) -> Result<(), CacheError> {
            Err(CacheError::Io {
                path: PathBuf::from("/dev/null"),
                source: std::io::Error::other("read-only"),
            })
        }

        fn clear(&self) -> Result<(), CacheError> {
            Ok(())
        }
    }

    fn fixture() -> (tempfile::TempDir, MapResolver) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.rs");
        std::fs::write(&path, "pub fn f() {}\n").unwrap();
        let resolver = MapResolver(HashMap::from([
            ("crate".to_string(), path.clone()),
            ("woven_runtime".to_string(), path),
        ]));
        (dir, resolver)
    }

    #[test]
    fn requires_a_resolver() {
        assert!(matches!(
            LoadInterceptor::builder().build(),
            Err(InterceptorError::MissingResolver)
        ));
    }

    #[test]
    fn rejects_bad_exempt_patterns() {
        let (_dir, resolver) = fixture();
        let err = LoadInterceptor::builder()
            .resolver(resolver)
            .exempt("crate::[")
            .build();
        assert!(matches!(err, Err(InterceptorError::InvalidExempt { .. })));
    }

    #[test]
    fn second_load_hits_the_cache() {
        let (_dir, resolver) = fixture();
        let interceptor = LoadInterceptor::builder().resolver(resolver).build().unwrap();
        let first = interceptor.intercept_detailed(&UnitId::root()).unwrap();
        let second = interceptor.intercept_detailed(&UnitId::root()).unwrap();
        assert_eq!(first.origin, Origin::Transformed);
        assert_eq!(second.origin, Origin::Cache);
        assert_eq!(first.text, second.text);
    }

    #[test]
    fn weaver_crates_are_exempt() {
        let (_dir, resolver) = fixture();
        let interceptor = LoadInterceptor::builder().resolver(resolver).build().unwrap();
        let unit = UnitId::parse("woven_runtime").unwrap();
        assert!(interceptor.is_exempt(&unit));
        let loaded = interceptor.intercept_detailed(&unit).unwrap();
        assert_eq!(loaded.origin, Origin::Exempt);
    }

    #[test]
    fn unknown_unit_is_not_found() {
        let (_dir, resolver) = fixture();
        let interceptor = LoadInterceptor::builder().resolver(resolver).build().unwrap();
        let err = interceptor
            .intercept(&UnitId::parse("crate::missing").unwrap())
            .unwrap_err();
        assert!(matches!(err, WeaveError::UnitNotFound { .. }));
    }

    #[test]
    fn cache_write_failure_does_not_fail_the_load() {
        let (_dir, resolver) = fixture();
        let interceptor = LoadInterceptor::builder()
            .resolver(resolver)
            .cache(BrokenCache)
            .build()
            .unwrap();
        assert_eq!(interceptor.intercept(&UnitId::root()).unwrap(), "pub fn f() {}\n");
    }
}
