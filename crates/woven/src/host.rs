//! Host side of the pipeline: config to kernel, root resolution, tree weaving.

use ignore::WalkBuilder;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use woven_core::aspect::LoadError;
use woven_core::{
    match_model, reflect, AspectSet, CacheError, CacheStore, Config, ConfigError, FileCache,
    FsSourceReader, Intercepted, InterceptorError, JoinPointReport, LoadInterceptor, MemoryCache,
    OutputLayout, SourceReader, TransformerBox, TransformerChain, UnitId, UnitLocation,
    UnitReport, UnitResolver, WeaveError, WeaveReport,
};

/// Errors raised by the host adapters.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An aspect or pointcut failed validation.
    #[error("invalid aspects: {0}")]
    Aspects(#[from] LoadError),

    /// The interceptor could not be built.
    #[error(transparent)]
    Interceptor(#[from] InterceptorError),

    /// A unit failed to load.
    #[error(transparent)]
    Weave(#[from] WeaveError),

    /// The cache could not be cleared.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Writing woven output failed.
    #[error("failed to write {path}: {source}")]
    Io {
        /// Path being written.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A variable Cargo sets for build scripts is missing.
    #[error("`{0}` is not set; call this from a build script")]
    MissingEnv(&'static str),
}

/// Resolves units under configured library roots.
///
/// The first segment of a unit id names the root; the rest follow the usual
/// module file conventions: `crate` is `lib.rs` or `main.rs`, and
/// `crate::a::b` is `a/b.rs` or `a/b/mod.rs`.
#[derive(Debug, Clone, Default)]
pub struct RootResolver {
    roots: BTreeMap<String, PathBuf>,
}

impl RootResolver {
    /// Creates a resolver for `roots`, keyed by crate name.
    #[must_use]
    pub fn new(roots: BTreeMap<String, PathBuf>) -> Self {
        Self { roots }
    }

    /// Returns the configured roots.
    #[must_use]
    pub fn roots(&self) -> &BTreeMap<String, PathBuf> {
        &self.roots
    }

    /// Every unit with a source file under the roots, sorted.
    ///
    /// `.gitignore`d files are skipped.
    #[must_use]
    pub fn units(&self) -> Vec<UnitId> {
        let mut units = BTreeSet::new();
        for (name, root) in &self.roots {
            let mut builder = WalkBuilder::new(root);
            builder.hidden(false).git_ignore(true);
            for entry in builder.build().filter_map(Result::ok) {
                if !entry.file_type().is_some_and(|t| t.is_file()) {
                    continue;
                }
                let Ok(relative) = entry.path().strip_prefix(root) else {
                    continue;
                };
                if let Some(unit) = UnitId::from_relative_path(relative, name) {
                    units.insert(unit);
                }
            }
        }
        units.into_iter().collect()
    }

    fn candidates(root: &Path, unit: &UnitId) -> Vec<PathBuf> {
        let rest: Vec<&str> = unit.segments().skip(1).collect();
        if rest.is_empty() {
            return vec![root.join("lib.rs"), root.join("main.rs")];
        }
        let base = rest.iter().fold(root.to_path_buf(), |path, s| path.join(s));
        vec![base.with_extension("rs"), base.join("mod.rs")]
    }
}

impl UnitResolver for RootResolver {
    fn resolve(&self, unit: &UnitId) -> Result<UnitLocation, WeaveError> {
        let krate = unit.segments().next().unwrap_or_default();
        let Some(root) = self.roots.get(krate) else {
            return Err(WeaveError::UnitNotFound {
                unit: unit.clone(),
                reason: format!("no library root for `{krate}`"),
            });
        };

        let candidates = Self::candidates(root, unit);
        candidates
            .iter()
            .find(|path| path.is_file())
            .map(|path| UnitLocation::new(path, root))
            .ok_or_else(|| WeaveError::UnitNotFound {
                unit: unit.clone(),
                reason: format!(
                    "none of {} exist",
                    candidates
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            })
    }
}

/// One weaving setup, built once from configuration and passed by reference.
pub struct Kernel {
    interceptor: LoadInterceptor,
    resolver: RootResolver,
    layout: OutputLayout,
    aspects: Arc<AspectSet>,
}

impl Kernel {
    /// Builds the standard pipeline for `config`.
    ///
    /// Relative paths in the configuration are taken from `project_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the aspects or exempt patterns are invalid.
    pub fn new(config: &Config, project_dir: &Path) -> Result<Self, HostError> {
        Self::with_transformers(config, project_dir, Vec::new())
    }

    /// Builds the pipeline with extra passes inserted before the proxy pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the aspects or exempt patterns are invalid.
    pub fn with_transformers(
        config: &Config,
        project_dir: &Path,
        middle: Vec<TransformerBox>,
    ) -> Result<Self, HostError> {
        let absolute = |path: &Path| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                project_dir.join(path)
            }
        };

        let aspects = Arc::new(config.aspect_set()?);
        let layout = OutputLayout::new(absolute(&config.weaver.output_dir));
        let resolver = RootResolver::new(
            config
                .roots()
                .into_iter()
                .map(|(name, root)| (name, absolute(&root)))
                .collect(),
        );

        let mut chain = TransformerChain::standard(
            layout.clone(),
            Arc::clone(&aspects),
            config.weave_options(),
        );
        for transformer in middle {
            chain = chain.insert_middle_box(transformer);
        }
        let chain = chain.retain_enabled(|name| config.is_transformer_enabled(name));

        let cache: Box<dyn CacheStore> = match &config.weaver.cache_dir {
            Some(dir) => Box::new(FileCache::new(absolute(dir))),
            None => Box::new(MemoryCache::new()),
        };

        let interceptor = LoadInterceptor::builder()
            .resolver(resolver.clone())
            .chain(chain)
            .cache_box(cache)
            .marker(config.weaver.marker.clone())
            .exempts(config.weaver.exempt.iter().cloned())
            .build()?;

        Ok(Self {
            interceptor,
            resolver,
            layout,
            aspects,
        })
    }

    /// Returns the interceptor.
    #[must_use]
    pub fn interceptor(&self) -> &LoadInterceptor {
        &self.interceptor
    }

    /// Returns the unit resolver.
    #[must_use]
    pub fn resolver(&self) -> &RootResolver {
        &self.resolver
    }

    /// Returns the output layout.
    #[must_use]
    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Returns the aspects in weaving order.
    #[must_use]
    pub fn aspects(&self) -> &AspectSet {
        &self.aspects
    }

    /// Loads one unit through the interceptor.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit cannot be located, read or woven.
    pub fn load(&self, unit: &UnitId) -> Result<Intercepted, HostError> {
        Ok(self.interceptor.intercept_detailed(unit)?)
    }

    /// Loads `root` and every module it pulls in, writing each to the layout.
    ///
    /// # Errors
    ///
    /// Returns the first load or write failure. A nested module without a
    /// source file is `UnitNotFound`, since its woven parent would point at
    /// a file that is never written.
    pub fn weave_tree(&self, root: &UnitId) -> Result<WeaveReport, HostError> {
        info!("Weaving {} into {}", root, self.layout.root().display());

        let mut report = WeaveReport::new(self.interceptor.fingerprint().as_str());
        let mut queue = VecDeque::from([root.clone()]);
        let mut seen = BTreeSet::new();

        while let Some(unit) = queue.pop_front() {
            if !seen.insert(unit.clone()) {
                continue;
            }
            let loaded = self.interceptor.intercept_detailed(&unit)?;

            let output = self.layout.path_for(&unit);
            write_if_changed(&output, &loaded.text)?;
            queue.extend(self.children(&unit, &loaded.text));
            report.units.push(UnitReport::new(&loaded, Some(output)));
        }

        info!(
            "Woven {} member(s) in {} of {} unit(s)",
            report.woven(),
            report.units_woven(),
            report.units.len()
        );
        Ok(report)
    }

    /// Weaves the tree of every configured root.
    ///
    /// # Errors
    ///
    /// Returns the first failure.
    pub fn weave_all(&self) -> Result<WeaveReport, HostError> {
        let mut report = WeaveReport::new(self.interceptor.fingerprint().as_str());
        for name in self.resolver.roots().keys() {
            let root = UnitId::parse(name).map_err(|e| WeaveError::UnitNotFound {
                unit: UnitId::root(),
                reason: e.to_string(),
            })?;
            report.units.extend(self.weave_tree(&root)?.units);
        }
        Ok(report)
    }

    /// Join points of `unit` without weaving it.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit cannot be located, read or parsed.
    pub fn match_unit(&self, unit: &UnitId) -> Result<Vec<JoinPointReport>, HostError> {
        let location = self.resolver.resolve(unit)?;
        let source = FsSourceReader.read(unit, &location)?;
        let model = reflect(&source.text).map_err(|e| WeaveError::malformed(unit, e))?;
        let matches = match_model(unit, &model, &self.aspects);
        Ok(JoinPointReport::from_matches(unit, &source.text, &matches))
    }

    /// Removes every cache entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be cleared.
    pub fn clear_cache(&self) -> Result<(), HostError> {
        Ok(self.interceptor.cache().clear()?)
    }

    /// Nested modules of a loaded unit that resolve to the layout.
    fn children(&self, unit: &UnitId, text: &str) -> Vec<UnitId> {
        let model = match reflect(text) {
            Ok(model) => model,
            Err(e) => {
                warn!(unit = %unit, error = %e, "cannot follow nested modules");
                return Vec::new();
            }
        };
        model
            .modules()
            .iter()
            .filter_map(|decl| {
                let child = decl
                    .path
                    .iter()
                    .fold(unit.clone(), |unit, segment| unit.child(segment));
                let follow = decl
                    .path_attr
                    .as_deref()
                    .map_or(true, |p| Path::new(p) == self.layout.path_for(&child));
                if !follow {
                    debug!(unit = %child, "not following module with its own #[path]");
                }
                follow.then_some(child)
            })
            .collect()
    }
}

fn write_if_changed(path: &Path, text: &str) -> Result<(), HostError> {
    if std::fs::read_to_string(path).is_ok_and(|current| current == text) {
        return Ok(());
    }
    let io = |source| HostError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io)?;
    }
    std::fs::write(path, text).map_err(io)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            let path = dir.path().join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "").unwrap();
        }
        dir
    }

    fn resolver(dir: &Path) -> RootResolver {
        RootResolver::new(BTreeMap::from([("crate".to_string(), dir.to_path_buf())]))
    }

    #[test]
    fn resolves_module_conventions() {
        let dir = tree(&["lib.rs", "billing.rs", "users/mod.rs", "users/admin.rs"]);
        let resolver = resolver(dir.path());
        let path = |unit: &str| {
            resolver
                .resolve(&UnitId::parse(unit).unwrap())
                .unwrap()
                .path
                .strip_prefix(dir.path())
                .unwrap()
                .to_path_buf()
        };
        assert_eq!(path("crate"), PathBuf::from("lib.rs"));
        assert_eq!(path("crate::billing"), PathBuf::from("billing.rs"));
        assert_eq!(path("crate::users"), PathBuf::from("users/mod.rs"));
        assert_eq!(path("crate::users::admin"), PathBuf::from("users/admin.rs"));
    }

    #[test]
    fn unknown_units_are_not_found() {
        let dir = tree(&["lib.rs"]);
        let resolver = resolver(dir.path());
        for unit in ["crate::missing", "other_crate"] {
            let err = resolver.resolve(&UnitId::parse(unit).unwrap()).unwrap_err();
            assert!(matches!(err, WeaveError::UnitNotFound { .. }), "{unit}");
        }
    }

    #[test]
    fn discovers_units() {
        let dir = tree(&["lib.rs", "billing.rs", "users/mod.rs", "notes.md"]);
        let units: Vec<String> = resolver(dir.path())
            .units()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(units, vec!["crate", "crate::billing", "crate::users"]);
    }
}
