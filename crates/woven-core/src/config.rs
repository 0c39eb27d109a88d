//! Configuration types for woven (`woven.toml`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::aspect::{self, AdvicePath, AspectDto, AspectSet, LoadError};
use crate::weave::WeaveOptions;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Weaver settings.
    #[serde(default)]
    pub weaver: WeaverConfig,

    /// Library roots by crate name (default: `crate = "src"`).
    #[serde(default)]
    pub roots: BTreeMap<String, PathBuf>,

    /// Per-transformer enable flags; unlisted transformers are enabled.
    #[serde(default)]
    pub transformers: BTreeMap<String, bool>,

    /// Named pointcuts referenced with `pointcut(name)`.
    #[serde(default)]
    pub pointcuts: BTreeMap<String, String>,

    /// Aspect declarations.
    #[serde(default)]
    pub aspects: Vec<AspectDto>,
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// Every pointcut is parsed here so that an unsupported predicate is
    /// reported before any unit is loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or an aspect does not validate.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates weaver paths and aspects.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("weaver.runtime", &self.weaver.runtime),
            ("weaver.marker", &self.weaver.marker),
        ] {
            AdvicePath::new(value).map_err(|e| ConfigError::Invalid {
                field: field.to_string(),
                message: e.to_string(),
            })?;
        }
        self.aspect_set()?;
        Ok(())
    }

    /// Builds the ordered aspect set.
    ///
    /// # Errors
    ///
    /// Returns an error if an aspect or named pointcut does not validate.
    pub fn aspect_set(&self) -> Result<AspectSet, LoadError> {
        aspect::load(&self.pointcuts, &self.aspects)
    }

    /// Paths written into generated code.
    #[must_use]
    pub fn weave_options(&self) -> WeaveOptions {
        WeaveOptions {
            runtime: self.weaver.runtime.clone(),
            marker: self.weaver.marker.clone(),
        }
    }

    /// Checks if a transformer is enabled.
    #[must_use]
    pub fn is_transformer_enabled(&self, name: &str) -> bool {
        self.transformers.get(name).copied().unwrap_or(true)
    }

    /// Library roots, defaulting to `crate = "src"` when none are configured.
    #[must_use]
    pub fn roots(&self) -> BTreeMap<String, PathBuf> {
        if self.roots.is_empty() {
            BTreeMap::from([(crate::types::UnitId::ROOT.to_string(), PathBuf::from("src"))])
        } else {
            self.roots.clone()
        }
    }
}

/// `[weaver]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaverConfig {
    /// Path of the advice runtime crate in generated code.
    #[serde(default = "default_runtime")]
    pub runtime: String,

    /// Attribute written on every woven member.
    #[serde(default = "default_marker")]
    pub marker: String,

    /// Directory woven units are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory for the persistent cache; in-memory when unset.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Unit patterns that are never woven (`*` / `**` segments).
    #[serde(default)]
    pub exempt: Vec<String>,
}

impl Default for WeaverConfig {
    fn default() -> Self {
        Self {
            runtime: default_runtime(),
            marker: default_marker(),
            output_dir: default_output_dir(),
            cache_dir: None,
            exempt: Vec::new(),
        }
    }
}

fn default_runtime() -> String {
    "::woven::runtime".to_string()
}

fn default_marker() -> String {
    "::woven::advised".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("target/woven")
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },

    /// A weaver setting is invalid.
    #[error("Invalid `{field}`: {message}")]
    Invalid {
        /// The offending field.
        field: String,
        /// Why it is invalid.
        message: String,
    },

    /// An aspect or pointcut failed validation.
    #[error("Invalid aspects: {0}")]
    Aspects(#[from] LoadError),
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[weaver]
runtime = "::woven::runtime"
output_dir = "out/woven"
cache_dir = "out/cache"
exempt = ["crate::generated::**"]

[roots]
crate = "src"

[transformers]
source-location = false

[pointcuts]
billing = "within(crate::billing::**)"

[[aspects]]
name = "LogAll"
pointcut = "* charge(*)"
advice = "crate::aspects::log_call"

[[aspects]]
name = "Audit"
pointcut = "pointcut(billing) && public"
advice = "crate::aspects::audit"
kind = "around"
priority = -1
"#;

    #[test]
    fn parses_full_config() {
        let config = Config::parse(FULL).unwrap();
        assert_eq!(config.weaver.marker, "::woven::advised");
        assert_eq!(config.weaver.output_dir, PathBuf::from("out/woven"));
        assert_eq!(config.weaver.cache_dir, Some(PathBuf::from("out/cache")));
        assert!(!config.is_transformer_enabled("source-location"));
        assert!(config.is_transformer_enabled("proxy"));
        assert_eq!(config.aspects[0].kind, "before");

        let set = config.aspect_set().unwrap();
        let names: Vec<_> = set.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Audit", "LogAll"]);
    }

    #[test]
    fn empty_config_has_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.weaver.runtime, "::woven::runtime");
        assert_eq!(config.roots().get("crate"), Some(&PathBuf::from("src")));
        assert!(config.aspect_set().unwrap().is_empty());
    }

    #[test]
    fn bad_pointcut_fails_at_parse_time() {
        let err = Config::parse(
            r#"
[[aspects]]
name = "Bad"
pointcut = "call-site(*)"
advice = "crate::a::b"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Aspects(_)));
    }

    #[test]
    fn bad_runtime_path_is_rejected() {
        let err = Config::parse("[weaver]\nruntime = \"not a path\"\n").unwrap_err();
        assert!(err.to_string().contains("weaver.runtime"));
    }

    #[test]
    fn invalid_toml() {
        assert!(matches!(
            Config::parse("[weaver"),
            Err(ConfigError::Parse { .. })
        ));
    }
}
