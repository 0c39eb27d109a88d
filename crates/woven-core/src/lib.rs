//! # woven-core
//!
//! Load-time weaving pipeline for Rust source units.
//!
//! A unit is one module source file. Loading it through the
//! [`LoadInterceptor`] runs its text through a [`TransformerChain`] whose last
//! pass reflects the unit into a [`StructuralModel`], matches every method
//! against the configured aspects, and splices advice invocation chains
//! around the matched bodies. Results are cached by source identity.
//!
//! This crate provides:
//!
//! - [`reflect()`] for the static structural model of a unit
//! - [`pointcut`] expressions and [`match_model`]
//! - [`weave()`] and the [`ProxyWeaver`] pass
//! - [`SourceTransformer`] and [`TransformerChain`]
//! - [`CacheStore`] with [`MemoryCache`] and [`FileCache`]
//! - [`LoadInterceptor`], the single entry point for loads
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use woven_core::{Config, LoadInterceptor, OutputLayout, TransformerChain, UnitId};
//!
//! let config = Config::from_file("woven.toml".as_ref())?;
//! let chain = TransformerChain::standard(
//!     OutputLayout::new("/abs/target/woven"),
//!     Arc::new(config.aspect_set()?),
//!     config.weave_options(),
//! );
//! let interceptor = LoadInterceptor::builder()
//!     .resolver(my_resolver)
//!     .chain(chain)
//!     .build()?;
//!
//! let text = interceptor.intercept(&UnitId::parse("crate::billing")?)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aspect;
mod cache;
mod config;
mod context;
mod error;
mod interceptor;
mod layout;
pub mod pointcut;
pub mod reflect;
mod report;
mod source;
mod transformer;
mod types;
pub mod weave;

/// Version written into woven unit headers and cache keys.
pub const WEAVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub use aspect::{AdviceKind, AdvicePath, AspectDeclaration, AspectSet, Fingerprint};
pub use cache::{CacheError, CacheKey, CacheStore, FileCache, MemoryCache};
pub use config::{Config, ConfigError, WeaverConfig};
pub use context::{LineIndex, UnitContext};
pub use error::{MalformedSource, WeaveError};
pub use interceptor::{
    Intercepted, InterceptorError, LoadInterceptor, LoadInterceptorBuilder, Origin,
};
pub use layout::OutputLayout;
pub use pointcut::{match_model, Match, Pointcut, PointcutEvalError};
pub use reflect::{reflect, StructuralModel};
pub use report::{JoinPointReport, UnitReport, WeaveReport};
pub use source::{FsSourceReader, SourceReader, UnitResolver};
pub use transformer::{
    RecursiveLoadGuarantor, SourceLocation, SourceTransformer, TransformerBox, TransformerChain,
};
pub use types::{ByteSpan, SourceText, SourceUnit, UnitId, UnitIdError, UnitLocation};
pub use weave::{weave, ProxyWeaver, WeaveConflict, WeaveOptions, WeaveOutput};
