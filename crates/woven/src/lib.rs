//! # woven
//!
//! Load-time aspect weaving for Rust source units.
//!
//! This is the main facade crate that re-exports the weaving pipeline, the
//! advice runtime and the marker attributes.
//!
//! ## Quick Start
//!
//! ```toml
//! # woven.toml
//! [roots]
//! crate = "src/app"
//!
//! [[aspects]]
//! name = "LogAll"
//! pointcut = "* charge(*)"
//! advice = "crate::aspects::log_call"
//! ```
//!
//! ```rust,ignore
//! // build.rs
//! fn main() {
//!     woven::build::weave_crate().expect("weaving failed");
//! }
//!
//! // src/lib.rs
//! include!(concat!(env!("OUT_DIR"), "/woven/crate.rs"));
//!
//! // src/app/aspects.rs
//! pub fn log_call(jp: &woven::runtime::JoinPoint) {
//!     println!("calling {jp}");
//! }
//! ```
//!
//! ## Programmatic Usage
//!
//! ```rust,ignore
//! use woven::{Config, Kernel, UnitId};
//!
//! let config = Config::from_file("woven.toml".as_ref())?;
//! let kernel = Kernel::new(&config, ".".as_ref())?;
//! let loaded = kernel.load(&UnitId::parse("crate::billing")?)?;
//! println!("{} member(s) woven", loaded.woven);
//! ```

#![forbid(unsafe_code)]

// Re-export core types and traits
pub use woven_core::*;

// Marker attributes: #[woven::advised], #[woven::annotate(..)]
pub use woven_macros::{advised, annotate};

/// The advice runtime called by woven code.
pub use woven_runtime as runtime;

pub mod build;
mod host;

pub use host::{HostError, Kernel, RootResolver};
