//! A small crate whose modules are woven at build time.
//!
//! Sources live under `src/app`. `build.rs` weaves them into
//! `$OUT_DIR/woven`, and this root compiles the woven copy.

include!(concat!(env!("OUT_DIR"), "/woven/crate.rs"));
