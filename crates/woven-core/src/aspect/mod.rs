//! Aspect declarations: configuration DTOs, validation, and the ordered set.
//!
//! Follows a three-layer design:
//!
//! 1. **DTO** (`dto`): serde-only types mirroring the TOML structure.
//! 2. **Loader** (`loader`): converts DTOs to domain types, parsing every
//!    pointcut exactly once.
//! 3. **Model** (`model`): validated declarations in weaving order.

pub mod dto;
pub mod loader;
pub mod model;

pub use dto::AspectDto;
pub use loader::{load, LoadError};
pub use model::{
    AdviceKind, AdvicePath, AspectDeclaration, AspectSet, Fingerprint, ModelError,
};
