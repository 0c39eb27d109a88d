//! TOML deserialization types (DTO layer).
//!
//! These types exist solely for serde. They are converted to domain types
//! by the [`loader`](super::loader).

use serde::{Deserialize, Serialize};

/// TOML representation of one `[[aspects]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectDto {
    /// Aspect name (e.g. "LogAll").
    pub name: String,
    /// Pointcut expression.
    pub pointcut: String,
    /// Advice function path.
    pub advice: String,
    /// Advice kind (default: "before").
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Priority, lower wraps outside (default: 0).
    #[serde(default)]
    pub priority: i32,
}

fn default_kind() -> String {
    "before".to_string()
}
