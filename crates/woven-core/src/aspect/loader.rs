//! DTO → domain conversion with validation.
//!
//! Every pointcut is parsed here, so an unsupported predicate fails the
//! configuration before any unit is loaded.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::dto::AspectDto;
use super::model::{AdviceKind, AdvicePath, AspectDeclaration, AspectSet, ModelError};
use crate::pointcut::{PointcutEvalError, PointcutParser};

/// Errors during DTO → domain conversion.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A field-level validation error.
    #[error("{context}: {source}")]
    Validation {
        /// Where the error occurred (e.g. "aspects[0].advice").
        context: String,
        /// The underlying model error.
        source: ModelError,
    },

    /// A pointcut expression could not be parsed.
    #[error("{context}: {source}")]
    Pointcut {
        /// Where the expression came from (e.g. "aspects[1].pointcut").
        context: String,
        /// The parse failure.
        source: PointcutEvalError,
    },

    /// Cross-reference errors from aggregate construction.
    #[error("aspect validation errors:\n{}", format_errors(.0))]
    CrossRef(Vec<ModelError>),
}

fn format_errors(errors: &[ModelError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Converts aspect DTOs into a validated, ordered [`AspectSet`].
///
/// Named pointcuts are validated even when no aspect references them.
///
/// # Errors
///
/// Returns the first error encountered during conversion.
pub fn load(
    pointcuts: &BTreeMap<String, String>,
    aspects: &[AspectDto],
) -> Result<AspectSet, LoadError> {
    let mut parser = PointcutParser::new(pointcuts);

    for (name, expr) in pointcuts {
        parser.parse(expr).map_err(|e| LoadError::Pointcut {
            context: format!("pointcuts.{name}"),
            source: e,
        })?;
    }

    let declarations = aspects
        .iter()
        .enumerate()
        .map(|(i, dto)| convert_aspect(&mut parser, dto, i))
        .collect::<Result<Vec<_>, _>>()?;

    AspectSet::new(declarations).map_err(LoadError::CrossRef)
}

fn convert_aspect(
    parser: &mut PointcutParser<'_>,
    dto: &AspectDto,
    index: usize,
) -> Result<AspectDeclaration, LoadError> {
    let ctx = format!("aspects[{index}]");
    let validation = |field: &str, source: ModelError| LoadError::Validation {
        context: format!("{ctx}.{field}"),
        source,
    };

    let name = dto.name.trim();
    if name.is_empty() {
        return Err(validation("name", ModelError::EmptyAspectName));
    }
    let advice = AdvicePath::new(&dto.advice).map_err(|e| validation("advice", e))?;
    let kind = dto
        .kind
        .parse::<AdviceKind>()
        .map_err(|e| validation("kind", e))?;
    let pointcut = parser
        .parse(&dto.pointcut)
        .map_err(|e| LoadError::Pointcut {
            context: format!("{ctx}.pointcut ({name})"),
            source: e,
        })?;

    Ok(AspectDeclaration {
        name: name.to_string(),
        expression: dto.pointcut.clone(),
        pointcut: Arc::new(pointcut),
        advice,
        kind,
        priority: dto.priority,
        order: index,
    })
}
