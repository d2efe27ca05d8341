//! Pre-flight configuration validation.
//!
//! Logically impossible constraint declarations are rejected before any
//! fixture synthesis runs - garbage in, error out. Four rule categories
//! are applied in order:
//!
//! 1. **Mutually exclusive** - at most one of a set may appear
//! 2. **Forbidden combination** - a trigger excludes a whole family
//! 3. **Type compatibility** - a constraint only applies to certain types
//! 4. **Annotation value** - a constraint's own parameters must be
//!    well-formed

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use chrono::DateTime;
use regex::Regex;

use crate::constraint::{Constraint, ConstraintKind};
use crate::descriptor::TypeDescriptor;
use crate::error::ConfigError;
use crate::request::GenerationRequest;

/// Sets of constraint kinds of which at most one may be attached.
const EXCLUSIVE_SETS: &[&[ConstraintKind]] = &[
    &[ConstraintKind::AssertTrue, ConstraintKind::AssertFalse],
    &[ConstraintKind::MustBeNull, ConstraintKind::NotNull],
    &[
        ConstraintKind::Past,
        ConstraintKind::PastOrPresent,
        ConstraintKind::Future,
        ConstraintKind::FutureOrPresent,
    ],
    &[
        ConstraintKind::Positive,
        ConstraintKind::PositiveOrZero,
        ConstraintKind::Negative,
        ConstraintKind::NegativeOrZero,
    ],
    &[ConstraintKind::Email, ConstraintKind::Url, ConstraintKind::Uuid],
];

/// Validate one request against every rule category.
///
/// # Errors
///
/// Returns [`ConfigError::ConflictingAnnotations`] for relational
/// breaches and [`ConfigError::InvalidAnnotationValue`] for malformed
/// parameters, always before any generation happens.
pub fn validate_request(request: &GenerationRequest) -> Result<(), ConfigError> {
    check_mutually_exclusive(request)?;
    check_forbidden_combinations(request)?;
    check_type_compatibility(request)?;
    check_annotation_values(request)?;
    Ok(())
}

fn check_mutually_exclusive(request: &GenerationRequest) -> Result<(), ConfigError> {
    for set in EXCLUSIVE_SETS {
        let present: Vec<ConstraintKind> =
            set.iter().copied().filter(|k| request.has(*k)).collect();
        if present.len() > 1 {
            return Err(ConfigError::ConflictingAnnotations {
                field: request.slot().to_string(),
                annotations: present,
                reason: "mutually exclusive annotations".to_string(),
            });
        }
    }
    Ok(())
}

fn check_forbidden_combinations(request: &GenerationRequest) -> Result<(), ConfigError> {
    if !request.has(ConstraintKind::MustBeNull) {
        return Ok(());
    }
    let offenders: Vec<ConstraintKind> = request
        .constraints()
        .iter()
        .map(Constraint::kind)
        .filter(|k| k.is_value_constraint())
        .collect();
    if offenders.is_empty() {
        Ok(())
    } else {
        let mut annotations = vec![ConstraintKind::MustBeNull];
        annotations.extend(offenders);
        Err(ConfigError::ConflictingAnnotations {
            field: request.slot().to_string(),
            annotations,
            reason: "a slot declared null cannot carry value constraints".to_string(),
        })
    }
}

fn check_type_compatibility(request: &GenerationRequest) -> Result<(), ConfigError> {
    for constraint in request.constraints() {
        let kind = constraint.kind();
        if !kind_applies_to(kind, request.ty()) {
            return Err(ConfigError::ConflictingAnnotations {
                field: request.slot().to_string(),
                annotations: vec![kind],
                reason: format!("{kind} does not apply to {}", request.ty().label()),
            });
        }
    }
    Ok(())
}

/// Allow-set of each constraint kind.
fn kind_applies_to(kind: ConstraintKind, ty: &TypeDescriptor) -> bool {
    match kind {
        ConstraintKind::NotNull | ConstraintKind::MustBeNull => true,
        ConstraintKind::AssertTrue | ConstraintKind::AssertFalse => {
            matches!(ty, TypeDescriptor::Boolean)
        }
        ConstraintKind::IntRange
        | ConstraintKind::LongRange
        | ConstraintKind::DoubleRange
        | ConstraintKind::DecimalMin
        | ConstraintKind::DecimalMax
        | ConstraintKind::Digits
        | ConstraintKind::Positive
        | ConstraintKind::PositiveOrZero
        | ConstraintKind::Negative
        | ConstraintKind::NegativeOrZero => ty.is_numeric(),
        ConstraintKind::NotBlank
        | ConstraintKind::StringLength
        | ConstraintKind::Pattern
        | ConstraintKind::Email
        | ConstraintKind::Url
        | ConstraintKind::Uuid => ty.is_textual(),
        ConstraintKind::Size | ConstraintKind::NotEmpty => ty.is_sized(),
        ConstraintKind::Past
        | ConstraintKind::PastOrPresent
        | ConstraintKind::Future
        | ConstraintKind::FutureOrPresent => ty.is_temporal(),
    }
}

#[allow(clippy::too_many_lines)]
fn check_annotation_values(request: &GenerationRequest) -> Result<(), ConfigError> {
    let field = request.slot();
    for constraint in request.constraints() {
        match constraint {
            Constraint::Size { min, max, .. } => {
                if let Some(max) = max {
                    if min > max {
                        return Err(ConfigError::InvalidAnnotationValue {
                            field: field.to_string(),
                            value: format!("min={min}, max={max}"),
                            reason: "size min must not exceed max".to_string(),
                        });
                    }
                }
            }
            Constraint::StringLength { min, max } => {
                if let Some(max) = max {
                    if min > max {
                        return Err(ConfigError::InvalidAnnotationValue {
                            field: field.to_string(),
                            value: format!("min={min}, max={max}"),
                            reason: "length min must not exceed max".to_string(),
                        });
                    }
                }
            }
            Constraint::Pattern { regex } => {
                if Regex::new(regex).is_err() {
                    return Err(ConfigError::InvalidAnnotationValue {
                        field: field.to_string(),
                        value: regex.clone(),
                        reason: "pattern is not a valid regex".to_string(),
                    });
                }
            }
            Constraint::Past(window)
            | Constraint::PastOrPresent(window)
            | Constraint::Future(window)
            | Constraint::FutureOrPresent(window) => {
                if window.value <= 0 {
                    return Err(ConfigError::InvalidAnnotationValue {
                        field: field.to_string(),
                        value: window.value.to_string(),
                        reason: "window magnitude must be positive".to_string(),
                    });
                }
                // Parseability does not depend on the session clock.
                window.resolve_zone(field)?;
                window.resolve_anchor(DateTime::UNIX_EPOCH, field)?;
            }
            _ => {}
        }
    }
    Ok(())
}
