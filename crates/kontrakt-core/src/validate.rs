//! Value contract validation.
//!
//! Given a slot and a concrete value, every applicable constraint is
//! checked independently and each breach surfaces as a
//! [`ContractViolation`] carrying the rule identity, a precise message,
//! and expected/actual renderings. Numeric comparisons go through the
//! common decimal view, so integral and decimal inputs compare exactly and
//! float inputs compare lossily but consistently.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;

use crate::constraint::{Constraint, ConstraintKind, TimeWindow};
use crate::error::ContractViolation;
use crate::request::GenerationRequest;
use crate::value::Value;

const UUID_FORM: &str =
    "^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$";

/// Validate `value` against every constraint attached to `request`.
///
/// Mock stand-ins are exempt: the engine only substitutes them where
/// constraint compliance is impossible by construction.
#[must_use]
pub fn validate(
    request: &GenerationRequest,
    value: &Value,
    clock: DateTime<Utc>,
) -> Vec<ContractViolation> {
    if value.is_mock() {
        return Vec::new();
    }

    if value.is_null() {
        // A non-nullable slot carries an implicit NotNull.
        if request.has(ConstraintKind::NotNull) || !request.is_nullable() {
            return vec![violation(
                request,
                ConstraintKind::NotNull,
                "value is null",
                Some("non-null value".to_string()),
                Some("null".to_string()),
            )];
        }
        return Vec::new();
    }

    let mut violations = Vec::new();
    if request.has(ConstraintKind::MustBeNull) {
        violations.push(violation(
            request,
            ConstraintKind::MustBeNull,
            "value is not null",
            Some("null".to_string()),
            Some(value.render()),
        ));
    }

    for constraint in request.constraints() {
        if let Some(breach) = check_one(request, constraint, value, clock) {
            violations.push(breach);
        }
    }
    violations
}

/// [`validate`] collapsed to the first violation.
///
/// # Errors
///
/// Returns the first [`ContractViolation`] found, if any.
pub fn check(
    request: &GenerationRequest,
    value: &Value,
    clock: DateTime<Utc>,
) -> Result<(), ContractViolation> {
    match validate(request, value, clock).into_iter().next() {
        Some(breach) => Err(breach),
        None => Ok(()),
    }
}

fn violation(
    request: &GenerationRequest,
    rule: ConstraintKind,
    message: impl Into<String>,
    expected: Option<String>,
    actual: Option<String>,
) -> ContractViolation {
    ContractViolation {
        rule,
        slot: request.slot().to_string(),
        message: message.into(),
        expected,
        actual,
    }
}

#[allow(clippy::too_many_lines)]
fn check_one(
    request: &GenerationRequest,
    constraint: &Constraint,
    value: &Value,
    clock: DateTime<Utc>,
) -> Option<ContractViolation> {
    match constraint {
        // Presence is handled before per-constraint checks.
        Constraint::NotNull | Constraint::MustBeNull => None,

        Constraint::AssertTrue => match value {
            Value::Bool(true) => None,
            Value::Bool(false) => Some(violation(
                request,
                ConstraintKind::AssertTrue,
                "expected true",
                Some("true".to_string()),
                Some("false".to_string()),
            )),
            _ => None,
        },
        Constraint::AssertFalse => match value {
            Value::Bool(false) => None,
            Value::Bool(true) => Some(violation(
                request,
                ConstraintKind::AssertFalse,
                "expected false",
                Some("false".to_string()),
                Some("true".to_string()),
            )),
            _ => None,
        },

        Constraint::IntRange { min, max } => numeric_range(
            request,
            ConstraintKind::IntRange,
            value,
            Decimal::from(*min),
            Decimal::from(*max),
        ),
        Constraint::LongRange { min, max } => numeric_range(
            request,
            ConstraintKind::LongRange,
            value,
            Decimal::from(*min),
            Decimal::from(*max),
        ),
        Constraint::DoubleRange { min, max } => {
            let min = Decimal::from_f64_retain(*min)?;
            let max = Decimal::from_f64_retain(*max)?;
            numeric_range(request, ConstraintKind::DoubleRange, value, min, max)
        }

        Constraint::DecimalMin { value: bound, inclusive } => {
            let observed = value.as_decimal()?;
            let holds = if *inclusive {
                observed >= *bound
            } else {
                observed > *bound
            };
            (!holds).then(|| {
                violation(
                    request,
                    ConstraintKind::DecimalMin,
                    format!(
                        "value must be {} {bound}",
                        if *inclusive { ">=" } else { ">" }
                    ),
                    Some(format!(
                        "{} {bound}",
                        if *inclusive { ">=" } else { ">" }
                    )),
                    Some(observed.to_string()),
                )
            })
        }
        Constraint::DecimalMax { value: bound, inclusive } => {
            let observed = value.as_decimal()?;
            let holds = if *inclusive {
                observed <= *bound
            } else {
                observed < *bound
            };
            (!holds).then(|| {
                violation(
                    request,
                    ConstraintKind::DecimalMax,
                    format!(
                        "value must be {} {bound}",
                        if *inclusive { "<=" } else { "<" }
                    ),
                    Some(format!(
                        "{} {bound}",
                        if *inclusive { "<=" } else { "<" }
                    )),
                    Some(observed.to_string()),
                )
            })
        }

        Constraint::Digits { integer, fraction } => {
            let observed = value.as_decimal()?;
            let (int_digits, frac_digits) = digit_counts(observed);
            (int_digits > *integer || frac_digits > *fraction).then(|| {
                violation(
                    request,
                    ConstraintKind::Digits,
                    format!(
                        "expected at most {integer} integer and {fraction} fraction digits"
                    ),
                    Some(format!("digits({integer},{fraction})")),
                    Some(observed.to_string()),
                )
            })
        }

        Constraint::Positive => sign_check(request, ConstraintKind::Positive, value, |d| {
            d > Decimal::ZERO
        }),
        Constraint::PositiveOrZero => {
            sign_check(request, ConstraintKind::PositiveOrZero, value, |d| {
                d >= Decimal::ZERO
            })
        }
        Constraint::Negative => sign_check(request, ConstraintKind::Negative, value, |d| {
            d < Decimal::ZERO
        }),
        Constraint::NegativeOrZero => {
            sign_check(request, ConstraintKind::NegativeOrZero, value, |d| {
                d <= Decimal::ZERO
            })
        }

        Constraint::NotBlank => {
            let text = value.as_text()?;
            text.trim().is_empty().then(|| {
                violation(
                    request,
                    ConstraintKind::NotBlank,
                    "value is blank",
                    Some("non-blank text".to_string()),
                    Some(format!("{text:?}")),
                )
            })
        }

        Constraint::StringLength { min, max } => {
            let length = value.as_text()?.chars().count();
            let too_short = length < *min;
            let too_long = max.is_some_and(|max| length > max);
            (too_short || too_long).then(|| {
                violation(
                    request,
                    ConstraintKind::StringLength,
                    format!("length {length} outside [{min}, {}]", render_max(*max)),
                    Some(format!("length in [{min}, {}]", render_max(*max))),
                    Some(length.to_string()),
                )
            })
        }

        Constraint::Pattern { regex } => {
            let text = value.as_text()?;
            match full_match(regex, text) {
                Ok(true) => None,
                Ok(false) => Some(violation(
                    request,
                    ConstraintKind::Pattern,
                    format!("value does not match /{regex}/"),
                    Some(format!("match of /{regex}/")),
                    Some(format!("{text:?}")),
                )),
                Err(reason) => Some(violation(
                    request,
                    ConstraintKind::Pattern,
                    reason,
                    None,
                    Some(format!("{text:?}")),
                )),
            }
        }

        Constraint::Email { allow, block } => {
            let text = value.as_text()?;
            email_breach(text, allow, block).map(|reason| {
                violation(
                    request,
                    ConstraintKind::Email,
                    reason,
                    Some("well-formed email".to_string()),
                    Some(format!("{text:?}")),
                )
            })
        }

        Constraint::Url {
            protocols,
            host_allow,
            host_block,
        } => {
            let text = value.as_text()?;
            url_breach(text, protocols, host_allow, host_block).map(|reason| {
                violation(
                    request,
                    ConstraintKind::Url,
                    reason,
                    Some("well-formed url".to_string()),
                    Some(format!("{text:?}")),
                )
            })
        }

        Constraint::Uuid => {
            let text = value.as_text()?;
            match full_match(UUID_FORM, text) {
                Ok(true) => None,
                _ => Some(violation(
                    request,
                    ConstraintKind::Uuid,
                    "value is not a canonical UUID",
                    Some("8-4-4-4-12 hex form".to_string()),
                    Some(format!("{text:?}")),
                )),
            }
        }

        Constraint::Size { min, max, .. } => {
            let size = value.size()?;
            let too_small = size < *min;
            let too_large = max.is_some_and(|max| size > max);
            (too_small || too_large).then(|| {
                violation(
                    request,
                    ConstraintKind::Size,
                    format!("size {size} outside [{min}, {}]", render_max(*max)),
                    Some(format!("size in [{min}, {}]", render_max(*max))),
                    Some(size.to_string()),
                )
            })
        }

        Constraint::NotEmpty => {
            let size = value.size()?;
            (size == 0).then(|| {
                violation(
                    request,
                    ConstraintKind::NotEmpty,
                    "value is empty",
                    Some("non-empty value".to_string()),
                    Some("size 0".to_string()),
                )
            })
        }

        Constraint::Past(window) => {
            time_check(request, ConstraintKind::Past, window, value, clock, |v, a| v < a)
        }
        Constraint::PastOrPresent(window) => time_check(
            request,
            ConstraintKind::PastOrPresent,
            window,
            value,
            clock,
            |v, a| v <= a,
        ),
        Constraint::Future(window) => {
            time_check(request, ConstraintKind::Future, window, value, clock, |v, a| v > a)
        }
        Constraint::FutureOrPresent(window) => time_check(
            request,
            ConstraintKind::FutureOrPresent,
            window,
            value,
            clock,
            |v, a| v >= a,
        ),
    }
}

fn numeric_range(
    request: &GenerationRequest,
    rule: ConstraintKind,
    value: &Value,
    min: Decimal,
    max: Decimal,
) -> Option<ContractViolation> {
    let observed = value.as_decimal()?;
    (observed < min || observed > max).then(|| {
        violation(
            request,
            rule,
            format!("value {observed} outside [{min}, {max}]"),
            Some(format!("value in [{min}, {max}]")),
            Some(observed.to_string()),
        )
    })
}

fn sign_check(
    request: &GenerationRequest,
    rule: ConstraintKind,
    value: &Value,
    holds: impl Fn(Decimal) -> bool,
) -> Option<ContractViolation> {
    let observed = value.as_decimal()?;
    (!holds(observed)).then(|| {
        violation(
            request,
            rule,
            format!("value {observed} violates {rule}"),
            Some(rule.to_string()),
            Some(observed.to_string()),
        )
    })
}

fn time_check(
    request: &GenerationRequest,
    rule: ConstraintKind,
    window: &TimeWindow,
    value: &Value,
    clock: DateTime<Utc>,
    holds: impl Fn(DateTime<Utc>, DateTime<Utc>) -> bool,
) -> Option<ContractViolation> {
    let observed = value.as_instant()?;
    let anchor = match window.resolve_anchor(clock, request.slot()) {
        Ok(anchor) => anchor,
        Err(err) => {
            return Some(violation(
                request,
                rule,
                err.to_string(),
                None,
                Some(observed.to_rfc3339()),
            ))
        }
    };
    (!holds(observed, anchor)).then(|| {
        violation(
            request,
            rule,
            format!("instant {} violates {rule} of {}", observed.to_rfc3339(), anchor.to_rfc3339()),
            Some(format!("{rule} relative to {}", anchor.to_rfc3339())),
            Some(observed.to_rfc3339()),
        )
    })
}

/// Count integer and fraction digits of a decimal.
fn digit_counts(value: Decimal) -> (u32, u32) {
    let normalized = value.normalize();
    let integer_part = normalized.trunc().abs();
    #[allow(clippy::cast_possible_truncation)]
    let int_digits = integer_part.to_string().trim_start_matches('0').len() as u32;
    (int_digits.max(1), normalized.scale())
}

/// Renders an optional upper bound for range messages, showing `∞` when unbounded.
fn render_max(max: Option<usize>) -> String {
    max.map_or_else(|| "∞".to_string(), |max| max.to_string())
}

/// Full-string regex match; the pattern is anchored if it is not already.
fn full_match(pattern: &str, text: &str) -> Result<bool, String> {
    let anchored = format!("^(?:{pattern})$");
    Regex::new(&anchored)
        .map(|re| re.is_match(text))
        .map_err(|err| format!("unusable pattern /{pattern}/: {err}"))
}

fn email_breach(text: &str, allow: &[String], block: &[String]) -> Option<String> {
    let Some((local, domain)) = text.split_once('@') else {
        return Some("missing '@'".to_string());
    };
    if local.is_empty() {
        return Some("empty local part".to_string());
    }
    if domain.contains('@') || !domain.contains('.') {
        return Some("malformed domain".to_string());
    }
    if !allow.is_empty() && !allow.iter().any(|d| d == domain) {
        return Some(format!("domain {domain:?} not in allow list"));
    }
    if block.iter().any(|d| d == domain) {
        return Some(format!("domain {domain:?} is blocked"));
    }
    None
}

fn url_breach(
    text: &str,
    protocols: &[String],
    host_allow: &[String],
    host_block: &[String],
) -> Option<String> {
    let Some((scheme, rest)) = text.split_once("://") else {
        return Some("missing scheme".to_string());
    };
    if !protocols.is_empty() && !protocols.iter().any(|p| p == scheme) {
        return Some(format!("scheme {scheme:?} not in protocol list"));
    }
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let host = authority.split(':').next().unwrap_or(authority);
    if host.is_empty() {
        return Some("empty host".to_string());
    }
    if !host_allow.is_empty() && !host_allow.iter().any(|h| h == host) {
        return Some(format!("host {host:?} not in allow list"));
    }
    if host_block.iter().any(|h| h == host) {
        return Some(format!("host {host:?} is blocked"));
    }
    None
}
