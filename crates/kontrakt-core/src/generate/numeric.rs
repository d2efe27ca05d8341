//! Numeric strategy: effective-range intersection and smart fuzz.
//!
//! The effective range of a slot is the intersection of the type's native
//! range with every declared constraint, computed in decimal space so the
//! produced values agree exactly with the validator's common decimal view.
//! Native ranges of the real types are clamped to the decimal-representable
//! interval, which keeps the intersection total-ordered.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::constraint::Constraint;
use crate::context::GenerationContext;
use crate::descriptor::TypeDescriptor;
use crate::error::GenError;
use crate::request::GenerationRequest;
use crate::value::Value;

/// Default epsilon for exclusive bounds on real types.
fn default_real_epsilon() -> Decimal {
    Decimal::new(1, 5)
}

#[derive(Debug, Clone, Copy)]
struct Domain {
    native_min: Decimal,
    native_max: Decimal,
    integral: bool,
}

fn domain_of(ty: &TypeDescriptor) -> Option<Domain> {
    match ty {
        TypeDescriptor::Int => Some(Domain {
            native_min: Decimal::from(i32::MIN),
            native_max: Decimal::from(i32::MAX),
            integral: true,
        }),
        TypeDescriptor::Long => Some(Domain {
            native_min: Decimal::from(i64::MIN),
            native_max: Decimal::from(i64::MAX),
            integral: true,
        }),
        // Real ranges clamp to the decimal-representable interval.
        TypeDescriptor::Float | TypeDescriptor::Double | TypeDescriptor::Decimal => Some(Domain {
            native_min: Decimal::MIN,
            native_max: Decimal::MAX,
            integral: false,
        }),
        _ => None,
    }
}

/// Epsilon used for exclusive bounds and off-by-one candidates.
fn epsilon(request: &GenerationRequest, integral: bool) -> Decimal {
    if integral {
        return Decimal::ONE;
    }
    request
        .constraints()
        .iter()
        .find_map(|c| match c {
            Constraint::Digits { fraction, .. } => Some(Decimal::new(1, (*fraction).min(28))),
            _ => None,
        })
        .unwrap_or_else(default_real_epsilon)
}

/// `10^integer - 10^-fraction`, the magnitude limit of a digits
/// declaration, saturating at the decimal maximum.
fn digits_limit(integer: u32, fraction: u32) -> Decimal {
    let mut magnitude = Decimal::ONE;
    for _ in 0..integer {
        match magnitude.checked_mul(Decimal::from(10)) {
            Some(next) => magnitude = next,
            None => return Decimal::MAX,
        }
    }
    let step = Decimal::new(1, fraction.min(28));
    magnitude.checked_sub(step).unwrap_or(Decimal::MAX)
}

#[derive(Debug, Clone, Copy)]
struct Effective {
    min: Decimal,
    max: Decimal,
    domain: Domain,
    digits: Option<(u32, u32)>,
}

fn dec_from_f64_clamped(value: f64, fallback: Decimal) -> Decimal {
    Decimal::from_f64(value).unwrap_or(fallback)
}

#[allow(clippy::too_many_lines)]
fn effective_range(request: &GenerationRequest) -> Result<Effective, GenError> {
    let Some(domain) = domain_of(request.ty()) else {
        return Err(GenError::failed(
            request.ty().label(),
            "numeric strategy dispatched on a non-numeric descriptor",
            None,
        ));
    };
    let eps = epsilon(request, domain.integral);
    let mut min = domain.native_min;
    let mut max = domain.native_max;
    let mut digits = None;

    for constraint in request.constraints() {
        match constraint {
            Constraint::IntRange { min: lo, max: hi } => {
                min = min.max(Decimal::from(*lo));
                max = max.min(Decimal::from(*hi));
            }
            Constraint::LongRange { min: lo, max: hi } => {
                min = min.max(Decimal::from(*lo));
                max = max.min(Decimal::from(*hi));
            }
            Constraint::DoubleRange { min: lo, max: hi } => {
                min = min.max(dec_from_f64_clamped(*lo, domain.native_min));
                max = max.min(dec_from_f64_clamped(*hi, domain.native_max));
            }
            Constraint::DecimalMin { value, inclusive } => {
                let bound = if *inclusive {
                    *value
                } else {
                    value.checked_add(eps).unwrap_or(Decimal::MAX)
                };
                min = min.max(bound);
            }
            Constraint::DecimalMax { value, inclusive } => {
                let bound = if *inclusive {
                    *value
                } else {
                    value.checked_sub(eps).unwrap_or(Decimal::MIN)
                };
                max = max.min(bound);
            }
            Constraint::Digits { integer, fraction } => {
                let limit = digits_limit(*integer, *fraction);
                min = min.max(-limit);
                max = max.min(limit);
                digits = Some((*integer, *fraction));
            }
            Constraint::Positive => {
                min = min.max(if domain.integral { Decimal::ONE } else { eps });
            }
            Constraint::PositiveOrZero => min = min.max(Decimal::ZERO),
            Constraint::Negative => {
                max = max.min(if domain.integral { -Decimal::ONE } else { -eps });
            }
            Constraint::NegativeOrZero => max = max.min(Decimal::ZERO),
            _ => {}
        }
    }

    // Degenerate intersection collapses onto the minimum.
    if min > max {
        max = min;
    }

    Ok(Effective {
        min,
        max,
        domain,
        digits,
    })
}

fn to_value(ty: &TypeDescriptor, value: Decimal) -> Value {
    match ty {
        TypeDescriptor::Int => {
            let clamped = value
                .round()
                .to_i64()
                .unwrap_or(0)
                .clamp(i64::from(i32::MIN), i64::from(i32::MAX));
            #[allow(clippy::cast_possible_truncation)]
            Value::Int(clamped as i32)
        }
        TypeDescriptor::Long => Value::Long(value.round().to_i64().unwrap_or(0)),
        TypeDescriptor::Float => Value::Float(value.to_f32().unwrap_or(0.0)),
        TypeDescriptor::Double => Value::Double(value.to_f64().unwrap_or(0.0)),
        _ => Value::Decimal(value),
    }
}

/// Uniform point inside the effective range, drawn through f64 space and
/// clamped back. The draw always happens, so the RNG advances the same
/// way no matter which candidate wins.
fn random_point(ctx: &GenerationContext, range: &Effective) -> Decimal {
    let min_f = range.min.to_f64().unwrap_or(f64::MIN);
    let max_f = range.max.to_f64().unwrap_or(f64::MAX);
    let unit = ctx.gen_unit_f64();
    let raw = (max_f - min_f).mul_add(unit, min_f);
    let mut point = Decimal::from_f64(raw).unwrap_or(range.min);
    if range.domain.integral {
        point = point.round();
    }
    point.clamp(range.min, range.max)
}

fn push_unique(values: &mut Vec<Decimal>, candidate: Decimal) {
    if !values.contains(&candidate) {
        values.push(candidate);
    }
}

pub(super) fn generate(
    request: &GenerationRequest,
    ctx: &GenerationContext,
) -> Result<Value, GenError> {
    let range = effective_range(request)?;
    let eps = epsilon(request, range.domain.integral);

    let random = random_point(ctx, &range);
    let mut candidates = Vec::with_capacity(6);
    push_unique(&mut candidates, range.min);
    push_unique(&mut candidates, range.max);
    if let Some(near_min) = range.min.checked_add(eps) {
        if near_min <= range.max {
            push_unique(&mut candidates, near_min);
        }
    }
    if let Some(near_max) = range.max.checked_sub(eps) {
        if near_max >= range.min {
            push_unique(&mut candidates, near_max);
        }
    }
    if range.min <= Decimal::ZERO && range.max >= Decimal::ZERO {
        push_unique(&mut candidates, Decimal::ZERO);
    }
    push_unique(&mut candidates, random);

    let mut chosen = candidates[ctx.choose_index(candidates.len())];
    if let Some((_, fraction)) = range.digits {
        // Quantise to the declared fraction width, then re-clamp.
        chosen = chosen.round_dp(fraction.min(28)).clamp(range.min, range.max);
    }
    Ok(to_value(request.ty(), chosen))
}

pub(super) fn boundaries(request: &GenerationRequest) -> Result<Vec<Value>, GenError> {
    let range = effective_range(request)?;
    let mut points = Vec::new();
    push_unique(&mut points, range.min);
    push_unique(&mut points, range.max);
    if let Some((integer, fraction)) = range.digits {
        let limit = digits_limit(integer, fraction);
        if limit <= range.max {
            push_unique(&mut points, limit);
        }
        if -limit >= range.min {
            push_unique(&mut points, -limit);
        }
    }
    Ok(points
        .into_iter()
        .map(|p| to_value(request.ty(), p))
        .collect())
}

pub(super) fn invalid(request: &GenerationRequest) -> Result<Vec<Value>, GenError> {
    let range = effective_range(request)?;
    let step = epsilon(request, range.domain.integral);
    let mut values = Vec::new();

    if let Some(below) = range.min.checked_sub(step) {
        if below >= range.domain.native_min {
            values.push(to_value(request.ty(), below));
        }
    }
    if let Some(above) = range.max.checked_add(step) {
        if above <= range.domain.native_max {
            values.push(to_value(request.ty(), above));
        }
    }
    Ok(values)
}
