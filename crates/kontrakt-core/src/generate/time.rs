//! Time strategy.
//!
//! One temporal constraint at most is attached per slot (enforced
//! pre-flight). The window anchor resolves against the session clock for
//! `"NOW"` bases; offsets are drawn inside the declared span, strict
//! variants excluding offset zero. Instants convert to the requested
//! temporal representation with the resolved zone; naive datetimes convert
//! in UTC so that validation of the produced value is zone-independent.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};

use crate::constraint::{Constraint, TimeWindow};
use crate::context::GenerationContext;
use crate::descriptor::{TemporalKind, TypeDescriptor};
use crate::error::GenError;
use crate::request::GenerationRequest;
use crate::value::Value;

const SECONDS_PER_DAY: i64 = 86_400;
const TEN_YEARS_SECONDS: i64 = 3_650 * SECONDS_PER_DAY;

/// Direction of the allowed window relative to the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Past { strict: bool },
    Future { strict: bool },
}

fn mode_of(constraint: &Constraint) -> Option<(Mode, &TimeWindow)> {
    match constraint {
        Constraint::Past(w) => Some((Mode::Past { strict: true }, w)),
        Constraint::PastOrPresent(w) => Some((Mode::Past { strict: false }, w)),
        Constraint::Future(w) => Some((Mode::Future { strict: true }, w)),
        Constraint::FutureOrPresent(w) => Some((Mode::Future { strict: false }, w)),
        _ => None,
    }
}

fn window_of(request: &GenerationRequest) -> Option<(Mode, &TimeWindow)> {
    request.constraints().iter().find_map(mode_of)
}

fn temporal_kind(request: &GenerationRequest) -> TemporalKind {
    match request.ty() {
        TypeDescriptor::Temporal(kind) => *kind,
        _ => TemporalKind::Instant,
    }
}

/// Saturating instant shift.
fn shift(anchor: DateTime<Utc>, seconds: i64) -> DateTime<Utc> {
    Duration::try_seconds(seconds)
        .and_then(|delta| anchor.checked_add_signed(delta))
        .unwrap_or(if seconds < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

/// Offset interval `[lo, hi]` away from the anchor on the allowed side.
/// Calendar-date targets push at least one day out so that conversion to
/// a date cannot fold the value back across the anchor.
fn offset_bounds(mode: Mode, span: i64, kind: TemporalKind) -> (i64, i64) {
    let strict = matches!(
        mode,
        Mode::Past { strict: true } | Mode::Future { strict: true }
    );
    let mut lo = i64::from(strict);
    let mut hi = span.max(lo);
    if kind == TemporalKind::Date {
        lo = lo.max(SECONDS_PER_DAY);
        hi = hi.max(lo);
    }
    (lo, hi)
}

fn to_temporal(kind: TemporalKind, instant: DateTime<Utc>, zone: FixedOffset) -> Value {
    match kind {
        TemporalKind::Instant => Value::Instant(instant),
        TemporalKind::Date => Value::Date(instant.with_timezone(&zone).date_naive()),
        TemporalKind::DateTime => Value::DateTime(instant.naive_utc()),
        TemporalKind::Zoned => Value::Zoned(instant.with_timezone(&zone)),
    }
}

fn signed(mode: Mode, offset: i64) -> i64 {
    match mode {
        Mode::Past { .. } => -offset,
        Mode::Future { .. } => offset,
    }
}

pub(super) fn generate(
    request: &GenerationRequest,
    ctx: &GenerationContext,
) -> Result<Value, GenError> {
    let kind = temporal_kind(request);
    match window_of(request) {
        None => {
            let offset = ctx.gen_range_i64(-TEN_YEARS_SECONDS, TEN_YEARS_SECONDS);
            Ok(to_temporal(kind, shift(ctx.clock(), offset), Utc.fix()))
        }
        Some((mode, window)) => {
            let anchor = window.resolve_anchor(ctx.clock(), request.slot())?;
            let zone = window.resolve_zone(request.slot())?;
            let (lo, hi) = offset_bounds(mode, window.span_seconds(), kind);
            let offset = ctx.gen_range_i64(lo, hi);
            Ok(to_temporal(kind, shift(anchor, signed(mode, offset)), zone))
        }
    }
}

pub(super) fn boundaries(
    request: &GenerationRequest,
    ctx: &GenerationContext,
) -> Result<Vec<Value>, GenError> {
    let kind = temporal_kind(request);
    let Some((mode, window)) = window_of(request) else {
        return Ok(Vec::new());
    };
    let anchor = window.resolve_anchor(ctx.clock(), request.slot())?;
    let zone = window.resolve_zone(request.slot())?;
    let (lo, hi) = offset_bounds(mode, window.span_seconds(), kind);

    let near = to_temporal(kind, shift(anchor, signed(mode, lo)), zone);
    let far = to_temporal(kind, shift(anchor, signed(mode, hi)), zone);
    let mut values = vec![near];
    let far_differs = values[0] != far;
    if far_differs {
        values.push(far);
    }
    Ok(values)
}

pub(super) fn invalid(
    request: &GenerationRequest,
    ctx: &GenerationContext,
) -> Result<Vec<Value>, GenError> {
    let kind = temporal_kind(request);
    let Some((mode, window)) = window_of(request) else {
        return Ok(Vec::new());
    };
    let anchor = window.resolve_anchor(ctx.clock(), request.slot())?;
    let zone = window.resolve_zone(request.slot())?;
    let span = window.span_seconds();

    // Step onto the forbidden side of the anchor; date targets need a
    // whole day so the calendar conversion cannot fold back.
    let step = if kind == TemporalKind::Date {
        SECONDS_PER_DAY + 10
    } else {
        10
    };
    let beyond = span
        .saturating_add(SECONDS_PER_DAY)
        .saturating_add(step);

    let near = to_temporal(kind, shift(anchor, -signed(mode, step)), zone);
    let far = to_temporal(kind, shift(anchor, -signed(mode, beyond)), zone);
    let mut values = vec![near];
    if values[0] != far {
        values.push(far);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::TimeUnit;

    fn clock() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn ctx(seed: u64) -> GenerationContext {
        GenerationContext::new(seed, clock())
    }

    fn instant_request(constraint: Constraint) -> GenerationRequest {
        GenerationRequest::new(TypeDescriptor::Temporal(TemporalKind::Instant), "when")
            .with(constraint)
    }

    #[test]
    fn strict_past_lands_before_the_anchor() {
        let request = instant_request(Constraint::Past(TimeWindow::now(30, TimeUnit::Days)));
        let ctx = ctx(42);
        for _ in 0..32 {
            let value = generate(&request, &ctx).unwrap();
            let instant = value.as_instant().unwrap();
            assert!(instant < clock(), "{instant} is not strictly past");
            assert!(instant >= clock() - Duration::days(30));
        }
    }

    #[test]
    fn permissive_future_allows_the_anchor_itself() {
        let request = instant_request(Constraint::FutureOrPresent(TimeWindow::now(
            1,
            TimeUnit::Seconds,
        )));
        let ctx = ctx(0);
        let mut hit_anchor = false;
        for _ in 0..64 {
            let value = generate(&request, &ctx).unwrap();
            let instant = value.as_instant().unwrap();
            assert!(instant >= clock());
            hit_anchor |= instant == clock();
        }
        assert!(hit_anchor, "offset zero never drawn");
    }

    #[test]
    fn date_targets_use_the_declared_zone() {
        let request = GenerationRequest::new(
            TypeDescriptor::Temporal(TemporalKind::Date),
            "day",
        )
        .with(Constraint::Past(
            TimeWindow::now(10, TimeUnit::Days).with_zone("+02:00"),
        ));
        let value = generate(&request, &ctx(7)).unwrap();
        assert!(matches!(value, Value::Date(_)));
        // Produced dates always validate as strictly past.
        assert!(value.as_instant().unwrap() < clock());
    }

    #[test]
    fn boundaries_sit_at_near_and_far_edges() {
        let request = instant_request(Constraint::Past(TimeWindow::now(1, TimeUnit::Hours)));
        let values = boundaries(&request, &ctx(1)).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(
            values[0].as_instant().unwrap(),
            clock() - Duration::seconds(1)
        );
        assert_eq!(
            values[1].as_instant().unwrap(),
            clock() - Duration::hours(1)
        );
    }

    #[test]
    fn invalid_steps_across_the_forbidden_side() {
        let request = instant_request(Constraint::Past(TimeWindow::now(1, TimeUnit::Hours)));
        let values = invalid(&request, &ctx(1)).unwrap();
        assert_eq!(
            values[0].as_instant().unwrap(),
            clock() + Duration::seconds(10)
        );
        assert!(values[1].as_instant().unwrap() > clock() + Duration::days(1));
    }

    #[test]
    fn unconstrained_slots_stay_within_ten_years() {
        let request =
            GenerationRequest::new(TypeDescriptor::Temporal(TemporalKind::Instant), "when");
        let ctx = ctx(3);
        for _ in 0..32 {
            let instant = generate(&request, &ctx).unwrap().as_instant().unwrap();
            let distance = (instant - clock()).num_seconds().abs();
            assert!(distance <= TEN_YEARS_SECONDS);
        }
    }

    #[test]
    fn anchored_base_overrides_the_clock() {
        let request = instant_request(Constraint::Future(TimeWindow::anchored(
            "2030-01-01T00:00:00Z",
            1,
            TimeUnit::Hours,
        )));
        let instant = generate(&request, &ctx(5)).unwrap().as_instant().unwrap();
        let anchor = DateTime::parse_from_rfc3339("2030-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert!(instant > anchor);
        assert!(instant <= anchor + Duration::hours(1));
    }
}
