//! Declarative constraint model.
//!
//! A [`Constraint`] is a typed declaration attachable to a slot (parameter,
//! field, or return position). Constraints are pure data: they carry no
//! behavior beyond classification. The configuration validator decides
//! whether a combination is satisfiable, the fixture engine synthesises
//! values under them, and the value validator checks concrete values
//! against them.
//!
//! # Invariants
//!
//! 1. Constraints are immutable after construction
//! 2. Every constraint maps to exactly one [`ConstraintKind`]
//! 3. Kind classification is total - adding a variant without a kind is a
//!    compile error

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::error::ConfigError;

/// Time units accepted by temporal constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl TimeUnit {
    /// Seconds represented by one unit.
    #[must_use]
    pub const fn seconds(self) -> i64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 3_600,
            Self::Days => 86_400,
            Self::Weeks => 604_800,
        }
    }
}

/// Window declaration shared by the four temporal constraints.
///
/// `base` is either the literal `"NOW"` (resolved against the session
/// clock) or an ISO instant, date, or datetime. `zone` overrides the
/// context zone when present and parseable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    /// `"NOW"` or an ISO-8601 instant / date / datetime
    pub base: String,
    /// Window magnitude, must be >= 1
    pub value: i64,
    /// Unit the magnitude is expressed in
    pub unit: TimeUnit,
    /// Optional zone override (`"Z"`, `"UTC"`, or `"+HH:MM"`)
    pub zone: Option<String>,
}

impl TimeWindow {
    /// Window anchored at the session clock.
    #[must_use]
    pub fn now(value: i64, unit: TimeUnit) -> Self {
        Self {
            base: "NOW".to_string(),
            value,
            unit,
            zone: None,
        }
    }

    /// Window anchored at an explicit ISO base.
    #[must_use]
    pub fn anchored(base: impl Into<String>, value: i64, unit: TimeUnit) -> Self {
        Self {
            base: base.into(),
            value,
            unit,
            zone: None,
        }
    }

    /// Attach a zone override.
    #[must_use]
    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }
}

impl Default for TimeWindow {
    /// Ten-year window anchored at the session clock.
    fn default() -> Self {
        Self::now(3_650, TimeUnit::Days)
    }
}

impl TimeWindow {
    /// Resolve the zone override. Accepts `Z`, `UTC`, and fixed
    /// `±HH:MM` offsets; absent overrides resolve to UTC.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAnnotationValue`] for unparseable
    /// zone strings.
    pub fn resolve_zone(&self, slot: &str) -> Result<FixedOffset, ConfigError> {
        match self.zone.as_deref() {
            None | Some("Z" | "UTC") => Ok(utc_offset()),
            Some(raw) => raw.parse::<FixedOffset>().map_err(|_| {
                ConfigError::InvalidAnnotationValue {
                    field: slot.to_string(),
                    value: raw.to_string(),
                    reason: "zone must be Z, UTC, or a fixed +HH:MM offset".to_string(),
                }
            }),
        }
    }

    /// Resolve the anchor instant: `"NOW"` means the session clock, else
    /// an ISO instant, an ISO date (midnight in the resolved zone), or an
    /// ISO datetime (in the resolved zone).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAnnotationValue`] when the base
    /// matches none of the accepted forms.
    pub fn resolve_anchor(
        &self,
        clock: DateTime<Utc>,
        slot: &str,
    ) -> Result<DateTime<Utc>, ConfigError> {
        if self.base == "NOW" {
            return Ok(clock);
        }
        if let Ok(instant) = self.base.parse::<DateTime<Utc>>() {
            return Ok(instant);
        }
        let zone = self.resolve_zone(slot)?;
        if let Ok(date) = self.base.parse::<NaiveDate>() {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                if let Some(anchored) = midnight.and_local_timezone(zone).single() {
                    return Ok(anchored.with_timezone(&Utc));
                }
            }
        }
        if let Ok(datetime) = self.base.parse::<NaiveDateTime>() {
            if let Some(anchored) = datetime.and_local_timezone(zone).single() {
                return Ok(anchored.with_timezone(&Utc));
            }
        }
        Err(ConfigError::InvalidAnnotationValue {
            field: slot.to_string(),
            value: self.base.clone(),
            reason: "base must be NOW or an ISO instant/date/datetime".to_string(),
        })
    }

    /// Window magnitude in seconds, saturating on overflow.
    #[must_use]
    pub const fn span_seconds(&self) -> i64 {
        self.value.saturating_mul(self.unit.seconds())
    }
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// A single declarative constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "args")]
pub enum Constraint {
    // Presence
    NotNull,
    MustBeNull,

    // Boolean
    AssertTrue,
    AssertFalse,

    // Numeric ranges
    IntRange { min: i32, max: i32 },
    LongRange { min: i64, max: i64 },
    DoubleRange { min: f64, max: f64 },
    DecimalMin { value: Decimal, inclusive: bool },
    DecimalMax { value: Decimal, inclusive: bool },
    Digits { integer: u32, fraction: u32 },

    // Sign
    Positive,
    PositiveOrZero,
    Negative,
    NegativeOrZero,

    // String
    NotBlank,
    StringLength { min: usize, max: Option<usize> },
    Pattern { regex: String },
    Email { allow: Vec<String>, block: Vec<String> },
    Url {
        protocols: Vec<String>,
        host_allow: Vec<String>,
        host_block: Vec<String>,
    },
    Uuid,

    // Size
    Size {
        min: usize,
        max: Option<usize>,
        ignore_limit: bool,
    },
    NotEmpty,

    // Time
    Past(TimeWindow),
    PastOrPresent(TimeWindow),
    Future(TimeWindow),
    FutureOrPresent(TimeWindow),
}

/// Discriminant of a [`Constraint`], used by relational validation rules.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
pub enum ConstraintKind {
    NotNull,
    MustBeNull,
    AssertTrue,
    AssertFalse,
    IntRange,
    LongRange,
    DoubleRange,
    DecimalMin,
    DecimalMax,
    Digits,
    Positive,
    PositiveOrZero,
    Negative,
    NegativeOrZero,
    NotBlank,
    StringLength,
    Pattern,
    Email,
    Url,
    Uuid,
    Size,
    NotEmpty,
    Past,
    PastOrPresent,
    Future,
    FutureOrPresent,
}

impl ConstraintKind {
    /// Whether this kind constrains the value itself (as opposed to
    /// presence). `MustBeNull` combined with any of these is rejected by
    /// the configuration validator.
    #[must_use]
    pub const fn is_value_constraint(self) -> bool {
        !matches!(self, Self::NotNull | Self::MustBeNull)
    }
}

impl Constraint {
    /// Classify this constraint.
    #[must_use]
    pub const fn kind(&self) -> ConstraintKind {
        match self {
            Self::NotNull => ConstraintKind::NotNull,
            Self::MustBeNull => ConstraintKind::MustBeNull,
            Self::AssertTrue => ConstraintKind::AssertTrue,
            Self::AssertFalse => ConstraintKind::AssertFalse,
            Self::IntRange { .. } => ConstraintKind::IntRange,
            Self::LongRange { .. } => ConstraintKind::LongRange,
            Self::DoubleRange { .. } => ConstraintKind::DoubleRange,
            Self::DecimalMin { .. } => ConstraintKind::DecimalMin,
            Self::DecimalMax { .. } => ConstraintKind::DecimalMax,
            Self::Digits { .. } => ConstraintKind::Digits,
            Self::Positive => ConstraintKind::Positive,
            Self::PositiveOrZero => ConstraintKind::PositiveOrZero,
            Self::Negative => ConstraintKind::Negative,
            Self::NegativeOrZero => ConstraintKind::NegativeOrZero,
            Self::NotBlank => ConstraintKind::NotBlank,
            Self::StringLength { .. } => ConstraintKind::StringLength,
            Self::Pattern { .. } => ConstraintKind::Pattern,
            Self::Email { .. } => ConstraintKind::Email,
            Self::Url { .. } => ConstraintKind::Url,
            Self::Uuid => ConstraintKind::Uuid,
            Self::Size { .. } => ConstraintKind::Size,
            Self::NotEmpty => ConstraintKind::NotEmpty,
            Self::Past(_) => ConstraintKind::Past,
            Self::PastOrPresent(_) => ConstraintKind::PastOrPresent,
            Self::Future(_) => ConstraintKind::Future,
            Self::FutureOrPresent(_) => ConstraintKind::FutureOrPresent,
        }
    }

    /// Temporal window carried by this constraint, if it is temporal.
    #[must_use]
    pub const fn time_window(&self) -> Option<&TimeWindow> {
        match self {
            Self::Past(w) | Self::PastOrPresent(w) | Self::Future(w) | Self::FutureOrPresent(w) => {
                Some(w)
            }
            _ => None,
        }
    }
}
