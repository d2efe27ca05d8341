//! Dynamic runtime values.
//!
//! Synthesised fixtures, constructor arguments, and method returns all flow
//! through [`Value`] - the runtime companion of
//! [`TypeDescriptor`](crate::descriptor::TypeDescriptor). Values are plain
//! data: structural equality, a structural 64-bit hash (floats by bit
//! pattern), and a canonical JSON key used wherever a value must act as a
//! lookup key (fake stores, set deduplication).

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::descriptor::TypeId;

/// A dynamic runtime value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "value", content = "data")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    Text(String),
    Instant(DateTime<Utc>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Zoned(DateTime<FixedOffset>),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Array(Vec<Value>),
    EnumVariant { type_id: TypeId, variant: String },
    Object {
        type_id: TypeId,
        fields: Vec<(String, Value)>,
    },
    /// Opaque stand-in produced by the mocking port
    Mock { type_id: TypeId },
}

impl Value {
    /// Whether this value is the null marker.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether this value is a mock stand-in.
    #[must_use]
    pub const fn is_mock(&self) -> bool {
        matches!(self, Self::Mock { .. })
    }

    /// Element or character count for sized values.
    #[must_use]
    pub fn size(&self) -> Option<usize> {
        match self {
            Self::Text(s) => Some(s.chars().count()),
            Self::List(items) | Self::Set(items) | Self::Array(items) => Some(items.len()),
            Self::Map(entries) => Some(entries.len()),
            _ => None,
        }
    }

    /// Common numeric comparison view.
    ///
    /// Exact for integral and decimal inputs; lossy but consistent for
    /// float and double.
    #[must_use]
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Int(v) => Some(Decimal::from(*v)),
            Self::Long(v) => Some(Decimal::from(*v)),
            Self::Float(v) => Decimal::from_f32(*v),
            Self::Double(v) => Decimal::from_f64(*v),
            Self::Decimal(v) => Some(*v),
            _ => None,
        }
    }

    /// Temporal view as a UTC instant.
    ///
    /// Naive dates resolve to midnight UTC; naive datetimes resolve as UTC.
    #[must_use]
    pub fn as_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Instant(v) => Some(*v),
            Self::Date(d) => Some(d.and_hms_opt(0, 0, 0)?.and_utc()),
            Self::DateTime(dt) => Some(dt.and_utc()),
            Self::Zoned(z) => Some(z.with_timezone(&Utc)),
            _ => None,
        }
    }

    /// Textual view.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Field lookup on object values.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Self> {
        match self {
            Self::Object { fields, .. } => {
                fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// Identity of object-like values.
    #[must_use]
    pub const fn type_id(&self) -> Option<&TypeId> {
        match self {
            Self::EnumVariant { type_id, .. }
            | Self::Object { type_id, .. }
            | Self::Mock { type_id } => Some(type_id),
            _ => None,
        }
    }

    /// Structural 64-bit hash. Floats hash by bit pattern so the hash is a
    /// function of the value representation, never of runtime identity.
    #[must_use]
    pub fn structural_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.feed(&mut hasher);
        hasher.finish()
    }

    fn feed(&self, hasher: &mut DefaultHasher) {
        match self {
            Self::Null => 0u8.hash(hasher),
            Self::Bool(v) => (1u8, v).hash(hasher),
            Self::Int(v) => (2u8, v).hash(hasher),
            Self::Long(v) => (3u8, v).hash(hasher),
            Self::Float(v) => (4u8, v.to_bits()).hash(hasher),
            Self::Double(v) => (5u8, v.to_bits()).hash(hasher),
            Self::Decimal(v) => (6u8, v.normalize().to_string()).hash(hasher),
            Self::Text(v) => (7u8, v).hash(hasher),
            Self::Instant(v) => (8u8, v.timestamp(), v.timestamp_subsec_nanos()).hash(hasher),
            Self::Date(v) => (9u8, v.to_string()).hash(hasher),
            Self::DateTime(v) => (10u8, v.to_string()).hash(hasher),
            Self::Zoned(v) => (11u8, v.to_rfc3339()).hash(hasher),
            Self::List(items) => {
                12u8.hash(hasher);
                for item in items {
                    item.feed(hasher);
                }
            }
            Self::Set(items) => {
                13u8.hash(hasher);
                for item in items {
                    item.feed(hasher);
                }
            }
            Self::Map(entries) => {
                14u8.hash(hasher);
                for (key, value) in entries {
                    key.feed(hasher);
                    value.feed(hasher);
                }
            }
            Self::Array(items) => {
                15u8.hash(hasher);
                for item in items {
                    item.feed(hasher);
                }
            }
            Self::EnumVariant { type_id, variant } => {
                (16u8, type_id.as_str(), variant).hash(hasher);
            }
            Self::Object { type_id, fields } => {
                (17u8, type_id.as_str()).hash(hasher);
                for (name, value) in fields {
                    name.hash(hasher);
                    value.feed(hasher);
                }
            }
            Self::Mock { type_id } => (18u8, type_id.as_str()).hash(hasher),
        }
    }

    /// Canonical key string for store lookup and deduplication.
    ///
    /// Serialization of `Value` is deterministic, so equal values always
    /// produce equal keys.
    #[must_use]
    pub fn canonical_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("unserializable:{self:?}"))
    }

    /// Short label of the variant for messages.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Decimal(_) => "decimal",
            Self::Text(_) => "text",
            Self::Instant(_) => "instant",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
            Self::Zoned(_) => "zoned",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Array(_) => "array",
            Self::EnumVariant { .. } => "enum",
            Self::Object { .. } => "object",
            Self::Mock { .. } => "mock",
        }
    }

    /// Human-readable rendering for assertion records.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Long(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Double(v) => v.to_string(),
            Self::Decimal(v) => v.to_string(),
            Self::Text(v) => format!("{v:?}"),
            Self::Instant(v) => v.to_rfc3339(),
            Self::Date(v) => v.to_string(),
            Self::DateTime(v) => v.to_string(),
            Self::Zoned(v) => v.to_rfc3339(),
            Self::List(items) | Self::Set(items) | Self::Array(items) => {
                let rendered: Vec<String> = items.iter().map(Self::render).collect();
                format!("[{}]", rendered.join(", "))
            }
            Self::Map(entries) => {
                let rendered: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.render(), v.render()))
                    .collect();
                format!("{{{}}}", rendered.join(", "))
            }
            Self::EnumVariant { type_id, variant } => format!("{type_id}.{variant}"),
            Self::Object { type_id, fields } => {
                let rendered: Vec<String> = fields
                    .iter()
                    .map(|(n, v)| format!("{n}={}", v.render()))
                    .collect();
                format!("{type_id}({})", rendered.join(", "))
            }
            Self::Mock { type_id } => format!("mock<{type_id}>"),
        }
    }
}
