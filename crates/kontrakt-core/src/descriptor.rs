//! Explicit type descriptors.
//!
//! The engine never reflects over host types. Every synthesis target is
//! described by a [`TypeDescriptor`] - a closed tagged variant populated by
//! the adapter layer at the boundary (see [`crate::registry`]). The rest of
//! the core operates on descriptors alone.
//!
//! # Design Principles
//!
//! - **Parse at boundaries** - [`TypeId`] validates once at construction
//! - **Make illegal states unrepresentable** - nullability lives on slots,
//!   never on types; container element types are explicit
//! - **Closed dispatch** - strategies match on the descriptor tag, so an
//!   unhandled descriptor is a compile error, not a runtime surprise

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by [`TypeId::parse`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeIdError {
    /// Empty names carry no identity
    #[error("type id must not be empty")]
    Empty,

    /// Whitespace inside a type name is always a caller bug
    #[error("type id must not contain whitespace: {0:?}")]
    ContainsWhitespace(String),
}

/// Validated identity of a registered type.
///
/// Dotted names (`"billing.Money"`) are conventional but not required.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(String);

impl TypeId {
    /// Parse and validate a type id.
    ///
    /// # Errors
    ///
    /// Returns [`TypeIdError`] for empty names or names with whitespace.
    pub fn parse(name: impl Into<String>) -> Result<Self, TypeIdError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TypeIdError::Empty);
        }
        if name.chars().any(char::is_whitespace) {
            return Err(TypeIdError::ContainsWhitespace(name));
        }
        Ok(Self(name))
    }

    /// View the underlying name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Temporal representation requested for a time slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalKind {
    /// UTC instant
    Instant,
    /// Calendar date without time of day
    Date,
    /// Date and time without zone
    DateTime,
    /// Date and time with a fixed offset
    Zoned,
}

/// Linear container families distinguished at synthesis time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    List,
    Set,
    Queue,
}

/// Closed description of a synthesis target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "of")]
pub enum TypeDescriptor {
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Decimal,
    Text,
    Temporal(TemporalKind),
    Collection {
        kind: CollectionKind,
        element: Box<TypeDescriptor>,
    },
    Map {
        key: Box<TypeDescriptor>,
        value: Box<TypeDescriptor>,
    },
    Array {
        element: Box<TypeDescriptor>,
    },
    Enum {
        id: TypeId,
        variants: Vec<String>,
    },
    /// Sealed hierarchy: generation picks one registered subtype
    Union {
        id: TypeId,
        subtypes: Vec<TypeId>,
    },
    /// Concrete object whose schema lives in the registry
    Object {
        id: TypeId,
    },
    /// Abstract type that can only be satisfied by the mocking port
    Abstract {
        id: TypeId,
    },
}

impl TypeDescriptor {
    /// Convenience constructor for lists.
    #[must_use]
    pub fn list(element: Self) -> Self {
        Self::Collection {
            kind: CollectionKind::List,
            element: Box::new(element),
        }
    }

    /// Convenience constructor for sets.
    #[must_use]
    pub fn set(element: Self) -> Self {
        Self::Collection {
            kind: CollectionKind::Set,
            element: Box::new(element),
        }
    }

    /// Convenience constructor for maps.
    #[must_use]
    pub fn map(key: Self, value: Self) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Convenience constructor for arrays.
    #[must_use]
    pub fn array(element: Self) -> Self {
        Self::Array {
            element: Box::new(element),
        }
    }

    /// Identity of the described type, when it has one.
    #[must_use]
    pub const fn id(&self) -> Option<&TypeId> {
        match self {
            Self::Enum { id, .. }
            | Self::Union { id, .. }
            | Self::Object { id }
            | Self::Abstract { id } => Some(id),
            _ => None,
        }
    }

    /// Whether values of this type are numbers.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Int | Self::Long | Self::Float | Self::Double | Self::Decimal
        )
    }

    /// Whether values of this type are character sequences.
    #[must_use]
    pub const fn is_textual(&self) -> bool {
        matches!(self, Self::Text)
    }

    /// Whether values of this type are temporal.
    #[must_use]
    pub const fn is_temporal(&self) -> bool {
        matches!(self, Self::Temporal(_))
    }

    /// Whether values of this type have a size (containers and text).
    #[must_use]
    pub const fn is_sized(&self) -> bool {
        matches!(
            self,
            Self::Collection { .. } | Self::Map { .. } | Self::Array { .. } | Self::Text
        )
    }

    /// Whether this is a basic value type the fixture engine can produce
    /// without dependency resolution.
    #[must_use]
    pub const fn is_basic_value(&self) -> bool {
        !matches!(self, Self::Abstract { .. })
    }

    /// Short label for messages and trace events.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Boolean => "Boolean".to_string(),
            Self::Int => "Int".to_string(),
            Self::Long => "Long".to_string(),
            Self::Float => "Float".to_string(),
            Self::Double => "Double".to_string(),
            Self::Decimal => "Decimal".to_string(),
            Self::Text => "Text".to_string(),
            Self::Temporal(kind) => format!("Temporal({kind:?})"),
            Self::Collection { kind, element } => format!("{kind:?}<{}>", element.label()),
            Self::Map { key, value } => format!("Map<{}, {}>", key.label(), value.label()),
            Self::Array { element } => format!("Array<{}>", element.label()),
            Self::Enum { id, .. } => format!("Enum({id})"),
            Self::Union { id, .. } => format!("Union({id})"),
            Self::Object { id } => format!("Object({id})"),
            Self::Abstract { id } => format!("Abstract({id})"),
        }
    }
}
