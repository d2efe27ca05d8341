//! Generation requests.
//!
//! A [`GenerationRequest`] is the immutable description of one synthesis
//! target: the slot's type, its nullability, and the constraints attached
//! to it. Requests are created at session entry and derived for nested
//! slots (collection elements, map keys and values, constructor
//! parameters).

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::constraint::{Constraint, ConstraintKind};
use crate::descriptor::TypeDescriptor;

/// Immutable description of a synthesis target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    ty: TypeDescriptor,
    nullable: bool,
    constraints: Vec<Constraint>,
    slot: String,
}

impl GenerationRequest {
    /// Request for a named slot with no constraints.
    #[must_use]
    pub fn new(ty: TypeDescriptor, slot: impl Into<String>) -> Self {
        Self {
            ty,
            nullable: false,
            constraints: Vec::new(),
            slot: slot.into(),
        }
    }

    /// Mark the slot nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Attach a constraint.
    #[must_use]
    pub fn with(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Attach several constraints.
    #[must_use]
    pub fn with_all(mut self, constraints: impl IntoIterator<Item = Constraint>) -> Self {
        self.constraints.extend(constraints);
        self
    }

    /// The slot's type.
    #[must_use]
    pub const fn ty(&self) -> &TypeDescriptor {
        &self.ty
    }

    /// Whether the slot accepts null.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// The slot name, for diagnostics.
    #[must_use]
    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// All attached constraints in declaration order.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Whether a constraint of the given kind is attached.
    #[must_use]
    pub fn has(&self, kind: ConstraintKind) -> bool {
        self.constraints.iter().any(|c| c.kind() == kind)
    }

    /// First attached constraint of the given kind.
    #[must_use]
    pub fn find(&self, kind: ConstraintKind) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.kind() == kind)
    }

    /// Every attached constraint of the given kind, in order.
    #[must_use]
    pub fn find_all(&self, kind: ConstraintKind) -> Vec<&Constraint> {
        self.constraints
            .iter()
            .filter(|c| c.kind() == kind)
            .collect()
    }

    /// Derive a request for a nested slot. Derived slots carry no
    /// constraints of their own; nullability resets to non-null.
    #[must_use]
    pub fn derived(&self, ty: TypeDescriptor, part: &str) -> Self {
        Self::new(ty, format!("{}.{part}", self.slot))
    }
}
