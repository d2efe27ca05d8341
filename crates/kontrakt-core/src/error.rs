//! Error taxonomy.
//!
//! Synthesis, configuration, and resolution failures are explicit values,
//! never panics. The split mirrors the propagation policy: configuration
//! and internal errors are fatal to a session, contract violations and
//! assertion failures become verdict records, and infrastructure failures
//! from external ports are contained at the port boundary.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use itertools::Itertools;
use thiserror::Error;

use crate::constraint::ConstraintKind;
use crate::descriptor::TypeId;

/// Pre-flight configuration failures: a constraint declaration is
/// malformed or a combination is logically impossible. Raised before any
/// fixture synthesis ("Garbage In, Error Out").
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// A single annotation's parameters are malformed
    #[error("invalid annotation value on '{field}': {value} ({reason})")]
    InvalidAnnotationValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Annotations violate a relational rule
    #[error("conflicting annotations on '{field}': {annotations:?} ({reason})")]
    ConflictingAnnotations {
        field: String,
        annotations: Vec<ConstraintKind>,
        reason: String,
    },
}

/// Failures on the synthesis path.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenError {
    /// No strategy accepts the request
    #[error("no strategy supports slot '{slot}' of type {ty}")]
    NoStrategy { slot: String, ty: String },

    /// Unrecoverable synthesis failure, cause preserved
    #[error("generation failed for {ty}: {message}")]
    GenerationFailed {
        ty: String,
        message: String,
        #[source]
        cause: Option<Box<GenError>>,
    },

    /// The same type appeared twice on one generation stack branch
    #[error("recursive generation: {}", render_path(path))]
    RecursiveGeneration { path: Vec<TypeId> },

    /// Fuzzed container size exceeds the global safety limit
    #[error("collection size {requested} exceeds safety limit {limit}")]
    CollectionSizeLimitExceeded { requested: usize, limit: usize },

    /// A sealed hierarchy declares no subtypes
    #[error("sealed type {0} has no subtypes")]
    SealedClassHasNoSubclasses(TypeId),

    /// Pre-flight rejection surfaced through the generation entry point
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl GenError {
    /// Wrap a failure while preserving its cause chain.
    #[must_use]
    pub fn failed(ty: impl Into<String>, message: impl Into<String>, cause: Option<Self>) -> Self {
        Self::GenerationFailed {
            ty: ty.into(),
            message: message.into(),
            cause: cause.map(Box::new),
        }
    }
}

fn render_path(path: &[TypeId]) -> String {
    path.iter().map(TypeId::as_str).join(" -> ")
}

/// A validated value broke one of its declared constraints.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("contract violation [{rule}] on '{slot}': {message}")]
pub struct ContractViolation {
    /// Identity of the violated rule
    pub rule: ConstraintKind,
    /// Slot the value was validated against
    pub slot: String,
    /// Precise description of the breach
    pub message: String,
    /// Declared expectation, when expressible
    pub expected: Option<String>,
    /// Observed value rendering
    pub actual: Option<String>,
}

/// Failures raised by the mocking port.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MockError {
    /// The port cannot synthesise a double for this type
    #[error("mocking unsupported for type {0}")]
    Unsupported(TypeId),

    /// The port failed while building the double
    #[error("mock creation failed for {type_id}: {reason}")]
    CreationFailed { type_id: TypeId, reason: String },

    /// A method was invoked that the double does not expose
    #[error("mock {type_id} has no method '{method}'")]
    UnknownMethod { type_id: TypeId, method: String },
}

/// Failures while building the subject-under-test and its dependency
/// closure.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FactoryError {
    /// Resolve-time cycle among real dependencies
    #[error("circular dependency: {}", render_path(path))]
    CircularDependency { path: Vec<TypeId> },

    /// User-facing configuration mistake
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Invariant violated; a bug in the engine itself
    #[error("internal invariant violated: {0}")]
    Internal(String),

    /// Synthesis failed while resolving a basic value dependency
    #[error(transparent)]
    Generation(#[from] GenError),

    /// The mocking port failed where a mock was the only option
    #[error(transparent)]
    Mock(#[from] MockError),
}

/// Outcome of invoking user code (a constructor, method, equality, or
/// hash implementation) through the adapter layer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InvokeError {
    /// The subject raised an assertion
    #[error("assertion failed: {message}")]
    Assertion { message: String },

    /// The subject rejected its input or failed outright
    #[error("{class}: {message}")]
    Failure { class: String, message: String },
}

impl InvokeError {
    /// Exception-class-style label for records.
    #[must_use]
    pub fn class_name(&self) -> &str {
        match self {
            Self::Assertion { .. } => "AssertionError",
            Self::Failure { class, .. } => class,
        }
    }

    /// Convenience constructor for rejections.
    #[must_use]
    pub fn rejection(message: impl Into<String>) -> Self {
        Self::Failure {
            class: "IllegalArgumentException".to_string(),
            message: message.into(),
        }
    }
}
