//! Fixture generation engine.
//!
//! [`FixtureEngine`] orchestrates the closed set of type strategies to
//! synthesise three value families from a request under a context:
//!
//! - [`FixtureEngine::generate`] - one valid value
//! - [`FixtureEngine::generate_valid_boundaries`] - edge cases of every
//!   applicable constraint
//! - [`FixtureEngine::generate_invalid`] - values that must violate at
//!   least one applicable constraint
//!
//! Strategies are tried in a fixed priority order (boolean, time, numeric,
//! string, collection, array, enum, tagged union, object); the first
//! supporting strategy wins. Recursive strategies re-enter the engine with
//! a descended context; a recursion signal is caught here and answered
//! with a mock from the mocking port, or null for nullable slots.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

mod boolean;
mod collection;
mod enumeration;
mod numeric;
mod object;
mod string;
mod time;
mod union;

use tracing::debug;

use crate::config;
use crate::constraint::ConstraintKind;
use crate::context::GenerationContext;
use crate::descriptor::TypeDescriptor;
use crate::error::GenError;
use crate::mocking::MockingPort;
use crate::registry::TypeRegistry;
use crate::request::GenerationRequest;
use crate::value::Value;

/// Hard cap on fuzzed container sizes without explicit opt-in.
pub const GLOBAL_SIZE_LIMIT: usize = 1_000;

/// Container size used when no explicit maximum is declared.
pub const DEFAULT_COLLECTION_SIZE: usize = 5;

/// The closed set of strategies, dispatched by descriptor tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StrategyKind {
    Boolean,
    Time,
    Numeric,
    Text,
    Collection,
    Array,
    Enumeration,
    Union,
    Object,
}

/// Pick the first strategy that supports the descriptor, in priority
/// order.
const fn select_strategy(ty: &TypeDescriptor) -> Option<StrategyKind> {
    match ty {
        TypeDescriptor::Boolean => Some(StrategyKind::Boolean),
        TypeDescriptor::Temporal(_) => Some(StrategyKind::Time),
        TypeDescriptor::Int
        | TypeDescriptor::Long
        | TypeDescriptor::Float
        | TypeDescriptor::Double
        | TypeDescriptor::Decimal => Some(StrategyKind::Numeric),
        TypeDescriptor::Text => Some(StrategyKind::Text),
        TypeDescriptor::Collection { .. } | TypeDescriptor::Map { .. } => {
            Some(StrategyKind::Collection)
        }
        TypeDescriptor::Array { .. } => Some(StrategyKind::Array),
        TypeDescriptor::Enum { .. } => Some(StrategyKind::Enumeration),
        TypeDescriptor::Union { .. } => Some(StrategyKind::Union),
        TypeDescriptor::Object { .. } => Some(StrategyKind::Object),
        TypeDescriptor::Abstract { .. } => None,
    }
}

/// Deterministic, recursion-safe value synthesiser.
pub struct FixtureEngine<'a> {
    registry: &'a TypeRegistry,
    mocking: &'a dyn MockingPort,
}

impl<'a> FixtureEngine<'a> {
    #[must_use]
    pub const fn new(registry: &'a TypeRegistry, mocking: &'a dyn MockingPort) -> Self {
        Self { registry, mocking }
    }

    /// The registry strategies resolve schemas against.
    #[must_use]
    pub const fn registry(&self) -> &TypeRegistry {
        self.registry
    }

    /// Synthesise one valid value.
    ///
    /// # Errors
    ///
    /// Pre-flight rejections surface as [`GenError::Config`]; synthesis
    /// failures as the rest of the [`GenError`] taxonomy. A null result
    /// for a non-nullable slot is always an error, never a value.
    pub fn generate(
        &self,
        request: &GenerationRequest,
        ctx: &GenerationContext,
    ) -> Result<Value, GenError> {
        config::validate_request(request)?;
        self.generate_unchecked(request, ctx)
    }

    /// Synthesise boundary values for every applicable constraint.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`FixtureEngine::generate`].
    pub fn generate_valid_boundaries(
        &self,
        request: &GenerationRequest,
        ctx: &GenerationContext,
    ) -> Result<Vec<Value>, GenError> {
        config::validate_request(request)?;

        if request.has(ConstraintKind::MustBeNull) {
            return Ok(vec![Value::Null]);
        }

        let mut values = Vec::new();
        if request.is_nullable() && !request.has(ConstraintKind::NotNull) {
            values.push(Value::Null);
        }

        let strategy = self.strategy_for(request)?;
        let mut edge_cases = self.dispatch_boundaries(strategy, request, ctx)?;
        if edge_cases.is_empty() {
            edge_cases.push(self.generate_unchecked(request, ctx)?);
        }
        values.append(&mut edge_cases);
        Ok(values)
    }

    /// Synthesise values that each violate at least one applicable
    /// constraint.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`FixtureEngine::generate`].
    pub fn generate_invalid(
        &self,
        request: &GenerationRequest,
        ctx: &GenerationContext,
    ) -> Result<Vec<Value>, GenError> {
        config::validate_request(request)?;

        let mut values = Vec::new();
        if !request.is_nullable() {
            // Null is the universal negative case for mandatory slots.
            values.push(Value::Null);
        }
        let strategy = self.strategy_for(request)?;
        values.append(&mut self.dispatch_invalid(strategy, request, ctx)?);
        Ok(values)
    }

    /// Generation without the public-entry pre-flight. Used for derived
    /// slots, whose requests were validated with the session declaration.
    pub(crate) fn generate_unchecked(
        &self,
        request: &GenerationRequest,
        ctx: &GenerationContext,
    ) -> Result<Value, GenError> {
        if request.has(ConstraintKind::MustBeNull) {
            return Ok(Value::Null);
        }

        let strategy = self.strategy_for(request)?;
        let outcome = self.dispatch_generate(strategy, request, ctx);

        let value = match outcome {
            Err(GenError::RecursiveGeneration { path }) => {
                self.mock_fallback(request, path)?
            }
            other => other?,
        };

        if value.is_null() && !request.is_nullable() {
            return Err(GenError::failed(
                request.ty().label(),
                format!("strategy produced null for non-nullable slot '{}'", request.slot()),
                None,
            ));
        }
        Ok(value)
    }

    /// Substitute a mock at a recursion point.
    fn mock_fallback(
        &self,
        request: &GenerationRequest,
        path: Vec<crate::descriptor::TypeId>,
    ) -> Result<Value, GenError> {
        let Some(type_id) = request.ty().id().cloned() else {
            return Err(GenError::RecursiveGeneration { path });
        };
        debug!(type_id = %type_id, "recursion detected, substituting mock");
        match self.mocking.create_mock(&type_id) {
            Ok(mock) => Ok(mock),
            Err(mock_err) => Err(GenError::failed(
                request.ty().label(),
                format!("recursion fallback failed: {mock_err}"),
                Some(GenError::RecursiveGeneration { path }),
            )),
        }
    }

    fn strategy_for(&self, request: &GenerationRequest) -> Result<StrategyKind, GenError> {
        select_strategy(request.ty()).ok_or_else(|| GenError::NoStrategy {
            slot: request.slot().to_string(),
            ty: request.ty().label(),
        })
    }

    fn dispatch_generate(
        &self,
        strategy: StrategyKind,
        request: &GenerationRequest,
        ctx: &GenerationContext,
    ) -> Result<Value, GenError> {
        match strategy {
            StrategyKind::Boolean => boolean::generate(request, ctx),
            StrategyKind::Time => time::generate(request, ctx),
            StrategyKind::Numeric => numeric::generate(request, ctx),
            StrategyKind::Text => string::generate(request, ctx),
            StrategyKind::Collection => collection::generate(request, ctx, self),
            StrategyKind::Array => collection::generate_array(request, ctx, self),
            StrategyKind::Enumeration => enumeration::generate(request, ctx),
            StrategyKind::Union => union::generate(request, ctx, self),
            StrategyKind::Object => object::generate(request, ctx, self),
        }
    }

    fn dispatch_boundaries(
        &self,
        strategy: StrategyKind,
        request: &GenerationRequest,
        ctx: &GenerationContext,
    ) -> Result<Vec<Value>, GenError> {
        match strategy {
            StrategyKind::Boolean => boolean::boundaries(request),
            StrategyKind::Time => time::boundaries(request, ctx),
            StrategyKind::Numeric => numeric::boundaries(request),
            StrategyKind::Text => string::boundaries(request, ctx),
            StrategyKind::Collection => collection::boundaries(request, ctx, self),
            StrategyKind::Array => collection::array_boundaries(request, ctx, self),
            StrategyKind::Enumeration => enumeration::boundaries(request),
            StrategyKind::Union => union::boundaries(request, ctx, self),
            StrategyKind::Object => Ok(Vec::new()),
        }
    }

    fn dispatch_invalid(
        &self,
        strategy: StrategyKind,
        request: &GenerationRequest,
        ctx: &GenerationContext,
    ) -> Result<Vec<Value>, GenError> {
        match strategy {
            StrategyKind::Boolean => boolean::invalid(request),
            StrategyKind::Time => time::invalid(request, ctx),
            StrategyKind::Numeric => numeric::invalid(request),
            StrategyKind::Text => string::invalid(request),
            StrategyKind::Collection => collection::invalid(request, ctx, self),
            StrategyKind::Array => collection::array_invalid(request, ctx, self),
            StrategyKind::Enumeration | StrategyKind::Union | StrategyKind::Object => {
                Ok(Vec::new())
            }
        }
    }
}
