//! Object strategy: constructor-based synthesis with recursion guard.
//!
//! Each constructor parameter maps to a derived request and re-enters the
//! engine with a context whose history includes the current type. A type
//! already on the history either resolves to null (nullable slot) or
//! raises the recursion signal the engine answers with a mock.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use super::FixtureEngine;
use crate::context::GenerationContext;
use crate::descriptor::TypeDescriptor;
use crate::error::GenError;
use crate::request::GenerationRequest;
use crate::value::Value;

pub(super) fn generate(
    request: &GenerationRequest,
    ctx: &GenerationContext,
    engine: &FixtureEngine<'_>,
) -> Result<Value, GenError> {
    let TypeDescriptor::Object { id } = request.ty() else {
        return Err(GenError::failed(
            request.ty().label(),
            "object strategy dispatched on a non-object descriptor",
            None,
        ));
    };

    if ctx.in_history(id) {
        if request.is_nullable() {
            return Ok(Value::Null);
        }
        let mut path = ctx.path();
        path.push(id.clone());
        return Err(GenError::RecursiveGeneration { path });
    }

    let Some(schema) = engine.registry().object(id) else {
        return Err(GenError::failed(
            request.ty().label(),
            format!("type {id} is not registered"),
            None,
        ));
    };

    let child_ctx = ctx.descend(id);
    let mut args = Vec::with_capacity(schema.params.len());
    for param in &schema.params {
        let param_request = param.request(id.as_str());
        args.push(engine.generate_unchecked(&param_request, &child_ctx)?);
    }

    schema
        .construct(&args, ctx.clock())
        .map_err(|err| GenError::failed(request.ty().label(), err.to_string(), None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Constraint;
    use crate::descriptor::TypeId;
    use crate::mocking::MockEngine;
    use crate::registry::{ObjectSchema, ParamSpec, TypeRegistry};
    use chrono::{DateTime, Utc};

    fn ctx(seed: u64) -> GenerationContext {
        let clock = DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        GenerationContext::new(seed, clock)
    }

    #[test]
    fn builds_objects_from_generated_parameters() {
        let mut registry = TypeRegistry::new();
        registry.register(
            ObjectSchema::new(TypeId::parse("crm.Person").unwrap())
                .param(
                    ParamSpec::new("age", TypeDescriptor::Int)
                        .with(Constraint::IntRange { min: 18, max: 99 }),
                )
                .param(
                    ParamSpec::new("name", TypeDescriptor::Text).with(Constraint::NotBlank),
                ),
        );
        let mocking = MockEngine::new();
        let engine = FixtureEngine::new(&registry, &mocking);
        let request = GenerationRequest::new(
            TypeDescriptor::Object {
                id: TypeId::parse("crm.Person").unwrap(),
            },
            "person",
        );
        let value = generate(&request, &ctx(21), &engine).unwrap();
        match value.field("age") {
            Some(Value::Int(age)) => assert!((18..=99).contains(age)),
            other => panic!("unexpected age {other:?}"),
        }
    }

    #[test]
    fn unregistered_types_fail_cleanly() {
        let registry = TypeRegistry::new();
        let mocking = MockEngine::new();
        let engine = FixtureEngine::new(&registry, &mocking);
        let request = GenerationRequest::new(
            TypeDescriptor::Object {
                id: TypeId::parse("ghost.Type").unwrap(),
            },
            "ghost",
        );
        assert!(matches!(
            generate(&request, &ctx(1), &engine),
            Err(GenError::GenerationFailed { .. })
        ));
    }

    #[test]
    fn nullable_slot_on_history_returns_null() {
        let registry = TypeRegistry::new();
        let mocking = MockEngine::new();
        let engine = FixtureEngine::new(&registry, &mocking);
        let id = TypeId::parse("graph.Node").unwrap();
        let on_stack = ctx(1).descend(&id);
        let request = GenerationRequest::new(
            TypeDescriptor::Object { id },
            "next",
        )
        .nullable();
        assert_eq!(generate(&request, &on_stack, &engine).unwrap(), Value::Null);
    }

    #[test]
    fn mandatory_slot_on_history_raises_the_recursion_signal() {
        let registry = TypeRegistry::new();
        let mocking = MockEngine::new();
        let engine = FixtureEngine::new(&registry, &mocking);
        let id = TypeId::parse("graph.Node").unwrap();
        let on_stack = ctx(1).descend(&id);
        let request = GenerationRequest::new(TypeDescriptor::Object { id: id.clone() }, "next");
        match generate(&request, &on_stack, &engine) {
            Err(GenError::RecursiveGeneration { path }) => {
                assert_eq!(path, vec![id.clone(), id]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejecting_constructors_surface_as_generation_failures() {
        let mut registry = TypeRegistry::new();
        registry.register(
            ObjectSchema::new(TypeId::parse("p.Grumpy").unwrap())
                .param(ParamSpec::new("n", TypeDescriptor::Int))
                .constructor_body(|_| {
                    Err(crate::error::InvokeError::rejection("always refuses"))
                }),
        );
        let mocking = MockEngine::new();
        let engine = FixtureEngine::new(&registry, &mocking);
        let request = GenerationRequest::new(
            TypeDescriptor::Object {
                id: TypeId::parse("p.Grumpy").unwrap(),
            },
            "grumpy",
        );
        assert!(matches!(
            generate(&request, &ctx(1), &engine),
            Err(GenError::GenerationFailed { .. })
        ));
    }
}
