//! Collection, map, and array strategy.
//!
//! Sizes come from the `Size` declaration: an explicit maximum gives a
//! uniform draw in `[min, max]`, otherwise the default size applies.
//! Anything above the global safety limit is rejected unless the caller
//! opted in with `ignore_limit` or declared a minimum above the limit.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use tracing::debug;

use super::{FixtureEngine, DEFAULT_COLLECTION_SIZE, GLOBAL_SIZE_LIMIT};
use crate::constraint::{Constraint, ConstraintKind};
use crate::context::GenerationContext;
use crate::descriptor::{CollectionKind, TypeDescriptor};
use crate::error::GenError;
use crate::request::GenerationRequest;
use crate::value::Value;

/// Attempt multiplier when collecting distinct set elements or map keys.
const DISTINCT_ATTEMPTS: usize = 4;

#[derive(Debug, Clone, Copy)]
struct SizePlan {
    min: usize,
    declared_max: Option<usize>,
    ignore_limit: bool,
}

fn size_plan(request: &GenerationRequest) -> SizePlan {
    match request.find(ConstraintKind::Size) {
        Some(Constraint::Size {
            min,
            max,
            ignore_limit,
        }) => SizePlan {
            min: *min,
            declared_max: *max,
            ignore_limit: *ignore_limit,
        },
        _ => SizePlan {
            min: if request.has(ConstraintKind::NotEmpty) {
                1
            } else {
                0
            },
            declared_max: None,
            ignore_limit: false,
        },
    }
}

fn target_size(plan: SizePlan, ctx: &GenerationContext) -> usize {
    plan.declared_max.map_or_else(
        || plan.min.max(DEFAULT_COLLECTION_SIZE),
        |max| ctx.gen_range_usize(plan.min, max),
    )
}

fn guard(size: usize, plan: SizePlan) -> Result<(), GenError> {
    if size <= GLOBAL_SIZE_LIMIT || plan.ignore_limit || plan.min > GLOBAL_SIZE_LIMIT {
        Ok(())
    } else {
        Err(GenError::CollectionSizeLimitExceeded {
            requested: size,
            limit: GLOBAL_SIZE_LIMIT,
        })
    }
}

fn elements(
    engine: &FixtureEngine<'_>,
    request: &GenerationRequest,
    element_ty: &TypeDescriptor,
    size: usize,
    ctx: &GenerationContext,
) -> Result<Vec<Value>, GenError> {
    let element_request = request.derived(element_ty.clone(), "element");
    (0..size)
        .map(|_| engine.generate_unchecked(&element_request, ctx))
        .collect()
}

/// Distinct values for sets and map keys, accepting a shortfall after a
/// bounded number of attempts.
fn distinct_elements(
    engine: &FixtureEngine<'_>,
    derived: &GenerationRequest,
    size: usize,
    ctx: &GenerationContext,
) -> Result<Vec<Value>, GenError> {
    let mut seen = Vec::new();
    let mut keys: Vec<String> = Vec::new();
    let attempts = size.saturating_mul(DISTINCT_ATTEMPTS).max(1);
    for _ in 0..attempts {
        if seen.len() == size {
            break;
        }
        let candidate = engine.generate_unchecked(derived, ctx)?;
        let key = candidate.canonical_key();
        if !keys.contains(&key) {
            keys.push(key);
            seen.push(candidate);
        }
    }
    if seen.len() < size {
        debug!(
            requested = size,
            produced = seen.len(),
            slot = derived.slot(),
            "distinct element shortfall"
        );
    }
    Ok(seen)
}

fn build_sized(
    engine: &FixtureEngine<'_>,
    request: &GenerationRequest,
    size: usize,
    ctx: &GenerationContext,
) -> Result<Value, GenError> {
    match request.ty() {
        TypeDescriptor::Collection { kind, element } => match kind {
            CollectionKind::Set => {
                let derived = request.derived((**element).clone(), "element");
                Ok(Value::Set(distinct_elements(engine, &derived, size, ctx)?))
            }
            CollectionKind::List | CollectionKind::Queue => {
                Ok(Value::List(elements(engine, request, element, size, ctx)?))
            }
        },
        TypeDescriptor::Map { key, value } => {
            let key_request = request.derived((**key).clone(), "key");
            let value_request = request.derived((**value).clone(), "value");
            let keys = distinct_elements(engine, &key_request, size, ctx)?;
            let entries = keys
                .into_iter()
                .map(|k| Ok((k, engine.generate_unchecked(&value_request, ctx)?)))
                .collect::<Result<Vec<_>, GenError>>()?;
            Ok(Value::Map(entries))
        }
        TypeDescriptor::Array { element } => {
            Ok(Value::Array(elements(engine, request, element, size, ctx)?))
        }
        other => Err(GenError::failed(
            other.label(),
            "collection strategy dispatched on a non-container descriptor",
            None,
        )),
    }
}

pub(super) fn generate(
    request: &GenerationRequest,
    ctx: &GenerationContext,
    engine: &FixtureEngine<'_>,
) -> Result<Value, GenError> {
    let plan = size_plan(request);
    let size = target_size(plan, ctx);
    guard(size, plan)?;
    build_sized(engine, request, size, ctx)
}

pub(super) fn generate_array(
    request: &GenerationRequest,
    ctx: &GenerationContext,
    engine: &FixtureEngine<'_>,
) -> Result<Value, GenError> {
    generate(request, ctx, engine)
}

pub(super) fn boundaries(
    request: &GenerationRequest,
    ctx: &GenerationContext,
    engine: &FixtureEngine<'_>,
) -> Result<Vec<Value>, GenError> {
    let plan = size_plan(request);
    let mut values = vec![build_sized(engine, request, plan.min, ctx)?];
    if let Some(max) = plan.declared_max {
        let safe = max <= GLOBAL_SIZE_LIMIT || plan.ignore_limit;
        if safe && max != plan.min {
            values.push(build_sized(engine, request, max, ctx)?);
        }
    }
    Ok(values)
}

pub(super) fn array_boundaries(
    request: &GenerationRequest,
    ctx: &GenerationContext,
    engine: &FixtureEngine<'_>,
) -> Result<Vec<Value>, GenError> {
    boundaries(request, ctx, engine)
}

pub(super) fn invalid(
    request: &GenerationRequest,
    ctx: &GenerationContext,
    engine: &FixtureEngine<'_>,
) -> Result<Vec<Value>, GenError> {
    let plan = size_plan(request);
    let mut values = Vec::new();
    if plan.min > 0 {
        values.push(build_sized(engine, request, plan.min - 1, ctx)?);
    }
    if let Some(max) = plan.declared_max {
        if max + 1 <= GLOBAL_SIZE_LIMIT || plan.ignore_limit {
            values.push(build_sized(engine, request, max + 1, ctx)?);
        }
    }
    Ok(values)
}

pub(super) fn array_invalid(
    request: &GenerationRequest,
    ctx: &GenerationContext,
    engine: &FixtureEngine<'_>,
) -> Result<Vec<Value>, GenError> {
    invalid(request, ctx, engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocking::MockEngine;
    use crate::registry::TypeRegistry;
    use chrono::{DateTime, Utc};

    fn ctx(seed: u64) -> GenerationContext {
        let clock = DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        GenerationContext::new(seed, clock)
    }

    fn sized_list(min: usize, max: Option<usize>, ignore_limit: bool) -> GenerationRequest {
        GenerationRequest::new(TypeDescriptor::list(TypeDescriptor::Int), "xs").with(
            Constraint::Size {
                min,
                max,
                ignore_limit,
            },
        )
    }

    #[test]
    fn explicit_bounds_give_a_uniform_size() {
        let registry = TypeRegistry::new();
        let mocking = MockEngine::new();
        let engine = FixtureEngine::new(&registry, &mocking);
        let request = sized_list(2, Some(4), false);
        let ctx = ctx(42);
        for _ in 0..16 {
            let value = generate(&request, &ctx, &engine).unwrap();
            let size = value.size().unwrap();
            assert!((2..=4).contains(&size), "size {size} escaped bounds");
        }
    }

    #[test]
    fn unbounded_sizes_use_the_default() {
        let registry = TypeRegistry::new();
        let mocking = MockEngine::new();
        let engine = FixtureEngine::new(&registry, &mocking);
        let request = sized_list(2, None, false);
        let value = generate(&request, &ctx(1), &engine).unwrap();
        assert_eq!(value.size(), Some(DEFAULT_COLLECTION_SIZE));
    }

    #[test]
    fn oversize_without_opt_in_is_rejected() {
        let registry = TypeRegistry::new();
        let mocking = MockEngine::new();
        let engine = FixtureEngine::new(&registry, &mocking);
        let request = sized_list(1_500, Some(1_600), false);
        // min > limit is itself the opt-in
        assert!(generate(&request, &ctx(1), &engine).is_ok());

        let request = sized_list(10, Some(1_600), false);
        let ctx = ctx(12);
        let outcome = (0..64).map(|_| generate(&request, &ctx, &engine)).find(
            |r| matches!(r, Err(GenError::CollectionSizeLimitExceeded { .. })),
        );
        assert!(outcome.is_some(), "limit never enforced");
    }

    #[test]
    fn ignore_limit_allows_oversize() {
        let registry = TypeRegistry::new();
        let mocking = MockEngine::new();
        let engine = FixtureEngine::new(&registry, &mocking);
        let request = sized_list(1_200, Some(1_200), true);
        let value = generate(&request, &ctx(1), &engine).unwrap();
        assert_eq!(value.size(), Some(1_200));
    }

    #[test]
    fn sets_hold_distinct_elements() {
        let registry = TypeRegistry::new();
        let mocking = MockEngine::new();
        let engine = FixtureEngine::new(&registry, &mocking);
        let request = GenerationRequest::new(
            TypeDescriptor::set(TypeDescriptor::Long),
            "ids",
        )
        .with(Constraint::Size {
            min: 5,
            max: Some(5),
            ignore_limit: false,
        });
        let value = generate(&request, &ctx(9), &engine).unwrap();
        let Value::Set(items) = value else {
            panic!("expected a set");
        };
        let mut keys: Vec<String> = items.iter().map(Value::canonical_key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), items.len());
    }

    #[test]
    fn maps_pair_distinct_keys_with_values() {
        let registry = TypeRegistry::new();
        let mocking = MockEngine::new();
        let engine = FixtureEngine::new(&registry, &mocking);
        let request = GenerationRequest::new(
            TypeDescriptor::map(TypeDescriptor::Int, TypeDescriptor::Boolean),
            "flags",
        )
        .with(Constraint::Size {
            min: 3,
            max: Some(3),
            ignore_limit: false,
        });
        let value = generate(&request, &ctx(4), &engine).unwrap();
        let Value::Map(entries) = value else {
            panic!("expected a map");
        };
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn boundaries_cover_min_and_max_sizes() {
        let registry = TypeRegistry::new();
        let mocking = MockEngine::new();
        let engine = FixtureEngine::new(&registry, &mocking);
        let request = sized_list(1, Some(3), false);
        let values = boundaries(&request, &ctx(2), &engine).unwrap();
        assert_eq!(values[0].size(), Some(1));
        assert_eq!(values[1].size(), Some(3));
    }

    #[test]
    fn invalid_sizes_straddle_the_declared_bounds() {
        let registry = TypeRegistry::new();
        let mocking = MockEngine::new();
        let engine = FixtureEngine::new(&registry, &mocking);
        let request = sized_list(1, Some(3), false);
        let values = invalid(&request, &ctx(2), &engine).unwrap();
        assert_eq!(values[0].size(), Some(0));
        assert_eq!(values[1].size(), Some(4));
    }

    #[test]
    fn arrays_preserve_their_element_family() {
        let registry = TypeRegistry::new();
        let mocking = MockEngine::new();
        let engine = FixtureEngine::new(&registry, &mocking);
        let request = GenerationRequest::new(
            TypeDescriptor::array(TypeDescriptor::Double),
            "samples",
        );
        let value = generate_array(&request, &ctx(8), &engine).unwrap();
        let Value::Array(items) = value else {
            panic!("expected an array");
        };
        assert!(items.iter().all(|v| matches!(v, Value::Double(_))));
    }
}
