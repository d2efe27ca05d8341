//! Property-based tests for fixture generation invariants.
//!
//! # Invariants tested:
//! - Determinism: equal seeds and call sequences produce equal values
//! - Constraint soundness: generated values validate cleanly, invalid
//!   values always carry at least one violation
//! - Boundary coverage: declared range ends appear among boundaries
//! - Nullability discipline: non-nullable slots never yield null
//! - Cycle safety: cyclic type graphs terminate in a mock, never a
//!   stack overflow
//!
//! Run with: cargo test --test generation_properties
//! Reproducible: Set PROPTEST_SEED environment variable for deterministic runs

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use kontrakt_core::{
    validate, Constraint, FixtureEngine, GenerationContext, GenerationRequest, MockEngine,
    ObjectSchema, ParamSpec, TypeDescriptor, TypeId, Value,
};
use proptest::prelude::*;

// ═══════════════════════════════════════════════════════════════════════════
// CUSTOM STRATEGIES FOR GENERATING TEST DATA
// ═══════════════════════════════════════════════════════════════════════════

fn fixed_clock() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Ordered (min, max) pairs for integer ranges
fn int_range_strategy() -> impl Strategy<Value = (i32, i32)> {
    (any::<i32>(), any::<i32>()).prop_map(|(a, b)| (a.min(b), a.max(b)))
}

/// Modest (min, max) pairs for string lengths
fn length_bounds_strategy() -> impl Strategy<Value = (usize, usize)> {
    (0usize..=64, 0usize..=64).prop_map(|(a, b)| (a.min(b), a.max(b)))
}

/// Small (min, max) pairs for collection sizes
fn size_bounds_strategy() -> impl Strategy<Value = (usize, usize)> {
    (0usize..=16, 0usize..=16).prop_map(|(a, b)| (a.min(b), a.max(b)))
}

fn engine_fixture() -> (kontrakt_core::TypeRegistry, MockEngine) {
    (kontrakt_core::TypeRegistry::new(), MockEngine::new())
}

// ═══════════════════════════════════════════════════════════════════════════
// PROPERTY 1: DETERMINISM
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: equal seeds and request sequences yield equal values
    #[test]
    fn prop_generation_is_deterministic(
        seed in any::<u64>(),
        (min, max) in int_range_strategy(),
    ) {
        let (registry, mocks) = engine_fixture();
        let engine = FixtureEngine::new(&registry, &mocks);
        let requests = [
            GenerationRequest::new(TypeDescriptor::Int, "a")
                .with(Constraint::IntRange { min, max }),
            GenerationRequest::new(TypeDescriptor::Text, "b")
                .with(Constraint::NotBlank),
            GenerationRequest::new(TypeDescriptor::Boolean, "c"),
            GenerationRequest::new(
                TypeDescriptor::list(TypeDescriptor::Long),
                "d",
            ),
        ];

        let run = || {
            let ctx = GenerationContext::new(seed, fixed_clock());
            requests
                .iter()
                .map(|r| engine.generate(r, &ctx).unwrap())
                .collect::<Vec<_>>()
        };
        prop_assert_eq!(run(), run());
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PROPERTY 2 / 6: CONSTRAINT SOUNDNESS AND VALIDATOR DUALITY
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Property: generated numeric values validate cleanly; invalid ones
    /// always violate
    #[test]
    fn prop_numeric_soundness_and_duality(
        seed in any::<u64>(),
        (min, max) in int_range_strategy(),
    ) {
        let (registry, mocks) = engine_fixture();
        let engine = FixtureEngine::new(&registry, &mocks);
        let ctx = GenerationContext::new(seed, fixed_clock());
        let request = GenerationRequest::new(TypeDescriptor::Int, "age")
            .with(Constraint::IntRange { min, max });

        let value = engine.generate(&request, &ctx).unwrap();
        prop_assert!(
            validate::validate(&request, &value, fixed_clock()).is_empty(),
            "valid value {value:?} violated its own constraints"
        );

        let invalid = engine.generate_invalid(&request, &ctx).unwrap();
        prop_assert!(!invalid.is_empty());
        for bad in invalid {
            prop_assert!(
                !validate::validate(&request, &bad, fixed_clock()).is_empty(),
                "invalid value {bad:?} validated cleanly for [{min}, {max}]"
            );
        }
    }

    /// Property: string length constraints are sound in both directions
    #[test]
    fn prop_string_soundness_and_duality(
        seed in any::<u64>(),
        (min, max) in length_bounds_strategy(),
        not_blank in any::<bool>(),
    ) {
        // NotBlank plus a zero maximum is unsatisfiable by declaration.
        prop_assume!(!(not_blank && max == 0));
        let (registry, mocks) = engine_fixture();
        let engine = FixtureEngine::new(&registry, &mocks);
        let ctx = GenerationContext::new(seed, fixed_clock());
        let mut request = GenerationRequest::new(TypeDescriptor::Text, "name")
            .with(Constraint::StringLength { min, max: Some(max) });
        if not_blank {
            request = request.with(Constraint::NotBlank);
        }

        let value = engine.generate(&request, &ctx).unwrap();
        prop_assert!(
            validate::validate(&request, &value, fixed_clock()).is_empty(),
            "valid string {value:?} violated [{min}, {max}]"
        );

        for bad in engine.generate_invalid(&request, &ctx).unwrap() {
            prop_assert!(
                !validate::validate(&request, &bad, fixed_clock()).is_empty(),
                "invalid string {bad:?} validated cleanly"
            );
        }
    }

    /// Property: email fixtures honour the declared length budget
    #[test]
    fn prop_email_respects_length_budget(
        seed in any::<u64>(),
        max in 14usize..=64,
    ) {
        let (registry, mocks) = engine_fixture();
        let engine = FixtureEngine::new(&registry, &mocks);
        let ctx = GenerationContext::new(seed, fixed_clock());
        let request = GenerationRequest::new(TypeDescriptor::Text, "email")
            .with(Constraint::Email { allow: vec![], block: vec![] })
            .with(Constraint::StringLength { min: 0, max: Some(max) });

        let value = engine.generate(&request, &ctx).unwrap();
        prop_assert!(
            validate::validate(&request, &value, fixed_clock()).is_empty(),
            "email {value:?} violated its constraints"
        );
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PROPERTY 3: BOUNDARY COVERAGE
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Property: numeric boundaries contain both declared range ends
    #[test]
    fn prop_numeric_boundary_coverage(
        seed in any::<u64>(),
        (min, max) in int_range_strategy(),
    ) {
        let (registry, mocks) = engine_fixture();
        let engine = FixtureEngine::new(&registry, &mocks);
        let ctx = GenerationContext::new(seed, fixed_clock());
        let request = GenerationRequest::new(TypeDescriptor::Int, "n")
            .with(Constraint::IntRange { min, max });

        let boundaries = engine.generate_valid_boundaries(&request, &ctx).unwrap();
        prop_assert!(boundaries.contains(&Value::Int(min)));
        prop_assert!(boundaries.contains(&Value::Int(max)));
    }

    /// Property: collection boundaries sit at the declared sizes
    #[test]
    fn prop_collection_boundary_coverage(
        seed in any::<u64>(),
        (min, max) in size_bounds_strategy(),
    ) {
        let (registry, mocks) = engine_fixture();
        let engine = FixtureEngine::new(&registry, &mocks);
        let ctx = GenerationContext::new(seed, fixed_clock());
        let request = GenerationRequest::new(
            TypeDescriptor::list(TypeDescriptor::Int),
            "items",
        )
        .with(Constraint::Size { min, max: Some(max), ignore_limit: false });

        let boundaries = engine.generate_valid_boundaries(&request, &ctx).unwrap();
        let sizes: Vec<usize> = boundaries.iter().filter_map(Value::size).collect();
        prop_assert!(sizes.contains(&min));
        prop_assert!(sizes.contains(&max));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PROPERTY 4: NULLABILITY DISCIPLINE
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Property: non-nullable slots never produce null
    #[test]
    fn prop_mandatory_slots_never_yield_null(seed in any::<u64>()) {
        let (registry, mocks) = engine_fixture();
        let engine = FixtureEngine::new(&registry, &mocks);
        let ctx = GenerationContext::new(seed, fixed_clock());
        for request in [
            GenerationRequest::new(TypeDescriptor::Int, "a"),
            GenerationRequest::new(TypeDescriptor::Text, "b"),
            GenerationRequest::new(TypeDescriptor::Boolean, "c"),
            GenerationRequest::new(TypeDescriptor::Double, "d"),
        ] {
            let value = engine.generate(&request, &ctx).unwrap();
            prop_assert!(!value.is_null());
        }
    }

    /// Property: a slot declared null yields null and a single boundary
    #[test]
    fn prop_must_be_null_discipline(seed in any::<u64>()) {
        let (registry, mocks) = engine_fixture();
        let engine = FixtureEngine::new(&registry, &mocks);
        let ctx = GenerationContext::new(seed, fixed_clock());
        let request = GenerationRequest::new(TypeDescriptor::Text, "unused")
            .nullable()
            .with(Constraint::MustBeNull);

        prop_assert_eq!(engine.generate(&request, &ctx).unwrap(), Value::Null);
        prop_assert_eq!(
            engine.generate_valid_boundaries(&request, &ctx).unwrap(),
            vec![Value::Null]
        );
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PROPERTY 5: CYCLE SAFETY
// ═══════════════════════════════════════════════════════════════════════════

fn cyclic_registry() -> kontrakt_core::TypeRegistry {
    let mut registry = kontrakt_core::TypeRegistry::new();
    let a = TypeId::parse("cyc.A").unwrap();
    let b = TypeId::parse("cyc.B").unwrap();
    registry.register(ObjectSchema::new(a.clone()).param(ParamSpec::new(
        "b",
        TypeDescriptor::Object { id: b.clone() },
    )));
    registry.register(ObjectSchema::new(b).param(ParamSpec::new(
        "a",
        TypeDescriptor::Object { id: a },
    )));
    registry
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: cyclic graphs terminate with a mock at the cycle point
    #[test]
    fn prop_cycles_end_in_mocks(seed in any::<u64>()) {
        let registry = cyclic_registry();
        let mocks = MockEngine::new();
        let engine = FixtureEngine::new(&registry, &mocks);
        let ctx = GenerationContext::new(seed, fixed_clock());
        let request = GenerationRequest::new(
            TypeDescriptor::Object { id: TypeId::parse("cyc.A").unwrap() },
            "a",
        );

        let value = engine.generate(&request, &ctx).unwrap();
        let cycle_point = value
            .field("b")
            .and_then(|b| b.field("a"))
            .cloned()
            .unwrap();
        prop_assert!(cycle_point.is_mock());
    }

    /// Property: self-referential types resolve the same way
    #[test]
    fn prop_self_reference_is_safe(seed in any::<u64>()) {
        let mut registry = kontrakt_core::TypeRegistry::new();
        let node = TypeId::parse("list.Node").unwrap();
        registry.register(
            ObjectSchema::new(node.clone())
                .param(ParamSpec::new("value", TypeDescriptor::Int))
                .param(ParamSpec::new(
                    "next",
                    TypeDescriptor::Object { id: node.clone() },
                )),
        );
        let mocks = MockEngine::new();
        let engine = FixtureEngine::new(&registry, &mocks);
        let ctx = GenerationContext::new(seed, fixed_clock());
        let request =
            GenerationRequest::new(TypeDescriptor::Object { id: node }, "head");

        let value = engine.generate(&request, &ctx).unwrap();
        prop_assert!(value.field("next").cloned().unwrap().is_mock());
    }
}
