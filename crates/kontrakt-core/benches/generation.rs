#![warn(clippy::nursery)]
#![forbid(unsafe_code)]
#![allow(
    unused_imports,
    dead_code,
    clippy::expect_used,
    clippy::uninlined_format_args,
    clippy::redundant_closure
)]

//! Benchmark fixture generation throughput.
//!
//! Generation sits on the hot path of every session: constructor fuzzing
//! alone synthesises dozens of values per parameter, so per-value cost is
//! what bounds session latency.

use chrono::{DateTime, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kontrakt_core::{
    Constraint, FixtureEngine, GenerationContext, GenerationRequest, MockEngine, ObjectSchema,
    ParamSpec, TypeDescriptor, TypeId, TypeRegistry,
};

// ============================================================================
// FIXTURES
// ============================================================================

fn fixed_clock() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

fn constrained_int() -> GenerationRequest {
    GenerationRequest::new(TypeDescriptor::Int, "age")
        .with(Constraint::IntRange { min: 1, max: 10 })
}

fn constrained_email() -> GenerationRequest {
    GenerationRequest::new(TypeDescriptor::Text, "email")
        .with(Constraint::Email {
            allow: vec![],
            block: vec![],
        })
        .with(Constraint::StringLength {
            min: 0,
            max: Some(32),
        })
}

fn sized_list() -> GenerationRequest {
    GenerationRequest::new(TypeDescriptor::list(TypeDescriptor::Long), "items").with(
        Constraint::Size {
            min: 1,
            max: Some(16),
            ignore_limit: false,
        },
    )
}

fn object_registry() -> (TypeRegistry, GenerationRequest) {
    let id = TypeId::parse("bench.Order").expect("valid id");
    let mut registry = TypeRegistry::new();
    registry.register(
        ObjectSchema::new(id.clone())
            .param(ParamSpec::new("quantity", TypeDescriptor::Int).with(Constraint::Positive))
            .param(ParamSpec::new("note", TypeDescriptor::Text).with(Constraint::NotBlank))
            .param(ParamSpec::new(
                "tags",
                TypeDescriptor::list(TypeDescriptor::Text),
            )),
    );
    let request = GenerationRequest::new(TypeDescriptor::Object { id }, "order");
    (registry, request)
}

// ============================================================================
// BENCHMARKS
// ============================================================================

fn bench_terminal_strategies(c: &mut Criterion) {
    let registry = TypeRegistry::new();
    let mocks = MockEngine::new();
    let engine = FixtureEngine::new(&registry, &mocks);
    let ctx = GenerationContext::new(42, fixed_clock());

    let mut group = c.benchmark_group("terminal_strategies");
    for (label, request) in [
        ("int_range", constrained_int()),
        ("email", constrained_email()),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(label), &request, |b, req| {
            b.iter(|| black_box(engine.generate(req, &ctx).expect("generation succeeds")));
        });
    }
    group.finish();
}

fn bench_recursive_strategies(c: &mut Criterion) {
    let (registry, object_request) = object_registry();
    let mocks = MockEngine::new();
    let engine = FixtureEngine::new(&registry, &mocks);
    let ctx = GenerationContext::new(42, fixed_clock());
    let list_request = sized_list();

    let mut group = c.benchmark_group("recursive_strategies");
    group.bench_function("sized_list", |b| {
        b.iter(|| black_box(engine.generate(&list_request, &ctx).expect("list generates")));
    });
    group.bench_function("object_graph", |b| {
        b.iter(|| {
            black_box(
                engine
                    .generate(&object_request, &ctx)
                    .expect("object generates"),
            )
        });
    });
    group.finish();
}

fn bench_invalid_family(c: &mut Criterion) {
    let registry = TypeRegistry::new();
    let mocks = MockEngine::new();
    let engine = FixtureEngine::new(&registry, &mocks);
    let ctx = GenerationContext::new(42, fixed_clock());
    let request = constrained_int();

    c.bench_function("generate_invalid/int_range", |b| {
        b.iter(|| {
            black_box(
                engine
                    .generate_invalid(&request, &ctx)
                    .expect("invalid family generates"),
            )
        });
    });
}

criterion_group!(
    benches,
    bench_terminal_strategies,
    bench_recursive_strategies,
    bench_invalid_family
);
criterion_main!(benches);
