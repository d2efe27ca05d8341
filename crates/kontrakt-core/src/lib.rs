//! # Kontrakt Core
//!
//! Generative contract-testing engine: from a declarative description of
//! a type or behavior, deterministically synthesise input fixtures,
//! exercise the subject, and decide a pass/fail verdict against the
//! declared constraints - with forensic tracing sufficient to reproduce
//! any failure from its seed.
//!
//! ## Architecture
//!
//! The crate follows the **Functional Core, Imperative Shell** pattern:
//!
//! - **Pure synthesis** - generation is a function of seed, clock, and
//!   request; no wall-clock reads, no global state
//! - **Descriptors, not reflection** - host types plug in through the
//!   [`registry`] adapter layer as descriptor schemas with closure bodies
//! - **Errors as values** - a clear taxonomy with `thiserror`; no
//!   panicking control flow in production paths
//! - **Ports at the edges** - mocking, tracing, and publication are
//!   traits; shipped in-memory adapters cover the single-process case
//!
//! ## Module Map
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`constraint`] | Typed constraint declarations |
//! | [`descriptor`] | Explicit type descriptors and identities |
//! | [`value`] | Dynamic runtime values |
//! | [`request`] | Immutable generation requests |
//! | [`context`] | Seeded RNG, fixed clock, recursion history |
//! | [`config`] | Pre-flight constraint validation |
//! | [`generate`] | Fixture engine and type strategies |
//! | [`validate`] | Value contract validation |
//! | [`registry`] | Adapter layer: schemas, constructors, methods |
//! | [`mocking`] | Mocking port and in-memory mock engine |
//! | [`factory`] | Subject and dependency-graph construction |
//! | [`executor`] | Scenario, constructor, and data compliance |
//! | [`verdict`] | Assertion records and the verdict decider |
//! | [`trace`] | Forensic trace events and sinks |
//! | [`spec`] | Test specifications |

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

pub mod config;
pub mod constraint;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod executor;
pub mod factory;
pub mod generate;
pub mod mocking;
pub mod registry;
pub mod request;
pub mod spec;
pub mod trace;
pub mod validate;
pub mod value;
pub mod verdict;

pub use constraint::{Constraint, ConstraintKind, TimeUnit, TimeWindow};
pub use context::GenerationContext;
pub use descriptor::{CollectionKind, TemporalKind, TypeDescriptor, TypeId, TypeIdError};
pub use error::{
    ConfigError, ContractViolation, FactoryError, GenError, InvokeError, MockError,
};
pub use executor::{
    ConstructorComplianceExecutor, DataComplianceExecutor, Deadline, ExecutionOutcome,
    ScenarioExecutor,
};
pub use factory::{EntryPoint, EphemeralContext, InstanceFactory};
pub use generate::{FixtureEngine, DEFAULT_COLLECTION_SIZE, GLOBAL_SIZE_LIMIT};
pub use mocking::{InvocationRecord, MockEngine, MockingPort};
pub use registry::{
    ConstructorBehavior, EqualitySemantics, InterfaceSchema, InvokeResult, MethodSchema,
    MethodSig, ObjectSchema, ParamSpec, TypeRegistry,
};
pub use request::GenerationRequest;
pub use spec::{
    DependencySpec, MockingStrategy, TestMode, TestSpecification, DEFAULT_TIMEOUT_MS,
};
pub use trace::{
    CircuitBreakerSink, InMemorySink, SharedTraceSink, TraceError, TraceEvent, TraceSink,
};
pub use value::Value;
pub use verdict::{
    decide, AssertionRecord, RecordStatus, SessionError, TestResult, TestStatus,
};
