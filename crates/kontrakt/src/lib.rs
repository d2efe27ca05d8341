//! # Kontrakt
//!
//! Harness front-end for the Kontrakt contract-testing engine: execution
//! policies mapped from the documented flag surface, the session runner,
//! and result publication. Host integrations (CLI, build tools, IDEs)
//! consume this crate; the engine itself lives in `kontrakt-core`.
//!
//! ## Quick start
//!
//! ```rust
//! use kontrakt::{
//!     Constraint, ExecutionPolicy, ObjectSchema, ParamSpec, SessionRunner, TestMode,
//!     TestSpecification, TracingPublisher, TypeDescriptor, TypeId, TypeRegistry,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = TypeRegistry::new();
//! registry.register(
//!     ObjectSchema::new(TypeId::parse("billing.Money")?)
//!         .param(ParamSpec::new("amount", TypeDescriptor::Long).with(Constraint::PositiveOrZero))
//!         .param(ParamSpec::new("currency", TypeDescriptor::Text).with(
//!             Constraint::StringLength { min: 3, max: Some(3) },
//!         ))
//!         .validated(),
//! );
//!
//! let publisher = TracingPublisher;
//! let runner = SessionRunner::new(&registry, ExecutionPolicy::default(), &publisher);
//! let spec = TestSpecification::for_target(TypeId::parse("billing.Money")?)
//!     .mode(TestMode::DataCompliance)
//!     .seeded(42);
//!
//! let report = runner.run(&spec);
//! assert_eq!(report.result.status.label(), "Passed");
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

pub mod policy;
pub mod publish;
pub mod runner;

pub use policy::{
    AuditDepth, AuditingPolicy, DeterminismPolicy, DiscoveryPolicy, ExecutionPolicy,
    ReportFormat, ReportingDirectives, ResourcePolicy, Retention, UserControlOptions,
};
pub use publish::{CollectingPublisher, PublishError, ResultPublisher, TracingPublisher};
pub use runner::{LifecycleError, SessionLifecycle, SessionReport, SessionRunner, SessionState};

// The engine surface host integrations need, re-exported for one-stop use.
pub use kontrakt_core::{
    decide, AssertionRecord, CollectionKind, Constraint, ConstraintKind, ContractViolation,
    EqualitySemantics, FixtureEngine, GenError, GenerationContext, GenerationRequest,
    InMemorySink, InterfaceSchema, InvokeError, InvokeResult, MethodSchema, MethodSig,
    MockEngine, MockingPort, MockingStrategy, ObjectSchema, ParamSpec, RecordStatus,
    SessionError, SharedTraceSink, TemporalKind, TestMode, TestResult, TestSpecification,
    TestStatus, TimeUnit, TimeWindow, TraceEvent, TraceSink, TypeDescriptor, TypeId,
    TypeRegistry, Value,
};

/// Initialise tracing for host processes that have no subscriber of
/// their own. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
