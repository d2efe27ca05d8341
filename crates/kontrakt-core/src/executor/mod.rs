//! Scenario execution.
//!
//! The executor walks the configured test modes for one session and turns
//! every check into an [`AssertionRecord`]. It never unwinds past a
//! subject failure: assertion errors and contract violations become
//! failed records, anything session-fatal becomes the outcome error for
//! the verdict decider. A cooperative deadline is checked between
//! invocations; expiry stops the session without discarding records.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

mod constructor;
mod data;

pub use constructor::ConstructorComplianceExecutor;
pub use data::DataComplianceExecutor;

use std::time::{Duration, Instant};

use tracing::debug;

use crate::context::GenerationContext;
use crate::descriptor::{TypeDescriptor, TypeId};
use crate::error::InvokeError;
use crate::factory::EphemeralContext;
use crate::generate::FixtureEngine;
use crate::mocking::MockEngine;
use crate::registry::{MethodSchema, MethodSig, TypeRegistry};
use crate::spec::{TestMode, TestSpecification};
use crate::trace::TraceEvent;
use crate::validate;
use crate::value::Value;
use crate::verdict::{AssertionRecord, SessionError};

/// Cooperative per-session deadline.
#[derive(Debug, Clone)]
pub struct Deadline {
    started: Instant,
    limit: Duration,
}

impl Deadline {
    #[must_use]
    pub fn starting_now(timeout_ms: u64) -> Self {
        Self {
            started: Instant::now(),
            limit: Duration::from_millis(timeout_ms),
        }
    }

    /// Whether the session budget is spent.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.started.elapsed() >= self.limit
    }

    /// Milliseconds since the session started.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Records plus the session-fatal error, if one occurred.
#[derive(Debug)]
pub struct ExecutionOutcome {
    pub records: Vec<AssertionRecord>,
    pub error: Option<SessionError>,
}

/// Runs the configured modes against a built subject.
pub struct ScenarioExecutor<'a> {
    registry: &'a TypeRegistry,
    mocks: &'a MockEngine,
}

impl<'a> ScenarioExecutor<'a> {
    #[must_use]
    pub const fn new(registry: &'a TypeRegistry, mocks: &'a MockEngine) -> Self {
        Self { registry, mocks }
    }

    /// Execute every declared mode in order.
    pub fn execute(
        &self,
        spec: &TestSpecification,
        ephemeral: &EphemeralContext,
        ctx: &GenerationContext,
        deadline: &Deadline,
    ) -> ExecutionOutcome {
        let mut records = Vec::new();
        let mut error = None;

        for mode in &spec.modes {
            if deadline.expired() {
                error = Some(SessionError::Timeout {
                    ms: deadline.elapsed_ms(),
                });
                break;
            }
            match mode {
                TestMode::UserScenario => {
                    self.run_user_scenario(spec, ephemeral, ctx, deadline, &mut records);
                }
                TestMode::ContractAuto { interface } => {
                    self.run_contract_auto(
                        spec, interface, ephemeral, ctx, deadline, &mut records,
                    );
                }
                TestMode::DataCompliance => {
                    let executor = DataComplianceExecutor::new(self.registry, self.mocks);
                    records.append(&mut executor.execute(&spec.target, ephemeral, ctx));
                }
            }
        }

        if error.is_none() && deadline.expired() {
            error = Some(SessionError::Timeout {
                ms: deadline.elapsed_ms(),
            });
        }
        ExecutionOutcome { records, error }
    }

    /// Invoke every marked scenario method with synthesised arguments.
    fn run_user_scenario(
        &self,
        spec: &TestSpecification,
        ephemeral: &EphemeralContext,
        ctx: &GenerationContext,
        deadline: &Deadline,
        records: &mut Vec<AssertionRecord>,
    ) {
        let Some(schema) = self.registry.object(&spec.target) else {
            records.push(AssertionRecord::failed(
                "UserScenario",
                format!("target {} is not registered", spec.target),
                spec.target.as_str(),
            ));
            return;
        };

        let marked: Vec<&MethodSchema> =
            schema.methods.iter().filter(|m| m.test_marker).collect();
        let chosen: Vec<&MethodSchema> = if marked.is_empty() {
            schema.methods.first().into_iter().collect()
        } else {
            marked
        };

        let engine = FixtureEngine::new(self.registry, self.mocks);
        for method in chosen {
            if deadline.expired() {
                return;
            }
            let location = format!("{}::{}", spec.target, method.sig.name);
            let args = match self.scenario_args(&spec.target, method, ephemeral, &engine, ctx)
            {
                Ok(args) => args,
                Err(err) => {
                    records.push(
                        AssertionRecord::failed("UserScenario", err.to_string(), &location)
                            .with_actual(err.to_string()),
                    );
                    continue;
                }
            };

            self.trace(ephemeral, TraceEvent::ExecutionTrace {
                step: location.clone(),
                detail: format!("invoking with {} argument(s)", args.len()),
            });

            match method.invoke(&ephemeral.subject, &args) {
                Ok(_) => {
                    records.push(AssertionRecord::passed(
                        "UserScenario",
                        "scenario completed",
                        &location,
                    ));
                }
                Err(InvokeError::Assertion { message }) => {
                    self.trace(ephemeral, TraceEvent::ExceptionTrace {
                        class: "AssertionError".to_string(),
                        message: message.clone(),
                    });
                    records.push(AssertionRecord::failed(
                        "UserScenario",
                        message,
                        &location,
                    ));
                }
                Err(InvokeError::Failure { class, message }) => {
                    self.trace(ephemeral, TraceEvent::ExceptionTrace {
                        class: class.clone(),
                        message: message.clone(),
                    });
                    records.push(
                        AssertionRecord::failed(
                            "UserScenario",
                            format!("{class}: {message}"),
                            &location,
                        )
                        .with_actual(class),
                    );
                }
            }
        }
    }

    /// Scenario arguments: the subject for instance parameters, fresh
    /// fixtures for everything else.
    fn scenario_args(
        &self,
        target: &TypeId,
        method: &MethodSchema,
        ephemeral: &EphemeralContext,
        engine: &FixtureEngine<'_>,
        ctx: &GenerationContext,
    ) -> Result<Vec<Value>, crate::error::GenError> {
        method
            .sig
            .params
            .iter()
            .map(|param| {
                if let TypeDescriptor::Object { id } = &param.ty {
                    if id == target {
                        return Ok(ephemeral.subject.clone());
                    }
                }
                engine.generate(&param.request(target.as_str()), ctx)
            })
            .collect()
    }

    /// Fuzz every method of the contract surface and validate returns.
    fn run_contract_auto(
        &self,
        spec: &TestSpecification,
        interface: &TypeId,
        ephemeral: &EphemeralContext,
        ctx: &GenerationContext,
        deadline: &Deadline,
        records: &mut Vec<AssertionRecord>,
    ) {
        let Some(contract) = self.registry.interface(interface) else {
            records.push(AssertionRecord::failed(
                "ContractAuto",
                format!("interface {interface} is not registered"),
                interface.as_str(),
            ));
            return;
        };

        let engine = FixtureEngine::new(self.registry, self.mocks);
        for sig in &contract.methods {
            if deadline.expired() {
                return;
            }
            let location = format!("{interface}::{}", sig.name);
            let args: Result<Vec<Value>, _> = sig
                .params
                .iter()
                .map(|param| engine.generate(&param.request(interface.as_str()), ctx))
                .collect();
            let args = match args {
                Ok(args) => args,
                Err(err) => {
                    records.push(AssertionRecord::failed(
                        "ContractAuto",
                        format!("argument synthesis failed: {err}"),
                        &location,
                    ));
                    continue;
                }
            };

            match self.invoke_contract_method(spec, sig, ephemeral, &args, &engine, ctx) {
                Ok(returned) => {
                    records.push(self.validate_return(sig, interface, &returned, ctx, &location));
                }
                Err(err) => {
                    self.trace(ephemeral, TraceEvent::ExceptionTrace {
                        class: err.class_name().to_string(),
                        message: err.to_string(),
                    });
                    records.push(
                        AssertionRecord::failed(
                            "ContractAuto",
                            format!("invocation raised {err}"),
                            &location,
                        )
                        .with_actual(err.class_name().to_string()),
                    );
                }
            }
        }
    }

    fn invoke_contract_method(
        &self,
        spec: &TestSpecification,
        sig: &MethodSig,
        ephemeral: &EphemeralContext,
        args: &[Value],
        engine: &FixtureEngine<'_>,
        ctx: &GenerationContext,
    ) -> Result<Value, InvokeError> {
        if ephemeral.subject.is_mock() {
            return self.mocks.invoke(&spec.target, sig, args, engine, ctx);
        }
        let schema = self
            .registry
            .object(&spec.target)
            .ok_or_else(|| InvokeError::Failure {
                class: "ConfigurationError".to_string(),
                message: format!("target {} is not registered", spec.target),
            })?;
        let method = schema
            .method_named(&sig.name)
            .ok_or_else(|| InvokeError::Failure {
                class: "ConfigurationError".to_string(),
                message: format!("{} does not implement {}", spec.target, sig.name),
            })?;
        method.invoke(&ephemeral.subject, args)
    }

    fn validate_return(
        &self,
        sig: &MethodSig,
        interface: &TypeId,
        returned: &Value,
        ctx: &GenerationContext,
        location: &str,
    ) -> AssertionRecord {
        let Some(ret) = &sig.ret else {
            return AssertionRecord::passed("ContractAuto", "method completed", location);
        };
        let request = ret.request(interface.as_str());
        match validate::check(&request, returned, ctx.clock()) {
            Ok(()) => AssertionRecord::passed(
                "ContractAuto",
                "return value honours its contract",
                location,
            ),
            Err(violation) => {
                debug!(rule = %violation.rule, "return value violated its contract");
                let mut record =
                    AssertionRecord::failed(violation.rule.to_string(), violation.message, location);
                if let Some(expected) = violation.expected {
                    record = record.with_expected(expected);
                }
                if let Some(actual) = violation.actual {
                    record = record.with_actual(actual);
                }
                record
            }
        }
    }

    fn trace(&self, ephemeral: &EphemeralContext, event: TraceEvent) {
        let _ = ephemeral.trace.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Constraint;
    use crate::factory::InstanceFactory;
    use crate::registry::{ObjectSchema, ParamSpec};
    use crate::spec::MockingStrategy;
    use crate::trace::{InMemorySink, SharedTraceSink};
    use chrono::{DateTime, Utc};
    use std::sync::Arc;

    fn clock() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn ctx(seed: u64) -> GenerationContext {
        GenerationContext::new(seed, clock())
    }

    fn trace() -> SharedTraceSink {
        Arc::new(InMemorySink::new())
    }

    /// A guarded setter target: accepts ages inside [1, 10] only.
    fn guarded_registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        let target = TypeId::parse("crm.Profile").unwrap();
        registry.register(
            ObjectSchema::new(target)
                .param(ParamSpec::new("label", TypeDescriptor::Text))
                .method(
                    MethodSchema::new(
                        MethodSig::new("setAge").param(
                            ParamSpec::new("age", TypeDescriptor::Int)
                                .with(Constraint::IntRange { min: 1, max: 10 }),
                        ),
                        |_, args| match args.first() {
                            Some(Value::Int(age)) if (1..=10).contains(age) => {
                                Ok(Value::Null)
                            }
                            _ => Err(InvokeError::rejection("age out of range")),
                        },
                    )
                    .marked(),
                ),
        );
        registry
    }

    fn build_and_run(
        registry: &TypeRegistry,
        spec: &TestSpecification,
        seed: u64,
    ) -> ExecutionOutcome {
        let mocks = MockEngine::new();
        let factory = InstanceFactory::new(registry, &mocks);
        let ctx = ctx(seed);
        let ephemeral = factory.build(spec, &ctx, trace()).unwrap();
        let executor = ScenarioExecutor::new(registry, &mocks);
        executor.execute(spec, &ephemeral, &ctx, &Deadline::starting_now(5_000))
    }

    #[test]
    fn user_scenario_passes_with_compliant_arguments() {
        let registry = guarded_registry();
        let spec = TestSpecification::for_target(TypeId::parse("crm.Profile").unwrap())
            .mode(TestMode::UserScenario)
            .seeded(42);
        let outcome = build_and_run(&registry, &spec, 42);
        assert!(outcome.error.is_none());
        assert!(outcome.records.iter().all(|r| !r.is_failed()));
    }

    #[test]
    fn contract_auto_validates_return_values() {
        let mut registry = TypeRegistry::new();
        let target = TypeId::parse("svc.Counter").unwrap();
        let iface = TypeId::parse("api.Counter").unwrap();
        registry.register(
            ObjectSchema::new(target.clone()).method(MethodSchema::new(
                MethodSig::new("next").returns(
                    ParamSpec::new("return", TypeDescriptor::Int)
                        .with(Constraint::Positive),
                ),
                // Broken on purpose: returns a non-positive counter.
                |_, _| Ok(Value::Int(0)),
            )),
        );
        registry.register_interface(
            crate::registry::InterfaceSchema::new(iface.clone()).method(
                MethodSig::new("next").returns(
                    ParamSpec::new("return", TypeDescriptor::Int)
                        .with(Constraint::Positive),
                ),
            ),
        );

        let spec = TestSpecification::for_target(target)
            .mode(TestMode::ContractAuto { interface: iface });
        let outcome = build_and_run(&registry, &spec, 1);
        let failed: Vec<_> = outcome.records.iter().filter(|r| r.is_failed()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].rule, "Positive");
        assert_eq!(failed[0].actual.as_deref(), Some("0"));
    }

    #[test]
    fn contract_auto_on_a_mock_subject_answers_with_fixtures() {
        let mut registry = TypeRegistry::new();
        let target = TypeId::parse("ports.Clockwork").unwrap();
        let iface = TypeId::parse("api.Clockwork").unwrap();
        registry.register_interface(
            crate::registry::InterfaceSchema::new(iface.clone()).method(
                MethodSig::new("tick").returns(
                    ParamSpec::new("return", TypeDescriptor::Long)
                        .with(Constraint::PositiveOrZero),
                ),
            ),
        );

        let spec = TestSpecification::for_target(target.clone())
            .mode(TestMode::ContractAuto { interface: iface })
            .dependency(target, MockingStrategy::StatelessMock);
        let outcome = build_and_run(&registry, &spec, 3);
        assert!(outcome.records.iter().all(|r| !r.is_failed()));
    }

    #[test]
    fn expired_deadline_becomes_a_timeout_error() {
        let registry = guarded_registry();
        let spec = TestSpecification::for_target(TypeId::parse("crm.Profile").unwrap())
            .mode(TestMode::UserScenario);
        let mocks = MockEngine::new();
        let factory = InstanceFactory::new(&registry, &mocks);
        let ctx = ctx(1);
        let ephemeral = factory.build(&spec, &ctx, trace()).unwrap();
        let executor = ScenarioExecutor::new(&registry, &mocks);
        let outcome = executor.execute(&spec, &ephemeral, &ctx, &Deadline::starting_now(0));
        assert!(matches!(outcome.error, Some(SessionError::Timeout { .. })));
    }

    #[test]
    fn subject_exceptions_become_failed_records_not_crashes() {
        let mut registry = TypeRegistry::new();
        let target = TypeId::parse("svc.Flaky").unwrap();
        registry.register(
            ObjectSchema::new(target.clone()).method(
                MethodSchema::new(MethodSig::new("explode"), |_, _| {
                    Err(InvokeError::Failure {
                        class: "IllegalStateException".to_string(),
                        message: "kaboom".to_string(),
                    })
                })
                .marked(),
            ),
        );
        let spec = TestSpecification::for_target(target).mode(TestMode::UserScenario);
        let outcome = build_and_run(&registry, &spec, 5);
        assert!(outcome.error.is_none());
        let failed = &outcome.records[0];
        assert!(failed.is_failed());
        assert_eq!(failed.actual.as_deref(), Some("IllegalStateException"));
    }
}
