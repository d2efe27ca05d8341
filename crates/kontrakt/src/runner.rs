//! Session runner: one specification in, one immutable verdict out.
//!
//! A session walks a one-way lifecycle, `Pending -> Running -> Terminal`.
//! The runner derives the seed (specification, then policy, then a single
//! wall-clock read - the only one in the workspace), captures the fixed
//! session clock, pre-flights every declared slot, builds the subject,
//! executes the configured modes under the deadline, decides the verdict,
//! and publishes the result. Port failures are logged, never fatal.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::sync::Arc;

use chrono::Utc;
use kontrakt_core::{
    config, decide, CircuitBreakerSink, Deadline, FactoryError, GenerationContext, InMemorySink,
    InstanceFactory, MockEngine, ScenarioExecutor, SessionError, SharedTraceSink,
    TestMode, TestResult, TestSpecification, TraceEvent, TraceSink, TypeRegistry,
};
use thiserror::Error;
use tracing::{info_span, warn};

use crate::policy::{ExecutionPolicy, Retention};
use crate::publish::ResultPublisher;

/// One-way session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Pending,
    Running,
    Terminal,
}

/// Invalid lifecycle transition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid session transition: {from:?} -> {to:?}")]
pub struct LifecycleError {
    pub from: SessionState,
    pub to: SessionState,
}

/// Session lifecycle guard; transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLifecycle {
    state: SessionState,
}

impl SessionLifecycle {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SessionState::Pending,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// `Pending -> Running`.
    ///
    /// # Errors
    ///
    /// Rejects any other transition.
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        if self.state == SessionState::Pending {
            self.state = SessionState::Running;
            Ok(())
        } else {
            Err(LifecycleError {
                from: self.state,
                to: SessionState::Running,
            })
        }
    }

    /// `Running -> Terminal`.
    ///
    /// # Errors
    ///
    /// Rejects any other transition.
    pub fn finish(&mut self) -> Result<(), LifecycleError> {
        if self.state == SessionState::Running {
            self.state = SessionState::Terminal;
            Ok(())
        } else {
            Err(LifecycleError {
                from: self.state,
                to: SessionState::Terminal,
            })
        }
    }
}

impl Default for SessionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// The runner's output: the published result plus the opaque trace
/// handle reporting reads from.
pub struct SessionReport {
    pub result: TestResult,
    pub trace: SharedTraceSink,
}

/// Runs sessions against one registry under one execution policy.
pub struct SessionRunner<'a> {
    registry: &'a TypeRegistry,
    policy: ExecutionPolicy,
    publisher: &'a dyn ResultPublisher,
}

impl<'a> SessionRunner<'a> {
    #[must_use]
    pub const fn new(
        registry: &'a TypeRegistry,
        policy: ExecutionPolicy,
        publisher: &'a dyn ResultPublisher,
    ) -> Self {
        Self {
            registry,
            policy,
            publisher,
        }
    }

    /// Run one session end to end.
    #[must_use]
    pub fn run(&self, spec: &TestSpecification) -> SessionReport {
        let seed = self.derive_seed(spec);
        let span = info_span!("session", target = %spec.target, seed);
        let _guard = span.enter();

        let mut lifecycle = SessionLifecycle::new();
        let clock = Utc::now();
        let ctx = GenerationContext::new(seed, clock);
        let sink = Arc::new(CircuitBreakerSink::new(
            self.policy
                .auditing
                .depth
                .event_cap()
                .map_or_else(InMemorySink::new, InMemorySink::with_cap),
        ));
        let trace: SharedTraceSink = sink;
        let _ = trace.emit(TraceEvent::DesignDecision {
            subject: spec.target.as_str().to_string(),
            decision: format!("session seed {seed}"),
        });

        if lifecycle.start().is_err() {
            // Unreachable on a fresh lifecycle; defer to the decider.
            return self.terminal(
                spec,
                seed,
                0,
                vec![],
                Some(SessionError::Internal("lifecycle restarted".to_string())),
                trace,
                &mut lifecycle,
            );
        }
        let deadline = Deadline::starting_now(
            self.policy
                .resources
                .timeout_ms
                .unwrap_or(spec.timeout_ms),
        );

        if let Err(err) = self.preflight(spec) {
            let error = SessionError::Configuration(err.to_string());
            let elapsed = deadline.elapsed_ms();
            return self.terminal(spec, seed, elapsed, vec![], Some(error), trace, &mut lifecycle);
        }

        let mocks = MockEngine::new();
        let factory = InstanceFactory::new(self.registry, &mocks);
        let ephemeral = match factory.build(spec, &ctx, Arc::clone(&trace)) {
            Ok(ephemeral) => ephemeral,
            Err(err) => {
                let error = map_factory_error(err);
                let elapsed = deadline.elapsed_ms();
                return self.terminal(
                    spec, seed, elapsed, vec![], Some(error), trace, &mut lifecycle,
                );
            }
        };

        let executor = ScenarioExecutor::new(self.registry, &mocks);
        let outcome = executor.execute(spec, &ephemeral, &ctx, &deadline);
        let elapsed = deadline.elapsed_ms();
        self.terminal(
            spec,
            seed,
            elapsed,
            outcome.records,
            outcome.error,
            trace,
            &mut lifecycle,
        )
    }

    /// Specification seed, then policy seed, then one wall-clock read.
    #[allow(clippy::cast_sign_loss)]
    fn derive_seed(&self, spec: &TestSpecification) -> u64 {
        spec.seed
            .or(self.policy.determinism.seed)
            .unwrap_or_else(|| Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64)
    }

    /// Validate every slot the session will touch, before any synthesis.
    fn preflight(&self, spec: &TestSpecification) -> Result<(), kontrakt_core::ConfigError> {
        if let Some(schema) = self.registry.object(&spec.target) {
            for param in &schema.params {
                config::validate_request(&param.request(spec.target.as_str()))?;
            }
            for method in &schema.methods {
                for param in &method.sig.params {
                    config::validate_request(&param.request(spec.target.as_str()))?;
                }
                if let Some(ret) = &method.sig.ret {
                    config::validate_request(&ret.request(spec.target.as_str()))?;
                }
            }
        }
        for mode in &spec.modes {
            if let TestMode::ContractAuto { interface } = mode {
                if let Some(contract) = self.registry.interface(interface) {
                    for sig in &contract.methods {
                        for param in &sig.params {
                            config::validate_request(&param.request(interface.as_str()))?;
                        }
                        if let Some(ret) = &sig.ret {
                            config::validate_request(&ret.request(interface.as_str()))?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn terminal(
        &self,
        spec: &TestSpecification,
        seed: u64,
        duration_ms: u64,
        records: Vec<kontrakt_core::AssertionRecord>,
        error: Option<SessionError>,
        trace: SharedTraceSink,
        lifecycle: &mut SessionLifecycle,
    ) -> SessionReport {
        let status = decide(error.as_ref(), &records);
        let _ = trace.emit(TraceEvent::TestVerdict {
            target: spec.target.as_str().to_string(),
            status: status.label().to_string(),
            seed,
        });
        let _ = lifecycle.finish();

        let keep_trace = match self.policy.auditing.retention {
            Retention::Always => true,
            Retention::OnFailure => status != kontrakt_core::TestStatus::Passed,
            Retention::None => false,
        };
        if !keep_trace {
            let _ = trace.reset();
        }

        let result = TestResult {
            target: spec.target.as_str().to_string(),
            status,
            duration_ms,
            records,
            seed,
        };
        if let Err(err) = self.publisher.publish(&result) {
            warn!(error = %err, "result publisher failed; continuing");
        }
        SessionReport { result, trace }
    }
}

fn map_factory_error(err: FactoryError) -> SessionError {
    match err {
        FactoryError::Configuration(message) => SessionError::Configuration(message),
        FactoryError::Internal(message) => SessionError::Internal(message),
        FactoryError::CircularDependency { .. } => SessionError::Configuration(err.to_string()),
        FactoryError::Generation(inner) => match inner {
            kontrakt_core::GenError::Config(config) => {
                SessionError::Configuration(config.to_string())
            }
            other => SessionError::Failure(other.to_string()),
        },
        FactoryError::Mock(inner) => SessionError::Failure(inner.to_string()),
    }
}
