//! Test instance factory.
//!
//! Builds the subject-under-test and its dependency closure. Parameters
//! that name a declared dependency (or an abstract type) resolve through
//! the dependency graph - real implementation, stateless mock, or
//! stateful fake; everything else is a basic value synthesised by the
//! fixture engine. Resolve-time cycles among real dependencies are an
//! error with the full path; generation-time cycles are the engine's
//! business and end in a mock.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use crate::context::GenerationContext;
use crate::descriptor::{TypeDescriptor, TypeId};
use crate::error::FactoryError;
use crate::generate::FixtureEngine;
use crate::mocking::MockingPort;
use crate::registry::{ObjectSchema, TypeRegistry};
use crate::request::GenerationRequest;
use crate::spec::{MockingStrategy, TestMode, TestSpecification};
use crate::trace::SharedTraceSink;
use crate::value::Value;

/// Entry point resolved for the session's first mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPoint {
    /// Invoke this method on the subject
    Method(String),
    /// Fuzz the primary constructor
    Constructor,
    /// Walk the named contract surface
    Interface(TypeId),
}

/// Per-session carrier of the subject, its dependencies, and the trace.
/// Created by the factory, read by the executors, destroyed at
/// end-of-session.
pub struct EphemeralContext {
    pub run_id: Uuid,
    pub subject: Value,
    pub dependencies: HashMap<TypeId, Value>,
    pub entry_point: EntryPoint,
    pub trace: SharedTraceSink,
}

impl std::fmt::Debug for EphemeralContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralContext")
            .field("run_id", &self.run_id)
            .field("subject", &self.subject)
            .field("dependencies", &self.dependencies)
            .field("entry_point", &self.entry_point)
            .finish_non_exhaustive()
    }
}

/// Builds subjects by resolving their dependency graphs.
pub struct InstanceFactory<'a> {
    registry: &'a TypeRegistry,
    mocking: &'a dyn MockingPort,
}

impl<'a> InstanceFactory<'a> {
    #[must_use]
    pub const fn new(registry: &'a TypeRegistry, mocking: &'a dyn MockingPort) -> Self {
        Self { registry, mocking }
    }

    /// Build the ephemeral context for one session.
    ///
    /// # Errors
    ///
    /// [`FactoryError::Configuration`] for user-facing mistakes,
    /// [`FactoryError::CircularDependency`] for resolve-time cycles, and
    /// the generation taxonomy for basic-value synthesis failures.
    pub fn build(
        &self,
        spec: &TestSpecification,
        ctx: &GenerationContext,
        trace: SharedTraceSink,
    ) -> Result<EphemeralContext, FactoryError> {
        let run_id = Uuid::new_v4();
        debug!(run_id = %run_id, target = %spec.target, "building test instance");

        let mut dependencies = HashMap::new();
        let subject = self.resolve(&spec.target, spec, ctx, &mut dependencies, &im::Vector::new())?;
        let entry_point = self.resolve_entry_point(spec)?;

        Ok(EphemeralContext {
            run_id,
            subject,
            dependencies,
            entry_point,
            trace,
        })
    }

    /// Resolve one type: cached, declared-strategy, or recursive
    /// constructor injection with basic values from the fixture engine.
    fn resolve(
        &self,
        ty: &TypeId,
        spec: &TestSpecification,
        ctx: &GenerationContext,
        cache: &mut HashMap<TypeId, Value>,
        stack: &im::Vector<TypeId>,
    ) -> Result<Value, FactoryError> {
        if let Some(cached) = cache.get(ty) {
            return Ok(cached.clone());
        }
        if stack.contains(ty) {
            let mut path: Vec<TypeId> = stack.iter().cloned().collect();
            path.push(ty.clone());
            return Err(FactoryError::CircularDependency { path });
        }

        let value = match spec.strategy_for(ty) {
            Some(MockingStrategy::StatelessMock | MockingStrategy::Environment) => {
                self.mocking.create_mock(ty)?
            }
            Some(MockingStrategy::StatefulFake) => self.mocking.create_fake(ty)?,
            Some(MockingStrategy::Real { implementation }) => {
                let implementation = implementation.clone();
                let mut stack = stack.clone();
                stack.push_back(ty.clone());
                self.instantiate(&implementation, spec, ctx, cache, &stack)?
            }
            None => {
                let mut stack = stack.clone();
                stack.push_back(ty.clone());
                self.instantiate(ty, spec, ctx, cache, &stack)?
            }
        };

        cache.insert(ty.clone(), value.clone());
        Ok(value)
    }

    /// Instantiate a concrete type by constructor injection, falling back
    /// to a mock for unregistered or abstract types.
    fn instantiate(
        &self,
        ty: &TypeId,
        spec: &TestSpecification,
        ctx: &GenerationContext,
        cache: &mut HashMap<TypeId, Value>,
        stack: &im::Vector<TypeId>,
    ) -> Result<Value, FactoryError> {
        let Some(schema) = self.registry.object(ty) else {
            debug!(type_id = %ty, "unregistered type, falling back to mock");
            return Ok(self.mocking.create_mock(ty)?);
        };

        if !self.needs_injection(&schema, spec) {
            // Pure value type: one engine pass builds the whole graph.
            let engine = FixtureEngine::new(self.registry, self.mocking);
            let request =
                GenerationRequest::new(TypeDescriptor::Object { id: ty.clone() }, ty.as_str());
            return Ok(engine.generate(&request, ctx)?);
        }

        let engine = FixtureEngine::new(self.registry, self.mocking);
        let mut args = Vec::with_capacity(schema.params.len());
        for param in &schema.params {
            let value = match dependency_id(&param.ty, spec) {
                Some(dependency) => self.resolve(&dependency, spec, ctx, cache, stack)?,
                None => engine.generate_unchecked(&param.request(ty.as_str()), ctx)?,
            };
            args.push(value);
        }

        schema.construct(&args, ctx.clock()).map_err(|err| {
            FactoryError::Configuration(format!(
                "constructor of {ty} rejected resolved arguments: {err}"
            ))
        })
    }

    /// Whether any parameter must go through dependency resolution.
    fn needs_injection(&self, schema: &ObjectSchema, spec: &TestSpecification) -> bool {
        schema
            .params
            .iter()
            .any(|param| dependency_id(&param.ty, spec).is_some())
    }

    fn resolve_entry_point(&self, spec: &TestSpecification) -> Result<EntryPoint, FactoryError> {
        let Some(first_mode) = spec.modes.first() else {
            return Err(FactoryError::Configuration(
                "specification declares no modes".to_string(),
            ));
        };
        match first_mode {
            TestMode::ContractAuto { interface } => {
                if self.registry.interface(interface).is_none() {
                    return Err(FactoryError::Configuration(format!(
                        "interface {interface} is not registered"
                    )));
                }
                if let Some(schema) = self.registry.object(&spec.target) {
                    let declared = &schema.implements;
                    if !declared.is_empty() && !declared.contains(interface) {
                        return Err(FactoryError::Configuration(format!(
                            "target {} does not declare {interface}",
                            spec.target
                        )));
                    }
                }
                Ok(EntryPoint::Interface(interface.clone()))
            }
            TestMode::UserScenario => {
                let schema = self.registry.object(&spec.target).ok_or_else(|| {
                    FactoryError::Configuration(format!(
                        "target {} is not registered",
                        spec.target
                    ))
                })?;
                schema
                    .first_marked_method()
                    .or_else(|| schema.first_method())
                    .map(|m| EntryPoint::Method(m.sig.name.clone()))
                    .ok_or_else(|| {
                        FactoryError::Configuration(format!(
                            "target {} declares no invocable methods",
                            spec.target
                        ))
                    })
            }
            TestMode::DataCompliance => Ok(EntryPoint::Constructor),
        }
    }
}

/// A parameter is a dependency when it is abstract or its type carries a
/// declared mocking strategy.
fn dependency_id(ty: &TypeDescriptor, spec: &TestSpecification) -> Option<TypeId> {
    match ty {
        TypeDescriptor::Abstract { id } => Some(id.clone()),
        TypeDescriptor::Object { id } if spec.strategy_for(id).is_some() => Some(id.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Constraint;
    use crate::mocking::MockEngine;
    use crate::registry::{MethodSchema, MethodSig, ParamSpec};
    use crate::trace::InMemorySink;
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

    fn service_registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register(
            ObjectSchema::new(TypeId::parse("svc.Orders").unwrap())
                .param(ParamSpec::new(
                    "repo",
                    TypeDescriptor::Abstract {
                        id: TypeId::parse("ports.Repo").unwrap(),
                    },
                ))
                .param(
                    ParamSpec::new("retries", TypeDescriptor::Int)
                        .with(Constraint::IntRange { min: 0, max: 5 }),
                )
                .method(MethodSchema::new(MethodSig::new("place"), |_, _| {
                    Ok(Value::Null)
                })),
        );
        registry
    }

    #[test]
    fn abstract_dependencies_become_mocks() {
        let registry = service_registry();
        let mocking = MockEngine::new();
        let factory = InstanceFactory::new(&registry, &mocking);
        let spec = TestSpecification::for_target(TypeId::parse("svc.Orders").unwrap())
            .mode(TestMode::UserScenario);

        let built = factory.build(&spec, &ctx(1), trace()).unwrap();
        let repo = built.subject.field("repo").unwrap();
        assert!(repo.is_mock());
        assert_eq!(built.entry_point, EntryPoint::Method("place".to_string()));
        assert!(built
            .dependencies
            .contains_key(&TypeId::parse("ports.Repo").unwrap()));
    }

    #[test]
    fn declared_fakes_are_created_through_the_port() {
        let registry = service_registry();
        let mocking = MockEngine::new();
        let factory = InstanceFactory::new(&registry, &mocking);
        let repo = TypeId::parse("ports.Repo").unwrap();
        let spec = TestSpecification::for_target(TypeId::parse("svc.Orders").unwrap())
            .mode(TestMode::UserScenario)
            .dependency(repo.clone(), MockingStrategy::StatefulFake);

        let built = factory.build(&spec, &ctx(1), trace()).unwrap();
        assert!(built.dependencies[&repo].is_mock());
    }

    #[test]
    fn real_strategy_instantiates_the_implementation() {
        let mut registry = service_registry();
        registry.register(
            ObjectSchema::new(TypeId::parse("infra.MemRepo").unwrap())
                .param(ParamSpec::new("capacity", TypeDescriptor::Int).with(
                    Constraint::IntRange { min: 1, max: 100 },
                )),
        );
        let mocking = MockEngine::new();
        let factory = InstanceFactory::new(&registry, &mocking);
        let repo = TypeId::parse("ports.Repo").unwrap();
        let spec = TestSpecification::for_target(TypeId::parse("svc.Orders").unwrap())
            .mode(TestMode::UserScenario)
            .dependency(
                repo.clone(),
                MockingStrategy::Real {
                    implementation: TypeId::parse("infra.MemRepo").unwrap(),
                },
            );

        let built = factory.build(&spec, &ctx(1), trace()).unwrap();
        let resolved = &built.dependencies[&repo];
        assert_eq!(
            resolved.type_id().unwrap().as_str(),
            "infra.MemRepo"
        );
    }

    #[test]
    fn circular_real_dependencies_report_the_path() {
        let mut registry = TypeRegistry::new();
        let a = TypeId::parse("cyc.A").unwrap();
        let b = TypeId::parse("cyc.B").unwrap();
        registry.register(ObjectSchema::new(a.clone()).param(ParamSpec::new(
            "b",
            TypeDescriptor::Object { id: b.clone() },
        )));
        registry.register(ObjectSchema::new(b.clone()).param(ParamSpec::new(
            "a",
            TypeDescriptor::Object { id: a.clone() },
        )));
        let mocking = MockEngine::new();
        let factory = InstanceFactory::new(&registry, &mocking);
        // Both sides pinned Real so neither may fall back to a mock.
        let spec = TestSpecification::for_target(a.clone())
            .mode(TestMode::DataCompliance)
            .dependency(
                a.clone(),
                MockingStrategy::Real {
                    implementation: a.clone(),
                },
            )
            .dependency(
                b.clone(),
                MockingStrategy::Real {
                    implementation: b.clone(),
                },
            );

        match factory.build(&spec, &ctx(1), trace()) {
            Err(FactoryError::CircularDependency { path }) => {
                assert!(path.len() >= 3);
                assert_eq!(path.first(), path.last());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn generation_cycles_end_in_a_mock_not_an_error() {
        let mut registry = TypeRegistry::new();
        let a = TypeId::parse("cyc.A").unwrap();
        let b = TypeId::parse("cyc.B").unwrap();
        registry.register(ObjectSchema::new(a.clone()).param(ParamSpec::new(
            "b",
            TypeDescriptor::Object { id: b.clone() },
        )));
        registry.register(ObjectSchema::new(b.clone()).param(ParamSpec::new(
            "a",
            TypeDescriptor::Object { id: a.clone() },
        )));
        let mocking = MockEngine::new();
        let factory = InstanceFactory::new(&registry, &mocking);
        let spec = TestSpecification::for_target(a).mode(TestMode::DataCompliance);

        let built = factory.build(&spec, &ctx(7), trace()).unwrap();
        let inner = built.subject.field("b").unwrap().field("a").unwrap();
        assert!(inner.is_mock(), "cycle point should be a mock: {inner:?}");
    }

    #[test]
    fn missing_modes_are_a_configuration_error() {
        let registry = service_registry();
        let mocking = MockEngine::new();
        let factory = InstanceFactory::new(&registry, &mocking);
        let spec = TestSpecification::for_target(TypeId::parse("svc.Orders").unwrap());
        assert!(matches!(
            factory.build(&spec, &ctx(1), trace()),
            Err(FactoryError::Configuration(_))
        ));
    }

    #[test]
    fn declared_interfaces_gate_contract_auto() {
        let mut registry = TypeRegistry::new();
        let implemented = TypeId::parse("api.Orders").unwrap();
        let other = TypeId::parse("api.Payments").unwrap();
        registry.register(
            ObjectSchema::new(TypeId::parse("svc.Orders").unwrap())
                .method(MethodSchema::new(MethodSig::new("place"), |_, _| {
                    Ok(Value::Null)
                }))
                .implementing(implemented.clone()),
        );
        registry.register_interface(crate::registry::InterfaceSchema::new(implemented.clone()));
        registry.register_interface(crate::registry::InterfaceSchema::new(other.clone()));
        let mocking = MockEngine::new();
        let factory = InstanceFactory::new(&registry, &mocking);

        let good = TestSpecification::for_target(TypeId::parse("svc.Orders").unwrap())
            .mode(TestMode::ContractAuto {
                interface: implemented,
            });
        assert!(factory.build(&good, &ctx(1), trace()).is_ok());

        let bad = TestSpecification::for_target(TypeId::parse("svc.Orders").unwrap())
            .mode(TestMode::ContractAuto { interface: other });
        assert!(matches!(
            factory.build(&bad, &ctx(1), trace()),
            Err(FactoryError::Configuration(_))
        ));
    }

    #[test]
    fn unknown_interfaces_are_a_configuration_error() {
        let registry = service_registry();
        let mocking = MockEngine::new();
        let factory = InstanceFactory::new(&registry, &mocking);
        let spec = TestSpecification::for_target(TypeId::parse("svc.Orders").unwrap()).mode(
            TestMode::ContractAuto {
                interface: TypeId::parse("api.Ghost").unwrap(),
            },
        );
        assert!(matches!(
            factory.build(&spec, &ctx(1), trace()),
            Err(FactoryError::Configuration(_))
        ));
    }
}
