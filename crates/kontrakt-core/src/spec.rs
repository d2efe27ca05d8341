//! Test specifications: what to test, how, and with which dependencies.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::descriptor::TypeId;

/// Default per-session deadline.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// How one declared dependency is satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "with")]
pub enum MockingStrategy {
    /// Instantiate this concrete implementation by constructor
    Real { implementation: TypeId },
    /// Stateless mock with generated answers
    StatelessMock,
    /// Stateful fake with an in-memory store
    StatefulFake,
    /// Environment-provided stand-in, treated like a stateless mock
    Environment,
}

/// A dependency the subject requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    pub ty: TypeId,
    pub strategy: MockingStrategy,
}

/// Test modes a session may run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "of")]
pub enum TestMode {
    /// Fuzz every method of the named contract surface
    ContractAuto { interface: TypeId },
    /// Run the target's marked scenario methods
    UserScenario,
    /// Verify value-object equality and hash laws
    DataCompliance,
}

/// Immutable description of one test session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSpecification {
    pub target: TypeId,
    pub modes: Vec<TestMode>,
    pub dependencies: Vec<DependencySpec>,
    /// Fixed seed; absent means derive one at session start
    pub seed: Option<u64>,
    pub timeout_ms: u64,
}

impl TestSpecification {
    /// Specification for a target with no modes yet.
    #[must_use]
    pub const fn for_target(target: TypeId) -> Self {
        Self {
            target,
            modes: Vec::new(),
            dependencies: Vec::new(),
            seed: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    #[must_use]
    pub fn mode(mut self, mode: TestMode) -> Self {
        self.modes.push(mode);
        self
    }

    #[must_use]
    pub fn dependency(mut self, ty: TypeId, strategy: MockingStrategy) -> Self {
        self.dependencies.push(DependencySpec { ty, strategy });
        self
    }

    #[must_use]
    pub const fn seeded(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub const fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Declared strategy for a dependency type, if any.
    #[must_use]
    pub fn strategy_for(&self, ty: &TypeId) -> Option<&MockingStrategy> {
        self.dependencies
            .iter()
            .find(|d| &d.ty == ty)
            .map(|d| &d.strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_modes_and_dependencies() {
        let repo = TypeId::parse("ports.Repo").unwrap();
        let spec = TestSpecification::for_target(TypeId::parse("svc.Orders").unwrap())
            .mode(TestMode::UserScenario)
            .mode(TestMode::DataCompliance)
            .dependency(repo.clone(), MockingStrategy::StatefulFake)
            .seeded(42);

        assert_eq!(spec.modes.len(), 2);
        assert_eq!(spec.seed, Some(42));
        assert_eq!(spec.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(
            spec.strategy_for(&repo),
            Some(&MockingStrategy::StatefulFake)
        );
        assert_eq!(spec.strategy_for(&TypeId::parse("x.Y").unwrap()), None);
    }

    #[test]
    fn specifications_serialize_for_journaling() {
        let spec = TestSpecification::for_target(TypeId::parse("svc.Orders").unwrap())
            .mode(TestMode::ContractAuto {
                interface: TypeId::parse("api.OrderService").unwrap(),
            });
        let json = serde_json::to_string(&spec).unwrap();
        let back: TestSpecification = serde_json::from_str(&json).unwrap();
        assert_eq!(spec, back);
    }
}
