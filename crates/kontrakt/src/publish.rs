//! Result publication port.
//!
//! Publication is fire-and-forget from the session's point of view: a
//! failing publisher is logged and never aborts the session.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::sync::Mutex;

use kontrakt_core::TestResult;
use thiserror::Error;
use tracing::info;

/// Publisher failure; contained at the port boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("result publication failed: {0}")]
pub struct PublishError(pub String);

/// Receives the final result of each session.
pub trait ResultPublisher {
    /// Publish one result.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] on delivery failure; the runner logs and
    /// continues.
    fn publish(&self, result: &TestResult) -> Result<(), PublishError>;
}

/// Publishes through the `tracing` fabric.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPublisher;

impl ResultPublisher for TracingPublisher {
    fn publish(&self, result: &TestResult) -> Result<(), PublishError> {
        info!(
            target = %result.target,
            status = result.status.label(),
            duration_ms = result.duration_ms,
            records = result.records.len(),
            seed = result.seed,
            "session finished"
        );
        Ok(())
    }
}

/// Collects results in memory; the test double for host integrations.
#[derive(Debug, Default)]
pub struct CollectingPublisher {
    results: Mutex<Vec<TestResult>>,
}

impl CollectingPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far.
    #[must_use]
    pub fn results(&self) -> Vec<TestResult> {
        self.results
            .lock()
            .map(|results| results.clone())
            .unwrap_or_default()
    }
}

impl ResultPublisher for CollectingPublisher {
    fn publish(&self, result: &TestResult) -> Result<(), PublishError> {
        self.results
            .lock()
            .map_err(|_| PublishError("collector poisoned".to_string()))?
            .push(result.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kontrakt_core::TestStatus;

    fn sample() -> TestResult {
        TestResult {
            target: "billing.Money".to_string(),
            status: TestStatus::Passed,
            duration_ms: 12,
            records: vec![],
            seed: 42,
        }
    }

    #[test]
    fn collector_keeps_published_results_in_order() {
        let publisher = CollectingPublisher::new();
        publisher.publish(&sample()).unwrap();
        publisher.publish(&sample()).unwrap();
        assert_eq!(publisher.results().len(), 2);
    }

    #[test]
    fn tracing_publisher_never_fails() {
        assert!(TracingPublisher.publish(&sample()).is_ok());
    }
}
