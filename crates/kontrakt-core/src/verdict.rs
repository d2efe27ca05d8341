//! Assertion records, terminal statuses, and the verdict decider.
//!
//! The decider is a pure function from an optional session error and the
//! collected records to a terminal status. Adding a failed record can
//! only move a verdict from passed toward failed, never back.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ContractViolation;

/// Outcome of one executed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    Passed,
    Failed,
    Skipped,
}

/// One assertion outcome produced by an executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionRecord {
    pub status: RecordStatus,
    /// Identity of the rule that was checked
    pub rule: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    /// Where the check ran (target type, method, parameter)
    pub location: String,
}

impl AssertionRecord {
    #[must_use]
    pub fn passed(
        rule: impl Into<String>,
        message: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            status: RecordStatus::Passed,
            rule: rule.into(),
            message: message.into(),
            expected: None,
            actual: None,
            location: location.into(),
        }
    }

    #[must_use]
    pub fn failed(
        rule: impl Into<String>,
        message: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            status: RecordStatus::Failed,
            rule: rule.into(),
            message: message.into(),
            expected: None,
            actual: None,
            location: location.into(),
        }
    }

    #[must_use]
    pub fn skipped(
        rule: impl Into<String>,
        message: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            status: RecordStatus::Skipped,
            rule: rule.into(),
            message: message.into(),
            expected: None,
            actual: None,
            location: location.into(),
        }
    }

    #[must_use]
    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    #[must_use]
    pub fn with_actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    /// Whether this record fails the session.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == RecordStatus::Failed
    }
}

/// Session-fatal error handed to the decider.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    /// The subject raised an assertion
    #[error("assertion failed: {message}")]
    Assertion {
        message: String,
        expected: Option<String>,
        actual: Option<String>,
    },

    /// A validated value broke its contract
    #[error(transparent)]
    Violation(ContractViolation),

    /// User-facing configuration mistake
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Engine invariant violated
    #[error("internal error: {0}")]
    Internal(String),

    /// The session deadline expired
    #[error("timeout after {ms} ms")]
    Timeout { ms: u64 },

    /// Any other failure inside the subject or harness
    #[error("{0}")]
    Failure(String),
}

/// Terminal status of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail")]
pub enum TestStatus {
    Passed,
    AssertionFailed {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        expected: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        actual: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        cause: Option<String>,
    },
    ExecutionError {
        cause: String,
    },
    Disabled,
    Aborted,
}

impl TestStatus {
    /// Short label for traces and reports.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Passed => "Passed",
            Self::AssertionFailed { .. } => "AssertionFailed",
            Self::ExecutionError { .. } => "ExecutionError",
            Self::Disabled => "Disabled",
            Self::Aborted => "Aborted",
        }
    }
}

/// Final result published for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub target: String,
    pub status: TestStatus,
    pub duration_ms: u64,
    pub records: Vec<AssertionRecord>,
    /// Session seed, the reproduction handle
    pub seed: u64,
}

/// Map an optional session error and the collected records to a terminal
/// status.
#[must_use]
pub fn decide(error: Option<&SessionError>, records: &[AssertionRecord]) -> TestStatus {
    if let Some(error) = error {
        return match error {
            SessionError::Assertion {
                message,
                expected,
                actual,
            } => TestStatus::AssertionFailed {
                message: message.clone(),
                expected: expected.clone(),
                actual: actual.clone(),
                cause: None,
            },
            SessionError::Violation(violation) => TestStatus::AssertionFailed {
                message: violation.message.clone(),
                expected: violation.expected.clone(),
                actual: violation.actual.clone(),
                cause: Some(violation.rule.to_string()),
            },
            other => TestStatus::ExecutionError {
                cause: other.to_string(),
            },
        };
    }

    records.iter().find(|r| r.is_failed()).map_or(
        TestStatus::Passed,
        |first_failure| TestStatus::AssertionFailed {
            message: first_failure.message.clone(),
            expected: first_failure.expected.clone(),
            actual: first_failure.actual.clone(),
            cause: Some(first_failure.rule.clone()),
        },
    )
}
