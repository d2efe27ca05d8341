//! Execution policies and user-facing control options.
//!
//! Host front-ends collect documented flags into a [`UserControlOptions`]
//! record - loadable from TOML - and map it into the three policies the
//! harness consumes: execution (determinism, auditing, resources),
//! discovery, and reporting. Discovery and reporting are pass-throughs
//! for external collaborators; the session runner only reads the
//! execution policy.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// When trace events are kept after a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Retention {
    Always,
    #[default]
    OnFailure,
    None,
}

/// How much forensic depth the trace carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditDepth {
    #[default]
    Simple,
    Explainable,
}

impl AuditDepth {
    /// Event cap the in-memory sink applies at this depth; `None` means
    /// unbounded retention.
    #[must_use]
    pub const fn event_cap(self) -> Option<usize> {
        match self {
            Self::Simple => Some(256),
            Self::Explainable => None,
        }
    }
}

/// Determinism controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeterminismPolicy {
    /// Session seed when the specification does not pin one
    pub seed: Option<u64>,
}

/// Auditing controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuditingPolicy {
    pub retention: Retention,
    pub depth: AuditDepth,
}

/// Resource controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourcePolicy {
    /// Per-session deadline override in milliseconds
    pub timeout_ms: Option<u64>,
}

/// Everything the session runner needs to know from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionPolicy {
    pub determinism: DeterminismPolicy,
    pub auditing: AuditingPolicy,
    pub resources: ResourcePolicy,
}

/// Source selection hints for external discovery collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiscoveryPolicy {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

/// Output format hints for external reporting collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Console,
    Html,
    Xml,
}

/// Reporting hand-off.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportingDirectives {
    pub format: ReportFormat,
    pub output_dir: Option<PathBuf>,
}

/// The documented flag surface, as one serde record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserControlOptions {
    pub seed: Option<u64>,
    pub retention: Retention,
    pub audit_depth: AuditDepth,
    pub timeout_ms: Option<u64>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub report_format: ReportFormat,
    pub output_dir: Option<PathBuf>,
}

impl UserControlOptions {
    /// Parse options from TOML text.
    ///
    /// # Errors
    ///
    /// Returns a contextualised error for malformed documents.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("malformed control options document")
    }

    /// Load options from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a contextualised error when the file is unreadable or
    /// malformed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading control options from {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    /// Map the flag surface into the three policies.
    #[must_use]
    pub fn into_policies(self) -> (ExecutionPolicy, DiscoveryPolicy, ReportingDirectives) {
        let execution = ExecutionPolicy {
            determinism: DeterminismPolicy { seed: self.seed },
            auditing: AuditingPolicy {
                retention: self.retention,
                depth: self.audit_depth,
            },
            resources: ResourcePolicy {
                timeout_ms: self.timeout_ms,
            },
        };
        let discovery = DiscoveryPolicy {
            include: self.include,
            exclude: self.exclude,
        };
        let reporting = ReportingDirectives {
            format: self.report_format,
            output_dir: self.output_dir,
        };
        (execution, discovery, reporting)
    }
}
