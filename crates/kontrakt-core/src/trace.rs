//! Forensic trace events and sinks.
//!
//! Executors append events describing what the session decided, executed,
//! verified, and concluded. The sink is a port: the core only requires
//! that each emit is independent. The shipped in-memory sink keeps an
//! optional retention cap and snapshots to NDJSON, one event per line;
//! the circuit breaker wrapper guarantees that a failing sink can never
//! abort a session.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Failures raised by trace sinks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TraceError {
    /// Operation after teardown
    #[error("trace sink is closed")]
    Closed,

    /// Snapshot or write failure
    #[error("trace sink i/o failure: {0}")]
    Io(String),
}

/// One trace event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "data")]
pub enum TraceEvent {
    /// The engine chose between admissible behaviors
    DesignDecision { subject: String, decision: String },
    /// A step of subject execution
    ExecutionTrace { step: String, detail: String },
    /// A rule evaluation outcome
    VerificationTrace { rule: String, outcome: String },
    /// An exception observed in or around the subject
    ExceptionTrace { class: String, message: String },
    /// The terminal verdict of a session
    TestVerdict {
        target: String,
        status: String,
        seed: u64,
    },
}

impl TraceEvent {
    /// Event discriminator string, stable for journaling.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::DesignDecision { .. } => "design_decision",
            Self::ExecutionTrace { .. } => "execution_trace",
            Self::VerificationTrace { .. } => "verification_trace",
            Self::ExceptionTrace { .. } => "exception_trace",
            Self::TestVerdict { .. } => "test_verdict",
        }
    }
}

/// Append-only trace port.
pub trait TraceSink {
    /// Append one event.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::Closed`] after teardown.
    fn emit(&self, event: TraceEvent) -> Result<(), TraceError>;

    /// Write the retained events as NDJSON, one per line.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::Io`] on write failure.
    fn snapshot_to(&self, path: &Path) -> Result<(), TraceError>;

    /// Drop all retained events.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::Closed`] after teardown.
    fn reset(&self) -> Result<(), TraceError>;

    /// Tear the sink down; further writes fail.
    ///
    /// # Errors
    ///
    /// Never fails for the shipped sinks.
    fn close(&self) -> Result<(), TraceError>;
}

/// Shared handle executors append through.
pub type SharedTraceSink = Arc<dyn TraceSink + Send + Sync>;

/// In-memory sink with an optional retention cap; events beyond the cap
/// are dropped silently.
#[derive(Debug, Default)]
pub struct InMemorySink {
    events: Mutex<Vec<TraceEvent>>,
    cap: Option<usize>,
    closed: AtomicBool,
}

impl InMemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink retaining at most `cap` events.
    #[must_use]
    pub fn with_cap(cap: usize) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            cap: Some(cap),
            closed: AtomicBool::new(false),
        }
    }

    /// Snapshot of the retained events.
    #[must_use]
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl TraceSink for InMemorySink {
    fn emit(&self, event: TraceEvent) -> Result<(), TraceError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TraceError::Closed);
        }
        let mut events = self
            .events
            .lock()
            .map_err(|_| TraceError::Io("poisoned".to_string()))?;
        if self.cap.map_or(true, |cap| events.len() < cap) {
            events.push(event);
        }
        Ok(())
    }

    fn snapshot_to(&self, path: &Path) -> Result<(), TraceError> {
        let events = self.events();
        let file = File::create(path).map_err(|err| TraceError::Io(err.to_string()))?;
        let mut writer = BufWriter::new(file);
        for event in &events {
            let line =
                serde_json::to_string(event).map_err(|err| TraceError::Io(err.to_string()))?;
            writeln!(writer, "{line}").map_err(|err| TraceError::Io(err.to_string()))?;
        }
        writer.flush().map_err(|err| TraceError::Io(err.to_string()))
    }

    fn reset(&self) -> Result<(), TraceError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TraceError::Closed);
        }
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
        Ok(())
    }

    fn close(&self) -> Result<(), TraceError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// Wrapper that logs the first sink failure and silently drops every
/// subsequent write. Infrastructure failures never abort a session.
pub struct CircuitBreakerSink<S> {
    inner: S,
    tripped: AtomicBool,
}

impl<S> CircuitBreakerSink<S> {
    #[must_use]
    pub const fn new(inner: S) -> Self {
        Self {
            inner,
            tripped: AtomicBool::new(false),
        }
    }

    /// Whether the breaker has tripped.
    #[must_use]
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    /// The wrapped sink.
    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: TraceSink> TraceSink for CircuitBreakerSink<S> {
    fn emit(&self, event: TraceEvent) -> Result<(), TraceError> {
        if self.is_tripped() {
            return Ok(());
        }
        if let Err(err) = self.inner.emit(event) {
            warn!(error = %err, "trace sink failed; dropping further writes");
            self.tripped.store(true, Ordering::Release);
        }
        Ok(())
    }

    fn snapshot_to(&self, path: &Path) -> Result<(), TraceError> {
        self.inner.snapshot_to(path)
    }

    fn reset(&self) -> Result<(), TraceError> {
        self.tripped.store(false, Ordering::Release);
        self.inner.reset()
    }

    fn close(&self) -> Result<(), TraceError> {
        self.inner.close()
    }
}
