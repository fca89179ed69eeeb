//! Violation handling
//!
//! The guard only detects cross-context access. What happens next (log, panic,
//! abort, record, nothing) is decided by the [`ViolationHandler`] installed on it.

use crate::context::ContextId;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// A cross-context access detected by the guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Operation that was attempted, e.g. a method name
    pub operation: String,
    /// Context the object belongs to
    pub expected: ContextId,
    /// Context the operation was called from
    pub actual: ContextId,
    /// Type of the object, when known
    pub type_name: Option<&'static str>,
    pub occurred_at: DateTime<Utc>,
}

impl Violation {
    pub fn new(operation: impl Into<String>, expected: ContextId, actual: ContextId) -> Self {
        Self {
            operation: operation.into(),
            expected,
            actual,
            type_name: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_type_name(mut self, type_name: &'static str) -> Self {
        self.type_name = Some(type_name);
        self
    }
}

/// Callback invoked once per detected violation
pub trait ViolationHandler: Send + Sync {
    fn on_violation(&self, violation: &Violation);
}

impl<F> ViolationHandler for F
where
    F: Fn(&Violation) + Send + Sync,
{
    fn on_violation(&self, violation: &Violation) {
        self(violation)
    }
}

/// Ignores every violation
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl ViolationHandler for NoopHandler {
    fn on_violation(&self, _violation: &Violation) {}
}

/// Logs violations at error level and carries on
#[derive(Debug, Clone, Copy, Default)]
pub struct LogHandler;

impl ViolationHandler for LogHandler {
    fn on_violation(&self, violation: &Violation) {
        error!(
            operation = %violation.operation,
            expected = %violation.expected,
            actual = %violation.actual,
            type_name = violation.type_name.unwrap_or("<untyped>"),
            "Cross-context access violation"
        );
    }
}

/// Panics on the offending thread
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicHandler;

impl ViolationHandler for PanicHandler {
    fn on_violation(&self, violation: &Violation) {
        panic!(
            "Cross-context access in `{}`: object belongs to {}, called from {}",
            violation.operation, violation.expected, violation.actual
        );
    }
}

/// Logs the violation, then aborts the process
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortHandler;

impl ViolationHandler for AbortHandler {
    fn on_violation(&self, violation: &Violation) {
        LogHandler.on_violation(violation);
        std::process::abort();
    }
}

/// Collects violations in memory.
///
/// Clones share the same buffer, so one clone can be installed on a guard while
/// another is kept for inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
    violations: Arc<Mutex<Vec<Violation>>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn violations(&self) -> Vec<Violation> {
        self.violations.lock().clone()
    }

    /// Operation names recorded so far, in order
    pub fn operations(&self) -> Vec<String> {
        self.violations
            .lock()
            .iter()
            .map(|v| v.operation.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.violations.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.lock().is_empty()
    }

    /// Remove and return everything recorded so far
    pub fn take(&self) -> Vec<Violation> {
        std::mem::take(&mut *self.violations.lock())
    }
}

impl ViolationHandler for RecordingHandler {
    fn on_violation(&self, violation: &Violation) {
        self.violations.lock().push(violation.clone());
    }
}

/// Enforcement strength selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationPolicy {
    Ignore,
    #[default]
    Log,
    Panic,
    Abort,
}

impl ViolationPolicy {
    /// Build the handler implementing this policy
    pub fn handler(self) -> Arc<dyn ViolationHandler> {
        match self {
            ViolationPolicy::Ignore => Arc::new(NoopHandler),
            ViolationPolicy::Log => Arc::new(LogHandler),
            ViolationPolicy::Panic => Arc::new(PanicHandler),
            ViolationPolicy::Abort => Arc::new(AbortHandler),
        }
    }
}
