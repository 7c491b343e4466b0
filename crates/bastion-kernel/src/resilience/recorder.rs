//! Abstract metrics sink for the resilience layer.

use super::{CircuitState, RetryContext};
use std::time::Duration;

/// Final verdict of one executor call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// The call produced a value
    Success,
    /// The call failed after reaching the dependency
    Failure,
    /// The circuit refused the call
    Rejected,
    /// The caller cancelled
    Cancelled,
}

impl CallOutcome {
    /// Stable lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Receives resilience events. All methods default to no-ops so
/// implementations only override what they export.
pub trait ResilienceRecorder: Send + Sync {
    /// An attempt finished (failed, or the final success).
    fn record_attempt(&self, _dependency: &str, _context: &RetryContext) {}

    /// A circuit changed state.
    fn record_transition(&self, _circuit: &str, _from: CircuitState, _to: CircuitState) {}

    /// A call through the executor reached its verdict.
    fn record_outcome(&self, _dependency: &str, _outcome: CallOutcome, _elapsed: Duration) {}
}

/// Recorder that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecorder;

impl ResilienceRecorder for NoopRecorder {}
