//! [`ResilienceRecorder`] that turns resilience events into log lines.

use bastion_kernel::resilience::{CallOutcome, CircuitState, ResilienceRecorder, RetryContext};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Logs every resilience event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

impl ResilienceRecorder for TracingRecorder {
    fn record_attempt(&self, dependency: &str, context: &RetryContext) {
        match &context.last_error {
            Some(error) => debug!(
                target: "bastion::resilience",
                dependency,
                attempt = context.attempt_number,
                total_attempts = context.total_attempts,
                elapsed_ms = context.elapsed.as_millis() as u64,
                next_delay_ms = context.next_delay.map(|d| d.as_millis() as u64),
                error = %error,
                "attempt failed"
            ),
            None => debug!(
                target: "bastion::resilience",
                dependency,
                attempt = context.attempt_number,
                elapsed_ms = context.elapsed.as_millis() as u64,
                "attempt succeeded"
            ),
        }
    }

    fn record_transition(&self, circuit: &str, from: CircuitState, to: CircuitState) {
        info!(
            target: "bastion::resilience",
            circuit,
            from = from.as_str(),
            to = to.as_str(),
            "circuit transition"
        );
    }

    fn record_outcome(&self, dependency: &str, outcome: CallOutcome, elapsed: Duration) {
        let elapsed_ms = elapsed.as_millis() as u64;
        match outcome {
            CallOutcome::Failure | CallOutcome::Rejected => warn!(
                target: "bastion::resilience",
                dependency,
                outcome = outcome.as_str(),
                elapsed_ms,
                "call finished"
            ),
            CallOutcome::Success | CallOutcome::Cancelled => debug!(
                target: "bastion::resilience",
                dependency,
                outcome = outcome.as_str(),
                elapsed_ms,
                "call finished"
            ),
        }
    }
}
