use bastion_kernel::DependencyError;
use bastion_kernel::resilience::{CircuitState, ResilienceError};
use bastion_kernel::tool::ToolRegistryError;
use thiserror::Error;

/// Failure of a chat or tool request.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChatError {
    /// The dependency's circuit refused the call
    #[error("{dependency} is unavailable (circuit {state})")]
    Unavailable {
        dependency: String,
        state: CircuitState,
    },

    /// Every retry failed
    #[error("{dependency} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        dependency: String,
        attempts: u32,
        #[source]
        source: DependencyError,
    },

    /// The dependency failed permanently
    #[error("{dependency} call failed: {source}")]
    Dependency {
        dependency: String,
        #[source]
        source: DependencyError,
    },

    #[error("request cancelled")]
    Cancelled,

    #[error(transparent)]
    Tool(#[from] ToolRegistryError),
}

impl ChatError {
    /// Attribute a resilience outcome to `dependency`.
    pub fn from_resilience(dependency: &str, error: ResilienceError<DependencyError>) -> Self {
        match error {
            ResilienceError::CircuitOpen { state, .. } => Self::Unavailable {
                dependency: dependency.to_string(),
                state,
            },
            ResilienceError::RetryExhausted { attempts, last, .. } => Self::RetriesExhausted {
                dependency: dependency.to_string(),
                attempts,
                source: last,
            },
            ResilienceError::Cancelled => Self::Cancelled,
            ResilienceError::Inner(source) => Self::Dependency {
                dependency: dependency.to_string(),
                source,
            },
        }
    }

    /// Whether the caller should back off and try later.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::RetriesExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn circuit_rejection_maps_to_unavailable() {
        let err = ChatError::from_resilience(
            "llm",
            ResilienceError::CircuitOpen {
                circuit: "llm".into(),
                state: CircuitState::Open,
            },
        );
        assert!(err.is_unavailable());
        assert_eq!(err.to_string(), "llm is unavailable (circuit open)");
    }

    #[test]
    fn exhaustion_keeps_last_error() {
        let err = ChatError::from_resilience(
            "sql",
            ResilienceError::RetryExhausted {
                attempts: 3,
                elapsed: Duration::from_millis(700),
                last: DependencyError::Timeout,
            },
        );
        assert!(matches!(
            err,
            ChatError::RetriesExhausted { attempts: 3, source: DependencyError::Timeout, .. }
        ));
    }
}
