//! Crate-level error types for `bastion-kernel`.
//!
//! Provides a unified [`KernelError`] that composes errors from every
//! sub-module (config, dependency calls, tool registry, IO, serialization)
//! together with [`error_stack::Report`] for context-carrying propagation.
//!
//! # Usage
//!
//! ```rust,ignore
//! use bastion_kernel::error::{KernelError, KernelResult};
//! use error_stack::ResultExt;
//!
//! fn load() -> KernelResult<ResilienceSettings> {
//!     bastion_kernel::config::load_config("bastion.toml")
//!         .map_err(KernelError::from)
//!         .map_err(error_stack::Report::new)
//!         .attach("loading bastion.toml")
//! }
//! ```

use crate::config::ConfigError;
use crate::dependency::DependencyError;
use crate::tool::ToolRegistryError;
use thiserror::Error;

/// Crate-level error type for `bastion-kernel`.
///
/// Wraps each sub-module's typed error via `#[from]` so that the `?`
/// operator converts them automatically.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KernelError {
    /// A configuration-related error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// An outbound dependency call failed.
    #[error("Dependency error: {0}")]
    Dependency(#[from] DependencyError),

    /// The tool registry rejected a registration or lookup.
    #[error("Tool registry error: {0}")]
    ToolRegistry(#[from] ToolRegistryError),

    /// A low-level I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An internal / untyped error described by a message string.
    #[error("{0}")]
    Internal(String),
}

/// Convenience result alias using [`error_stack::Report`].
pub type KernelResult<T> = Result<T, error_stack::Report<KernelError>>;

#[cfg(test)]
mod tests {
    use super::*;
    use error_stack::{Report, ResultExt};

    #[test]
    fn config_error_converts_via_from() {
        let cfg_err = ConfigError::UnsupportedFormat("xml".to_string());
        let kernel_err: KernelError = cfg_err.into();

        assert!(matches!(kernel_err, KernelError::Config(_)));
        assert!(kernel_err.to_string().contains("xml"));
    }

    #[test]
    fn dependency_error_converts_via_from() {
        let kernel_err: KernelError = DependencyError::Timeout.into();
        assert!(matches!(kernel_err, KernelError::Dependency(_)));
    }

    #[test]
    fn io_error_converts_via_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let kernel_err: KernelError = io_err.into();

        assert!(matches!(kernel_err, KernelError::Io(_)));
        assert!(kernel_err.to_string().contains("file missing"));
    }

    #[test]
    fn report_carries_context() {
        let result: KernelResult<()> =
            Err(Report::new(KernelError::Internal("root cause".into())))
                .attach("while loading resilience settings");

        let report = result.unwrap_err();
        let display = format!("{report:?}");

        assert!(display.contains("root cause"));
        assert!(display.contains("while loading resilience settings"));
    }
}
