//! SQL execution contracts.
//!
//! Statement execution is a black box: a named stored procedure is invoked
//! with JSON arguments and answers with JSON.

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::dependency::DependencyResult;

/// Executes stored procedures against the SQL backend.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Invoke `procedure` with `args`.
    async fn execute(
        &self,
        procedure: &str,
        args: &Value,
        cancellation: CancellationToken,
    ) -> DependencyResult<Value>;
}
