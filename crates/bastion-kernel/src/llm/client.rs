use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

use super::types::{CompletionRequest, CompletionResponse, StreamChunk};
use crate::dependency::{DependencyError, DependencyResult};

/// Streaming response type
pub type CompletionStream = Pin<Box<dyn Stream<Item = DependencyResult<StreamChunk>> + Send>>;

/// Abstract LLM provider client.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Provider name
    fn name(&self) -> &str;

    /// Single-shot completion
    async fn complete(
        &self,
        request: CompletionRequest,
        cancellation: CancellationToken,
    ) -> DependencyResult<CompletionResponse>;

    /// Streaming completion (default: not supported)
    async fn stream(
        &self,
        _request: CompletionRequest,
        _cancellation: CancellationToken,
    ) -> DependencyResult<CompletionStream> {
        Err(DependencyError::Unsupported(format!(
            "provider {} does not support streaming",
            self.name()
        )))
    }

    /// Health check
    async fn health_check(&self) -> DependencyResult<bool> {
        Ok(true)
    }
}
