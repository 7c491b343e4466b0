//! Tool result persistence contracts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::dependency::DependencyResult;
use crate::policy::PersistenceDecision;

/// Facts about a tool result that are safe to keep even for sensitive
/// requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResultMetadata {
    pub tool: String,
    pub procedure: String,
    /// Size of the serialized result
    pub byte_len: usize,
    pub elapsed_ms: u64,
}

/// One persisted tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultRecord {
    pub request_id: Uuid,
    pub tenant: String,
    pub module: String,
    pub decision: PersistenceDecision,
    pub metadata: ToolResultMetadata,
    /// Absent for metadata-only records
    pub payload: Option<Value>,
}

/// Durable store for tool results.
#[async_trait]
pub trait ToolResultStore: Send + Sync {
    async fn save(&self, record: ToolResultRecord) -> DependencyResult<()>;
}
