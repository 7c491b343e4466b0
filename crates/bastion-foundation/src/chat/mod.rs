//! Chat orchestration
//!
//! [`ChatService`] answers questions through the LLM and runs tools against
//! the SQL surface. Every outbound call goes through the
//! [`ResilientExecutor`]; the request's [`RequestPolicy`](bastion_kernel::RequestPolicy)
//! decides whether answers are cached and how tool results are persisted.

mod error;
pub mod redact;

pub use error::ChatError;

use crate::cache::PolicyGatedCache;
use crate::resilience::ResilientExecutor;
use bastion_kernel::cache::{CacheKey, CachedAnswer};
use bastion_kernel::llm::{ChatMessage, CompletionClient, CompletionRequest, Usage};
use bastion_kernel::sql::SqlExecutor;
use bastion_kernel::storage::{ToolResultMetadata, ToolResultRecord, ToolResultStore};
use bastion_kernel::tool::{ToolRegistry, ToolRegistryError};
use bastion_kernel::{PersistenceDecision, RequestContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Dependency names used with the executor.
pub const LLM_DEPENDENCY: &str = "llm";
pub const SQL_DEPENDENCY: &str = "sql";
pub const STORAGE_DEPENDENCY: &str = "storage";

/// Answer to a chat question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub content: String,
    pub model: String,
    /// Served from the semantic cache
    pub cached: bool,
    /// Token usage; absent for cached answers
    pub usage: Option<Usage>,
}

/// Chat pipeline over the LLM, SQL and storage collaborators.
pub struct ChatService {
    executor: Arc<ResilientExecutor>,
    client: Arc<dyn CompletionClient>,
    sql: Arc<dyn SqlExecutor>,
    tools: Arc<ToolRegistry>,
    cache: PolicyGatedCache,
    store: Option<Arc<dyn ToolResultStore>>,
    model: String,
    system_prompt: Option<String>,
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("client", &self.client.name())
            .field("tools", &self.tools.len())
            .field("cache", &self.cache)
            .field("model", &self.model)
            .finish()
    }
}

impl ChatService {
    pub fn new(
        executor: Arc<ResilientExecutor>,
        client: Arc<dyn CompletionClient>,
        sql: Arc<dyn SqlExecutor>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        let cache = PolicyGatedCache::from_settings(&executor.settings().cache);
        Self {
            executor,
            client,
            sql,
            tools,
            cache,
            store: None,
            model: "default".to_string(),
            system_prompt: None,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: PolicyGatedCache) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ToolResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn executor(&self) -> &Arc<ResilientExecutor> {
        &self.executor
    }

    pub fn cache(&self) -> &PolicyGatedCache {
        &self.cache
    }

    /// Answer `question`, from the cache when the policy allows it.
    #[instrument(skip(self, ctx, question), fields(request_id = %ctx.request_id(), tenant = ctx.tenant(), module = ctx.module()))]
    pub async fn answer(&self, ctx: &RequestContext, question: &str) -> Result<ChatAnswer, ChatError> {
        let tools: Vec<String> = self
            .tools
            .for_module(ctx.module())
            .map(|tool| tool.name.clone())
            .collect();
        let key = CacheKey::new(ctx.tenant(), ctx.module(), question, &tools, None);

        if let Some(hit) = self.cache.get(ctx.policy(), &key).await {
            debug!("semantic cache hit");
            return Ok(ChatAnswer {
                content: hit.content,
                model: hit.model,
                cached: true,
                usage: None,
            });
        }

        let mut request = CompletionRequest::new(self.model.clone());
        if let Some(prompt) = &self.system_prompt {
            request = request.with_message(ChatMessage::system(prompt.clone()));
        }
        let request = request
            .with_message(ChatMessage::user(question))
            .with_tools(tools);

        let client = &self.client;
        let response = self
            .executor
            .run(LLM_DEPENDENCY, ctx.cancellation(), move |_, token| {
                client.complete(request.clone(), token)
            })
            .await
            .map_err(|e| ChatError::from_resilience(LLM_DEPENDENCY, e))?;

        let answer = CachedAnswer {
            content: response.content.clone(),
            model: response.model.clone(),
        };
        if self.cache.put(ctx.policy(), key, answer).await {
            debug!("answer cached");
        }

        Ok(ChatAnswer {
            content: response.content,
            model: response.model,
            cached: false,
            usage: Some(response.usage),
        })
    }

    /// Run the tool `name` of the request's module with `args`.
    ///
    /// The result is returned unchanged; what gets persisted follows the
    /// request policy. A persistence failure is logged, not returned.
    #[instrument(skip(self, ctx, args), fields(request_id = %ctx.request_id(), tenant = ctx.tenant(), module = ctx.module()))]
    pub async fn run_tool(&self, ctx: &RequestContext, name: &str, args: Value) -> Result<Value, ChatError> {
        let tool = self.tools.get(name)?;
        if tool.module != ctx.module() {
            return Err(ToolRegistryError::NotFound(name.to_string()).into());
        }

        let started = Instant::now();
        let sql = &self.sql;
        let procedure = tool.procedure.as_str();
        let args_ref = &args;
        let result = self
            .executor
            .run(SQL_DEPENDENCY, ctx.cancellation(), move |_, token| {
                sql.execute(procedure, args_ref, token)
            })
            .await
            .map_err(|e| ChatError::from_resilience(SQL_DEPENDENCY, e))?;

        let metadata = ToolResultMetadata {
            tool: tool.name.clone(),
            procedure: tool.procedure.clone(),
            byte_len: result.to_string().len(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        self.persist(ctx, metadata, &result).await;
        Ok(result)
    }

    async fn persist(&self, ctx: &RequestContext, metadata: ToolResultMetadata, result: &Value) {
        let Some(store) = &self.store else {
            return;
        };

        let decision = ctx.policy().persistence_decision();
        let payload = match decision {
            PersistenceDecision::Skip => {
                debug!(tool = %metadata.tool, "tool result not persisted");
                return;
            }
            PersistenceDecision::Full => Some(result.clone()),
            PersistenceDecision::Redacted => Some(redact::redact_strings(result)),
            PersistenceDecision::MetadataOnly => None,
        };
        let record = ToolResultRecord {
            request_id: ctx.request_id(),
            tenant: ctx.tenant().to_string(),
            module: ctx.module().to_string(),
            decision,
            metadata,
            payload,
        };

        let saved = self
            .executor
            .run_simple(STORAGE_DEPENDENCY, ctx.cancellation(), move || {
                store.save(record.clone())
            })
            .await;
        if let Err(error) = saved {
            warn!(error = %error, "failed to persist tool result");
        }
    }
}
