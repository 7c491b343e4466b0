//! Chat and tool endpoints
//!
//! POST /v1/chat         - answer a question
//! POST /v1/tools/{name} - run a tool of the request's module

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use bastion_kernel::{HandlingMode, RequestContext, SensitivitySignal};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::error::{GatewayError, GatewayResult};
use crate::state::AppState;
use bastion_foundation::ChatService;

/// Caller identity and sensitivity, shared by every chat request body.
#[derive(Debug, Deserialize)]
pub struct RequestScope {
    pub tenant: String,
    pub module: String,
    /// Classifier verdict for this request
    #[serde(default)]
    pub sensitive: bool,
    /// Overrides the configured handling mode
    #[serde(default)]
    pub handling_mode: Option<HandlingMode>,
}

impl RequestScope {
    fn context(&self, state: &AppState) -> GatewayResult<RequestContext> {
        if self.tenant.trim().is_empty() || self.module.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "tenant and module are required".into(),
            ));
        }
        let signal = SensitivitySignal {
            contains_sensitive: self.sensitive,
            handling_mode: self.handling_mode,
        };
        Ok(RequestContext::new(&self.tenant, &self.module)
            .with_sensitivity(signal, &state.executor.settings().sensitivity))
    }
}

/// Request body for POST /v1/chat
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(flatten)]
    pub scope: RequestScope,
    pub question: String,
}

/// Request body for POST /v1/tools/{name}
#[derive(Debug, Deserialize)]
pub struct ToolRequest {
    #[serde(flatten)]
    pub scope: RequestScope,
    #[serde(default)]
    pub args: Value,
}

fn chat_service(state: &AppState) -> GatewayResult<&Arc<ChatService>> {
    state.chat.as_ref().ok_or(GatewayError::ChatNotConfigured)
}

/// POST /v1/chat
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> GatewayResult<impl IntoResponse> {
    let service = chat_service(&state)?;
    if req.question.trim().is_empty() {
        return Err(GatewayError::InvalidRequest("question is empty".into()));
    }
    let ctx = req.scope.context(&state)?;

    let answer = service.answer(&ctx, &req.question).await?;
    Ok(Json(json!({
        "request_id": ctx.request_id(),
        "answer": answer,
    })))
}

/// POST /v1/tools/{name}
pub async fn run_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<ToolRequest>,
) -> GatewayResult<impl IntoResponse> {
    let service = chat_service(&state)?;
    let ctx = req.scope.context(&state)?;

    let result = service.run_tool(&ctx, &name, req.args).await?;
    Ok(Json(json!({
        "request_id": ctx.request_id(),
        "tool": name,
        "result": result,
    })))
}

/// Build the chat router sub-tree
pub fn chat_router() -> axum::Router<AppState> {
    use axum::routing::post;
    axum::Router::new()
        .route("/v1/chat", post(chat))
        .route("/v1/tools/{name}", post(run_tool))
}
