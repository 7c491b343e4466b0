use async_trait::async_trait;
use axum::{
    Router,
    body::{self, Body},
    http::{Request, StatusCode},
};
use bastion_foundation::{ChatService, ResilientExecutor};
use bastion_gateway::{build_app, state::AppState};
use bastion_kernel::config::{DependencySettings, ResilienceSettings};
use bastion_kernel::llm::{CompletionClient, CompletionRequest, CompletionResponse, Usage};
use bastion_kernel::resilience::NoopRecorder;
use bastion_kernel::sql::SqlExecutor;
use bastion_kernel::tool::{ToolDefinition, ToolRegistry};
use bastion_kernel::{DependencyError, DependencyResult};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::util::ServiceExt;

struct DownClient;

#[async_trait]
impl CompletionClient for DownClient {
    fn name(&self) -> &str {
        "down"
    }

    async fn complete(
        &self,
        _request: CompletionRequest,
        _cancellation: CancellationToken,
    ) -> DependencyResult<CompletionResponse> {
        Err(DependencyError::Transport("connection refused".into()))
    }
}

struct UpClient;

#[async_trait]
impl CompletionClient for UpClient {
    fn name(&self) -> &str {
        "up"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
        _cancellation: CancellationToken,
    ) -> DependencyResult<CompletionResponse> {
        Ok(CompletionResponse {
            model: request.model,
            content: "42".into(),
            usage: Usage::default(),
        })
    }
}

struct StaticSql;

#[async_trait]
impl SqlExecutor for StaticSql {
    async fn execute(
        &self,
        _procedure: &str,
        _args: &Value,
        _cancellation: CancellationToken,
    ) -> DependencyResult<Value> {
        Ok(json!([{ "customer": "Alice" }]))
    }
}

fn executor() -> Arc<ResilientExecutor> {
    let mut settings = ResilienceSettings::default();
    settings.dependencies.insert(
        "llm".into(),
        DependencySettings {
            failure_threshold: 1,
            max_retries: 0,
            ..Default::default()
        },
    );
    Arc::new(ResilientExecutor::new(settings, Arc::new(NoopRecorder)))
}

fn app_with_chat(client: Arc<dyn CompletionClient>) -> Router {
    let mut tools = ToolRegistry::new();
    tools
        .register(ToolDefinition::new("top_customers", "sales", "sp_top_customers"))
        .unwrap();
    let chat = ChatService::new(executor(), client, Arc::new(StaticSql), Arc::new(tools));
    build_app(AppState::new(executor()).with_chat(Arc::new(chat)))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn health_reports_circuit_states() {
    let app = build_app(AppState::new(executor()));

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["circuits"], json!({}));

    let (status, _) = send(&app, "POST", "/admin/circuits/llm/isolate", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["circuits"]["llm"], "isolated");

    let (status, body) = send(&app, "GET", "/health/circuits", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["circuits"][0]["name"], "llm");
    assert_eq!(body["circuits"][0]["state"], "isolated");
}

#[tokio::test]
async fn reset_unknown_circuit_is_404() {
    let app = build_app(AppState::new(executor()));

    let (status, body) = send(&app, "POST", "/admin/circuits/nope/reset", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "CIRCUIT_NOT_FOUND");

    send(&app, "POST", "/admin/circuits/sql/isolate", None).await;
    let (status, body) = send(&app, "POST", "/admin/circuits/sql/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "closed");
}

#[tokio::test]
async fn chat_without_backend_is_503() {
    let app = build_app(AppState::new(executor()));
    let (status, body) = send(
        &app,
        "POST",
        "/v1/chat",
        Some(json!({ "tenant": "acme", "module": "sales", "question": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "CHAT_NOT_CONFIGURED");
}

#[tokio::test]
async fn open_llm_circuit_maps_to_503() {
    let app = app_with_chat(Arc::new(DownClient));
    let question = json!({ "tenant": "acme", "module": "sales", "question": "revenue?" });

    let (status, body) = send(&app, "POST", "/v1/chat", Some(question.clone())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "DEPENDENCY_UNAVAILABLE");

    let (status, body) = send(&app, "POST", "/v1/chat", Some(question)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "CIRCUIT_OPEN");

    let (_, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(health["circuits"]["llm"], "open");
}

#[tokio::test]
async fn chat_and_tools_round_trip() {
    let app = app_with_chat(Arc::new(UpClient));

    let (status, body) = send(
        &app,
        "POST",
        "/v1/chat",
        Some(json!({ "tenant": "acme", "module": "sales", "question": "answer?", "sensitive": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"]["content"], "42");
    assert_eq!(body["answer"]["cached"], false);

    let (status, body) = send(
        &app,
        "POST",
        "/v1/tools/top_customers",
        Some(json!({ "tenant": "acme", "module": "sales", "args": { "limit": 1 } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"][0]["customer"], "Alice");

    let (status, _) = send(
        &app,
        "POST",
        "/v1/tools/top_customers",
        Some(json!({ "tenant": "acme", "module": "hr" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_tenant_is_rejected() {
    let app = app_with_chat(Arc::new(UpClient));
    let (status, body) = send(
        &app,
        "POST",
        "/v1/chat",
        Some(json!({ "tenant": " ", "module": "sales", "question": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn isolate_route_uses_dependency_settings() {
    let state = AppState::new(executor());
    let app = build_app(state.clone());

    let (status, body) = send(&app, "POST", "/admin/circuits/llm/isolate", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "isolated");
    let (status, _) = send(&app, "POST", "/admin/circuits/llm/reset", None).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(state.executor.breaker("llm").config().failure_threshold, 1);
}
