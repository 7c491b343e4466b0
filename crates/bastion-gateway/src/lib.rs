//! `bastion-gateway` - HTTP surface of the Bastion core.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /health` | liveness and circuit states |
//! | `GET /health/circuits` | per-circuit counters and metrics |
//! | `POST /admin/circuits/{name}/isolate` | force a circuit open |
//! | `POST /admin/circuits/{name}/reset` | close a circuit |
//! | `POST /v1/chat` | answer a question through the chat pipeline |
//! | `POST /v1/tools/{name}` | run a module tool |
//!
//! # Quick start
//!
//! ```rust,no_run
//! use bastion_foundation::ResilientExecutor;
//! use bastion_gateway::{build_app, state::AppState};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let app = build_app(AppState::new(Arc::new(ResilientExecutor::default())));
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await
//! }
//! ```

pub mod error;
pub mod handlers;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble every route over `state`.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(handlers::health_router())
        .merge(handlers::admin_router())
        .merge(handlers::chat_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
