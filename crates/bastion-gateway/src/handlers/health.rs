//! Health endpoints
//!
//! GET /health          - liveness plus circuit states
//! GET /health/circuits - per-circuit state, counters and metrics

use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;
use serde_json::json;

use crate::state::AppState;

/// GET /health
///
/// Always 200 while the process is alive; `status` is `degraded` when any
/// circuit is not closed.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let circuits = state.registry().get_all_states();
    let degraded = circuits.values().any(|s| s != "closed");
    let uptime = Utc::now().signed_duration_since(state.started_at);

    Json(json!({
        "status": if degraded { "degraded" } else { "ok" },
        "service": "bastion-gateway",
        "uptime_secs": uptime.num_seconds(),
        "circuits": circuits,
    }))
}

/// GET /health/circuits
pub async fn circuits(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "circuits": state.registry().snapshots() }))
}

/// Build the health router sub-tree
pub fn health_router() -> axum::Router<AppState> {
    use axum::routing::get;
    axum::Router::new()
        .route("/health", get(health))
        .route("/health/circuits", get(circuits))
}
