//! Circuit administration
//!
//! POST /admin/circuits/{name}/isolate - force a circuit open
//! POST /admin/circuits/{name}/reset   - close a circuit and zero its counters

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;

use crate::error::{GatewayError, GatewayResult};
use crate::state::AppState;

/// POST /admin/circuits/{name}/isolate
///
/// Creates the circuit from the dependency's settings if it does not exist
/// yet, so a dependency can be fenced off before its first call.
pub async fn isolate(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let breaker = state.executor.isolate(&name);
    info!(circuit = %name, "circuit isolated by operator");
    Json(json!({ "circuit": name, "state": breaker.state().as_str() }))
}

/// POST /admin/circuits/{name}/reset
pub async fn reset(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> GatewayResult<impl IntoResponse> {
    if !state.registry().reset(&name) {
        return Err(GatewayError::CircuitNotFound(name));
    }
    info!(circuit = %name, "circuit reset by operator");
    Ok(Json(json!({ "circuit": name, "state": "closed" })))
}

/// Build the admin router sub-tree
pub fn admin_router() -> axum::Router<AppState> {
    use axum::routing::post;
    axum::Router::new()
        .route("/admin/circuits/{name}/isolate", post(isolate))
        .route("/admin/circuits/{name}/reset", post(reset))
}
