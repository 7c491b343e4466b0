//! Bastion gateway - entry point.
//!
//! Loads resilience settings, builds the executor and serves the health and
//! administration API.
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_PORT` | `3000` | TCP port to listen on. |
//! | `BASTION_CONFIG` | *(none)* | Settings file (TOML, YAML, JSON, INI, RON, JSON5). |
//! | `BASTION__*` | *(none)* | Overrides, e.g. `BASTION__DEFAULTS__MAX_RETRIES=4`. |
//! | `RUST_LOG` | `bastion=info` | Log filter. |

use bastion_foundation::{ResilientExecutor, TracingRecorder};
use bastion_gateway::{build_app, state::AppState};
use bastion_kernel::config::ResilienceSettings;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("bastion=info,bastion_gateway=info,bastion_foundation=info,tower_http=info")
            }),
        )
        .init();

    let port: u16 = std::env::var("GATEWAY_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let config_path = std::env::var("BASTION_CONFIG").ok();

    let settings = match ResilienceSettings::load(config_path.as_deref()) {
        Ok(settings) => settings,
        Err(report) => {
            eprintln!("Gateway configuration error: {report:?}");
            std::process::exit(1);
        }
    };

    let executor = Arc::new(ResilientExecutor::new(settings, Arc::new(TracingRecorder)));
    let app = build_app(AppState::new(executor));

    let addr = format!("0.0.0.0:{port}");
    info!(addr = %addr, config = ?config_path, "Bastion gateway starting");

    let served = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => axum::serve(listener, app).await,
        Err(e) => Err(e),
    };
    if let Err(e) = served {
        eprintln!("Gateway error: {e}");
        std::process::exit(1);
    }
}
