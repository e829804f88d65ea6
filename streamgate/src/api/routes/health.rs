//! Liveness and diagnostics routes.

use axum::Json;
use axum::extract::State;
use serde_json::json;

use crate::state::AppState;

/// `GET /ping` — quick diagnostics for monitoring.
pub async fn ping(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "channels_count": state.catalog.channel_count(),
        "manifest_cache_size": state.manifests.len(),
    }))
}

/// `GET /health` — fuller report including uptime and catalog state.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let catalog_loaded = state.catalog.current().is_some();
    Json(json!({
        "status": if catalog_loaded { "healthy" } else { "starting" },
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "channels_count": state.catalog.channel_count(),
        "manifest_cache_size": state.manifests.len(),
    }))
}
