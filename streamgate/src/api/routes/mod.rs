//! Route registration.

use axum::Router;
use axum::routing::get;

use crate::state::AppState;

pub mod health;
pub mod playlist;
pub mod proxy;
pub mod stream;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/playlist.m3u8", get(playlist::playlist))
        .route("/stream/{file}", get(stream::stream))
        .route("/key/{token}", get(proxy::key))
        .route("/content/{token}", get(proxy::content))
        .route("/logo/{token}", get(proxy::logo))
        .route("/schedule", get(proxy::schedule))
        .route("/ping", get(health::ping))
        .route("/health", get(health::health))
        .with_state(state)
}
