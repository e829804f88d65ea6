//! API server setup and graceful shutdown.

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::routes;
use crate::state::AppState;

pub struct ApiServer {
    state: AppState,
    cancel_token: CancellationToken,
}

impl ApiServer {
    pub fn new(state: AppState, cancel_token: CancellationToken) -> Self {
        Self {
            state,
            cancel_token,
        }
    }

    fn build_router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        routes::create_router(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Bind and serve until the cancellation token fires.
    pub async fn run(&self) -> anyhow::Result<()> {
        let addr: SocketAddr = format!(
            "{}:{}",
            self.state.config.bind_address, self.state.config.port
        )
        .parse()?;

        let router = self.build_router();
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("listening on http://{addr}");

        let cancel_token = self.cancel_token.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                tracing::info!("api server shutting down");
            })
            .await?;

        Ok(())
    }
}
