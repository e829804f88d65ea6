use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streamgate::api::server::ApiServer;
use streamgate::config::Config;
use streamgate::scheduler::CatalogRefresher;
use streamgate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "streamgate=info,daddylive=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env();
    tracing::info!(
        upstream = %config.upstream_base_url,
        public = %config.public_base_url,
        proxy_content = config.proxy_content,
        "starting streamgate"
    );

    let state = AppState::new(config)?;
    let cancel_token = CancellationToken::new();

    let refresher = CatalogRefresher::new(state.clone(), cancel_token.clone());
    let refresh_handle = refresher.spawn();

    {
        let cancel_token = cancel_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown signal received");
                cancel_token.cancel();
            }
        });
    }

    ApiServer::new(state, cancel_token.clone()).run().await?;

    // The server only returns after cancellation; join the refresher
    // so shutdown is deterministic.
    cancel_token.cancel();
    refresh_handle.await?;

    Ok(())
}
