//! Background catalog refresh.
//!
//! The scheduler is the sole writer of the catalog. A refresh either
//! publishes a complete new snapshot or changes nothing: failures
//! never downgrade a catalog that is already live. Only a cold start
//! with no published catalog falls back to the disk snapshot.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use daddylive::{Catalog, snapshot};

use crate::state::AppState;

const REFRESH_INTERVAL: Duration = Duration::from_secs(300);
const FIRST_FAILURE_BACKOFF: Duration = Duration::from_secs(10);
const REPEAT_FAILURE_BACKOFF: Duration = Duration::from_secs(60);

pub struct CatalogRefresher {
    state: AppState,
    cancel_token: CancellationToken,
    interval: Duration,
    first_backoff: Duration,
    repeat_backoff: Duration,
}

impl CatalogRefresher {
    pub fn new(state: AppState, cancel_token: CancellationToken) -> Self {
        Self {
            state,
            cancel_token,
            interval: REFRESH_INTERVAL,
            first_backoff: FIRST_FAILURE_BACKOFF,
            repeat_backoff: REPEAT_FAILURE_BACKOFF,
        }
    }

    /// Spawn the refresh loop. The handle joins once the cancellation
    /// token fires, so shutdown can await it deterministically.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let mut consecutive_failures = 0u32;
        loop {
            let delay = match self.refresh_once().await {
                Ok(count) => {
                    consecutive_failures = 0;
                    info!(channels = count, "catalog refreshed");
                    self.interval
                }
                Err(error) => {
                    consecutive_failures += 1;
                    warn!(%error, attempt = consecutive_failures, "catalog refresh failed");
                    self.seed_from_snapshot_if_cold().await;
                    if consecutive_failures == 1 {
                        self.first_backoff
                    } else {
                        self.repeat_backoff
                    }
                }
            };

            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("catalog refresher stopped");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// One refresh attempt: load, persist the snapshot, publish, and
    /// invalidate manifests whose channel mappings may have shifted.
    pub(crate) async fn refresh_once(&self) -> daddylive::Result<usize> {
        let catalog = self.state.daddylive.load_channels().await?;
        let count = catalog.len();

        if let Err(error) =
            snapshot::save(&self.state.config.snapshot_path, catalog.channels()).await
        {
            // Snapshot persistence is best-effort; the live catalog
            // still gets published.
            warn!(%error, "failed to persist catalog snapshot");
        }

        self.state.catalog.publish(catalog);
        self.state.manifests.clear();
        Ok(count)
    }

    /// Publish the disk snapshot, but only when nothing is live yet.
    pub(crate) async fn seed_from_snapshot_if_cold(&self) {
        if self.state.catalog.current().is_some() {
            return;
        }
        match snapshot::load(&self.state.config.snapshot_path).await {
            Ok(channels) if !channels.is_empty() => {
                let catalog = Catalog::from_channels(channels);
                info!(channels = catalog.len(), "seeded catalog from disk snapshot");
                self.state.catalog.publish(catalog);
            }
            Ok(_) => warn!("disk snapshot exists but is empty; staying cold"),
            Err(error) => warn!(%error, "no usable disk snapshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use daddylive::client::{ClientOptions, UpstreamClient};
    use daddylive::token::KEY_LEN;
    use daddylive::{Channel, DaddyLive, TokenCodec};

    use crate::config::Config;

    fn channel(id: &str, name: &str) -> Channel {
        Channel {
            id: id.to_string(),
            name: name.to_string(),
            tags: vec![],
            logo: "/missing.png".to_string(),
        }
    }

    fn state_with_dead_upstream(snapshot_path: std::path::PathBuf) -> AppState {
        let config = Config {
            snapshot_path,
            ..Config::default()
        };
        let service = DaddyLive::new(
            UpstreamClient::new(&ClientOptions::default()).unwrap(),
            TokenCodec::with_key([9u8; KEY_LEN]),
            // Nothing listens here; every load fails fast.
            "http://127.0.0.1:9",
            "http://service.example",
            true,
        );
        AppState::with_service(config, Arc::new(service))
    }

    #[tokio::test]
    async fn cold_start_seeds_from_disk_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channels.json");
        snapshot::save(&path, &[channel("44", "ESPN"), channel("325", "BBC One")])
            .await
            .unwrap();

        let state = state_with_dead_upstream(path);
        let refresher = CatalogRefresher::new(state.clone(), CancellationToken::new());

        assert!(refresher.refresh_once().await.is_err());
        refresher.seed_from_snapshot_if_cold().await;

        assert_eq!(state.catalog.channel_count(), 2);
        assert_eq!(state.catalog.channel("44").unwrap().name, "ESPN");
    }

    #[tokio::test]
    async fn failed_refresh_never_downgrades_a_live_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channels.json");
        // Stale snapshot with a single channel.
        snapshot::save(&path, &[channel("1", "Stale")]).await.unwrap();

        let state = state_with_dead_upstream(path);
        state
            .catalog
            .publish(daddylive::Catalog::from_channels(vec![
                channel("44", "ESPN"),
                channel("325", "BBC One"),
                channel("7", "CNN"),
            ]));

        let refresher = CatalogRefresher::new(state.clone(), CancellationToken::new());
        assert!(refresher.refresh_once().await.is_err());
        refresher.seed_from_snapshot_if_cold().await;

        // Live catalog is untouched: no snapshot downgrade.
        assert_eq!(state.catalog.channel_count(), 3);
        assert!(state.catalog.channel("44").is_some());
    }

    #[tokio::test]
    async fn successful_refresh_publishes_persists_and_invalidates_manifests() {
        const INDEX_PAGE: &str = r#"
<center><h1>24/7 Channels</h1>
<a href="/stream/stream-44.php" target="_blank"><strong>ESPN</strong></a>
<a href="/stream/stream-325.php" target="_blank"><strong>BBC One</strong></a>
tab-2"#;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let router = axum::Router::new().route(
            "/24-7-channels.php",
            axum::routing::get(|| async { INDEX_PAGE }),
        );
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let snapshot_path = dir.path().join("channels.json");
        let config = Config {
            snapshot_path: snapshot_path.clone(),
            ..Config::default()
        };
        let service = DaddyLive::new(
            UpstreamClient::new(&ClientOptions::default()).unwrap(),
            TokenCodec::with_key([9u8; KEY_LEN]),
            base,
            "http://service.example",
            true,
        );
        let state = AppState::with_service(config, Arc::new(service));
        state
            .manifests
            .insert("44".to_string(), "#EXTM3U\nstale".to_string());

        let refresher = CatalogRefresher::new(state.clone(), CancellationToken::new());
        let count = refresher.refresh_once().await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(state.catalog.channel_count(), 2);
        assert!(state.manifests.is_empty(), "stale manifests must be dropped");

        let persisted = snapshot::load(&snapshot_path).await.unwrap();
        assert_eq!(persisted.len(), 2);
    }

    #[tokio::test]
    async fn cold_start_without_snapshot_stays_cold() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_dead_upstream(dir.path().join("missing.json"));
        let refresher = CatalogRefresher::new(state.clone(), CancellationToken::new());

        refresher.seed_from_snapshot_if_cold().await;
        assert!(state.catalog.current().is_none());
    }

    #[tokio::test]
    async fn cancellation_stops_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_dead_upstream(dir.path().join("missing.json"));
        let token = CancellationToken::new();
        let handle = CatalogRefresher::new(state, token.clone()).spawn();

        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("refresher should stop promptly on cancellation")
            .unwrap();
    }
}
