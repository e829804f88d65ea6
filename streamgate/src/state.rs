//! Shared application state: the published catalog snapshot and the
//! bounded manifest cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::RwLock;

use daddylive::client::{ClientOptions, UpstreamClient};
use daddylive::{Catalog, Channel, DaddyLive, TokenCodec};

use crate::config::Config;

/// Manifest cache bounds. The cache exists to absorb repeated requests
/// for the same channel, not to be a store; it is wiped on every
/// catalog refresh because channel-to-upstream mappings may shift.
const MANIFEST_CACHE_CAPACITY: usize = 100;
const MANIFEST_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct AppState {
    pub start_time: Instant,
    pub config: Arc<Config>,
    pub daddylive: Arc<DaddyLive>,
    pub catalog: CatalogStore,
    pub manifests: Arc<ManifestCache>,
}

impl AppState {
    /// Build production state: real upstream client, fresh codec key.
    pub fn new(config: Config) -> daddylive::Result<Self> {
        let client = UpstreamClient::new(&ClientOptions {
            socks5: config.socks5.clone(),
            ..ClientOptions::default()
        })?;
        let daddylive = DaddyLive::new(
            client,
            TokenCodec::new(),
            config.upstream_base_url.clone(),
            config.public_base_url.clone(),
            config.proxy_content,
        );
        Ok(Self::with_service(config, Arc::new(daddylive)))
    }

    /// Build state around an existing service handle. Tests inject a
    /// deterministic codec and a fixture upstream this way.
    pub fn with_service(config: Config, daddylive: Arc<DaddyLive>) -> Self {
        Self {
            start_time: Instant::now(),
            config: Arc::new(config),
            daddylive,
            catalog: CatalogStore::default(),
            manifests: Arc::new(ManifestCache::default()),
        }
    }
}

/// Holder for the current catalog snapshot.
///
/// Single writer (the refresh scheduler), many readers. Publication
/// replaces the inner `Arc` wholesale, so a reader holds either the
/// previous complete snapshot or the new one, never a partial state.
#[derive(Clone, Default)]
pub struct CatalogStore {
    inner: Arc<RwLock<Option<Arc<Catalog>>>>,
}

impl CatalogStore {
    pub fn current(&self) -> Option<Arc<Catalog>> {
        self.inner.read().clone()
    }

    pub fn publish(&self, catalog: Catalog) {
        *self.inner.write() = Some(Arc::new(catalog));
    }

    pub fn channel(&self, id: &str) -> Option<Channel> {
        self.current().and_then(|catalog| catalog.get(id).cloned())
    }

    pub fn channel_count(&self) -> usize {
        self.current().map(|catalog| catalog.len()).unwrap_or(0)
    }
}

struct ManifestEntry {
    manifest: String,
    inserted_at: Instant,
}

/// Capacity-bounded, TTL-evicting cache of rewritten manifests keyed
/// by channel id.
pub struct ManifestCache {
    entries: DashMap<String, ManifestEntry>,
    capacity: usize,
    ttl: Duration,
}

impl Default for ManifestCache {
    fn default() -> Self {
        Self::new(MANIFEST_CACHE_CAPACITY, MANIFEST_CACHE_TTL)
    }
}

impl ManifestCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
            ttl,
        }
    }

    pub fn get(&self, channel_id: &str) -> Option<String> {
        let expired = match self.entries.get(channel_id) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                return Some(entry.manifest.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(channel_id);
        }
        None
    }

    pub fn insert(&self, channel_id: String, manifest: String) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&channel_id) {
            self.evict_oldest();
        }
        self.entries.insert(
            channel_id,
            ManifestEntry {
                manifest,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().inserted_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}
