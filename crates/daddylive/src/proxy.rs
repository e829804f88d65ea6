//! Key, segment and logo fetches for token-encoded origin URLs.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use reqwest::header::REFERER;
use tracing::{debug, warn};

use crate::DaddyLive;
use crate::client::browser_headers;
use crate::error::{Error, Result};

// The key server validates this Referer/Origin pair.
const KEY_REFERER: &str = "https://kisskissplay.cfd/";
const KEY_ORIGIN: &str = "https://kisskissplay.cfd";

impl DaddyLive {
    /// Fetch decryption key bytes for a token-encoded origin URL.
    pub async fn fetch_key(&self, token: &str) -> Result<Bytes> {
        let url = self.codec().decode(token)?;
        let response = self
            .client()
            .get(&url)
            .headers(browser_headers(KEY_REFERER, Some(KEY_ORIGIN)))
            .timeout(self.timeouts().key)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream_status("key fetch", status));
        }
        Ok(response.bytes().await?)
    }

    /// Open a streamed GET to a token-encoded origin URL.
    ///
    /// The response is handed back unconsumed so the caller can forward
    /// the body chunk by chunk; segment transfers can be arbitrarily
    /// large and must never be buffered whole. No total deadline is
    /// applied — the client's read timeout bounds each read instead, so
    /// a long transfer survives but a mid-stream stall is cut off.
    pub async fn open_content(&self, token: &str) -> Result<reqwest::Response> {
        let url = self.codec().decode(token)?;
        let response = self
            .client()
            .get(&url)
            .header(REFERER, self.base_url())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream_status("content fetch", status));
        }
        Ok(response)
    }

    /// Fetch a channel logo, caching it on disk by its file name.
    pub async fn fetch_logo(&self, token: &str, cache_dir: &Path) -> Result<Bytes> {
        let url = self.codec().decode(token)?;
        let cache_path = logo_cache_path(&url, cache_dir);

        if let Some(path) = &cache_path
            && let Ok(bytes) = tokio::fs::read(path).await
        {
            debug!(path = %path.display(), "serving logo from disk cache");
            return Ok(bytes.into());
        }

        let response = self
            .client()
            .get(&url)
            .timeout(self.timeouts().logo)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::NotFound { what: "logo" });
        }
        let bytes = response.bytes().await?;

        if let Some(path) = &cache_path {
            if let Err(error) = write_logo_cache(path, cache_dir, &bytes).await {
                // Cache write failures are not fatal; serve the bytes anyway.
                warn!(path = %path.display(), %error, "failed to persist logo cache entry");
            }
        }

        Ok(bytes)
    }

    /// Upstream event schedule, passed through as JSON.
    pub async fn schedule(&self) -> Result<serde_json::Value> {
        let url = format!("{}/schedule/schedule-generated.php", self.base_url());
        let response = self
            .client()
            .get(&url)
            .header(REFERER, self.base_url())
            .timeout(self.timeouts().logo)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream_status("schedule fetch", status));
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|_| Error::Parse {
            hop: "schedule response",
        })
    }
}

// Cache key is the URL's final path segment. Names that could escape
// the cache directory are not cached at all.
fn logo_cache_path(url: &str, cache_dir: &Path) -> Option<PathBuf> {
    let file = url.rsplit('/').next()?;
    if file.is_empty() || file.contains("..") || file.contains('\\') {
        return None;
    }
    Some(cache_dir.join(file))
}

async fn write_logo_cache(path: &Path, cache_dir: &Path, bytes: &Bytes) -> std::io::Result<()> {
    tokio::fs::create_dir_all(cache_dir).await?;
    tokio::fs::write(path, bytes).await
}
