//! Flat-file catalog snapshot for degraded-mode startup.
//!
//! Written after every successful refresh and read back only when a
//! cold start cannot reach the upstream. This is disaster recovery,
//! not a database: a JSON array of channel records at a fixed path.

use std::path::Path;

use crate::catalog::Channel;
use crate::error::Result;

/// Persist the channel set, replacing any previous snapshot atomically.
pub async fn save(path: &Path, channels: &[Channel]) -> Result<()> {
    let json = serde_json::to_vec_pretty(channels)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Load a previously persisted channel set.
pub async fn load(path: &Path) -> Result<Vec<Channel>> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
