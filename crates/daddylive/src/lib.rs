//! Upstream access layer for the DaddyLive channel index.
//!
//! This crate owns everything that talks to the upstream site: scraping
//! the channel index into a typed [`Catalog`], the multi-hop stream
//! resolution chain that turns a channel id into a rewritten HLS
//! manifest, and the key/content/logo proxy fetches. The HTTP server
//! lives in the `streamgate` crate and calls in through [`DaddyLive`].

pub mod catalog;
pub mod client;
pub mod error;
pub mod proxy;
pub mod resolver;
pub mod snapshot;
pub mod token;

pub use catalog::{Catalog, Channel};
pub use client::{ClientOptions, Timeouts, UpstreamClient};
pub use error::{Error, Result};
pub use token::TokenCodec;

/// Handle to the upstream site. Cheap to share behind an `Arc`.
///
/// All state is immutable after construction: the HTTP client pools
/// connections internally and the token codec key is fixed for the
/// process lifetime. Tests construct this with a deterministic codec
/// key and a local fixture server as `base_url`.
pub struct DaddyLive {
    client: UpstreamClient,
    codec: TokenCodec,
    base_url: String,
    service_base: String,
    proxy_content: bool,
    timeouts: Timeouts,
}

impl DaddyLive {
    pub fn new(
        client: UpstreamClient,
        codec: TokenCodec,
        base_url: impl Into<String>,
        service_base: impl Into<String>,
        proxy_content: bool,
    ) -> Self {
        Self {
            client,
            codec,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_base: service_base.into().trim_end_matches('/').to_string(),
            proxy_content,
            timeouts: Timeouts::default(),
        }
    }

    /// Override the per-operation deadlines. Tests shorten these to
    /// drive timeout paths against stalling fixture upstreams.
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn client(&self) -> &UpstreamClient {
        &self.client
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn service_base(&self) -> &str {
        &self.service_base
    }

    pub fn proxy_content(&self) -> bool {
        self.proxy_content
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }
}
