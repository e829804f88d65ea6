//! Shared upstream HTTP client.
//!
//! One pooled `reqwest` client serves every outbound request in the
//! process. The upstream rejects requests without a browser-style
//! `User-Agent` and a plausible `Referer`, so both are applied here
//! rather than at each call site.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Method, Proxy, RequestBuilder};

use crate::error::Result;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:137.0) Gecko/20100101 Firefox/137.0";

/// Timeout for catalog and resolution-chain requests.
pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout for key fetches, which go to slower CDN hosts.
pub const KEY_TIMEOUT: Duration = Duration::from_secs(60);
/// Timeout for logo fetches.
pub const LOGO_TIMEOUT: Duration = Duration::from_secs(30);
/// Idle-read bound applied to every request on the shared client.
pub const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-operation request deadlines. Production uses the defaults;
/// tests shorten them to exercise timeout handling without waiting.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub resolve: Duration,
    pub key: Duration,
    pub logo: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            resolve: RESOLVE_TIMEOUT,
            key: KEY_TIMEOUT,
            logo: LOGO_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Optional SOCKS5 egress proxy, `host:port` or a full
    /// `socks5://` / `socks5h://` URL.
    pub socks5: Option<String>,
    /// Maximum gap between reads on any response body. Bounds a
    /// stalled upstream without capping total stream duration.
    pub read_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            socks5: None,
            read_timeout: READ_TIMEOUT,
        }
    }
}

/// Pooled HTTP client used by every outbound request.
///
/// No total-duration timeout is set on the client itself: the content
/// proxy carries long-lived segment streams that a blanket deadline
/// would kill mid-transfer. A read timeout bounds the gap between
/// reads instead, and callers apply per-request deadlines on top.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(options: &ClientOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .read_timeout(options.read_timeout)
            .tcp_nodelay(true)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30));

        if let Some(addr) = &options.socks5 {
            let url = if addr.starts_with("socks5://") || addr.starts_with("socks5h://") {
                addr.clone()
            } else {
                format!("socks5://{addr}")
            };
            builder = builder.proxy(Proxy::all(&url)?);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url)
    }
}

/// Headers the upstream expects on scraping and resolution requests.
pub fn browser_headers(referer: &str, origin: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    if let Ok(value) = HeaderValue::from_str(referer) {
        headers.insert(REFERER, value);
    }
    if let Some(origin) = origin
        && let Ok(value) = HeaderValue::from_str(origin)
    {
        headers.insert(ORIGIN, value);
    }
    headers
}
