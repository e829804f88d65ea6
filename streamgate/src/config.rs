//! Environment-based service configuration, read once at startup.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream site base URL.
    pub upstream_base_url: String,
    /// Public base URL used when building rewritten manifest and
    /// playlist links; this is what clients dial back.
    pub public_base_url: String,
    /// Whether media segment lines are proxied through `/content/`.
    pub proxy_content: bool,
    /// Optional SOCKS5 egress proxy.
    pub socks5: Option<String>,
    /// Server bind address.
    pub bind_address: String,
    /// Server port.
    pub port: u16,
    /// Fallback catalog snapshot file.
    pub snapshot_path: PathBuf,
    /// Logo disk cache directory.
    pub logo_cache_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream_base_url: "https://daddylive.mp".to_string(),
            public_base_url: "http://127.0.0.1:8000".to_string(),
            proxy_content: true,
            socks5: None,
            bind_address: "0.0.0.0".to_string(),
            port: 8000,
            snapshot_path: PathBuf::from("channels.json"),
            logo_cache_dir: PathBuf::from("logo-cache"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(value) = env_string("UPSTREAM_BASE_URL") {
            config.upstream_base_url = value;
        }
        if let Some(value) = env_string("PUBLIC_BASE_URL") {
            config.public_base_url = value;
        }
        if let Some(value) = env_string("PROXY_CONTENT") {
            config.proxy_content = parse_bool(&value);
        }
        config.socks5 = env_string("SOCKS5");
        if let Some(value) = env_string("BIND_ADDRESS") {
            config.bind_address = value;
        }
        if let Some(value) = env_string("PORT")
            && let Ok(port) = value.parse::<u16>()
        {
            config.port = port;
        }
        if let Some(value) = env_string("SNAPSHOT_PATH") {
            config.snapshot_path = PathBuf::from(value);
        }
        if let Some(value) = env_string("LOGO_CACHE_DIR") {
            config.logo_cache_dir = PathBuf::from(value);
        }

        config
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
