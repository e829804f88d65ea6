//! Multi-hop stream resolution and manifest rewriting.
//!
//! The upstream's linking scheme is per-session: a channel id leads to
//! a player page, which embeds an iframe, which carries a channel key,
//! which a lookup endpoint maps to a CDN host. Each hop expects the
//! previous hop's URL as `Referer`. Hops are not retried individually;
//! the chain is stateful and a failed hop invalidates everything after
//! it, so callers retry the whole resolution if they retry at all.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::REFERER;
use url::Url;

use crate::DaddyLive;
use crate::error::{Error, Result};
use crate::token::TokenCodec;

static IFRAME_SRC_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"iframe src="(.*)" width"#).unwrap());
static CHANNEL_KEY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"var channelKey = "(.*?)";"#).unwrap());
static KEY_URI_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"URI="(.*?)""#).unwrap());

/// Player page URL for a channel. Longer-form ids live under the
/// alternate `bet.php` template.
pub(crate) fn player_page_url(base_url: &str, channel_id: &str) -> String {
    if channel_id.len() > 3 {
        format!("{base_url}/stream/bet.php?id=bet{channel_id}")
    } else {
        format!("{base_url}/stream/stream-{channel_id}.php")
    }
}

pub(crate) fn extract_iframe_url(page: &str) -> Result<&str> {
    IFRAME_SRC_REGEX
        .captures(page)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or(Error::NotFound {
            what: "player iframe",
        })
}

/// The page embeds decoy assignments earlier in the script; the last
/// occurrence is the authoritative one.
pub(crate) fn extract_channel_key(page: &str) -> Result<&str> {
    CHANNEL_KEY_REGEX
        .captures_iter(page)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or(Error::NotFound {
            what: "channel key",
        })
}

/// Server-lookup endpoint on the iframe's host.
pub(crate) fn server_lookup_url(iframe_url: &Url, channel_key: &str) -> Url {
    let mut url = iframe_url.clone();
    url.set_path("/server_lookup.php");
    url.set_query(Some(&format!(
        "channel_id={}",
        urlencoding::encode(channel_key)
    )));
    url
}

/// Map a server key to the manifest URL: one hard-coded CDN special
/// case, otherwise the key is interpolated into a templated hostname.
pub(crate) fn manifest_url(server_key: &str, channel_key: &str) -> String {
    if server_key == "top1/cdn" {
        format!("https://top1.newkso.ru/top1/cdn/{channel_key}/mono.m3u8")
    } else {
        format!("https://{server_key}new.newkso.ru/{server_key}/{channel_key}/mono.m3u8")
    }
}

/// Rewrite a fetched manifest line by line.
///
/// Key-declaration URIs always route through `/key/{token}`; bare URL
/// lines route through `/content/{token}` only when content proxying
/// is enabled. Everything else is copied verbatim — this is purely
/// textual and deliberately does no structural HLS parsing.
pub fn rewrite_manifest(
    input: &str,
    codec: &TokenCodec,
    service_base: &str,
    proxy_content: bool,
) -> String {
    let mut out = String::with_capacity(input.len());
    let mut first = true;
    for line in input.split('\n') {
        if !first {
            out.push('\n');
        }
        first = false;

        if line.starts_with("#EXT-X-KEY:")
            && let Some(caps) = KEY_URI_REGEX.captures(line)
            && let Some(original) = caps.get(1)
        {
            let token = codec.encode(original.as_str());
            out.push_str(&line.replace(original.as_str(), &format!("{service_base}/key/{token}")));
        } else if proxy_content && line.starts_with("http") {
            out.push_str(service_base);
            out.push_str("/content/");
            out.push_str(&codec.encode(line));
        } else {
            out.push_str(line);
        }
    }
    out
}

impl DaddyLive {
    /// Resolve a channel id into a rewritten, client-facing manifest.
    pub async fn resolve_stream(&self, channel_id: &str) -> Result<String> {
        let player_url = player_page_url(self.base_url(), channel_id);
        let player_page = self.post_text(&player_url, self.base_url()).await?;

        let iframe_url = extract_iframe_url(&player_page)?.to_string();
        let iframe_page = self.post_text(&iframe_url, &player_url).await?;

        let channel_key = extract_channel_key(&iframe_page)?;

        let iframe = Url::parse(&iframe_url).map_err(|_| Error::Parse { hop: "iframe url" })?;
        let lookup_url = server_lookup_url(&iframe, channel_key);
        let response = self
            .client()
            .get(lookup_url.as_str())
            .header(REFERER, iframe_url.as_str())
            .timeout(self.timeouts().resolve)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream_status("server lookup", status));
        }
        let body = response.text().await?;
        let lookup: serde_json::Value = serde_json::from_str(&body).map_err(|_| Error::Parse {
            hop: "server lookup response",
        })?;
        let server_key = lookup
            .get("server_key")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::upstream("server lookup", "missing server_key"))?;

        let manifest_url = manifest_url(server_key, channel_key);
        // The CDN checks the Referer with percent-encoding applied the
        // way browsers escape it: path slashes are kept as-is.
        let referer = urlencoding::encode(&iframe_url).replace("%2F", "/");
        let response = self
            .client()
            .get(&manifest_url)
            .header(REFERER, referer)
            .timeout(self.timeouts().resolve)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream_status("manifest fetch", status));
        }
        let manifest = response.text().await?;

        Ok(rewrite_manifest(
            &manifest,
            self.codec(),
            self.service_base(),
            self.proxy_content(),
        ))
    }

    async fn post_text(&self, url: &str, referer: &str) -> Result<String> {
        let response = self
            .client()
            .post(url)
            .header(REFERER, referer)
            .timeout(self.timeouts().resolve)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream_status("resolution hop", status));
        }
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::KEY_LEN;

    fn codec() -> TokenCodec {
        TokenCodec::with_key([42u8; KEY_LEN])
    }

    #[test]
    fn short_and_long_ids_use_different_player_templates() {
        assert_eq!(
            player_page_url("https://up.example", "44"),
            "https://up.example/stream/stream-44.php"
        );
        assert_eq!(
            player_page_url("https://up.example", "1234"),
            "https://up.example/stream/bet.php?id=bet1234"
        );
    }

    #[test]
    fn extracts_single_iframe_src() {
        let page = r#"<body><iframe src="https://embed.example/player" width="100%"></iframe>"#;
        assert_eq!(
            extract_iframe_url(page).unwrap(),
            "https://embed.example/player"
        );
        assert!(matches!(
            extract_iframe_url("<body>no player</body>"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn last_channel_key_assignment_wins() {
        let page = r#"
            var channelKey = "stale-decoy";
            // ...
            var channelKey = "premium44";
        "#;
        assert_eq!(extract_channel_key(page).unwrap(), "premium44");
    }

    #[test]
    fn missing_channel_key_is_not_found() {
        assert!(matches!(
            extract_channel_key("var somethingElse = 1;"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn lookup_url_keeps_scheme_host_and_port() {
        let iframe = Url::parse("http://embed.example:8080/player/page.html").unwrap();
        let url = server_lookup_url(&iframe, "premium44");
        assert_eq!(
            url.as_str(),
            "http://embed.example:8080/server_lookup.php?channel_id=premium44"
        );
    }

    #[test]
    fn manifest_url_special_cases_top1_cdn() {
        assert_eq!(
            manifest_url("top1/cdn", "premium44"),
            "https://top1.newkso.ru/top1/cdn/premium44/mono.m3u8"
        );
        assert_eq!(
            manifest_url("wind", "premium44"),
            "https://windnew.newkso.ru/wind/premium44/mono.m3u8"
        );
    }

    #[test]
    fn rewrites_key_lines_and_tokens_round_trip() {
        let codec = codec();
        let input = "#EXTM3U\n#EXT-X-KEY:METHOD=AES-128,URI=\"https://origin/key1\"\nsegment.ts";
        let out = rewrite_manifest(input, &codec, "http://svc.example", false);

        let line = out.lines().nth(1).unwrap();
        assert!(line.starts_with("#EXT-X-KEY:METHOD=AES-128,URI=\"http://svc.example/key/"));
        let token = line
            .strip_prefix("#EXT-X-KEY:METHOD=AES-128,URI=\"http://svc.example/key/")
            .unwrap()
            .strip_suffix('"')
            .unwrap();
        assert_eq!(codec.decode(token).unwrap(), "https://origin/key1");
    }

    #[test]
    fn bare_urls_are_rewritten_only_when_proxying_is_enabled() {
        let codec = codec();
        let input = "#EXTM3U\nhttps://origin/seg1.ts\n#EXT-X-ENDLIST";

        let proxied = rewrite_manifest(input, &codec, "http://svc.example", true);
        let line = proxied.lines().nth(1).unwrap();
        let token = line.strip_prefix("http://svc.example/content/").unwrap();
        assert_eq!(codec.decode(token).unwrap(), "https://origin/seg1.ts");

        let passthrough = rewrite_manifest(input, &codec, "http://svc.example", false);
        assert_eq!(passthrough, input);
    }

    #[test]
    fn passthrough_lines_and_layout_are_preserved_exactly() {
        let codec = codec();
        let input = "#EXTM3U\n#EXT-X-TARGETDURATION:6\n\n#EXTINF:6.0,\nrelative/seg.ts\n";
        assert_eq!(
            rewrite_manifest(input, &codec, "http://svc.example", true),
            input
        );
    }
}
