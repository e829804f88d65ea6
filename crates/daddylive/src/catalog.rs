//! Channel index scraping and the catalog snapshot type.
//!
//! The upstream publishes its channel list as a single HTML page. The
//! extraction is regex-over-markup and inherently brittle, so it is
//! kept behind [`parse_channel_index`]: markup drift surfaces as
//! [`Error::Parse`], never a panic, and the strategy can be swapped
//! without touching callers.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::REFERER;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::DaddyLive;
use crate::error::{Error, Result};

// The channel table sits between these two markers; entries inside it
// are uniform href/name rows.
static CHANNELS_BLOCK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<center><h1(.+?)tab-2").unwrap());
static CHANNEL_ENTRY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="(.*)" target(.*)<strong>(.*)</strong>"#).unwrap());
static PAREN_SUFFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\(.*?\)").unwrap());

/// Ids whose display name on the index page is wrong or unstable.
const ID_NAME_OVERRIDES: &[(&str, &str)] = &[("666", "Nick Music"), ("609", "Yas TV UAE")];

/// Raw scraped names replaced with canonical display names.
const RAW_NAME_OVERRIDES: &[(&str, &str)] = &[
    ("#0 Spain", "Movistar Plus+"),
    ("#Vamos Spain", "Vamos Spain"),
];

/// Local metadata table keyed by cleaned channel name.
static META: LazyLock<HashMap<String, ChannelMeta>> = LazyLock::new(|| {
    serde_json::from_str(include_str!("../data/meta.json")).expect("bundled meta.json is valid")
});

#[derive(Debug, Clone, Default, Deserialize)]
struct ChannelMeta {
    #[serde(default)]
    logo: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// The upstream's own identifier, treated as an opaque stable key.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Local placeholder path or a `/logo/{token}` proxy reference,
    /// never a raw remote URL.
    pub logo: String,
}

/// Immutable, sorted channel list. Replaced wholesale on refresh.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    channels: Vec<Channel>,
}

impl Catalog {
    /// Build a catalog: drop duplicate ids, then sort with digit-led
    /// (adult-marked) names strictly after everything else and
    /// lexicographically by name within each partition.
    pub fn from_channels(mut channels: Vec<Channel>) -> Self {
        let mut seen = HashSet::new();
        channels.retain(|channel| seen.insert(channel.id.clone()));
        channels.sort_by(|a, b| {
            sorts_last(&a.name)
                .cmp(&sorts_last(&b.name))
                .then_with(|| a.name.cmp(&b.name))
        });
        Self { channels }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn get(&self, id: &str) -> Option<&Channel> {
        self.channels.iter().find(|channel| channel.id == id)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

fn sorts_last(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// One `(href, displayed name)` row from the channel table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEntry {
    pub href: String,
    pub display_name: String,
}

/// Extract channel rows from the index page.
///
/// Zero rows means the expected markup was not found, which is a
/// [`Error::Parse`] distinct from transport failures.
pub fn parse_channel_index(html: &str) -> Result<Vec<ChannelEntry>> {
    let block = CHANNELS_BLOCK_REGEX
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or(Error::Parse {
            hop: "channel index block",
        })?;

    let entries: Vec<ChannelEntry> = CHANNEL_ENTRY_REGEX
        .captures_iter(block)
        .filter_map(|caps| {
            Some(ChannelEntry {
                href: caps.get(1)?.as_str().to_string(),
                display_name: caps.get(3)?.as_str().to_string(),
            })
        })
        .collect();

    if entries.is_empty() {
        return Err(Error::Parse {
            hop: "channel index entries",
        });
    }

    Ok(entries)
}

impl DaddyLive {
    /// Fetch and parse the upstream channel index into a [`Catalog`].
    pub async fn load_channels(&self) -> Result<Catalog> {
        let url = format!("{}/24-7-channels.php", self.base_url());
        let response = self
            .client()
            .get(&url)
            .header(REFERER, self.base_url())
            .timeout(self.timeouts().resolve)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream_status("channel index", status));
        }
        let body = response.text().await?;

        let entries = parse_channel_index(&body)?;
        let channels: Vec<Channel> = entries
            .iter()
            .filter_map(|entry| self.channel_from_entry(entry))
            .collect();

        if channels.is_empty() {
            return Err(Error::Parse {
                hop: "channel index entries",
            });
        }

        Ok(Catalog::from_channels(channels))
    }

    /// Turn one scraped row into a channel record.
    ///
    /// Malformed hrefs are skipped with a warning rather than failing
    /// the whole load; the rest of the table is still usable.
    pub(crate) fn channel_from_entry(&self, entry: &ChannelEntry) -> Option<Channel> {
        let Some(raw_id) = entry.href.split('-').nth(1) else {
            warn!(href = %entry.href, "skipping channel row with unexpected href shape");
            return None;
        };
        let id = raw_id.trim_end_matches(".php").to_string();

        let mut name = entry.display_name.clone();
        for (override_id, canonical) in ID_NAME_OVERRIDES {
            if id == *override_id {
                name = (*canonical).to_string();
            }
        }
        for (raw, canonical) in RAW_NAME_OVERRIDES {
            if entry.display_name == *raw {
                name = (*canonical).to_string();
            }
        }
        let name = PAREN_SUFFIX_REGEX.replace_all(&name, "").to_string();

        let meta = META.get(&name).cloned().unwrap_or_default();
        let mut logo = meta.logo.unwrap_or_else(|| "/missing.png".to_string());
        if logo.starts_with("http") {
            // Remote logos are resolved through the logo proxy so the
            // client never sees the origin URL.
            logo = format!("{}/logo/{}", self.service_base(), self.codec().encode(&logo));
        }

        Some(Channel {
            id,
            name,
            tags: meta.tags,
            logo,
        })
    }
}
