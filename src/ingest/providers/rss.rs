// src/ingest/providers/rss.rs
//! RSS 2.0 / RSS 1.0 (RDF) / Atom parsing and the default feed source.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::ingest::types::{FeedSnapshot, FeedSource, RawEntry};

/* ----- RSS 2.0 and RDF ----- */

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
    // RSS 1.0 puts items next to the channel, not inside it.
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "dc:date")]
    dc_date: Option<String>,
    description: Option<String>,
}

/* ----- Atom ----- */

#[derive(Debug, Deserialize)]
struct AtomFeed {
    title: Option<AtomText>,
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
    published: Option<String>,
    updated: Option<String>,
}

impl AtomEntry {
    /// `rel="alternate"` (or no rel) is the article link.
    fn article_link(&self) -> Option<String> {
        self.link
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.link.first())
            .and_then(|l| l.href.clone())
    }
}

/// RFC 2822 (RSS) or RFC 3339 (Atom, dc:date), normalized to UTC.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if ts.is_empty() {
        return None;
    }
    OffsetDateTime::parse(ts, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc3339))
        .ok()
        .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.unix_timestamp(), dt.nanosecond()))
        .or_else(|| {
            // chrono is more lenient with legacy zone names and missing weekdays
            DateTime::parse_from_rfc2822(ts)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

/// Decode HTML entities in a text field; XML entities are already decoded.
fn decode(s: Option<String>) -> Option<String> {
    s.map(|v| html_escape::decode_html_entities(&v).into_owned())
}

/// quick-xml rejects HTML named entities outside CDATA.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", "&#160;")
        .replace("&ndash;", "&#8211;")
        .replace("&mdash;", "&#8212;")
        .replace("&ldquo;", "&#8220;")
        .replace("&rdquo;", "&#8221;")
        .replace("&bdquo;", "&#8222;")
        .replace("&lsquo;", "&#8216;")
        .replace("&rsquo;", "&#8217;")
        .replace("&auml;", "&#228;")
        .replace("&ouml;", "&#246;")
        .replace("&uuml;", "&#252;")
        .replace("&Auml;", "&#196;")
        .replace("&Ouml;", "&#214;")
        .replace("&Uuml;", "&#220;")
        .replace("&szlig;", "&#223;")
}

fn from_rss(rss: Rss, location: &str) -> FeedSnapshot {
    let items = rss.channel.item.into_iter().chain(rss.item);
    let entries = items
        .map(|it| RawEntry {
            title: decode(it.title).unwrap_or_default(),
            link: it.link.map(|l| l.trim().to_string()).unwrap_or_default(),
            summary: None,
            description: decode(it.description),
            published: it
                .pub_date
                .as_deref()
                .and_then(parse_timestamp)
                .or_else(|| it.dc_date.as_deref().and_then(parse_timestamp)),
            updated: None,
            feed: location.to_string(),
        })
        .collect();

    FeedSnapshot {
        location: location.to_string(),
        title: decode(rss.channel.title),
        entries,
    }
}

fn from_atom(feed: AtomFeed, location: &str) -> FeedSnapshot {
    let entries = feed
        .entry
        .into_iter()
        .map(|e| {
            let link = e.article_link().unwrap_or_default();
            RawEntry {
                title: decode(e.title.map(|t| t.value)).unwrap_or_default(),
                link: link.trim().to_string(),
                summary: decode(e.summary.map(|t| t.value)),
                description: decode(e.content.map(|t| t.value)),
                published: e.published.as_deref().and_then(parse_timestamp),
                updated: e.updated.as_deref().and_then(parse_timestamp),
                feed: location.to_string(),
            }
        })
        .collect();

    FeedSnapshot {
        location: location.to_string(),
        title: decode(feed.title.map(|t| t.value)),
        entries,
    }
}

/// Parse an RSS or Atom document. RSS is tried first because an Atom
/// document never has a `<channel>`.
pub fn parse_feed(xml: &str, location: &str) -> Result<FeedSnapshot> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);

    let snapshot = match from_str::<Rss>(&xml_clean) {
        Ok(rss) => from_rss(rss, location),
        Err(rss_err) => {
            let atom: AtomFeed = from_str(&xml_clean)
                .with_context(|| format!("not RSS ({rss_err}) and not Atom"))
                .with_context(|| format!("parsing feed {location}"))?;
            from_atom(atom, location)
        }
    };

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("digest_parse_ms").record(ms);
    counter!("digest_entries_total").increment(snapshot.entries.len() as u64);
    Ok(snapshot)
}

pub struct RssFeedSource {
    mode: Mode,
}

enum Mode {
    /// Location → XML body, for tests and offline runs.
    Fixture(HashMap<String, String>),
    /// `http(s)://` over the network, anything else from the file system.
    Live { client: reqwest::Client },
}

impl RssFeedSource {
    pub fn live(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("health-news-digest/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building feed http client")?;
        Ok(Self {
            mode: Mode::Live { client },
        })
    }

    pub fn from_fixtures<I, K, V>(fixtures: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            mode: Mode::Fixture(
                fixtures
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    async fn read_body(&self, location: &str) -> Result<String> {
        match &self.mode {
            Mode::Fixture(map) => map
                .get(location)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no fixture for {location}")),
            Mode::Live { client } => {
                if location.starts_with("http://") || location.starts_with("https://") {
                    let t0 = std::time::Instant::now();
                    let resp = client
                        .get(location)
                        .send()
                        .await
                        .with_context(|| format!("GET {location}"))?
                        .error_for_status()
                        .with_context(|| format!("GET {location}"))?;
                    let body = resp.text().await.context("feed http .text()")?;
                    histogram!("digest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
                    Ok(body)
                } else {
                    let path = location.strip_prefix("file://").unwrap_or(location);
                    tokio::fs::read_to_string(path)
                        .await
                        .with_context(|| format!("reading feed file {path}"))
                }
            }
        }
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    async fn fetch(&self, location: &str) -> Result<FeedSnapshot> {
        let body = self.read_body(location).await?;
        parse_feed(&body, location)
    }

    fn name(&self) -> &'static str {
        match self.mode {
            Mode::Fixture(_) => "rss-fixture",
            Mode::Live { .. } => "rss",
        }
    }
}
