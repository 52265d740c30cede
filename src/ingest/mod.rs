// src/ingest/mod.rs
//! Pipeline driver: feed list → per-entry filter/normalize/classify →
//! rank → dedupe → digest document.
//!
//! Feeds and entries are processed strictly one after another. Every
//! per-entry problem ends in a skip; nothing aborts the batch.

pub mod config;
pub mod providers;
pub mod types;

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, describe_counter, describe_histogram, gauge};
use once_cell::sync::OnceCell;

use crate::classify::{ClassifyInput, Classifier, Verdict};
use crate::digest::{rank_and_dedupe, Digest, NormalizedItem};
use crate::ingest::types::{FeedSource, RawEntry};
use crate::normalize::text::{clean, summarize, truncate_chars, SUMMARY_MAX_WORDS};
use crate::normalize::title::repair_title;
use crate::normalize::url::{canonicalize, host_of, RedirectResolver};

pub const TITLE_MAX_CHARS: usize = 240;

/// One-time metrics registration (so series show up in the export).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_entries_total", "Raw entries parsed from feeds.");
        describe_counter!(
            "digest_dropped_total",
            "Entries skipped (label reason: undated, stale, not_health_related)."
        );
        describe_counter!("digest_duplicates_total", "Entries removed by deduplication.");
        describe_counter!("digest_items_kept_total", "Items written to the digest.");
        describe_counter!("digest_feed_errors_total", "Feed fetch/parse errors.");
        describe_counter!(
            "digest_redirect_fallback_total",
            "Aggregator links kept unresolved after a failed lookup."
        );
        describe_histogram!("digest_fetch_ms", "Feed HTTP fetch time in milliseconds.");
        describe_histogram!("digest_parse_ms", "Feed parse time in milliseconds.");
    });
}

/// Why an entry did not become a `NormalizedItem`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    Undated,
    Stale,
    NotHealthRelated,
}

impl Skip {
    pub fn as_str(self) -> &'static str {
        match self {
            Skip::Undated => "undated",
            Skip::Stale => "stale",
            Skip::NotHealthRelated => "not_health_related",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub feeds: usize,
    pub feed_errors: usize,
    pub entries: usize,
    pub undated: usize,
    pub stale: usize,
    pub gated: usize,
    pub duplicates: usize,
    pub kept: usize,
}

impl RunStats {
    fn record_skip(&mut self, skip: Skip) {
        match skip {
            Skip::Undated => self.undated += 1,
            Skip::Stale => self.stale += 1,
            Skip::NotHealthRelated => self.gated += 1,
        }
    }
}

pub struct Pipeline<'a> {
    classifier: &'a Classifier,
    resolver: &'a dyn RedirectResolver,
    window_days: u32,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        classifier: &'a Classifier,
        resolver: &'a dyn RedirectResolver,
        window_days: u32,
    ) -> Self {
        Self {
            classifier,
            resolver,
            window_days,
        }
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    /// Earliest `published_at` kept for a run started at `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.window_days))
    }

    /// Turn one raw entry into an item, or say why it was skipped.
    pub async fn normalize_entry(
        &self,
        raw: &RawEntry,
        source_name: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<NormalizedItem, Skip> {
        let published_at = raw.timestamp().ok_or(Skip::Undated)?;
        if published_at < cutoff {
            return Err(Skip::Stale);
        }

        let title = truncate_chars(&clean(&raw.title), TITLE_MAX_CHARS);

        let link = raw.link.trim();
        let origin_host = host_of(link);
        let canonical_url = canonicalize(self.resolver, link).await;
        let host = host_of(&canonical_url);

        let body = [raw.summary.as_deref(), raw.description.as_deref()]
            .into_iter()
            .flatten()
            .map(clean)
            .find(|s| !s.is_empty())
            .unwrap_or_else(|| title.clone());

        let title = truncate_chars(
            &repair_title(&host, &title, &body, source_name),
            TITLE_MAX_CHARS,
        );

        let verdict = self.classifier.classify(&ClassifyInput {
            title: &title,
            summary: &body,
            canonical_url: &canonical_url,
            host: &host,
            origin_host: &origin_host,
        });
        let classification = match verdict {
            Verdict::Keep(c) => c,
            Verdict::Drop(_) => return Err(Skip::NotHealthRelated),
        };

        Ok(NormalizedItem {
            title,
            summary: summarize(&body, SUMMARY_MAX_WORDS),
            source_name: source_name.to_string(),
            canonical_url,
            published_at,
            category: classification.category,
            tags: classification.tags,
        })
    }

    /// Fetch every feed in order, normalize its entries, then rank and
    /// dedupe the whole batch. A failing feed is logged and skipped.
    pub async fn run(
        &self,
        source: &dyn FeedSource,
        feeds: &[String],
        now: DateTime<Utc>,
    ) -> (Digest, RunStats) {
        ensure_metrics_described();

        let cutoff = self.cutoff(now);
        let mut stats = RunStats::default();
        let mut items = Vec::new();

        for location in feeds {
            stats.feeds += 1;
            let snapshot = match source.fetch(location).await {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(target: "ingest", error = ?e, feed = %location, provider = source.name(), "feed error");
                    counter!("digest_feed_errors_total").increment(1);
                    stats.feed_errors += 1;
                    continue;
                }
            };

            let source_name = snapshot.source_name();
            stats.entries += snapshot.entries.len();
            let before = items.len();

            for raw in &snapshot.entries {
                match self.normalize_entry(raw, &source_name, cutoff).await {
                    Ok(item) => items.push(item),
                    Err(skip) => {
                        counter!("digest_dropped_total", "reason" => skip.as_str()).increment(1);
                        stats.record_skip(skip);
                    }
                }
            }

            tracing::debug!(
                target: "ingest",
                feed = %location,
                source = %source_name,
                entries = snapshot.entries.len(),
                kept = items.len() - before,
                "feed processed"
            );
        }

        let (items, duplicates) = rank_and_dedupe(items);
        stats.duplicates = duplicates;
        stats.kept = items.len();

        counter!("digest_duplicates_total").increment(duplicates as u64);
        counter!("digest_items_kept_total").increment(items.len() as u64);
        gauge!("digest_last_run_ts").set(now.timestamp() as f64);

        tracing::info!(
            target: "ingest",
            feeds = stats.feeds,
            feed_errors = stats.feed_errors,
            entries = stats.entries,
            undated = stats.undated,
            stale = stats.stale,
            gated = stats.gated,
            duplicates = stats.duplicates,
            kept = stats.kept,
            "digest built"
        );

        (Digest::new(now, self.window_days, &items), stats)
    }
}
