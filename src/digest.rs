// src/digest.rs
//! Digest model, ranking, deduplication and the JSON document writer.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::classify::Category;

/// Output `type`: research items are "Studie", everything else "News".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kind {
    #[serde(rename = "Studie")]
    Research,
    #[serde(rename = "News")]
    News,
}

impl Kind {
    pub fn for_category(category: Category) -> Self {
        if category == Category::Research {
            Kind::Research
        } else {
            Kind::News
        }
    }
}

/// One fully normalized, classified entry. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedItem {
    pub title: String,
    pub summary: String,
    pub source_name: String,
    pub canonical_url: String,
    pub published_at: DateTime<Utc>,
    pub category: Category,
    pub tags: Vec<Category>,
}

impl NormalizedItem {
    pub fn kind(&self) -> Kind {
        Kind::for_category(self.category)
    }

    /// Identity used for deduplication.
    pub fn dedup_key(&self) -> (String, String) {
        (self.canonical_url.clone(), self.title.to_lowercase())
    }
}

pub fn to_iso(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Wire shape of one item in the output document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestItem {
    pub title: String,
    pub summary_de: String,
    pub source_name: String,
    pub source_url: String,
    pub published_at: String,
    pub category: String,
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub kind: Kind,
}

impl From<&NormalizedItem> for DigestItem {
    fn from(it: &NormalizedItem) -> Self {
        Self {
            title: it.title.clone(),
            summary_de: it.summary.clone(),
            source_name: it.source_name.clone(),
            source_url: it.canonical_url.clone(),
            published_at: to_iso(&it.published_at),
            category: it.category.label().to_string(),
            tags: it.tags.iter().map(|t| t.label().to_string()).collect(),
            kind: it.kind(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    pub generated_at: String,
    pub window_days: u32,
    pub count: usize,
    pub items: Vec<DigestItem>,
}

impl Digest {
    /// `items` must already be ranked and deduplicated.
    pub fn new(generated_at: DateTime<Utc>, window_days: u32, items: &[NormalizedItem]) -> Self {
        let items: Vec<DigestItem> = items.iter().map(DigestItem::from).collect();
        Self {
            generated_at: to_iso(&generated_at),
            window_days,
            count: items.len(),
            items,
        }
    }

    /// Pretty JSON, two-space indent, non-ASCII kept literal.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serializing digest")
    }

    /// Write the document, creating parent directories as needed.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating output dir {}", dir.display()))?;
        }
        let json = self.to_json()?;
        fs::write(path, json).with_context(|| format!("writing digest to {}", path.display()))
    }
}

/// Most recent first. Stable: equal timestamps keep input order.
pub fn rank(items: &mut [NormalizedItem]) {
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

/// Keep the first item per (canonical_url, lowercase title).
pub fn dedupe(items: Vec<NormalizedItem>) -> (Vec<NormalizedItem>, usize) {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    let mut dropped = 0usize;
    for it in items {
        if !seen.insert(it.dedup_key()) {
            dropped += 1;
            continue;
        }
        out.push(it);
    }
    (out, dropped)
}

/// Rank, then dedupe, so the most recent copy of a duplicate survives.
pub fn rank_and_dedupe(mut items: Vec<NormalizedItem>) -> (Vec<NormalizedItem>, usize) {
    rank(&mut items);
    dedupe(items)
}
