// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::normalize::text::clean;

/// One feed item as parsed, before any normalization.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawEntry {
    pub title: String,
    pub link: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub feed: String, // feed location this entry came from
}

impl RawEntry {
    /// Published time, falling back to the updated time.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.published.or(self.updated)
    }
}

/// A fetched and parsed feed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedSnapshot {
    pub location: String,
    pub title: Option<String>,
    pub entries: Vec<RawEntry>,
}

impl FeedSnapshot {
    /// Display name: cleaned feed title if it has one, otherwise the location.
    pub fn source_name(&self) -> String {
        match self.title.as_deref().map(clean) {
            Some(t) if !t.is_empty() => t,
            _ => self.location.clone(),
        }
    }
}

#[async_trait::async_trait]
pub trait FeedSource {
    async fn fetch(&self, location: &str) -> Result<FeedSnapshot>;
    fn name(&self) -> &'static str;
}
