// src/config/digest.rs
//! Run settings resolved from the environment (`.env` is loaded by the binary).
//!
//! The feed list (`FEEDS_PATH`) and classifier rules (`CLASSIFIER_CONFIG_PATH`)
//! resolve their own paths in `ingest::config` and `classify`.

use std::path::PathBuf;
use std::time::Duration;

pub const ENV_OUTPUT_PATH: &str = "DIGEST_OUTPUT_PATH";
pub const ENV_WINDOW_DAYS: &str = "DIGEST_WINDOW_DAYS";
pub const ENV_REDIRECT_TIMEOUT_SECS: &str = "REDIRECT_TIMEOUT_SECS";
pub const ENV_FEED_TIMEOUT_SECS: &str = "FEED_TIMEOUT_SECS";
pub const ENV_METRICS_PATH: &str = "DIGEST_METRICS_PATH";
pub const ENV_LOG_JSON: &str = "DIGEST_LOG_JSON";

pub const DEFAULT_OUTPUT_PATH: &str = "public/health-news.json";
pub const DEFAULT_WINDOW_DAYS: u32 = 3;
pub const DEFAULT_REDIRECT_TIMEOUT_SECS: u64 = 8;
pub const DEFAULT_FEED_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestSettings {
    pub output_path: PathBuf,
    pub window_days: u32,
    pub redirect_timeout: Duration,
    pub feed_timeout: Duration,
    pub metrics_path: Option<PathBuf>,
    pub log_json: bool,
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            window_days: DEFAULT_WINDOW_DAYS,
            redirect_timeout: Duration::from_secs(DEFAULT_REDIRECT_TIMEOUT_SECS),
            feed_timeout: Duration::from_secs(DEFAULT_FEED_TIMEOUT_SECS),
            metrics_path: None,
            log_json: false,
        }
    }
}

/// Parse an integer env value and clamp it into `min..=max`.
/// Garbage yields `None` so the caller keeps its default.
fn parse_clamped(name: &str, raw: Option<String>, min: u64, max: u64) -> Option<u64> {
    let raw = raw?;
    match raw.trim().parse::<u64>() {
        Ok(v) => Some(v.clamp(min, max)),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "ignoring invalid numeric setting");
            None
        }
    }
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl DigestSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build settings from any key lookup (tests pass a map).
    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut s = Self::default();

        if let Some(p) = non_empty(get(ENV_OUTPUT_PATH)) {
            s.output_path = PathBuf::from(p);
        }
        s.metrics_path = non_empty(get(ENV_METRICS_PATH)).map(PathBuf::from);
        s.log_json = get(ENV_LOG_JSON).is_some_and(|v| v.trim() == "1");

        if let Some(d) = parse_clamped(ENV_WINDOW_DAYS, get(ENV_WINDOW_DAYS), 1, 365) {
            s.window_days = d as u32;
        }
        if let Some(t) = parse_clamped(
            ENV_REDIRECT_TIMEOUT_SECS,
            get(ENV_REDIRECT_TIMEOUT_SECS),
            1,
            60,
        ) {
            s.redirect_timeout = Duration::from_secs(t);
        }
        if let Some(t) = parse_clamped(ENV_FEED_TIMEOUT_SECS, get(ENV_FEED_TIMEOUT_SECS), 1, 300) {
            s.feed_timeout = Duration::from_secs(t);
        }

        s
    }
}
