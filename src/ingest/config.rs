// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_PATH: &str = "FEEDS_PATH";
pub const DEFAULT_FEEDS_PATH: &str = "feeds.txt";

/// Load the feed list from an explicit path.
pub fn load_feed_list_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading feed list from {}", path.display()))?;
    Ok(parse_feed_list(&content))
}

/// Load the feed list using env var + fallback:
/// 1) $FEEDS_PATH (must exist)
/// 2) ./feeds.txt
pub fn load_feed_list_default() -> Result<Vec<String>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_feed_list_from(&pb);
        } else {
            return Err(anyhow!("FEEDS_PATH points to non-existent path"));
        }
    }
    load_feed_list_from(Path::new(DEFAULT_FEEDS_PATH))
}

/// One location per line; blank lines and `#` comments are skipped.
pub fn parse_feed_list(s: &str) -> Vec<String> {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}
