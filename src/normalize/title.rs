// src/normalize/title.rs
//! Placeholder-title detection and repair.
//!
//! Some publishers (open-data portals, aggregator stubs) ship entries titled
//! "Dataset: Updated data" or just "News". Those titles are useless on the
//! site and collide in deduplication, so a headline is derived instead.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::normalize::text::truncate_chars;

/// A derived headline shorter than this is not better than the fallback.
pub const MIN_SENTENCE_CHARS: usize = 20;
pub const REPAIRED_TITLE_MAX_CHARS: usize = 140;

fn re_generic() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:dataset:\s*updated data|updated data|news)\s*$").unwrap()
    })
}

fn re_sentence_end() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"[.!?]\s").unwrap())
}

pub fn looks_generic(title: &str) -> bool {
    title.trim().is_empty() || re_generic().is_match(title)
}

/// Summary text up to and including the first sentence terminator that is
/// followed by whitespace. Without such a terminator the whole summary is
/// one sentence.
pub fn first_sentence(summary: &str) -> &str {
    let s = summary.trim();
    match re_sentence_end().find(s) {
        Some(m) => &s[..m.start() + 1],
        None => s,
    }
}

/// Return `title` unless it is a placeholder; otherwise the first summary
/// sentence (when long enough) or `"<source>: Update"`.
pub fn repair_title(host: &str, title: &str, summary: &str, source_name: &str) -> String {
    if !looks_generic(title) {
        return title.to_string();
    }

    let candidate = first_sentence(summary);
    if candidate.chars().count() >= MIN_SENTENCE_CHARS {
        return truncate_chars(candidate, REPAIRED_TITLE_MAX_CHARS);
    }

    let label = [source_name.trim(), host.trim()]
        .into_iter()
        .find(|s| !s.is_empty());
    match label {
        Some(l) => format!("{l}: Update"),
        None => "Update".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_patterns_match_whole_title_only() {
        assert!(looks_generic("Dataset: Updated Data"));
        assert!(looks_generic("  updated data "));
        assert!(looks_generic("NEWS"));
        assert!(looks_generic("   "));
        assert!(!looks_generic("News from the Bundestag"));
        assert!(!looks_generic("Updated data on measles"));
    }

    #[test]
    fn first_sentence_splits_on_terminator_plus_space() {
        assert_eq!(first_sentence("Version 2.1 released. More soon."), "Version 2.1 released.");
        assert_eq!(first_sentence("no terminator here"), "no terminator here");
    }

    #[test]
    fn repair_uses_first_sentence() {
        let t = repair_title(
            "ec.europa.eu",
            "Dataset: Updated Data",
            "Eurostat released Q3 figures today. More details follow.",
            "Eurostat",
        );
        assert_eq!(t, "Eurostat released Q3 figures today.");
    }

    #[test]
    fn repair_falls_back_to_source_then_host() {
        assert_eq!(repair_title("rki.de", "News", "Kurz.", "RKI"), "RKI: Update");
        assert_eq!(repair_title("rki.de", "News", "", " "), "rki.de: Update");
        assert_eq!(repair_title("", "", "", ""), "Update");
    }

    #[test]
    fn repaired_title_is_capped() {
        let long = "a".repeat(300);
        let t = repair_title("x.org", "news", &long, "X");
        assert_eq!(t.chars().count(), REPAIRED_TITLE_MAX_CHARS);
    }

    #[test]
    fn real_title_is_untouched() {
        assert_eq!(repair_title("x", "Klinikreform beschlossen", "s", "X"), "Klinikreform beschlossen");
    }
}
