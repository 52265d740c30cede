// src/normalize/text.rs
//! Plain-text cleanup for feed fields: markup removal, whitespace folding,
//! word-bounded summaries and char-safe truncation.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Default word budget for `summary_de`.
pub const SUMMARY_MAX_WORDS: usize = 60;

/// Marker appended to summaries that were cut short.
pub const ELLIPSIS: char = '…';

fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

fn re_ws() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Strip tags, collapse whitespace runs to one space, trim.
///
/// Tags are replaced by a space (so `a<br>b` stays two words) and removal
/// repeats until no tag is left, which keeps `clean(clean(x)) == clean(x)`
/// even for inputs like `<<b>i>`.
pub fn clean(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut out = text.to_string();
    while re_tags().is_match(&out) {
        out = re_tags().replace_all(&out, " ").into_owned();
    }

    re_ws().replace_all(&out, " ").trim().to_string()
}

/// Keep at most `max_words` whitespace-separated words.
///
/// Text within budget is returned untouched. Longer text is rejoined with
/// single spaces and the last kept word gets `…` attached, so the result
/// never exceeds `max_words` words.
pub fn summarize(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return text.to_string();
    }
    if max_words == 0 {
        return ELLIPSIS.to_string();
    }

    let mut out = words[..max_words].join(" ");
    out.push(ELLIPSIS);
    out
}

/// Cut `text` to at most `max` characters (not bytes).
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_strips_tags_and_folds_ws() {
        let s = "  <p>Neue <b>Leitlinie</b>\n\tzur   Versorgung</p> ";
        assert_eq!(clean(s), "Neue Leitlinie zur Versorgung");
    }

    #[test]
    fn clean_keeps_words_apart_across_tags() {
        assert_eq!(clean("eins<br/>zwei"), "eins zwei");
    }

    #[test]
    fn clean_is_idempotent_on_nested_brackets() {
        for s in ["<<b>i>text", "a < b > c", "<a href='x'>link</a> &amp; more", ""] {
            let once = clean(s);
            assert_eq!(clean(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn summarize_within_budget_is_unchanged() {
        let s = "kurzer  Text";
        assert_eq!(summarize(s, 60), s);
    }

    #[test]
    fn summarize_cuts_and_marks() {
        let s = (1..=70).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let out = summarize(&s, 60);
        assert_eq!(out.split_whitespace().count(), 60);
        assert!(out.ends_with("w60…"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("Ärztekammer", 3), "Ärz");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
