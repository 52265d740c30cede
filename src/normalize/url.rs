// src/normalize/url.rs
//! Link canonicalization: host normalization, redirect resolution for
//! aggregator links, and tracking-parameter removal.
//!
//! Every step fails open. A link that cannot be parsed or resolved is kept
//! as it came in; losing one redirect is cheaper than losing the run.

use async_trait::async_trait;
use metrics::counter;
use std::time::Duration;
use url::Url;

/// Query parameter prefixes of campaign-tracking families.
pub const TRACKING_PREFIXES: &[&str] = &["utm_", "mtm_"];

/// Click-id and mailing parameters removed on exact (case-insensitive) match.
pub const TRACKING_EXACT: &[&str] = &[
    "gclid", "dclid", "fbclid", "msclkid", "yclid", "igshid", "mc_cid", "mc_eid", "_hsenc",
    "_hsmi",
];

pub const DEFAULT_REDIRECT_TIMEOUT: Duration = Duration::from_secs(8);
const MAX_REDIRECT_HOPS: usize = 10;

/// Lowercase and drop a leading `www.`.
pub fn normalize_host(host: &str) -> String {
    let lower = host.trim().to_ascii_lowercase();
    match lower.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}

/// Normalized host of `url`, or an empty string when it does not parse.
pub fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(normalize_host))
        .unwrap_or_default()
}

/// `host` equals `suffix` or is a subdomain of it.
pub fn host_matches(host: &str, suffix: &str) -> bool {
    let suffix = suffix.trim_start_matches('.');
    if suffix.is_empty() {
        return false;
    }
    host == suffix
        || (host.len() > suffix.len()
            && host.ends_with(suffix)
            && host.as_bytes()[host.len() - suffix.len() - 1] == b'.')
}

pub fn is_tracking_param(name: &str) -> bool {
    let k = name.to_ascii_lowercase();
    TRACKING_PREFIXES.iter().any(|p| k.starts_with(p)) || TRACKING_EXACT.contains(&k.as_str())
}

/// Decoded name of one raw `key=value` query segment.
fn param_name(segment: &str) -> String {
    let raw = segment.split('=').next().unwrap_or_default();
    url::form_urlencoded::parse(raw.as_bytes())
        .next()
        .map(|(k, _)| k.into_owned())
        .unwrap_or_default()
}

/// Remove tracking parameters and the fragment.
///
/// The query is filtered segment by segment on its raw text, so kept
/// parameters stay byte-for-byte as they were (order, encoding, key-only
/// flags). Unparseable input is returned unchanged.
pub fn strip_tracking_params(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    parsed.set_fragment(None);

    if let Some(query) = parsed.query().map(str::to_owned) {
        let segments: Vec<&str> = query.split('&').filter(|s| !s.is_empty()).collect();
        let kept: Vec<&str> = segments
            .iter()
            .copied()
            .filter(|seg| !is_tracking_param(&param_name(seg)))
            .collect();

        if kept.is_empty() {
            parsed.set_query(None);
        } else if kept.len() != segments.len() {
            parsed.set_query(Some(&kept.join("&")));
        }
    }

    parsed.to_string()
}

/// Outcome of a redirect lookup. `Fallback` is the normal answer for any
/// network problem, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(String),
    Fallback { original: String, reason: String },
}

impl Resolution {
    pub fn url(&self) -> &str {
        match self {
            Resolution::Resolved(u) => u,
            Resolution::Fallback { original, .. } => original,
        }
    }

    pub fn into_url(self) -> String {
        match self {
            Resolution::Resolved(u) => u,
            Resolution::Fallback { original, .. } => original,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolution::Fallback { .. })
    }
}

#[async_trait]
pub trait RedirectResolver: Send + Sync {
    /// Follow `url` to its final location if it belongs to an indirection
    /// service; any other URL comes back as `Resolved(url)` untouched.
    async fn resolve(&self, url: &str) -> Resolution;
}

/// Resolver that never touches the network.
pub struct PassthroughResolver;

#[async_trait]
impl RedirectResolver for PassthroughResolver {
    async fn resolve(&self, url: &str) -> Resolution {
        Resolution::Resolved(url.to_string())
    }
}

/// One GET per aggregator link, redirects followed, bounded by a timeout.
pub struct HttpRedirectResolver {
    client: reqwest::Client,
    indirection_hosts: Vec<String>,
}

impl HttpRedirectResolver {
    pub fn new(indirection_hosts: Vec<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECT_HOPS))
            .build()?;
        Ok(Self {
            client,
            indirection_hosts: indirection_hosts
                .iter()
                .map(|h| normalize_host(h))
                .collect(),
        })
    }

    pub fn is_indirection(&self, url: &str) -> bool {
        let host = host_of(url);
        self.indirection_hosts.iter().any(|h| host_matches(&host, h))
    }
}

#[async_trait]
impl RedirectResolver for HttpRedirectResolver {
    async fn resolve(&self, url: &str) -> Resolution {
        if !self.is_indirection(url) {
            return Resolution::Resolved(url.to_string());
        }

        match self.client.get(url).send().await {
            Ok(resp) => {
                let final_url = resp.url().to_string();
                tracing::debug!(target: "redirect", from = url, to = %final_url, "resolved");
                Resolution::Resolved(final_url)
            }
            Err(e) => {
                tracing::warn!(target: "redirect", error = %e, url, "redirect lookup failed, keeping original");
                counter!("digest_redirect_fallback_total").increment(1);
                Resolution::Fallback {
                    original: url.to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Redirect first, then strip: the resolved URL is the one carrying the
/// publisher's tracking parameters.
pub async fn canonicalize(resolver: &dyn RedirectResolver, link: &str) -> String {
    let resolved = resolver.resolve(link).await.into_url();
    strip_tracking_params(&resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_is_lowercased_and_www_stripped() {
        assert_eq!(normalize_host("WWW.Aerzteblatt.DE"), "aerzteblatt.de");
        assert_eq!(normalize_host("news.google.com"), "news.google.com");
        assert_eq!(normalize_host(""), "");
    }

    #[test]
    fn suffix_match_requires_label_boundary() {
        assert!(host_matches("g-ba.de", "g-ba.de"));
        assert!(host_matches("presse.g-ba.de", "g-ba.de"));
        assert!(!host_matches("notg-ba.de", "g-ba.de"));
        assert!(!host_matches("g-ba.de", ""));
    }

    #[test]
    fn strips_utm_keeps_id() {
        let out = strip_tracking_params("https://example.org/a?utm_source=x&id=5");
        assert_eq!(out, "https://example.org/a?id=5");
    }

    #[test]
    fn strips_click_ids_and_fragment() {
        let out = strip_tracking_params("https://example.org/a?b=2&fbclid=zz&a=1#top");
        assert_eq!(out, "https://example.org/a?b=2&a=1");
    }

    #[test]
    fn drops_empty_query() {
        let out = strip_tracking_params("https://example.org/a?utm_medium=rss&GCLID=1");
        assert_eq!(out, "https://example.org/a");
    }

    #[test]
    fn kept_params_stay_verbatim() {
        let out = strip_tracking_params("https://example.org/a?flag&q=a+b%2Fc&utm_source=x&n=%C3%A4");
        assert_eq!(out, "https://example.org/a?flag&q=a+b%2Fc&n=%C3%A4");
        let out = strip_tracking_params("https://example.org/a?utm%5Fsource=x&id=1");
        assert_eq!(out, "https://example.org/a?id=1");
    }

    #[test]
    fn stripping_is_a_projection() {
        for u in [
            "https://example.org/a?utm_source=x&q=a+b&id=5#f",
            "https://example.org/?x=%C3%A4&mtm_campaign=c",
            "https://example.org/plain",
        ] {
            let once = strip_tracking_params(u);
            assert_eq!(strip_tracking_params(&once), once);
        }
    }

    #[test]
    fn malformed_passes_through() {
        assert_eq!(strip_tracking_params("not a url"), "not a url");
        assert_eq!(host_of("not a url"), "");
    }

    #[tokio::test]
    async fn passthrough_resolver_keeps_url() {
        let out = canonicalize(&PassthroughResolver, "https://x.org/p?utm_term=t").await;
        assert_eq!(out, "https://x.org/p");
    }

    #[tokio::test]
    async fn http_resolver_skips_non_indirection_hosts() {
        let r = HttpRedirectResolver::new(vec!["news.google.com".into()], DEFAULT_REDIRECT_TIMEOUT)
            .unwrap();
        assert!(r.is_indirection("https://news.google.com/rss/articles/abc"));
        let res = r.resolve("https://www.aerzteblatt.de/nachrichten/1").await;
        assert_eq!(res, Resolution::Resolved("https://www.aerzteblatt.de/nachrichten/1".into()));
    }
}
