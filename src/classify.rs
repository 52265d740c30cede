// src/classify.rs
//! Topic classifier: rule-table config, regex compilation, candidate
//! collection, priority resolution and the health-relevance gate.
//!
//! Two signal sources feed the candidate set:
//! - domain hints (host suffix → categories), high precision;
//! - per-category keyword regexes over `title + summary`, broad recall.
//!
//! Keyword recall is noisy for general-interest media and aggregator links,
//! so items from those sources must also hit the health vocabulary or they
//! are dropped.

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::normalize::url::{host_matches, host_of, normalize_host};

pub const DEFAULT_CLASSIFIER_CONFIG_PATH: &str = "config/classifier.toml";
pub const ENV_CLASSIFIER_CONFIG_PATH: &str = "CLASSIFIER_CONFIG_PATH";

/// Rule set compiled into the binary; used when no config file is present.
const BUILTIN_RULES: &str = include_str!("../config/classifier.toml");

/// Topical labels. Declaration order is the priority order used to pick
/// the primary category; `General` is the residual default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Policy,
    Research,
    Imaging,
    Care,
    Economy,
    Region,
    General,
}

impl Category {
    /// Scan order for the primary category (residual excluded).
    pub const PRIORITY: [Category; 6] = [
        Category::Policy,
        Category::Research,
        Category::Imaging,
        Category::Care,
        Category::Economy,
        Category::Region,
    ];

    /// Label written to the digest.
    pub fn label(self) -> &'static str {
        match self {
            Category::Policy => "Gesundheitspolitik",
            Category::Research => "Forschung",
            Category::Imaging => "Radiologie & Bildgebung",
            Category::Care => "Versorgung",
            Category::Economy => "Wirtschaft",
            Category::Region => "Region",
            Category::General => "Allgemein",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub domain_hints: Vec<DomainHint>,
    #[serde(default)]
    pub keywords: Vec<KeywordSet>,
    #[serde(default)]
    pub fallback_economy_domains: Vec<String>,
    #[serde(default)]
    pub aggregator_domains: Vec<String>,
    #[serde(default)]
    pub general_media_domains: Vec<String>,
    pub health_pattern: String,
    /// Case-sensitive acronyms (WHO, CT, ...) that would collide with
    /// ordinary words if matched case-insensitively.
    #[serde(default)]
    pub health_acronyms: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DomainHint {
    pub suffix: String,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordSet {
    pub category: Category,
    pub patterns: Vec<String>,
}

/* ----------------------------
Classification results
---------------------------- */

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    /// Secondary labels, never containing `category`, sorted by label.
    pub tags: Vec<Category>,
    /// Which signals fired, e.g. `domain:g-ba.de`, `keyword:care#0`.
    pub matched: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    NotHealthRelated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Keep(Classification),
    Drop(DropReason),
}

/// Normalized fields of one entry.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyInput<'a> {
    pub title: &'a str,
    pub summary: &'a str,
    pub canonical_url: &'a str,
    /// Host of `canonical_url`; derived from it when empty.
    pub host: &'a str,
    /// Host of the link as published in the feed, before redirects.
    pub origin_host: &'a str,
}

/* ----------------------------
Compiled engine
---------------------------- */

#[derive(Debug)]
struct CompiledKeywords {
    category: Category,
    patterns: Vec<Regex>,
}

#[derive(Debug)]
pub struct Classifier {
    pub cfg: ClassifierConfig,
    hints: Vec<(String, Vec<Category>)>,
    keywords: Vec<CompiledKeywords>,
    health: Regex,
    acronyms: Option<Regex>,
}

fn compile_ci(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

fn normalized_list(v: &[String]) -> Vec<String> {
    v.iter()
        .map(|d| normalize_host(d))
        .filter(|d| !d.is_empty())
        .collect()
}

impl Classifier {
    pub fn new(cfg: ClassifierConfig) -> anyhow::Result<Self> {
        if let Some(hint) = cfg
            .domain_hints
            .iter()
            .find(|h| h.categories.contains(&Category::General))
        {
            anyhow::bail!(
                "domain hint `{}`: `general` is the residual category and cannot be assigned",
                hint.suffix
            );
        }
        if cfg.keywords.iter().any(|k| k.category == Category::General) {
            anyhow::bail!("keywords: `general` is the residual category and cannot be assigned");
        }

        let health = compile_ci(&cfg.health_pattern)
            .map_err(|e| anyhow::anyhow!("health_pattern regex error: {}", e))?;
        let acronyms = cfg
            .health_acronyms
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| anyhow::anyhow!("health_acronyms regex error: {}", e))?;

        let keywords = cfg
            .keywords
            .iter()
            .map(|set| -> anyhow::Result<CompiledKeywords> {
                let patterns = set
                    .patterns
                    .iter()
                    .enumerate()
                    .map(|(i, p)| {
                        compile_ci(p).map_err(|e| {
                            anyhow::anyhow!(
                                "keyword `{:?}` pattern #{} regex error: {}",
                                set.category,
                                i,
                                e
                            )
                        })
                    })
                    .collect::<anyhow::Result<Vec<_>>>()?;
                Ok(CompiledKeywords {
                    category: set.category,
                    patterns,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let hints = cfg
            .domain_hints
            .iter()
            .map(|h| (normalize_host(&h.suffix), h.categories.clone()))
            .filter(|(suffix, _)| !suffix.is_empty())
            .collect();

        let mut cfg = cfg;
        cfg.fallback_economy_domains = normalized_list(&cfg.fallback_economy_domains);
        cfg.aggregator_domains = normalized_list(&cfg.aggregator_domains);
        cfg.general_media_domains = normalized_list(&cfg.general_media_domains);

        Ok(Self {
            cfg,
            hints,
            keywords,
            health,
            acronyms,
        })
    }

    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let cfg: ClassifierConfig = toml::from_str(toml_str)?;
        Self::new(cfg)
    }

    /// The rule set shipped with the crate.
    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_toml_str(BUILTIN_RULES)
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read classifier config at {}: {}",
                path.display(),
                e
            )
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| anyhow::anyhow!("classifier config {}: {}", path.display(), e))
    }

    /// Load `$CLASSIFIER_CONFIG_PATH`, else `config/classifier.toml`, else
    /// the built-in rules. An explicitly configured path must exist.
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(p) = std::env::var(ENV_CLASSIFIER_CONFIG_PATH) {
            return Self::from_path(&PathBuf::from(p));
        }
        let default = PathBuf::from(DEFAULT_CLASSIFIER_CONFIG_PATH);
        if default.exists() {
            return Self::from_path(&default);
        }
        info!(target: "classify", "no classifier config found, using built-in rules");
        Self::builtin()
    }

    pub fn aggregator_domains(&self) -> &[String] {
        &self.cfg.aggregator_domains
    }

    fn host_in(host: &str, list: &[String]) -> bool {
        !host.is_empty() && list.iter().any(|d| host_matches(host, d))
    }

    /// Gate applies to aggregator links and general-interest media only.
    pub fn is_gated_source(&self, host: &str, origin_host: &str) -> bool {
        Self::host_in(origin_host, &self.cfg.aggregator_domains)
            || Self::host_in(host, &self.cfg.aggregator_domains)
            || Self::host_in(host, &self.cfg.general_media_domains)
            || Self::host_in(origin_host, &self.cfg.general_media_domains)
    }

    /// `text` must keep its original case for the acronym check.
    pub fn is_health_related(&self, text: &str) -> bool {
        self.health.is_match(text) || self.acronyms.as_ref().is_some_and(|re| re.is_match(text))
    }

    /// Domain hints + keyword matches, plus the trade-press fallback.
    fn collect_candidates(
        &self,
        host: &str,
        haystack: &str,
    ) -> (BTreeSet<Category>, Vec<String>) {
        let mut candidates = BTreeSet::new();
        let mut matched = Vec::new();

        for (suffix, cats) in &self.hints {
            if host_matches(host, suffix) {
                candidates.extend(cats.iter().copied());
                matched.push(format!("domain:{suffix}"));
            }
        }

        for set in &self.keywords {
            if let Some(i) = set.patterns.iter().position(|re| re.is_match(haystack)) {
                candidates.insert(set.category);
                matched.push(format!("keyword:{:?}#{}", set.category, i).to_lowercase());
            }
        }

        if candidates.is_empty() && Self::host_in(host, &self.cfg.fallback_economy_domains) {
            candidates.insert(Category::Economy);
            matched.push("fallback:economy".into());
        }

        (candidates, matched)
    }

    pub fn classify(&self, input: &ClassifyInput<'_>) -> Verdict {
        let text = format!("{} {}", input.title, input.summary);
        let haystack = text.to_lowercase();
        let host = if input.host.is_empty() {
            host_of(input.canonical_url)
        } else {
            normalize_host(input.host)
        };
        let origin_host = normalize_host(input.origin_host);

        if self.is_gated_source(&host, &origin_host) && !self.is_health_related(&text) {
            debug!(target: "classify", %host, %origin_host, "dropped by health gate");
            return Verdict::Drop(DropReason::NotHealthRelated);
        }

        let (candidates, matched) = self.collect_candidates(&host, &haystack);

        let category = Category::PRIORITY
            .into_iter()
            .find(|c| candidates.contains(c))
            .unwrap_or(Category::General);

        let mut tags: Vec<Category> = candidates.into_iter().filter(|c| *c != category).collect();
        tags.sort_by_key(|c| c.label());

        debug!(target: "classify", %host, category = %category, tags = ?tags, matched = ?matched);

        Verdict::Keep(Classification {
            category,
            tags,
            matched,
        })
    }
}

/* ----------------------------
Tests
---------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_TOML: &str = r#"
aggregator_domains = ["news.google.com"]
general_media_domains = ["www.spiegel.de"]
fallback_economy_domains = ["aerzteblatt.de"]
health_pattern = '\b(klinik\w*|patient\w*|mrt)\b'

[[domain_hints]]
suffix = "g-ba.de"
categories = ["policy", "care"]

[[keywords]]
category = "imaging"
patterns = ['\bmrt\b']

[[keywords]]
category = "care"
patterns = ['\bpflege\w*', '\bklinik\w*']

[[keywords]]
category = "policy"
patterns = ['\bgesetz\w*']
"#;

    fn eng() -> Classifier {
        Classifier::from_toml_str(TEST_TOML).expect("load test config")
    }

    fn input<'a>(title: &'a str, summary: &'a str, url: &'a str) -> ClassifyInput<'a> {
        ClassifyInput {
            title,
            summary,
            canonical_url: url,
            host: "",
            origin_host: "",
        }
    }

    fn keep(v: Verdict) -> Classification {
        match v {
            Verdict::Keep(c) => c,
            Verdict::Drop(r) => panic!("expected keep, got drop: {r:?}"),
        }
    }

    #[test]
    fn priority_is_declaration_order() {
        let mut all = Category::PRIORITY.to_vec();
        all.sort();
        assert_eq!(all, Category::PRIORITY.to_vec());
        assert!(Category::Region < Category::General);
    }

    #[test]
    fn domain_hint_wins_without_keywords() {
        let c = keep(eng().classify(&input("Sitzung am Donnerstag", "", "https://www.g-ba.de/x")));
        assert_eq!(c.category, Category::Policy);
        assert_eq!(c.tags, vec![Category::Care]);
        assert!(c.matched.iter().any(|m| m == "domain:g-ba.de"));
    }

    #[test]
    fn keyword_priority_picks_policy_over_care() {
        let c = keep(eng().classify(&input(
            "Pflegegesetz verabschiedet",
            "Kliniken begrüßen das Gesetz",
            "https://example.org/a",
        )));
        assert_eq!(c.category, Category::Policy);
        assert_eq!(c.tags, vec![Category::Care]);
    }

    #[test]
    fn tags_never_contain_primary_and_are_label_sorted() {
        let c = keep(eng().classify(&input(
            "MRT in der Klinik",
            "Gesetz zur Pflege",
            "https://sub.g-ba.de/y",
        )));
        assert_eq!(c.category, Category::Policy);
        assert!(!c.tags.contains(&c.category));
        let labels: Vec<_> = c.tags.iter().map(|t| t.label()).collect();
        let mut sorted = labels.clone();
        sorted.sort();
        assert_eq!(labels, sorted);
    }

    #[test]
    fn trade_press_fallback_only_without_candidates() {
        let c = keep(eng().classify(&input("Quartalszahlen", "", "https://www.aerzteblatt.de/n")));
        assert_eq!(c.category, Category::Economy);

        let c = keep(eng().classify(&input("Pflege", "", "https://www.aerzteblatt.de/n")));
        assert_eq!(c.category, Category::Care);
        assert!(c.tags.is_empty());
    }

    #[test]
    fn unmatched_is_general() {
        let c = keep(eng().classify(&input("Wetter", "Sonnig", "https://example.org")));
        assert_eq!(c.category, Category::General);
        assert!(c.tags.is_empty());
    }

    #[test]
    fn gate_drops_general_media_without_health_terms() {
        let v = eng().classify(&input("Bundesliga", "Tore", "https://www.spiegel.de/sport/1"));
        assert_eq!(v, Verdict::Drop(DropReason::NotHealthRelated));

        let v = eng().classify(&input("Klinik schließt", "", "https://www.spiegel.de/x"));
        assert!(matches!(v, Verdict::Keep(_)));
    }

    #[test]
    fn gate_uses_origin_host_for_aggregator_links() {
        let e = eng();
        let mut i = input("Bundesliga", "Tore", "https://example.org/resolved");
        i.origin_host = "news.google.com";
        assert_eq!(e.classify(&i), Verdict::Drop(DropReason::NotHealthRelated));

        // Specialist sources are never gated.
        let i = input("Bundesliga", "Tore", "https://example.org/resolved");
        assert!(matches!(e.classify(&i), Verdict::Keep(_)));
    }

    #[test]
    fn acronyms_match_only_in_original_case() {
        let toml = r#"
aggregator_domains = ["news.google.com"]
health_pattern = '\bklinik\w*'
health_acronyms = '\b(WHO|CT)\b'
"#;
        let e = Classifier::from_toml_str(toml).unwrap();
        assert!(e.is_health_related("WHO meldet Ausbruch"));
        assert!(e.is_health_related("Neues CT im Klinikum"));
        assert!(!e.is_health_related("the man who knew"));
        assert!(!e.is_health_related("ct"));

        let mut i = input("The striker who scored twice", "", "https://example.org/r");
        i.origin_host = "news.google.com";
        assert_eq!(e.classify(&i), Verdict::Drop(DropReason::NotHealthRelated));
    }

    #[test]
    fn general_is_rejected_in_rule_tables() {
        let toml = r#"
health_pattern = 'x'
[[domain_hints]]
suffix = "example.org"
categories = ["general"]
"#;
        let err = Classifier::from_toml_str(toml).unwrap_err().to_string();
        assert!(err.contains("residual"), "{err}");
    }

    #[test]
    fn bad_regex_reports_category_and_index() {
        let toml = r#"
health_pattern = 'x'
[[keywords]]
category = "care"
patterns = ['ok', '(unclosed']
"#;
        let err = Classifier::from_toml_str(toml).unwrap_err().to_string();
        assert!(err.contains("Care"), "{err}");
        assert!(err.contains("#1"), "{err}");
    }

    #[test]
    fn builtin_rules_compile() {
        let e = Classifier::builtin().expect("builtin rules");
        assert!(e.aggregator_domains().iter().any(|d| d == "news.google.com"));
    }
}
