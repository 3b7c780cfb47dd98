//! Cache rules: which request URLs are stored, and under which versioned key.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use lila_sw_common::{SwError, SwResult};
use serde::{Serialize, Serializer};
use url::Url;

/// Cache key of the stockfish NNUE engine build.
pub const STOCKFISH_NNUE_KEY: &str = "stockfish-nnue.wasm--0.0.2";

/// Path prefix of the stockfish NNUE engine build.
pub const STOCKFISH_NNUE_PATH: &str = "/assets/_85a969/vendor/stockfish-nnue.wasm";

/// Predicate over a request URL.
#[derive(Clone)]
pub enum UrlMatcher {
    /// URL path starts with the given prefix.
    PathPrefix(String),
    /// Arbitrary predicate.
    Predicate(Arc<dyn Fn(&Url) -> bool + Send + Sync>),
}

impl UrlMatcher {
    /// Create a path prefix matcher.
    pub fn path_prefix(prefix: &str) -> Self {
        Self::PathPrefix(prefix.to_string())
    }

    /// Wrap a custom predicate.
    pub fn predicate(f: impl Fn(&Url) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(f))
    }

    /// Check if a URL matches.
    pub fn matches(&self, url: &Url) -> bool {
        match self {
            UrlMatcher::PathPrefix(prefix) => url.path().starts_with(prefix.as_str()),
            UrlMatcher::Predicate(f) => f(url),
        }
    }
}

impl fmt::Display for UrlMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlMatcher::PathPrefix(prefix) => write!(f, "path^={prefix}"),
            UrlMatcher::Predicate(_) => f.write_str("predicate"),
        }
    }
}

impl fmt::Debug for UrlMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UrlMatcher({self})")
    }
}

impl Serialize for UrlMatcher {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A versioned cache key paired with the URLs it stores.
#[derive(Debug, Clone, Serialize)]
pub struct CacheRule {
    pub key: String,
    pub matcher: UrlMatcher,
}

impl CacheRule {
    pub fn new(key: impl Into<String>, matcher: UrlMatcher) -> Self {
        Self {
            key: key.into(),
            matcher,
        }
    }

    /// The stockfish NNUE wasm build.
    pub fn stockfish_nnue() -> Self {
        Self::new(STOCKFISH_NNUE_KEY, UrlMatcher::path_prefix(STOCKFISH_NNUE_PATH))
    }
}

/// Ordered, immutable list of cache rules. The first matching rule wins.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct CacheRules(Vec<CacheRule>);

impl CacheRules {
    /// Build a rule list. Keys must be unique.
    pub fn new(rules: Vec<CacheRule>) -> SwResult<Self> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if rule.key.is_empty() {
                return Err(SwError::config("cache rule key must not be empty"));
            }
            if !seen.insert(rule.key.as_str()) {
                return Err(SwError::config(format!(
                    "duplicate cache rule key: {}",
                    rule.key
                )));
            }
        }
        Ok(Self(rules))
    }

    /// First rule accepting the URL, in declaration order.
    pub fn first_match(&self, url: &Url) -> Option<&CacheRule> {
        self.0.iter().find(|rule| rule.matcher.matches(url))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|rule| rule.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|rule| rule.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CacheRule> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for CacheRules {
    fn default() -> Self {
        Self(vec![CacheRule::stockfish_nnue()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_path_prefix_ignores_host_and_query() {
        let matcher = UrlMatcher::path_prefix(STOCKFISH_NNUE_PATH);
        assert!(matcher.matches(&url(
            "https://lichess1.org/assets/_85a969/vendor/stockfish-nnue.wasm/stockfish.wasm?v=2"
        )));
        assert!(!matcher.matches(&url("https://lichess1.org/assets/_85a969/vendor/other.js")));
    }

    #[test]
    fn test_default_rules() {
        let rules = CacheRules::default();
        assert_eq!(rules.keys().collect::<Vec<_>>(), vec![STOCKFISH_NNUE_KEY]);
        assert!(rules.contains_key(STOCKFISH_NNUE_KEY));
        assert!(!rules.contains_key("stockfish-nnue.wasm--0.0.1"));
    }

    #[test]
    fn test_first_match_wins_by_order() {
        let rules = CacheRules::new(vec![
            CacheRule::new("broad--1", UrlMatcher::path_prefix("/assets/")),
            CacheRule::new("narrow--1", UrlMatcher::path_prefix("/assets/vendor/")),
        ])
        .unwrap();

        let hit = rules
            .first_match(&url("https://lichess.org/assets/vendor/x.wasm"))
            .unwrap();
        assert_eq!(hit.key, "broad--1");
        assert!(rules.first_match(&url("https://lichess.org/training")).is_none());
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let err = CacheRules::new(vec![
            CacheRule::new("a--1", UrlMatcher::path_prefix("/a")),
            CacheRule::new("a--1", UrlMatcher::path_prefix("/b")),
        ])
        .unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_predicate_matcher() {
        let matcher = UrlMatcher::predicate(|u| u.path().ends_with(".wasm"));
        assert!(matcher.matches(&url("https://lichess.org/a/b.wasm")));
        assert_eq!(matcher.to_string(), "predicate");
    }

    #[test]
    fn test_rules_serialize_as_keys_and_descriptions() {
        let json = serde_json::to_value(CacheRules::default()).unwrap();
        assert_eq!(json[0]["key"], STOCKFISH_NNUE_KEY);
        assert_eq!(json[0]["matcher"], format!("path^={STOCKFISH_NNUE_PATH}"));
    }
}
