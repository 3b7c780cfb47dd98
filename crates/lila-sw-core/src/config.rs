//! Worker configuration

use lila_sw_common::SwResult;
use serde::Serialize;
use tracing::warn;
use url::Url;

use crate::rules::CacheRules;

/// Query parameter on the registration URL carrying the asset base.
pub const ASSET_URL_PARAM: &str = "asset-url";

/// Process-wide worker configuration, built once at startup.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerConfig {
    /// URL the worker script was registered from
    pub registration_url: Url,

    /// Origin root the worker serves, used to resolve target paths
    pub origin: Url,

    /// Absolute asset base href
    pub asset_base: String,

    /// Notification badge, relative to the asset directory
    pub badge_path: String,

    /// Notification icon, relative to the asset directory
    pub icon_path: String,

    /// Cached asset rules, in match order
    pub cache_rules: CacheRules,
}

impl WorkerConfig {
    /// Build the configuration from the worker's registration URL.
    ///
    /// `asset-url` is resolved relative to the registration URL. Without it
    /// the asset base falls back to the origin root.
    pub fn from_registration_url(registration_url: &Url) -> SwResult<Self> {
        let origin = registration_url.join("/")?;

        let asset_param = registration_url
            .query_pairs()
            .find(|(name, _)| name == ASSET_URL_PARAM)
            .map(|(_, value)| value.into_owned());

        let asset_base = match asset_param {
            Some(value) => registration_url.join(&value)?.to_string(),
            None => {
                warn!(url = %registration_url, "Registration URL has no asset-url parameter");
                origin.to_string()
            }
        };

        Ok(Self {
            registration_url: registration_url.clone(),
            origin,
            asset_base,
            badge_path: "logo/lichess-mono-128.png".to_string(),
            icon_path: "logo/lichess-favicon-192.png".to_string(),
            cache_rules: CacheRules::default(),
        })
    }

    /// Replace the cache rules.
    pub fn with_cache_rules(mut self, rules: CacheRules) -> Self {
        self.cache_rules = rules;
        self
    }

    /// Full URL of a file under the asset directory.
    pub fn asset_url(&self, path: &str) -> String {
        format!("{}assets/{}", self.asset_base, path)
    }

    pub fn badge_url(&self) -> String {
        self.asset_url(&self.badge_path)
    }

    pub fn icon_url(&self) -> String {
        self.asset_url(&self.icon_path)
    }

    /// Absolute URL of an in-app path. Always stays on the worker origin.
    pub fn resolve_path(&self, path: &str) -> Url {
        let mut url = self.origin.clone();
        url.set_path(path);
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(s: &str) -> WorkerConfig {
        WorkerConfig::from_registration_url(&Url::parse(s).unwrap()).unwrap()
    }

    #[test]
    fn test_absolute_asset_url() {
        let config = config("https://lichess.org/service-worker.js?asset-url=https://lichess1.org/");
        assert_eq!(config.asset_base, "https://lichess1.org/");
        assert_eq!(
            config.badge_url(),
            "https://lichess1.org/assets/logo/lichess-mono-128.png"
        );
        assert_eq!(
            config.icon_url(),
            "https://lichess1.org/assets/logo/lichess-favicon-192.png"
        );
    }

    #[test]
    fn test_relative_asset_url() {
        let config = config("https://lichess.org/assets/sw.js?asset-url=/static/");
        assert_eq!(config.asset_base, "https://lichess.org/static/");
        assert_eq!(config.asset_url("a.png"), "https://lichess.org/static/assets/a.png");
    }

    #[test]
    fn test_encoded_asset_url() {
        let config = config("https://lichess.org/sw.js?asset-url=https%3A%2F%2Fcdn.example%2F");
        assert_eq!(config.asset_base, "https://cdn.example/");
    }

    #[test]
    fn test_missing_asset_url_falls_back_to_origin() {
        let config = config("https://lichess.org/sw.js?v=3");
        assert_eq!(config.asset_base, "https://lichess.org/");
        assert_eq!(config.origin.as_str(), "https://lichess.org/");
    }

    #[test]
    fn test_resolve_path_stays_on_origin() {
        let config = config("https://lichess.org/sw.js?asset-url=/");
        assert_eq!(
            config.resolve_path("/inbox/7").as_str(),
            "https://lichess.org/inbox/7"
        );
        let odd = config.resolve_path("//evil.example/x");
        assert_eq!(odd.host_str(), Some("lichess.org"));
    }

    #[test]
    fn test_default_rules_present() {
        let config = config("https://lichess.org/sw.js?asset-url=/");
        assert_eq!(config.cache_rules.len(), 1);
    }
}
