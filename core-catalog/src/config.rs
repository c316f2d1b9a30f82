//! Catalog configuration
//!
//! Endpoint templates use `{id}`, `{level}` and `{keyword}` placeholders.
//! Values are URL-encoded before substitution.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::QualityLevel;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 3_000;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 6 * 60 * 60;
pub const DEFAULT_CACHE_NAMESPACE: &str = "catalog.collection_cache";

/// Resolver settings.
///
/// Deserializable so hosts can ship endpoint lists in their own config
/// files; every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Collection detail endpoint, `{id}` is the numeric collection id
    pub collection_url_template: String,
    /// Stream endpoints, probed in order
    pub stream_endpoints: Vec<String>,
    /// Search endpoint, `{keyword}` is the query
    pub search_url_template: String,
    /// Extra attempts after the first collection fetch
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub cache_ttl_secs: u64,
    /// Key prefix for the cached collection in the settings store
    pub cache_namespace: String,
    pub default_quality: QualityLevel,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            collection_url_template: "https://music.163.com/api/playlist/detail?id={id}"
                .to_string(),
            stream_endpoints: vec![
                "https://api.example.com/netease/song?ids={id}&level={level}&type=json"
                    .to_string(),
                "https://api.example.com/aggregate/song?id={id}&media=netease&type=url"
                    .to_string(),
            ],
            search_url_template:
                "https://api.bzqll.com/music/tencent/search?key={keyword}&limit=20&type=song"
                    .to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            cache_namespace: DEFAULT_CACHE_NAMESPACE.to_string(),
            default_quality: QualityLevel::default(),
        }
    }
}

impl CatalogConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn with_stream_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stream_endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_collection_url_template(mut self, template: impl Into<String>) -> Self {
        self.collection_url_template = template.into();
        self
    }

    pub fn with_search_url_template(mut self, template: impl Into<String>) -> Self {
        self.search_url_template = template.into();
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_secs = ttl.as_secs();
        self
    }
}

/// Substitute `{name}` with the URL-encoded `value`.
pub(crate) fn expand(template: &str, name: &str, value: &str) -> String {
    template.replace(
        &format!("{{{}}}", name),
        urlencoding::encode(value).as_ref(),
    )
}
