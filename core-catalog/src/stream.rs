//! Stream resolution across an ordered list of provider endpoints
//!
//! Each endpoint template is probed in order. A probe fails on transport
//! error, non-2xx status, an "incomplete data" marker in the body, an
//! unparseable body, or a descriptor that is not valid. When every endpoint
//! fails and the id contains `-`, the sequence restarts once with the dashes
//! stripped.

use tracing::{debug, info, instrument, warn};

use crate::client::CatalogClient;
use crate::config::{expand, CatalogConfig};
use crate::error::{CatalogError, Result};
use crate::models::{is_sentinel_id, QualityLevel, StreamDescriptor};
use crate::parse::{has_incomplete_marker, parse_stream_response};

const ID_SEPARATOR: char = '-';

pub struct StreamResolver {
    client: CatalogClient,
    endpoints: Vec<String>,
    default_quality: QualityLevel,
}

impl StreamResolver {
    pub fn new(client: CatalogClient, config: &CatalogConfig) -> Self {
        Self {
            client,
            endpoints: config.stream_endpoints.clone(),
            default_quality: config.default_quality,
        }
    }

    pub fn default_quality(&self) -> QualityLevel {
        self.default_quality
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Resolve a track id to a valid [`StreamDescriptor`].
    ///
    /// # Errors
    ///
    /// - [`CatalogError::InvalidTrackId`] for `""` / `"0"`, without any request
    /// - [`CatalogError::StreamUnavailable`] when every probe failed
    #[instrument(skip(self), fields(quality = %quality))]
    pub async fn resolve(&self, track_id: &str, quality: QualityLevel) -> Result<StreamDescriptor> {
        if is_sentinel_id(track_id) {
            return Err(CatalogError::InvalidTrackId(track_id.to_string()));
        }

        if let Some(descriptor) = self.probe_all(track_id, quality).await {
            return Ok(descriptor);
        }

        if track_id.contains(ID_SEPARATOR) {
            let normalized = track_id.replace(ID_SEPARATOR, "");
            if !is_sentinel_id(&normalized) {
                debug!(normalized = %normalized, "Retrying with normalized track id");
                if let Some(descriptor) = self.probe_all(&normalized, quality).await {
                    return Ok(descriptor);
                }
            }
        }

        warn!("All stream endpoints failed");
        Err(CatalogError::StreamUnavailable {
            track_id: track_id.to_string(),
        })
    }

    /// Resolve with the configured default quality.
    pub async fn resolve_default(&self, track_id: &str) -> Result<StreamDescriptor> {
        self.resolve(track_id, self.default_quality).await
    }

    async fn probe_all(&self, track_id: &str, quality: QualityLevel) -> Option<StreamDescriptor> {
        for (endpoint, template) in self.endpoints.iter().enumerate() {
            let url = expand(&expand(template, "id", track_id), "level", quality.as_str());
            match self.probe(&url).await {
                Ok(descriptor) => {
                    info!(endpoint, "Resolved stream");
                    return Some(descriptor);
                }
                Err(reason) => debug!(endpoint, reason = %reason, "Stream endpoint failed"),
            }
        }
        None
    }

    async fn probe(&self, url: &str) -> std::result::Result<StreamDescriptor, String> {
        let response = self.client.get(url).await.map_err(|e| e.to_string())?;

        if !response.is_success() {
            return Err(format!("HTTP {}", response.status));
        }
        if has_incomplete_marker(&response.body) {
            return Err("incomplete data".to_string());
        }

        let descriptor = parse_stream_response(&response.body).map_err(|e| e.to_string())?;
        if !descriptor.is_valid() {
            return Err(format!(
                "invalid descriptor (status {})",
                descriptor.status_code
            ));
        }
        Ok(descriptor)
    }
}

impl std::fmt::Debug for StreamResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamResolver")
            .field("endpoints", &self.endpoints)
            .field("default_quality", &self.default_quality)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
    use mockall::{mock, Sequence};
    use std::sync::Arc;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn resolver(http: MockHttpClient) -> StreamResolver {
        let config = CatalogConfig::default().with_stream_endpoints([
            "https://a.test/song?ids={id}&level={level}",
            "https://b.test/song?id={id}",
        ]);
        StreamResolver::new(CatalogClient::new(Arc::new(http)), &config)
    }

    fn ok_body(url: &str) -> HttpResponse {
        HttpResponse::new(
            200,
            format!(r#"{{"status": 200, "name": "S", "url": "{}"}}"#, url),
        )
    }

    #[tokio::test]
    async fn test_sentinel_ids_rejected_without_io() {
        let mut http = MockHttpClient::new();
        http.expect_execute().times(0);
        let resolver = resolver(http);

        for id in ["", "0"] {
            assert!(matches!(
                resolver.resolve(id, QualityLevel::Standard).await,
                Err(CatalogError::InvalidTrackId(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_first_endpoint_success() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| req.url == "https://a.test/song?ids=123&level=lossless")
            .times(1)
            .returning(|_| Ok(ok_body("http://cdn/123.flac")));
        let resolver = resolver(http);

        let descriptor = resolver.resolve("123", QualityLevel::Lossless).await.unwrap();
        assert_eq!(descriptor.stream_url, "http://cdn/123.flac");
        assert_eq!(descriptor.secure_stream_url(), "https://cdn/123.flac");
    }

    #[tokio::test]
    async fn test_falls_through_failed_probes_in_order() {
        let mut seq = Sequence::new();
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| req.url.starts_with("https://a.test/"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(HttpResponse::new(200, r#"{"status": 400, "msg": "bad"}"#)));
        http.expect_execute()
            .withf(|req| req.url == "https://b.test/song?id=77")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(ok_body("https://cdn/77.mp3")));
        let resolver = resolver(http);

        let descriptor = resolver.resolve("77", QualityLevel::Standard).await.unwrap();
        assert_eq!(descriptor.stream_url, "https://cdn/77.mp3");
    }

    #[tokio::test]
    async fn test_invalid_descriptor_counts_as_failure() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(2)
            .returning(|_| Ok(HttpResponse::new(200, r#"{"status": 0, "url": ""}"#)));
        let resolver = resolver(http);

        assert!(matches!(
            resolver.resolve("5", QualityLevel::Standard).await,
            Err(CatalogError::StreamUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_normalized_id_retried_once() {
        let mut http = MockHttpClient::new();
        // Original id: both endpoints fail
        http.expect_execute()
            .withf(|req| req.url.contains("12-34"))
            .times(2)
            .returning(|_| Err(BridgeError::Timeout("slow".into())));
        // Normalized id: first endpoint fails, second succeeds
        http.expect_execute()
            .withf(|req| req.url.starts_with("https://a.test/") && req.url.contains("=1234&"))
            .times(1)
            .returning(|_| Ok(HttpResponse::new(503, "")));
        http.expect_execute()
            .withf(|req| req.url == "https://b.test/song?id=1234")
            .times(1)
            .returning(|_| Ok(ok_body("https://cdn/1234.mp3")));
        let resolver = resolver(http);

        let descriptor = resolver.resolve("12-34", QualityLevel::Standard).await.unwrap();
        assert_eq!(descriptor.stream_url, "https://cdn/1234.mp3");
    }

    #[tokio::test]
    async fn test_normalization_happens_at_most_once() {
        let mut http = MockHttpClient::new();
        // 2 endpoints x (original + normalized) and nothing more
        http.expect_execute()
            .times(4)
            .returning(|_| Ok(HttpResponse::new(500, "")));
        let resolver = resolver(http);

        assert!(matches!(
            resolver.resolve("9-9", QualityLevel::Standard).await,
            Err(CatalogError::StreamUnavailable { ref track_id }) if track_id == "9-9"
        ));
    }

    #[tokio::test]
    async fn test_no_normalization_without_separator() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(2)
            .returning(|_| Ok(HttpResponse::new(404, "")));
        let resolver = resolver(http);

        assert!(resolver.resolve("99", QualityLevel::Standard).await.is_err());
    }

    #[tokio::test]
    async fn test_normalized_sentinel_not_probed() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(2)
            .returning(|_| Ok(HttpResponse::new(404, "")));
        let resolver = resolver(http);

        // "0-" normalizes to the sentinel "0"
        assert!(matches!(
            resolver.resolve("0-", QualityLevel::Standard).await,
            Err(CatalogError::StreamUnavailable { .. })
        ));
    }
}
