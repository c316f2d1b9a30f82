//! Keyword track search

use tracing::{debug, instrument, warn};

use crate::client::CatalogClient;
use crate::config::{expand, CatalogConfig};
use crate::models::Track;
use crate::parse::parse_search_response;

pub struct TrackSearch {
    client: CatalogClient,
    url_template: String,
}

impl TrackSearch {
    pub fn new(client: CatalogClient, config: &CatalogConfig) -> Self {
        Self {
            client,
            url_template: config.search_url_template.clone(),
        }
    }

    /// Search by keyword. Any failure yields an empty list.
    #[instrument(skip(self))]
    pub async fn search(&self, keyword: &str) -> Vec<Track> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Vec::new();
        }

        let url = expand(&self.url_template, "keyword", keyword);
        let response = match self.client.get(&url).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                warn!(status = response.status, "Search request rejected");
                return Vec::new();
            }
            Err(e) => {
                warn!(error = %e, "Search request failed");
                return Vec::new();
            }
        };

        match parse_search_response(&response.body) {
            Ok(tracks) => {
                debug!(results = tracks.len(), "Search completed");
                tracks
            }
            Err(e) => {
                warn!(error = %e, "Failed to parse search results");
                Vec::new()
            }
        }
    }
}
