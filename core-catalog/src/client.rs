//! Shared request plumbing for the resolvers

use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use core_runtime::config::{CoreConfig, DEFAULT_REFERER, DEFAULT_USER_AGENT};
use core_runtime::logging::loggable_url;
use std::sync::Arc;
use tracing::trace;

/// `HttpClient` plus the headers every catalog request carries.
#[derive(Clone)]
pub struct CatalogClient {
    http_client: Arc<dyn HttpClient>,
    user_agent: String,
    referer: Option<String>,
}

impl CatalogClient {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: Some(DEFAULT_REFERER.to_string()),
        }
    }

    pub fn from_core_config(config: &CoreConfig) -> Self {
        Self {
            http_client: Arc::clone(&config.http_client),
            user_agent: config.user_agent.clone(),
            referer: Some(config.referer.clone()),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// `None` omits the header entirely.
    pub fn with_referer(mut self, referer: Option<String>) -> Self {
        self.referer = referer;
        self
    }

    fn request(&self, url: &str) -> HttpRequest {
        let request = HttpRequest::get(url).user_agent(self.user_agent.as_str());
        match &self.referer {
            Some(referer) => request.referer(referer.as_str()),
            None => request,
        }
    }

    /// Single `GET`. Dropping the future cancels the request.
    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        trace!(url = %loggable_url(url), "GET");
        self.http_client.execute(self.request(url)).await
    }
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("user_agent", &self.user_agent)
            .field("referer", &self.referer)
            .finish_non_exhaustive()
    }
}
