//! Collection resolution with retry, supersession and cache fallback
//!
//! ## Flow
//!
//! ```text
//! resolve(id, force)
//!   ├─ epoch += 1, cancel previous in-flight request
//!   ├─ !force && cache hit ──────────────────────────> Ok(Cache)
//!   ├─ attempt 0..=max_retries (sleep retry_delay between attempts)
//!   │    ├─ non-empty collection ─ write cache ──────> Ok(Network)
//!   │    └─ transport / status / busy / parse / empty ─> next attempt
//!   ├─ cache hit ────────────────────────────────────> Ok(CacheFallback)
//!   └─ EmptyCollection | Unreachable
//! ```
//!
//! Every await point races against the request's `CancellationToken`, and
//! the epoch is re-checked after each one. A resolve that lost its epoch
//! returns [`CatalogError::Superseded`] and has no side effects.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::cache::CollectionCache;
use crate::client::CatalogClient;
use crate::config::{expand, CatalogConfig};
use crate::error::{CatalogError, Result};
use crate::models::{Collection, CollectionSource, ResolvedCollection};
use crate::parse::{parse_catalog_response, CatalogPayload};

/// Why a single attempt did not yield a usable collection.
#[derive(Debug)]
enum AttemptFailure {
    Transport(String),
    Status(u16),
    Busy,
    Parse(String),
    Empty,
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptFailure::Transport(e) => write!(f, "transport: {}", e),
            AttemptFailure::Status(status) => write!(f, "HTTP {}", status),
            AttemptFailure::Busy => f.write_str("server busy"),
            AttemptFailure::Parse(e) => write!(f, "unparseable response: {}", e),
            AttemptFailure::Empty => f.write_str("no tracks"),
        }
    }
}

/// Epoch and cancellation token reserved for one resolve.
#[derive(Debug, Clone)]
pub struct CollectionRequest {
    epoch: u64,
    token: CancellationToken,
}

impl CollectionRequest {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

pub struct CollectionResolver {
    client: CatalogClient,
    cache: Arc<CollectionCache>,
    url_template: String,
    max_retries: u32,
    retry_delay: Duration,
    epoch: AtomicU64,
    in_flight: Mutex<CancellationToken>,
}

impl CollectionResolver {
    pub fn new(client: CatalogClient, cache: Arc<CollectionCache>, config: &CatalogConfig) -> Self {
        Self {
            client,
            cache,
            url_template: config.collection_url_template.clone(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
            epoch: AtomicU64::new(0),
            in_flight: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn cache(&self) -> &Arc<CollectionCache> {
        &self.cache
    }

    /// Epoch of the most recent resolve.
    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Cancel the in-flight request, if any. Its `resolve` returns
    /// [`CatalogError::Cancelled`].
    pub fn cancel_current_request(&self) {
        self.in_flight.lock().cancel();
        debug!(epoch = self.current_epoch(), "Cancelled in-flight collection request");
    }

    /// Allocate the next epoch and swap in a fresh token, cancelling the
    /// previous request.
    ///
    /// Callers that hand the actual resolve to another task reserve the
    /// epoch here so supersession follows call order, not task scheduling.
    pub fn begin_request(&self) -> CollectionRequest {
        let token = CancellationToken::new();
        let mut in_flight = self.in_flight.lock();
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let previous = std::mem::replace(&mut *in_flight, token.clone());
        previous.cancel();
        CollectionRequest { epoch, token }
    }

    /// Resolve a collection by id.
    ///
    /// Starting a resolve supersedes any earlier one still in flight, cache
    /// hits included.
    pub async fn resolve(&self, collection_id: i64, force_refresh: bool) -> Result<ResolvedCollection> {
        let request = self.begin_request();
        self.resolve_request(request, collection_id, force_refresh)
            .await
    }

    /// Resolve under an epoch reserved with [`begin_request`](Self::begin_request).
    #[instrument(skip(self, request), fields(epoch = request.epoch))]
    pub async fn resolve_request(
        &self,
        request: CollectionRequest,
        collection_id: i64,
        force_refresh: bool,
    ) -> Result<ResolvedCollection> {
        let CollectionRequest { epoch, token } = request;
        self.ensure_current(epoch)?;

        if !force_refresh {
            let cached = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(self.interrupted(epoch)),
                cached = self.cache.load() => cached,
            };
            self.ensure_current(epoch)?;
            if let Some(collection) = cached {
                if collection.id != collection_id {
                    debug!(
                        requested = collection_id,
                        cached = collection.id,
                        "Cached snapshot belongs to a different collection"
                    );
                }
                info!(tracks = collection.len(), "Serving collection from cache");
                return Ok(ResolvedCollection {
                    collection,
                    source: CollectionSource::Cache,
                });
            }
        }

        let attempts = self.max_retries + 1;
        let mut last_failure = AttemptFailure::Transport("no attempt made".to_string());

        for attempt in 0..attempts {
            if attempt > 0 {
                debug!(attempt, delay_ms = self.retry_delay.as_millis() as u64, "Retrying");
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(self.interrupted(epoch)),
                    _ = tokio::time::sleep(self.retry_delay) => {}
                }
            }
            self.ensure_current(epoch)?;

            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(self.interrupted(epoch)),
                outcome = self.fetch_once(collection_id) => outcome,
            };
            self.ensure_current(epoch)?;

            match outcome {
                Ok(collection) => {
                    if let Err(e) = self.cache.save(&collection).await {
                        warn!(error = %e, "Failed to write collection cache");
                    }
                    self.ensure_current(epoch)?;
                    info!(tracks = collection.len(), attempt, "Resolved collection");
                    return Ok(ResolvedCollection {
                        collection,
                        source: CollectionSource::Network,
                    });
                }
                Err(failure) => {
                    warn!(attempt, failure = %failure, "Collection attempt failed");
                    last_failure = failure;
                }
            }
        }

        if let Some(collection) = self.cache.load().await {
            self.ensure_current(epoch)?;
            warn!(
                tracks = collection.len(),
                "Retries exhausted, falling back to cached collection"
            );
            return Ok(ResolvedCollection {
                collection,
                source: CollectionSource::CacheFallback,
            });
        }
        self.ensure_current(epoch)?;

        Err(match last_failure {
            AttemptFailure::Empty => CatalogError::EmptyCollection { collection_id },
            _ => CatalogError::Unreachable {
                collection_id,
                attempts,
            },
        })
    }

    fn ensure_current(&self, epoch: u64) -> Result<()> {
        let current = self.current_epoch();
        if current == epoch {
            Ok(())
        } else {
            debug!(epoch, current, "Discarding superseded collection request");
            Err(CatalogError::Superseded { epoch, current })
        }
    }

    /// Error for a request whose token fired.
    fn interrupted(&self, epoch: u64) -> CatalogError {
        match self.ensure_current(epoch) {
            Ok(()) => CatalogError::Cancelled,
            Err(superseded) => superseded,
        }
    }

    async fn fetch_once(&self, collection_id: i64) -> std::result::Result<Collection, AttemptFailure> {
        let url = expand(&self.url_template, "id", &collection_id.to_string());

        let response = self
            .client
            .get(&url)
            .await
            .map_err(|e| AttemptFailure::Transport(e.to_string()))?;

        if !response.is_success() {
            return Err(AttemptFailure::Status(response.status));
        }

        match parse_catalog_response(&response.body, collection_id) {
            Ok(CatalogPayload::Busy) => Err(AttemptFailure::Busy),
            Ok(CatalogPayload::Collection(collection)) if collection.is_empty() => {
                Err(AttemptFailure::Empty)
            }
            Ok(CatalogPayload::Collection(collection)) => Ok(collection),
            Err(e) => Err(AttemptFailure::Parse(e.to_string())),
        }
    }
}

impl std::fmt::Debug for CollectionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionResolver")
            .field("url_template", &self.url_template)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("epoch", &self.current_epoch())
            .finish()
    }
}
