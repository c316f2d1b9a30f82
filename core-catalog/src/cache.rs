//! Persistent collection cache
//!
//! One collection snapshot plus the time it was written, stored in the
//! host's `SettingsStore` under a fixed namespace:
//!
//! ```text
//! <namespace>.payload     JSON-encoded Collection
//! <namespace>.written_at  unix epoch milliseconds
//! ```
//!
//! Reads never fail: a missing, expired or undecodable entry is a miss.

use bridge_traits::storage::SettingsStore;
use bridge_traits::time::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::{DEFAULT_CACHE_NAMESPACE, DEFAULT_CACHE_TTL_SECS};
use crate::error::{CatalogError, Result};
use crate::models::Collection;

pub struct CollectionCache {
    store: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    payload_key: String,
    written_at_key: String,
    ttl: Duration,
}

impl CollectionCache {
    pub fn new(store: Arc<dyn SettingsStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_namespace(
            store,
            clock,
            DEFAULT_CACHE_NAMESPACE,
            Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        )
    }

    pub fn with_namespace(
        store: Arc<dyn SettingsStore>,
        clock: Arc<dyn Clock>,
        namespace: &str,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            payload_key: format!("{}.payload", namespace),
            written_at_key: format!("{}.written_at", namespace),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Replace the cached snapshot and stamp it with the current time.
    #[instrument(skip(self, collection), fields(collection_id = collection.id))]
    pub async fn save(&self, collection: &Collection) -> Result<()> {
        let payload = serde_json::to_string(collection)
            .map_err(|e| CatalogError::Storage(format!("Failed to encode collection: {}", e)))?;

        self.store
            .set_string(&self.payload_key, &payload)
            .await
            .map_err(|e| CatalogError::Storage(e.to_string()))?;
        self.store
            .set_i64(&self.written_at_key, self.clock.unix_timestamp_millis())
            .await
            .map_err(|e| CatalogError::Storage(e.to_string()))?;

        debug!(tracks = collection.len(), "Cached collection");
        Ok(())
    }

    /// The cached collection, if present, decodable and younger than the TTL.
    pub async fn load(&self) -> Option<Collection> {
        if !self.is_valid().await {
            return None;
        }

        let payload = match self.store.get_string(&self.payload_key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read cached collection");
                return None;
            }
        };

        match serde_json::from_str::<Collection>(&payload) {
            Ok(collection) => {
                debug!(collection_id = collection.id, "Loaded collection from cache");
                Some(collection)
            }
            Err(e) => {
                warn!(error = %e, "Discarding undecodable cached collection");
                None
            }
        }
    }

    /// Whether a non-expired timestamp exists. Does not decode the payload.
    pub async fn is_valid(&self) -> bool {
        let written_at = match self.store.get_i64(&self.written_at_key).await {
            Ok(Some(ts)) => ts,
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %e, "Failed to read cache timestamp");
                return false;
            }
        };

        let age_ms = self.clock.unix_timestamp_millis().saturating_sub(written_at);
        let fresh = age_ms <= self.ttl.as_millis() as i64;
        if !fresh {
            debug!(age_ms, "Cached collection expired");
        }
        fresh
    }

    pub async fn clear(&self) -> Result<()> {
        for key in [&self.payload_key, &self.written_at_key] {
            self.store
                .delete(key)
                .await
                .map_err(|e| CatalogError::Storage(e.to_string()))?;
        }
        debug!("Cleared collection cache");
        Ok(())
    }
}
