//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, settings
//! storage, clock, media player) into the catalog and playback crates and
//! starts the playback coordinator. Desktop apps typically enable the
//! `desktop-shims` feature (which depends on `bridge-desktop`) and call
//! [`bootstrap_desktop`]; other hosts build a [`CoreConfig`] themselves and
//! call [`CoreService::start`].

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::playback::MediaPlayer;
use core_catalog::{
    is_playable_collection, parse_custom_collection, CatalogClient, CatalogConfig, CatalogError,
    CollectionCache, CollectionResolver, StreamResolver, Track, TrackSearch,
};
use core_playback::{
    CoordinatorHandle, EventBusListener, PlaybackConfig, PlaybackCoordinator, PlaybackListener,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use tracing::info;

/// Primary façade exposed to host applications.
///
/// Must be started from within a tokio runtime.
pub struct CoreService {
    config: CoreConfig,
    event_bus: EventBus,
    cache: Arc<CollectionCache>,
    search: TrackSearch,
    coordinator: PlaybackCoordinator,
}

impl CoreService {
    /// Start with default catalog and playback settings. Listener callbacks
    /// are republished on the service's event bus.
    pub fn start(config: CoreConfig, player: Arc<dyn MediaPlayer>) -> Result<Self> {
        Self::start_with(
            config,
            CatalogConfig::default(),
            PlaybackConfig::default(),
            player,
            None,
        )
    }

    /// Start with explicit settings. When `listener` is `None`, an
    /// [`EventBusListener`] over [`event_bus`](Self::event_bus) is used.
    pub fn start_with(
        config: CoreConfig,
        catalog: CatalogConfig,
        playback: PlaybackConfig,
        player: Arc<dyn MediaPlayer>,
        listener: Option<Arc<dyn PlaybackListener>>,
    ) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer_size);
        let client = CatalogClient::from_core_config(&config);
        let cache = Arc::new(CollectionCache::with_namespace(
            Arc::clone(&config.settings_store),
            Arc::clone(&config.clock),
            &catalog.cache_namespace,
            catalog.cache_ttl(),
        ));

        let collections = Arc::new(CollectionResolver::new(
            client.clone(),
            Arc::clone(&cache),
            &catalog,
        ));
        let streams = Arc::new(StreamResolver::new(client.clone(), &catalog));
        let search = TrackSearch::new(client, &catalog);

        let listener = listener.unwrap_or_else(|| {
            Arc::new(EventBusListener::new(event_bus.clone())) as Arc<dyn PlaybackListener>
        });
        let coordinator =
            PlaybackCoordinator::spawn(collections, streams, player, listener, playback);

        info!(
            endpoints = catalog.stream_endpoints.len(),
            "Core service started"
        );

        Ok(Self {
            config,
            event_bus,
            cache,
            search,
            coordinator,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Handle for transport controls and collection loading.
    pub fn playback(&self) -> CoordinatorHandle {
        self.coordinator.handle()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Subscribe to events published from now on.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn collection_cache(&self) -> &Arc<CollectionCache> {
        &self.cache
    }

    /// Keyword search. Empty on any failure.
    pub async fn search(&self, keyword: &str) -> Vec<Track> {
        self.search.search(keyword).await
    }

    /// Parse a user-supplied collection document and make it the queue.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::Parse`] for malformed documents
    /// - [`CatalogError::EmptyCollection`] when it contains no tracks
    pub async fn import_collection(&self, json: &str) -> Result<()> {
        let collection = parse_custom_collection(json)?;
        if !is_playable_collection(&collection) {
            return Err(CatalogError::EmptyCollection {
                collection_id: collection.id,
            }
            .into());
        }
        info!(tracks = collection.len(), "Importing collection");
        self.playback().set_collection(collection).await?;
        Ok(())
    }

    /// Release the player and wait for the coordinator to stop.
    pub async fn shutdown(self) -> Result<()> {
        self.coordinator.handle().shutdown().await?;
        self.coordinator.wait().await?;
        Ok(())
    }
}

/// Convenience bootstrapper for desktop hosts: SQLite settings under the
/// platform data directory and a reqwest transport.
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(player: Arc<dyn MediaPlayer>) -> Result<CoreService> {
    let store = bridge_desktop::SqliteSettingsStore::open_default()
        .await
        .map_err(|err| CoreError::InitializationFailed(err.to_string()))?;
    let config = CoreConfig::builder()
        .settings_store(Arc::new(store))
        .build()?;
    CoreService::start(config, player)
}
