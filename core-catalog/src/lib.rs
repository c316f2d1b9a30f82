//! # Core Catalog Module
//!
//! Turns collection ids and track ids into playable data:
//! - [`CollectionResolver`]: fetch a collection with bounded retries,
//!   request supersession and a persisted fallback copy
//! - [`CollectionCache`]: one TTL-bounded snapshot in the host `SettingsStore`
//! - [`StreamResolver`]: probe an ordered list of provider endpoints for a
//!   playable stream address
//! - [`TrackSearch`]: keyword search, empty on any failure
//! - [`parse_custom_collection`]: import a user-supplied collection document
//!
//! ## Usage
//!
//! ```ignore
//! use core_catalog::{CatalogClient, CatalogConfig, CollectionCache, CollectionResolver};
//!
//! let client = CatalogClient::from_core_config(&core_config);
//! let cache = Arc::new(CollectionCache::new(
//!     core_config.settings_store.clone(),
//!     core_config.clock.clone(),
//! ));
//! let resolver = CollectionResolver::new(client, cache, &CatalogConfig::default());
//!
//! let resolved = resolver.resolve(3778678, false).await?;
//! println!("{} tracks from {:?}", resolved.collection.len(), resolved.source);
//! ```

pub mod cache;
pub mod client;
pub mod collection;
pub mod config;
pub mod error;
pub mod import;
pub mod models;
mod parse;
pub mod search;
pub mod stream;

pub use cache::CollectionCache;
pub use client::CatalogClient;
pub use collection::{CollectionRequest, CollectionResolver};
pub use config::CatalogConfig;
pub use error::{CatalogError, Result};
pub use import::{is_playable_collection, parse_custom_collection};
pub use models::{
    Collection, CollectionSource, QualityLevel, ResolvedCollection, StreamDescriptor, Track,
};
pub use search::TrackSearch;
pub use stream::StreamResolver;
