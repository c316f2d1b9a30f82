//! Key-Value Storage Abstraction
//!
//! Durable preferences-style storage. The core keeps its cached collection
//! snapshot here, so writes must survive process restarts.

use async_trait::async_trait;

use crate::error::Result;

/// Settings storage trait
///
/// Platform implementations:
/// - **Desktop**: SQLite table (`bridge-desktop::SqliteSettingsStore`)
/// - **Android**: SharedPreferences
/// - **iOS**: UserDefaults
///
/// Individual `set_*` calls must be atomic per key. No cross-key transaction
/// is required; concurrent writers resolve as last-write-wins.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn remember(store: &dyn SettingsStore) -> Result<()> {
///     store.set_string("collection.payload", "{...}").await?;
///     store.set_i64("collection.written_at", 1_700_000_000_000).await
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Store an integer value
    async fn set_i64(&self, key: &str, value: i64) -> Result<()>;

    /// Retrieve an integer value
    async fn get_i64(&self, key: &str) -> Result<Option<i64>>;

    /// Delete a setting. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool>;
}
