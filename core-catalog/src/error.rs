//! Error types for collection and stream resolution

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Catalog errors
///
/// Resolvers map every transport, storage and JSON failure into this enum
/// before it crosses their async boundary.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Empty or sentinel (`"0"`) track id, rejected before any request
    #[error("Invalid track id: {0:?}")]
    InvalidTrackId(String),

    /// The catalog answered but the collection has no tracks
    #[error("Collection {collection_id} has no tracks")]
    EmptyCollection { collection_id: i64 },

    /// Every attempt failed and no cached copy exists
    #[error("Collection {collection_id} unreachable after {attempts} attempts")]
    Unreachable { collection_id: i64, attempts: u32 },

    /// Every stream endpoint failed, including the normalized id retry
    #[error("No playable stream for track {track_id}")]
    StreamUnavailable { track_id: String },

    /// A newer resolve took over while this one was in flight
    #[error("Request epoch {epoch} superseded by epoch {current}")]
    Superseded { epoch: u64, current: u64 },

    /// `cancel_current_request` was called
    #[error("Request cancelled")]
    Cancelled,

    #[error("Transport error: {0}")]
    Transport(#[from] BridgeError),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CatalogError {
    /// Outcomes the caller should drop without telling the user.
    pub fn is_silent(&self) -> bool {
        matches!(self, CatalogError::Superseded { .. } | CatalogError::Cancelled)
    }

    /// Failures worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::Transport(e) => e.is_transient(),
            CatalogError::Parse(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_errors() {
        assert!(CatalogError::Cancelled.is_silent());
        assert!(CatalogError::Superseded { epoch: 1, current: 2 }.is_silent());
        assert!(!CatalogError::EmptyCollection { collection_id: 1 }.is_silent());
    }

    #[test]
    fn test_transient_errors() {
        assert!(CatalogError::Transport(BridgeError::Timeout("slow".into())).is_transient());
        assert!(CatalogError::Parse("bad json".into()).is_transient());
        assert!(!CatalogError::InvalidTrackId("0".into()).is_transient());
        assert!(!CatalogError::Storage("disk".into()).is_transient());
    }

    #[test]
    fn test_display() {
        let err = CatalogError::Unreachable {
            collection_id: 42,
            attempts: 4,
        };
        assert_eq!(err.to_string(), "Collection 42 unreachable after 4 attempts");
    }
}
