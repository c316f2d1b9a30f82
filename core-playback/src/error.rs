//! # Playback Error Types

use bridge_traits::error::BridgeError;
use core_catalog::CatalogError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The descriptor has no stream address to hand to the player.
    #[error("Invalid stream: {0}")]
    InvalidStream(String),

    /// The host player rejected a control call.
    #[error("Player error: {0}")]
    Player(#[from] BridgeError),

    /// The coordinator task has stopped and no longer accepts commands.
    #[error("Playback coordinator is not running")]
    CoordinatorClosed,

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl PlaybackError {
    /// Returns `true` if the failure concerns a single track and the next
    /// one may well succeed.
    pub fn is_track_failure(&self) -> bool {
        match self {
            PlaybackError::InvalidStream(_) | PlaybackError::Player(_) => true,
            PlaybackError::Catalog(e) => !e.is_silent(),
            PlaybackError::CoordinatorClosed => false,
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
