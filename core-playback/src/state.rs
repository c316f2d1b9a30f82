//! Engine lifecycle state and the published playback snapshot

use serde::{Deserialize, Serialize};

use crate::mode::PlayMode;

/// Lifecycle of [`PlaybackEngine`](crate::engine::PlaybackEngine).
///
/// ```text
/// Idle ──play──> Preparing ──Prepared──> Playing <──resume/pause──> Paused
///   ^                │                      │                         │
///   └── error ───────┴──── Completed ───────┘        stop ──> Stopped ┘
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    #[default]
    Idle,
    Preparing,
    Playing,
    Paused,
    Stopped,
}

impl EngineState {
    /// Playing or Paused: the player has a prepared source.
    pub fn is_prepared(&self) -> bool {
        matches!(self, EngineState::Playing | EngineState::Paused)
    }
}

/// Snapshot handed to listeners. Recomputed on demand, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub mode: PlayMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepared_states() {
        assert!(EngineState::Playing.is_prepared());
        assert!(EngineState::Paused.is_prepared());
        assert!(!EngineState::Idle.is_prepared());
        assert!(!EngineState::Preparing.is_prepared());
        assert!(!EngineState::Stopped.is_prepared());
    }

    #[test]
    fn test_default_state() {
        let state = PlaybackState::default();
        assert!(!state.is_playing);
        assert_eq!(state.mode, PlayMode::Sequential);
    }
}
