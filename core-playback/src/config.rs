//! # Coordinator Configuration

use serde::{Deserialize, Serialize};

use crate::mode::PlayMode;

pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 3;
pub const DEFAULT_COMMAND_BUFFER: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Failed track attempts tolerated before giving up and reporting once.
    pub max_consecutive_failures: u32,

    /// Capacity of the host command channel.
    pub command_buffer: usize,

    pub initial_mode: PlayMode,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            command_buffer: DEFAULT_COMMAND_BUFFER,
            initial_mode: PlayMode::Sequential,
        }
    }
}

impl PlaybackConfig {
    pub fn with_initial_mode(mut self, mode: PlayMode) -> Self {
        self.initial_mode = mode;
        self
    }

    pub fn with_max_consecutive_failures(mut self, max: u32) -> Self {
        self.max_consecutive_failures = max.max(1);
        self
    }
}
