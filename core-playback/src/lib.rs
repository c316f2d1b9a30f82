//! # Playback Module
//!
//! Drives the host's opaque player through a collection.
//!
//! ## Overview
//!
//! This module handles:
//! - Play mode policy for next/previous selection ([`PlayMode`])
//! - The player state machine ([`PlaybackEngine`])
//! - Orchestration of collection loading, stream resolution and bounded
//!   auto-advance on failure ([`PlaybackCoordinator`])
//! - The presentation contract ([`PlaybackListener`]) and an adapter that
//!   republishes it on the core event bus ([`EventBusListener`])

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod listener;
pub mod mode;
pub mod state;

pub use config::PlaybackConfig;
pub use coordinator::{CoordinatorHandle, CoordinatorSnapshot, PlaybackCoordinator};
pub use engine::{EngineEvent, PlaybackEngine};
pub use error::{PlaybackError, Result};
pub use listener::{EventBusListener, NoopListener, PlaybackListener};
pub use mode::PlayMode;
pub use state::{EngineState, PlaybackState};
