//! Media player bridge trait.
//!
//! The core does not decode audio. Hosts wrap their native player (Android
//! `MediaPlayer`, AVPlayer, a rodio sink on desktop) behind [`MediaPlayer`].
//! Control calls are synchronous and cheap; anything slow (buffering,
//! preparation) finishes later and is reported through a [`PlayerEvent`] sent
//! on the channel registered with [`MediaPlayer::set_event_sender`].

use crate::error::Result;
use tokio::sync::mpsc;

/// Asynchronous notifications raised by the native player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// `prepare_async` finished and the source can start.
    Prepared,
    /// Playback reached the end of the source.
    Completed,
    /// The native player failed. Codes are passed through verbatim.
    Error { what: i32, extra: i32 },
}

pub type PlayerEventSender = mpsc::UnboundedSender<PlayerEvent>;
pub type PlayerEventReceiver = mpsc::UnboundedReceiver<PlayerEvent>;

/// Create a channel suitable for [`MediaPlayer::set_event_sender`].
pub fn player_event_channel() -> (PlayerEventSender, PlayerEventReceiver) {
    mpsc::unbounded_channel()
}

/// Opaque player capability.
///
/// Implementations must tolerate any call order: querying position or
/// duration on an unprepared player returns `0`, and `reset` is always legal.
pub trait MediaPlayer: Send + Sync {
    /// Register where asynchronous events are delivered. Replaces any earlier sender.
    fn set_event_sender(&self, sender: PlayerEventSender);

    /// Point the player at a stream address. Only valid after `reset`.
    fn set_source(&self, url: &str) -> Result<()>;

    /// Begin asynchronous preparation; completion arrives as [`PlayerEvent::Prepared`].
    fn prepare_async(&self) -> Result<()>;

    fn start(&self) -> Result<()>;

    fn pause(&self) -> Result<()>;

    fn stop(&self) -> Result<()>;

    /// Return to the uninitialised state, dropping the current source.
    fn reset(&self);

    /// Free native resources. The player is unusable afterwards.
    fn release(&self);

    fn current_position_ms(&self) -> u64;

    fn duration_ms(&self) -> u64;

    fn seek_to(&self, position_ms: u64) -> Result<()>;

    fn is_playing(&self) -> bool;
}
