//! # Playback Engine
//!
//! State machine over the host [`MediaPlayer`]. Control calls act on the
//! player directly; asynchronous player callbacks arrive as [`PlayerEvent`]s
//! on the receiver returned by [`PlaybackEngine::new`] and are fed back
//! through [`PlaybackEngine::handle_player_event`].
//!
//! The engine never enters a terminal state: after an error it is `Idle` and
//! accepts the next `play`.

use bridge_traits::playback::{player_event_channel, MediaPlayer, PlayerEvent, PlayerEventReceiver};
use core_catalog::StreamDescriptor;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{PlaybackError, Result};
use crate::mode::PlayMode;
use crate::state::{EngineState, PlaybackState};

/// `what` code reported when the player refuses to start a prepared source.
pub const START_FAILED_CODE: i32 = -38;

/// Outcome of a player callback that listeners care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// Preparation finished and output started.
    Ready,
    /// End of source. `looped` is true when SingleLoop restarted it.
    Completed { looped: bool },
    /// The player failed; the engine is back to `Idle`.
    Error { what: i32, extra: i32 },
}

pub struct PlaybackEngine {
    player: Arc<dyn MediaPlayer>,
    state: EngineState,
    mode: PlayMode,
}

impl PlaybackEngine {
    /// Wrap `player` and register a fresh event channel on it.
    pub fn new(player: Arc<dyn MediaPlayer>) -> (Self, PlayerEventReceiver) {
        let (tx, rx) = player_event_channel();
        player.set_event_sender(tx);
        (
            Self {
                player,
                state: EngineState::Idle,
                mode: PlayMode::default(),
            },
            rx,
        )
    }

    pub fn with_mode(mut self, mode: PlayMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PlayMode) {
        if self.mode != mode {
            debug!(from = %self.mode, to = %mode, "Play mode changed");
            self.mode = mode;
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == EngineState::Playing
    }

    pub fn next_index(&self, current: usize, total: usize) -> usize {
        self.mode.next_index(current, total)
    }

    pub fn previous_index(&self, current: usize, total: usize) -> usize {
        self.mode.previous_index(current, total)
    }

    /// Start preparing `descriptor`'s stream.
    ///
    /// Any current source is dropped first. The engine is `Preparing` on
    /// success; output starts when the player reports `Prepared`.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::InvalidStream`] when the stream address is empty;
    ///   the player is not touched and the state is unchanged
    /// - [`PlaybackError::Player`] when the player rejects the source; the
    ///   engine is reset to `Idle`
    pub fn play(&mut self, descriptor: &StreamDescriptor) -> Result<()> {
        if descriptor.stream_url.trim().is_empty() {
            return Err(PlaybackError::InvalidStream(format!(
                "descriptor for {:?} has no stream url",
                descriptor.title
            )));
        }

        let url = descriptor.secure_stream_url();
        self.player.reset();
        if let Err(e) = self
            .player
            .set_source(&url)
            .and_then(|_| self.player.prepare_async())
        {
            warn!(error = %e, "Player rejected source");
            self.player.reset();
            self.state = EngineState::Idle;
            return Err(e.into());
        }

        self.state = EngineState::Preparing;
        debug!(title = %descriptor.title, "Preparing stream");
        Ok(())
    }

    /// Advance the state machine for a player callback.
    ///
    /// Returns `None` for callbacks that no longer apply, such as a
    /// `Prepared` arriving after `stop` or a newer `play`.
    pub fn handle_player_event(&mut self, event: PlayerEvent) -> Option<EngineEvent> {
        match event {
            PlayerEvent::Prepared => {
                if self.state != EngineState::Preparing {
                    debug!(state = ?self.state, "Ignoring stale prepared callback");
                    return None;
                }
                match self.player.start() {
                    Ok(()) => {
                        self.state = EngineState::Playing;
                        info!(mode = %self.mode, "Playback started");
                        Some(EngineEvent::Ready)
                    }
                    Err(e) => {
                        warn!(error = %e, "Player failed to start");
                        Some(self.fail(START_FAILED_CODE, 0))
                    }
                }
            }
            PlayerEvent::Completed => {
                if self.state != EngineState::Playing {
                    debug!(state = ?self.state, "Ignoring completion outside playback");
                    return None;
                }
                if self.mode == PlayMode::SingleLoop {
                    let restarted = self
                        .player
                        .seek_to(0)
                        .and_then(|_| self.player.start());
                    if let Err(e) = restarted {
                        warn!(error = %e, "Failed to restart looped track");
                        return Some(self.fail(START_FAILED_CODE, 0));
                    }
                    debug!("Looping current track");
                    Some(EngineEvent::Completed { looped: true })
                } else {
                    self.state = EngineState::Idle;
                    Some(EngineEvent::Completed { looped: false })
                }
            }
            PlayerEvent::Error { what, extra } => {
                warn!(what, extra, state = ?self.state, "Player error");
                Some(self.fail(what, extra))
            }
        }
    }

    fn fail(&mut self, what: i32, extra: i32) -> EngineEvent {
        self.player.reset();
        self.state = EngineState::Idle;
        EngineEvent::Error { what, extra }
    }

    /// Pause output. No-op unless playing.
    pub fn pause(&mut self) -> Result<()> {
        if self.state == EngineState::Playing {
            self.player.pause()?;
            self.state = EngineState::Paused;
        }
        Ok(())
    }

    /// Resume output. No-op unless paused.
    pub fn resume(&mut self) -> Result<()> {
        if self.state == EngineState::Paused {
            self.player.start()?;
            self.state = EngineState::Playing;
        }
        Ok(())
    }

    /// Stop output from Playing, Paused or Preparing.
    pub fn stop(&mut self) -> Result<()> {
        if self.state.is_prepared() || self.state == EngineState::Preparing {
            let stopped = self.player.stop();
            self.state = EngineState::Stopped;
            stopped?;
        }
        Ok(())
    }

    /// Seek within a prepared source. No-op otherwise.
    pub fn seek_to(&mut self, position_ms: u64) -> Result<()> {
        if self.state.is_prepared() {
            self.player.seek_to(position_ms)?;
        }
        Ok(())
    }

    /// Current position, or `0` without a prepared source.
    pub fn position_ms(&self) -> u64 {
        if self.state.is_prepared() {
            self.player.current_position_ms()
        } else {
            0
        }
    }

    /// Source duration, or `0` without a prepared source.
    pub fn duration_ms(&self) -> u64 {
        if self.state.is_prepared() {
            self.player.duration_ms()
        } else {
            0
        }
    }

    pub fn snapshot(&self) -> PlaybackState {
        PlaybackState {
            is_playing: self.is_playing(),
            position_ms: self.position_ms(),
            duration_ms: self.duration_ms(),
            mode: self.mode,
        }
    }

    /// Free the player. The engine must not be used afterwards.
    pub fn release(&mut self) {
        self.player.release();
        self.state = EngineState::Stopped;
    }
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("state", &self.state)
            .field("mode", &self.mode)
            .finish()
    }
}
