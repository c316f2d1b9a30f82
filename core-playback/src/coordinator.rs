//! # Playback Coordinator
//!
//! A single task owns the collection, the current index, the failure counter
//! and the [`PlaybackEngine`]. Everything that mutates them is serialised
//! through one `select!` loop:
//!
//! ```text
//!   CoordinatorHandle ──Command──┐
//!   resolver tasks ──Completion──┼──> coordinator task ──> PlaybackListener
//!   MediaPlayer ───PlayerEvent───┘           │
//!                                            └──> PlaybackEngine ──> MediaPlayer
//! ```
//!
//! Collection and stream resolution run in spawned tasks. Each stream
//! resolution carries a generation number and a `CancellationToken`;
//! selecting another track cancels the previous token, and any result whose
//! generation is not current is dropped. Collection loads reserve their
//! resolver epoch before spawning and carry a load generation, so neither a
//! later load nor an imported collection can be overwritten by an older one.
//!
//! ## Failure containment
//!
//! A track that cannot be resolved or played counts as a consecutive
//! failure. Below the bound the coordinator moves on to the mode-derived
//! next index, unless that would return to the index the run started from.
//! Otherwise one error reaches the listener and the counter resets. A track
//! that starts preparing resets the counter.

use bridge_traits::playback::{MediaPlayer, PlayerEvent, PlayerEventReceiver};
use core_catalog::{
    CatalogError, Collection, CollectionResolver, ResolvedCollection, StreamDescriptor,
    StreamResolver,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::PlaybackConfig;
use crate::engine::{EngineEvent, PlaybackEngine};
use crate::error::{PlaybackError, Result};
use crate::listener::PlaybackListener;
use crate::mode::PlayMode;
use crate::state::{EngineState, PlaybackState};

/// Requests accepted by the coordinator task.
#[derive(Debug)]
enum Command {
    LoadCollection { collection_id: i64, force_refresh: bool },
    SetCollection(Collection),
    PlayAt(usize),
    Next,
    Previous,
    TogglePlayPause,
    SetMode(PlayMode),
    Seek(u64),
    Stop,
    Snapshot(oneshot::Sender<CoordinatorSnapshot>),
    Shutdown,
}

/// Results posted back by spawned resolver tasks.
enum Completion {
    Collection {
        generation: u64,
        result: std::result::Result<ResolvedCollection, CatalogError>,
    },
    Stream {
        generation: u64,
        attempt: Attempt,
        result: std::result::Result<StreamDescriptor, CatalogError>,
    },
}

/// One try at a track. `origin` is where the current failure run started.
#[derive(Debug, Clone, Copy)]
struct Attempt {
    index: usize,
    origin: usize,
}

/// Point-in-time view of the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorSnapshot {
    pub collection: Option<Collection>,
    pub current_index: Option<usize>,
    pub playback: PlaybackState,
    pub engine_state: EngineState,
    pub consecutive_failures: u32,
    /// A stream resolution is in flight.
    pub resolving: bool,
}

// ============================================================================
// Handle
// ============================================================================

/// Cloneable front door to a running coordinator.
///
/// Every method only enqueues a command; effects are reported through the
/// [`PlaybackListener`]. Methods fail with [`PlaybackError::CoordinatorClosed`]
/// once the task has stopped.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PlaybackError::CoordinatorClosed)
    }

    /// Resolve a collection and make it the queue. Cached copies are used
    /// unless `force_refresh` is set.
    pub async fn load_collection(&self, collection_id: i64, force_refresh: bool) -> Result<()> {
        self.send(Command::LoadCollection {
            collection_id,
            force_refresh,
        })
        .await
    }

    /// Replace the queue with an already-built collection, e.g. an import.
    pub async fn set_collection(&self, collection: Collection) -> Result<()> {
        self.send(Command::SetCollection(collection)).await
    }

    /// Out-of-range indices are ignored.
    pub async fn play_at(&self, index: usize) -> Result<()> {
        self.send(Command::PlayAt(index)).await
    }

    pub async fn next(&self) -> Result<()> {
        self.send(Command::Next).await
    }

    pub async fn previous(&self) -> Result<()> {
        self.send(Command::Previous).await
    }

    /// Pause when playing, resume when paused, otherwise start the current
    /// (or first) track.
    pub async fn toggle_play_pause(&self) -> Result<()> {
        self.send(Command::TogglePlayPause).await
    }

    pub async fn set_mode(&self, mode: PlayMode) -> Result<()> {
        self.send(Command::SetMode(mode)).await
    }

    pub async fn seek(&self, position_ms: u64) -> Result<()> {
        self.send(Command::Seek(position_ms)).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.send(Command::Stop).await
    }

    pub async fn snapshot(&self) -> Result<CoordinatorSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx)).await?;
        rx.await.map_err(|_| PlaybackError::CoordinatorClosed)
    }

    /// Release the player and end the task.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }
}

// ============================================================================
// Coordinator
// ============================================================================

pub struct PlaybackCoordinator {
    handle: CoordinatorHandle,
    join_handle: JoinHandle<()>,
}

impl PlaybackCoordinator {
    /// Spawn the coordinator task on the current tokio runtime.
    pub fn spawn(
        collections: Arc<CollectionResolver>,
        streams: Arc<StreamResolver>,
        player: Arc<dyn MediaPlayer>,
        listener: Arc<dyn PlaybackListener>,
        config: PlaybackConfig,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (engine, player_events) = PlaybackEngine::new(player);

        let state = CoordinatorState {
            collections,
            streams,
            engine: engine.with_mode(config.initial_mode),
            listener,
            completions: completion_tx,
            collection: None,
            current_index: None,
            consecutive_failures: 0,
            max_failures: config.max_consecutive_failures.max(1),
            generation: 0,
            pending: None,
            load_generation: 0,
        };

        let join_handle = tokio::spawn(run(state, command_rx, completion_rx, player_events));

        Self {
            handle: CoordinatorHandle {
                commands: command_tx,
            },
            join_handle,
        }
    }

    pub fn handle(&self) -> CoordinatorHandle {
        self.handle.clone()
    }

    /// Wait for the task to end after [`CoordinatorHandle::shutdown`].
    pub async fn wait(self) -> Result<()> {
        drop(self.handle);
        if let Err(err) = self.join_handle.await {
            if err.is_cancelled() {
                warn!("Coordinator task cancelled: {err}");
                return Ok(());
            }
            error!("Coordinator task failed: {err}");
            return Err(PlaybackError::CoordinatorClosed);
        }
        Ok(())
    }
}

async fn run(
    mut state: CoordinatorState,
    mut commands: mpsc::Receiver<Command>,
    mut completions: mpsc::UnboundedReceiver<Completion>,
    mut player_events: PlayerEventReceiver,
) {
    info!(mode = %state.engine.mode(), "Starting playback coordinator");

    loop {
        // Player callbacks and completions already queued are applied
        // before the next host command observes the state.
        tokio::select! {
            biased;
            Some(event) = player_events.recv() => state.handle_player_event(event),
            Some(completion) = completions.recv() => state.handle_completion(completion),
            command = commands.recv() => match command {
                Some(Command::Shutdown) | None => break,
                Some(command) => state.handle_command(command),
            },
        }
    }

    state.shutdown();
    info!("Playback coordinator stopped");
}

struct CoordinatorState {
    collections: Arc<CollectionResolver>,
    streams: Arc<StreamResolver>,
    engine: PlaybackEngine,
    listener: Arc<dyn PlaybackListener>,
    completions: mpsc::UnboundedSender<Completion>,
    collection: Option<Collection>,
    current_index: Option<usize>,
    consecutive_failures: u32,
    max_failures: u32,
    generation: u64,
    pending: Option<CancellationToken>,
    /// Bumped by every collection load or replacement.
    load_generation: u64,
}

impl CoordinatorState {
    fn handle_command(&mut self, command: Command) {
        debug!(?command, "Coordinator command");
        match command {
            Command::LoadCollection {
                collection_id,
                force_refresh,
            } => self.load_collection(collection_id, force_refresh),
            Command::SetCollection(collection) => {
                // A load still in flight must not overwrite this one
                self.load_generation += 1;
                self.collections.cancel_current_request();
                self.apply_collection(collection);
            }
            Command::PlayAt(index) => self.play_at(index),
            Command::Next => self.next(),
            Command::Previous => self.previous(),
            Command::TogglePlayPause => self.toggle_play_pause(),
            Command::SetMode(mode) => {
                self.engine.set_mode(mode);
                self.publish_state();
            }
            Command::Seek(position_ms) => {
                let result = self.engine.seek_to(position_ms);
                self.report(result);
                self.publish_state();
            }
            Command::Stop => {
                self.cancel_pending();
                let result = self.engine.stop();
                self.report(result);
                self.publish_state();
            }
            Command::Snapshot(reply) => {
                // The caller may have stopped waiting
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown => {}
        }
    }

    // ------------------------------------------------------------------------
    // Collections
    // ------------------------------------------------------------------------

    fn load_collection(&mut self, collection_id: i64, force_refresh: bool) {
        self.load_generation += 1;
        let generation = self.load_generation;
        // Reserved here so a later load always supersedes this one
        let request = self.collections.begin_request();

        let resolver = Arc::clone(&self.collections);
        let completions = self.completions.clone();
        tokio::spawn(
            async move {
                let result = resolver
                    .resolve_request(request, collection_id, force_refresh)
                    .await;
                let _ = completions.send(Completion::Collection { generation, result });
            }
            .instrument(info_span!("load_collection", collection_id, force_refresh)),
        );
    }

    fn apply_collection(&mut self, collection: Collection) {
        self.cancel_pending();
        info!(
            collection_id = collection.id,
            tracks = collection.len(),
            "Collection replaced"
        );
        self.listener.on_collection_updated(&collection);
        self.collection = Some(collection);
        self.current_index = None;
        self.consecutive_failures = 0;
    }

    fn total(&self) -> usize {
        self.collection.as_ref().map_or(0, Collection::len)
    }

    // ------------------------------------------------------------------------
    // Track selection
    // ------------------------------------------------------------------------

    fn play_at(&mut self, index: usize) {
        let total = self.total();
        if index >= total {
            warn!(index, total, "Ignoring out-of-range track index");
            return;
        }
        self.start_attempt(Attempt {
            index,
            origin: index,
        });
    }

    fn next(&mut self) {
        let total = self.total();
        if total == 0 {
            return;
        }
        let index = match self.current_index {
            Some(current) => self.engine.next_index(current, total),
            None => 0,
        };
        self.play_at(index);
    }

    fn previous(&mut self) {
        let total = self.total();
        if total == 0 {
            return;
        }
        let index = match self.current_index {
            Some(current) => self.engine.previous_index(current, total),
            None => total - 1,
        };
        self.play_at(index);
    }

    fn toggle_play_pause(&mut self) {
        match self.engine.state() {
            EngineState::Playing => {
                let result = self.engine.pause();
                self.report(result);
            }
            EngineState::Paused => {
                let result = self.engine.resume();
                self.report(result);
            }
            EngineState::Preparing => return,
            EngineState::Idle | EngineState::Stopped => {
                if self.pending.is_some() {
                    return;
                }
                let index = self
                    .current_index
                    .filter(|&index| index < self.total())
                    .unwrap_or(0);
                self.play_at(index);
            }
        }
        self.publish_state();
    }

    /// Spawn stream resolution for `attempt`, superseding any pending one.
    fn start_attempt(&mut self, attempt: Attempt) {
        let Some(track) = self
            .collection
            .as_ref()
            .and_then(|collection| collection.track(attempt.index))
            .cloned()
        else {
            return;
        };

        self.cancel_pending();
        self.generation += 1;
        let generation = self.generation;
        let token = CancellationToken::new();
        self.pending = Some(token.clone());

        self.current_index = Some(attempt.index);
        self.listener.on_track_changed(attempt.index);

        let streams = Arc::clone(&self.streams);
        let completions = self.completions.clone();
        tokio::spawn(
            async move {
                let result = tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!("Stream resolution cancelled");
                        return;
                    }
                    result = streams.resolve_default(&track.id) => result,
                };
                let _ = completions.send(Completion::Stream {
                    generation,
                    attempt,
                    result,
                });
            }
            .instrument(info_span!("resolve_stream", index = attempt.index, generation)),
        );
    }

    fn cancel_pending(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }

    // ------------------------------------------------------------------------
    // Completions
    // ------------------------------------------------------------------------

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Collection { generation, .. } if generation != self.load_generation => {
                debug!(
                    generation,
                    current = self.load_generation,
                    "Dropping stale collection result"
                );
            }
            Completion::Collection {
                result: Ok(resolved),
                ..
            } => {
                debug!(source = ?resolved.source, "Collection resolved");
                self.apply_collection(resolved.collection);
            }
            Completion::Collection { result: Err(e), .. } if e.is_silent() => {
                debug!(error = %e, "Dropping collection result");
            }
            Completion::Collection { result: Err(e), .. } => {
                warn!(error = %e, "Failed to load collection");
                self.listener
                    .on_error(&format!("Failed to load collection: {}", e));
            }
            Completion::Stream {
                generation,
                attempt,
                result,
            } => self.handle_stream(generation, attempt, result),
        }
    }

    fn handle_stream(
        &mut self,
        generation: u64,
        attempt: Attempt,
        result: std::result::Result<StreamDescriptor, CatalogError>,
    ) {
        if generation != self.generation {
            debug!(generation, current = self.generation, "Dropping stale stream result");
            return;
        }
        self.pending = None;

        let outcome = result
            .map_err(PlaybackError::from)
            .and_then(|descriptor| self.engine.play(&descriptor));

        match outcome {
            Ok(()) => {
                self.consecutive_failures = 0;
                info!(index = attempt.index, "Track preparing");
                self.publish_state();
            }
            Err(PlaybackError::Catalog(e)) if e.is_silent() => {
                debug!(error = %e, "Dropping stream result");
            }
            Err(e) => self.handle_track_failure(attempt, &e),
        }
    }

    fn handle_track_failure(&mut self, attempt: Attempt, reason: &PlaybackError) {
        self.consecutive_failures += 1;
        let failures = self.consecutive_failures;
        let total = self.total();
        warn!(index = attempt.index, failures, error = %reason, "Track failed");

        if failures < self.max_failures && total > 0 {
            let next = self.engine.next_index(attempt.index, total);
            if next != attempt.origin {
                self.start_attempt(Attempt {
                    index: next,
                    origin: attempt.origin,
                });
                return;
            }
            debug!(origin = attempt.origin, "Auto-advance returned to its origin");
        }

        self.consecutive_failures = 0;
        error!(failures, "Giving up on auto-advance");
        self.listener.on_error(&format!(
            "Playback failed {} times in a row, giving up: {}",
            failures, reason
        ));
        self.publish_state();
    }

    // ------------------------------------------------------------------------
    // Player events
    // ------------------------------------------------------------------------

    fn handle_player_event(&mut self, event: PlayerEvent) {
        let Some(event) = self.engine.handle_player_event(event) else {
            return;
        };
        match event {
            EngineEvent::Ready | EngineEvent::Completed { looped: true } => self.publish_state(),
            EngineEvent::Completed { looped: false } => {
                self.publish_state();
                self.next();
            }
            EngineEvent::Error { what, extra } => {
                self.listener
                    .on_error(&format!("Player error (what={}, extra={})", what, extra));
                self.publish_state();
            }
        }
    }

    // ------------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------------

    fn publish_state(&self) {
        self.listener.on_playback_state_changed(&self.engine.snapshot());
    }

    fn report(&self, result: Result<()>) {
        if let Err(e) = result {
            warn!(error = %e, "Player control failed");
            self.listener.on_error(&e.to_string());
        }
    }

    fn snapshot(&self) -> CoordinatorSnapshot {
        CoordinatorSnapshot {
            collection: self.collection.clone(),
            current_index: self.current_index,
            playback: self.engine.snapshot(),
            engine_state: self.engine.state(),
            consecutive_failures: self.consecutive_failures,
            resolving: self.pending.is_some(),
        }
    }

    fn shutdown(&mut self) {
        self.cancel_pending();
        self.collections.cancel_current_request();
        self.engine.release();
    }
}
