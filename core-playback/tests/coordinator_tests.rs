//! Integration tests for the playback coordinator
//!
//! This test suite verifies:
//! - Track selection, stream resolution and engine hand-off
//! - Bounded auto-advance and its single terminal error
//! - Supersession of pending stream resolutions and collection loads
//! - Completion, looping and player error handling

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::playback::{MediaPlayer, PlayerEvent, PlayerEventSender};
use bridge_traits::storage::SettingsStore;
use bridge_traits::time::SystemClock;
use core_catalog::{
    CatalogClient, CatalogConfig, Collection, CollectionCache, CollectionResolver,
    StreamResolver, Track,
};
use core_playback::{
    CoordinatorHandle, EngineState, PlayMode, PlaybackConfig, PlaybackCoordinator,
    PlaybackError, PlaybackListener, PlaybackState,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

// ============================================================================
// Scripted transport
// ============================================================================

#[derive(Clone)]
enum Route {
    Respond(u16, String),
    Hang,
    /// Signal `entered`, then respond once `release` fires.
    Gated(u16, String),
}

#[derive(Default)]
struct RoutedHttp {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<String>>,
    entered: Notify,
    release: Notify,
}

impl RoutedHttp {
    fn route(&self, url: &str, route: Route) {
        self.routes.lock().insert(url.to_string(), route);
    }

    fn stream_ok(&self, track_id: &str) {
        self.route(
            &stream_url(track_id),
            Route::Respond(
                200,
                format!(r#"{{"status": 200, "name": "Song {track_id}", "url": "http://cdn/{track_id}.mp3"}}"#),
            ),
        );
    }

    fn stream_requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .filter(|url| url.starts_with("https://stream.test/"))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl HttpClient for RoutedHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.requests.lock().push(request.url.clone());
        let route = self.routes.lock().get(&request.url).cloned();
        match route {
            Some(Route::Respond(status, body)) => Ok(HttpResponse::new(status, body)),
            Some(Route::Hang) => {
                self.entered.notify_one();
                std::future::pending().await
            }
            Some(Route::Gated(status, body)) => {
                self.entered.notify_one();
                self.release.notified().await;
                Ok(HttpResponse::new(status, body))
            }
            None => Err(BridgeError::OperationFailed(format!(
                "unreachable: {}",
                request.url
            ))),
        }
    }
}

fn stream_url(track_id: &str) -> String {
    format!("https://stream.test/song?id={track_id}")
}

// ============================================================================
// Recording player
// ============================================================================

#[derive(Default)]
struct RecordingPlayer {
    sender: Mutex<Option<PlayerEventSender>>,
    calls: Mutex<Vec<String>>,
    playing: AtomicBool,
}

impl RecordingPlayer {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn sources(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| call.strip_prefix("set_source ").map(str::to_string))
            .collect()
    }

    fn emit(&self, event: PlayerEvent) {
        if let Some(sender) = self.sender.lock().as_ref() {
            sender.send(event).unwrap();
        }
    }
}

impl MediaPlayer for RecordingPlayer {
    fn set_event_sender(&self, sender: PlayerEventSender) {
        *self.sender.lock() = Some(sender);
    }

    fn set_source(&self, url: &str) -> BridgeResult<()> {
        self.record(format!("set_source {url}"));
        Ok(())
    }

    fn prepare_async(&self) -> BridgeResult<()> {
        self.record("prepare_async");
        // Preparation finishes straight away
        self.emit(PlayerEvent::Prepared);
        Ok(())
    }

    fn start(&self) -> BridgeResult<()> {
        self.record("start");
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&self) -> BridgeResult<()> {
        self.record("pause");
        self.playing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> BridgeResult<()> {
        self.record("stop");
        self.playing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn reset(&self) {
        self.record("reset");
        self.playing.store(false, Ordering::SeqCst);
    }

    fn release(&self) {
        self.record("release");
    }

    fn current_position_ms(&self) -> u64 {
        0
    }

    fn duration_ms(&self) -> u64 {
        180_000
    }

    fn seek_to(&self, position_ms: u64) -> BridgeResult<()> {
        self.record(format!("seek_to {position_ms}"));
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Channel listener
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    State(PlaybackState),
    Collection(i64, usize),
    Track(usize),
    Error(String),
}

struct ChannelListener(mpsc::UnboundedSender<Seen>);

impl PlaybackListener for ChannelListener {
    fn on_playback_state_changed(&self, state: &PlaybackState) {
        let _ = self.0.send(Seen::State(*state));
    }

    fn on_collection_updated(&self, collection: &Collection) {
        let _ = self.0.send(Seen::Collection(collection.id, collection.len()));
    }

    fn on_track_changed(&self, index: usize) {
        let _ = self.0.send(Seen::Track(index));
    }

    fn on_error(&self, message: &str) {
        let _ = self.0.send(Seen::Error(message.to_string()));
    }
}

#[derive(Default)]
struct MemoryStore(Mutex<HashMap<String, String>>);

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()> {
        self.0.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_string(&self, key: &str) -> BridgeResult<Option<String>> {
        Ok(self.0.lock().get(key).cloned())
    }

    async fn set_i64(&self, key: &str, value: i64) -> BridgeResult<()> {
        self.set_string(key, &value.to_string()).await
    }

    async fn get_i64(&self, key: &str) -> BridgeResult<Option<i64>> {
        Ok(self.0.lock().get(key).and_then(|v| v.parse().ok()))
    }

    async fn delete(&self, key: &str) -> BridgeResult<()> {
        self.0.lock().remove(key);
        Ok(())
    }

    async fn has_key(&self, key: &str) -> BridgeResult<bool> {
        Ok(self.0.lock().contains_key(key))
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    http: Arc<RoutedHttp>,
    player: Arc<RecordingPlayer>,
    handle: CoordinatorHandle,
    coordinator: PlaybackCoordinator,
    seen: mpsc::UnboundedReceiver<Seen>,
}

impl Harness {
    fn start() -> Self {
        let http = Arc::new(RoutedHttp::default());
        let player = Arc::new(RecordingPlayer::default());
        let (tx, seen) = mpsc::unbounded_channel();

        let config = CatalogConfig::default()
            .with_collection_url_template("https://catalog.test/detail?id={id}")
            .with_stream_endpoints(["https://stream.test/song?id={id}"])
            .with_max_retries(0)
            .with_retry_delay(Duration::ZERO);
        let client = CatalogClient::new(http.clone());
        let cache = Arc::new(CollectionCache::new(
            Arc::new(MemoryStore::default()),
            Arc::new(SystemClock),
        ));

        let coordinator = PlaybackCoordinator::spawn(
            Arc::new(CollectionResolver::new(client.clone(), cache, &config)),
            Arc::new(StreamResolver::new(client, &config)),
            player.clone(),
            Arc::new(ChannelListener(tx)),
            PlaybackConfig::default(),
        );

        Self {
            http,
            player,
            handle: coordinator.handle(),
            coordinator,
            seen,
        }
    }

    /// Wait for the first event matching `predicate`, skipping others.
    async fn expect(&mut self, predicate: impl Fn(&Seen) -> bool) -> Seen {
        let wait = async {
            loop {
                match self.seen.recv().await {
                    Some(event) if predicate(&event) => return event,
                    Some(_) => continue,
                    None => panic!("listener channel closed"),
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("timed out waiting for listener event")
    }

    /// Every event received so far, after the coordinator drained its queue.
    async fn drain(&mut self) -> Vec<Seen> {
        self.handle.snapshot().await.unwrap();
        let mut events = Vec::new();
        while let Ok(event) = self.seen.try_recv() {
            events.push(event);
        }
        events
    }
}

fn collection(len: usize) -> Collection {
    let tracks = (0..len)
        .map(|i| Track {
            id: format!("{}", 100 + i),
            title: format!("Song {i}"),
            artist_name: "Artist".into(),
            album_name: "Album".into(),
            artwork_url: String::new(),
        })
        .collect();
    Collection::new(1, "Queue", tracks)
}

fn catalog_url(collection_id: i64) -> String {
    format!("https://catalog.test/detail?id={collection_id}")
}

fn catalog_body(collection_id: i64, name: &str, tracks: usize) -> String {
    let tracks: Vec<String> = (0..tracks)
        .map(|i| format!(r#"{{"id": {}, "name": "T{i}"}}"#, 500 + i))
        .collect();
    format!(
        r#"{{"code": 200, "result": {{"id": {collection_id}, "name": "{name}", "tracks": [{}]}}}}"#,
        tracks.join(",")
    )
}

fn collections_seen(events: &[Seen]) -> Vec<Seen> {
    events
        .iter()
        .filter(|s| matches!(s, Seen::Collection(..)))
        .cloned()
        .collect()
}

/// Let released requests run to completion before draining.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

fn is_playing(seen: &Seen) -> bool {
    matches!(seen, Seen::State(state) if state.is_playing)
}

fn is_error(seen: &Seen) -> bool {
    matches!(seen, Seen::Error(_))
}

// ============================================================================
// Selection and resolution
// ============================================================================

#[tokio::test]
async fn test_play_at_resolves_and_starts_secure_stream() {
    let mut h = Harness::start();
    h.http.stream_ok("101");
    h.handle.set_collection(collection(3)).await.unwrap();
    h.handle.play_at(1).await.unwrap();

    assert_eq!(h.expect(|s| matches!(s, Seen::Track(_))).await, Seen::Track(1));
    h.expect(is_playing).await;

    assert_eq!(h.player.sources(), vec!["https://cdn/101.mp3".to_string()]);
    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.current_index, Some(1));
    assert_eq!(snapshot.engine_state, EngineState::Playing);
    assert_eq!(snapshot.consecutive_failures, 0);
}

#[tokio::test]
async fn test_out_of_range_index_is_ignored() {
    let mut h = Harness::start();
    h.handle.set_collection(collection(2)).await.unwrap();
    h.handle.play_at(2).await.unwrap();

    let events = h.drain().await;
    assert_eq!(events, vec![Seen::Collection(1, 2)]);
    assert!(h.http.stream_requests().is_empty());
}

#[tokio::test]
async fn test_next_and_previous_without_current() {
    let mut h = Harness::start();
    h.http.stream_ok("100");
    h.http.stream_ok("103");
    h.handle.set_collection(collection(4)).await.unwrap();

    h.handle.previous().await.unwrap();
    assert_eq!(h.expect(|s| matches!(s, Seen::Track(_))).await, Seen::Track(3));
    h.expect(is_playing).await;

    h.handle.next().await.unwrap();
    assert_eq!(h.expect(|s| matches!(s, Seen::Track(_))).await, Seen::Track(0));
    h.expect(is_playing).await;
}

// ============================================================================
// Bounded auto-advance
// ============================================================================

#[tokio::test]
async fn test_three_failures_surface_exactly_one_error() {
    let mut h = Harness::start();
    h.handle.set_collection(collection(5)).await.unwrap();
    h.handle.play_at(0).await.unwrap();

    let error = h.expect(is_error).await;
    assert!(matches!(error, Seen::Error(ref m) if m.contains("3 times")));

    let rest = h.drain().await;
    assert!(!rest.iter().any(is_error), "error reported more than once");

    assert_eq!(
        h.http.stream_requests(),
        vec![stream_url("100"), stream_url("101"), stream_url("102")]
    );
    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.consecutive_failures, 0);
    assert_eq!(snapshot.current_index, Some(2));
    assert!(!snapshot.resolving);
    assert!(h.player.sources().is_empty());
}

#[tokio::test]
async fn test_success_after_failures_resets_counter() {
    let mut h = Harness::start();
    h.http.stream_ok("102");
    h.handle.set_collection(collection(5)).await.unwrap();
    h.handle.play_at(0).await.unwrap();

    h.expect(is_playing).await;
    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.current_index, Some(2));
    assert_eq!(snapshot.consecutive_failures, 0);

    let events = h.drain().await;
    assert!(!events.iter().any(is_error));
}

#[tokio::test]
async fn test_auto_advance_stops_at_origin() {
    let mut h = Harness::start();
    h.handle.set_collection(collection(2)).await.unwrap();
    h.handle.play_at(0).await.unwrap();

    let error = h.expect(is_error).await;
    assert!(matches!(error, Seen::Error(ref m) if m.contains("2 times")));
    assert_eq!(
        h.http.stream_requests(),
        vec![stream_url("100"), stream_url("101")]
    );
}

#[tokio::test]
async fn test_single_loop_failure_reports_immediately() {
    let mut h = Harness::start();
    h.handle.set_mode(PlayMode::SingleLoop).await.unwrap();
    h.handle.set_collection(collection(5)).await.unwrap();
    h.handle.play_at(3).await.unwrap();

    h.expect(is_error).await;
    assert_eq!(h.http.stream_requests(), vec![stream_url("103")]);
}

#[tokio::test]
async fn test_invalid_descriptor_counts_as_failure() {
    let mut h = Harness::start();
    h.http.route(
        &stream_url("100"),
        Route::Respond(200, r#"{"status": 0, "url": ""}"#.to_string()),
    );
    h.http.stream_ok("101");
    h.handle.set_collection(collection(3)).await.unwrap();
    h.handle.play_at(0).await.unwrap();

    h.expect(is_playing).await;
    assert_eq!(h.player.sources(), vec!["https://cdn/101.mp3".to_string()]);
}

// ============================================================================
// Supersession
// ============================================================================

#[tokio::test]
async fn test_newer_selection_supersedes_pending_resolution() {
    let mut h = Harness::start();
    h.http.route(&stream_url("100"), Route::Hang);
    h.http.stream_ok("101");
    h.handle.set_collection(collection(3)).await.unwrap();

    h.handle.play_at(0).await.unwrap();
    h.http.entered.notified().await;
    h.handle.play_at(1).await.unwrap();

    h.expect(is_playing).await;
    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.current_index, Some(1));
    assert_eq!(h.player.sources(), vec!["https://cdn/101.mp3".to_string()]);
}

#[tokio::test]
async fn test_loading_collection_replaces_queue() {
    let mut h = Harness::start();
    h.http.route(
        "https://catalog.test/detail?id=7",
        Route::Respond(
            200,
            r#"{"code": 200, "result": {"id": 7, "name": "Remote",
                "tracks": [{"id": 1, "name": "A"}, {"id": 2, "name": "B"}]}}"#
                .to_string(),
        ),
    );

    h.handle.load_collection(7, false).await.unwrap();
    assert_eq!(
        h.expect(|s| matches!(s, Seen::Collection(..))).await,
        Seen::Collection(7, 2)
    );

    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.collection.map(|c| c.name), Some("Remote".to_string()));
    assert_eq!(snapshot.current_index, None);
}

#[tokio::test]
async fn test_later_load_supersedes_pending_load() {
    let mut h = Harness::start();
    h.http.route(&catalog_url(1), Route::Gated(200, catalog_body(1, "Old", 2)));
    h.http.route(&catalog_url(2), Route::Respond(200, catalog_body(2, "New", 3)));

    h.handle.load_collection(1, true).await.unwrap();
    h.http.entered.notified().await;
    h.handle.load_collection(2, true).await.unwrap();

    assert_eq!(
        h.expect(|s| matches!(s, Seen::Collection(..))).await,
        Seen::Collection(2, 3)
    );
    h.http.release.notify_one();
    settle().await;

    let events = h.drain().await;
    assert!(collections_seen(&events).is_empty(), "older load delivered: {events:?}");
    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.collection.map(|c| c.name), Some("New".to_string()));
}

#[tokio::test]
async fn test_cached_load_supersedes_pending_network_load() {
    let mut h = Harness::start();
    h.http.route(&catalog_url(2), Route::Respond(200, catalog_body(2, "Cached", 3)));
    h.handle.load_collection(2, true).await.unwrap();
    assert_eq!(
        h.expect(|s| matches!(s, Seen::Collection(..))).await,
        Seen::Collection(2, 3)
    );

    h.http.route(&catalog_url(1), Route::Gated(200, catalog_body(1, "Old", 2)));
    h.handle.load_collection(1, true).await.unwrap();
    h.http.entered.notified().await;

    // Served from cache without touching the network
    h.handle.load_collection(2, false).await.unwrap();
    assert_eq!(
        h.expect(|s| matches!(s, Seen::Collection(..))).await,
        Seen::Collection(2, 3)
    );
    h.http.release.notify_one();
    settle().await;

    let events = h.drain().await;
    assert!(collections_seen(&events).is_empty(), "older load delivered: {events:?}");
    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.collection.map(|c| c.name), Some("Cached".to_string()));
}

#[tokio::test]
async fn test_imported_collection_survives_pending_load() {
    let mut h = Harness::start();
    h.http.route(&catalog_url(9), Route::Gated(200, catalog_body(9, "Remote", 2)));

    h.handle.load_collection(9, true).await.unwrap();
    h.http.entered.notified().await;
    h.handle.set_collection(collection(3)).await.unwrap();
    h.http.release.notify_one();
    settle().await;

    let events = h.drain().await;
    assert_eq!(collections_seen(&events), vec![Seen::Collection(1, 3)]);
    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.collection.map(|c| c.name), Some("Queue".to_string()));
}

#[tokio::test]
async fn test_import_right_after_load_request_wins() {
    let mut h = Harness::start();
    h.http.route(&catalog_url(9), Route::Respond(200, catalog_body(9, "Remote", 2)));

    // The load task may not have started yet
    h.handle.load_collection(9, true).await.unwrap();
    h.handle.set_collection(collection(3)).await.unwrap();
    settle().await;

    let events = h.drain().await;
    assert_eq!(collections_seen(&events).last(), Some(&Seen::Collection(1, 3)));
    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.collection.map(|c| c.name), Some("Queue".to_string()));
}

#[tokio::test]
async fn test_collection_load_failure_is_reported() {
    let mut h = Harness::start();
    h.handle.load_collection(404, true).await.unwrap();

    let error = h.expect(is_error).await;
    assert!(matches!(error, Seen::Error(ref m) if m.starts_with("Failed to load collection")));
}

// ============================================================================
// Player events and transport controls
// ============================================================================

#[tokio::test]
async fn test_completion_advances_to_next_track() {
    let mut h = Harness::start();
    h.http.stream_ok("100");
    h.http.stream_ok("101");
    h.handle.set_collection(collection(3)).await.unwrap();
    h.handle.play_at(0).await.unwrap();
    h.expect(is_playing).await;

    h.player.emit(PlayerEvent::Completed);

    assert_eq!(
        h.expect(|s| matches!(s, Seen::Track(i) if *i != 0)).await,
        Seen::Track(1)
    );
    h.expect(is_playing).await;
}

#[tokio::test]
async fn test_single_loop_completion_restarts_in_place() {
    let mut h = Harness::start();
    h.http.stream_ok("100");
    h.handle.set_collection(collection(3)).await.unwrap();
    h.handle.set_mode(PlayMode::SingleLoop).await.unwrap();
    h.handle.play_at(0).await.unwrap();
    h.expect(is_playing).await;

    h.player.emit(PlayerEvent::Completed);
    let events = h.drain().await;

    assert!(!events.iter().any(|s| matches!(s, Seen::Track(_))));
    assert!(h.player.calls().contains(&"seek_to 0".to_string()));
    assert_eq!(
        h.handle.snapshot().await.unwrap().engine_state,
        EngineState::Playing
    );
}

#[tokio::test]
async fn test_player_error_is_surfaced_without_advancing() {
    let mut h = Harness::start();
    h.http.stream_ok("100");
    h.handle.set_collection(collection(3)).await.unwrap();
    h.handle.play_at(0).await.unwrap();
    h.expect(is_playing).await;

    h.player.emit(PlayerEvent::Error {
        what: 1,
        extra: -1004,
    });

    let error = h.expect(is_error).await;
    assert!(matches!(error, Seen::Error(ref m) if m.contains("-1004")));
    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.engine_state, EngineState::Idle);
    assert_eq!(snapshot.current_index, Some(0));
    assert_eq!(h.http.stream_requests().len(), 1);
}

#[tokio::test]
async fn test_toggle_play_pause_cycle() {
    let mut h = Harness::start();
    h.http.stream_ok("100");
    h.handle.set_collection(collection(2)).await.unwrap();

    // Nothing selected yet: starts the first track
    h.handle.toggle_play_pause().await.unwrap();
    assert_eq!(h.expect(|s| matches!(s, Seen::Track(_))).await, Seen::Track(0));
    h.expect(is_playing).await;

    h.handle.toggle_play_pause().await.unwrap();
    h.expect(|s| matches!(s, Seen::State(state) if !state.is_playing))
        .await;
    assert_eq!(
        h.handle.snapshot().await.unwrap().engine_state,
        EngineState::Paused
    );

    h.handle.toggle_play_pause().await.unwrap();
    h.expect(is_playing).await;
}

#[tokio::test]
async fn test_stop_and_shutdown() {
    let mut h = Harness::start();
    h.http.stream_ok("100");
    h.handle.set_collection(collection(1)).await.unwrap();
    h.handle.play_at(0).await.unwrap();
    h.expect(is_playing).await;

    h.handle.stop().await.unwrap();
    assert_eq!(
        h.handle.snapshot().await.unwrap().engine_state,
        EngineState::Stopped
    );

    h.handle.shutdown().await.unwrap();
    let Harness {
        coordinator,
        handle,
        player,
        ..
    } = h;
    coordinator.wait().await.unwrap();

    assert!(player.calls().contains(&"release".to_string()));
    assert!(matches!(
        handle.play_at(0).await,
        Err(PlaybackError::CoordinatorClosed)
    ));
}
