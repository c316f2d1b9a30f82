//! Presentation-side contract
//!
//! The coordinator is the only component that talks to a
//! [`PlaybackListener`]. All callbacks run on the coordinator task and must
//! return quickly.

use core_catalog::Collection;
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus, PlaybackEvent};
use tracing::trace;

use crate::state::PlaybackState;

pub trait PlaybackListener: Send + Sync {
    fn on_playback_state_changed(&self, state: &PlaybackState);

    /// A new collection replaced the previous one.
    fn on_collection_updated(&self, collection: &Collection);

    /// Playback moved to `index` in the current collection.
    fn on_track_changed(&self, index: usize);

    fn on_error(&self, message: &str);
}

/// Listener that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl PlaybackListener for NoopListener {
    fn on_playback_state_changed(&self, _state: &PlaybackState) {}
    fn on_collection_updated(&self, _collection: &Collection) {}
    fn on_track_changed(&self, _index: usize) {}
    fn on_error(&self, _message: &str) {}
}

/// Republishes listener callbacks as [`CoreEvent`]s.
#[derive(Clone)]
pub struct EventBusListener {
    bus: EventBus,
}

impl EventBusListener {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    fn publish(&self, event: CoreEvent) {
        // No subscribers is not an error
        if self.bus.emit(event).is_err() {
            trace!("No event subscribers");
        }
    }
}

impl PlaybackListener for EventBusListener {
    fn on_playback_state_changed(&self, state: &PlaybackState) {
        self.publish(CoreEvent::Playback(PlaybackEvent::StateChanged {
            is_playing: state.is_playing,
            position_ms: state.position_ms,
            duration_ms: state.duration_ms,
            mode: state.mode.to_string(),
        }));
    }

    fn on_collection_updated(&self, collection: &Collection) {
        self.publish(CoreEvent::Catalog(CatalogEvent::CollectionUpdated {
            collection_id: collection.id.to_string(),
            name: collection.name.clone(),
            track_count: collection.len(),
        }));
    }

    fn on_track_changed(&self, index: usize) {
        self.publish(CoreEvent::Playback(PlaybackEvent::TrackChanged { index }));
    }

    fn on_error(&self, message: &str) {
        self.publish(CoreEvent::Playback(PlaybackEvent::Error {
            message: message.to_string(),
        }));
    }
}
