//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback core and the host.
//! Each trait is a capability the core consumes but never implements itself:
//!
//! - [`HttpClient`](http::HttpClient) - cancellable request/response transport
//! - [`SettingsStore`](storage::SettingsStore) - durable key-value storage for the collection cache
//! - [`MediaPlayer`](playback::MediaPlayer) - opaque audio player with prepared/completed/error events
//! - [`Clock`](time::Clock) - time source for deterministic expiry tests
//! - [`LoggerSink`](time::LoggerSink) - forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing (see `core_runtime::config::CoreConfigBuilder::build`).
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Platform
//! implementations convert their native errors into it and keep messages
//! actionable (URL, status, storage key).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! between the coordinator task and the resolver tasks it spawns.

pub mod error;
pub mod http;
pub mod playback;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpRequest, HttpResponse};
pub use playback::{
    player_event_channel, MediaPlayer, PlayerEvent, PlayerEventReceiver, PlayerEventSender,
};
pub use storage::SettingsStore;
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
