//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the catalog and playback
//! crates:
//! - Logging and tracing infrastructure
//! - Configuration management (host capabilities plus settings)
//! - Event bus for presentation-side subscribers
//!
//! ## Overview
//!
//! Nothing here knows about collections or players. Higher crates pull
//! their capabilities out of [`config::CoreConfig`], publish through
//! [`events::EventBus`], and log through `tracing` once
//! [`logging::init_logging`] has run.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
