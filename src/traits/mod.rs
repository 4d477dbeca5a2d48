//! Trait definitions for hardware and network collaborators.
//!
//! The core logic (debouncing, stepping, brightness, dispatching) only talks
//! to the outside world through these traits and the `embedded-hal` 1.0
//! traits, so it runs unchanged on ESP32 and in host tests.
//!
//! # Submodules
//!
//! - `hardware`: [`Clock`], [`LightSensor`]
//! - `network`: [`RadioLink`], [`EventSink`], [`Uplink`], [`PeerAddress`]

pub mod hardware;
pub mod network;

pub use hardware::*;
pub use network::*;
