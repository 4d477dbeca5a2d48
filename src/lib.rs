//! # room-nodes
//!
//! ESP-NOW room automation: a main controller with buttons and a light
//! sensor, a stepper-driven blinds node, and PWM desk light nodes, with
//! every toggle reported to a cloud ingestion endpoint.
//!
//! ## Features
//!
//! - **Fixed binary commands**: 8-byte motor and 2-byte light frames, decoded
//!   into a latest-wins mailbox on the receiving node
//! - **Debounced buttons**: non-blocking press detection, one press per
//!   actuation, no repeat while held
//! - **Stepper pulses**: clamped timing, direction hints, configurable enable
//!   polarity and auto power-down
//! - **PWM brightness**: remote commands and local buttons share one state
//!   machine, toggling back on restores the previous level
//! - **Optimistic dispatch**: assumed remote state flipped at issue time,
//!   night mode driven by a light sensor with hysteresis
//! - **Event reporting**: JSON over HTTPS on a temporary association, radio
//!   channel always restored afterwards
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Radio, reporting and sensor abstractions
//! - `wire` - Command layouts
//! - `debounce`, `stepper`, `light` - Input and actuator state machines
//! - `dispatcher`, `ingest` - Main-node decisions and reporting
//! - `node` - Per-node loop steps
//! - `hal` - Concrete implementations (mock for testing, esp32 for hardware)
//!
//! ## Example
//!
//! ```rust
//! use room_nodes::config::{DispatcherConfig, PeersConfig};
//! use room_nodes::dispatcher::Dispatcher;
//! use room_nodes::hal::{MockRadio, MockSink};
//! use room_nodes::wire::{MotorCommand, WireMessage};
//!
//! let mut dispatcher = Dispatcher::new(
//!     MockRadio::new(),
//!     MockSink::new(),
//!     PeersConfig::default(),
//!     DispatcherConfig::default(),
//! );
//!
//! // First blinds tap opens
//! let outcome = dispatcher.on_blinds_press(1000);
//! let cmd = MotorCommand::decode(&outcome.payload).unwrap();
//! assert_eq!(cmd.steps, 1200);
//! assert!(dispatcher.blinds_assumed_open());
//! assert_eq!(dispatcher.sink().events[0].requested_state.as_deref(), Some("open"));
//! ```

#![warn(missing_docs)]

/// Node configuration (tuning defaults and required network fields).
pub mod config;
/// Debounced active-low push buttons.
pub mod debounce;
/// Main-node optimistic command dispatch.
pub mod dispatcher;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// State-transition events and HTTPS reporting.
pub mod ingest;
/// PWM brightness state machine for LED nodes.
pub mod light;
/// Latest-wins command slot between the radio callback and the main loop.
pub mod mailbox;
/// Per-node main loop steps.
pub mod node;
/// STEP/DIR/EN stepper driver for the blinds node.
pub mod stepper;
/// Core traits for the radio link, reporting and sensors.
pub mod traits;
/// Fixed binary command layouts.
pub mod wire;

// Re-exports for convenience
pub use config::{
    ConfigError, DispatcherConfig, IngestConfig, NetworkConfig, PeersConfig, RequiredField,
    WifiConfig,
};
pub use debounce::{DebounceConfig, Debouncer, Level};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use ingest::{Device, HttpsEventSink, IngestError, StateEvent};
pub use light::{LightError, LightState, LocalButton, PwmActuator, PwmConfig};
pub use mailbox::Mailbox;
pub use node::{BlindsNode, LedInputs, LedNode, MainInputs, MainNode};
pub use stepper::{MoveOutcome, PulseTiming, StepDirection, StepperActuator, StepperConfig, StepperError};
pub use traits::{Clock, EventSink, LightSensor, PeerAddress, RadioLink, Uplink};
pub use wire::{DecodeError, DirHint, LightAction, LightCommand, MotorCommand, WireMessage};
