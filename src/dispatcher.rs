//! Main-node decision logic.
//!
//! The [`Dispatcher`] turns button presses and light readings into radio
//! commands for the actuator nodes. It keeps an *assumed* state for each
//! actuator, flipped as soon as a command is issued, and reports every flip
//! to an [`EventSink`]. Nothing ever confirms the assumed state; it can drift
//! from reality (a lost frame, a local button on the LED node) and is left
//! as is.
//!
//! # Inputs
//!
//! | Input | Effect |
//! |-------|--------|
//! | Blinds press | Move `steps_per_tap` in the stored direction, then reverse it |
//! | Light press | `Toggle` to the LED node |
//! | Night press | Flip night mode (local only) |
//! | Light reading | In night mode, toggle the light across the hysteresis band |
//!
//! # Hysteresis
//!
//! Readings are raw ADC counts where higher means brighter. With the light
//! assumed on, a reading above `light_off_threshold` switches it off. With
//! the light assumed off, a reading below `light_on_threshold` switches it
//! on. Readings between the thresholds never toggle.

use log::{debug, info, warn};

use crate::config::{short_string, DispatcherConfig, PeersConfig, ShortString};
use crate::ingest::{Device, StateEvent};
use crate::stepper::StepDirection;
use crate::traits::{EventSink, RadioLink};
use crate::wire::{DirHint, LightCommand, MotorCommand, WireBytes, WireMessage};

/// Default `source` reported with every event.
pub const DEFAULT_SOURCE: &str = "main-node";

/// Result of issuing one command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Target actuator.
    pub device: Device,
    /// Encoded command handed to the radio.
    pub payload: WireBytes,
    /// Assumed state after the flip.
    pub assumed_on_or_open: bool,
    /// Whether the radio accepted the frame.
    pub sent: bool,
    /// Whether the event sink accepted the report.
    pub reported: bool,
}

/// Optimistic command dispatcher for the main node.
pub struct Dispatcher<R, S> {
    radio: R,
    sink: S,
    peers: PeersConfig,
    config: DispatcherConfig,
    source: ShortString,
    blinds_open: bool,
    light_on: bool,
    next_direction: StepDirection,
    night_mode: bool,
    issued: u32,
}

impl<R: RadioLink, S: EventSink> Dispatcher<R, S> {
    /// Creates a dispatcher with the configured initial assumed state.
    pub fn new(radio: R, sink: S, peers: PeersConfig, config: DispatcherConfig) -> Self {
        Self {
            radio,
            sink,
            peers,
            blinds_open: config.blinds_initially_open,
            light_on: config.light_initially_on,
            config,
            source: short_string(DEFAULT_SOURCE),
            next_direction: StepDirection::Forward,
            night_mode: false,
            issued: 0,
        }
    }

    /// Set the `source` reported with events
    pub fn with_source(mut self, source: &str) -> Self {
        self.source = short_string(source);
        self
    }

    // ========================================================================
    // Inputs
    // ========================================================================

    /// Handles a blinds button press.
    pub fn on_blinds_press(&mut self, now_ms: u64) -> DispatchOutcome {
        let steps = match self.next_direction {
            StepDirection::Forward => self.config.steps_per_tap,
            StepDirection::Reverse => -self.config.steps_per_tap,
        };
        self.next_direction = match self.next_direction {
            StepDirection::Forward => StepDirection::Reverse,
            StepDirection::Reverse => StepDirection::Forward,
        };

        let cmd = MotorCommand::new(steps, self.config.period_us, DirHint::Infer, true);
        self.issue(Device::Blinds, cmd.encode(), now_ms)
    }

    /// Handles a light button press.
    pub fn on_light_press(&mut self, now_ms: u64) -> DispatchOutcome {
        self.issue(Device::DeskLight, LightCommand::toggle().encode(), now_ms)
    }

    /// Handles a night-mode button press. Returns the new mode.
    pub fn on_night_press(&mut self) -> bool {
        self.night_mode = !self.night_mode;
        info!(
            "dispatch: night mode {}",
            if self.night_mode { "on" } else { "off" }
        );
        self.night_mode
    }

    /// Handles a light sensor reading.
    ///
    /// Returns the toggle issued, if the reading crossed the band in night
    /// mode.
    pub fn on_light_reading(&mut self, reading: u16, now_ms: u64) -> Option<DispatchOutcome> {
        if !self.night_mode {
            return None;
        }

        let crossed = if self.light_on {
            reading > self.config.light_off_threshold
        } else {
            reading < self.config.light_on_threshold
        };
        if !crossed {
            return None;
        }

        debug!(
            "dispatch: reading {} crossed band with light assumed {}",
            reading,
            if self.light_on { "on" } else { "off" }
        );
        Some(self.on_light_press(now_ms))
    }

    fn issue(&mut self, device: Device, payload: WireBytes, now_ms: u64) -> DispatchOutcome {
        let (peer, assumed) = match device {
            Device::Blinds => (self.peers.blinds, &mut self.blinds_open),
            Device::DeskLight => (self.peers.light, &mut self.light_on),
        };
        // Flipped whether or not the frame goes out
        *assumed = !*assumed;
        let assumed_on_or_open = *assumed;

        let sent = match self.radio.send(peer, &payload) {
            Ok(()) => true,
            Err(e) => {
                warn!("dispatch: send to {} ({}) failed: {:?}", device.id(), peer, e);
                false
            }
        };

        let seq = self.issued;
        self.issued = self.issued.wrapping_add(1);
        let event = StateEvent::toggle(device, assumed_on_or_open, &self.source, now_ms, seq);
        let reported = match self.sink.report(&event) {
            Ok(()) => true,
            Err(e) => {
                warn!("dispatch: report {} failed: {:?}", event.tx_id, e);
                false
            }
        };

        info!(
            "dispatch: {} -> {}",
            device.id(),
            device.state_label(assumed_on_or_open)
        );

        DispatchOutcome {
            device,
            payload,
            assumed_on_or_open,
            sent,
            reported,
        }
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Assumed blinds state.
    pub fn blinds_assumed_open(&self) -> bool {
        self.blinds_open
    }

    /// Assumed light state.
    pub fn light_assumed_on(&self) -> bool {
        self.light_on
    }

    /// Whether the sensor drives the light.
    pub fn night_mode(&self) -> bool {
        self.night_mode
    }

    /// Number of commands issued so far.
    pub fn issued(&self) -> u32 {
        self.issued
    }

    /// Direction of the next blinds move.
    pub fn next_direction(&self) -> StepDirection {
        self.next_direction
    }

    /// Tuning in use.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// The radio link.
    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// Mutable access to the radio link.
    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    /// The event sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the event sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
