//! PWM brightness control for the LED nodes.
//!
//! [`PwmActuator`] owns the light's on/off state and brightness and is the
//! single mutation path for both remote [`LightCommand`]s and local button
//! presses. Because every change goes through `&mut self`, a remote command
//! and a local press can never interleave.
//!
//! # Output polarity
//!
//! The LED strip is switched by a low-side MOSFET whose gate driver inverts
//! the signal, so by default the duty written is `255 - brightness`. This is a
//! property of the board, set with [`PwmConfig::inverted`].
//!
//! # Remote commands
//!
//! | Action | Effect |
//! |--------|--------|
//! | `TurnOn` | Restore the last non-zero brightness (255 if none) |
//! | `TurnOff` | Brightness 0 |
//! | `Toggle` | Off if on, otherwise as `TurnOn` |
//! | `SetBrightness` | Brightness = `value` |
//! | unknown | Ignored |
//!
//! # Example
//!
//! ```rust
//! use room_nodes::hal::MockPwm;
//! use room_nodes::light::{LocalButton, PwmActuator, PwmConfig};
//! use room_nodes::wire::LightCommand;
//!
//! let mut light = PwmActuator::new(MockPwm::new(), PwmConfig::default()).unwrap();
//! assert_eq!(light.brightness(), 255);
//!
//! light.handle_local(LocalButton::Decrease).unwrap();
//! assert_eq!(light.brightness(), 230);
//!
//! light.handle_command(&LightCommand::toggle()).unwrap();
//! assert!(!light.is_on());
//! ```

use embedded_hal::pwm::{Error as _, ErrorKind, SetDutyCycle};
use log::debug;
use thiserror::Error;

use crate::wire::{LightAction, LightCommand};

/// Full brightness.
pub const FULL_BRIGHTNESS: u8 = 255;

/// Brightness change per local up/down press.
pub const BRIGHTNESS_STEP: u8 = 25;

/// Errors from the PWM output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LightError {
    /// Writing the duty cycle failed.
    #[error("pwm duty write failed: {0:?}")]
    Pwm(ErrorKind),
}

/// Local buttons on an LED node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocalButton {
    /// On/off.
    Toggle,
    /// Brighter by one step (only while on).
    Increase,
    /// Dimmer by one step; reaching zero switches off.
    Decrease,
}

/// Snapshot of the light state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LightState {
    /// Whether the light is lit.
    pub on: bool,
    /// Current brightness, 0 while off.
    pub brightness: u8,
}

/// PWM output options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PwmConfig {
    /// Write `255 - level` instead of `level`.
    pub inverted: bool,
    /// Brightness change per local up/down press.
    pub step: u8,
}

impl Default for PwmConfig {
    fn default() -> Self {
        Self {
            inverted: true,
            step: BRIGHTNESS_STEP,
        }
    }
}

impl PwmConfig {
    /// Set the output polarity
    pub fn with_inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    /// Set the local up/down step
    pub fn with_step(mut self, step: u8) -> Self {
        self.step = step;
        self
    }
}

/// Brightness state machine driving one PWM channel.
pub struct PwmActuator<P> {
    pwm: P,
    on: bool,
    brightness: u8,
    /// Last non-zero brightness, used when switching back on.
    restore_level: u8,
    config: PwmConfig,
}

impl<P: SetDutyCycle> PwmActuator<P> {
    /// Creates the actuator and lights it at full brightness.
    pub fn new(pwm: P, config: PwmConfig) -> Result<Self, LightError> {
        let mut light = Self {
            pwm,
            on: false,
            brightness: 0,
            restore_level: FULL_BRIGHTNESS,
            config,
        };
        light.apply_brightness(i32::from(FULL_BRIGHTNESS))?;
        Ok(light)
    }

    /// Sets the brightness, clamped to `[0, 255]`, and updates the output.
    ///
    /// The light is on iff the resulting brightness is non-zero.
    pub fn apply_brightness(&mut self, level: i32) -> Result<LightState, LightError> {
        let level = level.clamp(0, i32::from(FULL_BRIGHTNESS)) as u8;
        self.brightness = level;
        self.on = level > 0;
        if level > 0 {
            self.restore_level = level;
        }

        let duty = if self.config.inverted {
            FULL_BRIGHTNESS - level
        } else {
            level
        };
        self.pwm
            .set_duty_cycle_fraction(u16::from(duty), u16::from(FULL_BRIGHTNESS))
            .map_err(|e| LightError::Pwm(e.kind()))?;

        Ok(self.state())
    }

    /// Applies a remote command.
    pub fn handle_command(&mut self, cmd: &LightCommand) -> Result<LightState, LightError> {
        match cmd.action {
            LightAction::TurnOn => self.apply_brightness(i32::from(self.restore_level)),
            LightAction::TurnOff => self.apply_brightness(0),
            LightAction::Toggle => self.toggle(),
            LightAction::SetBrightness => self.apply_brightness(i32::from(cmd.value)),
            LightAction::Unknown(code) => {
                debug!("light: ignoring unknown action code {}", code);
                Ok(self.state())
            }
        }
    }

    /// Applies a local button press.
    pub fn handle_local(&mut self, button: LocalButton) -> Result<LightState, LightError> {
        let step = i32::from(self.config.step);
        match button {
            LocalButton::Toggle => self.toggle(),
            LocalButton::Increase if self.on => {
                self.apply_brightness(i32::from(self.brightness) + step)
            }
            LocalButton::Decrease if self.on => {
                self.apply_brightness(i32::from(self.brightness) - step)
            }
            // Up/down do nothing while off
            LocalButton::Increase | LocalButton::Decrease => Ok(self.state()),
        }
    }

    fn toggle(&mut self) -> Result<LightState, LightError> {
        if self.on {
            self.apply_brightness(0)
        } else {
            self.apply_brightness(i32::from(self.restore_level))
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> LightState {
        LightState {
            on: self.on,
            brightness: self.brightness,
        }
    }

    /// Whether the light is lit.
    #[inline]
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Current brightness.
    #[inline]
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Brightness the light returns to when switched on.
    #[inline]
    pub fn restore_level(&self) -> u8 {
        self.restore_level
    }

    /// The PWM output.
    pub fn pwm(&self) -> &P {
        &self.pwm
    }

    /// Mutable access to the PWM output.
    pub fn pwm_mut(&mut self) -> &mut P {
        &mut self.pwm
    }
}
