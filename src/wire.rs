//! Fixed-layout binary commands exchanged over the radio link.
//!
//! Two command kinds exist, each with a packed little-endian layout:
//!
//! | Command | Size | Layout |
//! |---------|------|--------|
//! | [`MotorCommand`] | 8 bytes | `i32 steps, u16 period_us, i8 dir_hint, u8 enable` |
//! | [`LightCommand`] | 2 bytes | `u8 action, u8 value` |
//!
//! There is no header, version byte or checksum. The receiving node knows which
//! kind it accepts, and link integrity is left to the transport.
//!
//! Decoding only checks the length. Field semantics (an out-of-range brightness,
//! an unknown action code) pass through untouched and are the consumer's
//! problem.
//!
//! # Example
//!
//! ```rust
//! use room_nodes::wire::{DirHint, MotorCommand, WireMessage};
//!
//! let cmd = MotorCommand::new(1200, 800, DirHint::Infer, true);
//! let bytes = cmd.encode();
//! assert_eq!(bytes.len(), MotorCommand::SIZE);
//!
//! let decoded = MotorCommand::decode(&bytes).unwrap();
//! assert_eq!(decoded, cmd);
//! ```

use heapless::Vec as HVec;
use thiserror::Error;

/// Largest encoded command size in bytes.
pub const MAX_WIRE_LEN: usize = 8;

/// Encoded command bytes.
pub type WireBytes = HVec<u8, MAX_WIRE_LEN>;

/// Reasons a received byte sequence cannot be turned into a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer bytes arrived than the fixed layout requires.
    #[error("payload too short: expected {expected} bytes, got {actual}")]
    TooShort {
        /// Fixed size of the command kind.
        expected: usize,
        /// Length of the received payload.
        actual: usize,
    },
}

/// A command with a fixed wire layout.
pub trait WireMessage: Sized + Copy {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Encodes the command into its fixed layout.
    fn encode(&self) -> WireBytes;

    /// Decodes a command from the start of `bytes`.
    ///
    /// Trailing bytes beyond [`SIZE`](Self::SIZE) are ignored.
    fn decode(bytes: &[u8]) -> Result<Self, DecodeError>;
}

fn check_len(bytes: &[u8], expected: usize) -> Result<(), DecodeError> {
    if bytes.len() < expected {
        return Err(DecodeError::TooShort {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

// ============================================================================
// Motor Command
// ============================================================================

/// Direction hint carried by a [`MotorCommand`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DirHint {
    /// Drive forward regardless of the sign of `steps`.
    Forward,
    /// Drive in reverse regardless of the sign of `steps`.
    Reverse,
    /// Forward iff `steps >= 0`.
    #[default]
    Infer,
}

impl DirHint {
    /// Wire representation (`1`, `-1`, `0`).
    pub const fn to_wire(self) -> i8 {
        match self {
            DirHint::Forward => 1,
            DirHint::Reverse => -1,
            DirHint::Infer => 0,
        }
    }

    /// Parses the wire byte by sign, so any positive value means forward.
    pub const fn from_wire(raw: i8) -> Self {
        if raw > 0 {
            DirHint::Forward
        } else if raw < 0 {
            DirHint::Reverse
        } else {
            DirHint::Infer
        }
    }
}

/// Move request for the blinds stepper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MotorCommand {
    /// Step count; the sign gives the direction when `dir_hint` is `Infer`.
    pub steps: i32,
    /// Requested step period in microseconds (clamped when executed).
    pub period_us: u16,
    /// Direction override.
    pub dir_hint: DirHint,
    /// `false` powers the driver down without moving.
    pub enable: bool,
}

impl MotorCommand {
    /// Creates a motor command.
    pub const fn new(steps: i32, period_us: u16, dir_hint: DirHint, enable: bool) -> Self {
        Self {
            steps,
            period_us,
            dir_hint,
            enable,
        }
    }

    /// A command that only switches the driver off.
    pub const fn disable() -> Self {
        Self::new(0, 0, DirHint::Infer, false)
    }
}

impl WireMessage for MotorCommand {
    const SIZE: usize = 8;

    fn encode(&self) -> WireBytes {
        let mut out = WireBytes::new();
        let _ = out.extend_from_slice(&self.steps.to_le_bytes());
        let _ = out.extend_from_slice(&self.period_us.to_le_bytes());
        let _ = out.push(self.dir_hint.to_wire() as u8);
        let _ = out.push(u8::from(self.enable));
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        check_len(bytes, Self::SIZE)?;
        let steps = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let period_us = u16::from_le_bytes([bytes[4], bytes[5]]);
        let dir_hint = DirHint::from_wire(bytes[6] as i8);
        // Any non-zero byte enables the driver
        let enable = bytes[7] != 0;
        Ok(Self {
            steps,
            period_us,
            dir_hint,
            enable,
        })
    }
}

// ============================================================================
// Light Command
// ============================================================================

/// Action requested from an LED node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightAction {
    /// Switch on at the remembered brightness.
    TurnOn,
    /// Switch off.
    TurnOff,
    /// Flip between on and off.
    Toggle,
    /// Set an explicit brightness from the command's `value`.
    SetBrightness,
    /// Unrecognised action code, ignored by the receiver.
    Unknown(u8),
}

impl LightAction {
    /// Wire action code.
    pub const fn code(self) -> u8 {
        match self {
            LightAction::TurnOn => 1,
            LightAction::TurnOff => 2,
            LightAction::Toggle => 3,
            LightAction::SetBrightness => 4,
            LightAction::Unknown(code) => code,
        }
    }

    /// Maps a wire action code.
    pub const fn from_code(code: u8) -> Self {
        match code {
            1 => LightAction::TurnOn,
            2 => LightAction::TurnOff,
            3 => LightAction::Toggle,
            4 => LightAction::SetBrightness,
            other => LightAction::Unknown(other),
        }
    }
}

/// Request for an LED node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LightCommand {
    /// What to do.
    pub action: LightAction,
    /// Brightness for [`LightAction::SetBrightness`], ignored otherwise.
    pub value: u8,
}

impl LightCommand {
    /// Switch-on command.
    pub const fn turn_on() -> Self {
        Self {
            action: LightAction::TurnOn,
            value: 0,
        }
    }

    /// Switch-off command.
    pub const fn turn_off() -> Self {
        Self {
            action: LightAction::TurnOff,
            value: 0,
        }
    }

    /// Toggle command.
    pub const fn toggle() -> Self {
        Self {
            action: LightAction::Toggle,
            value: 0,
        }
    }

    /// Explicit brightness command.
    pub const fn set_brightness(value: u8) -> Self {
        Self {
            action: LightAction::SetBrightness,
            value,
        }
    }
}

impl WireMessage for LightCommand {
    const SIZE: usize = 2;

    fn encode(&self) -> WireBytes {
        let mut out = WireBytes::new();
        let _ = out.push(self.action.code());
        let _ = out.push(self.value);
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        check_len(bytes, Self::SIZE)?;
        Ok(Self {
            action: LightAction::from_code(bytes[0]),
            value: bytes[1],
        })
    }
}
