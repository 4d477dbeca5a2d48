//! Stepper motor driver for the blinds node.
//!
//! Drives a STEP/DIR/EN style driver (A4988, DRV8825, TMC2208 in legacy mode)
//! from a [`MotorCommand`]. Output lines are `embedded-hal` [`OutputPin`]s and
//! pulse timing uses a blocking [`DelayNs`].
//!
//! # Execution policy
//!
//! | Command | Effect |
//! |---------|--------|
//! | `enable == false` | Enable line driven inactive, nothing else |
//! | `steps == 0` | Nothing at all |
//! | otherwise | Enable, set direction, emit `abs(steps)` pulses, optionally disable |
//!
//! A move blocks the caller until the last pulse has been emitted. The node
//! cannot service buttons or its mailbox meanwhile; commands arriving during a
//! move wait in the mailbox.
//!
//! # Timing
//!
//! The requested period is clamped to `[200, 50000]` µs (about 5 kHz down to
//! 20 Hz). Each pulse is high for `period / 2` and low for the remainder, so an
//! odd period puts the extra microsecond on the low half.
//!
//! ```rust
//! use room_nodes::stepper::PulseTiming;
//!
//! let t = PulseTiming::for_period(801);
//! assert_eq!((t.high_us, t.low_us), (400, 401));
//!
//! let t = PulseTiming::for_period(10);
//! assert_eq!(t.period_us, 200);
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, ErrorKind, OutputPin, PinState};
use log::{debug, info};
use thiserror::Error;

use crate::wire::{DirHint, MotorCommand};

/// Shortest step period accepted, in microseconds.
pub const MIN_PERIOD_US: u16 = 200;

/// Longest step period accepted, in microseconds.
pub const MAX_PERIOD_US: u16 = 50_000;

/// Errors from the stepper output lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum StepperError {
    /// A GPIO write failed.
    #[error("stepper {line} line write failed: {kind:?}")]
    Pin {
        /// Which line failed.
        line: &'static str,
        /// `embedded-hal` error classification.
        kind: ErrorKind,
    },
}

fn pin_err<E: embedded_hal::digital::Error>(line: &'static str) -> impl Fn(E) -> StepperError {
    move |e| StepperError::Pin {
        line,
        kind: e.kind(),
    }
}

// ============================================================================
// Timing and Direction
// ============================================================================

/// Realized pulse timing for one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PulseTiming {
    /// Clamped period in microseconds.
    pub period_us: u32,
    /// Active-high duration.
    pub high_us: u32,
    /// Active-low duration.
    pub low_us: u32,
}

impl PulseTiming {
    /// Clamps a requested period and splits it into high and low halves.
    pub fn for_period(requested_us: u16) -> Self {
        let period_us = u32::from(requested_us.clamp(MIN_PERIOD_US, MAX_PERIOD_US));
        let high_us = period_us / 2;
        Self {
            period_us,
            high_us,
            low_us: period_us - high_us,
        }
    }
}

/// Physical rotation direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepDirection {
    /// DIR line high.
    Forward,
    /// DIR line low.
    Reverse,
}

impl StepDirection {
    /// Resolves the direction of a command from its hint and step sign.
    pub fn resolve(cmd: &MotorCommand) -> Self {
        match cmd.dir_hint {
            DirHint::Forward => StepDirection::Forward,
            DirHint::Reverse => StepDirection::Reverse,
            DirHint::Infer if cmd.steps >= 0 => StepDirection::Forward,
            DirHint::Infer => StepDirection::Reverse,
        }
    }

    fn pin_state(self) -> PinState {
        match self {
            StepDirection::Forward => PinState::High,
            StepDirection::Reverse => PinState::Low,
        }
    }
}

/// What [`StepperActuator::execute`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The command only powered the driver down.
    Disabled,
    /// Zero steps; nothing was touched.
    Idle,
    /// A pulse train was emitted.
    Moved {
        /// Number of pulses.
        steps: u32,
        /// Direction used.
        direction: StepDirection,
        /// Timing used for every pulse.
        timing: PulseTiming,
    },
}

// ============================================================================
// Configuration
// ============================================================================

/// Driver wiring options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepperConfig {
    /// Most drivers enable on a low EN line.
    pub enable_active_low: bool,
    /// Power the driver down once a move completes.
    pub auto_disable: bool,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            enable_active_low: true,
            auto_disable: true,
        }
    }
}

impl StepperConfig {
    /// Set the EN line polarity
    pub fn with_enable_active_low(mut self, active_low: bool) -> Self {
        self.enable_active_low = active_low;
        self
    }

    /// Set whether the driver is powered down after each move
    pub fn with_auto_disable(mut self, auto_disable: bool) -> Self {
        self.auto_disable = auto_disable;
        self
    }
}

// ============================================================================
// Actuator
// ============================================================================

/// Blocking STEP/DIR/EN stepper driver.
///
/// # Example
///
/// ```rust
/// use room_nodes::hal::{MockDelay, MockPin};
/// use room_nodes::stepper::{MoveOutcome, StepperActuator, StepperConfig};
/// use room_nodes::wire::{DirHint, MotorCommand};
///
/// let mut stepper = StepperActuator::new(
///     MockPin::new(),
///     MockPin::new(),
///     MockPin::new(),
///     MockDelay::new(),
///     StepperConfig::default(),
/// )
/// .unwrap();
///
/// let outcome = stepper.execute(&MotorCommand::new(-3, 800, DirHint::Infer, true)).unwrap();
/// assert!(matches!(outcome, MoveOutcome::Moved { steps: 3, .. }));
/// assert_eq!(stepper.delay().total_us, 2400);
/// ```
pub struct StepperActuator<STEP, DIR, EN, D> {
    step: STEP,
    dir: DIR,
    enable: EN,
    delay: D,
    config: StepperConfig,
}

impl<STEP, DIR, EN, D> StepperActuator<STEP, DIR, EN, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
{
    /// Creates the actuator with STEP and DIR low and the driver disabled.
    pub fn new(
        step: STEP,
        dir: DIR,
        enable: EN,
        delay: D,
        config: StepperConfig,
    ) -> Result<Self, StepperError> {
        let mut stepper = Self {
            step,
            dir,
            enable,
            delay,
            config,
        };
        stepper.step.set_low().map_err(pin_err("step"))?;
        stepper.dir.set_low().map_err(pin_err("dir"))?;
        stepper.set_enabled(false)?;
        Ok(stepper)
    }

    /// Executes one command, blocking for the whole pulse train.
    pub fn execute(&mut self, cmd: &MotorCommand) -> Result<MoveOutcome, StepperError> {
        if !cmd.enable {
            self.set_enabled(false)?;
            debug!("stepper: driver disabled");
            return Ok(MoveOutcome::Disabled);
        }
        if cmd.steps == 0 {
            return Ok(MoveOutcome::Idle);
        }

        let direction = StepDirection::resolve(cmd);
        let steps = cmd.steps.unsigned_abs();
        let timing = PulseTiming::for_period(cmd.period_us);

        self.set_enabled(true)?;
        self.dir
            .set_state(direction.pin_state())
            .map_err(pin_err("dir"))?;

        debug!(
            "stepper: {} steps {:?} at {}us ({}+{})",
            steps, direction, timing.period_us, timing.high_us, timing.low_us
        );

        for _ in 0..steps {
            self.step.set_high().map_err(pin_err("step"))?;
            self.delay.delay_us(timing.high_us);
            self.step.set_low().map_err(pin_err("step"))?;
            self.delay.delay_us(timing.low_us);
        }

        if self.config.auto_disable {
            self.set_enabled(false)?;
        }
        info!("stepper: move complete ({} steps {:?})", steps, direction);

        Ok(MoveOutcome::Moved {
            steps,
            direction,
            timing,
        })
    }

    /// Drives the EN line, honouring its polarity.
    pub fn set_enabled(&mut self, on: bool) -> Result<(), StepperError> {
        let high = on != self.config.enable_active_low;
        self.enable
            .set_state(PinState::from(high))
            .map_err(pin_err("enable"))
    }

    /// Wiring options in use.
    pub fn config(&self) -> StepperConfig {
        self.config
    }

    /// The STEP line.
    pub fn step_pin(&self) -> &STEP {
        &self.step
    }

    /// The DIR line.
    pub fn dir_pin(&self) -> &DIR {
        &self.dir
    }

    /// The EN line.
    pub fn enable_pin(&self) -> &EN {
        &self.enable
    }

    /// The delay provider.
    pub fn delay(&self) -> &D {
        &self.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{MockDelay, MockPin};

    type TestStepper = StepperActuator<MockPin, MockPin, MockPin, MockDelay>;

    fn stepper(config: StepperConfig) -> TestStepper {
        StepperActuator::new(
            MockPin::new(),
            MockPin::new(),
            MockPin::new(),
            MockDelay::new(),
            config,
        )
        .unwrap()
    }

    // =========================================================================
    // Timing Tests
    // =========================================================================

    #[test]
    fn timing_clamps_low() {
        let t = PulseTiming::for_period(0);
        assert_eq!(t.period_us, 200);
        assert_eq!((t.high_us, t.low_us), (100, 100));
    }

    #[test]
    fn timing_clamps_high() {
        let t = PulseTiming::for_period(u16::MAX);
        assert_eq!(t.period_us, 50_000);
        assert_eq!((t.high_us, t.low_us), (25_000, 25_000));
    }

    #[test]
    fn timing_odd_period_puts_extra_on_low_half() {
        let t = PulseTiming::for_period(999);
        assert_eq!((t.high_us, t.low_us), (499, 500));
    }

    // =========================================================================
    // Direction Tests
    // =========================================================================

    #[test]
    fn direction_resolution() {
        let cmd = |steps, hint| MotorCommand::new(steps, 800, hint, true);
        assert_eq!(StepDirection::resolve(&cmd(5, DirHint::Infer)), StepDirection::Forward);
        assert_eq!(StepDirection::resolve(&cmd(0, DirHint::Infer)), StepDirection::Forward);
        assert_eq!(StepDirection::resolve(&cmd(-5, DirHint::Infer)), StepDirection::Reverse);
        assert_eq!(StepDirection::resolve(&cmd(-5, DirHint::Forward)), StepDirection::Forward);
        assert_eq!(StepDirection::resolve(&cmd(5, DirHint::Reverse)), StepDirection::Reverse);
    }

    // =========================================================================
    // Execution Tests
    // =========================================================================

    #[test]
    fn new_starts_disabled_with_lines_low() {
        let s = stepper(StepperConfig::default());
        assert!(s.step_pin().is_low());
        assert!(s.dir_pin().is_low());
        // Active-low enable: disabled means high
        assert!(s.enable_pin().is_high());
    }

    #[test]
    fn zero_steps_touches_nothing() {
        let mut s = stepper(StepperConfig::default());
        let before = (
            s.step_pin().writes(),
            s.dir_pin().writes(),
            s.enable_pin().writes(),
        );

        let outcome = s.execute(&MotorCommand::new(0, 800, DirHint::Forward, true)).unwrap();

        assert_eq!(outcome, MoveOutcome::Idle);
        assert_eq!(
            (s.step_pin().writes(), s.dir_pin().writes(), s.enable_pin().writes()),
            before
        );
        assert_eq!(s.delay().total_us, 0);
    }

    #[test]
    fn disable_only_touches_enable_line() {
        let mut s = stepper(StepperConfig::default());
        let step_before = s.step_pin().writes();
        let dir_before = s.dir_pin().writes();

        let outcome = s.execute(&MotorCommand::new(500, 800, DirHint::Forward, false)).unwrap();

        assert_eq!(outcome, MoveOutcome::Disabled);
        assert_eq!(s.step_pin().writes(), step_before);
        assert_eq!(s.dir_pin().writes(), dir_before);
        assert!(s.enable_pin().is_high());
        assert_eq!(s.delay().total_us, 0);
    }

    #[test]
    fn move_emits_one_rising_edge_per_step() {
        let mut s = stepper(StepperConfig::default());
        let outcome = s.execute(&MotorCommand::new(-10, 801, DirHint::Infer, true)).unwrap();

        assert_eq!(
            outcome,
            MoveOutcome::Moved {
                steps: 10,
                direction: StepDirection::Reverse,
                timing: PulseTiming::for_period(801),
            }
        );
        assert_eq!(s.step_pin().rising_edges(), 10);
        assert!(s.step_pin().is_low());
        assert!(s.dir_pin().is_low());
        assert_eq!(s.delay().total_us, 10 * 801);
        assert_eq!(&s.delay().calls[..2], &[400, 401]);
    }

    #[test]
    fn move_enables_then_auto_disables() {
        let mut s = stepper(StepperConfig::default());
        s.execute(&MotorCommand::new(2, 800, DirHint::Forward, true)).unwrap();

        // Active-low: constructed high, enabled low, disabled high again
        assert_eq!(s.enable_pin().history(), &[true, false, true]);
        assert!(s.dir_pin().is_high());
    }

    #[test]
    fn move_without_auto_disable_leaves_driver_on() {
        let mut s = stepper(StepperConfig::default().with_auto_disable(false));
        s.execute(&MotorCommand::new(2, 800, DirHint::Forward, true)).unwrap();
        assert!(s.enable_pin().is_low());
    }

    #[test]
    fn active_high_enable_polarity() {
        let mut s = stepper(StepperConfig::default().with_enable_active_low(false));
        assert!(s.enable_pin().is_low());
        s.set_enabled(true).unwrap();
        assert!(s.enable_pin().is_high());
    }

    #[test]
    fn pin_failure_is_reported() {
        let mut s = StepperActuator::new(
            MockPin::new(),
            MockPin::new(),
            MockPin::new(),
            MockDelay::new(),
            StepperConfig::default(),
        )
        .unwrap();
        s.step.fail_writes(true);

        let err = s.execute(&MotorCommand::new(1, 800, DirHint::Forward, true)).unwrap_err();
        assert!(matches!(err, StepperError::Pin { line: "step", .. }));
    }
}
