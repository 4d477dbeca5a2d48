//! Per-node main loop steps.
//!
//! Each node struct owns its inputs, actuators and mailbox, and exposes one
//! step function the binary calls in a loop (with a ~1 ms pause). All
//! actuator state lives here; the only thing shared with another task is the
//! [`Mailbox`] the radio receive callback writes into.
//!
//! | Node | Step | Inputs | Outputs |
//! |------|------|--------|---------|
//! | [`MainNode`] | [`tick`](MainNode::tick) | 3 buttons, light sensor, clock | radio commands, events |
//! | [`BlindsNode`] | [`poll`](BlindsNode::poll) | mailbox | stepper |
//! | [`LedNode`] | [`poll`](LedNode::poll) | mailbox, 3 buttons | PWM |

use std::sync::Arc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::{info, warn};

use crate::debounce::{DebounceConfig, Debouncer, Level};
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::light::{LightError, LightState, LocalButton, PwmActuator};
use crate::mailbox::Mailbox;
use crate::stepper::{MoveOutcome, StepperActuator, StepperError};
use crate::traits::{Clock, EventSink, LightSensor, RadioLink};
use crate::wire::{LightCommand, MotorCommand};

// ============================================================================
// Main Node
// ============================================================================

/// Raw button levels sampled once per main-node tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MainInputs {
    /// Blinds button
    pub blinds: Level,
    /// Desk light button
    pub light: Level,
    /// Night-mode button
    pub night: Level,
}

/// Controller node: buttons and light sensor in, commands and events out.
///
/// Reporting blocks for as long as the uplink takes, so the clock is read
/// again for every command rather than once per tick.
pub struct MainNode<R, S, L, C> {
    dispatcher: Dispatcher<R, S>,
    sensor: L,
    clock: C,
    blinds_button: Debouncer,
    light_button: Debouncer,
    night_button: Debouncer,
}

impl<R, S, L, C> MainNode<R, S, L, C>
where
    R: RadioLink,
    S: EventSink,
    L: LightSensor,
    C: Clock,
{
    /// Creates the node around a dispatcher, a light sensor and a clock.
    pub fn new(
        dispatcher: Dispatcher<R, S>,
        sensor: L,
        clock: C,
        debounce: DebounceConfig,
    ) -> Self {
        Self {
            dispatcher,
            sensor,
            clock,
            blinds_button: Debouncer::new(debounce),
            light_button: Debouncer::new(debounce),
            night_button: Debouncer::new(debounce),
        }
    }

    /// One loop iteration.
    ///
    /// The buttons are sampled at the time the tick starts. In night mode the
    /// sensor is read first, then the blinds, light and night buttons are
    /// serviced in that order. Returns every command issued.
    pub fn tick(&mut self, inputs: MainInputs) -> Vec<DispatchOutcome> {
        let sampled_ms = self.clock.now_ms();
        let blinds = self.blinds_button.poll(inputs.blinds, sampled_ms);
        let light = self.light_button.poll(inputs.light, sampled_ms);
        let night = self.night_button.poll(inputs.night, sampled_ms);

        let mut issued = Vec::new();

        if self.dispatcher.night_mode() {
            match self.sensor.read_raw() {
                Ok(reading) => {
                    let now_ms = self.clock.now_ms();
                    issued.extend(self.dispatcher.on_light_reading(reading, now_ms));
                }
                Err(e) => warn!("main: light sensor read failed: {:?}", e),
            }
        }

        if blinds {
            let now_ms = self.clock.now_ms();
            issued.push(self.dispatcher.on_blinds_press(now_ms));
        }
        if light {
            let now_ms = self.clock.now_ms();
            issued.push(self.dispatcher.on_light_press(now_ms));
        }
        if night {
            self.dispatcher.on_night_press();
        }

        issued
    }

    /// The dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher<R, S> {
        &self.dispatcher
    }

    /// Mutable access to the dispatcher.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher<R, S> {
        &mut self.dispatcher
    }

    /// Mutable access to the light sensor.
    pub fn sensor_mut(&mut self) -> &mut L {
        &mut self.sensor
    }

    /// Mutable access to the clock.
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }
}

// ============================================================================
// Blinds Node
// ============================================================================

/// Stepper node: executes the latest received [`MotorCommand`].
pub struct BlindsNode<STEP, DIR, EN, D> {
    mailbox: Arc<Mailbox<MotorCommand>>,
    stepper: StepperActuator<STEP, DIR, EN, D>,
}

impl<STEP, DIR, EN, D> BlindsNode<STEP, DIR, EN, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
{
    /// Creates the node with an empty mailbox.
    pub fn new(stepper: StepperActuator<STEP, DIR, EN, D>) -> Self {
        Self {
            mailbox: Arc::new(Mailbox::new()),
            stepper,
        }
    }

    /// Handle for the receive callback.
    pub fn mailbox(&self) -> Arc<Mailbox<MotorCommand>> {
        Arc::clone(&self.mailbox)
    }

    /// Executes the pending command, if any. Blocks for the whole move.
    pub fn poll(&mut self) -> Result<Option<MoveOutcome>, StepperError> {
        let Some(cmd) = self.mailbox.take() else {
            return Ok(None);
        };
        info!(
            "blinds: cmd steps={} us={} dir={:?} en={}",
            cmd.steps, cmd.period_us, cmd.dir_hint, cmd.enable
        );
        self.stepper.execute(&cmd).map(Some)
    }

    /// The stepper.
    pub fn stepper(&self) -> &StepperActuator<STEP, DIR, EN, D> {
        &self.stepper
    }
}

// ============================================================================
// LED Node
// ============================================================================

/// Raw button levels sampled once per LED-node poll.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LedInputs {
    /// On/off button
    pub toggle: Level,
    /// Brighter button
    pub up: Level,
    /// Dimmer button
    pub down: Level,
}

/// LED node: remote commands and local buttons on one PWM channel.
pub struct LedNode<P> {
    mailbox: Arc<Mailbox<LightCommand>>,
    light: PwmActuator<P>,
    toggle_button: Debouncer,
    up_button: Debouncer,
    down_button: Debouncer,
}

impl<P: SetDutyCycle> LedNode<P> {
    /// Creates the node with an empty mailbox.
    pub fn new(light: PwmActuator<P>, debounce: DebounceConfig) -> Self {
        Self {
            mailbox: Arc::new(Mailbox::new()),
            light,
            toggle_button: Debouncer::new(debounce),
            up_button: Debouncer::new(debounce),
            down_button: Debouncer::new(debounce),
        }
    }

    /// Handle for the receive callback.
    pub fn mailbox(&self) -> Arc<Mailbox<LightCommand>> {
        Arc::clone(&self.mailbox)
    }

    /// One loop iteration: the pending remote command first, then the local
    /// buttons. Returns the resulting state.
    ///
    /// A PWM write failure does not cut the iteration short: every button is
    /// still sampled and every press applied. The first failure is returned.
    pub fn poll(&mut self, inputs: LedInputs, now_ms: u64) -> Result<LightState, LightError> {
        let mut result = Ok(());

        if let Some(cmd) = self.mailbox.take() {
            match self.light.handle_command(&cmd) {
                Ok(state) => info!(
                    "led: cmd action={} value={} -> brightness={} {}",
                    cmd.action.code(),
                    cmd.value,
                    state.brightness,
                    if state.on { "ON" } else { "OFF" }
                ),
                Err(e) => result = Err(e),
            }
        }

        let presses = [
            (self.toggle_button.poll(inputs.toggle, now_ms), LocalButton::Toggle),
            (self.up_button.poll(inputs.up, now_ms), LocalButton::Increase),
            (self.down_button.poll(inputs.down, now_ms), LocalButton::Decrease),
        ];
        for (pressed, button) in presses {
            if pressed {
                if let Err(e) = self.light.handle_local(button) {
                    result = result.and(Err(e));
                }
            }
        }

        result.map(|()| self.light.state())
    }

    /// The PWM actuator.
    pub fn light(&self) -> &PwmActuator<P> {
        &self.light
    }

    /// Mutable access to the PWM actuator.
    pub fn light_mut(&mut self) -> &mut PwmActuator<P> {
        &mut self.light
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DispatcherConfig, PeersConfig};
    use crate::hal::{
        MockClock, MockDelay, MockLightSensor, MockPin, MockPwm, MockRadio, MockSink,
    };
    use crate::light::PwmConfig;
    use crate::stepper::StepperConfig;
    use crate::wire::{DirHint, WireMessage};

    type TestMain = MainNode<MockRadio, MockSink, MockLightSensor, MockClock>;

    fn main_node(reading: u16) -> TestMain {
        let dispatcher = Dispatcher::new(
            MockRadio::new(),
            MockSink::new(),
            PeersConfig::default(),
            DispatcherConfig::default(),
        );
        MainNode::new(
            dispatcher,
            MockLightSensor::new(reading),
            MockClock::new(),
            DebounceConfig::default(),
        )
    }

    fn tick_at(node: &mut TestMain, inputs: MainInputs, t: u64) -> Vec<DispatchOutcome> {
        node.clock_mut().set(t);
        node.tick(inputs)
    }

    /// Holds `inputs` for `ms` milliseconds starting at `from`.
    fn hold_main(node: &mut TestMain, inputs: MainInputs, from: u64, ms: u64) -> usize {
        (from..from + ms).map(|t| tick_at(node, inputs, t).len()).sum()
    }

    // =========================================================================
    // MainNode Tests
    // =========================================================================

    #[test]
    fn main_idle_issues_nothing() {
        let mut node = main_node(3000);
        assert_eq!(hold_main(&mut node, MainInputs::default(), 0, 500), 0);
        // Sensor untouched outside night mode
        assert_eq!(node.sensor_mut().reads, 0);
    }

    #[test]
    fn main_blinds_press_issues_once() {
        let mut node = main_node(1200);
        let pressed = MainInputs {
            blinds: Level::Low,
            ..Default::default()
        };
        assert_eq!(hold_main(&mut node, pressed, 0, 200), 1);
        assert_eq!(hold_main(&mut node, MainInputs::default(), 200, 100), 0);
        assert!(node.dispatcher().blinds_assumed_open());
    }

    #[test]
    fn main_night_mode_reads_sensor() {
        let mut node = main_node(1200);
        let night = MainInputs {
            night: Level::Low,
            ..Default::default()
        };
        hold_main(&mut node, night, 0, 50);
        hold_main(&mut node, MainInputs::default(), 50, 50);
        assert!(node.dispatcher().night_mode());

        // Inside the band: reads, never toggles
        assert_eq!(hold_main(&mut node, MainInputs::default(), 100, 10), 0);
        assert!(node.sensor_mut().reads > 0);

        // Bright room with light assumed on: one toggle
        node.sensor_mut().reading = 4000;
        assert_eq!(hold_main(&mut node, MainInputs::default(), 110, 10), 1);
        assert!(!node.dispatcher().light_assumed_on());
    }

    #[test]
    fn main_sensor_failure_is_skipped() {
        let mut node = main_node(4000);
        node.dispatcher_mut().on_night_press();
        node.sensor_mut().fail = true;
        assert!(node.tick(MainInputs::default()).is_empty());
    }

    #[test]
    fn main_reads_clock_for_each_command() {
        let mut node = main_node(1200);
        node.dispatcher_mut().on_night_press();
        let light = MainInputs {
            light: Level::Low,
            ..Default::default()
        };
        hold_main(&mut node, light, 0, 30);

        // The press commits on the same tick the room turns bright
        node.sensor_mut().reading = 4000;
        *node.clock_mut() = MockClock::with_step(1500);
        node.clock_mut().set(30);
        let issued = node.tick(light);
        assert_eq!(issued.len(), 2);

        let events = &node.dispatcher().sink().events;
        assert_eq!(events[0].client_ts, 1530);
        assert_eq!(events[1].client_ts, 3030);
        assert_ne!(events[0].tx_id, events[1].tx_id);
    }

    // =========================================================================
    // BlindsNode Tests
    // =========================================================================

    fn blinds_node() -> BlindsNode<MockPin, MockPin, MockPin, MockDelay> {
        let stepper = StepperActuator::new(
            MockPin::new(),
            MockPin::new(),
            MockPin::new(),
            MockDelay::new(),
            StepperConfig::default(),
        )
        .unwrap();
        BlindsNode::new(stepper)
    }

    #[test]
    fn blinds_poll_empty_mailbox() {
        let mut node = blinds_node();
        assert_eq!(node.poll().unwrap(), None);
    }

    #[test]
    fn blinds_runs_latest_command_only() {
        let mut node = blinds_node();
        let mailbox = node.mailbox();
        mailbox
            .deliver(&MotorCommand::new(50, 800, DirHint::Infer, true).encode())
            .unwrap();
        mailbox
            .deliver(&MotorCommand::new(-3, 800, DirHint::Infer, true).encode())
            .unwrap();

        let outcome = node.poll().unwrap().unwrap();
        assert!(matches!(outcome, MoveOutcome::Moved { steps: 3, .. }));
        assert_eq!(node.stepper().step_pin().rising_edges(), 3);
        assert_eq!(node.poll().unwrap(), None);
    }

    // =========================================================================
    // LedNode Tests
    // =========================================================================

    fn led_node() -> LedNode<MockPwm> {
        let light = PwmActuator::new(MockPwm::new(), PwmConfig::default()).unwrap();
        LedNode::new(light, DebounceConfig::default())
    }

    #[test]
    fn led_remote_then_local() {
        let mut node = led_node();
        node.mailbox()
            .deliver(&LightCommand::set_brightness(100).encode())
            .unwrap();

        let down = LedInputs {
            down: Level::Low,
            ..Default::default()
        };
        let mut state = node.poll(down, 0).unwrap();
        assert_eq!(state.brightness, 100);
        for t in 1..=40 {
            state = node.poll(down, t).unwrap();
        }
        assert_eq!(state.brightness, 75);
    }

    #[test]
    fn led_local_toggle_and_remote_toggle_converge() {
        let mut node = led_node();
        let toggle = LedInputs {
            toggle: Level::Low,
            ..Default::default()
        };
        for t in 0..40 {
            node.poll(toggle, t).unwrap();
        }
        assert!(!node.light().is_on());

        node.mailbox().post(LightCommand::toggle());
        let state = node.poll(LedInputs::default(), 100).unwrap();
        assert_eq!(state, LightState { on: true, brightness: 255 });
    }

    #[test]
    fn led_failed_command_still_samples_buttons() {
        let mut node = led_node();
        node.mailbox().post(LightCommand::set_brightness(100));
        node.light_mut().pwm_mut().fail = true;

        let toggle = LedInputs {
            toggle: Level::Low,
            ..Default::default()
        };
        assert!(node.poll(toggle, 0).is_err());
        node.light_mut().pwm_mut().fail = false;

        // The failed iteration still started the debounce window
        for t in 1..30 {
            node.poll(toggle, t).unwrap();
        }
        assert!(node.light().is_on());
        let state = node.poll(toggle, 30).unwrap();
        assert!(!state.on);
    }
}
