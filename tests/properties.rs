//! Property-based tests for the wire layouts and the node state machines.

#![cfg(not(target_os = "espidf"))]

use proptest::prelude::*;

use room_nodes::config::{DispatcherConfig, PeersConfig};
use room_nodes::hal::{MockPwm, MockRadio, MockSink};
use room_nodes::stepper::{MAX_PERIOD_US, MIN_PERIOD_US};
use room_nodes::{
    DebounceConfig, Debouncer, DecodeError, DirHint, Dispatcher, Level, LightAction, LightCommand,
    LocalButton, MotorCommand, PulseTiming, PwmActuator, PwmConfig, WireMessage,
};

fn dir_hint() -> impl Strategy<Value = DirHint> {
    prop_oneof![
        Just(DirHint::Forward),
        Just(DirHint::Reverse),
        Just(DirHint::Infer),
    ]
}

fn local_button() -> impl Strategy<Value = LocalButton> {
    prop_oneof![
        Just(LocalButton::Toggle),
        Just(LocalButton::Increase),
        Just(LocalButton::Decrease),
    ]
}

proptest! {
    // ========================================================================
    // Wire Layouts
    // ========================================================================

    #[test]
    fn motor_command_survives_the_wire(
        steps in any::<i32>(),
        period_us in any::<u16>(),
        hint in dir_hint(),
        enable in any::<bool>(),
    ) {
        let cmd = MotorCommand::new(steps, period_us, hint, enable);
        let bytes = cmd.encode();
        prop_assert_eq!(bytes.len(), MotorCommand::SIZE);
        prop_assert_eq!(MotorCommand::decode(&bytes).unwrap(), cmd);
    }

    #[test]
    fn motor_decode_accepts_any_eight_bytes(bytes in any::<[u8; 8]>()) {
        let cmd = MotorCommand::decode(&bytes).unwrap();
        prop_assert_eq!(cmd.enable, bytes[7] != 0);
        prop_assert_eq!(cmd.dir_hint, DirHint::from_wire(bytes[6] as i8));
    }

    #[test]
    fn light_command_survives_the_wire(code in any::<u8>(), value in any::<u8>()) {
        let cmd = LightCommand { action: LightAction::from_code(code), value };
        let bytes = cmd.encode();
        prop_assert_eq!(&bytes[..], &[code, value][..]);
        prop_assert_eq!(LightCommand::decode(&bytes).unwrap(), cmd);
    }

    #[test]
    fn short_frames_are_rejected(bytes in prop::collection::vec(any::<u8>(), 0..8)) {
        let motor = MotorCommand::decode(&bytes);
        prop_assert!(
            matches!(motor, Err(DecodeError::TooShort { expected: 8, .. })),
            "expected TooShort error"
        );
        if bytes.len() < 2 {
            prop_assert!(LightCommand::decode(&bytes).is_err());
        }
    }

    // ========================================================================
    // Stepper Timing
    // ========================================================================

    #[test]
    fn pulse_timing_is_clamped_and_split(requested in any::<u16>()) {
        let t = PulseTiming::for_period(requested);
        prop_assert!(t.period_us >= u32::from(MIN_PERIOD_US));
        prop_assert!(t.period_us <= u32::from(MAX_PERIOD_US));
        prop_assert_eq!(t.high_us + t.low_us, t.period_us);
        prop_assert!(t.low_us >= t.high_us);
        prop_assert!(t.low_us - t.high_us <= 1);
    }

    // ========================================================================
    // Light State
    // ========================================================================

    #[test]
    fn brightness_is_clamped_and_on_iff_lit(level in -1000i32..1000) {
        let mut light = PwmActuator::new(MockPwm::new(), PwmConfig::default()).unwrap();
        let state = light.apply_brightness(level).unwrap();
        prop_assert_eq!(i32::from(state.brightness), level.clamp(0, 255));
        prop_assert_eq!(state.on, state.brightness > 0);
        // Inverted output
        prop_assert_eq!(light.pwm().duty, 255 - u16::from(state.brightness));
    }

    #[test]
    fn any_press_sequence_keeps_state_consistent(
        presses in prop::collection::vec(local_button(), 0..64),
    ) {
        let mut light = PwmActuator::new(MockPwm::new(), PwmConfig::default()).unwrap();
        for button in presses {
            let state = light.handle_local(button).unwrap();
            prop_assert_eq!(state.on, state.brightness > 0);
            prop_assert!(light.restore_level() > 0);
        }
    }

    // ========================================================================
    // Night Mode
    // ========================================================================

    #[test]
    fn readings_inside_band_never_toggle(
        readings in prop::collection::vec(1000u16..=1500, 1..100),
        light_on in any::<bool>(),
    ) {
        let config = DispatcherConfig::default().with_initial_state(false, light_on);
        let mut d = Dispatcher::new(MockRadio::new(), MockSink::new(), PeersConfig::default(), config);
        d.on_night_press();
        for (t, reading) in readings.into_iter().enumerate() {
            prop_assert!(d.on_light_reading(reading, t as u64).is_none());
        }
        prop_assert!(d.radio().sent.is_empty());
        prop_assert_eq!(d.light_assumed_on(), light_on);
    }

    #[test]
    fn toggles_only_happen_outside_band(
        readings in prop::collection::vec(0u16..4096, 1..200),
    ) {
        let mut d = Dispatcher::new(
            MockRadio::new(),
            MockSink::new(),
            PeersConfig::default(),
            DispatcherConfig::default(),
        );
        d.on_night_press();
        for (t, reading) in readings.into_iter().enumerate() {
            if let Some(outcome) = d.on_light_reading(reading, t as u64) {
                // Turned off only when bright, on only when dark
                if outcome.assumed_on_or_open {
                    prop_assert!(reading < 1000);
                } else {
                    prop_assert!(reading > 1500);
                }
            }
        }
    }

    // ========================================================================
    // Debouncing
    // ========================================================================

    #[test]
    fn bouncing_press_reports_exactly_once(
        bounce in prop::collection::vec(any::<bool>(), 0..25),
        hold_ms in 31u64..2000,
    ) {
        let mut button = Debouncer::new(DebounceConfig::default());
        let mut presses = 0;
        let mut t = 0u64;

        // Chatter shorter than the window on the way down
        for low in &bounce {
            presses += usize::from(button.poll(Level::from_high(!low), t));
            t += 1;
        }
        for _ in 0..hold_ms {
            presses += usize::from(button.poll(Level::Low, t));
            t += 1;
        }
        // Chatter on release, swallowed by the hold and settle phases
        for low in &bounce {
            presses += usize::from(button.poll(Level::from_high(!low), t));
            t += 1;
        }
        for _ in 0..100 {
            presses += usize::from(button.poll(Level::High, t));
            t += 1;
        }

        prop_assert_eq!(presses, 1);
    }
}
