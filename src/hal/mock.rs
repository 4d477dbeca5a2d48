//! Mock implementations for testing without hardware.
//!
//! Test doubles for the `embedded-hal` traits the actuators use and for the
//! crate's own collaborator traits, so every node runs on the desktop.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockPin`] | [`OutputPin`] | Records every level written |
//! | [`MockDelay`] | [`DelayNs`] | Accumulates requested delays instead of sleeping |
//! | [`MockPwm`] | [`SetDutyCycle`] | Tracks the last duty cycle |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//! | [`MockLightSensor`] | [`LightSensor`] | Settable raw reading |
//! | [`MockRadio`] | [`RadioLink`] | Captures sent frames |
//! | [`MockSink`] | [`EventSink`] | Captures reported events |
//! | [`MockUplink`] | [`Uplink`] | Scripted association and HTTP results |
//!
//! # Example
//!
//! ```rust
//! use room_nodes::hal::{MockRadio, MockSink};
//! use room_nodes::dispatcher::Dispatcher;
//! use room_nodes::config::{DispatcherConfig, PeersConfig};
//!
//! let mut dispatcher = Dispatcher::new(
//!     MockRadio::new(),
//!     MockSink::new(),
//!     PeersConfig::default(),
//!     DispatcherConfig::default(),
//! );
//!
//! dispatcher.on_light_press(1000);
//! assert_eq!(dispatcher.radio().sent.len(), 1);
//! assert_eq!(dispatcher.sink().events[0].tx_id, "led-1000-0");
//! ```
//!
//! [`OutputPin`]: embedded_hal::digital::OutputPin
//! [`DelayNs`]: embedded_hal::delay::DelayNs
//! [`SetDutyCycle`]: embedded_hal::pwm::SetDutyCycle
//! [`Clock`]: crate::traits::Clock
//! [`LightSensor`]: crate::traits::LightSensor
//! [`RadioLink`]: crate::traits::RadioLink
//! [`EventSink`]: crate::traits::EventSink
//! [`Uplink`]: crate::traits::Uplink

use std::cell::Cell;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};

use crate::ingest::StateEvent;
use crate::traits::{Clock, EventSink, LightSensor, PeerAddress, RadioLink, Uplink};

// ============================================================================
// Hardware Mocks
// ============================================================================

/// Error returned by a [`MockPin`] set to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockPinError;

impl digital::Error for MockPinError {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

/// Mock output pin.
///
/// Every successful write is appended to the history, so tests can check
/// both the final level and the sequence that led to it. A fresh pin reads
/// low.
///
/// # Example
///
/// ```rust
/// use embedded_hal::digital::OutputPin;
/// use room_nodes::hal::MockPin;
///
/// let mut pin = MockPin::new();
/// pin.set_high().unwrap();
/// pin.set_low().unwrap();
/// pin.set_high().unwrap();
///
/// assert!(pin.is_high());
/// assert_eq!(pin.history(), &[true, false, true]);
/// assert_eq!(pin.rising_edges(), 2);
/// ```
#[derive(Debug, Default)]
pub struct MockPin {
    history: Vec<bool>,
    fail: bool,
}

impl MockPin {
    /// Creates a pin with no writes yet (reads low).
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent writes fail.
    pub fn fail_writes(&mut self, fail: bool) {
        self.fail = fail;
    }

    /// Current level is high.
    pub fn is_high(&self) -> bool {
        self.history.last().copied().unwrap_or(false)
    }

    /// Current level is low.
    pub fn is_low(&self) -> bool {
        !self.is_high()
    }

    /// Number of successful writes.
    pub fn writes(&self) -> usize {
        self.history.len()
    }

    /// Every level written, oldest first.
    pub fn history(&self) -> &[bool] {
        &self.history
    }

    /// Number of low-to-high transitions, starting from low.
    pub fn rising_edges(&self) -> usize {
        let mut previous = false;
        let mut edges = 0;
        for &level in &self.history {
            if level && !previous {
                edges += 1;
            }
            previous = level;
        }
        edges
    }

    fn write(&mut self, level: bool) -> Result<(), MockPinError> {
        if self.fail {
            return Err(MockPinError);
        }
        self.history.push(level);
        Ok(())
    }
}

impl digital::ErrorType for MockPin {
    type Error = MockPinError;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

/// Mock delay that records instead of sleeping.
///
/// # Example
///
/// ```rust
/// use embedded_hal::delay::DelayNs;
/// use room_nodes::hal::MockDelay;
///
/// let mut delay = MockDelay::new();
/// delay.delay_us(400);
/// delay.delay_us(401);
/// assert_eq!(delay.total_us, 801);
/// assert_eq!(delay.calls, vec![400, 401]);
/// ```
#[derive(Debug, Default)]
pub struct MockDelay {
    /// Sum of all requested delays in microseconds.
    pub total_us: u64,
    /// Each `delay_us` argument, in order.
    pub calls: Vec<u32>,
}

impl MockDelay {
    /// Creates a delay with nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_us += u64::from(ns / 1000);
    }

    fn delay_us(&mut self, us: u32) {
        self.total_us += u64::from(us);
        self.calls.push(us);
    }
}

/// Error returned by a [`MockPwm`] set to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockPwmError;

impl pwm::Error for MockPwmError {
    fn kind(&self) -> pwm::ErrorKind {
        pwm::ErrorKind::Other
    }
}

/// Mock PWM channel.
///
/// # Example
///
/// ```rust
/// use embedded_hal::pwm::SetDutyCycle;
/// use room_nodes::hal::MockPwm;
///
/// let mut pwm = MockPwm::new();
/// pwm.set_duty_cycle(128).unwrap();
/// assert_eq!(pwm.duty, 128);
/// assert_eq!(pwm.writes, 1);
/// ```
#[derive(Debug)]
pub struct MockPwm {
    /// Last duty cycle written.
    pub duty: u16,
    /// Number of successful writes.
    pub writes: usize,
    /// When set, writes fail.
    pub fail: bool,
    max_duty: u16,
}

impl MockPwm {
    /// Creates an 8-bit channel (max duty 255).
    pub fn new() -> Self {
        Self::with_max_duty(255)
    }

    /// Creates a channel with the given resolution.
    pub fn with_max_duty(max_duty: u16) -> Self {
        Self {
            duty: 0,
            writes: 0,
            fail: false,
            max_duty,
        }
    }
}

impl Default for MockPwm {
    fn default() -> Self {
        Self::new()
    }
}

impl pwm::ErrorType for MockPwm {
    type Error = MockPwmError;
}

impl SetDutyCycle for MockPwm {
    fn max_duty_cycle(&self) -> u16 {
        self.max_duty
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        if self.fail {
            return Err(MockPwmError);
        }
        self.duty = duty;
        self.writes += 1;
        Ok(())
    }
}

/// Mock clock for testing.
///
/// Provides a controllable time source for testing time-dependent behavior.
///
/// # Example
///
/// ```rust
/// use room_nodes::hal::MockClock;
/// use room_nodes::traits::Clock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.set(1000);
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 1500);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    current_ms: Cell<u64>,
    /// Added after every read, to model work that takes time between reads.
    pub step_ms: u64,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock that moves forward `step_ms` every time it is read.
    pub fn with_step(step_ms: u64) -> Self {
        Self {
            step_ms,
            ..Self::default()
        }
    }

    /// Sets the current time in milliseconds.
    pub fn set(&mut self, ms: u64) {
        self.current_ms.set(ms);
    }

    /// Advances the clock by the given duration.
    pub fn advance(&mut self, ms: u64) {
        self.current_ms.set(self.current_ms.get() + ms);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        let now = self.current_ms.get();
        self.current_ms.set(now + self.step_ms);
        now
    }
}

/// Mock photoresistor.
#[derive(Debug, Default)]
pub struct MockLightSensor {
    /// Value returned by the next read.
    pub reading: u16,
    /// When set, reads fail.
    pub fail: bool,
    /// Number of read attempts.
    pub reads: usize,
}

impl MockLightSensor {
    /// Creates a sensor reading `reading`.
    pub fn new(reading: u16) -> Self {
        Self {
            reading,
            ..Default::default()
        }
    }
}

impl LightSensor for MockLightSensor {
    type Error = ();

    fn read_raw(&mut self) -> Result<u16, ()> {
        self.reads += 1;
        if self.fail {
            Err(())
        } else {
            Ok(self.reading)
        }
    }
}

// ============================================================================
// Network Mocks
// ============================================================================

/// Mock radio link.
///
/// # Example
///
/// ```rust
/// use room_nodes::hal::MockRadio;
/// use room_nodes::traits::{PeerAddress, RadioLink};
///
/// let mut radio = MockRadio::new();
/// let peer = PeerAddress([1, 2, 3, 4, 5, 6]);
/// radio.send(peer, &[0x01, 0x00]).unwrap();
///
/// assert_eq!(radio.sent_to(peer).len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockRadio {
    /// Frames queued so far (peer, payload).
    pub sent: Vec<(PeerAddress, Vec<u8>)>,
    /// When set, sends fail and nothing is recorded.
    pub fail: bool,
}

impl MockRadio {
    /// Creates a radio with nothing sent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads sent to one peer.
    pub fn sent_to(&self, peer: PeerAddress) -> Vec<&[u8]> {
        self.sent
            .iter()
            .filter(|(p, _)| *p == peer)
            .map(|(_, payload)| payload.as_slice())
            .collect()
    }
}

impl RadioLink for MockRadio {
    type Error = ();

    fn send(&mut self, peer: PeerAddress, payload: &[u8]) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        self.sent.push((peer, payload.to_vec()));
        Ok(())
    }
}

/// Mock event sink.
#[derive(Debug, Default)]
pub struct MockSink {
    /// Events reported so far.
    pub events: Vec<StateEvent>,
    /// When set, reports fail and nothing is recorded.
    pub fail: bool,
}

impl MockSink {
    /// Creates a sink with no events.
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for MockSink {
    type Error = ();

    fn report(&mut self, event: &StateEvent) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        self.events.push(event.clone());
        Ok(())
    }
}

/// Mock uplink with scripted results.
///
/// Counts associations and radio restores so tests can check the channel is
/// always handed back.
#[derive(Debug)]
pub struct MockUplink {
    /// Successful or failed association attempts.
    pub associations: usize,
    /// Calls to `restore_radio`.
    pub restores: usize,
    /// Requests posted (url, api key, body).
    pub posts: Vec<(String, String, Vec<u8>)>,
    /// Status returned by `post_json`.
    pub status: u16,
    /// When set, `associate` fails.
    pub fail_associate: bool,
    /// When set, `post_json` fails before recording.
    pub fail_post: bool,
}

impl MockUplink {
    /// Creates an uplink that associates and answers 200.
    pub fn new() -> Self {
        Self {
            associations: 0,
            restores: 0,
            posts: Vec::new(),
            status: 200,
            fail_associate: false,
            fail_post: false,
        }
    }
}

impl Default for MockUplink {
    fn default() -> Self {
        Self::new()
    }
}

impl Uplink for MockUplink {
    type Error = ();

    fn associate(&mut self) -> Result<(), ()> {
        self.associations += 1;
        if self.fail_associate {
            Err(())
        } else {
            Ok(())
        }
    }

    fn post_json(&mut self, url: &str, api_key: &str, body: &[u8]) -> Result<u16, ()> {
        if self.fail_post {
            return Err(());
        }
        self.posts.push((url.into(), api_key.into(), body.to_vec()));
        Ok(self.status)
    }

    fn restore_radio(&mut self) {
        self.restores += 1;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // MockPin Tests
    // =========================================================================

    #[test]
    fn mock_pin_default_low() {
        let pin = MockPin::new();
        assert!(pin.is_low());
        assert_eq!(pin.writes(), 0);
        assert_eq!(pin.rising_edges(), 0);
    }

    #[test]
    fn mock_pin_counts_edges() {
        let mut pin = MockPin::new();
        for _ in 0..3 {
            pin.set_high().unwrap();
            pin.set_high().unwrap();
            pin.set_low().unwrap();
        }
        assert_eq!(pin.writes(), 9);
        assert_eq!(pin.rising_edges(), 3);
    }

    #[test]
    fn mock_pin_failure_records_nothing() {
        let mut pin = MockPin::new();
        pin.fail_writes(true);
        assert!(pin.set_high().is_err());
        assert_eq!(pin.writes(), 0);
    }

    // =========================================================================
    // MockDelay / MockPwm Tests
    // =========================================================================

    #[test]
    fn mock_delay_ms_goes_through_ns() {
        let mut delay = MockDelay::new();
        delay.delay_ms(2);
        assert_eq!(delay.total_us, 2000);
        assert!(delay.calls.is_empty());
    }

    #[test]
    fn mock_pwm_fraction_scales() {
        let mut pwm = MockPwm::with_max_duty(1023);
        pwm.set_duty_cycle_fraction(1, 2).unwrap();
        assert_eq!(pwm.duty, 511);
    }

    #[test]
    fn mock_pwm_failure() {
        let mut pwm = MockPwm::new();
        pwm.fail = true;
        assert!(pwm.set_duty_cycle(10).is_err());
        assert_eq!(pwm.writes, 0);
    }

    // =========================================================================
    // MockClock / MockLightSensor Tests
    // =========================================================================

    #[test]
    fn mock_clock_advance() {
        let mut clock = MockClock::new();
        clock.advance(500);
        assert_eq!(clock.now_ms(), 500);
        clock.advance(250);
        assert_eq!(clock.now_ms(), 750);
    }

    #[test]
    fn mock_clock_steps_per_read() {
        let mut clock = MockClock::with_step(4);
        clock.set(100);
        assert_eq!(clock.now_ms(), 100);
        assert_eq!(clock.now_ms(), 104);
    }

    #[test]
    fn mock_light_sensor() {
        let mut sensor = MockLightSensor::new(1234);
        assert_eq!(sensor.read_raw(), Ok(1234));
        sensor.fail = true;
        assert!(sensor.read_raw().is_err());
        assert_eq!(sensor.reads, 2);
    }

    // =========================================================================
    // Network Mock Tests
    // =========================================================================

    #[test]
    fn mock_radio_filters_by_peer() {
        let mut radio = MockRadio::new();
        let a = PeerAddress([1; 6]);
        let b = PeerAddress([2; 6]);
        radio.send(a, &[1]).unwrap();
        radio.send(b, &[2]).unwrap();
        radio.send(a, &[3]).unwrap();

        assert_eq!(radio.sent_to(a), vec![&[1u8][..], &[3u8][..]]);
        assert_eq!(radio.sent_to(b).len(), 1);
    }

    #[test]
    fn mock_radio_failure() {
        let mut radio = MockRadio::new();
        radio.fail = true;
        assert!(radio.send(PeerAddress::default(), &[0]).is_err());
        assert!(radio.sent.is_empty());
    }

    #[test]
    fn mock_uplink_defaults() {
        let mut uplink = MockUplink::new();
        uplink.associate().unwrap();
        assert_eq!(uplink.post_json("u", "k", b"{}"), Ok(200));
        uplink.restore_radio();
        assert_eq!((uplink.associations, uplink.restores), (1, 1));
    }
}
