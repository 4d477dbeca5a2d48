//! Hardware abstraction traits not covered by `embedded-hal`.
//!
//! GPIO outputs, PWM channels and microsecond delays use the
//! [`embedded_hal`] 1.0 traits directly. This module adds the two things the
//! nodes need beyond that:
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`Clock`] | Monotonic millisecond time for debouncing and event timestamps |
//! | [`LightSensor`] | Raw ambient light reading on the main node |
//!
//! For host tests use the mocks from [`crate::hal::mock`]. ESP32
//! implementations live in `hal::esp32` (requires the `esp32` feature).

/// Time source in milliseconds.
///
/// # Example
///
/// ```rust
/// use room_nodes::traits::Clock;
/// use room_nodes::hal::MockClock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(30);
/// assert_eq!(clock.now_ms(), 30);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    ///
    /// Must be monotonically increasing.
    fn now_ms(&self) -> u64;
}

/// Analog ambient light sensor (photoresistor divider on an ADC pin).
///
/// Higher readings mean a brighter room.
pub trait LightSensor {
    /// Error type for sensor reads.
    type Error: core::fmt::Debug;

    /// Reads the raw ADC value.
    fn read_raw(&mut self) -> Result<u16, Self::Error>;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}
