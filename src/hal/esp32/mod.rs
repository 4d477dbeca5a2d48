//! ESP32 hardware abstraction layer for the room nodes.
//!
//! All three boards are classic ESP32 modules (the main node is a TTGO
//! T-Display). Actuator pins are driven through `esp-idf-hal` drivers, which
//! implement the `embedded-hal` 1.0 traits the core consumes directly:
//!
//! | Core need | Driver |
//! |-----------|--------|
//! | `OutputPin` | `PinDriver<_, Output>` |
//! | `DelayNs` | `esp_idf_hal::delay::Ets` |
//! | `SetDutyCycle` | `LedcDriver` |
//!
//! This module adds the implementations of the crate's own traits.
//!
//! # Pin Assignments
//!
//! See the [`pins`] module.

mod clock;
mod radio;
mod sensor;
mod uplink;
mod wifi;

pub use clock::Esp32Clock;
pub use radio::EspNowLink;
pub use sensor::Esp32LightSensor;
pub use uplink::{current_channel, Esp32Uplink};
pub use wifi::start_station;

/// Parks the calling task forever.
///
/// Used when the radio cannot be brought up: without it the node has
/// nothing to do.
pub fn halt() -> ! {
    loop {
        esp_idf_hal::delay::FreeRtos::delay_ms(1000);
    }
}

/// Pin assignments for the three boards.
pub mod pins {
    // =========================================================================
    // Main Node (TTGO)
    // =========================================================================

    /// Blinds button (to GND, internal pull-up)
    pub const MAIN_BLINDS_BTN: i32 = 21;

    /// Desk light button (to GND, internal pull-up)
    pub const MAIN_LIGHT_BTN: i32 = 22;

    /// Night-mode button (to GND, internal pull-up)
    pub const MAIN_NIGHT_BTN: i32 = 13;

    /// Photoresistor divider, ADC1
    pub const MAIN_LDR: i32 = 32;

    // =========================================================================
    // Blinds Node (STEP/DIR/EN driver)
    // =========================================================================

    /// Driver enable (active low)
    pub const BLINDS_EN: i32 = 25;

    /// Step pulse output
    pub const BLINDS_STEP: i32 = 22;

    /// Direction output
    pub const BLINDS_DIR: i32 = 21;

    // =========================================================================
    // LED Node (low-side MOSFET)
    // =========================================================================

    /// On/off button. Input-only pin without pull-ups: needs an external one.
    pub const LED_TOGGLE_BTN: i32 = 35;

    /// Brighter button (internal pull-up)
    pub const LED_UP_BTN: i32 = 32;

    /// Dimmer button (internal pull-up)
    pub const LED_DOWN_BTN: i32 = 33;

    /// PWM to the MOSFET gate driver (inverted)
    pub const LED_GATE: i32 = 22;

    /// LEDC frequency for the LED strip
    pub const LED_PWM_FREQ_HZ: u32 = 5_000;
}
