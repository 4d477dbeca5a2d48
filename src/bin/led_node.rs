//! Desk LED node.
//!
//! Drives a low-side MOSFET with 5 kHz 8-bit PWM. Remote
//! [`LightCommand`](room_nodes::wire::LightCommand)s and three local buttons
//! (toggle, brighter, dimmer) act on the same state.

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{PinDriver, Pull};
use esp_idf_hal::ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use esp_idf_svc::espnow::EspNow;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info};

use room_nodes::debounce::{DebounceConfig, Level};
use room_nodes::hal::esp32::{halt, pins, start_station, Esp32Clock, EspNowLink};
use room_nodes::light::{PwmActuator, PwmConfig};
use room_nodes::node::{LedInputs, LedNode};
use room_nodes::traits::Clock;

fn main() -> anyhow::Result<()> {
    esp_idf_hal::sys::link_patches();
    EspLogger::initialize_default();
    info!("LED node booting");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // =========================================================================
    // Buttons (GPIO35 is input-only with no pull-ups; wired externally)
    // =========================================================================
    let toggle_btn = PinDriver::input(peripherals.pins.gpio35)?;
    let mut up_btn = PinDriver::input(peripherals.pins.gpio32)?;
    up_btn.set_pull(Pull::Up)?;
    let mut down_btn = PinDriver::input(peripherals.pins.gpio33)?;
    down_btn.set_pull(Pull::Up)?;

    // =========================================================================
    // PWM on the MOSFET gate (GPIO22)
    // =========================================================================
    let timer_config = TimerConfig::default()
        .frequency(pins::LED_PWM_FREQ_HZ.Hz())
        .resolution(Resolution::Bits8);
    let timer = LedcTimerDriver::new(peripherals.ledc.timer0, &timer_config)?;
    let pwm = LedcDriver::new(peripherals.ledc.channel0, &timer, peripherals.pins.gpio22)?;

    let light = PwmActuator::new(pwm, PwmConfig::default())?;
    let mut node = LedNode::new(light, DebounceConfig::default());

    // =========================================================================
    // Radio
    // =========================================================================
    let _wifi = start_station(peripherals.modem, sysloop, Some(nvs))?;
    let link = match EspNow::take() {
        Ok(espnow) => EspNowLink::new(espnow),
        Err(e) => {
            error!("ESP-NOW init failed: {}", e);
            halt();
        }
    };
    if let Err(e) = link.deliver_to(node.mailbox()) {
        error!("receive callback registration failed: {}", e);
        halt();
    }
    info!("LED node ready. Local buttons + ESP-NOW commands active.");

    let clock = Esp32Clock::new();
    loop {
        let inputs = LedInputs {
            toggle: Level::from_high(toggle_btn.is_high()),
            up: Level::from_high(up_btn.is_high()),
            down: Level::from_high(down_btn.is_high()),
        };
        if let Err(e) = node.poll(inputs, clock.now_ms()) {
            error!("pwm update failed: {}", e);
        }
        FreeRtos::delay_ms(1);
    }
}
