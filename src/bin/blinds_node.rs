//! Blinds stepper node.
//!
//! Receives [`MotorCommand`](room_nodes::wire::MotorCommand)s over ESP-NOW
//! and drives a STEP/DIR/EN driver. A move blocks the loop; commands that
//! arrive meanwhile wait in the mailbox (latest wins).

use esp_idf_hal::delay::{Ets, FreeRtos};
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::espnow::EspNow;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info};

use room_nodes::hal::esp32::{halt, start_station, EspNowLink};
use room_nodes::node::BlindsNode;
use room_nodes::stepper::{StepperActuator, StepperConfig};

fn main() -> anyhow::Result<()> {
    esp_idf_hal::sys::link_patches();
    EspLogger::initialize_default();
    info!("motor node booting");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // =========================================================================
    // Stepper driver (EN 25, STEP 22, DIR 21)
    // =========================================================================
    let stepper = StepperActuator::new(
        PinDriver::output(peripherals.pins.gpio22)?,
        PinDriver::output(peripherals.pins.gpio21)?,
        PinDriver::output(peripherals.pins.gpio25)?,
        Ets,
        StepperConfig::default(),
    )?;
    let mut node = BlindsNode::new(stepper);

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
    info!("ESP-NOW receiver ready");

    loop {
        if let Err(e) = node.poll() {
            error!("move aborted: {}", e);
        }
        FreeRtos::delay_ms(1);
    }
}
