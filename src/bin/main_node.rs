//! Main controller node (TTGO T-Display).
//!
//! Reads three buttons and a photoresistor, sends ESP-NOW commands to the
//! blinds and LED nodes, and reports every toggle to the ingestion endpoint.
//!
//! # Configuration
//!
//! Credentials and peers are baked in at build time:
//!
//! ```bash
//! WIFI_SSID=... WIFI_PASS=... \
//! INGEST_URL=https://.../ingestEvent INGEST_API_KEY=... \
//! BLINDS_PEER=14:33:5C:02:AD:70 LIGHT_PEER=6C:C8:40:89:73:E8 \
//! cargo build --release --features esp32 --bin main_node
//! ```
//!
//! `SOURCE_ID` optionally overrides the reported source (default
//! `main-ttgo`).

use esp_idf_hal::adc::oneshot::AdcDriver;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{PinDriver, Pull};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::espnow::EspNow;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info, warn};

use room_nodes::config::{DispatcherConfig, NetworkConfig, RequiredField};
use room_nodes::debounce::{DebounceConfig, Level};
use room_nodes::dispatcher::Dispatcher;
use room_nodes::hal::esp32::{
    halt, start_station, Esp32Clock, Esp32LightSensor, Esp32Uplink, EspNowLink,
};
use room_nodes::ingest::HttpsEventSink;
use room_nodes::node::{MainInputs, MainNode};

/// Loop pause between ticks in milliseconds
const LOOP_INTERVAL_MS: u32 = 1;

/// Build-time values for the required network fields.
fn build_env(field: RequiredField) -> Option<&'static str> {
    match field {
        RequiredField::WifiSsid => option_env!("WIFI_SSID"),
        RequiredField::WifiPassword => option_env!("WIFI_PASS"),
        RequiredField::IngestUrl => option_env!("INGEST_URL"),
        RequiredField::IngestApiKey => option_env!("INGEST_API_KEY"),
        RequiredField::BlindsPeer => option_env!("BLINDS_PEER"),
        RequiredField::LightPeer => option_env!("LIGHT_PEER"),
    }
}

fn main() -> anyhow::Result<()> {
    esp_idf_hal::sys::link_patches();
    EspLogger::initialize_default();
    info!("main controller booting");

    // =========================================================================
    // Configuration
    // =========================================================================
    let network = NetworkConfig::from_lookup(build_env)?
        .with_source_id(option_env!("SOURCE_ID").unwrap_or("main-ttgo"));

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // =========================================================================
    // Inputs (buttons to GND with internal pull-ups, LDR on ADC1)
    // =========================================================================
    let mut blinds_btn = PinDriver::input(peripherals.pins.gpio21)?;
    blinds_btn.set_pull(Pull::Up)?;
    let mut light_btn = PinDriver::input(peripherals.pins.gpio22)?;
    light_btn.set_pull(Pull::Up)?;
    let mut night_btn = PinDriver::input(peripherals.pins.gpio13)?;
    night_btn.set_pull(Pull::Up)?;

    let adc1 = AdcDriver::new(peripherals.adc1)?;
    let sensor = Esp32LightSensor::new(&adc1, peripherals.pins.gpio32)?;

    // =========================================================================
    // Radio
    // =========================================================================
    let wifi = start_station(peripherals.modem, sysloop, Some(nvs))?;
    let espnow = match EspNow::take() {
        Ok(espnow) => espnow,
        Err(e) => {
            error!("ESP-NOW init failed: {}", e);
            halt();
        }
    };
    let link = EspNowLink::new(espnow);
    if let Err(e) = link.log_send_results() {
        warn!("send callback registration failed: {}", e);
    }
    for (name, peer) in [("blinds", network.peers.blinds), ("light", network.peers.light)] {
        if let Err(e) = link.add_peer(peer) {
            warn!("add_peer ({}) failed: {}", name, e);
        }
    }

    // =========================================================================
    // Reporting and dispatch
    // =========================================================================
    let uplink = Esp32Uplink::new(wifi, &network.wifi, network.ingest.timeout_ms)?;
    let sink = HttpsEventSink::new(uplink, network.ingest.clone());
    let dispatcher = Dispatcher::new(link, sink, network.peers, DispatcherConfig::default())
        .with_source(network.ingest.source_id.as_str());
    let clock = Esp32Clock::new();
    let mut node = MainNode::new(dispatcher, sensor, clock, DebounceConfig::default());
    info!("main controller ready");

    loop {
        let inputs = MainInputs {
            blinds: Level::from_high(blinds_btn.is_high()),
            light: Level::from_high(light_btn.is_high()),
            night: Level::from_high(night_btn.is_high()),
        };
        node.tick(inputs);
        FreeRtos::delay_ms(LOOP_INTERVAL_MS);
    }
}
