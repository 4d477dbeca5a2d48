//! Temporary Wi-Fi association and HTTPS POST for event reporting.
//!
//! ESP-NOW runs on the station interface's channel. Joining the access point
//! moves the radio to the AP's channel, so after every report the station is
//! disconnected and the channel recorded at boot is set again.
//!
//! # Example
//!
//! ```ignore
//! use room_nodes::hal::esp32::Esp32Uplink;
//! use room_nodes::ingest::HttpsEventSink;
//!
//! let uplink = Esp32Uplink::new(wifi, &network.wifi, network.ingest.timeout_ms)?;
//! let sink = HttpsEventSink::new(uplink, network.ingest.clone());
//! ```

use std::time::Duration;

use anyhow::Context;
use esp_idf_svc::http::client::{Configuration as HttpConfiguration, EspHttpConnection};
use esp_idf_svc::http::Method;
use esp_idf_svc::io::Write;
use esp_idf_svc::sys::{esp, esp_wifi_get_channel, esp_wifi_set_channel, wifi_second_chan_t};
use esp_idf_svc::sys::wifi_second_chan_t_WIFI_SECOND_CHAN_NONE as SECOND_CHAN_NONE;
use esp_idf_svc::wifi::{BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{debug, info, warn};

use crate::config::WifiConfig;
use crate::traits::Uplink;

/// Radio channel currently in use by the Wi-Fi driver.
pub fn current_channel() -> anyhow::Result<u8> {
    let mut primary: u8 = 0;
    let mut second: wifi_second_chan_t = SECOND_CHAN_NONE;
    // Safe: both pointers are valid for the duration of the call
    esp!(unsafe { esp_wifi_get_channel(&mut primary, &mut second) })?;
    Ok(primary)
}

/// [`Uplink`] over the station interface shared with ESP-NOW.
pub struct Esp32Uplink {
    wifi: BlockingWifi<EspWifi<'static>>,
    station: ClientConfiguration,
    connect_timeout: Duration,
    http_timeout: Duration,
    command_channel: u8,
}

impl Esp32Uplink {
    /// Wraps a started station-mode driver and records the command channel.
    ///
    /// The driver must already be started so the channel is known.
    pub fn new(
        wifi: BlockingWifi<EspWifi<'static>>,
        config: &WifiConfig,
        http_timeout_ms: u32,
    ) -> anyhow::Result<Self> {
        let command_channel = current_channel().context("reading command channel")?;
        info!("uplink: command channel {}", command_channel);

        let station = ClientConfiguration {
            ssid: crate::config::truncated(config.ssid.as_str()),
            password: crate::config::truncated(config.password.as_str()),
            ..Default::default()
        };

        Ok(Self {
            wifi,
            station,
            connect_timeout: Duration::from_millis(u64::from(config.connect_timeout_ms)),
            http_timeout: Duration::from_millis(u64::from(http_timeout_ms)),
            command_channel,
        })
    }

    /// Channel ESP-NOW is restored to after each report.
    pub fn command_channel(&self) -> u8 {
        self.command_channel
    }
}

impl Uplink for Esp32Uplink {
    type Error = anyhow::Error;

    fn associate(&mut self) -> anyhow::Result<()> {
        self.wifi
            .set_configuration(&Configuration::Client(self.station.clone()))?;

        debug!("uplink: connecting to '{}'", self.station.ssid);
        self.wifi.wifi_mut().connect()?;
        let wifi = &self.wifi;
        wifi.wifi_wait_while(
            || wifi.is_connected().map(|connected| !connected),
            Some(self.connect_timeout),
        )
        .context("association timed out")?;
        self.wifi.wait_netif_up()?;

        if let Ok(ip_info) = self.wifi.wifi().sta_netif().get_ip_info() {
            debug!("uplink: associated, IP {}", ip_info.ip);
        }
        Ok(())
    }

    fn post_json(&mut self, url: &str, api_key: &str, body: &[u8]) -> anyhow::Result<u16> {
        let mut conn = EspHttpConnection::new(&HttpConfiguration {
            timeout: Some(self.http_timeout),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        })?;

        let length = body.len().to_string();
        let headers = [
            ("content-type", "application/json"),
            ("content-length", length.as_str()),
            ("x-api-key", api_key),
        ];
        conn.initiate_request(Method::Post, url, &headers)?;
        conn.write_all(body)?;
        conn.flush()?;
        conn.initiate_response()?;

        let status = conn.status();
        debug!("uplink: POST {} -> {}", url, status);
        Ok(status)
    }

    fn restore_radio(&mut self) {
        if let Err(e) = self.wifi.disconnect() {
            debug!("uplink: disconnect: {}", e);
        }
        // Safe: plain driver call with a valid channel number
        let restored = esp!(unsafe { esp_wifi_set_channel(self.command_channel, SECOND_CHAN_NONE) });
        if let Err(e) = restored {
            warn!(
                "uplink: restoring channel {} failed: {}",
                self.command_channel, e
            );
        }
    }
}
