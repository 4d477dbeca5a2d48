//! Station-mode Wi-Fi bring-up shared by every node.
//!
//! ESP-NOW needs the Wi-Fi driver started but not associated. Nodes that
//! only receive commands never associate; the main node associates briefly
//! per report through [`Esp32Uplink`](super::Esp32Uplink).

use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::info;

/// Starts the Wi-Fi driver in station mode without connecting.
///
/// ```ignore
/// let wifi = start_station(peripherals.modem, sysloop, Some(nvs))?;
/// let link = EspNowLink::new(EspNow::take()?);
/// ```
pub fn start_station(
    modem: Modem,
    sysloop: EspSystemEventLoop,
    nvs: Option<EspDefaultNvsPartition>,
) -> anyhow::Result<BlockingWifi<EspWifi<'static>>> {
    let esp_wifi = EspWifi::new(modem, sysloop.clone(), nvs)?;
    let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop)?;

    wifi.set_configuration(&Configuration::Client(ClientConfiguration::default()))?;
    wifi.start()?;

    let mac = wifi.wifi().sta_netif().get_mac()?;
    info!(
        "wifi: station started, MAC {}",
        crate::traits::PeerAddress(mac)
    );
    Ok(wifi)
}
