//! Photoresistor divider read through ADC1.
//!
//! The LDR sits on GPIO32 (ADC1 channel 4), so readings keep working while
//! Wi-Fi is associated. ADC2 would not. With 11 dB attenuation the full
//! 0-3.3 V range maps onto 0-4095; a brighter room reads higher.

use esp_idf_hal::adc::attenuation::DB_11;
use esp_idf_hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::adc::ADC1;
use esp_idf_hal::gpio::Gpio32;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::sys::EspError;

use crate::traits::LightSensor;

/// [`LightSensor`] on GPIO32.
pub struct Esp32LightSensor<'d> {
    channel: AdcChannelDriver<'d, Gpio32, &'d AdcDriver<'d, ADC1>>,
}

impl<'d> Esp32LightSensor<'d> {
    /// Configures the ADC channel.
    pub fn new(
        adc: &'d AdcDriver<'d, ADC1>,
        pin: impl Peripheral<P = Gpio32> + 'd,
    ) -> Result<Self, EspError> {
        let config = AdcChannelConfig {
            attenuation: DB_11,
            ..Default::default()
        };
        Ok(Self {
            channel: AdcChannelDriver::new(adc, pin, &config)?,
        })
    }
}

impl LightSensor for Esp32LightSensor<'_> {
    type Error = EspError;

    fn read_raw(&mut self) -> Result<u16, EspError> {
        self.channel.read_raw()
    }
}
