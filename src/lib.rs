//! Si7021 temperature/humidity sensor and LED bank drivers for embedded
//! targets, built on the [`embedded-hal`] and [`embedded-hal-async`] traits.
//!
//! - [`Si7021Sensor`]: async driver, for Embassy and other async executors.
//! - [`blocking::Si7021`]: the same operations over blocking traits.
//! - [`Leds`]: a fixed bank of GPIO LEDs addressed by index.
//! - [`Report`]: the two-line text report of the sensor test application.
//!
//! Readings are integers in hundredths: `2334` is 23.34 °C, `5479` is 54.79 %RH.
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal
//! [`embedded-hal-async`]: https://docs.rs/embedded-hal-async

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod blocking;
pub mod command;
pub mod led;
pub mod report;
pub mod status;
mod si7021;

pub use command::{DeviceKind, FirmwareRevision, Resolution};
pub use led::{Led, LedError, Leds, Polarity};
pub use report::Report;
pub use si7021::Si7021Sensor;

/// Default 7-bit I2C address of the Si7021.
pub const DEFAULT_ADDRESS: u8 = 0x40;

/// One temperature/humidity sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    /// Hundredths of a degree Celsius.
    pub temperature: i32,
    /// Hundredths of a percent relative humidity.
    pub humidity: i32,
}

impl Measurement {
    pub fn celsius(&self) -> f32 {
        self.temperature as f32 / 100.0
    }

    pub fn humidity_percent(&self) -> f32 {
        self.humidity as f32 / 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Si7021Error {
    I2CError,
    Timeout,
    Crc,
    InvalidArgument,
    UnknownDevice,
}

/// How the host waits for a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MeasurementMode {
    /// The sensor holds SCL low until the result is ready.
    #[default]
    Hold,
    /// The host waits the worst-case conversion time, then polls.
    NoHold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub address: u8,
    pub mode: MeasurementMode,
    /// Applied by `init()`.
    pub resolution: Resolution,
    /// Reject measurement frames whose checksum does not match.
    pub validate_crc: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            mode: MeasurementMode::Hold,
            resolution: Resolution::Rh12T14,
            validate_crc: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measurement_scales_hundredths() {
        let m = Measurement { temperature: 2334, humidity: 5479 };
        assert!((m.celsius() - 23.34).abs() < 1e-4);
        assert!((m.humidity_percent() - 54.79).abs() < 1e-4);
    }

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.address, 0x40);
        assert_eq!(config.mode, MeasurementMode::Hold);
        assert_eq!(config.resolution, Resolution::Rh12T14);
        assert!(config.validate_crc);
    }
}
