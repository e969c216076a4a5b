//! Si7021 command set, register layout and raw-code conversions.
//!
//! Shared by the async and blocking drivers; nothing here touches the bus.

use embassy_time::Duration;

use crate::Si7021Error;

pub const MEASURE_RH_HOLD: u8 = 0xE5;
pub const MEASURE_RH_NO_HOLD: u8 = 0xF5;
pub const MEASURE_TEMP_HOLD: u8 = 0xE3;
pub const MEASURE_TEMP_NO_HOLD: u8 = 0xF3;
pub const READ_TEMP_FROM_PREVIOUS_RH: u8 = 0xE0;
pub const RESET: u8 = 0xFE;
pub const WRITE_USER_REG1: u8 = 0xE6;
pub const READ_USER_REG1: u8 = 0xE7;
pub const WRITE_HEATER_CONTROL: u8 = 0x51;
pub const READ_HEATER_CONTROL: u8 = 0x11;
pub const READ_ID_FIRST_ACCESS: [u8; 2] = [0xFA, 0x0F];
pub const READ_ID_SECOND_ACCESS: [u8; 2] = [0xFC, 0xC9];
pub const READ_FIRMWARE_REVISION: [u8; 2] = [0x84, 0xB8];

/// Time the sensor needs after a soft reset before it accepts commands.
pub const RESET_SETTLE: Duration = Duration::from_millis(15);
/// Interval between read attempts while a no-hold conversion is pending.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);
pub const MAX_POLLS: usize = 10;

pub const HEATER_ENABLE_BIT: u8 = 1 << 2;
const RES1_BIT: u8 = 1 << 7;
const RES0_BIT: u8 = 1 << 0;
pub const HEATER_CURRENT_MASK: u8 = 0x0F;

/// Measurement resolution, user register 1 bits D7 (RES1) and D0 (RES0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    /// RH 12 bit, temperature 14 bit.
    #[default]
    Rh12T14,
    /// RH 8 bit, temperature 12 bit.
    Rh8T12,
    /// RH 10 bit, temperature 13 bit.
    Rh10T13,
    /// RH 11 bit, temperature 11 bit.
    Rh11T11,
}

impl Resolution {
    pub fn from_user_register(reg: u8) -> Self {
        match (reg & RES1_BIT != 0, reg & RES0_BIT != 0) {
            (false, false) => Resolution::Rh12T14,
            (false, true) => Resolution::Rh8T12,
            (true, false) => Resolution::Rh10T13,
            (true, true) => Resolution::Rh11T11,
        }
    }

    /// Replaces the resolution bits of `reg`, leaving every other bit as read.
    pub fn apply_to_user_register(self, reg: u8) -> u8 {
        let bits = match self {
            Resolution::Rh12T14 => 0,
            Resolution::Rh8T12 => RES0_BIT,
            Resolution::Rh10T13 => RES1_BIT,
            Resolution::Rh11T11 => RES1_BIT | RES0_BIT,
        };
        (reg & !(RES1_BIT | RES0_BIT)) | bits
    }

    /// Worst-case humidity conversion time.
    pub fn humidity_conversion(self) -> Duration {
        match self {
            Resolution::Rh12T14 => Duration::from_micros(12_000),
            Resolution::Rh8T12 => Duration::from_micros(3_100),
            Resolution::Rh10T13 => Duration::from_micros(4_500),
            Resolution::Rh11T11 => Duration::from_micros(7_000),
        }
    }

    /// Worst-case temperature conversion time.
    pub fn temperature_conversion(self) -> Duration {
        match self {
            Resolution::Rh12T14 => Duration::from_micros(10_800),
            Resolution::Rh8T12 => Duration::from_micros(3_800),
            Resolution::Rh10T13 => Duration::from_micros(6_200),
            Resolution::Rh11T11 => Duration::from_micros(2_400),
        }
    }

    /// An RH measurement also converts temperature.
    pub fn rh_measurement_time(self) -> Duration {
        self.humidity_conversion() + self.temperature_conversion()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceKind {
    Si7013,
    Si7020,
    Si7021,
    EngineeringSample,
    Unknown(u8),
}

impl From<u8> for DeviceKind {
    fn from(snb3: u8) -> Self {
        match snb3 {
            0x0D => DeviceKind::Si7013,
            0x14 => DeviceKind::Si7020,
            0x15 => DeviceKind::Si7021,
            0x00 | 0xFF => DeviceKind::EngineeringSample,
            other => DeviceKind::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FirmwareRevision {
    V1_0,
    V2_0,
    Unknown(u8),
}

impl From<u8> for FirmwareRevision {
    fn from(value: u8) -> Self {
        match value {
            0xFF => FirmwareRevision::V1_0,
            0x20 => FirmwareRevision::V2_0,
            other => FirmwareRevision::Unknown(other),
        }
    }
}

/// Hundredths of a degree Celsius.
pub fn temperature_from_raw(code: u16) -> i32 {
    ((17572 * code as i32) >> 16) - 4685
}

/// Hundredths of a percent, clamped to 0..=10000.
pub fn humidity_from_raw(code: u16) -> i32 {
    (((12500 * code as i32) >> 16) - 600).clamp(0, 10_000)
}

/// Si70xx checksum: polynomial x^8 + x^5 + x^4 + 1, initial value 0.
#[inline]
pub fn crc8(data: &[u8]) -> u8 {
    const CRC8_POLYNOMIAL: u8 = 0x31;
    const CRC8_INIT: u8 = 0x00;

    let mut crc: u8 = CRC8_INIT;

    for &b in data {
        crc ^= b;
        for _ in 0..8 {
            crc = if (crc & 0x80) != 0 {
                (crc << 1) ^ CRC8_POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }

    crc
}

/// Decodes an `MSB, LSB, CRC` measurement frame.
pub fn parse_checked(frame: &[u8; 3], validate_crc: bool) -> Result<u16, Si7021Error> {
    if validate_crc && crc8(&frame[..2]) != frame[2] {
        warn!("Checksum mismatch: {:?}", frame);
        return Err(Si7021Error::Crc);
    }
    Ok(u16::from_be_bytes([frame[0], frame[1]]))
}

/// Assembles the 64-bit serial number from both electronic-ID reads.
///
/// `first` is `SNA_3, CRC, SNA_2, CRC, SNA_1, CRC, SNA_0, CRC` and
/// `second` is `SNB_3, SNB_2, CRC, SNB_1, SNB_0, CRC`.
pub fn serial_number(first: &[u8; 8], second: &[u8; 6]) -> u64 {
    u64::from_be_bytes([
        first[0], first[2], first[4], first[6], second[0], second[1], second[3], second[4],
    ])
}

pub fn heater_current_register(level: u8) -> Result<u8, Si7021Error> {
    if level > HEATER_CURRENT_MASK {
        return Err(Si7021Error::InvalidArgument);
    }
    Ok(level)
}
