//! Text report printed by the sensor test application.

use core::fmt;

use crate::Measurement;

pub const BANNER: &str = "[SI7021] Test App\n";

/// Each reading in decimal and upper-case hex, one line per quantity.
///
/// Negative readings render their two's-complement bits in the hex field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report(pub Measurement);

impl Report {
    pub fn new(measurement: Measurement) -> Self {
        Self(measurement)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Measurement { temperature, humidity } = self.0;
        writeln!(f, "\tTemp({temperature} 1/100 degrees C) [0x{temperature:X}]")?;
        writeln!(f, "\tHumi({humidity} 0.01%) [0x{humidity:X}]")?;
        writeln!(f)
    }
}
