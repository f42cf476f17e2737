//! Temperature register decoding.
//!
//! The DS3231 reports the die temperature in two registers: the integer part
//! at [`crate::RegAddr::MSBTemp`] and the quarter-degree fraction in bits 7..6
//! of [`crate::RegAddr::LSBTemp`]. The fraction is applied to the magnitude,
//! so a negative reading moves further from zero as the fraction grows.

use crate::{Temperature, TemperatureFraction};

/// A temperature reading with 0.25 °C resolution.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TemperatureReading {
    quarter_degrees: i16,
}

impl TemperatureReading {
    /// Decodes the register pair. The low 6 bits of the fraction register are
    /// ignored.
    #[must_use]
    pub fn from_registers(msb: Temperature, lsb: TemperatureFraction) -> Self {
        let integer = i16::from(msb.temperature());
        let quarters = i16::from(lsb.quarters());
        let quarter_degrees = if integer < 0 {
            integer * 4 - quarters
        } else {
            integer * 4 + quarters
        };
        Self { quarter_degrees }
    }

    /// Decodes the raw bytes read from 0x11 and 0x12.
    #[must_use]
    pub fn from_bytes(msb: u8, lsb: u8) -> Self {
        Self::from_registers(Temperature::from(msb), TemperatureFraction::from(lsb))
    }

    #[must_use]
    pub fn quarter_degrees(self) -> i16 {
        self.quarter_degrees
    }

    /// Temperature in degrees Celsius.
    #[must_use]
    pub fn celsius(self) -> f32 {
        f32::from(self.quarter_degrees) / 4.0
    }
}
