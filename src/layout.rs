//! Field to register map of the DS3231.
//!
//! A [`RegisterField`] names the register a value lives in and the bits that a
//! value write replaces. Everything outside the data mask (alarm mask bits, the
//! DY/DT selector, the century flag) belongs to someone else and survives a
//! [`RegisterField::merge`].

use crate::RegAddr;

/// One value-carrying bit-field of a register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterField {
    /// Register holding the field
    pub addr: RegAddr,
    /// Bits replaced by a value write
    pub data_mask: u8,
}

impl RegisterField {
    #[must_use]
    pub const fn new(addr: RegAddr, data_mask: u8) -> Self {
        Self { addr, data_mask }
    }

    /// Bits a value write must leave untouched.
    #[must_use]
    pub const fn preserved(self) -> u8 {
        !self.data_mask
    }

    /// Replaces the data bits of `current` with `data`.
    ///
    /// Bits of `data` outside the data mask are dropped and bits of `current`
    /// outside it are kept.
    #[must_use]
    pub const fn merge(self, current: u8, data: u8) -> u8 {
        (current & self.preserved()) | (data & self.data_mask)
    }

    #[must_use]
    pub const fn extract(self, raw: u8) -> u8 {
        raw & self.data_mask
    }
}

// The hours mask includes bit 6 so that a value write always lands in
// 24-hour mode.
pub const SECONDS: RegisterField = RegisterField::new(RegAddr::Seconds, 0x7F);
pub const MINUTES: RegisterField = RegisterField::new(RegAddr::Minutes, 0x7F);
pub const HOURS: RegisterField = RegisterField::new(RegAddr::Hours, 0x7F);
pub const DAY: RegisterField = RegisterField::new(RegAddr::Day, 0x07);
pub const DATE: RegisterField = RegisterField::new(RegAddr::Date, 0x3F);
pub const MONTH: RegisterField = RegisterField::new(RegAddr::Month, 0x1F);
pub const YEAR: RegisterField = RegisterField::new(RegAddr::Year, 0xFF);

/// The time block, in register order starting at [`RegAddr::Seconds`].
pub const TIME_REGISTERS: [RegisterField; 7] = [SECONDS, MINUTES, HOURS, DAY, DATE, MONTH, YEAR];

/// Alarm 1 block: seconds, minutes, hours, day/date.
pub const ALARM1_REGISTERS: [RegisterField; 4] = [
    RegisterField::new(RegAddr::Alarm1Seconds, 0x7F),
    RegisterField::new(RegAddr::Alarm1Minutes, 0x7F),
    RegisterField::new(RegAddr::Alarm1Hours, 0x7F),
    RegisterField::new(RegAddr::Alarm1DayDate, 0x3F),
];

/// Alarm 2 block: minutes, hours, day/date.
pub const ALARM2_REGISTERS: [RegisterField; 3] = [
    RegisterField::new(RegAddr::Alarm2Minutes, 0x7F),
    RegisterField::new(RegAddr::Alarm2Hours, 0x7F),
    RegisterField::new(RegAddr::Alarm2DayDate, 0x3F),
];

pub const TEMPERATURE: RegisterField = RegisterField::new(RegAddr::MSBTemp, 0xFF);
pub const TEMPERATURE_FRACTION: RegisterField = RegisterField::new(RegAddr::LSBTemp, 0xC0);
