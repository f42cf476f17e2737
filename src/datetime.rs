//! Time block codec for the DS3231.
//!
//! The DS3231 keeps the current time in 7 consecutive BCD registers
//! (seconds, minutes, hours, day, date, month, year). The two-digit year is
//! extended to 2000-2199 by the century flag stored in bit 7 of the month
//! register, so month and year are logically one field split over two bytes.
//!
//! [`Time`] is the validated, decoded form. It is a register codec, not a
//! calendar: February 30 goes through untouched.
//!
//! # Error Handling
//!
//! Conversion errors are reported via [`TimeError`].

use core::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::bcd::{self, BcdError};
use crate::layout::{self, RegisterField};
use crate::{Date, Day, Hours, Minutes, Month, Seconds, TimeRepresentation, Year};

/// Decoded contents of the time registers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Time {
    /// 0-59
    pub second: u8,
    /// 0-59
    pub minute: u8,
    /// 0-23
    pub hour: u8,
    /// 1-7, 1 = Sunday
    pub weekday: u8,
    /// Day of the month, 1-31
    pub date: u8,
    /// 1-12
    pub month: u8,
    /// 2000-2199
    pub year: u16,
}

impl Default for Time {
    /// Midnight, Saturday 2000-01-01.
    fn default() -> Self {
        Self {
            second: 0,
            minute: 0,
            hour: 0,
            weekday: 7,
            date: 1,
            month: 1,
            year: 2000,
        }
    }
}

/// One settable field of [`Time`], in editing order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeField {
    Second,
    Minute,
    Hour,
    Weekday,
    Date,
    Month,
    Year,
}

impl TimeField {
    /// All fields, second first.
    pub const ALL: [TimeField; 7] = [
        TimeField::Second,
        TimeField::Minute,
        TimeField::Hour,
        TimeField::Weekday,
        TimeField::Date,
        TimeField::Month,
        TimeField::Year,
    ];

    /// The field after this one, `None` after the year.
    #[must_use]
    pub fn next(self) -> Option<TimeField> {
        Self::ALL.get(self as usize + 1).copied()
    }

    /// The field before this one, `None` before the second.
    #[must_use]
    pub fn previous(self) -> Option<TimeField> {
        (self as usize).checked_sub(1).map(|i| Self::ALL[i])
    }

    /// Valid values of the field.
    #[must_use]
    pub fn range(self) -> RangeInclusive<u16> {
        match self {
            TimeField::Second | TimeField::Minute => 0..=59,
            TimeField::Hour => 0..=23,
            TimeField::Weekday => 1..=7,
            TimeField::Date => 1..=31,
            TimeField::Month => 1..=12,
            TimeField::Year => 2000..=2199,
        }
    }

    /// Register the field is stored in. For the year this is the two-digit
    /// part only; the century lives in [`layout::MONTH`].
    #[must_use]
    pub fn register(self) -> RegisterField {
        layout::TIME_REGISTERS[self as usize]
    }

    fn check(self, value: u16) -> Result<u16, TimeError> {
        if self.range().contains(&value) {
            Ok(value)
        } else {
            Err(TimeError::OutOfRange { field: self, value })
        }
    }

    /// Encodes a second, minute, hour, weekday or date for a direct write.
    ///
    /// Hours are always encoded in 24-hour mode. Month and year share the
    /// month register and are encoded with [`encode_month`] and
    /// [`encode_year`] instead.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::OutOfRange`] if `value` is outside [`Self::range`],
    /// or [`TimeError::NeedsMonthRegister`] for month and year.
    pub fn encode(self, value: u16) -> Result<u8, TimeError> {
        let byte = match self {
            TimeField::Month | TimeField::Year => return Err(TimeError::NeedsMonthRegister),
            TimeField::Second => u8::from(convert_seconds(self.check(value)? as u8)?),
            TimeField::Minute => u8::from(convert_minutes(self.check(value)? as u8)?),
            TimeField::Hour => u8::from(convert_hours(self.check(value)? as u8)?),
            TimeField::Weekday => u8::from(convert_day(self.check(value)? as u8)),
            TimeField::Date => u8::from(convert_date(self.check(value)? as u8)?),
        };
        Ok(self.register().merge(0, byte))
    }
}

/// Errors that can occur during time conversion or validation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeError {
    /// A register held an invalid BCD digit
    Bcd(BcdError),
    /// A value to encode is outside the field's range
    OutOfRange { field: TimeField, value: u16 },
    /// A register decoded to a value outside the field's range
    InvalidRegister { field: TimeField, raw: u8 },
    /// Month and year cannot be encoded without the current month register
    NeedsMonthRegister,
    /// The time is not a calendar date (e.g. February 30)
    NotACalendarDate,
}

impl From<BcdError> for TimeError {
    fn from(e: BcdError) -> Self {
        TimeError::Bcd(e)
    }
}

fn convert_seconds(seconds: u8) -> Result<Seconds, TimeError> {
    let (ones, tens) = bcd::digits(seconds, 59)?;
    let mut value = Seconds::default();
    value.set_seconds(ones);
    value.set_ten_seconds(tens);
    Ok(value)
}

fn convert_minutes(minutes: u8) -> Result<Minutes, TimeError> {
    let (ones, tens) = bcd::digits(minutes, 59)?;
    let mut value = Minutes::default();
    value.set_minutes(ones);
    value.set_ten_minutes(tens);
    Ok(value)
}

pub(crate) fn convert_hours(hour: u8) -> Result<Hours, TimeError> {
    let (ones, tens) = bcd::digits(hour, 23)?;
    let mut value = Hours::default();
    value.set_time_representation(TimeRepresentation::TwentyFourHour);
    value.set_hours(ones);
    value.set_ten_hours(tens & 0x01);
    value.set_pm_or_twenty_hours(tens >> 1);
    Ok(value)
}

/// Turns the digit fields of an hours register into 0-23.
///
/// Handles registers left in 12-hour mode by someone else. `None` means the
/// digits are valid BCD but not an hour.
pub(crate) fn decode_hour(
    representation: TimeRepresentation,
    pm_or_twenty_hours: u8,
    ten_hours: u8,
    hours: u8,
) -> Result<Option<u8>, BcdError> {
    let hour = match representation {
        TimeRepresentation::TwentyFourHour => bcd::join(hours, ten_hours + 2 * pm_or_twenty_hours)?,
        TimeRepresentation::TwelveHour => match (bcd::join(hours, ten_hours)?, pm_or_twenty_hours != 0) {
            (0 | 13.., _) => return Ok(None),
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h + 12,
        },
    };
    Ok((hour <= 23).then_some(hour))
}

fn convert_day(weekday: u8) -> Day {
    let mut value = Day::default();
    value.set_day(weekday);
    value
}

fn convert_date(date: u8) -> Result<Date, TimeError> {
    let (ones, tens) = bcd::digits(date, 31)?;
    let mut value = Date::default();
    value.set_date(ones);
    value.set_ten_date(tens);
    Ok(value)
}

/// Replaces the month digits of `current`, keeping its century flag.
///
/// # Errors
///
/// Returns [`TimeError::OutOfRange`] for months outside 1-12.
pub fn encode_month(current: Month, month: u16) -> Result<Month, TimeError> {
    let month = TimeField::Month.check(month)? as u8;
    let (ones, tens) = bcd::digits(month, 12)?;
    let mut value = current;
    value.set_month(ones);
    value.set_ten_month(tens);
    Ok(value)
}

/// Splits `year` into the year register and the month register carrying the
/// matching century flag.
///
/// The century is `(year / 100) mod 20`, so 20xx clears the flag and 21xx
/// sets it. The month digits of `current` are kept as they are.
///
/// # Errors
///
/// Returns [`TimeError::OutOfRange`] for years outside 2000-2199.
pub fn encode_year(current: Month, year: u16) -> Result<(Month, Year), TimeError> {
    let year = TimeField::Year.check(year)?;
    let century = (year / 100) % 20;
    let (ones, tens) = bcd::digits((year % 100) as u8, 99)?;

    let mut month = current;
    month.set_century(century != 0);
    let mut value = Year::default();
    value.set_year(ones);
    value.set_ten_year(tens);
    debug!("year={} century={}", year, century);
    Ok((month, value))
}

/// Register image of the time block.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct TimeRegisters {
    seconds: Seconds,
    minutes: Minutes,
    hours: Hours,
    day: Day,
    date: Date,
    month: Month,
    year: Year,
}

impl TimeRegisters {
    fn decode_field(field: TimeField, raw: u8, value: u16) -> Result<u8, TimeError> {
        if field.range().contains(&value) {
            Ok(value as u8)
        } else {
            Err(TimeError::InvalidRegister { field, raw })
        }
    }

    fn decode_hours(hours: Hours) -> Result<u8, TimeError> {
        let raw = u8::from(hours);
        decode_hour(
            hours.time_representation(),
            hours.pm_or_twenty_hours(),
            hours.ten_hours(),
            hours.hours(),
        )?
        .ok_or(TimeError::InvalidRegister {
            field: TimeField::Hour,
            raw,
        })
    }

    pub(crate) fn decode(self) -> Result<Time, TimeError> {
        let second = bcd::join(self.seconds.seconds(), self.seconds.ten_seconds())?;
        let minute = bcd::join(self.minutes.minutes(), self.minutes.ten_minutes())?;
        let date = bcd::join(self.date.date(), self.date.ten_date())?;
        let month = bcd::join(self.month.month(), self.month.ten_month())?;
        let years = bcd::join(self.year.year(), self.year.ten_year())?;
        let century = if self.month.century() { 100 } else { 0 };

        Ok(Time {
            second: Self::decode_field(TimeField::Second, u8::from(self.seconds), u16::from(second))?,
            minute: Self::decode_field(TimeField::Minute, u8::from(self.minutes), u16::from(minute))?,
            hour: Self::decode_hours(self.hours)?,
            weekday: Self::decode_field(TimeField::Weekday, u8::from(self.day), u16::from(self.day.day()))?,
            date: Self::decode_field(TimeField::Date, u8::from(self.date), u16::from(date))?,
            month: Self::decode_field(TimeField::Month, u8::from(self.month), u16::from(month))?,
            year: 2000 + u16::from(years) + century,
        })
    }

    pub(crate) fn encode(time: &Time) -> Result<Self, TimeError> {
        time.validate()?;
        let (month, year) = encode_year(encode_month(Month::default(), u16::from(time.month))?, time.year)?;
        let raw = TimeRegisters {
            seconds: convert_seconds(time.second)?,
            minutes: convert_minutes(time.minute)?,
            hours: convert_hours(time.hour)?,
            day: convert_day(time.weekday),
            date: convert_date(time.date)?,
            month,
            year,
        };
        let bytes: [u8; 7] = (&raw).into();
        debug!("time registers={:?}", bytes);
        Ok(raw)
    }
}

impl From<[u8; 7]> for TimeRegisters {
    fn from(data: [u8; 7]) -> Self {
        TimeRegisters {
            seconds: Seconds::from(data[0]),
            minutes: Minutes::from(data[1]),
            hours: Hours::from(data[2]),
            day: Day::from(data[3]),
            date: Date::from(data[4]),
            month: Month::from(data[5]),
            year: Year::from(data[6]),
        }
    }
}

impl From<&TimeRegisters> for [u8; 7] {
    fn from(raw: &TimeRegisters) -> [u8; 7] {
        [
            u8::from(raw.seconds),
            u8::from(raw.minutes),
            u8::from(raw.hours),
            u8::from(raw.day),
            u8::from(raw.date),
            u8::from(raw.month),
            u8::from(raw.year),
        ]
    }
}

impl Time {
    /// Decodes the 7-byte register image starting at [`crate::RegAddr::Seconds`].
    ///
    /// # Errors
    ///
    /// Returns an error on invalid BCD digits or out-of-range fields.
    pub fn from_registers(data: [u8; 7]) -> Result<Self, TimeError> {
        TimeRegisters::from(data).decode()
    }

    /// Encodes the time into the 7-byte register image.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::OutOfRange`] if any field is out of range.
    pub fn to_registers(&self) -> Result<[u8; 7], TimeError> {
        Ok((&TimeRegisters::encode(self)?).into())
    }

    /// Checks every field against its range.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::OutOfRange`] naming the first offending field.
    pub fn validate(&self) -> Result<(), TimeError> {
        for field in TimeField::ALL {
            field.check(self.get(field))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, field: TimeField) -> u16 {
        match field {
            TimeField::Second => u16::from(self.second),
            TimeField::Minute => u16::from(self.minute),
            TimeField::Hour => u16::from(self.hour),
            TimeField::Weekday => u16::from(self.weekday),
            TimeField::Date => u16::from(self.date),
            TimeField::Month => u16::from(self.month),
            TimeField::Year => self.year,
        }
    }

    /// Sets one field.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::OutOfRange`] and leaves the time unchanged if
    /// `value` is outside the field's range.
    pub fn set(&mut self, field: TimeField, value: u16) -> Result<(), TimeError> {
        let value = field.check(value)?;
        self.assign(field, value);
        Ok(())
    }

    // Callers guarantee `value` is inside the field's range.
    fn assign(&mut self, field: TimeField, value: u16) {
        match field {
            TimeField::Second => self.second = value as u8,
            TimeField::Minute => self.minute = value as u8,
            TimeField::Hour => self.hour = value as u8,
            TimeField::Weekday => self.weekday = value as u8,
            TimeField::Date => self.date = value as u8,
            TimeField::Month => self.month = value as u8,
            TimeField::Year => self.year = value,
        }
    }

    /// Adds one to `field`, wrapping to the lowest valid value after the
    /// highest. Other fields are not carried into.
    pub fn increment(&mut self, field: TimeField) {
        let range = field.range();
        let current = self.get(field);
        let next = if current >= *range.end() || current < *range.start() {
            *range.start()
        } else {
            current + 1
        };
        self.assign(field, next);
    }
}

impl TryFrom<&NaiveDateTime> for Time {
    type Error = TimeError;

    fn try_from(datetime: &NaiveDateTime) -> Result<Self, Self::Error> {
        let year = u16::try_from(datetime.year()).map_err(|_| TimeError::OutOfRange {
            field: TimeField::Year,
            value: 0,
        })?;
        let time = Time {
            second: datetime.second() as u8,
            minute: datetime.minute() as u8,
            hour: datetime.hour() as u8,
            weekday: datetime.weekday().number_from_sunday() as u8,
            date: datetime.day() as u8,
            month: datetime.month() as u8,
            year,
        };
        time.validate()?;
        Ok(time)
    }
}

impl TryFrom<Time> for NaiveDateTime {
    type Error = TimeError;

    fn try_from(time: Time) -> Result<Self, Self::Error> {
        NaiveDate::from_ymd_opt(
            i32::from(time.year),
            u32::from(time.month),
            u32::from(time.date),
        )
        .and_then(|d| {
            d.and_hms_opt(
                u32::from(time.hour),
                u32::from(time.minute),
                u32::from(time.second),
            )
        })
        .ok_or(TimeError::NotACalendarDate)
    }
}
