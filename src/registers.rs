//! DS3231 register map and typed register images.
//!
//! Each register the clock touches gets a `bitfield` wrapper so that digits,
//! mask bits and mode bits are addressed by name instead of by shifting by
//! hand. The wrappers convert to and from the raw `u8` moved over the bus.

use bitfield::bitfield;

/// Register addresses for the DS3231 RTC.
#[allow(unused)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegAddr {
    /// Seconds register (0-59)
    Seconds = 0x00,
    /// Minutes register (0-59)
    Minutes = 0x01,
    /// Hours register (0-23, 12-hour mode is never written)
    Hours = 0x02,
    /// Day of week register (1-7)
    Day = 0x03,
    /// Date register (1-31)
    Date = 0x04,
    /// Month register (1-12) and century flag
    Month = 0x05,
    /// Year register (0-99)
    Year = 0x06,
    /// Alarm 1 seconds register
    Alarm1Seconds = 0x07,
    /// Alarm 1 minutes register
    Alarm1Minutes = 0x08,
    /// Alarm 1 hours register
    Alarm1Hours = 0x09,
    /// Alarm 1 day/date register
    Alarm1DayDate = 0x0A,
    /// Alarm 2 minutes register
    Alarm2Minutes = 0x0B,
    /// Alarm 2 hours register
    Alarm2Hours = 0x0C,
    /// Alarm 2 day/date register
    Alarm2DayDate = 0x0D,
    /// Control register
    Control = 0x0E,
    /// Control/Status register
    ControlStatus = 0x0F,
    /// Aging offset register
    AgingOffset = 0x10,
    /// Temperature MSB register
    MSBTemp = 0x11,
    /// Temperature LSB register
    LSBTemp = 0x12,
}

// Two-way conversion between a mode enum and the bits a bitfield hands out.
// The bitfield only ever passes values of the field's width, so the panic
// arm is unreachable through register access.
macro_rules! register_enum {
    ($typ:ident { $($value:literal => $variant:ident),+ $(,)? }) => {
        impl From<u8> for $typ {
            /// # Panics
            /// Panics if the value does not name a variant.
            fn from(v: u8) -> Self {
                match v {
                    $($value => $typ::$variant,)+
                    _ => panic!(concat!("Invalid value for ", stringify!($typ), ": {}"), v),
                }
            }
        }
        impl From<$typ> for u8 {
            fn from(v: $typ) -> Self {
                v as u8
            }
        }
    };
}

/// Hour register format (bit 6 of the hours registers).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeRepresentation {
    /// 0-23
    TwentyFourHour = 0,
    /// 1-12 with a PM flag, only ever decoded
    TwelveHour = 1,
}
register_enum!(TimeRepresentation { 0 => TwentyFourHour, 1 => TwelveHour });

/// EOSC, active low.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Oscillator {
    /// Keeps running on battery
    Enabled = 0,
    /// Stops when on battery
    Disabled = 1,
}
register_enum!(Oscillator { 0 => Enabled, 1 => Disabled });

/// INTCN: what the INT/SQW pin carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptControl {
    SquareWave = 0,
    /// Alarm interrupts, active low
    Interrupt = 1,
}
register_enum!(InterruptControl { 0 => SquareWave, 1 => Interrupt });

/// RS2/RS1.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SquareWaveFrequency {
    Hz1 = 0b00,
    Hz1024 = 0b01,
    Hz4096 = 0b10,
    Hz8192 = 0b11,
}
register_enum!(SquareWaveFrequency {
    0b00 => Hz1,
    0b01 => Hz1024,
    0b10 => Hz4096,
    0b11 => Hz8192,
});

/// DY/DT bit of the alarm day/date registers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DayDateSelect {
    /// Day of the month, 1-31
    Date = 0,
    /// Day of the week, 1-7 (1 = Sunday)
    Day = 1,
}
register_enum!(DayDateSelect { 0 => Date, 1 => Day });

// Raw byte conversions of a bitfield register type
macro_rules! from_register_u8 {
    ($typ:ty) => {
        impl From<u8> for $typ {
            fn from(v: u8) -> Self {
                paste::paste!([< $typ >](v))
            }
        }
        impl From<$typ> for u8 {
            fn from(v: $typ) -> Self {
                v.0
            }
        }
    };
}

bitfield! {
    /// Seconds register (0-59).
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct Seconds(u8);
    impl Debug;
    pub ten_seconds, set_ten_seconds: 6, 4;
    pub seconds, set_seconds: 3, 0;
}
from_register_u8!(Seconds);

bitfield! {
    /// Minutes register (0-59).
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct Minutes(u8);
    impl Debug;
    pub ten_minutes, set_ten_minutes: 6, 4;
    pub minutes, set_minutes: 3, 0;
}
from_register_u8!(Minutes);

bitfield! {
    /// Hours register.
    ///
    /// In 24-hour mode bits 5..4 hold the tens digit; in 12-hour mode bit 5
    /// is the PM flag and only bit 4 is a digit.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct Hours(u8);
    impl Debug;
    pub from into TimeRepresentation, time_representation, set_time_representation: 6, 6;
    pub pm_or_twenty_hours, set_pm_or_twenty_hours: 5, 5;
    pub ten_hours, set_ten_hours: 4, 4;
    pub hours, set_hours: 3, 0;
}
from_register_u8!(Hours);

bitfield! {
    /// Day of week register (1-7). Bits 7..3 are unused.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct Day(u8);
    impl Debug;
    pub day, set_day: 2, 0;
}
from_register_u8!(Day);

bitfield! {
    /// Date register (1-31).
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct Date(u8);
    impl Debug;
    pub ten_date, set_ten_date: 5, 4;
    pub date, set_date: 3, 0;
}
from_register_u8!(Date);

bitfield! {
    /// Month register (1-12) sharing its top bit with the century flag.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct Month(u8);
    impl Debug;
    /// Set once the two-digit year wraps from 99 to 00
    pub century, set_century: 7;
    pub ten_month, set_ten_month: 4, 4;
    pub month, set_month: 3, 0;
}
from_register_u8!(Month);

bitfield! {
    /// Year register (0-99).
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct Year(u8);
    impl Debug;
    pub ten_year, set_ten_year: 7, 4;
    pub year, set_year: 3, 0;
}
from_register_u8!(Year);

bitfield! {
    /// Control register.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct Control(u8);
    impl Debug;
    pub from into Oscillator, oscillator_enable, set_oscillator_enable: 7, 7;
    pub battery_backed_square_wave, set_battery_backed_square_wave: 6;
    pub convert_temperature, set_convert_temperature: 5;
    pub from into SquareWaveFrequency, square_wave_frequency, set_square_wave_frequency: 4, 3;
    pub from into InterruptControl, interrupt_control, set_interrupt_control: 2, 2;
    pub alarm2_interrupt_enable, set_alarm2_interrupt_enable: 1;
    pub alarm1_interrupt_enable, set_alarm1_interrupt_enable: 0;
}
from_register_u8!(Control);

bitfield! {
    /// Control/Status register.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct Status(u8);
    impl Debug;
    /// Oscillator stopped at some point; the time is not trustworthy
    pub oscillator_stop_flag, set_oscillator_stop_flag: 7;
    pub enable_32khz_output, set_enable_32khz_output: 3;
    /// Temperature conversion in progress
    pub busy, set_busy: 2;
    pub alarm2_flag, set_alarm2_flag: 1;
    pub alarm1_flag, set_alarm1_flag: 0;
}
from_register_u8!(Status);

bitfield! {
    /// Temperature register, integer part in two's complement.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct Temperature(u8);
    impl Debug;
    pub i8, temperature, set_temperature: 7, 0;
}
from_register_u8!(Temperature);

bitfield! {
    /// Temperature register, fractional part in bits 7..6.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct TemperatureFraction(u8);
    impl Debug;
    /// Quarter degrees (0-3)
    pub quarters, set_quarters: 7, 6;
}
from_register_u8!(TemperatureFraction);

bitfield! {
    /// Alarm 1 seconds register with mask bit A1M1.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct AlarmSeconds(u8);
    impl Debug;
    pub alarm_mask, set_alarm_mask: 7;
    pub ten_seconds, set_ten_seconds: 6, 4;
    pub seconds, set_seconds: 3, 0;
}
from_register_u8!(AlarmSeconds);

bitfield! {
    /// Alarm minutes register with mask bit A1M2/A2M2.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct AlarmMinutes(u8);
    impl Debug;
    pub alarm_mask, set_alarm_mask: 7;
    pub ten_minutes, set_ten_minutes: 6, 4;
    pub minutes, set_minutes: 3, 0;
}
from_register_u8!(AlarmMinutes);

bitfield! {
    /// Alarm hours register with mask bit A1M3/A2M3.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct AlarmHours(u8);
    impl Debug;
    pub alarm_mask, set_alarm_mask: 7;
    pub from into TimeRepresentation, time_representation, set_time_representation: 6, 6;
    pub pm_or_twenty_hours, set_pm_or_twenty_hours: 5, 5;
    pub ten_hours, set_ten_hours: 4, 4;
    pub hours, set_hours: 3, 0;
}
from_register_u8!(AlarmHours);

bitfield! {
    /// Alarm day/date register with mask bit A1M4/A2M4 and the DY/DT selector.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct AlarmDayDate(u8);
    impl Debug;
    pub alarm_mask, set_alarm_mask: 7;
    pub from into DayDateSelect, day_date_select, set_day_date_select: 6, 6;
    /// Tens of the date; zero when matching a weekday
    pub ten_date, set_ten_date: 5, 4;
    /// Weekday, or ones of the date
    pub day_or_date, set_day_or_date: 3, 0;
}
from_register_u8!(AlarmDayDate);

#[cfg(feature = "defmt")]
impl defmt::Format for Month {
    fn format(&self, f: defmt::Formatter) {
        let month = 10 * self.ten_month() + self.month();
        if self.century() {
            defmt::write!(f, "Month({}, century)", month);
        } else {
            defmt::write!(f, "Month({})", month);
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Status {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Status(OSF={} BSY={} A2F={} A1F={})",
            self.oscillator_stop_flag(),
            self.busy(),
            self.alarm2_flag(),
            self.alarm1_flag()
        );
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Control {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Control({=u8:#x}) A2IE={} A1IE={}",
            self.0,
            self.alarm2_interrupt_enable(),
            self.alarm1_interrupt_enable()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_date_select_conversions() {
        assert_eq!(DayDateSelect::from(0), DayDateSelect::Date);
        assert_eq!(DayDateSelect::from(1), DayDateSelect::Day);
        assert_eq!(u8::from(DayDateSelect::Day), 1);
    }

    #[test]
    #[should_panic(expected = "Invalid value for DayDateSelect: 2")]
    fn test_invalid_day_date_select_conversion() {
        let _ = DayDateSelect::from(2);
    }

    #[test]
    fn test_hours_register_twenty_four_hour() {
        let hours = Hours::from(0x23);
        assert_eq!(
            hours.time_representation(),
            TimeRepresentation::TwentyFourHour
        );
        assert_eq!(hours.pm_or_twenty_hours(), 1);
        assert_eq!(hours.ten_hours(), 0);
        assert_eq!(hours.hours(), 3);
    }

    #[test]
    fn test_hours_register_twelve_hour_pm() {
        let hours = Hours::from(0x72); // 12 PM
        assert_eq!(hours.time_representation(), TimeRepresentation::TwelveHour);
        assert_eq!(hours.pm_or_twenty_hours(), 1);
        assert_eq!(hours.ten_hours(), 1);
        assert_eq!(hours.hours(), 2);
    }

    #[test]
    fn test_day_register_ignores_upper_bits() {
        let day = Day::from(0x85);
        assert_eq!(day.day(), 5);
    }

    #[test]
    fn test_month_register_century() {
        let month = Month::from(0x92);
        assert!(month.century());
        assert_eq!(month.ten_month(), 1);
        assert_eq!(month.month(), 2);

        let mut month = Month::from(0x12);
        assert!(!month.century());
        month.set_century(true);
        assert_eq!(u8::from(month), 0x92);
    }

    #[test]
    fn test_status_flags() {
        let status = Status::from(0b1000_0011);
        assert!(status.oscillator_stop_flag());
        assert!(status.alarm1_flag());
        assert!(status.alarm2_flag());
        assert!(!status.busy());
    }

    #[test]
    fn test_control_fields() {
        let mut control = Control::default();
        control.set_interrupt_control(InterruptControl::Interrupt);
        control.set_alarm1_interrupt_enable(true);
        control.set_square_wave_frequency(SquareWaveFrequency::Hz8192);
        assert_eq!(u8::from(control), 0b0001_1101);
        assert_eq!(control.oscillator_enable(), Oscillator::Enabled);
    }

    #[test]
    fn test_temperature_registers() {
        assert_eq!(Temperature::from(0x19).temperature(), 25);
        assert_eq!(Temperature::from(0xE6).temperature(), -26);
        assert_eq!(TemperatureFraction::from(0x40).quarters(), 1);
        assert_eq!(TemperatureFraction::from(0xFF).quarters(), 3);
    }

    #[test]
    fn test_alarm_day_date_register() {
        let reg = AlarmDayDate::from(0b1100_0101);
        assert!(reg.alarm_mask());
        assert_eq!(reg.day_date_select(), DayDateSelect::Day);
        assert_eq!(reg.day_or_date(), 5);

        let reg = AlarmDayDate::from(0x31);
        assert!(!reg.alarm_mask());
        assert_eq!(reg.day_date_select(), DayDateSelect::Date);
        assert_eq!(reg.ten_date(), 3);
        assert_eq!(reg.day_or_date(), 1);
    }
}
