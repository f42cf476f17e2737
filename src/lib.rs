//! Core of a DS3231-based desk clock.
//!
//! The crate has two halves:
//!
//! - A driver for the DS3231 real-time clock ([`DS3231`], and
//!   [`asynch::DS3231`] with the `async` feature) built on register codecs
//!   that are usable without a bus: [`bcd`], [`Time`], [`alarm`] and
//!   [`TemperatureReading`].
//! - The device-mode state machine of the clock ([`mode`], [`clock`]) that
//!   decides whether the clock is running or being reconfigured, and when
//!   edits are committed to the chip.
//!
//! # Features
//!
//! - `async`: adds [`asynch::DS3231`] on `embedded-hal-async`
//! - `log`: logs through the `log` crate
//! - `defmt`: logs through `defmt` and derives `defmt::Format` on public types
//!
//! # Example
//!
//! ```rust,ignore
//! use deskclock::{DS3231, TimeField};
//!
//! let mut rtc = DS3231::new(i2c, deskclock::DEFAULT_ADDRESS);
//! rtc.wait_ready(&mut delay, 10);
//! let now = rtc.time()?;
//! rtc.set_time_field(TimeField::Year, 2100)?;
//! ```
#![no_std]

// Logging macros, defined before the modules so that they are in scope there.
cfg_if::cfg_if! {
    if #[cfg(feature = "defmt")] {
        #[allow(unused_macros)]
        macro_rules! debug {
            ($($arg:tt)*) => { defmt::debug!($($arg)*) };
        }
        #[allow(unused_macros)]
        macro_rules! info {
            ($($arg:tt)*) => { defmt::info!($($arg)*) };
        }
        #[allow(unused_macros)]
        macro_rules! warn {
            ($($arg:tt)*) => { defmt::warn!($($arg)*) };
        }
        #[allow(unused_macros)]
        macro_rules! error {
            ($($arg:tt)*) => { defmt::error!($($arg)*) };
        }
    } else if #[cfg(feature = "log")] {
        #[allow(unused_macros)]
        macro_rules! debug {
            ($($arg:tt)*) => { log::debug!($($arg)*) };
        }
        #[allow(unused_macros)]
        macro_rules! info {
            ($($arg:tt)*) => { log::info!($($arg)*) };
        }
        #[allow(unused_macros)]
        macro_rules! warn {
            ($($arg:tt)*) => { log::warn!($($arg)*) };
        }
        #[allow(unused_macros)]
        macro_rules! error {
            ($($arg:tt)*) => { log::error!($($arg)*) };
        }
    } else {
        #[allow(unused_macros)]
        macro_rules! debug {
            ($($arg:tt)*) => {{ let _ = core::format_args!($($arg)*); }};
        }
        #[allow(unused_macros)]
        macro_rules! info {
            ($($arg:tt)*) => {{ let _ = core::format_args!($($arg)*); }};
        }
        #[allow(unused_macros)]
        macro_rules! warn {
            ($($arg:tt)*) => {{ let _ = core::format_args!($($arg)*); }};
        }
        #[allow(unused_macros)]
        macro_rules! error {
            ($($arg:tt)*) => {{ let _ = core::format_args!($($arg)*); }};
        }
    }
}

pub mod alarm;
#[cfg(feature = "async")]
pub mod asynch;
pub mod bcd;
pub mod clock;
mod datetime;
pub mod layout;
pub mod mode;
mod registers;
mod temperature;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use paste::paste;

pub use alarm::{
    Alarm, Alarm1Mode, Alarm2Mode, AlarmError, AlarmField, AlarmMode, AlarmSpec, DayOrDate,
};
pub use bcd::BcdError;
pub use clock::{ClockConfig, ClockContext, ClockDisplay};
pub use datetime::{encode_month, encode_year, Time, TimeError, TimeField};
pub use mode::{Action, Button, DeviceMode, Event};
pub use registers::*;
pub use temperature::TemperatureReading;

/// The fixed I2C address of the DS3231.
pub const DEFAULT_ADDRESS: u8 = 0x68;

/// Control register settings applied by [`DS3231::configure`].
///
/// The hours are always kept in 24-hour mode, so unlike the control register
/// there is no time representation to choose.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub square_wave_frequency: SquareWaveFrequency,
    pub interrupt_control: InterruptControl,
    pub battery_backed_square_wave: bool,
    pub oscillator_enable: Oscillator,
}

impl Default for Config {
    /// Power-on state of the chip: oscillator on, alarm interrupts on INT/SQW.
    fn default() -> Self {
        Self {
            square_wave_frequency: SquareWaveFrequency::Hz8192,
            interrupt_control: InterruptControl::Interrupt,
            battery_backed_square_wave: false,
            oscillator_enable: Oscillator::Enabled,
        }
    }
}

impl Config {
    /// `control` with these settings applied. Alarm enables and CONV are kept.
    #[must_use]
    pub fn apply(&self, mut control: Control) -> Control {
        control.set_oscillator_enable(self.oscillator_enable);
        control.set_battery_backed_square_wave(self.battery_backed_square_wave);
        control.set_square_wave_frequency(self.square_wave_frequency);
        control.set_interrupt_control(self.interrupt_control);
        control
    }
}

/// Errors returned by the drivers and the clock.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// I2C transport failure
    I2c(E),
    /// Time encoding or decoding failed
    Time(TimeError),
    /// Alarm encoding or decoding failed
    Alarm(AlarmError),
    /// A raw BCD conversion failed
    Bcd(BcdError),
    /// A block write longer than the 7-byte time block was requested
    BlockTooLong(usize),
}

impl<E> From<TimeError> for Error<E> {
    fn from(e: TimeError) -> Self {
        Error::Time(e)
    }
}

impl<E> From<AlarmError> for Error<E> {
    fn from(e: AlarmError) -> Self {
        Error::Alarm(e)
    }
}

impl<E> From<BcdError> for Error<E> {
    fn from(e: BcdError) -> Self {
        Error::Bcd(e)
    }
}

/// DS3231 driver over a blocking `embedded-hal` I2C bus.
///
/// Every operation is a single transaction or a read followed by a write;
/// nothing is retried except [`DS3231::wait_ready`].
pub struct DS3231<I2C: I2c> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> DS3231<I2C> {
    /// Creates a new driver.
    ///
    /// # Arguments
    /// * `i2c` - The I2C bus implementation
    /// * `address` - The I2C address of the device, normally [`DEFAULT_ADDRESS`]
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Gives the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn read_registers(&mut self, start: RegAddr, buf: &mut [u8]) -> Result<(), Error<I2C::Error>> {
        debug!("DS3231: reading {} bytes from {:?}", buf.len(), start);
        self.i2c
            .write_read(self.address, &[start as u8], buf)
            .map_err(Error::I2c)
    }

    fn read_register(&mut self, addr: RegAddr) -> Result<u8, Error<I2C::Error>> {
        let mut data = [0];
        self.read_registers(addr, &mut data)?;
        Ok(data[0])
    }

    fn write_register(&mut self, addr: RegAddr, value: u8) -> Result<(), Error<I2C::Error>> {
        debug!("DS3231: writing {:?}={:#x}", addr, value);
        self.i2c
            .write(self.address, &[addr as u8, value])
            .map_err(Error::I2c)
    }

    fn write_registers(&mut self, start: RegAddr, data: &[u8]) -> Result<(), Error<I2C::Error>> {
        let len = data.len();
        let mut buf = [0; 8];
        buf[0] = start as u8;
        buf.get_mut(1..=len)
            .ok_or(Error::BlockTooLong(len))?
            .copy_from_slice(data);
        debug!("DS3231: writing {} bytes from {:?}", len, start);
        self.i2c
            .write(self.address, &buf[..=len])
            .map_err(Error::I2c)
    }

    /// Polls the status register until the chip answers.
    ///
    /// Bus errors are swallowed and retried after `backoff_ms`, forever. Use
    /// this once at start-up, before the first real transaction.
    ///
    /// # Returns
    /// * The first status register read successfully
    pub fn wait_ready(&mut self, delay: &mut impl DelayNs, backoff_ms: u32) -> Status {
        loop {
            match self.status() {
                Ok(status) => return status,
                Err(_) => {
                    warn!("DS3231: not responding, retrying in {}ms", backoff_ms);
                    delay.delay_ms(backoff_ms);
                }
            }
        }
    }

    /// Applies `config` to the control register.
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(Error::I2c)` on a bus error
    pub fn configure(&mut self, config: &Config) -> Result<(), Error<I2C::Error>> {
        let control = config.apply(self.control()?);
        debug!("DS3231: writing control: {:?}", control);
        self.set_control(control)
    }

    /// Reads and decodes the time block.
    ///
    /// # Returns
    /// * `Ok(Time)` on success
    /// * `Err(Error::Time)` if a register does not decode
    /// * `Err(Error::I2c)` on a bus error
    pub fn time(&mut self) -> Result<Time, Error<I2C::Error>> {
        let mut data = [0; 7];
        self.read_registers(RegAddr::Seconds, &mut data)?;
        Ok(Time::from_registers(data)?)
    }

    /// Writes the whole time block in one transaction.
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(Error::Time)` if a field is out of range; nothing is written
    /// * `Err(Error::I2c)` on a bus error
    pub fn set_time(&mut self, time: &Time) -> Result<(), Error<I2C::Error>> {
        let data = time.to_registers()?;
        self.write_registers(RegAddr::Seconds, &data)
    }

    /// Writes a single time field.
    ///
    /// The month is merged into the month register so the century flag
    /// survives. The year rewrites the month register with the matching
    /// century first, then the year register; a failure between the two
    /// writes leaves them inconsistent.
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(Error::Time)` if `value` is out of range; nothing is written
    /// * `Err(Error::I2c)` on a bus error
    pub fn set_time_field(&mut self, field: TimeField, value: u16) -> Result<(), Error<I2C::Error>> {
        match field {
            TimeField::Month => {
                let month = encode_month(self.month()?, value)?;
                self.set_month(month)
            }
            TimeField::Year => {
                let (month, year) = encode_year(self.month()?, value)?;
                self.set_month(month)?;
                self.set_year(year)
            }
            _ => {
                let byte = field.encode(value)?;
                self.write_register(field.register().addr, byte)
            }
        }
    }

    /// Writes `time` field by field, second first.
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(Error::Time)` if any field is out of range; nothing is written
    /// * `Err(Error::I2c)` on a bus error, earlier fields stay written
    pub fn write_time_fields(&mut self, time: &Time) -> Result<(), Error<I2C::Error>> {
        time.validate()?;
        for field in TimeField::ALL {
            self.set_time_field(field, time.get(field))?;
        }
        info!("DS3231: time written field by field");
        Ok(())
    }

    fn read_alarm_block(&mut self, alarm: Alarm) -> Result<([u8; 4], usize), Error<I2C::Error>> {
        let registers = alarm.registers();
        let mut data = [0; 4];
        self.read_registers(registers[0].addr, &mut data[..registers.len()])?;
        Ok((data, registers.len()))
    }

    /// Changes the match mode of an alarm without touching its values.
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(Error::I2c)` on a bus error
    pub fn set_alarm_mode(&mut self, mode: AlarmMode) -> Result<(), Error<I2C::Error>> {
        let alarm = mode.alarm();
        let (mut data, len) = self.read_alarm_block(alarm)?;
        for (raw, field) in data[..len].iter_mut().zip(alarm.fields()) {
            *raw = mode.apply(*field, *raw);
        }
        self.write_registers(alarm.registers()[0].addr, &data[..len])
    }

    /// Changes one alarm value, keeping its mask bit and DY/DT selector.
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(Error::Alarm)` if the field does not exist on `alarm` or the
    ///   value is out of range; nothing is written
    /// * `Err(Error::I2c)` on a bus error
    pub fn set_alarm_field(
        &mut self,
        alarm: Alarm,
        field: AlarmField,
        value: u8,
    ) -> Result<(), Error<I2C::Error>> {
        let register = field.register(alarm)?;
        let current = self.read_register(register.addr)?;
        let byte = alarm::encode_field(alarm, field, value, current)?;
        self.write_register(register.addr, byte)
    }

    /// Reads and decodes an alarm block.
    ///
    /// # Returns
    /// * `Ok(AlarmSpec)` on success
    /// * `Err(Error::Alarm)` if the block does not decode
    /// * `Err(Error::I2c)` on a bus error
    pub fn read_alarm(&mut self, alarm: Alarm) -> Result<AlarmSpec, Error<I2C::Error>> {
        let (data, len) = self.read_alarm_block(alarm)?;
        Ok(AlarmSpec::from_registers(alarm, &data[..len])?)
    }

    /// Writes a whole alarm block, values and mode, in one transaction.
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(Error::Alarm)` if the alarm does not validate; nothing is written
    /// * `Err(Error::I2c)` on a bus error
    pub fn set_alarm(&mut self, spec: &AlarmSpec) -> Result<(), Error<I2C::Error>> {
        let registers = spec.to_registers()?;
        self.write_registers(spec.alarm().registers()[0].addr, registers.as_slice())
    }

    /// Whether the alarm flag is set in the status register.
    pub fn alarm_triggered(&mut self, alarm: Alarm) -> Result<bool, Error<I2C::Error>> {
        Ok(alarm.triggered(self.status()?))
    }

    /// Clears the flag of `alarm` only.
    pub fn clear_alarm_flag(&mut self, alarm: Alarm) -> Result<(), Error<I2C::Error>> {
        let status = alarm.clear_flag(self.status()?);
        self.set_status(status)
    }

    /// Enables or disables the interrupt of `alarm`. Enabling also routes
    /// INT/SQW to the alarm interrupts.
    pub fn set_alarm_interrupt(&mut self, alarm: Alarm, enabled: bool) -> Result<(), Error<I2C::Error>> {
        let control = alarm.with_interrupt(self.control()?, enabled);
        self.set_control(control)
    }

    /// Reads the last temperature conversion.
    pub fn temperature(&mut self) -> Result<TemperatureReading, Error<I2C::Error>> {
        let mut data = [0; 2];
        self.read_registers(layout::TEMPERATURE.addr, &mut data)?;
        Ok(TemperatureReading::from_bytes(
            layout::TEMPERATURE.extract(data[0]),
            layout::TEMPERATURE_FRACTION.extract(data[1]),
        ))
    }

    /// Starts a temperature conversion unless one is already running.
    ///
    /// # Returns
    /// * `Ok(true)` if a conversion was started
    /// * `Ok(false)` if the chip reported BSY
    /// * `Err(Error::I2c)` on a bus error
    pub fn convert_temperature(&mut self) -> Result<bool, Error<I2C::Error>> {
        if self.status()?.busy() {
            debug!("DS3231: conversion already in progress");
            return Ok(false);
        }
        let mut control = self.control()?;
        control.set_convert_temperature(true);
        self.set_control(control)?;
        Ok(true)
    }

    /// Whether the oscillator stopped since the flag was last cleared.
    pub fn oscillator_stopped(&mut self) -> Result<bool, Error<I2C::Error>> {
        Ok(self.status()?.oscillator_stop_flag())
    }

    pub fn clear_oscillator_stop_flag(&mut self) -> Result<(), Error<I2C::Error>> {
        let mut status = self.status()?;
        status.set_oscillator_stop_flag(false);
        self.set_status(status)
    }
}

// Typed single-register access
macro_rules! impl_register_access {
    ($(($name:ident, $regaddr:expr, $typ:ty)),+) => {
        impl<I2C: I2c> DS3231<I2C> {
            $(
                paste! {
                    #[doc = concat!("Reads the ", stringify!($name), " register.")]
                    pub fn $name(&mut self) -> Result<$typ, Error<I2C::Error>> {
                        Ok(<$typ>::from(self.read_register($regaddr)?))
                    }

                    #[doc = concat!("Writes the ", stringify!($name), " register.")]
                    pub fn [<set_ $name>](&mut self, value: $typ) -> Result<(), Error<I2C::Error>> {
                        self.write_register($regaddr, value.into())
                    }
                }
            )+
        }
    }
}

impl_register_access!(
    (month, RegAddr::Month, Month),
    (year, RegAddr::Year, Year),
    (control, RegAddr::Control, Control),
    (status, RegAddr::ControlStatus, Status)
);

#[cfg(test)]
mod tests {
    extern crate alloc;
    use super::*;
    use alloc::vec;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTrans};

    const DEVICE_ADDRESS: u8 = 0x68;

    fn setup_mock(expectations: &[I2cTrans]) -> DS3231<I2cMock> {
        DS3231::new(I2cMock::new(expectations), DEVICE_ADDRESS)
    }

    #[test]
    fn test_read_time() {
        let mut dev = setup_mock(&[I2cTrans::write_read(
            DEVICE_ADDRESS,
            vec![RegAddr::Seconds as u8],
            vec![0x00, 0x30, 0x15, 0x05, 0x14, 0x03, 0x24],
        )]);
        let time = dev.time().unwrap();
        assert_eq!(time.hour, 15);
        assert_eq!(time.minute, 30);
        assert_eq!(time.weekday, 5);
        assert_eq!(time.year, 2024);
        dev.i2c.done();
    }

    #[test]
    fn test_read_time_decode_fault() {
        let mut dev = setup_mock(&[I2cTrans::write_read(
            DEVICE_ADDRESS,
            vec![RegAddr::Seconds as u8],
            vec![0x00, 0x30, 0x15, 0x05, 0x14, 0x13, 0x24],
        )]);
        assert!(matches!(
            dev.time(),
            Err(Error::Time(TimeError::InvalidRegister {
                field: TimeField::Month,
                ..
            }))
        ));
        dev.i2c.done();
    }

    #[test]
    fn test_block_write_rejects_oversize_data() {
        let mut dev = setup_mock(&[I2cTrans::write(
            DEVICE_ADDRESS,
            vec![RegAddr::Seconds as u8, 1, 2, 3, 4, 5, 6, 7],
        )]);
        dev.write_registers(RegAddr::Seconds, &[1, 2, 3, 4, 5, 6, 7])
            .unwrap();
        assert_eq!(
            dev.write_registers(RegAddr::Seconds, &[0; 8]),
            Err(Error::BlockTooLong(8))
        );
        dev.i2c.done();
    }

    #[test]
    fn test_set_time() {
        let time = Time {
            second: 0,
            minute: 30,
            hour: 15,
            weekday: 5,
            date: 14,
            month: 3,
            year: 2124,
        };
        let mut dev = setup_mock(&[I2cTrans::write(
            DEVICE_ADDRESS,
            vec![RegAddr::Seconds as u8, 0x00, 0x30, 0x15, 0x05, 0x14, 0x83, 0x24],
        )]);
        dev.set_time(&time).unwrap();
        dev.i2c.done();
    }

    #[test]
    fn test_set_time_field_direct() {
        let mut dev = setup_mock(&[
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Minutes as u8, 0x45]),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Hours as u8, 0x23]),
        ]);
        dev.set_time_field(TimeField::Minute, 45).unwrap();
        dev.set_time_field(TimeField::Hour, 23).unwrap();
        dev.i2c.done();
    }

    #[test]
    fn test_set_month_keeps_century() {
        let mut dev = setup_mock(&[
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::Month as u8], vec![0x92]),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Month as u8, 0x87]),
        ]);
        dev.set_time_field(TimeField::Month, 7).unwrap();
        dev.i2c.done();
    }

    #[test]
    fn test_set_year_writes_century_first() {
        let mut dev = setup_mock(&[
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::Month as u8], vec![0x12]),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Month as u8, 0x92]),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Year as u8, 0x00]),
        ]);
        dev.set_time_field(TimeField::Year, 2100).unwrap();
        dev.i2c.done();
    }

    #[test]
    fn test_out_of_range_field_is_not_written() {
        let mut dev = setup_mock(&[]);
        assert_eq!(
            dev.set_time_field(TimeField::Minute, 60),
            Err(Error::Time(TimeError::OutOfRange {
                field: TimeField::Minute,
                value: 60
            }))
        );
        dev.i2c.done();
    }

    #[test]
    fn test_alarm1_mode_write_keeps_seconds() {
        let mut dev = setup_mock(&[
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::Alarm1Seconds as u8],
                vec![0x42, 0x30, 0x12, 0x15],
            ),
            I2cTrans::write(
                DEVICE_ADDRESS,
                vec![RegAddr::Alarm1Seconds as u8, 0x42, 0x30, 0x12, 0x95],
            ),
        ]);
        dev.set_alarm_mode(Alarm1Mode::MatchSecondsMinutesHours.into())
            .unwrap();
        dev.i2c.done();
    }

    #[test]
    fn test_alarm2_field_write_keeps_mask() {
        let mut dev = setup_mock(&[
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::Alarm2Minutes as u8], vec![0x88]),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Alarm2Minutes as u8, 0xC5]),
        ]);
        dev.set_alarm_field(Alarm::Two, AlarmField::Minute, 45)
            .unwrap();
        dev.i2c.done();
    }

    #[test]
    fn test_alarm2_seconds_rejected_without_bus_access() {
        let mut dev = setup_mock(&[]);
        assert!(matches!(
            dev.set_alarm_field(Alarm::Two, AlarmField::Second, 0),
            Err(Error::Alarm(AlarmError::NoSuchField { .. }))
        ));
        dev.i2c.done();
    }

    #[test]
    fn test_read_and_set_alarm() {
        let spec = AlarmSpec {
            mode: Alarm2Mode::MatchMinutesHoursWeekday.into(),
            second: 0,
            minute: 15,
            hour: 7,
            day_or_date: DayOrDate::Weekday(2),
        };
        let mut dev = setup_mock(&[
            I2cTrans::write(
                DEVICE_ADDRESS,
                vec![RegAddr::Alarm2Minutes as u8, 0x15, 0x07, 0x42],
            ),
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::Alarm2Minutes as u8],
                vec![0x15, 0x07, 0x42],
            ),
        ]);
        dev.set_alarm(&spec).unwrap();
        assert_eq!(dev.read_alarm(Alarm::Two).unwrap(), spec);
        dev.i2c.done();
    }

    #[test]
    fn test_alarm_flags_read_status_register() {
        let mut dev = setup_mock(&[
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::ControlStatus as u8], vec![0x00]),
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::ControlStatus as u8], vec![0x01]),
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::ControlStatus as u8], vec![0x01]),
        ]);
        // a clear flag reads as not triggered
        assert!(!dev.alarm_triggered(Alarm::One).unwrap());
        assert!(dev.alarm_triggered(Alarm::One).unwrap());
        assert!(!dev.alarm_triggered(Alarm::Two).unwrap());
        dev.i2c.done();
    }

    #[test]
    fn test_clear_alarm_flag_only_touches_its_flag() {
        let mut dev = setup_mock(&[
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::ControlStatus as u8], vec![0x83]),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::ControlStatus as u8, 0x81]),
        ]);
        dev.clear_alarm_flag(Alarm::Two).unwrap();
        dev.i2c.done();
    }

    #[test]
    fn test_set_alarm_interrupt() {
        let mut dev = setup_mock(&[
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::Control as u8], vec![0x18]),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Control as u8, 0x1D]),
        ]);
        dev.set_alarm_interrupt(Alarm::One, true).unwrap();
        dev.i2c.done();
    }

    #[test]
    fn test_read_temperature() {
        let mut dev = setup_mock(&[I2cTrans::write_read(
            DEVICE_ADDRESS,
            vec![RegAddr::MSBTemp as u8],
            vec![0x19, 0x40],
        )]);
        assert_eq!(dev.temperature().unwrap().celsius(), 25.25);
        dev.i2c.done();
    }

    #[test]
    fn test_convert_temperature() {
        let mut dev = setup_mock(&[
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::ControlStatus as u8], vec![0x04]),
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::ControlStatus as u8], vec![0x00]),
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::Control as u8], vec![0x1C]),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Control as u8, 0x3C]),
        ]);
        assert!(!dev.convert_temperature().unwrap());
        assert!(dev.convert_temperature().unwrap());
        dev.i2c.done();
    }

    #[test]
    fn test_oscillator_stop_flag() {
        let mut dev = setup_mock(&[
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::ControlStatus as u8], vec![0x88]),
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::ControlStatus as u8], vec![0x88]),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::ControlStatus as u8, 0x08]),
        ]);
        assert!(dev.oscillator_stopped().unwrap());
        dev.clear_oscillator_stop_flag().unwrap();
        dev.i2c.done();
    }

    #[test]
    fn test_configure() {
        let config = Config {
            square_wave_frequency: SquareWaveFrequency::Hz1,
            interrupt_control: InterruptControl::SquareWave,
            battery_backed_square_wave: true,
            oscillator_enable: Oscillator::Enabled,
        };
        let mut dev = setup_mock(&[
            // alarm 1 enabled, default frequency
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::Control as u8], vec![0x1D]),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Control as u8, 0x41]),
        ]);
        dev.configure(&config).unwrap();
        dev.i2c.done();
    }

    #[test]
    fn test_wait_ready_retries_until_the_chip_answers() {
        let mut dev = setup_mock(&[
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::ControlStatus as u8], vec![0x00])
                .with_error(ErrorKind::Other),
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::ControlStatus as u8], vec![0x00])
                .with_error(ErrorKind::Other),
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::ControlStatus as u8], vec![0x80]),
        ]);
        let mut delay = NoopDelay::new();
        let status = dev.wait_ready(&mut delay, 10);
        assert!(status.oscillator_stop_flag());
        dev.i2c.done();
    }

    #[test]
    fn test_bus_error_is_surfaced() {
        let mut dev = setup_mock(&[I2cTrans::write_read(
            DEVICE_ADDRESS,
            vec![RegAddr::Seconds as u8],
            vec![0; 7],
        )
        .with_error(ErrorKind::Other)]);
        assert_eq!(dev.time(), Err(Error::I2c(ErrorKind::Other)));
        dev.i2c.done();
    }

    #[test]
    fn test_release_returns_bus() {
        let dev = setup_mock(&[]);
        let mut i2c = dev.release();
        i2c.done();
    }
}
