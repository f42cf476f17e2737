//! Async DS3231 driver.
//!
//! Same operations as [`crate::DS3231`] over `embedded-hal-async` traits. Only
//! available with the `async` feature.
//!
//! # Example
//!
//! ```rust,ignore
//! use deskclock::asynch::DS3231;
//!
//! let mut rtc = DS3231::new(i2c, deskclock::DEFAULT_ADDRESS);
//! rtc.wait_ready(&mut delay, 10).await;
//! let now = rtc.time().await?;
//! ```

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use paste::paste;

use crate::{alarm, layout};
use crate::{
    encode_month, encode_year, Alarm, AlarmField, AlarmMode, AlarmSpec, Config, Control, Error,
    Month, RegAddr, Status, TemperatureReading, Time, TimeField, Year,
};

/// DS3231 driver over an async I2C bus.
pub struct DS3231<I2C: I2c> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> DS3231<I2C> {
    /// Creates a new async driver.
    ///
    /// # Arguments
    /// * `i2c` - The async I2C bus implementation
    /// * `address` - The I2C address of the device, normally [`crate::DEFAULT_ADDRESS`]
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Gives the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    async fn read_registers(&mut self, start: RegAddr, buf: &mut [u8]) -> Result<(), Error<I2C::Error>> {
        debug!("DS3231: reading {} bytes from {:?}", buf.len(), start);
        self.i2c
            .write_read(self.address, &[start as u8], buf)
            .await
            .map_err(Error::I2c)
    }

    async fn read_register(&mut self, addr: RegAddr) -> Result<u8, Error<I2C::Error>> {
        let mut data = [0];
        self.read_registers(addr, &mut data).await?;
        Ok(data[0])
    }

    async fn write_register(&mut self, addr: RegAddr, value: u8) -> Result<(), Error<I2C::Error>> {
        debug!("DS3231: writing {:?}={:#x}", addr, value);
        self.i2c
            .write(self.address, &[addr as u8, value])
            .await
            .map_err(Error::I2c)
    }

    async fn write_registers(&mut self, start: RegAddr, data: &[u8]) -> Result<(), Error<I2C::Error>> {
        let len = data.len();
        let mut buf = [0; 8];
        buf[0] = start as u8;
        buf.get_mut(1..=len)
            .ok_or(Error::BlockTooLong(len))?
            .copy_from_slice(data);
        debug!("DS3231: writing {} bytes from {:?}", len, start);
        self.i2c
            .write(self.address, &buf[..=len])
            .await
            .map_err(Error::I2c)
    }

    /// Polls the status register until the chip answers, retrying forever
    /// after `backoff_ms`.
    pub async fn wait_ready(&mut self, delay: &mut impl DelayNs, backoff_ms: u32) -> Status {
        loop {
            match self.status().await {
                Ok(status) => return status,
                Err(_) => {
                    warn!("DS3231: not responding, retrying in {}ms", backoff_ms);
                    delay.delay_ms(backoff_ms).await;
                }
            }
        }
    }

    /// Applies `config` to the control register.
    pub async fn configure(&mut self, config: &Config) -> Result<(), Error<I2C::Error>> {
        let control = config.apply(self.control().await?);
        debug!("DS3231: writing control: {:?}", control);
        self.set_control(control).await
    }

    /// Reads and decodes the time block.
    pub async fn time(&mut self) -> Result<Time, Error<I2C::Error>> {
        let mut data = [0; 7];
        self.read_registers(RegAddr::Seconds, &mut data).await?;
        Ok(Time::from_registers(data)?)
    }

    /// Writes the whole time block in one transaction.
    pub async fn set_time(&mut self, time: &Time) -> Result<(), Error<I2C::Error>> {
        let data = time.to_registers()?;
        self.write_registers(RegAddr::Seconds, &data).await
    }

    /// Writes a single time field. See [`crate::DS3231::set_time_field`].
    pub async fn set_time_field(&mut self, field: TimeField, value: u16) -> Result<(), Error<I2C::Error>> {
        match field {
            TimeField::Month => {
                let month = encode_month(self.month().await?, value)?;
                self.set_month(month).await
            }
            TimeField::Year => {
                let (month, year) = encode_year(self.month().await?, value)?;
                self.set_month(month).await?;
                self.set_year(year).await
            }
            _ => {
                let byte = field.encode(value)?;
                self.write_register(field.register().addr, byte).await
            }
        }
    }

    /// Writes `time` field by field, second first.
    pub async fn write_time_fields(&mut self, time: &Time) -> Result<(), Error<I2C::Error>> {
        time.validate()?;
        for field in TimeField::ALL {
            self.set_time_field(field, time.get(field)).await?;
        }
        info!("DS3231: time written field by field");
        Ok(())
    }

    async fn read_alarm_block(&mut self, alarm: Alarm) -> Result<([u8; 4], usize), Error<I2C::Error>> {
        let registers = alarm.registers();
        let mut data = [0; 4];
        self.read_registers(registers[0].addr, &mut data[..registers.len()])
            .await?;
        Ok((data, registers.len()))
    }

    /// Changes the match mode of an alarm without touching its values.
    pub async fn set_alarm_mode(&mut self, mode: AlarmMode) -> Result<(), Error<I2C::Error>> {
        let alarm = mode.alarm();
        let (mut data, len) = self.read_alarm_block(alarm).await?;
        for (raw, field) in data[..len].iter_mut().zip(alarm.fields()) {
            *raw = mode.apply(*field, *raw);
        }
        self.write_registers(alarm.registers()[0].addr, &data[..len])
            .await
    }

    /// Changes one alarm value, keeping its mask bit and DY/DT selector.
    pub async fn set_alarm_field(
        &mut self,
        alarm: Alarm,
        field: AlarmField,
        value: u8,
    ) -> Result<(), Error<I2C::Error>> {
        let register = field.register(alarm)?;
        let current = self.read_register(register.addr).await?;
        let byte = alarm::encode_field(alarm, field, value, current)?;
        self.write_register(register.addr, byte).await
    }

    pub async fn read_alarm(&mut self, alarm: Alarm) -> Result<AlarmSpec, Error<I2C::Error>> {
        let (data, len) = self.read_alarm_block(alarm).await?;
        Ok(AlarmSpec::from_registers(alarm, &data[..len])?)
    }

    pub async fn set_alarm(&mut self, spec: &AlarmSpec) -> Result<(), Error<I2C::Error>> {
        let registers = spec.to_registers()?;
        self.write_registers(spec.alarm().registers()[0].addr, registers.as_slice())
            .await
    }

    pub async fn alarm_triggered(&mut self, alarm: Alarm) -> Result<bool, Error<I2C::Error>> {
        Ok(alarm.triggered(self.status().await?))
    }

    pub async fn clear_alarm_flag(&mut self, alarm: Alarm) -> Result<(), Error<I2C::Error>> {
        let status = alarm.clear_flag(self.status().await?);
        self.set_status(status).await
    }

    pub async fn set_alarm_interrupt(&mut self, alarm: Alarm, enabled: bool) -> Result<(), Error<I2C::Error>> {
        let control = alarm.with_interrupt(self.control().await?, enabled);
        self.set_control(control).await
    }

    pub async fn temperature(&mut self) -> Result<TemperatureReading, Error<I2C::Error>> {
        let mut data = [0; 2];
        self.read_registers(layout::TEMPERATURE.addr, &mut data).await?;
        Ok(TemperatureReading::from_bytes(
            layout::TEMPERATURE.extract(data[0]),
            layout::TEMPERATURE_FRACTION.extract(data[1]),
        ))
    }

    /// Starts a temperature conversion unless the chip reports BSY.
    pub async fn convert_temperature(&mut self) -> Result<bool, Error<I2C::Error>> {
        if self.status().await?.busy() {
            return Ok(false);
        }
        let mut control = self.control().await?;
        control.set_convert_temperature(true);
        self.set_control(control).await?;
        Ok(true)
    }

    pub async fn oscillator_stopped(&mut self) -> Result<bool, Error<I2C::Error>> {
        Ok(self.status().await?.oscillator_stop_flag())
    }

    pub async fn clear_oscillator_stop_flag(&mut self) -> Result<(), Error<I2C::Error>> {
        let mut status = self.status().await?;
        status.set_oscillator_stop_flag(false);
        self.set_status(status).await
    }
}

// Register access implementations
macro_rules! impl_register_access {
    ($(($name:ident, $regaddr:expr, $typ:ty)),+) => {
        impl<I2C: I2c> DS3231<I2C> {
            $(
                paste! {
                    #[doc = concat!("Reads the ", stringify!($name), " register.")]
                    pub async fn $name(&mut self) -> Result<$typ, Error<I2C::Error>> {
                        Ok(<$typ>::from(self.read_register($regaddr).await?))
                    }

                    #[doc = concat!("Writes the ", stringify!($name), " register.")]
                    pub async fn [<set_ $name>](&mut self, value: $typ) -> Result<(), Error<I2C::Error>> {
                        self.write_register($regaddr, value.into()).await
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
