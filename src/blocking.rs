//! Blocking Si7021 driver over `embedded-hal` 1.0.
//!
//! Same operations as [`Si7021Sensor`](crate::Si7021Sensor), for firmware
//! without an async executor. The driver owns the bus and the delay; get
//! them back with [`Si7021::release`].

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as _, ErrorKind, I2c};

use crate::command::{self, DeviceKind, FirmwareRevision, Resolution};
use crate::{Config, Measurement, MeasurementMode, Si7021Error};

pub struct Si7021<T: I2c, D: DelayNs> {
    i2c: T,
    delay: D,
    config: Config,
    // Resolution the chip is running at; sizes no-hold waits.
    device_resolution: Resolution,
}

impl<T: I2c, D: DelayNs> Si7021<T, D> {
    pub fn new(i2c: T, delay: D, config: Config) -> Self {
        Self {
            i2c,
            delay,
            config,
            device_resolution: Resolution::Rh12T14,
        }
    }

    pub fn release(self) -> (T, D) {
        (self.i2c, self.delay)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn init(&mut self) -> Result<(), Si7021Error> {
        self.reset()?;
        self.set_resolution(self.config.resolution)
    }

    pub fn reset(&mut self) -> Result<(), Si7021Error> {
        debug!("Soft reset");
        self.i2c_write(&[command::RESET])?;
        self.delay
            .delay_us(command::RESET_SETTLE.as_micros() as u32);
        self.device_resolution = Resolution::Rh12T14;
        Ok(())
    }

    /// Blocks until both readings of one RH measurement are available.
    pub fn read(&mut self) -> Result<Measurement, Si7021Error> {
        let raw_humidity = self.measure(
            command::MEASURE_RH_HOLD,
            command::MEASURE_RH_NO_HOLD,
            self.device_resolution.rh_measurement_time().as_micros(),
        )?;

        let mut buf = [0u8; 2];
        self.i2c_write_read(&[command::READ_TEMP_FROM_PREVIOUS_RH], &mut buf)?;

        Ok(Measurement {
            temperature: command::temperature_from_raw(u16::from_be_bytes(buf)),
            humidity: command::humidity_from_raw(raw_humidity),
        })
    }

    pub fn temperature(&mut self) -> Result<i32, Si7021Error> {
        let raw = self.measure(
            command::MEASURE_TEMP_HOLD,
            command::MEASURE_TEMP_NO_HOLD,
            self.device_resolution.temperature_conversion().as_micros(),
        )?;
        Ok(command::temperature_from_raw(raw))
    }

    pub fn humidity(&mut self) -> Result<i32, Si7021Error> {
        Ok(self.read()?.humidity)
    }

    pub fn resolution(&mut self) -> Result<Resolution, Si7021Error> {
        self.device_resolution = Resolution::from_user_register(self.read_user_register()?);
        Ok(self.device_resolution)
    }

    pub fn set_resolution(&mut self, resolution: Resolution) -> Result<(), Si7021Error> {
        let reg = self.read_user_register()?;
        self.i2c_write(&[
            command::WRITE_USER_REG1,
            resolution.apply_to_user_register(reg),
        ])?;
        self.device_resolution = resolution;
        Ok(())
    }

    pub fn heater_enabled(&mut self) -> Result<bool, Si7021Error> {
        Ok(self.read_user_register()? & command::HEATER_ENABLE_BIT != 0)
    }

    pub fn set_heater(&mut self, enabled: bool) -> Result<(), Si7021Error> {
        let reg = self.read_user_register()?;
        let reg = if enabled {
            reg | command::HEATER_ENABLE_BIT
        } else {
            reg & !command::HEATER_ENABLE_BIT
        };
        self.i2c_write(&[command::WRITE_USER_REG1, reg])
    }

    pub fn set_heater_current(&mut self, level: u8) -> Result<(), Si7021Error> {
        let level = command::heater_current_register(level)?;
        let mut buf = [0u8; 1];
        self.i2c_write_read(&[command::READ_HEATER_CONTROL], &mut buf)?;
        let reg = (buf[0] & !command::HEATER_CURRENT_MASK) | level;
        self.i2c_write(&[command::WRITE_HEATER_CONTROL, reg])
    }

    pub fn serial_number(&mut self) -> Result<u64, Si7021Error> {
        let mut first = [0u8; 8];
        self.i2c_write_read(&command::READ_ID_FIRST_ACCESS, &mut first)?;
        let mut second = [0u8; 6];
        self.i2c_write_read(&command::READ_ID_SECOND_ACCESS, &mut second)?;
        Ok(command::serial_number(&first, &second))
    }

    pub fn device_kind(&mut self) -> Result<DeviceKind, Si7021Error> {
        let mut second = [0u8; 6];
        self.i2c_write_read(&command::READ_ID_SECOND_ACCESS, &mut second)?;
        Ok(DeviceKind::from(second[0]))
    }

    pub fn verify_device(&mut self) -> Result<DeviceKind, Si7021Error> {
        match self.device_kind()? {
            DeviceKind::Unknown(id) => {
                warn!("Unexpected device id {=u8:#x}", id);
                Err(Si7021Error::UnknownDevice)
            }
            kind => Ok(kind),
        }
    }

    pub fn firmware_revision(&mut self) -> Result<FirmwareRevision, Si7021Error> {
        let mut buf = [0u8; 1];
        self.i2c_write_read(&command::READ_FIRMWARE_REVISION, &mut buf)?;
        Ok(FirmwareRevision::from(buf[0]))
    }

    fn measure(&mut self, hold: u8, no_hold: u8, conversion_us: u64) -> Result<u16, Si7021Error> {
        let mut frame = [0u8; 3];
        match self.config.mode {
            MeasurementMode::Hold => self.i2c_write_read(&[hold], &mut frame)?,
            MeasurementMode::NoHold => {
                self.i2c_write(&[no_hold])?;
                self.delay.delay_us(conversion_us as u32);
                self.poll(&mut frame)?;
            }
        }
        command::parse_checked(&frame, self.config.validate_crc)
    }

    fn poll(&mut self, frame: &mut [u8; 3]) -> Result<(), Si7021Error> {
        for _ in 0..command::MAX_POLLS {
            match self.i2c.read(self.config.address, frame) {
                Ok(_) => return Ok(()),
                Err(e) if matches!(e.kind(), ErrorKind::NoAcknowledge(_)) => {
                    self.delay
                        .delay_us(command::POLL_INTERVAL.as_micros() as u32);
                }
                Err(_) => return Err(Si7021Error::I2CError),
            }
        }
        warn!("Conversion did not finish");
        Err(Si7021Error::Timeout)
    }

    fn read_user_register(&mut self) -> Result<u8, Si7021Error> {
        let mut buf = [0u8; 1];
        self.i2c_write_read(&[command::READ_USER_REG1], &mut buf)?;
        Ok(buf[0])
    }

    fn i2c_write_read(&mut self, write: &[u8], read: &mut [u8]) -> Result<(), Si7021Error> {
        self.i2c
            .write_read(self.config.address, write, read)
            .map_err(|_| Si7021Error::I2CError)
    }

    fn i2c_write(&mut self, write: &[u8]) -> Result<(), Si7021Error> {
        self.i2c
            .write(self.config.address, write)
            .map_err(|_| Si7021Error::I2CError)
    }
}
