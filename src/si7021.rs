use embedded_hal::i2c::{Error as _, ErrorKind};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

use crate::command::{self, DeviceKind, FirmwareRevision, Resolution};
use crate::{Config, Measurement, MeasurementMode, Si7021Error};

/// Async Si7021 driver borrowing an I2C bus.
pub struct Si7021Sensor<'a, T: I2c, D: DelayNs> {
    i2c: &'a mut T,
    delay: D,
    config: Config,
    // Resolution the chip is running at; sizes no-hold waits.
    device_resolution: Resolution,
}

impl<'a, T: I2c, D: DelayNs> Si7021Sensor<'a, T, D> {
    pub fn new(i2c: &'a mut T, delay: D, config: Config) -> Self {
        Self {
            i2c,
            delay,
            config,
            device_resolution: Resolution::Rh12T14,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Soft reset, then applies the configured resolution.
    pub async fn init(&mut self) -> Result<(), Si7021Error> {
        self.reset().await?;
        self.set_resolution(self.config.resolution).await
    }

    pub async fn reset(&mut self) -> Result<(), Si7021Error> {
        debug!("Soft reset");
        self.i2c_write(&[command::RESET]).await?;
        self.delay
            .delay_us(command::RESET_SETTLE.as_micros() as u32)
            .await;
        self.device_resolution = Resolution::Rh12T14;
        Ok(())
    }

    /// Measures humidity, then fetches the temperature converted with it.
    pub async fn read(&mut self) -> Result<Measurement, Si7021Error> {
        let raw_humidity = self
            .measure(
                command::MEASURE_RH_HOLD,
                command::MEASURE_RH_NO_HOLD,
                self.device_resolution.rh_measurement_time().as_micros(),
            )
            .await?;

        let mut buf = [0u8; 2];
        self.i2c_write_read(&[command::READ_TEMP_FROM_PREVIOUS_RH], &mut buf)
            .await?;
        let raw_temperature = u16::from_be_bytes(buf);

        let measurement = Measurement {
            temperature: command::temperature_from_raw(raw_temperature),
            humidity: command::humidity_from_raw(raw_humidity),
        };
        trace!(
            "Measured raw T {=u16:#x}, raw RH {=u16:#x}",
            raw_temperature,
            raw_humidity
        );
        Ok(measurement)
    }

    pub async fn temperature(&mut self) -> Result<i32, Si7021Error> {
        let raw = self
            .measure(
                command::MEASURE_TEMP_HOLD,
                command::MEASURE_TEMP_NO_HOLD,
                self.device_resolution.temperature_conversion().as_micros(),
            )
            .await?;
        Ok(command::temperature_from_raw(raw))
    }

    pub async fn humidity(&mut self) -> Result<i32, Si7021Error> {
        Ok(self.read().await?.humidity)
    }

    pub async fn resolution(&mut self) -> Result<Resolution, Si7021Error> {
        let reg = self.read_user_register().await?;
        self.device_resolution = Resolution::from_user_register(reg);
        Ok(self.device_resolution)
    }

    pub async fn set_resolution(&mut self, resolution: Resolution) -> Result<(), Si7021Error> {
        let reg = self.read_user_register().await?;
        self.i2c_write(&[
            command::WRITE_USER_REG1,
            resolution.apply_to_user_register(reg),
        ])
        .await?;
        self.device_resolution = resolution;
        Ok(())
    }

    pub async fn heater_enabled(&mut self) -> Result<bool, Si7021Error> {
        let reg = self.read_user_register().await?;
        Ok(reg & command::HEATER_ENABLE_BIT != 0)
    }

    pub async fn set_heater(&mut self, enabled: bool) -> Result<(), Si7021Error> {
        let reg = self.read_user_register().await?;
        let reg = if enabled {
            reg | command::HEATER_ENABLE_BIT
        } else {
            reg & !command::HEATER_ENABLE_BIT
        };
        self.i2c_write(&[command::WRITE_USER_REG1, reg]).await
    }

    /// Heater current step, 0 (about 3 mA) to 15 (about 94 mA).
    pub async fn set_heater_current(&mut self, level: u8) -> Result<(), Si7021Error> {
        let level = command::heater_current_register(level)?;
        let mut buf = [0u8; 1];
        self.i2c_write_read(&[command::READ_HEATER_CONTROL], &mut buf)
            .await?;
        let reg = (buf[0] & !command::HEATER_CURRENT_MASK) | level;
        self.i2c_write(&[command::WRITE_HEATER_CONTROL, reg]).await
    }

    pub async fn serial_number(&mut self) -> Result<u64, Si7021Error> {
        let mut first = [0u8; 8];
        self.i2c_write_read(&command::READ_ID_FIRST_ACCESS, &mut first)
            .await?;
        let mut second = [0u8; 6];
        self.i2c_write_read(&command::READ_ID_SECOND_ACCESS, &mut second)
            .await?;
        Ok(command::serial_number(&first, &second))
    }

    pub async fn device_kind(&mut self) -> Result<DeviceKind, Si7021Error> {
        let mut second = [0u8; 6];
        self.i2c_write_read(&command::READ_ID_SECOND_ACCESS, &mut second)
            .await?;
        Ok(DeviceKind::from(second[0]))
    }

    /// Fails with `UnknownDevice` unless the electronic ID names an Si70xx part.
    pub async fn verify_device(&mut self) -> Result<DeviceKind, Si7021Error> {
        match self.device_kind().await? {
            DeviceKind::Unknown(id) => {
                warn!("Unexpected device id {=u8:#x}", id);
                Err(Si7021Error::UnknownDevice)
            }
            kind => Ok(kind),
        }
    }

    pub async fn firmware_revision(&mut self) -> Result<FirmwareRevision, Si7021Error> {
        let mut buf = [0u8; 1];
        self.i2c_write_read(&command::READ_FIRMWARE_REVISION, &mut buf)
            .await?;
        Ok(FirmwareRevision::from(buf[0]))
    }

    async fn measure(
        &mut self,
        hold: u8,
        no_hold: u8,
        conversion_us: u64,
    ) -> Result<u16, Si7021Error> {
        let mut frame = [0u8; 3];
        match self.config.mode {
            MeasurementMode::Hold => {
                self.i2c_write_read(&[hold], &mut frame).await?;
            }
            MeasurementMode::NoHold => {
                self.i2c_write(&[no_hold]).await?;
                self.delay.delay_us(conversion_us as u32).await;
                self.poll(&mut frame).await?;
            }
        }
        command::parse_checked(&frame, self.config.validate_crc)
    }

    // The sensor NACKs its address until the conversion is done.
    async fn poll(&mut self, frame: &mut [u8; 3]) -> Result<(), Si7021Error> {
        for _ in 0..command::MAX_POLLS {
            match self.i2c.read(self.config.address, frame).await {
                Ok(_) => return Ok(()),
                Err(e) if matches!(e.kind(), ErrorKind::NoAcknowledge(_)) => {
                    debug!("Conversion pending, waiting...");
                    self.delay
                        .delay_us(command::POLL_INTERVAL.as_micros() as u32)
                        .await;
                }
                Err(_) => return Err(Si7021Error::I2CError),
            }
        }
        warn!("Conversion did not finish");
        Err(Si7021Error::Timeout)
    }

    async fn read_user_register(&mut self) -> Result<u8, Si7021Error> {
        let mut buf = [0u8; 1];
        self.i2c_write_read(&[command::READ_USER_REG1], &mut buf)
            .await?;
        Ok(buf[0])
    }

    async fn i2c_write_read(&mut self, write: &[u8], read: &mut [u8]) -> Result<(), Si7021Error> {
        match self.i2c.write_read(self.config.address, write, read).await {
            Ok(_) => Ok(()),
            Err(_) => Err(Si7021Error::I2CError),
        }
    }

    async fn i2c_write(&mut self, write: &[u8]) -> Result<(), Si7021Error> {
        match self.i2c.write(self.config.address, write).await {
            Ok(_) => Ok(()),
            Err(_) => Err(Si7021Error::I2CError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::NoAcknowledgeSource;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};
    use std::cell::Cell;
    use std::rc::Rc;

    const ADDR: u8 = 0x40;

    #[derive(Clone, Default)]
    struct CountingDelay {
        total_ns: Rc<Cell<u64>>,
    }

    impl CountingDelay {
        fn total_us(&self) -> u64 {
            self.total_ns.get() / 1_000
        }
    }

    impl DelayNs for CountingDelay {
        async fn delay_ns(&mut self, ns: u32) {
            self.total_ns.set(self.total_ns.get() + ns as u64);
        }
    }

    fn no_hold() -> Config {
        Config {
            mode: MeasurementMode::NoHold,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn read_in_hold_mode() {
        let expectations = [
            Transaction::write_read(ADDR, vec![0xE5], vec![0x7C, 0x80, 0xF5]),
            Transaction::write_read(ADDR, vec![0xE0], vec![0x66, 0x44]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut sensor = Si7021Sensor::new(&mut i2c, NoopDelay::new(), Config::default());

        let m = sensor.read().await.unwrap();
        assert_eq!(m, Measurement { temperature: 2334, humidity: 5479 });
        i2c.done();
    }

    #[tokio::test]
    async fn read_rejects_bad_checksum() {
        let expectations = [Transaction::write_read(ADDR, vec![0xE5], vec![0x7C, 0x80, 0x00])];
        let mut i2c = I2cMock::new(&expectations);
        let mut sensor = Si7021Sensor::new(&mut i2c, NoopDelay::new(), Config::default());

        assert_eq!(sensor.read().await, Err(Si7021Error::Crc));
        i2c.done();
    }

    #[tokio::test]
    async fn read_without_crc_validation() {
        let config = Config {
            validate_crc: false,
            ..Config::default()
        };
        let expectations = [
            Transaction::write_read(ADDR, vec![0xE5], vec![0x7C, 0x80, 0x00]),
            Transaction::write_read(ADDR, vec![0xE0], vec![0x66, 0x44]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut sensor = Si7021Sensor::new(&mut i2c, NoopDelay::new(), config);

        assert_eq!(sensor.read().await.unwrap().humidity, 5479);
        i2c.done();
    }

    #[tokio::test]
    async fn read_in_no_hold_mode_polls_until_ready() {
        let nack = ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address);
        let expectations = [
            Transaction::write(ADDR, vec![0xF5]),
            Transaction::read(ADDR, vec![0, 0, 0]).with_error(nack),
            Transaction::read(ADDR, vec![0x7C, 0x80, 0xF5]),
            Transaction::write_read(ADDR, vec![0xE0], vec![0x66, 0x44]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut sensor = Si7021Sensor::new(&mut i2c, NoopDelay::new(), no_hold());

        let m = sensor.read().await.unwrap();
        assert_eq!(m.temperature, 2334);
        i2c.done();
    }

    #[tokio::test]
    async fn no_hold_times_out() {
        let nack = ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address);
        let mut expectations = vec![Transaction::write(ADDR, vec![0xF3])];
        for _ in 0..command::MAX_POLLS {
            expectations.push(Transaction::read(ADDR, vec![0, 0, 0]).with_error(nack));
        }
        let mut i2c = I2cMock::new(&expectations);
        let mut sensor = Si7021Sensor::new(&mut i2c, NoopDelay::new(), no_hold());

        assert_eq!(sensor.temperature().await, Err(Si7021Error::Timeout));
        i2c.done();
    }

    #[tokio::test]
    async fn bus_error_is_reported() {
        let expectations =
            [Transaction::write_read(ADDR, vec![0xE3], vec![0, 0, 0]).with_error(ErrorKind::Bus)];
        let mut i2c = I2cMock::new(&expectations);
        let mut sensor = Si7021Sensor::new(&mut i2c, NoopDelay::new(), Config::default());

        assert_eq!(sensor.temperature().await, Err(Si7021Error::I2CError));
        i2c.done();
    }

    #[tokio::test]
    async fn init_resets_and_sets_resolution() {
        let config = Config {
            resolution: Resolution::Rh11T11,
            ..Config::default()
        };
        let expectations = [
            Transaction::write(ADDR, vec![0xFE]),
            Transaction::write_read(ADDR, vec![0xE7], vec![0x3A]),
            Transaction::write(ADDR, vec![0xE6, 0xBB]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut sensor = Si7021Sensor::new(&mut i2c, NoopDelay::new(), config);

        sensor.init().await.unwrap();
        assert_eq!(sensor.config().resolution, Resolution::Rh11T11);
        i2c.done();
    }

    #[tokio::test]
    async fn heater_control() {
        let expectations = [
            Transaction::write_read(ADDR, vec![0xE7], vec![0x3A]),
            Transaction::write(ADDR, vec![0xE6, 0x3E]),
            Transaction::write_read(ADDR, vec![0xE7], vec![0x3E]),
            Transaction::write_read(ADDR, vec![0x11], vec![0x00]),
            Transaction::write(ADDR, vec![0x51, 0x0F]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut sensor = Si7021Sensor::new(&mut i2c, NoopDelay::new(), Config::default());

        sensor.set_heater(true).await.unwrap();
        assert!(sensor.heater_enabled().await.unwrap());
        sensor.set_heater_current(15).await.unwrap();
        assert_eq!(
            sensor.set_heater_current(16).await,
            Err(Si7021Error::InvalidArgument)
        );
        i2c.done();
    }

    #[tokio::test]
    async fn identification() {
        let expectations = [
            Transaction::write_read(
                ADDR,
                vec![0xFA, 0x0F],
                vec![0x11, 0xAA, 0x22, 0xAA, 0x33, 0xAA, 0x44, 0xAA],
            ),
            Transaction::write_read(
                ADDR,
                vec![0xFC, 0xC9],
                vec![0x15, 0xFF, 0xAA, 0x66, 0x77, 0xAA],
            ),
            Transaction::write_read(
                ADDR,
                vec![0xFC, 0xC9],
                vec![0x15, 0xFF, 0xAA, 0x66, 0x77, 0xAA],
            ),
            Transaction::write_read(ADDR, vec![0x84, 0xB8], vec![0x20]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut sensor = Si7021Sensor::new(&mut i2c, NoopDelay::new(), Config::default());

        assert_eq!(sensor.serial_number().await.unwrap(), 0x1122_3344_15FF_6677);
        assert_eq!(sensor.device_kind().await.unwrap(), DeviceKind::Si7021);
        assert_eq!(
            sensor.firmware_revision().await.unwrap(),
            FirmwareRevision::V2_0
        );
        i2c.done();
    }

    #[tokio::test]
    async fn verify_rejects_foreign_device() {
        let expectations = [Transaction::write_read(
            ADDR,
            vec![0xFC, 0xC9],
            vec![0x42, 0x00, 0x00, 0x00, 0x00, 0x00],
        )];
        let mut i2c = I2cMock::new(&expectations);
        let mut sensor = Si7021Sensor::new(&mut i2c, NoopDelay::new(), Config::default());

        assert_eq!(sensor.verify_device().await, Err(Si7021Error::UnknownDevice));
        i2c.done();
    }

    #[tokio::test]
    async fn no_hold_wait_follows_resolution_after_reset() {
        let expectations = [
            Transaction::write_read(ADDR, vec![0xE7], vec![0x3A]),
            Transaction::write(ADDR, vec![0xE6, 0xBB]),
            Transaction::write(ADDR, vec![0xFE]),
            Transaction::write(ADDR, vec![0xF5]),
            Transaction::read(ADDR, vec![0x7C, 0x80, 0xF5]),
            Transaction::write_read(ADDR, vec![0xE0], vec![0x66, 0x44]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let delay = CountingDelay::default();
        let mut sensor = Si7021Sensor::new(&mut i2c, delay.clone(), no_hold());

        sensor.set_resolution(Resolution::Rh11T11).await.unwrap();
        sensor.reset().await.unwrap();
        sensor.read().await.unwrap();
        // 15 ms reset settle plus the RH 12 bit / T 14 bit conversion
        assert_eq!(delay.total_us(), 15_000 + 22_800);
        i2c.done();
    }

    #[tokio::test]
    async fn resolution_query_sizes_no_hold_wait() {
        let expectations = [
            Transaction::write_read(ADDR, vec![0xE7], vec![0xBB]),
            Transaction::write(ADDR, vec![0xF3]),
            Transaction::read(ADDR, vec![0x66, 0x44, 0xF6]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let delay = CountingDelay::default();
        let mut sensor = Si7021Sensor::new(&mut i2c, delay.clone(), no_hold());

        assert_eq!(sensor.resolution().await, Ok(Resolution::Rh11T11));
        assert_eq!(sensor.temperature().await, Ok(2334));
        assert_eq!(delay.total_us(), 2_400);
        i2c.done();
    }

    #[tokio::test]
    async fn bus_error_while_polling_fails_at_once() {
        let expectations = [
            Transaction::write(ADDR, vec![0xF5]),
            Transaction::read(ADDR, vec![0, 0, 0]).with_error(ErrorKind::Bus),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut sensor = Si7021Sensor::new(&mut i2c, NoopDelay::new(), no_hold());

        assert_eq!(sensor.read().await, Err(Si7021Error::I2CError));
        i2c.done();
    }
}
