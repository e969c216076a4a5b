#![no_std]
#![no_main]

use defmt::{error, info};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::peripherals::I2C0;
use embassy_rp::{bind_interrupts, i2c};
use embassy_si7021_sensor::report::{BANNER, Report};
use embassy_si7021_sensor::status::sensor_status;
use embassy_si7021_sensor::{Config, Si7021Error, Si7021Sensor};
use embassy_time::{Delay, Duration, Timer};
use panic_probe as _;

bind_interrupts!(struct Irqs {
    I2C0_IRQ => i2c::InterruptHandler<I2C0>;
});

#[embassy_executor::main]
async fn main(_spawner: Spawner) -> ! {
    let p = embassy_rp::init(Default::default());

    // SDA on GP0, SCL on GP1
    let sda = p.PIN_0;
    let scl = p.PIN_1;
    let mut i2c = i2c::I2c::new_async(p.I2C0, scl, sda, Irqs, Default::default());

    let mut sensor = Si7021Sensor::new(&mut i2c, Delay, Config::default());

    info!("{=str}", BANNER);

    if let Err(e) = sensor.init().await {
        error!("Sensor init failed: {} ({})", e, sensor_status(&e));
    }
    match sensor.verify_device().await {
        Ok(kind) => info!("Device: {}", kind),
        Err(e) => error!("Could not read electronic ID: {}", e),
    }

    loop {
        match sensor.read().await {
            Ok(measurement) => {
                info!("{}", defmt::Display2Format(&Report::new(measurement)));
            }
            Err(e) => match e {
                Si7021Error::I2CError => error!("I2C communication error"),
                Si7021Error::Timeout => error!("Operation timed out"),
                Si7021Error::Crc => error!("Checksum mismatch"),
                Si7021Error::InvalidArgument | Si7021Error::UnknownDevice => {
                    error!("Unexpected error: {}", e)
                }
            },
        }

        Timer::after(Duration::from_secs(1)).await;
    }
}
