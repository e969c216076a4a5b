#![no_std]
#![no_main]

use defmt::{error, info};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::gpio::{Level, Output};
use embassy_si7021_sensor::status::{DRIVER_NUM_LEDS, led_status};
use embassy_si7021_sensor::{Led, Leds};
use embassy_time::{Duration, Timer};
use panic_probe as _;

#[embassy_executor::main]
async fn main(_spawner: Spawner) -> ! {
    let p = embassy_rp::init(Default::default());

    let mut leds = Leds::new([
        Led::active_high(Output::new(p.PIN_25, Level::Low)),
        Led::active_low(Output::new(p.PIN_14, Level::High)),
        Led::active_low(Output::new(p.PIN_15, Level::High)),
    ]);
    let code = led_status(leds.init());
    if code != 0 {
        error!("LED init -> {}", code);
    }

    info!("LED driver {}: {} LEDs", DRIVER_NUM_LEDS, leds.count());

    let mut current = 0;
    loop {
        let code = led_status(leds.toggle(current));
        if code != 0 {
            error!("led_toggle({}) -> {}", current, code);
        }
        current = (current + 1) % leds.count();

        Timer::after(Duration::from_millis(250)).await;
    }
}
