//! Integer status codes for callers that speak the C-style `int` LED and
//! sensor interface: zero is success, negative values are errors.

use crate::Si7021Error;
use crate::led::LedError;

/// Driver number of the LED subsystem.
pub const DRIVER_NUM_LEDS: usize = 8;

pub const SUCCESS: i32 = 0;
pub const FAIL: i32 = -1;
pub const EBUSY: i32 = -2;
pub const EINVAL: i32 = -6;
pub const ENODEVICE: i32 = -11;
pub const ENOACK: i32 = -13;

pub fn led_status<E>(result: Result<(), LedError<E>>) -> i32 {
    match result {
        Ok(()) => SUCCESS,
        Err(LedError::InvalidLed { .. }) => EINVAL,
        Err(LedError::Pin(_)) => FAIL,
    }
}

pub fn sensor_status(error: &Si7021Error) -> i32 {
    match error {
        Si7021Error::I2CError => ENOACK,
        Si7021Error::Timeout => EBUSY,
        Si7021Error::Crc => FAIL,
        Si7021Error::InvalidArgument => EINVAL,
        Si7021Error::UnknownDevice => ENODEVICE,
    }
}
