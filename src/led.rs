//! A fixed bank of LEDs on GPIO output pins, addressed by index.

use embedded_hal::digital::{OutputPin, PinState, StatefulOutputPin};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Pin high lights the LED.
    ActiveHigh,
    /// Pin low lights the LED.
    ActiveLow,
}

impl Polarity {
    fn pin_state(self, lit: bool) -> PinState {
        match self {
            Polarity::ActiveHigh => PinState::from(lit),
            Polarity::ActiveLow => PinState::from(!lit),
        }
    }
}

pub struct Led<P: OutputPin> {
    pin: P,
    polarity: Polarity,
}

impl<P: OutputPin> Led<P> {
    pub fn active_high(pin: P) -> Self {
        Self { pin, polarity: Polarity::ActiveHigh }
    }

    pub fn active_low(pin: P) -> Self {
        Self { pin, polarity: Polarity::ActiveLow }
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    fn set(&mut self, lit: bool) -> Result<(), P::Error> {
        self.pin.set_state(self.polarity.pin_state(lit))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedError<E> {
    /// `index` is not in `0..count`.
    InvalidLed { index: usize, count: usize },
    Pin(E),
}

pub struct Leds<P: OutputPin, const N: usize> {
    leds: [Led<P>; N],
}

impl<P: OutputPin, const N: usize> Leds<P, N> {
    pub fn new(leds: [Led<P>; N]) -> Self {
        Self { leds }
    }

    /// Turns every LED off.
    pub fn init(&mut self) -> Result<(), LedError<P::Error>> {
        for led in self.leds.iter_mut() {
            led.set(false).map_err(LedError::Pin)?;
        }
        Ok(())
    }

    /// Number of LEDs on this board.
    pub fn count(&self) -> usize {
        N
    }

    pub fn on(&mut self, index: usize) -> Result<(), LedError<P::Error>> {
        self.led(index)?.set(true).map_err(LedError::Pin)
    }

    pub fn off(&mut self, index: usize) -> Result<(), LedError<P::Error>> {
        self.led(index)?.set(false).map_err(LedError::Pin)
    }

    fn led(&mut self, index: usize) -> Result<&mut Led<P>, LedError<P::Error>> {
        self.leds
            .get_mut(index)
            .ok_or(LedError::InvalidLed { index, count: N })
    }
}

impl<P: StatefulOutputPin, const N: usize> Leds<P, N> {
    pub fn toggle(&mut self, index: usize) -> Result<(), LedError<P::Error>> {
        self.led(index)?.pin.toggle().map_err(LedError::Pin)
    }

    pub fn is_on(&mut self, index: usize) -> Result<bool, LedError<P::Error>> {
        let led = self.led(index)?;
        let high = led.pin.is_set_high().map_err(LedError::Pin)?;
        Ok(match led.polarity {
            Polarity::ActiveHigh => high,
            Polarity::ActiveLow => !high,
        })
    }
}
