//! Heater relay driver.
//!
//! Wraps any embedded-hal [`OutputPin`] and hides the module polarity:
//! many cheap relay boards energise on a LOW input, so the logical
//! on/off state is translated through `inverted`. The relay starts off.

use embedded_hal::digital::OutputPin;
use log::debug;

use crate::error::ActuatorError;

pub struct HeaterRelay<P: OutputPin> {
    pin: P,
    inverted: bool,
    on: bool,
    name: &'static str,
}

impl<P: OutputPin> HeaterRelay<P> {
    /// Take ownership of `pin` and drive it to the off level.
    pub fn new(pin: P, inverted: bool, name: &'static str) -> Result<Self, ActuatorError> {
        let mut relay = Self {
            pin,
            inverted,
            on: false,
            name,
        };
        relay.write(false)?;
        Ok(relay)
    }

    /// Switch the heater. Pin writes only happen on a change.
    pub fn set_on(&mut self, on: bool) -> Result<(), ActuatorError> {
        if on == self.on {
            return Ok(());
        }
        self.write(on)?;
        self.on = on;
        debug!(target: "I/O", "{} relay {}", self.name, if on { "ON" } else { "OFF" });
        Ok(())
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Release the underlying pin.
    pub fn into_inner(self) -> P {
        self.pin
    }

    fn write(&mut self, on: bool) -> Result<(), ActuatorError> {
        let high = on != self.inverted;
        let res = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        res.map_err(|_| ActuatorError::GpioWriteFailed)
    }
}
