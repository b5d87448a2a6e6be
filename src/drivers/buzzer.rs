//! Piezo buzzer driver (active HIGH through a transistor).

use embedded_hal::digital::OutputPin;

use crate::error::ActuatorError;

pub struct Buzzer<P: OutputPin> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> Buzzer<P> {
    pub fn new(mut pin: P) -> Result<Self, ActuatorError> {
        pin.set_low().map_err(|_| ActuatorError::GpioWriteFailed)?;
        Ok(Self { pin, on: false })
    }

    pub fn set_on(&mut self, on: bool) -> Result<(), ActuatorError> {
        if on == self.on {
            return Ok(());
        }
        let res = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        res.map_err(|_| ActuatorError::GpioWriteFailed)?;
        self.on = on;
        Ok(())
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}
