//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the thermistor ADC channel, the button and door inputs, both
//! heater relays and the buzzer, exposing them through [`SensorPort`] and
//! [`ActuatorPort`].  Generic over the embedded-hal pin types so the
//! same adapter runs on [`HwPin`](crate::drivers::hw_init::HwPin) in
//! firmware and on recording pins in tests.

use embedded_hal::digital::{InputPin, OutputPin};
use log::warn;

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::drivers::buzzer::Buzzer;
use crate::drivers::relay::HeaterRelay;
use crate::error::{ActuatorError, Error, Result, SensorError};
use crate::fsm::context::InputSnapshot;
use crate::sensors::AdcChannel;

/// Output drivers, grouped so they can be built before the adapter.
pub struct OvenOutputs<O: OutputPin> {
    pub top: HeaterRelay<O>,
    pub bottom: HeaterRelay<O>,
    pub buzzer: Buzzer<O>,
}

impl<O: OutputPin> OvenOutputs<O> {
    /// Wrap raw pins; relays start de-energised, buzzer silent.
    pub fn new(top: O, bottom: O, buzzer: O, relay_inverted: bool) -> Result<Self> {
        Ok(Self {
            top: HeaterRelay::new(top, relay_inverted, "Top")?,
            bottom: HeaterRelay::new(bottom, relay_inverted, "Bottom")?,
            buzzer: Buzzer::new(buzzer)?,
        })
    }
}

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<A: AdcChannel, I: InputPin, O: OutputPin> {
    adc: A,
    button: I,
    door: I,
    outputs: OvenOutputs<O>,
    write_failures: u32,
}

impl<A: AdcChannel, I: InputPin, O: OutputPin> HardwareAdapter<A, I, O> {
    pub fn new(adc: A, button: I, door: I, outputs: OvenOutputs<O>) -> Self {
        Self {
            adc,
            button,
            door,
            outputs,
            write_failures: 0,
        }
    }

    /// Output pin writes that have failed since boot.
    pub fn write_failures(&self) -> u32 {
        self.write_failures
    }

    pub fn heaters_on(&self) -> (bool, bool) {
        (self.outputs.top.is_on(), self.outputs.bottom.is_on())
    }

    pub fn buzzer_on(&self) -> bool {
        self.outputs.buzzer.is_on()
    }

    fn read_button(&mut self) -> core::result::Result<bool, Error> {
        self.button
            .is_high()
            .map_err(|_| SensorError::GpioReadFailed.into())
    }

    /// Door switch pulls low when closed.
    fn read_door_open(&mut self) -> core::result::Result<bool, Error> {
        self.door
            .is_high()
            .map_err(|_| SensorError::GpioReadFailed.into())
    }

    fn check(&mut self, what: &str, res: core::result::Result<(), ActuatorError>) {
        if let Err(e) = res {
            self.write_failures = self.write_failures.saturating_add(1);
            warn!(target: "I/O", "{what}: {}", Error::from(e));
        }
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<A: AdcChannel, I: InputPin, O: OutputPin> SensorPort for HardwareAdapter<A, I, O> {
    fn read_inputs(&mut self) -> InputSnapshot {
        let raw_adc = self.adc.read_raw().ok();
        // An unreadable button never starts a run; an unreadable door is
        // reported open so the prompt still sounds.
        let button_pressed = self.read_button().unwrap_or_else(|e| {
            warn!(target: "I/O", "Button: {e}");
            false
        });
        let door_open = self.read_door_open().unwrap_or_else(|e| {
            warn!(target: "I/O", "Door switch: {e}");
            true
        });
        InputSnapshot {
            raw_adc,
            button_pressed,
            door_open,
        }
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<A: AdcChannel, I: InputPin, O: OutputPin> ActuatorPort for HardwareAdapter<A, I, O> {
    fn set_heaters(&mut self, top_on: bool, bottom_on: bool) {
        let res = self.outputs.top.set_on(top_on);
        self.check("Top relay", res);
        let res = self.outputs.bottom.set_on(bottom_on);
        self.check("Bottom relay", res);
    }

    fn set_buzzer(&mut self, on: bool) {
        let res = self.outputs.buzzer.set_on(on);
        self.check("Buzzer", res);
    }

    fn all_off(&mut self) {
        self.set_heaters(false, false);
        self.set_buzzer(false);
    }
}
