//! Safety supervisor.
//!
//! The supervisor runs **every tick before the FSM** and maintains a fault
//! bitmask that the service copies into `OvenState.fault_flags`.
//!
//! ## Fault lifecycle
//!
//! 1. A condition triggers a fault (thermistor unreadable, oven too hot).
//! 2. The supervisor sets the corresponding bit.
//! 3. If a run is active the service forces the FSM to `Off`, which drops
//!    both heater powers to 0. Relays stay off while any bit is set.
//! 4. Each tick the supervisor re-evaluates; a bit clears as soon as its
//!    condition clears.
//! 5. A new run can only be started from `Hold` once the mask is 0.
//!
//! Faults never restart an aborted run; the operator has to hold the
//! button again.

use crate::config::OvenConfig;
use crate::error::SafetyFault;
use crate::sensors::temperature::Kelvin;
use log::{error, info};

/// Safety supervisor.
pub struct SafetySupervisor {
    max_temp_c: f32,
    /// Current fault bitmask.
    faults: u8,
}

impl SafetySupervisor {
    pub fn new(config: &OvenConfig) -> Self {
        Self {
            max_temp_c: config.max_temperature_c,
            faults: 0,
        }
    }

    /// Evaluate all safety conditions. Returns the updated fault bitmask.
    ///
    /// `temperature` is the last published estimate; before the first
    /// window completes there is nothing to compare against the cutoff.
    pub fn evaluate(&mut self, sensor_faulted: bool, temperature: Option<Kelvin>) -> u8 {
        // ── Thermistor ────────────────────────────────────────────
        self.eval_fault(SafetyFault::SensorFault, sensor_faulted);

        // ── Temperature ───────────────────────────────────────────
        let too_hot = temperature.is_some_and(|k| k.celsius() > self.max_temp_c);
        self.eval_fault(SafetyFault::OverTemperature, too_hot);

        self.faults
    }

    /// Current fault bitmask.
    pub fn faults(&self) -> u8 {
        self.faults
    }

    /// True if **any** fault is active.
    pub fn has_faults(&self) -> bool {
        self.faults != 0
    }

    /// Check if a specific fault is active.
    pub fn has_fault(&self, fault: SafetyFault) -> bool {
        fault.is_set(self.faults)
    }

    // ── Internal ──────────────────────────────────────────────────

    /// Set or clear a fault bit based on a boolean condition.
    fn eval_fault(&mut self, fault: SafetyFault, condition: bool) {
        if condition {
            if !fault.is_set(self.faults) {
                error!(target: "Core", "SAFETY FAULT SET: {fault}");
            }
            self.faults |= fault.mask();
        } else {
            if fault.is_set(self.faults) {
                info!(target: "Core", "SAFETY FAULT CLEARED: {fault}");
            }
            self.faults &= !fault.mask();
        }
    }
}
