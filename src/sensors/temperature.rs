//! NTC thermistor temperature sensing.
//!
//! The thermistor sits on the high side of a voltage divider with a fixed
//! resistor to ground, read by the ESP32-S3 ADC:
//!
//! ```text
//!   Vout = raw · Vcc / ADC_MAX
//!   Rth  = Vcc · R / Vout − R
//!   T    = 1 / (A + B·ln(Rth) + C·ln(Rth)³)      [Kelvin]
//! ```
//!
//! Single readings are noisy, so [`TemperatureEstimator`] accumulates a
//! fixed window of conversions and publishes only their mean.

use log::{debug, error, warn};

use crate::config::ThermistorConfig;
use crate::error::SensorError;

/// Offset between the Kelvin and Celsius scales.
pub const ZERO_CELSIUS_K: f32 = 273.15;

/// Absolute temperature.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Kelvin(pub f32);

impl Kelvin {
    pub fn from_celsius(celsius: f32) -> Self {
        Self(celsius + ZERO_CELSIUS_K)
    }

    pub fn celsius(self) -> f32 {
        self.0 - ZERO_CELSIUS_K
    }
}

/// Steinhart–Hart conversion for one thermistor/divider pair.
#[derive(Debug, Clone, Copy)]
pub struct Thermistor {
    cfg: ThermistorConfig,
}

impl Thermistor {
    pub fn new(cfg: ThermistorConfig) -> Self {
        Self { cfg }
    }

    /// Thermistor resistance in ohms for a raw ADC count.
    pub fn resistance(&self, raw: u16) -> Result<f32, SensorError> {
        if raw <= self.cfg.open_circuit_raw {
            return Err(SensorError::OpenCircuit);
        }
        if raw >= self.cfg.short_circuit_raw || raw >= self.cfg.adc_max {
            return Err(SensorError::ShortCircuit);
        }
        let vout = raw as f32 * self.cfg.vcc / self.cfg.adc_max as f32;
        let ohms = self.cfg.vcc * self.cfg.divider_ohms / vout - self.cfg.divider_ohms;
        if ohms.is_finite() && ohms > 0.0 {
            Ok(ohms)
        } else {
            Err(SensorError::OutOfRange)
        }
    }

    /// Steinhart–Hart: resistance → absolute temperature.
    pub fn kelvin_from_resistance(&self, ohms: f32) -> Result<Kelvin, SensorError> {
        let ln_r = ohms.ln();
        let inv_t = self.cfg.a + self.cfg.b * ln_r + self.cfg.c * ln_r * ln_r * ln_r;
        let kelvin = 1.0 / inv_t;
        if kelvin.is_finite() && kelvin > 0.0 {
            Ok(Kelvin(kelvin))
        } else {
            Err(SensorError::OutOfRange)
        }
    }

    pub fn kelvin(&self, raw: u16) -> Result<Kelvin, SensorError> {
        self.resistance(raw).and_then(|r| self.kelvin_from_resistance(r))
    }
}

/// Windowed mean of thermistor conversions.
///
/// Rejected samples do not count towards the window; the last published
/// estimate is kept. After `fault_limit` consecutive rejections the
/// estimator reports itself faulted until a good sample arrives.
pub struct TemperatureEstimator {
    thermistor: Thermistor,
    window: u16,
    fault_limit: u16,
    accumulator: f64,
    count: u16,
    consecutive_rejects: u16,
    latest: Option<Kelvin>,
    last_error: Option<SensorError>,
}

impl TemperatureEstimator {
    pub fn new(cfg: ThermistorConfig, window: u16, fault_limit: u16) -> Self {
        Self {
            thermistor: Thermistor::new(cfg),
            window: window.max(1),
            fault_limit: fault_limit.max(1),
            accumulator: 0.0,
            count: 0,
            consecutive_rejects: 0,
            latest: None,
            last_error: None,
        }
    }

    /// Feed one raw reading. Returns the new estimate on the sample that
    /// completes a window, `None` otherwise.
    pub fn sample(&mut self, raw: u16) -> Option<Kelvin> {
        match self.thermistor.kelvin(raw) {
            Ok(k) => {
                if self.consecutive_rejects >= self.fault_limit {
                    warn!(target: "I/O", "Thermistor recovered after {} bad samples", self.consecutive_rejects);
                }
                self.consecutive_rejects = 0;
                self.last_error = None;
                self.accumulator += f64::from(k.0);
                self.count += 1;
                if self.count < self.window {
                    return None;
                }
                let mean = Kelvin((self.accumulator / f64::from(self.count)) as f32);
                self.accumulator = 0.0;
                self.count = 0;
                self.latest = Some(mean);
                debug!(target: "I/O", "Temperature: {:.2} K ({:.2} C)", mean.0, mean.celsius());
                Some(mean)
            }
            Err(e) => {
                if self.consecutive_rejects == 0 {
                    warn!(target: "I/O", "Rejected thermistor sample raw={raw}: {e}");
                }
                self.reject(e);
                None
            }
        }
    }

    /// Count a tick on which the ADC could not be read at all.
    pub fn read_failed(&mut self) {
        if self.consecutive_rejects == 0 {
            warn!(target: "I/O", "Thermistor ADC read failed");
        }
        self.reject(SensorError::AdcReadFailed);
    }

    fn reject(&mut self, e: SensorError) {
        self.consecutive_rejects = self.consecutive_rejects.saturating_add(1);
        self.last_error = Some(e);
        if self.consecutive_rejects == self.fault_limit {
            error!(target: "I/O", "Thermistor faulted: {e} for {} samples", self.fault_limit);
        }
    }

    /// Last published estimate; `None` until the first window completes.
    pub fn latest(&self) -> Option<Kelvin> {
        self.latest
    }

    pub fn is_faulted(&self) -> bool {
        self.consecutive_rejects >= self.fault_limit
    }

    pub fn last_error(&self) -> Option<SensorError> {
        self.last_error
    }

    pub fn thermistor(&self) -> &Thermistor {
        &self.thermistor
    }
}
