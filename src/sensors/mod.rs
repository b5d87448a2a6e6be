//! Sensor subsystem: the oven thermistor and its smoothing estimator.
//!
//! The raw ADC channel sits behind [`AdcChannel`] so the same estimator
//! runs against the ESP32 oneshot ADC in firmware and a scripted channel
//! in tests.

pub mod temperature;

use crate::error::SensorError;

/// One analog input channel returning raw counts.
pub trait AdcChannel {
    fn read_raw(&mut self) -> Result<u16, SensorError>;
}
