//! Fuzz target: thermistor conversion and windowed estimator
//!
//! Feeds arbitrary raw ADC counts (and dropped reads) through the
//! estimator and verifies:
//! - No panics for any count, including the guard bands
//! - Every published estimate is a finite, positive Kelvin value
//! - The sensor reports faulted only after `fault_limit` straight rejections
//!
//! cargo fuzz run fuzz_estimator

#![no_main]

use libfuzzer_sys::fuzz_target;
use reflow::config::ThermistorConfig;
use reflow::sensors::temperature::TemperatureEstimator;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let window = u16::from(data[0] % 16) + 1;
    let fault_limit = u16::from(data[1] % 16) + 1;
    let mut est = TemperatureEstimator::new(ThermistorConfig::default(), window, fault_limit);

    let mut rejects = 0u16;
    for pair in data[2..].chunks(2) {
        let raw = match *pair {
            [hi, lo] => u16::from_be_bytes([hi, lo]) % 4200,
            // A trailing odd byte stands for a failed ADC read.
            _ => {
                est.read_failed();
                rejects = rejects.saturating_add(1);
                assert_eq!(est.is_faulted(), rejects >= fault_limit);
                continue;
            }
        };

        let accepted = est.thermistor().kelvin(raw).is_ok();
        if let Some(k) = est.sample(raw) {
            assert!(k.0.is_finite() && k.0 > 0.0, "published {} K", k.0);
        }
        rejects = if accepted { 0 } else { rejects.saturating_add(1) };
        assert_eq!(est.is_faulted(), rejects >= fault_limit);
    }
});
