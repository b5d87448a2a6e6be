//! System configuration parameters
//!
//! All tunable parameters for the reflow oven. `Default` reproduces the
//! factory calibration; there is no persistent storage, so a running
//! configuration only lives until the next power cycle.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Highest heater power level; one level per PWM slice.
pub const MAX_POWER: u8 = 6;

/// Number of sub-stages in each heating stage.
pub const SUBSTAGES: usize = 3;

/// Thermistor divider and Steinhart–Hart coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermistorConfig {
    /// Divider supply voltage.
    pub vcc: f32,
    /// Fixed divider resistor in ohms.
    pub divider_ohms: f32,
    /// Full-scale ADC count (12-bit on ESP32-S3).
    pub adc_max: u16,
    /// Readings at or below this count are treated as an open thermistor.
    pub open_circuit_raw: u16,
    /// Readings at or above this count are treated as a shorted thermistor.
    pub short_circuit_raw: u16,
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl Default for ThermistorConfig {
    fn default() -> Self {
        Self {
            vcc: 3.3,
            divider_ohms: 10_000.0,
            adc_max: 4095,
            open_circuit_raw: 10,
            short_circuit_raw: 4085,
            a: -0.001_409_530_4,
            b: 0.000_539_671_87,
            c: -0.000_000_949_965_03,
        }
    }
}

/// One sub-stage of a heating stage: applies while the oven is below
/// `below_c`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerBand {
    pub below_c: f32,
    pub top: u8,
    pub bottom: u8,
}

impl PowerBand {
    const fn new(below_c: f32, top: u8, bottom: u8) -> Self {
        Self { below_c, top, bottom }
    }
}

/// The three sub-stages of a heating stage. The last band's upper bound
/// is the stage exit threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageBands {
    pub bands: [PowerBand; SUBSTAGES],
}

impl StageBands {
    /// Temperature at which the stage hands over to the next one.
    pub fn exit_c(&self) -> f32 {
        self.bands[SUBSTAGES - 1].below_c
    }

    /// Pick the sub-stage (1-based) for `temp_c`, or `None` once the exit
    /// threshold is reached.
    pub fn select(&self, temp_c: f32) -> Option<(u8, PowerBand)> {
        self.bands
            .iter()
            .enumerate()
            .find(|(_, band)| temp_c < band.below_c)
            .map(|(i, band)| (i as u8 + 1, *band))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for band in &self.bands {
            if band.top > MAX_POWER || band.bottom > MAX_POWER {
                return Err(ConfigError::ValidationFailed("heater power above 6"));
            }
            if !band.below_c.is_finite() {
                return Err(ConfigError::ValidationFailed("band threshold not finite"));
            }
        }
        if self.bands.windows(2).any(|w| w[0].below_c >= w[1].below_c) {
            return Err(ConfigError::ValidationFailed("band thresholds must increase"));
        }
        Ok(())
    }
}

/// Temperature profile: power bands per heating stage plus the
/// checkpoint thresholds recorded for every run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub preheat: StageBands,
    pub soak: StageBands,
    pub reflow: StageBands,
    /// Cooldown ends once the oven is at or below this temperature.
    pub cooldown_done_c: f32,
    /// How long after the door-open prompt the alarm keeps sounding.
    pub door_alarm_secs: u32,
    /// Checkpoint: first time the oven reaches this temperature.
    pub checkpoint_warm_c: f32,
    /// Checkpoint: soak plateau reached.
    pub checkpoint_soak_c: f32,
    /// Checkpoint: liquidus crossed going up, then again going down.
    pub checkpoint_liquidus_c: f32,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            preheat: StageBands {
                bands: [
                    PowerBand::new(40.0, 0, 5),
                    PowerBand::new(100.0, 1, 5),
                    PowerBand::new(140.0, 3, 6),
                ],
            },
            soak: StageBands {
                bands: [
                    PowerBand::new(150.0, 1, 4),
                    PowerBand::new(170.0, 2, 5),
                    PowerBand::new(180.0, 2, 6),
                ],
            },
            reflow: StageBands {
                bands: [
                    PowerBand::new(190.0, 3, 6),
                    PowerBand::new(200.0, 3, 6),
                    PowerBand::new(212.0, 3, 6),
                ],
            },
            cooldown_done_c: 50.0,
            door_alarm_secs: 8,
            checkpoint_warm_c: 50.0,
            checkpoint_soak_c: 150.0,
            checkpoint_liquidus_c: 180.0,
        }
    }
}

/// PWM slice layout. Slice `k` (1-based) ends at `slice_ends_ms[k - 1]`;
/// the last entry is the cycle length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PwmConfig {
    pub slice_ends_ms: [u32; MAX_POWER as usize],
}

impl PwmConfig {
    pub fn cycle_ms(&self) -> u32 {
        self.slice_ends_ms[MAX_POWER as usize - 1]
    }
}

impl Default for PwmConfig {
    fn default() -> Self {
        Self {
            slice_ends_ms: [166, 333, 500, 666, 833, 1000],
        }
    }
}

/// WiFi / mDNS / OTA settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub mdns_host: heapless::String<32>,
    pub ota_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let mut mdns_host = heapless::String::new();
        // Fits: 11 bytes into 32.
        let _ = mdns_host.push_str("reflow-oven");
        Self {
            mdns_host,
            ota_port: 8266,
        }
    }
}

/// Core oven configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvenConfig {
    // --- Sensing ---
    pub thermistor: ThermistorConfig,
    /// Samples averaged into one published temperature.
    pub sample_window: u16,
    /// Consecutive rejected samples before the sensor is declared faulted.
    pub sensor_fault_limit: u16,

    // --- Profile ---
    pub profile: ProfileConfig,

    // --- Safety ---
    /// Any run is aborted above this temperature (Celsius).
    pub max_temperature_c: f32,

    // --- Inputs / outputs ---
    /// Continuous button hold that starts a run (milliseconds).
    pub button_hold_ms: u32,
    /// Beeper on-time; one beep period is twice this (milliseconds).
    pub alarm_cycle_ms: u32,
    pub pwm: PwmConfig,
    /// Relay modules that energise on a low output.
    pub relay_inverted: bool,

    // --- Timing ---
    /// Control loop period (milliseconds).
    pub tick_interval_ms: u32,
    pub display_temp_ms: u32,
    pub display_status_ms: u32,
    /// Blocking splash delay at boot (milliseconds).
    pub boot_delay_ms: u32,

    // --- Network ---
    pub network: NetworkConfig,
}

impl Default for OvenConfig {
    fn default() -> Self {
        Self {
            thermistor: ThermistorConfig::default(),
            sample_window: 100,
            sensor_fault_limit: 100,

            profile: ProfileConfig::default(),

            max_temperature_c: 260.0,

            button_hold_ms: 3000,
            alarm_cycle_ms: 1000,
            pwm: PwmConfig::default(),
            relay_inverted: true,

            tick_interval_ms: 10, // 100 Hz sampling, ~1 Hz estimates
            display_temp_ms: 1000,
            display_status_ms: 1000,
            boot_delay_ms: 3000,

            network: NetworkConfig::default(),
        }
    }
}

impl OvenConfig {
    /// Reject values that would make the controller unsafe or undefined.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thermistor;
        if t.vcc.is_nan() || t.vcc <= 0.0 || t.divider_ohms.is_nan() || t.divider_ohms <= 0.0 {
            return Err(ConfigError::ValidationFailed("thermistor divider must be positive"));
        }
        if t.adc_max == 0 || t.open_circuit_raw >= t.short_circuit_raw || t.short_circuit_raw > t.adc_max
        {
            return Err(ConfigError::ValidationFailed("thermistor ADC guard band invalid"));
        }
        if self.sample_window == 0 {
            return Err(ConfigError::ValidationFailed("sample window must be non-zero"));
        }
        if self.sensor_fault_limit == 0 {
            return Err(ConfigError::ValidationFailed("sensor fault limit must be non-zero"));
        }

        let p = &self.profile;
        p.preheat.validate()?;
        p.soak.validate()?;
        p.reflow.validate()?;
        if p.preheat.exit_c() > p.soak.exit_c() || p.soak.exit_c() > p.reflow.exit_c() {
            return Err(ConfigError::ValidationFailed("stage exits must increase"));
        }
        if p.cooldown_done_c >= p.reflow.exit_c() {
            return Err(ConfigError::ValidationFailed("cooldown must finish below reflow exit"));
        }
        if self.max_temperature_c.is_nan() || self.max_temperature_c <= p.reflow.exit_c() {
            return Err(ConfigError::ValidationFailed(
                "max temperature must be above reflow exit",
            ));
        }

        if self.button_hold_ms == 0 || self.alarm_cycle_ms == 0 {
            return Err(ConfigError::ValidationFailed("button/alarm timing must be non-zero"));
        }
        let ends = &self.pwm.slice_ends_ms;
        if ends[0] == 0 || ends.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::ValidationFailed("PWM slices must strictly increase"));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("tick interval must be non-zero"));
        }
        if self.network.mdns_host.is_empty() {
            return Err(ConfigError::ValidationFailed("mDNS host must not be empty"));
        }
        Ok(())
    }
}
