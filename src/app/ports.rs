//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ OvenService (domain)
//! ```
//!
//! Driven adapters (thermistor ADC, relays, buzzer, clock, event sinks,
//! configuration) implement these traits. The
//! [`OvenService`](super::service::OvenService) consumes them via generics,
//! so the domain core never touches hardware directly.

use crate::config::OvenConfig;
use crate::fsm::context::InputSnapshot;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this once per tick.
pub trait SensorPort {
    /// Sample the thermistor ADC, the start button and the door switch.
    fn read_inputs(&mut self) -> InputSnapshot;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to drive relays and the buzzer.
pub trait ActuatorPort {
    /// Drive both heater relays (logical on/off; polarity is the adapter's
    /// concern).
    fn set_heaters(&mut self, top_on: bool, bottom_on: bool);

    /// Switch the alarm buzzer.
    fn set_buzzer(&mut self, on: bool);

    /// Both relays and the buzzer off: safe shutdown.
    fn all_off(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: monotonic time → domain)
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock. Every timing decision in the core is a
/// delta of two readings from this port.
pub trait ClockPort {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ config source)
// ───────────────────────────────────────────────────────────────

/// Loads and replaces the oven configuration.
///
/// Implementations MUST validate before accepting a configuration. Invalid
/// ranges are rejected with [`ConfigError::ValidationFailed`], not silently
/// clamped, so a bad profile can never raise the over-temperature cutoff
/// or command a power level the PWM driver cannot express.
pub trait ConfigPort {
    /// Current configuration; the compiled-in default until replaced.
    fn load(&self) -> Result<OvenConfig, ConfigError>;

    /// Validate and replace the configuration.
    fn save(&mut self, config: &OvenConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
