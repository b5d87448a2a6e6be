//! Outbound application events.
//!
//! The [`OvenService`](super::service::OvenService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, feed the display, etc.

use serde::Serialize;

use crate::fsm::context::{HeaterCommands, RunSummary};
use crate::fsm::Stage;
use crate::sensors::temperature::Kelvin;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started (carries initial stage).
    Started(Stage),

    /// The stage machine moved between stages.
    StageChanged { from: Stage, to: Stage },

    /// The estimator published a new windowed mean.
    TemperatureUpdated(Kelvin),

    /// One or more safety faults were raised.
    FaultDetected(u8),

    /// All safety faults have been cleared.
    FaultCleared,

    /// A run finished normally; carries its profile timing.
    RunCompleted(RunSummary),

    /// Periodic status snapshot.
    Telemetry(StatusSnapshot),
}

/// Point-in-time view of the oven, used by the display and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusSnapshot {
    /// Published temperature in Celsius; `None` before the first window.
    pub temperature_c: Option<f32>,
    pub stage: Stage,
    pub substage: u8,
    pub heaters: HeaterCommands,
    /// Door-open prompt is currently showing.
    pub alarm_active: bool,
    pub fault_flags: u8,
    /// Seconds since the run started (0 when idle).
    pub elapsed_secs: u32,
}
