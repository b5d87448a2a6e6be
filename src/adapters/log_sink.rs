//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production).  The console format
//! keeps the familiar `"<temp> <stage>"` status line once per second via
//! the telemetry event.

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(s) => {
                let temp = s.temperature_c.unwrap_or(f32::NAN);
                info!(
                    target: "Core",
                    "TELEM | {:.1} {} | sub={} top={} bottom={} | t={}s | alarm={} | faults=0b{:08b}",
                    temp,
                    s.stage.code(),
                    s.substage,
                    s.heaters.top,
                    s.heaters.bottom,
                    s.elapsed_secs,
                    s.alarm_active,
                    s.fault_flags,
                );
            }
            AppEvent::TemperatureUpdated(k) => {
                debug!(target: "Core", "TEMP  | {:.2} C", k.celsius());
            }
            AppEvent::StageChanged { from, to } => {
                info!(target: "Core", "STAGE | {} -> {}", from, to);
            }
            AppEvent::FaultDetected(flags) => {
                warn!(target: "Core", "FAULT | detected, flags=0b{:08b}", flags);
            }
            AppEvent::FaultCleared => {
                info!(target: "Core", "FAULT | all cleared");
            }
            AppEvent::RunCompleted(summary) => match serde_json::to_string(summary) {
                Ok(json) => info!(target: "Core", "RUN   | {json}"),
                Err(e) => warn!(target: "Core", "RUN   | summary not serialisable: {e}"),
            },
            AppEvent::Started(stage) => {
                info!(target: "Core", "START | initial_stage={}", stage);
            }
        }
    }
}
