//! Shared mutable context threaded through every stage handler.
//!
//! `OvenState` is the single struct that stage handlers read from and
//! write to: the published temperature, debounced inputs, heater power
//! commands, run timing and checkpoints, configuration and the safety
//! fault mask. The service writes the inputs before each FSM tick and
//! consumes the commands after it.

use serde::Serialize;

use super::Stage;
use crate::config::OvenConfig;
use crate::sensors::temperature::Kelvin;

// ---------------------------------------------------------------------------
// Input snapshot (read from hardware by the sensor port)
// ---------------------------------------------------------------------------

/// Raw inputs sampled once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    /// Thermistor ADC count; `None` when the ADC read itself failed.
    pub raw_adc: Option<u16>,
    /// Start button is down.
    pub button_pressed: bool,
    /// Door switch reports open.
    pub door_open: bool,
}

/// Button state as seen by the stage handlers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonState {
    pub pressed: bool,
    /// Continuous hold time of the current press; 0 while released.
    pub held_ms: u32,
}

// ---------------------------------------------------------------------------
// Heater commands (written by stage handlers; consumed by the PWM driver)
// ---------------------------------------------------------------------------

/// Heater power levels, 0 (off) to 6 (always on).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HeaterCommands {
    pub top: u8,
    pub bottom: u8,
}

impl HeaterCommands {
    /// Both heaters off: safe default.
    pub fn all_off() -> Self {
        Self::default()
    }

    pub fn any_on(&self) -> bool {
        self.top > 0 || self.bottom > 0
    }
}

// ---------------------------------------------------------------------------
// Run record
// ---------------------------------------------------------------------------

/// Seconds since run start at which each profile milestone was first
/// reached. Each field latches once per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Checkpoints {
    /// Oven first reached the warm-up threshold (50 C).
    pub warm: Option<u32>,
    /// Oven first reached the soak threshold (150 C).
    pub soak: Option<u32>,
    /// Oven first reached liquidus (180 C) going up.
    pub liquidus_up: Option<u32>,
    /// Oven first dropped below liquidus during cooldown.
    pub liquidus_down: Option<u32>,
    /// Time of the highest temperature seen during cooldown.
    pub peak: Option<u32>,
    /// Reflow finished and the operator was told to open the door.
    pub door_open: Option<u32>,
}

/// Profile timing of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary {
    pub checkpoints: Checkpoints,
    pub peak_c: f32,
    pub total_secs: u32,
}

// ---------------------------------------------------------------------------
// OvenState
// ---------------------------------------------------------------------------

/// The shared context passed to every stage handler function.
pub struct OvenState {
    // -- Timing --
    /// Monotonic time of the current tick.
    pub now_ms: u64,
    /// Ticks elapsed since the current stage was entered.
    pub ticks_in_state: u64,
    /// Monotonic total tick count.
    pub total_ticks: u64,

    // -- Inputs --
    /// Latest published estimate; `None` until the first window completes.
    pub temperature: Option<Kelvin>,
    pub button: ButtonState,
    pub door_open: bool,

    // -- Process --
    /// Mirror of the FSM's current stage, maintained by the engine.
    pub stage: Stage,
    /// 1-based band within a heating stage, 1 during cooldown, 0 otherwise.
    pub substage: u8,
    pub heaters: HeaterCommands,
    pub run_start_ms: Option<u64>,
    pub checkpoints: Checkpoints,
    /// Highest temperature seen during the current cooldown (Celsius).
    pub max_temp_c: f32,
    pub door_alarm_enabled: bool,
    /// Set when a run finishes normally; taken by the service.
    pub completed_run: Option<RunSummary>,

    // -- Configuration --
    pub config: OvenConfig,

    // -- Safety --
    /// Accumulated safety fault bitmask (see `SafetyFault::mask()`).
    pub fault_flags: u8,
}

impl OvenState {
    /// Create a power-on context with the given configuration.
    pub fn new(config: OvenConfig) -> Self {
        Self {
            now_ms: 0,
            ticks_in_state: 0,
            total_ticks: 0,
            temperature: None,
            button: ButtonState::default(),
            door_open: false,
            stage: Stage::Off,
            substage: 0,
            heaters: HeaterCommands::all_off(),
            run_start_ms: None,
            checkpoints: Checkpoints::default(),
            max_temp_c: 0.0,
            // Armed only when a reflow ends, so an idle oven stays quiet.
            door_alarm_enabled: false,
            completed_run: None,
            config,
            fault_flags: 0,
        }
    }

    /// Published temperature in Celsius.
    pub fn temp_c(&self) -> Option<f32> {
        self.temperature.map(Kelvin::celsius)
    }

    /// Whole seconds since the run started (0 when idle).
    pub fn elapsed_secs(&self) -> u32 {
        self.run_start_ms
            .map_or(0, |start| (self.now_ms.saturating_sub(start) / 1000) as u32)
    }

    /// Forget everything about the current run.
    pub fn reset_run(&mut self) {
        self.substage = 0;
        self.heaters = HeaterCommands::all_off();
        self.run_start_ms = None;
        self.checkpoints = Checkpoints::default();
        self.max_temp_c = 0.0;
    }

    /// Returns `true` if **any** safety fault is active.
    pub fn has_faults(&self) -> bool {
        self.fault_flags != 0
    }

    /// Check whether a specific fault flag is set.
    pub fn has_fault(&self, fault: crate::error::SafetyFault) -> bool {
        fault.is_set(self.fault_flags)
    }
}
