//! Application service: the hexagonal core.
//!
//! [`OvenService`] owns the temperature estimator, input monitors, stage
//! machine, slice PWM and safety supervisor.  It exposes a clean,
//! hardware-agnostic API.  All I/O flows through port traits injected at
//! call sites, making the entire service testable with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!   ClockPort ──▶ │         OvenService          │
//! ActuatorPort ◀──│ Estimator · FSM · Safety · PWM│
//!                 └──────────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::OvenConfig;
use crate::control::alarm::{AlarmOutput, DoorAlarm};
use crate::control::pwm::{RelayOutputs, SlicePwm};
use crate::drivers::button::HoldButton;
use crate::fsm::context::{Checkpoints, OvenState, RunSummary};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, Stage};
use crate::safety::SafetySupervisor;
use crate::sensors::temperature::{Kelvin, TemperatureEstimator};

use super::events::{AppEvent, StatusSnapshot};
use super::ports::{ActuatorPort, ClockPort, EventSink, SensorPort};

// ───────────────────────────────────────────────────────────────
// OvenService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct OvenService {
    fsm: Fsm,
    state: OvenState,
    estimator: TemperatureEstimator,
    button: HoldButton,
    alarm: DoorAlarm,
    pwm: SlicePwm,
    safety: SafetySupervisor,
    tick_count: u64,
    alarm_output: AlarmOutput,
    relays: RelayOutputs,
    last_run: Option<RunSummary>,
}

impl OvenService {
    /// Construct the service from configuration.
    ///
    /// Does **not** start the FSM: call [`start`](Self::start) next.
    pub fn new(config: OvenConfig) -> Self {
        let estimator = TemperatureEstimator::new(
            config.thermistor,
            config.sample_window,
            config.sensor_fault_limit,
        );
        let alarm = DoorAlarm::new(config.alarm_cycle_ms);
        let pwm = SlicePwm::new(&config.pwm, 0);
        let safety = SafetySupervisor::new(&config);
        let state = OvenState::new(config);
        let fsm = Fsm::new(build_state_table(), Stage::Off);

        Self {
            fsm,
            state,
            estimator,
            button: HoldButton::new(),
            alarm,
            pwm,
            safety,
            tick_count: 0,
            alarm_output: AlarmOutput::default(),
            relays: RelayOutputs::default(),
            last_run: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start the FSM in `Off` and begin the first PWM cycle.
    pub fn start(&mut self, clock: &impl ClockPort, sink: &mut impl EventSink) {
        let now = clock.now_ms();
        self.state.now_ms = now;
        self.pwm = SlicePwm::new(&self.state.config.pwm, now);
        self.fsm.start(&mut self.state);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!(target: "Core", "OvenService started in {}", self.fsm.current_state());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle:
    /// sensors → estimator → button → safety → FSM → alarm → PWM → events.
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`ActuatorPort`], which avoids a double mutable borrow while
    /// keeping the port boundary explicit.
    pub fn tick(
        &mut self,
        hw: &mut (impl SensorPort + ActuatorPort),
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;
        let now = clock.now_ms();
        self.state.now_ms = now;
        let prev_stage = self.fsm.current_state();

        // 1. Read sensors via SensorPort
        let inputs = hw.read_inputs();
        self.state.door_open = inputs.door_open;

        // 2. Temperature estimate
        match inputs.raw_adc {
            Some(raw) => {
                if let Some(k) = self.estimator.sample(raw) {
                    sink.emit(&AppEvent::TemperatureUpdated(k));
                }
            }
            None => self.estimator.read_failed(),
        }
        self.state.temperature = self.estimator.latest();

        // 3. Button hold timer
        self.state.button = self.button.update(inputs.button_pressed, now);

        // 4. Safety evaluation
        let prev_faults = self.safety.faults();
        let faults = self
            .safety
            .evaluate(self.estimator.is_faulted(), self.state.temperature);
        self.state.fault_flags = faults;
        if faults != prev_faults {
            if faults == 0 {
                sink.emit(&AppEvent::FaultCleared);
            } else if faults & !prev_faults != 0 {
                sink.emit(&AppEvent::FaultDetected(faults));
            }
        }
        if faults != 0 && self.fsm.current_state().is_running() {
            warn!(
                target: "Core",
                "Safety fault during {}: aborting run (flags=0b{:08b})",
                self.fsm.current_state(),
                faults
            );
            self.fsm.force_transition(Stage::Off, &mut self.state);
        }

        // 5. FSM tick (pure stage logic)
        self.fsm.tick(&mut self.state);
        if self.safety.has_faults() {
            self.state.heaters = Default::default();
        }

        if let Some(summary) = self.state.completed_run.take() {
            log_run_summary(&summary);
            self.last_run = Some(summary);
            sink.emit(&AppEvent::RunCompleted(summary));
        }

        // 6. Door alarm + beeper
        self.alarm_output =
            self.alarm
                .update(self.state.door_alarm_enabled, self.state.door_open, now);
        hw.set_buzzer(self.alarm_output.beeper_on);

        // 7. Slice PWM → relays via ActuatorPort
        let heaters = self.state.heaters;
        self.relays = self.pwm.tick(heaters.top, heaters.bottom, now);
        hw.set_heaters(self.relays.top, self.relays.bottom);

        // 8. Emit stage change if the FSM moved
        let new_stage = self.fsm.current_state();
        if new_stage != prev_stage {
            sink.emit(&AppEvent::StageChanged {
                from: prev_stage,
                to: new_stage,
            });
        }
    }

    /// Drive every output off. Used before a reboot or an OTA restart.
    pub fn shutdown(&mut self, hw: &mut impl ActuatorPort) {
        self.fsm.force_transition(Stage::Off, &mut self.state);
        self.relays = RelayOutputs::default();
        self.alarm_output = AlarmOutput::default();
        hw.all_off();
        info!(target: "Core", "OvenService: outputs off");
    }

    // ── Queries ───────────────────────────────────────────────

    /// Snapshot for the display and periodic telemetry.
    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            temperature_c: self.state.temp_c(),
            stage: self.fsm.current_state(),
            substage: self.state.substage,
            heaters: self.state.heaters,
            alarm_active: self.alarm_output.active,
            fault_flags: self.state.fault_flags,
            elapsed_secs: self.state.elapsed_secs(),
        }
    }

    /// Profile timing of the last run that finished normally.
    pub fn run_summary(&self) -> Option<RunSummary> {
        self.last_run
    }

    /// Checkpoints of the run in progress.
    pub fn checkpoints(&self) -> Checkpoints {
        self.state.checkpoints
    }

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.fsm.current_state()
    }

    /// Latest published temperature.
    pub fn temperature(&self) -> Option<Kelvin> {
        self.state.temperature
    }

    /// Relay levels driven on the last tick.
    pub fn relays(&self) -> RelayOutputs {
        self.relays
    }

    pub fn alarm(&self) -> AlarmOutput {
        self.alarm_output
    }

    /// Read-only view of the process blackboard.
    pub fn state(&self) -> &OvenState {
        &self.state
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Current active fault bitmask (0 = no faults).
    pub fn fault_flags(&self) -> u8 {
        self.state.fault_flags
    }

    pub fn config(&self) -> &OvenConfig {
        &self.state.config
    }
}

/// Print the profile timing of a finished run to the console.
fn log_run_summary(s: &RunSummary) {
    let fmt = |v: Option<u32>| v.map_or(-1, i64::from);
    let c = &s.checkpoints;
    info!(
        target: "Core",
        "Run complete: warm={}s soak={}s liquidus_up={}s peak={}s ({:.1} C) \
         liquidus_down={}s door={}s total={}s",
        fmt(c.warm),
        fmt(c.soak),
        fmt(c.liquidus_up),
        fmt(c.peak),
        s.peak_c,
        fmt(c.liquidus_down),
        fmt(c.door_open),
        s.total_secs
    );
}
