//! Function-pointer finite state machine engine for the reflow process.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  StateTable                                                │
//! │  ┌──────────┬───────────┬──────────┬───────────────────┐   │
//! │  │ Stage    │ on_enter  │ on_exit  │ on_update         │   │
//! │  ├──────────┼───────────┼──────────┼───────────────────┤   │
//! │  │ Off      │ fn(ctx)   │    —     │ fn(ctx)->Option<> │   │
//! │  │ Hold     │ fn(ctx)   │    —     │ fn(ctx)->Option<> │   │
//! │  │ Preheat  │ fn(ctx)   │    —     │ fn(ctx)->Option<> │   │
//! │  │ Soak     │ fn(ctx)   │    —     │ fn(ctx)->Option<> │   │
//! │  │ Reflow   │ fn(ctx)   │    —     │ fn(ctx)->Option<> │   │
//! │  │ Cooldown │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  └──────────┴───────────┴──────────┴───────────────────┘   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** stage.
//! If it returns `Some(next)`, the engine runs `on_exit` for the current
//! stage, then `on_enter` for the next, and updates the current pointer.
//! The new stage's `on_update` first runs on the following tick. All
//! functions receive `&mut OvenState`, the process blackboard.

pub mod context;
pub mod states;

use context::OvenState;
use log::info;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Stage identity
// ---------------------------------------------------------------------------

/// The reflow process stages, in table order.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[repr(u8)]
pub enum Stage {
    Off = 0,
    Hold = 1,
    Preheat = 2,
    Soak = 3,
    Reflow = 4,
    Cooldown = 5,
}

impl Stage {
    /// Total number of stages: used to size the table array.
    pub const COUNT: usize = 6;

    /// Convert a table index back to `Stage`.  Asserts in debug builds;
    /// returns `Off` in release (heaters off is the safe fallback).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Off,
            1 => Self::Hold,
            2 => Self::Preheat,
            3 => Self::Soak,
            4 => Self::Reflow,
            5 => Self::Cooldown,
            _ => {
                debug_assert!(false, "invalid stage index: {idx}");
                Self::Off
            }
        }
    }

    /// Process stage number as reported on the serial console:
    /// Off = -2, Hold = -1, Preheat = 0 … Cooldown = 3.
    pub const fn code(self) -> i8 {
        self as i8 - 2
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Hold => "Hold",
            Self::Preheat => "Preheat",
            Self::Soak => "Soak",
            Self::Reflow => "Reflow",
            Self::Cooldown => "Cooldown",
        }
    }

    /// A reflow run is in progress (Preheat through Cooldown).
    pub const fn is_running(self) -> bool {
        self.code() >= 0
    }

    /// A stage that may drive the heaters.
    pub const fn is_heating(self) -> bool {
        matches!(self, Self::Preheat | Self::Soak | Self::Reflow)
    }
}

impl core::fmt::Display for Stage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each stage transition.
pub type StateActionFn = fn(&mut OvenState);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut OvenState) -> Option<Stage>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single stage.
/// Stored in a fixed-size array: no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: Stage,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
///
/// Owns the stage table (array of [`StateDescriptor`]); the
/// [`OvenState`] is owned by the caller and threaded through every
/// handler call.
pub struct Fsm {
    /// Fixed-size table indexed by `Stage as usize`.
    table: [StateDescriptor; Stage::COUNT],
    /// Index of the currently active stage.
    current: usize,
    /// Monotonically increasing tick counter.
    tick_count: u64,
    /// Tick at which the current stage was entered.
    state_entry_tick: u64,
}

impl Fsm {
    /// Construct a new FSM with the given table, starting in `initial`.
    pub fn new(table: [StateDescriptor; Stage::COUNT], initial: Stage) -> Self {
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter` for the starting stage.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut OvenState) {
        info!(target: "Core", "FSM starting in stage: {}", self.table[self.current].name);
        ctx.stage = self.current_state();
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick.
    ///
    /// 1. Call `on_update` for the current stage.
    /// 2. If it returns `Some(next)`, execute the transition:
    ///    `on_exit(current)` → update pointer → `on_enter(next)`.
    pub fn tick(&mut self, ctx: &mut OvenState) {
        self.tick_count += 1;
        ctx.ticks_in_state = self.tick_count - self.state_entry_tick;
        ctx.total_ticks = self.tick_count;

        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Force an immediate transition (used by the safety supervisor to
    /// abort a run regardless of what `on_update` returned).
    pub fn force_transition(&mut self, next: Stage, ctx: &mut OvenState) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    /// The current stage.
    pub fn current_state(&self) -> Stage {
        Stage::from_index(self.current)
    }

    /// How many ticks the FSM has been in the current stage.
    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: Stage, ctx: &mut OvenState) {
        let next_idx = next_id as usize;

        info!(
            target: "Core",
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.state_entry_tick = self.tick_count;
        ctx.ticks_in_state = 0;
        ctx.stage = next_id;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::context::OvenState;
    use super::*;
    use crate::config::OvenConfig;
    use crate::sensors::temperature::Kelvin;

    fn make_ctx() -> OvenState {
        let mut ctx = OvenState::new(OvenConfig::default());
        ctx.temperature = Some(Kelvin::from_celsius(25.0));
        ctx
    }

    fn make_fsm() -> Fsm {
        Fsm::new(states::build_state_table(), Stage::Off)
    }

    fn started() -> (Fsm, OvenState) {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        (fsm, ctx)
    }

    fn set_temp(ctx: &mut OvenState, celsius: f32) {
        ctx.temperature = Some(Kelvin::from_celsius(celsius));
    }

    fn press_for(fsm: &mut Fsm, ctx: &mut OvenState, held_ms: u32) {
        ctx.button.pressed = true;
        ctx.button.held_ms = held_ms;
        fsm.tick(ctx);
    }

    #[test]
    fn starts_in_off() {
        let (fsm, ctx) = started();
        assert_eq!(fsm.current_state(), Stage::Off);
        assert_eq!(ctx.stage, Stage::Off);
        assert_eq!(ctx.heaters, context::HeaterCommands::all_off());
    }

    #[test]
    fn tick_increments_counter() {
        let (mut fsm, mut ctx) = started();
        fsm.tick(&mut ctx);
        assert_eq!(fsm.ticks_in_current_state(), 1);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.ticks_in_current_state(), 2);
        assert_eq!(ctx.total_ticks, 2);
    }

    #[test]
    fn stage_codes_match_console_numbering() {
        assert_eq!(Stage::Off.code(), -2);
        assert_eq!(Stage::Hold.code(), -1);
        assert_eq!(Stage::Preheat.code(), 0);
        assert_eq!(Stage::Soak.code(), 1);
        assert_eq!(Stage::Reflow.code(), 2);
        assert_eq!(Stage::Cooldown.code(), 3);
        assert!(!Stage::Hold.is_running());
        assert!(Stage::Cooldown.is_running());
        assert!(!Stage::Cooldown.is_heating());
    }

    #[test]
    fn press_enters_hold_release_returns_off() {
        let (mut fsm, mut ctx) = started();
        press_for(&mut fsm, &mut ctx, 0);
        assert_eq!(fsm.current_state(), Stage::Hold);

        press_for(&mut fsm, &mut ctx, 1500);
        assert_eq!(fsm.current_state(), Stage::Hold);

        ctx.button.pressed = false;
        ctx.button.held_ms = 0;
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), Stage::Off);
    }

    #[test]
    fn hold_three_seconds_starts_preheat() {
        let (mut fsm, mut ctx) = started();
        ctx.now_ms = 10_000;
        press_for(&mut fsm, &mut ctx, 0);
        press_for(&mut fsm, &mut ctx, 2999);
        assert_eq!(fsm.current_state(), Stage::Hold);
        press_for(&mut fsm, &mut ctx, 3000);
        assert_eq!(fsm.current_state(), Stage::Preheat);
        assert_eq!(ctx.run_start_ms, Some(10_000));
        // Substage is computed by Preheat's own update on the next tick.
        assert_eq!(ctx.substage, 0);
        fsm.tick(&mut ctx);
        assert_eq!(ctx.substage, 1);
        assert_eq!((ctx.heaters.top, ctx.heaters.bottom), (0, 5));
    }

    #[test]
    fn hold_refuses_start_while_faulted() {
        let (mut fsm, mut ctx) = started();
        ctx.fault_flags = crate::error::SafetyFault::SensorFault.mask();
        press_for(&mut fsm, &mut ctx, 0);
        press_for(&mut fsm, &mut ctx, 5000);
        assert_eq!(fsm.current_state(), Stage::Hold);
    }

    #[test]
    fn hold_refuses_start_without_estimate() {
        let mut fsm = make_fsm();
        let mut ctx = OvenState::new(OvenConfig::default());
        fsm.start(&mut ctx);
        press_for(&mut fsm, &mut ctx, 0);
        press_for(&mut fsm, &mut ctx, 5000);
        assert_eq!(fsm.current_state(), Stage::Hold);
    }

    #[test]
    fn preheat_band_boundaries() {
        let (mut fsm, mut ctx) = started();
        fsm.force_transition(Stage::Preheat, &mut ctx);
        for (t, sub, top, bot) in [
            (20.0, 1, 0, 5),
            (39.9, 1, 0, 5),
            (40.0, 2, 1, 5),
            (99.9, 2, 1, 5),
            (100.0, 3, 3, 6),
            (139.9, 3, 3, 6),
        ] {
            set_temp(&mut ctx, t);
            fsm.tick(&mut ctx);
            assert_eq!(fsm.current_state(), Stage::Preheat, "t={t}");
            assert_eq!(ctx.substage, sub, "t={t}");
            assert_eq!((ctx.heaters.top, ctx.heaters.bottom), (top, bot), "t={t}");
        }
        set_temp(&mut ctx, 140.0);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), Stage::Soak);
    }

    #[test]
    fn soak_band_boundaries() {
        let (mut fsm, mut ctx) = started();
        fsm.force_transition(Stage::Soak, &mut ctx);
        for (t, sub, top, bot) in [
            (145.0, 1, 1, 4),
            (150.0, 2, 2, 5),
            (169.9, 2, 2, 5),
            (170.0, 3, 2, 6),
        ] {
            set_temp(&mut ctx, t);
            fsm.tick(&mut ctx);
            assert_eq!(ctx.substage, sub, "t={t}");
            assert_eq!((ctx.heaters.top, ctx.heaters.bottom), (top, bot), "t={t}");
        }
        set_temp(&mut ctx, 180.0);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), Stage::Reflow);
    }

    #[test]
    fn reflow_substages_use_distinct_thresholds() {
        let (mut fsm, mut ctx) = started();
        fsm.force_transition(Stage::Reflow, &mut ctx);
        for (t, sub) in [(185.0, 1), (190.0, 2), (199.9, 2), (200.0, 3), (211.9, 3)] {
            set_temp(&mut ctx, t);
            fsm.tick(&mut ctx);
            assert_eq!(ctx.substage, sub, "t={t}");
            assert_eq!((ctx.heaters.top, ctx.heaters.bottom), (3, 6));
        }
        assert!(!ctx.door_alarm_enabled);
        set_temp(&mut ctx, 212.0);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), Stage::Cooldown);
        assert!(ctx.door_alarm_enabled);
        assert_eq!(ctx.heaters, context::HeaterCommands::all_off());
    }

    #[test]
    fn cooldown_returns_to_off_and_resets() {
        let (mut fsm, mut ctx) = started();
        ctx.run_start_ms = Some(0);
        fsm.force_transition(Stage::Cooldown, &mut ctx);
        set_temp(&mut ctx, 120.0);
        fsm.tick(&mut ctx);
        assert_eq!(ctx.substage, 1);

        set_temp(&mut ctx, 50.0);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), Stage::Off);
        assert_eq!(ctx.substage, 0);
        assert_eq!(ctx.checkpoints, context::Checkpoints::default());
        assert!(!ctx.door_alarm_enabled);
        assert!(ctx.completed_run.is_some());
    }

    #[test]
    fn off_forces_heaters_off() {
        let (mut fsm, mut ctx) = started();
        ctx.heaters.top = 6;
        ctx.heaters.bottom = 6;
        fsm.tick(&mut ctx);
        assert_eq!(ctx.heaters, context::HeaterCommands::all_off());
    }

    #[test]
    fn force_transition_to_same_stage_is_noop() {
        let (mut fsm, mut ctx) = started();
        fsm.tick(&mut ctx);
        fsm.force_transition(Stage::Off, &mut ctx);
        assert_eq!(fsm.ticks_in_current_state(), 1);
    }

    #[test]
    fn stage_from_index_roundtrip() {
        for i in 0..Stage::COUNT {
            let id = Stage::from_index(i);
            assert_eq!(id as usize, i);
        }
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn stage_from_invalid_index_returns_off() {
        assert_eq!(Stage::from_index(99), Stage::Off);
    }
}
