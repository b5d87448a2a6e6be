//! Concrete stage handler functions and table builder.
//!
//! Each stage is defined by plain `fn` pointers: no closures, no dynamic
//! dispatch, no heap.
//!
//! ```text
//!  OFF ──[button down]──▶ HOLD ──[held 3 s]──▶ PREHEAT ──[≥140 C]──▶ SOAK
//!   ▲                      │                                           │
//!   └─────[released]───────┘                                       [≥180 C]
//!   │                                                                  ▼
//!   └──────────[≤50 C]────────── COOLDOWN ◀──────[≥212 C]─────────── REFLOW
//!
//!  PREHEAT..COOLDOWN ──[safety fault, forced by the service]──▶ OFF
//! ```
//!
//! Heating stages pick a power band from the configured profile every
//! tick; the band's upper bound on the last sub-stage is the exit
//! threshold. Profile checkpoints are write-once per run.

use super::context::{HeaterCommands, OvenState, RunSummary};
use super::{Stage, StateDescriptor};
use crate::config::StageBands;
use log::{debug, info};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static stage table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; Stage::COUNT] {
    [
        // Index 0: Off
        StateDescriptor {
            id: Stage::Off,
            name: "Off",
            on_enter: Some(off_enter),
            on_exit: None,
            on_update: off_update,
        },
        // Index 1: Hold
        StateDescriptor {
            id: Stage::Hold,
            name: "Hold",
            on_enter: Some(hold_enter),
            on_exit: None,
            on_update: hold_update,
        },
        // Index 2: Preheat
        StateDescriptor {
            id: Stage::Preheat,
            name: "Preheat",
            on_enter: Some(preheat_enter),
            on_exit: None,
            on_update: preheat_update,
        },
        // Index 3: Soak
        StateDescriptor {
            id: Stage::Soak,
            name: "Soak",
            on_enter: Some(soak_enter),
            on_exit: None,
            on_update: soak_update,
        },
        // Index 4: Reflow
        StateDescriptor {
            id: Stage::Reflow,
            name: "Reflow",
            on_enter: Some(reflow_enter),
            on_exit: None,
            on_update: reflow_update,
        },
        // Index 5: Cooldown
        StateDescriptor {
            id: Stage::Cooldown,
            name: "Cooldown",
            on_enter: Some(cooldown_enter),
            on_exit: Some(cooldown_exit),
            on_update: cooldown_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  OFF stage
// ═══════════════════════════════════════════════════════════════════════════

fn off_enter(ctx: &mut OvenState) {
    ctx.reset_run();
    info!(target: "Core", "Oven off");
}

fn off_update(ctx: &mut OvenState) -> Option<Stage> {
    ctx.heaters = HeaterCommands::all_off();
    if ctx.button.pressed {
        return Some(Stage::Hold);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  HOLD stage
// ═══════════════════════════════════════════════════════════════════════════

fn hold_enter(ctx: &mut OvenState) {
    ctx.heaters = HeaterCommands::all_off();
    info!(target: "Core", "Hold: keep the button pressed to start");
}

fn hold_update(ctx: &mut OvenState) -> Option<Stage> {
    ctx.heaters = HeaterCommands::all_off();
    if !ctx.button.pressed {
        return Some(Stage::Off);
    }
    if ctx.button.held_ms < ctx.config.button_hold_ms {
        return None;
    }
    if ctx.has_faults() {
        debug!(target: "Core", "Start refused: faults 0b{:08b}", ctx.fault_flags);
        return None;
    }
    if ctx.temperature.is_none() {
        debug!(target: "Core", "Start refused: no temperature estimate yet");
        return None;
    }
    Some(Stage::Preheat)
}

// ═══════════════════════════════════════════════════════════════════════════
//  Heating stages (PREHEAT, SOAK, REFLOW)
// ═══════════════════════════════════════════════════════════════════════════

fn preheat_enter(ctx: &mut OvenState) {
    ctx.reset_run();
    ctx.run_start_ms = Some(ctx.now_ms);
    info!(target: "Core", "Starting reflow!");
}

fn preheat_update(ctx: &mut OvenState) -> Option<Stage> {
    let bands = ctx.config.profile.preheat;
    heat(ctx, &bands, Stage::Soak)
}

fn soak_enter(ctx: &mut OvenState) {
    info!(target: "Core", "Soak at {}s", ctx.elapsed_secs());
}

fn soak_update(ctx: &mut OvenState) -> Option<Stage> {
    let bands = ctx.config.profile.soak;
    heat(ctx, &bands, Stage::Reflow)
}

fn reflow_enter(ctx: &mut OvenState) {
    info!(target: "Core", "Reflow at {}s", ctx.elapsed_secs());
}

fn reflow_update(ctx: &mut OvenState) -> Option<Stage> {
    let bands = ctx.config.profile.reflow;
    heat(ctx, &bands, Stage::Cooldown)
}

/// Shared heating step: latch checkpoints, then either apply the band
/// for the current temperature or hand over to `next`.
fn heat(ctx: &mut OvenState, bands: &StageBands, next: Stage) -> Option<Stage> {
    let Some(temp) = ctx.temp_c() else {
        ctx.heaters = HeaterCommands::all_off();
        return Some(Stage::Off);
    };

    latch_heating_checkpoints(ctx, temp);

    match bands.select(temp) {
        Some((substage, band)) => {
            ctx.substage = substage;
            ctx.heaters = HeaterCommands {
                top: band.top,
                bottom: band.bottom,
            };
            None
        }
        None => Some(next),
    }
}

fn latch_heating_checkpoints(ctx: &mut OvenState, temp: f32) {
    let at = ctx.elapsed_secs();
    let p = ctx.config.profile;
    let cp = &mut ctx.checkpoints;
    latch(&mut cp.warm, temp >= p.checkpoint_warm_c, at);
    latch(&mut cp.soak, temp >= p.checkpoint_soak_c, at);
    latch(&mut cp.liquidus_up, temp >= p.checkpoint_liquidus_c, at);
}

fn latch(slot: &mut Option<u32>, reached: bool, at: u32) {
    if reached && slot.is_none() {
        *slot = Some(at);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  COOLDOWN stage
// ═══════════════════════════════════════════════════════════════════════════

fn cooldown_enter(ctx: &mut OvenState) {
    ctx.heaters = HeaterCommands::all_off();
    let at = ctx.elapsed_secs();
    latch(&mut ctx.checkpoints.door_open, true, at);
    ctx.door_alarm_enabled = true;
    info!(target: "Core", "Reflow done at {}s, open the door", at);
}

fn cooldown_exit(ctx: &mut OvenState) {
    ctx.door_alarm_enabled = false;
}

fn cooldown_update(ctx: &mut OvenState) -> Option<Stage> {
    ctx.heaters = HeaterCommands::all_off();
    let Some(temp) = ctx.temp_c() else {
        return Some(Stage::Off);
    };
    let at = ctx.elapsed_secs();
    let p = ctx.config.profile;

    if temp <= p.cooldown_done_c {
        ctx.completed_run = Some(RunSummary {
            checkpoints: ctx.checkpoints,
            peak_c: ctx.max_temp_c,
            total_secs: at,
        });
        info!(target: "Core", "Cooldown complete after {}s", at);
        return Some(Stage::Off);
    }

    ctx.substage = 1;
    if temp > ctx.max_temp_c {
        ctx.max_temp_c = temp;
        ctx.checkpoints.peak = Some(at);
    }
    latch(&mut ctx.checkpoints.liquidus_down, temp < p.checkpoint_liquidus_c, at);

    if let Some(door_at) = ctx.checkpoints.door_open {
        ctx.door_alarm_enabled = at.saturating_sub(door_at) < p.door_alarm_secs;
    }
    None
}
