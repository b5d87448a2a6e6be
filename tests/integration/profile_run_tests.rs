//! Full reflow runs driven by a scripted temperature ramp.
//!
//! The mock oven heats 0.5 C per 100 ms tick up to the peak, then cools
//! at the same rate until the run completes.

use reflow::app::events::AppEvent;
use reflow::fsm::context::Checkpoints;
use reflow::fsm::Stage;

use crate::mock_hw::{fast_config, ActuatorCall, Rig};

const STEP_MS: u64 = 100;
const STEP_C: f32 = 0.5;
const PEAK_C: f32 = 220.0;

#[derive(Debug, Clone, Copy)]
struct Sample {
    stage: Stage,
    temp_c: f32,
    door_alarm_enabled: bool,
    buzzer: bool,
}

fn sample(rig: &Rig) -> Sample {
    Sample {
        stage: rig.service.stage(),
        temp_c: rig.service.status().temperature_c.unwrap_or(f32::NAN),
        door_alarm_enabled: rig.service.state().door_alarm_enabled,
        buzzer: rig.hw.buzzer(),
    }
}

/// Move the oven from `from` to `to` in `STEP_C` increments, one tick
/// each, recording every tick.
fn ramp(rig: &mut Rig, from: f32, to: f32, log: &mut Vec<Sample>) {
    let dir = if to >= from { STEP_C } else { -STEP_C };
    let steps = ((to - from) / dir).round() as usize;
    for i in 1..=steps {
        rig.hw.set_celsius(from + dir * i as f32);
        rig.tick(STEP_MS);
        log.push(sample(rig));
    }
}

fn started_rig() -> Rig {
    let mut rig = Rig::new(fast_config(), 20.0);
    rig.hold_to_start(STEP_MS, 5_000);
    assert_eq!(rig.service.stage(), Stage::Preheat);
    rig
}

#[test]
fn full_run_walks_every_stage_in_order() {
    let mut rig = started_rig();
    let mut log = Vec::new();
    ramp(&mut rig, 20.0, PEAK_C, &mut log);
    ramp(&mut rig, PEAK_C, 49.0, &mut log);

    assert_eq!(
        rig.sink.stage_changes(),
        vec![
            (Stage::Off, Stage::Hold),
            (Stage::Hold, Stage::Preheat),
            (Stage::Preheat, Stage::Soak),
            (Stage::Soak, Stage::Reflow),
            (Stage::Reflow, Stage::Cooldown),
            (Stage::Cooldown, Stage::Off),
        ]
    );
    assert_eq!(rig.service.stage(), Stage::Off);
}

#[test]
fn stages_hand_over_at_their_thresholds() {
    let mut rig = started_rig();
    let mut log = Vec::new();
    ramp(&mut rig, 20.0, PEAK_C, &mut log);

    let first = |stage: Stage| {
        log.iter()
            .find(|s| s.stage == stage)
            .map(|s| s.temp_c)
            .expect("stage reached")
    };
    let soak = first(Stage::Soak);
    let reflow = first(Stage::Reflow);
    let cooldown = first(Stage::Cooldown);
    assert!((140.0..141.0).contains(&soak), "soak at {soak}");
    assert!((180.0..181.0).contains(&reflow), "reflow at {reflow}");
    assert!((212.0..213.0).contains(&cooldown), "cooldown at {cooldown}");
}

#[test]
fn door_prompt_enabled_exactly_on_reflow_exit() {
    let mut rig = started_rig();
    let mut log = Vec::new();
    ramp(&mut rig, 20.0, PEAK_C, &mut log);

    for s in &log {
        assert_eq!(
            s.door_alarm_enabled,
            s.stage == Stage::Cooldown,
            "prompt flag wrong at {:.2} C in {}",
            s.temp_c,
            s.stage
        );
        if s.temp_c < 212.0 {
            assert!(!s.door_alarm_enabled);
        }
    }
    assert!(log.last().is_some_and(|s| s.door_alarm_enabled));
}

#[test]
fn checkpoints_are_ordered_and_summary_reported() {
    let mut rig = started_rig();
    let mut log = Vec::new();
    ramp(&mut rig, 20.0, PEAK_C, &mut log);
    ramp(&mut rig, PEAK_C, 49.0, &mut log);

    let summaries: Vec<_> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::RunCompleted(s) => Some(*s),
            _ => None,
        })
        .collect();
    assert_eq!(summaries.len(), 1);
    let summary = summaries[0];
    assert_eq!(rig.service.run_summary(), Some(summary));

    let c = summary.checkpoints;
    let order = [
        c.warm,
        c.soak,
        c.liquidus_up,
        c.door_open,
        c.peak,
        c.liquidus_down,
        Some(summary.total_secs),
    ];
    assert!(order.iter().all(Option::is_some), "missing checkpoint: {c:?}");
    let secs: Vec<u32> = order.iter().flatten().copied().collect();
    assert!(secs.windows(2).all(|w| w[0] <= w[1]), "out of order: {secs:?}");

    // 0.5 C per 100 ms from 20 C: 50 C after ~6 s, 150 C after ~26 s.
    assert!((5..=7).contains(&secs[0]), "warm at {}", secs[0]);
    assert!((25..=27).contains(&secs[1]), "soak at {}", secs[1]);
    assert!((31..=33).contains(&secs[2]), "liquidus at {}", secs[2]);
    assert!((PEAK_C - summary.peak_c).abs() < 0.5, "peak {}", summary.peak_c);

    // The next run starts from a clean record.
    assert_eq!(rig.service.checkpoints(), Checkpoints::default());
    assert!(!rig.service.state().door_alarm_enabled);
}

#[test]
fn heaters_never_fire_during_cooldown() {
    let mut rig = started_rig();
    let mut log = Vec::new();
    ramp(&mut rig, 20.0, 213.0, &mut log);
    assert_eq!(rig.service.stage(), Stage::Cooldown);

    let mark = rig.hw.calls.len();
    ramp(&mut rig, 213.0, 49.0, &mut log);
    assert!(rig.hw.calls[mark..]
        .iter()
        .all(|c| !matches!(c, ActuatorCall::Heaters { top: true, .. } | ActuatorCall::Heaters { bottom: true, .. })));
}

#[test]
fn open_door_beeps_during_prompt_window() {
    let mut rig = started_rig();
    let mut log = Vec::new();

    // Opening early has no effect: the prompt is not enabled yet.
    ramp(&mut rig, 20.0, 200.0, &mut log);
    rig.hw.door_open = true;
    ramp(&mut rig, 200.0, 211.0, &mut log);
    assert!(log.iter().all(|s| !s.buzzer));
    rig.hw.door_open = false;

    ramp(&mut rig, 211.0, 213.0, &mut log);
    assert_eq!(rig.service.stage(), Stage::Cooldown);
    assert!(!rig.hw.buzzer(), "door closed: prompt shown but silent");

    rig.hw.door_open = true;
    rig.tick(STEP_MS);
    assert!(rig.hw.buzzer(), "each activation starts with a beep");
    assert!(rig.service.status().alarm_active);

    // 1 s on, 1 s off while the prompt lasts.
    let mut beeps = Vec::new();
    for _ in 0..50 {
        rig.tick(STEP_MS);
        beeps.push(rig.hw.buzzer());
    }
    assert!(beeps.iter().any(|&b| b) && beeps.iter().any(|&b| !b));
    let on = beeps.iter().filter(|&&b| b).count();
    assert!((20..=30).contains(&on), "buzzer on {on} of 50 ticks");

    // The prompt expires eight seconds after the reflow ends.
    rig.run(40, STEP_MS);
    assert!(!rig.service.state().door_alarm_enabled);
    assert!(!rig.service.status().alarm_active);
    assert!(!rig.hw.buzzer());
    assert_eq!(rig.service.stage(), Stage::Cooldown);
}

#[test]
fn closing_door_silences_buzzer() {
    let mut rig = started_rig();
    let mut log = Vec::new();
    ramp(&mut rig, 20.0, 213.0, &mut log);
    rig.hw.door_open = true;
    rig.tick(STEP_MS);
    assert!(rig.hw.buzzer());

    rig.hw.door_open = false;
    rig.tick(STEP_MS);
    assert!(!rig.hw.buzzer());
    assert!(!rig.service.alarm().active);
    assert!(rig.service.state().door_alarm_enabled);
}
