//! OvenService integration tests: start gating, safety aborts, heater
//! slicing and the status snapshot, all against `MockOven`.

use reflow::app::events::AppEvent;
use reflow::config::OvenConfig;
use reflow::error::SafetyFault;
use reflow::fsm::Stage;

use crate::mock_hw::{fast_config, ActuatorCall, Rig};

const STEP_MS: u64 = 100;

fn started_rig() -> Rig {
    let mut rig = Rig::new(fast_config(), 20.0);
    rig.hold_to_start(STEP_MS, 5_000);
    assert_eq!(rig.service.stage(), Stage::Preheat);
    rig
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn start_emits_started_in_off() {
    let rig = Rig::new(fast_config(), 20.0);
    assert_eq!(rig.sink.events, vec![AppEvent::Started(Stage::Off)]);
    assert_eq!(rig.service.stage(), Stage::Off);
    assert!(rig.service.temperature().is_none());
}

#[test]
fn idle_oven_keeps_heaters_off() {
    let mut rig = Rig::new(fast_config(), 20.0);
    rig.run(50, STEP_MS);
    assert_eq!(rig.service.stage(), Stage::Off);
    assert!(!rig.hw.any_heater_call_on());
    assert!(!rig.hw.buzzer());
    let t = rig.service.status().temperature_c.expect("estimate published");
    assert!((t - 20.0).abs() < 0.5, "read {t}");
}

// ── Hold to start ─────────────────────────────────────────────

#[test]
fn three_second_hold_starts_preheat() {
    let mut rig = Rig::new(fast_config(), 20.0);
    rig.hw.button_pressed = true;

    rig.tick(STEP_MS);
    assert_eq!(rig.service.stage(), Stage::Hold);

    // First press seen at 100 ms; 3 s later is 3100 ms.
    rig.run(29, STEP_MS);
    assert_eq!(rig.service.stage(), Stage::Hold);
    rig.tick(STEP_MS);
    assert_eq!(rig.service.stage(), Stage::Preheat);

    assert_eq!(
        rig.sink.stage_changes(),
        vec![(Stage::Off, Stage::Hold), (Stage::Hold, Stage::Preheat)]
    );
    assert_eq!(rig.service.state().run_start_ms, Some(3_100));
}

#[test]
fn early_release_returns_to_off() {
    let mut rig = Rig::new(fast_config(), 20.0);
    rig.hw.button_pressed = true;
    rig.run(20, STEP_MS);
    assert_eq!(rig.service.stage(), Stage::Hold);

    rig.hw.button_pressed = false;
    rig.tick(STEP_MS);
    assert_eq!(rig.service.stage(), Stage::Off);

    // A fresh press has to be held the full time again.
    rig.hw.button_pressed = true;
    rig.run(25, STEP_MS);
    assert_eq!(rig.service.stage(), Stage::Hold);
    assert!(!rig.hw.any_heater_call_on());
}

#[test]
fn start_refused_without_estimate() {
    let config = OvenConfig {
        sample_window: 1_000,
        ..fast_config()
    };
    let mut rig = Rig::new(config, 20.0);
    rig.hw.button_pressed = true;
    rig.run(60, STEP_MS);

    assert!(rig.service.temperature().is_none());
    assert_eq!(rig.service.stage(), Stage::Hold);
    assert!(!rig.hw.any_heater_call_on());
}

#[test]
fn start_refused_while_faulted_then_allowed() {
    let mut rig = Rig::new(fast_config(), 265.0);
    rig.tick(STEP_MS);
    assert!(SafetyFault::OverTemperature.is_set(rig.service.fault_flags()));

    rig.hw.button_pressed = true;
    rig.run(40, STEP_MS);
    assert_eq!(rig.service.stage(), Stage::Hold);

    // Once the fault clears the held button starts the run.
    rig.hw.set_celsius(25.0);
    rig.tick(STEP_MS);
    assert_eq!(rig.service.fault_flags(), 0);
    assert_eq!(rig.service.stage(), Stage::Preheat);
    assert!(rig.sink.events.contains(&AppEvent::FaultCleared));
}

// ── Safety ────────────────────────────────────────────────────

#[test]
fn sensor_fault_aborts_run() {
    let mut rig = started_rig();
    rig.run(10, STEP_MS);
    assert!(rig.hw.heaters().1, "bottom heater should be driven in preheat");

    // Open-circuit thermistor: five rejected samples fault the sensor.
    rig.hw.raw_adc = Some(0);
    rig.run(4, STEP_MS);
    assert_eq!(rig.service.stage(), Stage::Preheat);
    rig.tick(STEP_MS);

    assert_eq!(rig.service.stage(), Stage::Off);
    assert_eq!(rig.service.fault_flags(), SafetyFault::SensorFault.mask());
    assert_eq!(rig.hw.heaters(), (false, false));
    assert!(rig
        .sink
        .events
        .contains(&AppEvent::FaultDetected(SafetyFault::SensorFault.mask())));
    assert_eq!(
        rig.sink.stage_changes().last(),
        Some(&(Stage::Preheat, Stage::Off))
    );

    // Recovery clears the fault but never restarts the run.
    rig.hw.set_celsius(30.0);
    rig.run(5, STEP_MS);
    assert_eq!(rig.service.fault_flags(), 0);
    assert_eq!(rig.service.stage(), Stage::Off);
    assert!(rig.sink.events.contains(&AppEvent::FaultCleared));
    assert!(rig.service.run_summary().is_none());
}

#[test]
fn failed_adc_reads_count_as_rejections() {
    let mut rig = started_rig();
    rig.hw.raw_adc = None;
    rig.run(5, STEP_MS);
    assert!(SafetyFault::SensorFault.is_set(rig.service.fault_flags()));
    assert_eq!(rig.service.stage(), Stage::Off);
}

#[test]
fn over_temperature_aborts_run() {
    let mut rig = started_rig();
    rig.run(5, STEP_MS);

    rig.hw.set_celsius(262.0);
    rig.tick(STEP_MS);

    assert_eq!(rig.service.stage(), Stage::Off);
    assert!(SafetyFault::OverTemperature.is_set(rig.service.fault_flags()));
    assert_eq!(rig.hw.heaters(), (false, false));
    assert!(!rig.service.status().heaters.any_on());
}

#[test]
fn heaters_stay_off_while_faulted() {
    let mut rig = Rig::new(fast_config(), 265.0);
    rig.run(30, STEP_MS);
    assert!(rig.service.fault_flags() != 0);
    assert!(!rig.hw.any_heater_call_on());
}

// ── Heater slicing ────────────────────────────────────────────

#[test]
fn preheat_slices_bottom_heater_only() {
    let mut rig = started_rig();
    // Power 0 top, 5 bottom below 40 C.
    let before = rig.hw.calls.len();
    rig.run(100, 10);
    let heater_calls: Vec<(bool, bool)> = rig.hw.calls[before..]
        .iter()
        .filter_map(|c| match *c {
            ActuatorCall::Heaters { top, bottom } => Some((top, bottom)),
            _ => None,
        })
        .collect();

    assert_eq!(heater_calls.len(), 100);
    assert!(heater_calls.iter().all(|&(top, _)| !top));
    let on = heater_calls.iter().filter(|&&(_, bottom)| bottom).count();
    assert!((80..=88).contains(&on), "bottom on for {on} of 100 ticks");
}

// ── Queries ───────────────────────────────────────────────────

#[test]
fn status_reflects_running_stage() {
    let mut rig = started_rig();
    rig.run(20, STEP_MS);

    let s = rig.service.status();
    assert_eq!(s.stage, Stage::Preheat);
    assert_eq!(s.substage, 1);
    assert_eq!(s.heaters.top, 0);
    assert_eq!(s.heaters.bottom, 5);
    assert_eq!(s.elapsed_secs, 2);
    assert_eq!(s.fault_flags, 0);
    assert!(!s.alarm_active);
}

#[test]
fn temperature_events_follow_each_window() {
    let mut rig = Rig::new(fast_config(), 20.0);
    rig.run(10, STEP_MS);
    let updates = rig
        .sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::TemperatureUpdated(_)))
        .count();
    assert_eq!(updates, 10);
    assert_eq!(rig.service.tick_count(), 10);
}

#[test]
fn default_window_publishes_every_hundred_ticks() {
    let mut rig = Rig::new(OvenConfig::default(), 20.0);
    let updates = |rig: &Rig| {
        rig.sink
            .events
            .iter()
            .filter(|e| matches!(e, AppEvent::TemperatureUpdated(_)))
            .count()
    };

    rig.run(99, STEP_MS);
    assert_eq!(updates(&rig), 0);
    assert!(rig.service.temperature().is_none());

    rig.tick(STEP_MS);
    assert_eq!(updates(&rig), 1);
    let t = rig.service.status().temperature_c.expect("first window closed");
    assert!((t - 20.0).abs() < 0.5, "read {t}");

    rig.run(99, STEP_MS);
    assert_eq!(updates(&rig), 1);
    rig.tick(STEP_MS);
    assert_eq!(updates(&rig), 2);
    assert_eq!(rig.service.tick_count(), 200);
}

#[test]
fn shutdown_forces_outputs_off() {
    let mut rig = started_rig();
    rig.run(10, STEP_MS);
    rig.service.shutdown(&mut rig.hw);

    assert_eq!(rig.service.stage(), Stage::Off);
    assert_eq!(rig.hw.calls.last(), Some(&ActuatorCall::AllOff));
    assert_eq!(rig.hw.heaters(), (false, false));
}
