//! HardwareAdapter over embedded-hal mock pins: polarity, input mapping,
//! write-failure accounting and a short run through the service.

use std::cell::Cell;
use std::rc::Rc;

use reflow::adapters::hardware::{HardwareAdapter, OvenOutputs};
use reflow::app::ports::{ActuatorPort, SensorPort};
use reflow::app::service::OvenService;
use reflow::error::SafetyFault;
use reflow::fsm::Stage;

use crate::mock_hw::{
    fast_config, raw_for_celsius, Level, ManualClock, MockAdc, MockInputPin, MockOutputPin,
    RecordingSink,
};

type Adapter = HardwareAdapter<MockAdc, MockInputPin, MockOutputPin>;

/// Handles onto every pin after the adapter has taken ownership.
#[derive(Default)]
struct Board {
    raw: Rc<Cell<Option<u16>>>,
    button: Level,
    door: Level,
    top: Level,
    bottom: Level,
    buzzer: Level,
    top_broken: Level,
}

impl Board {
    fn adapter(&self, relay_inverted: bool) -> Adapter {
        let out = |level: &Level, broken: &Level| MockOutputPin {
            level: Rc::clone(level),
            broken: Rc::clone(broken),
        };
        let outputs = OvenOutputs::new(
            out(&self.top, &self.top_broken),
            out(&self.bottom, &Level::default()),
            out(&self.buzzer, &Level::default()),
            relay_inverted,
        )
        .expect("pins writable");
        HardwareAdapter::new(
            MockAdc {
                raw: Rc::clone(&self.raw),
            },
            MockInputPin {
                level: Rc::clone(&self.button),
            },
            MockInputPin {
                level: Rc::clone(&self.door),
            },
            outputs,
        )
    }
}

// ── Outputs ───────────────────────────────────────────────────

#[test]
fn inverted_relays_idle_high() {
    let board = Board::default();
    let mut hw = board.adapter(true);
    assert!(board.top.get() && board.bottom.get());
    assert!(!board.buzzer.get());

    hw.set_heaters(true, false);
    assert!(!board.top.get(), "inverted relay energises low");
    assert!(board.bottom.get());
    assert_eq!(hw.heaters_on(), (true, false));

    hw.set_buzzer(true);
    assert!(board.buzzer.get());
    assert!(hw.buzzer_on());
}

#[test]
fn direct_relays_energise_high() {
    let board = Board::default();
    let mut hw = board.adapter(false);
    assert!(!board.top.get() && !board.bottom.get());

    hw.set_heaters(false, true);
    assert!(!board.top.get());
    assert!(board.bottom.get());
}

#[test]
fn all_off_releases_everything() {
    let board = Board::default();
    let mut hw = board.adapter(true);
    hw.set_heaters(true, true);
    hw.set_buzzer(true);

    hw.all_off();
    assert_eq!(hw.heaters_on(), (false, false));
    assert!(!hw.buzzer_on());
    assert!(board.top.get() && board.bottom.get());
    assert!(!board.buzzer.get());
}

#[test]
fn failed_writes_are_counted_not_fatal() {
    let board = Board::default();
    let mut hw = board.adapter(true);
    board.top_broken.set(true);

    hw.set_heaters(true, true);
    assert_eq!(hw.write_failures(), 1);
    assert_eq!(hw.heaters_on(), (false, true));

    // The write is retried on the next command.
    board.top_broken.set(false);
    hw.set_heaters(true, true);
    assert_eq!(hw.write_failures(), 1);
    assert_eq!(hw.heaters_on(), (true, true));
}

#[test]
fn unwritable_pin_rejected_at_construction() {
    let broken = Level::default();
    broken.set(true);
    let pin = |broken: &Level| MockOutputPin {
        level: Level::default(),
        broken: Rc::clone(broken),
    };
    let res = OvenOutputs::new(pin(&broken), pin(&Level::default()), pin(&Level::default()), true);
    assert!(res.is_err());
}

// ── Inputs ────────────────────────────────────────────────────

#[test]
fn inputs_map_pin_levels() {
    let board = Board::default();
    let mut hw = board.adapter(true);
    board.raw.set(Some(1_234));

    let s = hw.read_inputs();
    assert_eq!(s.raw_adc, Some(1_234));
    assert!(!s.button_pressed);
    assert!(!s.door_open);

    board.button.set(true);
    board.door.set(true);
    let s = hw.read_inputs();
    assert!(s.button_pressed);
    assert!(s.door_open, "door switch reads high when open");
}

#[test]
fn adc_failure_reads_as_missing_sample() {
    let board = Board::default();
    let mut hw = board.adapter(true);
    assert_eq!(hw.read_inputs().raw_adc, None);
}

// ── Through the service ───────────────────────────────────────

#[test]
fn service_drives_real_pins() {
    let board = Board::default();
    let mut hw = board.adapter(true);
    let clock = ManualClock::default();
    let mut sink = RecordingSink::new();
    let mut service = OvenService::new(fast_config());
    service.start(&clock, &mut sink);

    board.raw.set(Some(raw_for_celsius(25.0)));
    board.button.set(true);
    for _ in 0..31 {
        clock.advance(100);
        service.tick(&mut hw, &clock, &mut sink);
    }
    assert_eq!(service.stage(), Stage::Preheat);
    board.button.set(false);

    // First slice of a cycle: bottom heater (power 5) on, top (power 0) off.
    let mut saw_bottom_on = false;
    for _ in 0..10 {
        clock.advance(100);
        service.tick(&mut hw, &clock, &mut sink);
        saw_bottom_on |= !board.bottom.get();
        assert!(board.top.get(), "top heater stays off below 40 C");
    }
    assert!(saw_bottom_on);

    // Unplugged ADC: the run aborts and both relays drop.
    board.raw.set(None);
    for _ in 0..5 {
        clock.advance(100);
        service.tick(&mut hw, &clock, &mut sink);
    }
    assert_eq!(service.stage(), Stage::Off);
    assert!(SafetyFault::SensorFault.is_set(service.fault_flags()));
    assert!(board.top.get() && board.bottom.get());
    assert_eq!(hw.write_failures(), 0);
}
