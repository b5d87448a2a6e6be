//! Fuzz target: OvenService under arbitrary inputs
//!
//! Each input byte drives one control tick: ADC count, button, door and
//! tick length all come from the fuzzer. Verifies:
//! - No panics from any input sequence
//! - Heater relays are only ever energised in a heating stage
//! - Heater relays are never energised while a safety fault is active
//!
//! cargo fuzz run fuzz_oven_inputs

#![no_main]

use std::cell::Cell;

use libfuzzer_sys::fuzz_target;
use reflow::app::events::AppEvent;
use reflow::app::ports::{ActuatorPort, ClockPort, EventSink, SensorPort};
use reflow::app::service::OvenService;
use reflow::config::OvenConfig;
use reflow::fsm::context::InputSnapshot;

struct Clock(Cell<u64>);

impl ClockPort for Clock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &AppEvent) {}
}

#[derive(Default)]
struct Oven {
    inputs: InputSnapshot,
    top: bool,
    bottom: bool,
}

impl SensorPort for Oven {
    fn read_inputs(&mut self) -> InputSnapshot {
        self.inputs
    }
}

impl ActuatorPort for Oven {
    fn set_heaters(&mut self, top_on: bool, bottom_on: bool) {
        self.top = top_on;
        self.bottom = bottom_on;
    }

    fn set_buzzer(&mut self, _on: bool) {}

    fn all_off(&mut self) {
        self.top = false;
        self.bottom = false;
    }
}

fuzz_target!(|data: &[u8]| {
    let config = OvenConfig {
        sample_window: 2,
        sensor_fault_limit: 3,
        button_hold_ms: 300,
        ..OvenConfig::default()
    };
    let mut service = OvenService::new(config);
    let clock = Clock(Cell::new(0));
    let mut sink = NullSink;
    let mut oven = Oven::default();
    service.start(&clock, &mut sink);

    for &b in data {
        // Upper six bits pick a count across the whole ADC range.
        let raw = u16::from(b >> 2) * 65;
        oven.inputs = InputSnapshot {
            raw_adc: if b == 0xFF { None } else { Some(raw) },
            button_pressed: b & 0b01 != 0,
            door_open: b & 0b10 != 0,
        };
        clock.0.set(clock.0.get() + u64::from(b % 7 + 1) * 50);
        service.tick(&mut oven, &clock, &mut sink);

        if oven.top || oven.bottom {
            assert!(service.stage().is_heating(), "relay on in {}", service.stage());
            assert_eq!(service.fault_flags(), 0, "relay on while faulted");
        }
    }
});
