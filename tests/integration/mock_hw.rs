//! Mock hardware for integration tests.
//!
//! `MockOven` stands in for the thermistor, button, door switch, relays and
//! buzzer. Tests set the oven temperature in Celsius; the mock converts it
//! to the raw ADC count the real divider would produce. Every actuator
//! call is recorded so tests can assert on the full output history.

use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use reflow::app::events::AppEvent;
use reflow::app::ports::{ActuatorPort, ClockPort, EventSink, SensorPort};
use reflow::config::{OvenConfig, ThermistorConfig};
use reflow::error::SensorError;
use reflow::fsm::context::InputSnapshot;
use reflow::sensors::AdcChannel;
use reflow::sensors::temperature::Thermistor;

// ── Temperature → ADC count ───────────────────────────────────

/// Smallest raw count whose conversion reads at least `celsius`.
/// The divider puts the thermistor on the high side, so temperature
/// rises with the count and a bisection is enough.
pub fn raw_for_celsius(celsius: f32) -> u16 {
    let therm = Thermistor::new(ThermistorConfig::default());
    let reads = |raw: u16| therm.kelvin(raw).map(|k| k.celsius()).unwrap_or(f32::NAN);
    let (mut lo, mut hi) = (64u16, 4_084u16);
    assert!(reads(lo) < celsius && reads(hi) >= celsius, "{celsius} C out of range");
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if reads(mid) >= celsius {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    hi
}

/// Default config with a one-sample window so every tick publishes.
pub fn fast_config() -> OvenConfig {
    OvenConfig {
        sample_window: 1,
        sensor_fault_limit: 5,
        ..OvenConfig::default()
    }
}

// ── MockOven ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Heaters { top: bool, bottom: bool },
    Buzzer(bool),
    AllOff,
}

pub struct MockOven {
    pub raw_adc: Option<u16>,
    pub button_pressed: bool,
    pub door_open: bool,
    pub calls: Vec<ActuatorCall>,
}

#[allow(dead_code)]
impl MockOven {
    pub fn new(celsius: f32) -> Self {
        Self {
            raw_adc: Some(raw_for_celsius(celsius)),
            button_pressed: false,
            door_open: false,
            calls: Vec::new(),
        }
    }

    pub fn set_celsius(&mut self, celsius: f32) {
        self.raw_adc = Some(raw_for_celsius(celsius));
    }

    pub fn heaters(&self) -> (bool, bool) {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match *c {
                ActuatorCall::Heaters { top, bottom } => Some((top, bottom)),
                ActuatorCall::AllOff => Some((false, false)),
                ActuatorCall::Buzzer(_) => None,
            })
            .unwrap_or((false, false))
    }

    pub fn buzzer(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match *c {
                ActuatorCall::Buzzer(on) => Some(on),
                ActuatorCall::AllOff => Some(false),
                ActuatorCall::Heaters { .. } => None,
            })
            .unwrap_or(false)
    }

    pub fn any_heater_call_on(&self) -> bool {
        self.calls.iter().any(|c| {
            matches!(
                c,
                ActuatorCall::Heaters { top: true, .. } | ActuatorCall::Heaters { bottom: true, .. }
            )
        })
    }
}

impl SensorPort for MockOven {
    fn read_inputs(&mut self) -> InputSnapshot {
        InputSnapshot {
            raw_adc: self.raw_adc,
            button_pressed: self.button_pressed,
            door_open: self.door_open,
        }
    }
}

impl ActuatorPort for MockOven {
    fn set_heaters(&mut self, top_on: bool, bottom_on: bool) {
        self.calls.push(ActuatorCall::Heaters {
            top: top_on,
            bottom: bottom_on,
        });
    }

    fn set_buzzer(&mut self, on: bool) {
        self.calls.push(ActuatorCall::Buzzer(on));
    }

    fn all_off(&mut self) {
        self.calls.push(ActuatorCall::AllOff);
    }
}

// ── Clock ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn at(ms: u64) -> Self {
        Self { now: Cell::new(ms) }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl ClockPort for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage_changes(&self) -> Vec<(reflow::fsm::Stage, reflow::fsm::Stage)> {
        self.events
            .iter()
            .filter_map(|e| match *e {
                AppEvent::StageChanged { from, to } => Some((from, to)),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── embedded-hal pins and ADC ─────────────────────────────────

/// Shared level so a test can watch or drive a pin after handing it over.
pub type Level = Rc<Cell<bool>>;

/// Output pin that mirrors its level into a shared cell. While `broken`
/// is set every write fails.
#[derive(Debug, Default)]
pub struct MockOutputPin {
    pub level: Level,
    pub broken: Level,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinFault;

impl embedded_hal::digital::Error for PinFault {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

impl ErrorType for MockOutputPin {
    type Error = PinFault;
}

impl OutputPin for MockOutputPin {
    fn set_low(&mut self) -> Result<(), PinFault> {
        if self.broken.get() {
            return Err(PinFault);
        }
        self.level.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), PinFault> {
        if self.broken.get() {
            return Err(PinFault);
        }
        self.level.set(true);
        Ok(())
    }
}

/// Input pin reading a shared level.
#[derive(Debug, Default)]
pub struct MockInputPin {
    pub level: Level,
}

impl ErrorType for MockInputPin {
    type Error = Infallible;
}

impl InputPin for MockInputPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.level.get())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.level.get())
    }
}

/// ADC channel returning a shared count; `None` reads as a failed conversion.
#[derive(Debug, Default)]
pub struct MockAdc {
    pub raw: Rc<Cell<Option<u16>>>,
}

impl AdcChannel for MockAdc {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        self.raw.get().ok_or(SensorError::AdcReadFailed)
    }
}

// ── Test rig ──────────────────────────────────────────────────

/// Service plus mocks, advanced a fixed step per tick.
pub struct Rig {
    pub service: reflow::app::service::OvenService,
    pub hw: MockOven,
    pub clock: ManualClock,
    pub sink: RecordingSink,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(config: OvenConfig, celsius: f32) -> Self {
        let mut rig = Self {
            service: reflow::app::service::OvenService::new(config),
            hw: MockOven::new(celsius),
            clock: ManualClock::default(),
            sink: RecordingSink::new(),
        };
        rig.service.start(&rig.clock, &mut rig.sink);
        rig
    }

    pub fn tick(&mut self, step_ms: u64) {
        self.clock.advance(step_ms);
        self.service.tick(&mut self.hw, &self.clock, &mut self.sink);
    }

    /// Tick `n` times at `step_ms`.
    pub fn run(&mut self, n: usize, step_ms: u64) {
        for _ in 0..n {
            self.tick(step_ms);
        }
    }

    /// Hold the button until the run starts (or `max_ms` passes), then
    /// release it.
    pub fn hold_to_start(&mut self, step_ms: u64, max_ms: u64) {
        self.hw.button_pressed = true;
        let mut waited = 0;
        while self.service.stage() != reflow::fsm::Stage::Preheat && waited < max_ms {
            self.tick(step_ms);
            waited += step_ms;
        }
        self.hw.button_pressed = false;
    }
}
