//! Time-sliced heater PWM.
//!
//! Solid-state relays on a resistive heater do not need real PWM; a slow
//! cycle split into six equal slices is enough. Power level `p` (0–6)
//! switches the relay on for the first `p` slices of every cycle:
//!
//! ```text
//!  slice   1     2     3     4     5     6
//!        ├─────┼─────┼─────┼─────┼─────┼─────┤
//!  p = 0 │     │     │     │     │     │     │
//!  p = 3 │█████│█████│█████│     │     │     │
//!  p = 6 │█████│█████│█████│█████│█████│█████│
//!        0    166   333   500   666   833  1000 ms
//! ```

use crate::config::{MAX_POWER, PwmConfig};

/// Relay levels for one tick (logical: `true` = heater energised).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayOutputs {
    pub top: bool,
    pub bottom: bool,
}

/// 1-based slice containing `elapsed_ms` within a cycle. Elapsed values
/// past the last breakpoint fall into the last slice.
pub fn slice_index(slice_ends_ms: &[u32; MAX_POWER as usize], elapsed_ms: u32) -> u8 {
    slice_ends_ms
        .iter()
        .position(|&end| elapsed_ms < end)
        .map_or(MAX_POWER, |i| i as u8 + 1)
}

/// Whether a heater at `power` is on during `slice` (1-based).
pub fn relay_on(power: u8, slice: u8) -> bool {
    power >= slice
}

/// Free-running slice PWM for both heaters.
pub struct SlicePwm {
    slice_ends_ms: [u32; MAX_POWER as usize],
    cycle_ms: u32,
    cycle_start_ms: u64,
}

impl SlicePwm {
    pub fn new(cfg: &PwmConfig, now_ms: u64) -> Self {
        Self {
            slice_ends_ms: cfg.slice_ends_ms,
            cycle_ms: cfg.cycle_ms(),
            cycle_start_ms: now_ms,
        }
    }

    /// Relay levels for the given power levels at `now_ms`. Starts a new
    /// cycle once the current one has run its full length.
    pub fn tick(&mut self, top: u8, bottom: u8, now_ms: u64) -> RelayOutputs {
        let mut elapsed = now_ms.saturating_sub(self.cycle_start_ms);
        if elapsed >= u64::from(self.cycle_ms) {
            self.cycle_start_ms = now_ms;
            elapsed = 0;
        }
        let slice = slice_index(&self.slice_ends_ms, elapsed as u32);
        RelayOutputs {
            top: relay_on(top, slice),
            bottom: relay_on(bottom, slice),
        }
    }

    pub fn cycle_start_ms(&self) -> u64 {
        self.cycle_start_ms
    }
}
