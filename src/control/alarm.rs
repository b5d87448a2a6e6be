//! Door alarm gating and beeper cadence.
//!
//! The alarm is active while the stage controller has the door prompt
//! enabled and the door switch reads open. The beeper sounds for the
//! first `cycle_ms` of every `2 × cycle_ms` period while the alarm is
//! active.

/// Alarm state for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlarmOutput {
    /// Door alarm overlay should be shown.
    pub active: bool,
    /// Buzzer level.
    pub beeper_on: bool,
}

pub struct DoorAlarm {
    cycle_ms: u32,
    beep_cycle_start_ms: u64,
    was_active: bool,
}

impl DoorAlarm {
    pub fn new(cycle_ms: u32) -> Self {
        Self {
            cycle_ms: cycle_ms.max(1),
            beep_cycle_start_ms: 0,
            was_active: false,
        }
    }

    pub fn update(&mut self, enabled: bool, door_open: bool, now_ms: u64) -> AlarmOutput {
        let active = enabled && door_open;
        if !active {
            self.was_active = false;
            return AlarmOutput::default();
        }
        // Each activation starts with a beep.
        if !self.was_active {
            self.beep_cycle_start_ms = now_ms;
            self.was_active = true;
        }

        let cycle = u64::from(self.cycle_ms);
        let mut elapsed = now_ms.saturating_sub(self.beep_cycle_start_ms);
        if elapsed >= 2 * cycle {
            self.beep_cycle_start_ms = now_ms;
            elapsed = 0;
        }
        AlarmOutput {
            active,
            beeper_on: elapsed < cycle,
        }
    }
}
