//! Start button hold timer.
//!
//! The oven starts only after the button has been held continuously for
//! the configured time, so a brushed button never fires the heaters. The
//! monitor is polled once per control tick with the current pin level;
//! any release resets the hold timer.

use log::debug;

use crate::fsm::context::ButtonState;

#[derive(Debug, Default)]
pub struct HoldButton {
    press_start_ms: Option<u64>,
}

impl HoldButton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call from the control loop at each tick.
    pub fn update(&mut self, pressed: bool, now_ms: u64) -> ButtonState {
        if !pressed {
            if self.press_start_ms.take().is_some() {
                debug!(target: "I/O", "Button released");
            }
            return ButtonState::default();
        }
        let start = *self.press_start_ms.get_or_insert_with(|| {
            debug!(target: "I/O", "Button pressed");
            now_ms
        });
        ButtonState {
            pressed: true,
            held_ms: now_ms.saturating_sub(start).min(u64::from(u32::MAX)) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_reports_nothing() {
        let mut b = HoldButton::new();
        assert_eq!(b.update(false, 100), ButtonState::default());
    }

    #[test]
    fn hold_time_accumulates() {
        let mut b = HoldButton::new();
        assert_eq!(b.update(true, 1_000).held_ms, 0);
        assert_eq!(b.update(true, 2_500).held_ms, 1_500);
        let s = b.update(true, 4_000);
        assert!(s.pressed);
        assert_eq!(s.held_ms, 3_000);
    }

    #[test]
    fn release_resets_timer() {
        let mut b = HoldButton::new();
        b.update(true, 0);
        b.update(true, 2_900);
        b.update(false, 2_950);
        assert_eq!(b.update(true, 3_000).held_ms, 0);
        assert_eq!(b.update(true, 4_000).held_ms, 1_000);
    }
}
