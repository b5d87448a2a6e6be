//! Display shell: turns a [`StatusSnapshot`] into panel redraws.
//!
//! The screen has three regions: a temperature panel with two indicator
//! dots, a status panel with the stage label, and a full-screen door
//! alarm overlay. Panels are redrawn on their own cadence or all at once
//! after a reset; the overlay is drawn after any panel update while the
//! alarm is active, and its disappearance triggers a full reset so the
//! panels it covered are repainted.
//!
//! The scheduler only decides *what* to draw. A [`DisplayPort`] adapter
//! decides *how*: on the panel through `embedded-graphics`, or as log
//! lines on boards without one.

use core::fmt::Write;

use heapless::String;
use log::debug;

use crate::app::events::StatusSnapshot;
use crate::fsm::context::HeaterCommands;
use crate::fsm::Stage;
use crate::ota::OtaStatus;

pub const WIDTH: u16 = 240;
pub const HEIGHT: u16 = 320;

// ── RGB565 palette ────────────────────────────────────────────

pub const COLOUR_BACKGROUND: u16 = 0x31A6;
pub const COLOUR_TEMP_BG: u16 = 0xC638;
pub const COLOUR_TEMP_BORDER: u16 = 0xC945;
/// Temperature text and dots while the oven is off.
pub const COLOUR_TEMP_OFF: u16 = 0xC945;
/// Running with both heaters at power 0.
pub const COLOUR_TEMP_COASTING: u16 = 0x1E03;
/// Running with at least one heater powered.
pub const COLOUR_TEMP_HEATING: u16 = 0x2BF9;
pub const COLOUR_ALARM_DOOR_BG: u16 = 0xF481;
pub const COLOUR_ALARM_DOOR_FG: u16 = COLOUR_BACKGROUND;
pub const COLOUR_STAT_BG: u16 = 0xC638;
pub const COLOUR_STAT_BORDER: u16 = 0xC945;
pub const COLOUR_STAT_FG: u16 = 0xC945;

/// Panel text buffer.
pub type Label = String<24>;

/// Rendering surface.
pub trait DisplayPort {
    /// Fill the whole screen with the background and draw the footer.
    fn clear(&mut self);
    fn draw_temperature(&mut self, text: &str, colour: u16);
    fn draw_status(&mut self, text: &str);
    fn draw_door_alarm(&mut self);
}

/// "Off", "Hold", or the stage name followed by its sub-stage.
pub fn stage_label(stage: Stage, substage: u8) -> Label {
    let mut s = Label::new();
    // 24 bytes always fit the longest label ("Cooldown 255").
    let _ = match stage {
        Stage::Off | Stage::Hold => s.push_str(stage.name()).map_err(|_| core::fmt::Error),
        _ => write!(s, "{} {}", stage.name(), substage),
    };
    s
}

/// Colour of the temperature text and indicator dots.
pub fn indicator_colour(stage: Stage, heaters: HeaterCommands) -> u16 {
    if stage == Stage::Off {
        COLOUR_TEMP_OFF
    } else if heaters.any_on() {
        COLOUR_TEMP_HEATING
    } else {
        COLOUR_TEMP_COASTING
    }
}

/// Temperature panel text, two decimals.
pub fn temperature_label(celsius: Option<f32>) -> Label {
    let mut s = Label::new();
    let _ = match celsius {
        Some(c) => write!(s, "{c:.2} C"),
        None => write!(s, "--- C"),
    };
    s
}

fn status_text(status: &StatusSnapshot, ota: OtaStatus) -> Label {
    if ota.in_progress {
        let mut s = Label::new();
        let _ = write!(s, "Updating {}%", ota.progress);
        s
    } else {
        stage_label(status.stage, status.substage)
    }
}

/// Decides which panels to redraw each loop iteration.
pub struct DisplayScheduler {
    temp_period_ms: u64,
    status_period_ms: u64,
    last_temp_ms: u64,
    last_status_ms: u64,
    reset_pending: bool,
    overlay_shown: bool,
}

impl DisplayScheduler {
    /// A new scheduler starts with a reset pending so the first render
    /// paints every panel.
    pub fn new(temp_period_ms: u32, status_period_ms: u32, now_ms: u64) -> Self {
        Self {
            temp_period_ms: u64::from(temp_period_ms),
            status_period_ms: u64::from(status_period_ms),
            last_temp_ms: now_ms,
            last_status_ms: now_ms,
            reset_pending: true,
            overlay_shown: false,
        }
    }

    /// Request a full repaint on the next render.
    pub fn request_reset(&mut self, port: &mut (impl DisplayPort + ?Sized)) {
        debug!(target: "Screen", "Reset!");
        port.clear();
        self.reset_pending = true;
    }

    pub fn overlay_shown(&self) -> bool {
        self.overlay_shown
    }

    /// Redraw whatever is due. Returns `true` if any panel was drawn.
    pub fn render(
        &mut self,
        now_ms: u64,
        status: &StatusSnapshot,
        ota: OtaStatus,
        port: &mut (impl DisplayPort + ?Sized),
    ) -> bool {
        if self.overlay_shown && !status.alarm_active {
            self.overlay_shown = false;
            self.request_reset(port);
        }

        let mut updated = false;
        if self.reset_pending || now_ms.saturating_sub(self.last_temp_ms) >= self.temp_period_ms {
            let text = temperature_label(status.temperature_c);
            port.draw_temperature(&text, indicator_colour(status.stage, status.heaters));
            self.last_temp_ms = now_ms;
            updated = true;
        }
        if self.reset_pending
            || now_ms.saturating_sub(self.last_status_ms) >= self.status_period_ms
        {
            port.draw_status(&status_text(status, ota));
            self.last_status_ms = now_ms;
            updated = true;
        }
        if updated && status.alarm_active {
            port.draw_door_alarm();
            self.overlay_shown = true;
        }
        self.reset_pending = false;
        updated
    }
}
