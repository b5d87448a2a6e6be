//! Display adapters.
//!
//! [`PanelDisplay`] draws the panels onto any `embedded-graphics`
//! [`DrawTarget`] with RGB565 colour, normally the ILI9341 TFT.
//! [`LogDisplay`] logs each panel redraw under the `Screen` target and is
//! used on boards without a panel fitted and in simulation; its text
//! matches what the TFT would show.

use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_10X20};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::pixelcolor::raw::RawU16;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, PrimitiveStyle, PrimitiveStyleBuilder, Rectangle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use log::{info, warn};

use crate::display::{
    COLOUR_ALARM_DOOR_BG, COLOUR_ALARM_DOOR_FG, COLOUR_BACKGROUND, COLOUR_STAT_BG,
    COLOUR_STAT_BORDER, COLOUR_STAT_FG, COLOUR_TEMP_BG, COLOUR_TEMP_BORDER, DisplayPort, HEIGHT,
    WIDTH,
};

const FOOTER: &str = "Reflow oven";

const PANEL_X: i32 = 10;
const PANEL_HEIGHT: u32 = 50;
const TEMP_PANEL_Y: i32 = 10;
const STATUS_PANEL_Y: i32 = 70;
/// Text sits this far below the top edge of its panel.
const PANEL_TEXT_OFFSET: i32 = 15;
const DOT_INSET: i32 = 35;
const DOT_DIAMETER: u32 = 21;

/// Door overlay: inset 10 px at the sides, 50 px top and bottom.
const ALARM_Y: i32 = 50;

const fn width() -> i32 {
    WIDTH as i32
}

const fn height() -> i32 {
    HEIGHT as i32
}

/// Palette constant to `embedded-graphics` colour.
pub fn rgb565(raw: u16) -> Rgb565 {
    Rgb565::from(RawU16::new(raw))
}

// ── Panel ─────────────────────────────────────────────────────

pub struct PanelDisplay<D> {
    target: D,
    draw_errors: u32,
}

impl<D: DrawTarget<Color = Rgb565>> PanelDisplay<D> {
    pub fn new(target: D) -> Self {
        Self {
            target,
            draw_errors: 0,
        }
    }

    /// Redraws that failed on the bus since boot.
    pub fn draw_errors(&self) -> u32 {
        self.draw_errors
    }

    pub fn target(&self) -> &D {
        &self.target
    }

    fn record(&mut self, what: &str, result: Result<(), D::Error>) {
        if result.is_err() {
            self.draw_errors = self.draw_errors.wrapping_add(1);
            warn!(target: "Screen", "{what} redraw failed ({} total)", self.draw_errors);
        }
    }

    fn panel(&mut self, y: i32, fill: u16, border: u16) -> Result<(), D::Error> {
        let style = PrimitiveStyleBuilder::new()
            .fill_color(rgb565(fill))
            .stroke_color(rgb565(border))
            .stroke_width(1)
            .build();
        Rectangle::new(
            Point::new(PANEL_X, y),
            Size::new((width() - 2 * PANEL_X) as u32, PANEL_HEIGHT),
        )
        .into_styled(style)
        .draw(&mut self.target)
    }

    fn centred(
        &mut self,
        text: &str,
        y: i32,
        font: &MonoFont<'_>,
        fg: u16,
        bg: u16,
    ) -> Result<(), D::Error> {
        let style = MonoTextStyleBuilder::new()
            .font(font)
            .text_color(rgb565(fg))
            .background_color(rgb565(bg))
            .build();
        let layout = TextStyleBuilder::new()
            .alignment(Alignment::Center)
            .baseline(Baseline::Top)
            .build();
        Text::with_text_style(text, Point::new(width() / 2, y), style, layout)
            .draw(&mut self.target)?;
        Ok(())
    }

    fn try_clear(&mut self) -> Result<(), D::Error> {
        self.target.clear(rgb565(COLOUR_BACKGROUND))?;
        let footer = MonoTextStyle::new(&FONT_6X10, Rgb565::WHITE);
        Text::with_baseline(FOOTER, Point::new(5, height() - 20), footer, Baseline::Top)
            .draw(&mut self.target)?;
        Ok(())
    }

    fn try_temperature(&mut self, text: &str, colour: u16) -> Result<(), D::Error> {
        self.panel(TEMP_PANEL_Y, COLOUR_TEMP_BG, COLOUR_TEMP_BORDER)?;
        self.centred(
            text,
            TEMP_PANEL_Y + PANEL_TEXT_OFFSET,
            &FONT_10X20,
            colour,
            COLOUR_TEMP_BG,
        )?;
        let dot = PrimitiveStyle::with_fill(rgb565(colour));
        let dot_y = TEMP_PANEL_Y + PANEL_HEIGHT as i32 / 2;
        for x in [DOT_INSET, width() - DOT_INSET] {
            Circle::with_center(Point::new(x, dot_y), DOT_DIAMETER)
                .into_styled(dot)
                .draw(&mut self.target)?;
        }
        Ok(())
    }

    fn try_status(&mut self, text: &str) -> Result<(), D::Error> {
        self.panel(STATUS_PANEL_Y, COLOUR_STAT_BG, COLOUR_STAT_BORDER)?;
        self.centred(
            text,
            STATUS_PANEL_Y + PANEL_TEXT_OFFSET,
            &FONT_10X20,
            COLOUR_STAT_FG,
            COLOUR_STAT_BG,
        )
    }

    fn try_door_alarm(&mut self) -> Result<(), D::Error> {
        Rectangle::new(
            Point::new(PANEL_X, ALARM_Y),
            Size::new(
                (width() - 2 * PANEL_X) as u32,
                (height() - 2 * ALARM_Y) as u32,
            ),
        )
        .into_styled(PrimitiveStyle::with_fill(rgb565(COLOUR_ALARM_DOOR_BG)))
        .draw(&mut self.target)?;
        self.centred(
            "OPEN DOOR!",
            height() / 2 - 20,
            &FONT_10X20,
            COLOUR_ALARM_DOOR_FG,
            COLOUR_ALARM_DOOR_BG,
        )
    }
}

impl<D: DrawTarget<Color = Rgb565>> DisplayPort for PanelDisplay<D> {
    fn clear(&mut self) {
        let r = self.try_clear();
        self.record("clear", r);
    }

    fn draw_temperature(&mut self, text: &str, colour: u16) {
        let r = self.try_temperature(text, colour);
        self.record("temperature", r);
    }

    fn draw_status(&mut self, text: &str) {
        let r = self.try_status(text);
        self.record("status", r);
    }

    fn draw_door_alarm(&mut self) {
        let r = self.try_door_alarm();
        self.record("door alarm", r);
    }
}

// ── Serial console ────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct LogDisplay {
    frames: u32,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Panel draws since boot.
    pub fn frames(&self) -> u32 {
        self.frames
    }
}

impl DisplayPort for LogDisplay {
    fn clear(&mut self) {
        info!(target: "Screen", "Reset!");
    }

    fn draw_temperature(&mut self, text: &str, colour: u16) {
        self.frames = self.frames.wrapping_add(1);
        info!(target: "Screen", "[{colour:04X}] {text}");
    }

    fn draw_status(&mut self, text: &str) {
        self.frames = self.frames.wrapping_add(1);
        info!(target: "Screen", "{text}");
    }

    fn draw_door_alarm(&mut self) {
        self.frames = self.frames.wrapping_add(1);
        info!(target: "Screen", "OPEN DOOR!");
    }
}
