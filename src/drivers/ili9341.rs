//! ILI9341 240×320 TFT driver over any `display-interface` bus.
//!
//! Portrait, RGB565, no framebuffer. Every primitive becomes an address
//! window followed by a pixel stream, so a filled panel costs one window.

use display_interface::{DataFormat, DisplayError, WriteOnlyDataCommand};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::pixelcolor::raw::{RawData, RawU16};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_hal::delay::DelayNs;

use crate::display::{HEIGHT, WIDTH};

const SWRESET: u8 = 0x01;
const SLPOUT: u8 = 0x11;
const DISPON: u8 = 0x29;
const CASET: u8 = 0x2A;
const PASET: u8 = 0x2B;
const RAMWR: u8 = 0x2C;
const MADCTL: u8 = 0x36;
const PIXFMT: u8 = 0x3A;

/// Portrait scan order, BGR panel wiring.
const MADCTL_PORTRAIT_BGR: u8 = 0x48;
/// 16 bits per pixel.
const PIXFMT_RGB565: u8 = 0x55;

pub struct Ili9341<DI> {
    interface: DI,
}

impl<DI: WriteOnlyDataCommand> Ili9341<DI> {
    pub fn new(interface: DI) -> Self {
        Self { interface }
    }

    /// Software reset, wake and switch on. Blocks for about 260 ms.
    pub fn init(&mut self, delay: &mut impl DelayNs) -> Result<(), DisplayError> {
        self.command(SWRESET, &[])?;
        delay.delay_ms(120);
        self.command(SLPOUT, &[])?;
        delay.delay_ms(120);
        self.command(PIXFMT, &[PIXFMT_RGB565])?;
        self.command(MADCTL, &[MADCTL_PORTRAIT_BGR])?;
        self.command(DISPON, &[])?;
        delay.delay_ms(20);
        Ok(())
    }

    /// Give the bus back.
    pub fn release(self) -> DI {
        self.interface
    }

    fn command(&mut self, cmd: u8, args: &[u8]) -> Result<(), DisplayError> {
        self.interface.send_commands(DataFormat::U8(&[cmd]))?;
        if !args.is_empty() {
            self.interface.send_data(DataFormat::U8(args))?;
        }
        Ok(())
    }

    /// Open an inclusive address window and start a RAM write.
    /// Both corners must already be on screen.
    fn set_window(&mut self, top_left: Point, bottom_right: Point) -> Result<(), DisplayError> {
        let [x0h, x0l] = (top_left.x as u16).to_be_bytes();
        let [x1h, x1l] = (bottom_right.x as u16).to_be_bytes();
        let [y0h, y0l] = (top_left.y as u16).to_be_bytes();
        let [y1h, y1l] = (bottom_right.y as u16).to_be_bytes();
        self.command(CASET, &[x0h, x0l, x1h, x1l])?;
        self.command(PASET, &[y0h, y0l, y1h, y1l])?;
        self.command(RAMWR, &[])
    }

    fn stream(&mut self, colours: impl Iterator<Item = Rgb565>) -> Result<(), DisplayError> {
        let mut raw = colours.map(|c| RawU16::from(c).into_inner());
        self.interface.send_data(DataFormat::U16BEIter(&mut raw))
    }
}

impl<DI> OriginDimensions for Ili9341<DI> {
    fn size(&self) -> Size {
        Size::new(u32::from(WIDTH), u32::from(HEIGHT))
    }
}

impl<DI: WriteOnlyDataCommand> DrawTarget for Ili9341<DI> {
    type Color = Rgb565;
    type Error = DisplayError;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let bounds = self.bounding_box();
        for Pixel(point, colour) in pixels {
            if bounds.contains(point) {
                self.set_window(point, point)?;
                self.stream(core::iter::once(colour))?;
            }
        }
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        let visible = area.intersection(&self.bounding_box());
        match area.bottom_right() {
            Some(bottom_right) if visible == *area => {
                let count = area.size.width as usize * area.size.height as usize;
                self.set_window(area.top_left, bottom_right)?;
                self.stream(colors.into_iter().take(count))
            }
            // Partly off screen: fall back to clipped single pixels.
            Some(_) => self.draw_iter(
                area.points()
                    .zip(colors)
                    .map(|(point, colour)| Pixel(point, colour)),
            ),
            None => Ok(()),
        }
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        let Some(bottom_right) = area.bottom_right() else {
            return Ok(());
        };
        let count = area.size.width as usize * area.size.height as usize;
        self.set_window(area.top_left, bottom_right)?;
        self.stream(core::iter::repeat(color).take(count))
    }
}
