use core::fmt::Debug;

use embedded_graphics::mono_font::MonoFont;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_10X20};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use log::error;

use super::{DisplayError, Palette, TextSurface};

/// Pick the monospace font closest to a character-display text scale.
pub const fn font_for_size(text_size: u8) -> &'static MonoFont<'static> {
    match text_size {
        0 | 1 => &FONT_6X10,
        _ => &FONT_10X20,
    }
}

/// [`TextSurface`] over any embedded-graphics draw target.
///
/// Keeps a cursor and a text color the way a character display does, and
/// draws with the monospace font matching the configured text size.
pub struct GraphicsSurface<D> {
    target: D,
    cursor: Point,
    color: Rgb565,
    font: &'static MonoFont<'static>,
}

impl<D> GraphicsSurface<D>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: Debug,
{
    pub fn new(target: D) -> Self {
        Self {
            target,
            cursor: Point::zero(),
            color: Palette::default().foreground,
            font: font_for_size(1),
        }
    }

    pub fn target(&self) -> &D {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut D {
        &mut self.target
    }

    pub fn cursor(&self) -> Point {
        self.cursor
    }
}

impl<D> TextSurface for GraphicsSurface<D>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: Debug,
{
    fn init(&mut self, palette: Palette, text_size: u8) -> Result<(), DisplayError> {
        self.target.clear(palette.background).map_err(|e| {
            error!("Display clear failed: {:?}", e);
            DisplayError::DriverFault { operation: "clear" }
        })?;
        self.color = palette.foreground;
        self.font = font_for_size(text_size);
        self.cursor = Point::zero();
        Ok(())
    }

    fn set_cursor(&mut self, x: i32, y: i32) -> Result<(), DisplayError> {
        self.cursor = Point::new(x, y);
        Ok(())
    }

    fn set_text_color(&mut self, color: Rgb565) -> Result<(), DisplayError> {
        self.color = color;
        Ok(())
    }

    fn print(&mut self, text: &str) -> Result<(), DisplayError> {
        if text.is_empty() {
            return Ok(());
        }

        let style = MonoTextStyle::new(self.font, self.color);
        self.cursor = Text::with_baseline(text, self.cursor, style, Baseline::Top)
            .draw(&mut self.target)
            .map_err(|e| {
                error!("Display text draw failed: {:?}", e);
                DisplayError::DriverFault { operation: "print" }
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::mock_display::MockDisplay;

    #[test]
    fn test_font_selection() {
        assert_eq!(font_for_size(1).character_size, Size::new(6, 10));
        assert_eq!(font_for_size(2).character_size, Size::new(10, 20));
    }

    #[test]
    fn test_print_advances_cursor() {
        let mut display: MockDisplay<Rgb565> = MockDisplay::new();
        display.set_allow_overdraw(true);
        let mut surface = GraphicsSurface::new(display);

        surface.set_cursor(0, 0).unwrap();
        surface.print("12").unwrap();

        assert_eq!(surface.cursor(), Point::new(12, 0));
    }

    #[test]
    fn test_erase_then_draw_leaves_only_new_text() {
        let mut display: MockDisplay<Rgb565> = MockDisplay::new();
        display.set_allow_overdraw(true);
        let mut surface = GraphicsSurface::new(display);
        let palette = Palette::default();

        surface.set_text_color(palette.foreground).unwrap();
        surface.print("8").unwrap();
        surface.set_cursor(0, 0).unwrap();
        surface.set_text_color(palette.background).unwrap();
        surface.print("8").unwrap();

        let lit = surface
            .target()
            .affected_area()
            .points()
            .filter(|p| surface.target().get_pixel(*p) == Some(palette.foreground))
            .count();
        assert_eq!(lit, 0);
    }
}
