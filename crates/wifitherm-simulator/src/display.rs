use embedded_graphics::pixelcolor::Rgb565;
use wifitherm_core::display::{DisplayError, Palette, TextSurface};

/// Shows the panel contents on stdout.
///
/// Text printed in the background color is the presenter erasing the old
/// values, so only foreground text is written out.
pub struct ConsoleSurface {
    palette: Palette,
    color: Rgb565,
}

impl ConsoleSurface {
    pub fn new() -> Self {
        let palette = Palette::default();
        Self {
            palette,
            color: palette.foreground,
        }
    }
}

impl TextSurface for ConsoleSurface {
    fn init(&mut self, palette: Palette, text_size: u8) -> Result<(), DisplayError> {
        self.palette = palette;
        self.color = palette.foreground;
        log::debug!("Console display ready (text size {})", text_size);
        Ok(())
    }

    fn set_cursor(&mut self, _x: i32, _y: i32) -> Result<(), DisplayError> {
        Ok(())
    }

    fn set_text_color(&mut self, color: Rgb565) -> Result<(), DisplayError> {
        self.color = color;
        Ok(())
    }

    fn print(&mut self, text: &str) -> Result<(), DisplayError> {
        if self.color == self.palette.background || text.is_empty() {
            return Ok(());
        }
        println!("+--------+");
        for line in text.lines() {
            println!("| {line:>6} |");
        }
        println!("+--------+");
        Ok(())
    }
}
