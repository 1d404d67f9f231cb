//! Change-gated rendering of the latest reading
//!
//! The panel is driven like a character display: position a cursor, pick a
//! text color, print. There is no partial clear, so [`DisplayPresenter`]
//! erases the previous text by printing it again in the background color
//! before printing the new text in the foreground color. Nothing is drawn
//! unless at least one of the displayed values changed.

mod graphics;

pub use graphics::*;

use alloc::format;
use alloc::string::String;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::RgbColor;
use log::{debug, info};
use thiserror_no_std::Error;

use crate::constants::{HUMIDITY_SENTINEL, TEMPERATURE_SENTINEL, TEXT_SIZE};
use crate::metrics::Reading;

/// Failures reported by the display boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DisplayError {
    #[error("Display driver failed during {operation}")]
    DriverFault { operation: &'static str },
}

/// Two-color palette used for all text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub foreground: Rgb565,
    pub background: Rgb565,
}

impl Default for Palette {
    /// Blue text on black.
    fn default() -> Self {
        Self {
            foreground: Rgb565::BLUE,
            background: Rgb565::BLACK,
        }
    }
}

/// A display that can print text at a cursor.
pub trait TextSurface {
    /// Fill the panel with the background color and select text color and scale.
    fn init(&mut self, palette: Palette, text_size: u8) -> Result<(), DisplayError>;

    fn set_cursor(&mut self, x: i32, y: i32) -> Result<(), DisplayError>;

    fn set_text_color(&mut self, color: Rgb565) -> Result<(), DisplayError>;

    /// Print `text` at the cursor; `\n` starts a new line at the cursor's x origin.
    fn print(&mut self, text: &str) -> Result<(), DisplayError>;
}

/// Format the three displayed values, two decimals each.
pub fn format_reading(reading: &Reading) -> String {
    format!(
        "{:.2}F\n{:.2}\n{:.2}F",
        reading.temperature, reading.humidity, reading.heat_index
    )
}

/// Owns the display and remembers what is currently on it.
pub struct DisplayPresenter<D> {
    surface: D,
    palette: Palette,
    last_text: String,
    last_values: (f32, f32, f32),
}

impl<D: TextSurface> DisplayPresenter<D> {
    pub fn new(surface: D, palette: Palette) -> Self {
        Self {
            surface,
            palette,
            last_text: String::new(),
            last_values: (TEMPERATURE_SENTINEL, HUMIDITY_SENTINEL, 0.0),
        }
    }

    /// Prepare the panel: clear to background, set text color and size.
    pub fn start(&mut self) -> Result<(), DisplayError> {
        self.surface.init(self.palette, TEXT_SIZE)?;
        info!("Display ready (text size {})", TEXT_SIZE);
        Ok(())
    }

    /// Redraw if the reading's values differ from what is on screen.
    ///
    /// Returns `Ok(true)` when the panel was redrawn. Values are compared
    /// exactly, without tolerance. On error the remembered state is left as
    /// it was, so the next call tries again.
    pub fn update(&mut self, reading: &Reading) -> Result<bool, DisplayError> {
        let values = (reading.temperature, reading.humidity, reading.heat_index);
        if values == self.last_values {
            return Ok(false);
        }

        let text = format_reading(reading);
        self.redraw(&text)?;

        debug!("Display redrawn: {:?}", text);
        self.last_text = text;
        self.last_values = values;
        Ok(true)
    }

    fn redraw(&mut self, text: &str) -> Result<(), DisplayError> {
        self.surface.set_cursor(0, 0)?;
        self.surface.set_text_color(self.palette.background)?;
        self.surface.print(&self.last_text)?;

        self.surface.set_cursor(0, 0)?;
        self.surface.set_text_color(self.palette.foreground)?;
        self.surface.print(text)
    }

    /// Text currently shown on the panel.
    pub fn last_text(&self) -> &str {
        &self.last_text
    }

    pub fn surface(&self) -> &D {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut D {
        &mut self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingSurface, SurfaceOp};
    use alloc::string::ToString;
    use alloc::vec;

    fn reading(temperature: f32, humidity: f32, heat_index: f32) -> Reading {
        let mut reading = Reading::new();
        reading.temperature = temperature;
        reading.humidity = humidity;
        reading.heat_index = heat_index;
        reading
    }

    #[test]
    fn test_format_two_decimals() {
        assert_eq!(
            format_reading(&reading(71.6, 55.0, 71.25)),
            "71.60F\n55.00\n71.25F"
        );
    }

    #[test]
    fn test_first_update_erases_empty_then_draws() {
        let mut presenter = DisplayPresenter::new(RecordingSurface::default(), Palette::default());

        assert_eq!(presenter.update(&reading(70.0, 40.0, 69.0)), Ok(true));

        let palette = Palette::default();
        assert_eq!(
            presenter.surface().ops,
            vec![
                SurfaceOp::Cursor(0, 0),
                SurfaceOp::Color(palette.background),
                SurfaceOp::Print(String::new()),
                SurfaceOp::Cursor(0, 0),
                SurfaceOp::Color(palette.foreground),
                SurfaceOp::Print("70.00F\n40.00\n69.00F".to_string()),
            ]
        );
    }

    #[test]
    fn test_change_erases_previous_text() {
        let mut presenter = DisplayPresenter::new(RecordingSurface::default(), Palette::default());
        presenter.update(&reading(70.0, 40.0, 69.0)).unwrap();
        presenter.surface_mut().ops.clear();

        assert_eq!(presenter.update(&reading(70.5, 40.0, 69.0)), Ok(true));

        let ops = &presenter.surface().ops;
        assert_eq!(ops[2], SurfaceOp::Print("70.00F\n40.00\n69.00F".to_string()));
        assert_eq!(ops[5], SurfaceOp::Print("70.50F\n40.00\n69.00F".to_string()));
        assert_eq!(presenter.last_text(), "70.50F\n40.00\n69.00F");
    }

    #[test]
    fn test_identical_values_do_not_redraw() {
        let mut presenter = DisplayPresenter::new(RecordingSurface::default(), Palette::default());
        presenter.update(&reading(70.0, 40.0, 69.0)).unwrap();
        presenter.surface_mut().ops.clear();

        for _ in 0..5 {
            assert_eq!(presenter.update(&reading(70.0, 40.0, 69.0)), Ok(false));
        }
        assert!(presenter.surface().ops.is_empty());
    }

    #[test]
    fn test_any_field_change_redraws() {
        let mut presenter = DisplayPresenter::new(RecordingSurface::default(), Palette::default());
        presenter.update(&reading(70.0, 40.0, 69.0)).unwrap();

        assert_eq!(presenter.update(&reading(70.0, 40.5, 69.0)), Ok(true));
        assert_eq!(presenter.update(&reading(70.0, 40.5, 69.25)), Ok(true));
    }

    #[test]
    fn test_change_below_display_precision_still_redraws() {
        let mut presenter = DisplayPresenter::new(RecordingSurface::default(), Palette::default());
        presenter.update(&reading(70.0, 40.0, 69.0)).unwrap();

        assert_eq!(presenter.update(&reading(70.0001, 40.0, 69.0)), Ok(true));
    }

    #[test]
    fn test_failed_redraw_is_retried() {
        let mut presenter = DisplayPresenter::new(RecordingSurface::default(), Palette::default());
        presenter.surface_mut().fail_prints = 1;

        assert!(presenter.update(&reading(70.0, 40.0, 69.0)).is_err());
        assert_eq!(presenter.last_text(), "");

        assert_eq!(presenter.update(&reading(70.0, 40.0, 69.0)), Ok(true));
        assert_eq!(presenter.last_text(), "70.00F\n40.00\n69.00F");
    }

    #[test]
    fn test_start_initializes_surface() {
        let mut presenter = DisplayPresenter::new(RecordingSurface::default(), Palette::default());
        presenter.start().unwrap();

        assert_eq!(
            presenter.surface().ops,
            vec![SurfaceOp::Init(Palette::default(), TEXT_SIZE)]
        );
    }
}
