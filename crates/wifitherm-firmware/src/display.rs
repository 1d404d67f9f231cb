//! ILI9342C panel on SPI, exposed to the core as a [`GraphicsSurface`]

use embedded_hal_bus::spi::{ExclusiveDevice, NoDelay};
use esp_hal::Blocking;
use esp_hal::gpio::Output;
use esp_hal::spi::master::Spi;
use mipidsi::interface::SpiInterface;
use mipidsi::models::ILI9342CRgb565;
use mipidsi::{Builder as MipidsiBuilder, Display, NoResetPin};
use wifitherm_core::display::GraphicsSurface;

pub const DISPLAY_WIDTH: u16 = 320;
pub const DISPLAY_HEIGHT: u16 = 240;

pub type PanelSpi<'a> = ExclusiveDevice<Spi<'a, Blocking>, Output<'a>, NoDelay>;

pub type Panel<'a> =
    Display<SpiInterface<'a, PanelSpi<'a>, Output<'a>>, ILI9342CRgb565, NoResetPin>;

/// Bring up the panel and wrap it for text rendering.
///
/// `buffer` batches SPI writes; larger is faster and uses more RAM.
pub fn init_panel<'a>(
    spi_bus: Spi<'a, Blocking>,
    cs: Output<'a>,
    dc: Output<'a>,
    buffer: &'a mut [u8],
) -> GraphicsSurface<Panel<'a>> {
    // Wrap the SPI bus as a SPI device (required by embedded-hal traits)
    let spi_device = ExclusiveDevice::new_no_delay(spi_bus, cs).expect("display CS pin is infallible");

    let di = SpiInterface::new(spi_device, dc, buffer);

    let panel = MipidsiBuilder::new(ILI9342CRgb565, di)
        .display_size(DISPLAY_WIDTH, DISPLAY_HEIGHT)
        .init(&mut embassy_time::Delay)
        .expect("Failed to initialize display");

    log::info!("Display initialized ({}x{})", DISPLAY_WIDTH, DISPLAY_HEIGHT);
    GraphicsSurface::new(panel)
}
