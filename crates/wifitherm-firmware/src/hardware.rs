//! Bus and peripheral bring-up for the wifitherm node
//!
//! Pin map (ESP32-S3):
//! - SHT40 on I2C0, SDA GPIO12, SCL GPIO11, 400 kHz
//! - panel on SPI2, SCK GPIO36, MOSI GPIO37, CS GPIO35, DC GPIO34
//! - SD card on SPI3, SCK GPIO40, MOSI GPIO41, MISO GPIO42, CS GPIO39
//! - provisioning button on GPIO0 (active low, pull-up)

use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::time::Rate;
use esp_hal::{Async, Blocking};
use log::info;

use crate::storage::{FixedTime, SdCardConfigStorage};
use crate::trigger::ButtonTrigger;

pub type SdSpi<'a> = ExclusiveDevice<Spi<'a, Blocking>, Output<'a>, Delay>;

pub type SdStorage<'a> = SdCardConfigStorage<SdSpi<'a>, Delay, FixedTime>;

/// Initialize the I2C bus for the climate sensor.
pub fn create_i2c_bus(
    i2c0: esp_hal::peripherals::I2C0<'static>,
    sda: esp_hal::peripherals::GPIO12<'static>,
    scl: esp_hal::peripherals::GPIO11<'static>,
) -> I2c<'static, Async> {
    I2c::new(i2c0, I2cConfig::default().with_frequency(Rate::from_khz(400)))
        .expect("Failed to configure I2C0")
        .with_sda(sda)
        .with_scl(scl)
        .into_async()
}

/// Initialize the SPI bus for the panel.
pub fn create_display_spi(
    spi2: esp_hal::peripherals::SPI2<'static>,
    sck: esp_hal::peripherals::GPIO36<'static>,
    mosi: esp_hal::peripherals::GPIO37<'static>,
) -> Spi<'static, Blocking> {
    Spi::new(spi2, SpiConfig::default())
        .expect("Failed to configure SPI2")
        .with_sck(sck)
        .with_mosi(mosi)
}

/// Initialize the SD card on its own SPI bus and wrap it as config storage.
///
/// The card is clocked at 400 kHz, which every card accepts during
/// initialization; config reads are a few hundred bytes.
pub fn init_sd_storage(
    spi3: esp_hal::peripherals::SPI3<'static>,
    sck: esp_hal::peripherals::GPIO40<'static>,
    mosi: esp_hal::peripherals::GPIO41<'static>,
    miso: esp_hal::peripherals::GPIO42<'static>,
    cs: esp_hal::peripherals::GPIO39<'static>,
) -> SdStorage<'static> {
    let spi_bus = Spi::new(spi3, SpiConfig::default().with_frequency(Rate::from_khz(400)))
        .expect("Failed to configure SPI3")
        .with_sck(sck)
        .with_mosi(mosi)
        .with_miso(miso);
    let cs = Output::new(cs, Level::High, OutputConfig::default());
    let sd_spi = ExclusiveDevice::new(spi_bus, cs, Delay::new()).expect("SD CS pin is infallible");

    info!("SD card storage ready on SPI3");
    SdCardConfigStorage::new(embedded_sdmmc::SdCard::new(sd_spi, Delay::new()), FixedTime)
}

/// Configure the provisioning button.
pub fn init_trigger(pin: esp_hal::peripherals::GPIO0<'static>) -> ButtonTrigger<'static> {
    ButtonTrigger::new(Input::new(
        pin,
        InputConfig::default().with_pull(Pull::Up),
    ))
}
