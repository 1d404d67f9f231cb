//! The configuration record as a file on the SD card

use core::fmt::Debug;

use embedded_sdmmc::{Mode, SdCard, TimeSource, Timestamp, VolumeIdx, VolumeManager};
use log::{debug, error};
use wifitherm_core::config::{ConfigStorage, StorageError};

/// 8.3 name of the record in the card's root directory.
pub const CONFIG_FILE: &str = "CONFIG.JSN";

/// The node has no RTC; files are stamped with the FAT epoch.
pub struct FixedTime;

impl TimeSource for FixedTime {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 10,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

fn io_error<E: Debug>(operation: &'static str) -> impl FnOnce(E) -> StorageError {
    move |e| {
        error!("SD card {} failed: {:?}", operation, e);
        StorageError::Io { operation }
    }
}

/// These SD card operations are blocking; the record is only touched at boot
/// and after provisioning.
pub struct SdCardConfigStorage<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    volume_mgr: VolumeManager<SdCard<S, D>, T, 4, 4, 1>,
}

impl<S, D, T> SdCardConfigStorage<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    pub fn new(sd_card: SdCard<S, D>, ts: T) -> Self {
        let volume_mgr = VolumeManager::new(sd_card, ts);

        Self { volume_mgr }
    }
}

impl<S, D, T> ConfigStorage for SdCardConfigStorage<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, StorageError> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0)).map_err(|e| {
            error!("Failed to mount SD card: {:?}", e);
            StorageError::Unavailable
        })?;
        let root_dir = volume0.open_root_dir().map_err(io_error("open root"))?;

        let file = match root_dir.open_file_in_dir(CONFIG_FILE, Mode::ReadOnly) {
            Ok(file) => file,
            Err(embedded_sdmmc::Error::NotFound) => return Ok(None),
            Err(e) => return Err(io_error("open")(e)),
        };

        let size = file.length() as usize;
        if size > buf.len() {
            return Err(StorageError::TooLarge {
                size,
                limit: buf.len(),
            });
        }

        let mut total = 0;
        while total < size {
            let n = file.read(&mut buf[total..size]).map_err(io_error("read"))?;
            if n == 0 {
                break;
            }
            total += n;
        }
        debug!("Read {} bytes from {}", total, CONFIG_FILE);

        file.close().map_err(io_error("close"))?;
        root_dir.close().map_err(io_error("close root"))?;
        volume0.close().map_err(io_error("unmount"))?;
        Ok(Some(total))
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0)).map_err(|e| {
            error!("Failed to mount SD card: {:?}", e);
            StorageError::Unavailable
        })?;
        let root_dir = volume0.open_root_dir().map_err(io_error("open root"))?;
        let file = root_dir
            .open_file_in_dir(CONFIG_FILE, Mode::ReadWriteCreateOrTruncate)
            .map_err(io_error("open for writing"))?;

        file.write(bytes).map_err(io_error("write"))?;

        file.close().map_err(io_error("close"))?;
        root_dir.close().map_err(io_error("close root"))?;
        volume0.close().map_err(io_error("unmount"))?;
        debug!("Wrote {} bytes to {}", bytes.len(), CONFIG_FILE);
        Ok(())
    }
}
