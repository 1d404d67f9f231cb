//! Persisted device configuration
//!
//! The upstream server address is stored as a small JSON record,
//! `{"host": "...", "port": "..."}`, capped at [`MAX_CONFIG_BYTES`]. The port
//! is kept as text in the record and parsed leniently on load, falling back
//! to [`DEFAULT_PORT`] when it is zero or not a number.

use alloc::string::String;
use alloc::vec;
use core::fmt::Write;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::app_state::AppError;
use crate::constants::{DEFAULT_PORT, MAX_CONFIG_BYTES};

/// Address of the server readings are reported to.
///
/// Immutable for the rest of a run once loaded or provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub host: String,
    pub port: u16,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::empty()
    }
}

impl DeviceConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Configuration with no host, which forces provisioning.
    pub fn empty() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
        }
    }

    /// Build a configuration from the text values a portal or record holds.
    pub fn from_text(host: &str, port: &str) -> Self {
        Self {
            host: String::from(host.trim()),
            port: parse_port(port),
        }
    }

    pub fn is_provisioned(&self) -> bool {
        !self.host.is_empty()
    }
}

/// On-disk shape of the configuration record.
///
/// Both fields are strings; a missing field reads as empty. The fields are
/// owned so JSON escapes in the record are decoded rather than borrowed raw.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct StoredConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: String,
}

/// Parse port text the way a lenient C integer parse would, substituting
/// [`DEFAULT_PORT`] for zero, negative, out-of-range or non-numeric input.
///
/// Leading whitespace and a sign are accepted and parsing stops at the first
/// non-digit, so `"1880abc"` yields 1880 and `"abc"` yields the default.
pub fn parse_port(text: &str) -> u16 {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: u32 = 0;
    for byte in digits.bytes() {
        if !byte.is_ascii_digit() {
            break;
        }
        value = value
            .saturating_mul(10)
            .saturating_add(u32::from(byte - b'0'));
    }

    if negative || value == 0 || value > u32::from(u16::MAX) {
        warn!("Cannot parse port number {:?}, using {}", text, DEFAULT_PORT);
        return DEFAULT_PORT;
    }
    value as u16
}

/// Failures of the durable storage backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage could not be mounted")]
    Unavailable,
    #[error("Record is {size} bytes, larger than the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },
    #[error("Storage I/O failed during {operation}")]
    Io { operation: &'static str },
}

/// Failures while loading or saving the configuration record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0}")]
    Storage(StorageError),
    #[error("No configuration record present")]
    Missing,
    #[error("Failed to parse config file")]
    Parse,
    #[error("Failed to encode config record")]
    Encode,
}

impl From<StorageError> for ConfigError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

/// Durable storage holding a single configuration record.
///
/// Implementations are blocking; the record is read once at boot and written
/// once per successful provisioning run.
pub trait ConfigStorage {
    /// Read the whole record into `buf`.
    ///
    /// Returns `Ok(None)` when no record exists and
    /// [`StorageError::TooLarge`] when the record does not fit in `buf`.
    fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, StorageError>;

    /// Replace the record with `bytes`.
    fn write(&mut self, bytes: &[u8]) -> Result<(), StorageError>;
}

/// Loads and saves [`DeviceConfig`] through a [`ConfigStorage`] backend.
pub struct ConfigStore<S> {
    storage: S,
}

impl<S: ConfigStorage> ConfigStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Load the configuration, or `None` if it is unavailable for any reason.
    ///
    /// Every failure is logged here and never escalates; an empty
    /// configuration later forces provisioning.
    pub fn load(&mut self) -> Option<DeviceConfig> {
        match self.try_load() {
            Ok(config) => {
                info!("Loaded config, host is: {}", config.host);
                Some(config)
            }
            Err(ConfigError::Missing) => {
                info!("No config file present");
                None
            }
            Err(e) => {
                error!("Config load failed: {}", AppError::from(e));
                None
            }
        }
    }

    /// Load the configuration, reporting why it is unavailable.
    pub fn try_load(&mut self) -> Result<DeviceConfig, ConfigError> {
        let mut buf = vec![0u8; MAX_CONFIG_BYTES];
        let len = self.storage.read(&mut buf)?.ok_or(ConfigError::Missing)?;
        decode(&buf[..len])
    }

    /// Overwrite the stored record with `config`.
    pub fn save(&mut self, config: &DeviceConfig) -> Result<(), ConfigError> {
        let mut buf = vec![0u8; MAX_CONFIG_BYTES];
        let len = encode(config, &mut buf)?;
        self.storage.write(&buf[..len])?;
        info!("Saved config for host {}:{}", config.host, config.port);
        Ok(())
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }
}

/// Decode a configuration record.
pub fn decode(bytes: &[u8]) -> Result<DeviceConfig, ConfigError> {
    if bytes.len() > MAX_CONFIG_BYTES {
        return Err(StorageError::TooLarge {
            size: bytes.len(),
            limit: MAX_CONFIG_BYTES,
        }
        .into());
    }

    let mut unescaped = vec![0u8; MAX_CONFIG_BYTES];
    let (stored, _) = serde_json_core::from_slice_escaped::<StoredConfig>(bytes, &mut unescaped)
        .map_err(|_| ConfigError::Parse)?;
    Ok(DeviceConfig::from_text(&stored.host, &stored.port))
}

/// Encode `config` into `buf`, returning the number of bytes written.
pub fn encode(config: &DeviceConfig, buf: &mut [u8]) -> Result<usize, ConfigError> {
    let mut port = String::new();
    write!(port, "{}", config.port).map_err(|_| ConfigError::Encode)?;

    let stored = StoredConfig {
        host: config.host.clone(),
        port,
    };
    serde_json_core::to_slice(&stored, buf).map_err(|_| ConfigError::Encode)
}
