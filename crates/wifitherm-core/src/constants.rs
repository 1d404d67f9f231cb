//! Compile-time constants shared by the control loop and its boundaries.

use embassy_time::Duration;

/// Identifier of this node, also used as the captive-portal access point name.
pub const DEVICE_ID: &str = "wifitherm1";

/// Kind of device, reported in the HTTP user agent.
pub const DEVICE_TYPE: &str = "thermometer";

/// Port used when the stored port is missing, zero or not a number.
pub const DEFAULT_PORT: u16 = 1880;

/// Upper bound on the size of the persisted configuration record.
pub const MAX_CONFIG_BYTES: usize = 1024;

/// Maximum length of a text parameter collected by the captive portal.
pub const PORTAL_PARAM_MAX_LEN: usize = 40;

/// Minimum time between two report attempts that reached the server.
pub const REPORT_INTERVAL: Duration = Duration::from_secs(60);

/// Resource on the upstream server that receives readings.
pub const REPORT_PATH: &str = "/thermometer";

/// Transport-level timeout applied by the network boundaries.
pub const TRANSPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// Sentinel temperature meaning "no valid sample yet" (°F).
pub const TEMPERATURE_SENTINEL: f32 = -100.0;

/// Sentinel humidity meaning "no valid sample yet" (%RH).
pub const HUMIDITY_SENTINEL: f32 = 0.0;

/// Text scale used for the reading block.
pub const TEXT_SIZE: u8 = 2;
