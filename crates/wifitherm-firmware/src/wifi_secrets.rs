//! Station Wi-Fi credentials, baked in at build time from `.env` or the environment.

pub const WIFI_SSID: &str = env!("WIFI_SSID");
pub const WIFI_PASSWORD: &str = env!("WIFI_PASSWORD");
