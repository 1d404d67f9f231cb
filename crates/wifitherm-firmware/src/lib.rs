//! ESP32-S3 firmware-specific modules for wifitherm
//!
//! This crate contains the hardware side of every boundary the core control
//! loop drives: the SHT40 on I2C, the ILI9342C panel, the SD-card config
//! file, the provisioning button, the Wi-Fi station link with its TCP
//! transport and the soft-AP captive portal.

#![no_std]

extern crate alloc;

pub mod display;
pub mod hardware;
pub mod network;
pub mod portal;
pub mod storage;
pub mod time;
pub mod trigger;
pub mod wifi_secrets;
