//! Hardware-independent core library for wifitherm
//!
//! This crate contains the operational control loop of the wifitherm sensor
//! node: configuration persistence, captive-portal provisioning, sensor
//! sampling, heat-index derivation, change-gated display updates and the
//! once-a-minute HTTP report. Every piece of hardware is reached through a
//! boundary trait so the same loop runs on the ESP32-S3 firmware and in the
//! desktop simulator.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod app_state;
pub mod config;
pub mod constants;
pub mod control_loop;
pub mod display;
pub mod metrics;
pub mod provisioning;
pub mod reporter;
pub mod sensors;

#[cfg(test)]
pub(crate) mod test_support;
