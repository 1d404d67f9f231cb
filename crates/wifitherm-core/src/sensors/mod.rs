//! Sensor boundary and the per-tick sampler
//!
//! The control loop talks to its temperature/humidity sensor through
//! [`ClimateSensor`], a unified-sensor style interface that yields one
//! temperature event and one humidity event per tick. An event value of NaN
//! means the sensor had nothing new to report.

mod sampler;
#[cfg(feature = "sensor-sht40")]
mod sht40;

pub use sampler::*;
#[cfg(feature = "sensor-sht40")]
pub use sht40::*;

use core::future::Future;

use embassy_time::Duration;
use thiserror_no_std::Error;

/// Failures reported by a sensor driver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor} failed to {operation}: {details}")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
}

/// A combined temperature and relative humidity sensor.
pub trait ClimateSensor {
    /// Human readable sensor name for logs.
    fn name(&self) -> &'static str;

    /// Read a temperature event in °C. NaN means "no new value".
    fn temperature_event(&mut self) -> impl Future<Output = Result<f32, SensorError>>;

    /// Read a relative humidity event in %. NaN means "no new value".
    fn humidity_event(&mut self) -> impl Future<Output = Result<f32, SensorError>>;

    /// Minimum interval between two samples the sensor supports.
    ///
    /// The control loop sleeps this long between ticks.
    fn min_delay(&self) -> Duration;
}
