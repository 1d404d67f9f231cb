//! Application-wide run state and error types for wifitherm

use thiserror_no_std::Error;

use crate::config::ConfigError;
use crate::display::DisplayError;
use crate::provisioning::PortalError;
use crate::reporter::ReportError;
use crate::sensors::SensorError;

/// Operating mode of the control loop.
///
/// `Provisioning` owns the device until the captive portal returns; the loop
/// then stays in `Sampling` until the trigger is asserted again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Provisioning,
    Sampling,
}

impl RunState {
    /// Decide the state for a tick from the trigger level and the configured host.
    pub fn select(trigger_asserted: bool, host: &str) -> Self {
        if trigger_asserted || host.is_empty() {
            Self::Provisioning
        } else {
            Self::Sampling
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Provisioning => "provisioning",
            Self::Sampling => "sampling",
        }
    }
}

/// Every failure the node can observe, grouped by the boundary it came from.
///
/// None of these are fatal; they are logged once and the affected action is
/// skipped for the current tick.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(ConfigError),
    #[error("Provisioning error: {0}")]
    Portal(PortalError),
    #[error("Sensor error: {0}")]
    Sensor(SensorError),
    #[error("Network error: {0}")]
    Network(ReportError),
    #[error("Display error: {0}")]
    Display(DisplayError),
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<PortalError> for AppError {
    fn from(value: PortalError) -> Self {
        Self::Portal(value)
    }
}

impl From<SensorError> for AppError {
    fn from(value: SensorError) -> Self {
        Self::Sensor(value)
    }
}

impl From<ReportError> for AppError {
    fn from(value: ReportError) -> Self {
        Self::Network(value)
    }
}

impl From<DisplayError> for AppError {
    fn from(value: DisplayError) -> Self {
        Self::Display(value)
    }
}
