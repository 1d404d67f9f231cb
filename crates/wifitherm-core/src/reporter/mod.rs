//! Time-gated delivery of readings to the upstream server
//!
//! Once a minute the current reading is serialized as
//! `{"temperature":..,"humidity":..,"relativeTemp":..}` and POSTed to
//! `http://<host>:<port>/thermometer`. A failed connect leaves the timer
//! alone so the next tick tries again; once connected, the timer advances
//! whatever the server answers.

mod http;

pub use http::*;

use embassy_time::{Duration, Instant};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::config::DeviceConfig;
use crate::constants::{REPORT_INTERVAL, REPORT_PATH};
use crate::metrics::Reading;

/// Upper bound on the serialized payload.
const MAX_PAYLOAD_BYTES: usize = 128;

/// Failures on the reporting path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("Could not resolve host")]
    Resolve,
    #[error("Connection to server failed")]
    Connect,
    #[error("Network I/O failed during {operation}")]
    Io { operation: &'static str },
    #[error("Server response has no valid status line")]
    MalformedResponse,
    #[error("Failed to serialize report payload")]
    Serialize,
}

/// Body of a report, as sent on the wire.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ReportPayload {
    pub temperature: f32,
    pub humidity: f32,
    #[serde(rename = "relativeTemp")]
    pub relative_temp: f32,
}

impl From<&Reading> for ReportPayload {
    fn from(reading: &Reading) -> Self {
        Self {
            temperature: reading.temperature,
            humidity: reading.humidity,
            relative_temp: reading.heat_index,
        }
    }
}

impl ReportPayload {
    /// Serialize as compact JSON into `buf`, returning the length written.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, ReportError> {
        serde_json_core::to_slice(self, buf).map_err(|_| ReportError::Serialize)
    }
}

/// Gates how often a report may go out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportTimer {
    last_sent_at: Instant,
    interval: Duration,
}

impl ReportTimer {
    /// Start the timer at `now`; the first report is due one interval later.
    pub const fn new(now: Instant, interval: Duration) -> Self {
        Self {
            last_sent_at: now,
            interval,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now.checked_duration_since(self.last_sent_at)
            .is_some_and(|elapsed| elapsed >= self.interval)
    }

    pub fn mark_sent(&mut self, now: Instant) {
        self.last_sent_at = now;
    }

    pub fn last_sent_at(&self) -> Instant {
        self.last_sent_at
    }
}

/// What a call to [`Reporter::maybe_report`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// Less than one interval since the last send
    NotDue,
    /// The reading has not been validly sampled yet
    InvalidReading,
    /// The server answered with this status code
    Sent { status: u16 },
    /// Connected, but the exchange failed afterwards
    Failed(ReportError),
}

/// Sends readings to the configured server at a fixed cadence.
pub struct Reporter {
    config: DeviceConfig,
    timer: ReportTimer,
}

impl Reporter {
    pub fn new(config: DeviceConfig, now: Instant) -> Self {
        Self {
            config,
            timer: ReportTimer::new(now, REPORT_INTERVAL),
        }
    }

    /// Point the reporter at a newly provisioned server.
    pub fn set_config(&mut self, config: DeviceConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn timer(&self) -> &ReportTimer {
        &self.timer
    }

    /// Report `reading` if a report is due.
    ///
    /// Returns `Err` only when no connection could be made, in which case the
    /// timer is untouched and the next qualifying tick retries.
    pub async fn maybe_report<C: Connector>(
        &mut self,
        connector: &mut C,
        reading: &Reading,
        now: Instant,
    ) -> Result<ReportOutcome, ReportError> {
        if !self.timer.is_due(now) {
            return Ok(ReportOutcome::NotDue);
        }
        if !reading.is_valid() {
            return Ok(ReportOutcome::InvalidReading);
        }

        let mut body = [0u8; MAX_PAYLOAD_BYTES];
        let len = ReportPayload::from(reading).encode(&mut body)?;
        let body = &body[..len];
        info!(
            "Sending {}",
            core::str::from_utf8(body).unwrap_or("<payload>")
        );

        let host = self.config.host.as_str();
        let port = self.config.port;
        let mut connection = connector.connect(host, port).await?;

        info!("POST http://{}:{}{}", host, port, REPORT_PATH);
        let result = post_json(&mut connection, host, port, REPORT_PATH, body).await;
        connection.close().await;
        self.timer.mark_sent(now);

        match result {
            Ok(status) => {
                info!("Received HTTP code: {}", status);
                Ok(ReportOutcome::Sent { status })
            }
            Err(e) => {
                warn!("Report exchange failed after connecting: {}", e);
                Ok(ReportOutcome::Failed(e))
            }
        }
    }
}
