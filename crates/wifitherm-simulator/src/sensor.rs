use std::time::Instant;

use embassy_time::Duration;
use wifitherm_core::sensors::{ClimateSensor, SensorError};

/// Every this many samples the generator reports NaN, like a DHT22 that
/// missed a read.
const DROPOUT_EVERY: u64 = 11;

/// Generates synthetic readings that vary over time.
pub struct MockSensorGenerator {
    started: Instant,
    samples: u64,
    min_delay: Duration,
}

impl MockSensorGenerator {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            started: Instant::now(),
            samples: 0,
            min_delay,
        }
    }

    fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn dropped(&self) -> bool {
        self.samples % DROPOUT_EVERY == DROPOUT_EVERY - 1
    }
}

impl ClimateSensor for MockSensorGenerator {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn temperature_event(&mut self) -> Result<f32, SensorError> {
        self.samples += 1;
        if self.dropped() {
            return Ok(f32::NAN);
        }
        let t = self.elapsed_secs();

        // Temperature: 19–25 °C sinusoidal with slow drift
        Ok((22.0 + 3.0 * (t / 120.0).sin() + 0.5 * (t / 37.0).cos()) as f32)
    }

    async fn humidity_event(&mut self) -> Result<f32, SensorError> {
        if self.dropped() {
            return Ok(f32::NAN);
        }
        let t = self.elapsed_secs();

        // Humidity: 40–60 % with a different period
        Ok((50.0 + 10.0 * (t / 180.0).sin() + 2.0 * (t / 23.0).cos()) as f32)
    }

    fn min_delay(&self) -> Duration {
        self.min_delay
    }
}
