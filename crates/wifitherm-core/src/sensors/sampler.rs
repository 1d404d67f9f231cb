use embassy_time::Instant;
use log::{debug, error};

use super::{ClimateSensor, SensorError};
use crate::app_state::AppError;
use crate::metrics::{Reading, celsius_to_fahrenheit};

/// What happened to one field of the reading during a sample.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// A numeric value was stored
    Updated,
    /// The event was NaN; the previous value was kept
    NotANumber,
    /// The driver failed; the previous value was kept
    Failed(SensorError),
}

impl FieldUpdate {
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated)
    }
}

/// Result of one [`SensorSampler::sample`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleReport {
    pub temperature: FieldUpdate,
    pub humidity: FieldUpdate,
}

/// Samples a [`ClimateSensor`] into a [`Reading`] once per tick.
///
/// Temperature and humidity are read independently. A NaN event or a driver
/// error leaves the matching field as it was, so the reading only ever holds
/// the last valid value (or its sentinel).
pub struct SensorSampler<S> {
    sensor: S,
}

impl<S: ClimateSensor> SensorSampler<S> {
    pub fn new(sensor: S) -> Self {
        Self { sensor }
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    /// Update `reading` from one temperature and one humidity event.
    pub async fn sample(&mut self, reading: &mut Reading, now: Instant) -> SampleReport {
        let temperature = match self.sensor.temperature_event().await {
            Ok(celsius) if celsius.is_nan() => FieldUpdate::NotANumber,
            Ok(celsius) => {
                reading.temperature = celsius_to_fahrenheit(celsius);
                FieldUpdate::Updated
            }
            Err(e) => {
                error!("{} temperature read failed: {}", self.sensor.name(), AppError::from(e.clone()));
                FieldUpdate::Failed(e)
            }
        };

        let humidity = match self.sensor.humidity_event().await {
            Ok(percent) if percent.is_nan() => FieldUpdate::NotANumber,
            Ok(percent) => {
                reading.humidity = percent;
                FieldUpdate::Updated
            }
            Err(e) => {
                error!("{} humidity read failed: {}", self.sensor.name(), AppError::from(e.clone()));
                FieldUpdate::Failed(e)
            }
        };

        if temperature.is_updated() || humidity.is_updated() {
            reading.timestamp = now;
        }

        debug!(
            "Sampled {}: {:.2}F {:.2}% ({:?}, {:?})",
            self.sensor.name(),
            reading.temperature,
            reading.humidity,
            temperature,
            humidity
        );

        SampleReport {
            temperature,
            humidity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{HUMIDITY_SENTINEL, TEMPERATURE_SENTINEL};
    use crate::test_support::ScriptedSensor;
    use embassy_futures::block_on;

    #[test]
    fn test_converts_celsius_and_keeps_humidity() {
        let mut sampler = SensorSampler::new(ScriptedSensor::constant(22.0, 55.0));
        let mut reading = Reading::new();

        let report = block_on(sampler.sample(&mut reading, Instant::from_secs(1)));

        assert!(report.temperature.is_updated());
        assert!(report.humidity.is_updated());
        assert!((reading.temperature - 71.6).abs() < 0.001);
        assert_eq!(reading.humidity, 55.0);
        assert_eq!(reading.timestamp, Instant::from_secs(1));
    }

    #[test]
    fn test_nan_keeps_previous_values() {
        let mut sensor = ScriptedSensor::constant(f32::NAN, f32::NAN);
        sensor.push(20.0, 40.0);
        let mut sampler = SensorSampler::new(sensor);
        let mut reading = Reading::new();

        block_on(sampler.sample(&mut reading, Instant::from_secs(1)));
        let before = reading;
        let report = block_on(sampler.sample(&mut reading, Instant::from_secs(3)));

        assert_eq!(report.temperature, FieldUpdate::NotANumber);
        assert_eq!(report.humidity, FieldUpdate::NotANumber);
        assert_eq!(reading, before);
    }

    #[test]
    fn test_nan_never_replaces_sentinel() {
        let mut sensor = ScriptedSensor::constant(f32::NAN, f32::NAN);
        sensor.push(f32::NAN, 30.0);
        let mut sampler = SensorSampler::new(sensor);
        let mut reading = Reading::new();

        block_on(sampler.sample(&mut reading, Instant::from_secs(1)));

        assert_eq!(reading.temperature, TEMPERATURE_SENTINEL);
        assert_eq!(reading.humidity, 30.0);
        assert!(!reading.is_valid());
    }

    #[test]
    fn test_driver_error_keeps_value_and_still_reads_humidity() {
        let mut sensor = ScriptedSensor::constant(25.0, 50.0);
        sensor.fail_temperature_once();
        let mut sampler = SensorSampler::new(sensor);
        let mut reading = Reading::new();

        let report = block_on(sampler.sample(&mut reading, Instant::from_secs(1)));

        assert!(matches!(report.temperature, FieldUpdate::Failed(_)));
        assert!(report.humidity.is_updated());
        assert_eq!(reading.temperature, TEMPERATURE_SENTINEL);
        assert_eq!(reading.humidity, 50.0);
    }

    #[test]
    fn test_untouched_reading_keeps_timestamp() {
        let mut sampler = SensorSampler::new(ScriptedSensor::constant(f32::NAN, f32::NAN));
        let mut reading = Reading::new();

        block_on(sampler.sample(&mut reading, Instant::from_secs(5)));

        assert_eq!(reading.timestamp, Instant::from_ticks(0));
        assert_eq!(reading.humidity, HUMIDITY_SENTINEL);
    }
}
