use embassy_time::Duration;
use embedded_hal_async::i2c::I2c;
use sht4x::Sht4xAsync;

use super::{ClimateSensor, SensorError};

/// The SHT40 is sampled no faster than a DHT22 would allow.
const SHT40_MIN_DELAY: Duration = Duration::from_secs(2);

/// SHT40 behind the [`ClimateSensor`] interface.
///
/// One measurement returns both temperature and humidity, so the temperature
/// event triggers the measurement and the humidity event hands out the value
/// taken with it. If that measurement failed, the humidity event is NaN.
pub struct SHT40Sensor<I> {
    sensor: Sht4xAsync<I, embassy_time::Delay>,
    pending_humidity: f32,
}

impl<I: I2c> SHT40Sensor<I> {
    pub fn new(i2c: I) -> Self {
        Self {
            sensor: Sht4xAsync::<I, embassy_time::Delay>::new(i2c),
            pending_humidity: f32::NAN,
        }
    }
}

impl<I: I2c> ClimateSensor for SHT40Sensor<I> {
    fn name(&self) -> &'static str {
        "SHT40"
    }

    async fn temperature_event(&mut self) -> Result<f32, SensorError> {
        self.pending_humidity = f32::NAN;

        let measurement = self
            .sensor
            .measure(sht4x::Precision::High, &mut embassy_time::Delay)
            .await
            .map_err(|e| {
                log::error!("SHT40 measurement failed: {:?}", e);
                SensorError::ReadFailed {
                    sensor: "SHT40",
                    operation: "measure temperature/humidity",
                    details: "I2C communication error or sensor not responding",
                }
            })?;

        self.pending_humidity = measurement.humidity_percent().to_num::<f32>();
        Ok(measurement.temperature_celsius().to_num::<f32>())
    }

    async fn humidity_event(&mut self) -> Result<f32, SensorError> {
        let humidity = self.pending_humidity;
        self.pending_humidity = f32::NAN;
        Ok(humidity)
    }

    fn min_delay(&self) -> Duration {
        SHT40_MIN_DELAY
    }
}
