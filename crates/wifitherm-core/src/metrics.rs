//! Readings and the metrics derived from them
//!
//! A [`Reading`] holds the most recent valid temperature (°F) and relative
//! humidity, plus the heat index computed from them. Until both have been
//! sampled at least once the reading carries sentinel values and is invalid.

use embassy_time::Instant;

use crate::constants::{HUMIDITY_SENTINEL, TEMPERATURE_SENTINEL};

/// Latest measured and derived values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Dry-bulb temperature in °F
    pub temperature: f32,
    /// Relative humidity in %
    pub humidity: f32,
    /// Heat index in °F
    pub heat_index: f32,
    /// Time of the last tick that sampled this reading
    pub timestamp: Instant,
}

impl Default for Reading {
    fn default() -> Self {
        Self::new()
    }
}

impl Reading {
    /// A reading that has not been sampled yet.
    pub const fn new() -> Self {
        Self {
            temperature: TEMPERATURE_SENTINEL,
            humidity: HUMIDITY_SENTINEL,
            heat_index: 0.0,
            timestamp: Instant::from_ticks(0),
        }
    }

    /// Both temperature and humidity hold real samples.
    pub fn is_valid(&self) -> bool {
        self.temperature > TEMPERATURE_SENTINEL && self.humidity > HUMIDITY_SENTINEL
    }

    /// Recompute the heat index from the current temperature and humidity.
    ///
    /// Returns `false` and leaves the reading untouched while it is invalid.
    pub fn derive(&mut self) -> bool {
        if !self.is_valid() {
            return false;
        }
        self.heat_index = heat_index(self.temperature, self.humidity, true);
        true
    }
}

pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 1.8 + 32.0
}

pub fn fahrenheit_to_celsius(fahrenheit: f32) -> f32 {
    (fahrenheit - 32.0) * 0.55555
}

/// Heat index ("feels like" temperature) from temperature and relative humidity.
///
/// Uses the NOAA approach: Steadman's simple formula, replaced by the
/// Rothfusz regression (with its low- and high-humidity adjustments) once the
/// simple result reaches 80 °F. With `is_fahrenheit == false` the input and
/// the result are in °C.
pub fn heat_index(temperature: f32, humidity: f32, is_fahrenheit: bool) -> f32 {
    let t = if is_fahrenheit {
        temperature
    } else {
        celsius_to_fahrenheit(temperature)
    };
    let h = humidity;

    let mut hi = 0.5 * (t + 61.0 + ((t - 68.0) * 1.2) + (h * 0.094));

    if hi > 79.0 {
        hi = -42.379 + 2.049_015_2 * t + 10.143_331 * h
            - 0.224_755_41 * t * h
            - 0.006_837_83 * t * t
            - 0.054_817_17 * h * h
            + 0.001_228_74 * t * t * h
            + 0.000_852_82 * t * h * h
            - 0.000_001_99 * t * t * h * h;

        if h < 13.0 && (80.0..=112.0).contains(&t) {
            hi -= ((13.0 - h) * 0.25) * libm::sqrtf((17.0 - libm::fabsf(t - 95.0)) * 0.058_82);
        } else if h > 85.0 && (80.0..=87.0).contains(&t) {
            hi += ((h - 85.0) * 0.1) * ((87.0 - t) * 0.2);
        }
    }

    if is_fahrenheit {
        hi
    } else {
        fahrenheit_to_celsius(hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32, tolerance: f32) -> bool {
        (a - b).abs() <= tolerance
    }

    #[test]
    fn test_celsius_conversion() {
        assert!(close(celsius_to_fahrenheit(22.0), 71.6, 0.001));
        assert!(close(celsius_to_fahrenheit(-40.0), -40.0, 0.001));
        assert!(close(fahrenheit_to_celsius(212.0), 100.0, 0.01));
    }

    #[test]
    fn test_mild_conditions_use_simple_formula() {
        // 0.5 * (71.6 + 61 + 4.32 + 5.17) = 71.045
        let hi = heat_index(71.6, 55.0, true);
        assert!(close(hi, 71.045, 0.01), "got {hi}");
    }

    #[test]
    fn test_hot_conditions_use_regression() {
        // NWS table: 90 °F at 50 % RH feels like ~95 °F
        let hi = heat_index(90.0, 50.0, true);
        assert!(close(hi, 94.6, 0.5), "got {hi}");
    }

    #[test]
    fn test_low_humidity_adjustment() {
        let adjusted = heat_index(95.0, 10.0, true);
        let unadjusted = heat_index(95.0, 13.0, true);
        assert!(adjusted < unadjusted);
    }

    #[test]
    fn test_high_humidity_adjustment() {
        // 85 °F at 90 % RH is ~101-102 °F on the NWS chart
        let hi = heat_index(85.0, 90.0, true);
        assert!(close(hi, 101.5, 1.5), "got {hi}");
    }

    #[test]
    fn test_celsius_inputs_give_celsius_output() {
        let hi_c = heat_index(32.22, 50.0, false);
        let hi_f = heat_index(90.0, 50.0, true);
        assert!(close(hi_c, fahrenheit_to_celsius(hi_f), 0.1));
    }

    #[test]
    fn test_new_reading_is_invalid() {
        let reading = Reading::new();
        assert!(!reading.is_valid());
    }

    #[test]
    fn test_validity_needs_both_fields() {
        let mut reading = Reading::new();
        reading.temperature = 70.0;
        assert!(!reading.is_valid());

        reading.humidity = 40.0;
        assert!(reading.is_valid());

        reading.temperature = TEMPERATURE_SENTINEL;
        assert!(!reading.is_valid());
    }

    #[test]
    fn test_derive_skips_invalid_reading() {
        let mut reading = Reading::new();
        reading.temperature = 80.0;
        assert!(!reading.derive());
        assert_eq!(reading.heat_index, 0.0);
    }

    #[test]
    fn test_derive_updates_heat_index() {
        let mut reading = Reading::new();
        reading.temperature = 71.6;
        reading.humidity = 55.0;
        assert!(reading.derive());
        assert_eq!(reading.heat_index, heat_index(71.6, 55.0, true));
    }
}
