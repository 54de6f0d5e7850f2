/// Per-reading range checks and stuck-sensor detection
use crate::engine::history::{self, SharedHistory};
use crate::models::ValidationVerdict;

// Accepted sensor ranges
const TEMP_RANGE_F: (f64, f64) = (0.0, 150.0);
const HUMIDITY_RANGE_PCT: (f64, f64) = (0.0, 100.0);
const AIR_QUALITY_RANGE: (i32, i32) = (0, 4095); // 12-bit ADC

/// Validates readings against fixed bounds and the shared rolling history
///
/// Every call appends the reading to the history, so the order in which
/// readings are validated matters for stuck detection.
#[derive(Debug, Clone)]
pub struct Validator {
    history: SharedHistory,
}

impl Validator {
    pub fn new(history: SharedHistory) -> Self {
        Validator { history }
    }

    /// Check one reading and record it in the history
    ///
    /// Issues are reported in a fixed order: temperature, humidity, air
    /// quality ranges, then stuck channels. Stuck checks only run once the
    /// history holds a full window of samples.
    pub fn validate(&self, temperature: f64, humidity: f64, air_quality: i32) -> ValidationVerdict {
        let mut issues = Vec::new();

        if !(TEMP_RANGE_F.0..=TEMP_RANGE_F.1).contains(&temperature) {
            issues.push(format!("Temperature out of range: {:?}°F", temperature));
        }

        if !(HUMIDITY_RANGE_PCT.0..=HUMIDITY_RANGE_PCT.1).contains(&humidity) {
            issues.push(format!("Humidity out of range: {:?}%", humidity));
        }

        if !(AIR_QUALITY_RANGE.0..=AIR_QUALITY_RANGE.1).contains(&air_quality) {
            issues.push(format!("Air Quality out of range: {}", air_quality));
        }

        // Append and stuck checks happen under the same lock
        let mut window = history::lock(&self.history);
        window.push(temperature, humidity, air_quality);

        if window.is_full() {
            if window.temperature_stuck() {
                issues.push("Temperature sensor stuck (no variation)".to_string());
            }
            if window.humidity_stuck() {
                issues.push("Humidity sensor stuck (no variation)".to_string());
            }
            if window.air_quality_stuck() {
                issues.push("Air Quality sensor stuck (no variation)".to_string());
            }
        }
        drop(window);

        ValidationVerdict::from_issues(issues)
    }
}
