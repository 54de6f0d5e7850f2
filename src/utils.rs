/// Utility functions for data processing and formatting
use time::format_description::well_known::Rfc3339;
use time::{format_description, OffsetDateTime};

use crate::models::{ChannelStats, ReadingStats, StoredReading};

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    match format_description::parse("[day].[month].[year] - [hour]:[minute]:[second]") {
        Ok(format) => dt.format(&format).unwrap_or_else(|_| dt.to_string()),
        Err(_) => dt.to_string(),
    }
}

fn channel_stats(values: impl Iterator<Item = f64>) -> ChannelStats {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    let mut count = 0usize;

    for value in values {
        min = min.min(value);
        max = max.max(value);
        sum += value;
        count += 1;
    }

    ChannelStats {
        min,
        max,
        avg: sum / count as f64,
    }
}

/// Calculate min/max/average per channel over the valid readings
///
/// Readings flagged invalid are left out entirely, so a single out-of-range
/// sample cannot skew the dashboard figures.
///
/// # Returns
/// None when no valid reading is present
pub fn calculate_stats(readings: &[StoredReading]) -> Option<ReadingStats> {
    let valid: Vec<&StoredReading> = readings.iter().filter(|r| r.is_valid).collect();

    if valid.is_empty() {
        return None;
    }

    Some(ReadingStats {
        temperature: channel_stats(valid.iter().map(|r| r.temperature)),
        humidity: channel_stats(valid.iter().map(|r| r.humidity)),
        air_quality: channel_stats(valid.iter().map(|r| r.air_quality as f64)),
        count: valid.len(),
    })
}

/// Render stored readings as CSV with a header row
pub fn readings_to_csv(readings: &[StoredReading]) -> Result<String, Box<dyn std::error::Error>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(["timestamp", "temperature", "humidity", "air_quality", "is_valid"])?;

    for reading in readings {
        writer.write_record([
            reading.timestamp.format(&Rfc3339)?,
            reading.temperature.to_string(),
            reading.humidity.to_string(),
            reading.air_quality.to_string(),
            reading.is_valid.to_string(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| e.to_string())?;
    Ok(String::from_utf8(bytes)?)
}
