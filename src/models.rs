use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One decoded transmission from the sensor board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub temperature: f64,
    pub humidity: f64,
    pub air_quality: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Board uptime in milliseconds when the frame was sent, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_millis: Option<u64>,
}

impl Reading {
    pub fn new(temperature: f64, humidity: f64, air_quality: i32) -> Self {
        Reading {
            temperature,
            humidity,
            air_quality,
            timestamp: OffsetDateTime::now_utc(),
            device_millis: None,
        }
    }
}

/// A reading as it was persisted, with the validity bit the validator assigned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredReading {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub temperature: f64,
    pub humidity: f64,
    pub air_quality: i32,
    pub is_valid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorHealth {
    Good,
    Degraded,
    Failed,
}

impl SensorHealth {
    /// 0 issues is good, 1-2 degraded, 3 or more failed.
    pub fn from_issue_count(count: usize) -> Self {
        match count {
            0 => SensorHealth::Good,
            1 | 2 => SensorHealth::Degraded,
            _ => SensorHealth::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationVerdict {
    pub valid: bool,
    pub issues: Vec<String>,
    pub health: SensorHealth,
}

impl ValidationVerdict {
    pub fn from_issues(issues: Vec<String>) -> Self {
        ValidationVerdict {
            valid: issues.is_empty(),
            health: SensorHealth::from_issue_count(issues.len()),
            issues,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Open,
    Close,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub recommendation: Recommendation,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Initializing,
    Healthy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSummary {
    pub status: HealthStatus,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// Aggregates over the valid readings of a query window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingStats {
    pub temperature: ChannelStats,
    pub humidity: ChannelStats,
    pub air_quality: ChannelStats,
    pub count: usize,
}
