use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use log::error;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::api::ApiState;
use crate::database::{clamp_limit, fetch_recent_readings};
use crate::models::{HealthSummary, ReadingStats, Recommendation, StoredReading};
use crate::utils::{calculate_stats, readings_to_csv};

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<i64>,
}

/// Latest reading merged with the current recommendation
#[derive(Debug, Serialize)]
pub struct LatestResponse {
    pub temp: f64,
    pub humidity: f64,
    pub air_quality: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub recommendation: Recommendation,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
}

pub async fn get_latest(
    State(state): State<ApiState>,
) -> Result<Json<LatestResponse>, (StatusCode, Json<ErrorBody>)> {
    let reading = state.latest.read().await.clone().ok_or_else(|| {
        error_response(StatusCode::SERVICE_UNAVAILABLE, "No reading received yet")
    })?;

    let decision = state
        .decision_engine
        .decide(reading.temperature, reading.humidity, reading.air_quality);

    Ok(Json(LatestResponse {
        temp: reading.temperature,
        humidity: reading.humidity,
        air_quality: reading.air_quality,
        timestamp: reading.timestamp,
        recommendation: decision.recommendation,
        reason: decision.reason,
    }))
}

async fn recent(state: &ApiState, limit: Option<i64>) -> Result<Vec<StoredReading>, StatusCode> {
    fetch_recent_readings(clamp_limit(limit), &state.database_url)
        .await
        .map_err(|e| {
            error!("Failed to fetch readings: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

pub async fn get_readings(
    Query(params): Query<LimitQuery>,
    State(state): State<ApiState>,
) -> Result<Json<Vec<StoredReading>>, StatusCode> {
    Ok(Json(recent(&state, params.limit).await?))
}

pub async fn get_stats(
    Query(params): Query<LimitQuery>,
    State(state): State<ApiState>,
) -> Result<Json<ReadingStats>, StatusCode> {
    let readings = recent(&state, params.limit).await?;

    calculate_stats(&readings)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn get_health(State(state): State<ApiState>) -> Json<HealthSummary> {
    Json(state.health_monitor.sensor_health())
}

pub async fn export_csv(
    Query(params): Query<LimitQuery>,
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, StatusCode> {
    let readings = recent(&state, params.limit).await?;

    let body = readings_to_csv(&readings).map_err(|e| {
        error!("Failed to render CSV: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"readings.csv\"",
            ),
        ],
        body,
    ))
}
