/// HTTP API consumed by the dashboard
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

use crate::engine::{DecisionEngine, HealthMonitor};
use crate::models::Reading;

pub mod handlers;

/// Most recent reading published by the ingestion loop
pub type LatestReading = Arc<RwLock<Option<Reading>>>;

#[derive(Clone)]
pub struct ApiState {
    pub decision_engine: Arc<DecisionEngine>,
    pub health_monitor: HealthMonitor,
    pub latest: LatestReading,
    pub database_url: Arc<String>,
}

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/latest", get(handlers::get_latest))
        .route("/api/readings", get(handlers::get_readings))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/health", get(handlers::get_health))
        .route("/api/export", get(handlers::export_csv))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
