mod api;
mod config;
mod database;
mod engine;
mod models;
mod serial;
mod utils;

use log::{error, info, warn};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, RwLock};

use api::{create_router, ApiState, LatestReading};
use config::MonitorConfig;
use database::{init_schema, store_reading};
use engine::{DecisionEngine, HealthMonitor, RollingHistory, Validator};
use models::Reading;
use serial::read_serial;
use utils::format_datetime;

const READING_QUEUE_SIZE: usize = 64;
const STORE_QUEUE_SIZE: usize = 256;

/// A reading paired with the validity bit it is stored with
type StoreRequest = (Reading, bool);

/// Validate and publish readings in arrival order, handing them off for storage
///
/// Invalid readings are stored too, flagged through `is_valid`, so degraded
/// data stays available for analysis. The hand-off never waits: when the
/// store queue is full or closed the reading is logged and dropped.
async fn ingest_loop(
    mut readings: mpsc::Receiver<Reading>,
    validator: Validator,
    latest: LatestReading,
    store: mpsc::Sender<StoreRequest>,
) {
    info!("Starting reading ingestion");

    while let Some(reading) = readings.recv().await {
        let verdict = validator.validate(reading.temperature, reading.humidity, reading.air_quality);

        info!(
            "[{}] Temp: {:.1}°F | Humidity: {:.1}% | AQ: {} | health: {:?}",
            format_datetime(&reading.timestamp),
            reading.temperature,
            reading.humidity,
            reading.air_quality,
            verdict.health
        );
        for issue in &verdict.issues {
            warn!("Validation issue: {}", issue);
        }

        *latest.write().await = Some(reading.clone());

        if let Err(e) = store.try_send((reading, verdict.valid)) {
            error!("Failed to queue reading for storage: {}", e);
        }
    }

    warn!("Serial reader stopped, no more readings will be ingested");
}

/// Write queued readings to the database one at a time
async fn persist_loop(mut requests: mpsc::Receiver<StoreRequest>, database_url: Arc<String>) {
    while let Some((reading, is_valid)) = requests.recv().await {
        if let Err(e) = store_reading(&reading, is_valid, &database_url).await {
            error!("Failed to store reading: {}", e);
        }
    }
}

async fn serve_api(config: MonitorConfig) -> Result<(), Box<dyn std::error::Error>> {
    init_schema(&config.database_url).await?;
    info!("Database initialized");

    // One history, two views: the validator writes it, the health monitor reads it
    let history = RollingHistory::shared();
    let validator = Validator::new(history.clone());
    let health_monitor = HealthMonitor::new(history);

    let latest: LatestReading = Arc::new(RwLock::new(None));
    let database_url = Arc::new(config.database_url.clone());

    let (tx, rx) = mpsc::channel(READING_QUEUE_SIZE);
    let (store_tx, store_rx) = mpsc::channel(STORE_QUEUE_SIZE);
    let serial_config = config.serial.clone();
    tokio::task::spawn_blocking(move || read_serial(&serial_config, tx));
    tokio::spawn(persist_loop(store_rx, database_url.clone()));
    tokio::spawn(ingest_loop(rx, validator, latest.clone(), store_tx));

    let app = create_router(ApiState {
        decision_engine: Arc::new(DecisionEngine::new()),
        health_monitor,
        latest,
        database_url,
    });

    let listener = TcpListener::bind(config.api_bind).await?;
    info!("API listening on {}", config.api_bind);

    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match MonitorConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    // Run the service or wait for shutdown signal
    tokio::select! {
        result = serve_api(config) => {
            match result {
                Ok(_) => info!("Program completed successfully"),
                Err(e) => error!("Fatal error: {}", e),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
