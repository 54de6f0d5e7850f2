/// Database operations for storing and querying sensor readings
use crate::database::connection::execute_with_retry;
use crate::models::{Reading, StoredReading};

/// Attempts for schema setup at startup, 5 s apart
const SCHEMA_RETRIES: usize = 100;
/// Attempts per stored reading; a new reading arrives every few seconds
const STORE_RETRIES: usize = 2;
/// Attempts for queries answering an API request
const READ_RETRIES: usize = 3;

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 1000;

/// Create the readings table and its timestamp index if missing
pub async fn init_schema(database_url: &str) -> Result<(), String> {
    execute_with_retry(database_url, SCHEMA_RETRIES, |client| async move {
        client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS readings (
                     id BIGSERIAL PRIMARY KEY,
                     timestamp TIMESTAMPTZ NOT NULL,
                     temperature DOUBLE PRECISION NOT NULL,
                     humidity DOUBLE PRECISION NOT NULL,
                     air_quality INTEGER NOT NULL,
                     is_valid BOOLEAN NOT NULL DEFAULT TRUE,
                     created_at TIMESTAMPTZ NOT NULL DEFAULT now()
                 );
                 CREATE INDEX IF NOT EXISTS idx_readings_timestamp ON readings(timestamp);",
            )
            .await
    })
    .await
}

/// Store one reading together with its validity bit
///
/// # Arguments
/// * `reading` - Reading as received from the board
/// * `is_valid` - Validator verdict for this reading
/// * `database_url` - PostgreSQL connection string
pub async fn store_reading(
    reading: &Reading,
    is_valid: bool,
    database_url: &str,
) -> Result<(), String> {
    // Clone data for move into async closure
    let reading = reading.clone();

    execute_with_retry(database_url, STORE_RETRIES, move |client| {
        let reading = reading.clone();
        async move {
            client
                .execute(
                    "INSERT INTO readings(timestamp, temperature, humidity, air_quality, is_valid)
                     VALUES ($1, $2, $3, $4, $5)",
                    &[
                        &reading.timestamp,
                        &reading.temperature,
                        &reading.humidity,
                        &reading.air_quality,
                        &is_valid,
                    ],
                )
                .await
        }
    })
    .await
    .map(|_| ())
}

/// Fetch the `limit` most recently stored readings, newest first
///
/// Ordering follows insertion, not the reading timestamps.
pub async fn fetch_recent_readings(
    limit: i64,
    database_url: &str,
) -> Result<Vec<StoredReading>, String> {
    let limit = clamp_limit(Some(limit));

    execute_with_retry(database_url, READ_RETRIES, move |client| async move {
        let rows = client
            .query(
                "SELECT timestamp, temperature, humidity, air_quality, is_valid
                 FROM readings
                 ORDER BY id DESC
                 LIMIT $1",
                &[&limit],
            )
            .await?;

        let readings = rows
            .iter()
            .map(|row| StoredReading {
                timestamp: row.get(0),
                temperature: row.get(1),
                humidity: row.get(2),
                air_quality: row.get(3),
                is_valid: row.get(4),
            })
            .collect::<Vec<_>>();

        Ok::<_, tokio_postgres::Error>(readings)
    })
    .await
}

/// Clamp a requested row count into `[1, MAX_LIMIT]`
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}
