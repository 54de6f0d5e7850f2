pub mod connection;
pub mod operations;

pub use operations::{clamp_limit, fetch_recent_readings, init_schema, store_reading};
