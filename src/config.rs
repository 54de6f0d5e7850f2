use log::info;
use std::env;
use std::net::SocketAddr;

const DEFAULT_BAUD_RATE: u32 = 115200;
const DEFAULT_API_BIND: &str = "0.0.0.0:5000";

#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Device path; the first available port is used when unset
    pub port_path: Option<String>,
    pub baud_rate: u32,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub serial: SerialConfig,
    pub database_url: String,
    pub api_bind: SocketAddr,
}

impl MonitorConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL environment variable not set")?;

        let port_path = env::var("SERIAL_PORT")
            .ok()
            .map(|path| path.trim().to_string())
            .filter(|path| !path.is_empty());

        let baud_rate = match env::var("SERIAL_BAUD") {
            Ok(value) => value
                .trim()
                .parse::<u32>()
                .map_err(|e| format!("Invalid SERIAL_BAUD '{}': {}", value, e))?,
            Err(_) => DEFAULT_BAUD_RATE,
        };

        let api_bind = env::var("API_BIND")
            .unwrap_or_else(|_| DEFAULT_API_BIND.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| format!("Invalid API_BIND: {}", e))?;

        match &port_path {
            Some(path) => info!("Serial port: {} @ {} baud", path, baud_rate),
            None => info!("SERIAL_PORT not set, using first available port @ {} baud", baud_rate),
        }
        info!("API will listen on {}", api_bind);

        Ok(MonitorConfig {
            serial: SerialConfig {
                port_path,
                baud_rate,
            },
            database_url,
            api_bind,
        })
    }
}
