/// Serial link to the sensor board and frame decoding
use log::{debug, error, info, warn};
use serde::Deserialize;
use serialport::{available_ports, SerialPort};
use std::io::{self, BufRead, BufReader};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::SerialConfig;
use crate::models::Reading;

const READ_TIMEOUT_MILLIS: u64 = 1000; // How long a single read may block
const RECONNECT_DELAY_SECS: u64 = 5; // Wait before reopening a failed port

/// One line of board output
///
/// The board prints a JSON object per line, every 3 seconds:
/// - `{"temp":72.5,"humidity":41.0,"air_quality":812,"timestamp":123456}`
/// - `{"status":"System initialized"}` once after boot
/// - `{"error":"Sensor read failed"}` when the DHT read returns NaN
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Frame {
    Reading {
        temp: f64,
        humidity: f64,
        air_quality: i32,
        timestamp: Option<u64>,
    },
    Status {
        status: String,
    },
    Error {
        error: String,
    },
}

/// Decode a single line of board output into a reading
///
/// Status and error frames are logged and skipped, as is anything that is
/// not valid JSON (boot noise, partial lines after reconnect). The reading
/// is stamped with the time it was received.
///
/// # Returns
/// Some(Reading) for a measurement frame, None otherwise
pub fn decode_frame(line: &str) -> Option<Reading> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match serde_json::from_str::<Frame>(line) {
        Ok(Frame::Reading {
            temp,
            humidity,
            air_quality,
            timestamp,
        }) => {
            let mut reading = Reading::new(temp, humidity, air_quality);
            reading.device_millis = timestamp;
            Some(reading)
        }
        Ok(Frame::Status { status }) => {
            info!("Sensor board status: {}", status);
            None
        }
        Ok(Frame::Error { error }) => {
            warn!("Sensor board reported error: {}", error);
            None
        }
        Err(_) => {
            debug!("Skipping undecodable line: {}", line);
            None
        }
    }
}

/// Open the configured port, or the first one the OS reports
fn open_port(config: &SerialConfig) -> Result<Box<dyn SerialPort>, Box<dyn std::error::Error>> {
    let port_path = match &config.port_path {
        Some(path) => path.clone(),
        None => available_ports()?
            .first()
            .map(|port| port.port_name.clone())
            .ok_or("No serial ports available")?,
    };

    info!("Connecting to {} at {} baud", port_path, config.baud_rate);

    let port = serialport::new(&port_path, config.baud_rate)
        .timeout(Duration::from_millis(READ_TIMEOUT_MILLIS))
        .open()?;

    Ok(port)
}

/// Forward decoded readings until the port fails or the receiver goes away
///
/// Returns Ok(()) once the receiving side has been dropped.
fn forward_lines<R: io::Read>(port: R, sender: &mpsc::Sender<Reading>) -> io::Result<()> {
    let mut reader = BufReader::new(port);
    let mut line = Vec::new();

    loop {
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "serial port closed",
                ))
            }
            Ok(_) if line.ends_with(b"\n") => {
                let decoded = decode_frame(&String::from_utf8_lossy(&line));
                line.clear();

                if let Some(reading) = decoded {
                    debug!(
                        "Received reading: temp={:.1}°F, humidity={:.1}%, air_quality={}",
                        reading.temperature, reading.humidity, reading.air_quality
                    );
                    if sender.blocking_send(reading).is_err() {
                        return Ok(());
                    }
                }
            }
            // Partial line, keep accumulating
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                if sender.is_closed() {
                    return Ok(());
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

/// Read the serial port forever, reconnecting after failures
///
/// Blocking: run it on a dedicated thread or `spawn_blocking`. Readings are
/// delivered in arrival order. The loop ends when the receiver is dropped.
pub fn read_serial(config: &SerialConfig, sender: mpsc::Sender<Reading>) {
    loop {
        match open_port(config) {
            Ok(port) => {
                info!("Connected. Reading data...");
                match forward_lines(port, &sender) {
                    Ok(()) => {
                        info!("Reading consumer stopped, closing serial port");
                        return;
                    }
                    Err(e) => error!("Serial read error: {}", e),
                }
            }
            Err(e) => {
                error!("Failed to open serial port: {}", e);
                if let Ok(ports) = available_ports() {
                    for port in ports {
                        debug!("Available port: {}", port.port_name);
                    }
                }
            }
        }

        if sender.is_closed() {
            return;
        }

        warn!("Reconnecting in {} seconds", RECONNECT_DELAY_SECS);
        std::thread::sleep(Duration::from_secs(RECONNECT_DELAY_SECS));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_reading_frame() {
        let reading =
            decode_frame(r#"{"temp":72.5,"humidity":41.0,"air_quality":812,"timestamp":123456}"#)
                .unwrap();

        assert_eq!(reading.temperature, 72.5);
        assert_eq!(reading.humidity, 41.0);
        assert_eq!(reading.air_quality, 812);
        assert_eq!(reading.device_millis, Some(123456));
    }

    #[test]
    fn test_decode_without_device_timestamp() {
        let reading = decode_frame("{\"temp\":70,\"humidity\":50,\"air_quality\":600}\r\n").unwrap();
        assert_eq!(reading.temperature, 70.0);
        assert_eq!(reading.device_millis, None);
    }

    #[test]
    fn test_skips_status_error_and_garbage() {
        assert!(decode_frame(r#"{"status":"System initialized"}"#).is_none());
        assert!(decode_frame(r#"{"error":"Sensor read failed"}"#).is_none());
        assert!(decode_frame("ets Jun  8 2016 00:22:57").is_none());
        assert!(decode_frame(r#"{"temp":72.5,"humid"#).is_none());
        assert!(decode_frame("   ").is_none());
    }

    #[test]
    fn test_forward_lines_in_order() {
        let input = b"boot noise\n{\"temp\":70,\"humidity\":50,\"air_quality\":600}\n{\"status\":\"ok\"}\n{\"temp\":71,\"humidity\":51,\"air_quality\":610}\n";
        let (tx, mut rx) = mpsc::channel(8);

        let result = forward_lines(&input[..], &tx);

        // EOF on an exhausted port is reported as a disconnect
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(rx.try_recv().unwrap().temperature, 70.0);
        assert_eq!(rx.try_recv().unwrap().temperature, 71.0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_forward_lines_stops_when_receiver_dropped() {
        let input = b"{\"temp\":70,\"humidity\":50,\"air_quality\":600}\n";
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        assert!(forward_lines(&input[..], &tx).is_ok());
    }
}
