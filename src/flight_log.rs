use glob::glob;
use serde::Deserialize;
use thiserror::Error;

use crate::types::PlatformState;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("log file {path} is missing required columns (timestamp, height)")]
    MissingColumns { path: String },
    #[error("no suitable csv logs found under {0}")]
    NoLogs(String),
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// One row of the mission sensor log.
///
/// Extra columns (temperature, pressure, magnetometer...) are ignored, and
/// attitude columns default to zero when a log predates them.
#[derive(Debug, Clone, Deserialize)]
pub struct SensorRecord {
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub longitude: f64,
    pub latitude: f64,
    /// Platform altitude above the surface in meters.
    pub height: f64,
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub roll: f64,
    #[serde(default)]
    pub yaw: f64,
}

pub struct FlightLog {
    pub records: Vec<SensorRecord>,
}

impl FlightLog {
    /// Parses one sensor CSV. Headers are matched case-insensitively.
    pub fn from_csv(path: &str) -> Result<FlightLog, LogError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers: csv::StringRecord = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        if !headers.iter().any(|h| h == "timestamp") || !headers.iter().any(|h| h == "height") {
            return Err(LogError::MissingColumns {
                path: path.to_string(),
            });
        }
        reader.set_headers(headers);
        let records = reader.deserialize().collect::<Result<Vec<_>, _>>()?;
        Ok(FlightLog { records })
    }

    /// Concatenates every suitable CSV under a directory.
    ///
    /// Files without the expected headers are skipped, as the mission data
    /// directories also hold unrelated logs.
    pub fn from_directory(directory: &str) -> Result<FlightLog, LogError> {
        let mut records = Vec::new();
        for entry in glob(format!("{}/**/*.csv", directory).as_str())? {
            let Ok(path) = entry else { continue };
            let path_str = path.to_string_lossy().to_string();
            match Self::from_csv(&path_str) {
                Ok(mut log) => {
                    log::trace!("loaded {} records from {}", log.records.len(), path_str);
                    records.append(&mut log.records);
                }
                Err(e) => log::debug!("skipping {}: {}", path_str, e),
            }
        }
        if records.is_empty() {
            return Err(LogError::NoLogs(directory.to_string()));
        }
        records.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Ok(FlightLog { records })
    }

    /// The record closest in time to `timestamp` (seconds since epoch).
    pub fn closest_record(&self, timestamp: f64) -> Option<&SensorRecord> {
        self.records.iter().min_by(|a, b| {
            (a.timestamp - timestamp)
                .abs()
                .total_cmp(&(b.timestamp - timestamp).abs())
        })
    }

    /// Platform state at a capture time, keeping the given ground speed.
    pub fn platform_state_at(&self, timestamp: f64, ground_speed: f64) -> Option<PlatformState> {
        self.closest_record(timestamp).map(|r| PlatformState {
            altitude: r.height,
            ground_speed,
        })
    }
}
