use std::io::Write;

use serde::{Serialize, de::DeserializeOwned};

use crate::detector::DetectorConfig;
use crate::tracker::TrackerConfig;
use crate::types::PlatformState;

/// Detector and tracker settings together, for JSON round-tripping.
#[derive(Debug, Clone, Default, Serialize, serde::Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize>(output_path: &str, object: &T) -> std::io::Result<()> {
    let j = serde_json::to_string_pretty(object).map_err(std::io::Error::other)?;
    let mut file = std::fs::File::create(output_path)?;
    file.write_all(j.as_bytes())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: &str) -> std::io::Result<T> {
    let contents = std::fs::read_to_string(file_path)?;
    serde_json::from_str(&contents).map_err(std::io::Error::other)
}

#[derive(Debug, Serialize)]
pub struct PairReport {
    pub detected: usize,
    pub tracked: usize,
    pub pixel_displacement: f64,
    pub height_m: f64,
}

#[derive(Debug, Serialize)]
pub struct EstimationReport {
    pub timestamp: String,
    pub platform: PlatformState,
    pub elapsed_s: f64,
    pub pairs: Vec<PairReport>,
    pub mean_height_m: f64,
}

impl EstimationReport {
    pub fn new(platform: PlatformState, elapsed_s: f64, pairs: Vec<PairReport>) -> Self {
        use std::time::SystemTime;
        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let mean_height_m = if pairs.is_empty() {
            0.0
        } else {
            pairs.iter().map(|p| p.height_m).sum::<f64>() / pairs.len() as f64
        };
        EstimationReport {
            timestamp: timestamp.to_string(),
            platform,
            elapsed_s,
            pairs,
            mean_height_m,
        }
    }
}

/// Writes a human-readable estimation summary to a text file.
pub fn write_report(output_path: &str, report: &EstimationReport) -> std::io::Result<()> {
    let mut s = String::new();
    s += format!(
        "Platform: altitude {:.0} m, ground speed {:.0} m/s, {:.3} s between frames\n\n",
        report.platform.altitude, report.platform.ground_speed, report.elapsed_s
    )
    .as_str();
    for (pair_idx, pair) in report.pairs.iter().enumerate() {
        s += format!("pair{}:\n", pair_idx).as_str();
        s += format!(
            "    tracked features:   {} / {}\n",
            pair.tracked, pair.detected
        )
        .as_str();
        s += format!("    pixel displacement: {:.3} px\n", pair.pixel_displacement).as_str();
        s += format!("    cloud height:       {:.1} m\n\n", pair.height_m).as_str();
    }
    s += format!("mean cloud height: {:.1} m\n", report.mean_height_m).as_str();
    let mut file = std::fs::File::create(output_path)?;
    file.write_all(s.as_bytes())
}

/// Writes the full report as JSON.
pub fn write_detailed_report(output_path: &str, report: &EstimationReport) -> std::io::Result<()> {
    object_to_json(output_path, report)
}
