use clap::Parser;
use cloud_height_estimation::data_loader::{load_capture_folder, load_pair};
use cloud_height_estimation::detector::FeatureDetector;
use cloud_height_estimation::flight_log::FlightLog;
use cloud_height_estimation::io::{
    EstimationReport, PairReport, PipelineConfig, object_from_json, write_detailed_report,
    write_report,
};
use cloud_height_estimation::pyramid::GrayFrame;
use cloud_height_estimation::tracker::{MotionEstimator, height_from_displacement};
use cloud_height_estimation::types::PlatformState;
use std::path::Path;
use std::time::Instant;

#[derive(Parser)]
#[command(version, about, author)]
struct CHRSCli {
    /// first image of the pair, or a folder of timestamped captures
    path: String,

    /// second image of the pair (ignored when PATH is a folder)
    second: Option<String>,

    /// platform altitude above the surface in meters
    #[arg(long, default_value_t = 408000.0)]
    altitude: f64,

    /// platform ground speed in meters per second
    #[arg(long, default_value_t = 7660.0)]
    ground_speed: f64,

    /// seconds between the two captures (folder pairs use timestamps instead)
    #[arg(long, default_value_t = 1.0)]
    elapsed: f64,

    /// detector/tracker settings as json
    #[arg(long)]
    config: Option<String>,

    /// mission sensor csv (or a folder of them) for altitude lookup
    #[arg(long)]
    flight_log: Option<String>,

    /// write a text report here (a .json sibling is written as well)
    #[arg(long)]
    report: Option<String>,
}

fn main() {
    env_logger::init();
    let cli = CHRSCli::parse();

    let config: PipelineConfig = match &cli.config {
        Some(path) => object_from_json(path).expect("failed to read config json"),
        None => PipelineConfig::default(),
    };
    let detector = FeatureDetector::new(config.detector);
    let estimator = MotionEstimator::new(config.tracker);

    // (frame1, frame2, elapsed seconds, capture time of frame1)
    let mut pairs: Vec<(GrayFrame, GrayFrame, f64, f64)> = Vec::new();
    if Path::new(&cli.path).is_dir() {
        let frames = load_capture_folder(&cli.path).expect("failed to load capture folder");
        println!("loaded {} frames from {}", frames.len(), cli.path);
        for w in frames.windows(2) {
            let dt_ns = w[1].time_ns - w[0].time_ns;
            let elapsed = if dt_ns > 0 {
                dt_ns as f64 * 1e-9
            } else {
                cli.elapsed
            };
            pairs.push((
                w[0].frame.clone(),
                w[1].frame.clone(),
                elapsed,
                w[0].time_ns as f64 * 1e-9,
            ));
        }
    } else {
        let second = cli.second.as_ref().expect("need a second image or a folder");
        let (f1, f2) = load_pair(&cli.path, second).expect("failed to load image pair");
        pairs.push((f1, f2, cli.elapsed, 0.0));
    }

    let flight_log = cli
        .flight_log
        .as_ref()
        .map(|p| {
            if Path::new(p).is_dir() {
                FlightLog::from_directory(p)
            } else {
                FlightLog::from_csv(p)
            }
        })
        .transpose()
        .expect("failed to load flight log");

    let now = Instant::now();
    let mut reports = Vec::new();
    let mut platform = PlatformState {
        altitude: cli.altitude,
        ground_speed: cli.ground_speed,
    };
    for (pair_idx, (f1, f2, elapsed, capture_time)) in pairs.iter().enumerate() {
        if let Some(log) = &flight_log {
            if let Some(state) = log.platform_state_at(*capture_time, cli.ground_speed) {
                platform = state;
            }
        }
        let features = detector.detect(f1);
        log::info!("pair{}: {} features detected", pair_idx, features.len());
        let summary = match estimator.displacement_summary(f1, f2, &features) {
            Ok(summary) => summary,
            Err(e) => {
                println!("pair{}: estimation failed: {}", pair_idx, e);
                continue;
            }
        };
        match height_from_displacement(summary.pixel_displacement, f1.width, &platform, *elapsed) {
            Ok(height) => {
                println!(
                    "pair{}: estimated cloud height {:.1} m ({} / {} features tracked)",
                    pair_idx, height, summary.tracked, summary.detected
                );
                reports.push(PairReport {
                    detected: summary.detected,
                    tracked: summary.tracked,
                    pixel_displacement: summary.pixel_displacement,
                    height_m: height,
                });
            }
            Err(e) => println!("pair{}: estimation failed: {}", pair_idx, e),
        }
    }
    println!("estimation took {:.6} sec", now.elapsed().as_secs_f64());

    if let Some(report_path) = &cli.report {
        let report = EstimationReport::new(platform, cli.elapsed, reports);
        write_report(report_path, &report).expect("failed to write report");
        let json_path = format!("{}.json", report_path.trim_end_matches(".txt"));
        write_detailed_report(&json_path, &report).expect("failed to write json report");
        println!("report written to {}", report_path);
    }
}
