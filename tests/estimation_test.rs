use cloud_height_estimation::detector::{DetectorConfig, FeatureDetector};
use cloud_height_estimation::pyramid::GrayFrame;
use cloud_height_estimation::tracker::{MotionEstimator, TrackerConfig, height_from_displacement};
use cloud_height_estimation::types::{EstimationError, FeaturePoint, PlatformState};

fn textured_frame(width: usize, height: usize, shift_x: f32) -> GrayFrame {
    let data = (0..width * height)
        .map(|i| {
            let x = (i % width) as f32 - shift_x;
            let y = (i / width) as f32;
            0.5 + 0.25 * (x * 0.18).cos() * (y * 0.15).cos()
                + 0.15 * (x * 0.05).sin() * (y * 0.07).sin()
        })
        .collect();
    GrayFrame::from_raw(width, height, data)
}

fn iss_platform() -> PlatformState {
    PlatformState {
        altitude: 408_000.0,
        ground_speed: 7_660.0,
    }
}

#[test]
fn test_height_from_displacement_formula() {
    // height = altitude * d / width when elapsed covers one frame width
    let h = height_from_displacement(5.0, 1000, &iss_platform(), 1.0).unwrap();
    assert!((h - 2040.0).abs() < 1e-9);

    let h2 = height_from_displacement(0.0, 1000, &iss_platform(), 1.0).unwrap();
    assert_eq!(h2, 0.0);
}

#[test]
fn test_degenerate_geometry() {
    let frame = textured_frame(100, 100, 0.0);
    let features = vec![FeaturePoint::new(50.0, 50.0)];
    let estimator = MotionEstimator::new(TrackerConfig::default());

    let zero_elapsed =
        estimator.estimate_height(&frame, &frame, &iss_platform(), 0.0, &features);
    assert!(matches!(
        zero_elapsed,
        Err(EstimationError::DegenerateGeometry { .. })
    ));

    let zero_speed = estimator.estimate_height(
        &frame,
        &frame,
        &PlatformState {
            altitude: 408_000.0,
            ground_speed: 0.0,
        },
        1.0,
        &features,
    );
    assert!(matches!(
        zero_speed,
        Err(EstimationError::DegenerateGeometry { .. })
    ));

    let negative_elapsed =
        estimator.estimate_height(&frame, &frame, &iss_platform(), -2.0, &features);
    assert!(matches!(
        negative_elapsed,
        Err(EstimationError::DegenerateGeometry { .. })
    ));

    let direct = height_from_displacement(3.0, 1000, &iss_platform(), 0.0);
    assert!(matches!(
        direct,
        Err(EstimationError::DegenerateGeometry { .. })
    ));
}

#[test]
fn test_empty_feature_set_fails() {
    let frame = textured_frame(100, 100, 0.0);
    let estimator = MotionEstimator::new(TrackerConfig::default());
    let result = estimator.estimate_height(&frame, &frame, &iss_platform(), 1.0, &[]);
    assert!(matches!(result, Err(EstimationError::InsufficientFeatures)));
}

#[test]
fn test_total_tracking_failure_fails() {
    // nothing to lock onto, every point fails, which must surface as
    // InsufficientFeatures rather than a bogus number
    let frame = GrayFrame::from_raw(100, 100, vec![0.5; 100 * 100]);
    let features = vec![FeaturePoint::new(30.0, 30.0), FeaturePoint::new(60.0, 60.0)];
    let estimator = MotionEstimator::new(TrackerConfig::default());
    let result = estimator.estimate_height(&frame, &frame, &iss_platform(), 1.0, &features);
    assert!(matches!(result, Err(EstimationError::InsufficientFeatures)));
}

#[test]
fn test_scaling_identity() {
    // d-pixel shift at width 1000 must give height = 408000 * d / 1000
    let shift = 3.0f32;
    let frame1 = textured_frame(1000, 200, 0.0);
    let frame2 = textured_frame(1000, 200, shift);

    let detector = FeatureDetector::new(DetectorConfig::default());
    let features = detector.detect(&frame1);
    assert!(!features.is_empty());

    let estimator = MotionEstimator::new(TrackerConfig::default());
    let height = estimator
        .estimate_height(&frame1, &frame2, &iss_platform(), 1.0, &features)
        .unwrap();

    let expected = 408_000.0 * shift as f64 / 1000.0;
    assert!(
        (height - expected).abs() < expected * 0.02,
        "expected {} m, got {} m",
        expected,
        height
    );
}

#[test]
fn test_identical_pair_estimates_zero_height() {
    let frame = textured_frame(300, 200, 0.0);
    let detector = FeatureDetector::new(DetectorConfig::default());
    let features = detector.detect(&frame);
    let estimator = MotionEstimator::new(TrackerConfig::default());
    let height = estimator
        .estimate_height(&frame, &frame, &iss_platform(), 1.0, &features)
        .unwrap();
    assert!(height.abs() < 1.0, "got {} m for a static pair", height);
}

#[test]
fn test_estimation_is_idempotent() {
    let frame1 = textured_frame(300, 200, 0.0);
    let frame2 = textured_frame(300, 200, 2.0);
    let detector = FeatureDetector::new(DetectorConfig::default());
    let features = detector.detect(&frame1);
    let estimator = MotionEstimator::new(TrackerConfig::default());

    let a = estimator
        .estimate_height(&frame1, &frame2, &iss_platform(), 1.0, &features)
        .unwrap();
    let b = estimator
        .estimate_height(&frame1, &frame2, &iss_platform(), 1.0, &features)
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_displacement_summary_counts() {
    let shift = 3.0f32;
    let frame1 = textured_frame(300, 200, 0.0);
    let frame2 = textured_frame(300, 200, shift);
    let detector = FeatureDetector::new(DetectorConfig::default());
    let features = detector.detect(&frame1);
    let estimator = MotionEstimator::new(TrackerConfig::default());

    let summary = estimator
        .displacement_summary(&frame1, &frame2, &features)
        .unwrap();
    assert_eq!(summary.detected, features.len());
    assert!(summary.tracked > 0 && summary.tracked <= summary.detected);
    assert!((summary.pixel_displacement - shift as f64).abs() < 0.1);

    // the scalar helper reports the same aggregate
    let displacement = estimator
        .mean_displacement(&frame1, &frame2, &features)
        .unwrap();
    assert_eq!(displacement, summary.pixel_displacement);

    let empty = estimator.displacement_summary(&frame1, &frame2, &[]);
    assert!(matches!(empty, Err(EstimationError::InsufficientFeatures)));
}

#[test]
fn test_output_is_not_clamped() {
    // a displacement larger than the frame travel maps above the platform,
    // the core reports it as-is
    let h = height_from_displacement(1500.0, 1000, &iss_platform(), 1.0).unwrap();
    assert!(h > 408_000.0);
}
