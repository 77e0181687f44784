use cloud_height_estimation::detector::{DetectorConfig, FeatureDetector};
use cloud_height_estimation::pyramid::GrayFrame;
use cloud_height_estimation::tracker::{MotionEstimator, TrackerConfig};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

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

fn bench_detect(c: &mut Criterion) {
    let frame = textured_frame(320, 240, 0.0);
    let detector = FeatureDetector::new(DetectorConfig::default());

    c.bench_function("detect_features_320x240", |b| {
        b.iter(|| detector.detect(black_box(&frame)))
    });
}

fn bench_track(c: &mut Criterion) {
    let frame1 = textured_frame(320, 240, 0.0);
    let frame2 = textured_frame(320, 240, 3.0);
    let detector = FeatureDetector::new(DetectorConfig::default());
    let features = detector.detect(&frame1);
    let estimator = MotionEstimator::new(TrackerConfig::default());

    c.bench_function("track_320x240", |b| {
        b.iter(|| estimator.track(black_box(&frame1), black_box(&frame2), black_box(&features)))
    });
}

criterion_group!(benches, bench_detect, bench_track);
criterion_main!(benches);
