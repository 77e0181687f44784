use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A sub-pixel feature location in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeaturePoint {
    pub p2d: Vec2,
}

impl FeaturePoint {
    pub fn new(x: f32, y: f32) -> FeaturePoint {
        FeaturePoint {
            p2d: Vec2::new(x, y),
        }
    }
}

/// One tracked correspondence between the two frames.
///
/// `p0` is the position in the first frame, `p1` the estimated position in
/// the second. When `status` is false the point could not be tracked and
/// `p1` carries no information.
#[derive(Debug, Clone, Copy)]
pub struct TrackedPoint {
    pub p0: Vec2,
    pub p1: Vec2,
    pub status: bool,
    pub err: f32,
}

impl TrackedPoint {
    pub fn displacement(&self) -> Vec2 {
        self.p1 - self.p0
    }

    pub fn failed(p0: Vec2) -> TrackedPoint {
        TrackedPoint {
            p0,
            p1: p0,
            status: false,
            err: f32::INFINITY,
        }
    }
}

/// Platform parameters for one estimation call.
///
/// Defaults are the ISS orbit values used by the original mission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlatformState {
    /// Altitude above the imaged surface in meters.
    pub altitude: f64,
    /// Ground speed in meters per second.
    pub ground_speed: f64,
}

impl Default for PlatformState {
    fn default() -> Self {
        Self {
            altitude: 408_000.0,
            ground_speed: 7_660.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum EstimationError {
    /// No usable correspondences: empty detection or total tracking failure.
    #[error("no usable tracked features between the two frames")]
    InsufficientFeatures,
    /// Non-positive ground distance, the parallax denominator would be invalid.
    #[error(
        "degenerate geometry: ground speed {ground_speed} m/s over {elapsed} s gives non-positive ground distance"
    )]
    DegenerateGeometry { ground_speed: f64, elapsed: f64 },
}
