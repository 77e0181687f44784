use glam::Vec2;
use log::debug;
use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::pyramid::{GrayFrame, build_pyramid};
use crate::types::{EstimationError, FeaturePoint, PlatformState, TrackedPoint};

// below this the window normal equations are considered textureless
const MIN_GRADIENT_DET: f32 = 1e-8;
// an LK increment still this large at level 0 means the point diverged
const MAX_FINAL_INCREMENT: f32 = 1.0;

/// Pyramidal Lucas-Kanade parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Side of the square search window in pixels, should be odd.
    pub win_size: usize,
    /// Highest pyramid level, 0 means single-scale.
    pub max_level: usize,
    /// Per-level iteration cap.
    pub max_iterations: usize,
    /// Convergence bound on the incremental correction, in pixels.
    pub epsilon: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            win_size: 15,
            max_level: 2,
            max_iterations: 10,
            epsilon: 0.03,
        }
    }
}

pub struct MotionEstimator {
    pub config: TrackerConfig,
}

impl MotionEstimator {
    pub fn new(config: TrackerConfig) -> MotionEstimator {
        MotionEstimator { config }
    }

    /// Tracks `features` from `img1` into `img2`.
    ///
    /// Coarse-to-fine iterative patch alignment: per pyramid level the
    /// displacement is refined by solving the windowed normal equations until
    /// `epsilon` or `max_iterations`. A point that leaves the frame, sits in a
    /// textureless neighborhood, or diverges is flagged with `status == false`
    /// and never fails the whole call. The result is index-aligned with the
    /// input.
    pub fn track(
        &self,
        img1: &GrayFrame,
        img2: &GrayFrame,
        features: &[FeaturePoint],
    ) -> Vec<TrackedPoint> {
        if features.is_empty() {
            return Vec::new();
        }
        let pyr1 = build_pyramid(img1, self.config.max_level, self.config.win_size);
        let pyr2 = build_pyramid(img2, self.config.max_level, self.config.win_size);
        let levels = pyr1.len().min(pyr2.len());

        features
            .iter()
            .map(|f| self.track_point(&pyr1[..levels], &pyr2[..levels], f.p2d))
            .collect()
    }

    fn track_point(&self, pyr1: &[GrayFrame], pyr2: &[GrayFrame], p0: Vec2) -> TrackedPoint {
        let half = (self.config.win_size / 2) as isize;
        // displacement carried across levels, expressed at the current level
        let mut d = Vec2::ZERO;
        let mut last_increment = 0.0f32;

        for level in (0..pyr1.len()).rev() {
            let scale = (1u32 << level) as f32;
            let p = p0 / scale;
            let frame1 = &pyr1[level];
            let frame2 = &pyr2[level];

            if level == 0 && !window_in_bounds(frame1, p, half) {
                return TrackedPoint::failed(p0);
            }

            // gradient structure of the template window, fixed per level
            let mut sxx = 0.0f32;
            let mut syy = 0.0f32;
            let mut sxy = 0.0f32;
            for dy in -half..=half {
                for dx in -half..=half {
                    let (gx, gy) = frame1.gradient(p.x + dx as f32, p.y + dy as f32);
                    sxx += gx * gx;
                    syy += gy * gy;
                    sxy += gx * gy;
                }
            }
            let g = na::Matrix2::new(sxx, sxy, sxy, syy);
            if g.determinant().abs() < MIN_GRADIENT_DET {
                debug!("textureless window at level {level}, point {p0:?}");
                return TrackedPoint::failed(p0);
            }
            let g_inv = match g.try_inverse() {
                Some(inv) => inv,
                None => return TrackedPoint::failed(p0),
            };

            for _ in 0..self.config.max_iterations {
                let mut bx = 0.0f32;
                let mut by = 0.0f32;
                for dy in -half..=half {
                    for dx in -half..=half {
                        let x = p.x + dx as f32;
                        let y = p.y + dy as f32;
                        let (gx, gy) = frame1.gradient(x, y);
                        let diff = frame1.bilinear(x, y) - frame2.bilinear(x + d.x, y + d.y);
                        bx += diff * gx;
                        by += diff * gy;
                    }
                }
                let nu = g_inv * na::Vector2::new(bx, by);
                let step = Vec2::new(nu.x, nu.y);
                d += step;
                last_increment = step.length();
                if last_increment < self.config.epsilon {
                    break;
                }
            }

            if level > 0 {
                d *= 2.0;
            }
        }

        if last_increment > MAX_FINAL_INCREMENT {
            debug!("divergent track at point {p0:?}, last increment {last_increment}");
            return TrackedPoint::failed(p0);
        }
        let p1 = p0 + d;
        let frame2 = &pyr2[0];
        if p1.x < 0.0
            || p1.y < 0.0
            || p1.x > frame2.width as f32 - 1.0
            || p1.y > frame2.height as f32 - 1.0
            || !window_in_bounds(frame2, p1, half)
        {
            return TrackedPoint::failed(p0);
        }

        TrackedPoint {
            p0,
            p1,
            status: true,
            err: window_residual(&pyr1[0], frame2, p0, p1, half),
        }
    }

    /// Converts the tracked displacement of a frame pair into a cloud height.
    ///
    /// The horizontal image extent is assumed to cover one frame's worth of
    /// platform travel, which fixes the ground sampling distance to
    /// `ground_distance / width` meters per pixel. The returned height is not
    /// clamped or sanity-checked, implausible values are the caller's problem.
    pub fn estimate_height(
        &self,
        img1: &GrayFrame,
        img2: &GrayFrame,
        platform: &PlatformState,
        elapsed: f64,
        features: &[FeaturePoint],
    ) -> Result<f64, EstimationError> {
        // invalid platform parameters fail before any tracking work
        if platform.ground_speed * elapsed <= 0.0 {
            return Err(EstimationError::DegenerateGeometry {
                ground_speed: platform.ground_speed,
                elapsed,
            });
        }
        let pixel_displacement = self.mean_displacement(img1, img2, features)?;
        height_from_displacement(pixel_displacement, img1.width, platform, elapsed)
    }

    /// Norm of the mean displacement vector over successfully tracked points.
    pub fn mean_displacement(
        &self,
        img1: &GrayFrame,
        img2: &GrayFrame,
        features: &[FeaturePoint],
    ) -> Result<f64, EstimationError> {
        Ok(self
            .displacement_summary(img1, img2, features)?
            .pixel_displacement)
    }

    /// Aggregate displacement plus tracking counts, for reporting.
    pub fn displacement_summary(
        &self,
        img1: &GrayFrame,
        img2: &GrayFrame,
        features: &[FeaturePoint],
    ) -> Result<DisplacementSummary, EstimationError> {
        if features.is_empty() {
            return Err(EstimationError::InsufficientFeatures);
        }
        let tracked = self.track(img1, img2, features);
        let good: Vec<Vec2> = tracked
            .iter()
            .filter(|t| t.status)
            .map(|t| t.displacement())
            .collect();
        if good.is_empty() {
            return Err(EstimationError::InsufficientFeatures);
        }
        let mean = good.iter().copied().sum::<Vec2>() / good.len() as f32;
        debug!(
            "{} of {} points tracked, mean displacement ({:.3}, {:.3})",
            good.len(),
            tracked.len(),
            mean.x,
            mean.y
        );
        Ok(DisplacementSummary {
            pixel_displacement: mean.length() as f64,
            tracked: good.len(),
            detected: tracked.len(),
        })
    }
}

/// Mean-displacement norm together with how many points survived tracking.
#[derive(Debug, Clone, Copy)]
pub struct DisplacementSummary {
    pub pixel_displacement: f64,
    pub tracked: usize,
    pub detected: usize,
}

/// Parallax scaling from a pixel displacement to a height in meters.
pub fn height_from_displacement(
    pixel_displacement: f64,
    image_width: usize,
    platform: &PlatformState,
    elapsed: f64,
) -> Result<f64, EstimationError> {
    let ground_distance = platform.ground_speed * elapsed;
    if ground_distance <= 0.0 {
        return Err(EstimationError::DegenerateGeometry {
            ground_speed: platform.ground_speed,
            elapsed,
        });
    }
    let pixel_size = ground_distance / image_width as f64;
    let ground_displacement = pixel_displacement * pixel_size;
    Ok(platform.altitude * (ground_displacement / ground_distance))
}

fn window_in_bounds(frame: &GrayFrame, center: Vec2, half: isize) -> bool {
    let h = half as f32;
    center.x - h >= 0.0
        && center.y - h >= 0.0
        && center.x + h <= frame.width as f32 - 1.0
        && center.y + h <= frame.height as f32 - 1.0
}

fn window_residual(frame1: &GrayFrame, frame2: &GrayFrame, p0: Vec2, p1: Vec2, half: isize) -> f32 {
    let mut sum = 0.0f32;
    let mut n = 0u32;
    for dy in -half..=half {
        for dx in -half..=half {
            let dxf = dx as f32;
            let dyf = dy as f32;
            sum += (frame1.bilinear(p0.x + dxf, p0.y + dyf)
                - frame2.bilinear(p1.x + dxf, p1.y + dyf))
            .abs();
            n += 1;
        }
    }
    sum / n as f32
}
