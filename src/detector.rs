use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::pyramid::GrayFrame;
use crate::types::FeaturePoint;

/// "Good features to track" detector parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Upper bound on the number of returned corners.
    pub max_corners: usize,
    /// Minimum corner strength as a fraction of the strongest response.
    pub quality_level: f32,
    /// Minimum pixel separation between any two returned corners.
    pub min_distance: f32,
    /// Neighborhood size of the gradient-structure sum.
    pub block_size: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_corners: 100,
            quality_level: 0.3,
            min_distance: 7.0,
            block_size: 7,
        }
    }
}

pub struct FeatureDetector {
    pub config: DetectorConfig,
}

impl FeatureDetector {
    pub fn new(config: DetectorConfig) -> FeatureDetector {
        FeatureDetector { config }
    }

    /// Detects up to `max_corners` well-separated high-contrast corners.
    ///
    /// Shi-Tomasi criterion: the minimum eigenvalue of the summed gradient
    /// structure tensor over a `block_size` neighborhood. Candidates above
    /// `quality_level` times the strongest response are selected greedily in
    /// descending strength order, each accepted corner suppressing remaining
    /// candidates within `min_distance`. Equal strengths break ties by scan
    /// order. A featureless frame yields an empty set.
    pub fn detect(&self, frame: &GrayFrame) -> Vec<FeaturePoint> {
        let w = frame.width;
        let h = frame.height;
        let radius = (self.config.block_size / 2).max(1);
        // one extra pixel so the central-difference gradients stay inside
        let margin = radius + 1;
        if w <= 2 * margin || h <= 2 * margin {
            return Vec::new();
        }

        let mut ix = vec![0.0f32; w * h];
        let mut iy = vec![0.0f32; w * h];
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let xi = x as isize;
                let yi = y as isize;
                ix[y * w + x] = (frame.at(xi + 1, yi) - frame.at(xi - 1, yi)) * 0.5;
                iy[y * w + x] = (frame.at(xi, yi + 1) - frame.at(xi, yi - 1)) * 0.5;
            }
        }

        let mut response = vec![0.0f32; w * h];
        response
            .par_chunks_mut(w)
            .enumerate()
            .for_each(|(y, row)| {
                if y < margin || y >= h - margin {
                    return;
                }
                for (x, out) in row.iter_mut().enumerate().take(w - margin).skip(margin) {
                    let mut sxx = 0.0f32;
                    let mut syy = 0.0f32;
                    let mut sxy = 0.0f32;
                    for dy in -(radius as isize)..=radius as isize {
                        for dx in -(radius as isize)..=radius as isize {
                            let idx = (y as isize + dy) as usize * w + (x as isize + dx) as usize;
                            let gx = ix[idx];
                            let gy = iy[idx];
                            sxx += gx * gx;
                            syy += gy * gy;
                            sxy += gx * gy;
                        }
                    }
                    *out = min_eigenvalue(sxx, sxy, syy);
                }
            });

        let max_response = response.iter().fold(0.0f32, |m, &r| m.max(r));
        if max_response <= 0.0 {
            return Vec::new();
        }
        let threshold = self.config.quality_level * max_response;

        // scan order preserved as the index so equal responses stay deterministic
        let mut candidates: Vec<(f32, usize)> = response
            .iter()
            .enumerate()
            .filter(|&(_, &r)| r > threshold)
            .map(|(idx, &r)| (r, idx))
            .collect();
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

        let min_dist_sq = self.config.min_distance * self.config.min_distance;
        let mut selected: Vec<FeaturePoint> = Vec::new();
        for &(_, idx) in &candidates {
            if selected.len() >= self.config.max_corners {
                break;
            }
            let p = glam::Vec2::new((idx % w) as f32, (idx / w) as f32);
            let too_close = selected
                .iter()
                .any(|s| s.p2d.distance_squared(p) < min_dist_sq);
            if !too_close {
                selected.push(FeaturePoint { p2d: p });
            }
        }
        selected
    }
}

fn min_eigenvalue(sxx: f32, sxy: f32, syy: f32) -> f32 {
    let trace_half = (sxx + syy) * 0.5;
    let diff_half = (sxx - syy) * 0.5;
    trace_half - (diff_half * diff_half + sxy * sxy).sqrt()
}
