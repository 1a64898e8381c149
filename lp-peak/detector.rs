use lp_core::{Image, Keypoint};
use rayon::prelude::*;

use crate::config::PeakConfig;
use crate::error::PeakResult;
use crate::preprocessing::apply_linear_ramp;
use crate::refinement::{is_unique_in_neighbourhood, sort_by_response};
use crate::tiles::{tile_extrema, tile_grid};
use crate::types::{RampedImage, Tile};

/// Pyramid-free keypoint detector taking per-window intensity extrema.
///
/// For each configured window size `L` the image is split into `L x L` tiles
/// and the maximum and minimum of every tile (on the ramped working copy)
/// become keypoints carrying `window_size = L` and `response = max - min`.
#[derive(Debug, Clone)]
pub struct LocalPeakDetector {
    cfg: PeakConfig,
}

impl LocalPeakDetector {
    /// Creates a detector after validating the configuration
    pub fn new(cfg: PeakConfig) -> PeakResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    /// Detect keypoints over every configured window size.
    ///
    /// Output is grouped by window size in configuration order, tiles in
    /// row-major order within a group, unless `sort_by_response` is set.
    pub fn detect(&self, img: &Image) -> Vec<Keypoint> {
        if img.is_empty() {
            return Vec::new();
        }
        if self.cfg.window_sizes.is_empty() {
            log::debug!("no window sizes configured, nothing to detect");
            return Vec::new();
        }

        let ramped = apply_linear_ramp(img, self.cfg.linear_noise_alpha);

        let mut keypoints = Vec::new();
        for (scale_index, &window) in self.cfg.window_sizes.iter().enumerate() {
            if window == 0 {
                log::warn!("skipping window size 0 at index {}", scale_index);
                continue;
            }
            let found = self.detect_on_ramped(img, &ramped, window, scale_index);
            log::debug!("window {}: {} keypoints", window, found.len());
            keypoints.extend(found);
        }

        if self.cfg.sort_by_response {
            sort_by_response(&mut keypoints);
        }
        keypoints
    }

    /// Detect keypoints for a single window size, tagging them with `scale_index`.
    pub fn detect_window(&self, img: &Image, window: usize, scale_index: usize) -> Vec<Keypoint> {
        if img.is_empty() || window == 0 {
            return Vec::new();
        }
        let ramped = apply_linear_ramp(img, self.cfg.linear_noise_alpha);
        let mut keypoints = self.detect_on_ramped(img, &ramped, window, scale_index);
        if self.cfg.sort_by_response {
            sort_by_response(&mut keypoints);
        }
        keypoints
    }

    fn detect_on_ramped(
        &self,
        img: &Image,
        ramped: &RampedImage,
        window: usize,
        scale_index: usize,
    ) -> Vec<Keypoint> {
        let tiles: Vec<Tile> = tile_grid(img.width(), img.height(), window).collect();

        let per_tile: Vec<Vec<Keypoint>> = tiles
            .par_iter()
            .map(|tile| {
                let (max, min) = tile_extrema(ramped, tile);
                let response = (max.value - min.value) as f32;

                let mut candidates = Vec::with_capacity(2);
                candidates.push((max.x, max.y));
                if (min.x, min.y) != (max.x, max.y) {
                    candidates.push((min.x, min.y));
                }

                candidates
                    .into_iter()
                    .filter(|&(x, y)| !self.cfg.unique_peaks || is_unique_in_neighbourhood(img, x, y))
                    .map(|(x, y)| Keypoint {
                        x: x as f32,
                        y: y as f32,
                        size: window as f32,
                        angle: None,
                        response,
                        scale_index,
                        window_size: window,
                    })
                    .collect()
            })
            .collect();

        per_tile.into_iter().flatten().collect()
    }

    /// Get detector configuration
    pub fn config(&self) -> &PeakConfig {
        &self.cfg
    }
}
