//! Gradient-histogram descriptor for local-peak keypoints.
//!
//! A `2r x 2r` neighbourhood around each keypoint is split into a 4x4 grid of
//! cells and each cell accumulates a 4-bin histogram of signed gradients:
//! positive dx, positive dy, negative dx, negative dy. The 16 histograms are
//! concatenated into 64 floats and normalized SIFT-style.

use lp_core::{FloatDescriptor, Image, Keypoint, FLOAT_DESCRIPTOR_SIZE};
use lp_peak::{tile_containing, Tile};
use rayon::prelude::*;

/// Spatial cells per side.
pub const GRID_SIZE: usize = 4;

/// Gradient bins per cell.
pub const BINS_PER_CELL: usize = 4;

/// Norms at or below this are treated as zero and left unnormalized.
pub const NORM_EPSILON: f32 = 1e-7;

/// Descriptor parameters
#[derive(Debug, Clone, PartialEq)]
pub struct HistConfig {
    /// `hist_width = radius_scale * sqrt(L)`
    pub radius_scale: f32,
    /// Lower bound on the radius, in pixels
    pub min_radius: usize,
    /// Saturation level applied after the first normalization
    pub clip_ratio: f32,
}

impl Default for HistConfig {
    fn default() -> Self {
        Self {
            radius_scale: 3.0,
            min_radius: 4,
            clip_ratio: 0.2,
        }
    }
}

impl HistConfig {
    /// Histogram radius for window size `window` inside a `tile_w x tile_h` tile.
    ///
    /// `round(radius_scale * sqrt(L) * 4)`, clamped to `[min_radius, round(tile diagonal)]`.
    pub fn descriptor_radius(&self, window: usize, tile_w: usize, tile_h: usize) -> usize {
        let hist_width = self.radius_scale * (window as f32).sqrt();
        let radius = (hist_width * GRID_SIZE as f32).round() as usize;
        let diagonal = ((tile_w * tile_w + tile_h * tile_h) as f32).sqrt().round() as usize;
        radius.max(self.min_radius).min(diagonal.max(1))
    }
}

/// L2-normalize, clip every component to `[-clip_ratio, clip_ratio]`, re-normalize.
///
/// Either normalization is skipped when the norm is at most `NORM_EPSILON`.
pub fn normalize_and_clip(desc: &mut FloatDescriptor, clip_ratio: f32) {
    let norm = l2_norm(desc);
    if norm <= NORM_EPSILON {
        return;
    }
    for v in desc.iter_mut() {
        *v = (*v / norm).clamp(-clip_ratio, clip_ratio);
    }

    let norm = l2_norm(desc);
    if norm <= NORM_EPSILON {
        return;
    }
    for v in desc.iter_mut() {
        *v /= norm;
    }
}

fn l2_norm(desc: &FloatDescriptor) -> f32 {
    desc.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// Computes 64-float descriptors for local-peak keypoints.
#[derive(Debug, Clone, Default)]
pub struct HistogramDescriptor {
    cfg: HistConfig,
}

impl HistogramDescriptor {
    pub fn new(cfg: HistConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &HistConfig {
        &self.cfg
    }

    /// One descriptor per keypoint, in keypoint order.
    pub fn compute(&self, img: &Image, kps: &[Keypoint]) -> Vec<FloatDescriptor> {
        if img.is_empty() || kps.is_empty() {
            return Vec::new();
        }
        kps.par_iter().map(|kp| self.describe_one(img, kp)).collect()
    }

    /// Descriptor of a single keypoint.
    ///
    /// Keypoints without a window size use their rounded size as the scale.
    /// A scale of zero, or a tile with a side of two pixels or less, yields the
    /// zero vector.
    pub fn describe_one(&self, img: &Image, kp: &Keypoint) -> FloatDescriptor {
        let mut desc = [0.0f32; FLOAT_DESCRIPTOR_SIZE];
        if img.is_empty() {
            return desc;
        }

        let window = kp.scale();
        let (x, y) = kp.pixel(img.width(), img.height());
        let tile = match tile_containing(img.width(), img.height(), window, x, y) {
            Some(tile) => tile,
            None => return desc,
        };
        if tile.width() <= 2 || tile.height() <= 2 {
            log::trace!("degenerate tile {:?} for keypoint at ({}, {})", tile, x, y);
            return desc;
        }

        let radius = self.cfg.descriptor_radius(window, tile.width(), tile.height());
        accumulate_histograms(img, &tile, x, y, radius, &mut desc);
        normalize_and_clip(&mut desc, self.cfg.clip_ratio);
        desc
    }
}

/// Fills `desc` with the raw cell histograms around `(x, y)`.
fn accumulate_histograms(
    img: &Image,
    tile: &Tile,
    x: usize,
    y: usize,
    radius: usize,
    desc: &mut FloatDescriptor,
) {
    let side = 2 * radius as i64;
    let nx0 = x as i64 - radius as i64;
    let ny0 = y as i64 - radius as i64;

    // Gradient support: one pixel in from every tile edge.
    let (ix0, ix1) = (tile.x0 as i64 + 1, tile.x1 as i64 - 1);
    let (iy0, iy1) = (tile.y0 as i64 + 1, tile.y1 as i64 - 1);

    let bound = |i: usize| i as i64 * side / GRID_SIZE as i64;

    for ii in 0..GRID_SIZE {
        let cy0 = (ny0 + bound(ii)).max(iy0);
        let cy1 = (ny0 + bound(ii + 1)).min(iy1);
        for jj in 0..GRID_SIZE {
            let cx0 = (nx0 + bound(jj)).max(ix0);
            let cx1 = (nx0 + bound(jj + 1)).min(ix1);
            let hist = &mut desc[(ii * GRID_SIZE + jj) * BINS_PER_CELL..][..BINS_PER_CELL];

            for py in cy0..cy1 {
                let py = py as usize;
                for px in cx0..cx1 {
                    let px = px as usize;
                    let dx = img.get(px + 1, py) as f32 - img.get(px - 1, py) as f32;
                    let dy = img.get(px, py - 1) as f32 - img.get(px, py + 1) as f32;
                    if dx >= 0.0 {
                        hist[0] += dx;
                    } else {
                        hist[2] += dx;
                    }
                    if dy >= 0.0 {
                        hist[1] += dy;
                    } else {
                        hist[3] += dy;
                    }
                }
            }
        }
    }
}
