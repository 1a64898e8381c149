use lp_core::{BinaryDescriptor, Image, Keypoint, BINARY_DESCRIPTOR_SIZE};
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Number of intensity comparisons, one per descriptor bit.
pub const N_PAIRS: usize = BINARY_DESCRIPTOR_SIZE * 8;

/// Seed of the default sampling pattern.
pub const DEFAULT_PAIR_SEED: u64 = 0x5EED_B41E;

/// Sampling pair `(x1, y1, x2, y2)` relative to the keypoint.
pub type SamplePair = (i32, i32, i32, i32);

#[derive(Debug, Clone, PartialEq)]
pub struct BriefConfig {
    /// Side of the square sampling patch; also used for the orientation moments.
    pub patch_size: usize,
    /// Seed for drawing the sampling pattern.
    pub seed: u64,
}

impl Default for BriefConfig {
    fn default() -> Self {
        Self {
            patch_size: 31,
            seed: DEFAULT_PAIR_SEED,
        }
    }
}

/// Orientation of the patch around `(x, y)` from its intensity centroid.
///
/// Reads outside the image replicate the border. A flat patch yields 0.
pub fn intensity_centroid_angle(img: &Image, x: usize, y: usize, half: i32) -> f32 {
    let (cx, cy) = (x as i64, y as i64);
    let mut m10 = 0i64;
    let mut m01 = 0i64;

    for dy in -half..=half {
        for dx in -half..=half {
            let val = img.get_clamped(cx + dx as i64, cy + dy as i64) as i64;
            m10 += dx as i64 * val;
            m01 += dy as i64 * val;
        }
    }

    (m01 as f32).atan2(m10 as f32)
}

/// Steered BRIEF: 256 seeded point-pair comparisons rotated by the keypoint angle.
#[derive(Debug, Clone)]
pub struct BriefExtractor {
    cfg: BriefConfig,
    pairs: Vec<SamplePair>,
}

impl BriefExtractor {
    pub fn new(cfg: BriefConfig) -> Self {
        let pairs = generate_pairs(cfg.patch_size, cfg.seed);
        Self { cfg, pairs }
    }

    pub fn config(&self) -> &BriefConfig {
        &self.cfg
    }

    pub fn pairs(&self) -> &[SamplePair] {
        &self.pairs
    }

    /// Assigns an orientation to keypoints that have none, then describes them.
    pub fn compute(&self, img: &Image, kps: &mut [Keypoint]) -> Vec<BinaryDescriptor> {
        if img.is_empty() || kps.is_empty() {
            return Vec::new();
        }

        let half = (self.cfg.patch_size / 2) as f32;
        kps.par_iter_mut().filter(|kp| kp.angle.is_none()).for_each(|kp| {
            let (x, y) = kp.pixel(img.width(), img.height());
            let radius = (half * self.sampling_scale(kp)).round() as i32;
            kp.angle = Some(intensity_centroid_angle(img, x, y, radius));
        });

        kps.par_iter().map(|kp| self.describe_one(img, kp)).collect()
    }

    /// Factor from the base patch to the keypoint's neighbourhood.
    ///
    /// Keypoints no larger than the patch use the base pattern.
    pub fn sampling_scale(&self, kp: &Keypoint) -> f32 {
        if kp.size.is_finite() && kp.size > 0.0 {
            (kp.size / self.cfg.patch_size as f32).max(1.0)
        } else {
            1.0
        }
    }

    /// Descriptor of one keypoint; a missing angle is treated as 0.
    ///
    /// The pattern is rotated by the angle and stretched by [`Self::sampling_scale`].
    pub fn describe_one(&self, img: &Image, kp: &Keypoint) -> BinaryDescriptor {
        let (s, c) = kp.angle.unwrap_or(0.0).sin_cos();
        let k = self.sampling_scale(kp);
        let (s, c) = (s * k, c * k);
        let (cx, cy) = (kp.x, kp.y);
        let mut d = [0u8; BINARY_DESCRIPTOR_SIZE];

        for (i, &(dx1, dy1, dx2, dy2)) in self.pairs.iter().enumerate() {
            let (rx1, ry1) = (
                cx + c * dx1 as f32 - s * dy1 as f32,
                cy + s * dx1 as f32 + c * dy1 as f32,
            );
            let (rx2, ry2) = (
                cx + c * dx2 as f32 - s * dy2 as f32,
                cy + s * dx2 as f32 + c * dy2 as f32,
            );

            let bit = (box_sample(img, rx1, ry1) < box_sample(img, rx2, ry2)) as u8;
            d[i / 8] |= bit << (i % 8);
        }
        d
    }
}

impl Default for BriefExtractor {
    fn default() -> Self {
        Self::new(BriefConfig::default())
    }
}

/// Draws `N_PAIRS` sampling pairs uniformly inside the patch.
pub fn generate_pairs(patch_size: usize, seed: u64) -> Vec<SamplePair> {
    let half = (patch_size / 2).max(1) as i32;
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..N_PAIRS)
        .map(|_| {
            (
                rng.gen_range(-half..=half),
                rng.gen_range(-half..=half),
                rng.gen_range(-half..=half),
                rng.gen_range(-half..=half),
            )
        })
        .collect()
}

/// Mean of the 3x3 box around the nearest pixel, border replicated.
fn box_sample(img: &Image, x: f32, y: f32) -> u32 {
    let (px, py) = (x.round() as i64, y.round() as i64);
    let mut sum = 0u32;
    for dy in -1..=1 {
        for dx in -1..=1 {
            sum += img.get_clamped(px + dx, py + dy) as u32;
        }
    }
    // Comparing sums is equivalent to comparing means.
    sum
}
