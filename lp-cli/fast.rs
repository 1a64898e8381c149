use lp_core::{Image, Keypoint};
use rayon::prelude::*;

/// FAST circle offsets for corner detection
pub const FAST_OFFSETS: [(i32, i32); 16] = [
    (0, -3), (1, -3), (2, -2), (3, -1),
    (3, 0), (3, 1), (2, 2), (1, 3),
    (0, 3), (-1, 3), (-2, 2), (-3, 1),
    (-3, 0), (-3, -1), (-2, -2), (-1, -3),
];

/// Circle radius; pixels closer than this to the border are never tested.
const BORDER: usize = 3;

/// Diameter assigned to FAST keypoints, matching the BRIEF patch.
pub const FAST_KEYPOINT_SIZE: f32 = 31.0;

#[derive(Debug, Clone, PartialEq)]
pub struct FastConfig {
    /// Intensity difference a circle pixel needs to count as brighter or darker
    pub threshold: u8,
    /// Contiguous circle pixels required for a corner
    pub arc_length: usize,
    /// Minimum distance between surviving corners
    pub nms_radius: f32,
}

impl Default for FastConfig {
    fn default() -> Self {
        Self {
            threshold: 20,
            arc_length: 9,
            nms_radius: 3.0,
        }
    }
}

/// Single-scale FAST segment-test corner detector.
#[derive(Debug, Clone, Default)]
pub struct FastDetector {
    cfg: FastConfig,
}

impl FastDetector {
    pub fn new(cfg: FastConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &FastConfig {
        &self.cfg
    }

    /// Corners after non-maximum suppression, strongest first.
    pub fn detect(&self, img: &Image) -> Vec<Keypoint> {
        let scored = self.detect_with_response(img);
        non_maximum_suppression(&scored, self.cfg.nms_radius)
    }

    /// Every pixel passing the segment test, in raster order, with its response.
    pub fn detect_with_response(&self, img: &Image) -> Vec<Keypoint> {
        let (w, h) = (img.width(), img.height());
        if w < 2 * BORDER + 1 || h < 2 * BORDER + 1 {
            return Vec::new();
        }

        let rows: Vec<Vec<Keypoint>> = (BORDER..h - BORDER)
            .into_par_iter()
            .map(|y| {
                let mut row = Vec::new();
                for x in BORDER..w - BORDER {
                    if let Some(response) = self.corner_response(img, x, y) {
                        let mut kp = Keypoint::new(x as f32, y as f32, FAST_KEYPOINT_SIZE);
                        kp.response = response;
                        row.push(kp);
                    }
                }
                row
            })
            .collect();

        rows.into_iter().flatten().collect()
    }

    /// Segment test at `(x, y)`; returns the corner response when it passes.
    fn corner_response(&self, img: &Image, x: usize, y: usize) -> Option<f32> {
        let center = img.get(x, y) as i32;
        let t = self.cfg.threshold as i32;

        let mut brighter = [false; 16];
        let mut darker = [false; 16];
        for (i, &(dx, dy)) in FAST_OFFSETS.iter().enumerate() {
            let p = img.get((x as i32 + dx) as usize, (y as i32 + dy) as usize) as i32;
            brighter[i] = p > center + t;
            darker[i] = p < center - t;
        }

        if !has_consecutive_pixels(&brighter, self.cfg.arc_length)
            && !has_consecutive_pixels(&darker, self.cfg.arc_length)
        {
            return None;
        }
        Some(intensity_response(img, x, y, self.cfg.threshold))
    }
}

/// Mean squared difference to the centre over circle pixels beyond the threshold.
fn intensity_response(img: &Image, x: usize, y: usize, threshold: u8) -> f32 {
    let center = img.get(x, y) as f32;
    let mut sum_diff = 0.0f32;
    let mut count = 0;

    for &(dx, dy) in FAST_OFFSETS.iter() {
        let pixel = img.get((x as i32 + dx) as usize, (y as i32 + dy) as usize) as f32;
        let diff = (center - pixel).abs();
        if diff > threshold as f32 {
            sum_diff += diff * diff;
            count += 1;
        }
    }

    if count > 0 {
        sum_diff / count as f32
    } else {
        0.0
    }
}

/// True when the circular array holds a run of at least `min_count` set entries.
pub fn has_consecutive_pixels(pixels: &[bool; 16], min_count: usize) -> bool {
    if min_count > 16 || min_count == 0 {
        return false;
    }

    let mut mask: u16 = 0;
    for (i, &pixel) in pixels.iter().enumerate() {
        if pixel {
            mask |= 1 << i;
        }
    }

    // AND of the mask with its rotations leaves a bit set only at the start of a long enough run
    let mut test_mask = mask;
    for i in 1..min_count {
        test_mask &= mask.rotate_right(i as u32);
        if test_mask == 0 {
            return false;
        }
    }
    test_mask != 0
}

/// Greedy radius suppression: strongest first, dropping anything closer than
/// `min_distance` to an accepted keypoint.
pub fn non_maximum_suppression(keypoints: &[Keypoint], min_distance: f32) -> Vec<Keypoint> {
    if keypoints.is_empty() {
        return Vec::new();
    }

    let mut sorted = keypoints.to_vec();
    sorted.sort_by(|a, b| b.response.partial_cmp(&a.response).unwrap_or(std::cmp::Ordering::Equal));

    let min_distance_sq = min_distance * min_distance;
    let mut accepted: Vec<Keypoint> = Vec::new();

    for candidate in sorted {
        let too_close = accepted.iter().any(|kp| {
            let dx = candidate.x - kp.x;
            let dy = candidate.y - kp.y;
            dx * dx + dy * dy < min_distance_sq
        });
        if !too_close {
            accepted.push(candidate);
        }
    }

    accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_image(width: usize, height: usize) -> Image {
        Image::filled(width, height, 128)
    }

    fn create_corner_image(width: usize, height: usize) -> Image {
        // Bright square in the lower-right quadrant
        Image::from_fn(width, height, |x, y| {
            if x >= width / 2 && y >= height / 2 {
                230
            } else {
                40
            }
        })
    }

    fn create_multiple_corners_image(width: usize, height: usize) -> Image {
        Image::from_fn(width, height, |x, y| {
            let in_block = |cx: usize, cy: usize| x >= cx && x < cx + 8 && y >= cy && y < cy + 8;
            if in_block(10, 10) || in_block(30, 12) || in_block(14, 32) {
                220
            } else {
                30
            }
        })
    }

    #[test]
    fn test_consecutive_pixels_simple() {
        let mut pixels = [false; 16];
        for p in pixels.iter_mut().take(9) {
            *p = true;
        }
        assert!(has_consecutive_pixels(&pixels, 9));
        assert!(!has_consecutive_pixels(&pixels, 10));
    }

    #[test]
    fn test_consecutive_pixels_wrap_around() {
        let mut pixels = [false; 16];
        for i in [12, 13, 14, 15, 0, 1, 2, 3, 4] {
            pixels[i] = true;
        }
        assert!(has_consecutive_pixels(&pixels, 9));
    }

    #[test]
    fn test_non_consecutive_pixels() {
        let mut pixels = [false; 16];
        for i in (0..16).step_by(2) {
            pixels[i] = true;
        }
        assert!(!has_consecutive_pixels(&pixels, 2));
        assert!(has_consecutive_pixels(&pixels, 1));
        assert!(!has_consecutive_pixels(&pixels, 0));
    }

    #[test]
    fn test_uniform_image_has_no_corners() {
        let img = create_test_image(20, 20);
        assert!(FastDetector::default().detect(&img).is_empty());
    }

    #[test]
    fn test_too_small_image() {
        let img = create_corner_image(6, 6);
        assert!(FastDetector::default().detect(&img).is_empty());
    }

    #[test]
    fn test_corner_detection() {
        let img = create_corner_image(20, 20);
        let kps = FastDetector::default().detect(&img);
        assert!(!kps.is_empty());
        // The strongest response sits at the square's corner
        let best = &kps[0];
        assert!((best.x - 10.0).abs() <= 1.0 && (best.y - 10.0).abs() <= 1.0);
        assert!(kps.iter().all(|k| k.angle.is_none() && k.window_size == 0));
    }

    #[test]
    fn test_non_maximum_suppression() {
        let img = create_multiple_corners_image(50, 50);
        let det = FastDetector::default();
        let scored = det.detect_with_response(&img);
        let suppressed = non_maximum_suppression(&scored, 5.0);

        assert!(!suppressed.is_empty());
        assert!(suppressed.len() <= scored.len());
        for i in 0..suppressed.len() {
            for j in (i + 1)..suppressed.len() {
                let dx = suppressed[i].x - suppressed[j].x;
                let dy = suppressed[i].y - suppressed[j].y;
                assert!((dx * dx + dy * dy).sqrt() >= 5.0);
            }
        }
    }

    #[test]
    fn test_response_scoring() {
        let img = create_corner_image(20, 20);
        for kp in FastDetector::default().detect_with_response(&img) {
            assert!(kp.response > 0.0);
            assert!(kp.response.is_finite());
        }
    }
}
