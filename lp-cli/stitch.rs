use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use nalgebra::Matrix3;

use crate::homography::project;

/// Largest canvas the compositor will allocate.
pub const MAX_CANVAS_PIXELS: u64 = 100_000_000;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StitchError {
    #[error("homography maps the image corners to non-finite coordinates")]
    DegenerateHomography,

    #[error("stitched canvas {width}x{height} exceeds {} pixels", MAX_CANVAS_PIXELS)]
    CanvasTooLarge { width: u64, height: u64 },
}

/// Canvas size and the integer offset of the fixed image inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasLayout {
    pub width: u32,
    pub height: u32,
    pub offset_x: i64,
    pub offset_y: i64,
}

fn corners(width: u32, height: u32) -> [[f64; 2]; 4] {
    let (w, h) = (width as f64, height as f64);
    [[0.0, 0.0], [w, 0.0], [w, h], [0.0, h]]
}

/// Bounding box of the fixed image's corners and the moving image's corners
/// mapped through `h`, with the translation making it non-negative.
pub fn canvas_layout(
    fixed: (u32, u32),
    moving: (u32, u32),
    h: &Matrix3<f64>,
) -> Result<CanvasLayout, StitchError> {
    let mut min_x = f64::MAX;
    let mut min_y = f64::MAX;
    let mut max_x = f64::MIN;
    let mut max_y = f64::MIN;

    let warped = corners(moving.0, moving.1).map(|p| project(h, p[0], p[1]));
    for p in corners(fixed.0, fixed.1).iter().chain(warped.iter()) {
        if !p[0].is_finite() || !p[1].is_finite() {
            return Err(StitchError::DegenerateHomography);
        }
        min_x = min_x.min(p[0]);
        min_y = min_y.min(p[1]);
        max_x = max_x.max(p[0]);
        max_y = max_y.max(p[1]);
    }

    let offset_x = if min_x < 0.0 { (-min_x) as i64 } else { 0 };
    let offset_y = if min_y < 0.0 { (-min_y) as i64 } else { 0 };
    let width = (max_x - min_x + 1.0) as u64;
    let height = (max_y - min_y + 1.0) as u64;

    if width.saturating_mul(height) > MAX_CANVAS_PIXELS || width > u32::MAX as u64 || height > u32::MAX as u64 {
        return Err(StitchError::CanvasTooLarge { width, height });
    }

    Ok(CanvasLayout {
        width: width as u32,
        height: height as u32,
        offset_x,
        offset_y,
    })
}

/// Warps `moving` into the frame of `fixed` with `h` (moving → fixed
/// coordinates) and pastes `fixed` on top at its integer offset.
///
/// The fixed image is never resampled. No feathering is applied.
pub fn warp_and_blend(fixed: &RgbImage, moving: &RgbImage, h: &Matrix3<f64>) -> Result<RgbImage, StitchError> {
    let layout = canvas_layout(fixed.dimensions(), moving.dimensions(), h)?;

    let t = Matrix3::new(
        1.0, 0.0, layout.offset_x as f64,
        0.0, 1.0, layout.offset_y as f64,
        0.0, 0.0, 1.0,
    );
    let shifted = t * h;
    let mut m = [0.0f32; 9];
    for r in 0..3 {
        for c in 0..3 {
            m[r * 3 + c] = shifted[(r, c)] as f32;
        }
    }
    let projection = Projection::from_matrix(m).ok_or(StitchError::DegenerateHomography)?;

    let mut canvas = RgbImage::new(layout.width, layout.height);
    warp_into(moving, &projection, Interpolation::Bilinear, Rgb([0, 0, 0]), &mut canvas);
    image::imageops::replace(&mut canvas, fixed, layout.offset_x, layout.offset_y);

    log::debug!(
        "stitched canvas {}x{} (offset {}, {})",
        layout.width,
        layout.height,
        layout.offset_x,
        layout.offset_y
    );
    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translation(tx: f64, ty: f64) -> Matrix3<f64> {
        Matrix3::new(1.0, 0.0, tx, 0.0, 1.0, ty, 0.0, 0.0, 1.0)
    }

    #[test]
    fn test_identity_layout() {
        let layout = canvas_layout((40, 30), (40, 30), &Matrix3::identity()).unwrap();
        assert_eq!(
            layout,
            CanvasLayout {
                width: 41,
                height: 31,
                offset_x: 0,
                offset_y: 0
            }
        );
    }

    #[test]
    fn test_negative_translation_shifts_fixed_image() {
        let layout = canvas_layout((40, 30), (40, 30), &translation(-10.5, -5.0)).unwrap();
        assert_eq!(layout.offset_x, 10);
        assert_eq!(layout.offset_y, 5);
        assert_eq!(layout.width, 51);
        assert_eq!(layout.height, 36);
    }

    #[test]
    fn test_warp_and_blend_composites_both_images() {
        let fixed = RgbImage::from_pixel(40, 40, Rgb([10, 20, 30]));
        let moving = RgbImage::from_pixel(40, 40, Rgb([200, 150, 100]));
        let out = warp_and_blend(&fixed, &moving, &translation(10.0, 5.0)).unwrap();

        assert_eq!(out.dimensions(), (51, 46));
        // Fixed image on top
        assert_eq!(*out.get_pixel(5, 5), Rgb([10, 20, 30]));
        assert_eq!(*out.get_pixel(39, 39), Rgb([10, 20, 30]));
        // Warped moving image beyond the fixed one
        assert_eq!(*out.get_pixel(45, 20), Rgb([200, 150, 100]));
        // Uncovered canvas stays black
        assert_eq!(*out.get_pixel(45, 1), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_non_finite_corners_are_rejected() {
        // Maps the corner (40, 0) to infinity
        let h = Matrix3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, -0.025, 0.0, 1.0);
        let fixed = RgbImage::new(40, 40);
        assert_eq!(
            warp_and_blend(&fixed, &fixed, &h).unwrap_err(),
            StitchError::DegenerateHomography
        );
    }

    #[test]
    fn test_canvas_cap() {
        let h = Matrix3::new(1000.0, 0.0, 0.0, 0.0, 1000.0, 0.0, 0.0, 0.0, 1.0);
        let err = canvas_layout((100, 100), (100, 100), &h).unwrap_err();
        assert!(matches!(err, StitchError::CanvasTooLarge { .. }));
    }
}
