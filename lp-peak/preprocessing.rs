use lp_core::Image;
use crate::types::RampedImage;

/// Adds `alpha * (y * width + x)` to every pixel of a float copy of `img`.
///
/// The ramp is strictly increasing in raster order, so equal intensities at
/// different positions become distinct and every tile has a unique maximum
/// and minimum. The result is injective as long as `alpha * width * height < 1`,
/// i.e. the ramp never spans one intensity step.
///
/// Returns the unmodified float copy when `alpha <= 0` or the image is empty.
/// The original image is left untouched; uniqueness checks must read it, not
/// this working copy.
pub fn apply_linear_ramp(img: &Image, alpha: f32) -> RampedImage {
    let width = img.width();
    let height = img.height();
    let mut data: Vec<f64> = img.as_raw().iter().map(|&v| v as f64).collect();

    if alpha > 0.0 && !data.is_empty() {
        let alpha = alpha as f64;
        for (idx, value) in data.iter_mut().enumerate() {
            *value += alpha * idx as f64;
        }
    }

    RampedImage { width, height, data }
}
