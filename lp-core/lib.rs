mod error;
mod feature2d;

pub use error::{CoreError, CoreResult};
pub use feature2d::Feature2D;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Length of the local-peak gradient-histogram descriptor.
pub const FLOAT_DESCRIPTOR_SIZE: usize = 64;

/// Length in bytes of a 256-bit binary descriptor.
pub const BINARY_DESCRIPTOR_SIZE: usize = 32;

/// 64-float gradient-histogram descriptor
pub type FloatDescriptor = [f32; FLOAT_DESCRIPTOR_SIZE];

/// 256-bit binary descriptor = 32 bytes
pub type BinaryDescriptor = [u8; BINARY_DESCRIPTOR_SIZE];

/// Row-major 8-bit single-channel luminance image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Image {
    /// Wraps a row-major buffer, checking that its length matches the dimensions.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> CoreResult<Self> {
        let expected_len = width * height;
        if data.len() != expected_len {
            return Err(CoreError::InvalidImageData {
                expected_len,
                actual_len: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    /// Image with every pixel set to `value`.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Builds an image by evaluating `f(x, y)` for every pixel in raster order.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> u8) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, data }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of pixels.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Pixel at `(x, y)`. Panics when out of bounds, like slice indexing.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.data[y * self.width + x] = value;
    }

    /// Pixel at signed coordinates, replicating the border.
    #[inline]
    pub fn get_clamped(&self, x: i64, y: i64) -> u8 {
        let cx = x.clamp(0, self.width as i64 - 1) as usize;
        let cy = y.clamp(0, self.height as i64 - 1) as usize;
        self.get(cx, cy)
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }
}

/// Keypoint produced by a detector.
///
/// Local-peak keypoints carry integral coordinates and record the interrogation
/// window that produced them; baseline detectors leave `window_size` at zero.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Diameter of the meaningful neighbourhood, in pixels.
    pub size: f32,
    /// Orientation in radians; `None` until a descriptor stage assigns one.
    pub angle: Option<f32>,
    pub response: f32,
    /// Index of the window size that produced the keypoint.
    pub scale_index: usize,
    /// Interrogation window side length `L`, zero when not produced by a window search.
    pub window_size: usize,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, size: f32) -> Self {
        Self {
            x,
            y,
            size,
            angle: None,
            response: 0.0,
            scale_index: 0,
            window_size: 0,
        }
    }

    /// Spatial scale used by descriptors: the window size when known, otherwise the size.
    pub fn scale(&self) -> usize {
        if self.window_size > 0 {
            self.window_size
        } else {
            self.size.round().max(0.0) as usize
        }
    }

    /// Nearest pixel, clamped into a `width` x `height` image.
    pub fn pixel(&self, width: usize, height: usize) -> (usize, usize) {
        let x = self.x.round().clamp(0.0, width.saturating_sub(1) as f32) as usize;
        let y = self.y.round().clamp(0.0, height.saturating_sub(1) as f32) as usize;
        (x, y)
    }
}

/// Element type of a descriptor set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DescriptorKind {
    Float32,
    Binary,
}

/// Distance a matcher should use for a descriptor kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NormType {
    /// Euclidean distance over float descriptors.
    L2,
    /// Bit-count distance over binary descriptors.
    Hamming,
}

impl std::fmt::Display for NormType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormType::L2 => write!(f, "L2"),
            NormType::Hamming => write!(f, "Hamming"),
        }
    }
}

/// Descriptors for a keypoint list, one row per keypoint.
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptors {
    Float(Vec<FloatDescriptor>),
    Binary(Vec<BinaryDescriptor>),
}

impl Descriptors {
    /// Empty set of the given kind.
    pub fn empty(kind: DescriptorKind) -> Self {
        match kind {
            DescriptorKind::Float32 => Descriptors::Float(Vec::new()),
            DescriptorKind::Binary => Descriptors::Binary(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Descriptors::Float(rows) => rows.len(),
            Descriptors::Binary(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> DescriptorKind {
        match self {
            Descriptors::Float(_) => DescriptorKind::Float32,
            Descriptors::Binary(_) => DescriptorKind::Binary,
        }
    }
}

/// Image size class by pixel count, used to group benchmark results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SizeCategory {
    /// Below 1 MP
    Small,
    /// 1 to 3 MP
    Medium,
    /// 3 MP and above
    Large,
}

impl SizeCategory {
    pub const SMALL_LIMIT: u64 = 1_000_000;
    pub const MEDIUM_LIMIT: u64 = 3_000_000;

    pub fn from_dimensions(width: usize, height: usize) -> Self {
        let pixels = width as u64 * height as u64;
        if pixels < Self::SMALL_LIMIT {
            SizeCategory::Small
        } else if pixels < Self::MEDIUM_LIMIT {
            SizeCategory::Medium
        } else {
            SizeCategory::Large
        }
    }
}

impl std::fmt::Display for SizeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SizeCategory::Small => write!(f, "Small"),
            SizeCategory::Medium => write!(f, "Medium"),
            SizeCategory::Large => write!(f, "Large"),
        }
    }
}

/// Number of worker threads used when none is configured.
pub fn default_threads() -> usize {
    num_cpus::get().max(1)
}

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_length_validation() {
        assert!(Image::new(4, 4, vec![0; 16]).is_ok());
        let err = Image::new(4, 4, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidImageData {
                expected_len: 16,
                actual_len: 15
            }
        );
    }

    #[test]
    fn test_from_fn_is_row_major() {
        let img = Image::from_fn(3, 2, |x, y| (y * 3 + x) as u8);
        assert_eq!(img.as_raw(), &[0, 1, 2, 3, 4, 5]);
        assert_eq!(img.get(2, 1), 5);
        assert_eq!(img.get_clamped(-4, 9), 3);
    }

    #[test]
    fn test_empty_image() {
        let img = Image::filled(0, 0, 0);
        assert!(img.is_empty());
        assert_eq!(img.len(), 0);
    }

    #[test]
    fn test_keypoint_scale_prefers_window_size() {
        let mut kp = Keypoint::new(3.0, 4.0, 7.4);
        assert_eq!(kp.scale(), 7);
        kp.window_size = 32;
        assert_eq!(kp.scale(), 32);
        assert!(kp.angle.is_none());
    }

    #[test]
    fn test_keypoint_pixel_is_clamped() {
        let kp = Keypoint::new(-2.0, 11.6, 1.0);
        assert_eq!(kp.pixel(10, 10), (0, 9));
    }

    #[test]
    fn test_size_category_thresholds() {
        assert_eq!(SizeCategory::from_dimensions(602, 400), SizeCategory::Small);
        assert_eq!(SizeCategory::from_dimensions(1000, 999), SizeCategory::Small);
        assert_eq!(SizeCategory::from_dimensions(1000, 1000), SizeCategory::Medium);
        assert_eq!(SizeCategory::from_dimensions(1080, 1920), SizeCategory::Medium);
        assert_eq!(SizeCategory::from_dimensions(1500, 2000), SizeCategory::Large);
        assert_eq!(SizeCategory::from_dimensions(3072, 4096), SizeCategory::Large);
        assert_eq!(SizeCategory::Medium.to_string(), "Medium");
    }

    #[test]
    fn test_empty_descriptors_keep_kind() {
        let d = Descriptors::empty(DescriptorKind::Binary);
        assert!(d.is_empty());
        assert_eq!(d.kind(), DescriptorKind::Binary);
    }
}
