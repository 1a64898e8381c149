//! `Feature2D` facades pairing a detector with a descriptor extractor.

use lp_brief::{BriefConfig, BriefExtractor};
use lp_core::{
    CoreResult, DescriptorKind, Descriptors, Feature2D, Image, Keypoint, NormType, BINARY_DESCRIPTOR_SIZE,
    FLOAT_DESCRIPTOR_SIZE,
};
use lp_hist::{HistConfig, HistogramDescriptor};
use lp_peak::{LocalPeakDetector, PeakConfig};

use crate::fast::{FastConfig, FastDetector};

/// Local-peak keypoints with the 64-d gradient-histogram descriptor.
#[derive(Debug, Clone)]
pub struct LpSift {
    detector: LocalPeakDetector,
    descriptor: HistogramDescriptor,
}

impl LpSift {
    pub const NAME: &'static str = "LP-SIFT";

    pub fn new(cfg: PeakConfig) -> CoreResult<Self> {
        Self::with_hist_config(cfg, HistConfig::default())
    }

    pub fn with_hist_config(cfg: PeakConfig, hist: HistConfig) -> CoreResult<Self> {
        Ok(Self {
            detector: LocalPeakDetector::new(cfg)?,
            descriptor: HistogramDescriptor::new(hist),
        })
    }

    pub fn with_window_sizes(window_sizes: Vec<usize>) -> CoreResult<Self> {
        Self::new(PeakConfig::with_window_sizes(window_sizes))
    }

    pub fn peak_config(&self) -> &PeakConfig {
        self.detector.config()
    }
}

impl Feature2D for LpSift {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn descriptor_size(&self) -> usize {
        FLOAT_DESCRIPTOR_SIZE
    }

    fn descriptor_kind(&self) -> DescriptorKind {
        DescriptorKind::Float32
    }

    fn default_norm(&self) -> NormType {
        NormType::L2
    }

    fn detect(&self, image: &Image) -> CoreResult<Vec<Keypoint>> {
        Ok(self.detector.detect(image))
    }

    fn compute(&self, image: &Image, keypoints: &mut Vec<Keypoint>) -> CoreResult<Descriptors> {
        if image.is_empty() || keypoints.is_empty() {
            return Ok(Descriptors::empty(DescriptorKind::Float32));
        }
        Ok(Descriptors::Float(self.descriptor.compute(image, keypoints)))
    }
}

/// Local-peak keypoints with steered BRIEF.
#[derive(Debug, Clone)]
pub struct LpOrb {
    detector: LocalPeakDetector,
    descriptor: BriefExtractor,
}

impl LpOrb {
    pub const NAME: &'static str = "LP-ORB";

    pub fn new(cfg: PeakConfig) -> CoreResult<Self> {
        Self::with_brief_config(cfg, BriefConfig::default())
    }

    pub fn with_brief_config(cfg: PeakConfig, brief: BriefConfig) -> CoreResult<Self> {
        Ok(Self {
            detector: LocalPeakDetector::new(cfg)?,
            descriptor: BriefExtractor::new(brief),
        })
    }

    pub fn peak_config(&self) -> &PeakConfig {
        self.detector.config()
    }
}

impl Feature2D for LpOrb {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn descriptor_size(&self) -> usize {
        BINARY_DESCRIPTOR_SIZE
    }

    fn descriptor_kind(&self) -> DescriptorKind {
        DescriptorKind::Binary
    }

    fn default_norm(&self) -> NormType {
        NormType::Hamming
    }

    fn detect(&self, image: &Image) -> CoreResult<Vec<Keypoint>> {
        Ok(self.detector.detect(image))
    }

    fn compute(&self, image: &Image, keypoints: &mut Vec<Keypoint>) -> CoreResult<Descriptors> {
        if image.is_empty() || keypoints.is_empty() {
            return Ok(Descriptors::empty(DescriptorKind::Binary));
        }
        Ok(Descriptors::Binary(self.descriptor.compute(image, keypoints)))
    }
}

/// Single-scale FAST corners with steered BRIEF, the reference detector.
#[derive(Debug, Clone, Default)]
pub struct FastBrief {
    detector: FastDetector,
    descriptor: BriefExtractor,
}

impl FastBrief {
    pub const NAME: &'static str = "FAST-BRIEF";

    pub fn new(fast: FastConfig, brief: BriefConfig) -> Self {
        Self {
            detector: FastDetector::new(fast),
            descriptor: BriefExtractor::new(brief),
        }
    }
}

impl Feature2D for FastBrief {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn descriptor_size(&self) -> usize {
        BINARY_DESCRIPTOR_SIZE
    }

    fn descriptor_kind(&self) -> DescriptorKind {
        DescriptorKind::Binary
    }

    fn default_norm(&self) -> NormType {
        NormType::Hamming
    }

    fn detect(&self, image: &Image) -> CoreResult<Vec<Keypoint>> {
        Ok(self.detector.detect(image))
    }

    fn compute(&self, image: &Image, keypoints: &mut Vec<Keypoint>) -> CoreResult<Descriptors> {
        if image.is_empty() || keypoints.is_empty() {
            return Ok(Descriptors::empty(DescriptorKind::Binary));
        }
        Ok(Descriptors::Binary(self.descriptor.compute(image, keypoints)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_peak_image(width: usize, height: usize) -> Image {
        // Smooth background with a bright blob every 16 px
        Image::from_fn(width, height, |x, y| {
            let (dx, dy) = ((x % 16) as i32 - 8, (y % 16) as i32 - 8);
            let d2 = dx * dx + dy * dy;
            if d2 < 9 {
                (230 - d2 * 10) as u8
            } else {
                (40 + (x + 2 * y) % 30) as u8
            }
        })
    }

    #[test]
    fn test_declared_contracts() {
        let sift = LpSift::new(PeakConfig::default()).unwrap();
        assert_eq!(sift.name(), "LP-SIFT");
        assert_eq!(sift.descriptor_size(), 64);
        assert_eq!(sift.descriptor_kind(), DescriptorKind::Float32);
        assert_eq!(sift.default_norm(), NormType::L2);

        let orb = LpOrb::new(PeakConfig::default()).unwrap();
        assert_eq!(orb.name(), "LP-ORB");
        assert_eq!(orb.descriptor_size(), 32);
        assert_eq!(orb.descriptor_kind(), DescriptorKind::Binary);
        assert_eq!(orb.default_norm(), NormType::Hamming);

        let fast = FastBrief::default();
        assert_eq!(fast.name(), "FAST-BRIEF");
        assert_eq!(fast.default_norm(), NormType::Hamming);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut cfg = PeakConfig::default();
        cfg.linear_noise_alpha = f32::NAN;
        assert!(LpSift::new(cfg.clone()).is_err());
        assert!(LpOrb::new(cfg).is_err());
    }

    #[test]
    fn test_one_descriptor_per_keypoint() {
        let img = create_peak_image(64, 64);
        let detectors: Vec<Box<dyn Feature2D>> = vec![
            Box::new(LpSift::with_window_sizes(vec![16, 32]).unwrap()),
            Box::new(LpOrb::new(PeakConfig::with_window_sizes(vec![16])).unwrap()),
            Box::new(FastBrief::default()),
        ];

        for det in &detectors {
            let (kps, desc) = det.detect_and_compute(&img, None).unwrap();
            assert!(!kps.is_empty(), "{} found nothing", det.name());
            assert_eq!(kps.len(), desc.len());
            assert_eq!(desc.kind(), det.descriptor_kind());
        }
    }

    #[test]
    fn test_lp_orb_assigns_orientation() {
        let img = create_peak_image(64, 64);
        let orb = LpOrb::new(PeakConfig::with_window_sizes(vec![32])).unwrap();
        let (kps, _) = orb.detect_and_compute(&img, None).unwrap();
        assert!(kps.iter().all(|k| k.angle.is_some()));
    }

    #[test]
    fn test_provided_keypoints_skip_detection() {
        let img = create_peak_image(64, 64);
        let sift = LpSift::with_window_sizes(vec![16]).unwrap();
        let mut kp = Keypoint::new(24.0, 24.0, 16.0);
        kp.window_size = 16;

        let (kps, desc) = sift.detect_and_compute(&img, Some(vec![kp])).unwrap();
        assert_eq!(kps, vec![kp]);
        assert_eq!(desc.len(), 1);
    }

    #[test]
    fn test_empty_inputs_give_empty_descriptors_of_declared_kind() {
        let sift = LpSift::new(PeakConfig::default()).unwrap();
        let orb = LpOrb::new(PeakConfig::default()).unwrap();
        let empty = Image::filled(0, 0, 0);
        let img = create_peak_image(32, 32);

        let d = sift.compute(&empty, &mut vec![Keypoint::new(1.0, 1.0, 16.0)]).unwrap();
        assert!(d.is_empty());
        assert_eq!(d.kind(), DescriptorKind::Float32);

        let d = orb.compute(&img, &mut Vec::new()).unwrap();
        assert!(d.is_empty());
        assert_eq!(d.kind(), DescriptorKind::Binary);

        let (kps, d) = sift.detect_and_compute(&empty, None).unwrap();
        assert!(kps.is_empty() && d.is_empty());
    }
}
