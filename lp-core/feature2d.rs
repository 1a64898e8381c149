use crate::{CoreResult, DescriptorKind, Descriptors, Image, Keypoint, NormType};

/// Two-phase keypoint detector / descriptor extractor.
///
/// Implementations are interchangeable inside the benchmark: the runner only
/// sees `detect`, `compute` and the declared descriptor contract.
pub trait Feature2D: Send + Sync {
    /// Display name used in reports.
    fn name(&self) -> &str;

    /// Number of elements (floats or bytes) in one descriptor.
    fn descriptor_size(&self) -> usize;

    fn descriptor_kind(&self) -> DescriptorKind;

    /// Distance a matcher should use for these descriptors.
    fn default_norm(&self) -> NormType;

    fn detect(&self, image: &Image) -> CoreResult<Vec<Keypoint>>;

    /// Computes one descriptor per keypoint.
    ///
    /// Keypoints are taken mutably so an extractor can assign orientation.
    fn compute(&self, image: &Image, keypoints: &mut Vec<Keypoint>) -> CoreResult<Descriptors>;

    /// Detects (unless `provided` keypoints are given) and then computes.
    fn detect_and_compute(
        &self,
        image: &Image,
        provided: Option<Vec<Keypoint>>,
    ) -> CoreResult<(Vec<Keypoint>, Descriptors)> {
        let mut keypoints = match provided {
            Some(keypoints) => keypoints,
            None => self.detect(image)?,
        };
        let descriptors = self.compute(image, &mut keypoints)?;
        Ok((keypoints, descriptors))
    }
}
