use crate::config::PeakConfig;
use crate::detector::LocalPeakDetector;
use crate::error::PeakResult;

/// Builder for creating a `LocalPeakDetector`
#[derive(Debug, Clone, Default)]
pub struct PeakDetectorBuilder {
    config: PeakConfig,
}

impl PeakDetectorBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the interrogation window sizes
    pub fn window_sizes(mut self, window_sizes: impl Into<Vec<usize>>) -> Self {
        self.config.window_sizes = window_sizes.into();
        self
    }

    /// Set the slope of the tie-breaking ramp (`<= 0` disables it)
    pub fn linear_noise_alpha(mut self, alpha: f32) -> Self {
        self.config.linear_noise_alpha = alpha;
        self
    }

    /// Enable or disable the 3x3 uniqueness filter
    pub fn unique_peaks(mut self, enable: bool) -> Self {
        self.config.unique_peaks = enable;
        self
    }

    /// Enable or disable sorting by descending response
    pub fn sort_by_response(mut self, enable: bool) -> Self {
        self.config.sort_by_response = enable;
        self
    }

    /// Apply the paper preset
    pub fn preset_paper(mut self) -> Self {
        self.config.window_sizes = PeakConfig::paper_preset().window_sizes;
        self
    }

    /// Window sizes tuned for images below 1 MP
    pub fn preset_small_image(mut self) -> Self {
        self.config.window_sizes = PeakConfig::small_image_preset().window_sizes;
        self
    }

    /// Window sizes tuned for 1-3 MP images
    pub fn preset_medium_image(mut self) -> Self {
        self.config.window_sizes = PeakConfig::medium_image_preset().window_sizes;
        self
    }

    /// Window sizes tuned for images of 3 MP and above
    pub fn preset_large_image(mut self) -> Self {
        self.config.window_sizes = PeakConfig::large_image_preset().window_sizes;
        self
    }

    /// Apply the window sizes suggested for a `width` x `height` image
    pub fn preset_for_image(mut self, width: usize, height: usize) -> Self {
        self.config.window_sizes = PeakConfig::for_image_size(width, height).window_sizes;
        self
    }

    /// Build the `LocalPeakDetector`
    pub fn build(self) -> PeakResult<LocalPeakDetector> {
        LocalPeakDetector::new(self.config)
    }

    /// Generate a summary of the builder's configuration
    pub fn summary(&self) -> String {
        self.config.summary()
    }

    /// Create a builder from an existing `PeakConfig`
    pub fn from_config(config: PeakConfig) -> Self {
        Self { config }
    }

    /// Convert the builder into a `PeakConfig`
    pub fn to_config(self) -> PeakConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PeakError;

    #[test]
    fn test_fluent_configuration() {
        let cfg = PeakDetectorBuilder::new()
            .window_sizes(vec![8, 24])
            .linear_noise_alpha(1e-5)
            .unique_peaks(true)
            .sort_by_response(true)
            .to_config();
        assert_eq!(cfg.window_sizes, vec![8, 24]);
        assert_eq!(cfg.linear_noise_alpha, 1e-5);
        assert!(cfg.unique_peaks);
        assert!(cfg.sort_by_response);
    }

    #[test]
    fn test_build_validates() {
        let result = PeakDetectorBuilder::new().linear_noise_alpha(f32::INFINITY).build();
        assert!(matches!(result, Err(PeakError::InvalidAlpha(_))));
        assert!(PeakDetectorBuilder::new().preset_paper().build().is_ok());
    }

    #[test]
    fn test_preset_for_image() {
        let cfg = PeakDetectorBuilder::new().preset_for_image(4000, 3000).to_config();
        assert_eq!(cfg.window_sizes, vec![256, 512]);
        let cfg = PeakDetectorBuilder::new().preset_medium_image().to_config();
        assert_eq!(cfg.window_sizes, vec![32, 64]);
    }

    #[test]
    fn test_config_round_trip() {
        let cfg = PeakConfig::small_image_preset();
        let back = cfg.clone().to_builder().to_config();
        assert_eq!(back, cfg);
        assert!(PeakDetectorBuilder::from_config(cfg).summary().contains("32,40"));
    }
}
