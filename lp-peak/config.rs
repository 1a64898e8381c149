use lp_core::SizeCategory;
use crate::error::{PeakError, PeakResult};
use crate::builder::PeakDetectorBuilder;

#[cfg(feature = "serde")]
use serde::{Serialize, Deserialize};

/// Window sizes used when nothing else is configured.
pub const DEFAULT_WINDOW_SIZES: [usize; 5] = [16, 32, 64, 128, 256];

/// Ramp slope small enough to stay below one intensity step on images up to 1 MP.
pub const DEFAULT_LINEAR_NOISE_ALPHA: f32 = 1e-6;

/// Local-peak detector configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PeakConfig {
    /// Interrogation window side lengths. Zero entries are skipped at detection
    /// time; an empty list yields no keypoints.
    pub window_sizes: Vec<usize>,
    /// Slope of the tie-breaking ramp; `<= 0` disables it.
    pub linear_noise_alpha: f32,
    /// Keep only candidates whose unramped value is unique in their 3x3 neighbourhood.
    pub unique_peaks: bool,
    /// Sort the output by descending response.
    pub sort_by_response: bool,
    /// Metadata
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            window_sizes: DEFAULT_WINDOW_SIZES.to_vec(),
            linear_noise_alpha: DEFAULT_LINEAR_NOISE_ALPHA,
            unique_peaks: false,
            sort_by_response: false,
            name: None,
            description: None,
        }
    }
}

impl PeakConfig {
    /// Configuration with the given window sizes and default everything else
    pub fn with_window_sizes(window_sizes: Vec<usize>) -> Self {
        Self {
            window_sizes,
            ..Self::default()
        }
    }

    /// Window sizes from the LP-SIFT paper's multi-scale setting
    pub fn paper_preset() -> Self {
        Self::default().with_metadata("Paper", "Five dyadic window sizes from 16 to 256")
    }

    /// Small images (below 1 MP)
    pub fn small_image_preset() -> Self {
        Self::with_window_sizes(vec![32, 40]).with_metadata("Small", "Tuned for images below 1 MP")
    }

    /// Medium images (1-3 MP)
    pub fn medium_image_preset() -> Self {
        Self::with_window_sizes(vec![32, 64]).with_metadata("Medium", "Tuned for 1-3 MP images")
    }

    /// Large images (3 MP and above)
    pub fn large_image_preset() -> Self {
        Self::with_window_sizes(vec![256, 512]).with_metadata("Large", "Tuned for images of 3 MP and above")
    }

    /// Preset matching the size category of a `width` x `height` image
    pub fn for_image_size(width: usize, height: usize) -> Self {
        match SizeCategory::from_dimensions(width, height) {
            SizeCategory::Small => Self::small_image_preset(),
            SizeCategory::Medium => Self::medium_image_preset(),
            SizeCategory::Large => Self::large_image_preset(),
        }
    }

    /// Add metadata to configuration
    pub fn with_metadata(mut self, name: &str, description: &str) -> Self {
        self.name = Some(name.to_string());
        self.description = Some(description.to_string());
        self
    }

    /// Convert to PeakDetectorBuilder for further customization
    pub fn to_builder(self) -> PeakDetectorBuilder {
        PeakDetectorBuilder::from_config(self)
    }

    /// Window sizes joined with commas, as written in reports
    pub fn window_sizes_label(&self) -> String {
        join_window_sizes(&self.window_sizes)
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "PeakConfig: windows=[{}], alpha={:e}, unique_peaks={}, sort_by_response={}",
            self.window_sizes_label(),
            self.linear_noise_alpha,
            self.unique_peaks,
            self.sort_by_response
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> PeakResult<()> {
        if !self.linear_noise_alpha.is_finite() {
            return Err(PeakError::InvalidAlpha(self.linear_noise_alpha));
        }
        Ok(())
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> PeakResult<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| PeakError::Io(e.to_string()))
    }

    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> PeakResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PeakError::Io(e.to_string()))?;
        Self::from_json(&content)
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> PeakResult<()> {
        let toml = self.to_toml()?;
        std::fs::write(path, toml).map_err(|e| PeakError::Io(e.to_string()))
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> PeakResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PeakError::Io(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Load from a `.json` or `.toml` file, chosen by extension
    #[cfg(feature = "serde")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> PeakResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::load_json(path),
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::load_toml(path),
            _ => Err(PeakError::Parse(format!(
                "unsupported configuration format: {}",
                path.display()
            ))),
        }
    }

    /// Serialize to JSON string
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> PeakResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| PeakError::Parse(e.to_string()))
    }

    /// Deserialize from JSON string
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> PeakResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| PeakError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML string
    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> PeakResult<String> {
        toml::to_string_pretty(self).map_err(|e| PeakError::Parse(e.to_string()))
    }

    /// Deserialize from TOML string
    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> PeakResult<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| PeakError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Window sizes suggested for a `width` x `height` image by its size category.
pub fn suggested_window_sizes(width: usize, height: usize) -> Vec<usize> {
    PeakConfig::for_image_size(width, height).window_sizes
}

/// Comma-separated window sizes, e.g. `16,32,64`.
pub fn join_window_sizes(window_sizes: &[usize]) -> String {
    window_sizes
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses a comma-separated window size list, keeping positive values only.
///
/// Returns `None` when no usable size is found so the caller decides the fallback.
pub fn parse_window_sizes(arg: &str) -> Option<Vec<usize>> {
    let sizes: Vec<usize> = arg
        .split(',')
        .filter_map(|token| token.trim().parse::<i64>().ok())
        .filter(|&v| v > 0)
        .map(|v| v as usize)
        .collect();
    if sizes.is_empty() {
        None
    } else {
        Some(sizes)
    }
}
