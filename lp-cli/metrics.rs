use lp_core::SizeCategory;
use nalgebra::Matrix3;
use serde::Serialize;

/// Why a benchmark run stopped before producing a stitched image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail")]
pub enum FailureReason {
    EmptyKeypoints,
    TooManyKeypoints {
        reference: usize,
        registered: usize,
        limit: usize,
    },
    EmptyDescriptors,
    InsufficientMatches { minimum: usize },
    HomographyFailed,
    /// A stage returned an error or panicked.
    Exception(String),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::EmptyKeypoints => write!(f, "Empty keypoints"),
            FailureReason::TooManyKeypoints {
                reference,
                registered,
                limit,
            } => write!(
                f,
                "Too many keypoints (ref={}, reg={}, limit={})",
                reference, registered, limit
            ),
            FailureReason::EmptyDescriptors => write!(f, "Empty descriptors"),
            FailureReason::InsufficientMatches { minimum } => write!(f, "Insufficient matches (<{})", minimum),
            FailureReason::HomographyFailed => write!(f, "Homography computation failed"),
            FailureReason::Exception(msg) => write!(f, "Exception: {}", msg),
        }
    }
}

/// Outcome and per-stage timings of one (image set, detector) run.
///
/// Times are in seconds. Stages never reached keep a zero time and zero counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StitchingMetrics {
    pub dataset_name: String,
    pub algorithm_name: String,
    pub size_category: Option<SizeCategory>,
    pub reference_width: u32,
    pub reference_height: u32,
    pub registered_width: u32,
    pub registered_height: u32,
    pub num_keypoints_reference: usize,
    pub num_keypoints_registered: usize,
    pub num_matches: usize,
    pub num_inliers: usize,
    /// Comma-separated window sizes used for the set.
    pub window_sizes: String,
    pub detection_time_reference: f64,
    pub detection_time_registered: f64,
    pub descriptor_time_reference: f64,
    pub descriptor_time_registered: f64,
    pub matching_time: f64,
    pub homography_time: f64,
    pub warping_time: f64,
    pub total_stitching_time: f64,
    pub stitching_success: bool,
    pub failure_reason: Option<FailureReason>,
    /// Mean inlier reprojection error, px.
    pub reprojection_error: Option<f64>,
    /// Distance to the baseline detector's homography for the same set.
    pub homography_delta: Option<f64>,
    /// Estimated reference → registered homography, serialized as rows.
    #[serde(serialize_with = "serialize_homography")]
    pub homography: Option<Matrix3<f64>>,
}

/// Row-major copy of a 3x3 matrix.
pub fn homography_rows(h: &Matrix3<f64>) -> [[f64; 3]; 3] {
    std::array::from_fn(|r| std::array::from_fn(|c| h[(r, c)]))
}

fn serialize_homography<S: serde::Serializer>(h: &Option<Matrix3<f64>>, s: S) -> Result<S::Ok, S::Error> {
    h.as_ref().map(homography_rows).serialize(s)
}

impl StitchingMetrics {
    pub fn new(dataset_name: &str, algorithm_name: &str) -> Self {
        Self {
            dataset_name: dataset_name.to_string(),
            algorithm_name: algorithm_name.to_string(),
            ..Self::default()
        }
    }

    pub fn reference_resolution(&self) -> String {
        format!("{}x{}", self.reference_width, self.reference_height)
    }

    pub fn registered_resolution(&self) -> String {
        format!("{}x{}", self.registered_width, self.registered_height)
    }

    pub fn size_category_label(&self) -> String {
        self.size_category.map(|c| c.to_string()).unwrap_or_default()
    }

    pub fn failure_label(&self) -> String {
        self.failure_reason.as_ref().map(|r| r.to_string()).unwrap_or_default()
    }

    pub fn fail(&mut self, reason: FailureReason) {
        self.stitching_success = false;
        self.failure_reason = Some(reason);
    }
}

/// Seconds with two decimals, as written in reports.
pub fn format_time(seconds: f64) -> String {
    format!("{:.2}", seconds)
}

pub fn size_category(width: u32, height: u32) -> SizeCategory {
    SizeCategory::from_dimensions(width as usize, height as usize)
}
