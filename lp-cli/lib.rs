//! Local-peak feature detectors and the image-stitching benchmark built on them.
//!
//! The crate wires the workspace detectors (`lp-peak`), descriptors (`lp-hist`,
//! `lp-brief`) and a FAST baseline into [`Feature2D`] facades, then measures
//! them on reference/registered image pairs: match, estimate a homography with
//! RANSAC, warp and blend, and report per-stage timings.

pub mod dataset;
pub mod error;
pub mod fast;
pub mod features;
pub mod homography;
pub mod matcher;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod stitch;

pub use dataset::{list_image_sets, load_image_set, to_luma, ImageSet};
pub use error::{CliError, CliResult, ConfigError};
pub use fast::{FastConfig, FastDetector};
pub use features::{FastBrief, LpOrb, LpSift};
pub use homography::{
    estimate_homography_dlt, estimate_homography_ransac, homography_delta, HomographyError, HomographyEstimate,
    RansacConfig,
};
pub use matcher::{BruteForceMatcher, Match};
pub use metrics::{format_time, FailureReason, StitchingMetrics};
pub use report::{
    csv_row, escape_csv, print_detector_summary, print_summary_table, summarize_by_detector, write_csv, write_json,
    DetectorSummary,
};
pub use runner::{
    parse_set_filter, BenchmarkConfig, BenchmarkRunner, DetectorEntry, DetectorFilter, DetectorKind, WindowPolicy,
    MAX_KEYPOINTS_BF, MIN_MATCHES,
};
pub use stitch::{warp_and_blend, StitchError};

pub use lp_core::{self, Descriptors, Feature2D, Image, Keypoint, NormType, SizeCategory};
pub use lp_peak::{self, PeakConfig, PeakDetectorBuilder};
