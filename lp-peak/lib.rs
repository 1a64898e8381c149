//! Local-peak keypoint detection.
//!
//! Instead of a scale-space pyramid, the image is partitioned into square
//! interrogation windows at several sizes and the intensity extrema of every
//! window become keypoints. A tiny linear ramp makes every tile extremum unique.

mod builder;
mod config;
mod detector;
mod error;
mod preprocessing;
mod refinement;
mod tiles;
mod types;

pub use builder::PeakDetectorBuilder;
pub use config::{
    join_window_sizes, parse_window_sizes, suggested_window_sizes, PeakConfig,
    DEFAULT_LINEAR_NOISE_ALPHA, DEFAULT_WINDOW_SIZES,
};
pub use detector::LocalPeakDetector;
pub use error::{PeakError, PeakResult};
pub use preprocessing::apply_linear_ramp;
pub use refinement::{is_unique_in_neighbourhood, sort_by_response};
pub use tiles::{tile_containing, tile_extrema, tile_grid};
pub use types::{Extremum, RampedImage, Tile};
