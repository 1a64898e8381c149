use std::path::PathBuf;

use lp_core::CoreError;
use lp_peak::PeakError;

/// Invalid invocation or configuration, reported before any work starts.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Unknown detector '{0}' (expected one of FAST-BRIEF, LP-SIFT, LP-ORB)")]
    UnknownDetector(String),

    #[error("Malformed set filter '{0}' (expected SET=DETECTOR[,DETECTOR...])")]
    MalformedFilter(String),

    #[error("Missing CSV output path")]
    MissingOutput,

    #[error("Invalid window size list '{0}'")]
    InvalidWindowSizes(String),

    #[error(transparent)]
    Peak(#[from] PeakError),
}

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("Could not find {role} image in {}", .dir.display())]
    MissingImage { role: &'static str, dir: PathBuf },

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type CliResult<T> = Result<T, CliError>;
