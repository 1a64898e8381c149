#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PeakError {
    #[error("Invalid linear noise alpha: {0} (must be finite)")]
    InvalidAlpha(f32),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Failed to access configuration file: {0}")]
    Io(String),
}

impl From<PeakError> for lp_core::CoreError {
    fn from(err: PeakError) -> Self {
        lp_core::CoreError::InvalidConfig(err.to_string())
    }
}

pub type PeakResult<T> = Result<T, PeakError>;
