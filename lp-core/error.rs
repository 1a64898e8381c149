#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Image data length mismatch: expected {expected_len}, got {actual_len}")]
    InvalidImageData { expected_len: usize, actual_len: usize },

    #[error("Descriptor kind mismatch: {left:?} vs {right:?}")]
    DescriptorKindMismatch {
        left: crate::DescriptorKind,
        right: crate::DescriptorKind,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
