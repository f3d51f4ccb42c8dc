//! Error types for eigenface fitting, projection and the image pipeline.

use thiserror::Error;

/// Errors produced by the estimator, the dataset loader, the renderer and the pipeline.
///
/// Every variant is fatal: nothing in the crate retries or recovers internally.
#[derive(Error, Debug)]
pub enum EigenfaceError {
    /// `transform`, `inverse_transform` or `save_model` called before `fit`.
    #[error("PCA model is not fitted. Call fit or load a model first.")]
    NotFitted,

    /// Zero samples or zero features where at least one is required.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// NaN or infinite values in a sample matrix.
    #[error("Non-finite input: {0}")]
    NonFiniteInput(String),

    /// Shapes that cannot be combined.
    #[error("Dimension mismatch in {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    /// The symmetric eigensolver of the linear algebra backend failed.
    #[error("Eigen decomposition failed: {0}")]
    Eigendecomposition(String),

    /// A loaded model is incomplete or internally inconsistent.
    #[error("Invalid PCA model: {0}")]
    InvalidModel(String),

    /// Pipeline configuration that cannot be run.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Failed to serialize PCA model: {0}")]
    ModelEncode(#[from] bincode::error::EncodeError),

    #[error("Failed to deserialize PCA model: {0}")]
    ModelDecode(#[from] bincode::error::DecodeError),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Result type alias for eigenface operations.
pub type Result<T> = std::result::Result<T, EigenfaceError>;
