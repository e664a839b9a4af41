//! Error types for rust_dge

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for DGE runs
#[derive(Error, Debug)]
pub enum DgeError {
    /// A contrast cannot be resolved against the sample sheet or count matrix
    #[error("Configuration error in contrast {contrast}: {reason}")]
    Configuration { contrast: String, reason: String },

    /// The statistical engine failed for one (contrast, engine) pair
    #[error("Engine {engine} failed for contrast {contrast}: {reason}")]
    Engine {
        contrast: String,
        engine: String,
        reason: String,
    },

    #[error("Engine runtime '{executable}' is not usable: {reason}")]
    EngineUnavailable { executable: String, reason: String },

    #[error("Engine process '{mode}' exited with status {status:?}: {stderr}")]
    EngineProcess {
        mode: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("Malformed engine output: {reason}")]
    InvalidEngineOutput { reason: String },

    #[error("Gene annotation lookup failed: {reason}")]
    AnnotationLookup { reason: String },

    /// The contrast output directory already exists
    #[error("Output directory already exists: {}", path.display())]
    OutputCollision { path: PathBuf },

    #[error("Invalid count matrix: {reason}")]
    InvalidCountMatrix { reason: String },

    #[error("Invalid sample sheet: {reason}")]
    InvalidSampleSheet { reason: String },

    #[error("Invalid contrast list: {reason}")]
    InvalidContrastList { reason: String },

    #[error("Invalid run parameters: {reason}")]
    InvalidParameters { reason: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },

    #[error("Invalid numeric value '{value}'")]
    InvalidNumber { value: String },

    #[error("Empty data: {reason}")]
    EmptyData { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl DgeError {
    /// Attach a contrast label to an engine-level failure
    pub(crate) fn engine(contrast: &str, engine: &str, reason: impl Into<String>) -> Self {
        DgeError::Engine {
            contrast: contrast.to_string(),
            engine: engine.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn configuration(contrast: &str, reason: impl Into<String>) -> Self {
        DgeError::Configuration {
            contrast: contrast.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for DGE operations
pub type Result<T> = std::result::Result<T, DgeError>;
