//! Error Handling Module
//!
//! Defines the error taxonomy for the pipeline.
//! Uses thiserror for ergonomic error definitions.
//!
//! Every failure in the pipeline propagates through [`PipelineError`]; nothing
//! is constructed and then dropped on the floor.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Bad or missing configuration (CLI arguments, degenerate batch size,
    /// mismatched embedding dimensions)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required directory or artifact file does not exist
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// An image file could not be read or decoded
    #[error("Failed to decode image '{path}': {reason}")]
    Decode { path: PathBuf, reason: String },

    /// The dataset contains no usable images or classes
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    /// Training failed (non-finite loss, solver failure)
    #[error("Training error: {0}")]
    Training(String),

    /// A persisted artifact is inconsistent (label count disagrees with the
    /// classifier output width)
    #[error("Corrupt artifact: {0}")]
    CorruptArtifact(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Convenience Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Build a `Decode` error for a specific file.
    pub fn decode(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::Training("loss became NaN".to_string());
        assert_eq!(format!("{}", err), "Training error: loss became NaN");
    }

    #[test]
    fn test_decode_error_carries_path() {
        let err = PipelineError::decode("/data/cat/img0.jpg", "truncated file");
        let msg = format!("{}", err);
        assert!(msg.contains("img0.jpg"));
        assert!(msg.contains("truncated file"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PipelineError = io.into();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
