// ============================================================
// Layer 3 — Pipeline Errors
// ============================================================
// Every stage reports failures through one enum so the
// application layer can say which stage failed and on which
// sample id or output path.
//
// All variants are terminal for a run: nothing is retried and
// a single undecodable image aborts training instead of being
// skipped (skipping would shift images against their labels).

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used by the component layers.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid fraction, empty dataset, zero batch size, ...
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The label table could not be read or contains a bad row.
    #[error("label table '{path}': {reason}")]
    LabelTable { path: PathBuf, reason: String },

    /// A sample's image is missing, unreadable or not an image.
    #[error("cannot decode image for sample '{id}' ({path}): {reason}")]
    Decode {
        id:     String,
        path:   PathBuf,
        reason: String,
    },

    /// Only one class present, AUC is undefined.
    #[error("degenerate evaluation input: {0}")]
    DegenerateInput(String),

    /// A model produced a NaN or infinite score.
    #[error("non-finite score {value} at position {index}")]
    NonFiniteScore { index: usize, value: f32 },

    /// Labels and predictions differ in length.
    #[error("length mismatch: {labels} labels vs {predictions} predictions")]
    LengthMismatch { labels: usize, predictions: usize },

    /// An output file could not be written.
    #[error("cannot write '{path}': {source}")]
    Write {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Saving or loading model weights failed.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// The model backend rejected an operation.
    #[error("model error: {0}")]
    Model(String),
}

impl PipelineError {
    /// Shorthand for a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a write error for `path`.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write { path: path.into(), source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_names_sample() {
        let err = PipelineError::Decode {
            id:     "f38a6374c348".into(),
            path:   PathBuf::from("train/f38a6374c348.tif"),
            reason: "No such file or directory".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("f38a6374c348"));
        assert!(msg.contains("train/f38a6374c348.tif"));
    }

    #[test]
    fn test_write_error_names_path() {
        let io  = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = PipelineError::write("/readonly/submission.csv", io);
        assert!(err.to_string().contains("/readonly/submission.csv"));
    }
}
