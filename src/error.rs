use thiserror::Error;

/// Why a strokes file was rejected. Nothing from a rejected file is applied.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("file root must be an object")]
    NotAnObject,

    #[error("unsupported version {0}, expected 1")]
    UnsupportedVersion(String),

    #[error("file has no strokes array")]
    MissingStrokes,

    #[error("stroke {index}: {reason}")]
    InvalidStroke { index: usize, reason: String },
}

impl ImportError {
    pub(crate) fn stroke(index: usize, reason: impl Into<String>) -> Self {
        ImportError::InvalidStroke {
            index,
            reason: reason.into(),
        }
    }
}
