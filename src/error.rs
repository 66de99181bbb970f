use std::path::PathBuf;
use thiserror::Error;

/// Terminal failure of one analysis call. No partial result accompanies any variant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("Failed to decode audio '{path}': {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Invalid analysis configuration: {0}")]
    InvalidConfig(String),

    #[error("Analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    pub fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        AnalysisError::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
