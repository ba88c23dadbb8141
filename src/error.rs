//! Error types.
//!
//! Library stages return [`ChangePointError`]; the binary converts it into an
//! [`AppError`] carrying a process exit code.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the change-point pipeline and its ingest/query layers.
#[derive(Debug, Error)]
pub enum ChangePointError {
    /// Malformed or non-positive price data, or missing price columns.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Too few observations to identify both regimes.
    #[error("Insufficient data: got {got} observations, need at least {need}")]
    InsufficientData { got: usize, need: usize },

    /// The sampler diverged, failed to initialise, or raised.
    #[error("Sampling failed: {0}")]
    SamplingFailed(String),

    /// Event catalog is missing required columns.
    #[error("Event catalog is missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    /// A file could not be opened or created.
    #[error("Cannot access '{}': {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Read/write failure on an already open stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChangePointError {
    /// Exit code used by the `oilcp` binary for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            ChangePointError::InvalidInput(_)
            | ChangePointError::Schema { .. }
            | ChangePointError::File { .. }
            | ChangePointError::Io(_)
            | ChangePointError::Csv(_)
            | ChangePointError::Json(_) => 2,
            ChangePointError::InsufficientData { .. } => 3,
            ChangePointError::SamplingFailed(_) => 4,
        }
    }
}

pub type Result<T> = std::result::Result<T, ChangePointError>;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<ChangePointError> for AppError {
    fn from(err: ChangePointError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(ChangePointError::InvalidInput("x".into()).exit_code(), 2);
        assert_eq!(
            ChangePointError::InsufficientData { got: 40, need: 61 }.exit_code(),
            3
        );
        assert_eq!(ChangePointError::SamplingFailed("boom".into()).exit_code(), 4);
    }

    #[test]
    fn schema_error_lists_missing_columns() {
        let err = ChangePointError::Schema {
            missing: vec!["region".to_string(), "event_type".to_string()],
        };
        let app: AppError = err.into();
        assert_eq!(app.exit_code(), 2);
        assert!(app.to_string().contains("region, event_type"));
    }
}
