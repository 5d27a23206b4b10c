use std::path::PathBuf;

use polars::prelude::PolarsError;
use smartcore::error::Failed;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("feature schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error("invalid input field {field:?}: {reason}")]
    InvalidInput { field: String, reason: String },
    #[error("shape mismatch: expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("dataset error: {0}")]
    Dataset(String),
    #[error("training failed: {0}")]
    Training(String),
    #[error("model error: {0}")]
    Model(String),
    #[error("artifact {path:?}: {reason}")]
    Artifact { path: PathBuf, reason: String },
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Polars(#[from] PolarsError),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RiskError {
    pub fn invalid_input(field: &str, reason: impl Into<String>) -> Self {
        RiskError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn artifact(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        RiskError::Artifact {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<Failed> for RiskError {
    fn from(e: Failed) -> Self {
        RiskError::Model(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RiskError>;
