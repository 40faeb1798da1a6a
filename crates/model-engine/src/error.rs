//! Model Error Types

use feature_engine::FeatureError;
use sensor_table::TableError;
use thiserror::Error;

/// Errors during training, selection and evaluation
#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error("Dataset is empty")]
    EmptyDataset,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Unknown feature column: {0}")]
    UnknownColumn(String),

    #[error("Feature count mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("{0} has not been fitted")]
    NotFitted(&'static str),

    #[error("Selection artifact error: {0}")]
    Artifact(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
