//! Feature Error Types

use sensor_table::TableError;
use thiserror::Error;

/// Errors during feature extraction
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Column {column} has {count} missing values")]
    MissingValues { column: String, count: usize },

    #[error("Not enough rows: need at least {needed}, got {actual}")]
    NotEnoughRows { needed: usize, actual: usize },
}
