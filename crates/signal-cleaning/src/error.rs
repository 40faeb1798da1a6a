//! Cleaning Error Types

use sensor_table::TableError;
use thiserror::Error;

/// Errors during signal cleaning
#[derive(Debug, Error)]
pub enum CleaningError {
    /// Underlying table access failed
    #[error(transparent)]
    Table(#[from] TableError),

    /// Filter design parameters out of range
    #[error("Invalid filter parameter: {0}")]
    InvalidFilter(String),

    /// Column must be imputed before this stage
    #[error("Column {column} still has {count} missing values")]
    MissingValues { column: String, count: usize },

    /// Invalid stage configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
