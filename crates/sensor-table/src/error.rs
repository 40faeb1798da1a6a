//! Table Error Types

use thiserror::Error;

/// Errors raised while building, loading or querying a sensor table
#[derive(Debug, Error)]
pub enum TableError {
    /// Requested column does not exist
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Column length differs from the table index
    #[error("Column {column} has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Cell could not be parsed
    #[error("Invalid value {value:?} in column {column} on line {line}")]
    InvalidValue {
        line: usize,
        column: String,
        value: String,
    },

    /// Malformed CSV input
    #[error("CSV error: {0}")]
    Csv(String),

    /// File system error
    #[error("I/O error: {0}")]
    Io(String),

    /// Snapshot encoding/decoding failure
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Snapshot written by an incompatible version
    #[error("Unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

impl From<std::io::Error> for TableError {
    fn from(err: std::io::Error) -> Self {
        TableError::Io(err.to_string())
    }
}

impl From<csv::Error> for TableError {
    fn from(err: csv::Error) -> Self {
        TableError::Csv(err.to_string())
    }
}

impl From<postcard::Error> for TableError {
    fn from(err: postcard::Error) -> Self {
        TableError::Snapshot(err.to_string())
    }
}
