//! Error types for track loading.

use thiserror::Error;

/// Errors that can occur while loading track records.
#[derive(Error, Debug)]
pub enum TrackError {
    /// The track file could not be opened or read.
    #[error("failed to read track file: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV layer rejected the input.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the header.
    #[error("missing required column: {0}")]
    MissingColumn(String),

    /// The header is followed by no units row.
    #[error("track table has no units row after the header")]
    MissingUnitsRow,

    /// A row survived filtering but its values cannot be interpreted.
    #[error("malformed track row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
}

impl TrackError {
    /// Create a MalformedRow error.
    pub fn malformed(line: u64, reason: impl Into<String>) -> Self {
        Self::MalformedRow {
            line,
            reason: reason.into(),
        }
    }
}

/// Result type for track operations.
pub type Result<T> = std::result::Result<T, TrackError>;
