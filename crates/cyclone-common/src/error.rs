//! Error types shared by the preprocessing crates.

use thiserror::Error;

/// Result type alias using CycloneError.
pub type CycloneResult<T> = Result<T, CycloneError>;

/// Primary error type for grid, calendar and storage operations.
#[derive(Debug, Error)]
pub enum CycloneError {
    // === Data contract errors ===
    #[error("longitude {0} outside the accepted range [-180, 360]")]
    LongitudeOutOfRange(f32),

    #[error("latitude {0} outside the accepted range [-90, 90]")]
    LatitudeOutOfRange(f32),

    #[error("invalid calendar month {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },

    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    // === Storage errors ===
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    // === Infrastructure errors ===
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl CycloneError {
    /// True for errors caused by malformed input data rather than I/O.
    pub fn is_data_contract(&self) -> bool {
        matches!(
            self,
            CycloneError::LongitudeOutOfRange(_)
                | CycloneError::LatitudeOutOfRange(_)
                | CycloneError::InvalidMonth { .. }
                | CycloneError::InvalidGrid(_)
        )
    }
}

impl From<std::io::Error> for CycloneError {
    fn from(err: std::io::Error) -> Self {
        CycloneError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for CycloneError {
    fn from(err: serde_json::Error) -> Self {
        CycloneError::InternalError(format!("JSON error: {}", err))
    }
}
