//! Error types for reanalysis reading and input assembly.

use thiserror::Error;

use cyclone_common::CycloneError;

/// Result type for reanalysis operations.
pub type ReanalysisResult<T> = Result<T, ReanalysisError>;

/// Error types for reanalysis reading and assembly.
#[derive(Error, Debug)]
pub enum ReanalysisError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Missing required variable, dimension or file
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// The NetCDF layer rejected the file or variable
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Field shapes that cannot be combined
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A calendar day is absent from a month
    #[error("Missing day {year}-{month:02}-{day:02}")]
    MissingDay { year: i32, month: u32, day: u32 },

    /// Days supplied out of order, duplicated, or outside the month
    #[error("Day {got} found where day {expected} was expected")]
    DayOrder { expected: u32, got: u32 },

    /// Calendar contract violation
    #[error(transparent)]
    Contract(#[from] CycloneError),
}

impl ReanalysisError {
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }
}
