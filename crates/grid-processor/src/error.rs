//! Error types for grid processing.

use thiserror::Error;

use cyclone_common::CycloneError;

/// Errors that can occur during grid processing.
#[derive(Error, Debug)]
pub enum GridProcessorError {
    /// Zarr format error.
    #[error("Zarr format error: {0}")]
    ZarrError(String),

    /// Storage/IO error.
    #[error("storage error: {0}")]
    StorageError(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// A field with no spread where the policy forbids it.
    #[error("zero variance in {0}")]
    ZeroVariance(String),

    /// NaN or infinite values where statistics are required.
    #[error("non-finite values in {0}")]
    NonFinite(String),

    /// Hemisphere split of an odd number of latitude rows.
    #[error("cannot split {0} latitude rows into equal hemispheres")]
    OddLatitude(usize),

    /// A channel index beyond the channel axis.
    #[error("channel {channel} out of range for {channels} channels")]
    ChannelOutOfRange { channel: usize, channels: usize },

    /// Pole trim that would leave no rows.
    #[error("cannot trim {north} + {south} rows from {rows} latitude rows")]
    InvalidTrim {
        north: usize,
        south: usize,
        rows: usize,
    },

    /// Block size that does not tile the grid.
    #[error("invalid block shape: {0}")]
    BlockShape(String),

    /// A write that does not start at the store's running offset.
    #[error("write at offset {got} but the store expects offset {expected}")]
    OffsetMismatch { expected: u64, got: u64 },

    /// Array shape incompatible with the store or another array.
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// A write running past the end of the store.
    #[error("write of {len} slices at offset {offset} overruns store of length {total}")]
    Overflow { offset: u64, len: u64, total: u64 },

    /// A store closed before every slice was written.
    #[error("store incomplete: {written} of {total} slices written")]
    Incomplete { written: u64, total: u64 },

    /// A month whose length differs from the plan.
    #[error("month {month} produced {got} slices, plan expects {expected}")]
    PlanMismatch { month: u32, expected: u64, got: u64 },

    /// Calendar contract violation.
    #[error(transparent)]
    Contract(#[from] CycloneError),
}

impl GridProcessorError {
    /// Create a ZarrError.
    pub fn zarr_error(msg: impl Into<String>) -> Self {
        Self::ZarrError(msg.into())
    }

    /// Create a StorageError.
    pub fn storage_error(msg: impl Into<String>) -> Self {
        Self::StorageError(msg.into())
    }

    /// Create a ShapeMismatch from anything printable with `{:?}`.
    pub fn shape_mismatch(expected: impl std::fmt::Debug, got: impl std::fmt::Debug) -> Self {
        Self::ShapeMismatch {
            expected: format!("{:?}", expected),
            got: format!("{:?}", got),
        }
    }
}

impl From<std::io::Error> for GridProcessorError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for GridProcessorError {
    fn from(err: serde_json::Error) -> Self {
        Self::ZarrError(err.to_string())
    }
}

/// Result type for grid processor operations.
pub type Result<T> = std::result::Result<T, GridProcessorError>;
