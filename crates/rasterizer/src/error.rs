//! Error types for rasterization.

use thiserror::Error;

use cyclone_common::CycloneError;

/// Errors that can occur while building target maps.
#[derive(Error, Debug)]
pub enum RasterError {
    /// Calendar or coordinate contract violation.
    #[error(transparent)]
    Contract(#[from] CycloneError),

    /// Kernel parameters that cannot produce a finite field.
    #[error("invalid kernel: {0}")]
    InvalidKernel(String),

    /// Post-processing asked for something the maps cannot provide.
    #[error("post-processing error: {0}")]
    PostProcess(String),
}

/// Result type for rasterization.
pub type Result<T> = std::result::Result<T, RasterError>;
