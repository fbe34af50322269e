//! Chunked Zarr store writing.
//!
//! Used by the dataset stage to fill one store per year, month by month.

mod plan;
mod zarr_writer;

pub use plan::{MonthRange, StorePlan};
pub use zarr_writer::{ChunkedStore, StoreDtype, StoreSummary};
