//! Dataset transform chain and chunked Zarr V3 store writing.
//!
//! This crate turns monthly input and target arrays into the layout the
//! classifier trains on, and writes them into per-year chunked stores.
//!
//! # Architecture
//!
//! ```text
//! inputs [T, 3, H, W]                     targets [T, H, W(, 1)]
//!      │                                        │
//!      ├─► move_channel_last                    ├─► add channel axis
//!      ├─► trim_latitude (poles)                ├─► trim_latitude (poles)
//!      ├─► standardize_time_axis                ├─► split_flip_stack
//!      ├─► split_flip_stack (negate vorticity)  └─► aggregate_blocks
//!      └─► standardize_slices                          │
//!               │                                      │
//!               ▼                                      ▼
//!        ChunkedStore [2L, H/2, W, 3]     ChunkedStore [2L, H/2/bh, W/bw, 1]
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{ChunkedStore, GridProcessorConfig, StoreDtype, StorePlan};
//!
//! let plan = StorePlan::for_year(2010, &[8, 9], 2)?;
//! let mut store = ChunkedStore::create(
//!     "2010_inputs.zarr",
//!     &[plan.total_len(), 256, 1440, 3],
//!     &[1, 256, 1440, 3],
//!     StoreDtype::Float32,
//!     &GridProcessorConfig::default(),
//! )?;
//! store.append(&august)?;
//! store.append(&september)?;
//! let summary = store.finish()?;
//! ```

pub mod config;
pub mod downsample;
pub mod error;
pub mod fold;
pub mod normalize;
pub mod writer;

// Re-export commonly used types at crate root
pub use config::{GridProcessorConfig, ZarrCompression};
pub use downsample::aggregate_blocks;
pub use error::{GridProcessorError, Result};
pub use fold::{move_channel_last, split_flip_stack, trim_latitude};
pub use normalize::{standardize_month, standardize_slices, standardize_time_axis, ZeroVariancePolicy};
pub use writer::{ChunkedStore, MonthRange, StoreDtype, StorePlan, StoreSummary};
