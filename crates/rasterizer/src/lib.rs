//! Track-to-target rasterization.
//!
//! For one calendar month, every 6-hourly slot gets a target map over the
//! reanalysis grid, a presence flag, and a metadata record listing the track
//! points that landed in it.
//!
//! ```text
//! tracks ──► filter to [month start, next month start)
//!              │
//!              ├─► bin by exact slot timestamp
//!              │
//!              └─► stamp each point with the Kernel (summed per slot)
//!                        │
//!                        ▼
//!          (maps[slot, lat, lon], flags[slot], meta[slot])
//! ```

pub mod error;
pub mod kernel;
pub mod meta;
pub mod rasterize;

pub use error::{RasterError, Result};
pub use kernel::Kernel;
pub use meta::{PointRecord, SlotMeta};
pub use rasterize::{apply_postprocess, rasterize, PostProcess, Rasterized};
