//! Common types and utilities shared across the cyclone preprocessing crates.

pub mod error;
pub mod grid;
pub mod paths;
pub mod time;

pub use error::{CycloneError, CycloneResult};
pub use grid::{make_grid, wrap_longitude, Grid, GLOBAL_LAT_POINTS, GLOBAL_LON_POINTS};
pub use paths::StoragePath;
pub use time::{days_in_month, month_bounds, month_slots, slot_label, SLOT_HOURS};
