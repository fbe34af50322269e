//! Best-track loading for target construction.
//!
//! Reads an IBTrACS-style CSV table, drops rows without coordinates,
//! applies the track-type and storm selection filters, and returns an
//! ordered sequence of [`TrackPoint`]s with longitudes normalized to the
//! grid's [0, 360) convention.
//!
//! # Example
//!
//! ```ignore
//! use tracks::{load_tracks, Selection, TrackFilter};
//!
//! let filter = TrackFilter {
//!     selection: Selection::Status(vec!["HU".to_string()]),
//!     ..Default::default()
//! };
//! let points = load_tracks("ibtracs.ALL.list.v04r00.csv", &filter)?;
//! ```

pub mod error;
pub mod filter;
pub mod loader;
pub mod point;

pub use error::{Result, TrackError};
pub use filter::{Selection, TrackFilter};
pub use loader::{load_tracks, LoadStats, TrackColumns, TrackLoader};
pub use point::TrackPoint;
