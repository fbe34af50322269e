//! Cyclone dataset preprocessing service.
//!
//! Four stages turn raw reanalysis days and a storm track table into
//! chunked training stores:
//!
//! ```text
//! era5/{y}_{m}_{d}.nc ──► restructure ──► inputs/{y}_{m}_{d}.npy
//!                                              │
//!                                              ▼
//!                          combine ──► inputs/{y}_{m}_inputs.npy ─┐
//!                                                                 ├─► dataset ──► datasets/{y}_inputs.zarr
//! tracks.csv ──► targets ──► targets/{y}_{m}_target_maps.npz ─────┘               datasets/{y}_targets.zarr
//! ```

pub mod arrays;
pub mod config;
pub mod runner;
pub mod stages;

pub use config::PreprocessorConfig;
pub use runner::{run_units, StageReport, UnitId, UnitOutcome};
pub use stages::{run_stage, Stage, StageContext};
