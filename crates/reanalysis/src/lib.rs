//! Reanalysis input assembly.
//!
//! Raw hourly fields are reduced to 6-hourly, three-channel arrays:
//!
//! | Channel | Field | Raw level |
//! |---|---|---|
//! | 0 | Relative vorticity | index 1 (850 hPa) |
//! | 1 | Temperature | index 0 (500 hPa) |
//! | 2 | Surface pressure | - |
//!
//! [`assemble_day`] produces `[4, 3, lat, lon]` for one day and
//! [`assemble_month`] concatenates the days of a month along time.

pub mod assemble;
pub mod error;
pub mod source;

pub use assemble::{assemble_day, assemble_month, restructure, ChannelSpec, DayArray, CHANNELS};
pub use error::{ReanalysisError, ReanalysisResult};
pub use source::{silence_hdf5_errors, DayFields, DaySource, NetcdfDaySource, Packing, VariableNames};
