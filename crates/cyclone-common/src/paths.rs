//! Object key conventions for raw, intermediate and final files.
//!
//! Month and day numbers are written without zero padding
//! (`2010_8_1.nc`), matching how the raw reanalysis archive is keyed.

/// Path builder for consistent storage layout.
pub struct StoragePath;

impl StoragePath {
    /// Raw reanalysis fields (vorticity, temperature) for one day.
    /// Format: {year}_{month}_{day}.nc
    pub fn raw_fields(year: i32, month: u32, day: u32) -> String {
        format!("{}_{}_{}.nc", year, month, day)
    }

    /// Raw surface pressure for one day.
    /// Format: {year}_{month}_{day}_pressure.nc
    pub fn raw_pressure(year: i32, month: u32, day: u32) -> String {
        format!("{}_{}_{}_pressure.nc", year, month, day)
    }

    /// Restructured day array.
    /// Format: {year}_{month}_{day}.npy
    pub fn day_inputs(year: i32, month: u32, day: u32) -> String {
        format!("{}_{}_{}.npy", year, month, day)
    }

    /// Combined month of inputs.
    /// Format: {year}_{month}_inputs.npy
    pub fn month_inputs(year: i32, month: u32) -> String {
        format!("{}_{}_inputs.npy", year, month)
    }

    /// Month of target maps, `npz` (key `maps`) or `npy`.
    pub fn target_maps(year: i32, month: u32, extension: &str) -> String {
        format!("{}_{}_target_maps.{}", year, month, extension)
    }

    /// Month of per-slot presence flags.
    pub fn target_flags(year: i32, month: u32) -> String {
        format!("{}_{}_target_flags.npy", year, month)
    }

    /// Month of per-slot metadata.
    pub fn meta(year: i32, month: u32) -> String {
        format!("{}_{}_meta.json", year, month)
    }

    /// Chunked input store for a whole year.
    pub fn inputs_store(year: i32) -> String {
        format!("{}_inputs.zarr", year)
    }

    /// Chunked classification target store for a whole year.
    pub fn targets_store(year: i32) -> String {
        format!("{}_targets.zarr", year)
    }

    /// Join a configured prefix and a file name into an object key.
    pub fn join(prefix: &str, name: &str) -> String {
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", prefix, name)
        }
    }
}
