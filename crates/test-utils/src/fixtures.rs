//! Common test fixtures for the preprocessing tests.

/// Header of an IBTrACS v04 table, trimmed to the columns the tests need
/// plus a few the loader must ignore.
pub const IBTRACS_HEADER: &str =
    "SID,SEASON,BASIN,NAME,ISO_TIME,NATURE,USA_LAT,USA_LON,USA_STATUS,TRACK_TYPE";

/// Units row that follows the IBTrACS header.
pub const IBTRACS_UNITS: &str = " , Year, , , , , degrees_north, degrees_east, , ";

/// Coarse global grid (2.5°) used where the 0.25° grid would make tests slow.
pub mod grid {
    /// Latitude points of the 2.5° grid.
    pub const COARSE_LAT: usize = 73;
    /// Longitude points of the 2.5° grid.
    pub const COARSE_LON: usize = 144;
}
