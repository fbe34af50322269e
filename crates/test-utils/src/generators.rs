//! Test data generators for synthetic reanalysis fields and track tables.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite.

use chrono::NaiveDateTime;
use ndarray::{Array, Array3, Array4, Dimension, IntoDimension};

use crate::fixtures::{IBTRACS_HEADER, IBTRACS_UNITS};

/// Creates an array whose elements count up from `offset` in row-major order.
///
/// Every element is distinct, which makes misplaced slices easy to spot.
///
/// # Example
///
/// ```
/// use test_utils::ramp_array;
///
/// let a = ramp_array((2, 3), 10.0);
/// assert_eq!(a[[0, 0]], 10.0);
/// assert_eq!(a[[1, 2]], 15.0);
/// ```
pub fn ramp_array<Sh>(shape: Sh, offset: f32) -> Array<f32, Sh::Dim>
where
    Sh: IntoDimension,
    Sh::Dim: Dimension,
{
    let dim = shape.into_dimension();
    let n = dim.size();
    Array::from_shape_vec(dim, (0..n).map(|i| offset + i as f32).collect())
        .expect("ramp length matches shape")
}

/// Hourly fields for one synthetic day: (vorticity, temperature, surface pressure).
///
/// Vorticity and temperature are `[time, level, lat, lon]`, pressure is
/// `[time, lat, lon]`. Each field starts at a different offset so channels
/// can be told apart after stacking.
pub fn synthetic_day_fields(
    hours: usize,
    levels: usize,
    n_lat: usize,
    n_lon: usize,
    day: u32,
) -> (Array4<f32>, Array4<f32>, Array3<f32>) {
    let base = day as f32 * 1.0e6;
    let vorticity = ramp_array((hours, levels, n_lat, n_lon), base);
    let temperature = ramp_array((hours, levels, n_lat, n_lon), base + 2.0e5);
    let pressure = ramp_array((hours, n_lat, n_lon), base + 4.0e5);
    (vorticity, temperature, pressure)
}

/// Builds small IBTrACS-style CSV tables.
///
/// # Example
///
/// ```
/// use test_utils::TrackTableBuilder;
///
/// let csv = TrackTableBuilder::new()
///     .point("2010-08-01 00:00:00", 25.1, -80.3, "TS", "TS")
///     .build();
/// assert_eq!(csv.lines().count(), 3);
/// ```
#[derive(Debug, Default, Clone)]
pub struct TrackTableBuilder {
    rows: Vec<String>,
}

impl TrackTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a main-track observation.
    pub fn point(self, time: &str, lat: f32, lon: f32, status: &str, nature: &str) -> Self {
        self.row(time, &lat.to_string(), &lon.to_string(), status, nature, "main")
    }

    /// Add an observation with an explicit track type.
    pub fn point_on_track(
        self,
        time: &str,
        lat: f32,
        lon: f32,
        status: &str,
        nature: &str,
        track_type: &str,
    ) -> Self {
        self.row(time, &lat.to_string(), &lon.to_string(), status, nature, track_type)
    }

    /// Add a row with raw, unparsed field text (blank coordinates, garbage, padding).
    pub fn raw(
        self,
        time: &str,
        lat: &str,
        lon: &str,
        status: &str,
        nature: &str,
        track_type: &str,
    ) -> Self {
        self.row(time, lat, lon, status, nature, track_type)
    }

    fn row(
        mut self,
        time: &str,
        lat: &str,
        lon: &str,
        status: &str,
        nature: &str,
        track_type: &str,
    ) -> Self {
        let n = self.rows.len();
        self.rows.push(format!(
            "2010{:03}N00000,2010,NA,STORM{},{},{},{},{},{},{}",
            n, n, time, nature, lat, lon, status, track_type
        ));
        self
    }

    /// Render the table, header and units row included.
    pub fn build(&self) -> String {
        let mut out = String::new();
        out.push_str(IBTRACS_HEADER);
        out.push('\n');
        out.push_str(IBTRACS_UNITS);
        out.push('\n');
        for row in &self.rows {
            out.push_str(row);
            out.push('\n');
        }
        out
    }
}

/// Parse a `YYYY-MM-DD HH:MM:SS` literal; panics on bad input.
pub fn timestamp(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").expect("valid test timestamp")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_array_is_distinct() {
        let a = ramp_array((2, 3, 4), 0.0);
        assert_eq!(a.len(), 24);
        assert_eq!(a[[1, 2, 3]], 23.0);
    }

    #[test]
    fn test_synthetic_day_shapes() {
        let (vo, t, sp) = synthetic_day_fields(24, 2, 5, 8, 1);
        assert_eq!(vo.shape(), &[24, 2, 5, 8]);
        assert_eq!(t.shape(), &[24, 2, 5, 8]);
        assert_eq!(sp.shape(), &[24, 5, 8]);
        assert_ne!(vo[[0, 0, 0, 0]], t[[0, 0, 0, 0]]);
    }

    #[test]
    fn test_track_table_layout() {
        let csv = TrackTableBuilder::new()
            .point("2010-08-01 00:00:00", 25.0, -80.0, "HU", "TS")
            .raw("2010-08-01 06:00:00", " ", " ", "HU", "TS", "main")
            .build();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], IBTRACS_HEADER);
        assert!(lines[2].ends_with("HU,main"));
    }
}
