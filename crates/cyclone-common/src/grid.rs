//! Global latitude/longitude lattice used by every stage of the pipeline.

use ndarray::Array1;

use crate::error::{CycloneError, CycloneResult};

/// Number of latitude points on the 0.25° global grid.
pub const GLOBAL_LAT_POINTS: usize = 721;

/// Number of longitude points on the 0.25° global grid.
pub const GLOBAL_LON_POINTS: usize = 1440;

/// A regular global grid.
///
/// Latitude runs from 90 down to -90 (both included), longitude from 0 up to
/// 360 (excluded). The coordinate vectors are fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    lat: Array1<f32>,
    lon: Array1<f32>,
}

impl Grid {
    /// Build a regular global grid with `n_lat` latitudes and `n_lon` longitudes.
    pub fn regular(n_lat: usize, n_lon: usize) -> CycloneResult<Self> {
        if n_lat < 2 || n_lon < 1 {
            return Err(CycloneError::InvalidGrid(format!(
                "need at least 2 latitudes and 1 longitude, got {}x{}",
                n_lat, n_lon
            )));
        }
        Ok(Self::build(n_lat, n_lon))
    }

    fn build(n_lat: usize, n_lon: usize) -> Self {
        let dlat = 180.0 / (n_lat - 1) as f64;
        let lat = Array1::from_iter((0..n_lat).map(|i| (90.0 - i as f64 * dlat) as f32));

        let dlon = 360.0 / n_lon as f64;
        let lon = Array1::from_iter((0..n_lon).map(|j| (j as f64 * dlon) as f32));

        Self { lat, lon }
    }

    /// Latitude coordinates, descending.
    pub fn lat(&self) -> &Array1<f32> {
        &self.lat
    }

    /// Longitude coordinates, ascending.
    pub fn lon(&self) -> &Array1<f32> {
        &self.lon
    }

    /// Grid shape as (rows, columns).
    pub fn shape(&self) -> (usize, usize) {
        (self.lat.len(), self.lon.len())
    }

    /// Index of the latitude closest to `lat` (squared difference, first on ties).
    pub fn nearest_lat_index(&self, lat: f32) -> usize {
        nearest_index(&self.lat, lat)
    }

    /// Index of the longitude closest to `lon` (squared difference, first on ties).
    ///
    /// The search is planar: `lon` must already be in the grid's [0, 360) convention.
    pub fn nearest_lon_index(&self, lon: f32) -> usize {
        nearest_index(&self.lon, lon)
    }
}

fn nearest_index(axis: &Array1<f32>, value: f32) -> usize {
    let mut best = 0;
    let mut best_dist = f32::INFINITY;
    for (i, &v) in axis.iter().enumerate() {
        let d = (v - value) * (v - value);
        if d < best_dist {
            best = i;
            best_dist = d;
        }
    }
    best
}

/// The 721 x 1440 global grid the reanalysis fields are delivered on.
pub fn make_grid() -> Grid {
    Grid::build(GLOBAL_LAT_POINTS, GLOBAL_LON_POINTS)
}

/// Normalize a longitude into the grid's [0, 360) convention.
///
/// Accepts values from either the [-180, 180] or the [0, 360] convention.
/// Anything outside [-180, 360] is rejected.
pub fn wrap_longitude(lon: f32) -> CycloneResult<f32> {
    if !(-180.0..=360.0).contains(&lon) {
        return Err(CycloneError::LongitudeOutOfRange(lon));
    }
    let wrapped = if lon < 0.0 { lon + 360.0 } else { lon };
    // Tiny negative inputs round up to exactly 360 in f32.
    if wrapped >= 360.0 {
        Ok(0.0)
    } else {
        Ok(wrapped)
    }
}
