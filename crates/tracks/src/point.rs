//! A single best-track observation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One cleaned track observation.
///
/// `lon` is always in [0, 360).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    /// Observation time.
    pub time: NaiveDateTime,
    /// Latitude in degrees north.
    pub lat: f32,
    /// Longitude in degrees east, [0, 360).
    pub lon: f32,
    /// Intensity status code (e.g. "HU", "TS").
    pub status: String,
    /// Storm nature (e.g. "TS", "ET").
    pub nature: String,
    /// Track type tag (e.g. "main").
    pub track_type: String,
}
