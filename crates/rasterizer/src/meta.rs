//! Per-slot metadata records.

use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

/// A track point as recorded in the slot metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    /// Latitude rounded to 4 decimal places.
    pub lat: f64,
    /// Longitude ([0, 360)) rounded to 4 decimal places.
    pub lon: f64,
    pub nature: String,
    pub status: String,
}

impl PointRecord {
    pub fn new(lat: f32, lon: f32, nature: &str, status: &str) -> Self {
        Self {
            lat: round4(lat),
            lon: round4(lon),
            nature: nature.to_string(),
            status: status.to_string(),
        }
    }
}

/// Metadata for one time slot.
///
/// Serializes as a JSON array: the slot timestamp string first, then one
/// object per contributing point, in track-table order:
///
/// ```text
/// ["2010-08-01 00:00:00", {"lat": 25.1, "lon": 280.3, "nature": "TS", "status": "HU"}]
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SlotMeta {
    pub time: String,
    pub points: Vec<PointRecord>,
}

impl SlotMeta {
    pub fn new(time: String) -> Self {
        Self {
            time,
            points: Vec::new(),
        }
    }
}

impl Serialize for SlotMeta {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(1 + self.points.len()))?;
        seq.serialize_element(&self.time)?;
        for point in &self.points {
            seq.serialize_element(point)?;
        }
        seq.end()
    }
}

fn round4(v: f32) -> f64 {
    (v as f64 * 1.0e4).round() / 1.0e4
}
