//! CSV loader for best-track tables.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use cyclone_common::wrap_longitude;

use crate::error::{Result, TrackError};
use crate::filter::TrackFilter;
use crate::point::TrackPoint;

/// Header names of the columns the loader reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackColumns {
    pub lat: String,
    pub lon: String,
    pub time: String,
    pub nature: String,
    pub status: String,
    pub track_type: String,
}

impl Default for TrackColumns {
    /// IBTrACS v04 column names.
    fn default() -> Self {
        Self {
            lat: "USA_LAT".to_string(),
            lon: "USA_LON".to_string(),
            time: "ISO_TIME".to_string(),
            nature: "NATURE".to_string(),
            status: "USA_STATUS".to_string(),
            track_type: "TRACK_TYPE".to_string(),
        }
    }
}

/// Resolved positions of the selected columns.
struct ColumnIndex {
    lat: usize,
    lon: usize,
    time: usize,
    nature: usize,
    status: usize,
    track_type: usize,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord, columns: &TrackColumns) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| TrackError::MissingColumn(name.to_string()))
        };
        Ok(Self {
            lat: find(&columns.lat)?,
            lon: find(&columns.lon)?,
            time: find(&columns.time)?,
            nature: find(&columns.nature)?,
            status: find(&columns.status)?,
            track_type: find(&columns.track_type)?,
        })
    }
}

/// Row accounting for one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Data rows read (excluding header and units row).
    pub rows: usize,
    /// Rows dropped because a coordinate was blank.
    pub missing_coordinates: usize,
    /// Rows rejected by the track-type or selection filter.
    pub filtered_out: usize,
    /// Rows returned.
    pub kept: usize,
}

/// Loads and cleans track tables.
#[derive(Debug, Clone, Default)]
pub struct TrackLoader {
    columns: TrackColumns,
    filter: TrackFilter,
}

impl TrackLoader {
    /// Create a loader with explicit column names and filter.
    pub fn new(columns: TrackColumns, filter: TrackFilter) -> Self {
        Self { columns, filter }
    }

    /// Load track points from a CSV file on disk.
    pub fn load_path<P: AsRef<Path>>(&self, path: P) -> Result<(Vec<TrackPoint>, LoadStats)> {
        let file = File::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "Loading track table");
        self.load(file)
    }

    /// Load track points from any CSV reader.
    ///
    /// The row right after the header holds units and is skipped. Points are
    /// returned in table order.
    pub fn load<R: Read>(&self, reader: R) -> Result<(Vec<TrackPoint>, LoadStats)> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let idx = ColumnIndex::resolve(&headers, &self.columns)?;

        let mut records = rdr.records();
        match records.next() {
            Some(units) => {
                units?;
            }
            None => return Err(TrackError::MissingUnitsRow),
        }

        let mut stats = LoadStats::default();
        let mut points = Vec::new();

        for record in records {
            let record = record?;
            stats.rows += 1;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let lat_raw = field(&record, idx.lat);
            let lon_raw = field(&record, idx.lon);
            if lat_raw.is_empty() || lon_raw.is_empty() {
                stats.missing_coordinates += 1;
                continue;
            }

            let track_type = field(&record, idx.track_type);
            let nature = field(&record, idx.nature);
            let status = field(&record, idx.status);
            if !self.filter.accepts(track_type, nature, status) {
                stats.filtered_out += 1;
                continue;
            }

            let lat: f32 = lat_raw.parse().map_err(|_| {
                TrackError::malformed(line, format!("latitude '{}' is not a number", lat_raw))
            })?;
            if !(-90.0..=90.0).contains(&lat) {
                return Err(TrackError::malformed(
                    line,
                    format!("latitude {} outside [-90, 90]", lat),
                ));
            }

            let lon: f32 = lon_raw.parse().map_err(|_| {
                TrackError::malformed(line, format!("longitude '{}' is not a number", lon_raw))
            })?;
            let lon = wrap_longitude(lon).map_err(|e| TrackError::malformed(line, e.to_string()))?;

            let time_raw = field(&record, idx.time);
            let time = parse_timestamp(time_raw).ok_or_else(|| {
                TrackError::malformed(line, format!("unparseable timestamp '{}'", time_raw))
            })?;

            points.push(TrackPoint {
                time,
                lat,
                lon,
                status: status.to_string(),
                nature: nature.to_string(),
                track_type: track_type.to_string(),
            });
        }

        stats.kept = points.len();
        debug!(
            missing_coordinates = stats.missing_coordinates,
            filtered_out = stats.filtered_out,
            "Track rows dropped"
        );
        info!(rows = stats.rows, kept = stats.kept, "Loaded track points");

        Ok((points, stats))
    }
}

/// Load a track table from disk with the IBTrACS column layout.
pub fn load_tracks<P: AsRef<Path>>(path: P, filter: &TrackFilter) -> Result<Vec<TrackPoint>> {
    let loader = TrackLoader::new(TrackColumns::default(), filter.clone());
    loader.load_path(path).map(|(points, _)| points)
}

fn field(record: &StringRecord, index: usize) -> &str {
    record.get(index).map(str::trim).unwrap_or("")
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}
