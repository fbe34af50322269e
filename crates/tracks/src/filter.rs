//! Row selection predicates for track records.

use serde::{Deserialize, Serialize};

/// Which storms to keep.
///
/// Selecting by nature and selecting by status are alternative policies;
/// a run uses exactly one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "by", content = "value", rename_all = "lowercase")]
pub enum Selection {
    /// Keep every storm.
    #[default]
    All,
    /// Keep rows whose nature equals the given category (e.g. "TS").
    Nature(String),
    /// Keep rows whose status is one of the given codes (e.g. ["HU"]).
    Status(Vec<String>),
}

impl Selection {
    /// Whether a row with this nature and status is selected.
    pub fn accepts(&self, nature: &str, status: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Nature(wanted) => nature == wanted,
            Selection::Status(codes) => codes.iter().any(|c| c == status),
        }
    }
}

/// Filters applied to every row that carries both coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackFilter {
    /// Track types to drop (exact match on the trimmed tag).
    #[serde(default = "default_excluded_track_types")]
    pub exclude_track_types: Vec<String>,

    /// Storm selection policy.
    #[serde(default)]
    pub selection: Selection,
}

fn default_excluded_track_types() -> Vec<String> {
    vec!["PROVISIONAL_spur".to_string()]
}

impl Default for TrackFilter {
    fn default() -> Self {
        Self {
            exclude_track_types: default_excluded_track_types(),
            selection: Selection::All,
        }
    }
}

impl TrackFilter {
    /// Whether a row passes the track-type and selection filters.
    pub fn accepts(&self, track_type: &str, nature: &str, status: &str) -> bool {
        !self.exclude_track_types.iter().any(|t| t == track_type)
            && self.selection.accepts(nature, status)
    }
}
