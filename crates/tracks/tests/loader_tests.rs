//! Track table loading against synthetic IBTrACS-style tables.

use std::io::Write;

use tracks::{load_tracks, Selection, TrackError, TrackFilter, TrackLoader};
use test_utils::{timestamp, TrackTableBuilder};

fn loader_with(selection: Selection) -> TrackLoader {
    TrackLoader::new(
        Default::default(),
        TrackFilter {
            selection,
            ..Default::default()
        },
    )
}

// ============================================================================
// Cleaning
// ============================================================================

#[test]
fn test_units_row_skipped_and_fields_trimmed() {
    let csv = TrackTableBuilder::new()
        .raw("2010-08-01 00:00:00", " 25.1 ", "  -80.3", " HU ", " TS ", " main ")
        .build();
    let (points, stats) = TrackLoader::default().load(csv.as_bytes()).unwrap();

    assert_eq!(stats.rows, 1);
    assert_eq!(points.len(), 1);
    let p = &points[0];
    assert_eq!(p.time, timestamp("2010-08-01 00:00:00"));
    assert_eq!(p.lat, 25.1);
    assert_eq!(p.status, "HU");
    assert_eq!(p.nature, "TS");
    assert_eq!(p.track_type, "main");
}

#[test]
fn test_blank_coordinates_dropped() {
    let csv = TrackTableBuilder::new()
        .raw("2010-08-01 00:00:00", " ", "-80.0", "HU", "TS", "main")
        .raw("2010-08-01 06:00:00", "25.0", " ", "HU", "TS", "main")
        .point("2010-08-01 12:00:00", 25.5, -80.5, "HU", "TS")
        .build();
    let (points, stats) = TrackLoader::default().load(csv.as_bytes()).unwrap();

    assert_eq!(stats.rows, 3);
    assert_eq!(stats.missing_coordinates, 2);
    assert_eq!(stats.kept, 1);
    assert_eq!(points[0].time, timestamp("2010-08-01 12:00:00"));
}

#[test]
fn test_negative_longitude_wrapped() {
    let csv = TrackTableBuilder::new()
        .point("2010-08-01 00:00:00", 25.0, -80.0, "HU", "TS")
        .point("2010-08-01 06:00:00", 25.0, 180.0, "HU", "TS")
        .point("2010-08-01 12:00:00", 25.0, -180.0, "HU", "TS")
        .build();
    let (points, _) = TrackLoader::default().load(csv.as_bytes()).unwrap();

    let lons: Vec<f32> = points.iter().map(|p| p.lon).collect();
    assert_eq!(lons, vec![280.0, 180.0, 180.0]);
    assert!(points.iter().all(|p| (0.0..360.0).contains(&p.lon)));
}

#[test]
fn test_file_order_preserved() {
    let csv = TrackTableBuilder::new()
        .point("2010-08-03 00:00:00", 10.0, 100.0, "TS", "TS")
        .point("2010-08-01 00:00:00", 11.0, 101.0, "TS", "TS")
        .point("2010-08-02 00:00:00", 12.0, 102.0, "TS", "TS")
        .build();
    let (points, _) = TrackLoader::default().load(csv.as_bytes()).unwrap();

    let lats: Vec<f32> = points.iter().map(|p| p.lat).collect();
    assert_eq!(lats, vec![10.0, 11.0, 12.0]);
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn test_spur_tracks_excluded_by_default() {
    let csv = TrackTableBuilder::new()
        .point_on_track("2010-08-01 00:00:00", 25.0, -80.0, "HU", "TS", "PROVISIONAL_spur")
        .point("2010-08-01 00:00:00", 26.0, -81.0, "HU", "TS")
        .build();
    let (points, stats) = TrackLoader::default().load(csv.as_bytes()).unwrap();

    assert_eq!(stats.filtered_out, 1);
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].lat, 26.0);
}

#[test]
fn test_status_selection() {
    let csv = TrackTableBuilder::new()
        .point("2010-08-01 00:00:00", 25.0, -80.0, "HU", "TS")
        .point("2010-08-01 06:00:00", 25.0, -80.0, "TS", "TS")
        .point("2010-08-01 12:00:00", 25.0, -80.0, "TD", "TS")
        .build();
    let loader = loader_with(Selection::Status(vec!["HU".to_string()]));
    let (points, stats) = loader.load(csv.as_bytes()).unwrap();

    assert_eq!(points.len(), 1);
    assert_eq!(points[0].status, "HU");
    assert_eq!(stats.filtered_out, 2);
}

#[test]
fn test_nature_selection() {
    let csv = TrackTableBuilder::new()
        .point("2010-08-01 00:00:00", 25.0, -80.0, "HU", "TS")
        .point("2010-08-01 06:00:00", 40.0, -60.0, "EX", "ET")
        .build();
    let loader = loader_with(Selection::Nature("ET".to_string()));
    let (points, _) = loader.load(csv.as_bytes()).unwrap();

    assert_eq!(points.len(), 1);
    assert_eq!(points[0].nature, "ET");
}

#[test]
fn test_filtered_rows_are_not_parsed() {
    // Garbage in a row the filter rejects must not fail the load.
    let csv = TrackTableBuilder::new()
        .raw("not a time", "north", "west", "TD", "TS", "main")
        .point("2010-08-01 00:00:00", 25.0, -80.0, "HU", "TS")
        .build();
    let loader = loader_with(Selection::Status(vec!["HU".to_string()]));
    let (points, _) = loader.load(csv.as_bytes()).unwrap();
    assert_eq!(points.len(), 1);
}

// ============================================================================
// Malformed rows
// ============================================================================

#[test]
fn test_unparseable_coordinate_is_fatal() {
    let csv = TrackTableBuilder::new()
        .point("2010-08-01 00:00:00", 25.0, -80.0, "HU", "TS")
        .raw("2010-08-01 06:00:00", "25.0N", "-80.0", "HU", "TS", "main")
        .build();
    let err = TrackLoader::default().load(csv.as_bytes()).unwrap_err();
    match err {
        TrackError::MalformedRow { line, reason } => {
            assert_eq!(line, 4);
            assert!(reason.contains("25.0N"));
        }
        other => panic!("expected MalformedRow, got {:?}", other),
    }
}

#[test]
fn test_unparseable_timestamp_is_fatal() {
    let csv = TrackTableBuilder::new()
        .raw("08/01/2010", "25.0", "-80.0", "HU", "TS", "main")
        .build();
    let err = TrackLoader::default().load(csv.as_bytes()).unwrap_err();
    assert!(matches!(err, TrackError::MalformedRow { .. }));
}

#[test]
fn test_longitude_out_of_range_is_fatal() {
    let csv = TrackTableBuilder::new()
        .point("2010-08-01 00:00:00", 25.0, -200.0, "HU", "TS")
        .build();
    let err = TrackLoader::default().load(csv.as_bytes()).unwrap_err();
    assert!(matches!(err, TrackError::MalformedRow { .. }));
}

#[test]
fn test_latitude_out_of_range_is_fatal() {
    let csv = TrackTableBuilder::new()
        .point("2010-08-01 00:00:00", 95.0, -80.0, "HU", "TS")
        .build();
    let err = TrackLoader::default().load(csv.as_bytes()).unwrap_err();
    assert!(matches!(err, TrackError::MalformedRow { .. }));
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_load_tracks_from_file() {
    let csv = TrackTableBuilder::new()
        .point("2010-08-01 00:00:00", 25.0, -80.0, "HU", "TS")
        .point_on_track("2010-08-01 06:00:00", 25.0, -80.0, "HU", "TS", "PROVISIONAL_spur")
        .build();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(csv.as_bytes()).unwrap();

    let points = load_tracks(file.path(), &TrackFilter::default()).unwrap();
    assert_eq!(points.len(), 1);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_tracks(dir.path().join("absent.csv"), &TrackFilter::default()).unwrap_err();
    assert!(matches!(err, TrackError::Io(_)));
}
