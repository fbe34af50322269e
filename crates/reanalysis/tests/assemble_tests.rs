//! Day and month assembly against synthetic sources.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use ndarray::{s, Array4};

use reanalysis::{
    assemble_day, assemble_month, ChannelSpec, DayArray, DayFields, DaySource, NetcdfDaySource,
    ReanalysisError, ReanalysisResult,
};
use test_utils::{require_test_file, synthetic_day_fields};

const N_LAT: usize = 4;
const N_LON: usize = 6;

/// Serves synthetic hourly fields for any date, or fails for listed dates.
struct SyntheticSource {
    missing: HashSet<NaiveDate>,
}

impl SyntheticSource {
    fn new() -> Self {
        Self {
            missing: HashSet::new(),
        }
    }
}

impl DaySource for SyntheticSource {
    fn load_day(&self, date: NaiveDate) -> ReanalysisResult<DayFields> {
        if self.missing.contains(&date) {
            return Err(ReanalysisError::MissingData(date.to_string()));
        }
        let (vorticity, temperature, surface_pressure) =
            synthetic_day_fields(24, 2, N_LAT, N_LON, date.day());
        Ok(DayFields {
            vorticity,
            temperature,
            surface_pressure,
        })
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn month_days(source: &SyntheticSource, year: i32, month: u32, n: u32) -> Vec<DayArray> {
    (1..=n)
        .map(|d| {
            let data = assemble_day(source, date(year, month, d), &ChannelSpec::default()).unwrap();
            DayArray::new(d, data)
        })
        .collect()
}

// ============================================================================
// assemble_day
// ============================================================================

#[test]
fn test_assemble_day_selects_levels_and_samples() {
    let source = SyntheticSource::new();
    let d = date(2010, 8, 1);
    let out = assemble_day(&source, d, &ChannelSpec::default()).unwrap();
    assert_eq!(out.shape(), &[4, 3, N_LAT, N_LON]);

    let raw = source.load_day(d).unwrap();
    for (k, hour) in [0usize, 6, 12, 18].into_iter().enumerate() {
        assert_eq!(
            out.slice(s![k, 0, .., ..]),
            raw.vorticity.slice(s![hour, 1, .., ..])
        );
        assert_eq!(
            out.slice(s![k, 1, .., ..]),
            raw.temperature.slice(s![hour, 0, .., ..])
        );
        assert_eq!(
            out.slice(s![k, 2, .., ..]),
            raw.surface_pressure.slice(s![hour, .., ..])
        );
    }
}

#[test]
fn test_assemble_day_propagates_source_errors() {
    let mut source = SyntheticSource::new();
    source.missing.insert(date(2010, 8, 2));
    let err = assemble_day(&source, date(2010, 8, 2), &ChannelSpec::default()).unwrap_err();
    assert!(matches!(err, ReanalysisError::MissingData(_)));
}

// ============================================================================
// assemble_month
// ============================================================================

#[test]
fn test_assemble_month_concatenates_in_day_order() {
    let source = SyntheticSource::new();
    let days = month_days(&source, 2010, 2, 28);
    let first_of_day_3 = days[2].data.slice(s![0, .., .., ..]).to_owned();

    let month = assemble_month(2010, 2, days).unwrap();
    assert_eq!(month.shape(), &[112, 3, N_LAT, N_LON]);
    assert_eq!(month.slice(s![8, .., .., ..]), first_of_day_3);
}

#[test]
fn test_assemble_month_missing_day() {
    let source = SyntheticSource::new();
    let mut days = month_days(&source, 2010, 2, 28);
    days.remove(9);
    match assemble_month(2010, 2, days) {
        Err(ReanalysisError::MissingDay { day, .. }) => assert_eq!(day, 10),
        other => panic!("expected MissingDay, got {:?}", other.map(|a| a.dim())),
    }
}

#[test]
fn test_assemble_month_truncated() {
    let source = SyntheticSource::new();
    let days = month_days(&source, 2010, 2, 27);
    assert!(matches!(
        assemble_month(2010, 2, days),
        Err(ReanalysisError::MissingDay { day: 28, .. })
    ));
}

#[test]
fn test_assemble_month_out_of_order() {
    let source = SyntheticSource::new();
    let mut days = month_days(&source, 2010, 2, 28);
    days.swap(3, 4);
    assert!(matches!(
        assemble_month(2010, 2, days),
        Err(ReanalysisError::MissingDay { day: 4, .. })
    ));

    let mut days = month_days(&source, 2010, 2, 28);
    days[5].day = 5;
    assert!(matches!(
        assemble_month(2010, 2, days),
        Err(ReanalysisError::DayOrder { expected: 6, got: 5 })
    ));
}

#[test]
fn test_assemble_month_extra_day() {
    let source = SyntheticSource::new();
    let mut days = month_days(&source, 2010, 2, 28);
    days.push(DayArray::new(29, days[0].data.clone()));
    assert!(matches!(
        assemble_month(2010, 2, days),
        Err(ReanalysisError::DayOrder { expected: 28, got: 29 })
    ));
}

#[test]
fn test_assemble_month_trailing_shape_mismatch() {
    let source = SyntheticSource::new();
    let mut days = month_days(&source, 2010, 2, 28);
    days[7].data = Array4::zeros((4, 3, N_LAT + 1, N_LON));
    assert!(matches!(
        assemble_month(2010, 2, days),
        Err(ReanalysisError::ShapeMismatch(_))
    ));
}

// ============================================================================
// Real files
// ============================================================================

#[test]
fn test_netcdf_day_source_real_files() {
    let path = require_test_file!("2010_8_1.nc");
    let _ = require_test_file!("2010_8_1_pressure.nc");

    let dir = path.parent().unwrap().to_path_buf();
    let source = NetcdfDaySource::new(dir);
    let out = assemble_day(&source, date(2010, 8, 1), &ChannelSpec::default()).unwrap();

    assert_eq!(out.shape()[0], 4);
    assert_eq!(out.shape()[1], 3);
    assert_eq!(&out.shape()[2..], &[721, 1440]);
}
