//! Day and month input assembly.

use chrono::NaiveDate;
use ndarray::{concatenate, s, stack, Array4, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use cyclone_common::days_in_month;

use crate::error::{ReanalysisError, ReanalysisResult};
use crate::source::{DayFields, DaySource};

/// Number of input channels: vorticity, temperature, surface pressure.
pub const CHANNELS: usize = 3;

/// Which pressure levels and time samples become input channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSpec {
    /// Level index of relative vorticity (850 hPa in the raw files).
    pub vorticity_level: usize,
    /// Level index of temperature (500 hPa in the raw files).
    pub temperature_level: usize,
    /// Keep every n-th hourly sample, starting at index 0.
    pub time_stride: usize,
}

impl Default for ChannelSpec {
    fn default() -> Self {
        Self {
            vorticity_level: 1,
            temperature_level: 0,
            time_stride: 6,
        }
    }
}

/// One restructured day, `[time, channel, lat, lon]`.
#[derive(Debug, Clone)]
pub struct DayArray {
    pub day: u32,
    pub data: Array4<f32>,
}

impl DayArray {
    pub fn new(day: u32, data: Array4<f32>) -> Self {
        Self { day, data }
    }
}

/// Load one day from `source` and restructure it into `[time, 3, lat, lon]`.
#[instrument(skip(source))]
pub fn assemble_day<S: DaySource + ?Sized>(
    source: &S,
    date: NaiveDate,
    spec: &ChannelSpec,
) -> ReanalysisResult<Array4<f32>> {
    let fields = source.load_day(date)?;
    restructure(&fields, spec)
}

/// Select levels, subsample time and stack channels in fixed order.
pub fn restructure(fields: &DayFields, spec: &ChannelSpec) -> ReanalysisResult<Array4<f32>> {
    if spec.time_stride == 0 {
        return Err(ReanalysisError::shape("time stride must be at least 1"));
    }

    let (vo_t, vo_levels, vo_h, vo_w) = fields.vorticity.dim();
    let (t_t, t_levels, t_h, t_w) = fields.temperature.dim();
    let (sp_t, sp_h, sp_w) = fields.surface_pressure.dim();

    if spec.vorticity_level >= vo_levels {
        return Err(ReanalysisError::shape(format!(
            "vorticity level {} out of range for {} levels",
            spec.vorticity_level, vo_levels
        )));
    }
    if spec.temperature_level >= t_levels {
        return Err(ReanalysisError::shape(format!(
            "temperature level {} out of range for {} levels",
            spec.temperature_level, t_levels
        )));
    }
    if vo_t != t_t || vo_t != sp_t {
        return Err(ReanalysisError::shape(format!(
            "time lengths differ: vorticity {}, temperature {}, pressure {}",
            vo_t, t_t, sp_t
        )));
    }
    if (vo_h, vo_w) != (t_h, t_w) || (vo_h, vo_w) != (sp_h, sp_w) {
        return Err(ReanalysisError::shape(format!(
            "spatial shapes differ: vorticity {:?}, temperature {:?}, pressure {:?}",
            (vo_h, vo_w),
            (t_h, t_w),
            (sp_h, sp_w)
        )));
    }

    let stride = spec.time_stride as isize;
    let vo = fields
        .vorticity
        .slice(s![..;stride, spec.vorticity_level, .., ..]);
    let t = fields
        .temperature
        .slice(s![..;stride, spec.temperature_level, .., ..]);
    let sp = fields.surface_pressure.slice(s![..;stride, .., ..]);

    stack(Axis(1), &[vo, t, sp]).map_err(|e| ReanalysisError::shape(e.to_string()))
}

/// Concatenate the days of a month along time.
///
/// `days` must hold exactly days 1..=N of the month, ascending, with a
/// common `[channel, lat, lon]` shape. Anything past day N is reported as
/// out of order against N.
#[instrument(skip(days), fields(days = days.len()))]
pub fn assemble_month(
    year: i32,
    month: u32,
    days: Vec<DayArray>,
) -> ReanalysisResult<Array4<f32>> {
    let expected = days_in_month(year, month)?;

    if let Some(extra) = days.get(expected as usize) {
        return Err(ReanalysisError::DayOrder {
            expected,
            got: extra.day,
        });
    }
    for (i, day) in days.iter().enumerate() {
        let want = i as u32 + 1;
        if day.day == want {
            continue;
        }
        if day.day > want && day.day <= expected {
            return Err(ReanalysisError::MissingDay {
                year,
                month,
                day: want,
            });
        }
        return Err(ReanalysisError::DayOrder {
            expected: want,
            got: day.day,
        });
    }
    if (days.len() as u32) < expected {
        return Err(ReanalysisError::MissingDay {
            year,
            month,
            day: days.len() as u32 + 1,
        });
    }

    let trailing = days[0].data.shape()[1..].to_vec();
    if let Some(bad) = days.iter().find(|d| d.data.shape()[1..] != trailing[..]) {
        return Err(ReanalysisError::shape(format!(
            "day {} has shape {:?}, expected [_, {:?}]",
            bad.day,
            bad.data.shape(),
            trailing
        )));
    }

    let views: Vec<_> = days.iter().map(|d| d.data.view()).collect();
    let month_array =
        concatenate(Axis(0), &views).map_err(|e| ReanalysisError::shape(e.to_string()))?;

    debug!(shape = ?month_array.shape(), "Concatenated days");
    info!(year, month, slots = month_array.len_of(Axis(0)), "Assembled month inputs");
    Ok(month_array)
}
