//! Daily reanalysis field sources.
//!
//! A day of raw reanalysis arrives as two NetCDF files: one with the
//! pressure-level fields (relative vorticity `vo`, temperature `t`) and one
//! with surface pressure (`sp`). Both are hourly.
//!
//! ERA5 ships these variables packed as 16-bit integers with
//! `scale_factor`/`add_offset` attributes; values are unpacked on read and
//! fill values become NaN.

use std::path::{Path, PathBuf};
use std::sync::Once;

use chrono::{Datelike, NaiveDate};
use ndarray::{Array3, Array4, ArrayD, Ix3, Ix4, IxDyn};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use cyclone_common::StoragePath;

use crate::error::{ReanalysisError, ReanalysisResult};

/// Hourly fields for one calendar day.
#[derive(Debug, Clone)]
pub struct DayFields {
    /// `[time, level, lat, lon]`
    pub vorticity: Array4<f32>,
    /// `[time, level, lat, lon]`
    pub temperature: Array4<f32>,
    /// `[time, lat, lon]`
    pub surface_pressure: Array3<f32>,
}

/// Anything that can produce the raw fields of a day.
pub trait DaySource: Send + Sync {
    fn load_day(&self, date: NaiveDate) -> ReanalysisResult<DayFields>;
}

/// Variable names inside the raw files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableNames {
    pub vorticity: String,
    pub temperature: String,
    pub surface_pressure: String,
}

impl Default for VariableNames {
    fn default() -> Self {
        Self {
            vorticity: "vo".to_string(),
            temperature: "t".to_string(),
            surface_pressure: "sp".to_string(),
        }
    }
}

/// Reads `{year}_{month}_{day}.nc` and `{year}_{month}_{day}_pressure.nc`
/// from a local directory.
#[derive(Debug, Clone)]
pub struct NetcdfDaySource {
    dir: PathBuf,
    names: VariableNames,
}

impl NetcdfDaySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            names: VariableNames::default(),
        }
    }

    pub fn with_names(mut self, names: VariableNames) -> Self {
        self.names = names;
        self
    }

    pub fn fields_path(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(StoragePath::raw_fields(date.year(), date.month(), date.day()))
    }

    pub fn pressure_path(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(StoragePath::raw_pressure(date.year(), date.month(), date.day()))
    }
}

impl DaySource for NetcdfDaySource {
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    fn load_day(&self, date: NaiveDate) -> ReanalysisResult<DayFields> {
        silence_hdf5_errors();

        let fields_path = self.fields_path(date);
        let pressure_path = self.pressure_path(date);

        let fields = open(&fields_path)?;
        let vorticity = read_variable(&fields, &self.names.vorticity)?
            .into_dimensionality::<Ix4>()
            .map_err(|_| {
                ReanalysisError::shape(format!("{} is not 4-dimensional", self.names.vorticity))
            })?;
        let temperature = read_variable(&fields, &self.names.temperature)?
            .into_dimensionality::<Ix4>()
            .map_err(|_| {
                ReanalysisError::shape(format!("{} is not 4-dimensional", self.names.temperature))
            })?;

        let pressure = open(&pressure_path)?;
        let surface_pressure = read_variable(&pressure, &self.names.surface_pressure)?
            .into_dimensionality::<Ix3>()
            .map_err(|_| {
                ReanalysisError::shape(format!(
                    "{} is not 3-dimensional",
                    self.names.surface_pressure
                ))
            })?;

        debug!(
            vorticity = ?vorticity.shape(),
            surface_pressure = ?surface_pressure.shape(),
            "Read raw day"
        );

        Ok(DayFields {
            vorticity,
            temperature,
            surface_pressure,
        })
    }
}

/// Silence HDF5's automatic error printing to stderr.
///
/// HDF5 prints diagnostics even for lookups the caller handles, such as
/// probing for optional packing attributes.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and null handlers are a
        // documented way to disable error output.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

fn open(path: &Path) -> ReanalysisResult<netcdf::File> {
    if !path.exists() {
        return Err(ReanalysisError::MissingData(format!(
            "file {}",
            path.display()
        )));
    }
    netcdf::open(path).map_err(|e| {
        ReanalysisError::InvalidFormat(format!("Failed to open {}: {}", path.display(), e))
    })
}

/// Read a whole variable, unpack it and shape it by its dimensions.
fn read_variable(file: &netcdf::File, name: &str) -> ReanalysisResult<ArrayD<f32>> {
    let var = file
        .variable(name)
        .ok_or_else(|| ReanalysisError::MissingData(format!("{} variable", name)))?;

    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

    let raw: Vec<f32> = var
        .get_values(..)
        .map_err(|e| ReanalysisError::InvalidFormat(format!("Failed to read {}: {}", name, e)))?;

    let packing = Packing {
        scale_factor: get_f64_attr(&var, "scale_factor").unwrap_or(1.0),
        add_offset: get_f64_attr(&var, "add_offset").unwrap_or(0.0),
        fill_value: get_f64_attr(&var, "_FillValue"),
        missing_value: get_f64_attr(&var, "missing_value"),
    };
    let data = packing.unpack(raw);

    ArrayD::from_shape_vec(IxDyn(&shape), data).map_err(|e| {
        ReanalysisError::shape(format!("{} values do not match {:?}: {}", name, shape, e))
    })
}

/// CF packing attributes of a variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Packing {
    pub scale_factor: f64,
    pub add_offset: f64,
    pub fill_value: Option<f64>,
    pub missing_value: Option<f64>,
}

impl Default for Packing {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            add_offset: 0.0,
            fill_value: None,
            missing_value: None,
        }
    }
}

impl Packing {
    fn is_fill(&self, raw: f32) -> bool {
        let raw = raw as f64;
        self.fill_value == Some(raw) || self.missing_value == Some(raw)
    }

    /// Apply `raw * scale_factor + add_offset`, mapping fill values to NaN.
    pub fn unpack(&self, raw: Vec<f32>) -> Vec<f32> {
        raw.into_iter()
            .map(|v| {
                if self.is_fill(v) {
                    f32::NAN
                } else {
                    (v as f64 * self.scale_factor + self.add_offset) as f32
                }
            })
            .collect()
    }
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}
