//! `.npy` / `.npz` files for intermediate arrays.

use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use ndarray::{Array1, Array4, ArrayD, Axis, Ix4};
use ndarray_npy::{read_npy, write_npy, NpzReader, NpzWriter};

use crate::config::MapFormat;

/// Archive entry holding target maps.
pub const MAPS_KEY: &str = "maps";

pub fn write_array4(path: &Path, array: &Array4<f32>) -> Result<()> {
    write_npy(path, array).with_context(|| format!("Failed to write {:?}", path))
}

pub fn read_array4(path: &Path) -> Result<Array4<f32>> {
    read_npy(path).with_context(|| format!("Failed to read {:?}", path))
}

pub fn write_flags(path: &Path, flags: &Array1<u8>) -> Result<()> {
    write_npy(path, flags).with_context(|| format!("Failed to write {:?}", path))
}

pub fn write_maps(path: &Path, maps: &ArrayD<f32>, format: MapFormat) -> Result<()> {
    match format {
        MapFormat::Npy => {
            write_npy(path, maps).with_context(|| format!("Failed to write {:?}", path))
        }
        MapFormat::Npz => {
            let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
            let mut npz = NpzWriter::new_compressed(file);
            npz.add_array(MAPS_KEY, maps)
                .with_context(|| format!("Failed to add maps to {:?}", path))?;
            npz.finish()
                .with_context(|| format!("Failed to finish {:?}", path))?;
            Ok(())
        }
    }
}

pub fn read_maps(path: &Path, format: MapFormat) -> Result<ArrayD<f32>> {
    match format {
        MapFormat::Npy => read_npy(path).with_context(|| format!("Failed to read {:?}", path)),
        MapFormat::Npz => {
            let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
            let mut npz = NpzReader::new(file)
                .with_context(|| format!("Failed to open archive {:?}", path))?;
            npz.by_name(MAPS_KEY)
                .with_context(|| format!("No `{}` entry in {:?}", MAPS_KEY, path))
        }
    }
}

/// Target maps as `[time, lat, lon, 1]`, adding the channel axis when absent.
pub fn maps_with_channel(maps: ArrayD<f32>) -> Result<Array4<f32>> {
    let maps = match maps.ndim() {
        3 => maps.insert_axis(Axis(3)),
        4 if maps.len_of(Axis(3)) == 1 => maps,
        _ => bail!("unexpected target map shape {:?}", maps.shape()),
    };
    maps.into_dimensionality::<Ix4>()
        .context("target maps are not 4-dimensional")
}
