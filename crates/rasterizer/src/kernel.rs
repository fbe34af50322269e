//! Spatial kernels that turn a track point into grid contributions.

use ndarray::ArrayViewMut2;
use serde::{Deserialize, Serialize};

use cyclone_common::Grid;

use crate::error::{RasterError, Result};

/// How a single track point is drawn onto the grid.
///
/// - **Gaussian**: a dense bump `exp(-d / (2 r)) * scale` over every cell,
///   where `d` is the planar distance in degrees (not great-circle).
/// - **Pixel**: a 1 in the single nearest cell, nothing elsewhere.
///
/// Contributions are always added to the target, never assigned, so several
/// points in one slot sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Kernel {
    Gaussian {
        #[serde(default = "default_radius")]
        radius: f32,
        #[serde(default = "default_scale")]
        scale: f32,
    },
    Pixel,
}

fn default_radius() -> f32 {
    2.0
}

fn default_scale() -> f32 {
    1.0
}

impl Default for Kernel {
    fn default() -> Self {
        Self::Gaussian {
            radius: default_radius(),
            scale: default_scale(),
        }
    }
}

impl Kernel {
    /// Reject parameters that would produce NaN or infinite fields.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Kernel::Gaussian { radius, scale } => {
                if !(radius.is_finite() && radius > 0.0) {
                    return Err(RasterError::InvalidKernel(format!(
                        "gaussian radius must be positive, got {}",
                        radius
                    )));
                }
                if !scale.is_finite() {
                    return Err(RasterError::InvalidKernel(format!(
                        "gaussian scale must be finite, got {}",
                        scale
                    )));
                }
                Ok(())
            }
            Kernel::Pixel => Ok(()),
        }
    }

    /// Add the contribution of a point at (`lat`, `lon`) to `target`.
    ///
    /// `lon` must already be in the grid's [0, 360) convention and `target`
    /// must have the grid's shape.
    pub fn stamp(&self, grid: &Grid, lat: f32, lon: f32, mut target: ArrayViewMut2<'_, f32>) {
        debug_assert_eq!(target.dim(), grid.shape());

        match *self {
            Kernel::Gaussian { radius, scale } => {
                let denom = 2.0 * radius;
                for (i, &glat) in grid.lat().iter().enumerate() {
                    let dlat2 = (lat - glat) * (lat - glat);
                    let mut row = target.row_mut(i);
                    for (cell, &glon) in row.iter_mut().zip(grid.lon().iter()) {
                        let d = (dlat2 + (lon - glon) * (lon - glon)).sqrt();
                        *cell += (-d / denom).exp() * scale;
                    }
                }
            }
            Kernel::Pixel => {
                let i = grid.nearest_lat_index(lat);
                let j = grid.nearest_lon_index(lon);
                target[[i, j]] += 1.0;
            }
        }
    }
}
