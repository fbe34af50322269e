//! Month rasterization: slot binning and parallel stamping.

use ndarray::{s, Array1, Array3, ArrayD, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use cyclone_common::{
    month_bounds, month_slots, slot_label, wrap_longitude, Grid, SLOT_HOURS,
};
use tracks::TrackPoint;

use crate::error::{RasterError, Result};
use crate::kernel::Kernel;
use crate::meta::{PointRecord, SlotMeta};

/// Target maps, presence flags and metadata for one month.
#[derive(Debug, Clone)]
pub struct Rasterized {
    /// `[slot, lat, lon]`
    pub maps: Array3<f32>,
    /// 1 where at least one track point fell in the slot.
    pub flags: Array1<u8>,
    pub meta: Vec<SlotMeta>,
}

impl Rasterized {
    pub fn slot_count(&self) -> usize {
        self.flags.len()
    }

    pub fn occupied_slots(&self) -> usize {
        self.flags.iter().filter(|&&f| f == 1).count()
    }
}

/// Rasterize every 6-hourly slot of `year`-`month`.
///
/// Only points whose timestamp equals a slot exactly contribute; points
/// between slots are ignored. Contributions of coincident points are summed.
#[instrument(skip(tracks, grid), fields(points = tracks.len(), grid = ?grid.shape()))]
pub fn rasterize(
    year: i32,
    month: u32,
    tracks: &[TrackPoint],
    grid: &Grid,
    kernel: &Kernel,
) -> Result<Rasterized> {
    kernel.validate()?;

    let (start, end) = month_bounds(year, month)?;
    let slots = month_slots(year, month)?;

    // (lat, lon) per slot, in track-table order
    let mut buckets: Vec<Vec<(f32, f32)>> = vec![Vec::new(); slots.len()];
    let mut meta: Vec<SlotMeta> = slots.iter().map(|t| SlotMeta::new(slot_label(t))).collect();
    let mut off_slot = 0usize;

    for point in tracks.iter().filter(|p| p.time >= start && p.time < end) {
        let elapsed = point.time - start;
        let on_slot = elapsed.num_seconds() % (SLOT_HOURS * 3600) == 0;
        if !on_slot {
            off_slot += 1;
            continue;
        }
        let idx = (elapsed.num_hours() / SLOT_HOURS) as usize;
        let lon = wrap_longitude(point.lon)?;

        buckets[idx].push((point.lat, lon));
        meta[idx]
            .points
            .push(PointRecord::new(point.lat, lon, &point.nature, &point.status));
    }

    if off_slot > 0 {
        debug!(off_slot, "Track points between slots ignored");
    }

    let (n_lat, n_lon) = grid.shape();
    let mut maps = Array3::<f32>::zeros((slots.len(), n_lat, n_lon));

    maps.axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(buckets.par_iter())
        .for_each(|(mut map, points)| {
            for &(lat, lon) in points {
                kernel.stamp(grid, lat, lon, map.view_mut());
            }
        });

    let flags: Array1<u8> = buckets
        .iter()
        .map(|b| u8::from(!b.is_empty()))
        .collect();

    let result = Rasterized { maps, flags, meta };
    info!(
        slots = result.slot_count(),
        occupied = result.occupied_slots(),
        "Rasterized month"
    );
    Ok(result)
}

/// Optional reshaping applied to target maps before they are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcess {
    /// Drop the last (south-polar) row so the row count becomes even.
    pub drop_pole_row: bool,
    /// Append a trailing singleton channel axis.
    pub channel_axis: bool,
}

/// Apply `post` to `[slot, lat, lon]` maps.
pub fn apply_postprocess(maps: Array3<f32>, post: &PostProcess) -> Result<ArrayD<f32>> {
    let maps = if post.drop_pole_row {
        let n_lat = maps.len_of(Axis(1));
        if n_lat < 2 {
            return Err(RasterError::PostProcess(format!(
                "cannot drop pole row from {} latitude rows",
                n_lat
            )));
        }
        maps.slice(s![.., ..n_lat - 1, ..]).to_owned()
    } else {
        maps
    };

    let maps = maps.into_dyn();
    if post.channel_axis {
        let last = maps.ndim();
        Ok(maps.insert_axis(Axis(last)))
    } else {
        Ok(maps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postprocess_identity() {
        let maps = Array3::<f32>::ones((4, 5, 6));
        let out = apply_postprocess(maps, &PostProcess::default()).unwrap();
        assert_eq!(out.shape(), &[4, 5, 6]);
    }

    #[test]
    fn test_postprocess_drop_pole_and_channel() {
        let mut maps = Array3::<f32>::zeros((2, 5, 3));
        maps[[0, 4, 0]] = 9.0;
        maps[[1, 3, 2]] = 7.0;
        let post = PostProcess {
            drop_pole_row: true,
            channel_axis: true,
        };
        let out = apply_postprocess(maps, &post).unwrap();
        assert_eq!(out.shape(), &[2, 4, 3, 1]);
        assert_eq!(out.sum(), 7.0);
        assert_eq!(out[[1, 3, 2, 0]], 7.0);
    }

    #[test]
    fn test_postprocess_rejects_single_row() {
        let maps = Array3::<f32>::zeros((2, 1, 3));
        let post = PostProcess {
            drop_pole_row: true,
            channel_axis: false,
        };
        assert!(matches!(
            apply_postprocess(maps, &post),
            Err(RasterError::PostProcess(_))
        ));
    }
}
