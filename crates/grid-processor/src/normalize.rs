//! Two-stage z-score standardization.
//!
//! Statistics are accumulated in f64 and use the population standard
//! deviation (no degrees-of-freedom correction).

use ndarray::parallel::prelude::*;
use ndarray::{Array, ArrayView1, ArrayViewMut, Axis, Dimension, RemoveAxis, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{GridProcessorError, Result};

/// What to do when a standardized field has no spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ZeroVariancePolicy {
    /// Treat the standard deviation as 1; the centred field (all zeros) is kept.
    #[default]
    Unit,
    /// Reject the field.
    Fail,
}

/// Mean and population standard deviation, or `None` for a constant input.
fn moments<'a>(values: impl Iterator<Item = &'a f32> + Clone) -> (f64, Option<f64>) {
    let mut n = 0usize;
    let mut sum = 0.0f64;
    let mut first: Option<f32> = None;
    let mut constant = true;
    for &v in values.clone() {
        n += 1;
        sum += v as f64;
        match first {
            None => first = Some(v),
            Some(f) => constant &= v == f,
        }
    }
    if n == 0 {
        return (0.0, None);
    }
    if constant {
        return (first.map_or(0.0, f64::from), None);
    }
    let mean = sum / n as f64;
    let var = values
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n as f64;
    (mean, Some(var.sqrt()))
}

fn resolve(
    (mean, std): (f64, Option<f64>),
    policy: ZeroVariancePolicy,
    what: impl FnOnce() -> String,
) -> Result<f64> {
    match (std, policy) {
        (Some(s), _) if s > 0.0 => Ok(s),
        (_, ZeroVariancePolicy::Unit) => Ok(1.0),
        (Some(s), ZeroVariancePolicy::Fail) if !s.is_finite() => {
            Err(GridProcessorError::NonFinite(what()))
        }
        (None, ZeroVariancePolicy::Fail) if !mean.is_finite() => {
            Err(GridProcessorError::NonFinite(what()))
        }
        (_, ZeroVariancePolicy::Fail) => Err(GridProcessorError::ZeroVariance(what())),
    }
}

/// Z-score every element against the mean and std of its lane along axis 0.
///
/// For `[time, lat, lon, channel]` input this standardizes each grid cell
/// and channel over time.
pub fn standardize_time_axis<D: Dimension>(
    mut x: Array<f32, D>,
    policy: ZeroVariancePolicy,
) -> Result<Array<f32, D>> {
    if x.ndim() == 0 {
        return Ok(x);
    }

    let stats = Zip::from(x.lanes(Axis(0)))
        .par_map_collect(|lane: ArrayView1<f32>| moments(lane.iter()));

    let resolved = stats
        .indexed_iter()
        .map(|(idx, &(mean, std))| {
            resolve((mean, std), policy, || format!("time axis at {:?}", idx)).map(|s| (mean, s))
        })
        .collect::<Result<Vec<_>>>()?;
    let resolved = Array::from_shape_vec(stats.raw_dim(), resolved)
        .map_err(|e| GridProcessorError::shape_mismatch(stats.shape(), e.to_string()))?;

    Zip::from(x.lanes_mut(Axis(0)))
        .and(&resolved)
        .par_for_each(|mut lane, &(mean, std)| {
            lane.mapv_inplace(|v| ((v as f64 - mean) / std) as f32);
        });

    Ok(x)
}

/// Z-score each axis-0 slice against its own scalar mean and std.
pub fn standardize_slices<D: RemoveAxis>(
    mut x: Array<f32, D>,
    policy: ZeroVariancePolicy,
) -> Result<Array<f32, D>> {
    if x.ndim() == 0 {
        return Ok(x);
    }

    x.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .try_for_each(|(i, mut slice)| standardize_in_place(&mut slice, policy, i))?;

    Ok(x)
}

fn standardize_in_place<D: Dimension>(
    slice: &mut ArrayViewMut<'_, f32, D>,
    policy: ZeroVariancePolicy,
    index: usize,
) -> Result<()> {
    let (mean, std) = moments(slice.iter());
    let std = resolve((mean, std), policy, || format!("slice {}", index))?;
    slice.mapv_inplace(|v| ((v as f64 - mean) / std) as f32);
    Ok(())
}

/// Time-axis standardization followed by per-slice standardization.
pub fn standardize_month<D: RemoveAxis>(
    x: Array<f32, D>,
    policy: ZeroVariancePolicy,
) -> Result<Array<f32, D>> {
    let x = standardize_time_axis(x, policy)?;
    standardize_slices(x, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    fn mean_std(values: &[f32]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
        let var = values.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
        (mean, var.sqrt())
    }

    #[test]
    fn test_time_axis_zero_mean_unit_std() {
        let x = Array3::from_shape_fn((10, 3, 4), |(t, i, j)| {
            (t as f32 * 1.5 + i as f32).sin() * 10.0 + j as f32
        });
        let z = standardize_time_axis(x, ZeroVariancePolicy::Unit).unwrap();

        for i in 0..3 {
            for j in 0..4 {
                let lane: Vec<f32> = z.slice(ndarray::s![.., i, j]).to_vec();
                let (mean, std) = mean_std(&lane);
                assert!(mean.abs() < 1e-5, "mean {} at ({}, {})", mean, i, j);
                assert!((std - 1.0).abs() < 1e-4, "std {} at ({}, {})", std, i, j);
            }
        }
    }

    #[test]
    fn test_slices_zero_mean_unit_std() {
        let x = Array3::from_shape_fn((4, 5, 6), |(t, i, j)| (t * 100 + i * 6 + j) as f32);
        let z = standardize_slices(x, ZeroVariancePolicy::Unit).unwrap();

        for t in 0..4 {
            let slice: Vec<f32> = z.index_axis(Axis(0), t).iter().copied().collect();
            let (mean, std) = mean_std(&slice);
            assert!(mean.abs() < 1e-5);
            assert!((std - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_known_values() {
        let x = array![[1.0f32, 10.0], [3.0, 30.0]];
        let z = standardize_time_axis(x, ZeroVariancePolicy::Unit).unwrap();
        assert_eq!(z, array![[-1.0f32, -1.0], [1.0, 1.0]]);
    }

    #[test]
    fn test_constant_field_unit_policy() {
        let x = Array3::<f32>::from_elem((5, 2, 2), 0.1);
        let z = standardize_month(x, ZeroVariancePolicy::Unit).unwrap();
        assert!(z.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_constant_field_fail_policy() {
        let mut x = Array3::from_shape_fn((5, 2, 2), |(t, i, j)| (t + i + j) as f32);
        x.slice_mut(ndarray::s![.., 1, 0]).fill(7.0);
        let err = standardize_time_axis(x, ZeroVariancePolicy::Fail).unwrap_err();
        match err {
            GridProcessorError::ZeroVariance(what) => assert!(what.contains("(1, 0)"), "{}", what),
            other => panic!("expected ZeroVariance, got {:?}", other),
        }
    }

    #[test]
    fn test_constant_slice_fail_policy() {
        let mut x = Array3::from_shape_fn((3, 2, 2), |(t, i, j)| (t + i * 2 + j) as f32);
        x.index_axis_mut(Axis(0), 2).fill(4.0);
        assert!(matches!(
            standardize_slices(x, ZeroVariancePolicy::Fail),
            Err(GridProcessorError::ZeroVariance(_))
        ));
    }

    #[test]
    fn test_nan_lane_fail_policy_reports_non_finite() {
        let mut x = Array3::from_shape_fn((4, 2, 2), |(t, i, j)| (t * 3 + i + j) as f32);
        x[[2, 0, 1]] = f32::NAN;
        match standardize_time_axis(x, ZeroVariancePolicy::Fail).unwrap_err() {
            GridProcessorError::NonFinite(what) => assert!(what.contains("(0, 1)"), "{}", what),
            other => panic!("expected NonFinite, got {:?}", other),
        }

        let mut x = Array3::from_shape_fn((2, 2, 2), |(t, i, j)| (t + i + j) as f32);
        x[[1, 1, 1]] = f32::INFINITY;
        assert!(matches!(
            standardize_slices(x, ZeroVariancePolicy::Fail),
            Err(GridProcessorError::NonFinite(_))
        ));
    }
}
