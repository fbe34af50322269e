//! Axis reordering, pole trimming and hemisphere folding.
//!
//! Folding puts the southern hemisphere on top of the northern one along the
//! time axis, with its latitude order reversed so both halves run from the
//! pole towards the equator:
//!
//! ```text
//! [T, H, W, C] ──split lat──► north [T, H/2, W, C]
//!                             south [T, H/2, W, C] ──flip lat, negate──┐
//!                                                                      ▼
//!                             concat(north, south) ──► [2T, H/2, W, C]
//! ```
//!
//! Quantities whose sign follows the hemisphere (relative vorticity) are
//! negated in the southern half.

use ndarray::{concatenate, s, Array, Array4, Axis, Dimension, Slice};

use crate::error::{GridProcessorError, Result};

/// `[time, channel, lat, lon]` to `[time, lat, lon, channel]`, standard layout.
pub fn move_channel_last(x: Array4<f32>) -> Array4<f32> {
    let moved = x.permuted_axes([0, 2, 3, 1]);
    moved.as_standard_layout().into_owned()
}

/// Drop `north` rows from the top and `south` rows from the bottom of the
/// latitude axis (axis 1).
pub fn trim_latitude<D: Dimension>(
    x: Array<f32, D>,
    north: usize,
    south: usize,
) -> Result<Array<f32, D>> {
    if x.ndim() < 2 {
        return Err(GridProcessorError::shape_mismatch(
            "[time, lat, ...]",
            x.shape(),
        ));
    }
    let rows = x.len_of(Axis(1));
    if north + south >= rows {
        return Err(GridProcessorError::InvalidTrim { north, south, rows });
    }
    if north == 0 && south == 0 {
        return Ok(x);
    }
    Ok(x
        .slice_axis(Axis(1), Slice::from(north..rows - south))
        .to_owned())
}

/// Split latitude in half, flip and optionally negate the southern half, and
/// stack it after the northern half along time.
pub fn split_flip_stack(x: &Array4<f32>, negate_channels: &[usize]) -> Result<Array4<f32>> {
    let (_, rows, _, channels) = x.dim();
    if rows % 2 != 0 {
        return Err(GridProcessorError::OddLatitude(rows));
    }
    if let Some(&channel) = negate_channels.iter().find(|&&c| c >= channels) {
        return Err(GridProcessorError::ChannelOutOfRange { channel, channels });
    }

    let half = rows / 2;
    let north = x.slice(s![.., ..half, .., ..]);
    let mut south = x.slice(s![.., half..;-1, .., ..]).to_owned();
    for &channel in negate_channels {
        south
            .index_axis_mut(Axis(3), channel)
            .mapv_inplace(|v| -v);
    }

    concatenate(Axis(0), &[north, south.view()])
        .map_err(|e| GridProcessorError::shape_mismatch(x.shape(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_move_channel_last() {
        let x = Array4::from_shape_fn((2, 3, 4, 5), |(t, c, i, j)| {
            (t * 1000 + c * 100 + i * 10 + j) as f32
        });
        let y = move_channel_last(x.clone());
        assert_eq!(y.shape(), &[2, 4, 5, 3]);
        assert!(y.is_standard_layout());
        assert_eq!(y[[1, 2, 3, 0]], x[[1, 0, 2, 3]]);
        assert_eq!(y[[0, 3, 4, 2]], x[[0, 2, 3, 4]]);
    }

    #[test]
    fn test_trim_latitude() {
        let x = Array3::from_shape_fn((2, 10, 3), |(_, i, _)| i as f32);
        let y = trim_latitude(x, 2, 3).unwrap();
        assert_eq!(y.shape(), &[2, 5, 3]);
        assert_eq!(y[[0, 0, 0]], 2.0);
        assert_eq!(y[[1, 4, 2]], 6.0);
    }

    #[test]
    fn test_trim_latitude_global_rows() {
        let x = Array3::<f32>::zeros((1, 721, 2));
        let y = trim_latitude(x, 104, 105).unwrap();
        assert_eq!(y.shape(), &[1, 512, 2]);
    }

    #[test]
    fn test_trim_latitude_too_much() {
        let x = Array3::<f32>::zeros((1, 4, 2));
        assert!(matches!(
            trim_latitude(x, 2, 2),
            Err(GridProcessorError::InvalidTrim { rows: 4, .. })
        ));
    }

    #[test]
    fn test_split_flip_stack_layout() {
        // value encodes (t, row, channel)
        let x = Array4::from_shape_fn((1, 4, 2, 2), |(t, i, _, c)| {
            (t * 100 + i * 10 + c) as f32 + 1.0
        });
        let y = split_flip_stack(&x, &[0]).unwrap();
        assert_eq!(y.shape(), &[2, 2, 2, 2]);

        // north unchanged
        assert_eq!(y[[0, 0, 0, 0]], x[[0, 0, 0, 0]]);
        assert_eq!(y[[0, 1, 1, 1]], x[[0, 1, 1, 1]]);
        // south flipped: row 0 of the southern block is the last row
        assert_eq!(y[[1, 0, 0, 1]], x[[0, 3, 0, 1]]);
        assert_eq!(y[[1, 1, 0, 1]], x[[0, 2, 0, 1]]);
        // channel 0 negated in the south only
        assert_eq!(y[[1, 0, 0, 0]], -x[[0, 3, 0, 0]]);
        assert!(y.slice(s![0, .., .., 0]).iter().all(|&v| v > 0.0));
    }

    #[test]
    fn test_split_flip_stack_singleton_channel() {
        let x = Array4::from_shape_fn((3, 6, 4, 1), |(t, i, j, _)| (t + i + j) as f32);
        let y = split_flip_stack(&x, &[]).unwrap();
        assert_eq!(y.shape(), &[6, 3, 4, 1]);
        assert_eq!(y.sum(), x.sum());
    }

    #[test]
    fn test_split_flip_stack_errors() {
        let odd = Array4::<f32>::zeros((1, 5, 2, 3));
        assert!(matches!(
            split_flip_stack(&odd, &[]),
            Err(GridProcessorError::OddLatitude(5))
        ));

        let even = Array4::<f32>::zeros((1, 4, 2, 3));
        assert!(matches!(
            split_flip_stack(&even, &[3]),
            Err(GridProcessorError::ChannelOutOfRange {
                channel: 3,
                channels: 3
            })
        ));
    }
}
