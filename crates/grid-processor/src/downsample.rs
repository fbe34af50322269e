//! Block aggregation for classification targets.
//!
//! Target maps are reduced to a coarse grid of "is there a storm in this
//! block" scores by summing non-overlapping `block_h x block_w` windows.

use ndarray::{Array4, Axis};

use crate::error::{GridProcessorError, Result};

/// Sum non-overlapping spatial blocks of a `[time, lat, lon, channel]` array.
///
/// Returns `[time, lat / block_h, lon / block_w, channel]`. Both spatial
/// dimensions must be exact multiples of the block size.
pub fn aggregate_blocks(y: &Array4<f32>, block_h: usize, block_w: usize) -> Result<Array4<f32>> {
    let (t, h, w, c) = y.dim();

    if block_h == 0 || block_w == 0 {
        return Err(GridProcessorError::BlockShape(format!(
            "block size {}x{} must be non-zero",
            block_h, block_w
        )));
    }
    if h % block_h != 0 || w % block_w != 0 {
        return Err(GridProcessorError::BlockShape(format!(
            "grid {}x{} is not divisible into {}x{} blocks",
            h, w, block_h, block_w
        )));
    }

    let (bh, bw) = (h / block_h, w / block_w);
    let blocks = y
        .to_shape((t, bh, block_h, bw, block_w, c))
        .map_err(|e| GridProcessorError::BlockShape(e.to_string()))?;

    Ok(blocks.sum_axis(Axis(4)).sum_axis(Axis(2)))
}
