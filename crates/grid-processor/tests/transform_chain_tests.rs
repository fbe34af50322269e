//! The dataset transform chain applied to small synthetic months.

use ndarray::{s, Array3, Array4, Axis};

use grid_processor::{
    aggregate_blocks, move_channel_last, split_flip_stack, standardize_slices,
    standardize_time_axis, trim_latitude, ZeroVariancePolicy,
};
use test_utils::{assert_approx_eq, ramp_array};

const T: usize = 8;
const H: usize = 13; // odd like the global grid; trimming 2 + 3 leaves 8
const W: usize = 12;

#[test]
fn test_input_chain_shapes_and_statistics() {
    let x: Array4<f32> = ramp_array((T, 3, H, W), 0.0).mapv(|v| (v * 0.37).sin() * 50.0 + v * 0.01);

    let x = move_channel_last(x);
    assert_eq!(x.shape(), &[T, H, W, 3]);

    let x = trim_latitude(x, 2, 3).unwrap();
    assert_eq!(x.shape(), &[T, 8, W, 3]);

    let x = standardize_time_axis(x, ZeroVariancePolicy::Unit).unwrap();
    let x = split_flip_stack(&x, &[0]).unwrap();
    assert_eq!(x.shape(), &[2 * T, 4, W, 3]);

    let x = standardize_slices(x, ZeroVariancePolicy::Unit).unwrap();
    for slice in x.axis_iter(Axis(0)) {
        let n = slice.len() as f64;
        let mean = slice.iter().map(|&v| v as f64).sum::<f64>() / n;
        let var = slice.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
        assert_approx_eq!(mean, 0.0, 1e-4);
        assert_approx_eq!(var.sqrt(), 1.0, 1e-3);
    }
    assert!(x.iter().all(|v| v.is_finite()));
}

#[test]
fn test_southern_vorticity_sign_flipped_before_slice_standardization() {
    // channel 0 positive everywhere in the north, negative in the south after folding
    let mut x = Array4::<f32>::zeros((2, 4, 2, 3));
    x.slice_mut(s![0, .., .., 0]).fill(1.0);
    x.slice_mut(s![1, .., .., 0]).fill(3.0);
    let folded = split_flip_stack(&x, &[0]).unwrap();

    assert!(folded.slice(s![..2, .., .., 0]).iter().all(|&v| v > 0.0));
    assert!(folded.slice(s![2.., .., .., 0]).iter().all(|&v| v < 0.0));
}

#[test]
fn test_target_chain_block_counts() {
    // one pixel per slot, in alternating hemispheres
    let mut y = Array3::<f32>::zeros((4, 13, 12));
    y[[0, 3, 1]] = 1.0; // north, kept after trim
    y[[1, 9, 10]] = 1.0; // south
    y[[2, 0, 0]] = 1.0; // trimmed pole row
    y[[3, 12, 5]] = 1.0; // trimmed pole row

    let y = y.insert_axis(Axis(3));
    let y = trim_latitude(y, 2, 3).unwrap();
    let y = split_flip_stack(&y, &[]).unwrap();
    assert_eq!(y.shape(), &[8, 4, 12, 1]);

    let c = aggregate_blocks(&y, 2, 4).unwrap();
    assert_eq!(c.shape(), &[8, 2, 3, 1]);

    // north: row 3 -> trimmed row 1 -> block row 0, col 1 -> block col 0
    assert_eq!(c[[0, 0, 0, 0]], 1.0);
    // south: row 9 -> trimmed row 7 -> southern row 3 -> flipped row 0
    assert_eq!(c[[4 + 1, 0, 2, 0]], 1.0);
    assert_eq!(c.sum(), 2.0);
}
