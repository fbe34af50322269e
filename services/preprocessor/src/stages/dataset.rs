//! Year datasets: transform each month and fill the chunked stores.
//!
//! Months are prepared concurrently but handed to the single writer in
//! month order, so both stores are filled at strictly increasing offsets.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use futures::stream::{self, StreamExt};
use ndarray::{Array4, Axis};
use tracing::{debug, info, instrument, warn};

use cyclone_common::StoragePath;
use grid_processor::{
    aggregate_blocks, move_channel_last, split_flip_stack, standardize_slices,
    standardize_time_axis, trim_latitude, ChunkedStore, StoreDtype, StorePlan,
};
use reanalysis::CHANNELS;

use super::StageContext;
use crate::arrays::{maps_with_channel, read_array4, read_maps};
use crate::config::DatasetConfig;
use crate::runner::{run_units, StageReport, UnitId};

/// Hemispheres stacked along time.
const FOLD_FACTOR: u64 = 2;

pub async fn run(ctx: &StageContext) -> StageReport {
    let units = ctx.config.years.iter().map(|&y| UnitId::year(y)).collect();
    run_units("dataset", units, ctx.config.workers, |unit| {
        dataset_unit(ctx, unit.year)
    })
    .await
}

/// One month after the transform chain, ready to write.
#[derive(Debug)]
pub struct PreparedMonth {
    pub month: u32,
    /// `[2T, H/2, W, 3]`
    pub inputs: Array4<f32>,
    /// `[2T, H/2/bh, W/bw, 1]`
    pub targets: Array4<f32>,
}

/// Input chain: channel-last, pole trim, time-axis standardization,
/// hemisphere fold, slice standardization.
pub fn transform_inputs(x: Array4<f32>, d: &DatasetConfig) -> Result<Array4<f32>> {
    let x = move_channel_last(x);
    let x = trim_latitude(x, d.trim_north, d.trim_south)?;
    let x = standardize_time_axis(x, d.zero_variance)?;
    let x = split_flip_stack(&x, &d.negate_channels)?;
    Ok(standardize_slices(x, d.zero_variance)?)
}

/// Target chain: pole trim, hemisphere fold, block sums.
pub fn transform_targets(y: Array4<f32>, d: &DatasetConfig) -> Result<Array4<f32>> {
    let y = trim_latitude(y, d.trim_north, d.trim_south)?;
    let y = split_flip_stack(&y, &[])?;
    Ok(aggregate_blocks(&y, d.block_h, d.block_w)?)
}

#[instrument(skip(ctx))]
async fn dataset_unit(ctx: &StageContext, year: i32) -> Result<()> {
    let config = &ctx.config;
    let d = &config.dataset;
    let plan = StorePlan::for_year(year, &config.months, FOLD_FACTOR)?;
    let total = plan.total_len();
    info!(total, months = config.months.len(), "Planned year stores");

    let scratch = ctx.scratch(UnitId::year(year))?;
    let rows = config.hemisphere_rows() as u64;
    let cols = config.grid.n_lon as u64;
    let (block_rows, block_cols) = (rows / d.block_h as u64, cols / d.block_w as u64);

    let inputs_name = StoragePath::inputs_store(year);
    let targets_name = StoragePath::targets_store(year);
    let inputs_path = scratch.file(&inputs_name);
    let targets_path = scratch.file(&targets_name);

    let mut inputs = ChunkedStore::create(
        &inputs_path,
        &[total, rows, cols, CHANNELS as u64],
        &[d.chunk_len, rows, cols, CHANNELS as u64],
        StoreDtype::Float32,
        &d.store,
    )?;
    let mut targets = ChunkedStore::create(
        &targets_path,
        &[total, block_rows, block_cols, 1],
        &[d.chunk_len, block_rows, block_cols, 1],
        StoreDtype::Float32,
        &d.store,
    )?;

    let mut months = std::pin::pin!(stream::iter(config.months.clone())
        .map(|month| prepare_month(ctx, scratch.path(), year, month))
        .buffered(d.prefetch));

    while let Some(prepared) = months.next().await {
        let prepared = prepared?;
        let range = plan.check(prepared.month, prepared.inputs.len_of(Axis(0)) as u64)?;

        let month = prepared.month;
        (inputs, targets) = ctx
            .write_blocking(move || {
                inputs.write_slice(range.start, &prepared.inputs)?;
                targets.write_slice(range.start, &prepared.targets)?;
                Ok((inputs, targets))
            })
            .await
            .with_context(|| format!("Failed to write {}-{}", year, month))?;
        debug!(month, offset = inputs.offset(), "Month written");
    }

    let inputs_summary = inputs.finish()?;
    let targets_summary = targets.finish()?;
    info!(
        inputs_bytes = inputs_summary.bytes_written,
        targets_bytes = targets_summary.bytes_written,
        "Stores complete"
    );

    let uploads = [
        (
            StoragePath::join(&config.prefixes.datasets, &inputs_name),
            inputs_path,
        ),
        (
            StoragePath::join(&config.prefixes.datasets, &targets_name),
            targets_path,
        ),
    ];
    if let Err(e) = upload_stores(ctx, &uploads).await {
        for (prefix, _) in &uploads {
            if let Err(cleanup) = ctx.store.delete_prefix(prefix).await {
                warn!(prefix = %prefix, error = %cleanup, "Failed to remove partial upload");
            }
        }
        return Err(e);
    }
    Ok(())
}

/// Upload both finished stores. The caller removes whatever landed on failure.
async fn upload_stores(ctx: &StageContext, uploads: &[(String, PathBuf)]) -> Result<()> {
    for (prefix, path) in uploads {
        let files = ctx
            .store
            .put_directory(path, prefix)
            .await
            .with_context(|| format!("Failed to upload {}", prefix))?;
        debug!(prefix = %prefix, files, "Uploaded store");
    }
    Ok(())
}

/// Download one month of inputs and targets and run both chains.
#[instrument(skip(ctx, scratch))]
async fn prepare_month(
    ctx: &StageContext,
    scratch: &Path,
    year: i32,
    month: u32,
) -> Result<PreparedMonth> {
    let config = &ctx.config;
    let format = config.targets.format;

    let inputs_name = StoragePath::month_inputs(year, month);
    let maps_name = StoragePath::target_maps(year, month, format.extension());
    let inputs_path: PathBuf = scratch.join(&inputs_name);
    let maps_path: PathBuf = scratch.join(&maps_name);

    ctx.store
        .get(&StoragePath::join(&config.prefixes.inputs, &inputs_name), &inputs_path)
        .await
        .with_context(|| format!("Failed to download {}", inputs_name))?;
    ctx.store
        .get(&StoragePath::join(&config.prefixes.targets, &maps_name), &maps_path)
        .await
        .with_context(|| format!("Failed to download {}", maps_name))?;

    let d = config.dataset.clone();
    ctx.blocking(move || {
        let x = read_array4(&inputs_path)?;
        let y = maps_with_channel(read_maps(&maps_path, format)?)?;
        std::fs::remove_file(&inputs_path)?;
        std::fs::remove_file(&maps_path)?;

        if x.len_of(Axis(0)) != y.len_of(Axis(0)) {
            bail!(
                "{}-{}: {} input slots but {} target slots",
                year,
                month,
                x.len_of(Axis(0)),
                y.len_of(Axis(0))
            );
        }

        let inputs = transform_inputs(x, &d)
            .with_context(|| format!("Input chain failed for {}-{}", year, month))?;
        let targets = transform_targets(y, &d)
            .with_context(|| format!("Target chain failed for {}-{}", year, month))?;

        Ok(PreparedMonth {
            month,
            inputs,
            targets,
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::ramp_array;

    fn small_config() -> DatasetConfig {
        DatasetConfig {
            trim_north: 1,
            trim_south: 2,
            block_h: 2,
            block_w: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_transform_shapes() {
        // 11 rows - 3 trimmed = 8, 4 per hemisphere
        let d = small_config();
        let x = ramp_array((6, 3, 11, 8), 0.0).mapv(|v| (v * 0.7).sin());
        let y = Array4::<f32>::ones((6, 11, 8, 1));

        let x = transform_inputs(x, &d).unwrap();
        let y = transform_targets(y, &d).unwrap();
        assert_eq!(x.shape(), &[12, 4, 8, 3]);
        assert_eq!(y.shape(), &[12, 2, 2, 1]);
        assert!(y.iter().all(|&v| v == 8.0));
    }

    #[test]
    fn test_odd_rows_rejected() {
        let d = DatasetConfig {
            trim_south: 1,
            ..small_config()
        };
        let x = Array4::<f32>::zeros((2, 3, 11, 8));
        assert!(transform_inputs(x, &d).is_err());
    }
}
