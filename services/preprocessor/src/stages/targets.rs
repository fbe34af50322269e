//! Track table into monthly target maps, flags and slot metadata.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use cyclone_common::{Grid, StoragePath};
use rasterizer::{apply_postprocess, rasterize};
use storage::ScratchDir;
use tracks::{TrackLoader, TrackPoint};

use super::combine::month_units;
use super::StageContext;
use crate::arrays::{write_flags, write_maps};
use crate::runner::{run_units, StageReport, UnitId};

/// Load the track table once, then rasterize every month.
pub async fn run(ctx: &StageContext) -> Result<StageReport> {
    let tracks = Arc::new(load_track_table(ctx).await?);
    let grid = Arc::new(Grid::regular(ctx.config.grid.n_lat, ctx.config.grid.n_lon)?);

    let units = month_units(&ctx.config.years, &ctx.config.months);
    Ok(run_units("targets", units, ctx.config.workers, |unit| {
        targets_unit(ctx, tracks.clone(), grid.clone(), unit)
    })
    .await)
}

/// Download and clean the configured track table.
#[instrument(skip_all, fields(key = %ctx.config.tracks.key))]
pub async fn load_track_table(ctx: &StageContext) -> Result<Vec<TrackPoint>> {
    let scratch = ScratchDir::new(ctx.config.scratch_dir.as_deref(), "tracks")?;
    let path = scratch.file("tracks.csv");
    ctx.store
        .get(&ctx.config.tracks.key, &path)
        .await
        .context("Failed to download track table")?;

    let loader = TrackLoader::new(
        ctx.config.tracks.columns.clone(),
        ctx.config.tracks.filter.clone(),
    );
    let (points, stats) = ctx
        .blocking(move || Ok(loader.load_path(&path)?))
        .await?;

    info!(
        rows = stats.rows,
        missing_coordinates = stats.missing_coordinates,
        filtered_out = stats.filtered_out,
        kept = stats.kept,
        "Loaded track table"
    );
    Ok(points)
}

#[instrument(skip_all, fields(unit = %unit))]
async fn targets_unit(
    ctx: &StageContext,
    tracks: Arc<Vec<TrackPoint>>,
    grid: Arc<Grid>,
    unit: UnitId,
) -> Result<()> {
    let (year, month) = (unit.year, unit.month.context("targets needs a month")?);
    let scratch = ctx.scratch(unit)?;
    let targets = &ctx.config.targets;
    let (kernel, post, format) = (targets.kernel, targets.postprocess, targets.format);

    let files = [
        StoragePath::target_maps(year, month, format.extension()),
        StoragePath::target_flags(year, month),
        StoragePath::meta(year, month),
    ];
    let [maps_path, flags_path, meta_path] = files.clone().map(|name| scratch.file(&name));

    let (slots, occupied) = ctx
        .blocking(move || {
            let result = rasterize(year, month, &tracks, &grid, &kernel)?;
            let (slots, occupied) = (result.slot_count(), result.occupied_slots());

            let maps = apply_postprocess(result.maps, &post)?;
            write_maps(&maps_path, &maps, format)?;
            write_flags(&flags_path, &result.flags)?;
            let meta = serde_json::to_vec(&result.meta)?;
            std::fs::write(&meta_path, meta)
                .with_context(|| format!("Failed to write {:?}", meta_path))?;
            Ok((slots, occupied))
        })
        .await?;

    for name in &files {
        let key = StoragePath::join(&ctx.config.prefixes.targets, name);
        ctx.store.put(&scratch.file(name), &key).await?;
    }
    info!(slots, occupied, "Uploaded targets");
    Ok(())
}
