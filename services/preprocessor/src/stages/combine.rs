//! Day arrays into one month of inputs.

use std::path::PathBuf;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use ndarray::Axis;
use tracing::{info, instrument, warn};

use cyclone_common::{days_in_month, StoragePath};
use reanalysis::{assemble_month, DayArray};

use super::StageContext;
use crate::arrays::{read_array4, write_array4};
use crate::runner::{run_units, StageReport, UnitId};

/// Day files downloaded at once within a month.
const DOWNLOADS_PER_MONTH: usize = 8;

pub async fn run(ctx: &StageContext) -> StageReport {
    let units = month_units(&ctx.config.years, &ctx.config.months);
    run_units("combine", units, ctx.config.workers, |unit| {
        combine_unit(ctx, unit)
    })
    .await
}

pub(crate) fn month_units(years: &[i32], months: &[u32]) -> Vec<UnitId> {
    years
        .iter()
        .flat_map(|&year| months.iter().map(move |&month| UnitId::month(year, month)))
        .collect()
}

#[instrument(skip_all, fields(unit = %unit))]
async fn combine_unit(ctx: &StageContext, unit: UnitId) -> Result<()> {
    let (year, month) = (unit.year, unit.month.context("combine needs a month")?);
    let days = days_in_month(year, month)?;
    let scratch = ctx.scratch(unit)?;
    let prefix = &ctx.config.prefixes.inputs;

    // Missing days are skipped here so assembly reports the first gap.
    let downloaded: Vec<Option<(u32, PathBuf)>> = stream::iter(1..=days)
        .map(|day| {
            let name = StoragePath::day_inputs(year, month, day);
            let key = StoragePath::join(prefix, &name);
            let path = scratch.file(&name);
            async move {
                if !ctx.store.exists(&key).await? {
                    warn!(key = %key, "Day array missing");
                    return Ok(None);
                }
                ctx.store.get(&key, &path).await?;
                Ok::<_, anyhow::Error>(Some((day, path)))
            }
        })
        .buffered(DOWNLOADS_PER_MONTH)
        .try_collect()
        .await?;
    let downloaded: Vec<(u32, PathBuf)> = downloaded.into_iter().flatten().collect();

    let name = StoragePath::month_inputs(year, month);
    let path = scratch.file(&name);
    let out = path.clone();
    let slots = ctx
        .blocking(move || {
            let days = downloaded
                .into_iter()
                .map(|(day, path)| Ok(DayArray::new(day, read_array4(&path)?)))
                .collect::<Result<Vec<_>>>()?;
            let x = assemble_month(year, month, days)?;
            write_array4(&out, &x)?;
            Ok(x.len_of(Axis(0)))
        })
        .await?;

    let key = StoragePath::join(prefix, &name);
    ctx.store.put(&path, &key).await?;
    info!(key = %key, slots, "Uploaded month of inputs");
    Ok(())
}
