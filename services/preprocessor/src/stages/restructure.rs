//! Raw reanalysis days into `[time, channel, lat, lon]` day arrays.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use ndarray::Axis;
use tracing::{debug, instrument};

use cyclone_common::{days_in_month, StoragePath};
use reanalysis::{assemble_day, DaySource, NetcdfDaySource};
use storage::ScratchDir;

use super::StageContext;
use crate::arrays::write_array4;
use crate::runner::{run_units, StageReport, UnitId};

pub async fn run(ctx: &StageContext) -> StageReport {
    let mut units = Vec::new();
    for &year in &ctx.config.years {
        for &month in &ctx.config.months {
            match days_in_month(year, month) {
                Ok(days) => units.extend((1..=days).map(|day| UnitId::day(year, month, day))),
                Err(_) => units.push(UnitId::month(year, month)),
            }
        }
    }

    run_units("restructure", units, ctx.config.workers, |unit| {
        restructure_unit(ctx, unit)
    })
    .await
}

#[instrument(skip_all, fields(unit = %unit))]
async fn restructure_unit(ctx: &StageContext, unit: UnitId) -> Result<()> {
    let date = unit
        .month
        .zip(unit.day)
        .and_then(|(m, d)| NaiveDate::from_ymd_opt(unit.year, m, d))
        .with_context(|| format!("{} is not a calendar day", unit))?;

    let scratch = ctx.scratch(unit)?;
    let prefix = &ctx.config.prefixes.raw;
    for name in [
        StoragePath::raw_fields(date.year(), date.month(), date.day()),
        StoragePath::raw_pressure(date.year(), date.month(), date.day()),
    ] {
        ctx.store
            .get(&StoragePath::join(prefix, &name), &scratch.file(&name))
            .await
            .with_context(|| format!("Failed to download {}", name))?;
    }

    let source =
        NetcdfDaySource::new(scratch.path()).with_names(ctx.config.inputs.variables.clone());
    publish_day(ctx, source, date, &scratch).await
}

/// Restructure one day from `source` and upload the day array.
pub async fn publish_day<S>(
    ctx: &StageContext,
    source: S,
    date: NaiveDate,
    scratch: &ScratchDir,
) -> Result<()>
where
    S: DaySource + 'static,
{
    let spec = ctx.config.inputs.channels;
    let name = StoragePath::day_inputs(date.year(), date.month(), date.day());
    let path = scratch.file(&name);

    let out = path.clone();
    let slots = ctx
        .blocking(move || {
            let day = assemble_day(&source, date, &spec)?;
            write_array4(&out, &day)?;
            Ok(day.len_of(Axis(0)))
        })
        .await
        .with_context(|| format!("Failed to restructure {}", date))?;

    let key = StoragePath::join(&ctx.config.prefixes.inputs, &name);
    ctx.store.put(&path, &key).await?;
    debug!(key = %key, slots, "Uploaded day array");
    Ok(())
}
