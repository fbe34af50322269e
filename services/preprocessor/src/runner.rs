//! Bounded concurrent execution of independent units of work.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tracing::{error, info};

/// One unit of work: a year, a month or a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl UnitId {
    pub fn year(year: i32) -> Self {
        Self {
            year,
            month: None,
            day: None,
        }
    }

    pub fn month(year: i32, month: u32) -> Self {
        Self {
            year,
            month: Some(month),
            day: None,
        }
    }

    pub fn day(year: i32, month: u32, day: u32) -> Self {
        Self {
            year,
            month: Some(month),
            day: Some(day),
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.year)?;
        if let Some(month) = self.month {
            write!(f, "-{}", month)?;
        }
        if let Some(day) = self.day {
            write!(f, "-{}", day)?;
        }
        Ok(())
    }
}

/// Result of one unit.
#[derive(Debug)]
pub struct UnitOutcome {
    pub unit: UnitId,
    pub result: Result<(), String>,
    pub elapsed: Duration,
}

impl UnitOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes of every unit of a stage, in unit order.
#[derive(Debug)]
pub struct StageReport {
    pub stage: &'static str,
    pub outcomes: Vec<UnitOutcome>,
}

impl StageReport {
    pub fn failures(&self) -> impl Iterator<Item = &UnitOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.len() - self.failed()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Run `work` for every unit with at most `workers` in flight.
///
/// A failing unit is logged and recorded; its siblings keep running.
pub async fn run_units<F, Fut>(
    stage: &'static str,
    units: Vec<UnitId>,
    workers: usize,
    work: F,
) -> StageReport
where
    F: Fn(UnitId) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let total = units.len();
    info!(stage, units = total, workers, "Starting stage");

    let mut outcomes: Vec<UnitOutcome> = stream::iter(units)
        .map(|unit| {
            let fut = work(unit);
            async move {
                let start = Instant::now();
                let result = fut.await.map_err(|e| format!("{:#}", e));
                let elapsed = start.elapsed();
                match &result {
                    Ok(()) => info!(
                        stage,
                        unit = %unit,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Unit complete"
                    ),
                    Err(e) => error!(stage, unit = %unit, error = %e, "Unit failed"),
                }
                UnitOutcome {
                    unit,
                    result,
                    elapsed,
                }
            }
        })
        .buffer_unordered(workers.max(1))
        .collect()
        .await;

    outcomes.sort_by_key(|o| o.unit);
    let report = StageReport { stage, outcomes };
    info!(
        stage,
        succeeded = report.succeeded(),
        failed = report.failed(),
        "Stage finished"
    );
    report
}
