//! Preprocessing stages.
//!
//! Each stage splits its work into independent units (a day, a month or a
//! year), runs them through [`run_units`](crate::runner::run_units) and
//! reports every outcome. A unit downloads what it needs into its own
//! [`ScratchDir`], computes, uploads and drops the scratch directory.

pub mod combine;
pub mod dataset;
pub mod restructure;
pub mod targets;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;

use storage::{BlobStore, ScratchDir};

use crate::config::PreprocessorConfig;
use crate::runner::UnitId;

/// Configuration and collaborators shared by every unit of a run.
#[derive(Clone)]
pub struct StageContext {
    pub config: Arc<PreprocessorConfig>,
    pub store: Arc<dyn BlobStore>,
    cpu: Arc<Semaphore>,
}

impl StageContext {
    pub fn new(config: PreprocessorConfig, store: Arc<dyn BlobStore>) -> Self {
        let cpu = Arc::new(Semaphore::new(config.workers));
        Self {
            config: Arc::new(config),
            store,
            cpu,
        }
    }

    /// Scratch directory for one unit.
    pub fn scratch(&self, unit: UnitId) -> Result<ScratchDir> {
        let label = unit.to_string();
        ScratchDir::new(self.config.scratch_dir.as_deref(), &label)
            .with_context(|| format!("Failed to create scratch space for {}", unit))
    }

    /// Run CPU-bound work on the blocking pool, at most `workers` at once.
    ///
    /// The permit travels with the closure and is released when the work
    /// ends, whether or not the caller is still polling.
    pub async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .cpu
            .clone()
            .acquire_owned()
            .await
            .context("CPU pool closed")?;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f()
        })
        .await
        .context("Blocking task panicked")?
    }

    /// Run store writes on the blocking pool without a CPU permit.
    ///
    /// A writer drains the months its own prefetch prepared, so it must
    /// never queue behind them for a permit.
    pub async fn write_blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .context("Blocking task panicked")?
    }
}

/// Stage selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Restructure,
    Combine,
    Targets,
    Dataset,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Restructure,
        Stage::Combine,
        Stage::Targets,
        Stage::Dataset,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Restructure => "restructure",
            Stage::Combine => "combine",
            Stage::Targets => "targets",
            Stage::Dataset => "dataset",
        }
    }
}

/// Run one stage over the configured years and months.
pub async fn run_stage(ctx: &StageContext, stage: Stage) -> Result<crate::runner::StageReport> {
    match stage {
        Stage::Restructure => Ok(restructure::run(ctx).await),
        Stage::Combine => Ok(combine::run(ctx).await),
        Stage::Targets => targets::run(ctx).await,
        Stage::Dataset => Ok(dataset::run(ctx).await),
    }
}
