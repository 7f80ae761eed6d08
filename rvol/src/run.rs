//! End-to-end orchestration of one run

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::instrument;

use crate::aggregate::{ReportOrder, aggregate};
use crate::config::{ConfigError, load_config, normalize_dest_subdir};
use crate::dispatch::{dispatch, plan_job};
use crate::executor::LocalExecutor;
use crate::listing::{ListingError, list};
use crate::locator::join;
use crate::summary::RunSummary;
use crate::tool::TransferTool;
use crate::volume::Volume;
use crate::worker::TransferWorker;

/// Errors that abort a run before any job is dispatched.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Listing(#[from] ListingError),
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub source: String,
    pub dest_subdir: String,
    /// path of the transfer tool config file, before `~` expansion
    pub config_path: String,
    pub recursive: bool,
    pub filter: Option<common::filter::FilterSettings>,
    pub max_files: Option<usize>,
    /// `None` disables the per-job timeout
    pub job_timeout: Option<Duration>,
    pub report_order: ReportOrder,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedJob {
    pub source: String,
    pub dest: String,
}

#[derive(Debug)]
pub enum RunReport {
    Completed(RunSummary),
    /// jobs that would have been dispatched
    DryRun(Vec<PlannedJob>),
}

fn select(names: Vec<String>, settings: &RunSettings) -> Vec<String> {
    let mut names = match &settings.filter {
        Some(filter) if !filter.is_empty() => filter.apply(names),
        _ => names,
    };
    if let Some(max_files) = settings.max_files {
        names.truncate(max_files);
    }
    names
}

/// Lists the source, copies every object onto the volume and aggregates the outcomes.
///
/// Configuration and listing failures are fatal and returned as errors; per-job failures end
/// up in the returned summary.
#[instrument(skip(tool, volume))]
pub async fn run(
    settings: &RunSettings,
    tool: TransferTool,
    volume: Arc<dyn Volume>,
) -> Result<RunReport, Error> {
    let start = Instant::now();
    let dest_subdir = normalize_dest_subdir(&settings.dest_subdir)?;
    let config = load_config(&settings.config_path).await?;
    let listed = list(&tool, &settings.source, settings.recursive, &config).await?;
    let names = select(listed, settings);
    for name in &names {
        tracing::info!("listed: {name}");
    }
    let dest_base = join(&volume.mount_path().to_string_lossy(), &dest_subdir);
    if settings.dry_run {
        let planned = names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let label = match plan_job(index, name, &settings.source, &dest_base, &config) {
                    Ok(job) => job.label(),
                    Err((label, error)) => {
                        tracing::warn!("{error}");
                        label
                    }
                };
                PlannedJob {
                    source: label.source,
                    dest: label.dest.display().to_string(),
                }
            })
            .collect();
        return Ok(RunReport::DryRun(planned));
    }
    if names.is_empty() {
        tracing::info!("nothing to transfer at {}", settings.source);
    }
    let executor = LocalExecutor::new(
        Arc::new(TransferWorker::new(tool, volume)),
        settings.job_timeout,
    );
    let handles = dispatch(&executor, &names, &settings.source, &dest_base, &config);
    executor.close();
    let summary = aggregate(handles, settings.report_order, start).await;
    tracing::info!("summary:\n{summary}");
    Ok(RunReport::Completed(summary))
}
