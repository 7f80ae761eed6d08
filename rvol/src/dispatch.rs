//! Job dispatcher: one job per listed object, submitted without waiting.

use std::path::PathBuf;

use crate::config::ConfigBlob;
use crate::executor::{Executor, ExecutorError};
use crate::job::{JobHandle, JobLabel, TransferJob};
use crate::locator::{RelativePathError, join, validate_relative};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("destination for {name:?} would escape the volume: {source}")]
    OutsideVolume {
        name: String,
        #[source]
        source: RelativePathError,
    },
    #[error("job for {name:?} was rejected: {source}")]
    Rejected {
        name: String,
        #[source]
        source: ExecutorError,
    },
}

/// Builds the job for the `index`-th listed name.
///
/// On error the label of the job that would have been built is returned alongside, so the
/// failure can still be reported against its source and destination.
pub fn plan_job(
    index: usize,
    name: &str,
    source: &str,
    dest_base: &str,
    config: &ConfigBlob,
) -> Result<TransferJob, (JobLabel, DispatchError)> {
    let job = TransferJob {
        index,
        name: name.to_string(),
        source: join(source, name),
        dest: PathBuf::from(join(dest_base, name)),
        config: config.clone(),
    };
    match validate_relative(name) {
        Ok(()) => Ok(job),
        Err(source) => Err((
            job.label(),
            DispatchError::OutsideVolume {
                name: name.to_string(),
                source,
            },
        )),
    }
}

/// Submits one job per name and returns their handles in listing order.
///
/// A job that cannot be submitted gets an already-failed handle; the remaining names are still
/// dispatched.
#[tracing::instrument(skip(executor, names, config), fields(jobs = names.len()))]
pub fn dispatch(
    executor: &dyn Executor,
    names: &[String],
    source: &str,
    dest_base: &str,
    config: &ConfigBlob,
) -> Vec<JobHandle> {
    let progress = common::get_progress();
    let handles: Vec<JobHandle> = names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let submitted = plan_job(index, name, source, dest_base, config).and_then(|job| {
                let label = job.label();
                executor.submit(job).map_err(|source| {
                    (
                        label,
                        DispatchError::Rejected {
                            name: name.clone(),
                            source,
                        },
                    )
                })
            });
            submitted.unwrap_or_else(|(label, error)| {
                tracing::warn!("{error}");
                progress.jobs_rejected.inc();
                JobHandle::rejected(label, error.to_string())
            })
        })
        .collect();
    debug_assert_eq!(handles.len(), names.len());
    handles
}
