//! Execution substrate
//!
//! An [`Executor`] launches jobs and hands back a [`JobHandle`] right away; submitting never waits
//! for a job to start. [`LocalExecutor`] runs each job as a tokio task on the current runtime.
//! Admission is bounded inside the task: a job first waits for a job slot and a launch token, and
//! only then starts its timeout clock and runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::job::{JobHandle, JobResult, TransferJob};
use crate::worker::JobRunner;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("executor is closed and accepts no new jobs")]
    Closed,
    #[error("no async runtime available to run the job")]
    NoRuntime,
}

pub trait Executor: Send + Sync {
    /// Launches `job` without waiting for it to start.
    fn submit(&self, job: TransferJob) -> Result<JobHandle, ExecutorError>;
}

pub struct LocalExecutor {
    runner: Arc<dyn JobRunner>,
    slots: Arc<throttle::Semaphore>,
    launches: Arc<throttle::Semaphore>,
    job_timeout: Option<Duration>,
    closed: AtomicBool,
}

impl LocalExecutor {
    /// Executor bounded by the process-wide job slots and launch tokens of the `throttle` crate.
    pub fn new(runner: Arc<dyn JobRunner>, job_timeout: Option<Duration>) -> Self {
        Self::with_limits(
            runner,
            throttle::job_slots(),
            throttle::launch_tokens(),
            job_timeout,
        )
    }

    pub fn with_limits(
        runner: Arc<dyn JobRunner>,
        slots: Arc<throttle::Semaphore>,
        launches: Arc<throttle::Semaphore>,
        job_timeout: Option<Duration>,
    ) -> Self {
        Self {
            runner,
            slots,
            launches,
            job_timeout,
            closed: AtomicBool::new(false),
        }
    }

    /// Stops accepting new jobs. Jobs already submitted keep running.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl Executor for LocalExecutor {
    fn submit(&self, job: TransferJob) -> Result<JobHandle, ExecutorError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ExecutorError::Closed);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ExecutorError::NoRuntime)?;
        let label = job.label();
        let runner = self.runner.clone();
        let slots = self.slots.clone();
        let launches = self.launches.clone();
        let job_timeout = self.job_timeout;
        let task = runtime.spawn(async move {
            let _permit = slots.acquire().await;
            launches.consume().await;
            let progress = common::get_progress();
            let _running = progress.job_started();
            let result = match job_timeout {
                // dropping the job future on expiry kills the tool subprocess
                Some(limit) => tokio::time::timeout(limit, runner.run(&job))
                    .await
                    .unwrap_or(JobResult::Timeout),
                None => runner.run(&job).await,
            };
            match &result {
                JobResult::Success => {}
                JobResult::Failure { .. } => progress.jobs_failed.inc(),
                JobResult::Timeout => progress.jobs_timed_out.inc(),
            }
            result
        });
        common::get_progress().jobs_dispatched.inc();
        Ok(JobHandle::running(label, task))
    }
}
