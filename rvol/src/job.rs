//! Transfer jobs, their results and the handles used to await them

use std::path::PathBuf;

use crate::config::ConfigBlob;

/// One object to copy. Built by the dispatcher and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct TransferJob {
    /// position in the listing (and dispatch) order
    pub index: usize,
    /// name relative to the source, as listed
    pub name: String,
    pub source: String,
    pub dest: PathBuf,
    pub config: ConfigBlob,
}

impl TransferJob {
    pub fn label(&self) -> JobLabel {
        JobLabel {
            index: self.index,
            name: self.name.clone(),
            source: self.source.clone(),
            dest: self.dest.clone(),
        }
    }
}

/// Identifies a job in logs and reports without holding on to its config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLabel {
    pub index: usize,
    pub name: String,
    pub source: String,
    pub dest: PathBuf,
}

impl std::fmt::Display for JobLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} -> {}", self.source, self.dest.display())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum JobResult {
    Success,
    Failure { reason: String },
    Timeout,
}

impl JobResult {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

enum HandleState {
    Running(tokio::task::JoinHandle<JobResult>),
    Rejected(String),
}

/// Handle to a dispatched job.
///
/// [`JobHandle::wait`] consumes the handle, so each job is awaited at most once. A job the
/// executor refused to run is represented by an already-failed handle.
pub struct JobHandle {
    label: JobLabel,
    state: HandleState,
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let state = match &self.state {
            HandleState::Running(_) => "running",
            HandleState::Rejected(_) => "rejected",
        };
        f.debug_struct("JobHandle")
            .field("label", &self.label)
            .field("state", &state)
            .finish()
    }
}

impl JobHandle {
    pub fn running(label: JobLabel, task: tokio::task::JoinHandle<JobResult>) -> Self {
        Self {
            label,
            state: HandleState::Running(task),
        }
    }

    pub fn rejected(label: JobLabel, reason: impl Into<String>) -> Self {
        Self {
            label,
            state: HandleState::Rejected(reason.into()),
        }
    }

    pub fn label(&self) -> &JobLabel {
        &self.label
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.state, HandleState::Rejected(_))
    }

    /// Waits for the job to finish. Panicked or aborted jobs are reported as failures.
    pub async fn wait(self) -> (JobLabel, JobResult) {
        let result = match self.state {
            HandleState::Rejected(reason) => JobResult::Failure { reason },
            HandleState::Running(task) => match task.await {
                Ok(result) => result,
                Err(error) if error.is_panic() => JobResult::failure("job panicked"),
                Err(_) => JobResult::failure("job was cancelled"),
            },
        };
        (self.label, result)
    }
}
