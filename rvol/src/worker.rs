//! The per-job transfer function: copy one object, then commit the volume.

use std::sync::Arc;

use async_trait::async_trait;

use crate::job::{JobResult, TransferJob};
use crate::tool::TransferTool;
use crate::volume::{Volume, commit_after};

/// Work performed for a single job once the executor lets it run.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job: &TransferJob) -> JobResult;
}

#[derive(Debug, Clone)]
pub struct TransferWorker {
    tool: TransferTool,
    volume: Arc<dyn Volume>,
}

impl TransferWorker {
    pub fn new(tool: TransferTool, volume: Arc<dyn Volume>) -> Self {
        Self { tool, volume }
    }
}

#[async_trait]
impl JobRunner for TransferWorker {
    #[tracing::instrument(skip(self, job), fields(index = job.index, name = %job.name))]
    async fn run(&self, job: &TransferJob) -> JobResult {
        let progress = common::get_progress();
        let copy = self.tool.copy_one(&job.source, &job.dest, &job.config).await;
        if copy.is_ok() {
            progress.copies_succeeded.inc();
            tracing::debug!("copy finished, committing volume");
        }
        let result = commit_after(copy, self.volume.as_ref(), &job.dest).await;
        if result.is_success() {
            progress.commits_succeeded.inc();
        }
        result
    }
}
