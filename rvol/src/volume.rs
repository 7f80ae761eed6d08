//! Durable destination volumes
//!
//! Bytes written by the transfer tool are not considered durable until the volume has been
//! committed. [`commit_after`] is the only place a job's copy outcome and its commit outcome are
//! combined: a copy that succeeded but could not be committed is a failed job.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::job::JobResult;
use crate::tool::{CopyError, ToolOutput};

#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("cannot sync {path:?}: {source}")]
    Sync {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to run commit command {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("commit command exited with {status}: {reason}")]
    CommandFailed {
        status: std::process::ExitStatus,
        reason: String,
    },
}

/// A destination filesystem whose writes become durable on [`Volume::commit`].
#[async_trait]
pub trait Volume: Send + Sync + std::fmt::Debug {
    /// Where the volume is mounted; every job destination lives under this path.
    fn mount_path(&self) -> &Path;

    /// Makes everything written so far (in particular `written`) durable.
    async fn commit(&self, written: &Path) -> Result<(), CommitError>;
}

/// A locally mounted volume, committed by syncing the written file and its directory.
#[derive(Debug, Clone)]
pub struct LocalVolume {
    mount: PathBuf,
}

impl LocalVolume {
    pub fn new(mount: impl Into<PathBuf>) -> Self {
        Self {
            mount: mount.into(),
        }
    }
}

async fn sync_path(path: &Path) -> Result<(), CommitError> {
    let sync = async {
        let file = tokio::fs::File::open(path).await?;
        file.sync_all().await
    };
    sync.await.map_err(|source| CommitError::Sync {
        path: path.to_path_buf(),
        source,
    })
}

#[async_trait]
impl Volume for LocalVolume {
    fn mount_path(&self) -> &Path {
        &self.mount
    }

    #[tracing::instrument(skip(self))]
    async fn commit(&self, written: &Path) -> Result<(), CommitError> {
        sync_path(written).await?;
        // the directory entry must be durable too, otherwise a crash can lose the new name
        if let Some(parent) = written.parent() {
            sync_path(parent).await?;
        }
        Ok(())
    }
}

/// A volume committed by an external command, run once per job with the written path appended.
#[derive(Debug, Clone)]
pub struct CommandVolume {
    mount: PathBuf,
    program: String,
    args: Vec<String>,
}

impl CommandVolume {
    /// Returns `None` for a blank command line.
    pub fn new(mount: impl Into<PathBuf>, command_line: &str) -> Option<Self> {
        let mut words = command_line.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            mount: mount.into(),
            program,
            args: words.collect(),
        })
    }
}

#[async_trait]
impl Volume for CommandVolume {
    fn mount_path(&self) -> &Path {
        &self.mount
    }

    #[tracing::instrument(skip(self))]
    async fn commit(&self, written: &Path) -> Result<(), CommitError> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(written)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CommitError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            let output = ToolOutput {
                status: output.status,
                stdout: output.stdout,
                stderr: output.stderr,
            };
            return Err(CommitError::CommandFailed {
                status: output.status,
                reason: output.diagnostic(),
            });
        }
        Ok(())
    }
}

/// Combines a copy outcome with the volume commit that must follow it.
///
/// The volume is only committed when the copy succeeded.
pub async fn commit_after(
    copy: Result<(), CopyError>,
    volume: &dyn Volume,
    dest: &Path,
) -> JobResult {
    if let Err(error) = copy {
        return JobResult::failure(error.to_string());
    }
    match volume.commit(dest).await {
        Ok(()) => JobResult::Success,
        Err(error) => JobResult::failure(format!("commit failed: {error}")),
    }
}
