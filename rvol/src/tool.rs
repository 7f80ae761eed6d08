//! Transfer tool adapter
//!
//! Every interaction with the external transfer tool (rclone or a compatible binary) goes
//! through [`TransferTool`], which turns a subprocess invocation into a typed [`ToolOutput`].
//! The tool reads its configuration from the path given by `--config`; each invocation gets its
//! own private copy of the config blob in a fresh temporary directory so concurrent jobs never
//! read or overwrite each other's config file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::instrument;

use crate::config::ConfigBlob;

/// Maximum number of diagnostic lines kept from a failed invocation.
const DIAGNOSTIC_TAIL_LINES: usize = 20;

#[derive(Debug, Clone)]
pub struct ToolSettings {
    pub tool_path: PathBuf,
    /// retries performed by the tool itself for transient failures
    pub retries: u32,
    pub multi_thread_streams: u32,
    /// files larger than this are transferred with multiple streams
    pub multi_thread_cutoff: bytesize::ByteSize,
    pub buffer_size: bytesize::ByteSize,
    /// appended verbatim to every copy invocation
    pub extra_args: Vec<String>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            tool_path: PathBuf::from("rclone"),
            retries: 10,
            multi_thread_streams: 8,
            multi_thread_cutoff: bytesize::ByteSize::mib(64),
            buffer_size: bytesize::ByteSize::mib(128),
            extra_args: Vec::new(),
        }
    }
}

/// Renders a size the way rclone's size flags expect it (`64M`, `320K`, `1000B`).
pub fn size_arg(size: bytesize::ByteSize) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    const GIB: u64 = 1024 * MIB;
    let bytes = size.as_u64();
    match bytes {
        0 => "0".to_string(),
        b if b % GIB == 0 => format!("{}G", b / GIB),
        b if b % MIB == 0 => format!("{}M", b / MIB),
        b if b % KIB == 0 => format!("{}K", b / KIB),
        b => format!("{b}B"),
    }
}

/// Captured result of one tool invocation.
#[derive(Debug)]
pub struct ToolOutput {
    pub status: std::process::ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Last few non-empty lines of stderr (or stdout if stderr is empty).
    pub fn diagnostic(&self) -> String {
        let tail = |bytes: &[u8]| {
            let text = String::from_utf8_lossy(bytes);
            let lines: Vec<&str> = text
                .lines()
                .map(str::trim_end)
                .filter(|line| !line.is_empty())
                .collect();
            let start = lines.len().saturating_sub(DIAGNOSTIC_TAIL_LINES);
            lines[start..].join("\n")
        };
        let stderr = tail(&self.stderr);
        if !stderr.is_empty() {
            return stderr;
        }
        let stdout = tail(&self.stdout);
        if !stdout.is_empty() {
            return stdout;
        }
        match self.status.code() {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("failed to prepare private tool config: {0}")]
    ConfigSetup(#[source] std::io::Error),
    #[error("failed to create destination directory {path:?}: {source}")]
    CreateParent {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to run {tool:?}: {source}")]
    Spawn {
        tool: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("transfer tool exited with {status}: {reason}")]
    ToolFailed {
        status: std::process::ExitStatus,
        reason: String,
    },
}

/// A private on-disk copy of the config blob, removed when dropped.
pub struct PrivateConfig {
    _dir: tempfile::TempDir,
    path: PathBuf,
}

impl PrivateConfig {
    pub async fn materialize(config: &ConfigBlob) -> std::io::Result<Self> {
        let dir =
            tokio::task::spawn_blocking(|| tempfile::Builder::new().prefix("rvol-job-").tempdir())
                .await
                .map_err(std::io::Error::other)??;
        let path = dir.path().join("rclone.conf");
        tokio::fs::write(&path, config.as_str()).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).await?;
        }
        Ok(Self { _dir: dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Clone)]
pub struct TransferTool {
    settings: ToolSettings,
}

impl TransferTool {
    pub fn new(settings: ToolSettings) -> Self {
        Self { settings }
    }

    /// Arguments for a single-object copy, excluding the leading `--config <path>`.
    pub fn copy_args(&self, source: &str, dest: &Path) -> Vec<OsString> {
        let settings = &self.settings;
        let mut args: Vec<OsString> = vec![
            "copyto".into(),
            source.into(),
            dest.as_os_str().to_owned(),
            "--transfers".into(),
            "1".into(),
            "--retries".into(),
            settings.retries.to_string().into(),
            "--buffer-size".into(),
            size_arg(settings.buffer_size).into(),
            "--multi-thread-streams".into(),
            settings.multi_thread_streams.to_string().into(),
            "--multi-thread-cutoff".into(),
            size_arg(settings.multi_thread_cutoff).into(),
        ];
        if crate::locator::parse_locator(source).remote_name() == Some("onedrive") {
            // must be a multiple of 320k
            args.push("--onedrive-chunk-size".into());
            args.push("320M".into());
        }
        args.extend(settings.extra_args.iter().map(OsString::from));
        args
    }

    /// Arguments for listing the files at `source`, excluding the leading `--config <path>`.
    pub fn list_args(&self, source: &str, recursive: bool) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["lsf".into(), "--files-only".into()];
        if recursive {
            args.push("-R".into());
        }
        args.push(source.into());
        args
    }

    /// Runs the tool with a private copy of `config` and captures its output.
    ///
    /// The child is killed if the returned future is dropped before it completes.
    #[instrument(skip(self, config))]
    pub async fn invoke(
        &self,
        config: &PrivateConfig,
        args: &[OsString],
    ) -> std::io::Result<ToolOutput> {
        let output = tokio::process::Command::new(&self.settings.tool_path)
            .arg("--config")
            .arg(config.path())
            .args(args)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;
        tracing::debug!("tool exited with {}", output.status);
        Ok(ToolOutput {
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    /// Copies one object to `dest`, creating the destination's parent directory first.
    ///
    /// The tool retries transient failures internally; a failed invocation is final.
    #[instrument(skip(self, config))]
    pub async fn copy_one(
        &self,
        source: &str,
        dest: &Path,
        config: &ConfigBlob,
    ) -> Result<(), CopyError> {
        let private = PrivateConfig::materialize(config)
            .await
            .map_err(CopyError::ConfigSetup)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| CopyError::CreateParent {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let args = self.copy_args(source, dest);
        let output = self
            .invoke(&private, &args)
            .await
            .map_err(|source| CopyError::Spawn {
                tool: self.settings.tool_path.clone(),
                source,
            })?;
        if !output.success() {
            return Err(CopyError::ToolFailed {
                status: output.status,
                reason: output.diagnostic(),
            });
        }
        Ok(())
    }
}
