//! Transfer tool configuration resolution
//!
//! The tool config (an rclone.conf with remote credentials) is read once on the caller's machine
//! and shipped verbatim into every job.

use std::path::{Path, PathBuf};
use std::sync::Arc;

const USERPROFILE_PLACEHOLDER: &str = "%USERPROFILE%";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config path must not be empty")]
    EmptyPath,
    #[error("cannot expand '~' in {path:?}: neither HOME nor USERPROFILE is set")]
    NoHomeDirectory { path: String },
    #[error("config file not found at {path:?}")]
    NotFound { path: PathBuf },
    #[error("failed reading config file {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid destination subdirectory {subdir:?}: {source}")]
    InvalidDestSubdir {
        subdir: String,
        #[source]
        source: crate::locator::RelativePathError,
    },
}

/// Opaque config contents shared read-only by every job of a run.
///
/// Cloning is cheap. `Debug` never prints the contents since they usually hold credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct ConfigBlob(Arc<str>);

impl ConfigBlob {
    pub fn new(contents: impl Into<Arc<str>>) -> Self {
        Self(contents.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ConfigBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConfigBlob(<{} bytes>)", self.0.len())
    }
}

/// Expands a leading `~` to the home directory and `%USERPROFILE%` to the profile directory.
///
/// `env` looks up environment variables; the process environment is used by [`load_config`].
pub fn resolve_config_path(
    raw: &str,
    env: impl Fn(&str) -> Option<std::ffi::OsString>,
) -> Result<PathBuf, ConfigError> {
    if raw.is_empty() {
        return Err(ConfigError::EmptyPath);
    }
    if let Some(rest) = raw.strip_prefix('~') {
        // "~user" forms are left alone
        if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') {
            let home = env("HOME")
                .filter(|home| !home.is_empty())
                .or_else(|| env("USERPROFILE"))
                .ok_or_else(|| ConfigError::NoHomeDirectory {
                    path: raw.to_string(),
                })?;
            let rest = rest.trim_start_matches(['/', '\\']);
            let home = PathBuf::from(home);
            return Ok(if rest.is_empty() { home } else { home.join(rest) });
        }
    }
    if raw.contains(USERPROFILE_PLACEHOLDER) {
        let profile = env("USERPROFILE").unwrap_or_default();
        return Ok(PathBuf::from(
            raw.replace(USERPROFILE_PLACEHOLDER, &profile.to_string_lossy()),
        ));
    }
    Ok(PathBuf::from(raw))
}

/// Reads the config file at an already resolved path.
pub async fn read_config(path: &Path) -> Result<ConfigBlob, ConfigError> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(ConfigBlob::new(contents)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Resolves `raw` against the process environment and reads it.
#[tracing::instrument]
pub async fn load_config(raw: &str) -> Result<ConfigBlob, ConfigError> {
    let path = resolve_config_path(raw, |key| std::env::var_os(key))?;
    let blob = read_config(&path).await?;
    tracing::info!("read transfer tool config from {}", path.display());
    Ok(blob)
}

/// Normalizes the destination subdirectory to a relative forward-slash path inside the volume.
pub fn normalize_dest_subdir(subdir: &str) -> Result<String, ConfigError> {
    crate::locator::validate_relative(subdir).map_err(|source| ConfigError::InvalidDestSubdir {
        subdir: subdir.to_string(),
        source,
    })?;
    Ok(subdir.trim_matches('/').to_string())
}
