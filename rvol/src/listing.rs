//! Remote listing service

use tracing::instrument;

use crate::config::ConfigBlob;
use crate::tool::{PrivateConfig, TransferTool};

#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("failed to prepare private tool config for listing: {0}")]
    ConfigSetup(#[source] std::io::Error),
    #[error("failed to run listing for {source_locator:?}: {source}")]
    Spawn {
        source_locator: String,
        #[source]
        source: std::io::Error,
    },
    #[error("listing {source_locator:?} failed with {status}: {reason}")]
    ToolFailed {
        source_locator: String,
        status: std::process::ExitStatus,
        reason: String,
    },
    #[error("listing output for {source_locator:?} is not valid UTF-8: {source}")]
    InvalidOutput {
        source_locator: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// Splits the tool's listing output into object names.
///
/// Blank lines and directory entries (trailing `/`) are dropped; order is preserved.
pub fn parse_listing(stdout: Vec<u8>) -> Result<Vec<String>, std::string::FromUtf8Error> {
    let text = String::from_utf8(stdout)?;
    Ok(text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty() && !line.ends_with('/'))
        .map(str::to_string)
        .collect())
}

/// Lists the objects at `source`, relative to it, in the order the tool reports them.
#[instrument(skip(tool, config))]
pub async fn list(
    tool: &TransferTool,
    source: &str,
    recursive: bool,
    config: &ConfigBlob,
) -> Result<Vec<String>, ListingError> {
    let private = PrivateConfig::materialize(config)
        .await
        .map_err(ListingError::ConfigSetup)?;
    let output = tool
        .invoke(&private, &tool.list_args(source, recursive))
        .await
        .map_err(|source_err| ListingError::Spawn {
            source_locator: source.to_string(),
            source: source_err,
        })?;
    if !output.success() {
        return Err(ListingError::ToolFailed {
            source_locator: source.to_string(),
            status: output.status,
            reason: output.diagnostic(),
        });
    }
    let names = parse_listing(output.stdout).map_err(|source_err| ListingError::InvalidOutput {
        source_locator: source.to_string(),
        source: source_err,
    })?;
    tracing::debug!("listed {} objects at {}", names.len(), source);
    Ok(names)
}
