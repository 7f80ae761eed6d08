//! Source and destination locators
//!
//! A locator is the string the transfer tool understands: either `remote:path` (an rclone
//! remote) or a plain local path. Locators are joined with forward slashes regardless of the
//! host platform.

static REMOTE_RE: std::sync::LazyLock<regex::Regex> = std::sync::LazyLock::new(|| {
    // rclone remote names: letters, digits, '_', '-', '.', ' ' (not starting with '-' or ' ')
    regex::Regex::new(r"^(?P<remote>[\w.][\w.\- ]*):(?P<path>.*)$")
        .expect("remote locator regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Remote { remote: String, path: String },
    Local(String),
}

impl Locator {
    pub fn remote_name(&self) -> Option<&str> {
        match self {
            Locator::Remote { remote, .. } => Some(remote),
            Locator::Local(_) => None,
        }
    }
}

pub fn parse_locator(locator: &str) -> Locator {
    // absolute local paths never name a remote, even if they contain ':'
    if locator.starts_with('/') {
        return Locator::Local(locator.to_string());
    }
    match REMOTE_RE.captures(locator) {
        Some(captures) => Locator::Remote {
            remote: captures["remote"].to_string(),
            path: captures["path"].to_string(),
        },
        None => Locator::Local(locator.to_string()),
    }
}

/// Joins `name` onto `base` with a single forward slash.
///
/// A base that is a bare remote (`remote:`) or empty takes the name directly.
pub fn join(base: &str, name: &str) -> String {
    let name = name.trim_start_matches('/');
    if base.is_empty() || base.ends_with(':') {
        return format!("{base}{name}");
    }
    if name.is_empty() {
        return base.to_string();
    }
    let trimmed = base.trim_end_matches('/');
    if trimmed.is_empty() {
        // base was "/" (or "//")
        return format!("/{name}");
    }
    format!("{trimmed}/{name}")
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RelativePathError {
    #[error("{path:?} contains a '..' component")]
    ParentComponent { path: String },
    #[error("{path:?} contains a backslash")]
    Backslash { path: String },
}

/// Checks that a forward-slash relative path cannot escape the directory it is joined onto.
///
/// Leading slashes and `.` components are harmless (they are dropped by [`join`] semantics);
/// `..` components are rejected, as are backslashes which some tools treat as separators.
pub fn validate_relative(path: &str) -> Result<(), RelativePathError> {
    if path.contains('\\') {
        return Err(RelativePathError::Backslash {
            path: path.to_string(),
        });
    }
    if path.split('/').any(|component| component == "..") {
        return Err(RelativePathError::ParentComponent {
            path: path.to_string(),
        });
    }
    Ok(())
}
