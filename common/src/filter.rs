//! Pattern-based filtering of listed object names
//!
//! Listed names are relative, forward-slash separated paths (e.g. `photos/2021/a.jpg`).
//!
//! # Pattern Syntax
//!
//! - `*` matches anything except `/`
//! - `**` matches anything including `/` (crosses directories)
//! - `?` matches a single character (except `/`)
//! - `[...]` character classes
//! - Leading `/` anchors the pattern to the listing root
//!
//! Non-anchored patterns without a `/` (like `*.log`) also match against the final path
//! component, so `*.log` excludes `logs/today.log`.
//!
//! # Examples
//!
//! ```
//! use common::filter::{FilterSettings, FilterResult};
//!
//! let mut settings = FilterSettings::default();
//! settings.add_exclude("*.tmp").unwrap();
//!
//! assert!(matches!(
//!     settings.should_include("cache/x.tmp"),
//!     FilterResult::ExcludedByPattern(_)
//! ));
//! assert!(matches!(settings.should_include("a.txt"), FilterResult::Included));
//! ```

use anyhow::{anyhow, Context};

/// A compiled filter pattern with its original form
#[derive(Debug, Clone)]
pub struct FilterPattern {
    /// original pattern string, reported when a name is excluded
    pub original: String,
    matcher: globset::GlobMatcher,
    /// pattern starts with / (anchored to the listing root)
    pub anchored: bool,
}

impl FilterPattern {
    pub fn parse(pattern: &str) -> Result<Self, anyhow::Error> {
        if pattern.is_empty() {
            return Err(anyhow!("empty pattern is not allowed"));
        }
        let anchored = pattern.starts_with('/');
        let pattern_str = pattern.trim_start_matches('/');
        if pattern_str.is_empty() {
            return Err(anyhow!(
                "pattern '{}' results in empty glob after stripping / markers",
                pattern
            ));
        }
        let glob = globset::GlobBuilder::new(pattern_str)
            .literal_separator(true) // * doesn't match /
            .build()
            .with_context(|| format!("invalid glob pattern: {}", pattern))?;
        Ok(Self {
            original: pattern.to_string(),
            matcher: glob.compile_matcher(),
            anchored,
        })
    }

    fn is_path_pattern(&self) -> bool {
        self.original.trim_start_matches('/').contains('/')
    }

    pub fn matches(&self, name: &str) -> bool {
        if self.matcher.is_match(name) {
            return true;
        }
        if self.anchored || self.is_path_pattern() {
            return false;
        }
        name.rsplit('/')
            .next()
            .is_some_and(|file_name| self.matcher.is_match(file_name))
    }
}

/// Result of checking whether a listed name should be transferred
#[derive(Debug, Clone)]
pub enum FilterResult {
    Included,
    /// include patterns exist but none matched
    ExcludedByDefault,
    /// excluded by a specific pattern
    ExcludedByPattern(String),
}

#[derive(Debug, Clone, Default)]
pub struct FilterSettings {
    /// if non-empty, only matching names are included
    pub includes: Vec<FilterPattern>,
    pub excludes: Vec<FilterPattern>,
}

impl FilterSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_include(&mut self, pattern: &str) -> Result<(), anyhow::Error> {
        self.includes.push(FilterPattern::parse(pattern)?);
        Ok(())
    }

    pub fn add_exclude(&mut self, pattern: &str) -> Result<(), anyhow::Error> {
        self.excludes.push(FilterPattern::parse(pattern)?);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }

    /// Excludes are checked first; if any include pattern exists, at least one must match.
    pub fn should_include(&self, name: &str) -> FilterResult {
        for pattern in &self.excludes {
            if pattern.matches(name) {
                return FilterResult::ExcludedByPattern(pattern.original.clone());
            }
        }
        if self.includes.is_empty() || self.includes.iter().any(|p| p.matches(name)) {
            FilterResult::Included
        } else {
            FilterResult::ExcludedByDefault
        }
    }

    /// Keeps the names that pass the filter, preserving their order.
    pub fn apply(&self, names: Vec<String>) -> Vec<String> {
        names
            .into_iter()
            .filter(|name| match self.should_include(name) {
                FilterResult::Included => true,
                FilterResult::ExcludedByDefault => {
                    tracing::debug!("skipping {name}: no include pattern matched");
                    false
                }
                FilterResult::ExcludedByPattern(pattern) => {
                    tracing::debug!("skipping {name}: excluded by {pattern}");
                    false
                }
            })
            .collect()
    }
}
