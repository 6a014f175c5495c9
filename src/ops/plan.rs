use std::fmt;

use crate::config::PackageConfig;
use crate::error::Result;
use crate::source::{select_sources, SkipReason};

/// a file as it would be treated by a build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    /// recorded path, prefix included
    pub path: String,
    /// why it is left out, if it is
    pub skip: Option<SkipReason>,
}

impl fmt::Display for PlannedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.skip {
            None => write!(f, "+ {}", self.path),
            Some(reason) => write!(f, "- {} ({})", self.path, reason),
        }
    }
}

/// list what a build would package without staging anything.
/// included files come first, each group sorted by path.
pub fn plan(config: &PackageConfig) -> Result<Vec<PlannedFile>> {
    let config = config.clone().normalized();
    config.validate()?;

    let selection = select_sources(&config)?;
    let prefixed = |logical: &str| format!("{}{}", config.path_prefix, logical);

    let mut included: Vec<PlannedFile> = selection
        .included
        .iter()
        .map(|f| PlannedFile {
            path: prefixed(&f.logical_path),
            skip: None,
        })
        .collect();
    let mut skipped: Vec<PlannedFile> = selection
        .skipped
        .into_iter()
        .map(|(f, reason)| PlannedFile {
            path: prefixed(&f.logical_path),
            skip: Some(reason),
        })
        .collect();

    included.sort_by(|a, b| a.path.cmp(&b.path));
    skipped.sort_by(|a, b| a.path.cmp(&b.path));
    included.extend(skipped);
    Ok(included)
}
