//! Task options
//!
//! A removal task is either a single `path`/`xpath` pair or a list of
//! [`RemovalStep`]s, optionally resolved against a base directory.

use crate::core::error::{PruneError, PruneResult};
use std::path::PathBuf;

/// One pattern of files and the selector to apply to each of them
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RemovalStep {
    /// Path pattern, `**` recurses into directories
    pub path: String,
    /// Selector for the elements to remove
    pub xpath: String,
}

impl RemovalStep {
    pub fn new(path: impl Into<String>, xpath: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            xpath: xpath.into(),
        }
    }
}

/// Options for [`RemoveElements`](crate::task::RemoveElements)
///
/// # Example
///
/// ```rust
/// use metaprune::TaskOptions;
///
/// let options = TaskOptions::default()
///     .path("src/layouts/*.layout-meta.xml")
///     .xpath("//ns:relatedLists");
/// assert_eq!(options.into_steps().unwrap().len(), 1);
/// ```
#[derive(Default, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct TaskOptions {
    /// Selector for a single step
    pub xpath: Option<String>,
    /// Path pattern for a single step
    pub path: Option<String>,
    /// Several steps, run in order
    pub elements: Option<Vec<RemovalStep>>,
    /// Directory that relative patterns are resolved against
    pub chdir: Option<PathBuf>,
}

impl TaskOptions {
    /// Set the selector of a single step.
    pub fn xpath(mut self, xpath: impl Into<String>) -> Self {
        self.xpath = Some(xpath.into());
        self
    }

    /// Set the path pattern of a single step.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add a step to the `elements` list.
    pub fn element(mut self, step: RemovalStep) -> Self {
        self.elements.get_or_insert_with(Vec::new).push(step);
        self
    }

    /// Resolve patterns against `dir` instead of the working directory.
    pub fn chdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.chdir = Some(dir.into());
        self
    }

    /// Read options from a JSON object
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> PruneResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| PruneError::Configuration(format!("Invalid task options: {}", e)))
    }

    /// Validate the options and list the steps to run
    ///
    /// Empty strings and an empty `elements` list count as not given.
    pub fn into_steps(self) -> PruneResult<Vec<RemovalStep>> {
        let xpath = self.xpath.filter(|s| !s.is_empty());
        let path = self.path.filter(|s| !s.is_empty());
        let elements = self.elements.filter(|e| !e.is_empty());

        match (path, xpath, elements) {
            (None, Some(_), _) => Err(PruneError::Configuration(
                "Specified XPath without `path` to work on.".to_string(),
            )),
            (Some(_), None, _) => Err(PruneError::Configuration(
                "Specified path without `xpath` to apply.".to_string(),
            )),
            (Some(path), Some(xpath), None) => Ok(vec![RemovalStep { path, xpath }]),
            (None, None, Some(elements)) => Ok(elements),
            _ => Err(PruneError::Configuration(
                "Please specify either a single `path` and `xpath` \
                 or a list of several through the `elements` option."
                    .to_string(),
            )),
        }
    }
}
