//! Element removal task
//!
//! Runs every [`RemovalStep`] in order: expand the step's path pattern, then
//! prune each matching file. The first error stops the run; files written
//! before it keep their new content.
//!
//! # Example
//!
//! ```rust,no_run
//! use metaprune::{RemoveElements, TaskOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let task = RemoveElements::new(
//!     TaskOptions::default()
//!         .chdir("force-app/main/default")
//!         .path("layouts/*.layout-meta.xml")
//!         .xpath("//ns:relatedLists[ns:relatedList = 'RelatedNoteList']"),
//! )?;
//! let summary = task.run()?;
//! println!("{} files modified", summary.written());
//! # Ok(())
//! # }
//! ```

pub mod options;

pub use options::{RemovalStep, TaskOptions};

use crate::core::error::PruneResult;
use crate::core::xpath::Selector;
use crate::files::discovery::discover;
use crate::files::file::{process_file, FileOutcome, FileReport};
use std::path::PathBuf;

/// A validated removal task with compiled selectors
#[derive(Debug, Clone)]
pub struct RemoveElements {
    steps: Vec<(RemovalStep, Selector)>,
    base: Option<PathBuf>,
}

/// Outcome of a run, one report per processed file in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files: Vec<FileReport>,
}

impl RunSummary {
    /// Number of files rewritten
    pub fn written(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.outcome == FileOutcome::Written)
            .count()
    }

    /// Total elements matched across all files
    pub fn matches(&self) -> usize {
        self.files.iter().map(|f| f.matches).sum()
    }
}

impl RemoveElements {
    /// Validate options and compile every selector
    ///
    /// Nothing on disk is read or written here.
    pub fn new(options: TaskOptions) -> PruneResult<Self> {
        let base = options.chdir.clone();
        let mut steps = Vec::new();
        for step in options.into_steps()? {
            let selector = Selector::new(&step.xpath)?;
            steps.push((step, selector));
        }
        Ok(Self { steps, base })
    }

    /// The steps this task runs
    pub fn steps(&self) -> impl Iterator<Item = &RemovalStep> {
        self.steps.iter().map(|(step, _)| step)
    }

    /// Run all steps
    pub fn run(&self) -> PruneResult<RunSummary> {
        let base = match &self.base {
            Some(dir) => {
                log::info!("Changing directory to {}", dir.display());
                dir.clone()
            }
            None => PathBuf::from("."),
        };

        let mut summary = RunSummary::default();
        for (step, selector) in &self.steps {
            log::info!(
                "Removing elements matching {} from {}",
                step.xpath,
                step.path
            );
            for file in discover(&base, &step.path)? {
                summary.files.push(process_file(&file, selector)?);
            }
        }
        Ok(summary)
    }
}
