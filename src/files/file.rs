//! Metadata file pipeline
//!
//! One file goes through read, parse, select, remove and serialize, and is
//! written back only when the canonical output differs from what was read.
//!
//! # Example
//!
//! ```rust,no_run
//! use metaprune::{process_file, FileOutcome, Selector};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let selector = Selector::new("//ns:relatedLists")?;
//! let path = Path::new("layouts/Account-Account Layout.layout-meta.xml");
//! let report = process_file(path, &selector)?;
//! if report.outcome == FileOutcome::Written {
//!     println!("removed {} elements", report.matches);
//! }
//! # Ok(())
//! # }
//! ```

use crate::core::error::{PruneError, PruneResult};
use crate::core::mutator::remove_elements;
use crate::core::parser::DocumentParser;
use crate::core::serializer::MetadataSerializer;
use crate::core::xpath::Selector;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Result of pruning a document held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pruned {
    /// Canonical text of the pruned document
    pub output: String,
    /// Number of elements the selector matched
    pub matches: usize,
}

/// What happened to a file on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Content changed and was written back
    Written,
    /// Output equals the original bytes; the file was not touched
    Unchanged,
}

/// Per-file summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    pub matches: usize,
    pub outcome: FileOutcome,
}

/// Parse `source`, remove the elements `selector` matches and serialize
pub fn prune_source(source: &str, selector: &Selector) -> PruneResult<Pruned> {
    let mut doc = DocumentParser::new().parse(source)?;
    let matches = selector.select(&doc)?;
    log::info!("Found {} matching elements", matches.len());
    remove_elements(&mut doc, &matches)?;
    let output = MetadataSerializer::new().serialize(&doc)?;
    Ok(Pruned {
        output,
        matches: matches.len(),
    })
}

/// Prune one file in place
///
/// The file is read completely before anything is written. Errors abort
/// without touching the file.
pub fn process_file(path: &Path, selector: &Selector) -> PruneResult<FileReport> {
    log::info!("Checking {}", path.display());
    let bytes = fs::read(path)?;
    let source = std::str::from_utf8(&bytes).map_err(|e| {
        PruneError::Parse(format!("{} is not valid UTF-8: {}", path.display(), e))
    })?;

    let pruned = prune_source(source, selector)?;
    let outcome = if pruned.output.as_bytes() == bytes.as_slice() {
        FileOutcome::Unchanged
    } else {
        atomic_write(path, pruned.output.as_bytes())?;
        log::info!("Modified {}", path.display());
        FileOutcome::Written
    };

    Ok(FileReport {
        path: path.to_path_buf(),
        matches: pruned.matches,
        outcome,
    })
}

/// Replace a file's content through a temporary file in the same directory
///
/// The original permissions are carried over to the new file.
pub fn atomic_write(path: &Path, content: &[u8]) -> PruneResult<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(path).ok().map(|m| m.permissions());

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    if let Some(permissions) = permissions {
        temp.as_file().set_permissions(permissions)?;
    }
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
