//! File support for metadata pruning
//!
//! This module expands path patterns into files and runs the prune pipeline
//! on each of them, rewriting a file only when its canonical form changed.

pub mod discovery;
pub mod file;

pub use discovery::discover;
pub use file::{atomic_write, process_file, prune_source, FileOutcome, FileReport, Pruned};
