//! # metaprune
//!
//! Remove elements from Salesforce metadata XML by XPath and write the result
//! back in the exact format the Metadata API produces.
//!
//! Files are parsed into a [`Document`], the elements matched by a
//! [`Selector`] are removed, and the tree is serialized in canonical form.
//! A file is only rewritten when that output differs from its current bytes,
//! so a selector that matches nothing never touches the file.
//!
//! ## Example
//!
//! ```rust
//! use metaprune::{prune_source, Selector};
//!
//! let source = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
//! <Layout xmlns=\"http://soap.sforce.com/2006/04/metadata\">\n  \
//! <relatedLists>\n    <field>Name</field>\n  </relatedLists>\n</Layout>\n";
//!
//! let selector = Selector::new("//ns:relatedLists").unwrap();
//! let pruned = prune_source(source, &selector).unwrap();
//! assert_eq!(pruned.matches, 1);
//! assert_eq!(
//!     pruned.output,
//!     "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
//! <Layout xmlns=\"http://soap.sforce.com/2006/04/metadata\"/>\n"
//! );
//! ```

pub mod core;
pub mod files;
pub mod task;

pub use crate::core::{
    parse_document, remove_elements, serialize_document, Document, ErrorKind, MetadataSerializer,
    NamespaceMap, NodeId, PruneError, PruneResult, Selector,
};
pub use crate::files::{discover, process_file, prune_source, FileOutcome, FileReport, Pruned};
pub use crate::task::{RemovalStep, RemoveElements, RunSummary, TaskOptions};
