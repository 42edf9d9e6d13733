//! Metaprune core module
//!
//! This module contains the document tree and the three stages applied to it:
//! selecting elements, removing them, and serializing the result.

pub mod error;
pub mod mutator;
pub mod namespace;
pub mod node;
pub mod parser;
pub mod serializer;
pub mod xpath;

pub use error::{ErrorKind, PruneError, PruneResult};
pub use mutator::remove_elements;
pub use namespace::{NamespaceMap, XML_DECLARATION};
pub use node::{Attribute, Comment, Document, Element, NodeData, NodeId, QName};
pub use parser::{parse_document, DocumentParser};
pub use serializer::{serialize_document, MetadataSerializer};
pub use xpath::Selector;
