//! Element removal
//!
//! Removes selected elements from a [`Document`]. A removed element takes
//! its subtree and its tail text with it; the tail is never handed on to
//! the previous sibling or the parent.

use crate::core::error::{PruneError, PruneResult};
use crate::core::node::{Document, NodeId};

/// Remove every matched element, returning how many were detached
///
/// Matches inside an element removed earlier in the same call are skipped.
/// A parent left without children whose text is only whitespace loses that
/// text, so it is written as an empty element.
pub fn remove_elements(doc: &mut Document, matches: &[NodeId]) -> PruneResult<usize> {
    if matches.contains(&doc.root()) {
        return Err(PruneError::Query(
            "The document root element cannot be removed".to_string(),
        ));
    }

    let mut removed = 0;
    let mut parents = Vec::new();
    for id in matches {
        if !doc.is_attached(*id) {
            log::debug!("Skipping node {}: inside a removed element", id.index());
            continue;
        }
        if let Some(parent) = doc.parent(*id) {
            parents.push(parent);
        }
        doc.detach(*id)?;
        removed += 1;
    }

    for parent in parents {
        collapse_whitespace(doc, parent);
    }
    Ok(removed)
}

fn collapse_whitespace(doc: &mut Document, id: NodeId) {
    let Some(element) = doc.element_mut(id) else {
        return;
    };
    let blank = element
        .text
        .as_deref()
        .is_some_and(|text| text.trim().is_empty());
    if element.children.is_empty() && blank {
        log::debug!("Collapsing whitespace of emptied <{}>", element.name.local);
        element.text = None;
    }
}
