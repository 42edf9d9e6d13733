//! Document tree model
//!
//! This module defines the in-memory form of a parsed metadata document:
//! - Element: qualified tag, ordered attributes, leading text, children, tail
//! - Comment: comment text and tail
//! - Document: an arena of nodes owned by a single root element
//!
//! Nodes live in an arena and refer to their parent by [`NodeId`], so removing
//! a node is a detach from the parent's child list followed by dropping the
//! subtree's slots.

use crate::core::error::{PruneError, PruneResult};

/// Handle of a node inside a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena index of this node
    pub fn index(self) -> usize {
        self.0
    }
}

/// A qualified element name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    /// Prefix as written in the source, if any
    pub prefix: Option<String>,
    /// Local part of the name
    pub local: String,
    /// Namespace URI the name resolved to
    pub namespace: Option<String>,
}

impl QName {
    /// Create an unqualified name with no namespace
    pub fn new(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
            namespace: None,
        }
    }

    /// Create a name in a namespace
    pub fn with_namespace(local: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
            namespace: Some(namespace.into()),
        }
    }

    /// The name as written, `prefix:local` or `local`
    pub fn lexical(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local),
            None => self.local.clone(),
        }
    }
}

/// An attribute, kept exactly as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lexical name, e.g. `xsi:type`
    pub name: String,
    /// Local part of the name
    pub local: String,
    /// Namespace URI of a prefixed attribute
    pub namespace: Option<String>,
    /// Decoded value
    pub value: String,
}

impl Attribute {
    /// Create an attribute with no namespace
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let local = match name.split_once(':') {
            Some((_, local)) => local.to_string(),
            None => name.clone(),
        };
        Self {
            name,
            local,
            namespace: None,
            value: value.into(),
        }
    }

    /// Whether this is an `xmlns` or `xmlns:prefix` declaration
    pub fn is_namespace_declaration(&self) -> bool {
        self.name == "xmlns" || self.name.starts_with("xmlns:")
    }
}

/// An element node
#[derive(Debug, Clone)]
pub struct Element {
    pub name: QName,
    /// Attributes in source order
    pub attributes: Vec<Attribute>,
    /// Text before the first child
    pub text: Option<String>,
    pub children: Vec<NodeId>,
    /// Text after the closing tag
    pub tail: Option<String>,
}

impl Element {
    /// Create an empty element
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
            tail: None,
        }
    }

    /// Whether the element has children or non-empty leading text
    pub fn has_content(&self) -> bool {
        !self.children.is_empty() || self.text.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// A comment node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Text between `<!--` and `-->`
    pub text: String,
    pub tail: Option<String>,
}

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tail: None,
        }
    }
}

/// Payload of a tree node
#[derive(Debug, Clone)]
pub enum NodeData {
    Element(Element),
    Comment(Comment),
}

impl NodeData {
    /// Get the element, if this is an element node
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            NodeData::Element(element) => Some(element),
            NodeData::Comment(_) => None,
        }
    }

    /// Get a mutable reference to the element, if this is an element node
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            NodeData::Element(element) => Some(element),
            NodeData::Comment(_) => None,
        }
    }

    /// Get the comment, if this is a comment node
    pub fn as_comment(&self) -> Option<&Comment> {
        match self {
            NodeData::Comment(comment) => Some(comment),
            NodeData::Element(_) => None,
        }
    }

    /// Text following this node
    pub fn tail(&self) -> Option<&str> {
        match self {
            NodeData::Element(element) => element.tail.as_deref(),
            NodeData::Comment(comment) => comment.tail.as_deref(),
        }
    }

    /// Set the text following this node
    pub fn set_tail(&mut self, tail: Option<String>) {
        match self {
            NodeData::Element(element) => element.tail = tail,
            NodeData::Comment(comment) => comment.tail = tail,
        }
    }
}

#[derive(Debug, Clone)]
struct NodeSlot {
    parent: Option<NodeId>,
    data: NodeData,
}

/// A parsed document: one root element and everything below it
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Option<NodeSlot>>,
    root: NodeId,
}

impl Document {
    /// Create a document owning `root`
    pub fn new(root: Element) -> Self {
        Self {
            nodes: vec![Some(NodeSlot {
                parent: None,
                data: NodeData::Element(root),
            })],
            root: NodeId(0),
        }
    }

    /// The root element
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Namespace URI of the root element's tag
    pub fn root_namespace(&self) -> Option<&str> {
        self.element(self.root)
            .and_then(|root| root.name.namespace.as_deref())
    }

    /// Append a node as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, data: NodeData) -> PruneResult<NodeId> {
        let id = NodeId(self.nodes.len());
        let element = self.element_mut(parent).ok_or_else(|| {
            PruneError::Parse(format!("Node {} cannot hold children", parent.index()))
        })?;
        element.children.push(id);
        self.nodes.push(Some(NodeSlot {
            parent: Some(parent),
            data,
        }));
        Ok(id)
    }

    /// Get a node, if it is still part of the tree
    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.slot(id).map(|slot| &slot.data)
    }

    /// Get a mutable reference to a node, if it is still part of the tree
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes
            .get_mut(id.0)
            .and_then(|slot| slot.as_mut())
            .map(|slot| &mut slot.data)
    }

    /// Get an element node
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.get(id).and_then(NodeData::as_element)
    }

    /// Get a mutable reference to an element node
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        self.get_mut(id).and_then(NodeData::as_element_mut)
    }

    /// Parent of a node; `None` for the root and for removed nodes
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).and_then(|slot| slot.parent)
    }

    /// Children of a node in order; empty for comments and removed nodes
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.element(id)
            .map(|element| element.children.as_slice())
            .unwrap_or(&[])
    }

    /// Whether the node is still reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.slot(id).is_some()
    }

    /// Number of nodes reachable from the root
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    /// A document always holds at least its root
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Nodes below `id` in document order, not including `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            result.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        result
    }

    /// Detach a node from its parent and drop its whole subtree
    ///
    /// The node's tail goes with it. Detaching the root or a node that was
    /// already removed is an error.
    pub fn detach(&mut self, id: NodeId) -> PruneResult<()> {
        let parent = match self.slot(id) {
            None => {
                return Err(PruneError::Query(format!(
                    "Node {} was already removed",
                    id.index()
                )))
            }
            Some(slot) => slot.parent.ok_or_else(|| {
                PruneError::Query("The document root element cannot be removed".to_string())
            })?,
        };

        if let Some(element) = self.element_mut(parent) {
            element.children.retain(|child| *child != id);
        }

        let mut doomed = self.descendants(id);
        doomed.push(id);
        for node in doomed {
            self.nodes[node.0] = None;
        }
        Ok(())
    }

    fn slot(&self, id: NodeId) -> Option<&NodeSlot> {
        self.nodes.get(id.0).and_then(|slot| slot.as_ref())
    }
}
