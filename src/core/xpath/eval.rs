//! XPath evaluation
//!
//! Evaluates a compiled [`Expr`] against a [`Document`] following the XPath 1.0
//! data model: the document node, elements, attributes, text and comments.
//! Text nodes are the leading text of an element and the tail of each node.

use crate::core::error::{PruneError, PruneResult};
use crate::core::node::{Document, NodeData, NodeId};
use crate::core::xpath::ast::{Axis, BinaryOp, Expr, NodeTest, Step};
use crate::core::xpath::functions::parse_number;
use std::collections::{HashMap, HashSet};

/// Which text slot of a node a text node stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextSlot {
    /// The element's own text before its first child
    Leading,
    /// Text after the node's end
    Tail,
}

/// A node in the XPath view of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XNode {
    /// The document node above the root element
    Root,
    /// An element or comment
    Node(NodeId),
    /// Attribute by index into the element's attribute list
    Attribute(NodeId, usize),
    Text(NodeId, TextSlot),
}

/// Result of evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Node-set in document order
    Nodes(Vec<XNode>),
    Boolean(bool),
    Number(f64),
    String(String),
    /// Result of `re:match`: behaves like a node-set of text nodes
    Matches(Vec<String>),
}

impl Value {
    /// XPath `boolean()` conversion
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Nodes(nodes) => !nodes.is_empty(),
            Value::Matches(items) => !items.is_empty(),
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
        }
    }
}

/// Evaluation context
#[derive(Debug, Clone, Copy)]
pub struct Context {
    pub node: XNode,
    /// 1-based position within the current node list
    pub position: usize,
    pub size: usize,
}

impl Context {
    /// Context for a single node
    pub fn new(node: XNode) -> Self {
        Self {
            node,
            position: 1,
            size: 1,
        }
    }
}

/// Expression evaluator bound to one document
pub struct Evaluator<'d> {
    pub(crate) doc: &'d Document,
    order: HashMap<XNode, usize>,
}

impl<'d> Evaluator<'d> {
    /// Create an evaluator, indexing the document order of every node
    pub fn new(doc: &'d Document) -> Self {
        let mut evaluator = Self {
            doc,
            order: HashMap::new(),
        };
        let mut order = HashMap::new();
        let mut stack = vec![XNode::Root];
        while let Some(node) = stack.pop() {
            order.insert(node, order.len());
            for attr in evaluator.attributes(node) {
                order.insert(attr, order.len());
            }
            stack.extend(evaluator.children(node).into_iter().rev());
        }
        evaluator.order = order;
        evaluator
    }

    /// Evaluate an expression
    pub fn eval(&self, expr: &Expr, ctx: &Context) -> PruneResult<Value> {
        match expr {
            Expr::Literal(s) => Ok(Value::String(s.clone())),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Binary { op, left, right } => self.binary(*op, left, right, ctx),
            Expr::Negate(inner) => Ok(Value::Number(-self.number_of(inner, ctx)?)),
            Expr::Union(left, right) => {
                let mut nodes = self.node_set(left, ctx, "|")?;
                nodes.extend(self.node_set(right, ctx, "|")?);
                Ok(Value::Nodes(self.sorted(nodes)))
            }
            Expr::Call(call) => self.call(call, ctx),
            Expr::Path(path) => {
                let start = if path.absolute { XNode::Root } else { ctx.node };
                Ok(Value::Nodes(self.steps(vec![start], &path.steps)?))
            }
            Expr::Filter {
                primary,
                predicates,
                steps,
            } => {
                let nodes = self.node_set(primary, ctx, "a filter expression")?;
                let nodes = self.predicates(self.sorted(nodes), predicates)?;
                Ok(Value::Nodes(self.steps(nodes, steps)?))
            }
        }
    }

    /// Evaluate an expression that must produce a node-set
    pub(crate) fn node_set(
        &self,
        expr: &Expr,
        ctx: &Context,
        what: &str,
    ) -> PruneResult<Vec<XNode>> {
        match self.eval(expr, ctx)? {
            Value::Nodes(nodes) => Ok(nodes),
            other => Err(PruneError::Query(format!(
                "Expected a node-set for {}, got {:?}",
                what, other
            ))),
        }
    }

    pub(crate) fn string_of(&self, expr: &Expr, ctx: &Context) -> PruneResult<String> {
        let value = self.eval(expr, ctx)?;
        Ok(self.to_string(&value))
    }

    pub(crate) fn number_of(&self, expr: &Expr, ctx: &Context) -> PruneResult<f64> {
        let value = self.eval(expr, ctx)?;
        Ok(self.to_number(&value))
    }

    /// XPath `string()` conversion
    pub fn to_string(&self, value: &Value) -> String {
        match value {
            Value::Nodes(nodes) => nodes
                .first()
                .map(|n| self.string_value(*n))
                .unwrap_or_default(),
            Value::Matches(items) => items.first().cloned().unwrap_or_default(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
        }
    }

    /// XPath `number()` conversion
    pub fn to_number(&self, value: &Value) -> f64 {
        match value {
            Value::Number(n) => *n,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            other => parse_number(&self.to_string(other)),
        }
    }

    /// String-value of a node
    pub fn string_value(&self, node: XNode) -> String {
        match node {
            XNode::Root => self.string_value(XNode::Node(self.doc.root())),
            XNode::Node(id) => match self.doc.get(id) {
                Some(NodeData::Comment(comment)) => comment.text.clone(),
                Some(NodeData::Element(_)) => {
                    let mut result = String::new();
                    self.collect_text(id, &mut result);
                    result
                }
                None => String::new(),
            },
            XNode::Attribute(id, index) => self
                .doc
                .element(id)
                .and_then(|e| e.attributes.get(index))
                .map(|a| a.value.clone())
                .unwrap_or_default(),
            XNode::Text(id, TextSlot::Leading) => self
                .doc
                .element(id)
                .and_then(|e| e.text.clone())
                .unwrap_or_default(),
            XNode::Text(id, TextSlot::Tail) => self
                .doc
                .get(id)
                .and_then(|data| data.tail())
                .unwrap_or_default()
                .to_string(),
        }
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(element) = self.doc.element(id) else {
            return;
        };
        out.push_str(element.text.as_deref().unwrap_or_default());
        for child in &element.children {
            if self.doc.element(*child).is_some() {
                self.collect_text(*child, out);
            }
            if let Some(tail) = self.doc.get(*child).and_then(|data| data.tail()) {
                out.push_str(tail);
            }
        }
    }

    fn binary(&self, op: BinaryOp, left: &Expr, right: &Expr, ctx: &Context) -> PruneResult<Value> {
        match op {
            BinaryOp::Or => Ok(Value::Boolean(
                self.eval(left, ctx)?.to_boolean() || self.eval(right, ctx)?.to_boolean(),
            )),
            BinaryOp::And => Ok(Value::Boolean(
                self.eval(left, ctx)?.to_boolean() && self.eval(right, ctx)?.to_boolean(),
            )),
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq => {
                let l = self.eval(left, ctx)?;
                let r = self.eval(right, ctx)?;
                Ok(Value::Boolean(self.compare(op, &l, &r)))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let l = self.number_of(left, ctx)?;
                let r = self.number_of(right, ctx)?;
                Ok(Value::Number(match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => l / r,
                    _ => l % r,
                }))
            }
        }
    }

    /// String items of a node-set-like value
    fn items(&self, value: &Value) -> Option<Vec<String>> {
        match value {
            Value::Nodes(nodes) => Some(nodes.iter().map(|n| self.string_value(*n)).collect()),
            Value::Matches(items) => Some(items.clone()),
            _ => None,
        }
    }

    /// Comparison with the existential node-set semantics of XPath 1.0
    fn compare(&self, op: BinaryOp, left: &Value, right: &Value) -> bool {
        match (self.items(left), self.items(right)) {
            (Some(ls), Some(rs)) => ls.iter().any(|l| {
                let l = Value::String(l.clone());
                rs.iter()
                    .any(|r| compare_atoms(op, &l, &Value::String(r.clone())))
            }),
            (Some(ls), None) => self.compare_set(op, &ls, left, right),
            (None, Some(rs)) => self.compare_set(op.mirrored(), &rs, right, left),
            (None, None) => compare_atoms(op, left, right),
        }
    }

    fn compare_set(&self, op: BinaryOp, items: &[String], set: &Value, other: &Value) -> bool {
        match other {
            Value::Boolean(_) => compare_atoms(op, &Value::Boolean(set.to_boolean()), other),
            Value::Number(_) => items
                .iter()
                .any(|s| compare_atoms(op, &Value::Number(parse_number(s)), other)),
            _ => items
                .iter()
                .any(|s| compare_atoms(op, &Value::String(s.clone()), other)),
        }
    }

    fn steps(&self, start: Vec<XNode>, steps: &[Step]) -> PruneResult<Vec<XNode>> {
        let mut current = start;
        for step in steps {
            let mut seen = HashSet::new();
            let mut next = Vec::new();
            for node in &current {
                let candidates: Vec<XNode> = self
                    .axis(step.axis, *node)
                    .into_iter()
                    .filter(|candidate| self.test(step.axis, &step.test, *candidate))
                    .collect();
                for found in self.predicates(candidates, &step.predicates)? {
                    if seen.insert(found) {
                        next.push(found);
                    }
                }
            }
            current = self.sorted(next);
        }
        Ok(current)
    }

    /// Filter a node list by predicates; positions follow the list order
    fn predicates(&self, mut nodes: Vec<XNode>, predicates: &[Expr]) -> PruneResult<Vec<XNode>> {
        for predicate in predicates {
            let size = nodes.len();
            let mut kept = Vec::with_capacity(size);
            for (index, node) in nodes.into_iter().enumerate() {
                let ctx = Context {
                    node,
                    position: index + 1,
                    size,
                };
                let keep = match self.eval(predicate, &ctx)? {
                    Value::Number(n) => n == (index + 1) as f64,
                    other => other.to_boolean(),
                };
                if keep {
                    kept.push(node);
                }
            }
            nodes = kept;
        }
        Ok(nodes)
    }

    fn test(&self, axis: Axis, test: &NodeTest, node: XNode) -> bool {
        let principal = if axis == Axis::Attribute {
            matches!(node, XNode::Attribute(..))
        } else {
            matches!(node, XNode::Node(id) if self.doc.element(id).is_some())
        };
        match test {
            NodeTest::Node => true,
            NodeTest::Text => matches!(node, XNode::Text(..)),
            NodeTest::Comment => match node {
                XNode::Node(id) => self.doc.get(id).and_then(NodeData::as_comment).is_some(),
                _ => false,
            },
            NodeTest::ProcessingInstruction => false,
            NodeTest::Wildcard => principal,
            NodeTest::NamespaceWildcard(uri) => {
                principal && self.namespace_of(node).as_deref() == Some(uri.as_str())
            }
            NodeTest::Name { namespace, local } => {
                principal
                    && self.local_name_of(node).as_deref() == Some(local.as_str())
                    && self.namespace_of(node) == *namespace
            }
        }
    }

    fn local_name_of(&self, node: XNode) -> Option<String> {
        match node {
            XNode::Node(id) => self.doc.element(id).map(|e| e.name.local.clone()),
            XNode::Attribute(id, index) => self
                .doc
                .element(id)
                .and_then(|e| e.attributes.get(index))
                .map(|a| a.local.clone()),
            _ => None,
        }
    }

    fn namespace_of(&self, node: XNode) -> Option<String> {
        match node {
            XNode::Node(id) => self.doc.element(id).and_then(|e| e.name.namespace.clone()),
            XNode::Attribute(id, index) => self
                .doc
                .element(id)
                .and_then(|e| e.attributes.get(index))
                .and_then(|a| a.namespace.clone()),
            _ => None,
        }
    }

    /// Nodes along an axis, nearest first
    fn axis(&self, axis: Axis, node: XNode) -> Vec<XNode> {
        match axis {
            Axis::Child => self.children(node),
            Axis::Descendant => self.descendants(node),
            Axis::DescendantOrSelf => {
                let mut nodes = vec![node];
                nodes.extend(self.descendants(node));
                nodes
            }
            Axis::SelfAxis => vec![node],
            Axis::Parent => self.parent(node).into_iter().collect(),
            Axis::Ancestor => self.ancestors(node),
            Axis::AncestorOrSelf => {
                let mut nodes = vec![node];
                nodes.extend(self.ancestors(node));
                nodes
            }
            Axis::FollowingSibling => self.siblings(node, true),
            Axis::PrecedingSibling => self.siblings(node, false),
            Axis::Following => self.following(node),
            Axis::Preceding => self.preceding(node),
            Axis::Attribute => self.attributes(node),
        }
    }

    /// Children in document order, text nodes included
    fn children(&self, node: XNode) -> Vec<XNode> {
        let id = match node {
            XNode::Root => return vec![XNode::Node(self.doc.root())],
            XNode::Node(id) => id,
            _ => return Vec::new(),
        };
        let Some(element) = self.doc.element(id) else {
            return Vec::new();
        };

        let mut nodes = Vec::new();
        if element.text.as_deref().is_some_and(|t| !t.is_empty()) {
            nodes.push(XNode::Text(id, TextSlot::Leading));
        }
        for child in &element.children {
            nodes.push(XNode::Node(*child));
            let has_tail = self
                .doc
                .get(*child)
                .and_then(|data| data.tail())
                .is_some_and(|t| !t.is_empty());
            if has_tail {
                nodes.push(XNode::Text(*child, TextSlot::Tail));
            }
        }
        nodes
    }

    fn descendants(&self, node: XNode) -> Vec<XNode> {
        let mut nodes = Vec::new();
        let mut stack: Vec<XNode> = self.children(node).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            nodes.push(next);
            stack.extend(self.children(next).into_iter().rev());
        }
        nodes
    }

    fn attributes(&self, node: XNode) -> Vec<XNode> {
        let XNode::Node(id) = node else {
            return Vec::new();
        };
        self.doc
            .element(id)
            .map(|element| {
                element
                    .attributes
                    .iter()
                    .enumerate()
                    .filter(|(_, attr)| !attr.is_namespace_declaration())
                    .map(|(index, _)| XNode::Attribute(id, index))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn parent(&self, node: XNode) -> Option<XNode> {
        match node {
            XNode::Root => None,
            XNode::Node(id) => Some(match self.doc.parent(id) {
                Some(parent) => XNode::Node(parent),
                None => XNode::Root,
            }),
            XNode::Attribute(id, _) | XNode::Text(id, TextSlot::Leading) => Some(XNode::Node(id)),
            XNode::Text(id, TextSlot::Tail) => self.doc.parent(id).map(XNode::Node),
        }
    }

    fn ancestors(&self, node: XNode) -> Vec<XNode> {
        let mut nodes = Vec::new();
        let mut current = self.parent(node);
        while let Some(ancestor) = current {
            nodes.push(ancestor);
            current = self.parent(ancestor);
        }
        nodes
    }

    /// Siblings after (`forward`) or before the node, nearest first
    fn siblings(&self, node: XNode, forward: bool) -> Vec<XNode> {
        if matches!(node, XNode::Attribute(..) | XNode::Root) {
            return Vec::new();
        }
        let Some(parent) = self.parent(node) else {
            return Vec::new();
        };
        let all = self.children(parent);
        let Some(index) = all.iter().position(|n| *n == node) else {
            return Vec::new();
        };
        if forward {
            all[index + 1..].to_vec()
        } else {
            all[..index].iter().rev().copied().collect()
        }
    }

    fn following(&self, node: XNode) -> Vec<XNode> {
        let mut nodes = Vec::new();
        let mut current = node;
        if let XNode::Attribute(id, _) = node {
            current = XNode::Node(id);
            nodes.extend(self.descendants(current));
        }
        loop {
            for sibling in self.siblings(current, true) {
                nodes.push(sibling);
                nodes.extend(self.descendants(sibling));
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        nodes
    }

    fn preceding(&self, node: XNode) -> Vec<XNode> {
        let mut nodes = Vec::new();
        let mut current = match node {
            XNode::Attribute(id, _) => XNode::Node(id),
            other => other,
        };
        loop {
            for sibling in self.siblings(current, false) {
                nodes.extend(self.descendants(sibling).into_iter().rev());
                nodes.push(sibling);
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        nodes
    }

    /// Sort into document order and drop duplicates
    fn sorted(&self, mut nodes: Vec<XNode>) -> Vec<XNode> {
        nodes.sort_by_key(|n| self.order.get(n).copied().unwrap_or(usize::MAX));
        nodes.dedup();
        nodes
    }
}

/// Compare two non-node-set values
fn compare_atoms(op: BinaryOp, left: &Value, right: &Value) -> bool {
    match op {
        BinaryOp::Eq | BinaryOp::NotEq => {
            let equal = match (left, right) {
                (Value::Boolean(_), _) | (_, Value::Boolean(_)) => {
                    left.to_boolean() == right.to_boolean()
                }
                (Value::Number(_), _) | (_, Value::Number(_)) => {
                    atom_number(left) == atom_number(right)
                }
                _ => atom_string(left) == atom_string(right),
            };
            (op == BinaryOp::Eq) == equal
        }
        _ => {
            let (l, r) = (atom_number(left), atom_number(right));
            match op {
                BinaryOp::Lt => l < r,
                BinaryOp::LtEq => l <= r,
                BinaryOp::Gt => l > r,
                _ => l >= r,
            }
        }
    }
}

fn atom_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => *n,
        Value::Boolean(true) => 1.0,
        Value::Boolean(false) => 0.0,
        Value::String(s) => parse_number(s),
        Value::Nodes(_) | Value::Matches(_) => f64::NAN,
    }
}

fn atom_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => format_number(*n),
        Value::Boolean(b) => b.to_string(),
        Value::Nodes(_) | Value::Matches(_) => String::new(),
    }
}

/// XPath number to string conversion
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n == 0.0 {
        "0".to_string()
    } else if n == n.trunc() {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(-12.0), "-12");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_compare_atoms() {
        let one = Value::Number(1.0);
        assert!(compare_atoms(BinaryOp::Eq, &one, &Value::String("1".into())));
        assert!(compare_atoms(BinaryOp::Eq, &Value::Boolean(true), &Value::String("x".into())));
        assert!(compare_atoms(BinaryOp::Lt, &one, &Value::String("2".into())));
        let a = Value::String("a".into());
        assert!(!compare_atoms(BinaryOp::NotEq, &a, &a));
    }

    #[test]
    fn test_to_boolean() {
        assert!(!Value::Nodes(Vec::new()).to_boolean());
        assert!(Value::Matches(vec!["x".into()]).to_boolean());
        assert!(!Value::Number(f64::NAN).to_boolean());
        assert!(!Value::String(String::new()).to_boolean());
    }
}
