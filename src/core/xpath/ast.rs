//! Compiled XPath expression tree
//!
//! Namespace prefixes are already resolved to URIs and function names to
//! [`Function`] entries, so evaluation never consults the alias table.

use crate::core::xpath::functions::Function;
use regex::Regex;

/// An XPath expression
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(String),
    Number(f64),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Negate(Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Call(Call),
    Path(LocationPath),
    /// A primary expression filtered by predicates, optionally followed by steps
    /// (e.g. `(//a)[1]/b`)
    Filter {
        primary: Box<Expr>,
        predicates: Vec<Expr>,
        steps: Vec<Step>,
    },
}

/// Binary operators, arithmetic, comparison and logical
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    /// The same comparison with its operands swapped
    pub fn mirrored(self) -> Self {
        match self {
            BinaryOp::Lt => BinaryOp::Gt,
            BinaryOp::LtEq => BinaryOp::GtEq,
            BinaryOp::Gt => BinaryOp::Lt,
            BinaryOp::GtEq => BinaryOp::LtEq,
            other => other,
        }
    }
}

/// A resolved function call
#[derive(Debug, Clone)]
pub struct Call {
    pub function: Function,
    pub args: Vec<Expr>,
    /// Pattern compiled with the expression when it is a literal
    pub regex: Option<Regex>,
}

/// A location path, absolute (`/a/b`) or relative (`a/b`)
#[derive(Debug, Clone)]
pub struct LocationPath {
    pub absolute: bool,
    pub steps: Vec<Step>,
}

/// One step of a location path
#[derive(Debug, Clone)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    /// `descendant-or-self::node()`, the expansion of `//`
    pub fn descendant_or_self() -> Self {
        Self {
            axis: Axis::DescendantOrSelf,
            test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }
}

/// XPath axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    SelfAxis,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Attribute,
}

impl Axis {
    /// Look up an axis by its name in `axis::` syntax
    pub fn from_name(name: &str) -> Option<Self> {
        let axis = match name {
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "self" => Axis::SelfAxis,
            "parent" => Axis::Parent,
            "ancestor" => Axis::Ancestor,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "following-sibling" => Axis::FollowingSibling,
            "preceding-sibling" => Axis::PrecedingSibling,
            "following" => Axis::Following,
            "preceding" => Axis::Preceding,
            "attribute" => Axis::Attribute,
            _ => return None,
        };
        Some(axis)
    }
}

/// What a step keeps from its axis
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// Exact name; unprefixed names have no namespace
    Name {
        namespace: Option<String>,
        local: String,
    },
    /// `prefix:*`
    NamespaceWildcard(String),
    /// `*`
    Wildcard,
    Text,
    Comment,
    Node,
    /// Never matches: processing instructions are not kept in the tree
    ProcessingInstruction,
}
