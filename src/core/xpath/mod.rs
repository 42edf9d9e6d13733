//! Element selectors
//!
//! A [`Selector`] is an XPath 1.0 expression compiled against a
//! [`NamespaceMap`]. The default map binds `ns` to the Metadata API namespace
//! and `re` to EXSLT regular expressions, so expressions such as
//! `//ns:fields[re:test(ns:fullName, '__c$')]` work out of the box.
//!
//! # Example
//!
//! ```rust
//! use metaprune::core::parser::parse_document;
//! use metaprune::core::xpath::Selector;
//!
//! let doc = parse_document(
//!     "<Layout xmlns=\"http://soap.sforce.com/2006/04/metadata\"><relatedLists/></Layout>",
//! ).unwrap();
//! let selector = Selector::new("//ns:relatedLists").unwrap();
//! assert_eq!(selector.select(&doc).unwrap().len(), 1);
//! ```

pub mod ast;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;

use crate::core::error::{PruneError, PruneResult};
use crate::core::namespace::NamespaceMap;
use crate::core::node::{Document, NodeId};
use ast::Expr;
use eval::{Context, Evaluator, Value, XNode};

/// A compiled element selector
#[derive(Debug, Clone)]
pub struct Selector {
    source: String,
    expr: Expr,
}

impl Selector {
    /// Compile with the default prefixes (`ns`, `re`)
    pub fn new(source: &str) -> PruneResult<Self> {
        Self::compile(source, &NamespaceMap::defaults())
    }

    /// Compile with an explicit prefix table
    pub fn compile(source: &str, namespaces: &NamespaceMap) -> PruneResult<Self> {
        let expr = parser::compile(source, namespaces)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// The expression as written
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against the document node
    pub fn evaluate(&self, doc: &Document) -> PruneResult<Value> {
        Evaluator::new(doc).eval(&self.expr, &Context::new(XNode::Root))
    }

    /// Elements selected by the expression, in document order
    ///
    /// Attributes, text and comments in the result are ignored. An expression
    /// that does not produce a node-set is an error.
    pub fn select(&self, doc: &Document) -> PruneResult<Vec<NodeId>> {
        match self.evaluate(doc)? {
            Value::Nodes(nodes) => {
                let mut elements = Vec::with_capacity(nodes.len());
                for node in nodes {
                    match node {
                        XNode::Node(id) if doc.element(id).is_some() => elements.push(id),
                        other => log::debug!("Skipping non-element match {:?}", other),
                    }
                }
                Ok(elements)
            }
            other => Err(PruneError::Query(format!(
                "Expression '{}' does not select nodes (got {:?})",
                self.source, other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::parse_document;

    const LAYOUT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Layout xmlns="http://soap.sforce.com/2006/04/metadata">
    <layoutSections>
        <label>Information</label>
        <layoutColumns>
            <layoutItems>
                <field>Name</field>
            </layoutItems>
            <layoutItems>
                <field>Amount__c</field>
            </layoutItems>
        </layoutColumns>
    </layoutSections>
    <!-- related -->
    <relatedLists>
        <relatedList>RelatedNoteList</relatedList>
    </relatedLists>
    <relatedLists>
        <fields>NAME</fields>
        <relatedList>Contacts</relatedList>
    </relatedLists>
</Layout>
"#;

    fn names(doc: &Document, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|id| doc.element(*id).unwrap().name.local.clone())
            .collect()
    }

    fn count(source: &str) -> usize {
        let doc = parse_document(LAYOUT).unwrap();
        Selector::new(source).unwrap().select(&doc).unwrap().len()
    }

    #[test]
    fn test_select_by_name() {
        let doc = parse_document(LAYOUT).unwrap();
        let ids = Selector::new("//ns:relatedLists").unwrap().select(&doc).unwrap();
        assert_eq!(names(&doc, &ids), vec!["relatedLists", "relatedLists"]);
    }

    #[test]
    fn test_unprefixed_names_do_not_match_default_namespace() {
        assert_eq!(count("//relatedLists"), 0);
    }

    #[test]
    fn test_predicates() {
        assert_eq!(count("//ns:relatedLists[ns:relatedList = 'Contacts']"), 1);
        assert_eq!(count("//ns:relatedLists[1]"), 1);
        assert_eq!(count("//ns:relatedLists[last()]/ns:fields"), 1);
        assert_eq!(count("//ns:layoutItems[ns:field != 'Name']"), 1);
        assert_eq!(count("/ns:Layout/ns:*[position() > 1]"), 2);
    }

    #[test]
    fn test_regex_functions() {
        assert_eq!(count("//ns:layoutItems[re:test(ns:field, '__c$')]"), 1);
        assert_eq!(count("//ns:layoutItems[re:match(ns:field, 'AMOUNT', 'i')]"), 1);
        assert_eq!(count("//ns:layoutItems[re:replace(ns:field, '__c', 'g', '') = 'Amount']"), 1);
    }

    #[test]
    fn test_axes() {
        assert_eq!(count("//ns:field/ancestor::ns:layoutSections"), 1);
        assert_eq!(count("//ns:label/following-sibling::*"), 1);
        assert_eq!(count("//ns:relatedLists[2]/preceding-sibling::ns:relatedLists"), 1);
        assert_eq!(count("//ns:fields/.."), 1);
        assert_eq!(count("//comment()/following::ns:relatedList"), 2);
    }

    #[test]
    fn test_string_functions() {
        assert_eq!(count("//ns:*[starts-with(local-name(), 'layout')]"), 4);
        assert_eq!(count("//ns:field[contains(., 'Amount')]"), 1);
        assert_eq!(count("//ns:field[string-length(normalize-space()) = 4]"), 1);
    }

    #[test]
    fn test_only_elements_are_returned() {
        assert_eq!(count("//ns:field/text()"), 0);
        assert_eq!(count("//comment()"), 0);
        assert_eq!(count("//ns:field | //ns:field/text()"), 2);
    }

    #[test]
    fn test_non_node_result_is_an_error() {
        let doc = parse_document(LAYOUT).unwrap();
        let selector = Selector::new("count(//ns:field)").unwrap();
        assert!(selector.select(&doc).is_err());
        assert_eq!(selector.evaluate(&doc).unwrap(), Value::Number(2.0));
    }

    fn value(source: &str) -> Value {
        let doc = parse_document(LAYOUT).unwrap();
        Selector::new(source).unwrap().evaluate(&doc).unwrap()
    }

    #[test]
    fn test_global_match_with_groups() {
        assert_eq!(
            value(r"string(re:match('x1 x2', 'x(\d)', 'g'))"),
            Value::String("1".to_string())
        );
        assert_eq!(
            value(r"string(re:match('x1 x2', 'x\d', 'g'))"),
            Value::String("x1".to_string())
        );
        assert_eq!(
            value(r"re:match('a-1', '([a-z])-(\d)')"),
            Value::Matches(vec!["a-1".into(), "a".into(), "1".into()])
        );
    }

    #[test]
    fn test_count_of_regex_matches() {
        assert_eq!(value(r"count(re:match('x1 x2 x3', 'x\d', 'g'))"), Value::Number(3.0));
        assert_eq!(value("count(re:match('abc', 'z'))"), Value::Number(0.0));
        let doc = parse_document(LAYOUT).unwrap();
        let err = Selector::new("count('abc')").unwrap().evaluate(&doc).unwrap_err();
        assert_eq!(err.kind(), crate::core::error::ErrorKind::Query);
    }

    #[test]
    fn test_large_numbers_as_strings() {
        assert_eq!(
            value("string(100000000000000000000)"),
            Value::String("100000000000000000000".to_string())
        );
        assert_eq!(value("string(2 * 3)"), Value::String("6".to_string()));
    }

    #[test]
    fn test_custom_prefixes() {
        let doc = parse_document(LAYOUT).unwrap();
        let mut namespaces = NamespaceMap::new();
        namespaces
            .register("http://soap.sforce.com/2006/04/metadata", "sf")
            .unwrap();
        let selector = Selector::compile("//sf:label", &namespaces).unwrap();
        assert_eq!(selector.source(), "//sf:label");
        assert_eq!(selector.select(&doc).unwrap().len(), 1);
        assert!(Selector::compile("//ns:label", &namespaces).is_err());
    }
}
