//! Metadata XML parser
//!
//! This module builds a [`Document`] from XML text. Whitespace is never
//! trimmed: leading text and tails are kept byte for byte so that an unchanged
//! document serializes back to its original form.

use crate::core::error::{PruneError, PruneResult};
use crate::core::namespace::ns;
use crate::core::node::{Attribute, Comment, Document, Element, NodeData, NodeId, QName};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Parser for metadata documents
pub struct DocumentParser {
    /// In-scope namespace bindings; the empty prefix is the default namespace
    bindings: Vec<(String, String)>,
    /// Length of `bindings` when each open element started
    marks: Vec<usize>,
}

impl DocumentParser {
    /// Create a new parser
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
            marks: Vec::new(),
        }
    }

    /// Parse a document from a string
    ///
    /// The XML declaration, DOCTYPE, processing instructions and any comments
    /// outside the root element are not part of the tree.
    pub fn parse(&mut self, xml: &str) -> PruneResult<Document> {
        self.bindings.clear();
        self.marks.clear();

        let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut doc: Option<Document> = None;
        let mut open: Vec<NodeId> = Vec::new();
        // Node whose tail receives the next text, if the cursor sits after one
        let mut last: Option<NodeId> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let id = self.open_element(&mut doc, &open, &e)?;
                    open.push(id);
                    last = None;
                }
                Ok(Event::Empty(e)) => {
                    let id = self.open_element(&mut doc, &open, &e)?;
                    self.close_scope();
                    last = Some(id);
                }
                Ok(Event::End(_)) => {
                    let id = open.pop().ok_or_else(|| {
                        PruneError::Parse("Closing tag without a matching start tag".to_string())
                    })?;
                    self.close_scope();
                    last = Some(id);
                }
                Ok(Event::Text(e)) => {
                    let raw = utf8(&e)?;
                    let text = unescape(raw)
                        .map_err(|e| PruneError::Parse(format!("Invalid text content: {}", e)))?;
                    push_text(&mut doc, &open, last, &text)?;
                }
                Ok(Event::CData(e)) => {
                    let text = utf8(&e)?;
                    push_text(&mut doc, &open, last, text)?;
                }
                Ok(Event::GeneralRef(e)) => {
                    let name = utf8(&e)?;
                    let reference = format!("&{};", name);
                    let text = unescape(&reference).map_err(|e| {
                        PruneError::Parse(format!("Unknown entity reference {}: {}", reference, e))
                    })?;
                    push_text(&mut doc, &open, last, &text)?;
                }
                Ok(Event::Comment(e)) => {
                    let Some(&parent) = open.last() else {
                        continue;
                    };
                    let text = utf8(&e)?;
                    let document = doc.as_mut().ok_or_else(no_root)?;
                    let id = document.append_child(parent, NodeData::Comment(Comment::new(text)))?;
                    last = Some(id);
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(PruneError::Parse(format!(
                        "XML parsing error at position {}: {}",
                        reader.buffer_position(),
                        e
                    )));
                }
                // Declaration, DOCTYPE and processing instructions
                Ok(_) => {}
            }
        }

        if let Some(&unclosed) = open.last() {
            let name = doc
                .as_ref()
                .and_then(|d| d.element(unclosed))
                .map(|e| e.name.lexical())
                .unwrap_or_default();
            return Err(PruneError::Parse(format!("Unclosed element <{}>", name)));
        }
        doc.ok_or_else(no_root)
    }

    /// Create an element for a start or empty tag and attach it to the tree
    fn open_element(
        &mut self,
        doc: &mut Option<Document>,
        open: &[NodeId],
        e: &BytesStart<'_>,
    ) -> PruneResult<NodeId> {
        let attrs = Self::collect_attributes(e)?;

        self.marks.push(self.bindings.len());
        for (attr_name, attr_value) in &attrs {
            if attr_name == "xmlns" {
                self.bindings.push((String::new(), attr_value.clone()));
            } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
                self.bindings.push((prefix.to_string(), attr_value.clone()));
            }
        }

        let mut element = Element::new(self.resolve_element_name(utf8(e.name().as_ref())?)?);
        for (attr_name, attr_value) in attrs {
            let attribute = self.resolve_attribute(attr_name, attr_value)?;
            element.attributes.push(attribute);
        }

        if doc.is_none() {
            let document = Document::new(element);
            let root = document.root();
            *doc = Some(document);
            return Ok(root);
        }
        match (doc.as_mut(), open.last()) {
            (Some(document), Some(&parent)) => {
                document.append_child(parent, NodeData::Element(element))
            }
            _ => Err(PruneError::Parse(
                "Document has more than one root element".to_string(),
            )),
        }
    }

    fn close_scope(&mut self) {
        if let Some(mark) = self.marks.pop() {
            self.bindings.truncate(mark);
        }
    }

    /// Collect attributes from an element, decoding entities in values
    fn collect_attributes(e: &BytesStart<'_>) -> PruneResult<Vec<(String, String)>> {
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr =
                attr.map_err(|e| PruneError::Parse(format!("Malformed attribute: {}", e)))?;
            let key = utf8(attr.key.as_ref())?.to_string();
            let raw_value = utf8(&attr.value)?;
            let value = unescape(raw_value).map_err(|e| {
                PruneError::Parse(format!("Invalid value for attribute '{}': {}", key, e))
            })?;
            attrs.push((key, value.into_owned()));
        }
        Ok(attrs)
    }

    fn lookup(&self, prefix: &str) -> Option<&str> {
        if prefix == ns::XML_PREFIX {
            return Some(ns::XML);
        }
        self.bindings
            .iter()
            .rev()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    fn resolve_element_name(&self, name: &str) -> PruneResult<QName> {
        match name.split_once(':') {
            Some((prefix, local)) => {
                let uri = self
                    .lookup(prefix)
                    .filter(|uri| !uri.is_empty())
                    .ok_or_else(|| {
                        PruneError::Parse(format!(
                            "Unbound namespace prefix '{}' on <{}>",
                            prefix, name
                        ))
                    })?;
                Ok(QName {
                    prefix: Some(prefix.to_string()),
                    local: local.to_string(),
                    namespace: Some(uri.to_string()),
                })
            }
            None => Ok(QName {
                prefix: None,
                local: name.to_string(),
                // xmlns="" undeclares the default namespace
                namespace: self
                    .lookup("")
                    .filter(|uri| !uri.is_empty())
                    .map(str::to_string),
            }),
        }
    }

    fn resolve_attribute(&self, name: String, value: String) -> PruneResult<Attribute> {
        let mut attribute = Attribute::new(name, value);
        if attribute.is_namespace_declaration() {
            attribute.namespace = Some(ns::XMLNS.to_string());
        } else if let Some((prefix, _)) = attribute.name.split_once(':') {
            let uri = self.lookup(prefix).filter(|uri| !uri.is_empty()).ok_or_else(|| {
                PruneError::Parse(format!(
                    "Unbound namespace prefix '{}' on attribute '{}'",
                    prefix, attribute.name
                ))
            })?;
            attribute.namespace = Some(uri.to_string());
        }
        Ok(attribute)
    }
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a document with a fresh parser
pub fn parse_document(xml: &str) -> PruneResult<Document> {
    DocumentParser::new().parse(xml)
}

/// Append text at the cursor: to the tail of `last`, or to the open element's text
fn push_text(
    doc: &mut Option<Document>,
    open: &[NodeId],
    last: Option<NodeId>,
    text: &str,
) -> PruneResult<()> {
    let Some(&parent) = open.last() else {
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err(PruneError::Parse(
            "Text content outside the root element".to_string(),
        ));
    };
    let document = doc.as_mut().ok_or_else(no_root)?;

    match last {
        Some(node) => {
            if let Some(data) = document.get_mut(node) {
                let mut tail = data.tail().unwrap_or_default().to_string();
                tail.push_str(text);
                data.set_tail(Some(tail));
            }
        }
        None => {
            if let Some(element) = document.element_mut(parent) {
                element.text.get_or_insert_with(String::new).push_str(text);
            }
        }
    }
    Ok(())
}

fn utf8(bytes: &[u8]) -> PruneResult<&str> {
    std::str::from_utf8(bytes)
        .map_err(|e| PruneError::Parse(format!("Input is not valid UTF-8: {}", e)))
}

fn no_root() -> PruneError {
    PruneError::Parse("Document has no root element".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<Layout xmlns=\"http://soap.sforce.com/2006/04/metadata\">\n    \
<relatedLists>\n        <field>Name</field>\n    </relatedLists>\n</Layout>\n";

    #[test]
    fn test_parse_layout() {
        let doc = parse_document(LAYOUT).unwrap();
        let root = doc.element(doc.root()).unwrap();
        assert_eq!(root.name.local, "Layout");
        assert_eq!(doc.root_namespace(), Some(ns::METADATA));
        assert_eq!(root.text.as_deref(), Some("\n    "));
        assert_eq!(root.tail, None);
        assert_eq!(root.attributes[0].name, "xmlns");
        assert_eq!(root.attributes[0].value, ns::METADATA);

        let related = doc.children(doc.root())[0];
        let related_el = doc.element(related).unwrap();
        assert_eq!(related_el.name.namespace.as_deref(), Some(ns::METADATA));
        assert_eq!(related_el.tail.as_deref(), Some("\n"));

        let field = doc.element(doc.children(related)[0]).unwrap();
        assert_eq!(field.text.as_deref(), Some("Name"));
        assert_eq!(field.tail.as_deref(), Some("\n    "));
    }

    #[test]
    fn test_entities_are_decoded() {
        let doc =
            parse_document("<a t=\"x &amp; &quot;y&quot;\">1 &lt; 2 &#65;&#x42;</a>").unwrap();
        let root = doc.element(doc.root()).unwrap();
        assert_eq!(root.attributes[0].value, "x & \"y\"");
        assert_eq!(root.text.as_deref(), Some("1 < 2 AB"));
    }

    #[test]
    fn test_cdata_becomes_text() {
        let doc = parse_document("<a><![CDATA[<b>]]></a>").unwrap();
        assert_eq!(doc.element(doc.root()).unwrap().text.as_deref(), Some("<b>"));
    }

    #[test]
    fn test_comments_and_tails() {
        let doc = parse_document("<a>x<!-- c -->y<b/>z</a>").unwrap();
        let children = doc.children(doc.root());
        assert_eq!(children.len(), 2);
        let comment = doc.get(children[0]).unwrap().as_comment().unwrap();
        assert_eq!(comment.text, " c ");
        assert_eq!(comment.tail.as_deref(), Some("y"));
        assert_eq!(doc.element(children[1]).unwrap().tail.as_deref(), Some("z"));
    }

    #[test]
    fn test_prefixed_names() {
        let doc = parse_document(
            "<r xmlns=\"urn:d\" xmlns:xsi=\"urn:xsi\"><v xsi:type=\"xsd:string\">1</v></r>",
        )
        .unwrap();
        let v = doc.element(doc.children(doc.root())[0]).unwrap();
        assert_eq!(v.name.namespace.as_deref(), Some("urn:d"));
        assert_eq!(v.attributes[0].name, "xsi:type");
        assert_eq!(v.attributes[0].local, "type");
        assert_eq!(v.attributes[0].namespace.as_deref(), Some("urn:xsi"));
    }

    #[test]
    fn test_errors() {
        assert!(parse_document("").is_err());
        assert!(parse_document("not xml").is_err());
        assert!(parse_document("<a><b></a>").is_err());
        assert!(parse_document("<a>").is_err());
        assert!(parse_document("<a/><b/>").is_err());
        assert!(parse_document("<p:a/>").is_err());
        assert!(parse_document("<a>&bogus;</a>").is_err());
    }

    #[test]
    fn test_prolog_and_epilog_are_dropped() {
        let doc =
            parse_document("<?xml version=\"1.0\"?>\n<!-- top -->\n<a/>\n<!-- end -->\n").unwrap();
        assert_eq!(doc.len(), 1);
    }
}
