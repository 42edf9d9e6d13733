//! Canonical metadata serializer
//!
//! This module renders a [`Document`] in the exact form the Salesforce
//! Metadata API produces, so files that were not changed serialize back to
//! their original bytes:
//! - a fixed `<?xml ...?>` declaration line
//! - bare local tag names, with `xmlns` only on a metadata-namespace root
//! - `& < > ' "` escaped in both attribute values and text
//! - empty elements written as `<tag/>`
//! - tails written verbatim, or `\n` when an element has none

use crate::core::error::{PruneError, PruneResult};
use crate::core::namespace::{ns, XML_DECLARATION};
use crate::core::node::{Attribute, Document, Element, NodeData, NodeId};
use quick_xml::escape::escape;
use quick_xml::events::attributes::Attribute as XmlAttribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName as XmlName;
use quick_xml::Writer;
use std::borrow::Cow;

/// Serializer for the canonical metadata format
pub struct MetadataSerializer {
    /// Namespace that earns the root element an `xmlns` attribute
    namespace: &'static str,
}

impl MetadataSerializer {
    /// Create a serializer for Metadata API documents
    pub fn new() -> Self {
        Self {
            namespace: ns::METADATA,
        }
    }

    /// Serialize a document to canonical text
    pub fn serialize(&self, doc: &Document) -> PruneResult<String> {
        let mut writer = Writer::new(Vec::new());
        writer.get_mut().extend_from_slice(XML_DECLARATION.as_bytes());
        let root_owns_xmlns = doc.root_namespace() == Some(self.namespace);

        // Depth-first walk; `false` marks entry into a node, `true` exit
        let mut stack: Vec<(NodeId, bool)> = vec![(doc.root(), false)];
        while let Some((id, exiting)) = stack.pop() {
            let Some(data) = doc.get(id) else {
                continue;
            };
            match data {
                NodeData::Comment(comment) => {
                    writer.write_event(Event::Comment(BytesText::from_escaped(
                        comment.text.as_str(),
                    )))?;
                    write_raw(&mut writer, comment.tail.as_deref().unwrap_or_default())?;
                }
                NodeData::Element(element) if exiting => {
                    writer.write_event(Event::End(BytesEnd::new(element.name.local.as_str())))?;
                    write_tail(&mut writer, element)?;
                }
                NodeData::Element(element) => {
                    let start = self.start_tag(element, root_owns_xmlns && id == doc.root());
                    if !element.has_content() {
                        writer.write_event(Event::Empty(start))?;
                        write_tail(&mut writer, element)?;
                        continue;
                    }
                    writer.write_event(Event::Start(start))?;
                    if let Some(text) = element.text.as_deref() {
                        write_raw(&mut writer, &escape_text(text))?;
                    }
                    stack.push((id, true));
                    stack.extend(element.children.iter().rev().map(|child| (*child, false)));
                }
            }
        }

        String::from_utf8(writer.into_inner())
            .map_err(|e| PruneError::Serialization(format!("UTF-8 encoding error: {}", e)))
    }

    /// Build the opening tag; only a tag that `owns_xmlns` keeps a default declaration
    fn start_tag<'a>(&self, element: &'a Element, owns_xmlns: bool) -> BytesStart<'a> {
        let mut start = BytesStart::new(element.name.local.as_str());

        let mut wrote_xmlns = false;
        for attribute in &element.attributes {
            if attribute.name == "xmlns" {
                if !owns_xmlns {
                    continue;
                }
                // The metadata namespace always wins over whatever was declared
                push_attribute(&mut start, "xmlns", self.namespace);
                wrote_xmlns = true;
                continue;
            }
            push_escaped(&mut start, attribute);
        }
        if owns_xmlns && !wrote_xmlns {
            push_attribute(&mut start, "xmlns", self.namespace);
        }
        start
    }
}

impl Default for MetadataSerializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize a document with the default serializer
pub fn serialize_document(doc: &Document) -> PruneResult<String> {
    MetadataSerializer::new().serialize(doc)
}

/// Escape text for attribute values and element content
///
/// Escapes `&`, `<`, `>`, `'` and `"`, which is stricter than XML requires.
pub fn escape_text(raw: &str) -> Cow<'_, str> {
    escape(raw)
}

fn push_escaped(start: &mut BytesStart<'_>, attribute: &Attribute) {
    push_attribute(start, &attribute.name, &attribute.value);
}

fn push_attribute(start: &mut BytesStart<'_>, name: &str, value: &str) {
    let escaped = escape_text(value).into_owned().into_bytes();
    start.push_attribute(XmlAttribute {
        key: XmlName(name.as_bytes()),
        value: Cow::Owned(escaped),
    });
}

fn write_tail(writer: &mut Writer<Vec<u8>>, element: &Element) -> PruneResult<()> {
    write_raw(writer, element.tail.as_deref().unwrap_or("\n"))
}

fn write_raw(writer: &mut Writer<Vec<u8>>, text: &str) -> PruneResult<()> {
    if !text.is_empty() {
        writer.write_event(Event::Text(BytesText::from_escaped(text)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::{Comment, QName};
    use crate::core::parser::parse_document;

    fn roundtrip(xml: &str) -> String {
        serialize_document(&parse_document(xml).unwrap()).unwrap()
    }

    #[test]
    fn test_canonical_input_is_unchanged() {
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<CustomObject xmlns=\"http://soap.sforce.com/2006/04/metadata\">\n    \
<fields>\n        <fullName>Amount__c</fullName>\n        <required>false</required>\n    \
</fields>\n    <enableHistory/>\n</CustomObject>\n";
        assert_eq!(roundtrip(xml), xml);
    }

    #[test]
    fn test_declaration_is_normalized() {
        let out = roundtrip("<?xml version='1.0'?><a>x</a>");
        assert_eq!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<a>x</a>\n");
        assert_eq!(roundtrip("<a>x</a>"), out);
    }

    #[test]
    fn test_self_closing() {
        assert_eq!(
            roundtrip("<a><b></b><c/></a>"),
            format!("{}<a><b/>\n<c/>\n</a>\n", XML_DECLARATION)
        );
    }

    #[test]
    fn test_escaping() {
        let out = roundtrip("<a v=\"&apos;&quot;&amp;&lt;&gt;\">'\"&amp;&lt;&gt;</a>");
        assert_eq!(
            out,
            format!(
                "{}<a v=\"&apos;&quot;&amp;&lt;&gt;\">&apos;&quot;&amp;&lt;&gt;</a>\n",
                XML_DECLARATION
            )
        );
    }

    #[test]
    fn test_comments_verbatim() {
        let xml = format!("{}<a>\n    <!-- keep & me -->\n    <b>1</b>\n</a>\n", XML_DECLARATION);
        assert_eq!(roundtrip(&xml), xml);
    }

    #[test]
    fn test_xmlns_added_to_metadata_root() {
        let mut doc = Document::new(Element::new(QName::with_namespace("Layout", ns::METADATA)));
        let root = doc.root();
        doc.append_child(root, NodeData::Comment(Comment::new("x"))).unwrap();
        assert_eq!(
            serialize_document(&doc).unwrap(),
            format!(
                "{}<Layout xmlns=\"{}\"><!--x--></Layout>\n",
                XML_DECLARATION,
                ns::METADATA
            )
        );
    }

    #[test]
    fn test_xmlns_only_on_root() {
        let out = roundtrip(
            "<Layout xmlns=\"http://soap.sforce.com/2006/04/metadata\">\
<x xmlns=\"urn:other\">1</x></Layout>",
        );
        assert_eq!(
            out,
            format!(
                "{}<Layout xmlns=\"{}\"><x>1</x>\n</Layout>\n",
                XML_DECLARATION,
                ns::METADATA
            )
        );
    }

    #[test]
    fn test_foreign_root_gets_no_xmlns() {
        let out = roundtrip("<p:root xmlns:p=\"urn:p\" xmlns=\"urn:d\"><p:child/></p:root>");
        assert_eq!(
            out,
            format!("{}<root xmlns:p=\"urn:p\"><child/>\n</root>\n", XML_DECLARATION)
        );
    }

    #[test]
    fn test_tails_are_written_unescaped() {
        let out = roundtrip("<a><b/>x &amp; y</a>");
        assert_eq!(out, format!("{}<a><b/>x & y</a>\n", XML_DECLARATION));
        assert!(parse_document(&out).is_err());

        let out = roundtrip("<a><b/><![CDATA[<c>]]></a>");
        assert_eq!(out, format!("{}<a><b/><c></a>\n", XML_DECLARATION));
    }

    #[test]
    fn test_fixpoint() {
        let once = roundtrip("<a>\n  <b></b>\n  <c k='v'>t</c><!--z--></a>");
        assert_eq!(roundtrip(&once), once);
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("a'b\"c&d<e>f"), "a&apos;b&quot;c&amp;d&lt;e&gt;f");
        assert_eq!(escape_text("plain"), "plain");
    }
}
