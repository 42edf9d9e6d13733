//! Tests for the canonical metadata format
//!
//! Unchanged documents must serialize back to their original bytes, and
//! any output must be a fixpoint of parse and serialize.

#[path = "fixtures/mod.rs"]
mod fixtures;

use fixtures::{fixture, FIELD, LAYOUT, PERMISSION_SET};
use metaprune::{parse_document, serialize_document};
use pretty_assertions::assert_eq;

fn roundtrip(xml: &str) -> String {
    serialize_document(&parse_document(xml).unwrap()).unwrap()
}

#[test]
fn fixtures_serialize_to_their_own_bytes() {
    for name in [LAYOUT, FIELD, PERMISSION_SET] {
        let xml = fixture(name);
        assert_eq!(roundtrip(&xml), xml, "{}", name);
    }
}

#[test]
fn output_is_a_fixpoint() {
    let inputs = [
        "<?xml version='1.0' encoding='utf-8'?>\r\n<Layout xmlns='http://soap.sforce.com/2006/04/metadata'>\r\n<a></a>\r\n</Layout>",
        "<root><![CDATA[<raw> & \"quoted\"]]></root>",
        "<x:root xmlns:x=\"urn:x\"><x:a k=\"&#65;\"/><!--c--></x:root>",
        "<Layout xmlns=\"http://soap.sforce.com/2006/04/metadata\"><a>t</a>tail<b/></Layout>",
    ];
    for input in inputs {
        let once = roundtrip(input);
        assert_eq!(roundtrip(&once), once, "{}", input);
    }
}

#[test]
fn empty_elements_self_close() {
    let out = roundtrip("<Layout xmlns=\"http://soap.sforce.com/2006/04/metadata\"><a></a><b> </b></Layout>");
    assert_eq!(
        out,
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<Layout xmlns=\"http://soap.sforce.com/2006/04/metadata\"><a/>\n<b> </b>\n</Layout>\n"
    );
}

#[test]
fn attribute_values_are_strictly_escaped() {
    let out = roundtrip("<a title='say \"hi\" &amp; &lt;bye&gt;' note=\"it's\"/>");
    assert_eq!(
        out,
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<a title=\"say &quot;hi&quot; &amp; &lt;bye&gt;\" note=\"it&apos;s\"/>\n"
    );
}

#[test]
fn cdata_is_written_as_escaped_text() {
    let out = roundtrip("<a><![CDATA[1 < 2]]></a>");
    assert!(out.ends_with("<a>1 &lt; 2</a>\n"));
}

#[test]
fn namespace_declaration_only_on_metadata_root() {
    let out = roundtrip(
        "<md:Layout xmlns:md=\"http://soap.sforce.com/2006/04/metadata\"><md:a/></md:Layout>",
    );
    assert_eq!(
        out,
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<Layout xmlns:md=\"http://soap.sforce.com/2006/04/metadata\" \
xmlns=\"http://soap.sforce.com/2006/04/metadata\"><a/>\n</Layout>\n"
    );

    let foreign = roundtrip("<package xmlns=\"urn:other\"><a/></package>");
    assert!(!foreign.contains("xmlns"));
}

#[test]
fn comments_outside_root_are_dropped() {
    let out = roundtrip("<!-- header --><a>x</a><!-- footer -->");
    assert_eq!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<a>x</a>\n");
}

#[test]
fn malformed_documents_fail_to_parse() {
    for input in ["", "<a>", "<a></b>", "<a/><b/>", "text<a/>", "<p:a/>", "<a>&bogus;</a>"] {
        let err = parse_document(input).unwrap_err();
        assert_eq!(err.kind(), metaprune::ErrorKind::Parse, "{}", input);
    }
}
