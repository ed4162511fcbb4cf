//! The document tree as XML

use crate::common::{body_xml, normalized, parse, registry, serialize};
use moin_babel::Element;
use std::collections::HashMap;

#[test]
fn written_trees_read_back() {
    let doc = parse("Some [[Home|home]] text\n", "moinwiki");
    let xml = serialize(&doc, "dom");
    assert!(xml.contains("<a xlink:href=\"wiki.local:Home\">home</a>"), "{xml}");
    assert_eq!(normalized(&parse(&xml, "dom")), normalized(&doc));
}

#[test]
fn compact_output_without_namespaces() {
    let registry = registry();
    let output = registry.output_type("dom").unwrap();
    let options = HashMap::from([
        ("pretty".to_string(), "no".to_string()),
        ("namespaces".to_string(), "false".to_string()),
    ]);
    assert_eq!(
        registry.serialize(&Element::empty_document(), &output, &options).unwrap(),
        "<page><body /></page>"
    );
}

#[test]
fn foreign_roots_become_error_documents() {
    assert!(body_xml(&parse("<html/>", "dom")).starts_with("<part><error>"));
    assert!(body_xml(&parse("<page><body>", "dom")).starts_with("<part><error>"));
    assert_eq!(parse("  ", "dom"), Element::empty_document());
}
