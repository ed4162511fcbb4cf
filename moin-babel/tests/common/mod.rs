//! Helpers shared by the per-format integration tests.

#![allow(dead_code)]

use moin_babel::ir::xml::to_fragment;
use moin_babel::{Arguments, ConverterRegistry, Element, HostConfig};
use std::collections::HashMap;

pub fn registry() -> ConverterRegistry {
    ConverterRegistry::with_defaults()
}

/// Parse `source` as the named format with a default host and no options.
pub fn parse(source: &str, from: &str) -> Element {
    parse_with(source, from, &HostConfig::default(), &Arguments::new())
}

pub fn parse_with(source: &str, from: &str, host: &HostConfig, arguments: &Arguments) -> Element {
    let registry = registry();
    let content_type = registry.input_type(from).expect("known input format");
    registry
        .parse_source(source, &content_type, host, arguments)
        .expect("parse to succeed")
}

/// Serialize a tree into the named format without options.
pub fn serialize(doc: &Element, to: &str) -> String {
    let registry = registry();
    let output = registry.output_type(to).expect("known output format");
    registry
        .serialize(doc, &output, &HashMap::new())
        .expect("serialize to succeed")
}

pub fn convert(source: &str, from: &str, to: &str) -> String {
    serialize(&parse(source, from), to)
}

/// The XML of everything inside `page/body`, or "" for an empty body.
pub fn body_xml(doc: &Element) -> String {
    let xml = to_fragment(doc);
    if let Some(inner) = xml
        .strip_prefix("<page><body>")
        .and_then(|rest| rest.strip_suffix("</body></page>"))
    {
        return inner.to_string();
    }
    String::new()
}

/// Tree with adjacent text leaves merged, for comparing trees built along different paths.
pub fn normalized(doc: &Element) -> Element {
    let mut doc = doc.clone();
    doc.normalize_text();
    doc
}

/// The body element of a parsed document.
pub fn body(doc: &Element) -> &Element {
    doc.find("body").expect("document has a body")
}
