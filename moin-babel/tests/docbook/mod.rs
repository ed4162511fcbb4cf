//! DocBook 5 in and out of the document tree

use crate::common::{body_xml, convert, parse, registry, serialize};
use moin_babel::ConvertError;
use std::collections::HashMap;

const ARTICLE: &str = r#"<article xmlns="http://docbook.org/ns/docbook" xmlns:xlink="http://www.w3.org/1999/xlink">"#;

fn article(body: &str) -> String {
    format!("{ARTICLE}{body}</article>")
}

#[test]
fn sections_become_headings_with_a_toc() {
    let doc = parse(
        &article("<section><title>One</title><para>a</para><section><title>Two</title></section></section>"),
        "docbook",
    );
    assert_eq!(
        body_xml(&doc),
        "<table-of-content /><div html:class=\"db-article\"><h outline-level=\"1\">One</h>\
<p>a</p><h outline-level=\"2\">Two</h></div>"
    );
}

#[test]
fn missing_namespace_is_reported_in_the_document() {
    let doc = parse("<article><para>x</para></article>", "docbook");
    assert_eq!(body_xml(&doc), "<part><error>Unknown namespace</error></part>");
}

#[test]
fn malformed_xml_is_reported_in_the_document() {
    let out = body_xml(&parse("<article><para>", "docbook"));
    assert!(out.starts_with("<part><error>"), "{out}");
}

#[test]
fn headings_nest_into_sections() {
    let out = convert("= One =\na\n== Two ==\n", "moinwiki", "docbook");
    assert!(
        out.contains("<section><title>One</title><simpara>a</simpara><section><title>Two</title></section></section>"),
        "{out}"
    );
    assert!(out.contains("<title>Untitled</title>"), "{out}");
}

#[test]
fn title_is_the_only_option() {
    let registry = registry();
    let output = registry.output_type("docbook").unwrap();
    let doc = parse("Text", "moinwiki");
    let options = HashMap::from([("title".to_string(), "Notes".to_string())]);
    let out = registry.serialize(&doc, &output, &options).unwrap();
    assert!(out.contains("<info><title>Notes</title></info>"), "{out}");

    let options = HashMap::from([("toc".to_string(), "yes".to_string())]);
    assert!(matches!(
        registry.serialize(&doc, &output, &options),
        Err(ConvertError::NotSupported(_))
    ));
}

#[test]
fn written_docbook_reads_back() {
    let doc = parse("Some ''em'' text\n", "moinwiki");
    let again = parse(&serialize(&doc, "docbook"), "docbook");
    let out = body_xml(&again);
    assert!(out.contains("<p>Some <emphasis>em</emphasis> text</p>"), "{out}");
}

#[test]
fn inline_media_is_stable_across_rewrites() {
    let source = article(
        "<para>See <inlinemediaobject><imageobject><imagedata fileref=\"a.png\" format=\"png\"/>\
</imageobject></inlinemediaobject> here</para>",
    );
    let once = convert(&source, "docbook", "docbook");
    let twice = convert(&once, "docbook", "docbook");
    assert_eq!(once, twice);
    assert_eq!(once.matches("<inlinemediaobject>").count(), 1, "{once}");
    assert!(!once.contains("<phrase>"), "{once}");
}

#[test]
fn image_query_survives_a_rewrite() {
    let source = article(
        "<mediaobject><imageobject><imagedata fileref=\"img.png?w=1\" format=\"png\"/></imageobject></mediaobject>",
    );
    let out = convert(&source, "docbook", "docbook");
    assert!(out.contains("fileref=\"img.png?w=1\""), "{out}");
}
