//! HTML in and out of the document tree

use crate::common::{body_xml, convert, parse, parse_with, registry, serialize};
use moin_babel::{Arguments, ConvertError, HostConfig};
use rstest::rstest;
use std::collections::HashMap;

#[rstest]
#[case("<h2 id=\"x\">Title</h2>", "<h outline-level=\"2\" xml:id=\"x\">Title</h>")]
#[case("<hr>", "<separator class=\"moin-hr3\" />")]
#[case("<p>a<br>b</p>", "<p>a<line-break />b</p>")]
#[case("<p><strong>open", "<p><strong>open</strong></p>")]
#[case(
    "<html><head><title>T</title></head><body><p>x</p></body></html>",
    "<p>x</p>"
)]
fn reads_html(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(body_xml(&parse(source, "html")), expected);
}

#[test]
fn scripted_links_are_neutralized() {
    assert_eq!(
        body_xml(&parse("<p><a href=\"javascript:alert(1)\">x</a></p>", "html")),
        "<p><a xlink:href=\"wiki.local:javascript:alert%281%29\">x</a></p>"
    );
}

#[rstest]
#[case("<p>Some <strong>bold</strong> and <em>italic</em> text</p>")]
#[case("<ul><li>one</li><li>two</li></ul>")]
fn fragments_round_trip(#[case] source: &str) {
    assert_eq!(convert(source, "html", "html"), source);
}

#[test]
fn wiki_to_html() {
    let out = convert("== Intro Part ==\n'''b''' ''c''\n", "moinwiki", "html");
    assert!(out.contains("<h2 id=\"Intro_Part\">Intro Part</h2>"), "{out}");
    assert!(out.contains("<strong>b</strong>"), "{out}");
    assert!(out.contains("<em>c</em>"), "{out}");
}

#[test]
fn footnotes_are_collected_at_the_end() {
    let out = convert("Text<<FootNote(The note.)>>\n", "moinwiki", "html");
    assert!(out.contains("class=\"moin-footnote\""), "{out}");
    assert!(out.ends_with("</div>"), "{out}");
}

#[test]
fn standalone_document_and_bad_options() {
    let registry = registry();
    let output = registry.output_type("html").unwrap();
    let doc = parse("Text", "moinwiki");
    let options = HashMap::from([
        ("standalone".to_string(), "yes".to_string()),
        ("title".to_string(), "Notes".to_string()),
    ]);
    let out = registry.serialize(&doc, &output, &options).unwrap();
    assert!(out.starts_with("<!DOCTYPE html>"), "{out}");
    assert!(out.contains("<title>Notes</title>"), "{out}");

    let unknown = HashMap::from([("theme".to_string(), "dark".to_string())]);
    assert!(matches!(
        registry.serialize(&doc, &output, &unknown),
        Err(ConvertError::NotSupported(_))
    ));
    let bad = HashMap::from([("standalone".to_string(), "maybe".to_string())]);
    assert!(matches!(
        registry.serialize(&doc, &output, &bad),
        Err(ConvertError::InvalidArguments(_))
    ));
}

#[test]
fn nowiki_sections_are_marked() {
    let source = "{{{#!highlight python\npass\n}}}\n";
    let raw = convert(source, "moinwiki", "html");
    assert!(raw.contains("<pre class=\"moin-nowiki\">"), "{raw}");

    let arguments = Arguments::from_keywords([("nowiki", "expandall")]);
    let doc = parse_with(source, "moinwiki", &HostConfig::default(), &arguments);
    let expanded = serialize(&doc, "html");
    assert!(expanded.contains("<pre class=\"highlight moin-nowiki\"><span class=\"k\">pass</span></pre>"), "{expanded}");
}
