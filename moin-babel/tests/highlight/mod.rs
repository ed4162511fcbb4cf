//! Source highlighting through the default registry

use crate::common::{body_xml, parse, parse_with, registry};
use moin_babel::{Arguments, HostConfig, Type};

#[test]
fn lexer_argument_picks_the_grammar() {
    let arguments = Arguments::from_keywords([("lexer", "rs")]);
    let out = body_xml(&parse_with("fn main() {}\n", "highlight", &HostConfig::default(), &arguments));
    assert!(
        out.starts_with("<blockcode class=\"highlight\"><span class=\"k\">fn</span>"),
        "{out}"
    );
}

#[test]
fn media_type_picks_the_grammar() {
    let out = body_xml(&parse("pass", "text/x-python"));
    assert!(out.contains("<span class=\"k\">pass</span>"), "{out}");
}

#[test]
fn unknown_lexer_falls_back_to_plain_text() {
    let arguments = Arguments::from_keywords([("lexer", "klingon")]);
    let out = body_xml(&parse_with("a < b", "highlight", &HostConfig::default(), &arguments));
    assert_eq!(out, "<blockcode class=\"highlight\">a &lt; b</blockcode>");
}

#[test]
fn source_extensions_are_detected() {
    let registry = registry();
    assert_eq!(registry.detect_format_from_filename("main.rs").as_deref(), Some("highlight"));
    assert_eq!(
        registry.input_type("text/x-python").unwrap(),
        Type::parse("text/x-python").unwrap()
    );
}

#[test]
fn expanded_wiki_blocks_use_the_highlighter() {
    let arguments = Arguments::from_keywords([("nowiki", "expandall")]);
    let doc = parse_with("{{{#!highlight python\nimport os\n}}}\n", "moinwiki", &HostConfig::default(), &arguments);
    let out = body_xml(&doc);
    assert!(out.contains("<span class=\"k\">import</span>"), "{out}");
    assert!(out.starts_with("<nowiki><blockcode class=\"highlight\">"), "{out}");
}
