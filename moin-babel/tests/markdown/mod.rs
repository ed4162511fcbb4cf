//! Markdown in and out of the document tree

use crate::common::{body_xml, convert, normalized, parse, parse_with};
use moin_babel::{Arguments, HostConfig};
use rstest::rstest;

fn markdown(source: &str) -> String {
    body_xml(&parse(source, "markdown"))
}

#[rstest]
#[case("# Title\n\nSome *emphasis* and **strong** text.\n")]
#[case("- one\n- two\n")]
#[case("1.  first\n2.  second\n")]
#[case("[link](http://example.org)\n")]
fn simple_documents_round_trip(#[case] source: &str) {
    assert_eq!(convert(source, "markdown", "markdown"), source);
}

#[test]
fn round_trip_keeps_the_tree() {
    let source = "## Notes\n\n> quoted\n\n| a | b |\n|---|---|\n| 1 | 2 |\n";
    let first = parse(source, "markdown");
    let again = parse(&convert(source, "markdown", "markdown"), "markdown");
    assert_eq!(normalized(&first), normalized(&again));
}

#[rstest]
#[case("~~gone~~", "<p><del>gone</del></p>")]
#[case("[TOC]", "<table-of-content />")]
#[case("[[WikiPage|label]]", "<p><a xlink:href=\"wiki.local:WikiPage\">label</a></p>")]
#[case("H<sub>2</sub>O", "<p>H<span baseline-shift=\"sub\">2</span>O</p>")]
fn extensions_and_inline_html(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(markdown(source), expected);
}

#[test]
fn extension_list_comes_from_the_arguments() {
    let arguments = Arguments::from_keywords([("extensions", "table")]);
    let doc = parse_with("~~kept~~", "markdown", &HostConfig::default(), &arguments);
    assert_eq!(body_xml(&doc), "<p>~~kept~~</p>");
}

#[test]
fn unsafe_link_targets_stay_local() {
    assert_eq!(
        markdown("[x](javascript:alert(1))"),
        "<p><a xlink:href=\"wiki.local:javascript:alert%281%29\">x</a></p>"
    );
}

#[test]
fn fenced_code_reaches_the_highlighter() {
    let out = markdown("```python\nx = 1\n```\n");
    assert!(out.starts_with("<blockcode class=\"highlight\""), "{out}");
}

#[rstest]
#[case("```python\nx = 1\n```\n")]
#[case("```nosuchlang\nx = 1\n```\n")]
fn fenced_code_keeps_its_language(#[case] source: &str) {
    let first = parse(source, "markdown");
    let out = convert(source, "markdown", "markdown");
    assert!(out.contains(source.lines().next().unwrap().trim_start_matches('`')), "{out}");
    assert_eq!(normalized(&first), normalized(&parse(&out, "markdown")));
}

#[rstest]
#[case("||a<<BR>>b||c||\n", "moinwiki")]
#[case("|a\\\\b|c|\n", "creole")]
fn cell_line_breaks_become_br_tags(#[case] source: &str, #[case] input: &str) {
    let out = convert(source, input, "markdown");
    assert!(out.contains("a<br>b"), "{out}");
}

#[test]
fn footnotes_become_notes() {
    assert_eq!(
        markdown("Text[^1]\n\n[^1]: The note.\n"),
        "<p>Text<note note-class=\"footnote\"><note-body>The note.</note-body></note></p>"
    );
}

#[test]
fn converts_to_moin_wiki() {
    assert_eq!(
        convert("**Strong** and *em*\n", "markdown", "moinwiki"),
        "'''Strong''' and ''em''\n"
    );
    assert_eq!(convert("- one\n- two\n", "markdown", "moinwiki"), " * one\n * two\n");
}
