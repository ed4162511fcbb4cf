//! reStructuredText through the default registry

use crate::common::{body_xml, convert, parse, parse_with};
use moin_babel::{Arguments, HostConfig};

fn rst(source: &str) -> String {
    body_xml(&parse(source, "rst"))
}

#[test]
fn title_and_list_round_trip() {
    assert_eq!(
        convert("Title\n=====\n\n* a *b*\n", "rst", "rst"),
        "=====\nTitle\n=====\n\n* a *b*\n"
    );
}

#[test]
fn section_levels_follow_first_use() {
    assert_eq!(
        rst("=====\nTitle\n=====\n\nSub\n---\n\nOther\n=====\n"),
        "<h outline-level=\"1\">Title</h><h outline-level=\"2\">Sub</h><h outline-level=\"3\">Other</h>"
    );
}

#[test]
fn targets_resolve_in_either_order() {
    assert_eq!(
        rst("See Moin_.\n\n.. _Moin: http://moinmo.in/"),
        "<p>See <a xlink:href=\"http://moinmo.in/\">Moin</a>.</p>"
    );
    assert_eq!(
        rst("Intro Part\n==========\n\nSee `Intro Part`_."),
        "<h outline-level=\"1\">Intro Part</h><p>See <a xlink:href=\"wiki.local:#Intro_Part\">Intro Part</a>.</p>"
    );
}

#[test]
fn directives_map_to_tree_nodes() {
    assert_eq!(rst(".. contents::\n   :depth: 2"), "<table-of-content outline-level=\"2\" />");
    assert_eq!(
        rst(".. note:: Be careful."),
        "<admonition type=\"note\"><p>Be careful.</p></admonition>"
    );
}

#[test]
fn unknown_directives_are_reported_in_place() {
    let out = rst(".. frobnicate:: x");
    assert!(out.contains("moin-error"), "{out}");
    assert!(out.ends_with("<blockcode>.. frobnicate:: x</blockcode>"), "{out}");
}

#[test]
fn line_numbers_on_request() {
    let host = HostConfig::default().with_line_numbers(true);
    let doc = parse_with("a\n\nb", "rst", &host, &Arguments::new());
    assert_eq!(
        body_xml(&doc),
        "<p html:data-lineno=\"1\">a</p><p html:data-lineno=\"3\">b</p>"
    );
}

#[test]
fn converts_to_markdown() {
    assert_eq!(convert("Hello *world*.", "rst", "markdown"), "Hello *world*.\n");
}
