//! MoinMoin wiki markup through the public API
//!
//! Parser and serializer details are covered beside the code; these tests walk
//! whole documents through the default registry.

mod tables;

use crate::common::{self, body_xml, normalized, parse, parse_with};
use insta::assert_snapshot;
use moin_babel::{Arguments, HostConfig};
use rstest::rstest;

fn host() -> HostConfig {
    HostConfig::default().with_interwiki(["MoinMoin", "WikiPedia"])
}

fn wiki(source: &str) -> String {
    body_xml(&parse_with(source, "moinwiki", &host(), &Arguments::new()))
}

const CORPUS: &[&str] = &[
    "= Title =\n\nSome ''text'' with [[Link|a link]].\n",
    " * item\n * item 2\n  * nested\n",
    " 1. one\n 1. two\n",
    " Term:: description\n",
    "||a||b||\n||c||d||\n",
    "{{{\ncode\n}}}\n",
    "{{{#!highlight python\nimport os\n}}}\n",
    "Text<<BR>>Text\n\n----\n\n<<TableOfContents(2)>>\n",
    "^super^ ,,sub,, ~+big+~ ~-small-~ --(del)-- __ins__\n",
    "[[MoinMoin:RecentChanges|changes]] and [[http://moinmo.in/|MoinMoin]]\n",
    "{{image.png|alt text}}\n",
    "Note<<FootNote(the ''note'')>> here.\n",
];

#[test]
fn parse_serialize_parse_is_stable() {
    let registry = common::registry();
    for source in CORPUS {
        let first = parse_with(source, "moinwiki", &host(), &Arguments::new());
        let written = common::serialize(&first, "moinwiki");
        let second = parse_with(&written, "moinwiki", &host(), &Arguments::new());
        assert_eq!(normalized(&first), normalized(&second), "{source:?} became {written:?}");
    }
    assert!(registry.has("moinwiki"));
}

#[test]
fn mixed_quote_runs_follow_the_farther_close() {
    assert_eq!(
        wiki("'''''Mixed'''Emphasis''"),
        "<p><emphasis><strong>Mixed</strong>Emphasis</emphasis></p>"
    );
    assert_eq!(
        wiki("'''''Mixed''Strong'''"),
        "<p><strong><emphasis>Mixed</emphasis>Strong</strong></p>"
    );
}

#[rstest]
#[case("{{{{{\n}}}}\n}}}}}\n")]
#[case("{{{{{#!wiki\nwiki\n}}}\n}}}}}\n")]
#[case("{{{\nplain\n}}}\n")]
fn long_fences_round_trip_unchanged(#[case] source: &str) {
    assert_eq!(common::convert(source, "moinwiki", "moinwiki"), source);
}

#[test]
fn fence_of_other_length_is_content() {
    assert_eq!(
        wiki("{{{{\n}}}\n}}}}}\n}}}}"),
        "<nowiki>4<nowiki-args />}}}\n}}}}}</nowiki>"
    );
}

#[test]
fn include_with_page_list_builds_a_query() {
    let xml = wiki("<<Include(^Prefix..-..-..,,to=\"^----\",sort=descending,items=3)>>");
    assert!(
        xml.contains("page:include(pages(^^Prefix..-..-..) to(^^----) sort(descending) items(3))"),
        "{xml}"
    );
    assert!(!xml.contains("xinclude:href"), "{xml}");
}

#[test]
fn include_of_a_single_page_links_it() {
    let xml = wiki("<<Include(OtherPage)>>");
    assert!(xml.contains("xinclude:href=\"wiki.local:OtherPage\""), "{xml}");
}

#[test]
fn unknown_macros_stay_references() {
    assert_eq!(
        wiki("<<Date(2024-01-01)>>"),
        "<part alt=\"&lt;&lt;Date(2024-01-01)&gt;&gt;\" content-type=\"x-moin/macro;name=Date\">\
<arguments>2024-01-01</arguments></part>"
    );
}

#[test]
fn interwiki_depends_on_the_host() {
    assert_eq!(
        wiki("[[WikiPedia:Rust]]"),
        "<p><a xlink:href=\"wiki://WikiPedia/Rust\">Rust</a></p>"
    );
    let plain = body_xml(&parse("[[WikiPedia:Rust]]", "moinwiki"));
    assert_eq!(
        plain,
        "<p><a xlink:href=\"wiki.local:WikiPedia:Rust\">WikiPedia:Rust</a></p>"
    );
}

#[test]
fn schemes_come_from_the_host() {
    let strict = HostConfig::default().with_allowed_schemes(["https"]);
    let xml = body_xml(&parse_with("[[http://moinmo.in/|x]]", "moinwiki", &strict, &Arguments::new()));
    assert!(xml.contains("wiki.local:"), "{xml}");
    let xml = wiki("[[http://moinmo.in/|x]]");
    assert_eq!(xml, "<p><a xlink:href=\"http://moinmo.in/\">x</a></p>");
}

#[test]
fn line_numbers_on_request() {
    let host = HostConfig::default().with_line_numbers(true);
    let xml = body_xml(&parse_with("one\n\n== two ==", "moinwiki", &host, &Arguments::new()));
    assert_eq!(
        xml,
        "<p html:data-lineno=\"1\">one</p><h outline-level=\"2\" html:data-lineno=\"3\">two</h>"
    );
}

#[test]
fn old_wiki_links_camel_case_words() {
    let new = wiki("See FrontPage now");
    assert_eq!(new, "<p>See FrontPage now</p>");
    let old = body_xml(&parse("See FrontPage now", "moinwiki19"));
    assert!(old.contains("<a xlink:href=\"wiki.local:FrontPage\">FrontPage</a>"), "{old}");
}

#[test]
fn writes_markdown() {
    let out = common::convert(
        "= Title =\n\nSome '''strong''' and ''emphasis''.\n\n * one\n * two\n",
        "moinwiki",
        "markdown",
    );
    assert_snapshot!(out, @r"
    # Title

    Some **strong** and *emphasis*.

    - one
    - two
    ");
}

#[test]
fn writes_itself() {
    let out = common::convert(
        "= Title =\n\nSome ''text'' with [[SomePage|a link]].\n\n----\n\n`code` {{{samp}}}\n",
        "moinwiki",
        "moinwiki",
    );
    assert_snapshot!(out, @r"
    = Title =

    Some ''text'' with [[SomePage|a link]].
    ----

    `code` {{{samp}}}
    ");
}

#[test]
fn separator_after_paragraph_reads_back() {
    let source = "Some text.\n----\nMore.\n";
    assert_eq!(common::convert(source, "moinwiki", "moinwiki"), source.replace("----\n", "----\n\n"));
    assert_eq!(
        common::body_xml(&common::parse(source, "moinwiki")),
        "<p>Some text.</p><separator class=\"moin-hr1\" /><p>More.</p>"
    );
}
