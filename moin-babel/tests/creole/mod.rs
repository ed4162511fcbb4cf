//! Creole 1.0 through the default registry

use crate::common::{body_xml, convert, parse, parse_with};
use moin_babel::{Arguments, HostConfig};
use rstest::rstest;

fn creole(source: &str) -> String {
    body_xml(&parse(source, "creole"))
}

#[rstest]
#[case("Text", "<p>Text</p>")]
#[case("**Strong**", "<p><strong>Strong</strong></p>")]
#[case("Line\\\\Break", "<p>Line<line-break />Break</p>")]
#[case("----", "<separator class=\"moin-hr3\" />")]
#[case("{{my.png}}", "<p><xinclude:include xinclude:href=\"wiki.local:my.png\" /></p>")]
#[case(
    "[[Page|//styled//]]",
    "<p><a xlink:href=\"wiki.local:Page\"><emphasis>styled</emphasis></a></p>"
)]
#[case(
    "|=Heading|",
    "<table><table-body><table-row><table-cell class=\"moin-thead\">Heading</table-cell></table-row></table-body></table>"
)]
#[case(
    "Text<<FootNote(**bold**)>>",
    "<p>Text<note note-class=\"footnote\"><note-body><strong>bold</strong></note-body></note></p>"
)]
fn blocks_and_inlines(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(creole(source), expected);
}

#[test]
fn interwiki_names_come_from_the_host() {
    let host = HostConfig::default().with_interwiki(["MoinMoin"]);
    let doc = parse_with("[[MoinMoin:InterWiki]]", "creole", &host, &Arguments::new());
    assert_eq!(
        body_xml(&doc),
        "<p><a xlink:href=\"wiki://MoinMoin/InterWiki\">InterWiki</a></p>"
    );
}

#[test]
fn nowiki_sections_switch_dialect() {
    assert_eq!(
        creole("{{{\n#!creole\nwiki\n}}}"),
        "<page><body><p>wiki</p></body></page>"
    );
    assert_eq!(creole("{{{\ncode\n~}}}\n}}}"), "<blockcode>code\n}}}</blockcode>");
}

#[test]
fn lists_end_at_the_next_block() {
    assert_eq!(
        creole("Text\n* Item\n= Heading"),
        "<p>Text</p><list item-label-generate=\"unordered\"><list-item><list-item-body>Item</list-item-body></list-item></list><h outline-level=\"1\">Heading</h>"
    );
}

#[test]
fn converts_to_html() {
    let html = convert("**Strong** and //em//", "creole", "html");
    assert!(html.contains("<strong>Strong</strong>"), "{html}");
    assert!(html.contains("<em>em</em>"), "{html}");
}

#[test]
fn converts_to_markdown() {
    assert_eq!(convert("**bold** and //italic//", "creole", "markdown"), "**bold** and *italic*\n");
}
