//! MediaWiki markup through the default registry

use crate::common::{body_xml, convert, parse};
use rstest::rstest;

fn mediawiki(source: &str) -> String {
    body_xml(&parse(source, "mediawiki"))
}

#[rstest]
#[case("'''bold'''", "<p><strong>bold</strong></p>")]
#[case("''italic''", "<p><emphasis>italic</emphasis></p>")]
#[case("Text\n\nTest", "<p>Text</p><p>Test</p>")]
#[case("caf&eacute; &#x41;", "<p>café A</p>")]
#[case("----", "<separator />")]
#[case("aaa<br />bbb", "<p>aaa<line-break />bbb</p>")]
fn blocks_and_inlines(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(mediawiki(source), expected);
}

#[test]
fn disallowed_schemes_stay_text() {
    assert_eq!(
        mediawiki("[javascript:alert('xss')]"),
        "<p>[javascript:alert('xss')]</p>"
    );
}

#[test]
fn references_become_footnotes() {
    assert_eq!(
        mediawiki("aaa <ref> sdf </ref> test\n\n asd"),
        "<p>aaa <note note-class=\"footnote\"><note-body> sdf </note-body></note> test</p><p> asd</p>"
    );
}

#[test]
fn heading_levels() {
    let expected: String = (1..=3)
        .map(|n| format!("<h outline-level=\"{n}\">level {n}</h>"))
        .collect();
    assert_eq!(mediawiki("=level 1=\n== level 2 ==\n===level 3===\n"), expected);
}

#[test]
fn converts_to_plain_text() {
    assert_eq!(convert("'''bold''' text", "mediawiki", "text"), "bold text\n");
}
