//! Plain text reading and writing

use crate::common::{body_xml, convert, parse};

#[test]
fn input_is_one_code_block() {
    assert_eq!(
        body_xml(&parse("a '''b'''\r\nc\n", "text")),
        "<blockcode>a '''b'''\nc</blockcode>"
    );
}

#[test]
fn wiki_to_text() {
    assert_eq!(
        convert("= Title =\n\none '''two'''\n\n----\n\nthree\n", "moinwiki", "text"),
        "Title\n\none two\n\n----\n\nthree\n"
    );
}

#[test]
fn footnotes_are_numbered_at_the_end() {
    assert_eq!(
        convert("Text<<FootNote(The note.)>>\n", "moinwiki", "text"),
        "Text[1]\n\n[1] The note.\n"
    );
}

#[test]
fn tables_join_cells() {
    assert_eq!(convert("||a||b||\n", "moinwiki", "text"), "a | b\n");
}
