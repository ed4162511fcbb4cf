//! Wiki tables: spans, sections and cell attributes.

use super::wiki;
use crate::common;

const TABLE: &str = "<table class=\"moin-wiki-table\">";

#[test]
fn row_span_leaves_no_placeholder_below() {
    assert_eq!(
        wiki("||A||B||<|2>D||\n||||C||"),
        format!(
            "{TABLE}<table-body>\
<table-row><table-cell>A</table-cell><table-cell>B</table-cell>\
<table-cell number-rows-spanned=\"2\">D</table-cell></table-row>\
<table-row><table-cell number-columns-spanned=\"2\">C</table-cell></table-row>\
</table-body></table>"
        )
    );
}

#[test]
fn separator_lines_split_the_body() {
    let xml = wiki("||Header||\n===\n||Body||");
    assert_eq!(xml.matches("<table-body>").count(), 2, "{xml}");
}

#[test]
fn bad_cell_attributes_are_reported_in_the_cell() {
    let xml = wiki("||<X>Cell||");
    assert!(xml.contains("background-color: pink"), "{xml}");
    assert!(xml.contains("Cell</table-cell>"), "{xml}");
}

#[test]
fn tables_survive_the_wiki_writer() {
    let source = "||<|2>Span||a||\n||b||\n";
    assert_eq!(
        common::convert(source, "moinwiki", "moinwiki"),
        "||<rowspan=\"2\">Span||a||\n||b||\n"
    );
}

#[test]
fn tables_in_html_get_sections() {
    let html = common::convert("||a||b||\n||c||d||\n", "moinwiki", "html");
    assert!(html.contains("<table class=\"moin-wiki-table\">"), "{html}");
    assert!(html.contains("<td>a</td><td>b</td>"), "{html}");
}
