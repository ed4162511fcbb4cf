//! CSV tables through the default registry

use crate::common::{body_xml, convert, parse, parse_with};
use moin_babel::{Arguments, HostConfig};

#[test]
fn first_row_is_the_header() {
    assert_eq!(
        body_xml(&parse("Name,Count\nfoo,3\n", "csv")),
        "<table class=\"moin-csv-table moin-sortable\"><table-header><table-row>\
<table-cell>Name</table-cell><table-cell class=\"moin-integer\">Count</table-cell></table-row></table-header>\
<table-body><table-row><table-cell>foo</table-cell><table-cell class=\"moin-integer\">3</table-cell>\
</table-row></table-body></table>"
    );
}

#[test]
fn delimiter_argument_overrides_sniffing() {
    let arguments = Arguments::from_keywords([("delimiter", "|")]);
    let out = body_xml(&parse_with("a,b|c", "csv", &HostConfig::default(), &arguments));
    assert!(out.contains("<table-cell>a,b</table-cell><table-cell>c</table-cell>"), "{out}");
}

#[test]
fn quoted_cells_keep_their_delimiters() {
    let out = body_xml(&parse("\"x;y\";z\n1;2\n", "csv"));
    // header cells take the numeric class of the column below them
    assert!(
        out.contains("<table-header><table-row><table-cell class=\"moin-integer\">x;y</table-cell>"),
        "{out}"
    );
}

#[test]
fn reads_as_text() {
    assert_eq!(convert("a,b\n1,2\n", "csv", "text"), "a | b\n1 | 2\n");
}
