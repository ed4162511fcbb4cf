//! Tables from row data, and tables back to grids
//!
//! [`build_dom_table`] turns plain rows (CSV records, query results) into a
//! `table` element, flagging numeric cells and cells holding a single overlong
//! word. [`TableGrid`] goes the other way for serializers that need a rectangular
//! layout: column spans expand into empty placeholder slots, and short rows are
//! padded at the end. Cells covered by a row span from above are not
//! re-inserted; the next row simply starts at its own first cell.

use crate::ir::names::attr;
use crate::ir::{Element, Node};

/// Single-word cells longer than this get the `moin-wordbreak` class.
pub const WORDBREAK_LEN: usize = 30;

pub const NUMERIC_CLASS: &str = "moin-integer";
pub const WORDBREAK_CLASS: &str = "moin-wordbreak";

/// One cell of input for [`build_dom_table`].
#[derive(Debug, Clone, PartialEq)]
pub enum CellData {
    Text(String),
    Element(Element),
}

impl From<&str> for CellData {
    fn from(text: &str) -> Self {
        CellData::Text(text.to_string())
    }
}

impl From<String> for CellData {
    fn from(text: String) -> Self {
        CellData::Text(text)
    }
}

impl From<Element> for CellData {
    fn from(elem: Element) -> Self {
        CellData::Element(elem)
    }
}

/// True when the text reads as a number.
pub fn is_numeric(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty() && trimmed.parse::<f64>().is_ok()
}

fn long_word(text: &str) -> bool {
    text.split_whitespace().count() == 1 && text.chars().count() > WORDBREAK_LEN
}

fn text_cell(text: &str) -> Element {
    let mut cell = Element::page("table-cell").with_child(text);
    if is_numeric(text) {
        cell.set_page_attr(attr::CLASS, NUMERIC_CLASS);
    } else if long_word(text) {
        cell.set_page_attr(attr::CLASS, WORDBREAK_CLASS);
    }
    cell
}

fn is_long_word(elem: &Element) -> bool {
    match elem.children.first() {
        Some(Node::Text(text)) => long_word(text),
        _ => false,
    }
}

/// Build `table[class]/(table-header/table-row)?/table-body/table-row*`.
///
/// A header cell gets the numeric class when the first data row has the same
/// width and its cell in that column is numeric.
pub fn build_dom_table(rows: &[Vec<CellData>], head: Option<&[String]>, class: Option<&str>) -> Element {
    let mut table = Element::page("table");
    if let Some(class) = class {
        table.set_page_attr(attr::CLASS, class);
    }
    if let Some(head) = head {
        let mut row = Element::page("table-row");
        let first = rows.first().filter(|first| first.len() == head.len());
        for (index, text) in head.iter().enumerate() {
            let mut cell = Element::page("table-cell").with_child(text.as_str());
            if let Some(CellData::Text(value)) = first.and_then(|first| first.get(index)) {
                if is_numeric(value) {
                    cell.set_page_attr(attr::CLASS, NUMERIC_CLASS);
                }
            }
            row.push(cell);
        }
        table.push(Element::page("table-header").with_child(row));
    }
    let mut body = Element::page("table-body");
    for data in rows {
        let mut row = Element::page("table-row");
        for value in data {
            let cell = match value {
                CellData::Element(elem) if is_long_word(elem) => Element::page("table-cell")
                    .with_page_attr(attr::CLASS, WORDBREAK_CLASS)
                    .with_child(elem.clone()),
                CellData::Element(elem) => Element::page("table-cell").with_child(elem.clone()),
                CellData::Text(text) => text_cell(text),
            };
            row.push(cell);
        }
        body.push(row);
    }
    table.push(body);
    table
}

/// A slot in a [`TableGrid`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridSlot<'a> {
    Cell(&'a Element),
    /// Covered by a column span, or padding at the end of a short row
    Empty,
}

impl<'a> GridSlot<'a> {
    pub fn cell(&self) -> Option<&'a Element> {
        match self {
            GridSlot::Cell(cell) => Some(cell),
            GridSlot::Empty => None,
        }
    }
}

/// Rectangular view of a `table` element.
#[derive(Debug, Clone, PartialEq)]
pub struct TableGrid<'a> {
    /// Rows that came from `table-header`
    pub header_rows: usize,
    pub rows: Vec<Vec<GridSlot<'a>>>,
    pub caption: Option<&'a Element>,
}

impl<'a> TableGrid<'a> {
    pub fn from_table(table: &'a Element) -> Self {
        let mut grid = TableGrid {
            header_rows: 0,
            rows: Vec::new(),
            caption: table.find("caption"),
        };
        for part in table.elements() {
            match part.page_name() {
                Some("table-header") => {
                    for row in part.elements().filter(|e| e.is_page("table-row")) {
                        grid.rows.push(expand_row(row));
                        grid.header_rows += 1;
                    }
                }
                Some("table-body") | Some("table-footer") => {
                    for row in part.elements().filter(|e| e.is_page("table-row")) {
                        grid.rows.push(expand_row(row));
                    }
                }
                Some("table-row") => grid.rows.push(expand_row(part)),
                _ => {}
            }
        }
        let width = grid.width();
        for row in &mut grid.rows {
            row.resize(width, GridSlot::Empty);
        }
        grid
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Column span of a cell, at least 1.
pub fn colspan(cell: &Element) -> usize {
    cell.page_attr(attr::COLSPAN)
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .max(1)
}

fn expand_row(row: &Element) -> Vec<GridSlot<'_>> {
    let mut slots = Vec::new();
    for cell in row.elements().filter(|e| e.is_page("table-cell")) {
        slots.push(GridSlot::Cell(cell));
        for _ in 1..colspan(cell) {
            slots.push(GridSlot::Empty);
        }
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::xml::to_fragment;

    #[test]
    fn numeric_and_header_detection() {
        let rows = vec![vec![CellData::from("a"), CellData::from("12")]];
        let head = vec!["Name".to_string(), "Count".to_string()];
        let table = build_dom_table(&rows, Some(&head), Some("moin-csv-table"));
        assert_eq!(
            to_fragment(&table),
            "<table class=\"moin-csv-table\"><table-header><table-row><table-cell>Name</table-cell>\
<table-cell class=\"moin-integer\">Count</table-cell></table-row></table-header>\
<table-body><table-row><table-cell>a</table-cell><table-cell class=\"moin-integer\">12</table-cell>\
</table-row></table-body></table>"
        );
    }

    #[test]
    fn long_single_words_break() {
        let link = Element::page("a").with_child("a_really_long_file_name_without_any_spaces.png");
        let table = build_dom_table(&[vec![CellData::from(link)]], None, None);
        let cell = &table.find("table-body").unwrap().elements().next().unwrap().elements().next().unwrap();
        assert_eq!(cell.page_attr("class"), Some(WORDBREAK_CLASS));
    }

    #[test]
    fn grid_expands_colspan_but_not_rowspan() {
        let cell = |text: &str| Element::page("table-cell").with_child(text);
        let table = Element::page("table").with_child(
            Element::page("table-body")
                .with_child(
                    Element::page("table-row")
                        .with_child(cell("A"))
                        .with_child(cell("B"))
                        .with_child(cell("D").with_page_attr(attr::ROWSPAN, "2")),
                )
                .with_child(
                    Element::page("table-row")
                        .with_child(cell("C").with_page_attr(attr::COLSPAN, "2")),
                ),
        );
        let grid = TableGrid::from_table(&table);
        assert_eq!(grid.width(), 3);
        let second: Vec<Option<String>> = grid.rows[1]
            .iter()
            .map(|slot| slot.cell().map(Element::text_content))
            .collect();
        assert_eq!(second, vec![Some("C".to_string()), None, None]);
    }
}
