//! Table rows and cell arguments
//!
//! A row `||a||<-2 #ff0000>b||` is split into cells by [`split_row`]. Each
//! cell may open with `<...>` arguments; [`parse_cell_arguments`] reads them,
//! and [`apply_cell_arguments`] distributes the result over the cell, its row
//! and the whole table. Anything it cannot read is reported inside the cell
//! text and colours the cell.

use crate::common::args::{unescape, Arguments};
use crate::ir::names::attr;
use crate::ir::{Element, QName};
use once_cell::sync::Lazy;
use regex::Regex;

const ERROR_STYLE: &str = "background-color: pink; color: black;";

/// One cell of a table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCell<'t> {
    /// Number of `||` pairs before the cell
    pub span: usize,
    pub args: Option<&'t str>,
    pub text: &'t str,
}

/// First of `needles` in `haystack`, as `(offset, needle length)`.
fn find_first(haystack: &str, needles: &[&str]) -> Option<usize> {
    needles.iter().filter_map(|needle| haystack.find(needle)).min()
}

/// End of the cell text starting at `from`: the next `||` that is not inside
/// a `[[link]]` or a `{{transclusion}}`.
fn cell_text_end(row: &str, from: usize) -> usize {
    let mut pos = from;
    loop {
        let bar = row[pos..].find("||").map(|i| pos + i);
        let open = find_first(&row[pos..], &["[[", "{{"]).map(|i| pos + i);
        match (bar, open) {
            (Some(bar), Some(open)) if open < bar => {
                match find_first(&row[open + 2..], &["]]", "}}"]) {
                    Some(close) => pos = open + 2 + close + 2,
                    None => return bar,
                }
            }
            (Some(bar), _) => return bar,
            (None, _) => return row.len(),
        }
    }
}

/// Split the inside of a table line (without its final `||`) into cells.
pub fn split_row(row: &str) -> Vec<RowCell<'_>> {
    let mut cells = Vec::new();
    let mut pos = 0;
    while row[pos..].starts_with("||") {
        let mut span = 0;
        while row[pos..].starts_with("||") {
            span += 1;
            pos += 2;
        }
        let mut args = None;
        if let Some(rest) = row[pos..].strip_prefix('<') {
            if let Some(close) = rest.find('>') {
                if !rest[..close].contains('<') {
                    args = Some(&rest[..close]);
                    pos += close + 2;
                }
            }
        }
        let end = cell_text_end(row, pos);
        cells.push(RowCell {
            span,
            args,
            text: &row[pos..end],
        });
        pos = end;
    }
    cells
}

static CELL_ARG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:([-\w]+)=)?(?:([-\w]+)|"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)')"#)
        .expect("cell argument pattern")
});

static SPAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([-|])(\d+)").expect("cell span pattern"));

static PERCENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+%").expect("cell width pattern"));

static COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#([A-Fa-f0-9]{3}(?:[A-Fa-f0-9]{3})?)").expect("cell color pattern")
});

fn append_style(args: &mut Arguments, style: &str) {
    let entry = args.keyword.entry("style".to_string()).or_default();
    entry.push_str(style);
    entry.push(' ');
}

/// Read `<...>` cell arguments.
///
/// Shorthands (`-2` column span, `|2` row span, `50%` width, `v ^ ( : )`
/// alignment, `#rgb` background) accumulate into the `style` keyword; plain
/// `key=value` pairs are kept as written; a character nothing understands is
/// stored under `error`.
pub fn parse_cell_arguments(input: &str) -> Arguments {
    let mut args = Arguments::new();
    let mut pos = 0;
    while let Some(c) = input[pos..].chars().next() {
        let rest = &input[pos..];
        if c.is_whitespace() {
            pos += c.len_utf8();
            continue;
        }
        if let Some(caps) = SPAN_RE.captures(rest) {
            let key = if &caps[1] == "-" { attr::COLSPAN } else { attr::ROWSPAN };
            let count = caps[2].parse::<u64>().map(|n| n.to_string()).unwrap_or_else(|_| caps[2].to_string());
            args.keyword.insert(key.to_string(), count);
            pos += caps[0].len();
            continue;
        }
        if let Some(m) = PERCENT_RE.find(rest) {
            append_style(&mut args, &format!("width: {};", m.as_str()));
            pos += m.end();
            continue;
        }
        let align = match c {
            'v' => Some("vertical-align: bottom;"),
            '^' => Some("vertical-align: top;"),
            '(' => Some("text-align: left;"),
            ':' => Some("text-align: center;"),
            ')' => Some("text-align: right;"),
            _ => None,
        };
        if let Some(style) = align {
            append_style(&mut args, style);
            pos += 1;
            continue;
        }
        if let Some(caps) = CELL_ARG_RE.captures(rest) {
            let raw = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            let value = unescape(raw);
            match caps.get(1).map(|m| m.as_str()) {
                Some("colspan") => {
                    args.keyword.insert(attr::COLSPAN.to_string(), value);
                }
                Some("rowspan") => {
                    args.keyword.insert(attr::ROWSPAN.to_string(), value);
                }
                Some(key) => {
                    args.keyword.insert(key.to_string(), value);
                }
                None => args.positional.push(value),
            }
            pos += caps[0].len();
            continue;
        }
        if let Some(caps) = COLOR_RE.captures(rest) {
            append_style(&mut args, &format!("background-color: #{};", &caps[1]));
            pos += caps[0].len();
            continue;
        }
        args.keyword.insert("error".to_string(), c.to_string());
        pos += c.len_utf8();
    }
    args
}

/// Append a declaration to the `style` attribute, terminating it with `;`.
pub fn add_style(elem: &mut Element, style: &str) {
    let mut style = style.trim().to_string();
    if !style.ends_with(';') {
        style.push(';');
    }
    let name = QName::page(attr::STYLE);
    let value = match elem.attr(&name) {
        Some(existing) if !existing.is_empty() => format!("{existing} {style}"),
        _ => style,
    };
    elem.set_attr(name, value);
}

/// Where a cell argument lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellEffect {
    Cell,
    Row,
    Table,
}

/// Changes collected from one cell's arguments.
#[derive(Debug, Default)]
pub struct CellChanges {
    pub row: Vec<RowChange>,
    pub table: Vec<RowChange>,
    pub caption: Option<String>,
}

/// One change to the enclosing row or table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowChange {
    Style(String),
    Set(&'static str, String),
}

impl RowChange {
    pub fn apply(&self, elem: &mut Element) {
        match self {
            RowChange::Style(style) => add_style(elem, style),
            RowChange::Set(key, value) => elem.set_page_attr(key, value.as_str()),
        }
    }
}

/// Apply parsed arguments to `cell`, collecting row and table changes, and
/// return the cell text to parse (with error reports prepended).
pub fn apply_cell_arguments(
    cell: &mut Element,
    raw_args: &str,
    args: &Arguments,
    text: &str,
    changes: &mut CellChanges,
) -> String {
    let mut text = text.to_string();
    let mut no_errors = true;
    for (key, value) in args.items() {
        match key {
            Some("bgcolor") => {
                if no_errors {
                    add_style(cell, &format!("background-color: {value};"));
                }
            }
            Some("rowbgcolor") => changes.row.push(RowChange::Style(format!("background-color: {value};"))),
            Some("tablebgcolor") => changes.table.push(RowChange::Style(format!("background-color: {value};"))),
            Some("width") => add_style(cell, &format!("width: {value};")),
            Some("tablewidth") => changes.table.push(RowChange::Style(format!("width: {value};"))),
            Some("caption") => changes.caption = Some(value.to_string()),
            Some("tableclass") => changes
                .table
                .push(RowChange::Set(attr::CLASS, format!("{value} moin-wiki-table"))),
            Some("rowclass") => changes.row.push(RowChange::Set(attr::CLASS, value.to_string())),
            Some("class") => cell.set_page_attr(attr::CLASS, value),
            Some("tablestyle") => changes.table.push(RowChange::Style(value.to_string())),
            Some("rowstyle") => changes.row.push(RowChange::Style(value.to_string())),
            Some("style") => {
                if no_errors {
                    add_style(cell, value);
                }
            }
            Some("tableid") => changes.table.push(RowChange::Set(attr::ID, value.to_string())),
            Some("rowid") => changes.row.push(RowChange::Set(attr::ID, value.to_string())),
            Some("id") => cell.set_page_attr(attr::ID, value),
            Some(key @ (attr::COLSPAN | attr::ROWSPAN)) => cell.set_page_attr(key, value),
            other => {
                let error = match other {
                    Some("error") | None => value,
                    Some(key) => key,
                };
                tracing::debug!(error, "invalid table cell argument");
                text = format!(
                    "[ Error: \"{error}\" is invalid within <{raw_args}>&nbsp;]<<BR>>{text}"
                );
                if no_errors {
                    add_style(cell, ERROR_STYLE);
                }
                no_errors = false;
            }
        }
    }
    text
}
