//! CSV format implementation
//!
//! Comma (or other delimiter) separated values become a single sortable
//! table. The first record is the header. Fields may be wrapped in double
//! quotes to hold the delimiter or a line break; `""` inside a quoted field
//! is a literal quote.

use crate::common::table::{build_dom_table, CellData};
use crate::common::text::split_lines;
use crate::error::ConvertError;
use crate::format::{Format, ParseContext};
use crate::ir::Element;
use crate::mime::Type;

/// Delimiter used when neither the caller nor the data says otherwise.
pub const DEFAULT_DELIMITER: char = ';';

const TABLE_CLASS: &str = "moin-csv-table moin-sortable";

/// Candidates tried when sniffing the delimiter from the header line.
const SNIFFED: &[char] = &[';', ',', '\t', '|'];

/// Split CSV text into records.
pub fn records(text: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut at_field_start = true;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if quoted {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => quoted = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if at_field_start => {
                quoted = true;
                at_field_start = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
                at_field_start = true;
            }
            c if c == delimiter => {
                record.push(std::mem::take(&mut field));
                at_field_start = true;
            }
            _ => {
                field.push(c);
                at_field_start = false;
            }
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records.retain(|record| !(record.len() == 1 && record[0].trim().is_empty()));
    records
}

/// The table for CSV lines: first line header, the rest data rows.
pub fn csv_table(lines: &[String], delimiter: char, class: &str) -> Element {
    let mut rows = records(&lines.join("\n"), delimiter).into_iter();
    let head = rows.next();
    let rows: Vec<Vec<CellData>> = rows
        .map(|row| row.into_iter().map(CellData::from).collect())
        .collect();
    build_dom_table(&rows, head.as_deref(), Some(class))
}

/// The most frequent candidate delimiter in the first line.
fn sniff_delimiter(text: &str) -> char {
    let first = text.lines().next().unwrap_or_default();
    SNIFFED
        .iter()
        .map(|&candidate| (first.matches(candidate).count(), candidate))
        .filter(|(count, _)| *count > 0)
        .max_by_key(|(count, _)| *count)
        .map(|(_, candidate)| candidate)
        .unwrap_or(DEFAULT_DELIMITER)
}

/// Format implementation for CSV input
#[derive(Debug, Clone, Default)]
pub struct CsvFormat {
    /// Fixed delimiter; sniffed from the header line when `None`
    pub delimiter: Option<char>,
}

impl CsvFormat {
    pub fn with_delimiter(delimiter: char) -> Self {
        CsvFormat {
            delimiter: Some(delimiter),
        }
    }

    fn delimiter_for(&self, source: &str, ctx: &ParseContext<'_>) -> char {
        let argument = ctx
            .arguments
            .get("delimiter")
            .and_then(|value| value.chars().next());
        argument
            .or(self.delimiter)
            .unwrap_or_else(|| sniff_delimiter(source))
    }
}

impl Format for CsvFormat {
    fn name(&self) -> &str {
        "csv"
    }

    fn description(&self) -> &str {
        "Comma separated values, as a table"
    }

    fn file_extensions(&self) -> &[&str] {
        &["csv"]
    }

    fn input_types(&self) -> Vec<Type> {
        vec![Type::new(Some("text"), Some("csv")), Type::moin_format("csv")]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    #[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
    fn parse(&self, source: &str, ctx: &ParseContext<'_>) -> Result<Element, ConvertError> {
        let mut body = Element::page("body");
        if !source.trim().is_empty() {
            let delimiter = self.delimiter_for(source, ctx);
            tracing::debug!(%delimiter, "csv delimiter");
            body.push(csv_table(&split_lines(source), delimiter, TABLE_CLASS));
        }
        Ok(Element::document(body))
    }
}
