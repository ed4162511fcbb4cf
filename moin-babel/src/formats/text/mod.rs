//! Plain text
//!
//! Input is kept verbatim in a single `blockcode`. Output is the readable text
//! of the tree: blocks separated by blank lines, list items on their own
//! indented lines, table cells joined with ` | `, and footnotes numbered and
//! collected at the end.

use crate::common::nowiki::NowikiBlock;
use crate::error::ConvertError;
use crate::format::{Format, ParseContext};
use crate::ir::names::attr;
use crate::ir::{Element, Node};
use crate::mime::Type;

/// Format implementation for plain text
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFormat;

impl Format for TextFormat {
    fn name(&self) -> &str {
        "text"
    }

    fn description(&self) -> &str {
        "Plain text"
    }

    fn file_extensions(&self) -> &[&str] {
        &["txt", "text"]
    }

    fn input_types(&self) -> Vec<Type> {
        vec![Type::text_plain(), Type::moin_format("text")]
    }

    fn output_types(&self) -> Vec<Type> {
        vec![Type::text_plain()]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str, _ctx: &ParseContext<'_>) -> Result<Element, ConvertError> {
        let mut body = Element::page("body");
        let source = source.strip_suffix('\n').unwrap_or(source);
        if !source.is_empty() {
            body.push(Element::page("blockcode").with_child(source.replace("\r\n", "\n")));
        }
        Ok(Element::document(body))
    }

    fn serialize(&self, doc: &Element) -> Result<String, ConvertError> {
        let mut writer = TextWriter::default();
        writer.children(doc);
        Ok(writer.finish())
    }
}

#[derive(Default)]
struct TextWriter {
    out: String,
    /// Prefix of every line started inside the current container
    indent: String,
    notes: Vec<String>,
}

impl TextWriter {
    fn finish(mut self) -> String {
        let notes = std::mem::take(&mut self.notes);
        if !notes.is_empty() {
            self.block_break();
            for (index, note) in notes.iter().enumerate() {
                self.out.push_str(&format!("[{}] {note}\n", index + 1));
            }
        }
        let mut out = self.out.trim_end().to_string();
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }

    /// End the current line.
    fn line_break(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    /// Leave one blank line before the next block.
    fn block_break(&mut self) {
        if self.out.is_empty() {
            return;
        }
        self.line_break();
        if !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn text(&mut self, text: &str) {
        for (index, line) in text.split('\n').enumerate() {
            if index > 0 {
                self.out.push('\n');
            }
            if self.out.is_empty() || self.out.ends_with('\n') {
                if line.is_empty() {
                    continue;
                }
                self.out.push_str(&self.indent);
            }
            self.out.push_str(line);
        }
    }

    fn children(&mut self, elem: &Element) {
        for child in &elem.children {
            match child {
                Node::Text(text) => self.text(text),
                Node::Element(child) => self.element(child),
            }
        }
    }

    fn block(&mut self, elem: &Element) {
        self.block_break();
        self.children(elem);
        self.block_break();
    }

    fn element(&mut self, elem: &Element) {
        match elem.local_name() {
            "p" | "h" | "blockquote" | "div" | "admonition" | "figure" | "line-blk" | "line-block" => {
                self.block(elem)
            }
            "blockcode" | "nowiki" => {
                let content = match NowikiBlock::from_element(elem) {
                    Some(block) => block.content,
                    None if elem.is_page("nowiki") => return self.block(elem),
                    None => elem.text_content(),
                };
                self.block_break();
                self.text(&content);
                self.block_break();
            }
            "line-break" => self.out.push('\n'),
            "separator" => {
                self.block_break();
                self.text("----");
                self.block_break();
            }
            "list" => self.list(elem),
            "table" => self.table(elem),
            "note" => {
                if let Some(body) = elem.find("note-body") {
                    self.notes.push(body.text_content().trim().to_string());
                    let marker = format!("[{}]", self.notes.len());
                    self.text(&marker);
                }
            }
            "object" | "xinclude" | "include" | "audio" | "video" => {
                let alt = elem.page_attr(attr::ALT).map(str::to_string);
                let text = alt.unwrap_or_else(|| elem.text_content());
                self.text(&text);
            }
            "table-of-content" | "block-comment" | "nowiki-args" => {}
            _ => self.children(elem),
        }
    }

    fn list(&mut self, elem: &Element) {
        let generate = elem.page_attr(attr::ITEM_LABEL_GENERATE);
        let nested = !self.indent.is_empty() || (!self.out.is_empty() && !self.out.ends_with("\n\n"));
        if nested {
            self.line_break();
        } else {
            self.block_break();
        }
        let start: usize = elem
            .page_attr(attr::LIST_START)
            .and_then(|start| start.parse().ok())
            .unwrap_or(1);
        for (index, item) in elem.elements().filter(|e| e.is_page("list-item")).enumerate() {
            let marker = match generate {
                Some("ordered") => format!("{}. ", start + index),
                Some(_) => "- ".to_string(),
                None => String::new(),
            };
            self.line_break();
            if let Some(label) = item.find("list-item-label") {
                self.text(&format!("{marker}{}", label.text_content()));
                self.line_break();
            } else {
                self.text(&marker);
            }
            let saved = self.indent.clone();
            if let Some(body) = item.find("list-item-body") {
                if item.find("list-item-label").is_some() || marker.is_empty() {
                    self.indent.push_str("    ");
                    self.line_break();
                    self.children(body);
                } else {
                    self.indent.push_str(&" ".repeat(marker.len()));
                    self.children(body);
                }
            }
            self.indent = saved;
            self.line_break();
        }
        if !nested {
            self.block_break();
        }
    }

    fn table(&mut self, elem: &Element) {
        self.block_break();
        let mut rows = Vec::new();
        elem.walk(&mut |e: &Element| {
            if e.is_page("table-row") {
                rows.push(e.clone());
            }
        });
        for row in rows {
            let cells: Vec<String> = row
                .elements()
                .map(|cell| cell.text_content().trim().replace('\n', " "))
                .collect();
            self.text(&cells.join(" | "));
            self.line_break();
        }
        self.block_break();
    }
}
