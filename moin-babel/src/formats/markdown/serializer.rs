//! Markdown serialization (document tree → Markdown)
//!
//! Pipeline: `page/body` tree → Comrak AST → Markdown string
//!
//! The tree is mapped onto Comrak nodes and Comrak's CommonMark formatter
//! writes the text, so escaping and list indentation come out right. What
//! Markdown has no syntax for is written as raw inline HTML (`<u>`, `<sub>`,
//! `<big>`) or dropped. Footnotes are numbered in document order and their
//! definitions appended at the end.

use crate::common::nowiki::NowikiBlock;
use crate::error::ConvertError;
use crate::ir::names::attr;
use crate::ir::{Element, Namespace, Node, QName};
use comrak::nodes::{Ast, AstNode, ListDelimType, ListType, NodeTable, NodeValue, TableAlignment};
use comrak::{format_commonmark, Arena, ComrakOptions};
use std::cell::RefCell;

/// Serialize a document tree to Markdown
pub fn serialize_to_markdown(doc: &Element) -> Result<String, ConvertError> {
    let arena = Arena::new();
    let mut builder = AstBuilder::new(&arena);
    let root = builder.node(NodeValue::Document);
    builder.blocks(root, doc)?;

    let mut markdown = render(root)?;

    // Comrak separates adjacent lists with a marker comment
    markdown = markdown.replace("<!-- end list -->\n\n", "");

    if !builder.footnotes.is_empty() {
        markdown.push('\n');
        for (index, note) in builder.footnotes.iter().enumerate() {
            markdown.push_str(&format!("[^{}]: {note}\n", index + 1));
        }
    }
    Ok(markdown)
}

fn default_comrak_options() -> ComrakOptions<'static> {
    let mut options = super::parser::default_comrak_options();
    // raw HTML for what Markdown cannot express
    options.render.unsafe_ = true;
    options
}

fn render<'a>(root: &'a AstNode<'a>) -> Result<String, ConvertError> {
    let mut output = Vec::new();
    format_commonmark(root, &default_comrak_options(), &mut output)
        .map_err(|e| ConvertError::Serialization(format!("Comrak serialization failed: {e}")))?;
    String::from_utf8(output)
        .map_err(|e| ConvertError::Serialization(format!("UTF-8 conversion failed: {e}")))
}

/// Elements rendered as blocks; anything else inside a block container is
/// collected into an implicit paragraph.
fn is_block(elem: &Element) -> bool {
    if elem.name.ns == Namespace::Xinclude {
        return false;
    }
    matches!(
        elem.local_name(),
        "page"
            | "body"
            | "div"
            | "h"
            | "p"
            | "blockcode"
            | "list"
            | "table"
            | "separator"
            | "blockquote"
            | "table-of-content"
            | "nowiki"
            | "part"
            | "admonition"
    )
}

/// Link targets lose the `wiki.local:` pseudo-scheme.
fn markdown_href(href: &str) -> String {
    href.strip_prefix("wiki.local:").unwrap_or(href).to_string()
}

struct AstBuilder<'a> {
    arena: &'a Arena<AstNode<'a>>,
    /// Rendered footnote texts, in reference order
    footnotes: Vec<String>,
    /// Inside a table cell, where Comrak allows no break nodes
    in_cell: bool,
}

impl<'a> AstBuilder<'a> {
    fn new(arena: &'a Arena<AstNode<'a>>) -> Self {
        AstBuilder {
            arena,
            footnotes: Vec::new(),
            in_cell: false,
        }
    }

    fn node(&self, value: NodeValue) -> &'a AstNode<'a> {
        self.arena
            .alloc(AstNode::new(RefCell::new(Ast::new(value, (0, 0).into()))))
    }

    fn append(&self, parent: &'a AstNode<'a>, value: NodeValue) -> &'a AstNode<'a> {
        let node = self.node(value);
        parent.append(node);
        node
    }

    fn raw_inline(&self, parent: &'a AstNode<'a>, html: &str) {
        self.append(parent, NodeValue::HtmlInline(html.to_string()));
    }

    fn raw_block(&self, parent: &'a AstNode<'a>, literal: String) {
        self.append(
            parent,
            NodeValue::HtmlBlock(comrak::nodes::NodeHtmlBlock {
                block_type: 0,
                literal,
            }),
        );
    }

    /// Children of a block container. Runs of inline content become
    /// paragraphs unless `bare_inline` is set (tight list items).
    fn blocks(&mut self, parent: &'a AstNode<'a>, elem: &Element) -> Result<(), ConvertError> {
        let mut paragraph: Option<&'a AstNode<'a>> = None;
        for child in &elem.children {
            match child {
                Node::Element(block) if is_block(block) => {
                    paragraph = None;
                    self.block(parent, block)?;
                }
                other => {
                    if let Node::Text(text) = other {
                        if paragraph.is_none() && text.trim().is_empty() {
                            continue;
                        }
                    }
                    let target = match paragraph {
                        Some(p) => p,
                        None => {
                            let p = self.append(parent, NodeValue::Paragraph);
                            paragraph = Some(p);
                            p
                        }
                    };
                    self.inline(target, other)?;
                }
            }
        }
        Ok(())
    }

    fn block(&mut self, parent: &'a AstNode<'a>, elem: &Element) -> Result<(), ConvertError> {
        match elem.local_name() {
            "h" => {
                let level = elem
                    .page_attr(attr::OUTLINE_LEVEL)
                    .and_then(|l| l.parse::<u8>().ok())
                    .unwrap_or(1)
                    .clamp(1, 6);
                let heading = self.append(
                    parent,
                    NodeValue::Heading(comrak::nodes::NodeHeading { level, setext: false }),
                );
                self.inlines(heading, elem)?;
            }
            "p" => {
                if elem.page_attr(attr::CLASS).is_some_and(|c| c.contains("moin-error")) {
                    return Ok(());
                }
                let paragraph = self.append(parent, NodeValue::Paragraph);
                self.inlines(paragraph, elem)?;
            }
            "blockcode" => {
                let info = elem.attr(&QName::html(attr::CODE_LANGUAGE)).unwrap_or("").to_string();
                self.code_block(parent, &elem.text_content(), &info);
            }
            "nowiki" => match NowikiBlock::from_element(elem) {
                Some(block) => {
                    let info = block.interpreter().map_or("", |(name, _)| name).to_string();
                    self.code_block(parent, &block.content, &info);
                }
                None => self.blocks(parent, elem)?,
            },
            "separator" => {
                self.append(parent, NodeValue::ThematicBreak);
            }
            "blockquote" | "admonition" => {
                let quote = self.append(parent, NodeValue::BlockQuote);
                self.blocks(quote, elem)?;
            }
            "table-of-content" => self.raw_block(parent, "[TOC]\n".to_string()),
            "list" => match elem.page_attr(attr::ITEM_LABEL_GENERATE) {
                Some(kind) => self.list(parent, elem, kind == "ordered")?,
                None => self.definition_list(parent, elem)?,
            },
            "table" => self.table(parent, elem)?,
            "part" => {
                // the macro source itself has no Markdown form; keep its content
                for child in elem.elements().filter(|e| !e.is_page("arguments")) {
                    if is_block(child) {
                        self.block(parent, child)?;
                    }
                }
            }
            _ => self.blocks(parent, elem)?,
        }
        Ok(())
    }

    fn code_block(&self, parent: &'a AstNode<'a>, text: &str, info: &str) {
        let mut literal = text.to_string();
        if !literal.ends_with('\n') {
            literal.push('\n');
        }
        self.append(
            parent,
            NodeValue::CodeBlock(comrak::nodes::NodeCodeBlock {
                fenced: true,
                fence_char: b'`',
                fence_length: 3,
                fence_offset: 0,
                info: info.to_string(),
                literal,
            }),
        );
    }

    fn list(&mut self, parent: &'a AstNode<'a>, elem: &Element, ordered: bool) -> Result<(), ConvertError> {
        let start = elem
            .page_attr(attr::LIST_START)
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);
        // items holding paragraphs make a loose list
        let tight = !elem
            .elements()
            .flat_map(|item| item.elements())
            .flat_map(|body| body.elements())
            .any(|child| child.is_page("p"));
        let node_list = comrak::nodes::NodeList {
            list_type: if ordered { ListType::Ordered } else { ListType::Bullet },
            marker_offset: 0,
            padding: 0,
            start,
            delimiter: ListDelimType::Period,
            bullet_char: b'-',
            tight,
        };
        let list = self.append(parent, NodeValue::List(node_list));
        for item in elem.elements().filter(|e| e.is_page("list-item")) {
            let item_node = self.append(list, NodeValue::Item(node_list));
            for part in item.elements() {
                match part.local_name() {
                    "list-item-body" => self.blocks(item_node, part)?,
                    "list-item-label" => {
                        let paragraph = self.append(item_node, NodeValue::Paragraph);
                        self.inlines(paragraph, part)?;
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// `term` / `:   definition` pairs; Comrak's formatter has no syntax for
    /// them, so they are written directly.
    fn definition_list(&mut self, parent: &'a AstNode<'a>, elem: &Element) -> Result<(), ConvertError> {
        let mut text = String::new();
        for item in elem.elements().filter(|e| e.is_page("list-item")) {
            for part in item.elements() {
                let rendered = self.render_inline(part)?;
                match part.local_name() {
                    "list-item-label" => {
                        if !text.is_empty() {
                            text.push('\n');
                        }
                        text.push_str(&rendered);
                        text.push('\n');
                    }
                    "list-item-body" => {
                        text.push_str(":   ");
                        text.push_str(&rendered.replace('\n', "\n    "));
                        text.push('\n');
                    }
                    _ => {}
                }
            }
        }
        if !text.is_empty() {
            self.raw_block(parent, text);
        }
        Ok(())
    }

    fn table(&mut self, parent: &'a AstNode<'a>, elem: &Element) -> Result<(), ConvertError> {
        let mut header_rows = Vec::new();
        let mut body_rows = Vec::new();
        for section in elem.elements() {
            let rows = section.elements().filter(|r| r.is_page("table-row"));
            match section.local_name() {
                "table-header" => header_rows.extend(rows),
                "table-body" | "table-footer" => body_rows.extend(rows),
                "table-row" => body_rows.push(section),
                _ => {}
            }
        }
        // Markdown tables always have a header row
        if header_rows.is_empty() && !body_rows.is_empty() {
            header_rows.push(body_rows.remove(0));
        }
        let Some(header) = header_rows.first() else {
            return Ok(());
        };

        let columns = header_rows
            .iter()
            .chain(body_rows.iter())
            .map(|row| row.elements().count())
            .max()
            .unwrap_or(0);
        let mut alignments: Vec<TableAlignment> = header
            .elements()
            .map(|cell| match cell.page_attr(attr::STYLE) {
                Some(style) if style.contains("text-align: left") => TableAlignment::Left,
                Some(style) if style.contains("text-align: center") => TableAlignment::Center,
                Some(style) if style.contains("text-align: right") => TableAlignment::Right,
                _ => TableAlignment::None,
            })
            .collect();
        alignments.resize(columns, TableAlignment::None);

        let table = self.append(
            parent,
            NodeValue::Table(NodeTable {
                alignments,
                num_columns: columns,
                num_rows: header_rows.len() + body_rows.len(),
                num_nonempty_cells: 0,
            }),
        );
        let rows = header_rows
            .iter()
            .take(1)
            .map(|row| (*row, true))
            .chain(header_rows.iter().skip(1).map(|row| (*row, false)))
            .chain(body_rows.iter().map(|row| (*row, false)));
        for (row, is_header) in rows {
            let row_node = self.append(table, NodeValue::TableRow(is_header));
            for cell in row.elements() {
                let cell_node = self.append(row_node, NodeValue::TableCell);
                self.cell(cell_node, cell)?;
            }
        }
        Ok(())
    }

    /// Table cells hold inline content only; paragraph boundaries and line
    /// breaks become `<br>`.
    fn cell(&mut self, cell_node: &'a AstNode<'a>, cell: &Element) -> Result<(), ConvertError> {
        let outer = std::mem::replace(&mut self.in_cell, true);
        let result = self.cell_content(cell_node, cell);
        self.in_cell = outer;
        result
    }

    fn cell_content(&mut self, cell_node: &'a AstNode<'a>, cell: &Element) -> Result<(), ConvertError> {
        let mut first = true;
        for child in &cell.children {
            match child {
                Node::Element(p) if p.is_page("p") => {
                    if !first {
                        self.raw_inline(cell_node, "<br>");
                    }
                    self.inlines(cell_node, p)?;
                }
                other => self.inline(cell_node, other)?,
            }
            first = false;
        }
        Ok(())
    }

    fn inlines(&mut self, parent: &'a AstNode<'a>, elem: &Element) -> Result<(), ConvertError> {
        for child in &elem.children {
            self.inline(parent, child)?;
        }
        Ok(())
    }

    fn inline(&mut self, parent: &'a AstNode<'a>, node: &Node) -> Result<(), ConvertError> {
        let elem = match node {
            Node::Text(text) => {
                for (index, line) in text.split('\n').enumerate() {
                    if index > 0 {
                        self.line_break(parent, NodeValue::SoftBreak);
                    }
                    if !line.is_empty() {
                        self.append(parent, NodeValue::Text(line.to_string()));
                    }
                }
                return Ok(());
            }
            Node::Element(elem) => elem,
        };

        if elem.name == QName::xinclude("include") {
            let href = elem.attr(&QName::xinclude("href")).unwrap_or("");
            self.image(parent, elem, href);
            return Ok(());
        }

        match elem.local_name() {
            "emphasis" => {
                let emph = self.append(parent, NodeValue::Emph);
                self.inlines(emph, elem)?;
            }
            "strong" => {
                let strong = self.append(parent, NodeValue::Strong);
                self.inlines(strong, elem)?;
            }
            "code" | "samp" => {
                self.append(
                    parent,
                    NodeValue::Code(comrak::nodes::NodeCode {
                        num_backticks: 1,
                        literal: elem.text_content(),
                    }),
                );
            }
            "line-break" => self.line_break(parent, NodeValue::LineBreak),
            "a" => {
                let href = elem.attr(&QName::xlink("href")).unwrap_or("");
                let link = self.append(
                    parent,
                    NodeValue::Link(comrak::nodes::NodeLink {
                        url: markdown_href(href),
                        title: elem.attr(&QName::html("title")).unwrap_or("").to_string(),
                    }),
                );
                self.inlines(link, elem)?;
            }
            "object" => {
                let href = elem.attr(&QName::xlink("href")).unwrap_or("");
                self.image(parent, elem, href);
            }
            "del" | "s" => {
                let strike = self.append(parent, NodeValue::Strikethrough);
                self.inlines(strike, elem)?;
            }
            "ins" | "u" => self.raw_wrap(parent, elem, "<u>", "</u>")?,
            "span" => {
                let tags = match (
                    elem.page_attr(attr::BASELINE_SHIFT),
                    elem.page_attr(attr::FONT_SIZE),
                ) {
                    (Some("super"), _) => Some(("<sup>", "</sup>")),
                    (Some("sub"), _) => Some(("<sub>", "</sub>")),
                    (_, Some("120%")) => Some(("<big>", "</big>")),
                    (_, Some("85%")) => Some(("<small>", "</small>")),
                    _ => None,
                };
                match tags {
                    Some((open, close)) => self.raw_wrap(parent, elem, open, close)?,
                    None => self.inlines(parent, elem)?,
                }
            }
            "note" => {
                let text = elem
                    .find("note-body")
                    .map(|body| self.render_inline(body))
                    .transpose()?
                    .unwrap_or_default();
                self.footnotes.push(text);
                self.raw_inline(parent, &format!("[^{}]", self.footnotes.len()));
            }
            "inline-part" => {
                for child in elem.elements().filter(|e| !e.is_page("arguments")) {
                    self.inlines(parent, child)?;
                }
            }
            _ => self.inlines(parent, elem)?,
        }
        Ok(())
    }

    fn line_break(&self, parent: &'a AstNode<'a>, value: NodeValue) {
        if self.in_cell {
            self.raw_inline(parent, "<br>");
        } else {
            self.append(parent, value);
        }
    }

    fn raw_wrap(&mut self, parent: &'a AstNode<'a>, elem: &Element, open: &str, close: &str) -> Result<(), ConvertError> {
        self.raw_inline(parent, open);
        self.inlines(parent, elem)?;
        self.raw_inline(parent, close);
        Ok(())
    }

    /// `![alt](href "title")`; the alt text is the element text or `html:alt`.
    fn image(&self, parent: &'a AstNode<'a>, elem: &Element, href: &str) {
        let text = elem.text_content();
        let alt = if text.is_empty() {
            elem.attr(&QName::html("alt"))
                .or_else(|| elem.page_attr(attr::ALT))
                .unwrap_or("")
                .to_string()
        } else {
            text
        };
        let image = self.append(
            parent,
            NodeValue::Image(comrak::nodes::NodeLink {
                url: markdown_href(href),
                title: elem.attr(&QName::html("title")).unwrap_or("").to_string(),
            }),
        );
        if !alt.is_empty() {
            self.append(image, NodeValue::Text(alt));
        }
    }

    /// Inline content rendered on its own, for footnotes and definitions.
    fn render_inline(&mut self, elem: &Element) -> Result<String, ConvertError> {
        let outer = std::mem::replace(&mut self.in_cell, false);
        let rendered = self.render_detached(elem);
        self.in_cell = outer;
        rendered
    }

    fn render_detached(&mut self, elem: &Element) -> Result<String, ConvertError> {
        let root = self.node(NodeValue::Document);
        let paragraph = self.append(root, NodeValue::Paragraph);
        for child in &elem.children {
            match child {
                Node::Element(p) if p.is_page("p") => {
                    if paragraph.first_child().is_some() {
                        self.append(paragraph, NodeValue::SoftBreak);
                    }
                    self.inlines(paragraph, p)?;
                }
                other => self.inline(paragraph, other)?,
            }
        }
        Ok(render(root)?.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comrak::parse_document;

    fn doc(body: Element) -> Element {
        Element::document(body)
    }

    fn p(text: &str) -> Element {
        Element::page("p").with_child(text)
    }

    fn reparse<'a>(arena: &'a Arena<AstNode<'a>>, markdown: &str) -> &'a AstNode<'a> {
        parse_document(arena, markdown, &super::super::parser::default_comrak_options())
    }

    #[test]
    fn heading_and_paragraphs() {
        let tree = doc(Element::page("body")
            .with_child(
                Element::page("h")
                    .with_page_attr(attr::OUTLINE_LEVEL, "2")
                    .with_child("Title"),
            )
            .with_child(p("one"))
            .with_child(p("two")));
        assert_eq!(serialize_to_markdown(&tree).unwrap(), "## Title\n\none\n\ntwo\n");
    }

    #[test]
    fn emphasis_and_strong() {
        let tree = doc(Element::page("body").with_child(
            Element::page("p")
                .with_child(Element::page("strong").with_child("bold"))
                .with_child(" and ")
                .with_child(Element::page("emphasis").with_child("italic")),
        ));
        assert_eq!(serialize_to_markdown(&tree).unwrap(), "**bold** and *italic*\n");
    }

    #[test]
    fn heading_level_is_clamped() {
        let tree = doc(Element::page("body").with_child(
            Element::page("h")
                .with_page_attr(attr::OUTLINE_LEVEL, "9")
                .with_child("Deep"),
        ));
        assert_eq!(serialize_to_markdown(&tree).unwrap(), "###### Deep\n");
    }

    #[test]
    fn tight_list_without_paragraphs() {
        let item = |text: &str| {
            Element::page("list-item").with_child(Element::page("list-item-body").with_child(text))
        };
        let tree = doc(Element::page("body").with_child(
            Element::page("list")
                .with_page_attr(attr::ITEM_LABEL_GENERATE, "unordered")
                .with_child(item("one"))
                .with_child(item("two")),
        ));
        assert_eq!(serialize_to_markdown(&tree).unwrap(), "- one\n- two\n");
    }

    #[test]
    fn links_drop_the_local_scheme() {
        let tree = doc(Element::page("body").with_child(
            Element::page("p").with_child(
                Element::page("a")
                    .with_attr(QName::xlink("href"), "wiki.local:Home")
                    .with_child("home"),
            ),
        ));
        assert_eq!(serialize_to_markdown(&tree).unwrap(), "[home](Home)\n");
    }

    #[test]
    fn code_block_fence_outgrows_content() {
        let tree = doc(Element::page("body").with_child(Element::page("blockcode").with_child("a ``` b")));
        let markdown = serialize_to_markdown(&tree).unwrap();
        let arena = Arena::new();
        let root = reparse(&arena, &markdown);
        let first = root.first_child().unwrap();
        match &first.data.borrow().value {
            NodeValue::CodeBlock(code) => assert_eq!(code.literal, "a ``` b\n"),
            other => panic!("expected code block, got {other:?}"),
        };
    }

    #[test]
    fn table_gets_header_row() {
        let row = |a: &str, b: &str| {
            Element::page("table-row")
                .with_child(Element::page("table-cell").with_child(a))
                .with_child(Element::page("table-cell").with_child(b))
        };
        let tree = doc(Element::page("body").with_child(
            Element::page("table").with_child(
                Element::page("table-body")
                    .with_child(row("A", "B"))
                    .with_child(row("1", "2")),
            ),
        ));
        let markdown = serialize_to_markdown(&tree).unwrap();
        let arena = Arena::new();
        let root = reparse(&arena, &markdown);
        let table = root.first_child().unwrap();
        assert!(matches!(table.data.borrow().value, NodeValue::Table(_)), "{markdown}");
        let rows: Vec<bool> = table
            .children()
            .map(|row| matches!(row.data.borrow().value, NodeValue::TableRow(true)))
            .collect();
        assert_eq!(rows, vec![true, false]);
    }

    #[test]
    fn code_language_becomes_the_info_string() {
        let tree = doc(Element::page("body").with_child(
            Element::page("blockcode")
                .with_page_attr(attr::CLASS, "highlight")
                .with_attr(QName::html(attr::CODE_LANGUAGE), "python")
                .with_child(Element::page("span").with_page_attr(attr::CLASS, "k").with_child("pass")),
        ));
        let markdown = serialize_to_markdown(&tree).unwrap();
        let arena = Arena::new();
        let root = reparse(&arena, &markdown);
        match &root.first_child().unwrap().data.borrow().value {
            NodeValue::CodeBlock(code) => {
                assert_eq!(code.info, "python");
                assert_eq!(code.literal, "pass\n");
            }
            other => panic!("expected code block, got {other:?}"),
        };
    }

    #[test]
    fn breaks_inside_cells_become_br_tags() {
        let tree = doc(Element::page("body").with_child(
            Element::page("table").with_child(
                Element::page("table-body").with_child(
                    Element::page("table-row")
                        .with_child(
                            Element::page("table-cell")
                                .with_child("a")
                                .with_child(Element::page("line-break"))
                                .with_child("b"),
                        )
                        .with_child(
                            Element::page("table-cell")
                                .with_child(Element::page("strong").with_child("x\ny")),
                        ),
                ),
            ),
        ));
        let markdown = serialize_to_markdown(&tree).unwrap();
        assert!(markdown.contains("a<br>b"), "{markdown}");
        assert!(markdown.contains("**x<br>y**"), "{markdown}");
    }

    #[test]
    fn footnotes_are_appended() {
        let tree = doc(Element::page("body").with_child(
            Element::page("p").with_child("Text").with_child(
                Element::page("note")
                    .with_page_attr(attr::NOTE_CLASS, "footnote")
                    .with_child(Element::page("note-body").with_child("the note")),
            ),
        ));
        assert_eq!(serialize_to_markdown(&tree).unwrap(), "Text[^1]\n\n[^1]: the note\n");
    }

    #[test]
    fn unsupported_inline_markup_as_html() {
        let tree = doc(Element::page("body").with_child(
            Element::page("p")
                .with_child("H")
                .with_child(
                    Element::page("span")
                        .with_page_attr(attr::BASELINE_SHIFT, "sub")
                        .with_child("2"),
                )
                .with_child("O ")
                .with_child(Element::page("ins").with_child("under")),
        ));
        assert_eq!(serialize_to_markdown(&tree).unwrap(), "H<sub>2</sub>O <u>under</u>\n");
    }

    #[test]
    fn definition_list_written_directly() {
        let tree = doc(Element::page("body").with_child(
            Element::page("list").with_child(
                Element::page("list-item")
                    .with_child(Element::page("list-item-label").with_child("term"))
                    .with_child(Element::page("list-item-body").with_child("definition")),
            ),
        ));
        assert_eq!(serialize_to_markdown(&tree).unwrap(), "term\n:   definition\n");
    }
}
