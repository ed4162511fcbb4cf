//! Markdown parsing (Markdown → document tree)
//!
//! Pipeline: Markdown string → Comrak AST → `page/body` tree.
//!
//! Comrak does the block and inline parsing; this module only maps its nodes.
//! Raw HTML gets two treatments: an HTML block is handed to whatever parser the
//! registry has for `text/html`, while inline tags are replayed onto a
//! [`BuildStack`] so that `<sub>x</sub>`, which Comrak reports as three sibling
//! nodes, still nests.

use crate::common::links::{quote_iri, scheme_of, LocalTarget};
use crate::common::stack::BuildStack;
use crate::format::ParseContext;
use crate::formats::highlight::code_block;
use crate::ir::names::attr;
use crate::ir::{Element, Node, QName};
use crate::mime::Type;
use crate::registry::Converter;
use comrak::nodes::{AstNode, ListType, NodeValue, TableAlignment};
use comrak::{parse_document, Arena, ComrakOptions};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

const DIALECT: &str = "markdown";

static HTML_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<(/)?([a-zA-Z][a-zA-Z0-9]*)[^>]*?(/)?>$").expect("html tag pattern"));

/// Extensions enabled when the caller names none.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "table",
    "strikethrough",
    "autolink",
    "superscript",
    "footnotes",
    "description_lists",
    "wikilinks",
];

pub(super) fn default_comrak_options() -> ComrakOptions<'static> {
    comrak_options(DEFAULT_EXTENSIONS.iter().copied())
}

/// Comrak options with exactly the named extensions switched on.
pub(super) fn comrak_options<'e>(extensions: impl IntoIterator<Item = &'e str>) -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    for name in extensions {
        match name.trim().to_ascii_lowercase().as_str() {
            "table" | "tables" => options.extension.table = true,
            "strikethrough" => options.extension.strikethrough = true,
            "autolink" => options.extension.autolink = true,
            "superscript" => options.extension.superscript = true,
            "footnotes" => options.extension.footnotes = true,
            "description_lists" | "def_list" => options.extension.description_lists = true,
            "tasklist" => options.extension.tasklist = true,
            "wikilinks" => options.extension.wikilinks_title_after_pipe = true,
            "" => {}
            other => tracing::warn!(extension = other, "unknown markdown extension ignored"),
        }
    }
    options
}

/// What an inline HTML tag turns into.
fn inline_tag(name: &str) -> Option<Element> {
    let element = match name {
        "em" | "i" => Element::page("emphasis"),
        "b" | "strong" => Element::page("strong"),
        "code" | "tt" | "samp" => Element::page("code"),
        "sub" => Element::page("span").with_page_attr(attr::BASELINE_SHIFT, "sub"),
        "sup" => Element::page("span").with_page_attr(attr::BASELINE_SHIFT, "super"),
        "u" | "ins" => Element::page("ins"),
        "del" | "s" | "strike" => Element::page("del"),
        "big" => Element::page("span").with_page_attr(attr::FONT_SIZE, "120%"),
        "small" => Element::page("span").with_page_attr(attr::FONT_SIZE, "85%"),
        "abbr" | "acronym" | "dfn" | "kbd" => {
            Element::page("span").with_attr(QName::html("class"), format!("html-{name}"))
        }
        _ => return None,
    };
    Some(element)
}

/// Parser for Markdown documents.
pub struct MarkdownParser<'c, 'a> {
    ctx: &'c ParseContext<'a>,
    footnotes: HashMap<String, Vec<Node>>,
}

impl<'c, 'a> MarkdownParser<'c, 'a> {
    pub fn new(ctx: &'c ParseContext<'a>) -> Self {
        MarkdownParser {
            ctx,
            footnotes: HashMap::new(),
        }
    }

    /// Parse a whole document into `page/body`.
    pub fn parse(mut self, source: &str) -> Element {
        let arena = Arena::new();
        let options = match self.ctx.arguments.get("extensions") {
            Some(list) => comrak_options(list.split(',')),
            None => default_comrak_options(),
        };
        let root = parse_document(&arena, source, &options);

        self.collect_footnotes(root);

        let mut body = Element::page("body");
        for child in root.children() {
            let line = child.data.borrow().sourcepos.start.line;
            for mut node in self.block(child) {
                if let (true, Node::Element(elem)) = (self.ctx.host.add_lineno, &mut node) {
                    elem.set_attr(QName::html(attr::LINENO), line.to_string());
                }
                body.push(node);
            }
        }
        tracing::trace!(blocks = body.len(), "parsed markdown text");
        Element::document(body)
    }

    /// Footnote definitions are referenced before they are seen; gather them
    /// up front.
    fn collect_footnotes<'n>(&mut self, root: &'n AstNode<'n>) {
        for child in root.children() {
            let name = match &child.data.borrow().value {
                NodeValue::FootnoteDefinition(definition) => definition.name.clone(),
                _ => continue,
            };
            let mut content = Vec::new();
            for block in child.children() {
                for node in self.block(block) {
                    match node {
                        // a single paragraph is spliced inline
                        Node::Element(elem) if elem.is_page("p") => content.extend(elem.children),
                        other => content.push(other),
                    }
                }
            }
            self.footnotes.insert(name, content);
        }
    }

    fn blocks<'n>(&self, node: &'n AstNode<'n>) -> Vec<Node> {
        node.children().flat_map(|child| self.block(child)).collect()
    }

    fn block<'n>(&self, node: &'n AstNode<'n>) -> Vec<Node> {
        let data = node.data.borrow();
        let element = match &data.value {
            NodeValue::Heading(heading) => {
                let h = Element::page("h").with_page_attr(attr::OUTLINE_LEVEL, heading.level.to_string());
                self.inline_container(h, node)
            }
            NodeValue::Paragraph => {
                if paragraph_text(node).as_deref() == Some("[TOC]") {
                    Element::page("table-of-content")
                } else {
                    self.inline_container(Element::page("p"), node)
                }
            }
            NodeValue::BlockQuote => Element::page("blockquote").with_children(self.blocks(node)),
            NodeValue::ThematicBreak => Element::page("separator").with_page_attr(attr::CLASS, "moin-hr3"),
            NodeValue::CodeBlock(code) => {
                let literal = code.literal.strip_suffix('\n').unwrap_or(&code.literal);
                code_block(literal, code.info.split_whitespace().next().unwrap_or(""))
            }
            NodeValue::HtmlBlock(html) => return self.html_block(&html.literal),
            NodeValue::List(list) => {
                let mut elem = Element::page("list");
                match list.list_type {
                    ListType::Ordered => {
                        elem.set_page_attr(attr::ITEM_LABEL_GENERATE, "ordered");
                        if list.start != 1 {
                            elem.set_page_attr(attr::LIST_START, list.start.to_string());
                        }
                    }
                    ListType::Bullet => elem.set_page_attr(attr::ITEM_LABEL_GENERATE, "unordered"),
                }
                for item in node.children() {
                    let body = Element::page("list-item-body").with_children(self.item_body(item, list.tight));
                    elem.push(Element::page("list-item").with_child(body));
                }
                elem
            }
            NodeValue::DescriptionList => {
                let mut elem = Element::page("list");
                for item in node.children() {
                    let mut list_item = Element::page("list-item");
                    for part in item.children() {
                        match &part.data.borrow().value {
                            NodeValue::DescriptionTerm => {
                                let mut label = Element::page("list-item-label");
                                for block in self.blocks(part) {
                                    match block {
                                        Node::Element(p) if p.is_page("p") => label.children.extend(p.children),
                                        other => label.push(other),
                                    }
                                }
                                list_item.push(label);
                            }
                            NodeValue::DescriptionDetails => {
                                list_item.push(Element::page("list-item-body").with_children(self.blocks(part)));
                            }
                            _ => {}
                        }
                    }
                    elem.push(list_item);
                }
                elem
            }
            NodeValue::Table(table) => self.table(node, &table.alignments),
            NodeValue::FootnoteDefinition(_) => return Vec::new(),
            NodeValue::Document => return self.blocks(node),
            _ => {
                tracing::debug!(node = ?data.value, "unhandled markdown block");
                return Vec::new();
            }
        };
        vec![element.into()]
    }

    /// Tight list items carry their text without a paragraph.
    fn item_body<'n>(&self, item: &'n AstNode<'n>, tight: bool) -> Vec<Node> {
        let mut children = Vec::new();
        for node in self.blocks(item) {
            match node {
                Node::Element(p) if tight && p.is_page("p") => children.extend(p.children),
                other => children.push(other),
            }
        }
        children
    }

    fn table<'n>(&self, node: &'n AstNode<'n>, alignments: &[TableAlignment]) -> Element {
        let mut header = Element::page("table-header");
        let mut body = Element::page("table-body");
        for row in node.children() {
            let is_header = matches!(row.data.borrow().value, NodeValue::TableRow(true));
            let mut table_row = Element::page("table-row");
            for (index, cell) in row.children().enumerate() {
                let mut table_cell = self.inline_container(Element::page("table-cell"), cell);
                let align = match alignments.get(index) {
                    Some(TableAlignment::Left) => Some("left"),
                    Some(TableAlignment::Center) => Some("center"),
                    Some(TableAlignment::Right) => Some("right"),
                    _ => None,
                };
                if let Some(align) = align {
                    table_cell.set_page_attr(attr::STYLE, format!("text-align: {align};"));
                }
                table_row.push(table_cell);
            }
            if is_header {
                header.push(table_row);
            } else {
                body.push(table_row);
            }
        }
        let mut table = Element::page("table");
        if !header.is_empty() {
            table.push(header);
        }
        if !body.is_empty() {
            table.push(body);
        }
        table
    }

    /// Raw HTML blocks go through the registered HTML parser.
    fn html_block(&self, literal: &str) -> Vec<Node> {
        let trimmed = literal.trim();
        if trimmed.starts_with("<!--") {
            return Vec::new();
        }
        let html = Type::new(Some("text"), Some("html"));
        let document = Type::moin_document();
        if let Some(Converter::Parser(parser)) = self.ctx.registry.get(&html, &document, &Default::default()) {
            let nested = self.ctx.nested(html, Default::default());
            match parser.parse(trimmed, &nested) {
                Ok(page) => {
                    if let Some(body) = page.find("body") {
                        return body.children.clone();
                    }
                }
                Err(err) => tracing::warn!(error = %err, "embedded html rejected"),
            }
        }
        vec![Element::page("p").with_child(trimmed).into()]
    }

    fn inline_container<'n>(&self, element: Element, node: &'n AstNode<'n>) -> Element {
        let mut stack = BuildStack::new(element);
        for child in node.children() {
            self.inline(child, &mut stack);
        }
        stack.into_root()
    }

    fn inline_children<'n>(&self, node: &'n AstNode<'n>, stack: &mut BuildStack) {
        for child in node.children() {
            self.inline(child, stack);
        }
    }

    /// Children of `node` inside `element`; inline HTML left open inside is
    /// closed with it.
    fn wrap<'n>(&self, element: Element, node: &'n AstNode<'n>, stack: &mut BuildStack) {
        let depth = stack.len();
        stack.push(element);
        self.inline_children(node, stack);
        while stack.len() > depth {
            stack.pop();
        }
    }

    fn inline<'n>(&self, node: &'n AstNode<'n>, stack: &mut BuildStack) {
        let data = node.data.borrow();
        match &data.value {
            NodeValue::Text(text) => stack.top_append_text(text),
            NodeValue::SoftBreak => stack.top_append_text("\n"),
            NodeValue::LineBreak => stack.top_append(Element::page("line-break")),
            NodeValue::Code(code) => stack.top_append(Element::page("code").with_child(code.literal.as_str())),
            NodeValue::Emph => self.wrap(Element::page("emphasis"), node, stack),
            NodeValue::Strong => self.wrap(Element::page("strong"), node, stack),
            NodeValue::Strikethrough => self.wrap(Element::page("del"), node, stack),
            NodeValue::Superscript => self.wrap(
                Element::page("span").with_page_attr(attr::BASELINE_SHIFT, "super"),
                node,
                stack,
            ),
            NodeValue::Link(link) => {
                let mut a = Element::page("a").with_attr(QName::xlink("href"), self.href(&link.url));
                if !link.title.is_empty() {
                    a.set_attr(QName::html("title"), link.title.as_str());
                }
                self.wrap(a, node, stack);
            }
            NodeValue::WikiLink(link) => {
                let a = Element::page("a").with_attr(QName::xlink("href"), LocalTarget::parse(&link.url).to_iri());
                self.wrap(a, node, stack);
            }
            NodeValue::Image(link) => stack.top_append(self.image(&link.url, &link.title, &plain_text(node))),
            NodeValue::FootnoteReference(reference) => {
                let content = self.footnotes.get(&reference.name).cloned().unwrap_or_default();
                stack.top_append(
                    Element::page("note")
                        .with_page_attr(attr::NOTE_CLASS, "footnote")
                        .with_child(Element::page("note-body").with_children(content)),
                );
            }
            NodeValue::HtmlInline(html) => self.html_inline(html, stack),
            _ => self.inline_children(node, stack),
        }
    }

    /// Replay one inline HTML tag onto the stack.
    fn html_inline(&self, html: &str, stack: &mut BuildStack) {
        if html.starts_with("<!--") {
            return;
        }
        let Some(caps) = HTML_TAG_RE.captures(html) else {
            stack.top_append_text(html);
            return;
        };
        let name = caps.get(2).map_or("", |m| m.as_str()).to_ascii_lowercase();
        let closing = caps.get(1).is_some();
        if name == "br" {
            stack.top_append(Element::page("line-break"));
            return;
        }
        let Some(element) = inline_tag(&name) else {
            stack.top_append_text(html);
            return;
        };
        let local = element.local_name().to_string();
        if !closing {
            stack.push(element);
        } else if stack.find_mut(&local).is_some() {
            stack.pop_name(&[&local]);
        }
    }

    fn href(&self, url: &str) -> String {
        match scheme_of(url) {
            Some(scheme) if self.ctx.host.allows_scheme(DIALECT, scheme) => quote_iri(url),
            _ => LocalTarget::parse(url).to_iri(),
        }
    }

    /// `![alt](url "title")`: an external object, or a transclusion of an item.
    fn image(&self, url: &str, title: &str, alt: &str) -> Element {
        let mut element = match scheme_of(url) {
            Some(scheme) if self.ctx.host.allows_scheme(DIALECT, scheme) => {
                Element::page("object").with_attr(QName::xlink("href"), quote_iri(url))
            }
            _ => Element::new(QName::xinclude("include"))
                .with_attr(QName::xinclude("href"), LocalTarget::parse(url).to_iri()),
        };
        if !alt.is_empty() {
            element.set_attr(QName::html("alt"), alt);
        }
        if !title.is_empty() {
            element.set_attr(QName::html("title"), title);
        }
        element
    }
}

fn plain_text<'n>(node: &'n AstNode<'n>) -> String {
    let mut text = String::new();
    for descendant in node.descendants() {
        match &descendant.data.borrow().value {
            NodeValue::Text(t) => text.push_str(t),
            NodeValue::Code(code) => text.push_str(&code.literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

/// The text of a paragraph made of plain text only.
fn paragraph_text<'n>(node: &'n AstNode<'n>) -> Option<String> {
    let mut text = String::new();
    for child in node.children() {
        match &child.data.borrow().value {
            NodeValue::Text(t) => text.push_str(t),
            _ => return None,
        }
    }
    Some(text.trim().to_string())
}
