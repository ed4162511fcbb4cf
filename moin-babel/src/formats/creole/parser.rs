//! Creole → document tree
//!
//! Blocks are recognized line by line in this order: blank lines, headings,
//! separators, block macros, nowiki blocks, lists, tables and paragraph text.
//! Lists consume following lines until a blank line, a heading, a table or a
//! nowiki block.

use super::inline::{is_object_url, Scanner, Token, CREOLE_RULES, DESCRIPTION_RULES};
use crate::common::args::Arguments;
use crate::common::cursor::{LineCursor, LineSource};
use crate::common::links::{interwiki, map_attachment, quote_iri, scheme_of, split_interwiki, wiki_local};
use crate::common::macros::{parser_part, InlineMarkup, MacroResolver};
use crate::common::stack::{BuildStack, FrameInfo};
use crate::format::ParseContext;
use crate::ir::names::attr;
use crate::ir::{Element, Node, QName};
use once_cell::sync::Lazy;
use regex::Regex;

static BLOCK_MACRO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(<<(\w+)(?:\((.*?)\))?\s*>>)\s*$").expect("block macro pattern")
});

static SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*----\s*$").expect("separator pattern"));

static NOWIKI_BEGIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{\{\{\s*$").expect("nowiki begin pattern"));

static NOWIKI_END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(~)?(\}\}\}\s*)$").expect("nowiki end pattern"));

static NOWIKI_INTERPRET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#!\s*([\w/.+-]+)?\s*:?(?:\((.*?)\))?\s*$").expect("nowiki interpreter pattern")
});

static LIST_BEGIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[*#][^*#]").expect("list pattern"));

static LIST_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([#*]+)\s*(.*?)$").expect("list item pattern"));

static TABLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\|").expect("table pattern"));

/// `= text =` with any number of `=` on either side.
fn heading(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim();
    let text = trimmed.trim_start_matches('=');
    let level = trimmed.len() - text.len();
    if level == 0 {
        return None;
    }
    let text = text.trim().trim_end_matches('=').trim_end();
    Some((level.min(6), text))
}

/// Lines that end a list.
fn ends_list(line: &str) -> bool {
    line.trim().is_empty() || line.starts_with('=') || line.starts_with('|') || line.starts_with("{{{")
}

/// One `|cell` of a table row.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Cell<'s> {
    head: bool,
    text: &'s str,
}

/// Split a row into cells. Links inside a cell may contain `|`.
fn split_cells(row: &str) -> Vec<Cell<'_>> {
    let mut cells = Vec::new();
    let mut rest = row.trim_start();
    while let Some(after_bar) = rest.strip_prefix('|') {
        let content = after_bar.trim_start();
        let (head, content) = match content.strip_prefix('=') {
            Some(content) => (true, content),
            None => (false, content),
        };
        let mut end = 0;
        while end < content.len() {
            let tail = &content[end..];
            if tail.starts_with("[[") {
                if let Some(close) = tail.find("]]") {
                    end += close + 2;
                    continue;
                }
            }
            match tail.chars().next() {
                Some('|') | None => break,
                Some(c) => end += c.len_utf8(),
            }
        }
        let text = content[..end].trim();
        if !text.is_empty() {
            cells.push(Cell { head, text });
        }
        rest = &content[end..];
    }
    cells
}

fn toggle(stack: &mut BuildStack, name: &str) {
    if stack.top_check(&[name]) {
        stack.pop_name(&[name]);
    } else {
        stack.push(Element::page(name));
    }
}

/// Parser for creole documents.
pub struct CreoleParser<'c, 'a> {
    ctx: &'c ParseContext<'a>,
}

impl<'c, 'a> CreoleParser<'c, 'a> {
    pub fn new(ctx: &'c ParseContext<'a>) -> Self {
        CreoleParser { ctx }
    }

    /// Parse a whole document into `page/body`.
    pub fn parse(&self, source: &str) -> Element {
        Element::document(self.parse_body(source, &self.ctx.arguments))
    }

    /// Parse into a `body`; its `style` comes from `arguments`.
    fn parse_body(&self, source: &str, arguments: &Arguments) -> Element {
        let text = source.replace("\r\n", "\n");
        let mut cursor = LineCursor::from_text(&text);

        let mut body = Element::page("body");
        if let Some(style) = arguments.get(attr::STYLE) {
            body.set_page_attr(attr::STYLE, style);
        }

        let mut stack = BuildStack::new(body).with_line_numbers(self.ctx.host.add_lineno);
        while let Some(line) = cursor.advance() {
            stack.set_lineno(cursor.lineno());
            self.parse_block(line, &mut cursor, &mut stack);
        }
        tracing::trace!(lines = cursor.lineno(), "parsed creole text");
        stack.into_root()
    }

    fn parse_block<'s>(&self, line: &'s str, cursor: &mut LineCursor<'s>, stack: &mut BuildStack) {
        if line.trim().is_empty() {
            stack.clear();
            return;
        }

        if let Some((level, text)) = heading(line) {
            stack.clear();
            stack.top_append(
                Element::page("h")
                    .with_page_attr(attr::OUTLINE_LEVEL, level.to_string())
                    .with_child(text),
            );
            return;
        }

        if SEPARATOR_RE.is_match(line) {
            stack.clear();
            stack.top_append(Element::page("separator").with_page_attr(attr::CLASS, "moin-hr3"));
            return;
        }

        if let Some(caps) = BLOCK_MACRO_RE.captures(line) {
            let args = caps.get(3).map(|m| m.as_str());
            // `<<A(x)>> text <<B(y)>>` is two inline macros
            if !args.is_some_and(|args| args.contains(">>")) {
                let source = caps.get(1).map_or("", |m| m.as_str());
                let name = caps.get(2).map_or("", |m| m.as_str());
                stack.clear();
                let node = MacroResolver::new(self).resolve(name, args, source, true);
                stack.top_append_opt(node);
                return;
            }
        }

        if NOWIKI_BEGIN_RE.is_match(line) {
            self.parse_nowiki(cursor, stack);
            return;
        }

        if LIST_BEGIN_RE.is_match(line) {
            cursor.push_back(line);
            self.parse_list(cursor, stack);
            return;
        }

        if TABLE_RE.is_match(line) {
            self.parse_table(line, cursor, stack);
            return;
        }

        self.parse_text(line, stack);
    }

    fn parse_text(&self, line: &str, stack: &mut BuildStack) {
        if stack.top_check(&["table", "table-body", "list"]) {
            stack.clear();
        }
        if stack.top_check(&["body"]) {
            stack.push(Element::page("p"));
        } else {
            stack.top_append("\n");
        }
        self.parse_inline(line, stack, CREOLE_RULES);
    }

    fn parse_nowiki<'s>(&self, cursor: &mut LineCursor<'s>, stack: &mut BuildStack) {
        stack.clear();

        let Some(first) = cursor.advance() else {
            stack.top_append(Element::page("blockcode"));
            return;
        };
        if NOWIKI_END_RE
            .captures(first)
            .is_some_and(|caps| caps.get(1).is_none())
        {
            stack.top_append(Element::page("blockcode"));
            return;
        }

        let mut lines: Vec<&str> = Vec::new();
        while let Some(line) = cursor.advance() {
            match NOWIKI_END_RE.captures(line) {
                Some(caps) if caps.get(1).is_none() => break,
                Some(caps) => lines.push(caps.get(2).map_or(line, |m| m.as_str())),
                None => lines.push(line),
            }
        }
        let content = lines.join("\n");

        match NOWIKI_INTERPRET_RE.captures(first) {
            Some(caps) => {
                let name = caps.get(1).map(|m| m.as_str());
                let args = caps.get(2).map(|m| Arguments::parse(m.as_str()));
                match name {
                    None | Some("creole") => {
                        let arguments = args.unwrap_or_default();
                        let body = self.parse_body(&content, &arguments);
                        stack.top_append(Element::page("page").with_child(body));
                    }
                    Some(name) => {
                        let content = if content.is_empty() {
                            Vec::new()
                        } else {
                            vec![Node::Text(content)]
                        };
                        stack.top_append(parser_part(name, args.as_ref(), content));
                    }
                }
            }
            None => {
                let mut code = first.to_string();
                for line in lines {
                    code.push('\n');
                    code.push_str(line);
                }
                stack.top_append(Element::page("blockcode").with_child(code));
            }
        }
    }

    fn parse_list<'s>(&self, cursor: &mut LineCursor<'s>, stack: &mut BuildStack) {
        while let Some(line) = cursor.advance() {
            stack.set_lineno(cursor.lineno());
            if ends_list(line) {
                stack.clear();
                cursor.push_back(line);
                return;
            }
            match LIST_ITEM_RE.captures(line) {
                Some(caps) => {
                    let head = caps.get(1).map_or("*", |m| m.as_str());
                    let text = caps.get(2).map_or("", |m| m.as_str());
                    self.list_item(head, text, stack);
                }
                None => self.parse_text(line, stack),
            }
        }
    }

    fn list_item(&self, head: &str, text: &str, stack: &mut BuildStack) {
        let level = head.len();
        let kind = head.chars().last().map(String::from);

        // find the list this item belongs to
        while stack.len() > 1 {
            let info = stack.top_info();
            let stop = match stack.top_name() {
                Some("body") => true,
                Some("list-item-body") => level > info.level,
                Some("list") => level >= info.level && kind == info.kind,
                _ => false,
            };
            if stop {
                break;
            }
            stack.pop();
        }

        let info = FrameInfo { level, kind };
        if !stack.top_check(&["list"]) {
            let generate = if info.kind.as_deref() == Some("#") { "ordered" } else { "unordered" };
            stack.push_with(
                Element::page("list").with_page_attr(attr::ITEM_LABEL_GENERATE, generate),
                info.clone(),
            );
        }
        stack.push(Element::page("list-item"));
        stack.push_with(Element::page("list-item-body"), info);
        self.parse_inline(text, stack, CREOLE_RULES);
    }

    fn parse_table<'s>(&self, first_row: &str, cursor: &mut LineCursor<'s>, stack: &mut BuildStack) {
        stack.clear();
        stack.push(Element::page("table"));
        stack.push(Element::page("table-body"));
        self.parse_table_row(first_row, stack);

        while let Some(line) = cursor.advance() {
            if !TABLE_RE.is_match(line) {
                cursor.push_back(line);
                break;
            }
            stack.set_lineno(cursor.lineno());
            self.parse_table_row(line, stack);
        }
        stack.clear();
    }

    fn parse_table_row(&self, row: &str, stack: &mut BuildStack) {
        stack.push(Element::page("table-row"));
        for cell in split_cells(row) {
            let mut element = Element::page("table-cell");
            if cell.head {
                element.set_page_attr(attr::CLASS, "moin-thead");
            }
            stack.push(element);
            self.parse_inline(cell.text, stack, CREOLE_RULES);
            stack.pop_name(&["table-cell"]);
        }
        stack.pop_name(&["table-row"]);
    }

    fn parse_inline(&self, text: &str, stack: &mut BuildStack, rules: &'static [super::inline::InlineRule]) {
        let scanner = Scanner::new(rules, self.ctx.host);
        let mut pos = 0;
        while let Some(found) = scanner.find(text, pos) {
            stack.top_append_text(&text[pos..found.start]);
            pos = found.end;
            self.apply(found.token, stack);
        }
        stack.top_append_text(&text[pos..]);
    }

    fn apply(&self, token: Token<'_>, stack: &mut BuildStack) {
        match token {
            Token::Url { target, escaped: true } => stack.top_append(target),
            Token::Url { target, escaped: false } => stack.top_append(
                Element::page("a")
                    .with_attr(QName::xlink("href"), quote_iri(target))
                    .with_child(target),
            ),
            Token::Escaped(text) => stack.top_append(text),
            Token::Link { target, text } => self.link(target, text, stack),
            Token::Macro { source, name, args } => {
                let node = MacroResolver::new(self).resolve(name, args, source, false);
                stack.top_append_opt(node);
            }
            Token::Nowiki(text) => stack.top_append(Element::page("code").with_child(text)),
            Token::Object { target, text } => stack.top_append(object(target, text)),
            Token::Strong => toggle(stack, "strong"),
            Token::Emphasis => toggle(stack, "emphasis"),
            Token::Insert => toggle(stack, "ins"),
            Token::LineBreak => stack.top_append(Element::page("line-break")),
        }
    }

    fn link(&self, target: &str, text: Option<&str>, stack: &mut BuildStack) {
        let host = self.ctx.host;
        let (href, default_text) = match scheme_of(target) {
            Some(scheme) if host.allows_scheme(Scanner::DIALECT, scheme) => {
                (quote_iri(target), target.to_string())
            }
            _ => match split_interwiki(target).filter(|(site, _)| creole_site(site)) {
                Some((site, item)) if host.is_known_wiki(site) => (interwiki(site, item), item.to_string()),
                // an unknown site is part of the item name
                _ => {
                    let item = map_attachment(target);
                    let href = match item.rsplit_once('#') {
                        Some((path, fragment)) => wiki_local(path, None, Some(fragment)),
                        None => wiki_local(&item, None, None),
                    };
                    (href, item)
                }
            },
        };

        stack.push(Element::page("a").with_attr(QName::xlink("href"), href));
        match text {
            Some(text) => self.parse_inline(text, stack, DESCRIPTION_RULES),
            None => stack.top_append(default_text),
        }
        stack.pop_name(&["a"]);
    }
}

/// Interwiki site names start upper case and hold letters only.
fn creole_site(site: &str) -> bool {
    site.starts_with(|c: char| c.is_ascii_uppercase()) && site.chars().all(|c| c.is_ascii_alphabetic())
}

/// `{{item|alt}}` transcludes an item, `{{url|alt}}` embeds media.
fn object(target: &str, text: Option<&str>) -> Element {
    let mut element = if is_object_url(target) {
        Element::page("object")
            .with_attr(QName::xlink("href"), target)
            .with_child("Your Browser does not support HTML5 audio/video element.")
    } else {
        Element::new(QName::xinclude("include"))
            .with_attr(QName::xinclude("href"), wiki_local(&map_attachment(target), None, None))
    };
    if let Some(text) = text {
        element.set_attr(QName::html(attr::ALT), text);
    }
    element
}

impl InlineMarkup for CreoleParser<'_, '_> {
    fn inline_markup(&self, text: &str) -> Vec<Node> {
        let mut stack = BuildStack::new(Element::page("p"));
        self.parse_inline(text, &mut stack, CREOLE_RULES);
        stack.into_root().children
    }
}
