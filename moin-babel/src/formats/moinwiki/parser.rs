//! Moin wiki → document tree
//!
//! The parser reads the source line by line. Every line is first looked at for
//! its indentation: indented lines open or continue lists, and the run of lines
//! sharing the same indentation is handed to the block parser as a unit. The
//! block parser recognizes, in this order, blank lines, `##` comments, headings,
//! separators, block macros, nowiki fences, tables, and falls back to paragraph
//! text. Paragraph text and table cells go through the inline parser.
//!
//! The [`BuildStack`] stays alive across lines, so inline markup such as
//! `''emphasis` may span several lines of one paragraph.

use super::inline::{FreeLinkForm, InlineRule, Scanner, Token, DESCRIPTION_RULES, MOIN19_RULES, MOIN_RULES};
use super::table::{apply_cell_arguments, parse_cell_arguments, split_row, CellChanges};
use crate::common::args::{ArgumentSyntax, Arguments};
use crate::common::cursor::{LineCursor, LineSource};
use crate::common::links::{interwiki, map_attachment, quote_iri, urlencode, wiki_local, LinkTarget};
use crate::common::macros::{InlineMarkup, MacroResolver};
use crate::common::nowiki::NowikiBlock;
use crate::common::stack::{BuildStack, FrameInfo};
use crate::common::text::decode_entity;
use crate::format::ParseContext;
use crate::ir::names::attr;
use crate::ir::{Element, Node, QName};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::VecDeque;

/// Which generation of the wiki syntax to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Moin,
    /// Adds CamelCase free links and bare URLs
    Moin19,
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Moin => "moinwiki",
            Dialect::Moin19 => "moinwiki19",
        }
    }

    fn rules(self) -> &'static [InlineRule] {
        match self {
            Dialect::Moin => MOIN_RULES,
            Dialect::Moin19 => MOIN19_RULES,
        }
    }
}

static INDENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?P<indent>\s*)",
        r"(?P<list_begin>(?P<definition>(?P<definition_text>.*?)::)\s*",
        r"|(?P<numbers>[0-9]+\.(?:#(?P<start_number>[0-9]+))?)\s+",
        r"|(?P<alpha>[aA]\.(?:#(?P<start_alpha>[0-9]+))?)\s+",
        r"|(?P<roman>[iI]\.(?:#(?P<start_roman>[0-9]+))?)\s+",
        r"|(?P<bullet>\*)\s*",
        r"|(?P<none>\.)\s*)?",
        r"(?P<text>.*?)$",
    ))
    .expect("indent pattern")
});

static SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*-{4,}\s*$").expect("separator pattern"));

static BLOCK_MACRO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(<<(\w+)(?:\((.*?)\))?\s*>>)\s*$").expect("block macro pattern")
});

static NOWIKI_BEGIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\{{3,})\s*(#!\s*[\w/.-]*\s*(?::?\(.*?\)|.+)?)?\s*$")
        .expect("nowiki begin pattern")
});

static NOWIKI_END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\}{3,})\s*$").expect("nowiki end pattern"));

static TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\|\|.*)\|\|\s*$").expect("table pattern"));

static TABLE_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*===+\s*$").expect("table separator pattern"));

/// The list a marker asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Definition,
    Ordered(Option<&'static str>),
    Unordered(Option<&'static str>),
}

impl ListKind {
    /// Indented text without a marker
    const PLAIN: ListKind = ListKind::Unordered(Some("no-bullet"));

    fn key(self) -> String {
        match self {
            ListKind::Definition => "definition".to_string(),
            ListKind::Ordered(style) => format!("ordered:{}", style.unwrap_or("")),
            ListKind::Unordered(style) => format!("unordered:{}", style.unwrap_or("")),
        }
    }

    fn label_generate(self) -> Option<&'static str> {
        match self {
            ListKind::Definition => None,
            ListKind::Ordered(_) => Some("ordered"),
            ListKind::Unordered(_) => Some("unordered"),
        }
    }

    fn style(self) -> Option<&'static str> {
        match self {
            ListKind::Definition => None,
            ListKind::Ordered(style) | ListKind::Unordered(style) => style,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ListMarker<'s> {
    kind: ListKind,
    /// Term of a `term:: description` item
    label: Option<&'s str>,
    start: Option<&'s str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Indent<'s> {
    level: usize,
    marker: Option<ListMarker<'s>>,
    text: &'s str,
}

/// Split a line into indentation, list marker and text.
///
/// Blank lines and lines starting in the first column carry no marker; their
/// whole content is text.
fn classify(line: &str) -> Indent<'_> {
    let plain = |text| Indent {
        level: 0,
        marker: None,
        text,
    };
    if line.trim().is_empty() {
        return plain("");
    }
    if !line.starts_with(char::is_whitespace) {
        return plain(line);
    }
    let Some(caps) = INDENT_RE.captures(line) else {
        return plain(line);
    };
    let group = |name: &str| caps.name(name).map(|m| m.as_str());
    let level = group("indent").map_or(0, |indent| indent.chars().count());
    let text = caps.name("text").map_or("", |m| m.as_str());

    let marker = group("list_begin").map(|_| {
        let (kind, start) = if group("definition").is_some() {
            (ListKind::Definition, None)
        } else if group("numbers").is_some() {
            (ListKind::Ordered(None), group("start_number"))
        } else if let Some(alpha) = group("alpha") {
            let style = if alpha.starts_with('A') { "upper-alpha" } else { "lower-alpha" };
            (ListKind::Ordered(Some(style)), group("start_alpha"))
        } else if let Some(roman) = group("roman") {
            let style = if roman.starts_with('I') { "upper-roman" } else { "lower-roman" };
            (ListKind::Ordered(Some(style)), group("start_roman"))
        } else if group("bullet").is_some() {
            (ListKind::Unordered(None), None)
        } else {
            (ListKind::PLAIN, None)
        };
        ListMarker {
            kind,
            label: group("definition_text"),
            start,
        }
    });

    Indent {
        level,
        marker,
        text,
    }
}

/// The lines of one indentation run, with their indentation removed.
///
/// Ends before the first line that has a list marker or another indentation;
/// that line goes back to the root cursor.
struct IndentedLines<'r, 's> {
    root: &'r mut LineCursor<'s>,
    first: Option<&'s str>,
    pushed: VecDeque<&'s str>,
    level: usize,
    done: bool,
}

impl<'r, 's> IndentedLines<'r, 's> {
    fn new(root: &'r mut LineCursor<'s>, first: &'s str, level: usize) -> Self {
        IndentedLines {
            root,
            first: Some(first),
            pushed: VecDeque::new(),
            level,
            done: false,
        }
    }

    /// Nowiki content ignores indentation and is read from the root.
    fn root_mut(&mut self) -> &mut LineCursor<'s> {
        &mut *self.root
    }
}

impl<'s> LineSource<'s> for IndentedLines<'_, 's> {
    fn advance(&mut self) -> Option<&'s str> {
        if let Some(line) = self.pushed.pop_front() {
            return Some(line);
        }
        if let Some(line) = self.first.take() {
            return Some(line);
        }
        if self.done {
            return None;
        }
        let line = self.root.advance()?;
        let indent = classify(line);
        if indent.marker.is_some() || indent.level != self.level {
            self.root.push_back(line);
            self.done = true;
            return None;
        }
        Some(indent.text)
    }

    fn push_back(&mut self, line: &'s str) {
        self.pushed.push_front(line);
    }

    fn lineno(&self) -> usize {
        self.root.lineno()
    }
}

/// `(level, text)` of a `== text ==` heading; both `=` runs must have the
/// same length and be separated from the text by blanks.
fn heading(line: &str) -> Option<(usize, &str)> {
    let line = line.trim();
    let open = line.len() - line.trim_start_matches('=').len();
    let close = line.len() - line.trim_end_matches('=').len();
    if open == 0 || open != close || line.len() < open + close + 2 {
        return None;
    }
    let inner = &line[open..line.len() - close];
    if !inner.starts_with(char::is_whitespace) || !inner.ends_with(char::is_whitespace) {
        return None;
    }
    Some((open, inner.trim()))
}

fn anchor(href: String, text: &str) -> Element {
    Element::page("a")
        .with_attr(QName::xlink("href"), href)
        .with_child(text)
}

fn toggle(stack: &mut BuildStack, name: &str) {
    if stack.top_check(&[name]) {
        stack.pop();
    } else {
        stack.push(Element::page(name));
    }
}

/// Quote runs: `''` emphasis, `'''` strong, `'''''` both at once. For a run of
/// five the order of the two elements depends on the run that follows.
pub(crate) fn emph_strong(stack: &mut BuildStack, len: usize, follow: usize) {
    match len {
        5 => {
            if stack.top_check(&["emphasis"]) {
                stack.pop();
                toggle(stack, "strong");
            } else if stack.top_check(&["strong"]) {
                stack.pop();
                toggle(stack, "emphasis");
            } else if follow == 3 {
                stack.push(Element::page("emphasis"));
                stack.push(Element::page("strong"));
            } else {
                stack.push(Element::page("strong"));
                stack.push(Element::page("emphasis"));
            }
        }
        3 => toggle(stack, "strong"),
        2 => toggle(stack, "emphasis"),
        _ => {}
    }
}

/// Parser for one document in one dialect.
pub struct MoinWikiParser<'c, 'a> {
    ctx: &'c ParseContext<'a>,
    dialect: Dialect,
}

impl<'c, 'a> MoinWikiParser<'c, 'a> {
    pub fn new(ctx: &'c ParseContext<'a>, dialect: Dialect) -> Self {
        MoinWikiParser { ctx, dialect }
    }

    /// Parse a whole document into `page/body`.
    ///
    /// The `style` and `class` keyword arguments of the context become
    /// attributes of the body.
    pub fn parse(&self, source: &str) -> Element {
        let text = source.replace("\r\n", "\n");
        let mut cursor = LineCursor::from_text(&text);

        let mut body = Element::page("body");
        for (key, value) in &self.ctx.arguments.keyword {
            if key == attr::STYLE || key == attr::CLASS {
                body.set_page_attr(key, value.as_str());
            }
        }

        let mut stack = BuildStack::new(body).with_line_numbers(self.ctx.host.add_lineno);
        while let Some(line) = cursor.advance() {
            stack.set_lineno(cursor.lineno());
            self.parse_indented(&mut cursor, &mut stack, line);
        }
        tracing::trace!(lines = cursor.lineno(), dialect = self.dialect.name(), "parsed wiki text");
        Element::document(stack.into_root())
    }

    fn parse_indented<'s>(&self, cursor: &mut LineCursor<'s>, stack: &mut BuildStack, line: &'s str) {
        let indent = classify(line);
        let kind = indent.marker.as_ref().map_or(ListKind::PLAIN, |m| m.kind);
        let key = kind.key();

        let mut reuse_list = false;
        while stack.len() > 1 {
            let info = stack.top_info();
            if stack.top_check(&["list-item-body"]) && indent.level > info.level {
                break;
            }
            if stack.top_check(&["list"])
                && indent.level >= info.level
                && info.kind.as_deref() == Some(key.as_str())
            {
                reuse_list = true;
                break;
            }
            stack.pop();
        }

        if indent.level == 0 {
            let mut lines = IndentedLines::new(cursor, indent.text, 0);
            self.parse_blocks(&mut lines, stack);
            return;
        }

        if !reuse_list {
            let mut list = Element::page("list");
            if let Some(generate) = kind.label_generate() {
                list.set_page_attr(attr::ITEM_LABEL_GENERATE, generate);
            }
            if let Some(style) = kind.style() {
                list.set_page_attr(attr::LIST_STYLE_TYPE, style);
            }
            if let Some(start) = indent.marker.as_ref().and_then(|m| m.start) {
                list.set_page_attr(attr::LIST_START, start);
            }
            stack.push_with(
                list,
                FrameInfo {
                    level: indent.level,
                    kind: Some(key),
                },
            );
        }

        stack.push(Element::page("list-item"));

        let label = indent
            .marker
            .as_ref()
            .and_then(|m| m.label)
            .filter(|label| !label.is_empty());
        if let Some(label) = label {
            let mut label_stack = BuildStack::new(Element::page("list-item-label"));
            self.parse_inline(label, &mut label_stack, self.dialect.rules());
            stack.top_append(label_stack.into_root());
        }
        if label.is_none() || !indent.text.is_empty() {
            stack.push_with(
                Element::page("list-item-body"),
                FrameInfo {
                    level: indent.level,
                    kind: None,
                },
            );
        }

        let scope = stack.begin_scope();
        let mut lines = IndentedLines::new(cursor, indent.text, indent.level);
        self.parse_blocks(&mut lines, stack);
        stack.end_scope(scope);
    }

    fn parse_blocks<'s>(&self, lines: &mut IndentedLines<'_, 's>, stack: &mut BuildStack) {
        while let Some(line) = lines.advance() {
            stack.set_lineno(lines.lineno());
            self.parse_block(line, lines, stack);
        }
    }

    fn parse_block<'s>(&self, line: &'s str, lines: &mut IndentedLines<'_, 's>, stack: &mut BuildStack) {
        if line.trim().is_empty() {
            stack.clear();
            return;
        }

        if line.starts_with("##") {
            if stack.top_check(&["block-comment"]) {
                stack.top_append(line);
            } else {
                stack.clear();
                stack.push(Element::page("block-comment").with_child(line));
            }
            return;
        }

        if let Some((level, text)) = heading(line) {
            stack.clear();
            stack.push(Element::page("h").with_page_attr(attr::OUTLINE_LEVEL, level.to_string()));
            self.parse_inline(text, stack, self.dialect.rules());
            stack.pop_name(&["h"]);
            return;
        }

        if SEPARATOR_RE.is_match(line) {
            stack.clear();
            let height = line.chars().count().saturating_sub(3).clamp(1, 6);
            stack.top_append(
                Element::page("separator").with_page_attr(attr::CLASS, format!("moin-hr{height}")),
            );
            return;
        }

        if let Some(caps) = BLOCK_MACRO_RE.captures(line) {
            let repeated = caps
                .get(3)
                .is_some_and(|args| line[args.start()..].matches(">>").count() >= 2);
            if !repeated {
                let source = caps.get(1).map_or("", |m| m.as_str());
                let name = caps.get(2).map_or("", |m| m.as_str());
                let args = caps.get(3).map(|m| m.as_str());
                stack.clear();
                let node = MacroResolver::new(self).resolve(name, args, source, true);
                stack.top_append_opt(node);
                return;
            }
        }

        if let Some(caps) = NOWIKI_BEGIN_RE.captures(line) {
            let marker_len = caps.get(1).map_or(3, |m| m.as_str().len());
            let directive = caps.get(2).map_or("", |m| m.as_str());
            stack.clear();
            let root = lines.root_mut();
            let mut content: Vec<&str> = Vec::new();
            while let Some(line) = root.advance() {
                let closes = NOWIKI_END_RE
                    .captures(line)
                    .and_then(|caps| caps.get(1))
                    .is_some_and(|marker| marker.as_str().len() == marker_len);
                if closes {
                    break;
                }
                content.push(line);
            }
            let block = NowikiBlock::new(marker_len, directive, &content.join("\n"));
            stack.top_append(block.to_element());
            return;
        }

        if let Some(row) = TABLE_RE.captures(line).and_then(|caps| caps.get(1)) {
            self.parse_table(row.as_str(), lines, stack);
            return;
        }

        if stack.top_check(&["table", "table-body", "list", "block-comment"]) {
            stack.clear();
        }
        if stack.top_check(&["body"]) {
            stack.push(Element::page("p"));
        } else if stack.top_check(&["p"]) || !stack.top().is_empty() {
            stack.top_append("\n");
        }
        self.parse_inline(line, stack, self.dialect.rules());
    }

    fn parse_table<'s>(&self, first_row: &str, lines: &mut IndentedLines<'_, 's>, stack: &mut BuildStack) {
        stack.clear();
        stack.push(Element::page("table").with_page_attr(attr::CLASS, "moin-wiki-table"));
        stack.push(Element::page("table-body"));
        self.parse_table_row(first_row, stack);

        while let Some(line) = lines.advance() {
            stack.set_lineno(lines.lineno());
            if let Some(row) = TABLE_RE.captures(line).and_then(|caps| caps.get(1)) {
                self.parse_table_row(row.as_str(), stack);
            } else if TABLE_SEPARATOR_RE.is_match(line) {
                // header, body and footer sections
                stack.pop();
                stack.push(Element::page("table-body"));
            } else {
                lines.push_back(line);
                break;
            }
        }
    }

    fn parse_table_row(&self, row: &str, stack: &mut BuildStack) {
        stack.push(Element::page("table-row"));

        for cell in split_row(row) {
            let mut element = Element::page("table-cell");
            if cell.span > 1 {
                element.set_page_attr(attr::COLSPAN, cell.span.to_string());
            }
            let mut changes = CellChanges::default();
            let text = match cell.args {
                Some(raw) => {
                    let args = parse_cell_arguments(raw);
                    apply_cell_arguments(&mut element, raw, &args, cell.text, &mut changes)
                }
                None => cell.text.to_string(),
            };

            stack.push(element);
            self.parse_inline(&text, stack, self.dialect.rules());
            stack.pop_name(&["table-cell"]);

            if let Some(row) = stack.find_mut("table-row") {
                for change in &changes.row {
                    change.apply(row);
                }
            }
            if let Some(table) = stack.find_mut("table") {
                for change in &changes.table {
                    change.apply(table);
                }
                if let Some(caption) = changes.caption {
                    table
                        .children
                        .insert(0, Element::page("caption").with_child(caption).into());
                }
            }
        }

        stack.pop_name(&["table-row"]);
    }

    /// Append the inline content of `text` to the stack top.
    fn parse_inline(&self, text: &str, stack: &mut BuildStack, rules: &'static [InlineRule]) {
        let scanner = Scanner::new(rules, self.ctx.host, self.dialect.name());
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
            Token::Link { target, text, args } => self.link(target, text, args, stack),
            Token::Macro { source, name, args } => {
                let node = MacroResolver::new(self).resolve(name, args, source, false);
                stack.top_append_opt(node);
            }
            Token::Samp(text) => stack.top_append(Element::page("samp").with_child(text)),
            Token::Code(text) => stack.top_append(Element::page("code").with_child(text)),
            Token::Object {
                url,
                item,
                text,
                args,
            } => stack.top_append(self.object(url, item, text, args)),
            Token::EmphStrong { len, follow } => emph_strong(stack, len, follow),
            Token::CommentBegin => {
                stack.push(Element::page("span").with_page_attr(attr::CLASS, "comment"));
            }
            Token::SizeBegin { larger } => {
                let size = if larger { "120%" } else { "85%" };
                stack.push(Element::page("span").with_page_attr(attr::FONT_SIZE, size));
            }
            Token::StrikeBegin => stack.push(Element::page("del")),
            Token::CommentEnd | Token::SizeEnd | Token::StrikeEnd => stack.pop(),
            Token::Subscript(text) => stack.top_append(
                Element::page("span")
                    .with_page_attr(attr::BASELINE_SHIFT, "sub")
                    .with_child(text),
            ),
            Token::Superscript(text) => stack.top_append(
                Element::page("span")
                    .with_page_attr(attr::BASELINE_SHIFT, "super")
                    .with_child(text),
            ),
            Token::Underline => toggle(stack, "ins"),
            Token::Entity(entity) => stack.top_append(decode_entity(entity).to_string()),
            Token::FreeLink(form) => self.free_link(form, stack),
            Token::Url(url) => stack.top_append(anchor(quote_iri(url), url)),
        }
    }

    fn link(&self, target: &str, text: Option<&str>, args: Option<&str>, stack: &mut BuildStack) {
        let mut element = Element::page("a");
        let mut query_terms: Vec<String> = Vec::new();
        if let Some(args) = args {
            let args = Arguments::parse(args);
            for (key, value) in &args.keyword {
                if matches!(key.as_str(), "target" | "title" | "download" | "class" | "accesskey") {
                    element.set_attr(QName::html(key), value.as_str());
                }
                if let Some(name) = key.strip_prefix('&') {
                    query_terms.push(format!("{name}={value}"));
                }
            }
        }

        let (href, default_text) =
            match LinkTarget::classify(target, self.ctx.host, self.dialect.name()) {
                LinkTarget::Url(url) => (quote_iri(&url), url),
                LinkTarget::Interwiki { site, item } => (interwiki(&site, &item), item),
                LinkTarget::Local(mut local) => {
                    let text = match &local.query {
                        Some(query) => format!("{}?{query}", local.path),
                        None => local.path.clone(),
                    };
                    local.add_query_terms(&query_terms);
                    (local.to_iri(), text)
                }
            };
        element.set_attr(QName::xlink("href"), href);

        stack.push(element);
        match text.filter(|text| !text.is_empty()) {
            Some(text) => self.parse_inline(text, stack, DESCRIPTION_RULES),
            None => stack.top_append(default_text),
        }
        stack.pop_name(&["a"]);
    }

    fn object(
        &self,
        url: Option<&str>,
        item: Option<&str>,
        text: Option<&str>,
        args: Option<&str>,
    ) -> Element {
        let mut query: Vec<(String, String)> = Vec::new();
        let mut attributes: Vec<(QName, String)> = Vec::new();
        if let Some(args) = args {
            let args = Arguments::parse_with(args, ArgumentSyntax::Object);
            for (key, value) in args.keyword {
                if let Some(name) = key.strip_prefix('&') {
                    query.push((name.to_string(), value));
                } else if matches!(key.as_str(), "width" | "height" | "class") {
                    attributes.push((QName::html(&key), value));
                }
            }
        }
        if let Some(text) = text.filter(|text| !text.is_empty()) {
            attributes.push((QName::html(attr::ALT), text.to_string()));
        }

        let mut element = match item {
            Some(_) => Element::new(QName::xinclude("include")),
            None => Element::page("object"),
        };
        for (name, value) in attributes {
            element.set_attr(name, value);
        }
        match item {
            Some(item) => {
                let query = urlencode(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                let href = wiki_local(&map_attachment(item), Some(&query), None);
                element.set_attr(QName::xinclude("href"), href);
            }
            None => element.set_attr(QName::xlink("href"), quote_iri(url.unwrap_or_default())),
        }
        element
    }

    fn free_link(&self, form: FreeLinkForm<'_>, stack: &mut BuildStack) {
        match form {
            FreeLinkForm::Escaped(text) => stack.top_append(text),
            FreeLinkForm::Page(page) => {
                let (path, fragment) = match page.rsplit_once('#') {
                    Some((path, fragment)) => (path, Some(fragment)),
                    None => (page, None),
                };
                stack.top_append(anchor(wiki_local(path, None, fragment), page));
            }
            FreeLinkForm::Email(address) => {
                stack.top_append(anchor(format!("mailto:{address}"), address));
            }
            FreeLinkForm::Interwiki { source, site, page } => {
                if self.ctx.host.is_known_wiki(site) {
                    stack.top_append(anchor(interwiki(site, page), page));
                } else {
                    stack.top_append(source);
                }
            }
        }
    }
}

impl InlineMarkup for MoinWikiParser<'_, '_> {
    fn inline_markup(&self, text: &str) -> Vec<Node> {
        let mut stack = BuildStack::new(Element::page("p"));
        self.parse_inline(text, &mut stack, self.dialect.rules());
        stack.into_root().children
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::HostConfig;
    use crate::ir::xml::to_fragment;
    use crate::mime::Type;
    use crate::registry::ConverterRegistry;
    use rstest::rstest;

    fn convert_with(input: &str, dialect: Dialect, arguments: Arguments) -> String {
        let registry = ConverterRegistry::new();
        let host = HostConfig::default().with_interwiki(["MoinMoin"]);
        let ctx = ParseContext::new(&registry, &host, Type::moin_wiki()).with_arguments(arguments);
        to_fragment(&MoinWikiParser::new(&ctx, dialect).parse(input))
    }

    fn convert(input: &str) -> String {
        convert_with(input, Dialect::Moin, Arguments::new())
    }

    fn body(inner: &str) -> String {
        format!("<page><body>{inner}</body></page>")
    }

    #[rstest]
    #[case("Text", "<p>Text</p>")]
    #[case("Text\nTest", "<p>Text\nTest</p>")]
    #[case("Text\n\nTest", "<p>Text</p><p>Test</p>")]
    #[case("----", "<separator class=\"moin-hr1\" />")]
    #[case("--------", "<separator class=\"moin-hr5\" />")]
    #[case("## hidden\n## more", "<block-comment>## hidden## more</block-comment>")]
    fn basic_blocks(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(convert(input), body(expected));
    }

    #[rstest]
    #[case("[[http://moinmo.in/]]", "<a xlink:href=\"http://moinmo.in/\">http://moinmo.in/</a>")]
    #[case(
        "[[javascript:alert(\"xss\")]]",
        "<a xlink:href=\"wiki.local:javascript:alert%28%22xss%22%29\">javascript:alert(\"xss\")</a>"
    )]
    #[case("[[http://moinmo.in/|MoinMoin]]", "<a xlink:href=\"http://moinmo.in/\">MoinMoin</a>")]
    #[case("[[MoinMoin#Heading]]", "<a xlink:href=\"wiki.local:MoinMoin#Heading\">MoinMoin</a>")]
    #[case("[[#Heading]]", "<a xlink:href=\"wiki.local:#Heading\"></a>")]
    #[case(
        "[[MoinMoin:RecentChanges|changes]]",
        "<a xlink:href=\"wiki://MoinMoin/RecentChanges\">changes</a>"
    )]
    #[case(
        "[[MoinMoin:Blank In Page Name]]",
        "<a xlink:href=\"wiki://MoinMoin/Blank%20In%20Page%20Name\">Blank In Page Name</a>"
    )]
    #[case(
        "[[InvalidWikiName:RecentChanges]]",
        "<a xlink:href=\"wiki.local:InvalidWikiName:RecentChanges\">InvalidWikiName:RecentChanges</a>"
    )]
    #[case("[[mailto:foo@bar.baz|write me]]", "<a xlink:href=\"mailto:foo@bar.baz\">write me</a>")]
    #[case(
        "[[Page|Text|class=big,&action=raw]]",
        "<a html:class=\"big\" xlink:href=\"wiki.local:Page?&amp;action=raw\">Text</a>"
    )]
    #[case(
        "[[/inner2.png|{{/inner2.png||width=500}}]]",
        "<a xlink:href=\"wiki.local:/inner2.png\"><xinclude:include html:width=\"500\" xinclude:href=\"wiki.local:/inner2.png?\" /></a>"
    )]
    fn links(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(convert(input), body(&format!("<p>{expected}</p>")));
    }

    #[rstest]
    #[case(
        "{{somelocalimage|my alt text|width=10, height=10}}",
        "<xinclude:include html:width=\"10\" html:height=\"10\" html:alt=\"my alt text\" xinclude:href=\"wiki.local:somelocalimage?\" />"
    )]
    #[case(
        "{{somelocalimage||width=10, &h=10}}",
        "<xinclude:include html:width=\"10\" xinclude:href=\"wiki.local:somelocalimage?h=10\" />"
    )]
    #[case(
        "{{http://moinmo.in/|MoinMoin}}",
        "<object html:alt=\"MoinMoin\" xlink:href=\"http://moinmo.in/\" />"
    )]
    #[case(
        "before {{http://moinmo.in}} after",
        "before <object xlink:href=\"http://moinmo.in\" /> after"
    )]
    fn objects(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(convert(input), body(&format!("<p>{expected}</p>")));
    }

    #[rstest]
    #[case("''Emphasis''", "<emphasis>Emphasis</emphasis>")]
    #[case("'''Strong'''", "<strong>Strong</strong>")]
    #[case("'''''Both'''''", "<strong><emphasis>Both</emphasis></strong>")]
    #[case("'''''Mixed'''Emphasis''", "<emphasis><strong>Mixed</strong>Emphasis</emphasis>")]
    #[case("'''''Mixed''Strong'''", "<strong><emphasis>Mixed</emphasis>Strong</strong>")]
    #[case("Text ''Emphasis\n''Text", "Text <emphasis>Emphasis\n</emphasis>Text")]
    #[case("Text''''''Text''''", "TextText")]
    #[case(
        "''italic '''strongitalic ''''' normal",
        "<emphasis>italic <strong>strongitalic </strong></emphasis> normal"
    )]
    fn emphasis(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(convert(input), body(&format!("<p>{expected}</p>")));
    }

    #[test]
    fn blank_line_closes_open_emphasis() {
        assert_eq!(
            convert("Text ''Emphasis\n\nText"),
            body("<p>Text <emphasis>Emphasis</emphasis></p><p>Text</p>")
        );
    }

    #[rstest]
    #[case("=Not_a_Heading=", "<p>=Not_a_Heading=</p>")]
    #[case("= Heading 1 =", "<h outline-level=\"1\">Heading 1</h>")]
    #[case("=== Heading 3 ===", "<h outline-level=\"3\">Heading 3</h>")]
    #[case("== Heading 2 ===", "<p>== Heading 2 ===</p>")]
    #[case("== [[Link]] ==", "<h outline-level=\"2\"><a xlink:href=\"wiki.local:Link\">Link</a></h>")]
    fn headings(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(convert(input), body(expected));
    }

    #[rstest]
    #[case("__underline__", "<ins>underline</ins>")]
    #[case(",,sub,,script", "<span baseline-shift=\"sub\">sub</span>script")]
    #[case("^super^script", "<span baseline-shift=\"super\">super</span>script")]
    #[case("~-smaller-~", "<span font-size=\"85%\">smaller</span>")]
    #[case("~+larger+~", "<span font-size=\"120%\">larger</span>")]
    #[case("--(strike through)--", "<del>strike through</del>")]
    #[case(
        "/* normal __underline__ normal */",
        "<span class=\"comment\">normal <ins>underline</ins> normal</span>"
    )]
    #[case("&quot;", "\"")]
    #[case("&#x22;", "\"")]
    #[case("{{{nowiki}}}", "<samp>nowiki</samp>")]
    #[case("{{{{nowiki}}}}", "<samp>{nowiki}</samp>")]
    #[case("`nowiki`", "<code>nowiki</code>")]
    #[case("{{{}}}", "<samp></samp>")]
    fn inline_markup(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(convert(input), body(&format!("<p>{expected}</p>")));
    }

    const BULLETS: &str = "<list item-label-generate=\"unordered\">";

    #[rstest]
    #[case(" *Item", "<list item-label-generate=\"unordered\"><list-item><list-item-body>Item</list-item-body></list-item></list>")]
    #[case(" 1. Item", "<list item-label-generate=\"ordered\"><list-item><list-item-body>Item</list-item-body></list-item></list>")]
    #[case(
        " A.#3 Item",
        "<list item-label-generate=\"ordered\" list-style-type=\"upper-alpha\" list-start=\"3\"><list-item><list-item-body>Item</list-item-body></list-item></list>"
    )]
    #[case(
        " Key:: Item",
        "<list><list-item><list-item-label>Key</list-item-label><list-item-body>Item</list-item-body></list-item></list>"
    )]
    #[case(
        "  Item",
        "<list item-label-generate=\"unordered\" list-style-type=\"no-bullet\"><list-item><list-item-body>Item</list-item-body></list-item></list>"
    )]
    fn list_markers(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(convert(input), body(expected));
    }

    #[test]
    fn list_continuation_and_nesting() {
        assert_eq!(
            convert(" *Item\n Item"),
            body(&format!("{BULLETS}<list-item><list-item-body>Item\nItem</list-item-body></list-item></list>"))
        );
        assert_eq!(
            convert(" *Item 1\n  *Item 1.2\n *Item 2"),
            body(&format!(
                "{BULLETS}<list-item><list-item-body>Item 1{BULLETS}<list-item><list-item-body>Item 1.2</list-item-body></list-item></list></list-item-body></list-item><list-item><list-item-body>Item 2</list-item-body></list-item></list>"
            ))
        );
        assert_eq!(
            convert(" * List 1\n 1. List 2"),
            body(&format!(
                "{BULLETS}<list-item><list-item-body>List 1</list-item-body></list-item></list><list item-label-generate=\"ordered\"><list-item><list-item-body>List 2</list-item-body></list-item></list>"
            ))
        );
        assert_eq!(
            convert("Text\n * Item\n\nText"),
            body(&format!(
                "<p>Text</p>{BULLETS}<list-item><list-item-body>Item</list-item-body></list-item></list><p>Text</p>"
            ))
        );
    }

    #[test]
    fn definition_without_description_is_label_only() {
        assert_eq!(
            convert(" Term::\n :: Description"),
            body("<list><list-item><list-item-label>Term</list-item-label></list-item><list-item><list-item-body>Description</list-item-body></list-item></list>")
        );
    }

    #[test]
    fn first_column_markers_stay_text() {
        assert_eq!(convert("1. not a list"), body("<p>1. not a list</p>"));
    }

    #[rstest]
    #[case("<<BR>>", "")]
    #[case("Text<<BR>>Text", "<p>Text<line-break />Text</p>")]
    #[case("<<Macro>>", "<part alt=\"&lt;&lt;Macro&gt;&gt;\" content-type=\"x-moin/macro;name=Macro\" />")]
    #[case(
        "<<Macro(arg)>>",
        "<part alt=\"&lt;&lt;Macro(arg)&gt;&gt;\" content-type=\"x-moin/macro;name=Macro\"><arguments>arg</arguments></part>"
    )]
    #[case(
        " <<Macro>> ",
        "<list item-label-generate=\"unordered\" list-style-type=\"no-bullet\"><list-item><list-item-body><part alt=\"&lt;&lt;Macro&gt;&gt;\" content-type=\"x-moin/macro;name=Macro\" /></list-item-body></list-item></list>"
    )]
    #[case(
        "Text\n<<Macro>>",
        "<p>Text</p><part alt=\"&lt;&lt;Macro&gt;&gt;\" content-type=\"x-moin/macro;name=Macro\" />"
    )]
    #[case(
        "<<Macro>><<Macro>>",
        "<p><inline-part alt=\"&lt;&lt;Macro&gt;&gt;\" content-type=\"x-moin/macro;name=Macro\" /><inline-part alt=\"&lt;&lt;Macro&gt;&gt;\" content-type=\"x-moin/macro;name=Macro\" /></p>"
    )]
    #[case(
        "<<FootNote(''note'')>>",
        "<p><note note-class=\"footnote\"><note-body><emphasis>note</emphasis></note-body></note></p>"
    )]
    fn macros(#[case] input: &str, #[case] expected: &str) {
        let expected = if expected.is_empty() {
            "<page><body /></page>".to_string()
        } else {
            body(expected)
        };
        assert_eq!(convert(input), expected);
    }

    const TABLE: &str = "<table class=\"moin-wiki-table\">";

    fn table(inner: &str) -> String {
        body(&format!("{TABLE}<table-body>{inner}</table-body></table>"))
    }

    #[rstest]
    #[case("||Cell 1||Cell 2||", "<table-row><table-cell>Cell 1</table-cell><table-cell>Cell 2</table-cell></table-row>")]
    #[case("||Row 1||\n||Row 2||\n", "<table-row><table-cell>Row 1</table-cell></table-row><table-row><table-cell>Row 2</table-cell></table-row>")]
    #[case("||||Span||\n\n", "<table-row><table-cell number-columns-spanned=\"2\">Span</table-cell></table-row>")]
    #[case("||<-2>Span||", "<table-row><table-cell number-columns-spanned=\"2\">Span</table-cell></table-row>")]
    #[case("||<|2>Span||", "<table-row><table-cell number-rows-spanned=\"2\">Span</table-cell></table-row>")]
    #[case("||<^>Cell||", "<table-row><table-cell style=\"vertical-align: top;\">Cell</table-cell></table-row>")]
    #[case("||<99%>Cell||", "<table-row><table-cell style=\"width: 99%;\">Cell</table-cell></table-row>")]
    #[case("||<width=\"20em\">Cell||", "<table-row><table-cell style=\"width: 20em;\">Cell</table-cell></table-row>")]
    #[case("||<rowbgcolor=\"red\">Cell||", "<table-row style=\"background-color: red;\"><table-cell>Cell</table-cell></table-row>")]
    #[case("||<id=\"my-id\">Cell||", "<table-row><table-cell id=\"my-id\">Cell</table-cell></table-row>")]
    #[case("||'''Cell'''||", "<table-row><table-cell><strong>Cell</strong></table-cell></table-row>")]
    #[case(
        "||<<DateTime>>||",
        "<table-row><table-cell><inline-part alt=\"&lt;&lt;DateTime&gt;&gt;\" content-type=\"x-moin/macro;name=DateTime\" /></table-cell></table-row>"
    )]
    #[case(
        "||{{cat||width=160}} text [[link]]||",
        "<table-row><table-cell><xinclude:include html:width=\"160\" xinclude:href=\"wiki.local:cat?\" /> text <a xlink:href=\"wiki.local:link\">link</a></table-cell></table-row>"
    )]
    fn tables(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(convert(input), table(expected));
    }

    #[test]
    fn table_level_arguments() {
        assert_eq!(
            convert("||<tableclass=\"table\" rowclass=\"row\" class=\"cell\">Cell||"),
            body("<table class=\"table moin-wiki-table\"><table-body><table-row class=\"row\"><table-cell class=\"cell\">Cell</table-cell></table-row></table-body></table>")
        );
        assert_eq!(
            convert("||<caption=\"My Table\">Cell||"),
            body(&format!("{TABLE}<caption>My Table</caption><table-body><table-row><table-cell>Cell</table-cell></table-row></table-body></table>"))
        );
        assert_eq!(
            convert("||<tablestyle=\"background-color: yellow\" #0000FF>Cell||"),
            body("<table class=\"moin-wiki-table\" style=\"background-color: yellow;\"><table-body><table-row><table-cell style=\"background-color: #0000FF;\">Cell</table-cell></table-row></table-body></table>")
        );
    }

    #[test]
    fn invalid_cell_argument_is_reported() {
        assert_eq!(
            convert("||<X>Cell||"),
            table("<table-row><table-cell style=\"background-color: pink; color: black;\">[ Error: \"X\" is invalid within &lt;X&gt;\u{a0}]<line-break />Cell</table-cell></table-row>")
        );
    }

    #[test]
    fn table_sections_and_surroundings() {
        assert_eq!(
            convert("||Header||\n===\n||Body||\n=====\n||Footer||"),
            body(&format!("{TABLE}<table-body><table-row><table-cell>Header</table-cell></table-row></table-body><table-body><table-row><table-cell>Body</table-cell></table-row></table-body><table-body><table-row><table-cell>Footer</table-cell></table-row></table-body></table>"))
        );
        assert_eq!(
            convert("Text\n||Item||\nText"),
            body(&format!("<p>Text</p>{TABLE}<table-body><table-row><table-cell>Item</table-cell></table-row></table-body></table><p>Text</p>"))
        );
    }

    #[rstest]
    #[case("{{{\nnowiki\n}}}", "<nowiki>3<nowiki-args />nowiki</nowiki>")]
    #[case("{{{\nnowiki\nno\nwiki\n}}}", "<nowiki>3<nowiki-args />nowiki\nno\nwiki</nowiki>")]
    #[case("{{{#!\ntest\n}}}", "<nowiki>3<nowiki-args>#!</nowiki-args>test</nowiki>")]
    #[case("{{{{{#!wiki\nwiki\n}}}\n}}}}}", "<nowiki>5<nowiki-args>#!wiki</nowiki-args>wiki\n}}}</nowiki>")]
    #[case(
        "{{{#!wiki(style=\"background-color: red\")\nwiki\n}}}",
        "<nowiki>3<nowiki-args>#!wiki(style=\"background-color: red\")</nowiki-args>wiki</nowiki>"
    )]
    #[case(
        "{{{#!highlight python\nimport os\n}}}",
        "<nowiki>3<nowiki-args>#!highlight python</nowiki-args>import os</nowiki>"
    )]
    #[case("{{{#!csv ,\na,b,c\nd,e,22\n}}}", "<nowiki>3<nowiki-args>#!csv ,</nowiki-args>a,b,c\nd,e,22</nowiki>")]
    fn nowiki_blocks(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(convert(input), body(expected));
    }

    #[test]
    fn nowiki_inside_list_keeps_indentation() {
        assert_eq!(
            convert(" * {{{\n   code\n }}}"),
            body(&format!("{BULLETS}<list-item><list-item-body><nowiki>3<nowiki-args />   code</nowiki></list-item-body></list-item></list>"))
        );
    }

    #[test]
    fn body_takes_style_and_class_arguments() {
        let args = Arguments::from_keywords([("style", "background-color: red"), ("other", "x")]);
        assert_eq!(
            convert_with("Text", Dialect::Moin, args),
            "<page><body style=\"background-color: red\"><p>Text</p></body></page>"
        );
    }

    #[test]
    fn moin19_links_free_words() {
        assert_eq!(
            convert_with("See FrontPage or http://moinmo.in/.", Dialect::Moin19, Arguments::new()),
            body("<p>See <a xlink:href=\"wiki.local:FrontPage\">FrontPage</a> or <a xlink:href=\"http://moinmo.in/\">http://moinmo.in/</a>.</p>")
        );
        assert_eq!(
            convert_with("!FrontPage and MoinMoin:InterWiki", Dialect::Moin19, Arguments::new()),
            body("<p>FrontPage and <a xlink:href=\"wiki://MoinMoin/InterWiki\">InterWiki</a></p>")
        );
        assert_eq!(convert("FrontPage"), body("<p>FrontPage</p>"));
    }

    #[test]
    fn line_numbers_are_recorded() {
        let registry = ConverterRegistry::new();
        let host = HostConfig::default().with_line_numbers(true);
        let ctx = ParseContext::new(&registry, &host, Type::moin_wiki());
        let out = to_fragment(&MoinWikiParser::new(&ctx, Dialect::Moin).parse("one\n\n== two =="));
        assert_eq!(
            out,
            "<page><body><p html:data-lineno=\"1\">one</p><h outline-level=\"2\" html:data-lineno=\"3\">two</h></body></page>"
        );
    }
}
