//! reStructuredText → document tree
//!
//! reStructuredText structure is carried by indentation, so the block parser
//! works on slices of lines: every construct that owns an indented body
//! (list items, definitions, directives, block quotes) takes the body out,
//! strips the common indentation and parses it recursively.
//!
//! Hyperlink targets, footnotes and substitution definitions may appear after
//! their use. They are collected in a first pass over all lines; the second
//! pass builds the tree.

use super::inline::{image, make_id, normalize_name, InlineParser, References, Substitution};
use crate::common::args::Arguments;
use crate::common::macros::{parser_part, MacroResolver, PlainText};
use crate::format::ParseContext;
use crate::formats::highlight::code_block;
use crate::ir::names::attr;
use crate::ir::{Element, Node, QName};
use once_cell::sync::Lazy;
use regex::Regex;

static BULLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([*+\-•‣⁃])(?:\s+(.*))?$").expect("bullet pattern"));

static ENUM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\()?([0-9]+|#|[a-zA-Z]|[ivxlcdmIVXLCDM]+)([.)])(?:\s+(.*))?$").expect("enumerator pattern")
});

static FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:([^:\s][^:]*):(?:\s+(.*))?$").expect("field pattern"));

static OPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:([^:\s][^:]*):\s*(.*)$").expect("option pattern"));

static DIRECTIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9][A-Za-z0-9_+.-]*)::(?:\s+(.*))?$").expect("directive pattern"));

static TARGET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^_(?:`([^`]+)`|([^:`]+)):(?:\s+(.*))?$").expect("target pattern"));

static FOOTNOTE_DEF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(#[A-Za-z0-9_-]*|\d+|\*)\](?:\s+(.*))?$").expect("footnote pattern"));

static SUBSTITUTION_DEF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\|([^|]+)\|\s+([A-Za-z0-9_-]+)::(?:\s+(.*))?$").expect("substitution definition pattern")
});

static GRID_BORDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+(?:[-=]+\+)+$").expect("grid border pattern"));

static SIMPLE_BORDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^=+(?: +=+)+$").expect("simple table border pattern"));

const ADMONITIONS: &[&str] = &[
    "attention", "caution", "danger", "error", "hint", "important", "note", "tip", "warning",
];

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// The repeated punctuation character of a section adornment or transition.
fn adornment(line: &str) -> Option<char> {
    let line = line.trim_end();
    let mut chars = line.chars();
    let first = chars.next()?;
    if line.len() < 2 || !first.is_ascii_punctuation() || !chars.all(|c| c == first) {
        return None;
    }
    Some(first)
}

/// Lines from `start` on that are blank or indented by at least `min`,
/// without trailing blank lines and with the common indentation removed.
fn indented(lines: &[String], start: usize, min: usize) -> (Vec<String>, usize) {
    let mut end = start;
    while end < lines.len() && (is_blank(&lines[end]) || indent_of(&lines[end]) >= min) {
        end += 1;
    }
    let mut last = end;
    while last > start && is_blank(&lines[last - 1]) {
        last -= 1;
    }
    (dedent(&lines[start..last]), last)
}

fn dedent(lines: &[String]) -> Vec<String> {
    let strip = lines
        .iter()
        .filter(|l| !is_blank(l))
        .map(|l| indent_of(l))
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| if is_blank(l) { String::new() } else { l[strip..].trim_end().to_string() })
        .collect()
}

fn skip_blank(lines: &[String], mut index: usize) -> usize {
    while index < lines.len() && is_blank(&lines[index]) {
        index += 1;
    }
    index
}

fn roman_value(text: &str) -> Option<u32> {
    let mut total = 0;
    let mut previous = 0;
    for c in text.to_ascii_lowercase().chars().rev() {
        let value = match c {
            'i' => 1,
            'v' => 5,
            'x' => 10,
            'l' => 50,
            'c' => 100,
            'd' => 500,
            'm' => 1000,
            _ => return None,
        };
        if value < previous {
            total -= value;
        } else {
            total += value;
            previous = value;
        }
    }
    (total > 0).then_some(total)
}

/// Label style and first number of an enumerated list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Enumeration {
    style: Option<&'static str>,
    start: u32,
    parens: bool,
    delimiter: char,
}

fn enumeration(line: &str) -> Option<Enumeration> {
    let caps = ENUM_RE.captures(line)?;
    let parens = caps.get(1).is_some();
    let delimiter = caps.get(3)?.as_str().chars().next()?;
    if parens && delimiter != ')' {
        return None;
    }
    let ordinal = caps.get(2)?.as_str();
    let (style, start) = if let Ok(number) = ordinal.parse::<u32>() {
        (None, number)
    } else if ordinal == "#" {
        (None, 1)
    } else if ordinal.len() == 1 && !matches!(ordinal, "i" | "I") {
        let c = ordinal.chars().next()?;
        let style = if c.is_ascii_lowercase() { "lower-alpha" } else { "upper-alpha" };
        (Some(style), u32::from(c.to_ascii_lowercase() as u8 - b'a') + 1)
    } else {
        let style = if ordinal.chars().all(|c| c.is_ascii_lowercase()) {
            "lower-roman"
        } else {
            "upper-roman"
        };
        (Some(style), roman_value(ordinal)?)
    };
    Some(Enumeration {
        style,
        start,
        parens,
        delimiter,
    })
}

/// Arguments, options and content of a directive.
#[derive(Debug, Default)]
struct DirectiveBlock {
    arguments: String,
    options: Vec<(String, String)>,
    content: Vec<String>,
}

impl DirectiveBlock {
    fn split(first: &str, body: &[String], takes_arguments: bool) -> Self {
        let mut block = DirectiveBlock::default();
        if !takes_arguments && !first.is_empty() {
            block.content.push(first.to_string());
            block.content.extend(body.iter().cloned());
            return block;
        }
        let mut k = 0;
        block.arguments = first.to_string();
        if takes_arguments {
            while k < body.len() && !is_blank(&body[k]) && !body[k].starts_with(':') {
                block.arguments.push(' ');
                block.arguments.push_str(body[k].trim());
                k += 1;
            }
        }
        while k < body.len() {
            match OPTION_RE.captures(&body[k]) {
                Some(caps) => {
                    let key = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
                    let value = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();
                    block.options.push((key, value));
                    k += 1;
                }
                None => break,
            }
        }
        let k = skip_blank(body, k);
        block.content = body[k..].to_vec();
        block
    }

    fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn text(&self) -> String {
        self.content.join("\n")
    }
}

fn takes_arguments(name: &str) -> bool {
    matches!(
        name,
        "image"
            | "figure"
            | "code"
            | "code-block"
            | "sourcecode"
            | "macro"
            | "include"
            | "parser"
            | "raw"
            | "admonition"
            | "topic"
            | "sidebar"
            | "rubric"
            | "contents"
    )
}

/// Pass one: targets, footnotes, substitutions and section titles.
fn collect_references(lines: &[String]) -> References {
    let mut refs = References::default();
    for (i, line) in lines.iter().enumerate() {
        let indent = indent_of(line);
        let trimmed = line.trim();
        if indent == 0
            && !trimmed.is_empty()
            && adornment(line).is_none()
            && lines.get(i + 1).and_then(|next| adornment(next)).is_some()
        {
            refs.sections.insert(normalize_name(trimmed));
        }
        if let Some(uri) = trimmed.strip_prefix("__ ") {
            let (body, _) = indented(lines, i + 1, indent + 1);
            refs.anonymous.push(join_uri(uri, &body));
            continue;
        }
        let Some(rest) = trimmed.strip_prefix(".. ") else {
            continue;
        };
        let (body, _) = indented(lines, i + 1, indent + 1);

        if let Some(caps) = TARGET_RE.captures(rest) {
            let name = caps.get(1).or(caps.get(2)).map_or("", |m| m.as_str());
            let uri = join_uri(caps.get(3).map_or("", |m| m.as_str()), &body);
            if name == "_" {
                refs.anonymous.push(uri);
            } else if uri.is_empty() {
                refs.internal.insert(normalize_name(name));
            } else {
                refs.targets.insert(normalize_name(name), uri);
            }
        } else if let Some(caps) = FOOTNOTE_DEF_RE.captures(rest) {
            let label = caps.get(1).map_or("", |m| m.as_str());
            let mut text = caps.get(2).map_or("", |m| m.as_str()).to_string();
            for extra in &body {
                text.push('\n');
                text.push_str(extra);
            }
            match label {
                "#" | "*" => refs.auto_footnotes.push(text),
                _ => {
                    refs.labeled_footnotes.insert(label.to_string(), text);
                }
            }
        } else if let Some(caps) = SUBSTITUTION_DEF_RE.captures(rest) {
            let name = normalize_name(caps.get(1).map_or("", |m| m.as_str()));
            let kind = caps.get(2).map_or("", |m| m.as_str());
            let data = caps.get(3).map_or("", |m| m.as_str());
            let block = DirectiveBlock::split(data, &body, true);
            let substitution = match kind {
                "image" => Substitution::Image {
                    uri: block.arguments.split_whitespace().collect(),
                    options: block.options,
                },
                _ => Substitution::Replace(block.arguments),
            };
            refs.substitutions.insert(name, substitution);
        }
    }
    refs
}

/// A URI may be wrapped onto indented lines; whitespace is not part of it.
fn join_uri(first: &str, rest: &[String]) -> String {
    std::iter::once(first)
        .chain(rest.iter().map(String::as_str))
        .flat_map(str::split_whitespace)
        .collect()
}

pub struct RstParser<'c, 'a> {
    ctx: &'c ParseContext<'a>,
}

impl<'c, 'a> RstParser<'c, 'a> {
    pub fn new(ctx: &'c ParseContext<'a>) -> Self {
        RstParser { ctx }
    }

    pub fn parse(&self, source: &str) -> Element {
        let lines: Vec<String> = source
            .replace("\r\n", "\n")
            .lines()
            .map(|line| line.replace('\t', "        ").trim_end().to_string())
            .collect();
        let refs = collect_references(&lines);
        let mut blocks = BlockParser {
            ctx: self.ctx,
            inline: InlineParser::new(&refs, self.ctx.host),
            styles: Vec::new(),
        };
        let children = blocks.blocks(&lines, Some(0));
        Element::document(Element::page("body").with_children(children))
    }
}

struct BlockParser<'c, 'a, 'r> {
    ctx: &'c ParseContext<'a>,
    inline: InlineParser<'r>,
    /// Adornment styles in order of first use; the index is the level
    styles: Vec<(char, bool)>,
}

impl BlockParser<'_, '_, '_> {
    /// Parse `lines`; `line_offset` is given for the top level only, where
    /// blocks get their source line numbers.
    fn blocks(&mut self, lines: &[String], line_offset: Option<usize>) -> Vec<Node> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < lines.len() {
            if is_blank(&lines[i]) {
                i += 1;
                continue;
            }
            let start = i;
            let (mut nodes, next) = self.block(lines, i);
            i = next.max(start + 1);
            if let Some(offset) = line_offset.filter(|_| self.ctx.host.add_lineno) {
                for node in &mut nodes {
                    if let Node::Element(elem) = node {
                        elem.set_attr(QName::html(attr::LINENO), (offset + start + 1).to_string());
                    }
                }
            }
            out.extend(nodes);
        }
        out
    }

    fn block(&mut self, lines: &[String], i: usize) -> (Vec<Node>, usize) {
        let line = lines[i].as_str();
        if indent_of(line) > 0 {
            return self.block_quote(lines, i);
        }
        if line == ".." || line.starts_with(".. ") {
            return self.explicit(lines, i);
        }
        if line.starts_with("__ ") {
            let (_, next) = indented(lines, i + 1, 1);
            return (Vec::new(), next);
        }
        if let Some(section) = self.section(lines, i) {
            return section;
        }
        if adornment(line).is_some() && line.len() >= 4 {
            let separator = Element::page("separator").with_page_attr(attr::CLASS, "moin-hr2");
            return (vec![separator.into()], i + 1);
        }
        if GRID_BORDER_RE.is_match(line) {
            return self.grid_table(lines, i);
        }
        if SIMPLE_BORDER_RE.is_match(line) {
            return self.simple_table(lines, i);
        }
        if BULLET_RE.is_match(line) {
            return self.bullet_list(lines, i);
        }
        if let Some(kind) = enumeration(line) {
            return self.enumerated_list(lines, i, kind);
        }
        if FIELD_RE.is_match(line) {
            return self.field_list(lines, i);
        }
        if line == "|" || line.starts_with("| ") {
            return self.line_block(lines, i);
        }
        if line.starts_with(">>>") {
            let mut end = i;
            while end < lines.len() && !is_blank(&lines[end]) {
                end += 1;
            }
            let code = Element::page("blockcode").with_child(lines[i..end].join("\n"));
            return (vec![code.into()], end);
        }
        let starts_definition = lines
            .get(i + 1)
            .is_some_and(|next| !is_blank(next) && indent_of(next) > 0);
        if starts_definition {
            return self.definition_list(lines, i);
        }
        self.paragraph(lines, i)
    }

    fn section(&mut self, lines: &[String], i: usize) -> Option<(Vec<Node>, usize)> {
        let line = lines[i].as_str();
        if let Some(c) = adornment(line) {
            let title = lines.get(i + 1)?;
            let under = lines.get(i + 2)?;
            if is_blank(title) || adornment(title).is_some() || adornment(under) != Some(c) {
                return None;
            }
            return Some((vec![self.heading(title.trim(), c, true)], i + 3));
        }
        let under = lines.get(i + 1)?;
        let c = adornment(under)?;
        if under.chars().count() < line.chars().count().min(4) {
            return None;
        }
        Some((vec![self.heading(line.trim(), c, false)], i + 2))
    }

    fn heading(&mut self, title: &str, c: char, overline: bool) -> Node {
        let style = (c, overline);
        let level = match self.styles.iter().position(|s| *s == style) {
            Some(index) => index + 1,
            None => {
                self.styles.push(style);
                self.styles.len()
            }
        };
        Element::page("h")
            .with_page_attr(attr::OUTLINE_LEVEL, level.min(6).to_string())
            .with_children(self.inline.parse(title))
            .into()
    }

    fn paragraph(&mut self, lines: &[String], i: usize) -> (Vec<Node>, usize) {
        let mut end = i;
        while end < lines.len() && !is_blank(&lines[end]) && (end == i || indent_of(&lines[end]) == 0) {
            end += 1;
        }
        let text = lines[i..end].join("\n");
        let mut nodes = Vec::new();

        let (text, literal) = if text == "::" {
            (String::new(), true)
        } else if let Some(stripped) = text.strip_suffix(" ::") {
            (stripped.to_string(), true)
        } else if let Some(stripped) = text.strip_suffix("::") {
            (format!("{stripped}:"), true)
        } else {
            (text, false)
        };
        if !text.is_empty() {
            nodes.push(Element::page("p").with_children(self.inline.parse(&text)).into());
        }
        if !literal {
            return (nodes, end);
        }
        let start = skip_blank(lines, end);
        if start < lines.len() && indent_of(&lines[start]) > 0 {
            let (body, next) = indented(lines, start, 1);
            nodes.push(Element::page("blockcode").with_child(body.join("\n")).into());
            return (nodes, next);
        }
        (nodes, end)
    }

    fn block_quote(&mut self, lines: &[String], i: usize) -> (Vec<Node>, usize) {
        let (body, next) = indented(lines, i, 1);
        let quote = Element::page("blockquote").with_children(self.blocks(&body, None));
        (vec![quote.into()], next)
    }

    /// Item text: the rest of the marker line plus its indented continuation.
    fn item_lines(lines: &[String], i: usize, first: &str) -> (Vec<String>, usize) {
        let (rest, next) = indented(lines, i + 1, 1);
        let mut item = Vec::with_capacity(rest.len() + 1);
        if !first.is_empty() {
            item.push(first.to_string());
        }
        item.extend(rest);
        (item, next)
    }

    fn list_item(&mut self, body: &[String]) -> Element {
        Element::page("list-item")
            .with_child(Element::page("list-item-body").with_children(self.blocks(body, None)))
    }

    fn bullet_list(&mut self, lines: &[String], i: usize) -> (Vec<Node>, usize) {
        let bullet = lines[i].chars().next();
        let mut list = Element::page("list").with_page_attr(attr::ITEM_LABEL_GENERATE, "unordered");
        let mut k = i;
        while k < lines.len() && lines[k].chars().next() == bullet {
            let Some(caps) = BULLET_RE.captures(&lines[k]) else {
                break;
            };
            let first = caps.get(2).map_or("", |m| m.as_str());
            let (body, next) = Self::item_lines(lines, k, first);
            list.push(self.list_item(&body));
            k = skip_blank(lines, next);
        }
        (vec![list.into()], k)
    }

    fn enumerated_list(&mut self, lines: &[String], i: usize, kind: Enumeration) -> (Vec<Node>, usize) {
        let mut list = Element::page("list").with_page_attr(attr::ITEM_LABEL_GENERATE, "ordered");
        if let Some(style) = kind.style {
            list.set_page_attr(attr::LIST_STYLE_TYPE, style);
        }
        if kind.start != 1 {
            list.set_page_attr(attr::LIST_START, kind.start.to_string());
        }
        let mut k = i;
        while k < lines.len() {
            let same_format = enumeration(&lines[k])
                .is_some_and(|e| e.parens == kind.parens && e.delimiter == kind.delimiter);
            if !same_format {
                break;
            }
            let Some(caps) = ENUM_RE.captures(&lines[k]) else {
                break;
            };
            let first = caps.get(4).map_or("", |m| m.as_str());
            let (body, next) = Self::item_lines(lines, k, first);
            list.push(self.list_item(&body));
            k = skip_blank(lines, next);
        }
        (vec![list.into()], k)
    }

    fn definition_list(&mut self, lines: &[String], i: usize) -> (Vec<Node>, usize) {
        let mut list = Element::page("list");
        let mut k = i;
        loop {
            let term = lines[k].as_str();
            let (body, next) = indented(lines, k + 1, 1);

            let mut parts = term.split(" : ");
            let mut label = Element::page("list-item-label")
                .with_children(self.inline.parse(parts.next().unwrap_or(term)));
            for classifier in parts {
                label.push(Element::page("span").with_child(format!(":{classifier}")));
            }
            let item = Element::page("list-item")
                .with_child(label)
                .with_child(Element::page("list-item-body").with_children(self.blocks(&body, None)));
            list.push(item);

            k = skip_blank(lines, next);
            let continues = k + 1 < lines.len()
                && indent_of(&lines[k]) == 0
                && !is_blank(&lines[k + 1])
                && indent_of(&lines[k + 1]) > 0
                && !lines[k].starts_with("..")
                && !BULLET_RE.is_match(&lines[k])
                && enumeration(&lines[k]).is_none()
                && !FIELD_RE.is_match(&lines[k]);
            if !continues {
                break;
            }
        }
        (vec![list.into()], k)
    }

    fn field_list(&mut self, lines: &[String], i: usize) -> (Vec<Node>, usize) {
        let mut body = Element::page("table-body");
        let mut k = i;
        while k < lines.len() {
            let Some(caps) = FIELD_RE.captures(&lines[k]) else {
                break;
            };
            let name = caps.get(1).map_or("", |m| m.as_str()).to_string();
            let first = caps.get(2).map_or("", |m| m.as_str());
            let (field, next) = Self::item_lines(lines, k, first);
            let row = Element::page("table-row")
                .with_child(
                    Element::page("table-cell")
                        .with_child(Element::page("strong").with_children(self.inline.parse(&name))),
                )
                .with_child(Element::page("table-cell").with_children(self.cell_content(&field)));
            body.push(row);
            k = skip_blank(lines, next);
        }
        let table = Element::page("table")
            .with_page_attr(attr::CLASS, "moin-rst-fieldlist")
            .with_child(body);
        (vec![table.into()], k)
    }

    fn line_block(&mut self, lines: &[String], i: usize) -> (Vec<Node>, usize) {
        let mut block = Element::page("line-block");
        let mut k = i;
        let mut current: Option<String> = None;
        while k < lines.len() {
            let line = lines[k].as_str();
            if line == "|" || line.starts_with("| ") {
                if let Some(text) = current.take() {
                    block.push(Element::page("line-blk").with_children(self.inline.parse(&text)));
                }
                current = Some(line[1..].trim().to_string());
            } else if !is_blank(line) && indent_of(line) > 0 && current.is_some() {
                if let Some(text) = current.as_mut() {
                    text.push(' ');
                    text.push_str(line.trim());
                }
            } else {
                break;
            }
            k += 1;
        }
        if let Some(text) = current {
            block.push(Element::page("line-blk").with_children(self.inline.parse(&text)));
        }
        (vec![block.into()], k)
    }

    /// Cell bodies: a lone paragraph is unwrapped into its inline content.
    fn cell_content(&mut self, lines: &[String]) -> Vec<Node> {
        let mut nodes = self.blocks(&dedent(lines), None);
        if nodes.len() == 1 {
            if let Some(p) = nodes[0].as_element().filter(|e| e.is_page("p")) {
                let children = p.children.clone();
                nodes = children;
            }
        }
        nodes
    }

    fn grid_table(&mut self, lines: &[String], i: usize) -> (Vec<Node>, usize) {
        let mut end = i;
        while end < lines.len() && (lines[end].starts_with('+') || lines[end].starts_with('|')) {
            end += 1;
        }
        let rows: Vec<Vec<char>> = lines[i..end].iter().map(|l| l.chars().collect()).collect();
        let bounds: Vec<usize> = rows[0]
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == '+')
            .map(|(pos, _)| pos)
            .collect();

        struct OpenCell {
            col: usize,
            span: usize,
            start_row: usize,
            text: Vec<String>,
        }
        struct GridCell {
            row: usize,
            col: usize,
            colspan: usize,
            rowspan: usize,
            text: Vec<String>,
        }

        let segment = |line: &[char], from: usize, to: usize| -> String {
            let to = to.min(line.len());
            if from >= to {
                return String::new();
            }
            line[from..to].iter().collect()
        };

        let mut open: Vec<OpenCell> = Vec::new();
        let mut cells: Vec<GridCell> = Vec::new();
        let mut row = 0;
        let mut header_rows = None;
        for line in &rows[1..] {
            if line.first() == Some(&'|') {
                let mut c = 0;
                while c + 1 < bounds.len() {
                    let mut m = c + 1;
                    while m + 1 < bounds.len() && line.get(bounds[m]) != Some(&'|') {
                        m += 1;
                    }
                    let text = segment(line, bounds[c] + 1, bounds[m]);
                    match open.iter_mut().find(|cell| cell.col == c) {
                        Some(cell) => cell.text.push(text),
                        None => open.push(OpenCell {
                            col: c,
                            span: m - c,
                            start_row: row,
                            text: vec![text],
                        }),
                    }
                    c = m;
                }
                continue;
            }
            let mut still_open = Vec::new();
            for cell in open.drain(..) {
                let to = bounds.get(cell.col + cell.span).copied().unwrap_or(line.len());
                let border = segment(line, bounds[cell.col] + 1, to);
                if border.chars().all(|c| matches!(c, '-' | '=' | '+')) {
                    cells.push(GridCell {
                        row: cell.start_row,
                        col: cell.col,
                        colspan: cell.span,
                        rowspan: row - cell.start_row + 1,
                        text: cell.text,
                    });
                } else {
                    still_open.push(cell);
                }
            }
            open = still_open;
            row += 1;
            if line.contains(&'=') && header_rows.is_none() {
                header_rows = Some(row);
            }
        }
        for cell in open {
            cells.push(GridCell {
                row: cell.start_row,
                col: cell.col,
                colspan: cell.span,
                rowspan: row.saturating_sub(cell.start_row).max(1),
                text: cell.text,
            });
        }
        cells.sort_by_key(|cell| (cell.row, cell.col));

        let mut table_rows: Vec<Element> = (0..row).map(|_| Element::page("table-row")).collect();
        for cell in cells {
            let mut elem = Element::page("table-cell").with_children(self.cell_content(&cell.text));
            if cell.colspan > 1 {
                elem.set_page_attr(attr::COLSPAN, cell.colspan.to_string());
            }
            if cell.rowspan > 1 {
                elem.set_page_attr(attr::ROWSPAN, cell.rowspan.to_string());
            }
            if let Some(target) = table_rows.get_mut(cell.row) {
                target.push(elem);
            }
        }
        (vec![assemble_table(table_rows, header_rows).into()], end)
    }

    fn simple_table(&mut self, lines: &[String], i: usize) -> (Vec<Node>, usize) {
        let border: Vec<char> = lines[i].chars().collect();
        let mut columns: Vec<(usize, usize)> = Vec::new();
        let mut pos = 0;
        while pos < border.len() {
            if border[pos] == '=' {
                let start = pos;
                while pos < border.len() && border[pos] == '=' {
                    pos += 1;
                }
                columns.push((start, pos));
            } else {
                pos += 1;
            }
        }

        let split = |line: &str| -> Vec<String> {
            let chars: Vec<char> = line.chars().collect();
            columns
                .iter()
                .enumerate()
                .map(|(index, (start, end))| {
                    let stop = if index + 1 == columns.len() { chars.len() } else { *end };
                    let from = (*start).min(chars.len());
                    let to = stop.min(chars.len()).max(from);
                    chars[from..to].iter().collect::<String>().trim().to_string()
                })
                .collect()
        };

        let mut header: Option<Vec<Vec<String>>> = None;
        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut k = i + 1;
        while k < lines.len() {
            let line = lines[k].as_str();
            if SIMPLE_BORDER_RE.is_match(line) {
                k += 1;
                if header.is_none() && k < lines.len() && !is_blank(&lines[k]) {
                    header = Some(std::mem::take(&mut rows));
                    continue;
                }
                break;
            }
            if is_blank(line) {
                k += 1;
                continue;
            }
            let cells = split(line);
            match rows.last_mut() {
                Some(last) if cells.first().is_some_and(String::is_empty) => {
                    for (target, extra) in last.iter_mut().zip(cells) {
                        if !extra.is_empty() {
                            target.push('\n');
                            target.push_str(&extra);
                        }
                    }
                }
                _ => rows.push(cells),
            }
            k += 1;
        }

        let header_count = header.as_ref().map(Vec::len);
        let mut table_rows = Vec::new();
        for cells in header.into_iter().flatten().chain(rows) {
            let mut row = Element::page("table-row");
            for text in cells {
                let content: Vec<String> = text.lines().map(str::to_string).collect();
                row.push(Element::page("table-cell").with_children(self.cell_content(&content)));
            }
            table_rows.push(row);
        }
        (vec![assemble_table(table_rows, header_count).into()], k)
    }

    fn explicit(&mut self, lines: &[String], i: usize) -> (Vec<Node>, usize) {
        let rest = lines[i].strip_prefix("..").unwrap_or("").trim_start();
        let (body, next) = indented(lines, i + 1, 1);

        if let Some(caps) = TARGET_RE.captures(rest) {
            let name = caps.get(1).or(caps.get(2)).map_or("", |m| m.as_str());
            let uri = join_uri(caps.get(3).map_or("", |m| m.as_str()), &body);
            if uri.is_empty() && name != "_" {
                let anchor = Element::page("span").with_page_attr(attr::ID, make_id(name));
                return (vec![anchor.into()], next);
            }
            return (Vec::new(), next);
        }
        if FOOTNOTE_DEF_RE.is_match(rest) || SUBSTITUTION_DEF_RE.is_match(rest) {
            return (Vec::new(), next);
        }
        if let Some(caps) = DIRECTIVE_RE.captures(rest) {
            let name = caps.get(1).map_or("", |m| m.as_str()).to_lowercase();
            let first = caps.get(2).map_or("", |m| m.as_str());
            let block = DirectiveBlock::split(first, &body, takes_arguments(&name));
            let source = lines[i..next].join("\n");
            return (self.directive(&name, block, &source), next);
        }

        let mut comment = rest.to_string();
        for line in &body {
            if !comment.is_empty() {
                comment.push('\n');
            }
            comment.push_str(line);
        }
        let div = Element::page("div")
            .with_page_attr(attr::CLASS, "comment dashed")
            .with_child(comment);
        (vec![div.into()], next)
    }

    fn directive(&mut self, name: &str, block: DirectiveBlock, source: &str) -> Vec<Node> {
        match name {
            "image" => {
                let uri: String = block.arguments.split_whitespace().collect();
                vec![image(&uri, &block.options).into()]
            }
            "figure" => {
                let uri: String = block.arguments.split_whitespace().collect();
                let mut figure = Element::page("figure")
                    .with_page_attr(attr::CLASS, "moin-figure")
                    .with_child(image(&uri, &block.options));
                let mut content = self.blocks(&block.content, None).into_iter();
                if let Some(first) = content.next() {
                    match first {
                        Node::Element(p) if p.is_page("p") => {
                            figure.push(Element::page("figcaption").with_children(p.children));
                        }
                        other => figure.push(other),
                    }
                }
                figure.children.extend(content);
                vec![figure.into()]
            }
            "code" | "code-block" | "sourcecode" => {
                let language = block.arguments.split_whitespace().next().unwrap_or("");
                vec![code_block(&block.text(), language).into()]
            }
            "contents" => {
                let mut toc = Element::page("table-of-content");
                if let Some(depth) = block.option("depth").filter(|d| !d.is_empty()) {
                    toc.set_page_attr(attr::OUTLINE_LEVEL, depth);
                }
                vec![toc.into()]
            }
            "macro" => {
                let text = block.arguments.trim();
                let inner = text
                    .strip_prefix("<<")
                    .and_then(|t| t.strip_suffix(">>"))
                    .unwrap_or(text);
                let (macro_name, args) = match inner.split_once('(') {
                    Some((macro_name, args)) => (macro_name, Some(args.strip_suffix(')').unwrap_or(args))),
                    None => (inner, None),
                };
                let written = format!("<<{inner}>>");
                MacroResolver::new(&PlainText)
                    .resolve(macro_name.trim(), args, &written, true)
                    .into_iter()
                    .collect()
            }
            "include" => {
                let path = block.arguments.trim();
                let written = format!("<<Include({path})>>");
                MacroResolver::new(&PlainText)
                    .resolve("Include", Some(path), &written, true)
                    .into_iter()
                    .collect()
            }
            "parser" => {
                let (parser_name, rest) = match block.arguments.trim().split_once(' ') {
                    Some((parser_name, rest)) => (parser_name, Some(rest)),
                    None => (block.arguments.trim(), None),
                };
                let args = rest.map(Arguments::parse);
                vec![parser_part(parser_name, args.as_ref(), vec![Node::Text(block.text())]).into()]
            }
            "raw" => {
                tracing::warn!(kind = %block.arguments, "raw content is not supported");
                vec![
                    error_paragraph("Raw content is not supported.").into(),
                    Element::page("blockcode").with_child(block.text()).into(),
                ]
            }
            "admonition" => {
                let title = Element::page("p")
                    .with_page_attr(attr::CLASS, "moin-title")
                    .with_children(self.inline.parse(&block.arguments));
                let admonition = Element::page("admonition")
                    .with_page_attr("type", "attention")
                    .with_child(title)
                    .with_children(self.blocks(&block.content, None));
                vec![admonition.into()]
            }
            "topic" | "sidebar" => {
                let class = if name == "topic" { "moin-aside" } else { "moin-aside moin-sidebar" };
                let title = Element::page("p")
                    .with_page_attr(attr::CLASS, "moin-title")
                    .with_children(self.inline.parse(&block.arguments));
                let div = Element::page("div")
                    .with_page_attr(attr::CLASS, class)
                    .with_child(title)
                    .with_children(self.blocks(&block.content, None));
                vec![div.into()]
            }
            "rubric" => vec![Element::page("p")
                .with_page_attr(attr::CLASS, "moin-title moin-rubric")
                .with_children(self.inline.parse(&block.arguments))
                .into()],
            _ if ADMONITIONS.contains(&name) => {
                let admonition = Element::page("admonition")
                    .with_page_attr("type", name)
                    .with_children(self.blocks(&block.content, None));
                vec![admonition.into()]
            }
            _ => {
                tracing::warn!(directive = name, "unknown directive");
                vec![
                    error_paragraph(&format!("Unknown directive type \"{name}\".")).into(),
                    Element::page("blockcode").with_child(source).into(),
                ]
            }
        }
    }
}

fn error_paragraph(message: &str) -> Element {
    Element::page("p")
        .with_page_attr(attr::CLASS, "moin-error")
        .with_child(message)
}

/// `table` with the first `header_rows` rows in `table-header`.
fn assemble_table(rows: Vec<Element>, header_rows: Option<usize>) -> Element {
    let mut table = Element::page("table");
    let mut rows = rows.into_iter();
    if let Some(count) = header_rows.filter(|count| *count > 0) {
        table.push(Element::page("table-header").with_children(rows.by_ref().take(count)));
    }
    table.push(Element::page("table-body").with_children(rows));
    table
}
