//! Fenced sub-languages
//!
//! Wiki parsers keep a `{{{#!name args` block they cannot handle themselves as a
//! `nowiki` element holding the fence length, the raw directive and the raw
//! content. [`expand`] later replaces that content with the tree of the named
//! sub-language: highlighted source, a CSV table, or the document another
//! dialect parses from it. A directive nobody understands degrades to plain
//! highlighted text preceded by an error box.

use crate::common::args::Arguments;
use crate::common::text::split_lines;
use crate::format::ParseContext;
use crate::formats::csv::csv_table;
use crate::formats::highlight::{highlight_block, lexer_by_name, plain_lexer};
use crate::ir::names::attr;
use crate::ir::{Element, Node};
use crate::mime::Type;
use crate::registry::Converter;
use once_cell::sync::Lazy;
use regex::Regex;

/// Old parser names that are really highlighter lexers.
const LEGACY_LEXERS: &[&str] = &["diff", "cplusplus", "python", "java", "pascal", "irc"];

static DELIMITER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"delimiter=(.?)").expect("delimiter pattern"));

/// The parts of a `nowiki` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowikiBlock {
    /// Number of braces (or backticks) of the opening fence
    pub marker_len: usize,
    /// Text after the opening fence, `#!name args` or empty
    pub directive: String,
    pub content: String,
}

impl NowikiBlock {
    pub fn new(marker_len: usize, directive: &str, content: &str) -> Self {
        NowikiBlock {
            marker_len,
            directive: directive.to_string(),
            content: content.to_string(),
        }
    }

    /// `nowiki(marker_len, nowiki-args(directive), content)`
    pub fn to_element(&self) -> Element {
        let mut args = Element::page("nowiki-args");
        args.push_text(&self.directive);
        let mut elem = Element::page("nowiki")
            .with_child(self.marker_len.to_string())
            .with_child(args);
        elem.push_text(&self.content);
        elem
    }

    pub fn from_element(elem: &Element) -> Option<Self> {
        if !elem.is_page("nowiki") {
            return None;
        }
        let mut children = elem.children.iter();
        let marker_len = children.next()?.as_text()?.trim().parse().ok()?;
        let directive = match children.next()? {
            Node::Element(args) if args.is_page("nowiki-args") => args.text_content(),
            _ => return None,
        };
        let content: String = children.filter_map(Node::as_text).collect();
        Some(NowikiBlock {
            marker_len,
            directive,
            content,
        })
    }

    /// `(name, rest)` of a `#!name rest` or `#!name(rest)` directive.
    pub fn interpreter(&self) -> Option<(&str, Option<&str>)> {
        let interpreter = self.directive.trim().strip_prefix("#!")?.trim_start();
        let end = interpreter
            .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '/' | '.' | '-')))
            .unwrap_or(interpreter.len());
        if end == 0 {
            return None;
        }
        let rest = interpreter[end..].trim();
        let rest = rest
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'))
            .unwrap_or(rest);
        Some((&interpreter[..end], (!rest.is_empty()).then_some(rest)))
    }
}

fn invalid_arguments(directive: &str) -> Element {
    let message = format!(
        "Defaulting to plain text due to invalid arguments: \"{directive}\""
    );
    Element::page("div")
        .with_page_attr(attr::CLASS, "error")
        .with_child(Element::page("p").with_child(message))
}

fn plain_fallback(block: &NowikiBlock) -> Vec<Node> {
    tracing::warn!(directive = %block.directive, "invalid nowiki directive");
    vec![
        invalid_arguments(&block.directive).into(),
        highlight_block(&block.content, plain_lexer()).into(),
    ]
}

/// CSV delimiter from `delimiter=X` or a one-character first argument.
pub fn csv_delimiter(args: Option<&str>) -> char {
    let Some(args) = args else {
        return ';';
    };
    if let Some(c) = DELIMITER_RE
        .captures(args)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().chars().next())
    {
        return c;
    }
    let first = args.split_whitespace().next().unwrap_or("");
    let mut chars = first.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => ';',
    }
}

fn dialect_type(name: &str) -> Option<Type> {
    let content_type = match name {
        "wiki" | "text/x.moin.wiki" => Type::moin_wiki(),
        "creole" | "text/x.moin.creole" => Type::moin_creole(),
        "rst" | "text/x-rst" => Type::new(Some("text"), Some("x-rst")),
        "docbook" | "application/docbook+xml" => Type::new(Some("application"), Some("docbook+xml")),
        "markdown" | "text/x-markdown" => Type::new(Some("text"), Some("x-markdown")),
        "mediawiki" | "text/x-mediawiki" => Type::new(Some("text"), Some("x-mediawiki")),
        "html" | "HTML" | "text/html" => Type::new(Some("text"), Some("html")),
        _ => return None,
    };
    Some(content_type)
}

/// Arguments for a nested wiki body: positional words become classes.
fn wiki_arguments(rest: Option<&str>) -> Arguments {
    let mut args = rest.map(Arguments::parse).unwrap_or_default();
    if !args.positional.is_empty() {
        let classes = args.positional.join(" ");
        args.keyword.insert("class".to_string(), classes);
    }
    args.positional.clear();
    args
}

fn parse_nested(ctx: &ParseContext<'_>, content_type: Type, args: Arguments, content: &str) -> Option<Element> {
    let document = Type::moin_document();
    match ctx.registry.get(&content_type, &document, &args) {
        Some(Converter::Parser(parser)) => {
            let nested = ctx.nested(content_type, args);
            match parser.parse(content, &nested) {
                Ok(page) => Some(page),
                Err(err) => {
                    tracing::warn!(error = %err, "nested parse failed");
                    None
                }
            }
        }
        _ => None,
    }
}

/// The new children of a `nowiki` element.
pub fn expand(block: &NowikiBlock, ctx: &ParseContext<'_>) -> Vec<Node> {
    if block.directive.trim().is_empty() {
        return vec![Element::page("blockcode").with_child(block.content.as_str()).into()];
    }
    let Some((name, rest)) = block.interpreter() else {
        return plain_fallback(block);
    };

    let (name, rest) = if LEGACY_LEXERS.contains(&name) {
        let rest = match rest {
            Some(rest) => format!("{name} {rest}"),
            None => name.to_string(),
        };
        ("highlight", Some(rest))
    } else {
        (name, rest.map(str::to_string))
    };
    tracing::debug!(name, "expanding nowiki");

    if name == "highlight" {
        let lexer = rest
            .as_deref()
            .and_then(|r| r.split_whitespace().next())
            .and_then(lexer_by_name);
        return match lexer {
            Some(lexer) => vec![highlight_block(&block.content, lexer).into()],
            None => plain_fallback(block),
        };
    }

    if name == "csv" || name == "text/csv" {
        let delimiter = csv_delimiter(rest.as_deref());
        let lines = split_lines(&block.content);
        return vec![csv_table(&lines, delimiter, "moin-csv-table moin-sortable").into()];
    }

    if let Some(content_type) = dialect_type(name) {
        let args = if content_type == Type::moin_wiki() {
            wiki_arguments(rest.as_deref())
        } else {
            rest.as_deref().map(Arguments::parse).unwrap_or_default()
        };
        if let Some(page) = parse_nested(ctx, content_type, args, &block.content) {
            return vec![page.into()];
        }
    }

    plain_fallback(block)
}
