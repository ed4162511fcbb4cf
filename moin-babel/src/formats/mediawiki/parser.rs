//! MediaWiki → document tree
//!
//! Every line is first checked for a list prefix (`*`, `#`, `:` and `;`
//! combinations). A list line closes or reuses open lists by depth and type
//! and carries exactly one item; a plain line closes any open list. What is
//! left of the line is a block: heading, separator, `{|` table or paragraph
//! text.
//!
//! Literal tags (`<nowiki>`, `<pre>`, `<code>`, `<tt>`) may span lines; the
//! lines up to the closing tag are joined before inline parsing.

use super::inline::{literal_tags, InlineRule, Literal, Scanner, Token, DESCRIPTION_RULES, MEDIAWIKI_RULES};
use crate::common::args::Arguments;
use crate::common::cursor::{LineCursor, LineSource};
use crate::common::links::{quote_iri, scheme_of, urlencode, wiki_local};
use crate::common::stack::{BuildStack, FrameInfo};
use crate::common::text::decode_entity;
use crate::format::ParseContext;
use crate::formats::moinwiki::parser::emph_strong;
use crate::ir::names::attr;
use crate::ir::{Element, QName};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static LIST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?P<indent>[*#:]*)",
        r"(?:(?P<definition>;)\s*|(?P<numbers>#)\s+|(?P<bullet>\*)\s+|(?P<none>:)\s+)",
        r"(?P<text>.*?)$",
    ))
    .expect("list pattern")
});

static SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*-{4,}\s*$").expect("separator pattern"));

static TABLE_BEGIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{\|\s*(.*?)$").expect("table pattern"));

static TABLE_END_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\|\}\s*$").expect("table end pattern"));

static CELL_ARGS_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\|\s*").expect("cell split pattern"));

static TABLE_ARG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:([-\w]+)=)?(?:([-\w]+)|"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)')"#)
        .expect("table argument pattern")
});

static LINK_ARG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:([\w-]+)=)?(?:([-\w\s:./<>]+)|"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)')"#)
        .expect("link argument pattern")
});

/// Attributes a table or cell may take.
const TABLE_ATTRIBUTES: &[&str] = &[attr::CLASS, attr::STYLE, attr::COLSPAN, attr::ROWSPAN];

/// Arguments of tables and cells: `key=value`, `key="value"`, `key='value'`.
/// `colspan` and `rowspan` come out under their tree attribute names.
pub fn parse_table_args(input: &str) -> Arguments {
    let mut args = Arguments::new();
    for caps in TABLE_ARG_RE.captures_iter(input) {
        let Some(value) = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4)) else {
            continue;
        };
        let value = value.as_str().replace("\\\"", "\"").replace("\\'", "'");
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
    }
    args
}

/// Arguments of `[[target|...]]`, separated by `|`. Unquoted values may hold
/// spaces, `:`, `.`, `/`, `<` and `>`.
pub fn parse_link_args(input: &str) -> Arguments {
    let mut args = Arguments::new();
    for caps in LINK_ARG_RE.captures_iter(input) {
        let Some(value) = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4)) else {
            continue;
        };
        let value = value.as_str().to_string();
        match caps.get(1) {
            Some(key) => {
                args.keyword.insert(key.as_str().to_string(), value);
            }
            None => args.positional.push(value),
        }
    }
    args
}

/// `== text ==` with the same number of `=` on both sides.
fn heading(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim();
    let lead = trimmed.len() - trimmed.trim_start_matches('=').len();
    (1..=lead).rev().find_map(|level| {
        let inner = &trimmed[level..];
        let marker = &trimmed[..level];
        if inner.len() >= level && inner.ends_with(marker) {
            Some((level.min(6), inner[..inner.len() - level].trim()))
        } else {
            None
        }
    })
}

/// The first literal tag in `text` that is opened and not closed.
fn unclosed_literal(text: &str) -> Option<&'static str> {
    let mut pos = 0;
    loop {
        let (start, open, close) = literal_tags()
            .filter_map(|(open, close)| text[pos..].find(open).map(|at| (pos + at, open, close)))
            .min_by_key(|(at, _, _)| *at)?;
        let after = start + open.len();
        match text[after..].find(close) {
            Some(len) => pos = after + len + close.len(),
            None => return Some(close),
        }
    }
}

/// The list a prefix asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Ordered,
    Unordered,
    Definition,
    /// `:` indentation
    Indent,
}

impl ListKind {
    fn key(self) -> &'static str {
        match self {
            ListKind::Ordered => "ordered",
            ListKind::Unordered => "unordered",
            ListKind::Definition => "definition",
            ListKind::Indent => "indent",
        }
    }

    fn element(self) -> Element {
        let list = Element::page("list");
        match self {
            ListKind::Ordered => list.with_page_attr(attr::ITEM_LABEL_GENERATE, "ordered"),
            ListKind::Unordered => list.with_page_attr(attr::ITEM_LABEL_GENERATE, "unordered"),
            ListKind::Definition => list,
            ListKind::Indent => list
                .with_page_attr(attr::ITEM_LABEL_GENERATE, "unordered")
                .with_page_attr(attr::LIST_STYLE_TYPE, "no-bullet"),
        }
    }
}

/// Parser for MediaWiki documents.
pub struct MediaWikiParser<'c, 'a> {
    ctx: &'c ParseContext<'a>,
}

impl<'c, 'a> MediaWikiParser<'c, 'a> {
    pub fn new(ctx: &'c ParseContext<'a>) -> Self {
        MediaWikiParser { ctx }
    }

    /// Parse a whole document into `page/body`.
    ///
    /// The body takes the `style` argument; `_old=a/b` becomes class `a b`.
    pub fn parse(&self, source: &str) -> Element {
        let text = source.replace("\r\n", "\n");
        let mut cursor = LineCursor::from_text(&text);

        let mut body = Element::page("body");
        if let Some(style) = self.ctx.arguments.get(attr::STYLE) {
            body.set_page_attr(attr::STYLE, style);
        }
        if let Some(old) = self.ctx.arguments.get("_old") {
            body.set_page_attr(attr::CLASS, old.replace('/', " "));
        }

        let mut stack = BuildStack::new(body).with_line_numbers(self.ctx.host.add_lineno);
        while let Some(line) = cursor.advance() {
            stack.set_lineno(cursor.lineno());
            match LIST_RE.captures(line) {
                Some(caps) => {
                    let indent = caps.name("indent").map_or("", |m| m.as_str());
                    let kind = if caps.name("definition").is_some() {
                        ListKind::Definition
                    } else if caps.name("numbers").is_some() {
                        ListKind::Ordered
                    } else if caps.name("bullet").is_some() {
                        ListKind::Unordered
                    } else {
                        ListKind::Indent
                    };
                    let text = caps.name("text").map_or("", |m| m.as_str());
                    self.list_item(indent.len(), kind, text, &mut cursor, &mut stack);
                }
                None => {
                    if stack.frames().any(|(elem, _)| elem.is_page("list")) {
                        stack.clear();
                    }
                    self.parse_block(line, &mut cursor, &mut stack);
                }
            }
        }
        tracing::trace!(lines = cursor.lineno(), "parsed mediawiki text");
        Element::document(stack.into_root())
    }

    fn list_item<'s>(
        &self,
        level: usize,
        kind: ListKind,
        text: &'s str,
        cursor: &mut LineCursor<'s>,
        stack: &mut BuildStack,
    ) {
        let key = Some(kind.key().to_string());
        while stack.len() > 1 {
            let info = stack.top_info();
            let stop = match stack.top_name() {
                Some("list-item-body") => level > info.level,
                Some("list") => level >= info.level && key == info.kind,
                _ => false,
            };
            if stop {
                break;
            }
            stack.pop();
        }

        if !stack.top_check(&["list"]) {
            stack.push_with(kind.element(), FrameInfo { level, kind: key.clone() });
        }
        stack.push(Element::page("list-item"));

        let mut body_text = text;
        if kind == ListKind::Definition {
            // `;term:definition`
            let (term, definition) = text.split_once(':').unwrap_or((text, ""));
            let mut label = BuildStack::new(Element::page("list-item-label"));
            self.parse_inline(term, &mut label, MEDIAWIKI_RULES);
            stack.top_append(label.into_root());
            body_text = definition;
        }

        stack.push_with(Element::page("list-item-body"), FrameInfo { level, kind: key });
        if !body_text.is_empty() {
            self.parse_block(body_text, cursor, stack);
        }
    }

    fn parse_block<'s>(&self, line: &'s str, cursor: &mut LineCursor<'s>, stack: &mut BuildStack) {
        if line.trim().is_empty() {
            stack.clear();
            return;
        }

        if let Some(caps) = TABLE_BEGIN_RE.captures(line) {
            let args = caps.get(1).map_or("", |m| m.as_str());
            self.parse_table(args, cursor, stack);
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
            stack.top_append(Element::page("separator"));
            return;
        }

        if stack.top_check(&["body", "list-item-body"]) {
            stack.push(Element::page("p"));
        } else {
            stack.top_append("\n");
        }
        let text = self.gather_literal(line, cursor);
        self.parse_inline(&text, stack, MEDIAWIKI_RULES);
    }

    /// Join following lines while a literal tag in `line` is still open.
    fn gather_literal<'s>(&self, line: &'s str, cursor: &mut LineCursor<'s>) -> Cow<'s, str> {
        let Some(close) = unclosed_literal(line) else {
            return Cow::Borrowed(line);
        };
        let mut text = line.to_string();
        while let Some(next) = cursor.advance() {
            text.push('\n');
            text.push_str(next);
            if next.contains(close) {
                break;
            }
        }
        Cow::Owned(text)
    }

    fn parse_table<'s>(&self, args: &str, cursor: &mut LineCursor<'s>, stack: &mut BuildStack) {
        stack.clear();
        let mut table = Element::page("table");
        apply_table_args(&mut table, args);
        stack.push(table);
        stack.push(Element::page("table-body"));

        while let Some(line) = cursor.advance() {
            stack.set_lineno(cursor.lineno());
            if TABLE_END_RE.is_match(line) {
                break;
            }
            let (marker, rest) = match line.chars().next() {
                Some(c @ ('|' | '!')) => (c, &line[1..]),
                _ => {
                    // continuation of the open cell
                    if stack.top_check(&["table-cell"]) {
                        self.parse_inline(&format!("\n{line}"), stack, MEDIAWIKI_RULES);
                    }
                    continue;
                }
            };
            if let Some(caption) = rest.strip_prefix('+') {
                self.table_caption(caption, stack);
            } else if rest.starts_with('-') {
                while stack.top_check(&["table-cell", "table-row"]) {
                    stack.pop();
                }
            } else {
                let separator = if marker == '!' { "!!" } else { "||" };
                for cell in rest.split(separator) {
                    self.table_cell(cell, marker == '!', stack);
                }
            }
        }
        stack.pop_name(&["table"]);
    }

    fn table_caption(&self, caption: &str, stack: &mut BuildStack) {
        let mut element = BuildStack::new(Element::page("caption"));
        self.parse_inline(caption.trim(), &mut element, MEDIAWIKI_RULES);
        let caption = element.into_root();
        if let Some(table) = stack.find_mut("table") {
            table.children.insert(0, caption.into());
        }
    }

    fn table_cell(&self, cell: &str, head: bool, stack: &mut BuildStack) {
        if stack.top_check(&["table-cell"]) {
            stack.pop();
        }
        if !stack.top_check(&["table-row"]) {
            stack.push(Element::page("table-row"));
        }
        let mut element = Element::page("table-cell");
        if head {
            element.set_page_attr(attr::CLASS, "moin-thead");
        }
        let parts: Vec<&str> = CELL_ARGS_SPLIT_RE.splitn(cell, 2).collect();
        let text = match parts.as_slice() {
            [args, text] if !args.contains("[[") => {
                apply_table_args(&mut element, args);
                *text
            }
            _ => cell,
        };
        stack.push(element);
        self.parse_inline(text.trim(), stack, MEDIAWIKI_RULES);
    }

    fn parse_inline(&self, text: &str, stack: &mut BuildStack, rules: &'static [InlineRule]) {
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
            Token::WikiLink { target, args } => self.wiki_link(target, args, stack),
            Token::ExternalLink { url, text } => {
                stack.push(Element::page("a").with_attr(QName::xlink("href"), quote_iri(url)));
                stack.top_append_text(text);
                stack.pop_name(&["a"]);
            }
            Token::LineBreak => stack.top_append(Element::page("line-break")),
            Token::BlockquoteBegin => stack.push(Element::page("blockquote")),
            Token::BlockquoteEnd => close_open(stack, "blockquote"),
            Token::Literal { kind, text } => {
                let name = match kind {
                    Literal::Code => "code",
                    Literal::Block => "blockcode",
                };
                if !text.is_empty() || kind == Literal::Code {
                    stack.top_append(Element::page(name).with_child(text));
                }
            }
            Token::EmphStrong { len, follow } => emph_strong(stack, len, follow),
            Token::FootnoteBegin => {
                stack.push(Element::page("note").with_page_attr(attr::NOTE_CLASS, "footnote"));
                stack.push(Element::page("note-body"));
            }
            Token::FootnoteEnd => close_open(stack, "note"),
            Token::Tag { name, close: false } => stack.push(Element::page(name)),
            Token::Tag { name, close: true } => close_open(stack, name),
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
            Token::Entity(entity) => stack.top_append(decode_entity(entity).to_string()),
        }
    }

    /// `[[Item#frag|k=v|caption]]`, or `[[File:name|...]]` for an embedded file.
    fn wiki_link(&self, target: &str, args: &str, stack: &mut BuildStack) {
        let mut args = parse_link_args(args.strip_prefix('|').unwrap_or(args));
        let caption = args.positional.pop();

        if let Some(file) = target.strip_prefix("File:") {
            if !args.contains("do") {
                args.keyword.insert("do".to_string(), "get".to_string());
            }
            let query = urlencode(args.keyword.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            let caption = caption.unwrap_or_else(|| file.to_string());
            let element = Element::page("object")
                .with_attr(QName::xlink("href"), wiki_local(file, Some(&query), None))
                .with_page_attr(attr::ALT, caption.as_str());
            stack.push(element);
            self.parse_inline(&caption, stack, DESCRIPTION_RULES);
            stack.pop_name(&["object"]);
            return;
        }

        let query = (!args.keyword.is_empty())
            .then(|| urlencode(args.keyword.iter().map(|(k, v)| (k.as_str(), v.as_str()))));
        let href = match scheme_of(target) {
            Some(scheme) if self.ctx.host.allows_scheme(Scanner::DIALECT, scheme) => quote_iri(target),
            _ => {
                let (path, fragment) = match target.rsplit_once('#') {
                    Some((path, fragment)) => (path, Some(fragment)),
                    None => (target, None),
                };
                wiki_local(path, query.as_deref(), fragment)
            }
        };

        stack.push(Element::page("a").with_attr(QName::xlink("href"), href));
        match caption.filter(|c| !c.is_empty()) {
            Some(caption) => self.parse_inline(&caption, stack, DESCRIPTION_RULES),
            None => stack.top_append(target),
        }
        stack.pop_name(&["a"]);
    }
}

fn apply_table_args(element: &mut Element, args: &str) {
    let args = parse_table_args(args);
    for (key, value) in &args.keyword {
        if TABLE_ATTRIBUTES.contains(&key.as_str()) {
            element.set_page_attr(key, value.as_str());
        }
    }
}

/// Close the innermost open `name` element and everything above it.
fn close_open(stack: &mut BuildStack, name: &str) {
    if stack.find_mut(name).is_some() {
        stack.pop_name(&[name]);
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

    fn convert(input: &str) -> String {
        let registry = ConverterRegistry::new();
        let host = HostConfig::default();
        let ctx = ParseContext::new(&registry, &host, Type::parse("text/x-mediawiki").unwrap());
        to_fragment(&MediaWikiParser::new(&ctx).parse(input))
    }

    fn body(inner: &str) -> String {
        format!("<page><body>{inner}</body></page>")
    }

    #[rstest]
    #[case("''italic''", "<p><emphasis>italic</emphasis></p>")]
    #[case("Text\nTest", "<p>Text\nTest</p>")]
    #[case("Text\n\nTest", "<p>Text</p><p>Test</p>")]
    #[case("a\nb\nc", "<p>a\nb\nc</p>")]
    #[case("'''bold'''", "<p><strong>bold</strong></p>")]
    #[case(
        "'''''bold and italic'''''",
        "<p><strong><emphasis>bold and italic</emphasis></strong></p>"
    )]
    #[case(
        "<nowiki>no ''markup''</nowiki>\n\n<code>no ''markup''</code>\n\n<tt>no ''markup''</tt>",
        "<p><code>no ''markup''</code></p><p><code>no ''markup''</code></p><p><code>no ''markup''</code></p>"
    )]
    #[case("<pre>no ''markup'' block</pre>", "<p><blockcode>no ''markup'' block</blockcode></p>")]
    #[case("<pre>line one\n\nline ''two''</pre>", "<p><blockcode>line one\n\nline ''two''</blockcode></p>")]
    #[case("<u>underlined</u>", "<p><u>underlined</u></p>")]
    #[case("<ins>inserted</ins>", "<p><ins>inserted</ins></p>")]
    #[case("<del>Strikethrough</del>", "<p><del>Strikethrough</del></p>")]
    #[case("<s>Strikethrough</s>", "<p><s>Strikethrough</s></p>")]
    #[case(
        "test <sup>super</sup> or <sub>sub</sub>",
        "<p>test <span baseline-shift=\"super\">super</span> or <span baseline-shift=\"sub\">sub</span></p>"
    )]
    #[case(
        "text <blockquote> quote quote </blockquote> text",
        "<p>text <blockquote> quote quote </blockquote> text</p>"
    )]
    #[case("aaa<br />bbb", "<p>aaa<line-break />bbb</p>")]
    #[case(
        "aaa <ref> sdf </ref> test\n\n asd",
        "<p>aaa <note note-class=\"footnote\"><note-body> sdf </note-body></note> test</p><p> asd</p>"
    )]
    #[case("[javascript:alert('xss')]", "<p>[javascript:alert('xss')]</p>")]
    #[case("caf&eacute; &#x41;", "<p>café A</p>")]
    #[case("----", "<separator />")]
    fn basic_blocks(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(convert(input), body(expected));
    }

    #[test]
    fn headings() {
        let input = "=level 1=\n== level 2 ==\n===level 3===\n====level 4====\n=====level 5=====\n======level 6======\n";
        let expected: String = (1..=6)
            .map(|n| format!("<h outline-level=\"{n}\">level {n}</h>"))
            .collect();
        assert_eq!(convert(input), body(&expected));
        assert_eq!(convert("==a="), body("<h outline-level=\"1\">=a</h>"));
    }

    fn list(kind: &str, items: &str) -> String {
        format!("<list item-label-generate=\"{kind}\">{items}</list>")
    }

    fn item(inner: &str) -> String {
        format!("<list-item><list-item-body>{inner}</list-item-body></list-item>")
    }

    fn p(text: &str) -> String {
        format!("<p>{text}</p>")
    }

    #[test]
    fn nested_bullets() {
        let nested = list("unordered", &(item(&p("three point one")) + &item(&p("three point two"))));
        let expected = list(
            "unordered",
            &(item(&p("one")) + &item(&p("two")) + &item(&(p("three") + &nested))),
        );
        assert_eq!(
            convert("* one\n* two\n* three\n** three point one\n** three point two\n"),
            body(&expected)
        );
    }

    #[test]
    fn numbered_list_ends_at_plain_text() {
        let nested = list("ordered", &(item(&p("three point one")) + &item(&p("three point two"))));
        let expected = list(
            "ordered",
            &(item(&p("one"))
                + &item(&p("two<line-break />spanning<line-break />lines"))
                + &item(&(p("three") + &nested))
                + &item(&p("4"))),
        ) + &p("no point");
        assert_eq!(
            convert("# one\n# two<br />spanning<br />lines\n# three\n## three point one\n## three point two\n# 4\nno point\n"),
            body(&expected)
        );
    }

    #[test]
    fn definition_lists() {
        assert_eq!(
            convert(";item 1:definition 1\n;item 2:definition 2\n"),
            body(concat!(
                "<list>",
                "<list-item><list-item-label>item 1</list-item-label><list-item-body><p>definition 1</p></list-item-body></list-item>",
                "<list-item><list-item-label>item 2</list-item-label><list-item-body><p>definition 2</p></list-item-body></list-item>",
                "</list>"
            ))
        );
        assert_eq!(
            convert(";aaa : bbb"),
            body("<list><list-item><list-item-label>aaa </list-item-label><list-item-body><p> bbb</p></list-item-body></list-item></list>")
        );
    }

    #[test]
    fn mixed_nesting() {
        let inner = list("unordered", &(item(&p("two point one")) + &item(&p("two point two"))));
        let definition = "<list><list-item><list-item-label>three item one</list-item-label><list-item-body><p>three def one</p></list-item-body></list-item></list>";
        let expected = list(
            "ordered",
            &(item(&p("one")) + &item(&(p("two") + &inner)) + &item(&(p("three") + definition))),
        );
        assert_eq!(
            convert("# one\n# two\n#* two point one\n#* two point two\n# three\n#; three item one:three def one\n"),
            body(&expected)
        );
    }

    #[test]
    fn indentation_lists() {
        let indent = |items: &str| {
            format!("<list item-label-generate=\"unordered\" list-style-type=\"no-bullet\">{items}</list>")
        };
        let expected = indent(&item(&(p("Single indent") + &indent(&item(&p("Double indent"))))));
        assert_eq!(convert(": Single indent\n:: Double indent\n"), body(&expected));
    }

    fn row(cells: &[&str]) -> String {
        let cells: String = cells.iter().map(|c| format!("<table-cell>{c}</table-cell>")).collect();
        format!("<table-row>{cells}</table-row>")
    }

    #[test]
    fn simple_table() {
        let input = "{|\n|Orange\n|Apple\n|-\n|Bread\n|Pie\n|-\n|Butter\n|Ice cream\n|}\n";
        let rows = row(&["Orange", "Apple"]) + &row(&["Bread", "Pie"]) + &row(&["Butter", "Ice cream"]);
        assert_eq!(
            convert(input),
            body(&format!("<table><table-body>{rows}</table-body></table>"))
        );
    }

    #[test]
    fn table_attributes_and_continuation() {
        let input = "{|style=\"border-width: 1px;\"\n|style=\"border-style: solid\" colspan=\"2\"| Orange\nApple\n|-\n|rowspan='2'| Bread\n|Pie\n|}\n";
        let expected = concat!(
            "<table style=\"border-width: 1px;\"><table-body>",
            "<table-row><table-cell style=\"border-style: solid\" number-columns-spanned=\"2\">Orange\nApple</table-cell></table-row>",
            "<table-row><table-cell number-rows-spanned=\"2\">Bread</table-cell><table-cell>Pie</table-cell></table-row>",
            "</table-body></table>"
        );
        assert_eq!(convert(input), body(expected));
    }

    #[test]
    fn inline_cells_caption_and_headers() {
        let input = "{|\n|+ Fruit\n! Name !! Color\n|-\n|class=\"test\"|text||style=\"border:1px\"|test\n|}";
        let expected = concat!(
            "<table><caption>Fruit</caption><table-body>",
            "<table-row><table-cell class=\"moin-thead\">Name</table-cell><table-cell class=\"moin-thead\">Color</table-cell></table-row>",
            "<table-row><table-cell class=\"test\">text</table-cell><table-cell style=\"border:1px\">test</table-cell></table-row>",
            "</table-body></table>"
        );
        assert_eq!(convert(input), body(expected));
    }

    #[rstest]
    #[case("[[SomeLink]]", "<a xlink:href=\"wiki.local:SomeLink\">SomeLink</a>")]
    #[case("[[SomeLink|Some text]]", "<a xlink:href=\"wiki.local:SomeLink\">Some text</a>")]
    #[case("[[Page#Part|x]]", "<a xlink:href=\"wiki.local:Page#Part\">x</a>")]
    #[case(
        "[[SomeLink|arg1=value|arg2=otherval|Some text]]",
        "<a xlink:href=\"wiki.local:SomeLink?arg1=value&amp;arg2=otherval\">Some text</a>"
    )]
    #[case("[http://external.link]", "<a xlink:href=\"http://external.link\" />")]
    #[case("[http://external.link alt text]", "<a xlink:href=\"http://external.link\">alt text</a>")]
    #[case(
        "[[File:Test.jpg|test]]",
        "<object xlink:href=\"wiki.local:Test.jpg?do=get\" alt=\"test\">test</object>"
    )]
    #[case(
        "[[File:MyImage.png]]",
        "<object xlink:href=\"wiki.local:MyImage.png?do=get\" alt=\"MyImage.png\">MyImage.png</object>"
    )]
    #[case(
        "[[File:Test.png|do=get|arg1=test|arg2=something else]]",
        "<object xlink:href=\"wiki.local:Test.png?do=get&amp;arg1=test&amp;arg2=something+else\" alt=\"Test.png\">Test.png</object>"
    )]
    #[case(
        "[[File:Test2.png|do=xxx|caption|arg1=test]]",
        "<object xlink:href=\"wiki.local:Test2.png?do=xxx&amp;arg1=test\" alt=\"caption\">caption</object>"
    )]
    #[case(
        "[[File:myimg.png|'Graph showing width |= k for 5 < k < 10']]",
        "<object xlink:href=\"wiki.local:myimg.png?do=get\" alt=\"Graph showing width |= k for 5 &lt; k &lt; 10\">Graph showing width |= k for 5 &lt; k &lt; 10</object>"
    )]
    fn links(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(convert(input), body(&p(expected)));
    }

    #[test]
    fn link_arguments() {
        let args = parse_link_args("arg1='longish value with |= to test'|arg2=other|test stuff");
        assert_eq!(args.get("arg1"), Some("longish value with |= to test"));
        assert_eq!(args.get("arg2"), Some("other"));
        assert_eq!(args.positional, vec!["test stuff".to_string()]);
    }

    #[test]
    fn table_arguments_map_spans() {
        let args = parse_table_args("colspan=2 rowspan='3' class=x");
        assert_eq!(args.get(attr::COLSPAN), Some("2"));
        assert_eq!(args.get(attr::ROWSPAN), Some("3"));
        assert_eq!(args.get("class"), Some("x"));
    }
}
