//! Document tree to MoinMoin wiki markup
//!
//! A tag-dispatch walk over the tree. How a paragraph is written depends on
//! where it sits: at top level paragraphs are separated by blank lines, inside
//! a table cell or a list item a following paragraph becomes `<<BR>>`. The
//! walker keeps a small context stack for that, next to the name of the element
//! it closed last.

use crate::common::links::unquote;
use crate::common::nowiki::NowikiBlock;
use crate::error::ConvertError;
use crate::ir::names::{attr, Namespace, QName};
use crate::ir::{Element, Node};
use once_cell::sync::Lazy;
use regex::Regex;

const LINK_OPEN: &str = "[[";
const LINK_CLOSE: &str = "]]";
const OBJECT_OPEN: &str = "{{";
const OBJECT_CLOSE: &str = "}}";
const SAMP_OPEN: &str = "{{{";
const SAMP_CLOSE: &str = "}}}";
const MONOSPACE: &str = "`";
const STRONG: &str = "'''";
const EMPHASIS: &str = "''";
const UNDERLINE: &str = "__";
const STROKE_OPEN: &str = "--(";
const STROKE_CLOSE: &str = ")--";
const LARGER_OPEN: &str = "~+";
const LARGER_CLOSE: &str = "+~";
const SMALLER_OPEN: &str = "~-";
const SMALLER_CLOSE: &str = "-~";
const TABLE_MARKER: &str = "||";
const TABLE_SECTION: &str = "=====\n";
const LINE_BREAK: &str = "<<BR>>";
const DEFINITION: &str = "::";
const SEPARATOR: &str = "----";

/// Html attributes a link writes back into its parameter field, sorted.
const LINK_PARAMS: &[&str] = &["accesskey", "class", "download", "target", "title"];

/// Html attributes an object writes back, sorted.
const OBJECT_PARAMS: &[&str] = &["class", "height", "width"];

static QUERY_TERM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w+=\w+").expect("query term pattern"));

static CLOSE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\}+").expect("brace run pattern"));

/// Brace count of a fence around `text`: three, or one more than the longest
/// run of closing braces inside.
pub fn fence_len(text: &str) -> usize {
    CLOSE_RUN_RE
        .find_iter(text)
        .map(|run| run.len() + 1)
        .fold(3, usize::max)
}

/// Marker written for items of a list with the given label attributes.
fn list_marker(generate: Option<&str>, style: Option<&str>) -> &'static str {
    match (generate, style) {
        (Some("ordered"), None) => "1.",
        (Some("ordered"), Some("lower-alpha")) => "a.",
        (Some("ordered"), Some("upper-alpha")) => "A.",
        (Some("ordered"), Some("lower-roman")) => "i.",
        (Some("ordered"), Some("upper-roman")) => "I.",
        (Some("unordered"), None) => "*",
        (Some("unordered"), Some("no-bullet")) => ".",
        (None, None) => DEFINITION,
        _ => "",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Text,
    Paragraph,
    List,
    Table,
}

/// Table level settings, written into the first cell that follows them.
#[derive(Debug, Default)]
struct TableState {
    class: String,
    style: String,
    caption: String,
    row_class: String,
    row_style: String,
    next_body: &'static str,
}

/// Serialize a `page` tree into moinwiki markup.
pub fn serialize(doc: &Element) -> Result<String, ConvertError> {
    let mut out = MoinWikiSerializer::new().visit(doc)?;
    while out.contains("\n\n\n") {
        out = out.replace("\n\n\n", "\n\n");
    }
    let out = out.trim_start_matches('\n').trim_end_matches('\n');
    if out.is_empty() {
        return Ok(String::new());
    }
    Ok(format!("{out}\n"))
}

struct MoinWikiSerializer {
    context: Vec<Context>,
    last_closed: Option<String>,
    /// Item markers of the open lists, innermost last
    labels: Vec<String>,
    item_label: String,
    table: TableState,
}

impl MoinWikiSerializer {
    fn new() -> Self {
        MoinWikiSerializer {
            context: vec![Context::Text],
            last_closed: None,
            labels: vec![String::new()],
            item_label: String::new(),
            table: TableState::default(),
        }
    }

    fn context(&self) -> Context {
        self.context.last().copied().unwrap_or(Context::Text)
    }

    fn in_list(&self) -> bool {
        self.context
            .iter()
            .rev()
            .find(|c| **c != Context::Paragraph)
            .is_some_and(|c| *c == Context::List)
    }

    /// Leading blanks of an item at the current list depth.
    fn indent(&self) -> String {
        let outer = &self.labels[..self.labels.len().saturating_sub(1)];
        let width: usize = outer.iter().map(|label| label.len()).sum::<usize>() + outer.len();
        " ".repeat(width)
    }

    fn children(&mut self, elem: &Element) -> Result<String, ConvertError> {
        let mut out = String::new();
        for child in &elem.children {
            match child {
                Node::Element(child) => out.push_str(&self.visit(child)?),
                Node::Text(text) => {
                    if self.context() == Context::Text && self.last_closed.as_deref() == Some("p") {
                        out.push('\n');
                    }
                    if self.in_list() && text.contains('\n') {
                        out.push_str(&text.replace('\n', &format!("\n{}", self.indent())));
                    } else {
                        out.push_str(text);
                    }
                    self.last_closed = Some("text".to_string());
                }
            }
        }
        Ok(out)
    }

    fn visit(&mut self, elem: &Element) -> Result<String, ConvertError> {
        match elem.name.ns {
            Namespace::Page => {}
            Namespace::Xinclude if elem.name.local == "include" => return self.object(elem),
            _ => return self.children(elem),
        }
        let name = elem.name.local.as_str();
        let out = match name {
            "a" => self.link(elem)?,
            "blockcode" => blockcode(elem),
            "block-comment" => block_comment(elem),
            "blockquote" => self.blockquote(elem)?,
            "body" => self.body(elem)?,
            "caption" => String::new(),
            "code" => [MONOSPACE, &elem.text_content(), MONOSPACE].concat(),
            "del" | "s" => [STROKE_OPEN, &self.children(elem)?, STROKE_CLOSE].concat(),
            "div" if elem.page_attr(attr::CLASS) == Some("moin-p") => self.include_block(elem)?,
            "div" => format!("\n\n{}\n\n", self.children(elem)?),
            "emphasis" => [EMPHASIS, &self.children(elem)?, EMPHASIS].concat(),
            "h" => self.heading(elem)?,
            "inline-part" => {
                let mut out = self.part(elem, false)?;
                if out.ends_with('\n') {
                    out.pop();
                }
                out
            }
            "ins" | "u" => [UNDERLINE, &self.children(elem)?, UNDERLINE].concat(),
            "line-break" => LINE_BREAK.to_string(),
            "list" => self.list(elem)?,
            "list-item" => {
                self.item_label = format!("{} ", self.labels.last().map_or("", String::as_str));
                self.children(elem)?
            }
            "list-item-label" => self.item_label(elem)?,
            "list-item-body" => self.item_body(elem)?,
            "note" => self.note(elem)?,
            "nowiki" => self.nowiki(elem)?,
            "object" => self.object(elem)?,
            "p" => self.paragraph(elem)?,
            "page" => self.page(elem)?,
            "part" => self.part(elem, true)?,
            "samp" => [SAMP_OPEN, &elem.text_content(), SAMP_CLOSE].concat(),
            "separator" => separator(elem)?,
            "span" => self.span(elem)?,
            "strong" => [STRONG, &self.children(elem)?, STRONG].concat(),
            "table" => self.table(elem)?,
            "table-body" => {
                let section = self.table.next_body;
                let rows = self.children(elem)?;
                self.table.next_body = TABLE_SECTION;
                format!("{section}{rows}")
            }
            "table-cell" => self.table_cell(elem)?,
            "table-footer" => format!("{TABLE_SECTION}{}", self.children(elem)?),
            "table-header" => format!("{}{TABLE_SECTION}", self.children(elem)?),
            "table-of-content" => format!(
                "<<TableOfContents({})>>\n",
                elem.page_attr(attr::OUTLINE_LEVEL).unwrap_or("")
            ),
            "table-row" => self.table_row(elem)?,
            _ => return self.children(elem),
        };
        self.last_closed = Some(name.to_string());
        Ok(out)
    }

    fn link(&mut self, elem: &Element) -> Result<String, ConvertError> {
        let href = elem.attr(&QName::xlink("href")).unwrap_or("");
        let mut params: Vec<String> = LINK_PARAMS
            .iter()
            .filter_map(|key| {
                elem.attr(&QName::html(key))
                    .filter(|value| !value.is_empty())
                    .map(|value| format!("{key}=\"{value}\""))
            })
            .collect();

        let (rest, fragment) = match href.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (href, None),
        };
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };
        let mut target = match path.strip_prefix("wiki://") {
            Some(interwiki) => unquote(&interwiki.replacen('/', ":", 1)),
            None => unquote(path.strip_prefix("wiki.local:").unwrap_or(path)),
        };
        match query {
            Some(query) if query.starts_with('&') => {
                params.extend(QUERY_TERM_RE.find_iter(query).map(|m| format!("&{}", m.as_str())));
            }
            Some(query) if !query.is_empty() => {
                target.push('?');
                target.push_str(query);
            }
            _ => {}
        }
        if let Some(fragment) = fragment {
            target.push('#');
            target.push_str(fragment);
        }

        let mut text = self.children(elem)?;
        if text == target || format!("{text}#") == target {
            text.clear();
        }
        let inner = format!("{target}|{text}|{}", params.join(","));
        Ok([LINK_OPEN, inner.trim_end_matches('|'), LINK_CLOSE].concat())
    }

    fn blockquote(&mut self, elem: &Element) -> Result<String, ConvertError> {
        let text = self.children(elem)?;
        let text = text.trim().replace("\n\n", "\n\n    . ");
        let lines: Vec<String> = text
            .split(LINE_BREAK)
            .map(|line| format!("    . {line}"))
            .collect();
        Ok(format!("\n\n{}\n\n", lines.join("\n")))
    }

    fn body(&mut self, elem: &Element) -> Result<String, ConvertError> {
        let class = elem.page_attr(attr::CLASS).unwrap_or("").replace(' ', "/");
        let lead = if !class.is_empty() {
            format!(" {class}\n")
        } else if self.context.len() > 2 {
            "\n".to_string()
        } else {
            String::new()
        };
        Ok(format!("{lead}{}", self.children(elem)?))
    }

    fn heading(&mut self, elem: &Element) -> Result<String, ConvertError> {
        let level = match elem.page_attr(attr::OUTLINE_LEVEL) {
            Some(level) => level.trim().parse::<i64>().map_err(|_| {
                ConvertError::Serialization(format!("outline-level '{level}' is not an integer"))
            })?,
            None => 1,
        };
        let marker = "=".repeat(level.clamp(1, 6) as usize);
        let text = self.children(elem)?;
        Ok(format!("\n{marker} {text} {marker}\n"))
    }

    fn list(&mut self, elem: &Element) -> Result<String, ConvertError> {
        let marker = list_marker(
            elem.page_attr(attr::ITEM_LABEL_GENERATE),
            elem.page_attr(attr::LIST_STYLE_TYPE),
        );
        self.labels.push(marker.to_string());
        let lead = if self.context() != Context::Text || self.last_closed.is_some() {
            "\n"
        } else {
            ""
        };
        self.context.push(Context::List);
        self.last_closed = None;
        let mut items = self.children(elem)?;
        if let Some(start) = elem.page_attr(attr::LIST_START) {
            if let Some((head, tail)) = items.split_once('.') {
                items = format!("{head}.#{start}{tail}");
            }
        }
        self.labels.pop();
        self.context.pop();
        let tail = if self.context() == Context::List { "" } else { "\n" };
        Ok(format!("{lead}{items}{tail}"))
    }

    fn item_label(&mut self, elem: &Element) -> Result<String, ConvertError> {
        let mut lead = String::new();
        let current = self.labels.last().map_or("", String::as_str);
        if current.is_empty() || current == DEFINITION {
            if let Some(last) = self.labels.last_mut() {
                *last = DEFINITION.to_string();
            }
            self.item_label = format!("{DEFINITION} ");
            lead = self.indent();
            if self.last_closed.is_some() {
                lead.insert(0, '\n');
            }
        }
        Ok(format!("{lead}{}{DEFINITION}", self.children(elem)?))
    }

    fn item_body(&mut self, elem: &Element) -> Result<String, ConvertError> {
        let lead = if self.last_closed.as_deref() == Some("list-item-label") {
            " ".to_string()
        } else {
            let newline = if self.last_closed.is_some() { "\n" } else { "" };
            format!("{newline}{}{}", self.indent(), self.item_label)
        };
        Ok(format!("{lead}{}", self.children(elem)?))
    }

    fn note(&mut self, elem: &Element) -> Result<String, ConvertError> {
        if elem.page_attr(attr::NOTE_CLASS) == Some("footnote") {
            return Ok(format!("<<FootNote({})>>", self.children(elem)?));
        }
        Ok("\n<<FootNote()>>\n".to_string())
    }

    fn nowiki(&mut self, elem: &Element) -> Result<String, ConvertError> {
        match NowikiBlock::from_element(elem) {
            Some(block) => {
                let open = "{".repeat(block.marker_len);
                let close = "}".repeat(block.marker_len);
                Ok(format!(
                    "\n{open}{}\n{}\n{close}\n",
                    block.directive, block.content
                ))
            }
            // already expanded into a tree
            None => self.children(elem),
        }
    }

    fn object(&mut self, elem: &Element) -> Result<String, ConvertError> {
        let href = elem
            .attr(&QName::xlink("href"))
            .or_else(|| elem.attr(&QName::xinclude("href")))
            .map(unquote)
            .unwrap_or_default();
        if let Some(xpointer) = elem.attr(&QName::xinclude("xpointer")) {
            return Ok(include_macro(Some(xpointer), &href));
        }

        let (path, query) = match href.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (href.as_str(), None),
        };
        let path = path.strip_prefix("wiki.local:").unwrap_or(path);
        let alt = match elem.children.first() {
            Some(Node::Text(text)) => text.as_str(),
            _ => elem.attr(&QName::html(attr::ALT)).unwrap_or(""),
        };

        let mut params: Vec<String> = query
            .map(|query| {
                QUERY_TERM_RE
                    .find_iter(query)
                    .map(|m| m.as_str())
                    .filter(|term| !term.starts_with("do="))
                    .map(|term| format!("&{term}"))
                    .collect()
            })
            .unwrap_or_default();
        params.extend(OBJECT_PARAMS.iter().filter_map(|key| {
            elem.attr(&QName::html(key))
                .map(|value| format!("{key}=\"{value}\""))
        }));

        let inner = format!("{path}|{alt}|{}", params.join(" "));
        Ok([OBJECT_OPEN, inner.trim_end_matches('|'), OBJECT_CLOSE].concat())
    }

    /// A block-level Include keeps its macro form.
    fn include_block(&mut self, elem: &Element) -> Result<String, ConvertError> {
        let mut out = String::new();
        for child in &elem.children {
            match child {
                Node::Element(include) if include.name == QName::xinclude("include") => {
                    let href = include
                        .attr(&QName::xinclude("href"))
                        .map(unquote)
                        .unwrap_or_default();
                    out.push_str(&include_macro(include.attr(&QName::xinclude("xpointer")), &href));
                }
                Node::Element(other) => out.push_str(&self.visit(other)?),
                Node::Text(text) => out.push_str(text),
            }
        }
        Ok(format!("\n\n{out}\n\n"))
    }

    fn paragraph(&mut self, elem: &Element) -> Result<String, ConvertError> {
        if elem
            .page_attr(attr::CLASS)
            .is_some_and(|class| class.contains("moin-error"))
        {
            return Ok(String::new());
        }
        let parent = self.context();
        let last = self.last_closed.clone();
        self.context.push(Context::Paragraph);
        let out = match parent {
            Context::Text => {
                let lead = match last.as_deref() {
                    Some("text") => "\n\n",
                    Some(_) => "\n",
                    None => "",
                };
                format!("{lead}{}\n", self.children(elem)?)
            }
            Context::Table => {
                let follows = last
                    .as_deref()
                    .is_some_and(|name| name != "table-cell" && name != "table-row");
                let lead = if follows { LINE_BREAK } else { "" };
                format!("{lead}{}", self.children(elem)?)
            }
            Context::List => {
                let follows = last.as_deref().is_some_and(|name| {
                    !matches!(
                        name,
                        "list-item" | "list-item-header" | "list-item-footer" | "list-item-label"
                    )
                });
                let lead = if follows { LINE_BREAK } else { "" };
                format!("{lead}{}", self.children(elem)?)
            }
            Context::Paragraph => self.children(elem)?,
        };
        self.context.pop();
        Ok(out)
    }

    fn page(&mut self, elem: &Element) -> Result<String, ConvertError> {
        self.last_closed = None;
        let nested = self.context.len() > 1;
        self.context.push(Context::Text);
        let content = self.children(elem)?;
        self.context.pop();
        if !nested {
            return Ok(content);
        }
        let len = fence_len(&content);
        Ok(format!(
            "{}#!wiki{content}{}\n",
            "{".repeat(len),
            "}".repeat(len)
        ))
    }

    fn part(&mut self, elem: &Element, block: bool) -> Result<String, ConvertError> {
        let content_type = elem.page_attr(attr::CONTENT_TYPE).unwrap_or("");
        if let Some((major, name)) = content_type.split_once(';') {
            let name = name.split_once('=').map_or("", |(_, value)| value);
            if major == "x-moin/macro" {
                tracing::debug!(name, "macro reference");
                let eol = if block { "\n\n" } else { "" };
                let args = elem
                    .elements()
                    .next()
                    .filter(|first| first.is_page("arguments"))
                    .map(Element::text_content)
                    .unwrap_or_default();
                return Ok(format!("{eol}<<{name}({args})>>{eol}"));
            }
            if major == "x-moin/format" {
                let mut out = format!("{SAMP_OPEN}#!{name}");
                let mut body = String::new();
                for child in elem.elements() {
                    if child.is_page("arguments") {
                        let args: Vec<String> = child
                            .elements()
                            .filter(|arg| arg.is_page("argument"))
                            .map(|arg| match arg.page_attr("name") {
                                Some(key) => format!("{key}=\"{}\"", arg.text_content()),
                                None => format!("\"{}\"", arg.text_content()),
                            })
                            .collect();
                        out.push_str(&format!("({})", args.join(" ")));
                    } else {
                        body = child.text_content();
                    }
                }
                return Ok(format!("{out}\n{body}\n{SAMP_CLOSE}\n"));
            }
        }
        Ok(format!("{}\n", elem.page_attr(attr::ALT).unwrap_or("")))
    }

    fn span(&mut self, elem: &Element) -> Result<String, ConvertError> {
        if elem.page_attr(attr::CLASS) == Some("comment") {
            return Ok(format!("/* {} */", self.children(elem)?));
        }
        if let Some(size) = elem.page_attr(attr::FONT_SIZE).filter(|s| !s.is_empty()) {
            let (open, close) = if size == "120%" {
                (LARGER_OPEN, LARGER_CLOSE)
            } else {
                (SMALLER_OPEN, SMALLER_CLOSE)
            };
            return Ok([open, &self.children(elem)?, close].concat());
        }
        match elem.page_attr(attr::BASELINE_SHIFT) {
            Some("super") => Ok(format!("^{}^", elem.text_content())),
            Some("sub") => Ok(format!(",,{},,", elem.text_content())),
            _ => self.children(elem),
        }
    }

    fn table(&mut self, elem: &Element) -> Result<String, ConvertError> {
        let class = elem
            .page_attr(attr::CLASS)
            .unwrap_or("")
            .replace("moin-wiki-table", "");
        self.table = TableState {
            class: class.trim().to_string(),
            style: elem.page_attr(attr::STYLE).unwrap_or("").to_string(),
            caption: elem
                .elements()
                .next()
                .filter(|first| first.is_page("caption"))
                .map(Element::text_content)
                .unwrap_or_default(),
            ..TableState::default()
        };
        self.context.push(Context::Table);
        self.last_closed = None;
        let rows = self.children(elem)?;
        self.context.pop();
        Ok(format!("\n{rows}\n"))
    }

    fn table_row(&mut self, elem: &Element) -> Result<String, ConvertError> {
        self.table.row_class = elem.page_attr(attr::CLASS).unwrap_or("").to_string();
        self.table.row_style = elem.page_attr(attr::STYLE).unwrap_or("").to_string();
        let cells = self.children(elem)?;
        self.table.row_class.clear();
        self.table.row_style.clear();
        Ok(format!("{cells}{TABLE_MARKER}\n"))
    }

    fn table_cell(&mut self, elem: &Element) -> Result<String, ConvertError> {
        let mut attributes: Vec<String> = Vec::new();
        let pending = [
            ("tableclass", std::mem::take(&mut self.table.class)),
            ("tablestyle", std::mem::take(&mut self.table.style)),
            ("caption", std::mem::take(&mut self.table.caption)),
            ("rowclass", std::mem::take(&mut self.table.row_class)),
            ("rowstyle", std::mem::take(&mut self.table.row_style)),
        ];
        for (key, value) in pending {
            if !value.is_empty() {
                attributes.push(format!("{key}=\"{value}\""));
            }
        }
        for (key, name) in [("class", attr::CLASS), ("style", attr::STYLE), ("rowspan", attr::ROWSPAN)] {
            if let Some(value) = elem.page_attr(name).filter(|v| !v.is_empty()) {
                attributes.push(format!("{key}=\"{value}\""));
            }
        }
        let colspan = elem
            .page_attr(attr::COLSPAN)
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(1);
        if colspan > 1 {
            attributes.push(format!("colspan=\"{colspan}\""));
        }

        let mut out = TABLE_MARKER.to_string();
        if !attributes.is_empty() {
            out.push_str(&format!("<{}>", attributes.join(" ")));
        }
        out.push_str(&self.children(elem)?);
        Ok(out)
    }
}

fn blockcode(elem: &Element) -> String {
    let text = elem.text_content();
    let len = fence_len(&text);
    format!("\n{}\n{text}\n{}\n\n", "{".repeat(len), "}".repeat(len))
}

fn block_comment(elem: &Element) -> String {
    let lines: Vec<&str> = elem.children.iter().filter_map(Node::as_text).collect();
    format!("\n\n{}\n\n", lines.join("\n"))
}

fn separator(elem: &Element) -> Result<String, ConvertError> {
    let mut dashes = String::new();
    if let Some(height) = elem
        .page_attr(attr::CLASS)
        .and_then(|class| class.strip_prefix("moin-hr"))
    {
        let height = height.parse::<usize>().map_err(|_| {
            ConvertError::Serialization(format!("separator has invalid class moin-hr{height}"))
        })?;
        if (1..=6).contains(&height) {
            dashes = "-".repeat(height - 1);
        }
    }
    Ok(format!("{SEPARATOR}{dashes}\n"))
}

/// Split `name(value) name(value)` terms, honouring `^` escapes inside values.
fn xpointer_terms(query: &str) -> Vec<(String, String)> {
    let mut terms = Vec::new();
    let mut chars = query.chars().peekable();
    while chars.peek().is_some() {
        let name: String = chars
            .by_ref()
            .skip_while(|c| c.is_whitespace())
            .take_while(|c| *c != '(')
            .collect();
        let mut value = String::new();
        while let Some(c) = chars.next() {
            match c {
                '^' => {
                    if let Some(escaped) = chars.next() {
                        value.push(escaped);
                    }
                }
                ')' => break,
                c => value.push(c),
            }
        }
        if !name.is_empty() {
            terms.push((name, value));
        }
    }
    terms
}

/// `<<Include(...)>>` written back from an include target and its xpointer.
fn include_macro(xpointer: Option<&str>, href: &str) -> String {
    let query = xpointer
        .and_then(|xpointer| xpointer.split_once("page:include("))
        .map(|(_, query)| query.strip_suffix(')').unwrap_or(query))
        .unwrap_or("");
    let terms = xpointer_terms(query);
    let term = |key: &str| {
        terms
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    };

    let mut item = href.rsplit(':').next().unwrap_or("").to_string();
    if item.is_empty() {
        item = term("pages").unwrap_or("").to_string();
    }
    let mut params = format!(",{},{}", term("heading").unwrap_or(""), term("level").unwrap_or(""));
    for key in ["sort", "items", "skipitems"] {
        if let Some(value) = term(key) {
            params.push_str(&format!(",{key}=\"{value}\""));
        }
    }
    format!("<<Include({item}{})>>", params.trim_end_matches(','))
}
