//! Document tree → reStructuredText
//!
//! Blocks are rendered bottom-up into strings and indented as a whole when
//! they end up inside a list item, quote or directive. Links and images can't
//! carry their targets inline without noise, so they are written as
//! `` `text`_ `` and `|alt|` and the matching `.. _text:` and `.. |alt|`
//! definitions follow the top-level block that used them. Footnotes go to the
//! end of the document.

use crate::common::nowiki::NowikiBlock;
use crate::common::table::{colspan, GridSlot, TableGrid};
use crate::error::ConvertError;
use crate::ir::names::{attr, Namespace, QName};
use crate::ir::{Element, Node};
use std::collections::HashMap;

/// Overline characters by heading level; a blank means no overline.
const H_TOP: &[u8] = b" =     ";
const H_BOTTOM: &[u8] = b" ==-*:+";

const LOCAL_PREFIX: &str = "wiki.local:";

/// Serialize a `page` tree into reStructuredText.
pub fn serialize(doc: &Element) -> Result<String, ConvertError> {
    let mut writer = RstSerializer::default();
    let mut out = writer.top_level(doc)?;
    if !writer.footnotes.is_empty() {
        let notes: Vec<String> = writer
            .footnotes
            .iter()
            .map(|note| indent_rest(&format!(".. [#] {note}"), "   "))
            .collect();
        out.push_str("\n\n");
        out.push_str(&notes.join("\n"));
    }
    while out.contains("\n\n\n") {
        out = out.replace("\n\n\n", "\n\n");
    }
    let out = out.trim_matches('\n');
    if out.is_empty() {
        return Ok(String::new());
    }
    Ok(format!("{out}\n"))
}

/// Prefix every non-blank line.
fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| if line.trim().is_empty() { String::new() } else { format!("{prefix}{line}") })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prefix every non-blank line but the first.
fn indent_rest(text: &str, prefix: &str) -> String {
    match text.split_once('\n') {
        Some((first, rest)) => format!("{first}\n{}", indent(rest, prefix)),
        None => text.to_string(),
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '`' | '|') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn is_block(elem: &Element) -> bool {
    if elem.name.ns == Namespace::Xinclude {
        return false;
    }
    matches!(
        elem.page_name(),
        Some(
            "page"
                | "body"
                | "div"
                | "h"
                | "p"
                | "blockcode"
                | "nowiki"
                | "list"
                | "table"
                | "separator"
                | "blockquote"
                | "table-of-content"
                | "part"
                | "admonition"
                | "figure"
                | "line-block"
        )
    )
}

/// Strip the local prefix so item names read naturally.
fn display_href(href: &str) -> String {
    href.strip_prefix(LOCAL_PREFIX).unwrap_or(href).to_string()
}

fn image_href(elem: &Element) -> String {
    let href = elem
        .attr(&QName::xlink("href"))
        .or_else(|| elem.attr(&QName::xinclude("href")))
        .unwrap_or("");
    display_href(href)
}

fn image_options(elem: &Element) -> Vec<(&'static str, String)> {
    let mut options = Vec::new();
    for key in ["alt", "width", "height"] {
        if let Some(value) = elem.attr(&QName::html(key)) {
            options.push((key, value.to_string()));
        }
    }
    if let Some(align) = elem.attr(&QName::html("class")) {
        options.push(("align", align.to_string()));
    }
    options
}

#[derive(Debug, Default)]
struct RstSerializer {
    /// Link definitions waiting for the end of the current top-level block
    pending_links: Vec<(String, String)>,
    links: HashMap<String, String>,
    /// `.. |alt| image::` definitions waiting like the links
    pending_images: Vec<String>,
    images: HashMap<String, String>,
    footnotes: Vec<String>,
}

impl RstSerializer {
    fn top_level(&mut self, doc: &Element) -> Result<String, ConvertError> {
        let root = doc.find("body").unwrap_or(doc);
        let mut out = Vec::new();
        for block in self.block_nodes(&root.children)? {
            out.push(block);
            let mut definitions: Vec<String> = self
                .pending_links
                .drain(..)
                .map(|(text, href)| format!(".. _{}: {href}", target_name(&text)))
                .collect();
            definitions.append(&mut self.pending_images);
            if !definitions.is_empty() {
                out.push(definitions.join("\n"));
            }
        }
        Ok(out.join("\n\n"))
    }

    /// Render sibling nodes as blocks, wrapping inline runs into paragraphs.
    fn block_nodes(&mut self, nodes: &[Node]) -> Result<Vec<String>, ConvertError> {
        let mut blocks = Vec::new();
        let mut run: Vec<Node> = Vec::new();
        for node in nodes {
            match node {
                Node::Element(elem) if is_block(elem) => {
                    self.flush_run(&mut run, &mut blocks)?;
                    if let Some(block) = self.block(elem)? {
                        blocks.push(block);
                    }
                }
                Node::Element(elem) if elem.name.ns == Namespace::Xinclude || elem.is_page("object") => {
                    if run.iter().all(|n| n.as_text().is_some_and(|t| t.trim().is_empty())) {
                        run.clear();
                        blocks.push(self.image_directive("image", elem));
                    } else {
                        run.push(node.clone());
                    }
                }
                Node::Text(text) if run.is_empty() && text.trim().is_empty() => {}
                _ => run.push(node.clone()),
            }
        }
        self.flush_run(&mut run, &mut blocks)?;
        Ok(blocks)
    }

    fn flush_run(&mut self, run: &mut Vec<Node>, blocks: &mut Vec<String>) -> Result<(), ConvertError> {
        if run.is_empty() {
            return Ok(());
        }
        let text = self.inline(run)?;
        run.clear();
        if !text.trim().is_empty() {
            blocks.push(text.trim().to_string());
        }
        Ok(())
    }

    fn blocks_text(&mut self, nodes: &[Node]) -> Result<String, ConvertError> {
        Ok(self.block_nodes(nodes)?.join("\n\n"))
    }

    fn block(&mut self, elem: &Element) -> Result<Option<String>, ConvertError> {
        let name = elem.page_name().unwrap_or("");
        let class = elem.page_attr(attr::CLASS).unwrap_or("");
        let out = match name {
            "h" => self.heading(elem)?,
            "p" if class.contains("moin-rubric") => format!(".. rubric:: {}", self.inline(&elem.children)?),
            "p" => trim_paragraph(&self.inline(&elem.children)?).to_string(),
            "blockcode" => literal_block(&elem.text_content()),
            "nowiki" => match NowikiBlock::from_element(elem) {
                Some(block) => match block.interpreter() {
                    Some((name, args)) => {
                        let head = match args {
                            Some(args) => format!(".. parser:: {name} {args}"),
                            None => format!(".. parser:: {name}"),
                        };
                        format!("{head}\n\n{}", indent(&block.content, "   "))
                    }
                    None => literal_block(&block.content),
                },
                // already expanded into a tree
                None => self.blocks_text(&elem.children)?,
            },
            "separator" => "----".to_string(),
            "blockquote" => indent(&self.blocks_text(&elem.children)?, "  "),
            "list" => self.list(elem)?,
            "table" => self.table(elem)?,
            "table-of-content" => match elem.page_attr(attr::OUTLINE_LEVEL) {
                Some(depth) => format!(".. contents::\n   :depth: {depth}"),
                None => ".. contents::".to_string(),
            },
            "part" => self.part(elem)?,
            "admonition" => self.admonition(elem)?,
            "figure" => self.figure(elem)?,
            "line-block" => {
                let mut lines = Vec::new();
                for line in elem.elements() {
                    lines.push(format!("| {}", self.inline(&line.children)?).trim_end().to_string());
                }
                lines.join("\n")
            }
            "div" if class.split_whitespace().any(|c| c == "comment") => {
                let text = elem.text_content();
                format!("..\n{}", indent(text.trim_matches('\n'), "   "))
            }
            "div" if class.split_whitespace().any(|c| c == "moin-aside") => self.aside(elem, class)?,
            _ => self.blocks_text(&elem.children)?,
        };
        Ok((!out.trim().is_empty()).then_some(out))
    }

    fn heading(&mut self, elem: &Element) -> Result<String, ConvertError> {
        let level = elem
            .page_attr(attr::OUTLINE_LEVEL)
            .and_then(|l| l.parse::<usize>().ok())
            .unwrap_or(1)
            .clamp(1, 6);
        let title = self.inline(&elem.children)?.replace('\n', " ");
        let title = title.trim();
        let width = title.chars().count().max(2);
        let bottom = (H_BOTTOM[level] as char).to_string().repeat(width);
        Ok(match H_TOP[level] {
            b' ' => format!("{title}\n{bottom}"),
            top => format!("{}\n{title}\n{bottom}", (top as char).to_string().repeat(width)),
        })
    }

    fn list(&mut self, elem: &Element) -> Result<String, ConvertError> {
        let generate = elem.page_attr(attr::ITEM_LABEL_GENERATE);
        let mut items = Vec::new();
        let mut multiline = false;
        for (index, item) in elem.elements().filter(|e| e.is_page("list-item")).enumerate() {
            let body = match item.find("list-item-body") {
                Some(body) => self.blocks_text(&body.children)?,
                None => String::new(),
            };
            let out = match generate {
                None => {
                    let term = match item.find("list-item-label") {
                        Some(label) => self.inline(&label.children)?.replace('\n', " "),
                        None => String::new(),
                    };
                    multiline = true;
                    format!("{}\n{}", term.trim(), indent(&body, "   "))
                }
                Some(generate) => {
                    let marker = if generate == "ordered" {
                        ordered_marker(elem, index)
                    } else {
                        "*".to_string()
                    };
                    let pad = " ".repeat(marker.len() + 1);
                    multiline |= body.contains('\n');
                    indent_rest(&format!("{marker} {body}"), &pad)
                }
            };
            items.push(out.trim_end().to_string());
        }
        Ok(items.join(if multiline { "\n\n" } else { "\n" }))
    }

    fn table(&mut self, elem: &Element) -> Result<String, ConvertError> {
        let grid = TableGrid::from_table(elem);
        if grid.is_empty() {
            return Ok(String::new());
        }
        let columns = grid.width();

        // Cell text by (row, column) of the slot that starts the cell
        let mut texts: Vec<Vec<Option<(usize, Vec<String>)>>> = Vec::new();
        for row in &grid.rows {
            let mut cells = Vec::new();
            for slot in row {
                match slot {
                    GridSlot::Cell(cell) => {
                        let text = if cell.elements().any(is_block) {
                            self.blocks_text(&cell.children)?
                        } else {
                            self.inline(&cell.children)?
                        };
                        let lines = text.trim().lines().map(str::to_string).collect();
                        cells.push(Some((colspan(cell), lines)));
                    }
                    GridSlot::Empty => cells.push(None),
                }
            }
            texts.push(cells);
        }

        let mut widths = vec![1usize; columns];
        for row in &texts {
            for (col, cell) in row.iter().enumerate() {
                if let Some((1, lines)) = cell {
                    let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
                    widths[col] = widths[col].max(widest);
                }
            }
        }
        for row in &texts {
            for (col, cell) in row.iter().enumerate() {
                if let Some((span, lines)) = cell.as_ref().filter(|(span, _)| *span > 1) {
                    let end = (col + span).min(columns);
                    let available: usize = widths[col..end].iter().sum::<usize>() + 3 * (end - col - 1);
                    let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
                    if widest > available {
                        widths[end - 1] += widest - available;
                    }
                }
            }
        }

        let border = |fill: char| -> String {
            let mut line = String::from("+");
            for width in &widths {
                line.push_str(&fill.to_string().repeat(width + 2));
                line.push('+');
            }
            line
        };

        let mut out = vec![border('-')];
        for (index, row) in texts.iter().enumerate() {
            let height = row
                .iter()
                .flatten()
                .map(|(_, lines)| lines.len())
                .max()
                .unwrap_or(0)
                .max(1);
            for line_no in 0..height {
                let mut line = String::from("|");
                let mut col = 0;
                while col < columns {
                    let (span, text) = match &row[col] {
                        Some((span, lines)) => (*span, lines.get(line_no).map_or("", String::as_str)),
                        None => (1, ""),
                    };
                    let end = (col + span).min(columns);
                    let width: usize = widths[col..end].iter().sum::<usize>() + 3 * (end - col - 1);
                    let pad = width.saturating_sub(text.chars().count());
                    line.push_str(&format!(" {text}{} |", " ".repeat(pad)));
                    col = end;
                }
                out.push(line);
            }
            let header_end = grid.header_rows > 0 && index + 1 == grid.header_rows;
            out.push(border(if header_end { '=' } else { '-' }));
        }
        Ok(out.join("\n"))
    }

    fn part(&mut self, elem: &Element) -> Result<String, ConvertError> {
        let content_type = elem.page_attr(attr::CONTENT_TYPE).unwrap_or("");
        if let Some((major, name)) = content_type.split_once(';') {
            let name = name.split_once('=').map_or("", |(_, value)| value);
            if major == "x-moin/macro" {
                let alt = elem.page_attr(attr::ALT).map(str::to_string);
                let text = alt.unwrap_or_else(|| macro_text(name, elem));
                return Ok(format!(".. macro:: {text}"));
            }
            if major == "x-moin/format" {
                let mut head = format!(".. parser:: {name}");
                let mut body = String::new();
                for child in elem.elements() {
                    if child.is_page("arguments") {
                        for arg in child.elements().filter(|a| a.is_page("argument")) {
                            match arg.page_attr("name") {
                                Some(key) => head.push_str(&format!(" {key}=\"{}\"", arg.text_content())),
                                None => head.push_str(&format!(" {}", arg.text_content())),
                            }
                        }
                    } else {
                        body = child.text_content();
                    }
                }
                return Ok(format!("{head}\n\n{}", indent(&body, "   ")));
            }
        }
        self.blocks_text(&elem.children)
    }

    fn admonition(&mut self, elem: &Element) -> Result<String, ConvertError> {
        let kind = elem.page_attr("type").unwrap_or("note");
        let mut children: &[Node] = &elem.children;
        let mut head = format!(".. {kind}::");
        if let Some(Node::Element(first)) = children.first() {
            if first.is_page("p") && first.page_attr(attr::CLASS) == Some("moin-title") {
                head = format!(".. admonition:: {}", self.inline(&first.children)?);
                children = &children[1..];
            }
        }
        Ok(format!("{head}\n\n{}", indent(&self.blocks_text(children)?, "   ")))
    }

    fn aside(&mut self, elem: &Element, class: &str) -> Result<String, ConvertError> {
        let directive = if class.contains("moin-sidebar") { "sidebar" } else { "topic" };
        let mut children: &[Node] = &elem.children;
        let mut title = String::new();
        if let Some(Node::Element(first)) = children.first() {
            if first.is_page("p") && first.page_attr(attr::CLASS) == Some("moin-title") {
                title = self.inline(&first.children)?;
                children = &children[1..];
            }
        }
        Ok(format!(
            ".. {directive}:: {title}\n\n{}",
            indent(&self.blocks_text(children)?, "   ")
        ))
    }

    fn figure(&mut self, elem: &Element) -> Result<String, ConvertError> {
        let mut out = String::new();
        let mut rest = Vec::new();
        for child in &elem.children {
            match child {
                Node::Element(e) if out.is_empty() && (e.is_page("object") || e.name.ns == Namespace::Xinclude) => {
                    out = self.image_directive("figure", e);
                }
                Node::Element(e) if e.is_page("figcaption") => {
                    rest.push(self.inline(&e.children)?);
                }
                Node::Element(_) => rest.push(self.blocks_text(std::slice::from_ref(child))?),
                Node::Text(_) => {}
            }
        }
        let body = rest.join("\n\n");
        if body.trim().is_empty() {
            return Ok(out);
        }
        Ok(format!("{out}\n\n{}", indent(&body, "   ")))
    }

    fn image_directive(&mut self, directive: &str, elem: &Element) -> String {
        let mut out = format!(".. {directive}:: {}", image_href(elem));
        for (key, value) in image_options(elem) {
            out.push_str(&format!("\n   :{key}: {value}"));
        }
        out
    }

    fn inline(&mut self, nodes: &[Node]) -> Result<String, ConvertError> {
        let mut out = String::new();
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(&escape(text)),
                Node::Element(elem) => out.push_str(&self.inline_element(elem)?),
            }
        }
        Ok(tidy_role_escapes(&out))
    }

    fn inline_element(&mut self, elem: &Element) -> Result<String, ConvertError> {
        if elem.name.ns == Namespace::Xinclude {
            return Ok(self.image_reference(elem));
        }
        if elem.name.ns != Namespace::Page {
            return self.inline(&elem.children);
        }
        let out = match elem.name.local.as_str() {
            "emphasis" => wrap("*", &self.inline(&elem.children)?),
            "strong" => wrap("**", &self.inline(&elem.children)?),
            "code" | "samp" => wrap("``", &elem.text_content()),
            "a" => self.link(elem)?,
            "object" => self.image_reference(elem),
            "note" => {
                let body = match elem.find("note-body") {
                    Some(body) => self.inline_flat(&body.children)?,
                    None => String::new(),
                };
                self.footnotes.push(body);
                " [#]_".to_string()
            }
            "span" => self.span(elem)?,
            "line-break" => "\n".to_string(),
            "inline-part" => {
                let content_type = elem.page_attr(attr::CONTENT_TYPE).unwrap_or("");
                match content_type.strip_prefix("x-moin/macro;name=") {
                    Some(name) => {
                        let text = elem
                            .page_attr(attr::ALT)
                            .map(str::to_string)
                            .unwrap_or_else(|| macro_text(name, elem));
                        format!("`{text}`_")
                    }
                    None => self.inline(&elem.children)?,
                }
            }
            // blocks nested in inline context lose their structure
            "p" | "div" | "blockcode" => self.inline_flat(&elem.children)?,
            _ => self.inline(&elem.children)?,
        };
        Ok(out)
    }

    /// Inline rendering of content that may hold paragraphs.
    fn inline_flat(&mut self, nodes: &[Node]) -> Result<String, ConvertError> {
        let mut parts = Vec::new();
        for node in nodes {
            let text = match node {
                Node::Element(elem) if elem.is_page("p") => self.inline(&elem.children)?,
                other => self.inline(std::slice::from_ref(other))?,
            };
            if !text.trim().is_empty() {
                parts.push(text.trim().to_string());
            }
        }
        Ok(parts.join(" "))
    }

    fn span(&mut self, elem: &Element) -> Result<String, ConvertError> {
        let content = self.inline(&elem.children)?;
        if content.is_empty() {
            return Ok(content);
        }
        let role = match (
            elem.page_attr(attr::BASELINE_SHIFT),
            elem.attr(&QName::html("class")),
        ) {
            (Some("super"), _) => Some("sup"),
            (Some("sub"), _) => Some("sub"),
            (_, Some("abbr")) => Some("abbreviation"),
            (_, Some("cite")) => Some("title-reference"),
            _ => None,
        };
        Ok(match role {
            Some(role) => format!("\\ :{role}:`{content}`\\ "),
            None => content,
        })
    }

    fn link(&mut self, elem: &Element) -> Result<String, ConvertError> {
        let href = display_href(elem.attr(&QName::xlink("href")).unwrap_or(""));
        let text = self.inline(&elem.children)?.replace('\n', " ");
        let text = text.trim();
        if text.is_empty() || text == href {
            if href.contains("://") {
                return Ok(href);
            }
            return Ok(self.named_link(&href, &href));
        }
        Ok(self.named_link(text, &href))
    }

    fn named_link(&mut self, text: &str, href: &str) -> String {
        match self.links.get(text) {
            Some(known) if known == href => format!("`{text}`_"),
            Some(_) => format!("`{text} <{href}>`__"),
            None => {
                self.links.insert(text.to_string(), href.to_string());
                self.pending_links.push((text.to_string(), href.to_string()));
                format!("`{text}`_")
            }
        }
    }

    fn image_reference(&mut self, elem: &Element) -> String {
        let href = image_href(elem);
        let base = elem
            .attr(&QName::html("alt"))
            .or_else(|| elem.page_attr(attr::ALT))
            .map(str::to_string)
            .unwrap_or_else(|| href.rsplit('/').next().unwrap_or(&href).to_string());
        let mut alt = base.clone();
        let mut counter = 1;
        loop {
            match self.images.get(&alt) {
                Some(known) if *known == href => return format!("|{alt}|"),
                Some(_) => {
                    counter += 1;
                    alt = format!("{base}{counter}");
                }
                None => break,
            }
        }
        self.images.insert(alt.clone(), href.clone());
        let mut definition = format!(".. |{alt}| image:: {href}");
        for (key, value) in image_options(elem).into_iter().filter(|(key, _)| *key != "alt") {
            definition.push_str(&format!("\n   :{key}: {value}"));
        }
        self.pending_images.push(definition);
        format!("|{alt}|")
    }
}

/// Drop the escaped blanks around roles where plain whitespace or the end of
/// the text already separates them.
fn tidy_role_escapes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' && chars.get(i + 1) == Some(&' ') {
            let escaped = i > 0 && chars[i - 1] == '\\';
            let before_blank = i == 0 || chars[i - 1].is_whitespace();
            let after_blank = chars.get(i + 2).map_or(true, |c| c.is_whitespace());
            if !escaped && (before_blank || after_blank) {
                i += 2;
                continue;
            }
            if !escaped {
                out.push_str("\\ ");
                i += 2;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn wrap(marker: &str, content: &str) -> String {
    if content.is_empty() {
        return String::new();
    }
    format!("{marker}{content}{marker}")
}

/// Role separators (`\ `) mean nothing at either end of a paragraph.
fn trim_paragraph(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix("\\ ").unwrap_or(text);
    let text = match text.strip_suffix('\\') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => text,
    };
    text.trim()
}

fn literal_block(text: &str) -> String {
    format!("::\n\n{}", indent(text.trim_end_matches('\n'), "  "))
}

fn ordered_marker(list: &Element, index: usize) -> String {
    if index > 0 {
        return "#.".to_string();
    }
    let start = list
        .page_attr(attr::LIST_START)
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(1);
    match list.page_attr(attr::LIST_STYLE_TYPE) {
        Some("lower-alpha") | Some("upper-alpha") => {
            let letter = char::from(b'a' + ((start.saturating_sub(1)) % 26) as u8);
            let letter = if list.page_attr(attr::LIST_STYLE_TYPE) == Some("upper-alpha") {
                letter.to_ascii_uppercase()
            } else {
                letter
            };
            format!("{letter}.")
        }
        Some("lower-roman") if start == 1 => "i.".to_string(),
        Some("upper-roman") if start == 1 => "I.".to_string(),
        _ => format!("{start}."),
    }
}

/// Names with characters that end a reference need backquotes in a target.
fn target_name(text: &str) -> String {
    if text.contains(':') || text.starts_with('_') {
        format!("`{text}`")
    } else {
        text.to_string()
    }
}

fn macro_text(name: &str, elem: &Element) -> String {
    let args = elem
        .find("arguments")
        .map(Element::text_content)
        .unwrap_or_default();
    if args.is_empty() {
        format!("<<{name}>>")
    } else {
        format!("<<{name}({args})>>")
    }
}
