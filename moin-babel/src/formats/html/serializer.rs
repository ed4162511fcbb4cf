//! Document tree → HTML
//!
//! Pipeline: page tree → RcDom → HTML string. The tree is walked once to
//! build the DOM; headings and footnotes met on the way are recorded, and
//! once the walk is done the table-of-contents placeholders are filled and
//! the collected footnotes appended.

use crate::common::links::anchor_name;
use crate::common::nowiki::NowikiBlock;
use crate::error::ConvertError;
use crate::ir::names::{attr, Namespace, QName};
use crate::ir::{Element, Node as PageNode};
use html5ever::{
    ns, serialize, serialize::SerializeOpts, serialize::TraversalScope, Attribute, LocalName,
    QualName,
};
use indexmap::IndexMap;
use markup5ever_rcdom::{Handle, Node, NodeData, SerializableHandle};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

const LOCAL_PREFIX: &str = "wiki.local:";

/// Strings never allowed inside a `style` attribute.
const SUSPECT: &[&str] = &["/*", "/>", "\\", "`", "script", "&#", "http", "expression", "behavior"];

const ADMONITIONS: &[&str] = &[
    "attention", "caution", "danger", "error", "hint", "important", "note", "tip", "warning",
];

/// `span element=X` values that have an HTML element of their own.
const DIRECT_INLINE_TAGS: &[&str] = &["abbr", "address", "dfn", "kbd"];

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp", "bmp", "ico"];

/// Options for HTML serialization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlOptions {
    /// Wrap the fragment in a complete HTML document
    pub standalone: bool,
    /// Document title for standalone output
    pub title: Option<String>,
}

/// Serialize a page tree to HTML.
pub fn serialize_to_html(doc: &Element, options: &HtmlOptions) -> Result<String, ConvertError> {
    let root = create_element("div", Vec::new());
    let mut writer = HtmlWriter::default();
    for handle in writer.element(doc, true)? {
        append(&root, handle);
    }
    writer.finish(&root);

    let body = serialize_children(&root)?;
    if options.standalone {
        let title = options.title.as_deref().unwrap_or("Untitled");
        Ok(wrap_in_document(&body, title))
    } else {
        Ok(body)
    }
}

fn filter_style(style: &str) -> String {
    let squashed: String = style.to_lowercase().split_whitespace().collect();
    if SUSPECT.iter().any(|suspect| squashed.contains(suspect)) {
        " /*style suppressed, failed test for suspect strings*/ ".to_string()
    } else {
        style.to_string()
    }
}

/// `wiki.local:` targets become relative references.
fn browsable(href: &str) -> String {
    match href.strip_prefix(LOCAL_PREFIX) {
        Some(local) => local.to_string(),
        None => href.to_string(),
    }
}

/// HTML attributes of a page element; classes from both namespaces merge.
fn html_attributes(elem: &Element) -> IndexMap<String, String> {
    let mut out: IndexMap<String, String> = IndexMap::new();
    let mut put = |key: &str, value: &str| {
        let value = if key == "style" { filter_style(value) } else { value.to_string() };
        match out.get_mut(key) {
            Some(existing) if key == "class" => {
                existing.push(' ');
                existing.push_str(&value);
            }
            _ => {
                out.insert(key.to_string(), value);
            }
        }
    };
    for (name, value) in &elem.attributes {
        match &name.ns {
            Namespace::Page | Namespace::None => match name.local.as_str() {
                attr::CLASS | attr::STYLE | attr::ID | "title" | "type" => put(&name.local, value),
                attr::COLSPAN => put("colspan", value),
                attr::ROWSPAN => put("rowspan", value),
                _ => {}
            },
            Namespace::Html => put(&name.local, value),
            Namespace::Xml if name.local == "id" || name.local == "lang" => put(&name.local, value),
            _ => {}
        }
    }
    out
}

/// Create an HTML element with attributes
fn create_element(tag: &str, attrs: Vec<(String, String)>) -> Handle {
    let qual_name = QualName::new(None, ns!(html), LocalName::from(tag));
    let attributes = attrs
        .into_iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(name.as_str())),
            value: value.into(),
        })
        .collect();

    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Element {
            name: qual_name,
            attrs: RefCell::new(attributes),
            template_contents: Default::default(),
            mathml_annotation_xml_integration_point: false,
        },
    })
}

/// Create a text node
fn create_text(text: &str) -> Handle {
    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Text {
            contents: RefCell::new(text.into()),
        },
    })
}

fn append(parent: &Handle, child: Handle) {
    parent.children.borrow_mut().push(child);
}

fn element_with_text(tag: &str, attrs: Vec<(String, String)>, text: &str) -> Handle {
    let elem = create_element(tag, attrs);
    append(&elem, create_text(text));
    elem
}

fn pair(key: &str, value: impl Into<String>) -> (String, String) {
    (key.to_string(), value.into())
}

/// Serialize the children of the container (not the container itself)
fn serialize_children(root: &Handle) -> Result<String, ConvertError> {
    let mut output = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };
    for child in root.children.borrow().iter() {
        let serializable = SerializableHandle::from(child.clone());
        serialize(&mut output, &serializable, opts.clone())
            .map_err(|e| ConvertError::Serialization(format!("HTML serialization failed: {e}")))?;
    }
    String::from_utf8(output)
        .map_err(|e| ConvertError::Serialization(format!("UTF-8 conversion failed: {e}")))
}

fn wrap_in_document(body_html: &str, title: &str) -> String {
    let escaped_title = html_escape(title);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <meta name="generator" content="moin-babel">
  <title>{escaped_title}</title>
</head>
<body>
{body_html}
</body>
</html>
"#
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[derive(Default)]
struct HtmlWriter {
    /// Use count per generated id
    ids: HashMap<String, usize>,
    /// `(text, level, id)` of every heading, in document order
    headings: Vec<(String, usize, String)>,
    /// Table-of-contents placeholders and their depth limit
    tocs: Vec<(Handle, usize)>,
    footnotes: Vec<Handle>,
    note_count: usize,
    placements: usize,
}

impl HtmlWriter {
    fn unique_id(&mut self, text: &str) -> String {
        let id = anchor_name(text);
        let count = self.ids.entry(id.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            id
        } else {
            format!("{id}-{count}")
        }
    }

    fn finish(&mut self, root: &Handle) {
        if !self.footnotes.is_empty() {
            append(root, self.footnote_block());
        }
        let tocs = std::mem::take(&mut self.tocs);
        for (placeholder, max_level) in tocs {
            self.fill_toc(&placeholder, max_level);
        }
    }

    fn footnote_block(&mut self) -> Handle {
        let block = create_element("div", vec![pair("class", "moin-footnotes")]);
        for note in self.footnotes.drain(..) {
            append(&block, note);
        }
        block
    }

    fn fill_toc(&self, placeholder: &Handle, max_level: usize) {
        let min_level = self.headings.iter().map(|(_, level, _)| *level).min().unwrap_or(1);
        append(
            placeholder,
            element_with_text("div", vec![pair("class", "moin-table-of-contents-heading")], "Contents"),
        );
        let mut stack = vec![placeholder.clone()];
        let mut last_level = 0;
        let push = |stack: &mut Vec<Handle>, elem: Handle| {
            if let Some(top) = stack.last() {
                append(top, elem.clone());
            }
            stack.push(elem);
        };
        for (text, level, id) in &self.headings {
            if *level > max_level {
                continue;
            }
            let level = level - min_level + 1;
            let need_item = last_level >= level;
            while last_level > level {
                stack.pop();
                stack.pop();
                last_level -= 1;
            }
            while last_level < level {
                push(&mut stack, create_element("ol", Vec::new()));
                push(&mut stack, create_element("li", Vec::new()));
                last_level += 1;
            }
            if need_item {
                stack.pop();
                push(&mut stack, create_element("li", Vec::new()));
            }
            if let Some(top) = stack.last() {
                append(top, element_with_text("a", vec![pair("href", format!("#{id}"))], text));
            }
        }
    }

    fn node(&mut self, node: &PageNode) -> Result<Vec<Handle>, ConvertError> {
        match node {
            PageNode::Text(text) => Ok(vec![create_text(text)]),
            PageNode::Element(elem) => self.element(elem, false),
        }
    }

    fn children(&mut self, elem: &Element) -> Result<Vec<Handle>, ConvertError> {
        let mut out = Vec::new();
        for child in &elem.children {
            out.extend(self.node(child)?);
        }
        Ok(out)
    }

    /// An expanded nowiki section has no wrapper of its own when it starts
    /// with an element; that element takes the `moin-nowiki` class and the
    /// section's line number.
    fn expanded_nowiki(&mut self, elem: &Element) -> Result<Vec<Handle>, ConvertError> {
        let mut section = elem.clone();
        let lineno = elem.attr(&QName::html(attr::LINENO)).map(str::to_string);
        let first = match section.children.first_mut() {
            Some(PageNode::Element(first)) if first.name.ns == Namespace::Page => Some(first),
            _ => None,
        };
        let Some(first) = first else {
            return Ok(vec![self.copy("div", elem, vec![pair("class", "moin-nowiki")])?]);
        };
        let class = match first.page_attr(attr::CLASS) {
            Some(class) => format!("{class} moin-nowiki"),
            None => "moin-nowiki".to_string(),
        };
        first.set_page_attr(attr::CLASS, class);
        if let Some(lineno) = lineno {
            first.set_attr(QName::html(attr::LINENO), lineno);
        }
        self.children(&section)
    }

    /// `tag` with the element's attributes, `extra` on top, and its children.
    fn copy(&mut self, tag: &str, elem: &Element, extra: Vec<(String, String)>) -> Result<Handle, ConvertError> {
        let mut attrs = html_attributes(elem);
        for (key, value) in extra {
            attrs.insert(key, value);
        }
        let handle = create_element(tag, attrs.into_iter().collect());
        for child in self.children(elem)? {
            append(&handle, child);
        }
        Ok(handle)
    }

    fn element(&mut self, elem: &Element, top: bool) -> Result<Vec<Handle>, ConvertError> {
        if elem.name == QName::xinclude("include") {
            return Ok(vec![self.object(elem, QName::xinclude("href"))]);
        }
        match &elem.name.ns {
            Namespace::Page => {}
            Namespace::Html => return Ok(vec![self.copy(&elem.name.local, elem, Vec::new())?]),
            _ => return self.children(elem),
        }

        let handle = match elem.local_name() {
            "page" if top => {
                let mut out = Vec::new();
                for body in elem.elements().filter(|e| e.is_page("body")) {
                    out.extend(self.children(body)?);
                }
                return Ok(out);
            }
            "page" => {
                // nested page from a parser section: one div, body classes merged
                let mut attrs = html_attributes(elem);
                let mut children = Vec::new();
                for body in elem.elements().filter(|e| e.is_page("body")) {
                    for (key, value) in html_attributes(body) {
                        match attrs.get_mut(&key) {
                            Some(existing) if key == "class" => {
                                existing.push(' ');
                                existing.push_str(&value);
                            }
                            _ => {
                                attrs.insert(key, value);
                            }
                        }
                    }
                    children.extend(self.children(body)?);
                }
                let div = create_element("div", attrs.into_iter().collect());
                for child in children {
                    append(&div, child);
                }
                div
            }
            "body" => return self.children(elem),
            "a" => {
                let href = elem.attr(&QName::xlink("href")).unwrap_or_default();
                let mut extra = Vec::new();
                if !href.is_empty() {
                    extra.push(pair("href", browsable(href)));
                }
                let link = self.copy("a", elem, extra)?;
                if elem.text_content().is_empty() && elem.elements().next().is_none() {
                    let shown = match href.split_once('#') {
                        Some((_, fragment)) => fragment.to_string(),
                        None => browsable(href),
                    };
                    append(&link, create_text(&shown));
                }
                link
            }
            "admonition" => {
                let class = elem.page_attr("type").filter(|kind| ADMONITIONS.contains(kind));
                let div = create_element("div", class.map(|c| pair("class", c)).into_iter().collect());
                for child in self.children(elem)? {
                    append(&div, child);
                }
                div
            }
            "audio" | "video" => {
                let mut extra = vec![pair("controls", "controls")];
                if let Some(href) = elem.attr(&QName::xlink("href")) {
                    extra.insert(0, pair("src", browsable(href)));
                }
                self.copy(elem.local_name(), elem, extra)?
            }
            "nowiki" => match NowikiBlock::from_element(elem) {
                Some(block) => element_with_text("pre", vec![pair("class", "moin-nowiki")], &block.content),
                None => return self.expanded_nowiki(elem),
            },
            "blockcode" => self.copy("pre", elem, Vec::new())?,
            "block-comment" => return Ok(Vec::new()),
            "blockquote" | "code" | "del" | "div" | "figure" | "figcaption" | "ins" | "p" | "s"
            | "samp" | "strong" | "u" => self.copy(elem.local_name(), elem, Vec::new())?,
            "emphasis" => self.copy("em", elem, Vec::new())?,
            "quote" => self.copy("q", elem, Vec::new())?,
            "line-break" => create_element("br", Vec::new()),
            "separator" => self.copy("hr", elem, Vec::new())?,
            "h" => self.heading(elem)?,
            "inline-part" => self.part(elem, "inline-body", "span")?,
            "part" => self.part(elem, "body", "p")?,
            "line-blk" => self.copy("div", elem, vec![pair("class", "moin-line-blk")])?,
            "line-block" => self.copy("div", elem, vec![pair("class", "moin-line-block")])?,
            "list" => self.list(elem)?,
            "list-item" => {
                let dl = create_element("dl", html_attributes(elem).into_iter().collect());
                self.definition_entry(&dl, elem)?;
                dl
            }
            "object" => self.object(elem, QName::xlink("href")),
            "span" => self.span(elem)?,
            "table" => self.table(elem)?,
            "table-cell" => self.copy("td", elem, Vec::new())?,
            "table-cell-head" => self.copy("th", elem, Vec::new())?,
            "table-row" => self.copy("tr", elem, Vec::new())?,
            "note" => return self.note(elem),
            "table-of-content" => {
                let max_level = elem
                    .page_attr(attr::OUTLINE_LEVEL)
                    .and_then(|level| level.parse().ok())
                    .unwrap_or(6);
                let mut attrs = html_attributes(elem);
                attrs.shift_remove("outline-level");
                attrs.insert("class".to_string(), "moin-table-of-contents".to_string());
                let div = create_element("div", attrs.into_iter().collect());
                self.tocs.push((div.clone(), max_level));
                div
            }
            "error" => self.copy("span", elem, vec![pair("class", "moin-error")])?,
            other => {
                tracing::debug!(element = other, "no html counterpart, children kept");
                return self.children(elem);
            }
        };
        Ok(vec![handle])
    }

    fn heading(&mut self, elem: &Element) -> Result<Handle, ConvertError> {
        let level: usize = match elem.page_attr(attr::OUTLINE_LEVEL) {
            None => 1,
            Some(level) => level
                .trim()
                .parse()
                .map_err(|_| ConvertError::Serialization("outline-level needs to be an integer".to_string()))?,
        };
        let level = level.clamp(1, 6);
        let text = elem.text_content();
        let existing = elem
            .attr(&QName::html(attr::ID))
            .or_else(|| elem.attr(&QName::xml("id")))
            .map(str::to_string);
        let id = match existing {
            Some(id) => id,
            None => self.unique_id(&text),
        };
        self.headings.push((text, level, id.clone()));
        self.copy(&format!("h{level}"), elem, vec![pair("id", id)])
    }

    /// Macro or parser output: its body, the error it reported, or its alt text.
    fn part(&mut self, elem: &Element, body_name: &str, tag: &str) -> Result<Handle, ConvertError> {
        if let Some(body) = elem.find(body_name) {
            return if tag == "p" {
                self.copy("div", body, vec![pair("class", "moin-p")])
            } else {
                self.copy("span", body, Vec::new())
            };
        }
        if let Some(error) = elem.find("error") {
            let handle = create_element(tag, vec![pair("class", "moin-error")]);
            let children = self.children(error)?;
            if children.is_empty() {
                append(&handle, create_text("Error"));
            }
            for child in children {
                append(&handle, child);
            }
            return Ok(handle);
        }
        let handle = create_element(tag, Vec::new());
        if let Some(alt) = elem.page_attr(attr::ALT).filter(|alt| !alt.is_empty()) {
            append(&handle, create_text(alt));
        }
        Ok(handle)
    }

    fn list(&mut self, elem: &Element) -> Result<Handle, ConvertError> {
        let mut attrs = html_attributes(elem);
        let generate = elem.page_attr(attr::ITEM_LABEL_GENERATE);
        let tag = match generate {
            Some("ordered") => {
                let class = match elem.page_attr(attr::LIST_STYLE_TYPE) {
                    Some("upper-alpha") => Some("moin-upperalpha-list"),
                    Some("upper-roman") => Some("moin-upperroman-list"),
                    Some("lower-roman") => Some("moin-lowerroman-list"),
                    Some("lower-alpha") => Some("moin-loweralpha-list"),
                    _ => None,
                };
                if let Some(class) = class {
                    attrs.insert("class".to_string(), class.to_string());
                }
                if let Some(start) = elem.page_attr(attr::LIST_START) {
                    attrs.insert("start".to_string(), start.to_string());
                }
                "ol"
            }
            Some("unordered") => {
                if elem.page_attr(attr::LIST_STYLE_TYPE) == Some("no-bullet") {
                    attrs.insert("class".to_string(), "moin-nobullet-list".to_string());
                }
                "ul"
            }
            Some(other) => {
                return Err(ConvertError::Serialization(format!(
                    "item-label-generate does not support \"{other}\""
                )))
            }
            None => "dl",
        };
        let list = create_element(tag, attrs.into_iter().collect());
        for item in elem.elements().filter(|e| e.is_page("list-item")) {
            if generate.is_some() {
                if let Some(body) = item.find("list-item-body") {
                    let li = self.copy("li", body, Vec::new())?;
                    append(&list, li);
                }
            } else {
                self.definition_entry(&list, item)?;
            }
        }
        Ok(list)
    }

    fn definition_entry(&mut self, dl: &Handle, item: &Element) -> Result<(), ConvertError> {
        for part in item.elements() {
            let tag = match part.page_name() {
                Some("list-item-label") => "dt",
                Some("list-item-body") => "dd",
                _ => continue,
            };
            let handle = self.copy(tag, part, Vec::new())?;
            append(dl, handle);
        }
        Ok(())
    }

    /// `img`, `video`, `audio` or `object`, decided by the media type or the
    /// file extension.
    fn object(&mut self, elem: &Element, href_name: QName) -> Handle {
        let href = elem.attr(&href_name).map(browsable);
        let media_type = elem.page_attr("type").unwrap_or_default();
        let extension = href
            .as_deref()
            .and_then(|h| h.split(['?', '#']).next())
            .and_then(|h| h.rsplit('/').next())
            .and_then(|h| h.rsplit_once('.'))
            .map(|(_, ext)| ext.to_lowercase());
        let kind = match media_type.split('/').next() {
            Some("image") => "img",
            Some("video") => "video",
            Some("audio") => "audio",
            _ if extension.as_deref().is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext)) => "img",
            _ => "object",
        };

        let mut attrs: Vec<(String, String)> = Vec::new();
        let mut alt = None;
        for (name, value) in &elem.attributes {
            match name.local.as_str() {
                "alt" => alt = Some(value.clone()),
                "style" => attrs.push(pair("style", filter_style(value))),
                "width" | "height" | "class" | "data-href" | "title" => attrs.push(pair(&name.local, value.as_str())),
                _ => {}
            }
        }
        if let Some(href) = &href {
            attrs.push(pair(if kind == "object" { "data" } else { "src" }, href.as_str()));
        }
        let fallback = href.as_deref().unwrap_or_default().trim_start_matches('/').to_string();

        if kind == "img" {
            attrs.push(pair("alt", alt.unwrap_or(fallback)));
            return create_element("img", attrs);
        }
        if kind != "object" {
            attrs.push(pair("controls", "controls"));
        }
        let handle = create_element(kind, attrs);
        let text = elem.text_content();
        if !text.is_empty() {
            append(&handle, create_text(&text));
            append(&handle, create_text(" - "));
        }
        append(&handle, create_text(&alt.unwrap_or(fallback)));
        handle
    }

    fn span(&mut self, elem: &Element) -> Result<Handle, ConvertError> {
        match elem.page_attr(attr::BASELINE_SHIFT) {
            Some("sub") => return self.copy("sub", elem, Vec::new()),
            Some("super") => return self.copy("sup", elem, Vec::new()),
            _ => {}
        }
        match elem.page_attr(attr::FONT_SIZE) {
            Some("85%") => return self.copy("span", elem, vec![pair("class", "moin-small")]),
            Some("120%") => return self.copy("span", elem, vec![pair("class", "moin-big")]),
            _ => {}
        }
        if let Some(element) = elem.page_attr("element") {
            if DIRECT_INLINE_TAGS.contains(&element) {
                return self.copy(element, elem, Vec::new());
            }
            return self.copy("span", elem, vec![pair("class", format!("element-{element}"))]);
        }
        self.copy("span", elem, Vec::new())
    }

    fn table(&mut self, elem: &Element) -> Result<Handle, ConvertError> {
        let attrs = html_attributes(elem);
        let wiki_table = attrs.get("class").is_some_and(|class| class.contains("moin-wiki-table"));
        let table = create_element("table", attrs.into_iter().collect());
        let parts: Vec<&Element> = elem.elements().collect();
        let caption = usize::from(parts.first().is_some_and(|first| first.is_page("caption")));
        for (index, part) in parts.iter().enumerate() {
            let tag = match part.page_name() {
                Some("caption") => "caption",
                Some(_) if wiki_table && parts.len() > 1 + caption => {
                    if index == caption {
                        "thead"
                    } else if parts.len() > 2 + caption && index == parts.len() - 1 {
                        "tfoot"
                    } else {
                        "tbody"
                    }
                }
                Some("table-body") => "tbody",
                Some("table-header") => "thead",
                Some("table-footer") => "tfoot",
                _ => continue,
            };
            let handle = self.copy(tag, part, Vec::new())?;
            append(&table, handle);
        }
        Ok(table)
    }

    /// A footnote reference here, the note itself at the placement point.
    /// An empty note is an explicit placement point.
    fn note(&mut self, elem: &Element) -> Result<Vec<Handle>, ConvertError> {
        if elem.children.is_empty() {
            if self.footnotes.is_empty() {
                return Ok(Vec::new());
            }
            let block = self.footnote_block();
            self.note_count = 0;
            self.placements += 1;
            return Ok(vec![block]);
        }
        self.note_count += 1;
        let number = self.note_count.to_string();
        let id = format!("{}-{number}", self.placements);

        let reference = create_element(
            "sup",
            vec![pair("id", format!("note-{id}-ref")), pair("class", "moin-footnote")],
        );
        append(&reference, element_with_text("a", vec![pair("href", format!("#note-{id}"))], &number));

        let note = create_element("p", vec![pair("id", format!("note-{id}"))]);
        let back = create_element("sup", Vec::new());
        append(&back, element_with_text("a", vec![pair("href", format!("#note-{id}-ref"))], &number));
        append(&note, back);
        if let Some(body) = elem.find("note-body") {
            for child in self.children(body)? {
                append(&note, child);
            }
        }
        self.footnotes.push(note);
        Ok(vec![reference])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html(children: Vec<PageNode>) -> String {
        let doc = Element::document(Element::page("body").with_children(children));
        serialize_to_html(&doc, &HtmlOptions::default()).unwrap()
    }

    fn p(children: Vec<PageNode>) -> PageNode {
        Element::page("p").with_children(children).into()
    }

    #[test]
    fn paragraphs_and_inline_markup() {
        let out = html(vec![p(vec![
            "a ".into(),
            Element::page("strong").with_child("b").into(),
            Element::page("emphasis").with_child("c").into(),
            Element::page("span").with_page_attr(attr::BASELINE_SHIFT, "sub").with_child("2").into(),
        ])]);
        assert_eq!(out, "<p>a <strong>b</strong><em>c</em><sub>2</sub></p>");
    }

    #[test]
    fn headings_get_unique_ids() {
        let heading = |text: &str| -> PageNode {
            Element::page("h")
                .with_page_attr(attr::OUTLINE_LEVEL, "2")
                .with_child(text.to_string())
                .into()
        };
        assert_eq!(
            html(vec![heading("Intro Part"), heading("Intro Part")]),
            "<h2 id=\"Intro_Part\">Intro Part</h2><h2 id=\"Intro_Part-2\">Intro Part</h2>"
        );
    }

    #[test]
    fn links_drop_the_local_scheme() {
        let out = html(vec![p(vec![
            Element::page("a")
                .with_attr(QName::xlink("href"), "wiki.local:Home")
                .with_child("home")
                .into(),
            Element::page("a").with_attr(QName::xlink("href"), "wiki.local:#top").into(),
        ])]);
        assert_eq!(out, "<p><a href=\"Home\">home</a><a href=\"#top\">top</a></p>");
    }

    #[test]
    fn lists() {
        let item = |text: &str| {
            Element::page("list-item").with_child(Element::page("list-item-body").with_child(text.to_string()))
        };
        let ordered = Element::page("list")
            .with_page_attr(attr::ITEM_LABEL_GENERATE, "ordered")
            .with_page_attr(attr::LIST_STYLE_TYPE, "upper-roman")
            .with_child(item("x"));
        let definitions = Element::page("list").with_child(
            Element::page("list-item")
                .with_child(Element::page("list-item-label").with_child("t"))
                .with_child(Element::page("list-item-body").with_child("d")),
        );
        assert_eq!(
            html(vec![ordered.into(), definitions.into()]),
            "<ol class=\"moin-upperroman-list\"><li>x</li></ol><dl><dt>t</dt><dd>d</dd></dl>"
        );
        let bad = Element::page("list").with_page_attr(attr::ITEM_LABEL_GENERATE, "sideways");
        let doc = Element::document(Element::page("body").with_child(bad));
        assert!(serialize_to_html(&doc, &HtmlOptions::default()).is_err());
    }

    #[test]
    fn tables_and_spans() {
        let table = Element::page("table")
            .with_page_attr(attr::CLASS, "moin-wiki-table")
            .with_child(
                Element::page("table-body").with_child(
                    Element::page("table-row").with_child(Element::page("table-cell").with_child("h")),
                ),
            )
            .with_child(
                Element::page("table-body").with_child(
                    Element::page("table-row").with_child(
                        Element::page("table-cell")
                            .with_page_attr(attr::COLSPAN, "2")
                            .with_child("b"),
                    ),
                ),
            );
        assert_eq!(
            html(vec![table.into()]),
            "<table class=\"moin-wiki-table\"><thead><tr><td>h</td></tr></thead>\
<tbody><tr><td colspan=\"2\">b</td></tr></tbody></table>"
        );
    }

    #[test]
    fn images_and_objects() {
        let image = Element::new(QName::xinclude("include")).with_attr(QName::xinclude("href"), "wiki.local:cat.png");
        let object = Element::page("object").with_attr(QName::xlink("href"), "http://example.org/clip");
        assert_eq!(
            html(vec![image.into(), object.into()]),
            "<img src=\"cat.png\" alt=\"cat.png\"><object data=\"http://example.org/clip\">http://example.org/clip</object>"
        );
    }

    #[test]
    fn footnotes_collect_at_the_end() {
        let note = Element::page("note")
            .with_page_attr(attr::NOTE_CLASS, "footnote")
            .with_child(Element::page("note-body").with_child("The note."));
        assert_eq!(
            html(vec![p(vec!["Text".into(), note.into()])]),
            "<p>Text<sup id=\"note-0-1-ref\" class=\"moin-footnote\"><a href=\"#note-0-1\">1</a></sup></p>\
<div class=\"moin-footnotes\"><p id=\"note-0-1\"><sup><a href=\"#note-0-1-ref\">1</a></sup>The note.</p></div>"
        );
    }

    #[test]
    fn table_of_contents_lists_headings() {
        let heading = |level: &str, text: &str| -> PageNode {
            Element::page("h")
                .with_page_attr(attr::OUTLINE_LEVEL, level)
                .with_child(text.to_string())
                .into()
        };
        let out = html(vec![
            Element::page("table-of-content").into(),
            heading("1", "A"),
            heading("2", "B"),
            heading("1", "C"),
        ]);
        assert!(out.starts_with(
            "<div class=\"moin-table-of-contents\"><div class=\"moin-table-of-contents-heading\">Contents</div>\
<ol><li><a href=\"#A\">A</a><ol><li><a href=\"#B\">B</a></li></ol></li><li><a href=\"#C\">C</a></li></ol></div>"
        ), "{out}");
    }

    #[test]
    fn suspicious_styles_are_suppressed() {
        let out = html(vec![Element::page("p")
            .with_page_attr(attr::STYLE, "background: url(http://evil)")
            .with_child("x")
            .into()]);
        assert!(out.contains("style suppressed"), "{out}");
    }

    #[test]
    fn standalone_document() {
        let doc = Element::document(Element::page("body").with_child(Element::page("p").with_child("x")));
        let options = HtmlOptions {
            standalone: true,
            title: Some("A & B".to_string()),
        };
        let out = serialize_to_html(&doc, &options).unwrap();
        assert!(out.starts_with("<!DOCTYPE html>"));
        assert!(out.contains("<title>A &amp; B</title>"));
        assert!(out.contains("<p>x</p>"));
    }

    #[test]
    fn expanded_nowiki_marks_its_first_element() {
        let nowiki = Element::page("nowiki")
            .with_attr(QName::html(attr::LINENO), "4")
            .with_child(
                Element::page("blockcode")
                    .with_page_attr(attr::CLASS, "highlight")
                    .with_child("x"),
            );
        assert_eq!(
            html(vec![nowiki.into()]),
            "<pre class=\"highlight moin-nowiki\" data-lineno=\"4\">x</pre>"
        );
        let text_only = Element::page("nowiki").with_child("y");
        assert_eq!(html(vec![text_only.into()]), "<div class=\"moin-nowiki\">y</div>");
    }
}
