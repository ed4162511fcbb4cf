//! HTML → document tree
//!
//! html5ever builds a browser-grade DOM from whatever it is given, so there is
//! no failure path: broken markup is repaired the way a browser would. The
//! DOM is then walked once. Body content lands directly in the page body;
//! `head` and interactive elements are dropped with their content.

use crate::common::links::{allowed_uri_scheme, wiki_local};
use crate::format::ParseContext;
use crate::ir::names::attr;
use crate::ir::{Element, Node, QName};
use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, Attribute, LocalName, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use url::Url;

const DIALECT: &str = "html";

/// Copied under their own name into the page namespace.
const SYMMETRIC_TAGS: &[&str] = &["blockquote", "code", "del", "div", "ins", "p", "s", "span", "strong", "u"];

/// Dropped together with their content.
const IGNORED_TAGS: &[&str] = &[
    "applet", "area", "button", "center", "fieldset", "form", "frame", "frameset", "head", "iframe",
    "input", "isindex", "label", "legend", "link", "map", "menu", "noframes", "noscript", "optgroup",
    "option", "param", "script", "select", "style", "textarea", "title",
];

/// Attributes kept as they are, in the html namespace.
const STANDARD_ATTRIBUTES: &[&str] = &["title", "class", "style", "alt"];

/// Elements with a differently named counterpart.
fn simple_tag(name: &str) -> Option<&'static str> {
    Some(match name {
        "em" => "emphasis",
        "b" => "strong",
        "q" => "quote",
        "strike" => "s",
        "pre" => "blockcode",
        "tt" | "samp" => "code",
        "dt" => "list-item-label",
        "dd" => "list-item-body",
        "thead" => "table-header",
        "tfoot" => "table-footer",
        "tbody" => "table-body",
        "tr" => "table-row",
        _ => return None,
    })
}

/// Elements kept as a close match, tagged with `html:class="html-<name>"`.
fn indirect_tag(name: &str) -> Option<&'static str> {
    Some(match name {
        "cite" | "dfn" | "i" | "var" => "emphasis",
        "abbr" | "mark" | "small" | "kbd" => "span",
        _ => return None,
    })
}

fn heading_level(name: &str) -> Option<char> {
    let mut chars = name.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some('h'), Some(level @ '1'..='6'), None) => Some(level),
        _ => None,
    }
}

/// Editors like CKEditor pad their markup with tab runs; they carry no content.
fn clean(source: &str) -> String {
    let mut text = source.to_string();
    while text.contains("\t\t") {
        text = text.replace("\t\t", "\t");
    }
    text.replace("\r\n\t", "").replace("\n\t", "")
}

/// Atoms have their own case helpers; compare on the string.
fn local_name(local: &LocalName) -> &str {
    local
}

fn tag_name(handle: &Handle) -> Option<String> {
    match &handle.data {
        NodeData::Element { name, .. } => Some(local_name(&name.local).to_ascii_lowercase()),
        _ => None,
    }
}

fn attribute(handle: &Handle, key: &str) -> Option<String> {
    match &handle.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| local_name(&a.name.local).eq_ignore_ascii_case(key))
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

fn converted_attributes(attrs: &[Attribute]) -> Vec<(QName, String)> {
    let mut out = Vec::new();
    for a in attrs {
        let name = local_name(&a.name.local).to_ascii_lowercase();
        if STANDARD_ATTRIBUTES.contains(&name.as_str()) {
            out.push((QName::html(&name), a.value.to_string()));
        } else if name == "id" {
            out.push((QName::xml("id"), a.value.to_string()));
        }
    }
    out
}

/// The first `<base href>` anywhere in the document.
fn find_base(handle: &Handle) -> Option<String> {
    if tag_name(handle).as_deref() == Some("base") {
        if let Some(href) = attribute(handle, "href") {
            return Some(href);
        }
    }
    handle.children.borrow().iter().find_map(find_base)
}

pub struct HtmlParser<'c, 'a> {
    ctx: &'c ParseContext<'a>,
    base_url: String,
}

impl<'c, 'a> HtmlParser<'c, 'a> {
    pub fn new(ctx: &'c ParseContext<'a>) -> Self {
        HtmlParser {
            ctx,
            base_url: String::new(),
        }
    }

    pub fn parse(mut self, source: &str) -> Element {
        let dom = parse_document(RcDom::default(), ParseOpts::default()).one(clean(source));
        self.base_url = find_base(&dom.document).unwrap_or_default();
        let children = self.children(&dom.document);
        Element::document(Element::page("body").with_children(children))
    }

    fn children(&self, handle: &Handle) -> Vec<Node> {
        let mut out = Vec::new();
        for child in handle.children.borrow().iter() {
            match &child.data {
                NodeData::Text { contents } => {
                    let text = contents.borrow();
                    if text.trim().is_empty() && text.contains('\n') {
                        continue;
                    }
                    out.push(Node::Text(text.to_string()));
                }
                NodeData::Element { .. } => out.extend(self.visit(child)),
                _ => {}
            }
        }
        out
    }

    /// Only element children; text between list items or table rows is noise.
    fn element_children(&self, handle: &Handle) -> Vec<Node> {
        handle
            .children
            .borrow()
            .iter()
            .filter(|child| matches!(child.data, NodeData::Element { .. }))
            .flat_map(|child| self.visit(child))
            .collect()
    }

    fn copy(&self, handle: &Handle, mut elem: Element) -> Element {
        if let NodeData::Element { attrs, .. } = &handle.data {
            for (name, value) in converted_attributes(&attrs.borrow()) {
                if elem.attr(&name).is_none() {
                    elem.set_attr(name, value);
                }
            }
        }
        elem.with_children(self.children(handle))
    }

    /// Relative references resolve against `<base href>` when there is one.
    fn resolve(&self, target: &str) -> String {
        match Url::parse(&self.base_url).and_then(|base| base.join(target)) {
            Ok(url) => url.to_string(),
            Err(_) => target.to_string(),
        }
    }

    fn href(&self, target: &str) -> String {
        let target = self.resolve(target);
        if allowed_uri_scheme(&target, self.ctx.host, DIALECT) {
            target
        } else {
            tracing::warn!(href = %target, "link scheme not allowed");
            wiki_local(&target, None, None)
        }
    }

    fn visit(&self, handle: &Handle) -> Vec<Node> {
        let Some(name) = tag_name(handle) else {
            return Vec::new();
        };
        let name = name.as_str();

        if SYMMETRIC_TAGS.contains(&name) {
            return vec![self.copy(handle, Element::page(name)).into()];
        }
        if let Some(tag) = simple_tag(name) {
            return vec![self.copy(handle, Element::page(tag)).into()];
        }
        if let Some(tag) = indirect_tag(name) {
            let elem = Element::page(tag).with_attr(QName::html("class"), format!("html-{name}"));
            return vec![self.copy(handle, elem).into()];
        }
        if let Some(level) = heading_level(name) {
            let heading = Element::page("h").with_page_attr(attr::OUTLINE_LEVEL, level.to_string());
            return vec![self.copy(handle, heading).into()];
        }

        let elem = match name {
            "html" | "body" => return self.children(handle),
            "base" => return Vec::new(),
            "ul" | "dir" | "ol" => self.list(handle, name),
            "dl" => self.definition_list(handle),
            "li" => {
                let body = Element::page("list-item-body").with_children(self.children(handle));
                Element::page("list-item").with_child(body)
            }
            "acronym" => self.copy(
                handle,
                Element::page("span").with_attr(QName::html("class"), "html-abbr"),
            ),
            "address" => self.copy(
                handle,
                Element::page("div").with_attr(QName::html("class"), "html-address"),
            ),
            "br" => Element::page("line-break"),
            "big" => self.copy(handle, Element::page("span").with_page_attr(attr::FONT_SIZE, "120%")),
            "sub" => self.copy(handle, Element::page("span").with_page_attr(attr::BASELINE_SHIFT, "sub")),
            "sup" => self.copy(handle, Element::page("span").with_page_attr(attr::BASELINE_SHIFT, "super")),
            "hr" => {
                let class = attribute(handle, "class")
                    .filter(|class| ("moin-hr1"..="moin-hr6").contains(&class.as_str()))
                    .unwrap_or_else(|| "moin-hr3".to_string());
                Element::page("separator").with_page_attr(attr::CLASS, class)
            }
            "a" => {
                let mut link = Element::page("a");
                if let Some(href) = attribute(handle, "href") {
                    link.set_attr(QName::xlink("href"), self.href(&href));
                }
                self.copy(handle, link)
            }
            "img" => {
                let src = attribute(handle, "src").unwrap_or_default();
                let object = Element::page("object")
                    .with_page_attr("type", "image/")
                    .with_attr(QName::xlink("href"), self.resolve(&src));
                self.copy(handle, object)
            }
            "object" => {
                let data = attribute(handle, "data").unwrap_or_default();
                Element::page("object").with_attr(QName::xlink("href"), self.resolve(&data))
            }
            "audio" | "video" => {
                let src = attribute(handle, "src").unwrap_or_default();
                let mut media = Element::page(name).with_attr(QName::xlink("href"), self.resolve(&src));
                let kept: &[&str] = if name == "audio" {
                    &["controls"]
                } else {
                    &["controls", "width", "height", "autoplay"]
                };
                for key in kept {
                    if let Some(value) = attribute(handle, key) {
                        media.set_attr(QName::html(key), value);
                    }
                }
                if let Some(id) = attribute(handle, "id") {
                    media.set_attr(QName::xml("id"), id);
                }
                media
            }
            "table" => {
                let mut table = Element::page("table");
                if let NodeData::Element { attrs, .. } = &handle.data {
                    for (name, value) in converted_attributes(&attrs.borrow()) {
                        table.set_attr(name, value);
                    }
                }
                table.with_children(self.element_children(handle))
            }
            "caption" => self.copy(handle, Element::page("caption")),
            "td" | "th" => {
                let mut cell = Element::page("table-cell");
                if let Some(rows) = attribute(handle, "rowspan") {
                    cell.set_page_attr(attr::ROWSPAN, rows);
                }
                if let Some(cols) = attribute(handle, "colspan") {
                    cell.set_page_attr(attr::COLSPAN, cols);
                }
                self.copy(handle, cell)
            }
            _ if IGNORED_TAGS.contains(&name) => {
                tracing::debug!(tag = name, "html element not supported, content dropped");
                return Vec::new();
            }
            _ => {
                tracing::debug!(tag = name, "unknown html element, children kept");
                return self.children(handle);
            }
        };
        vec![elem.into()]
    }

    fn list(&self, handle: &Handle, name: &str) -> Element {
        let mut list = Element::page("list");
        if let NodeData::Element { attrs, .. } = &handle.data {
            for (key, value) in converted_attributes(&attrs.borrow()) {
                list.set_attr(key, value);
            }
        }
        if name == "ol" {
            list.set_page_attr(attr::ITEM_LABEL_GENERATE, "ordered");
            let style = match attribute(handle, "type").as_deref() {
                Some("A") => Some("upper-alpha"),
                Some("I") => Some("upper-roman"),
                Some("a") => Some("lower-alpha"),
                Some("i") => Some("lower-roman"),
                _ => None,
            };
            if let Some(style) = style {
                list.set_page_attr(attr::LIST_STYLE_TYPE, style);
            }
            if let Some(start) = attribute(handle, "start").filter(|s| s.parse::<i64>().is_ok()) {
                list.set_page_attr(attr::LIST_START, start);
            }
        } else {
            list.set_page_attr(attr::ITEM_LABEL_GENERATE, "unordered");
        }
        list.with_children(self.element_children(handle))
    }

    /// Every `dt`/`dd` pair becomes one item.
    fn definition_list(&self, handle: &Handle) -> Element {
        let mut list = Element::page("list");
        let mut pair = Vec::new();
        let mut count = 0;
        for child in handle.children.borrow().iter() {
            let name = tag_name(child);
            if name.is_none() {
                continue;
            }
            if matches!(name.as_deref(), Some("dt") | Some("dd")) {
                count += 1;
            }
            pair.extend(self.visit(child));
            if count == 2 {
                list.push(Element::page("list-item").with_children(std::mem::take(&mut pair)));
                count = 0;
            }
        }
        if !pair.is_empty() {
            list.push(Element::page("list-item").with_children(pair));
        }
        list
    }
}
