//! Document tree → DocBook 5 XML
//!
//! Headings have no direct counterpart: a heading at body level opens a
//! `section` that runs until the next heading of the same or a higher level.
//! Headings nested deeper than the body become `bridgehead`s.

use super::parser::INLINE_TAGS;
use crate::common::links::unquote;
use crate::common::nowiki::NowikiBlock;
use crate::error::ConvertError;
use crate::ir::names::{attr, Namespace, QName, DOCBOOK_NS, XLINK_NS};
use crate::ir::xml::escape_xml;
use crate::ir::{Element, Node};

const LOCAL_PREFIX: &str = "wiki.local:";

/// Admonitions DocBook has elements for; others keep only their content.
const ADMONITIONS: &[&str] = &["caution", "important", "note", "tip", "warning"];

const BLOCK_NAMES: &[&str] = &[
    "admonition", "blockcode", "blockquote", "body", "div", "error", "figure", "h", "line-block",
    "list", "nowiki", "p", "part", "separator", "table", "table-of-content",
];

/// Serialize a `page` tree into a DocBook `article` titled `title`.
pub fn serialize(doc: &Element, title: &str) -> Result<String, ConvertError> {
    let mut writer = DocBookWriter::default();
    writer.out.push_str(&format!(
        "<article xmlns=\"{DOCBOOK_NS}\" xmlns:xlink=\"{XLINK_NS}\" version=\"5.0\"><info><title>{}</title></info>",
        escape_xml(title)
    ));
    if doc.is_page("page") {
        writer.top_level(&doc.children)?;
    } else {
        writer.top_level(std::slice::from_ref(&Node::Element(doc.clone())))?;
    }
    while writer.sections.pop().is_some() {
        writer.out.push_str("</section>");
    }
    writer.out.push_str("</article>\n");
    Ok(writer.out)
}

fn is_block(node: &Node) -> bool {
    match node {
        Node::Element(elem) => elem.page_name().is_some_and(|name| BLOCK_NAMES.contains(&name)),
        Node::Text(_) => false,
    }
}

fn level_of(elem: &Element) -> Result<usize, ConvertError> {
    match elem.page_attr(attr::OUTLINE_LEVEL) {
        None => Ok(1),
        Some(level) => level
            .trim()
            .parse()
            .map_err(|_| ConvertError::Serialization("outline-level needs to be an integer".to_string())),
    }
}

fn local_target(href: &str) -> String {
    match href.strip_prefix(LOCAL_PREFIX) {
        Some(local) => unquote(local),
        None => href.to_string(),
    }
}

#[derive(Default)]
struct DocBookWriter {
    out: String,
    /// Levels of the open sections, innermost last
    sections: Vec<usize>,
    tables: usize,
}

impl DocBookWriter {
    fn top_level(&mut self, nodes: &[Node]) -> Result<(), ConvertError> {
        for node in nodes {
            match node {
                Node::Element(elem) if elem.is_page("body") || elem.is_page("div") => {
                    self.top_level(&elem.children)?
                }
                Node::Element(elem) if elem.is_page("h") => {
                    let level = level_of(elem)?;
                    while self.sections.last().is_some_and(|open| *open >= level) {
                        self.sections.pop();
                        self.out.push_str("</section>");
                    }
                    self.sections.push(level);
                    self.out.push_str("<section><title>");
                    self.inlines(&elem.children)?;
                    self.out.push_str("</title>");
                }
                _ => self.block(node)?,
            }
        }
        Ok(())
    }

    fn blocks(&mut self, nodes: &[Node]) -> Result<(), ConvertError> {
        let mut run: Vec<&Node> = Vec::new();
        for node in nodes {
            if is_block(node) {
                self.paragraph(&run)?;
                run.clear();
                self.block(node)?;
            } else {
                run.push(node);
            }
        }
        self.paragraph(&run)
    }

    /// Loose inline content as a `simpara`, skipped when blank.
    fn paragraph(&mut self, run: &[&Node]) -> Result<(), ConvertError> {
        let blank = run.iter().all(|node| matches!(node, Node::Text(t) if t.trim().is_empty()));
        if blank {
            return Ok(());
        }
        self.out.push_str("<simpara>");
        for node in run {
            self.inline(node)?;
        }
        self.out.push_str("</simpara>");
        Ok(())
    }

    /// Content of a container that may hold either blocks or bare inlines.
    fn container(&mut self, nodes: &[Node]) -> Result<(), ConvertError> {
        if nodes.iter().any(is_block) {
            self.blocks(nodes)
        } else {
            let run: Vec<&Node> = nodes.iter().collect();
            self.paragraph(&run)
        }
    }

    fn block(&mut self, node: &Node) -> Result<(), ConvertError> {
        let elem = match node {
            Node::Text(_) => return self.paragraph(&[node]),
            Node::Element(elem) => elem,
        };
        if elem.name == QName::xinclude("include") || elem.is_page("object") {
            self.out.push_str("<mediaobject>");
            self.media_object(elem);
            self.out.push_str("</mediaobject>");
            return Ok(());
        }
        let Some(name) = elem.page_name() else {
            return self.blocks(&elem.children);
        };
        match name {
            "body" | "div" | "line-block" => self.blocks(&elem.children)?,
            "p" => match elem.attr(&QName::html("title")) {
                Some(title) => {
                    self.out
                        .push_str(&format!("<formalpara><title>{}</title><para>", escape_xml(title)));
                    self.inlines(&elem.children)?;
                    self.out.push_str("</para></formalpara>");
                }
                None => {
                    self.out.push_str("<simpara>");
                    self.inlines(&elem.children)?;
                    self.out.push_str("</simpara>");
                }
            },
            "h" => {
                let level = level_of(elem)?.clamp(1, 5);
                self.out.push_str(&format!("<bridgehead renderas=\"sect{level}\">"));
                self.inlines(&elem.children)?;
                self.out.push_str("</bridgehead>");
            }
            "nowiki" if NowikiBlock::from_element(elem).is_none() => self.blocks(&elem.children)?,
            "blockcode" | "nowiki" => {
                self.out.push_str(&format!("<screen>{}</screen>", escape_xml(&elem.text_content())));
            }
            "blockquote" => {
                let source = elem.page_attr("source").unwrap_or("Unknown");
                self.out
                    .push_str(&format!("<blockquote><attribution>{}</attribution>", escape_xml(source)));
                self.container(&elem.children)?;
                self.out.push_str("</blockquote>");
            }
            "admonition" => {
                let kind = elem.page_attr("type").filter(|kind| ADMONITIONS.contains(kind));
                match kind {
                    Some(kind) => {
                        self.out.push_str(&format!("<{kind}>"));
                        self.container(&elem.children)?;
                        self.out.push_str(&format!("</{kind}>"));
                    }
                    None => self.container(&elem.children)?,
                }
            }
            "figure" => {
                self.out.push_str("<informalfigure>");
                for child in &elem.children {
                    match child {
                        Node::Element(media) if media.name == QName::xinclude("include") || media.is_page("object") => {
                            self.out.push_str("<mediaobject>");
                            self.media_object(media);
                            self.out.push_str("</mediaobject>");
                        }
                        _ => self.block(child)?,
                    }
                }
                self.out.push_str("</informalfigure>");
            }
            "list" => self.list(elem)?,
            "table" => self.table(elem)?,
            "table-of-content" => self.out.push_str("<toc/>"),
            "part" => match elem.find("body") {
                Some(body) => self.blocks(&body.children)?,
                None => {
                    let alt = elem.page_attr(attr::ALT).unwrap_or_default();
                    self.out.push_str(&format!("<simpara><remark>{}</remark></simpara>", escape_xml(alt)));
                }
            },
            "error" => {
                self.out.push_str(&format!(
                    "<simpara><remark>{}</remark></simpara>",
                    escape_xml(&elem.text_content())
                ));
            }
            "separator" => tracing::warn!("docbook has no separator element, dropped"),
            _ => self.paragraph(&[node])?,
        }
        Ok(())
    }

    fn list(&mut self, list: &Element) -> Result<(), ConvertError> {
        let (open, close) = match list.page_attr(attr::ITEM_LABEL_GENERATE) {
            Some("ordered") => {
                let numeration = match list.page_attr(attr::LIST_STYLE_TYPE) {
                    Some("upper-alpha") => "upperalpha",
                    Some("lower-alpha") => "loweralpha",
                    Some("upper-roman") => "upperroman",
                    Some("lower-roman") => "lowerroman",
                    _ => "arabic",
                };
                (format!("<orderedlist numeration=\"{numeration}\">"), "</orderedlist>")
            }
            Some("unordered") => ("<itemizedlist>".to_string(), "</itemizedlist>"),
            _ => return self.variable_list(list),
        };
        self.out.push_str(&open);
        for item in list.elements().filter(|e| e.is_page("list-item")) {
            self.out.push_str("<listitem>");
            match item.find("list-item-body") {
                Some(body) => self.container(&body.children)?,
                None => self.container(&item.children)?,
            }
            self.out.push_str("</listitem>");
        }
        self.out.push_str(close);
        Ok(())
    }

    fn variable_list(&mut self, list: &Element) -> Result<(), ConvertError> {
        self.out.push_str("<variablelist>");
        for item in list.elements().filter(|e| e.is_page("list-item")) {
            self.out.push_str("<varlistentry><term>");
            if let Some(label) = item.find("list-item-label") {
                self.inlines(&label.children)?;
            }
            self.out.push_str("</term><listitem>");
            if let Some(body) = item.find("list-item-body") {
                self.container(&body.children)?;
            }
            self.out.push_str("</listitem></varlistentry>");
        }
        self.out.push_str("</variablelist>");
        Ok(())
    }

    fn table(&mut self, table: &Element) -> Result<(), ConvertError> {
        self.tables += 1;
        let caption = match (table.attr(&QName::html("title")), table.find("caption")) {
            (Some(title), _) => escape_xml(title),
            (None, Some(caption)) => escape_xml(&caption.text_content()),
            (None, None) => format!("Table {}", self.tables),
        };
        self.out.push_str(&format!("<table><caption>{caption}</caption>"));
        for part in table.elements() {
            let tag = match part.page_name() {
                Some("table-header") => "thead",
                Some("table-body") => "tbody",
                Some("table-footer") => "tfoot",
                _ => continue,
            };
            self.out.push_str(&format!("<{tag}>"));
            for row in part.elements().filter(|e| e.is_page("table-row")) {
                self.out.push_str("<tr>");
                for cell in row.elements().filter(|e| e.is_page("table-cell")) {
                    self.out.push_str("<td");
                    if let Some(rows) = cell.page_attr(attr::ROWSPAN) {
                        self.out.push_str(&format!(" rowspan=\"{}\"", escape_xml(rows)));
                    }
                    if let Some(cols) = cell.page_attr(attr::COLSPAN) {
                        self.out.push_str(&format!(" colspan=\"{}\"", escape_xml(cols)));
                    }
                    self.out.push('>');
                    if cell.children.iter().any(is_block) {
                        self.blocks(&cell.children)?;
                    } else {
                        self.inlines(&cell.children)?;
                    }
                    self.out.push_str("</td>");
                }
                self.out.push_str("</tr>");
            }
            self.out.push_str(&format!("</{tag}>"));
        }
        self.out.push_str("</table>");
        Ok(())
    }

    /// `imageobject`, `audioobject` or `videoobject` chosen by the media type.
    fn media_object(&mut self, elem: &Element) {
        let href = elem
            .attr(&QName::xlink("href"))
            .or_else(|| elem.attr(&QName::xinclude("href")))
            .unwrap_or_default();
        let media_type = elem.page_attr("type").unwrap_or_default();
        let (object, data) = match media_type.split('/').next() {
            Some("audio") => ("audioobject", "audiodata"),
            Some("video") => ("videoobject", "videodata"),
            _ => ("imageobject", "imagedata"),
        };
        self.out.push_str(&format!(
            "<{object}><{data} fileref=\"{}\"",
            escape_xml(&local_target(href))
        ));
        if let Some(format) = media_type.split_once('/').map(|(_, sub)| sub).filter(|s| !s.is_empty()) {
            self.out.push_str(&format!(" format=\"{}\"", escape_xml(format)));
        }
        self.out.push_str(&format!("/></{object}>"));
        let alt = elem
            .page_attr(attr::ALT)
            .or_else(|| elem.attr(&QName::html(attr::ALT)));
        if let Some(alt) = alt.filter(|alt| *alt != href && *alt != local_target(href)) {
            self.out
                .push_str(&format!("<textobject><phrase>{}</phrase></textobject>", escape_xml(alt)));
        }
    }

    fn inlines(&mut self, nodes: &[Node]) -> Result<(), ConvertError> {
        for node in nodes {
            self.inline(node)?;
        }
        Ok(())
    }

    fn wrap(&mut self, open: &str, close: &str, elem: &Element) -> Result<(), ConvertError> {
        self.out.push_str(open);
        self.inlines(&elem.children)?;
        self.out.push_str(close);
        Ok(())
    }

    fn inline(&mut self, node: &Node) -> Result<(), ConvertError> {
        let elem = match node {
            Node::Text(text) => {
                self.out.push_str(&escape_xml(text));
                return Ok(());
            }
            Node::Element(elem) => elem,
        };
        if elem.name == QName::xinclude("include") || elem.is_page("object") {
            self.out.push_str("<inlinemediaobject>");
            self.media_object(elem);
            self.out.push_str("</inlinemediaobject>");
            return Ok(());
        }
        if elem.name.ns != Namespace::Page {
            return self.inlines(&elem.children);
        }
        match elem.local_name() {
            "emphasis" => self.wrap("<emphasis>", "</emphasis>", elem)?,
            "strong" => self.wrap("<emphasis role=\"strong\">", "</emphasis>", elem)?,
            "u" | "ins" => self.wrap("<emphasis role=\"underline\">", "</emphasis>", elem)?,
            "s" | "del" => self.wrap("<emphasis role=\"strikethrough\">", "</emphasis>", elem)?,
            "code" => self.wrap("<literal>", "</literal>", elem)?,
            "nowiki" => {
                self.out.push_str(&format!("<literal>{}</literal>", escape_xml(&elem.text_content())));
            }
            "quote" => self.wrap("<quote>", "</quote>", elem)?,
            "line-break" => self.out.push_str("<sbr/>"),
            "a" => self.link(elem)?,
            "note" => {
                self.out.push_str("<footnote>");
                match elem.find("note-body") {
                    Some(body) => self.container(&body.children)?,
                    None => self.container(&elem.children)?,
                }
                self.out.push_str("</footnote>");
            }
            "span" => self.span(elem)?,
            "inline-part" => match elem.find("inline-body") {
                Some(body) => self.inlines(&body.children)?,
                None => {
                    let alt = elem.page_attr(attr::ALT).unwrap_or_default();
                    self.out.push_str(&format!("<remark>{}</remark>", escape_xml(alt)));
                }
            },
            _ => self.inlines(&elem.children)?,
        }
        Ok(())
    }

    fn link(&mut self, elem: &Element) -> Result<(), ConvertError> {
        let href = elem.attr(&QName::xlink("href")).unwrap_or_default();
        match href.strip_prefix(LOCAL_PREFIX).and_then(|h| h.strip_prefix('#')) {
            Some(anchor) => self.out.push_str(&format!("<link linkend=\"{}\"", escape_xml(anchor))),
            None => self
                .out
                .push_str(&format!("<link xlink:href=\"{}\"", escape_xml(&local_target(href)))),
        }
        if let Some(title) = elem.attr(&QName::html("title")) {
            self.out.push_str(&format!(" xlink:title=\"{}\"", escape_xml(title)));
        }
        self.wrap(">", "</link>", elem)
    }

    fn span(&mut self, elem: &Element) -> Result<(), ConvertError> {
        match elem.page_attr(attr::BASELINE_SHIFT) {
            Some("super") => return self.wrap("<superscript>", "</superscript>", elem),
            Some("sub") => return self.wrap("<subscript>", "</subscript>", elem),
            _ => {}
        }
        let element = elem
            .attr(&QName::html("class"))
            .and_then(|class| class.strip_prefix("db-"));
        match element {
            // each object inside writes its own inlinemediaobject
            Some("inlinemediaobject") => self.inlines(&elem.children),
            Some(tag) if INLINE_TAGS.contains(&tag) => self.wrap(&format!("<{tag}>"), &format!("</{tag}>"), elem),
            _ => self.wrap("<phrase>", "</phrase>", elem),
        }
    }
}
