//! DocBook 5 XML → document tree
//!
//! A recursive walk over the roxmltree document. Elements with a direct
//! counterpart are renamed, DocBook-only inline and block elements survive as
//! `span`/`div` carrying an `html:class` of `db-<name>`, metadata elements
//! are dropped. Anything outside the DocBook namespace aborts the conversion
//! and the whole document becomes a single error part.

use crate::common::links::{allowed_uri_scheme, scheme_of, wiki_local};
use crate::format::ParseContext;
use crate::ir::names::{attr, DOCBOOK_NS};
use crate::ir::{Element, Namespace, Node, QName};
use roxmltree::{Document, Node as XmlNode};

/// Metadata and machinery without a place in a page; children are skipped too.
const IGNORED_TAGS: &[&str] = &[
    "abstract", "annotation", "area", "areaset", "areaspec", "artpagenums", "author",
    "authorgroup", "authorinitials", "bibliocoverage", "bibliodiv", "biblioentry",
    "bibliography", "biblioid", "bibliolist", "bibliomisc", "bibliomixed", "bibliomset",
    "biblioref", "bibliorelation", "biblioset", "bibliosource", "bridgehead", "callout",
    "calloutlist", "citation", "citerefentry", "citetitle", "classname", "classsynopsis",
    "classsynopsisinfo", "co", "collab", "confdates", "confgroup", "confnum", "confsponsor",
    "conftitle", "constraint", "constraintdef", "constructorsynopsis", "contractnum",
    "contractsponsor", "contrib", "copyright", "cover", "destructorsynopsis", "edition",
    "editor", "extendedlink", "fieldsynopsis", "funcdef", "funcparams", "funcprototype",
    "funcsynopsis", "funcsynopsisinfo", "function", "group", "guibutton", "guiicon",
    "guilabel", "guimenu", "guimenuitem", "guisubmenu", "imageobjectco", "index",
    "indexdiv", "indexentry", "indexterm", "info", "initializer", "interfacename",
    "issuenum", "itermset", "keyword", "keywordset", "legalnotice", "lhs", "methodname",
    "methodparam", "methodsynopsis", "msg", "msgaud", "msgentry", "msgexplan", "msginfo",
    "msglevel", "msgmain", "msgorig", "msgrel", "msgset", "msgsub", "msgtext", "nonterminal",
    "ooclass", "ooexception", "oointerface", "org", "orgdiv", "orgname", "otheraddr",
    "othercredit", "pagenums", "personblurb", "primary", "primaryie", "printhistory",
    "productname", "productnumber", "pubdate", "publisher", "publishername", "refclass",
    "refdescriptor", "refentry", "refentrytitle", "reference", "refmeta", "refmiscinfo",
    "refname", "refnamediv", "refpurpose", "refsect1", "refsect2", "refsect3", "refsection",
    "refsynopsisdiv", "releaseinfo", "revdescription", "revhistory", "revision", "revnumber",
    "revremark", "rhs", "secondary", "secondaryie", "see", "seealso", "seriesvolnums",
    "spanspec", "subjectset", "tertiary", "tertiaryie", "titleabbrev", "toc", "tocdiv",
    "tocentry", "varargs", "void", "volumenum", "xref", "arc",
];

/// Inline elements kept as `span html:class="db-<name>"`.
pub(super) const INLINE_TAGS: &[&str] = &[
    "abbrev", "accel", "acronym", "address", "affiliation", "alt", "anchor", "city", "command",
    "constant", "country", "database", "date", "errorcode", "errorname", "errortext",
    "errortype", "exceptionname", "fax", "filename", "firstname", "firstterm", "foreignphrase",
    "hardware", "holder", "honorific", "jobtitle", "keycap", "keycode", "keycombo", "keysym",
    "lineannotation", "manvolnum", "mousebutton", "option", "optional", "package", "person",
    "personname", "phone", "pob", "postcode", "prompt", "remark", "replaceable", "returnvalue",
    "shortaffil", "shortcut", "state", "street", "surname", "symbol", "systemitem", "termdef",
    "type", "uri", "userinput", "varname", "wordasword",
];

/// Block elements kept as `div html:class="db-<name>"`; also the accepted roots.
const BLOCK_TAGS: &[&str] = &[
    "acknowledgements", "appendix", "article", "book", "caption", "chapter", "cmdsynopsis",
    "colophon", "dedication", "epigraph", "equation", "example", "figure", "part", "partintro",
    "screenshoot", "set", "setindex", "sidebar", "simplesect", "subtitle", "synopfragment",
    "synopsis", "task", "taskprerequisites", "taskrelated", "tasksummary", "title",
];

const ADMONITION_TAGS: &[&str] = &[
    "attention", "caution", "danger", "error", "hint", "important", "note", "tip", "warning",
];

const LIST_ITEM_TAGS: &[&str] = &["listitem", "step", "stepalternatives", "member"];

/// `(media element, data element, preferred formats, type prefix)`
const MEDIA_TAGS: &[(&str, &str, &[&str], &str)] = &[
    ("audioobject", "audiodata", &["x-wav", "mpeg", "ogg", "webm"], "audio/"),
    ("imageobject", "imagedata", &["gif", "png", "jpeg", "jpg", "svg"], "image/"),
    ("videoobject", "videodata", &["ogg", "webm", "mp4"], "video/"),
];

/// Elements that map one to one.
fn simple_tag(name: &str) -> Option<&'static str> {
    Some(match name {
        "code" | "computeroutput" | "literal" | "markup" => "code",
        "glossdef" | "listitem" => "list-item-body",
        "glossentry" | "varlistentry" => "list-item",
        "glosslist" | "variablelist" => "list",
        "glossterm" | "term" => "list-item-label",
        "para" | "simpara" => "p",
        "phrase" => "span",
        "programlisting" | "screen" => "blockcode",
        "quote" => "quote",
        "row" | "tr" => "table-row",
        "thead" => "table-header",
        "tfoot" => "table-footer",
        "tbody" => "table-body",
        _ => return None,
    })
}

/// Raised for elements outside the DocBook namespace.
#[derive(Debug)]
struct UnknownNamespace;

type Visit = Result<Vec<Node>, UnknownNamespace>;

pub struct DocBookParser<'c, 'a> {
    ctx: &'c ParseContext<'a>,
    section_level: usize,
    has_sections: bool,
}

impl<'c, 'a> DocBookParser<'c, 'a> {
    pub fn new(ctx: &'c ParseContext<'a>) -> Self {
        DocBookParser {
            ctx,
            section_level: 0,
            has_sections: false,
        }
    }

    pub fn parse(mut self, source: &str) -> Element {
        if source.trim().is_empty() {
            return Element::empty_document();
        }
        let document = match Document::parse(source) {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(error = %err, "docbook input is not well-formed");
                return Element::error_document(&err.to_string());
            }
        };
        let root = document.root_element();
        if !BLOCK_TAGS.contains(&root.tag_name().name()) {
            return Element::error_document("The root element of the docbook document is not supported by the converter");
        }
        let mut children = match self.visit(&document, root) {
            Ok(children) => children,
            Err(UnknownNamespace) => return Element::error_document("Unknown namespace"),
        };
        if self.has_sections {
            children.insert(0, Element::page("table-of-content").into());
        }
        let mut page = Element::document(Element::page("body").with_children(children));
        for (name, value) in standard_attributes(root) {
            page.set_attr(name, value);
        }
        page
    }

    fn children(&mut self, doc: &Document<'_>, node: XmlNode<'_, '_>) -> Visit {
        let mut out = Vec::new();
        for child in node.children() {
            if child.is_element() {
                out.extend(self.visit(doc, child)?);
            } else if let Some(text) = child.text().filter(|t| !t.trim().is_empty()) {
                out.push(Node::Text(text.to_string()));
            }
        }
        Ok(out)
    }

    fn copy(&mut self, doc: &Document<'_>, node: XmlNode<'_, '_>, tag: &str) -> Result<Element, UnknownNamespace> {
        Ok(Element::page(tag).with_children(self.children(doc, node)?))
    }

    fn visit(&mut self, doc: &Document<'_>, node: XmlNode<'_, '_>) -> Visit {
        if node.tag_name().namespace() != Some(DOCBOOK_NS) {
            return Err(UnknownNamespace);
        }
        let mut nodes = self.visit_docbook(doc, node)?;
        if let Some(Node::Element(first)) = nodes.first_mut() {
            for (name, value) in standard_attributes(node) {
                if first.attr(&name).is_none() {
                    first.set_attr(name, value);
                }
            }
            if self.ctx.host.add_lineno && first.attr(&QName::html(attr::LINENO)).is_none() {
                let line = doc.text_pos_at(node.range().start).row;
                first.set_attr(QName::html(attr::LINENO), line.to_string());
            }
        }
        Ok(nodes)
    }

    fn visit_docbook(&mut self, doc: &Document<'_>, node: XmlNode<'_, '_>) -> Visit {
        let name = node.tag_name().name();

        if let Some(level) = name.strip_prefix("sect").and_then(|l| l.parse::<usize>().ok()) {
            if (1..=5).contains(&level) {
                self.has_sections = true;
                return self.section(doc, node, level);
            }
        }
        if INLINE_TAGS.contains(&name) {
            let span = self.copy(doc, node, "span")?.with_attr(QName::html("class"), format!("db-{name}"));
            return Ok(vec![span.into()]);
        }
        if BLOCK_TAGS.contains(&name) {
            let div = self.copy(doc, node, "div")?.with_attr(QName::html("class"), format!("db-{name}"));
            return Ok(vec![div.into()]);
        }
        if let Some(tag) = simple_tag(name) {
            return Ok(vec![self.copy(doc, node, tag)?.into()]);
        }
        if IGNORED_TAGS.contains(&name) {
            tracing::warn!(tag = name, "ignored docbook element");
            return Ok(Vec::new());
        }
        if ADMONITION_TAGS.contains(&name) {
            let admonition = self.copy(doc, node, "admonition")?.with_page_attr("type", name);
            return Ok(vec![admonition.into()]);
        }

        let elem = match name {
            "section" => {
                self.has_sections = true;
                self.section_level += 1;
                let level = self.section_level;
                let result = self.section(doc, node, level);
                self.section_level -= 1;
                return result;
            }
            "blockquote" => {
                let mut source = "Unknown".to_string();
                let mut children = Vec::new();
                for child in node.children() {
                    if child.is_element() && child.tag_name().name() == "attribution" {
                        source = text_of(child);
                    } else if child.is_element() {
                        children.extend(self.children(doc, child)?);
                    } else if let Some(text) = child.text().filter(|t| !t.trim().is_empty()) {
                        children.push(Node::Text(text.to_string()));
                    }
                }
                Element::page("blockquote")
                    .with_page_attr("source", source)
                    .with_children(children)
            }
            "emphasis" => {
                let tag = match node.attribute("role") {
                    Some("bold") | Some("strong") => "strong",
                    _ => "emphasis",
                };
                self.copy(doc, node, tag)?
            }
            "entrytbl" => Element::page("table-cell").with_child(self.copy(doc, node, "table")?),
            "footnote" => {
                let body = self.copy(doc, node, "note-body")?;
                Element::page("note")
                    .with_page_attr(attr::NOTE_CLASS, "footnote")
                    .with_child(body)
            }
            "formalpara" => {
                let title = child_named(node, "title").map(text_of).unwrap_or_default();
                let children = match child_named(node, "para") {
                    Some(para) => self.children(doc, para)?,
                    None => Vec::new(),
                };
                Element::page("p")
                    .with_attr(QName::html("title"), title)
                    .with_children(children)
            }
            "informalequation" | "informalexample" | "informalfigure" => {
                let class = format!("db-{}", name.trim_start_matches("informal"));
                self.copy(doc, node, "div")?.with_attr(QName::html("class"), class)
            }
            "inlineequation" => self.copy(doc, node, "span")?.with_page_attr("element", "equation"),
            "inlinemediaobject" => Element::page("span")
                .with_attr(QName::html("class"), "db-inlinemediaobject")
                .with_children(self.media(doc, node)?),
            "mediaobject" => Element::page("div")
                .with_attr(QName::html("class"), "db-mediaobject")
                .with_children(self.media(doc, node)?),
            "itemizedlist" | "simplelist" => {
                self.simple_list(doc, node, Some("unordered"), None)?
            }
            "orderedlist" => {
                let style = match node.attribute("numeration") {
                    Some("upperalpha") => Some("upper-alpha"),
                    Some("loweralpha") => Some("lower-alpha"),
                    Some("upperroman") => Some("upper-roman"),
                    Some("lowerroman") => Some("lower-roman"),
                    _ => None,
                };
                self.simple_list(doc, node, Some("ordered"), style)?
            }
            "procedure" | "substeps" => self.simple_list(doc, node, Some("ordered"), None)?,
            "segmentedlist" => self.segmented_list(doc, node)?,
            "qandaset" => return self.qandaset(doc, node),
            "link" => {
                let mut link = Element::page("a");
                if let Some(title) = xlink_attribute(node, "title") {
                    link.set_attr(QName::html("title"), title);
                }
                let href = match node.attribute("linkend") {
                    Some(linkend) => format!("#{linkend}"),
                    None => xlink_attribute(node, "href").unwrap_or_default().to_string(),
                };
                let href = if scheme_of(&href).is_some() {
                    href
                } else {
                    format!("wiki.local:{href}")
                };
                link.set_attr(QName::xlink("href"), href);
                link.with_children(self.children(doc, node)?)
            }
            "literallayout" => self
                .copy(doc, node, "blockcode")?
                .with_attr(QName::html("class"), "db-literallayout"),
            "olink" => {
                let target = node.attribute("targetdoc").zip(node.attribute("targetptr"));
                match target {
                    Some((target, pointer)) if allowed_uri_scheme(target, self.ctx.host, "docbook") => self
                        .copy(doc, node, "a")?
                        .with_attr(QName::xlink("href"), format!("{target}#{pointer}")),
                    _ => return Ok(Vec::new()),
                }
            }
            "sbr" => Element::page("line-break"),
            "subscript" => self.copy(doc, node, "span")?.with_page_attr(attr::BASELINE_SHIFT, "sub"),
            "superscript" => self.copy(doc, node, "span")?.with_page_attr(attr::BASELINE_SHIFT, "super"),
            "table" | "informaltable" => {
                let mut table = Element::page("table");
                for child in node.children().filter(|c| c.is_element()) {
                    table.children.extend(self.visit(doc, child)?);
                }
                table
            }
            "tgroup" => return self.children(doc, node),
            "tag" => {
                let class = match node.attribute("class") {
                    Some(class) => format!("db-tag-{class}"),
                    None => "db-tag".to_string(),
                };
                let mut span = Element::page("span").with_attr(QName::html("class"), class);
                if let Some(namespace) = node.attribute("namespace") {
                    span.push(format!("{{{namespace}}}"));
                }
                span.with_children(self.children(doc, node)?)
            }
            "trademark" => {
                let mut children = self.children(doc, node)?;
                match node.attribute("class") {
                    Some("copyright") => children.insert(0, Node::Text("\u{a9} ".to_string())),
                    Some("registered") => children.push(Node::Text("\u{ae}".to_string())),
                    Some("trade") => children.push(Node::Text("\u{2122}".to_string())),
                    Some("service") => children.push(
                        Element::page("span")
                            .with_page_attr(attr::BASELINE_SHIFT, "super")
                            .with_child("SM")
                            .into(),
                    ),
                    _ => {}
                }
                Element::page("span")
                    .with_attr(QName::html("class"), "db-trademark")
                    .with_children(children)
            }
            "entry" => {
                let mut cell = self.copy(doc, node, "table-cell")?;
                let extra = |key: &str| {
                    node.attribute(key)
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .map(|n| (n + 1).to_string())
                };
                if let Some(rows) = extra("morerows") {
                    cell.set_page_attr(attr::ROWSPAN, rows);
                }
                if let Some(cols) = extra("morecols") {
                    cell.set_page_attr(attr::COLSPAN, cols);
                }
                cell
            }
            "td" | "th" => {
                let mut cell = self.copy(doc, node, "table-cell")?;
                if let Some(rows) = node.attribute("rowspan") {
                    cell.set_page_attr(attr::ROWSPAN, rows);
                }
                if let Some(cols) = node.attribute("colspan") {
                    cell.set_page_attr(attr::COLSPAN, cols);
                }
                cell
            }
            "ulink" => {
                let href = node
                    .attribute("url")
                    .filter(|url| allowed_uri_scheme(url, self.ctx.host, "docbook"))
                    .unwrap_or("");
                self.copy(doc, node, "a")?.with_attr(QName::xlink("href"), href)
            }
            _ => return self.children(doc, node),
        };
        Ok(vec![elem.into()])
    }

    /// A heading from the `title` child, followed by the other children.
    fn section(&mut self, doc: &Document<'_>, node: XmlNode<'_, '_>, level: usize) -> Visit {
        let title = match child_named(node, "title") {
            Some(title) => self.children(doc, title)?,
            None => Vec::new(),
        };
        let mut out = vec![Element::page("h")
            .with_page_attr(attr::OUTLINE_LEVEL, level.to_string())
            .with_children(title)
            .into()];
        for child in node.children() {
            if child.is_element() {
                if child.tag_name().name() != "title" {
                    out.extend(self.visit(doc, child)?);
                }
            } else if let Some(text) = child.text().filter(|t| !t.trim().is_empty()) {
                out.push(Node::Text(text.to_string()));
            }
        }
        Ok(out)
    }

    fn simple_list(
        &mut self,
        doc: &Document<'_>,
        node: XmlNode<'_, '_>,
        generate: Option<&str>,
        style: Option<&str>,
    ) -> Result<Element, UnknownNamespace> {
        let mut list = Element::page("list");
        if let Some(generate) = generate {
            list.set_page_attr(attr::ITEM_LABEL_GENERATE, generate);
        }
        if let Some(style) = style {
            list.set_page_attr(attr::LIST_STYLE_TYPE, style);
        }
        for child in node.children().filter(|c| c.is_element()) {
            if LIST_ITEM_TAGS.contains(&child.tag_name().name()) {
                if child.tag_name().namespace() != Some(DOCBOOK_NS) {
                    return Err(UnknownNamespace);
                }
                let body = Element::page("list-item-body").with_children(self.children(doc, child)?);
                list.push(Element::page("list-item").with_child(body));
            } else {
                list.children.extend(self.visit(doc, child)?);
            }
        }
        Ok(list)
    }

    /// Labels come from the leading `segtitle`s and repeat for every entry.
    fn segmented_list(&mut self, doc: &Document<'_>, node: XmlNode<'_, '_>) -> Result<Element, UnknownNamespace> {
        let mut labels: Vec<Vec<Node>> = Vec::new();
        let mut list = Element::page("list");
        for child in node.children().filter(|c| c.is_element()) {
            match child.tag_name().name() {
                "segtitle" => labels.push(self.children(doc, child)?),
                "seglistitem" => {
                    let segments = child.children().filter(|c| c.is_element() && c.tag_name().name() == "seg");
                    for (index, seg) in segments.enumerate() {
                        let label = labels
                            .get(index % labels.len().max(1))
                            .cloned()
                            .unwrap_or_default();
                        let item = Element::page("list-item")
                            .with_child(Element::page("list-item-label").with_children(label))
                            .with_child(Element::page("list-item-body").with_children(self.children(doc, seg)?));
                        list.push(item);
                    }
                }
                _ => list.children.extend(self.visit(doc, child)?),
            }
        }
        Ok(list)
    }

    fn qandaset(&mut self, doc: &Document<'_>, node: XmlNode<'_, '_>) -> Visit {
        let numbered = match node.attribute("defaultlabel") {
            Some("number") => true,
            Some("qanda") => false,
            _ => return self.children(doc, node),
        };
        let mut list = Element::page("list");
        if numbered {
            list.set_page_attr(attr::ITEM_LABEL_GENERATE, "ordered");
        }
        for child in node.children().filter(|c| c.is_element()) {
            if child.tag_name().name() != "qandaentry" {
                list.children.extend(self.visit(doc, child)?);
                continue;
            }
            let mut body = Vec::new();
            for part in child.children().filter(|c| c.is_element()) {
                let label = match part.tag_name().name() {
                    "question" => "Q:",
                    "answer" => "A:",
                    _ => {
                        list.children.extend(self.visit(doc, part)?);
                        continue;
                    }
                };
                let content = self.children(doc, part)?;
                if numbered {
                    body.extend(content);
                } else {
                    list.push(
                        Element::page("list-item")
                            .with_child(Element::page("list-item-label").with_child(label))
                            .with_child(Element::page("list-item-body").with_children(content)),
                    );
                }
            }
            if numbered {
                list.push(Element::page("list-item").with_child(Element::page("list-item-body").with_children(body)));
            }
        }
        Ok(vec![list.into()])
    }

    /// The best media object of a `mediaobject`, or its text alternative.
    fn media(&mut self, doc: &Document<'_>, node: XmlNode<'_, '_>) -> Visit {
        let mut media = None;
        let mut text_object = None;
        let mut caption = Vec::new();
        for child in node.children().filter(|c| c.is_element()) {
            let name = child.tag_name().name();
            if let Some(entry) = MEDIA_TAGS.iter().find(|(tag, ..)| *tag == name) {
                media = Some((child, entry));
            }
            match name {
                "caption" => caption = self.children(doc, child)?,
                "textobject" => text_object = Some(child),
                _ => {}
            }
        }
        let Some((object, (_, data_tag, formats, type_prefix))) = media else {
            return match text_object {
                Some(text) => Ok(vec![self.copy(doc, text, "p")?.into()]),
                None => Ok(Vec::new()),
            };
        };

        let mut chosen = None;
        for data in object.children().filter(|c| c.is_element() && c.tag_name().name() == *data_tag) {
            match data.attribute("format").map(str::to_lowercase) {
                Some(format) if formats.contains(&format.as_str()) => {
                    chosen = Some(data);
                    break;
                }
                Some(_) => chosen = None,
                None => chosen = Some(data),
            }
        }
        let Some(data) = chosen else {
            return match text_object {
                Some(text) => Ok(vec![self.copy(doc, text, "p")?.into()]),
                None => Ok(Vec::new()),
            };
        };
        let Some(href) = data.attribute("fileref") else {
            return Ok(Vec::new());
        };

        let mut include = Element::new(QName::xinclude("include")).with_attr(QName::html("alt"), href);
        if href.contains("://") {
            include.set_attr(QName::xlink("href"), href);
        } else {
            let (path, query) = match href.split_once('?') {
                Some((path, query)) => (path, Some(query)),
                None => (href, None),
            };
            include.set_attr(QName::xinclude("href"), wiki_local(path, query, None));
        }
        let media_type = match data.attribute("format") {
            Some(format) => format!("{type_prefix}{}", format.to_lowercase()),
            None => type_prefix.to_string(),
        };
        include.set_page_attr("type", media_type);
        if let Some(align) = data
            .attribute("align")
            .filter(|a| matches!(*a, "left" | "center" | "right" | "top" | "middle" | "bottom"))
        {
            include.set_attr(QName::html("class"), align);
        }
        if caption.is_empty() {
            return Ok(vec![include.into()]);
        }
        let caption = Element::page("span")
            .with_page_attr(attr::CLASS, "db-caption")
            .with_children(caption);
        Ok(vec![Element::page("span").with_child(include).with_child(caption).into()])
    }
}

/// `xml:id`, `xml:lang` and `xml:base` carry over to the generated element.
fn standard_attributes(node: XmlNode<'_, '_>) -> Vec<(QName, String)> {
    node.attributes()
        .filter(|a| a.namespace() == Some(Namespace::Xml.uri()) && matches!(a.name(), "id" | "base" | "lang"))
        .map(|a| (QName::xml(a.name()), a.value().to_string()))
        .collect()
}

fn xlink_attribute<'n>(node: XmlNode<'n, '_>, name: &str) -> Option<&'n str> {
    node.attributes()
        .find(|a| a.namespace() == Some(Namespace::Xlink.uri()) && a.name() == name)
        .map(|a| a.value())
}

fn child_named<'n, 'i>(node: XmlNode<'n, 'i>, name: &str) -> Option<XmlNode<'n, 'i>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

fn text_of(node: XmlNode<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect::<String>()
        .trim()
        .to_string()
}
