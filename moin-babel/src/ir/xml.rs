//! XML view of the document tree
//!
//! The writer uses the page namespace as the default namespace, so page elements
//! and page attributes are written unprefixed and everything else carries the
//! conventional prefix (`xlink:href`, `xinclude:include`, `html:width`, ...).
//!
//! ```text
//! <page xmlns="http://moinmo.in/namespaces/page" xmlns:xlink="...">
//!   <body>
//!     <p>See <a xlink:href="wiki.local:Home">Home</a></p>
//!   </body>
//! </page>
//! ```
//!
//! The reader accepts the same shape back: unprefixed attributes on page elements
//! are read into the page namespace, newline-only whitespace between elements is
//! dropped.

use super::names::{Namespace, QName};
use super::nodes::{Element, Node};
use crate::error::ConvertError;
use indexmap::IndexMap;

/// How [`write`] renders a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlOptions {
    /// Emit `xmlns` declarations on the root element
    pub declare_namespaces: bool,
    /// Indent element-only content, two spaces per level
    pub pretty: bool,
}

impl Default for XmlOptions {
    fn default() -> Self {
        XmlOptions {
            declare_namespaces: true,
            pretty: false,
        }
    }
}

/// Escape XML special characters in text and attribute values
pub(crate) fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\"', "&quot;")
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Compact XML without namespace declarations; used throughout the tests.
pub fn to_fragment(elem: &Element) -> String {
    write(
        elem,
        XmlOptions {
            declare_namespaces: false,
            pretty: false,
        },
    )
}

/// Indented XML with namespace declarations, for humans.
pub fn to_pretty(elem: &Element) -> String {
    write(
        elem,
        XmlOptions {
            declare_namespaces: true,
            pretty: true,
        },
    )
}

pub fn write(elem: &Element, options: XmlOptions) -> String {
    let mut namespaces: IndexMap<Namespace, String> = IndexMap::new();
    if options.declare_namespaces {
        collect_namespaces(elem, &mut namespaces);
    }
    let mut out = String::new();
    write_element(elem, options, &namespaces, 0, true, &mut out);
    if options.pretty {
        out.push('\n');
    }
    out
}

fn collect_namespaces(elem: &Element, found: &mut IndexMap<Namespace, String>) {
    let mut note = |ns: &Namespace| {
        if *ns == Namespace::Page || *ns == Namespace::None || *ns == Namespace::Xml {
            return;
        }
        if !found.contains_key(ns) {
            let prefix = match ns {
                Namespace::Other(_) => format!("ns{}", found.len()),
                other => other.prefix().unwrap_or("ns").to_string(),
            };
            found.insert(ns.clone(), prefix);
        }
    };
    note(&elem.name.ns);
    for name in elem.attributes.keys() {
        note(&name.ns);
    }
    for child in elem.elements() {
        collect_namespaces(child, found);
    }
}

fn qualified(name: &QName, namespaces: &IndexMap<Namespace, String>) -> String {
    match &name.ns {
        Namespace::Page | Namespace::None => name.local.clone(),
        Namespace::Other(_) => match namespaces.get(&name.ns) {
            Some(prefix) => format!("{prefix}:{}", name.local),
            None => name.to_string(),
        },
        _ => name.to_string(),
    }
}

fn write_element(
    elem: &Element,
    options: XmlOptions,
    namespaces: &IndexMap<Namespace, String>,
    depth: usize,
    root: bool,
    out: &mut String,
) {
    let tag = qualified(&elem.name, namespaces);
    out.push('<');
    out.push_str(&tag);
    if root && options.declare_namespaces {
        out.push_str(&format!(" xmlns=\"{}\"", Namespace::Page.uri()));
        for (ns, prefix) in namespaces {
            out.push_str(&format!(" xmlns:{prefix}=\"{}\"", escape_xml(ns.uri())));
        }
    }
    for (name, value) in &elem.attributes {
        out.push_str(&format!(
            " {}=\"{}\"",
            qualified(name, namespaces),
            escape_xml(value)
        ));
    }
    if elem.children.is_empty() {
        out.push_str(" />");
        return;
    }
    out.push('>');

    let element_only = options.pretty && elem.children.iter().all(|c| c.as_element().is_some());
    for child in &elem.children {
        match child {
            Node::Text(text) => out.push_str(&escape_text(text)),
            Node::Element(child) => {
                if element_only {
                    out.push('\n');
                    out.push_str(&"  ".repeat(depth + 1));
                }
                write_element(child, options, namespaces, depth + 1, false, out);
            }
        }
    }
    if element_only {
        out.push('\n');
        out.push_str(&"  ".repeat(depth));
    }
    out.push_str(&format!("</{tag}>"));
}

/// Parse XML into a tree.
pub fn parse(input: &str) -> Result<Element, ConvertError> {
    let doc = roxmltree::Document::parse(input)?;
    Ok(from_roxml(doc.root_element()))
}

/// Convert a roxmltree element (and its subtree) into an [`Element`].
pub fn from_roxml(node: roxmltree::Node<'_, '_>) -> Element {
    let ns = Namespace::from_uri(node.tag_name().namespace().unwrap_or(""));
    let mut elem = Element::new(QName::new(ns.clone(), node.tag_name().name()));
    for attribute in node.attributes() {
        let attr_ns = match attribute.namespace() {
            Some(uri) => Namespace::from_uri(uri),
            None if ns == Namespace::Page => Namespace::Page,
            None => Namespace::None,
        };
        elem.set_attr(QName::new(attr_ns, attribute.name()), attribute.value());
    }
    for child in node.children() {
        match child.node_type() {
            roxmltree::NodeType::Element => elem.push(from_roxml(child)),
            roxmltree::NodeType::Text => {
                let text = child.text().unwrap_or("");
                if text.trim().is_empty() && text.contains('\n') {
                    continue;
                }
                elem.push(text);
            }
            _ => {}
        }
    }
    elem
}
