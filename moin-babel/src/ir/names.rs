//! Namespaces and qualified names used in the document tree.
//!
//! Almost every element and attribute lives in the page namespace. The others are
//! borrowed vocabularies: `xlink:href` on links, `xinclude:include` for
//! transclusions, `html:*` for presentational attributes the page vocabulary does
//! not cover, `docbook:*` for elements passed through from DocBook input.

use serde::{Serialize, Serializer};
use std::fmt;

pub const PAGE_NS: &str = "http://moinmo.in/namespaces/page";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
pub const XINCLUDE_NS: &str = "http://www.w3.org/2001/XInclude";
pub const HTML_NS: &str = "http://www.w3.org/1999/xhtml";
pub const DOCBOOK_NS: &str = "http://docbook.org/ns/docbook";
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// No namespace at all (plain attributes of foreign XML)
    None,
    Page,
    Xlink,
    Xinclude,
    Html,
    Docbook,
    Xml,
    Other(String),
}

impl Namespace {
    pub fn from_uri(uri: &str) -> Self {
        match uri {
            "" => Namespace::None,
            PAGE_NS => Namespace::Page,
            XLINK_NS => Namespace::Xlink,
            XINCLUDE_NS => Namespace::Xinclude,
            HTML_NS => Namespace::Html,
            DOCBOOK_NS => Namespace::Docbook,
            XML_NS => Namespace::Xml,
            other => Namespace::Other(other.to_string()),
        }
    }

    pub fn uri(&self) -> &str {
        match self {
            Namespace::None => "",
            Namespace::Page => PAGE_NS,
            Namespace::Xlink => XLINK_NS,
            Namespace::Xinclude => XINCLUDE_NS,
            Namespace::Html => HTML_NS,
            Namespace::Docbook => DOCBOOK_NS,
            Namespace::Xml => XML_NS,
            Namespace::Other(uri) => uri,
        }
    }

    /// Conventional prefix used when writing XML; `None` means unprefixed.
    pub fn prefix(&self) -> Option<&str> {
        match self {
            Namespace::None | Namespace::Page => None,
            Namespace::Xlink => Some("xlink"),
            Namespace::Xinclude => Some("xinclude"),
            Namespace::Html => Some("html"),
            Namespace::Docbook => Some("docbook"),
            Namespace::Xml => Some("xml"),
            Namespace::Other(_) => Some("ns"),
        }
    }
}

/// A namespace-qualified element or attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    pub ns: Namespace,
    pub local: String,
}

impl QName {
    pub fn new(ns: Namespace, local: impl Into<String>) -> Self {
        QName {
            ns,
            local: local.into(),
        }
    }

    pub fn page(local: &str) -> Self {
        QName::new(Namespace::Page, local)
    }

    pub fn html(local: &str) -> Self {
        QName::new(Namespace::Html, local)
    }

    pub fn xlink(local: &str) -> Self {
        QName::new(Namespace::Xlink, local)
    }

    pub fn xinclude(local: &str) -> Self {
        QName::new(Namespace::Xinclude, local)
    }

    pub fn docbook(local: &str) -> Self {
        QName::new(Namespace::Docbook, local)
    }

    pub fn xml(local: &str) -> Self {
        QName::new(Namespace::Xml, local)
    }

    pub fn is_page(&self, local: &str) -> bool {
        self.ns == Namespace::Page && self.local == local
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ns.prefix() {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

impl Serialize for QName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Attribute names of the page namespace that more than one module touches.
pub mod attr {
    pub const CLASS: &str = "class";
    pub const STYLE: &str = "style";
    pub const ID: &str = "id";
    pub const OUTLINE_LEVEL: &str = "outline-level";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const ALT: &str = "alt";
    pub const ITEM_LABEL_GENERATE: &str = "item-label-generate";
    pub const LIST_STYLE_TYPE: &str = "list-style-type";
    pub const LIST_START: &str = "list-start";
    pub const COLSPAN: &str = "number-columns-spanned";
    pub const ROWSPAN: &str = "number-rows-spanned";
    pub const NOTE_CLASS: &str = "note-class";
    pub const BASELINE_SHIFT: &str = "baseline-shift";
    pub const FONT_SIZE: &str = "font-size";
    pub const LINENO: &str = "data-lineno";
    /// Html-namespace; the language a code block was written in
    pub const CODE_LANGUAGE: &str = "data-code-language";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uris_round_trip() {
        for ns in [
            Namespace::Page,
            Namespace::Xlink,
            Namespace::Xinclude,
            Namespace::Html,
            Namespace::Docbook,
            Namespace::Xml,
        ] {
            assert_eq!(Namespace::from_uri(ns.uri()), ns);
        }
        assert_eq!(
            Namespace::from_uri("urn:x"),
            Namespace::Other("urn:x".to_string())
        );
    }

    #[test]
    fn display_uses_prefixes() {
        assert_eq!(QName::page("table-cell").to_string(), "table-cell");
        assert_eq!(QName::xlink("href").to_string(), "xlink:href");
    }
}
