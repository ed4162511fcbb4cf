//! The document tree as XML
//!
//! The tree is written with the page namespace as the default namespace, so
//! the output is the same shape every other dialect is converted through:
//!
//! ```text
//! <page xmlns="http://moinmo.in/namespaces/page" xmlns:xlink="http://www.w3.org/1999/xlink">
//!   <body>
//!     <p>See <a xlink:href="wiki.local:Home">Home</a></p>
//!   </body>
//! </page>
//! ```
//!
//! Reading accepts the same shape back. Input that is not well-formed, or whose
//! root is not a page element, becomes an error document.

use crate::error::ConvertError;
use crate::format::{Format, ParseContext};
use crate::ir::xml::{self, XmlOptions};
use crate::ir::Element;
use crate::mime::Type;
use std::collections::HashMap;

/// Format implementation for the XML view of the tree
#[derive(Debug, Clone, Copy, Default)]
pub struct DomFormat;

impl DomFormat {
    fn media_type() -> Type {
        Type::new(Some("application"), Some("x.moin.document+xml"))
    }
}

fn flag(options: &HashMap<String, String>, key: &str, default: bool) -> Result<bool, ConvertError> {
    match options.get(key).map(String::as_str) {
        None => Ok(default),
        Some("true" | "yes" | "1") => Ok(true),
        Some("false" | "no" | "0") => Ok(false),
        Some(other) => Err(ConvertError::InvalidArguments(format!(
            "{key} expects a boolean, got \"{other}\""
        ))),
    }
}

impl Format for DomFormat {
    fn name(&self) -> &str {
        "dom"
    }

    fn description(&self) -> &str {
        "Document tree as XML"
    }

    fn file_extensions(&self) -> &[&str] {
        &["dom", "moinxml"]
    }

    fn input_types(&self) -> Vec<Type> {
        vec![Self::media_type()]
    }

    fn output_types(&self) -> Vec<Type> {
        vec![Self::media_type()]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str, _ctx: &ParseContext<'_>) -> Result<Element, ConvertError> {
        if source.trim().is_empty() {
            return Ok(Element::empty_document());
        }
        match xml::parse(source) {
            Ok(tree) if tree.is_page("page") => Ok(tree),
            Ok(tree) => {
                tracing::warn!(root = %tree.name, "document root is not a page");
                Ok(Element::error_document("The root element of the document is not a page"))
            }
            Err(err) => {
                tracing::warn!(error = %err, "document xml is not well-formed");
                Ok(Element::error_document(&err.to_string()))
            }
        }
    }

    fn serialize(&self, doc: &Element) -> Result<String, ConvertError> {
        Ok(xml::to_pretty(doc))
    }

    /// Options: `pretty` (default true), `namespaces` (default true).
    fn serialize_with_options(
        &self,
        doc: &Element,
        options: &HashMap<String, String>,
    ) -> Result<String, ConvertError> {
        if let Some(unknown) = options.keys().find(|key| !matches!(key.as_str(), "pretty" | "namespaces")) {
            return Err(ConvertError::NotSupported(format!(
                "Format 'dom' does not support the '{unknown}' parameter"
            )));
        }
        let options = XmlOptions {
            pretty: flag(options, "pretty", true)?,
            declare_namespaces: flag(options, "namespaces", true)?,
        };
        Ok(xml::write(doc, options))
    }
}
