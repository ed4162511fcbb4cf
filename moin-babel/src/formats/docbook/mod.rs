//! DocBook 5 format implementation
//!
//! Input is read with roxmltree and must be namespaced DocBook 5. Output is a
//! single `article`; its title comes from the `title` serialization option.
//!
//! # Element Mapping Table
//!
//! | DocBook                                 | Tree                                    |
//! |-----------------------------------------|-----------------------------------------|
//! | `section`, `sect1`..`sect5`             | `h[outline-level]` plus content         |
//! | `para`, `simpara` / `formalpara`        | `p` / `p[html:title]`                   |
//! | `programlisting`, `screen`              | `blockcode`                             |
//! | `itemizedlist`, `orderedlist`           | `list[item-label-generate]`             |
//! | `variablelist`, `glosslist`             | `list/list-item/(label, body)`          |
//! | `emphasis[role=bold]`                   | `strong`                                |
//! | `link`, `ulink`, `olink`                | `a[xlink:href]`                         |
//! | `mediaobject` / `imagedata`             | `xinclude:include` with `type`          |
//! | `footnote`                              | `note[note-class=footnote]`             |
//! | `superscript`, `subscript`              | `span[baseline-shift]`                  |
//! | other inline / block elements           | `span` / `div` with `html:class=db-*`   |
//!
//! # Lossy Conversions
//!
//! - Metadata (`info`, `author`, `indexterm`, ...) is dropped on input.
//! - Separators have no DocBook element and are dropped on output.
//! - Macro references without expanded content are written as `remark`.

pub mod parser;
pub mod serializer;

use crate::error::ConvertError;
use crate::format::{Format, ParseContext};
use crate::ir::Element;
use crate::mime::Type;
use parser::DocBookParser;
use std::collections::HashMap;

const DEFAULT_TITLE: &str = "Untitled";

/// Format implementation for DocBook 5 XML
#[derive(Debug, Clone, Default)]
pub struct DocBookFormat;

impl DocBookFormat {
    fn media_type() -> Type {
        Type::new(Some("application"), Some("docbook+xml"))
    }
}

impl Format for DocBookFormat {
    fn name(&self) -> &str {
        "docbook"
    }

    fn description(&self) -> &str {
        "DocBook 5 XML format"
    }

    fn file_extensions(&self) -> &[&str] {
        &["dbk", "docbook"]
    }

    fn input_types(&self) -> Vec<Type> {
        vec![Self::media_type(), Type::moin_format("docbook")]
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

    #[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
    fn parse(&self, source: &str, ctx: &ParseContext<'_>) -> Result<Element, ConvertError> {
        Ok(DocBookParser::new(ctx).parse(source))
    }

    fn serialize(&self, doc: &Element) -> Result<String, ConvertError> {
        serializer::serialize(doc, DEFAULT_TITLE)
    }

    fn serialize_with_options(
        &self,
        doc: &Element,
        options: &HashMap<String, String>,
    ) -> Result<String, ConvertError> {
        if let Some(unknown) = options.keys().find(|key| key.as_str() != "title") {
            return Err(ConvertError::NotSupported(format!(
                "Format 'docbook' does not support the '{unknown}' parameter"
            )));
        }
        let title = options.get("title").map(String::as_str).unwrap_or(DEFAULT_TITLE);
        serializer::serialize(doc, title)
    }
}
