//! reStructuredText format implementation
//!
//! A handwritten parser for the reStructuredText subset wiki pages use, and
//! a serializer writing the same subset back.
//!
//! # Element Mapping Table
//!
//! | reStructuredText            | Tree                                                |
//! |-----------------------------|-----------------------------------------------------|
//! | section title               | `h[outline-level]`, levels by first use of a style  |
//! | transition                  | `separator[class=moin-hr2]`                         |
//! | `::` literal block          | `blockcode`                                         |
//! | bullet / enumerated list    | `list[item-label-generate]`                         |
//! | definition list             | `list/list-item/(list-item-label, list-item-body)`  |
//! | field list                  | `table[class=moin-rst-fieldlist]`                   |
//! | grid / simple table         | `table/(table-header, table-body)`                  |
//! | `.. image::` / `.. figure::`| `object` or `xinclude:include`, `figure`            |
//! | `.. code::`                 | highlighted `blockcode`                             |
//! | `.. contents::`             | `table-of-content`                                  |
//! | `.. macro::` / `.. parser::`| `part` for the macro or sub-language                |
//! | admonitions                 | `admonition[type]`                                  |
//! | `` `text`_ `` and targets   | `a[xlink:href]`                                     |
//! | `[#]_` footnotes            | `note[note-class=footnote]/note-body`               |
//!
//! # Wiki Links
//!
//! A reference without a target names a wiki item: `` `Some Page`_ `` links
//! to `wiki.local:Some%20Page` unless a target or section of that name exists.
//!
//! # Lossy Conversions
//!
//! - Row spans are written as single-row cells.
//! - Raw and unknown directives are kept as literal text after an error note.

pub mod inline;
pub mod parser;
pub mod serializer;

use crate::error::ConvertError;
use crate::format::{Format, ParseContext};
use crate::ir::Element;
use crate::mime::Type;
use parser::RstParser;

/// Format implementation for reStructuredText
#[derive(Debug, Clone, Default)]
pub struct RstFormat;

impl RstFormat {
    fn media_type() -> Type {
        Type::new(Some("text"), Some("x-rst"))
    }
}

impl Format for RstFormat {
    fn name(&self) -> &str {
        "rst"
    }

    fn description(&self) -> &str {
        "reStructuredText format"
    }

    fn file_extensions(&self) -> &[&str] {
        &["rst", "rest"]
    }

    fn input_types(&self) -> Vec<Type> {
        vec![Self::media_type(), Type::moin_format("rst")]
    }

    fn output_types(&self) -> Vec<Type> {
        vec![Self::media_type(), Type::moin_format("rst")]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    #[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
    fn parse(&self, source: &str, ctx: &ParseContext<'_>) -> Result<Element, ConvertError> {
        Ok(RstParser::new(ctx).parse(source))
    }

    fn serialize(&self, doc: &Element) -> Result<String, ConvertError> {
        serializer::serialize(doc)
    }
}
