//! MoinMoin wiki markup
//!
//! This module implements bidirectional conversion between moinwiki markup and
//! the document tree.
//!
//! # Element Mapping Table
//!
//! | Markup                         | Tree                                                  |
//! |--------------------------------|-------------------------------------------------------|
//! | `= Title =`                    | `h[outline-level]`                                    |
//! | blank-line separated text      | `p`                                                   |
//! | `----`                         | `separator[class=moin-hrN]`                           |
//! | ` * item`, ` 1. item`          | `list/list-item/list-item-body`                       |
//! | ` term:: text`                 | `list/list-item/(list-item-label, list-item-body)`    |
//! | `\|\|cell\|\|`                 | `table/table-body/table-row/table-cell`               |
//! | `{{{ ... }}}`                  | `nowiki(len, nowiki-args, content)`                   |
//! | `## comment`                   | `block-comment`                                       |
//! | `[[target\|text\|args]]`       | `a[xlink:href]`                                       |
//! | `{{target\|alt\|args}}`        | `xinclude:include` (local) or `object` (URL)          |
//! | `<<Name(args)>>`               | `part` / `inline-part`, or a resolved pseudo-macro    |
//! | `''` `'''` `__` `--( )--`      | `emphasis` `strong` `ins` `del`                       |
//! | `^x^` `,,x,,` `~+x+~` `~-x-~`  | `span[baseline-shift]`, `span[font-size]`             |
//! | `` `x` `` `{{{x}}}`            | `code`, `samp`                                        |
//!
//! # Lossy Conversions
//!
//! - Heading and separator markup is normalized (`==  x  ==` is written `== x ==`).
//! - Cell argument spellings collapse into `style` declarations: `<bgcolor="red">`
//!   comes back as `<style="background-color: red;">`.
//! - Block comments and nowiki content survive verbatim; whitespace between
//!   blocks does not.
//!
//! The 1.9 dialect (CamelCase and free URL links) lives in
//! [`moinwiki19`](crate::formats::moinwiki19) and reuses this parser.

pub mod inline;
pub mod parser;
pub mod serializer;
pub mod table;

use crate::error::ConvertError;
use crate::format::{Format, ParseContext};
use crate::ir::Element;
use crate::mime::Type;
use parser::{Dialect, MoinWikiParser};

/// Format implementation for moinwiki markup
#[derive(Debug, Clone, Default)]
pub struct MoinWikiFormat;

impl Format for MoinWikiFormat {
    fn name(&self) -> &str {
        "moinwiki"
    }

    fn description(&self) -> &str {
        "MoinMoin wiki markup"
    }

    fn file_extensions(&self) -> &[&str] {
        &["moin", "wiki"]
    }

    fn input_types(&self) -> Vec<Type> {
        vec![Type::moin_wiki(), Type::moin_format("wiki")]
    }

    fn output_types(&self) -> Vec<Type> {
        vec![Type::moin_wiki(), Type::moin_format("wiki")]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    #[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
    fn parse(&self, source: &str, ctx: &ParseContext<'_>) -> Result<Element, ConvertError> {
        Ok(MoinWikiParser::new(ctx, Dialect::Moin).parse(source))
    }

    fn serialize(&self, doc: &Element) -> Result<String, ConvertError> {
        serializer::serialize(doc)
    }
}
