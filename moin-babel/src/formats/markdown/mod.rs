//! Markdown format implementation
//!
//! Bidirectional conversion between CommonMark Markdown (with the GitHub
//! table, strikethrough and footnote extensions) and the document tree.
//!
//! # Library Choice
//!
//! The `comrak` crate does both directions: its AST is mapped onto the tree
//! when parsing, and a Comrak AST is built from the tree for output so the
//! CommonMark formatter takes care of escaping.
//!
//! # Element Mapping Table
//!
//! | Markdown                  | Tree                                             |
//! |---------------------------|--------------------------------------------------|
//! | `# Heading`               | `h[outline-level]`                               |
//! | paragraph                 | `p`                                              |
//! | `[TOC]`                   | `table-of-content`                               |
//! | `---`                     | `separator[class=moin-hr3]`                      |
//! | `> quote`                 | `blockquote`                                     |
//! | fenced / indented code    | `blockcode` (highlighted when the language is known) |
//! | `-` / `1.` lists          | `list[item-label-generate]/list-item/list-item-body` |
//! | `term` / `: definition`   | `list/list-item/(list-item-label, list-item-body)` |
//! | GFM table                 | `table/(table-header, table-body)`               |
//! | `*x*` `**x**` `~~x~~`     | `emphasis` `strong` `del`                        |
//! | `[text](url "title")`     | `a[xlink:href, html:title]`                      |
//! | `![alt](src)`             | `object` (URL) or `xinclude:include` (local)     |
//! | `[^1]` footnotes          | `note[note-class=footnote]/note-body`            |
//! | inline / block HTML       | replayed through the HTML parser                 |
//!
//! # Lossy Conversions
//!
//! - Underline, sub/superscript and font sizes are written as inline HTML.
//! - Column and row spans are dropped; Markdown tables are flat grids.
//! - Macros have no Markdown form; only their expanded content is written.
//! - Footnotes are renumbered from 1 in document order.

pub mod parser;
pub mod serializer;

use crate::error::ConvertError;
use crate::format::{Format, ParseContext};
use crate::ir::Element;
use crate::mime::Type;
use parser::MarkdownParser;

/// Format implementation for Markdown
#[derive(Debug, Clone, Default)]
pub struct MarkdownFormat;

impl MarkdownFormat {
    fn media_type() -> Type {
        Type::new(Some("text"), Some("x-markdown"))
    }
}

impl Format for MarkdownFormat {
    fn name(&self) -> &str {
        "markdown"
    }

    fn description(&self) -> &str {
        "CommonMark Markdown format"
    }

    fn file_extensions(&self) -> &[&str] {
        &["md", "markdown"]
    }

    fn input_types(&self) -> Vec<Type> {
        vec![Self::media_type(), Type::moin_format("markdown")]
    }

    fn output_types(&self) -> Vec<Type> {
        vec![Self::media_type(), Type::moin_format("markdown")]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    #[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
    fn parse(&self, source: &str, ctx: &ParseContext<'_>) -> Result<Element, ConvertError> {
        Ok(MarkdownParser::new(ctx).parse(source))
    }

    fn serialize(&self, doc: &Element) -> Result<String, ConvertError> {
        serializer::serialize_to_markdown(doc)
    }
}
