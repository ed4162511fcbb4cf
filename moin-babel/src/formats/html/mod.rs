//! HTML format implementation
//!
//! Both directions go through the `html5ever` + `markup5ever_rcdom` stack:
//! input is parsed by a browser-grade HTML5 parser (malformed markup is
//! repaired the way browsers repair it), output is built as an RcDom and
//! serialized by html5ever.
//!
//! # Element Mapping Table
//!
//! | HTML                          | Tree                                          |
//! |-------------------------------|-----------------------------------------------|
//! | `h1`..`h6`                    | `h[outline-level]`                            |
//! | `p`, `div`, `blockquote`      | same name                                     |
//! | `pre`                         | `blockcode`                                   |
//! | `em`/`i`, `strong`/`b`        | `emphasis`, `strong`                          |
//! | `sub`, `sup`                  | `span[baseline-shift]`                        |
//! | `small`, `big`                | `span[font-size=85%/120%]`                    |
//! | `abbr`, `dfn`, `kbd`, ...     | `span[element]`                               |
//! | `ul`, `ol`, `dl`              | `list` (`item-label-generate` for ul/ol)      |
//! | `a`                           | `a[xlink:href]`                               |
//! | `img`, `object`, `video`      | `object` with the media attributes            |
//! | `table` and its parts         | `table`, `table-header/body/footer`, `table-row`, `table-cell` |
//! | `hr`                          | `separator`                                   |
//!
//! On output a few tree constructs have no direct element: footnotes become a
//! numbered `moin-footnotes` block, `table-of-content` a nested list of links
//! to the headings, and macro or parser output (`part`, `inline-part`) its
//! body, its error, or its alt text.
//!
//! # Lossy Conversions
//!
//! - `script`, `style`, `head` content and event attributes are dropped.
//! - Links with a disallowed scheme become local links.
//! - Style values containing suspect strings are suppressed on output.

pub mod parser;
pub mod serializer;

use crate::error::ConvertError;
use crate::format::{Format, ParseContext};
use crate::ir::Element;
use crate::mime::Type;
use parser::HtmlParser;
pub use serializer::HtmlOptions;
use std::collections::HashMap;

/// Format implementation for HTML
#[derive(Debug, Clone, Default)]
pub struct HtmlFormat {
    options: HtmlOptions,
}

impl HtmlFormat {
    /// HTML format writing complete documents with the given title
    pub fn standalone(title: impl Into<String>) -> Self {
        HtmlFormat {
            options: HtmlOptions {
                standalone: true,
                title: Some(title.into()),
            },
        }
    }

    fn media_type() -> Type {
        Type::new(Some("text"), Some("html"))
    }

    fn options_from(&self, options: &HashMap<String, String>) -> Result<HtmlOptions, ConvertError> {
        let mut resolved = self.options.clone();
        for (key, value) in options {
            match key.as_str() {
                "standalone" => {
                    resolved.standalone = match value.as_str() {
                        "true" | "yes" | "1" => true,
                        "false" | "no" | "0" => false,
                        other => {
                            return Err(ConvertError::InvalidArguments(format!(
                                "standalone expects a boolean, got \"{other}\""
                            )))
                        }
                    }
                }
                "title" => resolved.title = Some(value.clone()),
                other => {
                    return Err(ConvertError::NotSupported(format!(
                        "Format 'html' does not support the '{other}' parameter"
                    )))
                }
            }
        }
        Ok(resolved)
    }
}

impl Format for HtmlFormat {
    fn name(&self) -> &str {
        "html"
    }

    fn description(&self) -> &str {
        "HTML5 format"
    }

    fn file_extensions(&self) -> &[&str] {
        &["html", "htm"]
    }

    fn input_types(&self) -> Vec<Type> {
        vec![Self::media_type(), Type::moin_format("html")]
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
        Ok(HtmlParser::new(ctx).parse(source))
    }

    fn serialize(&self, doc: &Element) -> Result<String, ConvertError> {
        serializer::serialize_to_html(doc, &self.options)
    }

    fn serialize_with_options(
        &self,
        doc: &Element,
        options: &HashMap<String, String>,
    ) -> Result<String, ConvertError> {
        let options = self.options_from(options)?;
        serializer::serialize_to_html(doc, &options)
    }
}
