//! MediaWiki markup
//!
//! The common subset of MediaWiki syntax: quote runs, `[[links]]` and
//! `[[File:...]]` embeds, `*#:;` lists, `{| |}` tables, `<ref>` footnotes and
//! the literal tags. Templates are not expanded. Input only.

pub mod inline;
pub mod parser;

use crate::error::ConvertError;
use crate::format::{Format, ParseContext};
use crate::ir::Element;
use crate::mime::Type;
use parser::MediaWikiParser;

/// Format implementation for MediaWiki markup
#[derive(Debug, Clone, Default)]
pub struct MediaWikiFormat;

impl MediaWikiFormat {
    fn media_type() -> Type {
        Type::new(Some("text"), Some("x-mediawiki"))
    }
}

impl Format for MediaWikiFormat {
    fn name(&self) -> &str {
        "mediawiki"
    }

    fn description(&self) -> &str {
        "MediaWiki markup"
    }

    fn file_extensions(&self) -> &[&str] {
        &["mediawiki", "wiki"]
    }

    fn input_types(&self) -> Vec<Type> {
        vec![Self::media_type(), Type::moin_format("mediawiki")]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    #[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
    fn parse(&self, source: &str, ctx: &ParseContext<'_>) -> Result<Element, ConvertError> {
        Ok(MediaWikiParser::new(ctx).parse(source))
    }
}
