//! MoinMoin 1.9 wiki markup
//!
//! The 1.9 dialect is moinwiki plus two kinds of links that need no brackets:
//! CamelCase words (`FrontPage`, `Parent/SubPage`, `../Sibling`) become local
//! links, and bare URLs with an allowed scheme become external links. A leading
//! `!` keeps a CamelCase word literal, `Site:Page` links when the host knows the
//! site. Everything else is parsed by the moinwiki parser.
//!
//! Old pages are only ever read; there is no serializer for this dialect.

use crate::error::ConvertError;
use crate::format::{Format, ParseContext};
use crate::formats::moinwiki::parser::{Dialect, MoinWikiParser};
use crate::ir::Element;
use crate::mime::Type;

/// Format implementation for moinwiki 1.9 markup
#[derive(Debug, Clone, Default)]
pub struct MoinWiki19Format;

impl MoinWiki19Format {
    pub fn content_type() -> Type {
        Type::moin_wiki().with_parameter("format", "1.9")
    }
}

impl Format for MoinWiki19Format {
    fn name(&self) -> &str {
        "moinwiki19"
    }

    fn description(&self) -> &str {
        "MoinMoin 1.9 wiki markup (CamelCase and free URL links)"
    }

    fn input_types(&self) -> Vec<Type> {
        vec![
            Self::content_type(),
            Type::moin_format("wiki").with_parameter("format", "1.9"),
        ]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    #[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
    fn parse(&self, source: &str, ctx: &ParseContext<'_>) -> Result<Element, ConvertError> {
        Ok(MoinWikiParser::new(ctx, Dialect::Moin19).parse(source))
    }
}
