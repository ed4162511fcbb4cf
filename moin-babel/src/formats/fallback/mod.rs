//! Last-resort input converter
//!
//! Registered for `*/*` at the lowest priority, so any type no other dialect
//! accepts still converts: the document is a single download link to the
//! current item, which the host resolves like any other `wiki.local` target.

use crate::common::links::wiki_local;
use crate::error::ConvertError;
use crate::format::{Format, ParseContext};
use crate::ir::names::attr;
use crate::ir::{Element, QName};
use crate::mime::Type;
use crate::registry::priority;

/// Format implementation for content nothing else understands
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackFormat;

impl Format for FallbackFormat {
    fn name(&self) -> &str {
        "fallback"
    }

    fn description(&self) -> &str {
        "Download link for content of any other type"
    }

    fn input_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }

    fn priority(&self) -> i32 {
        priority::REALLY_LAST
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn parse(&self, _source: &str, ctx: &ParseContext<'_>) -> Result<Element, ConvertError> {
        let content_type = ctx.content_type.to_string();
        tracing::debug!(%content_type, "no dialect for content, emitting download link");
        let link = Element::page("a")
            .with_attr(QName::xlink("href"), wiki_local("", Some("do=get"), None))
            .with_page_attr(attr::CONTENT_TYPE, content_type.as_str())
            .with_child(format!("Download {content_type}"));
        Ok(Element::document(
            Element::page("body").with_child(Element::page("p").with_child(link)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::args::Arguments;
    use crate::format::HostConfig;
    use crate::ir::xml::to_fragment;
    use crate::registry::{Converter, ConverterRegistry};

    #[test]
    fn unknown_types_get_a_download_link() {
        let mut registry = ConverterRegistry::new();
        registry.register(FallbackFormat);
        let host = HostConfig::default();
        let content_type = Type::parse("application/x-tar").unwrap();
        let doc = registry
            .parse_source("", &content_type, &host, &Arguments::new())
            .unwrap();
        assert_eq!(
            to_fragment(&doc),
            "<page><body><p><a xlink:href=\"wiki.local:?do=get\" content-type=\"application/x-tar\">\
Download application/x-tar</a></p></body></page>"
        );
    }

    #[test]
    fn every_other_dialect_comes_first() {
        let registry = ConverterRegistry::with_defaults();
        let wiki = registry.get(&Type::moin_wiki(), &Type::moin_document(), &Arguments::new());
        assert!(matches!(wiki, Some(Converter::Parser(format)) if format.name() == "moinwiki"));
        let tar = Type::parse("application/x-tar").unwrap();
        let other = registry.get(&tar, &Type::moin_document(), &Arguments::new());
        assert!(matches!(other, Some(Converter::Parser(format)) if format.name() == "fallback"));
    }
}
