//! Creole wiki markup
//!
//! Creole 1.0 plus the moin additions: `<<Macro(args)>>`, `{{{#!name ...}}}`
//! parser blocks, `__inserted__` text and `|=` heading cells. Input only.

pub mod inline;
pub mod parser;

use crate::error::ConvertError;
use crate::format::{Format, ParseContext};
use crate::ir::Element;
use crate::mime::Type;
use parser::CreoleParser;

/// Format implementation for creole markup
#[derive(Debug, Clone, Default)]
pub struct CreoleFormat;

impl Format for CreoleFormat {
    fn name(&self) -> &str {
        "creole"
    }

    fn description(&self) -> &str {
        "Creole 1.0 wiki markup"
    }

    fn file_extensions(&self) -> &[&str] {
        &["creole"]
    }

    fn input_types(&self) -> Vec<Type> {
        vec![Type::moin_creole(), Type::moin_format("creole")]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    #[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
    fn parse(&self, source: &str, ctx: &ParseContext<'_>) -> Result<Element, ConvertError> {
        Ok(CreoleParser::new(ctx).parse(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::args::Arguments;
    use crate::registry::{Converter, ConverterRegistry};

    #[test]
    fn registered_for_both_types() {
        let registry = ConverterRegistry::with_defaults();
        for input in [Type::moin_creole(), Type::moin_format("creole")] {
            let converter = registry.get(&input, &Type::moin_document(), &Arguments::new());
            assert!(matches!(converter, Some(Converter::Parser(p)) if p.name() == "creole"));
        }
    }

    #[test]
    fn body_takes_style_argument() {
        let registry = ConverterRegistry::new();
        let host = crate::format::HostConfig::default();
        let ctx = ParseContext::new(&registry, &host, Type::moin_creole())
            .with_arguments(Arguments::parse("style=\"color: red\" class=ignored"));
        let doc = CreoleFormat.parse("x", &ctx).unwrap();
        assert_eq!(
            crate::ir::xml::to_fragment(&doc),
            "<page><body style=\"color: red\"><p>x</p></body></page>"
        );
    }
}
