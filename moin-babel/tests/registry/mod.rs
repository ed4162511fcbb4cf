//! Type dispatch through the default registry and registries assembled by hand.

use crate::common::{self, body};
use moin_babel::registry::priority;
use moin_babel::{
    Arguments, ConvertError, Converter, ConverterRegistry, Element, Format, HostConfig, ParseContext,
    Type,
};
use std::collections::HashMap;

/// A dialect that upper-cases everything, registered by the tests themselves.
struct Shout {
    priority: i32,
}

impl Format for Shout {
    fn name(&self) -> &str {
        "shout"
    }

    fn input_types(&self) -> Vec<Type> {
        vec![Type::moin_wiki()]
    }

    fn output_types(&self) -> Vec<Type> {
        vec![Type::new(Some("text"), Some("x-shout"))]
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str, _ctx: &ParseContext<'_>) -> Result<Element, ConvertError> {
        Ok(Element::document(
            Element::page("body").with_child(Element::page("p").with_child(source.to_uppercase())),
        ))
    }

    fn serialize(&self, doc: &Element) -> Result<String, ConvertError> {
        Ok(doc.text_content().to_uppercase())
    }
}

#[test]
fn every_dialect_parses_empty_input_to_an_empty_body() {
    let registry = common::registry();
    let host = HostConfig::default();
    for format in registry.formats() {
        if !format.supports_parsing() || format.name() == "fallback" {
            continue;
        }
        let content_type = registry.input_type(format.name()).unwrap();
        let doc = registry
            .parse_source("", &content_type, &host, &Arguments::new())
            .unwrap();
        assert!(doc.is_page("page"), "{}", format.name());
        assert!(body(&doc).is_empty(), "{} left {:?}", format.name(), body(&doc));
    }
}

#[test]
fn default_registry_knows_every_dialect() {
    let registry = common::registry();
    for name in [
        "moinwiki",
        "moinwiki19",
        "creole",
        "mediawiki",
        "markdown",
        "rst",
        "docbook",
        "html",
        "csv",
        "zip",
        "tar",
        "highlight",
        "text",
        "dom",
        "fallback",
    ] {
        assert!(registry.has(name), "{name} missing");
    }
    let writers: Vec<&str> = registry
        .formats()
        .filter(|f| f.supports_serialization())
        .map(|f| f.name())
        .collect();
    assert_eq!(
        writers,
        vec!["moinwiki", "markdown", "rst", "docbook", "html", "text", "dom"]
    );
}

#[test]
fn wiki_1_9_is_picked_by_the_format_parameter() {
    let registry = common::registry();
    let document = Type::moin_document();
    let old = Type::parse("text/x.moin.wiki;format=1.9").unwrap();
    let found = registry.get(&old, &document, &Arguments::new()).unwrap();
    assert_eq!(found.name(), "moinwiki19");
    let found = registry.get(&Type::moin_wiki(), &document, &Arguments::new()).unwrap();
    assert_eq!(found.name(), "moinwiki");
}

#[test]
fn named_types_and_media_types_both_resolve() {
    let registry = common::registry();
    assert_eq!(registry.input_type("creole").unwrap().to_string(), "text/x.moin.creole");
    assert_eq!(registry.input_type("text/x-rst").unwrap().to_string(), "text/x-rst");
    assert!(matches!(
        registry.input_type("odt"),
        Err(ConvertError::FormatNotFound(_))
    ));
    assert!(matches!(
        registry.output_type("creole"),
        Err(ConvertError::NotSupported(_))
    ));
}

#[test]
fn extensions_pick_the_first_registered_format() {
    let registry = common::registry();
    assert_eq!(registry.detect_format_from_filename("a/page.wiki").as_deref(), Some("moinwiki"));
    assert_eq!(registry.detect_format_from_filename("notes.md").as_deref(), Some("markdown"));
    assert_eq!(registry.detect_format_from_filename("main.rs").as_deref(), Some("highlight"));
    assert_eq!(registry.detect_format_from_filename("site.tar").as_deref(), Some("tar"));
    assert_eq!(registry.detect_format_from_filename("README").as_deref(), None);
}

#[test]
fn unknown_pairs_are_reported() {
    let registry = ConverterRegistry::new();
    let host = HostConfig::default();
    let err = registry
        .parse_source("x", &Type::moin_wiki(), &host, &Arguments::new())
        .unwrap_err();
    assert_eq!(
        err,
        ConvertError::ConverterNotFound {
            input: "text/x.moin.wiki".to_string(),
            output: Type::moin_document().to_string(),
        }
    );
    let output = Type::new(Some("text"), Some("x-shout"));
    assert!(matches!(
        registry.serialize(&Element::empty_document(), &output, &HashMap::new()),
        Err(ConvertError::ConverterNotFound { .. })
    ));
}

#[test]
fn unknown_content_falls_back_to_a_download_link() {
    let doc = common::parse_with(
        "\u{0}\u{1}",
        "application/octet-stream",
        &HostConfig::default(),
        &Arguments::new(),
    );
    let xml = common::body_xml(&doc);
    assert!(xml.contains("xlink:href=\"wiki.local:?do=get\""), "{xml}");
}

#[test]
fn a_host_dialect_takes_precedence_by_priority() {
    let mut registry = ConverterRegistry::with_defaults();
    let tokens = registry.register(Shout {
        priority: priority::FIRST,
    });
    let host = HostConfig::default();
    let doc = registry
        .parse_source("quiet", &Type::moin_wiki(), &host, &Arguments::new())
        .unwrap();
    assert_eq!(body(&doc).text_content(), "QUIET");

    for token in tokens {
        assert!(registry.unregister(token));
    }
    let doc = registry
        .parse_source("quiet", &Type::moin_wiki(), &host, &Arguments::new())
        .unwrap();
    assert_eq!(body(&doc).text_content(), "quiet");
}

#[test]
fn a_later_priority_only_runs_when_nothing_else_matches() {
    let mut registry = ConverterRegistry::with_defaults();
    registry.register(Shout {
        priority: priority::REALLY_LAST,
    });
    let found = registry
        .get(&Type::moin_wiki(), &Type::moin_document(), &Arguments::new())
        .unwrap();
    assert!(matches!(found, Converter::Parser(ref f) if f.name() == "moinwiki"));

    let output = Type::new(Some("text"), Some("x-shout"));
    let doc = common::parse("some '''text'''", "moinwiki");
    assert_eq!(
        registry.serialize(&doc, &output, &HashMap::new()).unwrap(),
        "SOME TEXT"
    );
}

#[test]
fn crate_level_helpers() {
    let doc = moin_babel::parse("'''x'''", "moinwiki", &HostConfig::default()).unwrap();
    assert_eq!(common::body_xml(&doc), "<p><strong>x</strong></p>");
    let markdown = moin_babel::convert("'''x'''", "moinwiki", "markdown").unwrap();
    assert_eq!(markdown, "**x**\n");
    assert!(moin_babel::convert("x", "moinwiki", "creole").is_err());
}
