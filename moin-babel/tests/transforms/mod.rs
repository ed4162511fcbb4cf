//! Document passes switched on by parse options

use crate::common::{body_xml, parse, parse_with};
use moin_babel::{Arguments, ConverterRegistry, HostConfig, MacroCall, MacroError, Node, Type};

fn with_options(source: &str, options: &[(&str, &str)]) -> String {
    let arguments = Arguments::from_keywords(options.iter().copied());
    body_xml(&parse_with(source, "moinwiki", &HostConfig::default(), &arguments))
}

#[test]
fn nowiki_stays_unexpanded_by_default() {
    let out = body_xml(&parse("{{{#!csv ,\na,b\n}}}\n", "moinwiki"));
    assert!(out.starts_with("<nowiki>3"), "{out}");
}

#[test]
fn nowiki_expansion_fills_the_section() {
    let out = with_options("{{{#!csv ,\na,b\n1,2\n}}}\n", &[("nowiki", "expandall")]);
    assert!(
        out.starts_with("<nowiki><table class=\"moin-csv-table moin-sortable\">"),
        "{out}"
    );
    assert!(!out.contains("nowiki-args"), "{out}");
}

#[test]
fn nested_fences_expand_too() {
    let out = with_options(
        "{{{{#!wiki\n{{{#!csv\na;b\n}}}\n}}}}\n",
        &[("nowiki", "expandall")],
    );
    assert!(out.contains("<table class=\"moin-csv-table moin-sortable\">"), "{out}");
    assert!(!out.contains("nowiki-args"), "{out}");
}

#[test]
fn smileys_need_the_icon_option() {
    assert_eq!(body_xml(&parse("Hi :) there\n", "moinwiki")), "<p>Hi :) there</p>");
    assert_eq!(
        with_options("Hi :) there\n", &[("icon", "smiley")]),
        "<p>Hi <span class=\"moin-text-icon moin-smile\">:)</span> there</p>"
    );
}

fn echo_host(call: &MacroCall<'_>) -> Result<Vec<Node>, MacroError> {
    match call.name {
        "Echo" => Ok(vec![call.arguments.unwrap_or_default().to_string().into()]),
        "Boom" => Err(MacroError::Failed("no fuse".to_string())),
        _ => Err(MacroError::Unknown),
    }
}

fn expand_macros(source: &str, macros: &str) -> String {
    let mut registry = ConverterRegistry::with_defaults();
    registry.set_macro_host(echo_host);
    let arguments = Arguments::from_keywords([("macros", macros)]);
    let doc = registry
        .parse_source(source, &Type::moin_wiki(), &HostConfig::default(), &arguments)
        .unwrap();
    body_xml(&doc)
}

#[test]
fn macros_expand_through_the_host() {
    let out = expand_macros("<<Echo(hello)>>\n", "expandall");
    assert!(out.contains("<body>hello</body>"), "{out}");
}

#[test]
fn macro_failures_are_shown_in_place() {
    let out = expand_macros("Text <<Nope>> <<Boom>>\n", "expandall");
    assert!(out.contains("<error>&lt;&lt;Nope&gt;&gt; Error: invalid macro name.</error>"), "{out}");
    assert!(
        out.contains("<error>&lt;&lt;Boom: execution failed [no fuse] (see also the log)&gt;&gt;</error>"),
        "{out}"
    );
}

#[test]
fn macros_stay_references_without_the_option() {
    let out = expand_macros("<<Echo(hello)>>\n", "none");
    assert!(!out.contains("<body>hello</body>"), "{out}");
    assert!(out.contains("content-type=\"x-moin/macro;name=Echo\""), "{out}");
}
