//! Macro references
//!
//! `<<Name(args)>>` is resolved at parse time only for a handful of names that
//! have a fixed meaning in every dialect:
//!
//! - `BR` is a line break (and nothing at block level),
//! - `FootNote(text)` wraps its inline-parsed argument into a footnote,
//! - `TableOfContents(depth)` marks where the outline goes,
//! - `Include(item, ...)` becomes an `xinclude:include` with an xpointer query.
//!
//! Every other name is kept as an opaque `part` (block) or `inline-part` (inline)
//! reference with content type `x-moin/macro;name=<Name>`; expanding it is the
//! host's business.

use crate::common::args::{ArgumentSyntax, Arguments};
use crate::common::links::wiki_local;
use crate::ir::names::{attr, PAGE_NS};
use crate::ir::{Element, Node, QName};
use crate::mime::Type;

/// Parses inline markup of the calling dialect, for macro arguments that may
/// carry markup.
pub trait InlineMarkup {
    fn inline_markup(&self, text: &str) -> Vec<Node>;
}

/// Treats arguments as literal text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainText;

impl InlineMarkup for PlainText {
    fn inline_markup(&self, text: &str) -> Vec<Node> {
        vec![Node::Text(text.to_string())]
    }
}

/// Resolves macro references for one dialect.
pub struct MacroResolver<'m> {
    markup: &'m dyn InlineMarkup,
}

impl<'m> MacroResolver<'m> {
    pub fn new(markup: &'m dyn InlineMarkup) -> Self {
        MacroResolver { markup }
    }

    /// Resolve `<<name(args)>>`, written in the source as `text`.
    ///
    /// `block` tells whether the macro stands on a line of its own. `None` means
    /// the macro produces nothing in that position.
    pub fn resolve(&self, name: &str, args: Option<&str>, text: &str, block: bool) -> Option<Node> {
        let args = args.filter(|a| !a.is_empty());
        match name {
            "BR" => (!block).then(|| Element::page("line-break").into()),
            "FootNote" => Some(self.footnote(args, block).into()),
            "Include" => Some(include(args, text, block).into()),
            "TableOfContents" => Some(table_of_contents(args, text, block)),
            _ => Some(macro_reference(name, args, text, block).into()),
        }
    }

    fn footnote(&self, args: Option<&str>, block: bool) -> Element {
        let Some(args) = args else {
            // explicit placement of the collected footnotes
            return Element::page("note");
        };
        let body = Element::page("note-body").with_children(self.markup.inline_markup(args));
        let note = Element::page("note")
            .with_page_attr(attr::NOTE_CLASS, "footnote")
            .with_child(body);
        if block {
            Element::page("p").with_child(note)
        } else {
            note
        }
    }
}

/// The generic reference left for the host to expand.
pub fn macro_reference(name: &str, args: Option<&str>, text: &str, block: bool) -> Element {
    let tag = if block { "part" } else { "inline-part" };
    let mut elem = Element::page(tag)
        .with_page_attr(attr::ALT, text)
        .with_page_attr(attr::CONTENT_TYPE, Type::moin_macro(name).to_string());
    if let Some(args) = args.filter(|a| !a.is_empty()) {
        elem.push(Element::page("arguments").with_child(args));
    }
    elem
}

fn table_of_contents(args: Option<&str>, text: &str, block: bool) -> Node {
    if !block {
        return Node::Text(text.to_string());
    }
    let mut toc = Element::page("table-of-content");
    let level = args
        .and_then(|a| a.trim().parse::<u8>().ok())
        .filter(|level| (1..=6).contains(level));
    if let Some(level) = level {
        toc.set_page_attr(attr::OUTLINE_LEVEL, level.to_string());
    }
    toc.into()
}

fn include_error(text: &str, message: &str) -> Element {
    Element::page("div")
        .with_child(Element::page("p").with_child(text))
        .with_child(
            Element::page("p")
                .with_page_attr(attr::CLASS, "moin-error")
                .with_child(message),
        )
}

/// Escape `^`, `(` and `)` inside an xpointer term.
pub fn escape_xpointer(value: &str) -> String {
    value
        .replace('^', "^^")
        .replace('(', "^(")
        .replace(')', "^)")
}

fn xpointer_term(function: &str, value: &str) -> String {
    format!("{function}({})", escape_xpointer(value))
}

fn positive_count(args: &Arguments, key: &str) -> Result<Option<u64>, String> {
    match args.get(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(|n| (n > 0).then_some(n))
            .map_err(|_| format!("Include Macro above has invalid format, expected a number for {key}")),
    }
}

fn include(args: Option<&str>, text: &str, block: bool) -> Element {
    let missing = "Include Macro above has invalid format, missing item name";
    let Some(raw) = args else {
        return include_error(text, missing);
    };
    let args = Arguments::parse_with(raw, ArgumentSyntax::Include);
    let Some(item) = args.positional(0) else {
        return include_error(text, missing);
    };

    if let Some(sort) = args.get("sort") {
        if sort != "ascending" && sort != "descending" {
            return include_error(
                text,
                "Include Macro above has invalid format, expected sort=ascending or descending",
            );
        }
    }

    let mut terms: Vec<String> = Vec::new();
    let mut include = Element::new(QName::xinclude("include"));

    if item.starts_with('^') {
        terms.push(xpointer_term("pages", item));
        for (key, value) in &args.keyword {
            match key.as_str() {
                "from" | "to" | "sort" => terms.push(xpointer_term(key, value)),
                "items" | "skipitems" => match positive_count(&args, key) {
                    Ok(Some(count)) => terms.push(xpointer_term(key, &count.to_string())),
                    Ok(None) => {}
                    Err(message) => return include_error(text, &message),
                },
                _ => {}
            }
        }
    } else {
        include.set_attr(QName::xinclude("href"), wiki_local(item, None, None));
    }

    if let Some(heading) = args.positional(1) {
        terms.push(xpointer_term("heading", heading));
    }
    if let Some(level) = args
        .positional(2)
        .and_then(|l| l.trim().parse::<u32>().ok())
        .filter(|l| *l > 0)
    {
        terms.push(xpointer_term("level", &level.to_string()));
    }
    if args.contains("titlesonly") {
        terms.push("titlesonly()".to_string());
    }
    if args.contains("editlink") {
        terms.push("editlink()".to_string());
    }

    if !terms.is_empty() {
        include.set_attr(
            QName::xinclude("xpointer"),
            format!("xmlns(page={PAGE_NS}) page:include({})", terms.join(" ")),
        );
    }

    if block {
        Element::page("div")
            .with_page_attr(attr::CLASS, "moin-p")
            .with_child(include)
    } else {
        include
    }
}

/// A `part` handing `content` to the sub-language `name`.
///
/// A name containing `/` is taken as a content type, anything else as
/// `x-moin/format;name=<name>`.
pub fn parser_part(name: &str, args: Option<&Arguments>, content: Vec<Node>) -> Element {
    let content_type = if name.contains('/') {
        Type::parse(name).unwrap_or_else(|_| Type::moin_format(name))
    } else {
        Type::moin_format(name)
    };
    tracing::debug!(%content_type, "parser part");
    let mut part = Element::page("part").with_page_attr(attr::CONTENT_TYPE, content_type.to_string());
    if let Some(args) = args.filter(|a| !a.is_empty()) {
        let mut arguments = Element::page("arguments");
        for (key, value) in args.items() {
            let mut argument = Element::page("argument").with_child(value);
            if let Some(key) = key {
                argument.set_page_attr("name", key);
            }
            arguments.push(argument);
        }
        part.push(arguments);
    }
    if !content.is_empty() {
        part.push(Element::page("body").with_children(content));
    }
    part
}
