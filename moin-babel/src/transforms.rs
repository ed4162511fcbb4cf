//! Document to document passes
//!
//! Each pass is registered for the document type on both sides and declines
//! unless the caller's options ask for it, so [`ConverterRegistry::apply_transforms`]
//! runs exactly the passes a conversion requested:
//!
//! | pass | option | effect |
//! |------|--------|--------|
//! | [`NowikiExpansion`] | `nowiki=expandall` | fills `nowiki` elements with the output of the sub-language they name |
//! | [`MacroExpansion`] | `macros=expandall` | asks a [`MacroHost`] for the content of macro references |
//! | [`SmileyTransform`] | `icon=smiley` | turns text smileys into icon spans |
//!
//! [`ConverterRegistry::apply_transforms`]: crate::registry::ConverterRegistry::apply_transforms

use crate::common::args::Arguments;
use crate::common::nowiki::{expand, NowikiBlock};
use crate::error::ConvertError;
use crate::format::{ParseContext, Transform};
use crate::ir::names::attr;
use crate::ir::{Element, Node};
use crate::mime::Type;
use crate::registry::priority;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Expands every `nowiki` element through the nowiki sub-dispatcher.
///
/// The expansion replaces the element's raw content; the element and its
/// attributes stay. Output of a nested dialect is expanded again, so fences
/// inside a `#!wiki` section work too.
#[derive(Debug, Clone, Copy, Default)]
pub struct NowikiExpansion;

impl NowikiExpansion {
    fn expand_children(elem: &mut Element, ctx: &ParseContext<'_>) {
        let children = std::mem::take(&mut elem.children);
        for child in children {
            match child {
                Node::Element(mut nowiki) if nowiki.is_page("nowiki") => {
                    match NowikiBlock::from_element(&nowiki) {
                        Some(block) => {
                            nowiki.children = expand(&block, ctx);
                            Self::expand_children(&mut nowiki, ctx);
                        }
                        // already expanded, or malformed
                        None => Self::expand_children(&mut nowiki, ctx),
                    }
                    elem.children.push(nowiki.into());
                }
                Node::Element(mut child) => {
                    Self::expand_children(&mut child, ctx);
                    elem.children.push(child.into());
                }
                text => elem.children.push(text),
            }
        }
    }
}

impl Transform for NowikiExpansion {
    fn name(&self) -> &str {
        "nowiki"
    }

    fn description(&self) -> &str {
        "Expand nowiki sections into their sub-language"
    }

    fn accepts(&self, options: &Arguments) -> bool {
        options.get("nowiki") == Some("expandall")
    }

    fn priority(&self) -> i32 {
        priority::FIRST
    }

    fn transform(&self, mut doc: Element, ctx: &ParseContext<'_>) -> Result<Element, ConvertError> {
        Self::expand_children(&mut doc, ctx);
        Ok(doc)
    }
}

/// Smiley markup and icon name.
pub const SMILEYS: &[(&str, &str)] = &[
    ("X-(", "angry"),
    (":D", "biggrin"),
    ("<:(", "frown"),
    (":o", "redface"),
    (":(", "sad"),
    (":)", "smile"),
    ("B)", "smile2"),
    (":))", "smile3"),
    (";)", "smile4"),
    ("/!\\", "alert"),
    ("<!>", "attention"),
    ("(!)", "idea"),
    (":-?", "tongue"),
    (":\\", "ohwell"),
    (">:>", "devil"),
    ("|)", "tired"),
    (":-(", "sad"),
    (":-)", "smile"),
    ("B-)", "smile2"),
    (":-))", "smile3"),
    (";-)", "smile4"),
    ("|-)", "tired"),
    ("(./)", "checkmark"),
    ("{OK}", "thumbs-up"),
    ("{X}", "icon-error"),
    ("{i}", "icon-info"),
    ("{1}", "prio1"),
    ("{2}", "prio2"),
    ("{3}", "prio3"),
    ("{*}", "star_on"),
    ("{o}", "star_off"),
];

/// No smileys inside these elements.
const SMILEY_FREE: &[&str] = &["code", "blockcode", "nowiki"];

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+").expect("word pattern"));

/// Replaces smileys standing between whitespace with icon spans.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmileyTransform;

impl SmileyTransform {
    fn icon(markup: &str) -> Option<&'static str> {
        SMILEYS
            .iter()
            .find(|(smiley, _)| *smiley == markup)
            .map(|(_, name)| *name)
    }

    /// `text` with its smileys replaced.
    pub fn replace(text: &str) -> Vec<Node> {
        let mut out = Vec::new();
        let mut last = 0;
        for word in WORD_RE.find_iter(text) {
            let Some(name) = Self::icon(word.as_str()) else {
                continue;
            };
            if word.start() > last {
                out.push(Node::from(&text[last..word.start()]));
            }
            out.push(
                Element::page("span")
                    .with_page_attr(attr::CLASS, format!("moin-text-icon moin-{name}"))
                    .with_child(word.as_str())
                    .into(),
            );
            last = word.end();
        }
        if last < text.len() {
            out.push(Node::from(&text[last..]));
        }
        out
    }

    fn replace_in(elem: &mut Element) {
        if elem.page_name().is_some_and(|name| SMILEY_FREE.contains(&name)) {
            return;
        }
        let children = std::mem::take(&mut elem.children);
        for child in children {
            match child {
                Node::Text(text) => elem.children.extend(Self::replace(&text)),
                Node::Element(mut child) => {
                    Self::replace_in(&mut child);
                    elem.children.push(child.into());
                }
            }
        }
    }
}

impl Transform for SmileyTransform {
    fn name(&self) -> &str {
        "smiley"
    }

    fn description(&self) -> &str {
        "Replace text smileys with icons"
    }

    fn accepts(&self, options: &Arguments) -> bool {
        options.get("icon") == Some("smiley")
    }

    fn priority(&self) -> i32 {
        priority::LAST
    }

    fn transform(&self, mut doc: Element, _ctx: &ParseContext<'_>) -> Result<Element, ConvertError> {
        Self::replace_in(&mut doc);
        Ok(doc)
    }
}

/// One macro reference handed to a [`MacroHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroCall<'a> {
    pub name: &'a str,
    /// The raw argument string, as written between the parentheses
    pub arguments: Option<&'a str>,
    /// The macro markup, for hosts that want to show it
    pub alt: Option<&'a str>,
    /// Whether the macro stood on a line of its own
    pub block: bool,
}

impl MacroCall<'_> {
    pub fn parsed_arguments(&self) -> Arguments {
        self.arguments.map(Arguments::parse).unwrap_or_default()
    }
}

/// Why a host could not expand a macro.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MacroError {
    #[error("invalid macro name")]
    Unknown,
    #[error("execution failed [{0}]")]
    Failed(String),
}

/// Supplies the content of macros; the library never runs macro code itself.
pub trait MacroHost: Send + Sync {
    fn expand(&self, call: &MacroCall<'_>) -> Result<Vec<Node>, MacroError>;
}

impl<F> MacroHost for F
where
    F: Fn(&MacroCall<'_>) -> Result<Vec<Node>, MacroError> + Send + Sync,
{
    fn expand(&self, call: &MacroCall<'_>) -> Result<Vec<Node>, MacroError> {
        self(call)
    }
}

/// Asks a [`MacroHost`] for the content of every macro reference.
///
/// The content goes into a `body` (block macros) or `inline-body` child of
/// the reference; a failure becomes an `error` child instead.
#[derive(Clone, Default)]
pub struct MacroExpansion {
    host: Option<Arc<dyn MacroHost>>,
}

impl fmt::Debug for MacroExpansion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacroExpansion")
            .field("host", &self.host.is_some())
            .finish()
    }
}

impl MacroExpansion {
    pub fn new(host: impl MacroHost + 'static) -> Self {
        MacroExpansion {
            host: Some(Arc::new(host)),
        }
    }

    fn expand_in(&self, host: &dyn MacroHost, elem: &mut Element) {
        for child in elem.elements_mut() {
            self.expand_in(host, child);
        }
        let block = elem.is_page("part");
        if !block && !elem.is_page("inline-part") {
            return;
        }
        let Some(content_type) = elem.page_attr(attr::CONTENT_TYPE).and_then(|t| Type::parse(t).ok()) else {
            return;
        };
        if content_type.major() != Some("x-moin") || content_type.subtype() != Some("macro") {
            return;
        }
        let Some(name) = content_type.parameter("name") else {
            return;
        };

        let arguments = elem.find("arguments").map(Element::text_content);
        let call = MacroCall {
            name,
            arguments: arguments.as_deref(),
            alt: elem.page_attr(attr::ALT),
            block,
        };
        tracing::debug!(name, block, "expanding macro");
        let outcome = host.expand(&call);
        match outcome {
            Ok(content) if content.is_empty() => {}
            Ok(content) => {
                let body = Element::page(if block { "body" } else { "inline-body" }).with_children(content);
                elem.push(body);
            }
            Err(err) => {
                let message = match &err {
                    MacroError::Unknown => format!("<<{name}>> Error: {err}."),
                    MacroError::Failed(_) => format!("<<{name}: {err} (see also the log)>>"),
                };
                tracing::warn!(name, error = %err, "macro expansion failed");
                elem.push(Element::page("error").with_child(message));
            }
        }
    }
}

impl Transform for MacroExpansion {
    fn name(&self) -> &str {
        "macros"
    }

    fn description(&self) -> &str {
        "Expand macro references through the host"
    }

    fn accepts(&self, options: &Arguments) -> bool {
        self.host.is_some() && options.get("macros") == Some("expandall")
    }

    fn transform(&self, mut doc: Element, _ctx: &ParseContext<'_>) -> Result<Element, ConvertError> {
        if let Some(host) = &self.host {
            self.expand_in(host.as_ref(), &mut doc);
        }
        Ok(doc)
    }
}
