//! Inline tokens of creole markup
//!
//! Same scanning model as the moinwiki scanner: at every position the rules are
//! tried in order and the first hit wins.

use crate::format::HostConfig;
use crate::formats::moinwiki::inline::{bare_url_end, char_at, prev_char};
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineRule {
    Url,
    Escape,
    Link,
    Macro,
    Nowiki,
    Object,
    Strong,
    Emphasis,
    Insert,
    LineBreak,
}

/// Everything allowed in running text.
pub const CREOLE_RULES: &[InlineRule] = &[
    InlineRule::Url,
    InlineRule::Escape,
    InlineRule::Link,
    InlineRule::Macro,
    InlineRule::Nowiki,
    InlineRule::Object,
    InlineRule::Strong,
    InlineRule::Emphasis,
    InlineRule::Insert,
    InlineRule::LineBreak,
];

/// Link descriptions
pub const DESCRIPTION_RULES: &[InlineRule] = &[
    InlineRule::Macro,
    InlineRule::Nowiki,
    InlineRule::Emphasis,
    InlineRule::Strong,
    InlineRule::Object,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'t> {
    Url { target: &'t str, escaped: bool },
    Escaped(&'t str),
    Link { target: &'t str, text: Option<&'t str> },
    Macro { source: &'t str, name: &'t str, args: Option<&'t str> },
    Nowiki(&'t str),
    Object { target: &'t str, text: Option<&'t str> },
    Strong,
    Emphasis,
    Insert,
    LineBreak,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found<'t> {
    pub start: usize,
    pub end: usize,
    pub token: Token<'t>,
}

static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[\[\s*([^|]+?)\s*(?:\|\s*(.+?)\s*)?\]\]").expect("link pattern")
});

static MACRO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<<(\w+)(?:\((.*?)\))?\s*>>").expect("macro pattern"));

static NOWIKI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{\{\{(.*?\}*)\}\}\}").expect("nowiki pattern"));

static OBJECT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\{\{\s*([^|]+?)\s*(?:\|\s*(.+?)\s*)?\}\}").expect("object pattern")
});

static OBJECT_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9+.-]+://").expect("object url pattern"));

/// True when an object target is an external URL rather than an item.
pub fn is_object_url(target: &str) -> bool {
    OBJECT_URL_RE.is_match(target)
}

pub struct Scanner<'h> {
    rules: &'static [InlineRule],
    host: &'h HostConfig,
}

impl<'h> Scanner<'h> {
    pub const DIALECT: &'static str = "creole";

    pub fn new(rules: &'static [InlineRule], host: &'h HostConfig) -> Self {
        Scanner { rules, host }
    }

    pub fn find<'t>(&self, text: &'t str, from: usize) -> Option<Found<'t>> {
        for (offset, _) in text[from..].char_indices() {
            let start = from + offset;
            for rule in self.rules {
                if let Some((token, end)) = self.try_rule(*rule, text, start) {
                    return Some(Found { start, end, token });
                }
            }
        }
        None
    }

    fn try_rule<'t>(&self, rule: InlineRule, text: &'t str, pos: usize) -> Option<(Token<'t>, usize)> {
        let rest = &text[pos..];
        match rule {
            InlineRule::Url => self.url(text, pos),
            InlineRule::Escape => {
                let escaped = rest.strip_prefix('~')?.chars().next()?;
                if escaped.is_whitespace() {
                    return None;
                }
                let end = pos + 1 + escaped.len_utf8();
                Some((Token::Escaped(&text[pos + 1..end]), end))
            }
            InlineRule::Link => {
                let caps = LINK_RE.captures(rest)?;
                let token = Token::Link {
                    target: caps.get(1)?.as_str(),
                    text: caps.get(2).map(|m| m.as_str()),
                };
                Some((token, pos + caps.get(0)?.end()))
            }
            InlineRule::Macro => {
                let caps = MACRO_RE.captures(rest)?;
                let whole = caps.get(0)?;
                let token = Token::Macro {
                    source: whole.as_str(),
                    name: caps.get(1)?.as_str(),
                    args: caps.get(2).map(|m| m.as_str()),
                };
                Some((token, pos + whole.end()))
            }
            InlineRule::Nowiki => {
                let caps = NOWIKI_RE.captures(rest)?;
                Some((Token::Nowiki(caps.get(1)?.as_str()), pos + caps.get(0)?.end()))
            }
            InlineRule::Object => {
                let caps = OBJECT_RE.captures(rest)?;
                let token = Token::Object {
                    target: caps.get(1)?.as_str(),
                    text: caps.get(2).map(|m| m.as_str()),
                };
                Some((token, pos + caps.get(0)?.end()))
            }
            InlineRule::Strong => rest.starts_with("**").then_some((Token::Strong, pos + 2)),
            // `://` of an unknown scheme is no emphasis
            InlineRule::Emphasis => (rest.starts_with("//") && prev_char(text, pos) != Some(':'))
                .then_some((Token::Emphasis, pos + 2)),
            InlineRule::Insert => (rest.starts_with("__") && prev_char(text, pos) != Some(':'))
                .then_some((Token::Insert, pos + 2)),
            InlineRule::LineBreak => rest.starts_with("\\\\").then_some((Token::LineBreak, pos + 2)),
        }
    }

    /// Bare URL, optionally escaped with a leading `~`.
    fn url<'t>(&self, text: &'t str, pos: usize) -> Option<(Token<'t>, usize)> {
        if char_at(text, pos) == Some('~') {
            if let Some(prev) = prev_char(text, pos) {
                if !(prev.is_whitespace() || ".,:;!?()/=".contains(prev)) {
                    return None;
                }
            }
            let rest = &text[pos + 1..];
            let end = bare_url_end(rest, 0, self.host, Self::DIALECT)?;
            let token = Token::Url {
                target: &rest[..end],
                escaped: true,
            };
            return Some((token, pos + 1 + end));
        }
        let end = bare_url_end(text, pos, self.host, Self::DIALECT)?;
        let token = Token::Url {
            target: &text[pos..end],
            escaped: false,
        };
        Some((token, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn first(text: &str) -> Option<Found<'_>> {
        let host = HostConfig::default();
        Scanner::new(CREOLE_RULES, &host).find(text, 0)
    }

    #[rstest]
    #[case("see http://moinmo.in/.", Some("http://moinmo.in/"))]
    #[case("(http://moinmo.in/)", Some("http://moinmo.in/"))]
    #[case("xhttp://moinmo.in/", None)]
    fn bare_urls(#[case] text: &str, #[case] expected: Option<&str>) {
        let url = first(text).and_then(|found| match found.token {
            Token::Url { target, .. } => Some(target),
            _ => None,
        });
        assert_eq!(url, expected);
    }

    #[test]
    fn escaped_url_keeps_target() {
        let found = first("~http://moinmo.in/").unwrap();
        assert_eq!(
            found.token,
            Token::Url {
                target: "http://moinmo.in/",
                escaped: true
            }
        );
        assert_eq!(found.end, "~http://moinmo.in/".len());
    }

    #[test]
    fn emphasis_not_after_colon() {
        assert_eq!(first("foo://bar"), None);
        assert_eq!(first("a //b").unwrap().token, Token::Emphasis);
    }

    #[test]
    fn nowiki_keeps_inner_braces() {
        assert_eq!(first("{{{{nowiki}}}}").unwrap().token, Token::Nowiki("{nowiki}"));
    }

    #[test]
    fn link_with_description() {
        assert_eq!(
            first("[[ Page | the text ]]").unwrap().token,
            Token::Link {
                target: "Page",
                text: Some("the text")
            }
        );
    }
}
