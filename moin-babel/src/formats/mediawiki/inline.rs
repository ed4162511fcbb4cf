//! Inline tokens of MediaWiki markup
//!
//! Besides quote runs and links, MediaWiki text carries a small set of HTML
//! tags (`<ref>`, `<s>`, `<sub>`, `<nowiki>`, ...). Paired tags become toggles;
//! tags whose content is literal are matched as a whole.

use crate::format::HostConfig;
use crate::formats::moinwiki::inline::{emph_strong, Token as MoinToken};
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineRule {
    Link,
    LineBreak,
    Blockquote,
    Nowiki,
    EmphStrong,
    Footnote,
    Tag,
    Subscript,
    Superscript,
    Entity,
}

pub const MEDIAWIKI_RULES: &[InlineRule] = &[
    InlineRule::Link,
    InlineRule::LineBreak,
    InlineRule::Blockquote,
    InlineRule::Nowiki,
    InlineRule::EmphStrong,
    InlineRule::Footnote,
    InlineRule::Tag,
    InlineRule::Subscript,
    InlineRule::Superscript,
    InlineRule::Entity,
];

/// Link captions
pub const DESCRIPTION_RULES: &[InlineRule] =
    &[InlineRule::LineBreak, InlineRule::Nowiki, InlineRule::EmphStrong];

/// Content of a literal tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal {
    /// `<nowiki>`, `<code>`, `<tt>`
    Code,
    /// `<pre>`
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'t> {
    /// `[[target|args|caption]]`; `args` keeps its leading `|`
    WikiLink { target: &'t str, args: &'t str },
    /// `[url caption]`
    ExternalLink { url: &'t str, text: &'t str },
    LineBreak,
    BlockquoteBegin,
    BlockquoteEnd,
    Literal { kind: Literal, text: &'t str },
    EmphStrong { len: usize, follow: usize },
    FootnoteBegin,
    FootnoteEnd,
    /// `<s>`, `<del>`, `<u>`, `<ins>` and their closing tags
    Tag { name: &'t str, close: bool },
    Subscript(&'t str),
    Superscript(&'t str),
    Entity(&'t str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found<'t> {
    pub start: usize,
    pub end: usize,
    pub token: Token<'t>,
}

static WIKI_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[\[\s*([^|\]]+?)\s*(\|.*?)?\]\]").expect("wiki link pattern"));

static EXTERNAL_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[\s*(([A-Za-z][A-Za-z0-9+.-]*):[^ \]]*)\s*([^\]]*?)\s*\]").expect("external link pattern")
});

static LINE_BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<br\s*/?>").expect("line break pattern"));

static BLOCKQUOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<(/)?blockquote(?:\s[^>]*)?>").expect("blockquote pattern"));

/// Tags whose content is taken literally.
const LITERAL_TAGS: &[(&str, &str, Literal)] = &[
    ("<nowiki>", "</nowiki>", Literal::Code),
    ("<pre>", "</pre>", Literal::Block),
    ("<code>", "</code>", Literal::Code),
    ("<tt>", "</tt>", Literal::Code),
];

/// Opening and closing tag of a literal span.
pub fn literal_tags() -> impl Iterator<Item = (&'static str, &'static str)> {
    LITERAL_TAGS.iter().map(|(open, close, _)| (*open, *close))
}

static FOOTNOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<(/)?ref(?:\s[^>]*?)?(/)?>").expect("footnote pattern"));

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<(/)?(s|del|u|ins)>").expect("tag pattern"));

static SUBSCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<sub>(.*?)</sub>").expect("subscript pattern"));

static SUPERSCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<sup>(.*?)</sup>").expect("superscript pattern"));

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^&(?:[0-9a-zA-Z]{2,6}|#\d{1,5}|#x[0-9a-fA-F]{1,6});").expect("entity pattern")
});

pub struct Scanner<'h> {
    rules: &'static [InlineRule],
    host: &'h HostConfig,
}

impl<'h> Scanner<'h> {
    pub const DIALECT: &'static str = "mediawiki";

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
            InlineRule::Link => self.link(rest).map(|(token, len)| (token, pos + len)),
            InlineRule::LineBreak => {
                let m = LINE_BREAK_RE.find(rest)?;
                Some((Token::LineBreak, pos + m.end()))
            }
            InlineRule::Blockquote => {
                let caps = BLOCKQUOTE_RE.captures(rest)?;
                let token = if caps.get(1).is_some() {
                    Token::BlockquoteEnd
                } else {
                    Token::BlockquoteBegin
                };
                Some((token, pos + caps.get(0)?.end()))
            }
            InlineRule::Nowiki => LITERAL_TAGS.iter().find_map(|(open, close, kind)| {
                let inner = rest.strip_prefix(open)?;
                let len = inner.find(close)?;
                let token = Token::Literal {
                    kind: *kind,
                    text: &inner[..len],
                };
                Some((token, pos + open.len() + len + close.len()))
            }),
            InlineRule::EmphStrong => match emph_strong(text, pos)? {
                (MoinToken::EmphStrong { len, follow }, end) => Some((Token::EmphStrong { len, follow }, end)),
                _ => None,
            },
            InlineRule::Footnote => {
                let caps = FOOTNOTE_RE.captures(rest)?;
                // `<ref name="x" />` reuses a note and carries no text
                if caps.get(2).is_some() {
                    return None;
                }
                let token = if caps.get(1).is_some() {
                    Token::FootnoteEnd
                } else {
                    Token::FootnoteBegin
                };
                Some((token, pos + caps.get(0)?.end()))
            }
            InlineRule::Tag => {
                let caps = TAG_RE.captures(rest)?;
                let token = Token::Tag {
                    name: caps.get(2)?.as_str(),
                    close: caps.get(1).is_some(),
                };
                Some((token, pos + caps.get(0)?.end()))
            }
            InlineRule::Subscript => {
                let caps = SUBSCRIPT_RE.captures(rest)?;
                Some((Token::Subscript(caps.get(1)?.as_str()), pos + caps.get(0)?.end()))
            }
            InlineRule::Superscript => {
                let caps = SUPERSCRIPT_RE.captures(rest)?;
                Some((Token::Superscript(caps.get(1)?.as_str()), pos + caps.get(0)?.end()))
            }
            InlineRule::Entity => {
                let m = ENTITY_RE.find(rest)?;
                Some((Token::Entity(m.as_str()), pos + m.end()))
            }
        }
    }

    fn link<'t>(&self, rest: &'t str) -> Option<(Token<'t>, usize)> {
        if let Some(caps) = WIKI_LINK_RE.captures(rest) {
            let token = Token::WikiLink {
                target: caps.get(1)?.as_str(),
                args: caps.get(2).map_or("", |m| m.as_str()),
            };
            return Some((token, caps.get(0)?.end()));
        }
        let caps = EXTERNAL_LINK_RE.captures(rest)?;
        let scheme = caps.get(2)?.as_str();
        if !self.host.allows_scheme(Self::DIALECT, scheme) {
            return None;
        }
        let token = Token::ExternalLink {
            url: caps.get(1)?.as_str(),
            text: caps.get(3).map_or("", |m| m.as_str()),
        };
        Some((token, caps.get(0)?.end()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn first(text: &str) -> Option<Token<'_>> {
        let host = HostConfig::default();
        Scanner::new(MEDIAWIKI_RULES, &host)
            .find(text, 0)
            .map(|found| found.token)
    }

    #[rstest]
    #[case("[[Page]]", Token::WikiLink { target: "Page", args: "" })]
    #[case("[[ Page |a=b|caption]]", Token::WikiLink { target: "Page", args: "|a=b|caption" })]
    #[case("[http://x.org the text]", Token::ExternalLink { url: "http://x.org", text: "the text" })]
    #[case("[http://x.org]", Token::ExternalLink { url: "http://x.org", text: "" })]
    #[case("<pre>a ''b''</pre>", Token::Literal { kind: Literal::Block, text: "a ''b''" })]
    #[case("<tt>x</tt>", Token::Literal { kind: Literal::Code, text: "x" })]
    #[case("</del>", Token::Tag { name: "del", close: true })]
    #[case("<ref name=\"a\">", Token::FootnoteBegin)]
    fn tokens(#[case] text: &str, #[case] expected: Token<'_>) {
        assert_eq!(first(text), Some(expected));
    }

    #[test]
    fn disallowed_scheme_is_text() {
        assert_eq!(first("[javascript:alert('xss')]"), None);
    }

    #[test]
    fn literal_tags_pair_by_name() {
        assert_eq!(first("<tt>x</code>"), None);
        assert_eq!(
            first("<nowiki><code>x</code></nowiki>"),
            Some(Token::Literal {
                kind: Literal::Code,
                text: "<code>x</code>"
            })
        );
    }
}
