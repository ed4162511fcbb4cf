//! Inline markup recognition
//!
//! A [`Scanner`] walks a line of text and reports the leftmost inline construct
//! it finds. At every position the rules of the active set are tried in order
//! and the first one that matches wins, so `[[...]]` beats `{{...}}` when both
//! could start at the same character. Text between constructs is left to the
//! caller.
//!
//! Rules that care about their surroundings (comments, free links, bare URLs)
//! look at the character before the match position and after the match end
//! themselves.

use crate::common::links::scheme_of;
use crate::format::HostConfig;
use once_cell::sync::Lazy;
use regex::Regex;

/// One kind of inline construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineRule {
    Link,
    Macro,
    Nowiki,
    Object,
    EmphStrong,
    Comment,
    Size,
    Strike,
    Subscript,
    Superscript,
    Underline,
    Entity,
    /// CamelCase pages, `Site:Page` and e-mail addresses written without brackets
    FreeLink,
    /// `scheme:...` URLs written without brackets
    Url,
}

use InlineRule::*;

/// Rules of the current wiki dialect.
pub const MOIN_RULES: &[InlineRule] = &[
    Link, Macro, Nowiki, Object, EmphStrong, Comment, Size, Strike, Subscript, Superscript,
    Underline, Entity,
];

/// Link descriptions may carry any markup except another link.
pub const DESCRIPTION_RULES: &[InlineRule] = &[
    Macro, Nowiki, Object, EmphStrong, Comment, Size, Strike, Subscript, Superscript, Underline,
    Entity,
];

/// The 1.9 dialect also links CamelCase words and bare URLs.
pub const MOIN19_RULES: &[InlineRule] = &[
    Link, Macro, Nowiki, Object, EmphStrong, Comment, Size, Strike, Subscript, Superscript,
    Underline, Entity, FreeLink, Url,
];

/// A recognized construct, borrowing from the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'t> {
    Link {
        target: &'t str,
        text: Option<&'t str>,
        args: Option<&'t str>,
    },
    Macro {
        source: &'t str,
        name: &'t str,
        args: Option<&'t str>,
    },
    /// `{{{text}}}`
    Samp(&'t str),
    /// `` `text` ``
    Code(&'t str),
    Object {
        url: Option<&'t str>,
        item: Option<&'t str>,
        text: Option<&'t str>,
        args: Option<&'t str>,
    },
    /// A run of 2 to 6 quotes, plus the length of the next run when it is 2 or 3
    EmphStrong { len: usize, follow: usize },
    CommentBegin,
    CommentEnd,
    SizeBegin { larger: bool },
    SizeEnd,
    StrikeBegin,
    StrikeEnd,
    Subscript(&'t str),
    Superscript(&'t str),
    Underline,
    Entity(&'t str),
    FreeLink(FreeLinkForm<'t>),
    Url(&'t str),
}

/// The forms a free link can take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FreeLinkForm<'t> {
    /// `!CamelCase`: the text without the bang, never linked
    Escaped(&'t str),
    Interwiki {
        source: &'t str,
        site: &'t str,
        page: &'t str,
    },
    Page(&'t str),
    Email(&'t str),
}

/// A token and the byte range it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found<'t> {
    pub start: usize,
    pub end: usize,
    pub token: Token<'t>,
}

static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\[\[\s*(?P<target>[^|]+?)\s*(?:\|\s*(?P<text>[^|]*?|[^|]*?\{\{.*?\}\}[^|]*?)\s*)?(?:\|\s*(?P<args>[^|]*?)\s*)?\]\]",
    )
    .expect("link pattern")
});

static MACRO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<<(\w+)(?:\((.*?)\))?\s*>>").expect("macro pattern"));

static NOWIKI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\{\{\{(.*?\}*)\}\}\}|`(.*?)`)").expect("inline nowiki pattern"));

static OBJECT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\{\{\s*(?:(?P<url>[a-zA-Z0-9+.-]+://[^|]+?)|(?P<item>[^|]+?))\s*(?:\|\s*(?P<text>[^|]*?)\s*)?(?:\|\s*(?P<args>.*?)\s*)?\}\}",
    )
    .expect("object pattern")
});

static COMMENT_BEGIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/\*\s+").expect("comment begin pattern"));

static COMMENT_END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+\*/").expect("comment end pattern"));

static SUBSCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^,,(.*?),,").expect("subscript pattern"));

static SUPERSCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\^(.*?)\^").expect("superscript pattern"));

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^&(?:[0-9a-zA-Z]{2,6}|#\d{1,5}|#x[0-9a-fA-F]{1,6});").expect("entity pattern")
});

pub(crate) fn prev_char(text: &str, pos: usize) -> Option<char> {
    text[..pos].chars().next_back()
}

pub(crate) fn char_at(text: &str, pos: usize) -> Option<char> {
    text.get(pos..).and_then(|rest| rest.chars().next())
}

/// Letters and `/` glue a free link to its neighbours.
fn joins_word(c: char) -> bool {
    c.is_uppercase() || c.is_lowercase() || c == '/'
}

fn free_link_boundary(text: &str, end: usize) -> bool {
    !char_at(text, end).is_some_and(joins_word)
}

/// Finds inline tokens for one rule set.
#[derive(Debug, Clone, Copy)]
pub struct Scanner<'h> {
    rules: &'static [InlineRule],
    host: &'h HostConfig,
    dialect: &'h str,
}

impl<'h> Scanner<'h> {
    pub fn new(rules: &'static [InlineRule], host: &'h HostConfig, dialect: &'h str) -> Self {
        Scanner {
            rules,
            host,
            dialect,
        }
    }

    /// The leftmost token at or after byte offset `from`.
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
            Link => {
                let caps = LINK_RE.captures(rest)?;
                let token = Token::Link {
                    target: caps.name("target")?.as_str(),
                    text: caps.name("text").map(|m| m.as_str()),
                    args: caps.name("args").map(|m| m.as_str()),
                };
                Some((token, pos + caps.get(0)?.end()))
            }
            Macro => {
                let caps = MACRO_RE.captures(rest)?;
                let whole = caps.get(0)?;
                let token = Token::Macro {
                    source: whole.as_str(),
                    name: caps.get(1)?.as_str(),
                    args: caps.get(2).map(|m| m.as_str()),
                };
                Some((token, pos + whole.end()))
            }
            Nowiki => {
                let caps = NOWIKI_RE.captures(rest)?;
                let token = match (caps.get(1), caps.get(2)) {
                    (Some(text), _) => Token::Samp(text.as_str()),
                    (None, Some(text)) => Token::Code(text.as_str()),
                    (None, None) => return None,
                };
                Some((token, pos + caps.get(0)?.end()))
            }
            Object => {
                let caps = OBJECT_RE.captures(rest)?;
                let token = Token::Object {
                    url: caps.name("url").map(|m| m.as_str()),
                    item: caps.name("item").map(|m| m.as_str()),
                    text: caps.name("text").map(|m| m.as_str()),
                    args: caps.name("args").map(|m| m.as_str()),
                };
                Some((token, pos + caps.get(0)?.end()))
            }
            EmphStrong => emph_strong(text, pos),
            Comment => {
                if let Some(m) = COMMENT_BEGIN_RE.find(rest) {
                    if prev_char(text, pos).map_or(true, char::is_whitespace) {
                        return Some((Token::CommentBegin, pos + m.end()));
                    }
                }
                let m = COMMENT_END_RE.find(rest)?;
                let end = pos + m.end();
                char_at(text, end)
                    .map_or(true, char::is_whitespace)
                    .then_some((Token::CommentEnd, end))
            }
            Size => {
                if rest.starts_with("~+") || rest.starts_with("~-") {
                    Some((Token::SizeBegin { larger: rest.starts_with("~+") }, pos + 2))
                } else if rest.starts_with("+~") || rest.starts_with("-~") {
                    Some((Token::SizeEnd, pos + 2))
                } else {
                    None
                }
            }
            Strike => {
                if rest.starts_with("--(") {
                    Some((Token::StrikeBegin, pos + 3))
                } else if rest.starts_with(")--") {
                    Some((Token::StrikeEnd, pos + 3))
                } else {
                    None
                }
            }
            Subscript => {
                let caps = SUBSCRIPT_RE.captures(rest)?;
                Some((Token::Subscript(caps.get(1)?.as_str()), pos + caps.get(0)?.end()))
            }
            Superscript => {
                let caps = SUPERSCRIPT_RE.captures(rest)?;
                Some((Token::Superscript(caps.get(1)?.as_str()), pos + caps.get(0)?.end()))
            }
            Underline => rest.starts_with("__").then_some((Token::Underline, pos + 2)),
            Entity => {
                let m = ENTITY_RE.find(rest)?;
                Some((Token::Entity(m.as_str()), pos + m.end()))
            }
            FreeLink => free_link(text, pos),
            Url => self.url(text, pos),
        }
    }

    fn url<'t>(&self, text: &'t str, pos: usize) -> Option<(Token<'t>, usize)> {
        let end = bare_url_end(text, pos, self.host, self.dialect)?;
        Some((Token::Url(&text[pos..end]), end))
    }
}

/// End of a bare URL starting at `pos`.
///
/// The URL must follow whitespace or punctuation and use a scheme the host
/// allows for `dialect`. Trailing punctuation followed by whitespace is not
/// part of it.
pub(crate) fn bare_url_end(text: &str, pos: usize, host: &HostConfig, dialect: &str) -> Option<usize> {
    if let Some(prev) = prev_char(text, pos) {
        if !(prev.is_whitespace() || ".,:;!?()/=".contains(prev)) {
            return None;
        }
    }
    let scheme = scheme_of(&text[pos..])?;
    if !host.allows_scheme(dialect, scheme) {
        return None;
    }
    let mut end = pos + scheme.len() + 1;
    while let Some(c) = char_at(text, end) {
        if c.is_whitespace() {
            break;
        }
        end += c.len_utf8();
        match char_at(text, end) {
            None => return Some(end),
            Some(next) if next.is_whitespace() => return Some(end),
            Some(next) if ",.:;!?()".contains(next) => {
                let after = end + next.len_utf8();
                if char_at(text, after).map_or(true, char::is_whitespace) {
                    return Some(end);
                }
            }
            Some(_) => {}
        }
    }
    None
}

fn quote_run(text: &str, pos: usize) -> usize {
    text[pos..].chars().take_while(|c| *c == '\'').count()
}

pub(crate) fn emph_strong(text: &str, pos: usize) -> Option<(Token<'static>, usize)> {
    let run = quote_run(text, pos);
    if run < 2 {
        return None;
    }
    let len = run.min(6);
    let end = pos + len;
    let mut follow = 0;
    if run <= 6 {
        let gap = text[end..].chars().take_while(|c| *c != '\'').map(char::len_utf8).sum::<usize>();
        if gap > 0 && end + gap < text.len() {
            let next = quote_run(text, end + gap);
            if next == 2 || next == 3 {
                follow = next;
            }
        }
    }
    Some((Token::EmphStrong { len, follow }, end))
}

fn free_link(text: &str, pos: usize) -> Option<(Token<'_>, usize)> {
    if prev_char(text, pos).is_some_and(joins_word) {
        return None;
    }
    let (bang, start) = if text[pos..].starts_with('!') {
        (true, pos + 1)
    } else {
        (false, pos)
    };
    let (link, end) = free_interwiki(text, start)
        .or_else(|| free_page(text, start))
        .or_else(|| free_email(text, start))?;
    if bang {
        return Some((Token::FreeLink(FreeLinkForm::Escaped(&text[start..end])), end));
    }
    Some((Token::FreeLink(link), end))
}

fn free_interwiki(text: &str, start: usize) -> Option<(FreeLinkForm<'_>, usize)> {
    let rest = &text[start..];
    let mut chars = rest.chars();
    if !chars.next()?.is_ascii_uppercase() {
        return None;
    }
    let site_len = 1 + chars.take_while(char::is_ascii_alphabetic).count();
    if site_len < 2 || !rest[site_len..].starts_with(':') {
        return None;
    }
    let page_start = start + site_len + 1;
    let page_len: usize = text[page_start..]
        .chars()
        .take_while(|c| !c.is_whitespace() && !"\"'}]|:,.)?!".contains(*c))
        .map(char::len_utf8)
        .sum();
    if page_len == 0 {
        return None;
    }
    let word: String = text[page_start..].chars().take_while(|c| !c.is_whitespace()).collect();
    if !word.chars().any(char::is_alphanumeric) {
        return None;
    }
    let end = page_start + page_len;
    free_link_boundary(text, end).then(|| {
        (
            FreeLinkForm::Interwiki {
                source: &text[start..end],
                site: &text[start..start + site_len],
                page: &text[page_start..end],
            },
            end,
        )
    })
}

/// End of two or more `Upper lower+` groups starting at `pos`.
fn camel_case(text: &str, pos: usize) -> Option<usize> {
    let mut end = pos;
    let mut groups = 0;
    loop {
        let mut chars = text[end..].chars();
        match chars.next() {
            Some(c) if c.is_uppercase() => {
                let lower: usize = chars
                    .take_while(|c| c.is_lowercase())
                    .map(char::len_utf8)
                    .sum();
                if lower == 0 {
                    break;
                }
                end += c.len_utf8() + lower;
                groups += 1;
            }
            _ => break,
        }
    }
    (groups >= 2).then_some(end)
}

fn free_page(text: &str, start: usize) -> Option<(FreeLinkForm<'_>, usize)> {
    let mut pos = start;
    while text[pos..].starts_with("../") {
        pos += 3;
    }
    let mut segments = 0;
    loop {
        let mut segment = pos;
        if text[segment..].starts_with('/') && prev_char(text, segment) != Some('/') {
            segment += 1;
        }
        match camel_case(text, segment) {
            Some(end) => {
                pos = end;
                segments += 1;
            }
            None => break,
        }
    }
    if segments == 0 {
        return None;
    }
    if text[pos..].starts_with('#') {
        let anchor: usize = text[pos + 1..]
            .chars()
            .take_while(|c| !c.is_whitespace())
            .map(char::len_utf8)
            .sum();
        if anchor > 0 {
            pos += 1 + anchor;
        }
    }
    free_link_boundary(text, pos).then(|| (FreeLinkForm::Page(&text[start..pos]), pos))
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn free_email(text: &str, start: usize) -> Option<(FreeLinkForm<'_>, usize)> {
    let name: usize = text[start..]
        .chars()
        .take_while(|c| is_word(*c) || matches!(c, '-' | '.' | '+'))
        .map(char::len_utf8)
        .sum();
    if name == 0 || !text[start + name..].starts_with('@') {
        return None;
    }
    let domain_start = start + name + 1;
    // candidate ends: after any word character that follows the first dot
    let mut candidates = Vec::new();
    let mut seen_dot = false;
    let mut last_was_dot = true;
    let mut pos = domain_start;
    for c in text[domain_start..].chars() {
        if c == '.' {
            if last_was_dot {
                break;
            }
            seen_dot = true;
            last_was_dot = true;
        } else if is_word(c) || c == '-' {
            last_was_dot = false;
            if seen_dot {
                candidates.push(pos + c.len_utf8());
            }
        } else {
            break;
        }
        pos += c.len_utf8();
    }
    candidates
        .into_iter()
        .rev()
        .find(|end| free_link_boundary(text, *end))
        .map(|end| (FreeLinkForm::Email(&text[start..end]), end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn first<'t>(rules: &'static [InlineRule], text: &'t str) -> Option<Found<'t>> {
        let host = HostConfig::default().with_interwiki(["MoinMoin"]);
        Scanner::new(rules, &host, "moinwiki").find(text, 0)
    }

    #[test]
    fn leftmost_token_wins() {
        let found = first(MOIN_RULES, "a ''b'' [[c]]").unwrap();
        assert_eq!(found.start, 2);
        assert_eq!(found.token, Token::EmphStrong { len: 2, follow: 2 });
    }

    #[test]
    fn link_description_may_hold_pipes_inside_transclusion() {
        let found = first(MOIN_RULES, "[[/a.png|{{/a.png||width=5}}]]").unwrap();
        assert_eq!(
            found.token,
            Token::Link {
                target: "/a.png",
                text: Some("{{/a.png||width=5}}"),
                args: None
            }
        );
    }

    #[test]
    fn interwiki_link_does_not_swallow_next_link() {
        let found = first(MOIN_RULES, "[[MoinMoin:A]] and [[B]]").unwrap();
        assert_eq!(found.end, 14);
    }

    #[rstest]
    #[case("'''''x'''y''", 5, 3)]
    #[case("'''''x''y'''", 5, 2)]
    #[case("''''''x", 6, 0)]
    #[case("'''x''''", 3, 0)]
    fn quote_runs(#[case] text: &str, #[case] len: usize, #[case] follow: usize) {
        let found = first(MOIN_RULES, text).unwrap();
        assert_eq!(found.token, Token::EmphStrong { len, follow });
    }

    #[test]
    fn comment_needs_surrounding_blanks() {
        assert_eq!(first(MOIN_RULES, "a/* b"), None);
        assert_eq!(first(MOIN_RULES, "a /* b").unwrap().token, Token::CommentBegin);
        assert_eq!(first(MOIN_RULES, "b */c"), None);
        assert_eq!(first(MOIN_RULES, "b */").unwrap().token, Token::CommentEnd);
    }

    #[rstest]
    #[case("see CamelCase here", Some("CamelCase"))]
    #[case("xCamelCase", None)]
    #[case("CamelCaseX", None)]
    #[case("../ParentPage/SubPage#anchor", Some("../ParentPage/SubPage#anchor"))]
    #[case("/SubPage", Some("/SubPage"))]
    #[case("Camel", None)]
    fn free_pages(#[case] text: &str, #[case] page: Option<&str>) {
        let found = first(MOIN19_RULES, text).map(|f| f.token);
        assert_eq!(found, page.map(|p| Token::FreeLink(FreeLinkForm::Page(p))));
    }

    #[test]
    fn free_links_other_forms() {
        assert_eq!(
            first(MOIN19_RULES, "!CamelCase").unwrap().token,
            Token::FreeLink(FreeLinkForm::Escaped("CamelCase"))
        );
        assert_eq!(
            first(MOIN19_RULES, "mail me@example.org.").unwrap().token,
            Token::FreeLink(FreeLinkForm::Email("me@example.org"))
        );
        assert_eq!(
            first(MOIN19_RULES, "MoinMoin:RecentChanges").unwrap().token,
            Token::FreeLink(FreeLinkForm::Interwiki {
                source: "MoinMoin:RecentChanges",
                site: "MoinMoin",
                page: "RecentChanges"
            })
        );
    }

    #[rstest]
    #[case("go http://moinmo.in/ now", Some("http://moinmo.in/"))]
    #[case("(see http://moinmo.in/x) now", Some("http://moinmo.in/x"))]
    #[case("(see http://moinmo.in/x).", Some("http://moinmo.in/x)"))]
    #[case("end http://moinmo.in/.", Some("http://moinmo.in/"))]
    #[case("xhttp://moinmo.in/", None)]
    #[case("javascript:alert(1)", None)]
    fn bare_urls(#[case] text: &str, #[case] url: Option<&str>) {
        let found = first(MOIN19_RULES, text).map(|f| f.token);
        assert_eq!(found, url.map(Token::Url));
    }
}
