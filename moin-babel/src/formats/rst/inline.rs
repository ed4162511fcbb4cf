//! Inline markup of reStructuredText
//!
//! Inline constructs do not nest. A start-string counts only where the
//! recognition rules allow it (start of text, after whitespace or an opening
//! punctuation character, followed by non-whitespace); an end-string must
//! follow non-whitespace and be followed by whitespace, closing punctuation or
//! the end of the text.

use crate::common::links::{allowed_uri_scheme, anchor_name, quote_iri, scheme_of, wiki_local, LocalTarget};
use crate::common::macros::{MacroResolver, PlainText};
use crate::format::HostConfig;
use crate::ir::names::attr;
use crate::ir::{Element, Node, QName};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

pub const DIALECT: &str = "rst";

static ROLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:([A-Za-z0-9][A-Za-z0-9_.+-]*):`").expect("role pattern"));

static FOOTNOTE_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(#[A-Za-z0-9_-]*|\d+|\*)\]_").expect("footnote reference pattern"));

static SUBSTITUTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\|([^|\s](?:[^|]*[^|\s])?)\|(__?)?").expect("substitution pattern"));

static NAME_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]+(?:[-_.:+][A-Za-z0-9]+)*(__?)").expect("reference name pattern")
});

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:(?://)?[^\s<>]+").expect("url pattern"));

static EMBEDDED_URI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^(.*?)\s*<([^<>]+|<<.*>>)>$").expect("embedded uri pattern"));

static MACRO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<<(\w+)(?:\((.*)\))?>>$").expect("macro pattern"));

/// Whitespace-normalized, lower-cased reference name.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Identifier of an internal target: lower case, runs of other characters
/// collapsed into `-`.
pub fn make_id(name: &str) -> String {
    let mut id = String::new();
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            id.push(c);
        } else if !id.is_empty() && !id.ends_with('-') {
            id.push('-');
        }
    }
    id.trim_end_matches('-').to_string()
}

/// Definition of `|name|`.
#[derive(Debug, Clone, PartialEq)]
pub enum Substitution {
    Image { uri: String, options: Vec<(String, String)> },
    Replace(String),
}

/// Everything an inline reference may point at, collected before the blocks
/// are parsed.
#[derive(Debug, Default)]
pub struct References {
    /// Normalized name → URI, or `name_` for an indirect target
    pub targets: HashMap<String, String>,
    /// Internal targets (`.. _name:` with no URI), normalized
    pub internal: HashSet<String>,
    pub anonymous: Vec<String>,
    /// Normalized section titles
    pub sections: HashSet<String>,
    pub substitutions: HashMap<String, Substitution>,
    /// Bodies of `.. [#]` footnotes, in document order
    pub auto_footnotes: Vec<String>,
    /// Bodies of numbered and `[#label]` footnotes
    pub labeled_footnotes: HashMap<String, String>,
}

/// Turns one run of inline text into tree nodes.
pub struct InlineParser<'r> {
    refs: &'r References,
    host: &'r HostConfig,
    anonymous_used: usize,
    footnotes_used: usize,
}

fn is_start_prefix(c: char) -> bool {
    c.is_whitespace() || "-:/'\"<([{".contains(c)
}

fn is_end_suffix(c: char) -> bool {
    c.is_whitespace() || "-.,:;!?\\/'\")]}>".contains(c)
}

fn prev_char(text: &str, pos: usize) -> Option<char> {
    text[..pos].chars().next_back()
}

fn char_at(text: &str, pos: usize) -> Option<char> {
    text.get(pos..).and_then(|rest| rest.chars().next())
}

/// A start-string of length `len` may begin at `pos`.
fn can_start(text: &str, pos: usize, len: usize) -> bool {
    let before_ok = prev_char(text, pos).map_or(true, is_start_prefix);
    let after_ok = char_at(text, pos + len).is_some_and(|c| !c.is_whitespace());
    before_ok && after_ok
}

/// Position of the end-string `marker`, searched from `from`.
fn find_end(text: &str, from: usize, marker: &str) -> Option<usize> {
    let mut search = from;
    while let Some(offset) = text.get(search..)?.find(marker) {
        let pos = search + offset;
        let before_ok = pos > from && prev_char(text, pos).is_some_and(|c| !c.is_whitespace());
        let after_ok = char_at(text, pos + marker.len()).map_or(true, is_end_suffix);
        if before_ok && after_ok {
            return Some(pos);
        }
        search = pos + marker.len().max(1);
    }
    None
}

/// Backslash escapes: `\x` is `x`, an escaped space disappears.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) if next.is_whitespace() => {}
                Some(next) => out.push(next),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// An image or transclusion for `uri`. Local names become `xinclude:include`,
/// URLs become `object`.
pub fn image(uri: &str, options: &[(String, String)]) -> Element {
    let option = |key: &str| {
        options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };
    let scale = option("scale")
        .and_then(|s| s.trim_end_matches('%').trim().parse::<u32>().ok())
        .unwrap_or(100);

    let mut elem = if scheme_of(uri).is_some() {
        Element::page("object").with_attr(QName::xlink("href"), quote_iri(uri))
    } else {
        Element::new(QName::xinclude("include"))
            .with_attr(QName::xinclude("href"), wiki_local(uri, None, None))
    };
    for key in ["width", "height"] {
        if let Some(value) = option(key) {
            let scaled = match value.trim().parse::<u32>() {
                Ok(number) if scale != 100 => (number * scale / 100).to_string(),
                _ => value.to_string(),
            };
            elem.set_attr(QName::html(key), scaled);
        }
    }
    if let Some(alt) = option("alt") {
        elem.set_attr(QName::html("alt"), alt);
    }
    if let Some(align) = option("align") {
        if matches!(align, "left" | "center" | "right" | "top" | "bottom" | "middle") {
            elem.set_attr(QName::html("class"), align);
        }
    }
    elem
}

impl<'r> InlineParser<'r> {
    pub fn new(refs: &'r References, host: &'r HostConfig) -> Self {
        InlineParser {
            refs,
            host,
            anonymous_used: 0,
            footnotes_used: 0,
        }
    }

    pub fn parse(&mut self, text: &str) -> Vec<Node> {
        let mut nodes: Vec<Node> = Vec::new();
        let mut plain = String::new();
        let mut pos = 0;

        while pos < text.len() {
            let Some(c) = char_at(text, pos) else { break };
            if c == '\\' {
                match char_at(text, pos + 1) {
                    Some(next) if next.is_whitespace() => {
                        pos += 1 + next.len_utf8();
                    }
                    Some(next) => {
                        plain.push(next);
                        pos += 1 + next.len_utf8();
                    }
                    None => pos += 1,
                }
                continue;
            }
            match self.construct(text, pos) {
                Some((produced, end)) => {
                    if !plain.is_empty() {
                        nodes.push(Node::Text(std::mem::take(&mut plain)));
                    }
                    nodes.extend(produced);
                    pos = end;
                }
                None => {
                    plain.push(c);
                    pos += c.len_utf8();
                }
            }
        }
        if !plain.is_empty() {
            nodes.push(Node::Text(plain));
        }
        nodes
    }

    /// The inline construct starting at `pos`, if any.
    fn construct(&mut self, text: &str, pos: usize) -> Option<(Vec<Node>, usize)> {
        let rest = &text[pos..];
        if rest.starts_with("``") && can_start(text, pos, 2) {
            let end = find_end(text, pos + 2, "``")?;
            let code = Element::page("code").with_child(&text[pos + 2..end]);
            return Some((vec![code.into()], end + 2));
        }
        if rest.starts_with("**") && can_start(text, pos, 2) {
            let end = find_end(text, pos + 2, "**")?;
            let strong = Element::page("strong").with_child(unescape(&text[pos + 2..end]));
            return Some((vec![strong.into()], end + 2));
        }
        if rest.starts_with('*') && !rest.starts_with("**") && can_start(text, pos, 1) {
            let end = find_end(text, pos + 1, "*")?;
            let emphasis = Element::page("emphasis").with_child(unescape(&text[pos + 1..end]));
            return Some((vec![emphasis.into()], end + 1));
        }
        if rest.starts_with("_`") && can_start(text, pos, 2) {
            let end = find_end(text, pos + 2, "`")?;
            let name = &text[pos + 2..end];
            let target = Element::page("span")
                .with_page_attr(attr::ID, make_id(name))
                .with_child(unescape(name));
            return Some((vec![target.into()], end + 1));
        }
        if rest.starts_with('`') && can_start(text, pos, 1) {
            return self.interpreted(text, pos, None);
        }
        if rest.starts_with(':') && prev_char(text, pos).map_or(true, is_start_prefix) {
            if let Some(caps) = ROLE_RE.captures(rest) {
                let role = caps.get(1)?.as_str().to_string();
                let tick = pos + caps.get(0)?.end() - 1;
                return self.interpreted(text, tick, Some(&role));
            }
        }
        if rest.starts_with('[') && prev_char(text, pos).map_or(true, is_start_prefix) {
            if let Some(caps) = FOOTNOTE_REF_RE.captures(rest) {
                let label = caps.get(1)?.as_str();
                let end = pos + caps.get(0)?.end();
                if char_at(text, end).map_or(true, is_end_suffix) {
                    return Some((vec![self.footnote(label).into()], end));
                }
            }
        }
        if rest.starts_with('|') && can_start(text, pos, 1) {
            if let Some(caps) = SUBSTITUTION_RE.captures(rest) {
                let end = pos + caps.get(0)?.end();
                if char_at(text, end).map_or(true, is_end_suffix) {
                    let name = caps.get(1)?.as_str();
                    return Some((self.substitution(name), end));
                }
            }
        }
        let word_start = prev_char(text, pos).map_or(true, |c| !c.is_alphanumeric());
        if word_start && rest.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            if let Some(m) = URL_RE.find(rest) {
                let url = m.as_str().trim_end_matches(|c: char| ".,;:!?)'\"".contains(c));
                if let Some(scheme) = scheme_of(url) {
                    if self.host.allows_scheme(DIALECT, scheme) && url.len() > scheme.len() + 1 {
                        let link = Element::page("a")
                            .with_attr(QName::xlink("href"), quote_iri(url))
                            .with_child(url);
                        return Some((vec![link.into()], pos + url.len()));
                    }
                }
            }
            if let Some(caps) = NAME_REF_RE.captures(rest) {
                let whole = caps.get(0)?;
                let end = pos + whole.end();
                if char_at(text, end).map_or(true, is_end_suffix) {
                    let anonymous = caps.get(1)?.as_str() == "__";
                    let name = &whole.as_str()[..whole.end() - caps.get(1)?.len()];
                    return Some((vec![self.reference(name, anonymous).into()], end));
                }
            }
        }
        None
    }

    /// Back-quoted text at `tick`: a hyperlink reference when followed by `_`,
    /// otherwise interpreted text in `role`.
    fn interpreted(&mut self, text: &str, tick: usize, role: Option<&str>) -> Option<(Vec<Node>, usize)> {
        let content_start = tick + 1;
        let mut search = content_start;
        let (close, suffix) = loop {
            let offset = text.get(search..)?.find('`')?;
            let close = search + offset;
            let before_ok = close > content_start && prev_char(text, close).is_some_and(|c| !c.is_whitespace());
            let suffix = if text[close + 1..].starts_with("__") {
                2
            } else if text[close + 1..].starts_with('_') {
                1
            } else {
                0
            };
            let after_ok = char_at(text, close + 1 + suffix).map_or(true, is_end_suffix);
            if before_ok && after_ok {
                break (close, suffix);
            }
            search = close + 1;
        };
        let content = &text[content_start..close];
        let end = close + 1 + suffix;

        if suffix > 0 && role.is_none() {
            let anonymous = suffix == 2;
            let node = match EMBEDDED_URI_RE.captures(content) {
                _ if MACRO_RE.is_match(content) => self.embedded("", content),
                Some(caps) => {
                    let label = caps.get(1).map_or("", |m| m.as_str());
                    let uri: String = caps.get(2)?.as_str().split_whitespace().collect();
                    self.embedded(label, &uri)
                }
                None => self.reference(content, anonymous).into(),
            };
            return Some((vec![node], end));
        }

        let content = unescape(content);
        let node: Node = match role.unwrap_or("title-reference") {
            "emphasis" => Element::page("emphasis").with_child(content).into(),
            "strong" => Element::page("strong").with_child(content).into(),
            "literal" | "code" => Element::page("code").with_child(content).into(),
            "sup" | "superscript" => Element::page("span")
                .with_page_attr(attr::BASELINE_SHIFT, "super")
                .with_child(content)
                .into(),
            "sub" | "subscript" => Element::page("span")
                .with_page_attr(attr::BASELINE_SHIFT, "sub")
                .with_child(content)
                .into(),
            "abbreviation" | "abbr" | "acronym" | "ab" | "ac" => Element::page("span")
                .with_attr(QName::html("class"), "abbr")
                .with_child(content)
                .into(),
            "title-reference" | "title" | "t" => Element::page("span")
                .with_attr(QName::html("class"), "cite")
                .with_child(content)
                .into(),
            other => {
                tracing::debug!(role = other, "unknown interpreted text role");
                Node::Text(content)
            }
        };
        Some((vec![node], end))
    }

    /// `` `label <uri>`_ ``; `<<Macro(args)>>` targets are macro references.
    fn embedded(&self, label: &str, uri: &str) -> Node {
        if let Some(caps) = MACRO_RE.captures(uri) {
            let name = caps.get(1).map_or("", |m| m.as_str());
            let args = caps.get(2).map(|m| m.as_str());
            if let Some(node) = MacroResolver::new(&PlainText).resolve(name, args, uri, false) {
                return node;
            }
        }
        let label = if label.is_empty() { uri } else { label };
        Element::page("a")
            .with_attr(QName::xlink("href"), self.href(uri))
            .with_child(unescape(label))
            .into()
    }

    /// `name_`, `` `name`_ `` and their anonymous forms.
    fn reference(&mut self, name: &str, anonymous: bool) -> Element {
        let label = unescape(name);
        let href = if anonymous {
            let target = self.refs.anonymous.get(self.anonymous_used).cloned();
            self.anonymous_used += 1;
            match target {
                Some(uri) => self.href(&uri),
                None => self.unresolved(&label),
            }
        } else {
            self.resolve_name(&label, 0)
        };
        Element::page("a")
            .with_attr(QName::xlink("href"), href)
            .with_child(label)
    }

    fn resolve_name(&self, name: &str, depth: usize) -> String {
        let key = normalize_name(name);
        if let Some(uri) = self.refs.targets.get(&key) {
            // indirect target `.. _a: b_`
            if let Some(alias) = uri.strip_suffix('_').filter(|_| depth < 8) {
                return self.resolve_name(alias.trim_matches('`'), depth + 1);
            }
            return self.href(uri);
        }
        if self.refs.internal.contains(&key) {
            return wiki_local("", None, Some(&make_id(name)));
        }
        if self.refs.sections.contains(&key) {
            return wiki_local("", None, Some(&anchor_name(name)));
        }
        self.unresolved(name)
    }

    /// A reference without a target names a wiki item.
    fn unresolved(&self, name: &str) -> String {
        let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
        LocalTarget::parse(&name).to_iri()
    }

    /// Link target for a URI written in the markup. `http:Item` without `//`
    /// names a wiki item; a disallowed scheme is treated as an item name.
    pub fn href(&self, uri: &str) -> String {
        if let Some(item) = uri.strip_prefix("http:").filter(|rest| !rest.starts_with("//")) {
            return LocalTarget::parse(item).to_iri();
        }
        if scheme_of(uri).is_some() && allowed_uri_scheme(uri, self.host, DIALECT) {
            return quote_iri(uri);
        }
        LocalTarget::parse(uri).to_iri()
    }

    fn footnote(&mut self, label: &str) -> Element {
        let body = if label == "#" || label == "*" {
            let body = self.refs.auto_footnotes.get(self.footnotes_used).cloned();
            self.footnotes_used += 1;
            body
        } else {
            self.refs.labeled_footnotes.get(label).cloned()
        };
        let mut note_body = Element::page("note-body");
        if let Some(body) = body {
            let text = body.split_whitespace().collect::<Vec<_>>().join(" ");
            let nodes = InlineParser::new(self.refs, self.host).parse(&text);
            note_body.children.extend(nodes);
        }
        Element::page("note")
            .with_page_attr(attr::NOTE_CLASS, "footnote")
            .with_child(note_body)
    }

    fn substitution(&mut self, name: &str) -> Vec<Node> {
        match self.refs.substitutions.get(&normalize_name(name)) {
            Some(Substitution::Image { uri, options }) => {
                let mut options = options.clone();
                if !options.iter().any(|(key, _)| key == "alt") {
                    options.push(("alt".to_string(), name.to_string()));
                }
                vec![image(uri, &options).into()]
            }
            Some(Substitution::Replace(text)) => {
                let text = text.clone();
                self.parse(&text)
            }
            None => vec![Node::Text(format!("|{name}|"))],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::xml::to_fragment;
    use rstest::rstest;

    fn render(text: &str, refs: &References) -> String {
        let host = HostConfig::default();
        InlineParser::new(refs, &host)
            .parse(text)
            .iter()
            .map(|node| match node {
                Node::Element(elem) => to_fragment(elem),
                Node::Text(text) => text.clone(),
            })
            .collect()
    }

    #[rstest]
    #[case("*em* and **strong**", "<emphasis>em</emphasis> and <strong>strong</strong>")]
    #[case("``code *x*``", "<code>code *x*</code>")]
    #[case("2 * 3 * 4", "2 * 3 * 4")]
    #[case("H\\ :sub:`2`\\ O", "H<span baseline-shift=\"sub\">2</span>O")]
    #[case(":sup:`st`", "<span baseline-shift=\"super\">st</span>")]
    #[case("`Title`", "<span html:class=\"cite\">Title</span>")]
    #[case("\\*not\\*", "*not*")]
    #[case("see http://example.org.", "see <a xlink:href=\"http://example.org\">http://example.org</a>.")]
    fn markup(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(render(text, &References::default()), expected);
    }

    #[test]
    fn embedded_and_named_references() {
        let mut refs = References::default();
        refs.targets.insert("python".to_string(), "http://python.org".to_string());
        refs.targets.insert("alias".to_string(), "python_".to_string());
        assert_eq!(
            render("`docs <http://x.org/a b>`_", &refs),
            "<a xlink:href=\"http://x.org/ab\">docs</a>"
        );
        assert_eq!(render("Python_", &refs), "<a xlink:href=\"http://python.org\">Python</a>");
        assert_eq!(render("`alias`_", &refs), "<a xlink:href=\"http://python.org\">alias</a>");
        assert_eq!(render("`Some Page`_", &refs), "<a xlink:href=\"wiki.local:Some%20Page\">Some Page</a>");
    }

    #[test]
    fn anonymous_references_consume_targets_in_order() {
        let mut refs = References::default();
        refs.anonymous = vec!["http://one.org".to_string(), "http://two.org".to_string()];
        assert_eq!(
            render("one__ and `two`__", &refs),
            "<a xlink:href=\"http://one.org\">one</a> and <a xlink:href=\"http://two.org\">two</a>"
        );
    }

    #[test]
    fn footnotes_and_substitutions() {
        let mut refs = References::default();
        refs.auto_footnotes.push("the *note*".to_string());
        refs.substitutions
            .insert("name".to_string(), Substitution::Replace("**X**".to_string()));
        assert_eq!(
            render("text [#]_ |name|", &refs),
            "text <note note-class=\"footnote\"><note-body>the <emphasis>note</emphasis></note-body></note> <strong>X</strong>"
        );
    }

    #[test]
    fn macro_targets() {
        assert_eq!(
            render("`<<Date(1)>>`_", &References::default()),
            "<inline-part alt=\"&lt;&lt;Date(1)&gt;&gt;\" content-type=\"x-moin/macro;name=Date\"><arguments>1</arguments></inline-part>"
        );
    }

    #[rstest]
    #[case("Section One", "section-one")]
    #[case("  A -- b  ", "a-b")]
    fn ids(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(make_id(name), expected);
    }
}
