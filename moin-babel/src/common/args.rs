//! Positional and keyword arguments
//!
//! Macros, links, transclusions, nowiki directives and table cells all carry a
//! small argument string such as `a b key=value "quoted value" other='x y'`.
//! [`Arguments`] keeps the positional values and the keyword pairs in two
//! separate ordered containers; [`Arguments::parse`] and [`Arguments::unparse`]
//! translate between that value and its wiki string form.
//!
//! Three value syntaxes exist: the default one, one for object (transclusion)
//! parameters that tolerates a trailing `%` (`width=100%`), and one for the
//! Include macro that accepts item names with a leading `^` and embedded `/`, `.`
//! and blanks.

use crate::error::ConvertError;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Which value syntax [`Arguments::parse_with`] accepts for unquoted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentSyntax {
    Default,
    /// `width=100%`
    Object,
    /// `^Prefix..-..`, `/sub/my page`
    Include,
}

static DEFAULT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:([-&\w]+)=)?(?:([-\w]+)|"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)')"#)
        .expect("default argument pattern")
});

static OBJECT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:([-&\w]+)=)?(?:([-\w]+%*)|"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)')"#)
        .expect("object argument pattern")
});

static INCLUDE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:([-&\w]+)=)?(?:(\^?[-/.\w]+[-\s\w]*)|"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)')"#,
    )
    .expect("include argument pattern")
});

static BARE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-\w]+$").expect("bare value pattern"));

static KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-&\w]+$").expect("keyword pattern"));

/// Positional plus keyword parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Arguments {
    pub positional: Vec<String>,
    pub keyword: IndexMap<String, String>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arguments with only keyword pairs, in the given order.
    pub fn from_keywords<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Arguments {
            positional: Vec::new(),
            keyword: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Parse with the default value syntax.
    pub fn parse(input: &str) -> Self {
        Self::parse_with(input, ArgumentSyntax::Default)
    }

    pub fn parse_with(input: &str, syntax: ArgumentSyntax) -> Self {
        let re: &Regex = match syntax {
            ArgumentSyntax::Default => &DEFAULT_RE,
            ArgumentSyntax::Object => &OBJECT_RE,
            ArgumentSyntax::Include => &INCLUDE_RE,
        };
        let mut args = Arguments::new();
        for caps in re.captures_iter(input) {
            let raw = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or("");
            let value = unescape(raw);
            match caps.get(1) {
                Some(key) => {
                    args.keyword.insert(key.as_str().to_string(), value);
                }
                None => args.positional.push(value),
            }
        }
        args
    }

    /// Render back to the wiki string form.
    ///
    /// Values that are not a plain `[-\w]+` word are double-quoted with backslash
    /// escapes. Positional values come first, then keywords in insertion order.
    pub fn unparse(&self) -> Result<String, ConvertError> {
        let mut out: Vec<String> = Vec::with_capacity(self.len());
        for value in &self.positional {
            out.push(quote_if_needed(value));
        }
        for (key, value) in &self.keyword {
            if !KEY_RE.is_match(key) {
                return Err(ConvertError::InvalidArguments(format!(
                    "invalid keyword '{key}'"
                )));
            }
            out.push(format!("{key}={}", quote_if_needed(value)));
        }
        Ok(out.join(" "))
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    /// Number of positional values plus number of keyword pairs.
    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    pub fn positional(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.keyword.get(key).map(String::as_str)
    }

    /// True when `name` is a positional value or a keyword name.
    pub fn contains(&self, name: &str) -> bool {
        self.keyword.contains_key(name) || self.positional.iter().any(|p| p == name)
    }

    /// `(None, value)` for positional entries followed by `(Some(key), value)`.
    pub fn items(&self) -> impl Iterator<Item = (Option<&str>, &str)> {
        self.positional
            .iter()
            .map(|v| (None, v.as_str()))
            .chain(
                self.keyword
                    .iter()
                    .map(|(k, v)| (Some(k.as_str()), v.as_str())),
            )
    }
}

fn quote_if_needed(value: &str) -> String {
    if BARE_RE.is_match(value) {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}

/// Resolve backslash escapes (`\"`, `\\`, `\n`, `\xHH`, `\uHHHH`, ...).
///
/// Unknown escapes are kept verbatim, backslash included.
pub fn unescape(input: &str) -> String {
    if !input.contains('\\') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(kind @ ('x' | 'u' | 'U')) => {
                let width = match kind {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = chars.clone().take(width).collect();
                let decoded = if digits.len() == width {
                    u32::from_str_radix(&digits, 16)
                        .ok()
                        .and_then(char::from_u32)
                } else {
                    None
                };
                match decoded {
                    Some(ch) => {
                        out.push(ch);
                        for _ in 0..width {
                            chars.next();
                        }
                    }
                    None => {
                        out.push('\\');
                        out.push(kind);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn parses_mixed_arguments() {
        let args = Arguments::parse(r#"a b c d=e f="g h" i='j k' l="\"m\" n" o='\'p\' q'"#);
        assert_eq!(args.positional, vec!["a", "b", "c"]);
        assert_eq!(args.get("d"), Some("e"));
        assert_eq!(args.get("f"), Some("g h"));
        assert_eq!(args.get("i"), Some("j k"));
        assert_eq!(args.get("l"), Some("\"m\" n"));
        assert_eq!(args.get("o"), Some("'p' q"));
        assert_eq!(args.len(), 8);
    }

    #[test]
    fn contains_checks_both_containers() {
        let args = Arguments::parse("positional keyword=1");
        assert!(args.contains("positional"));
        assert!(args.contains("keyword"));
        assert!(!args.contains("none"));
    }

    #[test]
    fn items_lists_positional_first() {
        let args = Arguments::parse("x k=v y");
        let items: Vec<_> = args.items().collect();
        assert_eq!(items, vec![(None, "x"), (None, "y"), (Some("k"), "v")]);
    }

    #[rstest]
    #[case(ArgumentSyntax::Default, "width=100%", None)]
    #[case(ArgumentSyntax::Object, "width=100%", Some("100%"))]
    fn object_syntax_accepts_percent(
        #[case] syntax: ArgumentSyntax,
        #[case] input: &str,
        #[case] expected: Option<&str>,
    ) {
        let args = Arguments::parse_with(input, syntax);
        let width = args.get("width");
        match expected {
            Some(value) => assert_eq!(width, Some(value)),
            None => assert_ne!(width, Some("100%")),
        }
    }

    #[test]
    fn include_syntax_keeps_item_patterns() {
        let args = Arguments::parse_with(
            r#"^Prefix..-..-..,,to="^----",sort=descending,items=3"#,
            ArgumentSyntax::Include,
        );
        assert_eq!(args.positional, vec!["^Prefix..-..-.."]);
        let keys: Vec<&str> = args.keyword.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["to", "sort", "items"]);
        assert_eq!(args.get("to"), Some("^----"));

        let args = Arguments::parse_with("/sub/my page, heading", ArgumentSyntax::Include);
        assert_eq!(args.positional, vec!["/sub/my page", "heading"]);
    }

    #[test]
    fn unparse_quotes_when_needed_and_keeps_order() {
        let mut args = Arguments::new();
        args.positional.push("plain".to_string());
        args.positional.push("two words".to_string());
        args.keyword.insert("zeta".to_string(), "1".to_string());
        args.keyword.insert("alpha".to_string(), "say \"hi\"".to_string());
        assert_eq!(
            args.unparse().unwrap(),
            r#"plain "two words" zeta=1 alpha="say \"hi\"""#
        );
    }

    #[test]
    fn unparse_rejects_bad_keywords() {
        let args = Arguments::from_keywords([("no spaces", "x")]);
        assert!(args.unparse().is_err());
    }

    #[test]
    fn unescape_handles_known_and_unknown_escapes() {
        assert_eq!(unescape(r"a\tb"), "a\tb");
        assert_eq!(unescape(r"\x41é"), "Aé");
        assert_eq!(unescape(r"\q"), r"\q");
    }

    proptest! {
        #[test]
        fn unparse_then_parse_is_equivalent(
            positional in proptest::collection::vec("[a-z0-9 _\"'-]{1,8}", 0..4),
            keyword in proptest::collection::vec(("[a-z]{1,6}", "[a-z0-9 _\"'=-]{1,8}"), 0..4),
        ) {
            let mut args = Arguments::new();
            args.positional = positional;
            for (k, v) in keyword {
                args.keyword.insert(k, v);
            }
            let text = args.unparse().unwrap();
            prop_assert_eq!(Arguments::parse(&text), args);
        }
    }
}
