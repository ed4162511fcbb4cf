//! MIME-like content types
//!
//! A [`Type`] is a `(type, subtype, parameters)` triple. Either part may be a
//! wildcard (written `*`, stored as `None`), which is what makes a type usable as a
//! *pattern*: `text/*` is a supertype of `text/plain;charset=utf-8`, and
//! `x-moin/format` is a supertype of `x-moin/format;name=wiki`.
//!
//! The registry orders its entries by this relation, so the more specific a pattern
//! the earlier it is consulted.

use crate::error::ConvertError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A content type such as `text/x.moin.wiki;charset=utf-8`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Type {
    major: Option<String>,
    subtype: Option<String>,
    parameters: BTreeMap<String, String>,
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`{|}~".contains(c)
}

fn wildcard(part: &str) -> Option<String> {
    match part.trim() {
        "" | "*" => None,
        other => Some(other.to_ascii_lowercase()),
    }
}

impl Type {
    /// Build a type from its two parts; `None` is a wildcard.
    pub fn new(major: Option<&str>, subtype: Option<&str>) -> Self {
        Type {
            major: major.and_then(wildcard),
            subtype: subtype.and_then(wildcard),
            parameters: BTreeMap::new(),
        }
    }

    /// The all-matching `*/*` pattern.
    pub fn any() -> Self {
        Type::default()
    }

    /// Parse a type string, e.g. `text/csv;charset="utf-8"`.
    pub fn parse(input: &str) -> Result<Self, ConvertError> {
        let mut parts = input.split(';');
        let head = parts.next().unwrap_or("").trim();
        if head.is_empty() {
            return Err(ConvertError::InvalidArguments(format!(
                "empty content type in '{input}'"
            )));
        }
        let (major, subtype) = match head.split_once('/') {
            Some((major, subtype)) => (wildcard(major), wildcard(subtype)),
            None => (wildcard(head), None),
        };

        let mut parameters = BTreeMap::new();
        for param in parts {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let (key, value) = param.split_once('=').ok_or_else(|| {
                ConvertError::InvalidArguments(format!(
                    "content type parameter '{param}' has no value"
                ))
            })?;
            let value = value.trim();
            let value = if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
                &value[1..value.len() - 1]
            } else {
                value
            };
            parameters.insert(key.trim().to_ascii_lowercase(), value.to_string());
        }

        Ok(Type {
            major,
            subtype,
            parameters,
        })
    }

    /// Return a copy with one more parameter.
    pub fn with_parameter(mut self, key: &str, value: &str) -> Self {
        self.parameters
            .insert(key.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn major(&self) -> Option<&str> {
        self.major.as_deref()
    }

    pub fn subtype(&self) -> Option<&str> {
        self.subtype.as_deref()
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    /// The same type without any parameters.
    pub fn base(&self) -> Type {
        Type {
            major: self.major.clone(),
            subtype: self.subtype.clone(),
            parameters: BTreeMap::new(),
        }
    }

    /// Whether `self` is at least as general as `other`.
    ///
    /// Holds when each non-wildcard part of `self` equals the corresponding part of
    /// `other` and every parameter of `self` is also present, with the same value,
    /// in `other`. Every type is a supertype of itself.
    pub fn is_supertype(&self, other: &Type) -> bool {
        if let Some(major) = &self.major {
            if other.major.as_ref() != Some(major) {
                return false;
            }
        }
        if let Some(subtype) = &self.subtype {
            if other.subtype.as_ref() != Some(subtype) {
                return false;
            }
        }
        self.parameters
            .iter()
            .all(|(key, value)| other.parameters.get(key) == Some(value))
    }

    /// The internal document tree type every input converter produces.
    pub fn moin_document() -> Self {
        Type::new(Some("application"), Some("x.moin.document"))
    }

    pub fn moin_wiki() -> Self {
        Type::new(Some("text"), Some("x.moin.wiki"))
    }

    pub fn moin_creole() -> Self {
        Type::new(Some("text"), Some("x.moin.creole"))
    }

    pub fn text_plain() -> Self {
        Type::new(Some("text"), Some("plain"))
    }

    /// `x-moin/format;name=<name>`, the type nowiki directives and parser parts use.
    pub fn moin_format(name: &str) -> Self {
        Type::new(Some("x-moin"), Some("format")).with_parameter("name", name)
    }

    /// `x-moin/macro;name=<name>`, the content type of an unexpanded macro reference.
    pub fn moin_macro(name: &str) -> Self {
        Type::new(Some("x-moin"), Some("macro")).with_parameter("name", name)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.major.as_deref().unwrap_or("*"),
            self.subtype.as_deref().unwrap_or("*")
        )?;
        for (key, value) in &self.parameters {
            if !value.is_empty() && value.chars().all(is_token_char) {
                write!(f, ";{key}={value}")?;
            } else {
                write!(f, ";{key}=\"{value}\"")?;
            }
        }
        Ok(())
    }
}

impl FromStr for Type {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Type::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Type {
        Type::parse(s).unwrap()
    }

    #[test]
    fn parses_parts_and_parameters() {
        let ty = t("Text/X.Moin.Wiki; Charset=\"utf-8\"");
        assert_eq!(ty.major(), Some("text"));
        assert_eq!(ty.subtype(), Some("x.moin.wiki"));
        assert_eq!(ty.parameter("charset"), Some("utf-8"));
    }

    #[test]
    fn wildcards_are_stored_as_none() {
        let ty = t("*/*");
        assert_eq!(ty, Type::any());
        assert_eq!(ty.to_string(), "*/*");
        assert_eq!(t("text").subtype(), None);
    }

    #[test]
    fn display_sorts_and_quotes_parameters() {
        let ty = t("x-moin/format;name=wiki;a=\"b c\"");
        assert_eq!(ty.to_string(), "x-moin/format;a=\"b c\";name=wiki");
    }

    #[test]
    fn supertype_relation() {
        assert!(t("text/*").is_supertype(&t("text/plain")));
        assert!(t("*/*").is_supertype(&t("text/plain;charset=utf-8")));
        assert!(t("text/plain").is_supertype(&t("text/plain;charset=utf-8")));
        assert!(!t("text/plain;charset=utf-8").is_supertype(&t("text/plain")));
        assert!(!t("text/html").is_supertype(&t("text/plain")));
        assert!(t("x-moin/format").is_supertype(&Type::moin_format("wiki")));
        assert!(Type::moin_format("wiki").is_supertype(&Type::moin_format("wiki")));
        assert!(!Type::moin_format("wiki").is_supertype(&Type::moin_format("csv")));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(Type::parse("").is_err());
        assert!(Type::parse("text/plain;charset").is_err());
    }
}
