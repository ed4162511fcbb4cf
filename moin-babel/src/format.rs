//! Converter traits and the per-call context
//!
//! Every dialect implements [`Format`]: parsing turns source text into a
//! document tree, serialization turns a tree back into text. Passes that rewrite
//! a finished tree (expanding nowiki blocks, smileys, macros) implement
//! [`Transform`]. Both are registered with the
//! [`ConverterRegistry`](crate::registry::ConverterRegistry), which selects one by
//! type pair.
//!
//! A [`ParseContext`] is built per call. It carries the registry (so sub-languages
//! can be dispatched recursively), the host configuration, the content type the
//! input arrived with, and the caller's options.

use crate::common::args::Arguments;
use crate::common::links::DEFAULT_URI_SCHEMES;
use crate::common::text::decode;
use crate::error::ConvertError;
use crate::ir::Element;
use crate::mime::Type;
use crate::registry::{priority, ConverterRegistry};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// Predicate deciding whether `Site` in `Site:Item` names a known wiki.
pub type InterwikiPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// What the embedding host tells the converters.
#[derive(Clone)]
pub struct HostConfig {
    interwiki: BTreeSet<String>,
    interwiki_predicate: Option<InterwikiPredicate>,
    allowed_schemes: Vec<String>,
    dialect_schemes: HashMap<String, Vec<String>>,
    /// Tag generated nodes with `html:data-lineno`
    pub add_lineno: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        HostConfig {
            interwiki: BTreeSet::new(),
            interwiki_predicate: None,
            allowed_schemes: DEFAULT_URI_SCHEMES.iter().map(|s| s.to_string()).collect(),
            dialect_schemes: HashMap::new(),
            add_lineno: false,
        }
    }
}

impl fmt::Debug for HostConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostConfig")
            .field("interwiki", &self.interwiki)
            .field("interwiki_predicate", &self.interwiki_predicate.is_some())
            .field("allowed_schemes", &self.allowed_schemes)
            .field("dialect_schemes", &self.dialect_schemes)
            .field("add_lineno", &self.add_lineno)
            .finish()
    }
}

impl HostConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Known interwiki site names.
    pub fn with_interwiki<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interwiki.extend(names.into_iter().map(Into::into));
        self
    }

    /// Ask the host instead of a fixed name list.
    pub fn with_interwiki_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.interwiki_predicate = Some(Arc::new(predicate));
        self
    }

    /// Replace the URL schemes every dialect accepts.
    pub fn with_allowed_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_schemes = schemes.into_iter().map(Into::into).collect();
        self
    }

    /// Scheme list for one dialect, overriding the shared one.
    pub fn with_dialect_schemes<I, S>(mut self, dialect: &str, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dialect_schemes.insert(
            dialect.to_string(),
            schemes.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn with_line_numbers(mut self, enabled: bool) -> Self {
        self.add_lineno = enabled;
        self
    }

    pub fn is_known_wiki(&self, site: &str) -> bool {
        if self.interwiki.contains(site) {
            return true;
        }
        self.interwiki_predicate
            .as_ref()
            .is_some_and(|predicate| predicate(site))
    }

    pub fn interwiki_names(&self) -> impl Iterator<Item = &str> {
        self.interwiki.iter().map(String::as_str)
    }

    /// Schemes accepted as URLs by `dialect`.
    pub fn schemes_for(&self, dialect: &str) -> &[String] {
        self.dialect_schemes
            .get(dialect)
            .unwrap_or(&self.allowed_schemes)
    }

    pub fn allows_scheme(&self, dialect: &str, scheme: &str) -> bool {
        self.schemes_for(dialect).iter().any(|s| s == scheme)
    }
}

/// Everything a converter may consult during one call.
#[derive(Debug, Clone)]
pub struct ParseContext<'a> {
    pub registry: &'a ConverterRegistry,
    pub host: &'a HostConfig,
    pub content_type: Type,
    pub arguments: Arguments,
}

impl<'a> ParseContext<'a> {
    pub fn new(registry: &'a ConverterRegistry, host: &'a HostConfig, content_type: Type) -> Self {
        ParseContext {
            registry,
            host,
            content_type,
            arguments: Arguments::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: Arguments) -> Self {
        self.arguments = arguments;
        self
    }

    /// Context for a recursive call into another converter.
    pub fn nested(&self, content_type: Type, arguments: Arguments) -> ParseContext<'a> {
        ParseContext {
            registry: self.registry,
            host: self.host,
            content_type,
            arguments,
        }
    }
}

/// A document dialect.
///
/// Implementors provide conversion between source text and the document tree.
/// Formats can support parsing, serialization, or both.
///
/// # Examples
///
/// ```ignore
/// struct Shout;
///
/// impl Format for Shout {
///     fn name(&self) -> &str {
///         "shout"
///     }
///
///     fn output_types(&self) -> Vec<Type> {
///         vec![Type::new(Some("text"), Some("x-shout"))]
///     }
///
///     fn supports_serialization(&self) -> bool {
///         true
///     }
///
///     fn serialize(&self, doc: &Element) -> Result<String, ConvertError> {
///         Ok(doc.text_content().to_uppercase())
///     }
/// }
/// ```
pub trait Format: Send + Sync {
    /// Short name used on the command line and in `#!name` directives
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// File extensions without the leading dot
    fn file_extensions(&self) -> &[&str] {
        &[]
    }

    /// Type patterns this format parses from
    fn input_types(&self) -> Vec<Type> {
        Vec::new()
    }

    /// Type patterns this format serializes to
    fn output_types(&self) -> Vec<Type> {
        Vec::new()
    }

    /// Registry priority of the entries created for this format
    fn priority(&self) -> i32 {
        priority::MIDDLE
    }

    fn supports_parsing(&self) -> bool {
        false
    }

    fn supports_serialization(&self) -> bool {
        false
    }

    /// Parse source text into a `page/body` tree.
    ///
    /// Default implementation returns a NotSupported error.
    fn parse(&self, _source: &str, _ctx: &ParseContext<'_>) -> Result<Element, ConvertError> {
        Err(ConvertError::NotSupported(format!(
            "Format '{}' does not support parsing",
            self.name()
        )))
    }

    /// Parse raw input. Text dialects decode it with the `charset` parameter
    /// of the context's type first; binary formats override this.
    fn parse_bytes(&self, data: &[u8], ctx: &ParseContext<'_>) -> Result<Element, ConvertError> {
        let text = decode(data, &ctx.content_type)?;
        self.parse(&text, ctx)
    }

    /// Serialize a tree into source text.
    ///
    /// Default implementation returns a NotSupported error.
    fn serialize(&self, _doc: &Element) -> Result<String, ConvertError> {
        Err(ConvertError::NotSupported(format!(
            "Format '{}' does not support serialization",
            self.name()
        )))
    }

    /// Serialize using extra parameters.
    ///
    /// The default delegates to [`Format::serialize`] and rejects any parameter.
    fn serialize_with_options(
        &self,
        doc: &Element,
        options: &HashMap<String, String>,
    ) -> Result<String, ConvertError> {
        if options.is_empty() {
            self.serialize(doc)
        } else {
            Err(ConvertError::NotSupported(format!(
                "Format '{}' does not support extra parameters",
                self.name()
            )))
        }
    }
}

/// A document to document pass.
pub trait Transform: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Whether the caller's options switch this pass on.
    fn accepts(&self, options: &Arguments) -> bool;

    fn priority(&self) -> i32 {
        priority::MIDDLE
    }

    fn transform(&self, doc: Element, ctx: &ParseContext<'_>) -> Result<Element, ConvertError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interwiki_names_and_predicate() {
        let host = HostConfig::new()
            .with_interwiki(["MoinMoin"])
            .with_interwiki_predicate(|site| site.starts_with("Wiki"));
        assert!(host.is_known_wiki("MoinMoin"));
        assert!(host.is_known_wiki("WikiPedia"));
        assert!(!host.is_known_wiki("Unknown"));
    }

    #[test]
    fn dialect_schemes_override_shared_list() {
        let host = HostConfig::new().with_dialect_schemes("creole", ["http"]);
        assert!(host.allows_scheme("moinwiki", "mailto"));
        assert!(!host.allows_scheme("creole", "mailto"));
        assert!(host.allows_scheme("creole", "http"));
    }

    #[test]
    fn default_format_methods_refuse() {
        struct Nothing;
        impl Format for Nothing {
            fn name(&self) -> &str {
                "nothing"
            }
        }
        let registry = ConverterRegistry::new();
        let host = HostConfig::default();
        let ctx = ParseContext::new(&registry, &host, Type::text_plain());
        assert!(matches!(
            Nothing.parse("", &ctx),
            Err(ConvertError::NotSupported(_))
        ));
        assert!(Nothing
            .serialize_with_options(&Element::empty_document(), &HashMap::from([("a".into(), "b".into())]))
            .is_err());
    }
}
