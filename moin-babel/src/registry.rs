//! Converter registry and type dispatch
//!
//! The registry is an ordered table of entries. Each entry holds an input type
//! pattern, an output type pattern, a priority and a factory. Looking up a
//! converter for a concrete type pair walks the table front to back and asks every
//! matching factory in turn; the first one that returns a converter wins. A
//! factory may decline by returning `None` (for instance when an option it needs
//! is absent), and the lookup falls through to the next entry.
//!
//! The table is kept sorted on insertion: an entry with a more specific output
//! pattern comes before a more general one, then a more specific input pattern,
//! then a lower priority value. Ties keep registration order.
//!
//! There is no global registry. [`ConverterRegistry::with_defaults`] builds the
//! standard set of dialects and passes once at start-up; the caller owns it and
//! hands it to whatever needs to convert.

use crate::common::args::Arguments;
use crate::error::ConvertError;
use crate::format::{Format, HostConfig, ParseContext, Transform};
use crate::ir::Element;
use crate::mime::Type;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Priority values; lower runs first among otherwise equal entries.
pub mod priority {
    pub const REALLY_FIRST: i32 = -20;
    pub const FIRST: i32 = -10;
    pub const MIDDLE: i32 = 0;
    pub const LAST: i32 = 10;
    pub const REALLY_LAST: i32 = 20;
}

/// What a factory hands out.
#[derive(Clone)]
pub enum Converter {
    /// Source text to document
    Parser(Arc<dyn Format>),
    /// Document to text
    Serializer(Arc<dyn Format>),
    /// Document to document
    Transform(Arc<dyn Transform>),
}

impl Converter {
    pub fn name(&self) -> &str {
        match self {
            Converter::Parser(format) | Converter::Serializer(format) => format.name(),
            Converter::Transform(transform) => transform.name(),
        }
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Converter::Parser(format) => write!(f, "Parser({})", format.name()),
            Converter::Serializer(format) => write!(f, "Serializer({})", format.name()),
            Converter::Transform(transform) => write!(f, "Transform({})", transform.name()),
        }
    }
}

/// Builds a converter for a concrete `(input, output, options)` request, or
/// declines.
pub type Factory = Arc<dyn Fn(&Type, &Type, &Arguments) -> Option<Converter> + Send + Sync>;

/// Handle returned by registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryToken(u64);

#[derive(Clone)]
struct RegistryEntry {
    token: EntryToken,
    factory: Factory,
    input: Type,
    output: Type,
    priority: i32,
}

impl RegistryEntry {
    /// Whether `self` sorts before `other`.
    fn precedes(&self, other: &RegistryEntry) -> bool {
        if self.output != other.output {
            return other.output.is_supertype(&self.output);
        }
        if self.input != other.input {
            return other.input.is_supertype(&self.input);
        }
        self.priority < other.priority
    }

    fn matches(&self, input: &Type, output: &Type) -> bool {
        self.input.is_supertype(input) && self.output.is_supertype(output)
    }
}

/// Registry of converters and the formats behind them.
///
/// # Examples
///
/// ```ignore
/// let registry = ConverterRegistry::with_defaults();
/// let host = HostConfig::default();
/// let doc = registry.parse_source("'''bold'''", &Type::moin_wiki(), &host, &Arguments::new())?;
/// let html = registry.serialize(&doc, &Type::parse("text/html")?, &HashMap::new())?;
/// ```
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    entries: Vec<RegistryEntry>,
    formats: Vec<Arc<dyn Format>>,
    transforms: Vec<Arc<dyn Transform>>,
    owned: HashMap<String, Vec<EntryToken>>,
    next_token: u64,
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("entries", &self.entries.len())
            .field("formats", &self.list_formats())
            .finish()
    }
}

impl ConverterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        ConverterRegistry::default()
    }

    /// Add a factory for a type pair at the position its specificity and
    /// priority call for.
    pub fn register_factory(
        &mut self,
        factory: Factory,
        input: Type,
        output: Type,
        priority: i32,
    ) -> EntryToken {
        let token = EntryToken(self.next_token);
        self.next_token += 1;
        let entry = RegistryEntry {
            token,
            factory,
            input,
            output,
            priority,
        };
        let position = self
            .entries
            .iter()
            .position(|existing| entry.precedes(existing))
            .unwrap_or(self.entries.len());
        tracing::trace!(
            input = %entry.input,
            output = %entry.output,
            priority,
            position,
            "registering converter"
        );
        self.entries.insert(position, entry);
        token
    }

    /// Remove one entry. Returns false when the token is unknown.
    pub fn unregister(&mut self, token: EntryToken) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.token != token);
        before != self.entries.len()
    }

    /// Register a format under its name and create entries for every type it
    /// parses from or serializes to.
    ///
    /// A format registered again under the same name replaces the older one.
    pub fn register<F: Format + 'static>(&mut self, format: F) -> Vec<EntryToken> {
        self.register_arc(Arc::new(format))
    }

    pub fn register_arc(&mut self, format: Arc<dyn Format>) -> Vec<EntryToken> {
        self.formats.retain(|existing| existing.name() != format.name());
        self.formats.push(format.clone());
        for token in self.owned.remove(format.name()).unwrap_or_default() {
            self.unregister(token);
        }
        let mut tokens = Vec::new();
        if format.supports_parsing() {
            for input in format.input_types() {
                let parser = format.clone();
                tokens.push(self.register_factory(
                    Arc::new(move |_: &Type, _: &Type, _: &Arguments| {
                        Some(Converter::Parser(parser.clone()))
                    }),
                    input,
                    Type::moin_document(),
                    format.priority(),
                ));
            }
        }
        if format.supports_serialization() {
            for output in format.output_types() {
                let serializer = format.clone();
                tokens.push(self.register_factory(
                    Arc::new(move |_: &Type, _: &Type, _: &Arguments| {
                        Some(Converter::Serializer(serializer.clone()))
                    }),
                    Type::moin_document(),
                    output,
                    format.priority(),
                ));
            }
        }
        self.owned.insert(format.name().to_string(), tokens.clone());
        tokens
    }

    /// Register a document pass; it only answers when its options are present.
    pub fn register_transform<T: Transform + 'static>(&mut self, transform: T) -> EntryToken {
        let transform: Arc<dyn Transform> = Arc::new(transform);
        self.transforms.retain(|existing| existing.name() != transform.name());
        self.transforms.push(transform.clone());
        let priority = transform.priority();
        self.register_factory(
            Arc::new(move |_: &Type, _: &Type, options: &Arguments| {
                transform
                    .accepts(options)
                    .then(|| Converter::Transform(transform.clone()))
            }),
            Type::moin_document(),
            Type::moin_document(),
            priority,
        )
    }

    /// First converter a matching factory agrees to build.
    #[tracing::instrument(level = "debug", skip(self, input, output, options), fields(input = %input, output = %output))]
    pub fn get(&self, input: &Type, output: &Type, options: &Arguments) -> Option<Converter> {
        for entry in &self.entries {
            if !entry.matches(input, output) {
                continue;
            }
            if let Some(converter) = (entry.factory)(input, output, options) {
                tracing::debug!(converter = converter.name(), "converter selected");
                return Some(converter);
            }
        }
        tracing::debug!("no converter found");
        None
    }

    /// Every converter matching factories agree to build, in table order.
    pub fn get_all(&self, input: &Type, output: &Type, options: &Arguments) -> Vec<Converter> {
        self.entries
            .iter()
            .filter(|entry| entry.matches(input, output))
            .filter_map(|entry| (entry.factory)(input, output, options))
            .collect()
    }

    /// Get a format by name
    pub fn format(&self, name: &str) -> Result<&dyn Format, ConvertError> {
        self.formats
            .iter()
            .find(|format| format.name() == name)
            .map(|format| format.as_ref())
            .ok_or_else(|| ConvertError::FormatNotFound(name.to_string()))
    }

    /// Check if a format exists
    pub fn has(&self, name: &str) -> bool {
        self.formats.iter().any(|format| format.name() == name)
    }

    /// All format names, sorted
    pub fn list_formats(&self) -> Vec<String> {
        let mut names: Vec<String> = self.formats.iter().map(|f| f.name().to_string()).collect();
        names.sort();
        names
    }

    /// Formats in registration order
    pub fn formats(&self) -> impl Iterator<Item = &dyn Format> {
        self.formats.iter().map(|format| format.as_ref())
    }

    pub fn transforms(&self) -> impl Iterator<Item = &dyn Transform> {
        self.transforms.iter().map(|transform| transform.as_ref())
    }

    /// Format name for a file, from its extension.
    pub fn detect_format_from_filename(&self, filename: &str) -> Option<String> {
        let extension = std::path::Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())?;

        self.formats
            .iter()
            .find(|format| format.file_extensions().contains(&extension))
            .map(|format| format.name().to_string())
    }

    /// Turn a format name or a type string into the type to convert from.
    pub fn input_type(&self, name_or_type: &str) -> Result<Type, ConvertError> {
        if name_or_type.contains('/') {
            return Type::parse(name_or_type);
        }
        self.format(name_or_type)?
            .input_types()
            .into_iter()
            .next()
            .ok_or_else(|| {
                ConvertError::NotSupported(format!(
                    "Format '{name_or_type}' does not support parsing"
                ))
            })
    }

    /// Turn a format name or a type string into the type to convert to.
    pub fn output_type(&self, name_or_type: &str) -> Result<Type, ConvertError> {
        if name_or_type.contains('/') {
            return Type::parse(name_or_type);
        }
        self.format(name_or_type)?
            .output_types()
            .into_iter()
            .next()
            .ok_or_else(|| {
                ConvertError::NotSupported(format!(
                    "Format '{name_or_type}' does not support serialization"
                ))
            })
    }

    /// Parse text of the given type, then run every pass the options enable.
    #[tracing::instrument(level = "debug", skip(self, source, content_type, host, options), fields(content_type = %content_type))]
    pub fn parse_source(
        &self,
        source: &str,
        content_type: &Type,
        host: &HostConfig,
        options: &Arguments,
    ) -> Result<Element, ConvertError> {
        let parser = self.parser_for(content_type, options)?;
        let ctx = ParseContext::new(self, host, content_type.clone()).with_arguments(options.clone());
        let doc = parser.parse(source, &ctx)?;
        self.apply_transforms(doc, &ctx)
    }

    /// Parse raw input. Text dialects decode it with the type's `charset`
    /// parameter; archives read the bytes as they are.
    pub fn parse_bytes(
        &self,
        data: &[u8],
        content_type: &Type,
        host: &HostConfig,
        options: &Arguments,
    ) -> Result<Element, ConvertError> {
        let parser = self.parser_for(content_type, options)?;
        let ctx = ParseContext::new(self, host, content_type.clone()).with_arguments(options.clone());
        let doc = parser.parse_bytes(data, &ctx)?;
        self.apply_transforms(doc, &ctx)
    }

    fn parser_for(&self, content_type: &Type, options: &Arguments) -> Result<Arc<dyn Format>, ConvertError> {
        let document = Type::moin_document();
        match self.get(content_type, &document, options) {
            Some(Converter::Parser(parser)) => Ok(parser),
            _ => Err(ConvertError::ConverterNotFound {
                input: content_type.to_string(),
                output: document.to_string(),
            }),
        }
    }

    /// Run every document pass the context's options switch on, in table order.
    pub fn apply_transforms(
        &self,
        mut doc: Element,
        ctx: &ParseContext<'_>,
    ) -> Result<Element, ConvertError> {
        let document = Type::moin_document();
        for converter in self.get_all(&document, &document, &ctx.arguments) {
            if let Converter::Transform(transform) = converter {
                tracing::debug!(transform = transform.name(), "applying transform");
                doc = transform.transform(doc, ctx)?;
            }
        }
        Ok(doc)
    }

    /// Serialize a tree into the given output type.
    #[tracing::instrument(level = "debug", skip(self, doc, output, options), fields(output = %output))]
    pub fn serialize(
        &self,
        doc: &Element,
        output: &Type,
        options: &HashMap<String, String>,
    ) -> Result<String, ConvertError> {
        let document = Type::moin_document();
        match self.get(&document, output, &Arguments::new()) {
            Some(Converter::Serializer(serializer)) => {
                serializer.serialize_with_options(doc, options)
            }
            _ => Err(ConvertError::ConverterNotFound {
                input: document.to_string(),
                output: output.to_string(),
            }),
        }
    }

    /// Attach a host that expands macro references under `macros=expandall`.
    pub fn set_macro_host(&mut self, host: impl crate::transforms::MacroHost + 'static) -> EntryToken {
        self.register_transform(crate::transforms::MacroExpansion::new(host))
    }

    /// Create a registry with every built-in dialect and pass
    pub fn with_defaults() -> Self {
        use crate::formats;
        use crate::transforms;

        let mut registry = Self::new();

        registry.register(formats::moinwiki::MoinWikiFormat::default());
        registry.register(formats::moinwiki19::MoinWiki19Format::default());
        registry.register(formats::creole::CreoleFormat::default());
        registry.register(formats::mediawiki::MediaWikiFormat::default());
        registry.register(formats::markdown::MarkdownFormat::default());
        registry.register(formats::rst::RstFormat::default());
        registry.register(formats::docbook::DocBookFormat::default());
        registry.register(formats::html::HtmlFormat::default());
        registry.register(formats::csv::CsvFormat::default());
        registry.register(formats::archive::ArchiveFormat::zip());
        registry.register(formats::archive::ArchiveFormat::tar());
        registry.register(formats::highlight::HighlightFormat::default());
        registry.register(formats::text::TextFormat);
        registry.register(formats::dom::DomFormat);
        registry.register(formats::fallback::FallbackFormat);

        registry.register_transform(transforms::NowikiExpansion);
        registry.register_transform(transforms::SmileyTransform);

        registry
    }
}
