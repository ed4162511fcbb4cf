//! Document conversion between MoinMoin markup and other dialects
//!
//!     This crate converts wiki markup (MoinMoin 2 and 1.9, Creole, MediaWiki), Markdown,
//!     reStructuredText, DocBook, HTML, CSV and source code into one document tree, and
//!     serializes that tree back into several of them.
//!
//!     TLDR: For format authors:
//!         - Every input converter produces a `page/body` tree (./ir), never a dialect AST.
//!         - Block grammars run on the shared LineCursor and BuildStack (./common), inline
//!           grammars are a regex alternation scanned left to right.
//!         - Anything recoverable (a bad table cell, an unknown sub-language) becomes a
//!           visible node in the tree; only whole-conversion failures are errors.
//!         - Each format has unit tests beside the code and a module under tests/.
//!
//! Architecture
//!
//!     The tree is the hub. Dialect modules only translate between their syntax and the
//!     tree; everything that more than one dialect needs lives in ./common: argument
//!     lists, link classification, macro references, the table builder and the nowiki
//!     sub-dispatcher that hands fenced sections to other dialects.
//!
//!     This is a pure lib: it powers the moinconv cli but supposes no shell, reads no
//!     environment and does no I/O. Configuration reaches it as a HostConfig value.
//!
//!     The file structure :
//!     .
//!     ├── error.rs
//!     ├── mime.rs                 # Type values and their matching
//!     ├── format.rs               # Format and Transform traits, ParseContext, HostConfig
//!     ├── registry.rs             # ConverterRegistry: type dispatch
//!     ├── transforms.rs           # document to document passes
//!     ├── formats
//!     │   ├── <format>
//!     │   │   ├── parser.rs       # text → tree
//!     │   │   ├── serializer.rs   # tree → text
//!     │   │   └── mod.rs
//!     ├── ir                      # the document tree and its XML view
//!     └── common                  # shared grammar and tree building code
//!
//! Testing
//!     tests
//!     ├── lib.rs                  # declares one module per format
//!     ├── common/mod.rs           # shared helpers
//!     └── <format>/mod.rs
//!
//! Type Dispatch
//!
//!     Converters are found by type, not by name. The registry is an ordered table of
//!     (input pattern, output pattern, priority, factory) entries; a lookup asks matching
//!     factories in order and the first one that agrees wins. A factory may decline for
//!     the options at hand, which is how the optional passes (nowiki expansion, smileys,
//!     macro expansion) share the document → document slot.
//!
//!     There is no global registry: build one with [`ConverterRegistry::with_defaults`]
//!     and pass it around.
//!
//! # Example
//!
//! ```ignore
//! use moin_babel::{Arguments, ConverterRegistry, HostConfig, Type};
//! use std::collections::HashMap;
//!
//! let registry = ConverterRegistry::with_defaults();
//! let host = HostConfig::default();
//! let doc = registry.parse_source("== Title ==\n'''bold'''", &Type::moin_wiki(), &host, &Arguments::new())?;
//! let html = registry.serialize(&doc, &registry.output_type("html")?, &HashMap::new())?;
//! ```

pub mod common;
pub mod error;
pub mod format;
pub mod formats;
pub mod ir;
pub mod mime;
pub mod registry;
pub mod transforms;

pub use common::args::Arguments;
pub use error::ConvertError;
pub use format::{Format, HostConfig, ParseContext, Transform};
pub use ir::{Element, Namespace, Node, QName};
pub use mime::Type;
pub use registry::{Converter, ConverterRegistry};
pub use transforms::{MacroCall, MacroError, MacroHost};

/// Parse `source` of the named format (or type) with the default registry.
pub fn parse(source: &str, from: &str, host: &HostConfig) -> Result<Element, ConvertError> {
    let registry = ConverterRegistry::with_defaults();
    let content_type = registry.input_type(from)?;
    registry.parse_source(source, &content_type, host, &Arguments::new())
}

/// Convert `source` between two named formats (or types) with the default registry.
pub fn convert(source: &str, from: &str, to: &str) -> Result<String, ConvertError> {
    let registry = ConverterRegistry::with_defaults();
    let host = HostConfig::default();
    let content_type = registry.input_type(from)?;
    let doc = registry.parse_source(source, &content_type, &host, &Arguments::new())?;
    let output = registry.output_type(to)?;
    registry.serialize(&doc, &output, &std::collections::HashMap::new())
}
