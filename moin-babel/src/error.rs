//! Error types for conversion operations
//!
//! Only failures that abort a whole conversion are reported through [`ConvertError`].
//! Locally recoverable problems (an unknown macro, a malformed table cell, an invalid
//! nowiki directive) never surface here: the dialect parsers turn them into visible
//! error nodes inside the document tree and keep going.

use thiserror::Error;

/// Errors that can occur while looking up, running or chaining converters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvertError {
    /// No registry entry accepted the requested type pair
    #[error("no converter found for '{input}' -> '{output}'")]
    ConverterNotFound { input: String, output: String },

    /// A format name that is not known to the registry
    #[error("format '{0}' not found")]
    FormatNotFound(String),

    /// Error during parsing
    #[error("parse error: {0}")]
    Parse(String),

    /// Error during serialization
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Input bytes could not be decoded with the declared charset
    #[error("cannot decode input: {0}")]
    Decode(String),

    /// Malformed option or argument value handed to a converter
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Non well-formed XML where a tree was expected
    #[error("xml error: {0}")]
    Xml(String),

    /// The converter does not support the requested direction
    #[error("operation not supported: {0}")]
    NotSupported(String),
}

impl From<roxmltree::Error> for ConvertError {
    fn from(err: roxmltree::Error) -> Self {
        ConvertError::Xml(err.to_string())
    }
}
