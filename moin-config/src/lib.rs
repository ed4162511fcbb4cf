//! Shared configuration loader for moinconv and other moin-babel applications.
//!
//! `defaults/moin.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`MoinConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use moin_babel::HostConfig;
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/moin.default.toml");

/// Name of the optional per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = "moin.toml";

/// Top-level configuration consumed by moin-babel applications.
#[derive(Debug, Clone, Deserialize)]
pub struct MoinConfig {
    pub host: HostSection,
    pub convert: ConvertSection,
    pub formats: FormatsSection,
}

/// What the library asks of its host: wiki names, link schemes, line tags.
#[derive(Debug, Clone, Deserialize)]
pub struct HostSection {
    pub interwiki: Vec<String>,
    pub allowed_schemes: Vec<String>,
    pub add_lineno: bool,
}

impl From<&HostSection> for HostConfig {
    fn from(section: &HostSection) -> Self {
        HostConfig::new()
            .with_interwiki(section.interwiki.iter().cloned())
            .with_allowed_schemes(section.allowed_schemes.iter().cloned())
            .with_line_numbers(section.add_lineno)
    }
}

impl From<HostSection> for HostConfig {
    fn from(section: HostSection) -> Self {
        HostConfig::new()
            .with_interwiki(section.interwiki)
            .with_allowed_schemes(section.allowed_schemes)
            .with_line_numbers(section.add_lineno)
    }
}

/// Conversion defaults applied when the command line says nothing.
#[derive(Debug, Clone, Deserialize)]
pub struct ConvertSection {
    pub default_output: String,
    pub expand_nowiki: bool,
    pub smileys: bool,
}

/// Per-format knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct FormatsSection {
    pub csv: CsvConfig,
    pub markdown: MarkdownConfig,
    pub html: HtmlConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CsvConfig {
    pub delimiter: String,
}

impl CsvConfig {
    /// The configured delimiter, `None` when it should be sniffed.
    pub fn delimiter(&self) -> Option<char> {
        let mut chars = self.delimiter.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkdownConfig {
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HtmlConfig {
    pub standalone: bool,
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer `moin.toml` from the working directory when there is one.
    pub fn with_local_file(self) -> Self {
        self.with_optional_file(LOCAL_CONFIG_FILE)
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<MoinConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<MoinConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config.convert.default_output, "html");
        assert!(config.convert.expand_nowiki);
        assert!(!config.convert.smileys);
        assert!(!config.host.add_lineno);
        assert_eq!(config.formats.csv.delimiter(), None);
        assert!(!config.formats.html.standalone);
        assert!(config.formats.markdown.extensions.iter().any(|e| e == "table"));
    }

    #[test]
    fn default_schemes_match_the_library() {
        let config = load_defaults().expect("defaults to deserialize");
        let mut configured = config.host.allowed_schemes.clone();
        configured.sort();
        let mut builtin: Vec<String> = moin_babel::common::links::DEFAULT_URI_SCHEMES
            .iter()
            .map(|s| s.to_string())
            .collect();
        builtin.sort();
        assert_eq!(configured, builtin);
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("convert.default_output", "markdown")
            .expect("override to apply")
            .set_override("formats.csv.delimiter", ",")
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.convert.default_output, "markdown");
        assert_eq!(config.formats.csv.delimiter(), Some(','));
    }

    #[test]
    fn user_file_layers_over_defaults() {
        let dir = std::env::temp_dir().join(format!("moin-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("user.toml");
        let mut file = std::fs::File::create(&path).expect("config file");
        writeln!(file, "[host]\ninterwiki = [\"Local\"]\nadd_lineno = true").expect("write");

        let config = Loader::new().with_file(&path).build().expect("config to build");
        assert_eq!(config.host.interwiki, vec!["Local".to_string()]);
        assert!(config.host.add_lineno);
        assert_eq!(config.convert.default_output, "html");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_required_file_is_an_error() {
        assert!(Loader::new().with_file("/nonexistent/moin.toml").build().is_err());
        assert!(Loader::new().with_optional_file("/nonexistent/moin.toml").build().is_ok());
    }

    #[test]
    fn host_section_converts_to_host_config() {
        let config = load_defaults().expect("defaults to deserialize");
        let host: HostConfig = (&config.host).into();
        assert!(host.is_known_wiki("WikiPedia"));
        assert!(!host.is_known_wiki("Nowhere"));
        assert!(host.allows_scheme("moinwiki", "https"));
        assert!(!host.add_lineno);
    }
}
