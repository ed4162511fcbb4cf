//! Format implementations
//!
//! One module per dialect. Each converts between its text representation and
//! the document tree, through a `parser.rs` and/or `serializer.rs` when the
//! dialect is big enough to need them.

pub mod archive;
pub mod creole;
pub mod csv;
pub mod docbook;
pub mod dom;
pub mod fallback;
pub mod highlight;
pub mod html;
pub mod markdown;
pub mod mediawiki;
pub mod moinwiki;
pub mod moinwiki19;
pub mod rst;
pub mod text;

pub use archive::ArchiveFormat;
pub use creole::CreoleFormat;
pub use csv::CsvFormat;
pub use docbook::DocBookFormat;
pub use dom::DomFormat;
pub use fallback::FallbackFormat;
pub use highlight::HighlightFormat;
pub use html::{HtmlFormat, HtmlOptions};
pub use markdown::MarkdownFormat;
pub use mediawiki::MediaWikiFormat;
pub use moinwiki::MoinWikiFormat;
pub use moinwiki19::MoinWiki19Format;
pub use rst::RstFormat;
pub use text::TextFormat;
