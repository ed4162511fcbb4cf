//! Building blocks shared by the dialects.
//!
//! Argument lists, the line cursor and build stack every block grammar runs on,
//! the table builder, link target classification, macro resolution and the
//! nowiki sub-dispatcher.

pub mod args;
pub mod cursor;
pub mod links;
pub mod macros;
pub mod nowiki;
pub mod stack;
pub mod table;
pub mod text;
