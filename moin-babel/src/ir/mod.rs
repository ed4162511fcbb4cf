//! The canonical document tree every dialect converts to and from.
//!
//! Elements are namespace-qualified, carry an ordered attribute map and an ordered
//! list of children that are either elements or text. The vocabulary is the
//! MoinMoin page namespace (`page`, `body`, `p`, `h`, `list`, `table`, `a`, ...)
//! plus a few borrowed attributes from xlink, xinclude and html.

pub mod names;
pub mod nodes;
pub mod xml;

pub use names::{Namespace, QName};
pub use nodes::{Element, Node};
