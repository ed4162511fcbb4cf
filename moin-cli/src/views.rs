//! Views of the document tree for the inspect command
//!
//! Every input dialect is read into the same `page/body` tree; inspect shows
//! that tree instead of converting it:
//!
//! - `xml`: indented XML with namespace declarations (default)
//! - `compact`: the same XML on one line, no declarations
//! - `json`: the tree as serde serializes it
//! - `outline`: one line per element, indented by depth, with its attributes
//!
//! Example: `moinconv inspect page.moin outline`

use moin_babel::ir::xml::{self, XmlOptions};
use moin_babel::{Element, Node};

/// All views the inspect command can print
pub const AVAILABLE_VIEWS: &[&str] = &["xml", "compact", "json", "outline"];

/// Render `doc` in the named view.
pub fn render_view(doc: &Element, view: &str) -> Result<String, String> {
    match view {
        "xml" => Ok(xml::to_pretty(doc)),
        "compact" => {
            let options = XmlOptions {
                declare_namespaces: false,
                pretty: false,
            };
            let mut out = xml::write(doc, options);
            out.push('\n');
            Ok(out)
        }
        "json" => serde_json::to_string_pretty(doc)
            .map(|mut json| {
                json.push('\n');
                json
            })
            .map_err(|e| format!("JSON serialization failed: {e}")),
        "outline" => {
            let mut out = String::new();
            outline(doc, 0, &mut out);
            Ok(out)
        }
        other => Err(format!(
            "Unknown view '{other}'. Available views: {}",
            AVAILABLE_VIEWS.join(", ")
        )),
    }
}

fn outline(elem: &Element, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(elem.local_name());
    for (name, value) in &elem.attributes {
        out.push_str(&format!(" {}={value:?}", name.local));
    }
    out.push('\n');
    for child in &elem.children {
        match child {
            Node::Element(child) => outline(child, depth + 1, out),
            Node::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    out.push_str(&"  ".repeat(depth + 1));
                    out.push_str(&format!("{text:?}\n"));
                }
            }
        }
    }
}
