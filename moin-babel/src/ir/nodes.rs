//! Core data structures for the document tree.
//!
//! Every input converter produces a `page` element with a single `body` child;
//! every output converter walks such a tree. Text leaves are kept exactly as the
//! parser emitted them: two adjacent strings stay two nodes. Serializers that care
//! call [`Element::merged_text`] or [`Element::normalize_text`].

use super::names::{Namespace, QName};
use indexmap::IndexMap;
use serde::Serialize;

/// A child of an [`Element`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(elem) => Some(elem),
            Node::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(elem) => Some(elem),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(text) => Some(text),
            Node::Element(_) => None,
        }
    }
}

impl From<Element> for Node {
    fn from(elem: Element) -> Self {
        Node::Element(elem)
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

/// A namespace-qualified element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub name: QName,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<QName, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: QName) -> Self {
        Element {
            name,
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// An element of the page namespace.
    pub fn page(local: &str) -> Self {
        Element::new(QName::page(local))
    }

    /// The canonical empty document: `page/body`.
    pub fn empty_document() -> Self {
        Element::page("page").with_child(Element::page("body"))
    }

    /// Wrap a body element into a `page` root.
    pub fn document(body: Element) -> Self {
        Element::page("page").with_child(body)
    }

    /// `page/body/part/error`: a document that could not be converted at all.
    pub fn error_document(message: &str) -> Self {
        let error = Element::page("error").with_child(message);
        Element::document(Element::page("body").with_child(Element::page("part").with_child(error)))
    }

    pub fn with_attr(mut self, name: QName, value: impl Into<String>) -> Self {
        self.attributes.insert(name, value.into());
        self
    }

    /// Shorthand for an attribute in the page namespace.
    pub fn with_page_attr(self, local: &str, value: impl Into<String>) -> Self {
        self.with_attr(QName::page(local), value)
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_children<I, N>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn attr(&self, name: &QName) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn page_attr(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name.is_page(local))
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: QName, value: impl Into<String>) {
        self.attributes.insert(name, value.into());
    }

    pub fn set_page_attr(&mut self, local: &str, value: impl Into<String>) {
        self.set_attr(QName::page(local), value);
    }

    pub fn remove_attr(&mut self, name: &QName) -> Option<String> {
        self.attributes.shift_remove(name)
    }

    pub fn push(&mut self, child: impl Into<Node>) {
        self.children.push(child.into());
    }

    /// Append a text child unless it is empty.
    pub fn push_text(&mut self, text: &str) {
        if !text.is_empty() {
            self.children.push(Node::Text(text.to_string()));
        }
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn local_name(&self) -> &str {
        &self.name.local
    }

    /// The local name when the element is in the page namespace.
    pub fn page_name(&self) -> Option<&str> {
        match self.name.ns {
            Namespace::Page => Some(&self.name.local),
            _ => None,
        }
    }

    pub fn is_page(&self, local: &str) -> bool {
        self.name.is_page(local)
    }

    /// Child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(Node::as_element_mut)
    }

    /// First child element in the page namespace with the given name.
    pub fn find(&self, local: &str) -> Option<&Element> {
        self.elements().find(|elem| elem.is_page(local))
    }

    pub fn find_mut(&mut self, local: &str) -> Option<&mut Element> {
        self.elements_mut().find(|elem| elem.is_page(local))
    }

    /// All text below this element, in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(elem) => elem.collect_text(out),
            }
        }
    }

    /// Children with adjacent text leaves joined, leaving `self` untouched.
    pub fn merged_text(&self) -> Vec<Node> {
        let mut merged: Vec<Node> = Vec::with_capacity(self.children.len());
        for child in &self.children {
            match (merged.last_mut(), child) {
                (Some(Node::Text(prev)), Node::Text(text)) => prev.push_str(text),
                _ => merged.push(child.clone()),
            }
        }
        merged
    }

    /// Recursively join adjacent text leaves and drop empty ones.
    pub fn normalize_text(&mut self) {
        let children = std::mem::take(&mut self.children);
        for child in children {
            match child {
                Node::Text(text) if text.is_empty() => {}
                Node::Text(text) => match self.children.last_mut() {
                    Some(Node::Text(prev)) => prev.push_str(&text),
                    _ => self.children.push(Node::Text(text)),
                },
                Node::Element(mut elem) => {
                    elem.normalize_text();
                    self.children.push(Node::Element(elem));
                }
            }
        }
    }

    /// Depth-first visit of this element and every descendant element.
    pub fn walk<F: FnMut(&Element)>(&self, f: &mut F) {
        f(self);
        for child in self.elements() {
            child.walk(f);
        }
    }

    /// Depth-first mutable visit, parents before children.
    pub fn walk_mut<F: FnMut(&mut Element)>(&mut self, f: &mut F) {
        f(self);
        for child in self.elements_mut() {
            child.walk_mut(f);
        }
    }
}
