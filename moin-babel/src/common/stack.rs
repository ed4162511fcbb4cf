//! Stack of open elements used while building a tree
//!
//! Parsers push an element when a construct opens and pop it when the construct
//! ends; a popped element is appended to the element below it. The bottom frame is
//! the root and is never popped.
//!
//! A scope (see [`BuildStack::begin_scope`]) temporarily makes the current top
//! act as the root: [`BuildStack::clear`] then stops at it. List item bodies use
//! this to parse their content as if it were a small document of its own.

use crate::ir::{Element, Node, QName};

/// Bookkeeping attached to an open element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameInfo {
    /// Nesting level (indent width, list depth, heading level)
    pub level: usize,
    /// Dialect-defined kind, e.g. the list marker type
    pub kind: Option<String>,
}

#[derive(Debug)]
struct Frame {
    element: Element,
    info: FrameInfo,
}

/// The stack of currently open elements.
#[derive(Debug)]
pub struct BuildStack {
    frames: Vec<Frame>,
    floor: usize,
    line_numbers: bool,
    lineno: usize,
    last_lineno: usize,
}

impl BuildStack {
    pub fn new(root: Element) -> Self {
        BuildStack {
            frames: vec![Frame {
                element: root,
                info: FrameInfo::default(),
            }],
            floor: 0,
            line_numbers: false,
            lineno: 0,
            last_lineno: 0,
        }
    }

    /// Tag pushed and appended elements with `html:data-lineno` whenever the
    /// current line number changes.
    pub fn with_line_numbers(mut self, enabled: bool) -> Self {
        self.line_numbers = enabled;
        self
    }

    /// Current input line, used for line number tagging.
    pub fn set_lineno(&mut self, lineno: usize) {
        self.lineno = lineno;
    }

    fn tag_lineno(&mut self, elem: &mut Element) {
        if self.line_numbers && self.lineno != self.last_lineno {
            elem.set_attr(QName::html(crate::ir::names::attr::LINENO), self.lineno.to_string());
            self.last_lineno = self.lineno;
        }
    }

    /// Number of frames in the current scope, its root included.
    pub fn len(&self) -> usize {
        self.frames.len() - self.floor
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn push(&mut self, elem: Element) {
        self.push_with(elem, FrameInfo::default());
    }

    pub fn push_with(&mut self, mut elem: Element, info: FrameInfo) {
        self.tag_lineno(&mut elem);
        self.frames.push(Frame { element: elem, info });
    }

    /// Close the top element, appending it to the one below. The scope root
    /// stays.
    pub fn pop(&mut self) {
        if self.len() <= 1 {
            return;
        }
        if let Some(frame) = self.frames.pop() {
            if let Some(parent) = self.frames.last_mut() {
                parent.element.push(frame.element);
            }
        }
    }

    /// Pop until the top is one of `names` (or only root and one child remain),
    /// then pop that one too.
    pub fn pop_name(&mut self, names: &[&str]) {
        while self.len() > 2 && !self.top_check(names) {
            self.pop();
        }
        self.pop();
    }

    /// Pop everything down to the scope root.
    pub fn clear(&mut self) {
        while self.len() > 1 {
            self.pop();
        }
    }

    pub fn top(&self) -> &Element {
        &self.top_frame().element
    }

    pub fn top_mut(&mut self) -> &mut Element {
        &mut self.top_frame_mut().element
    }

    pub fn top_info(&self) -> &FrameInfo {
        &self.top_frame().info
    }

    fn top_frame(&self) -> &Frame {
        // the root frame is never removed
        &self.frames[self.frames.len() - 1]
    }

    fn top_frame_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Page-namespace local name of the top element.
    pub fn top_name(&self) -> Option<&str> {
        self.top().page_name()
    }

    /// True when the top element is a page element named one of `names`.
    pub fn top_check(&self, names: &[&str]) -> bool {
        self.top_name().is_some_and(|name| names.contains(&name))
    }

    /// Like [`top_check`](Self::top_check), also requiring the given page
    /// attribute values.
    pub fn top_check_attrs(&self, names: &[&str], attrs: &[(&str, &str)]) -> bool {
        self.top_check(names)
            && attrs
                .iter()
                .all(|(key, value)| self.top().page_attr(key) == Some(*value))
    }

    pub fn top_append(&mut self, node: impl Into<Node>) {
        let mut node = node.into();
        if let Node::Element(elem) = &mut node {
            self.tag_lineno(elem);
        }
        self.top_mut().push(node);
    }

    /// Append text unless it is empty.
    pub fn top_append_text(&mut self, text: &str) {
        if !text.is_empty() {
            self.top_mut().push(text);
        }
    }

    /// Append the node when there is one.
    pub fn top_append_opt(&mut self, node: Option<impl Into<Node>>) {
        if let Some(node) = node {
            self.top_append(node);
        }
    }

    /// Nearest open element with the given page name, searching down from the
    /// top.
    pub fn find_mut(&mut self, local: &str) -> Option<&mut Element> {
        self.frames
            .iter_mut()
            .rev()
            .map(|frame| &mut frame.element)
            .find(|elem| elem.is_page(local))
    }

    /// Frames from the top down to the scope root, for unwinding decisions.
    pub fn frames(&self) -> impl Iterator<Item = (&Element, &FrameInfo)> {
        self.frames[self.floor..]
            .iter()
            .rev()
            .map(|frame| (&frame.element, &frame.info))
    }

    /// Make the current top the root of a nested scope. Returns the token to pass
    /// to [`end_scope`](Self::end_scope).
    pub fn begin_scope(&mut self) -> usize {
        let previous = self.floor;
        self.floor = self.frames.len() - 1;
        previous
    }

    /// Close everything opened inside the scope and return to the outer one. The
    /// scope root itself stays open in the outer scope.
    pub fn end_scope(&mut self, previous: usize) {
        self.clear();
        self.floor = previous.min(self.floor);
    }

    /// Close every frame and return the root element.
    pub fn into_root(mut self) -> Element {
        self.floor = 0;
        self.clear();
        match self.frames.pop() {
            Some(frame) => frame.element,
            None => Element::empty_document(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::xml::to_fragment;

    fn body_stack() -> BuildStack {
        BuildStack::new(Element::page("body"))
    }

    #[test]
    fn pop_attaches_to_parent() {
        let mut stack = body_stack();
        stack.push(Element::page("p"));
        stack.top_append("text");
        stack.push(Element::page("strong"));
        stack.top_append("bold");
        stack.pop();
        stack.pop();
        assert_eq!(
            to_fragment(&stack.into_root()),
            "<body><p>text<strong>bold</strong></p></body>"
        );
    }

    #[test]
    fn root_is_never_popped() {
        let mut stack = body_stack();
        stack.pop();
        stack.pop();
        assert!(stack.top_check(&["body"]));
    }

    #[test]
    fn pop_name_unwinds_to_match() {
        let mut stack = body_stack();
        stack.push(Element::page("table"));
        stack.push(Element::page("table-body"));
        stack.push(Element::page("table-row"));
        stack.push(Element::page("table-cell"));
        stack.push(Element::page("emphasis"));
        stack.pop_name(&["table-cell"]);
        assert!(stack.top_check(&["table-row"]));
    }

    #[test]
    fn scope_limits_clear() {
        let mut stack = body_stack();
        stack.push(Element::page("list"));
        stack.push(Element::page("list-item-body"));
        let token = stack.begin_scope();
        stack.push(Element::page("p"));
        stack.top_append("inner");
        stack.clear();
        assert!(stack.top_check(&["list-item-body"]));
        assert_eq!(stack.len(), 1);
        stack.push(Element::page("p"));
        stack.end_scope(token);
        assert!(stack.top_check(&["list-item-body"]));
        assert_eq!(stack.len(), 3);
        assert_eq!(
            to_fragment(&stack.into_root()),
            "<body><list><list-item-body><p>inner</p><p /></list-item-body></list></body>"
        );
    }

    #[test]
    fn line_numbers_only_on_change() {
        let mut stack = body_stack().with_line_numbers(true);
        stack.set_lineno(1);
        stack.push(Element::page("p"));
        stack.top_append(Element::page("strong"));
        stack.set_lineno(2);
        stack.top_append(Element::page("emphasis"));
        let xml = to_fragment(&stack.into_root());
        assert_eq!(
            xml,
            "<body><p html:data-lineno=\"1\"><strong /><emphasis html:data-lineno=\"2\" /></p></body>"
        );
    }

    #[test]
    fn attribute_checks() {
        let mut stack = body_stack();
        stack.push(Element::page("span").with_page_attr("baseline-shift", "sub"));
        assert!(stack.top_check_attrs(&["span"], &[("baseline-shift", "sub")]));
        assert!(!stack.top_check_attrs(&["span"], &[("baseline-shift", "super")]));
    }
}
