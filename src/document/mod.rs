//! In-memory document tree
//!
//! An arena-backed element tree with the small set of DOM-like operations the
//! annotation pipeline needs: sibling navigation, text extraction, insertion
//! and removal. Nodes are never freed; removing a node detaches it from its
//! parent so that outstanding [`NodeId`]s stay valid.
//!
//! Documents are built programmatically, from Markdown (see [`markdown`]) or
//! from HTML, and serialized back to HTML (see [`html`]).

pub mod html;
pub mod markdown;
pub mod selector;

pub use html::{append_html, from_html, to_html};
pub use markdown::from_markdown;
pub use selector::{Selector, SelectorError};

/// Handle to a node inside a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Element payload: tag name plus attributes in insertion order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    /// Look up an attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over the whitespace-separated entries of the `class` attribute
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }
}

/// Node payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// The document root; serialized as its children only
    Root,
    Element(Element),
    Text(String),
    /// Markup passed through verbatim (inline HTML from Markdown)
    Raw(String),
    Comment(String),
    /// `<!DOCTYPE name>`
    Doctype(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed document tree
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Create an empty document containing only the root node
    pub fn new() -> Self {
        Document {
            nodes: vec![Node {
                data: NodeData::Root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// The root node
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::Element(Element::new(tag)))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Text(text.into()))
    }

    /// Create a detached raw-markup node
    pub fn create_raw(&mut self, markup: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Raw(markup.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Comment(text.into()))
    }

    pub fn create_doctype(&mut self, name: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Doctype(name.into()))
    }

    /// Create an element and append it to `parent`
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.create_element(tag);
        self.append_child(parent, id);
        id
    }

    /// Create a text node and append it to `parent`
    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        let id = self.create_text(text);
        self.append_child(parent, id);
        id
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Tag name of an element node
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    /// Set (or replace) an attribute; no-op on non-element nodes
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(el) = self.element_mut(id) {
            let value = value.into();
            match el.attrs.iter_mut().find(|(k, _)| k == name) {
                Some(slot) => slot.1 = value,
                None => el.attrs.push((name.to_string(), value)),
            }
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|el| el.has_class(class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        let joined = match self.attr(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.set_attr(id, "class", joined);
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Child nodes that are elements
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
            .collect()
    }

    fn index_in_parent(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let idx = self.children(parent).iter().position(|&c| c == id)?;
        Some((parent, idx))
    }

    /// Nearest preceding sibling that is an element (text nodes are skipped)
    pub fn prev_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, idx) = self.index_in_parent(id)?;
        self.children(parent)[..idx]
            .iter()
            .rev()
            .copied()
            .find(|&c| self.is_element(c))
    }

    /// Nearest preceding sibling that carries content
    ///
    /// Blank text, comments and doctypes are skipped. Anything else stops the
    /// search, including non-blank text and raw markup.
    pub fn prev_content_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, idx) = self.index_in_parent(id)?;
        self.children(parent)[..idx]
            .iter()
            .rev()
            .copied()
            .find(|&c| match self.data(c) {
                NodeData::Text(text) => !text.trim().is_empty(),
                NodeData::Comment(_) | NodeData::Doctype(_) => false,
                NodeData::Root | NodeData::Element(_) | NodeData::Raw(_) => true,
            })
    }

    /// Nearest following sibling that is an element (text nodes are skipped)
    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, idx) = self.index_in_parent(id)?;
        self.children(parent)[idx + 1..]
            .iter()
            .copied()
            .find(|&c| self.is_element(c))
    }

    /// Whether the node is still reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root() {
                return true;
            }
            match self.parent(current) {
                Some(p) => current = p,
                None => return false,
            }
        }
    }

    /// Ancestors from the parent upwards
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// All descendants of `id` in document (pre-)order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// First descendant element with the given tag
    pub fn find_first(&self, from: NodeId, tag: &str) -> Option<NodeId> {
        self.descendants(from)
            .into_iter()
            .find(|&n| self.tag(n) == Some(tag))
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        std::iter::once(id)
            .chain(self.descendants(id))
            .filter_map(|node| match self.data(node) {
                NodeData::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace all children of `id` with a single text node
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        for child in self.children(id).to_vec() {
            self.detach(child);
        }
        self.append_text(id, text);
    }

    fn detach(&mut self, id: NodeId) {
        if let Some((parent, idx)) = self.index_in_parent(id) {
            self.nodes[parent.0].children.remove(idx);
        }
        self.nodes[id.0].parent = None;
    }

    /// Append `child` as the last child of `parent`, moving it if attached
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `child` as the first child of `parent`, moving it if attached
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(0, child);
    }

    /// Insert `new` right after `reference`; returns false if `reference` is detached
    pub fn insert_after(&mut self, reference: NodeId, new: NodeId) -> bool {
        self.detach(new);
        match self.index_in_parent(reference) {
            Some((parent, idx)) => {
                self.nodes[new.0].parent = Some(parent);
                self.nodes[parent.0].children.insert(idx + 1, new);
                true
            }
            None => false,
        }
    }

    /// Insert `new` right before `reference`; returns false if `reference` is detached
    pub fn insert_before(&mut self, reference: NodeId, new: NodeId) -> bool {
        self.detach(new);
        match self.index_in_parent(reference) {
            Some((parent, idx)) => {
                self.nodes[new.0].parent = Some(parent);
                self.nodes[parent.0].children.insert(idx, new);
                true
            }
            None => false,
        }
    }

    /// Detach a node (and its subtree) from the document
    pub fn remove(&mut self, id: NodeId) {
        if id != self.root() {
            self.detach(id);
        }
    }

    /// Whether the node has no element children
    ///
    /// Mirrors jQuery's `children()` which ignores text nodes.
    pub fn has_no_element_children(&self, id: NodeId) -> bool {
        !self.children(id).iter().any(|&c| self.is_element(c))
    }

    /// Serialize the whole document to HTML
    pub fn to_html(&self) -> String {
        html::to_html(self, self.root())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over a node's ancestors
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}
