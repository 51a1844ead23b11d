//! HTML front end and serialization for [`Document`] trees
//!
//! Parsing goes through `html5ever` into an `RcDom`, which is then copied into
//! the arena. Full pages keep their `html`/`head`/`body` skeleton; fragments
//! are parsed in a `body` context.

use html5ever::driver::ParseOpts;
use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, parse_fragment, LocalName, Namespace, QualName};
use markup5ever_rcdom::{Handle, NodeData as DomNode, RcDom};

use super::{Document, NodeData, NodeId};

/// Elements that never have a closing tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text content is emitted without escaping
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Parse a complete HTML page
///
/// Missing `html`, `head` and `body` elements are added the way browsers do.
pub fn from_html(html: &str) -> Document {
    let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);
    let mut doc = Document::new();
    let root = doc.root();
    for child in dom.document.children.borrow().iter() {
        import(&mut doc, root, child);
    }
    doc
}

/// Parse an HTML fragment and append its nodes under `parent`
///
/// Returns the appended top-level nodes in order.
pub fn append_html(doc: &mut Document, parent: NodeId, html: &str) -> Vec<NodeId> {
    let context = QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from("body"));
    let dom = parse_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new()).one(html);

    // The fragment parser hangs its output off a single `html` element
    let mut added = Vec::new();
    for top in dom.document.children.borrow().iter() {
        for child in top.children.borrow().iter() {
            added.extend(import(doc, parent, child));
        }
    }
    added
}

/// Replace a raw-markup node with the nodes its markup parses into
///
/// Returns the new nodes; a detached or non-raw node is left alone.
pub fn expand_raw(doc: &mut Document, raw: NodeId) -> Vec<NodeId> {
    let NodeData::Raw(markup) = doc.data(raw) else {
        return Vec::new();
    };
    if doc.parent(raw).is_none() {
        return Vec::new();
    }
    let markup = markup.clone();

    let holder = doc.create_element("div");
    let nodes = append_html(doc, holder, &markup);
    for &node in &nodes {
        doc.insert_before(raw, node);
    }
    doc.remove(raw);
    nodes
}

/// Copy `handle` and its subtree under `parent`; returns the copy of `handle`
fn import(doc: &mut Document, parent: NodeId, handle: &Handle) -> Option<NodeId> {
    let mut top = None;
    let mut pending = vec![(handle.clone(), parent)];
    while let Some((node, parent)) = pending.pop() {
        let Some(id) = convert(doc, &node) else {
            continue;
        };
        doc.append_child(parent, id);
        top.get_or_insert(id);
        if doc.is_element(id) {
            let children = node.children.borrow();
            pending.extend(children.iter().rev().map(|child| (child.clone(), id)));
        }
    }
    top
}

fn convert(doc: &mut Document, node: &Handle) -> Option<NodeId> {
    match &node.data {
        DomNode::Element { name, attrs, .. } => {
            let id = doc.create_element(&name.local);
            for attr in attrs.borrow().iter() {
                let key = match &attr.name.prefix {
                    Some(prefix) => format!("{}:{}", prefix, attr.name.local),
                    None => attr.name.local.to_string(),
                };
                doc.set_attr(id, &key, attr.value.to_string());
            }
            Some(id)
        }
        DomNode::Text { contents } => Some(doc.create_text(contents.borrow().to_string())),
        DomNode::Comment { contents } => Some(doc.create_comment(contents.to_string())),
        DomNode::Doctype { name, .. } => Some(doc.create_doctype(name.to_string())),
        DomNode::Document | DomNode::ProcessingInstruction { .. } => None,
    }
}

/// Serialize `id` and its subtree to HTML
///
/// The root node serializes as the concatenation of its children.
pub fn to_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_nodes(doc, vec![Step::Open(id, false)], &mut out);
    out
}

/// Serialize only the children of `id`
pub fn inner_html(doc: &Document, id: NodeId) -> String {
    let raw = doc
        .tag(id)
        .is_some_and(|t| RAW_TEXT_ELEMENTS.contains(&t));
    let steps = doc
        .children(id)
        .iter()
        .rev()
        .map(|&child| Step::Open(child, raw))
        .collect();
    let mut out = String::new();
    write_nodes(doc, steps, &mut out);
    out
}

enum Step {
    /// Node to write; the flag marks text inside `script`/`style`
    Open(NodeId, bool),
    Close(NodeId),
}

fn write_nodes(doc: &Document, mut steps: Vec<Step>, out: &mut String) {
    while let Some(step) = steps.pop() {
        let (id, raw_text) = match step {
            Step::Close(id) => {
                if let Some(tag) = doc.tag(id) {
                    out.push_str("</");
                    out.push_str(tag);
                    out.push('>');
                }
                continue;
            }
            Step::Open(id, raw_text) => (id, raw_text),
        };

        match doc.data(id) {
            NodeData::Root => {
                steps.extend(doc.children(id).iter().rev().map(|&c| Step::Open(c, false)));
            }
            NodeData::Text(text) => {
                if raw_text {
                    out.push_str(text);
                } else {
                    out.push_str(&html_escape::encode_text(text));
                }
            }
            NodeData::Raw(markup) => out.push_str(markup),
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Doctype(name) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(name);
                out.push('>');
            }
            NodeData::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in &el.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&html_escape::encode_double_quoted_attribute(value));
                    out.push('"');
                }
                out.push('>');

                if VOID_ELEMENTS.contains(&el.tag.as_str()) {
                    continue;
                }

                let raw = RAW_TEXT_ELEMENTS.contains(&el.tag.as_str());
                steps.push(Step::Close(id));
                steps.extend(doc.children(id).iter().rev().map(|&c| Step::Open(c, raw)));
            }
        }
    }
}
