//! Markdown front end
//!
//! Builds a [`Document`] from CommonMark (with GFM tables, strikethrough and
//! task lists) using `pulldown-cmark`. Inline code spans become `code`
//! elements inside their paragraph, which is exactly the shape the command
//! scanner looks for; fenced blocks become `pre > code`.
//!
//! HTML blocks are parsed into elements. A block that only opens an element
//! (`<div class="dviz-content">`) stays open until a block that only closes
//! it, so Markdown between the two ends up inside. Inline HTML is kept as raw
//! markup.

use lazy_static::lazy_static;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use regex::Regex;

use super::html::{append_html, VOID_ELEMENTS};
use super::{Document, NodeId};

lazy_static! {
    static ref OPEN_ONLY: Regex = Regex::new(r"^<([A-Za-z][A-Za-z0-9-]*)(?:\s[^<>]*)?>$").unwrap();
    static ref CLOSE_ONLY: Regex = Regex::new(r"^</([A-Za-z][A-Za-z0-9-]*)\s*>$").unwrap();
}

/// Parse Markdown and append the resulting elements under `parent`
pub fn append_markdown(doc: &mut Document, parent: NodeId, markdown: &str) {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut builder = TreeBuilder {
        doc,
        stack: vec![parent],
        in_table_head: false,
        html_block: None,
        html_open: Vec::new(),
    };
    for event in Parser::new_ext(markdown, options) {
        builder.process_event(event);
    }
}

/// Parse Markdown into a fresh document
pub fn from_markdown(markdown: &str) -> Document {
    let mut doc = Document::new();
    let root = doc.root();
    append_markdown(&mut doc, root, markdown);
    doc
}

struct TreeBuilder<'a> {
    doc: &'a mut Document,
    stack: Vec<NodeId>,
    in_table_head: bool,
    /// Text of the HTML block being read
    html_block: Option<String>,
    /// Elements opened by open-only HTML blocks
    html_open: Vec<NodeId>,
}

impl TreeBuilder<'_> {
    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or_else(|| self.doc.root())
    }

    fn open(&mut self, tag: &str) -> NodeId {
        let parent = self.current();
        let id = self.doc.append_element(parent, tag);
        self.stack.push(id);
        id
    }

    fn close(&mut self) -> Option<NodeId> {
        // The caller's parent is never popped
        if self.stack.len() > 1 {
            self.stack.pop()
        } else {
            None
        }
    }

    fn leaf(&mut self, tag: &str) -> NodeId {
        let parent = self.current();
        self.doc.append_element(parent, tag)
    }

    fn text(&mut self, text: &str) {
        let parent = self.current();
        self.doc.append_text(parent, text);
    }

    fn process_event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                let el = self.leaf("code");
                self.doc.append_text(el, code.to_string());
            }
            Event::Html(html) if self.html_block.is_some() => {
                if let Some(block) = self.html_block.as_mut() {
                    block.push_str(&html);
                }
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                let raw = self.doc.create_raw(html.to_string());
                let parent = self.current();
                self.doc.append_child(parent, raw);
            }
            Event::SoftBreak => self.text("\n"),
            Event::HardBreak => {
                self.leaf("br");
            }
            Event::Rule => {
                self.leaf("hr");
            }
            Event::TaskListMarker(checked) => {
                let input = self.leaf("input");
                self.doc.set_attr(input, "type", "checkbox");
                self.doc.set_attr(input, "disabled", "");
                if checked {
                    self.doc.set_attr(input, "checked", "");
                }
            }
            Event::FootnoteReference(name) => {
                let sup = self.leaf("sup");
                self.doc.append_text(sup, name.to_string());
            }
            Event::InlineMath(math) | Event::DisplayMath(math) => {
                let span = self.leaf("span");
                self.doc.set_attr(span, "class", "math");
                self.doc.append_text(span, math.to_string());
            }
        }
    }

    fn start_tag(&mut self, tag: Tag) {
        match tag {
            Tag::Paragraph => {
                self.open("p");
            }
            Tag::Heading { level, .. } => {
                let name = match level {
                    HeadingLevel::H1 => "h1",
                    HeadingLevel::H2 => "h2",
                    HeadingLevel::H3 => "h3",
                    HeadingLevel::H4 => "h4",
                    HeadingLevel::H5 => "h5",
                    HeadingLevel::H6 => "h6",
                };
                self.open(name);
            }
            Tag::BlockQuote(_) => {
                self.open("blockquote");
            }
            Tag::CodeBlock(kind) => {
                self.open("pre");
                let code = self.open("code");
                if let CodeBlockKind::Fenced(lang) = kind {
                    let lang = lang.split_whitespace().next().unwrap_or("");
                    if !lang.is_empty() {
                        self.doc
                            .set_attr(code, "class", format!("language-{}", lang));
                    }
                }
            }
            Tag::List(Some(start)) => {
                let ol = self.open("ol");
                if start != 1 {
                    self.doc.set_attr(ol, "start", start.to_string());
                }
            }
            Tag::List(None) => {
                self.open("ul");
            }
            Tag::Item => {
                self.open("li");
            }
            Tag::Table(_) => {
                self.open("table");
            }
            Tag::TableHead => {
                self.in_table_head = true;
                self.open("thead");
                self.open("tr");
            }
            Tag::TableRow => {
                self.open("tr");
            }
            Tag::TableCell => {
                self.open(if self.in_table_head { "th" } else { "td" });
            }
            Tag::Emphasis => {
                self.open("em");
            }
            Tag::Strong => {
                self.open("strong");
            }
            Tag::Strikethrough => {
                self.open("del");
            }
            Tag::Link {
                dest_url, title, ..
            } => {
                let a = self.open("a");
                self.doc.set_attr(a, "href", dest_url.to_string());
                if !title.is_empty() {
                    self.doc.set_attr(a, "title", title.to_string());
                }
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                let img = self.open("img");
                self.doc.set_attr(img, "src", dest_url.to_string());
                if !title.is_empty() {
                    self.doc.set_attr(img, "title", title.to_string());
                }
            }
            Tag::HtmlBlock => {
                self.html_block = Some(String::new());
            }
            _ => {
                self.open("div");
            }
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        if tag != TagEnd::HtmlBlock {
            // HTML elements left open inside a Markdown container end with it
            while let Some(&open) = self.html_open.last() {
                if self.stack.last() != Some(&open) {
                    break;
                }
                self.html_open.pop();
                self.stack.pop();
            }
        }
        match tag {
            TagEnd::HtmlBlock => {
                if let Some(block) = self.html_block.take() {
                    self.push_html_block(&block);
                }
            }
            TagEnd::CodeBlock => {
                self.close();
                self.close();
            }
            TagEnd::TableHead => {
                self.in_table_head = false;
                self.close();
                self.close();
            }
            TagEnd::Image => {
                // Alt text arrives as child text; fold it into the attribute
                if let Some(img) = self.close() {
                    let alt = self.doc.text_content(img);
                    for child in self.doc.children(img).to_vec() {
                        self.doc.remove(child);
                    }
                    self.doc.set_attr(img, "alt", alt);
                }
            }
            _ => {
                self.close();
            }
        }
    }
}

impl TreeBuilder<'_> {
    fn push_html_block(&mut self, block: &str) {
        let trimmed = block.trim();

        if let Some(caps) = CLOSE_ONLY.captures(trimmed) {
            let tag = caps[1].to_ascii_lowercase();
            let top = self.current();
            if self.html_open.last() == Some(&top) && self.doc.tag(top) == Some(tag.as_str()) {
                self.html_open.pop();
                self.stack.pop();
            }
            return;
        }

        let opens = OPEN_ONLY.captures(trimmed).is_some_and(|caps| {
            let tag = caps[1].to_ascii_lowercase();
            !trimmed.ends_with("/>") && !VOID_ELEMENTS.contains(&tag.as_str())
        });

        let parent = self.current();
        let nodes = append_html(self.doc, parent, if opens { trimmed } else { block });
        if opens {
            if let Some(&element) = nodes.iter().find(|&&n| self.doc.is_element(n)) {
                self.stack.push(element);
                self.html_open.push(element);
            }
        }
    }
}
