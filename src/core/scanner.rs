//! Command scanner
//!
//! Finds annotations of the form `DATA(@name OPTIONS)` in code nodes inside
//! the content region.

use lazy_static::lazy_static;
use regex::Regex;

use crate::document::{Document, NodeId, Selector};

lazy_static! {
    /// `data (@name {options})`, anchored at the end of the node text
    ///
    /// The data group is greedy so the last `(@` wins; `.` never crosses a
    /// newline.
    static ref COMMAND_PATTERN: Regex =
        Regex::new(r"^(.*)\(@(\w+)\s?(\{.+\})?\)$").unwrap();
}

/// One annotation found by [`scan`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMatch {
    /// The code node carrying the annotation
    pub node: NodeId,
    /// Inline data; `None` when the annotation had none
    pub data: Option<String>,
    pub name: String,
    /// Raw options literal including braces
    pub options: Option<String>,
}

/// Where the scanner looks
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Elements whose descendants may carry commands
    pub content: Selector,
    /// Nodes whose text is matched against the grammar
    pub code: Selector,
}

impl ScanOptions {
    pub fn new(content: &str, code: &str) -> Result<Self, crate::document::SelectorError> {
        Ok(ScanOptions {
            content: Selector::parse(content)?,
            code: Selector::parse(code)?,
        })
    }
}

/// Split node text into `(data, name, options)`
///
/// Returns `None` for text that is not an annotation.
pub fn match_command(text: &str) -> Option<(Option<String>, String, Option<String>)> {
    let caps = COMMAND_PATTERN.captures(text)?;
    let data = caps
        .get(1)
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let name = caps.get(2)?.as_str().to_string();
    let options = caps.get(3).map(|m| m.as_str().to_string());
    Some((data, name, options))
}

/// Collect every annotation in document order
///
/// Candidates are nodes matching `opts.code` that have an ancestor matching
/// `opts.content`. Trailing whitespace of the node text is ignored, so a
/// fenced block's final newline does not hide its annotation. Nested content
/// regions do not produce duplicates.
pub fn scan(doc: &Document, opts: &ScanOptions) -> Vec<CommandMatch> {
    doc.descendants(doc.root())
        .into_iter()
        .filter(|&node| opts.code.matches(doc, node))
        .filter(|&node| {
            doc.ancestors(node)
                .any(|a| opts.content.matches(doc, a))
        })
        .filter_map(|node| {
            let (data, name, options) = match_command(doc.text_content(node).trim_end())?;
            Some(CommandMatch {
                node,
                data,
                name,
                options,
            })
        })
        .collect()
}
