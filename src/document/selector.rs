//! Minimal CSS selector engine
//!
//! Supports what the scanner's region and command selectors need:
//!
//! - type selectors (`code`) and the universal selector (`*`)
//! - `.class` and `#id`
//! - negation of a compound selector (`:not(pre)`)
//! - child (`>`) and descendant (whitespace) combinators
//!
//! ```rust
//! use dviz::document::{Document, Selector};
//!
//! let mut doc = Document::new();
//! let p = doc.append_element(doc.root(), "p");
//! let code = doc.append_element(p, "code");
//!
//! let sel = Selector::parse("*:not(pre) > code").unwrap();
//! assert!(sel.matches(&doc, code));
//! ```

use super::{Document, NodeId};
use thiserror::Error;

/// Selector parse failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected character '{found}' at offset {offset} in selector '{selector}'")]
    Unexpected {
        selector: String,
        found: char,
        offset: usize,
    },
    #[error("unsupported pseudo-class ':{0}'")]
    UnsupportedPseudo(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Child,
    Descendant,
}

/// A compound selector: `tag.class#id:not(...)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    negations: Vec<Compound>,
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(el) = doc.element(node) else {
            return false;
        };
        if let Some(ref tag) = self.tag {
            if !el.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(ref id) = self.id {
            if el.attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| el.has_class(c)) {
            return false;
        }
        !self.negations.iter().any(|n| n.matches(doc, node))
    }
}

/// A parsed selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    /// Compounds left to right; the combinator links each compound to the previous one
    steps: Vec<(Combinator, Compound)>,
}

impl Selector {
    /// Parse a selector string
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut parser = SelectorParser {
            source: input,
            chars: input.char_indices().peekable(),
        };
        let steps = parser.parse_complex()?;
        Ok(Selector {
            source: input.trim().to_string(),
            steps,
        })
    }

    /// The selector as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `node` is matched by this selector
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matches_from(doc, node, self.steps.len())
    }

    fn matches_from(&self, doc: &Document, node: NodeId, len: usize) -> bool {
        let Some((combinator, compound)) = self.steps[..len].last() else {
            return true;
        };
        if !compound.matches(doc, node) {
            return false;
        }
        if len == 1 {
            return true;
        }
        match combinator {
            Combinator::Child => doc
                .parent(node)
                .is_some_and(|p| self.matches_from(doc, p, len - 1)),
            Combinator::Descendant => doc
                .ancestors(node)
                .any(|a| self.matches_from(doc, a, len - 1)),
        }
    }

    /// All matching nodes below `scope`, in document order
    pub fn select(&self, doc: &Document, scope: NodeId) -> Vec<NodeId> {
        doc.descendants(scope)
            .into_iter()
            .filter(|&n| self.matches(doc, n))
            .collect()
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

struct SelectorParser<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl SelectorParser<'_> {
    fn unexpected(&self, offset: usize, found: char) -> SelectorError {
        SelectorError::Unexpected {
            selector: self.source.to_string(),
            found,
            offset,
        }
    }

    fn skip_ws(&mut self) -> bool {
        let mut skipped = false;
        while let Some(&(_, c)) = self.chars.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.chars.next();
            skipped = true;
        }
        skipped
    }

    fn parse_complex(&mut self) -> Result<Vec<(Combinator, Compound)>, SelectorError> {
        let mut steps = Vec::new();
        let mut combinator = Combinator::Descendant;
        self.skip_ws();

        loop {
            let compound = self.parse_compound()?;
            steps.push((combinator, compound));

            let had_ws = self.skip_ws();
            match self.chars.peek() {
                None => break,
                Some(&(_, '>')) => {
                    self.chars.next();
                    self.skip_ws();
                    combinator = Combinator::Child;
                }
                Some(&(offset, c)) => {
                    if !had_ws {
                        return Err(self.unexpected(offset, c));
                    }
                    combinator = Combinator::Descendant;
                }
            }
        }

        if steps.is_empty() {
            return Err(SelectorError::Empty);
        }
        Ok(steps)
    }

    fn parse_ident(&mut self) -> String {
        let mut ident = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                ident.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        ident
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let mut consumed = false;

        if let Some(&(_, '*')) = self.chars.peek() {
            self.chars.next();
            consumed = true;
        } else {
            let tag = self.parse_ident();
            if !tag.is_empty() {
                compound.tag = Some(tag);
                consumed = true;
            }
        }

        while let Some(&(offset, c)) = self.chars.peek() {
            match c {
                '.' => {
                    self.chars.next();
                    let class = self.parse_ident();
                    if class.is_empty() {
                        return Err(self.unexpected(offset, c));
                    }
                    compound.classes.push(class);
                }
                '#' => {
                    self.chars.next();
                    let id = self.parse_ident();
                    if id.is_empty() {
                        return Err(self.unexpected(offset, c));
                    }
                    compound.id = Some(id);
                }
                ':' => {
                    self.chars.next();
                    let pseudo = self.parse_ident();
                    if pseudo != "not" {
                        return Err(SelectorError::UnsupportedPseudo(pseudo));
                    }
                    match self.chars.next() {
                        Some((_, '(')) => {}
                        Some((o, other)) => return Err(self.unexpected(o, other)),
                        None => return Err(self.unexpected(offset, c)),
                    }
                    self.skip_ws();
                    let inner = self.parse_compound()?;
                    self.skip_ws();
                    match self.chars.next() {
                        Some((_, ')')) => {}
                        Some((o, other)) => return Err(self.unexpected(o, other)),
                        None => return Err(self.unexpected(offset, c)),
                    }
                    compound.negations.push(inner);
                }
                _ => break,
            }
            consumed = true;
        }

        if !consumed {
            return match self.chars.peek() {
                Some(&(offset, c)) => Err(self.unexpected(offset, c)),
                None => Err(SelectorError::Empty),
            };
        }
        Ok(compound)
    }
}
