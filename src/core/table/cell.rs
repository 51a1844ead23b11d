//! Typed cells and parsed tables

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Number, Value};

lazy_static! {
    /// Decimal literal as accepted by JavaScript's `Number()`
    static ref DECIMAL: Regex = Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").unwrap();
}

/// A single parsed cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Coerced value; NaN when the text was not numeric
    Number(f64),
    /// Header cell kept verbatim (trimmed)
    Text(String),
}

impl Cell {
    /// Numeric value, if this is a number cell
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            Cell::Number(_) => None,
        }
    }

    /// Human-readable label (numbers are formatted without a trailing `.0`)
    pub fn label(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_number(*n),
        }
    }

    /// JSON form; NaN and infinities become `null`
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Number(n) => number_to_json(*n),
        }
    }

    /// Convert a JSON scalar into a cell
    pub fn from_json(value: &Value) -> Cell {
        match value {
            Value::Number(n) => Cell::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => Cell::Text(s.clone()),
            Value::Bool(b) => Cell::Number(if *b { 1.0 } else { 0.0 }),
            Value::Null => Cell::Number(f64::NAN),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

/// Coerce trimmed text to a number the way JavaScript's `Number()` does
///
/// Empty text is `0`; `Infinity` and `0x`/`0o`/`0b` prefixes are honored;
/// anything else that is not a decimal literal is NaN.
pub fn coerce_number(text: &str) -> f64 {
    let s = text.trim();
    if s.is_empty() {
        return 0.0;
    }

    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    let radix = match s.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return u64::from_str_radix(&s[2..], radix)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN);
    }

    if DECIMAL.is_match(s) {
        s.parse::<f64>().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

/// Format a number without a trailing `.0` for integral values
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// JSON number, integral when possible; non-finite values become `null`
pub fn number_to_json(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Result of parsing a raw data block
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedTable {
    /// The source had exactly one row
    Row(Vec<Cell>),
    /// Two or more rows; rows may be ragged
    Rows(Vec<Vec<Cell>>),
    /// Value produced by a `#!javascript` literal block
    Literal(Value),
}

impl ParsedTable {
    pub fn is_empty(&self) -> bool {
        match self {
            ParsedTable::Row(cells) => cells.is_empty(),
            ParsedTable::Rows(rows) => rows.is_empty(),
            ParsedTable::Literal(value) => match value {
                Value::Array(items) => items.is_empty(),
                Value::Object(map) => map.is_empty(),
                Value::Null => true,
                _ => false,
            },
        }
    }

    /// Normalize to a list of rows
    ///
    /// A single row becomes a one-row table. Literal arrays of arrays map to
    /// rows; a flat literal array maps to one row.
    pub fn to_rows(&self) -> Vec<Vec<Cell>> {
        match self {
            ParsedTable::Row(cells) => vec![cells.clone()],
            ParsedTable::Rows(rows) => rows.clone(),
            ParsedTable::Literal(Value::Array(items)) => {
                if items.iter().all(Value::is_array) {
                    items
                        .iter()
                        .filter_map(Value::as_array)
                        .map(|row| row.iter().map(Cell::from_json).collect())
                        .collect()
                } else {
                    vec![items.iter().map(Cell::from_json).collect()]
                }
            }
            ParsedTable::Literal(_) => Vec::new(),
        }
    }

    /// Every numeric cell in row-major order
    pub fn to_numbers(&self) -> Vec<f64> {
        self.to_rows()
            .iter()
            .flatten()
            .filter_map(Cell::as_f64)
            .collect()
    }

    /// JSON form: flat array, array of arrays, or the literal itself
    pub fn to_json(&self) -> Value {
        match self {
            ParsedTable::Row(cells) => Value::Array(cells.iter().map(Cell::to_json).collect()),
            ParsedTable::Rows(rows) => Value::Array(
                rows.iter()
                    .map(|row| Value::Array(row.iter().map(Cell::to_json).collect()))
                    .collect(),
            ),
            ParsedTable::Literal(value) => value.clone(),
        }
    }
}

/// Input to the tabular data parser
#[derive(Debug, Clone, PartialEq)]
pub enum RawBlock {
    /// Comma-separated rows, one per line
    Text(String),
    /// Already-structured data; the parser returns it unchanged
    Structured(ParsedTable),
}

impl RawBlock {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawBlock::Text(s) => Some(s),
            RawBlock::Structured(_) => None,
        }
    }
}

impl From<&str> for RawBlock {
    fn from(s: &str) -> Self {
        RawBlock::Text(s.to_string())
    }
}

impl From<String> for RawBlock {
    fn from(s: String) -> Self {
        RawBlock::Text(s)
    }
}

impl From<ParsedTable> for RawBlock {
    fn from(table: ParsedTable) -> Self {
        RawBlock::Structured(table)
    }
}
