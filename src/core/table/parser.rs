//! Tabular data parser

use super::cell::{coerce_number, Cell, ParsedTable, RawBlock};
use crate::utils::literal::parse_literal;

/// Directive that switches a block into literal mode
const LITERAL_DIRECTIVE: &str = "#!";
const LITERAL_LANGUAGE: &str = "javascript";

/// Parse a raw block into a typed table
///
/// - Structured input is returned unchanged.
/// - A first line of `#!javascript` switches to literal mode: the remaining
///   lines are parsed as an array/object literal, and any failure yields an
///   empty row instead of an error.
/// - Otherwise rows are split on newlines and cells on commas, every cell is
///   trimmed, and cells outside the header row (`has_column_labels`) and header
///   column (`has_row_labels`) are coerced to numbers.
/// - A single row comes back as [`ParsedTable::Row`], more as
///   [`ParsedTable::Rows`].
pub fn parse_data(raw: &RawBlock, has_column_labels: bool, has_row_labels: bool) -> ParsedTable {
    match raw {
        RawBlock::Structured(table) => table.clone(),
        RawBlock::Text(text) => parse_text(text, has_column_labels, has_row_labels),
    }
}

/// Parse text with no header row or column
pub fn parse_csv(text: &str) -> ParsedTable {
    parse_text(text, false, false)
}

/// Parse a text block; see [`parse_data`]
pub fn parse_text(text: &str, has_column_labels: bool, has_row_labels: bool) -> ParsedTable {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ParsedTable::Row(Vec::new());
    }

    let mut lines = trimmed.split('\n');
    let first_line = lines.next().unwrap_or("").trim();

    if is_literal_directive(first_line) {
        let body: Vec<&str> = lines.collect();
        return parse_literal_block(&body.join("\n"));
    }

    let mut table: Vec<Vec<Cell>> = trimmed
        .split('\n')
        .map(|line| {
            line.split(',')
                .map(|token| Cell::Text(token.trim().to_string()))
                .collect()
        })
        .collect();

    let row_start = usize::from(has_column_labels);
    let col_start = usize::from(has_row_labels);
    for row in table.iter_mut().skip(row_start) {
        for cell in row.iter_mut().skip(col_start) {
            if let Cell::Text(text) = cell {
                *cell = Cell::Number(coerce_number(text));
            }
        }
    }

    if table.len() == 1 {
        ParsedTable::Row(table.pop().unwrap_or_default())
    } else {
        ParsedTable::Rows(table)
    }
}

fn is_literal_directive(first_line: &str) -> bool {
    first_line
        .strip_prefix(LITERAL_DIRECTIVE)
        .and_then(|rest| rest.split(' ').next())
        .is_some_and(|lang| lang.trim().eq_ignore_ascii_case(LITERAL_LANGUAGE))
}

fn parse_literal_block(body: &str) -> ParsedTable {
    match parse_literal(body) {
        Ok(value) => ParsedTable::Literal(value),
        Err(err) => {
            tracing::debug!(error = %err, "literal data block rejected, using empty data");
            ParsedTable::Row(Vec::new())
        }
    }
}

/// Smallest value, ignoring NaN; `None` for empty input
pub fn array_min(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .reduce(f64::min)
}

/// Largest value, ignoring NaN; `None` for empty input
pub fn array_max(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .reduce(f64::max)
}
