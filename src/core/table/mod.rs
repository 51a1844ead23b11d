//! Tabular data handling
//!
//! Turns the data block attached to a command into typed values:
//!
//! ```text
//! table element --table_to_csv--> raw text --parse_data--> ParsedTable
//! ```
//!
//! # Example
//!
//! ```rust
//! use dviz::core::table::{parse_data, Cell, ParsedTable, RawBlock};
//!
//! let raw = RawBlock::from("x, a\n1, 2");
//! let parsed = parse_data(&raw, true, false);
//! assert_eq!(
//!     parsed,
//!     ParsedTable::Rows(vec![
//!         vec![Cell::from("x"), Cell::from("a")],
//!         vec![Cell::Number(1.0), Cell::Number(2.0)],
//!     ])
//! );
//! ```

mod cell;
mod extract;
mod parser;

#[cfg(test)]
mod tests;

// Re-export public API
pub use cell::{coerce_number, format_number, number_to_json, Cell, ParsedTable, RawBlock};
pub use extract::table_to_csv;
pub use parser::{array_max, array_min, parse_csv, parse_data, parse_text};
