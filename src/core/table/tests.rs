//! Regression tests for data parsing

use super::*;
use crate::document::Document;
use pretty_assertions::assert_eq;
use serde_json::json;

fn nums(values: &[f64]) -> Vec<Cell> {
    values.iter().copied().map(Cell::Number).collect()
}

fn texts(values: &[&str]) -> Vec<Cell> {
    values.iter().copied().map(Cell::from).collect()
}

#[test]
fn test_parse_simple_csv() {
    let raw = ["1, 2, 3", "4, 5, 6"].join("\n");
    assert_eq!(
        parse_csv(&raw),
        ParsedTable::Rows(vec![nums(&[1.0, 2.0, 3.0]), nums(&[4.0, 5.0, 6.0])])
    );
}

#[test]
fn test_parse_single_row_is_flat() {
    assert_eq!(parse_csv("1, 2, 3"), ParsedTable::Row(nums(&[1.0, 2.0, 3.0])));
}

#[test]
fn test_parse_with_column_header() {
    let raw = ["a, b, c", "1, 2, 3", "4, 5, 6"].join("\n");
    assert_eq!(
        parse_text(&raw, true, false),
        ParsedTable::Rows(vec![
            texts(&["a", "b", "c"]),
            nums(&[1.0, 2.0, 3.0]),
            nums(&[4.0, 5.0, 6.0]),
        ])
    );
}

#[test]
fn test_parse_with_row_header() {
    let raw = ["a, 1, 2", "b, 3, 4"].join("\n");
    assert_eq!(
        parse_text(&raw, false, true),
        ParsedTable::Rows(vec![
            vec![Cell::from("a"), Cell::Number(1.0), Cell::Number(2.0)],
            vec![Cell::from("b"), Cell::Number(3.0), Cell::Number(4.0)],
        ])
    );
}

#[test]
fn test_parse_with_both_headers() {
    let raw = ["x, a, b, c", "d, 1, 2, 3", "e, 4, 5, 6"].join("\n");
    assert_eq!(
        parse_text(&raw, true, true),
        ParsedTable::Rows(vec![
            texts(&["x", "a", "b", "c"]),
            vec![Cell::from("d"), Cell::Number(1.0), Cell::Number(2.0), Cell::Number(3.0)],
            vec![Cell::from("e"), Cell::Number(4.0), Cell::Number(5.0), Cell::Number(6.0)],
        ])
    );
}

#[test]
fn test_parse_various_numbers() {
    let ParsedTable::Row(cells) = parse_csv("1, 2.2, -3") else {
        panic!("expected a single row");
    };
    assert_eq!(cells[0], Cell::Number(1.0), "integer");
    assert_eq!(cells[1], Cell::Number(2.2), "float");
    assert_eq!(cells[2], Cell::Number(-3.0), "negative integer");
}

#[test]
fn test_non_numeric_is_nan_not_error() {
    let ParsedTable::Row(cells) = parse_csv("abc, 1") else {
        panic!("expected a single row");
    };
    assert!(cells[0].as_f64().unwrap().is_nan());
    assert_eq!(cells[1], Cell::Number(1.0));
}

#[test]
fn test_structured_input_is_identity() {
    let table = ParsedTable::Rows(vec![texts(&["a"]), nums(&[f64::INFINITY])]);
    let raw = RawBlock::Structured(table.clone());
    assert_eq!(parse_data(&raw, true, true), table);

    let literal = ParsedTable::Literal(json!({"nodes": []}));
    assert_eq!(parse_data(&RawBlock::from(literal.clone()), false, false), literal);
}

#[test]
fn test_empty_input_is_empty_row() {
    assert_eq!(parse_csv(""), ParsedTable::Row(vec![]));
    assert_eq!(parse_csv("  \n "), ParsedTable::Row(vec![]));
}

#[test]
fn test_ragged_rows_are_kept() {
    assert_eq!(
        parse_csv("1, 2, 3\n4\n5, 6"),
        ParsedTable::Rows(vec![nums(&[1.0, 2.0, 3.0]), nums(&[4.0]), nums(&[5.0, 6.0])])
    );
}

#[test]
fn test_surrounding_blank_lines_are_trimmed() {
    assert_eq!(parse_csv("\n\n1, 2\n\n"), ParsedTable::Row(nums(&[1.0, 2.0])));
}

#[test]
fn test_round_trip_preserves_shape_and_values() {
    let cases = ["3", "1, 2, 3", "1.5, -2\n3e2, 0.25", "10, 20\n30, 40\n50, 60"];
    for raw in cases {
        let parsed = parse_csv(raw);
        let rows = parsed.to_rows();
        let serialized = rows
            .iter()
            .map(|row| row.iter().map(Cell::label).collect::<Vec<_>>().join(", "))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(parse_csv(&serialized), parsed, "round trip of {:?}", raw);
        assert_eq!(rows.len(), raw.lines().count());
    }
}

#[test]
fn test_literal_mode() {
    let raw = "#!javascript\n[['x', 'y'],\n [1, 2]]";
    assert_eq!(
        parse_csv(raw),
        ParsedTable::Literal(json!([["x", "y"], [1, 2]]))
    );

    // Directive is case-insensitive and may carry trailing words
    let raw = "  #!JavaScript please\n{a: 1}";
    assert_eq!(parse_csv(raw), ParsedTable::Literal(json!({"a": 1})));
}

#[test]
fn test_literal_mode_fails_soft() {
    assert_eq!(
        parse_csv("#!javascript\nwindow.alert('hi')"),
        ParsedTable::Row(vec![])
    );
    assert_eq!(parse_csv("#!javascript"), ParsedTable::Row(vec![]));
}

#[test]
fn test_deeply_nested_literal_fails_soft() {
    let deep = format!("#!javascript\n{}", "[".repeat(20_000));
    assert_eq!(parse_csv(&deep), ParsedTable::Row(vec![]));
}

#[test]
fn test_other_directives_are_csv() {
    let ParsedTable::Rows(rows) = parse_text("#!python\n1", true, false) else {
        panic!("expected rows");
    };
    assert_eq!(rows[0], texts(&["#!python"]));
    assert_eq!(rows[1], nums(&[1.0]));
}

#[test]
fn test_coerce_number_semantics() {
    assert_eq!(coerce_number(""), 0.0);
    assert_eq!(coerce_number(" 42 "), 42.0);
    assert_eq!(coerce_number("+5"), 5.0);
    assert_eq!(coerce_number(".5"), 0.5);
    assert_eq!(coerce_number("5."), 5.0);
    assert_eq!(coerce_number("1e3"), 1000.0);
    assert_eq!(coerce_number("0x1F"), 31.0);
    assert_eq!(coerce_number("-Infinity"), f64::NEG_INFINITY);
    assert!(coerce_number("1,5").is_nan());
    assert!(coerce_number("inf").is_nan());
    assert!(coerce_number("12px").is_nan());
}

#[test]
fn test_to_json_uses_null_for_nan() {
    let parsed = parse_text("a, b\n1.5, x", true, false);
    assert_eq!(parsed.to_json(), json!([["a", "b"], [1.5, null]]));
}

#[test]
fn test_array_min_max() {
    assert_eq!(array_min(&[3.0, 5.0, 1.0, 4.0]), Some(1.0));
    assert_eq!(array_max(&[3.0, 5.0, 1.0, 4.0]), Some(5.0));
    assert_eq!(array_max(&[f64::NAN, 2.0]), Some(2.0));
    assert_eq!(array_min(&[]), None);
}

#[test]
fn test_table_to_csv() {
    let mut doc = Document::new();
    let table = doc.append_element(doc.root(), "table");
    let thead = doc.append_element(table, "thead");
    let head = doc.append_element(thead, "tr");
    for label in ["x", "y"] {
        let th = doc.append_element(head, "th");
        doc.append_text(th, label);
    }
    for values in [["1", "2"], ["3", "4"]] {
        let tr = doc.append_element(table, "tr");
        for v in values {
            let td = doc.append_element(tr, "td");
            doc.append_text(td, v);
        }
    }

    let csv = table_to_csv(&doc, table);
    assert_eq!(csv, "x,y\n1,2\n3,4");
    assert_eq!(
        parse_text(&csv, true, false),
        ParsedTable::Rows(vec![texts(&["x", "y"]), nums(&[1.0, 2.0]), nums(&[3.0, 4.0])])
    );
}

#[test]
fn test_table_to_csv_does_not_escape() {
    let mut doc = Document::new();
    let table = doc.append_element(doc.root(), "table");
    let tr = doc.append_element(table, "tr");
    let td = doc.append_element(tr, "td");
    doc.append_text(td, "1,000");
    assert_eq!(table_to_csv(&doc, table), "1,000");
}
