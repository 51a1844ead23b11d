//! Table element to raw text

use crate::document::{Document, NodeId};

/// Convert a table element into the comma/newline text [`parse_data`] accepts
///
/// Rows are the `tr` descendants in document order; cells are each row's
/// `td`/`th` children. Cell text is taken as-is: embedded commas or newlines
/// are not escaped, so they split cells exactly like typed text would.
///
/// [`parse_data`]: super::parse_data
pub fn table_to_csv(doc: &Document, table: NodeId) -> String {
    doc.descendants(table)
        .into_iter()
        .filter(|&n| doc.tag(n) == Some("tr"))
        .map(|row| {
            doc.element_children(row)
                .into_iter()
                .filter(|&c| matches!(doc.tag(c), Some("td") | Some("th")))
                .map(|c| doc.text_content(c))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
