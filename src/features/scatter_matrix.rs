//! `scattermatrix`: pairwise scatter plots of every column

use serde_json::{json, Value};

use crate::core::registry::{Options, Render, RenderContext};
use crate::core::table::{parse_data, Cell, RawBlock};
use crate::data::charts::{span_class, SCATTER_CHART};
use crate::data::palette::nominal_colors;
use crate::utils::error::RenderError;

use super::charts::CHART_CLASS;
use super::{append_payload, merge_options};

/// An `n` x `n` grid for `n` columns
///
/// The diagonal holds the column labels. Each lower-triangle cell at row `i`,
/// column `j` (`j < i`) plots column `j` against column `i` over every data
/// row. The upper triangle stays empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScatterMatrix;

fn cell_defaults() -> Options {
    let mut defaults = Options::new();
    defaults.insert("colors".into(), json!(nominal_colors(1)));
    defaults.insert("pointSize".into(), Value::from(3));
    defaults.insert(
        "chartArea".into(),
        json!({"left": 0, "top": 0, "width": "100%", "height": "100%"}),
    );
    defaults.insert("legend".into(), Value::from("none"));
    defaults
}

fn value_at(row: &[Cell], col: usize) -> Value {
    row.get(col).map_or(Value::Null, Cell::to_json)
}

impl Render for ScatterMatrix {
    fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        data: &RawBlock,
        options: &Options,
    ) -> Result<(), RenderError> {
        let rows = parse_data(data, true, false).to_rows();
        let labels: Vec<String> = rows
            .first()
            .map(|header| header.iter().map(Cell::label).collect())
            .unwrap_or_default();
        let size = labels.len();
        if size == 0 {
            return Err(RenderError::invalid_data("scatter matrix needs a header row"));
        }
        let cell_options = merge_options(cell_defaults(), options);

        let doc = &mut *ctx.doc;
        let root = doc.append_element(ctx.container, "div");
        doc.add_class(root, "dviz-scattermatrix");

        let col_class = span_class(size);
        let mut grid = Vec::with_capacity(size);
        for (ri, label) in labels.iter().enumerate() {
            let row = doc.append_element(root, "div");
            doc.add_class(row, "row-fluid");
            let mut cells = Vec::with_capacity(size);
            for ci in 0..size {
                let col = doc.append_element(row, "div");
                doc.add_class(col, &col_class);
                if ri == ci {
                    doc.set_attr(col, "style", "text-align: left; position: relative");
                    let span = doc.append_element(col, "span");
                    doc.set_attr(span, "style", "position: absolute; bottom: 0; font-size: 12px");
                    doc.append_text(span, label.as_str());
                }
                cells.push(col);
            }
            grid.push(cells);
        }

        for ri in 0..size {
            for ci in ri + 1..size {
                let mut values = vec![json!([labels[ri], labels[ci]])];
                values.extend(
                    rows.iter()
                        .skip(1)
                        .map(|row| json!([value_at(row, ri), value_at(row, ci)])),
                );
                let payload = json!({"data": values, "options": cell_options});
                append_payload(doc, grid[ci][ri], CHART_CLASS, Some(SCATTER_CHART), &payload);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, NodeId};
    use pretty_assertions::assert_eq;

    fn render(data: &str) -> Result<(Document, NodeId), RenderError> {
        let mut doc = Document::new();
        let container = doc.append_element(doc.root(), "div");
        let mut ctx = RenderContext {
            doc: &mut doc,
            container,
            command: "scattermatrix",
        };
        ScatterMatrix.render(&mut ctx, &RawBlock::from(data), &Options::new())?;
        Ok((doc, container))
    }

    #[test]
    fn test_grid_shape_and_labels() {
        let (doc, container) = render("a, b, c\n1, 2, 3\n4, 5, 6").unwrap();
        let root = doc.find_first(container, "div").unwrap();
        let rows = doc.element_children(root);
        assert_eq!(rows.len(), 3);

        for (ri, &row) in rows.iter().enumerate() {
            let cells = doc.element_children(row);
            assert_eq!(cells.len(), 3);
            assert!(cells.iter().all(|&c| doc.has_class(c, "span4")));
            for (ci, &cell) in cells.iter().enumerate() {
                let has_chart = doc.find_first(cell, "script").is_some();
                assert_eq!(has_chart, ci < ri, "cell ({}, {})", ri, ci);
            }
        }
        let diagonal: Vec<_> = rows
            .iter()
            .enumerate()
            .map(|(i, &row)| doc.text_content(doc.element_children(row)[i]))
            .collect();
        assert_eq!(diagonal, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cell_uses_every_data_row() {
        let (doc, container) = render("a, b\n1, 2\n3, 4\n5, 6").unwrap();
        let script = doc.find_first(container, "script").unwrap();
        let payload: Value = serde_json::from_str(&doc.text_content(script)).unwrap();
        assert_eq!(payload["data"], json!([["a", "b"], [1, 2], [3, 4], [5, 6]]));
        assert_eq!(payload["options"]["legend"], json!("none"));
    }

    #[test]
    fn test_empty_is_invalid() {
        assert!(matches!(render(""), Err(RenderError::InvalidData(_))));
    }
}
