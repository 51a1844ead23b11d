//! `layout`: grid of the elements that follow the annotation

use tracing::debug;

use crate::core::registry::{Options, Render, RenderContext};
use crate::core::table::{coerce_number, RawBlock};
use crate::data::charts::{span_class, GRID_COLUMNS};
use crate::utils::error::RenderError;

/// Upper bound on `cols * rows`; a full 12 x 12 grid
pub const MAX_LAYOUT_CELLS: usize = GRID_COLUMNS * GRID_COLUMNS;

/// Grid shape parsed from `cols,rows[,repeat]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpec {
    pub cols: usize,
    pub rows: usize,
    /// Elements moved into each cell
    pub repeat: usize,
}

impl GridSpec {
    pub fn parse(text: &str) -> Result<Self, RenderError> {
        let tokens: Vec<&str> = text.split(',').collect();
        let cols = count(tokens.first().copied(), "cols", 1)?;
        let rows = count(tokens.get(1).copied(), "rows", 1)?;
        let repeat = match tokens.get(2).copied() {
            Some(token) => count(Some(token), "repeat", 0)?,
            None => 1,
        };
        if cols > GRID_COLUMNS {
            return Err(RenderError::invalid_data(format!(
                "layout cols must be at most {}, got {}",
                GRID_COLUMNS, cols
            )));
        }
        match cols.checked_mul(rows) {
            Some(cells) if cells <= MAX_LAYOUT_CELLS => Ok(GridSpec { cols, rows, repeat }),
            _ => Err(RenderError::invalid_data(format!(
                "layout is limited to {} cells, got {} x {}",
                MAX_LAYOUT_CELLS, cols, rows
            ))),
        }
    }
}

fn count(token: Option<&str>, what: &str, min: usize) -> Result<usize, RenderError> {
    let token = token.ok_or_else(|| RenderError::invalid_data(format!("layout is missing {}", what)))?;
    let value = coerce_number(token);
    if !value.is_finite() || value < min as f64 {
        return Err(RenderError::invalid_data(format!(
            "layout {} must be a number >= {}, got '{}'",
            what,
            min,
            token.trim()
        )));
    }
    Ok(value.floor() as usize)
}

/// Builds `rows` x `cols` grid cells inside the container and fills them, in
/// row-major order, with the elements following the annotation's parent
///
/// Cells get a `spanN` class sized for a 12-column grid; rows are
/// `row-fluid`. Grids are capped at [`GRID_COLUMNS`] columns and
/// [`MAX_LAYOUT_CELLS`] cells. When the document runs out of elements, the
/// remaining cells stay empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Layout;

impl Render for Layout {
    fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        data: &RawBlock,
        _options: &Options,
    ) -> Result<(), RenderError> {
        let text = data
            .as_text()
            .ok_or_else(|| RenderError::invalid_data("layout expects 'cols,rows,repeat' text"))?;
        let spec = GridSpec::parse(text)?;

        let doc = &mut *ctx.doc;
        let anchor = doc
            .parent(ctx.container)
            .ok_or_else(|| RenderError::layout("container is not attached"))?;

        let layout = doc.create_element("div");
        let cell_class = span_class(spec.cols);
        let mut exhausted = false;
        for _ in 0..spec.rows {
            let row = doc.append_element(layout, "div");
            doc.add_class(row, "row-fluid");
            for _ in 0..spec.cols {
                let col = doc.append_element(row, "div");
                doc.add_class(col, &cell_class);
                for _ in 0..spec.repeat {
                    if exhausted {
                        break;
                    }
                    match doc.next_element_sibling(anchor) {
                        Some(next) => doc.append_child(col, next),
                        None => {
                            debug!("layout ran out of elements to place");
                            exhausted = true;
                        }
                    }
                }
            }
        }
        doc.append_child(ctx.container, layout);
        Ok(())
    }
}
