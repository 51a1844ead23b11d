//! `sparkline`: word-sized line chart as inline SVG

use crate::core::registry::{Options, Render, RenderContext};
use crate::core::table::{array_max, array_min, format_number, parse_data, RawBlock};
use crate::document::{Document, NodeId};
use crate::utils::error::RenderError;

/// Horizontal distance between points, in px
pub const X_STEP: f64 = 10.0;
/// SVG height, in px
pub const HEIGHT: f64 = 20.0;
/// Vertical margin kept free above and below the line, in px
pub const MARGIN_Y: f64 = 4.0;

/// One segment between consecutive values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub x1: f64,
    pub x2: f64,
    pub y1: f64,
    pub y2: f64,
}

/// Segment geometry for `values`
///
/// The minimum maps to the bottom margin and the maximum to the top margin.
/// A flat series sits on the bottom margin. Segments touching a non-numeric
/// value are dropped; the x positions of the rest are unaffected.
pub fn layout_segments(values: &[f64]) -> Vec<Segment> {
    let (Some(min), Some(max)) = (array_min(values), array_max(values)) else {
        return Vec::new();
    };
    let bottom = HEIGHT - MARGIN_Y;
    let top = MARGIN_Y;
    let scale_y = |v: f64| {
        let t = if max > min { (v - min) / (max - min) } else { 0.0 };
        bottom + t * (top - bottom)
    };

    values
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[0].is_finite() && pair[1].is_finite())
        .map(|(i, pair)| Segment {
            x1: X_STEP * i as f64,
            x2: X_STEP * (i + 1) as f64,
            y1: scale_y(pair[0]),
            y2: scale_y(pair[1]),
        })
        .collect()
}

fn coord(v: f64) -> String {
    format_number((v * 100.0).round() / 100.0)
}

/// Append the sparkline `svg` for `values` under `parent`
pub fn append_sparkline(doc: &mut Document, parent: NodeId, values: &[f64]) -> NodeId {
    let width = X_STEP * values.len().saturating_sub(1) as f64;
    let svg = doc.append_element(parent, "svg");
    doc.set_attr(svg, "width", format!("{}px", coord(width)));
    doc.set_attr(svg, "height", format!("{}px", coord(HEIGHT)));
    doc.set_attr(svg, "class", "dviz sparkline");

    for seg in layout_segments(values) {
        let line = doc.append_element(svg, "line");
        doc.set_attr(line, "x1", coord(seg.x1));
        doc.set_attr(line, "x2", coord(seg.x2));
        doc.set_attr(line, "y1", coord(seg.y1));
        doc.set_attr(line, "y2", coord(seg.y2));
    }
    svg
}

/// Draws the data (no headers, all rows flattened) as an SVG sparkline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sparkline;

impl Render for Sparkline {
    fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        data: &RawBlock,
        _options: &Options,
    ) -> Result<(), RenderError> {
        let values = parse_data(data, false, false).to_numbers();
        append_sparkline(ctx.doc, ctx.container, &values);
        Ok(())
    }
}
