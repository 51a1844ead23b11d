//! Google Visualization charts: the shared adapter and `scatter`

use serde_json::{json, Value};

use crate::core::registry::{Options, Render, RenderContext};
use crate::core::table::{parse_data, RawBlock};
use crate::data::charts::SCATTER_CHART;
use crate::data::palette::nominal_colors;
use crate::utils::error::RenderError;

use super::{append_payload, merge_options, rows_to_json};

/// Class of the placeholder element every chart renders
pub const CHART_CLASS: &str = "dviz-chart";

/// Shared adapter for `bar`, `line`, `column`, `area`, `table` and `steppedarea`
///
/// The first row holds series labels and the first column category labels.
/// Default options: one nominal color per series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreChart {
    class: &'static str,
}

impl CoreChart {
    pub const fn new(class: &'static str) -> Self {
        CoreChart { class }
    }

    /// Chart class this adapter emits (e.g. `LineChart`)
    pub fn class(&self) -> &'static str {
        self.class
    }
}

impl Render for CoreChart {
    fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        data: &RawBlock,
        options: &Options,
    ) -> Result<(), RenderError> {
        let table = parse_data(data, true, true);
        if table.is_empty() {
            return Err(RenderError::invalid_data("chart needs at least a header row"));
        }
        let rows = table.to_rows();
        let series = rows.first().map_or(0, Vec::len).saturating_sub(1);

        let mut defaults = Options::new();
        defaults.insert("colors".into(), json!(nominal_colors(series)));
        let options = merge_options(defaults, options);

        let payload = json!({"data": rows_to_json(&rows), "options": options});
        append_payload(ctx.doc, ctx.container, CHART_CLASS, Some(self.class), &payload);
        Ok(())
    }
}

/// `scatter`: first column is x, remaining columns are y series
///
/// Default options: nominal colors, `pointSize: 3`, and the first column's
/// label as the horizontal axis title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scatter;

impl Render for Scatter {
    fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        data: &RawBlock,
        options: &Options,
    ) -> Result<(), RenderError> {
        let table = parse_data(data, true, false);
        if table.is_empty() {
            return Err(RenderError::invalid_data("scatter needs at least a header row"));
        }
        let rows = table.to_rows();
        let header = rows.first().cloned().unwrap_or_default();
        let x_label = header.first().map(|c| c.label()).unwrap_or_default();

        let mut defaults = Options::new();
        defaults.insert(
            "colors".into(),
            json!(nominal_colors(header.len().saturating_sub(1))),
        );
        defaults.insert("pointSize".into(), Value::from(3));
        defaults.insert("hAxis".into(), json!({ "title": x_label }));
        let options = merge_options(defaults, options);

        let payload = json!({"data": rows_to_json(&rows), "options": options});
        append_payload(ctx.doc, ctx.container, CHART_CLASS, Some(SCATTER_CHART), &payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use pretty_assertions::assert_eq;

    fn payload(doc: &Document, container: crate::document::NodeId) -> Value {
        let script = doc.find_first(container, "script").unwrap();
        serde_json::from_str(&doc.text_content(script)).unwrap()
    }

    fn render(
        chart: &dyn Render,
        data: &str,
        options: Value,
    ) -> Result<(Document, crate::document::NodeId), RenderError> {
        let mut doc = Document::new();
        let container = doc.append_element(doc.root(), "span");
        let options = options.as_object().cloned().unwrap_or_default();
        let mut ctx = RenderContext {
            doc: &mut doc,
            container,
            command: "test",
        };
        chart.render(&mut ctx, &RawBlock::from(data), &options)?;
        Ok((doc, container))
    }

    #[test]
    fn test_core_chart_payload() {
        let (doc, container) = render(
            &CoreChart::new("LineChart"),
            "x, a, b\n2001, 1, 2\n2002, 3, 4",
            json!({"title": "Sales"}),
        )
        .unwrap();

        let chart = doc.find_first(container, "div").unwrap();
        assert_eq!(doc.attr(chart, "class"), Some("dviz-chart"));
        assert_eq!(doc.attr(chart, "data-chart"), Some("LineChart"));
        assert_eq!(
            payload(&doc, container),
            json!({
                "data": [["x", "a", "b"], ["2001", 1, 2], ["2002", 3, 4]],
                "options": {"colors": ["#555", "#999"], "title": "Sales"}
            })
        );
    }

    #[test]
    fn test_core_chart_user_colors_win() {
        let (doc, container) = render(
            &CoreChart::new("BarChart"),
            "x, a\nq1, 5",
            json!({"colors": ["red"]}),
        )
        .unwrap();
        assert_eq!(payload(&doc, container)["options"]["colors"], json!(["red"]));
    }

    #[test]
    fn test_core_chart_rejects_empty() {
        let err = render(&CoreChart::new("Table"), "  ", json!({})).unwrap_err();
        assert!(matches!(err, RenderError::InvalidData(_)));
    }

    #[test]
    fn test_scatter_defaults() {
        let (doc, container) = render(
            &Scatter,
            "height, weight, age\n170, 65, 30\n180, 80, 40",
            json!({"pointSize": 5}),
        )
        .unwrap();

        let chart = doc.find_first(container, "div").unwrap();
        assert_eq!(doc.attr(chart, "data-chart"), Some("ScatterChart"));
        let value = payload(&doc, container);
        assert_eq!(value["data"][1], json!([170, 65, 30]));
        assert_eq!(value["options"]["pointSize"], json!(5));
        assert_eq!(value["options"]["hAxis"], json!({"title": "height"}));
        assert_eq!(value["options"]["colors"], json!(["#555", "#999"]));
    }
}
