//! Built-in commands
//!
//! Each command is a type implementing [`Render`]. Chart commands do not draw
//! anything themselves: they emit a placeholder element carrying the chart
//! class, the data and the merged options as an embedded JSON payload, which
//! the client-side library picks up once it is loaded.
//!
//! | Command | Libraries |
//! |---------|-----------|
//! | `layout` | none |
//! | `scatter`, `scattermatrix` | `google-viz` |
//! | `bar`, `line`, `column`, `area`, `table`, `steppedarea` | `google-viz` |
//! | `graph` | `d3`, `opt_graph` |
//! | `sparkline` | `d3` |
//!
//! [`Render`]: crate::core::registry::Render

pub mod charts;
pub mod graph;
pub mod layout;
pub mod scatter_matrix;
pub mod sparkline;

use serde_json::Value;

use crate::core::registry::{Options, Registry};
use crate::core::table::Cell;
use crate::data::charts::CORE_CHARTS;
use crate::data::libraries::{D3, GOOGLE_VIZ, OPT_GRAPH};
use crate::document::{Document, NodeId};

pub use charts::{CoreChart, Scatter};
pub use graph::{parse_graph, Graph, GraphCommand, GraphLink, GraphNode};
pub use layout::Layout;
pub use scatter_matrix::ScatterMatrix;
pub use sparkline::Sparkline;

/// Register every built-in command
pub fn register_builtins(registry: &mut Registry) {
    registry
        .register("layout", Layout, Vec::<String>::new())
        .register("scatter", Scatter, [GOOGLE_VIZ])
        .register("scattermatrix", ScatterMatrix, [GOOGLE_VIZ])
        .register("graph", GraphCommand, [D3, OPT_GRAPH])
        .register("sparkline", Sparkline, [D3]);

    for (&name, &class) in CORE_CHARTS.entries() {
        registry.register(name, CoreChart::new(class), [GOOGLE_VIZ]);
    }
}

/// Shallow merge: user keys replace default keys wholesale
pub(crate) fn merge_options(mut defaults: Options, user: &Options) -> Options {
    for (key, value) in user {
        defaults.insert(key.clone(), value.clone());
    }
    defaults
}

pub(crate) fn rows_to_json(rows: &[Vec<Cell>]) -> Value {
    Value::Array(
        rows.iter()
            .map(|row| Value::Array(row.iter().map(Cell::to_json).collect()))
            .collect(),
    )
}

/// Append a placeholder `div` with an embedded JSON payload
///
/// The placeholder stays empty in the output. Drawing it is left to a page
/// script that reads the payload, which dviz does not provide.
pub(crate) fn append_payload(
    doc: &mut Document,
    parent: NodeId,
    class: &str,
    chart: Option<&str>,
    payload: &Value,
) -> NodeId {
    let div = doc.append_element(parent, "div");
    doc.set_attr(div, "class", class);
    if let Some(chart) = chart {
        doc.set_attr(div, "data-chart", chart);
    }
    let script = doc.append_element(div, "script");
    doc.set_attr(script, "type", "application/json");
    // Script content is not escaped on output
    doc.append_text(script, payload.to_string().replace("</", "<\\/"));
    div
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_is_shallow() {
        let defaults = json!({"pointSize": 3, "hAxis": {"title": "x", "gridlines": 2}});
        let user = json!({"hAxis": {"title": "y"}, "legend": "none"});
        let merged = merge_options(
            defaults.as_object().unwrap().clone(),
            user.as_object().unwrap(),
        );
        assert_eq!(
            Value::Object(merged),
            json!({"pointSize": 3, "hAxis": {"title": "y"}, "legend": "none"})
        );
    }

    #[test]
    fn test_payload_cannot_close_script() {
        let mut doc = Document::new();
        let root = doc.root();
        append_payload(&mut doc, root, "dviz-chart", Some("Table"), &json!(["</script>"]));
        assert_eq!(
            doc.to_html(),
            "<div class=\"dviz-chart\" data-chart=\"Table\"><script type=\"application/json\">[\"<\\/script>\"]</script></div>"
        );
    }
}
