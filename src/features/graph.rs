//! `graph`: node-link diagram from an edge list
//!
//! One edge per line, `A--B` or `A-(3)-B` for a weighted edge. Any number of
//! dashes may be used on either side of the weight.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::json;

use crate::core::registry::{Options, Render, RenderContext};
use crate::core::table::RawBlock;
use crate::data::palette::nominal_colors;
use crate::utils::error::RenderError;

use super::append_payload;

lazy_static! {
    static ref EDGE_PATTERN: Regex = Regex::new(r"^(.+?)-+(?:\((-?\d+)\)-+)?(.+)$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub name: String,
    pub group: usize,
}

/// Edge between node indices
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphLink {
    pub source: usize,
    pub target: usize,
    pub value: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
    pub group_length: usize,
}

/// Parse an edge list
///
/// Nodes are numbered in order of first appearance. Blank lines are skipped;
/// any other line that is not an edge is an error.
pub fn parse_graph(raw: &str) -> Result<Graph, RenderError> {
    let mut index: IndexMap<String, usize> = IndexMap::new();
    let mut links = Vec::new();

    for (lineno, line) in raw.trim().lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let caps = EDGE_PATTERN.captures(line).ok_or_else(|| {
            RenderError::invalid_data(format!(
                "line {}: expected 'A--B' or 'A-(weight)-B', got '{}'",
                lineno + 1,
                line
            ))
        })?;

        let from = caps[1].trim();
        let to = caps[3].trim();
        let value = match caps.get(2) {
            Some(m) => m
                .as_str()
                .parse::<i64>()
                .map_err(|e| RenderError::invalid_data(format!("line {}: {}", lineno + 1, e)))?,
            None => 1,
        };

        let next = index.len();
        let source = *index.entry(from.to_string()).or_insert(next);
        let next = index.len();
        let target = *index.entry(to.to_string()).or_insert(next);
        links.push(GraphLink {
            source,
            target,
            value,
        });
    }

    let nodes = index
        .into_keys()
        .map(|name| GraphNode { name, group: 0 })
        .collect();
    Ok(Graph {
        nodes,
        links,
        group_length: 1,
    })
}

/// Renders a `div.dviz-graph` placeholder with the parsed graph, node colors
/// and options as its payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphCommand;

impl Render for GraphCommand {
    fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        data: &RawBlock,
        options: &Options,
    ) -> Result<(), RenderError> {
        let text = data
            .as_text()
            .ok_or_else(|| RenderError::invalid_data("graph expects an edge list"))?;
        let graph = parse_graph(text)?;
        if graph.nodes.is_empty() {
            return Err(RenderError::invalid_data("graph has no edges"));
        }

        let payload = json!({
            "colors": nominal_colors(graph.group_length),
            "graph": graph,
            "options": options,
        });
        append_payload(ctx.doc, ctx.container, "dviz-graph", None, &payload);
        Ok(())
    }
}
