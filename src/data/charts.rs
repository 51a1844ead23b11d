//! Chart command tables

use phf::phf_map;

/// Command name to Google Visualization chart class for the shared chart adapter
pub static CORE_CHARTS: phf::Map<&'static str, &'static str> = phf_map! {
    "bar" => "BarChart",
    "line" => "LineChart",
    "column" => "ColumnChart",
    "area" => "AreaChart",
    "table" => "Table",
    "steppedarea" => "SteppedAreaChart",
};

/// Chart class used by `scatter` and each `scattermatrix` cell
pub const SCATTER_CHART: &str = "ScatterChart";

/// Bootstrap grid width used by layout and scatter matrix cells
pub const GRID_COLUMNS: usize = 12;

/// Look up the chart class for a shared-adapter command
#[inline]
pub fn chart_class(command: &str) -> Option<&'static str> {
    CORE_CHARTS.get(command).copied()
}

/// `spanN` class for one of `count` equal grid columns
pub fn span_class(count: usize) -> String {
    format!("span{}", GRID_COLUMNS / count.max(1))
}
