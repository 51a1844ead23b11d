//! Nominal color schemes for categorical series

/// Single-series color
pub const SINGLE_SERIES: &str = "#555";

/// Two-series colors
pub const TWO_SERIES: [&str; 2] = ["#555", "#999"];

/// d3's category20 scheme, used for three or more series
pub const CATEGORY20: [&str; 20] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf", "#aec7e8", "#ffbb78", "#98df8a", "#ff9896", "#c5b0d5", "#c49c94",
    "#f7b6d2", "#c7c7c7", "#dbdb8d", "#9edae5",
];

/// CSS colors for `count` nominal categories
///
/// One or two categories get neutral grays; anything more gets the full
/// category20 list regardless of `count`.
pub fn nominal_colors(count: usize) -> Vec<&'static str> {
    match count {
        0 | 1 => vec![SINGLE_SERIES],
        2 => TWO_SERIES.to_vec(),
        _ => CATEGORY20.to_vec(),
    }
}
