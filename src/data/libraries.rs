//! Built-in external library identifiers and resources

use phf::phf_map;

pub const D3: &str = "d3";
pub const GOOGLE_VIZ: &str = "google-viz";
pub const OPT_GRAPH: &str = "opt_graph";

/// Library identifier to script URL
pub static LIBRARY_URLS: phf::Map<&'static str, &'static str> = phf_map! {
    "d3" => "http://d3js.org/d3.v2.min.js",
    "google-viz" => "https://www.google.com/jsapi",
    "opt_graph" => "http://akngs.github.com/dviz/js/opt_graph.js",
};

/// Secondary initialization the Google loader needs once its script is present
pub const GOOGLE_VIZ_BOOTSTRAP: &str =
    "google.load('visualization', '1.0', {'packages': ['corechart', 'table']});";

#[inline]
pub fn library_url(id: &str) -> Option<&'static str> {
    LIBRARY_URLS.get(id).copied()
}
