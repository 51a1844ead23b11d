//! Data layer - Static mappings and constants
//!
//! This module contains all static data used by the built-in commands:
//! - Nominal color schemes
//! - Chart command to chart class mappings
//! - Built-in library identifiers and URLs

pub mod charts;
pub mod libraries;
pub mod palette;

// Re-export commonly used items
pub use charts::{chart_class, span_class, CORE_CHARTS, GRID_COLUMNS, SCATTER_CHART};
pub use libraries::{library_url, D3, GOOGLE_VIZ, GOOGLE_VIZ_BOOTSTRAP, LIBRARY_URLS, OPT_GRAPH};
pub use palette::{nominal_colors, CATEGORY20};
