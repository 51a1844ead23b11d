//! # dviz
//!
//! Declarative charts for documents. Authors annotate inline code spans with
//! commands such as `` `1,3,2(@sparkline)` `` or `` `(@line {title: 'Sales'})` ``
//! and dviz replaces each annotation with a rendered chart.
//!
//! ## Features
//!
//! - **Command grammar**: `DATA(@name OPTIONS)` in code spans of a content region
//! - **Front ends**: Markdown, or a complete HTML page
//! - **Data sources**: inline values, the preceding table, or the preceding paragraph
//! - **Built-in commands**: grid layout, scatter, scatter matrix, bar/line/column/area/table/stepped-area charts, graphs, sparklines
//! - **Library barrier**: required client libraries are resolved and loaded before any command runs
//! - **Extensible**: register your own render functions and libraries
//!
//! Sparklines and layouts are drawn in place. Every other chart is emitted as
//! a placeholder `div` plus a JSON payload for a client-side script to draw;
//! that script is not part of this crate.
//!
//! Runs are async and expect a tokio runtime. With a load timeout configured
//! (the default) the runtime must have its time driver enabled.
//!
//! ## Usage Examples
//!
//! ### Markdown to HTML
//!
//! ```rust
//! use dviz::{render_markdown, Dviz};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let html = render_markdown("Trend: `1,3,2(@sparkline)`", &Dviz::new()).await.unwrap();
//! assert!(html.contains("class=\"dviz sparkline\""));
//! # });
//! ```
//!
//! ### Custom Commands
//!
//! ```rust
//! use dviz::{Dviz, Loader, Options, RawBlock, Registry, RenderContext, RenderError, RunOptions};
//! use std::sync::Arc;
//!
//! fn shout(ctx: &mut RenderContext<'_>, data: &RawBlock, _: &Options) -> Result<(), RenderError> {
//!     let text = data.as_text().unwrap_or("").to_uppercase();
//!     ctx.doc.append_text(ctx.container, text);
//!     Ok(())
//! }
//!
//! let mut registry = Registry::with_builtins();
//! registry.register("shout", shout, Vec::<String>::new());
//! let dviz = Dviz::with_parts(Arc::new(registry), Loader::with_builtins(), RunOptions::default());
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let html = dviz::render_markdown("`hey(@shout)`", &dviz).await.unwrap();
//! assert_eq!(html, "<div class=\"dviz-content\"><p><span>HEY</span></p></div>");
//! # });
//! ```

/// Core pipeline: parsing, scanning, loading, dispatching
pub mod core;

/// Data layer - static tables and constants
pub mod data;

/// Document tree, selectors, Markdown front end and HTML output
pub mod document;

/// Built-in commands
pub mod features;

/// Utility modules
pub mod utils;

// Re-export the pipeline
pub use core::{
    render_html, render_markdown, render_markdown_standalone, CommandMatch, Dviz, FailurePolicy, Library,
    Loader, Options, Registry, Render, RenderContext, RunOptions, RunReport,
};
pub use core::table::{parse_data, Cell, ParsedTable, RawBlock};

// Re-export the document model
pub use document::{from_html, from_markdown, Document, NodeId, Selector};

// Re-export utilities
pub use utils::error::{DvizError, DvizResult, LoadError, RenderError};
pub use utils::literal::{parse_literal, LiteralError};
