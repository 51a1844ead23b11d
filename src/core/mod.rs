//! Core pipeline
//!
//! This module contains the stages of a run:
//! - `table`: data block parsing and table extraction
//! - `scanner`: finds `DATA(@name OPTIONS)` annotations
//! - `registry`: command name to render function
//! - `loader`: dependency resolution and the library load barrier
//! - `dispatcher`: per-annotation rendering
//! - `runner`: ties the stages together

pub mod dispatcher;
pub mod loader;
pub mod options;
pub mod registry;
pub mod runner;
pub mod scanner;
pub mod table;

// Re-export main types and functions
pub use dispatcher::{CommandFailure, Dispatcher, RunReport};
pub use loader::{
    builtin_libraries, resolve, DependencySet, Library, LoadReport, LoadState, Loader,
    ResourceFetcher, ScriptInjector, ScriptTag, SharedState,
};
pub use options::{FailurePolicy, RunOptions};
pub use registry::{Options, Registry, Render, RenderContext};
pub use runner::{
    markdown_document, render_html, render_markdown, render_markdown_standalone, Dviz,
};
pub use scanner::{match_command, scan, CommandMatch, ScanOptions};
