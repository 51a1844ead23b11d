//! Render function registry
//!
//! Maps a command name to the render function that handles it and the
//! external libraries it needs. The registry is a plain value: build one,
//! register commands, then share it read-only across runs.

use std::sync::Arc;

use fxhash::FxHashMap;
use serde_json::{Map, Value};

use crate::core::table::RawBlock;
use crate::document::{Document, NodeId};
use crate::utils::error::RenderError;

/// Options handed to a render function (always a JSON object)
pub type Options = Map<String, Value>;

/// What a render function gets to work with
pub struct RenderContext<'a> {
    /// The document being processed
    pub doc: &'a mut Document,
    /// Freshly inserted wrapper the function renders into
    pub container: NodeId,
    /// Name of the command being rendered
    pub command: &'a str,
}

/// A render function
///
/// Implementations parse `data` with whatever header flags they need and
/// write their output under `ctx.container`. They may also rearrange the
/// surrounding document (the grid layout does).
pub trait Render: Send + Sync {
    fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        data: &RawBlock,
        options: &Options,
    ) -> Result<(), RenderError>;
}

impl<F> Render for F
where
    F: Fn(&mut RenderContext<'_>, &RawBlock, &Options) -> Result<(), RenderError> + Send + Sync,
{
    fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        data: &RawBlock,
        options: &Options,
    ) -> Result<(), RenderError> {
        self(ctx, data, options)
    }
}

#[derive(Clone)]
struct Registration {
    render: Arc<dyn Render>,
    requires: Vec<String>,
}

/// Command name to render function and required libraries
#[derive(Clone, Default)]
pub struct Registry {
    entries: FxHashMap<String, Registration>,
}

impl Registry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in command registered
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::features::register_builtins(&mut registry);
        registry
    }

    /// Register (or replace) a command
    pub fn register<R, I, S>(&mut self, name: &str, render: R, requires: I) -> &mut Self
    where
        R: Render + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.insert(
            name.to_string(),
            Registration {
                render: Arc::new(render),
                requires: requires.into_iter().map(Into::into).collect(),
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Render>> {
        self.entries.get(name).map(|r| Arc::clone(&r.render))
    }

    /// Libraries a command declared; empty for unknown commands
    pub fn requires(&self, name: &str) -> &[String] {
        self.entries
            .get(name)
            .map(|r| r.requires.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered command names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("commands", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut RenderContext<'_>, _: &RawBlock, _: &Options) -> Result<(), RenderError> {
        Ok(())
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = Registry::new();
        registry
            .register("noop", noop, Vec::<String>::new())
            .register("chart", noop, ["d3", "google-viz"]);

        assert!(registry.contains("noop"));
        assert!(registry.get("chart").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.requires("chart"), ["d3", "google-viz"]);
        assert!(registry.requires("missing").is_empty());
        assert_eq!(registry.names(), vec!["chart", "noop"]);
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = Registry::new();
        registry.register("x", noop, ["d3"]);
        registry.register("x", noop, Vec::<String>::new());
        assert_eq!(registry.len(), 1);
        assert!(registry.requires("x").is_empty());
    }

    fn hello(ctx: &mut RenderContext<'_>, _: &RawBlock, _: &Options) -> Result<(), RenderError> {
        ctx.doc.append_text(ctx.container, "hi");
        Ok(())
    }

    #[test]
    fn test_function_render() {
        let mut registry = Registry::new();
        registry.register("hello", hello, Vec::<String>::new());

        let mut doc = Document::new();
        let container = doc.append_element(doc.root(), "span");
        let render = registry.get("hello").unwrap();
        let mut ctx = RenderContext {
            doc: &mut doc,
            container,
            command: "hello",
        };
        render
            .render(&mut ctx, &RawBlock::from(""), &Options::new())
            .unwrap();
        assert_eq!(doc.text_content(container), "hi");
    }

    #[test]
    fn test_builtins() {
        let registry = Registry::with_builtins();
        for name in [
            "layout",
            "scatter",
            "scattermatrix",
            "bar",
            "line",
            "column",
            "area",
            "table",
            "steppedarea",
            "graph",
            "sparkline",
        ] {
            assert!(registry.contains(name), "missing builtin {}", name);
        }
        assert!(registry.requires("layout").is_empty());
        assert_eq!(registry.requires("graph"), ["d3", "opt_graph"]);
    }
}
