//! Top-level run: scan, load, dispatch

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::core::dispatcher::{Dispatcher, RunReport};
use crate::core::loader::{inject_scripts, resolve, LoadState, Loader, SharedState};
use crate::core::options::RunOptions;
use crate::core::registry::Registry;
use crate::core::scanner::{scan, ScanOptions};
use crate::document::{from_html, markdown, Document, NodeId};
use crate::utils::error::DvizResult;

/// Class of the region [`render_markdown`] wraps its content in
pub const CONTENT_CLASS: &str = "dviz-content";

/// A configured processor
///
/// Holds the command registry, the library loader and the run options. A
/// `Dviz` can run any number of documents, one at a time per document.
#[derive(Debug, Clone)]
pub struct Dviz {
    registry: Arc<Registry>,
    loader: Loader,
    options: RunOptions,
}

impl Default for Dviz {
    fn default() -> Self {
        Self::new()
    }
}

impl Dviz {
    /// Built-in commands and libraries with default options
    pub fn new() -> Self {
        Self::with_options(RunOptions::default())
    }

    pub fn with_options(options: RunOptions) -> Self {
        Self::with_parts(
            Arc::new(Registry::with_builtins()),
            Loader::with_builtins(),
            options,
        )
    }

    /// Assemble from explicit parts; the loader timeout follows `options`
    pub fn with_parts(registry: Arc<Registry>, mut loader: Loader, options: RunOptions) -> Self {
        loader.set_timeout(options.load_timeout());
        Dviz {
            registry,
            loader,
            options,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Process every annotation in `doc`
    ///
    /// Dispatch starts only after all required libraries are ready. Scripts
    /// the loader asked for are written into `<head>` when the document has
    /// one, else at the top of the first content region.
    ///
    /// Must be awaited inside a tokio runtime. When a load timeout is set the
    /// runtime needs its time driver (`enable_time` or `enable_all`), or the
    /// timer panics on first use.
    pub async fn run(&self, doc: &mut Document) -> DvizResult<RunReport> {
        let scan_options = self.options.scan_options()?;
        let matches = scan(doc, &scan_options);
        let deps = resolve(&matches, &self.registry);
        debug!(
            commands = matches.len(),
            libraries = deps.len(),
            "scanned document"
        );

        let state: SharedState = Arc::new(Mutex::new(LoadState::from_document(doc)));
        let load = self.loader.ensure_loaded(&deps, &state).await?;

        let dispatched =
            Dispatcher::new(&self.registry, self.options.failure_policy).run(doc, matches);

        // Earlier renders survive an aborted batch and still need their libraries
        let scripts = state.lock().take_injected();
        if !scripts.is_empty() {
            let target = script_target(doc, &scan_options);
            inject_scripts(doc, target, &scripts);
        }

        let mut report = dispatched?;
        report.fetched_libraries = load.fetched;
        info!(
            rendered = report.rendered,
            skipped = report.skipped,
            failed = report.failures.len(),
            "dviz run complete"
        );
        Ok(report)
    }
}

fn script_target(doc: &Document, scan_options: &ScanOptions) -> NodeId {
    let root = doc.root();
    doc.find_first(root, "head")
        .or_else(|| scan_options.content.select(doc, root).into_iter().next())
        .unwrap_or(root)
}

/// Build a document holding `markdown` inside a `div.dviz-content` region
///
/// With `standalone`, the region sits in a full `html`/`head`/`body` skeleton.
pub fn markdown_document(markdown_text: &str, standalone: bool) -> Document {
    let mut doc = Document::new();
    let parent = if standalone {
        let html = doc.append_element(doc.root(), "html");
        let head = doc.append_element(html, "head");
        let meta = doc.append_element(head, "meta");
        doc.set_attr(meta, "charset", "utf-8");
        doc.append_element(head, "title");
        doc.append_element(html, "body")
    } else {
        doc.root()
    };
    let region = doc.append_element(parent, "div");
    doc.add_class(region, CONTENT_CLASS);
    markdown::append_markdown(&mut doc, region, markdown_text);
    doc
}

/// Markdown in, processed HTML fragment out
///
/// Same runtime requirements as [`Dviz::run`].
pub async fn render_markdown(markdown_text: &str, dviz: &Dviz) -> DvizResult<String> {
    let mut doc = markdown_document(markdown_text, false);
    dviz.run(&mut doc).await?;
    Ok(doc.to_html())
}

/// Markdown in, complete HTML page out
pub async fn render_markdown_standalone(markdown_text: &str, dviz: &Dviz) -> DvizResult<String> {
    let mut doc = markdown_document(markdown_text, true);
    dviz.run(&mut doc).await?;
    Ok(format!("<!DOCTYPE html>\n{}\n", doc.to_html()))
}

/// HTML page in, processed HTML page out
///
/// The page is searched for content regions as is; nothing is wrapped.
/// Same runtime requirements as [`Dviz::run`].
pub async fn render_html(html_text: &str, dviz: &Dviz) -> DvizResult<String> {
    let mut doc = from_html(html_text);
    dviz.run(&mut doc).await?;
    Ok(doc.to_html())
}
