//! Command dispatcher
//!
//! Turns each [`CommandMatch`] into rendered output: resolve the data source,
//! parse the options, allocate the container, call the render function and
//! remove the annotation.

use std::fmt;

use serde_json::Map;
use tracing::{debug, warn};

use crate::core::options::FailurePolicy;
use crate::core::registry::{Options, Registry, RenderContext};
use crate::core::scanner::CommandMatch;
use crate::core::table::{table_to_csv, RawBlock};
use crate::document::html::expand_raw;
use crate::document::{Document, NodeData, NodeId};
use crate::utils::error::{DvizError, DvizResult, RenderError};
use crate::utils::literal::parse_object_literal;

/// A render failure recorded under [`FailurePolicy::Isolate`]
#[derive(Debug, Clone, PartialEq)]
pub struct CommandFailure {
    pub command: String,
    /// The annotation node, left in place
    pub node: NodeId,
    pub error: RenderError,
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}: {}", self.command, self.error)
    }
}

/// Summary of one dispatch pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Commands rendered successfully
    pub rendered: usize,
    /// Annotations left alone (unregistered name or detached node)
    pub skipped: usize,
    pub failures: Vec<CommandFailure>,
    /// Libraries that had to be requested before dispatch
    pub fetched_libraries: Vec<String>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rendered, {} skipped, {} failed",
            self.rendered,
            self.skipped,
            self.failures.len()
        )?;
        for failure in &self.failures {
            write!(f, "\n  {}", failure)?;
        }
        Ok(())
    }
}

/// Element a data block was taken from, kept so a failed command can put it back
struct DataSource {
    node: NodeId,
    /// The annotation's parent; the source sat right before it
    anchor: NodeId,
}

/// Runs matches against a registry
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'r> {
    registry: &'r Registry,
    policy: FailurePolicy,
}

impl<'r> Dispatcher<'r> {
    pub fn new(registry: &'r Registry, policy: FailurePolicy) -> Self {
        Dispatcher { registry, policy }
    }

    /// Dispatch every match in order
    ///
    /// Under [`FailurePolicy::AbortBatch`] the first render error stops the
    /// pass; commands rendered before it stay rendered.
    pub fn run(&self, doc: &mut Document, matches: Vec<CommandMatch>) -> DvizResult<RunReport> {
        let mut report = RunReport::default();

        for m in matches {
            let Some(render) = self.registry.get(&m.name) else {
                debug!(command = %m.name, "skipping unregistered command");
                report.skipped += 1;
                continue;
            };
            if !doc.is_attached(m.node) {
                // An earlier command consumed the node as data or moved it out
                debug!(command = %m.name, "skipping detached annotation");
                report.skipped += 1;
                continue;
            }

            let parent = doc.parent(m.node);
            let (data, source) = match m.data {
                Some(ref inline) => (inline.clone(), None),
                None => take_data_source(doc, parent),
            };

            let options = match parse_options(m.options.as_deref()) {
                Ok(options) => options,
                Err(err) => {
                    self.fail(doc, &mut report, &m, None, source, err)?;
                    continue;
                }
            };

            let wrapper = if parent.and_then(|p| doc.tag(p)) == Some("pre") {
                "div"
            } else {
                "span"
            };
            let container = doc.create_element(wrapper);
            doc.insert_after(m.node, container);

            let result = {
                let mut ctx = RenderContext {
                    doc: &mut *doc,
                    container,
                    command: &m.name,
                };
                render.render(&mut ctx, &RawBlock::Text(data), &options)
            };

            match result {
                Ok(()) => {
                    // The parent may have been moved by the render function, look it up again
                    let parent = doc.parent(m.node);
                    doc.remove(m.node);
                    if let Some(parent) = parent {
                        if parent != doc.root() && doc.has_no_element_children(parent) {
                            doc.remove(parent);
                        }
                    }
                    report.rendered += 1;
                }
                Err(err) => self.fail(doc, &mut report, &m, Some(container), source, err)?,
            }
        }

        Ok(report)
    }

    /// Undo the partial work for a failed command, then apply the policy
    fn fail(
        &self,
        doc: &mut Document,
        report: &mut RunReport,
        m: &CommandMatch,
        container: Option<NodeId>,
        source: Option<DataSource>,
        error: RenderError,
    ) -> DvizResult<()> {
        if let Some(container) = container {
            doc.remove(container);
        }
        if let Some(source) = source {
            doc.insert_before(source.anchor, source.node);
        }

        match self.policy {
            FailurePolicy::AbortBatch => Err(DvizError::render(&m.name, error)),
            FailurePolicy::Isolate => {
                warn!(command = %m.name, error = %error, "render failed, annotation left in place");
                report.failures.push(CommandFailure {
                    command: m.name.clone(),
                    node: m.node,
                    error,
                });
                Ok(())
            }
        }
    }
}

/// Take the element right before the annotation's parent as the data block
///
/// Tables are flattened with [`table_to_csv`]; anything else contributes its
/// text. The element is removed. No such element means empty data.
fn take_data_source(doc: &mut Document, parent: Option<NodeId>) -> (String, Option<DataSource>) {
    let Some(anchor) = parent else {
        return (String::new(), None);
    };
    let Some(node) = preceding_element(doc, anchor) else {
        return (String::new(), None);
    };

    let data = if doc.tag(node) == Some("table") {
        table_to_csv(doc, node)
    } else {
        doc.text_content(node)
    };
    doc.remove(node);
    (data, Some(DataSource { node, anchor }))
}

/// The element right before `anchor`, ignoring blank text and comments
///
/// Raw markup in that position is parsed first, so an HTML table written
/// straight into Markdown can feed a chart. Loose text means there is no
/// data source.
fn preceding_element(doc: &mut Document, anchor: NodeId) -> Option<NodeId> {
    let mut node = doc.prev_content_sibling(anchor)?;
    if matches!(doc.data(node), NodeData::Raw(_)) {
        expand_raw(doc, node);
        node = doc.prev_content_sibling(anchor)?;
    }
    doc.is_element(node).then_some(node)
}

fn parse_options(literal: Option<&str>) -> Result<Options, RenderError> {
    match literal {
        Some(literal) => Ok(parse_object_literal(literal)?),
        None => Ok(Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::{scan, ScanOptions};
    use pretty_assertions::assert_eq;

    fn echo(ctx: &mut RenderContext<'_>, data: &RawBlock, options: &Options) -> Result<(), RenderError> {
        let text = data.as_text().unwrap_or("").to_string();
        ctx.doc.set_attr(ctx.container, "data-command", ctx.command);
        if !options.is_empty() {
            let json = serde_json::Value::Object(options.clone()).to_string();
            ctx.doc.set_attr(ctx.container, "data-options", json);
        }
        ctx.doc.append_text(ctx.container, text);
        Ok(())
    }

    fn explode(_: &mut RenderContext<'_>, _: &RawBlock, _: &Options) -> Result<(), RenderError> {
        Err(RenderError::invalid_data("boom"))
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register("echo", echo, Vec::<String>::new())
            .register("explode", explode, Vec::<String>::new());
        registry
    }

    fn region(markdown: &str) -> Document {
        let mut doc = Document::new();
        let div = doc.append_element(doc.root(), "div");
        doc.set_attr(div, "class", "dviz-content");
        crate::document::markdown::append_markdown(&mut doc, div, markdown);
        doc
    }

    fn dispatch(doc: &mut Document, policy: FailurePolicy) -> DvizResult<RunReport> {
        let opts = ScanOptions::new(".dviz-content", "*:not(pre) > code").unwrap();
        let matches = scan(doc, &opts);
        let registry = registry();
        Dispatcher::new(&registry, policy).run(doc, matches)
    }

    #[test]
    fn test_inline_data() {
        let mut doc = region("Before `1,2,3(@echo)` after");
        let report = dispatch(&mut doc, FailurePolicy::AbortBatch).unwrap();
        assert_eq!(report.rendered, 1);
        assert_eq!(
            doc.to_html(),
            "<div class=\"dviz-content\"><p>Before <span data-command=\"echo\">1,2,3</span> after</p></div>"
        );
    }

    #[test]
    fn test_preceding_paragraph_is_consumed() {
        let mut doc = region("x, y\n1, 2\n\n`(@echo {title: 'T'})`");
        dispatch(&mut doc, FailurePolicy::AbortBatch).unwrap();
        assert_eq!(
            doc.to_html(),
            "<div class=\"dviz-content\"><p><span data-command=\"echo\" data-options=\"{&quot;title&quot;:&quot;T&quot;}\">x, y\n1, 2</span></p></div>"
        );
    }

    #[test]
    fn test_preceding_table_is_consumed() {
        let mut doc = region("| x | y |\n|---|---|\n| 1 | 2 |\n\n`(@echo)`");
        dispatch(&mut doc, FailurePolicy::AbortBatch).unwrap();
        assert!(doc.find_first(doc.root(), "table").is_none());
        let span = doc.find_first(doc.root(), "span").unwrap();
        assert_eq!(doc.text_content(span), "x,y\n1,2");
    }

    #[test]
    fn test_html_table_block_is_consumed() {
        let mut doc = region(
            "Intro\n\n<table><tr><th>x</th><th>y</th></tr><tr><td>1</td><td>2</td></tr></table>\n\n`(@echo)`",
        );
        dispatch(&mut doc, FailurePolicy::AbortBatch).unwrap();
        assert!(doc.find_first(doc.root(), "table").is_none());
        let span = doc.find_first(doc.root(), "span").unwrap();
        assert_eq!(doc.text_content(span), "x,y\n1,2");
        assert!(doc.to_html().contains("<p>Intro</p>"), "earlier blocks stay");
    }

    #[test]
    fn test_raw_markup_before_annotation_is_parsed() {
        let mut doc = Document::new();
        let region = doc.append_element(doc.root(), "div");
        doc.set_attr(region, "class", "dviz-content");
        let intro = doc.append_element(region, "p");
        doc.append_text(intro, "Intro");
        let raw = doc.create_raw("<table><tr><td>a</td><td>1</td></tr></table>\n");
        doc.append_child(region, raw);
        let p = doc.append_element(region, "p");
        let code = doc.append_element(p, "code");
        doc.append_text(code, "(@echo)");

        dispatch(&mut doc, FailurePolicy::AbortBatch).unwrap();
        let span = doc.find_first(doc.root(), "span").unwrap();
        assert_eq!(doc.text_content(span), "a,1");
        assert!(doc.is_attached(intro));
    }

    #[test]
    fn test_loose_text_is_not_a_data_source() {
        let mut doc = Document::new();
        let region = doc.append_element(doc.root(), "div");
        doc.set_attr(region, "class", "dviz-content");
        let intro = doc.append_element(region, "p");
        doc.append_text(intro, "Intro");
        doc.append_text(region, "loose words");
        let p = doc.append_element(region, "p");
        let code = doc.append_element(p, "code");
        doc.append_text(code, "(@echo)");

        dispatch(&mut doc, FailurePolicy::AbortBatch).unwrap();
        let span = doc.find_first(doc.root(), "span").unwrap();
        assert_eq!(doc.text_content(span), "");
        assert!(doc.is_attached(intro));
    }

    #[test]
    fn test_no_preceding_element_gives_empty_data() {
        let mut doc = region("`(@echo)`");
        dispatch(&mut doc, FailurePolicy::AbortBatch).unwrap();
        let span = doc.find_first(doc.root(), "span").unwrap();
        assert_eq!(doc.text_content(span), "");
    }

    #[test]
    fn test_unregistered_is_untouched() {
        let mut doc = region("data\n\n`(@nope)`");
        let before = doc.to_html();
        let report = dispatch(&mut doc, FailurePolicy::AbortBatch).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(doc.to_html(), before);
    }

    #[test]
    fn test_wrapper_is_div_inside_pre() {
        let mut doc = Document::new();
        let region = doc.append_element(doc.root(), "div");
        doc.set_attr(region, "class", "dviz-content");
        let pre = doc.append_element(region, "pre");
        let code = doc.append_element(pre, "code");
        doc.append_text(code, "1(@echo)");

        let opts = ScanOptions::new(".dviz-content", "code").unwrap();
        let matches = scan(&doc, &opts);
        let registry = registry();
        Dispatcher::new(&registry, FailurePolicy::AbortBatch)
            .run(&mut doc, matches)
            .unwrap();
        assert_eq!(
            doc.to_html(),
            "<div class=\"dviz-content\"><pre><div data-command=\"echo\">1</div></pre></div>"
        );
    }

    #[test]
    fn test_emptied_parent_is_removed() {
        let mut doc = Document::new();
        let region = doc.append_element(doc.root(), "div");
        doc.set_attr(region, "class", "dviz-content");
        let p = doc.append_element(region, "p");
        let code = doc.append_element(p, "code");
        doc.append_text(code, "(@away)");

        fn away(ctx: &mut RenderContext<'_>, _: &RawBlock, _: &Options) -> Result<(), RenderError> {
            // Move the container out of the annotation's parent
            let root = ctx.doc.root();
            ctx.doc.append_child(root, ctx.container);
            Ok(())
        }
        let mut registry = Registry::new();
        registry.register("away", away, Vec::<String>::new());

        let opts = ScanOptions::new(".dviz-content", "*:not(pre) > code").unwrap();
        let matches = scan(&doc, &opts);
        Dispatcher::new(&registry, FailurePolicy::AbortBatch)
            .run(&mut doc, matches)
            .unwrap();
        assert!(!doc.is_attached(p));
        assert_eq!(doc.to_html(), "<div class=\"dviz-content\"></div><span></span>");
    }

    #[test]
    fn test_abort_batch_stops_at_first_failure() {
        let mut doc = region("`a(@echo)`\n\n`b(@explode)`\n\n`c(@echo)`");
        let err = dispatch(&mut doc, FailurePolicy::AbortBatch).unwrap_err();
        assert_eq!(err.to_string(), "Command '@explode' failed: Invalid data: boom");

        let html = doc.to_html();
        assert!(html.contains("<span data-command=\"echo\">a</span>"));
        assert!(html.contains("<p><code>b(@explode)</code></p>"));
        assert!(html.contains("c(@echo)"), "later commands stay unrendered");
    }

    #[test]
    fn test_isolate_continues_and_restores() {
        let mut doc = region("source\n\n`(@explode)`\n\n`c(@echo)`");
        let report = dispatch(&mut doc, FailurePolicy::Isolate).unwrap();
        assert_eq!(report.rendered, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].command, "explode");
        assert_eq!(
            doc.to_html(),
            "<div class=\"dviz-content\"><p>source</p><p><code>(@explode)</code></p><p><span data-command=\"echo\">c</span></p></div>"
        );
    }

    #[test]
    fn test_malformed_options_fail_the_command() {
        let mut doc = region("`1(@echo {title: })`");
        let err = dispatch(&mut doc, FailurePolicy::AbortBatch).unwrap_err();
        assert!(matches!(
            err,
            DvizError::Render {
                source: RenderError::InvalidOptions(_),
                ..
            }
        ));
        assert!(doc.find_first(doc.root(), "span").is_none());
    }

    #[test]
    fn test_deeply_nested_options_fail_the_command() {
        let literal = format!("{{a: {}}}", "[".repeat(5_000));
        let mut doc = region(&format!("`1(@echo {})`", literal));
        let err = dispatch(&mut doc, FailurePolicy::AbortBatch).unwrap_err();
        assert!(matches!(
            err,
            DvizError::Render {
                source: RenderError::InvalidOptions(_),
                ..
            }
        ));
    }

    #[test]
    fn test_report_display() {
        let report = RunReport {
            rendered: 2,
            skipped: 1,
            failures: vec![CommandFailure {
                command: "bar".into(),
                node: Document::new().root(),
                error: RenderError::invalid_data("empty"),
            }],
            fetched_libraries: Vec::new(),
        };
        assert_eq!(
            report.to_string(),
            "2 rendered, 1 skipped, 1 failed\n  @bar: Invalid data: empty"
        );
    }
}
