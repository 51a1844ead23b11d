//! Dependency resolution and the library load barrier
//!
//! Commands declare the external libraries they need. Before anything is
//! rendered, the union of those declarations is resolved and every library is
//! brought to a ready state: already-present libraries only run their
//! post-availability hook, missing ones are requested through a
//! [`ResourceFetcher`] first. Dispatch starts once all of them completed
//! (all-of barrier), and the barrier is bounded by a configurable timeout.
//!
//! The default fetcher does not touch the network. It records a `<script>`
//! tag per library, which the runner then writes into the output document.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{try_join_all, BoxFuture};
use fxhash::FxHashSet;
use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use tracing::debug;

use crate::core::registry::Registry;
use crate::core::scanner::CommandMatch;
use crate::data::libraries::{self, GOOGLE_VIZ_BOOTSTRAP};
use crate::document::{Document, NodeId};
use crate::utils::error::LoadError;

/// Ordered, de-duplicated library identifiers
pub type DependencySet = IndexSet<String>;

/// Default bound on the load barrier
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Union of the libraries required by every registered command in `matches`
///
/// First-appearance order is kept. Unregistered commands contribute nothing.
pub fn resolve(matches: &[CommandMatch], registry: &Registry) -> DependencySet {
    matches
        .iter()
        .flat_map(|m| registry.requires(&m.name).iter().cloned())
        .collect()
}

/// A script the run wants present in the output document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScriptTag {
    /// `<script src="...">`
    External(String),
    /// `<script>...</script>`
    Inline(String),
}

impl ScriptTag {
    /// Build the element for this script (detached)
    pub fn to_node(&self, doc: &mut Document) -> NodeId {
        let script = doc.create_element("script");
        match self {
            ScriptTag::External(url) => doc.set_attr(script, "src", url.as_str()),
            ScriptTag::Inline(code) => {
                doc.append_text(script, code.as_str());
            }
        }
        script
    }
}

/// Library readiness shared between the loader, fetchers and hooks
#[derive(Debug, Default)]
pub struct LoadState {
    ready: FxHashSet<String>,
    present: FxHashSet<ScriptTag>,
    injected: Vec<ScriptTag>,
}

/// Handle to a [`LoadState`] that fetchers and hooks can hold across awaits
pub type SharedState = Arc<Mutex<LoadState>>;

impl LoadState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State seeded from the scripts a document already carries
    pub fn from_document(doc: &Document) -> Self {
        let mut state = Self::new();
        for node in doc.descendants(doc.root()) {
            if doc.tag(node) != Some("script") {
                continue;
            }
            let tag = match doc.attr(node, "src") {
                Some(src) => ScriptTag::External(src.to_string()),
                None => ScriptTag::Inline(doc.text_content(node)),
            };
            state.present.insert(tag);
        }
        state
    }

    pub fn is_ready(&self, library: &str) -> bool {
        self.ready.contains(library)
    }

    pub fn mark_ready(&mut self, library: &str) {
        self.ready.insert(library.to_string());
    }

    /// Whether the document already has (or will get) this script
    pub fn has_script(&self, script: &ScriptTag) -> bool {
        self.present.contains(script)
    }

    /// Queue a script for the output document; duplicates are ignored
    pub fn inject(&mut self, script: ScriptTag) {
        if self.present.insert(script.clone()) {
            self.injected.push(script);
        }
    }

    /// Scripts queued so far, in injection order
    pub fn injected(&self) -> &[ScriptTag] {
        &self.injected
    }

    pub fn take_injected(&mut self) -> Vec<ScriptTag> {
        std::mem::take(&mut self.injected)
    }
}

/// Readiness check for a library
pub type CheckFn = Arc<dyn Fn(&LoadState) -> bool + Send + Sync>;

/// Post-availability hook; an `Err` message fails the load
pub type HookFn = Arc<dyn Fn(SharedState) -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

/// An external library a command can depend on
#[derive(Clone)]
pub struct Library {
    pub id: String,
    pub url: String,
    pub check: CheckFn,
    pub on_available: Option<HookFn>,
}

impl Library {
    /// A library that counts as available once its script is in the document
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        let id = id.into();
        let url = url.into();
        let key = id.clone();
        let script = ScriptTag::External(url.clone());
        Library {
            id,
            url,
            check: Arc::new(move |state: &LoadState| {
                state.is_ready(&key) || state.has_script(&script)
            }),
            on_available: None,
        }
    }

    pub fn with_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&LoadState) -> bool + Send + Sync + 'static,
    {
        self.check = Arc::new(check);
        self
    }

    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(SharedState) -> BoxFuture<'static, Result<(), String>> + Send + Sync + 'static,
    {
        self.on_available = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("has_hook", &self.on_available.is_some())
            .finish()
    }
}

/// The libraries built-in commands depend on
pub fn builtin_libraries() -> Vec<Library> {
    let mut libs = Vec::new();
    for (&id, &url) in libraries::LIBRARY_URLS.entries() {
        let lib = Library::new(id, url);
        let lib = if id == libraries::GOOGLE_VIZ {
            lib.with_hook(|state: SharedState| -> BoxFuture<'static, Result<(), String>> {
                Box::pin(async move {
                    state
                        .lock()
                        .inject(ScriptTag::Inline(GOOGLE_VIZ_BOOTSTRAP.to_string()));
                    Ok(())
                })
            })
        } else {
            lib
        };
        libs.push(lib);
    }
    libs.sort_by(|a, b| a.id.cmp(&b.id));
    libs
}

/// Requests a library that is not available yet
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, library: &Library, state: &SharedState) -> Result<(), LoadError>;
}

/// Fetcher that records a `<script src>` tag for the output document
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptInjector;

#[async_trait]
impl ResourceFetcher for ScriptInjector {
    async fn fetch(&self, library: &Library, state: &SharedState) -> Result<(), LoadError> {
        state.lock().inject(ScriptTag::External(library.url.clone()));
        Ok(())
    }
}

/// Outcome of a completed barrier
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Libraries that had to be requested
    pub fetched: Vec<String>,
    /// Libraries whose check already reported them available
    pub already_available: Vec<String>,
}

/// Library registry plus the load barrier
#[derive(Clone)]
pub struct Loader {
    libraries: IndexMap<String, Library>,
    fetcher: Arc<dyn ResourceFetcher>,
    timeout: Option<Duration>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    /// An empty loader using [`ScriptInjector`] and the default timeout
    pub fn new() -> Self {
        Loader {
            libraries: IndexMap::new(),
            fetcher: Arc::new(ScriptInjector),
            timeout: Some(DEFAULT_LOAD_TIMEOUT),
        }
    }

    /// A loader that knows the built-in libraries
    pub fn with_builtins() -> Self {
        let mut loader = Self::new();
        for lib in builtin_libraries() {
            loader.register(lib);
        }
        loader
    }

    /// Register (or replace) a library
    pub fn register(&mut self, library: Library) -> &mut Self {
        self.libraries.insert(library.id.clone(), library);
        self
    }

    pub fn with_fetcher<F: ResourceFetcher + 'static>(mut self, fetcher: F) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    /// Bound the barrier; `None` waits forever
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn library(&self, id: &str) -> Option<&Library> {
        self.libraries.get(id)
    }

    /// Registered library identifiers in registration order
    pub fn library_ids(&self) -> impl Iterator<Item = &str> {
        self.libraries.keys().map(String::as_str)
    }

    /// Bring every dependency to a ready state
    ///
    /// All dependencies are processed concurrently and the call completes only
    /// when each of them did. Unknown identifiers fail before anything is
    /// requested. With a timeout configured, expiry reports the dependencies
    /// that had not completed; the timer needs a tokio runtime with the time
    /// driver enabled.
    pub async fn ensure_loaded(
        &self,
        deps: &DependencySet,
        state: &SharedState,
    ) -> Result<LoadReport, LoadError> {
        let mut libs = Vec::with_capacity(deps.len());
        for id in deps {
            let lib = self
                .libraries
                .get(id)
                .ok_or_else(|| LoadError::UnknownLibrary(id.clone()))?;
            libs.push(lib);
        }

        let completed = Mutex::new(FxHashSet::default());
        let barrier = try_join_all(libs.iter().map(|lib| self.load_one(lib, state, &completed)));

        let outcomes = match self.timeout {
            Some(after) => match tokio::time::timeout(after, barrier).await {
                Ok(result) => result?,
                Err(_) => {
                    let done = completed.lock();
                    let pending = deps
                        .iter()
                        .filter(|id| !done.contains(id.as_str()))
                        .cloned()
                        .collect();
                    return Err(LoadError::Timeout { after, pending });
                }
            },
            None => barrier.await?,
        };

        let mut report = LoadReport::default();
        for (id, fetched) in outcomes {
            if fetched {
                report.fetched.push(id);
            } else {
                report.already_available.push(id);
            }
        }
        Ok(report)
    }

    async fn load_one(
        &self,
        lib: &Library,
        state: &SharedState,
        completed: &Mutex<FxHashSet<String>>,
    ) -> Result<(String, bool), LoadError> {
        let available = {
            let guard = state.lock();
            (lib.check)(&*guard)
        };

        if !available {
            debug!(library = %lib.id, url = %lib.url, "requesting library");
            self.fetcher.fetch(lib, state).await?;
            state.lock().mark_ready(&lib.id);
        }

        if let Some(hook) = &lib.on_available {
            hook(Arc::clone(state))
                .await
                .map_err(|message| LoadError::Hook {
                    library: lib.id.clone(),
                    message,
                })?;
        }

        completed.lock().insert(lib.id.clone());
        Ok((lib.id.clone(), !available))
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("libraries", &self.libraries.keys().collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Write queued scripts at the top of `target`, keeping their order
pub fn inject_scripts(doc: &mut Document, target: NodeId, scripts: &[ScriptTag]) {
    let mut previous: Option<NodeId> = None;
    for script in scripts {
        let node = script.to_node(doc);
        match previous {
            Some(prev) => {
                doc.insert_after(prev, node);
            }
            None => doc.prepend_child(target, node),
        }
        previous = Some(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn deps(ids: &[&str]) -> DependencySet {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn shared() -> SharedState {
        Arc::new(Mutex::new(LoadState::new()))
    }

    #[derive(Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ResourceFetcher for Arc<CountingFetcher> {
        async fn fetch(&self, _: &Library, _: &SharedState) -> Result<(), LoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct StallingFetcher;

    #[async_trait]
    impl ResourceFetcher for StallingFetcher {
        async fn fetch(&self, library: &Library, _: &SharedState) -> Result<(), LoadError> {
            if library.id == "slow" {
                futures::future::pending::<()>().await;
            }
            Ok(())
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl ResourceFetcher for FailingFetcher {
        async fn fetch(&self, library: &Library, _: &SharedState) -> Result<(), LoadError> {
            Err(LoadError::Fetch {
                library: library.id.clone(),
                url: library.url.clone(),
                message: "connection refused".into(),
            })
        }
    }

    #[test]
    fn test_resolve_dedups_in_order() {
        let registry = Registry::with_builtins();
        let matches: Vec<CommandMatch> = ["sparkline", "nosuch", "graph", "line", "sparkline"]
            .iter()
            .map(|name| CommandMatch {
                node: Document::new().root(),
                data: None,
                name: name.to_string(),
                options: None,
            })
            .collect();

        let first = resolve(&matches, &registry);
        assert_eq!(
            first.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["d3", "opt_graph", "google-viz"]
        );
        assert_eq!(resolve(&matches, &registry), first);
    }

    #[tokio::test]
    async fn test_missing_libraries_are_injected_once() {
        let loader = Loader::with_builtins();
        let state = shared();
        let report = loader
            .ensure_loaded(&deps(&["d3", "google-viz", "d3"]), &state)
            .await
            .unwrap();

        assert_eq!(report.fetched, vec!["d3", "google-viz"]);
        let scripts = state.lock().take_injected();
        assert_eq!(
            scripts,
            vec![
                ScriptTag::External("http://d3js.org/d3.v2.min.js".into()),
                ScriptTag::External("https://www.google.com/jsapi".into()),
                ScriptTag::Inline(GOOGLE_VIZ_BOOTSTRAP.into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_available_library_only_runs_hook() {
        let hooks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hooks);
        let lib = Library::new("local", "local.js")
            .with_check(|_: &LoadState| true)
            .with_hook(move |_: SharedState| -> BoxFuture<'static, Result<(), String>> {
                counter.fetch_add(1, Ordering::SeqCst);
                Box::pin(async { Ok(()) })
            });

        let fetcher = Arc::new(CountingFetcher::default());
        let mut loader = Loader::new().with_fetcher(Arc::clone(&fetcher));
        loader.register(lib);

        let report = loader.ensure_loaded(&deps(&["local"]), &shared()).await.unwrap();
        assert_eq!(report.already_available, vec!["local"]);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(hooks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_script_already_in_document_is_not_fetched() {
        let mut doc = Document::new();
        let head = doc.append_element(doc.root(), "head");
        let script = doc.append_element(head, "script");
        doc.set_attr(script, "src", "http://d3js.org/d3.v2.min.js");

        let state = Arc::new(Mutex::new(LoadState::from_document(&doc)));
        let report = Loader::with_builtins()
            .ensure_loaded(&deps(&["d3"]), &state)
            .await
            .unwrap();
        assert!(report.fetched.is_empty());
        assert!(state.lock().injected().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_library() {
        let err = Loader::with_builtins()
            .ensure_loaded(&deps(&["d3", "plotly"]), &shared())
            .await
            .unwrap_err();
        assert_eq!(err, LoadError::UnknownLibrary("plotly".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_fetch_times_out() {
        let mut loader = Loader::new().with_fetcher(StallingFetcher);
        loader.register(Library::new("fast", "fast.js"));
        loader.register(Library::new("slow", "slow.js"));
        loader.set_timeout(Some(Duration::from_secs(5)));

        let err = loader
            .ensure_loaded(&deps(&["fast", "slow"]), &shared())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LoadError::Timeout {
                after: Duration::from_secs(5),
                pending: vec!["slow".into()],
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let loader = Loader::with_builtins().with_fetcher(FailingFetcher);
        let err = loader
            .ensure_loaded(&deps(&["opt_graph"]), &shared())
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Fetch { ref library, .. } if library == "opt_graph"));
    }

    #[tokio::test]
    async fn test_hook_failure() {
        let mut loader = Loader::new();
        loader.register(Library::new("broken", "broken.js").with_hook(
            |_: SharedState| -> BoxFuture<'static, Result<(), String>> {
                Box::pin(async { Err("init failed".to_string()) })
            },
        ));
        let err = loader
            .ensure_loaded(&deps(&["broken"]), &shared())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LoadError::Hook {
                library: "broken".into(),
                message: "init failed".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_empty_dependency_set() {
        let report = Loader::new()
            .ensure_loaded(&DependencySet::new(), &shared())
            .await
            .unwrap();
        assert_eq!(report, LoadReport::default());
    }

    #[test]
    fn test_inject_scripts_keeps_order() {
        let mut doc = Document::new();
        let head = doc.append_element(doc.root(), "head");
        doc.append_element(head, "title");
        inject_scripts(
            &mut doc,
            head,
            &[
                ScriptTag::External("a.js".into()),
                ScriptTag::Inline("init();".into()),
            ],
        );
        assert_eq!(
            doc.to_html(),
            "<head><script src=\"a.js\"></script><script>init();</script><title></title></head>"
        );
    }
}
