//! `UniFFI` bindings for the live diagram engine
//!
//! Exposes a document session to Swift, Kotlin, Python and other hosts. The
//! host supplies the renderer, grammar checker, editor and file access as
//! foreign implementations of the traits below.
#![allow(clippy::cast_possible_truncation, clippy::needless_pass_by_value)]

use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Instant;

use crate::config::EngineConfig;
use crate::document::CursorPosition;
use crate::error::{CheckerError, ParchError, RenderError, StoreError, StoreResult};
use crate::parser::{
    DiagramBlock, DiagramId, DiagramRenderer, GrammarChecker, GrammarOutcome, ParseResult,
    ParseStats, SyntaxError,
};
use crate::render::RenderOutput;
use crate::session::DocumentSession;
use crate::settings::{MemorySettingsStore, SettingsStore, WindowSettings};
use crate::store::{DocumentFile, FileStore};

/// A diagram block for FFI
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct FfiDiagram {
    pub id: String,
    pub diagram_type: String,
    pub content: String,
    pub start_line: u32,
    pub end_line: u32,
    pub closed: bool,
    pub has_error: bool,
    pub error_message: Option<String>,
}

impl From<&DiagramBlock> for FfiDiagram {
    fn from(block: &DiagramBlock) -> Self {
        Self {
            id: block.id.to_string(),
            diagram_type: block.kind.tag().to_string(),
            content: block.content.clone(),
            start_line: block.start_line as u32,
            end_line: block.end_line as u32,
            closed: block.closed,
            has_error: block.has_error,
            error_message: block.error_message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct FfiSyntaxError {
    pub line: u32,
    pub column: u32,
    pub message: String,
    pub severity: String,
}

impl From<&SyntaxError> for FfiSyntaxError {
    fn from(error: &SyntaxError) -> Self {
        Self {
            line: error.line as u32,
            column: error.column as u32,
            message: error.message.clone(),
            severity: error.severity.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct FfiParseResult {
    pub generation: u64,
    pub diagrams: Vec<FfiDiagram>,
    pub errors: Vec<FfiSyntaxError>,
    pub parsing_time_ms: u64,
    pub degraded: bool,
}

impl From<&ParseResult> for FfiParseResult {
    fn from(result: &ParseResult) -> Self {
        Self {
            generation: result.generation,
            diagrams: result.diagrams.iter().map(FfiDiagram::from).collect(),
            errors: result.errors.iter().map(FfiSyntaxError::from).collect(),
            parsing_time_ms: result.parsing_time_ms,
            degraded: result.degraded,
        }
    }
}

/// Diagram and error counts for a status bar
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct FfiParseStats {
    pub total_diagrams: u32,
    pub total_errors: u32,
    pub parsing_time_ms: u64,
    pub diagrams_by_type: HashMap<String, u32>,
}

impl From<ParseStats> for FfiParseStats {
    fn from(stats: ParseStats) -> Self {
        Self {
            total_diagrams: stats.total_diagrams as u32,
            total_errors: stats.total_errors as u32,
            parsing_time_ms: stats.parsing_time_ms,
            diagrams_by_type: stats
                .diagrams_by_type
                .into_iter()
                .map(|(kind, count)| (kind, count as u32))
                .collect(),
        }
    }
}

/// 1-based caret position
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Record)]
pub struct FfiCursor {
    pub line: u32,
    pub column: u32,
}

impl From<FfiCursor> for CursorPosition {
    fn from(cursor: FfiCursor) -> Self {
        Self::new(cursor.line as usize, cursor.column as usize)
    }
}

impl From<CursorPosition> for FfiCursor {
    fn from(position: CursorPosition) -> Self {
        Self {
            line: position.line as u32,
            column: position.column as u32,
        }
    }
}

/// What the preview shows for one diagram
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum FfiRenderOutput {
    Rendered { artifact: Vec<u8> },
    RenderFailed { reason: String },
    SyntaxInvalid { message: String },
    Pending,
}

impl From<RenderOutput> for FfiRenderOutput {
    fn from(output: RenderOutput) -> Self {
        match output {
            RenderOutput::Rendered(artifact) => Self::Rendered {
                artifact: artifact.to_vec(),
            },
            RenderOutput::RenderFailed(reason) => Self::RenderFailed { reason },
            RenderOutput::SyntaxInvalid(message) => Self::SyntaxInvalid { message },
            RenderOutput::Pending => Self::Pending,
        }
    }
}

/// Result of a host render call
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum HostRenderOutcome {
    Rendered { artifact: Vec<u8> },
    Failed { reason: String },
}

/// Result of a host grammar check
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum HostCheckOutcome {
    Valid,
    Invalid { message: String },
    /// The checker could not run at all
    Unavailable { reason: String },
}

#[uniffi::export(with_foreign)]
pub trait HostRenderer: Send + Sync {
    /// Turn diagram text into a picture
    fn render(&self, diagram_id: String, diagram_text: String) -> HostRenderOutcome;
}

#[uniffi::export(with_foreign)]
pub trait HostGrammarChecker: Send + Sync {
    fn name(&self) -> String;

    fn check(&self, diagram_text: String) -> HostCheckOutcome;
}

#[uniffi::export(with_foreign)]
pub trait HostEditor: Send + Sync {
    /// Move the caret and scroll it into view
    fn reveal_position(&self, position: FfiCursor);
}

#[uniffi::export(with_foreign)]
pub trait ParseListener: Send + Sync {
    /// Called on every publication, after the document is unlocked
    fn on_parse_result_changed(&self, result: FfiParseResult);
}

#[uniffi::export(with_foreign)]
pub trait HostFileStore: Send + Sync {
    /// Read the text of a file
    fn read_text(&self, path: String) -> Option<String>;

    /// Write the text of a file
    fn write_text(&self, path: String, text: String) -> bool;
}

struct RendererAdapter(Arc<dyn HostRenderer>);

impl DiagramRenderer for RendererAdapter {
    fn render(&self, diagram_id: &str, diagram_text: &str) -> Result<Vec<u8>, RenderError> {
        match self
            .0
            .render(diagram_id.to_string(), diagram_text.to_string())
        {
            HostRenderOutcome::Rendered { artifact } => Ok(artifact),
            HostRenderOutcome::Failed { reason } => Err(RenderError::failed(reason)),
        }
    }
}

struct CheckerAdapter {
    name: String,
    host: Arc<dyn HostGrammarChecker>,
}

impl GrammarChecker for CheckerAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, diagram_text: &str) -> Result<GrammarOutcome, CheckerError> {
        match self.host.check(diagram_text.to_string()) {
            HostCheckOutcome::Valid => Ok(GrammarOutcome::Ok),
            HostCheckOutcome::Invalid { message } => Ok(GrammarOutcome::failure(message)),
            HostCheckOutcome::Unavailable { reason } => Err(CheckerError::unavailable(reason)),
        }
    }
}

struct FileStoreAdapter(Arc<dyn HostFileStore>);

impl fmt::Debug for FileStoreAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FileStoreAdapter")
    }
}

impl FileStore for FileStoreAdapter {
    fn read_text(&self, path: &str) -> StoreResult<String> {
        self.0
            .read_text(path.to_string())
            .ok_or_else(|| StoreError::not_found(path))
    }

    fn write_text(&mut self, path: &str, text: &str) -> StoreResult<()> {
        if self.0.write_text(path.to_string(), text.to_string()) {
            Ok(())
        } else {
            Err(StoreError::write_failed(path, "host store rejected the write"))
        }
    }
}

/// A live document driven by the host's own event loop
///
/// The host forwards edits and caret moves, calls `tick` when
/// `next_deadline_ms` elapses, and reads results back. Listeners and the
/// editor are called once the session lock is released, so they may call
/// back into the document.
#[derive(uniffi::Object)]
pub struct LiveDocument {
    session: Mutex<DocumentSession>,
    listeners: Mutex<Vec<Arc<dyn ParseListener>>>,
    editor: Mutex<Option<Arc<dyn HostEditor>>>,
    /// Publications waiting for delivery
    outbox: Arc<Mutex<Vec<FfiParseResult>>>,
    delivering: Mutex<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LiveDocument {
    fn session(&self) -> MutexGuard<'_, DocumentSession> {
        lock(&self.session)
    }

    /// Run `f` on the session, then hand its publications to the listeners
    fn update<R>(&self, f: impl FnOnce(&mut DocumentSession) -> R) -> R {
        let outcome = f(&mut self.session());
        self.deliver();
        outcome
    }

    fn deliver(&self) {
        loop {
            {
                // a caller already delivering drains what we queued
                let _delivering = match self.delivering.try_lock() {
                    Ok(guard) => guard,
                    Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                    Err(TryLockError::WouldBlock) => return,
                };

                loop {
                    let published = mem::take(&mut *lock(&self.outbox));
                    if published.is_empty() {
                        break;
                    }
                    let listeners = lock(&self.listeners).clone();
                    for result in published {
                        for listener in &listeners {
                            listener.on_parse_result_changed(result.clone());
                        }
                    }
                }
            }

            if lock(&self.outbox).is_empty() {
                return;
            }
        }
    }
}

#[uniffi::export]
impl LiveDocument {
    /// Create a document session
    ///
    /// `config_toml` uses the engine configuration format; `None` means
    /// defaults. A host `checker` becomes the primary grammar checker with
    /// the built-in grammar as fallback.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not parse or validate
    #[uniffi::constructor]
    pub fn new(
        config_toml: Option<String>,
        checker: Option<Arc<dyn HostGrammarChecker>>,
    ) -> Result<Arc<Self>, ParchError> {
        let config = match config_toml {
            Some(text) => EngineConfig::from_toml_str(&text)?,
            None => EngineConfig::default(),
        };
        let checker = checker.map(|host| -> Arc<dyn GrammarChecker> {
            Arc::new(CheckerAdapter {
                name: host.name(),
                host,
            })
        });

        let outbox = Arc::new(Mutex::new(Vec::new()));
        let mut session = DocumentSession::new(&config, checker);
        let queue = Arc::clone(&outbox);
        session.subscribe(move |result| {
            lock(&queue).push(FfiParseResult::from(result));
        });

        Ok(Arc::new(Self {
            session: Mutex::new(session),
            listeners: Mutex::new(Vec::new()),
            editor: Mutex::new(None),
            outbox,
            delivering: Mutex::new(()),
        }))
    }

    pub fn set_renderer(&self, renderer: Option<Arc<dyn HostRenderer>>) {
        self.session().set_renderer(
            renderer.map(|host| -> Arc<dyn DiagramRenderer> { Arc::new(RendererAdapter(host)) }),
        );
    }

    pub fn set_editor(&self, editor: Option<Arc<dyn HostEditor>>) {
        *lock(&self.editor) = editor;
    }

    /// Receive every future publication
    pub fn add_listener(&self, listener: Arc<dyn ParseListener>) {
        lock(&self.listeners).push(listener);
    }

    /// Open text the host already read, parsing it immediately
    pub fn open(&self, path: Option<String>, content: String) -> FfiParseResult {
        let file = match path {
            Some(path) => DocumentFile::from_path(&path, content),
            None => DocumentFile {
                content,
                ..DocumentFile::untitled()
            },
        };
        let result = self.update(|session| session.open(file, Instant::now()));
        FfiParseResult::from(result.as_ref())
    }

    /// Read `path` through the host store and open it
    ///
    /// # Errors
    ///
    /// Returns an error if the store has nothing under the path
    pub fn open_path(
        &self,
        store: Arc<dyn HostFileStore>,
        path: String,
    ) -> Result<FfiParseResult, ParchError> {
        let store = FileStoreAdapter(store);
        let result = self.update(|session| session.open_path(&store, &path, Instant::now()))?;
        Ok(FfiParseResult::from(result.as_ref()))
    }

    /// Write the current text to the document's path
    ///
    /// # Errors
    ///
    /// Returns an error if the document is untitled or the write fails
    pub fn save(&self, store: Arc<dyn HostFileStore>) -> Result<(), ParchError> {
        let mut store = FileStoreAdapter(store);
        self.update(|session| session.save(&mut store, Instant::now()))?;
        Ok(())
    }

    /// Write the current text to a new path and keep it
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails
    pub fn save_as(&self, store: Arc<dyn HostFileStore>, path: String) -> Result<(), ParchError> {
        let mut store = FileStoreAdapter(store);
        self.update(|session| session.save_as(&mut store, &path, Instant::now()))?;
        Ok(())
    }

    pub fn text_changed(&self, text: String) {
        self.update(|session| session.text_changed(text, Instant::now()));
    }

    /// Run every due parse and render, returning how many ran
    pub fn tick(&self) -> u32 {
        self.update(|session| session.tick(Instant::now())) as u32
    }

    /// Parse a pending edit now
    pub fn flush(&self) -> bool {
        let now = Instant::now();
        self.update(|session| {
            let flushed = session.flush(now);
            session.tick(now);
            flushed
        })
    }

    /// Milliseconds until `tick` has work, if any is scheduled
    pub fn next_deadline_ms(&self) -> Option<u64> {
        let now = Instant::now();
        self.session().next_deadline().map(|deadline| {
            u64::try_from(deadline.saturating_duration_since(now).as_millis()).unwrap_or(u64::MAX)
        })
    }

    pub fn parse_result(&self) -> FfiParseResult {
        FfiParseResult::from(self.session().parse_result().as_ref())
    }

    /// Track the caret, returning the diagram it is in
    pub fn cursor_moved(&self, position: FfiCursor) -> Option<FfiDiagram> {
        self.session()
            .cursor_moved(position.into())
            .map(FfiDiagram::from)
    }

    pub fn diagram_at(&self, position: FfiCursor) -> Option<FfiDiagram> {
        self.session()
            .diagram_at(position.into())
            .map(FfiDiagram::from)
    }

    /// Select a diagram; the attached editor is moved to it
    pub fn select_diagram(&self, id: String) -> Option<FfiCursor> {
        let target = FfiCursor::from(self.session().select_diagram(&DiagramId::from(id))?);
        let editor = lock(&self.editor).clone();
        if let Some(editor) = editor {
            editor.reveal_position(target);
        }
        Some(target)
    }

    pub fn render_output(&self, id: String) -> Option<FfiRenderOutput> {
        self.session()
            .render_output(&DiagramId::from(id))
            .map(FfiRenderOutput::from)
    }

    /// Current buffer text
    pub fn contents(&self) -> String {
        self.session().text().to_string()
    }

    pub fn is_dirty(&self) -> bool {
        self.session().is_dirty()
    }

    /// Counts for the latest published result
    pub fn stats(&self) -> FfiParseStats {
        FfiParseStats::from(self.session().parse_result().stats())
    }

    /// Forget renders of content no longer in the document
    pub fn trim_render_cache(&self) -> u32 {
        self.session().trim_render_cache() as u32
    }

    pub fn close(&self) {
        self.update(DocumentSession::close);
    }
}

/// Window settings kept on behalf of the host's window layer
#[derive(uniffi::Object)]
pub struct WindowSettingsStore {
    store: MemorySettingsStore,
}

#[uniffi::export]
impl WindowSettingsStore {
    /// Start from a saved TOML record, or defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the saved record does not parse
    #[uniffi::constructor]
    pub fn new(saved_toml: Option<String>) -> Result<Arc<Self>, ParchError> {
        let settings = match saved_toml {
            Some(text) => WindowSettings::from_toml_str(&text)?,
            None => WindowSettings::default(),
        };
        Ok(Arc::new(Self {
            store: MemorySettingsStore::new(settings),
        }))
    }

    pub fn get(&self) -> WindowSettings {
        self.store.get()
    }

    /// Store `settings`, returning them with bounded fields clamped
    pub fn set(&self, settings: WindowSettings) -> WindowSettings {
        self.store.set(settings);
        self.store.get()
    }

    /// The stored record, for the host to persist
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized
    pub fn to_toml(&self) -> Result<String, ParchError> {
        Ok(self.store.get().to_toml_string()?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Weak, mpsc};
    use std::thread;
    use std::time::Duration;

    use super::*;

    const FLOW: &str = "```mermaid\ngraph TD\n    A --> B\n```";

    struct SvgRenderer;

    impl HostRenderer for SvgRenderer {
        fn render(&self, _diagram_id: String, diagram_text: String) -> HostRenderOutcome {
            HostRenderOutcome::Rendered {
                artifact: format!("<svg>{diagram_text}</svg>").into_bytes(),
            }
        }
    }

    struct OfflineChecker;

    impl HostGrammarChecker for OfflineChecker {
        fn name(&self) -> String {
            "offline".to_string()
        }

        fn check(&self, _diagram_text: String) -> HostCheckOutcome {
            HostCheckOutcome::Unavailable {
                reason: "worker not started".to_string(),
            }
        }
    }

    #[derive(Default)]
    struct CountingListener {
        calls: AtomicUsize,
    }

    impl ParseListener for CountingListener {
        fn on_parse_result_changed(&self, _result: FfiParseResult) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct MapStore {
        files: Mutex<HashMap<String, String>>,
    }

    impl HostFileStore for MapStore {
        fn read_text(&self, path: String) -> Option<String> {
            self.files.lock().unwrap().get(&path).cloned()
        }

        fn write_text(&self, path: String, text: String) -> bool {
            self.files.lock().unwrap().insert(path, text);
            true
        }
    }

    #[test]
    fn test_open_returns_parsed_diagrams() {
        let doc = LiveDocument::new(None, None).unwrap();
        let result = doc.open(Some("a.md".to_string()), FLOW.to_string());

        assert_eq!(result.generation, 1);
        assert_eq!(result.diagrams.len(), 1);
        assert_eq!(result.diagrams[0].diagram_type, "flowchart");
        assert_eq!((result.diagrams[0].start_line, result.diagrams[0].end_line), (1, 4));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = LiveDocument::new(Some("[scheduler]\ninput_debounce_ms = 0".to_string()), None);
        assert!(matches!(err, Err(ParchError::Config(_))));
    }

    #[test]
    fn test_unavailable_host_checker_falls_back_to_builtin() {
        let doc = LiveDocument::new(None, Some(Arc::new(OfflineChecker))).unwrap();
        let result = doc.open(None, "```mermaid\nnot a diagram\n```".to_string());

        assert!(result.diagrams[0].has_error);
        assert!(
            result.diagrams[0]
                .error_message
                .as_deref()
                .unwrap()
                .starts_with("Invalid diagram declaration")
        );
    }

    #[test]
    fn test_cursor_and_render_output() {
        let doc = LiveDocument::new(None, None).unwrap();
        doc.set_renderer(Some(Arc::new(SvgRenderer)));
        let listener = Arc::new(CountingListener::default());
        doc.add_listener(listener.clone());
        doc.open(None, FLOW.to_string());

        let diagram = doc.cursor_moved(FfiCursor { line: 2, column: 1 }).unwrap();
        assert_eq!(
            doc.render_output(diagram.id.clone()),
            Some(FfiRenderOutput::Pending)
        );
        assert_eq!(
            doc.select_diagram(diagram.id.clone()),
            Some(FfiCursor { line: 1, column: 1 })
        );
        assert!(doc.diagram_at(FfiCursor { line: 9, column: 1 }).is_none());
        assert_eq!(listener.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_save_through_host_store() {
        let store = Arc::new(MapStore::default());
        store.write_text("doc.md".to_string(), "pie".to_string());

        let doc = LiveDocument::new(None, None).unwrap();
        doc.open_path(store.clone(), "doc.md".to_string()).unwrap();
        doc.text_changed(FLOW.to_string());
        assert!(doc.is_dirty());

        doc.save(store.clone()).unwrap();
        assert_eq!(store.read_text("doc.md".to_string()).as_deref(), Some(FLOW));
        assert_eq!(doc.parse_result().diagrams.len(), 1);
    }

    #[test]
    fn test_open_missing_path() {
        let doc = LiveDocument::new(None, None).unwrap();
        let err = doc
            .open_path(Arc::new(MapStore::default()), "nope.md".to_string())
            .unwrap_err();
        assert!(err.to_string().contains("nope.md"));
    }

    /// Run `f` on another thread, reporting whether it returned in time
    fn finishes(f: impl FnOnce() + Send + 'static) -> bool {
        let (done, finished) = mpsc::channel();
        thread::spawn(move || {
            f();
            let _ = done.send(());
        });
        finished.recv_timeout(Duration::from_secs(5)).is_ok()
    }

    #[derive(Default)]
    struct ReadingListener {
        doc: Mutex<Weak<LiveDocument>>,
        seen: Mutex<Vec<(u64, usize)>>,
    }

    impl ParseListener for ReadingListener {
        fn on_parse_result_changed(&self, result: FfiParseResult) {
            let Some(doc) = self.doc.lock().unwrap().upgrade() else {
                return;
            };
            let current = doc.parse_result();
            assert_eq!(current.generation, result.generation);
            self.seen
                .lock()
                .unwrap()
                .push((current.generation, current.diagrams.len()));
        }
    }

    #[test]
    fn test_listener_can_read_the_document() {
        let doc = LiveDocument::new(None, None).unwrap();
        let listener = Arc::new(ReadingListener::default());
        *listener.doc.lock().unwrap() = Arc::downgrade(&doc);
        doc.add_listener(listener.clone());

        let worker = Arc::clone(&doc);
        assert!(finishes(move || {
            worker.open(None, FLOW.to_string());
            worker.close();
        }));
        assert_eq!(*listener.seen.lock().unwrap(), vec![(1, 1), (0, 0)]);
    }

    #[derive(Default)]
    struct FollowingEditor {
        doc: Mutex<Weak<LiveDocument>>,
        followed: Mutex<Vec<String>>,
    }

    impl HostEditor for FollowingEditor {
        fn reveal_position(&self, position: FfiCursor) {
            let Some(doc) = self.doc.lock().unwrap().upgrade() else {
                return;
            };
            if let Some(diagram) = doc.cursor_moved(position) {
                self.followed.lock().unwrap().push(diagram.id);
            }
        }
    }

    #[test]
    fn test_editor_can_move_the_caret_during_selection() {
        let doc = LiveDocument::new(None, None).unwrap();
        let editor = Arc::new(FollowingEditor::default());
        *editor.doc.lock().unwrap() = Arc::downgrade(&doc);
        doc.set_editor(Some(editor.clone()));
        let id = doc.open(None, FLOW.to_string()).diagrams[0].id.clone();

        let worker = Arc::clone(&doc);
        let selected = id.clone();
        assert!(finishes(move || {
            worker.select_diagram(selected);
        }));
        assert_eq!(*editor.followed.lock().unwrap(), vec![id]);
    }

    #[test]
    fn test_stats_and_cache_trim() {
        let doc = LiveDocument::new(None, None).unwrap();
        doc.set_renderer(Some(Arc::new(SvgRenderer)));
        doc.open(None, format!("{FLOW}\n\n```mermaid\npie\n```\n```mermaid\n```"));

        let stats = doc.stats();
        assert_eq!(stats.total_diagrams, 3);
        assert_eq!(stats.total_errors, 1);
        assert_eq!(stats.diagrams_by_type.get("flowchart"), Some(&1));
        assert_eq!(doc.trim_render_cache(), 0);
    }

    #[test]
    fn test_window_settings_store() {
        let store = WindowSettingsStore::new(Some("alwaysOnTop = true".to_string())).unwrap();
        assert!(store.get().always_on_top);

        let stored = store.set(WindowSettings {
            split_pane_size: 2.0,
            ..store.get()
        });
        assert!((stored.split_pane_size - 0.9).abs() < f64::EPSILON);
        assert!(store.to_toml().unwrap().contains("splitPaneSize = 0.9"));

        assert!(matches!(
            WindowSettingsStore::new(Some("opacity = []".to_string())),
            Err(ParchError::Config(_))
        ));
    }
}
