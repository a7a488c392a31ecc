//! One open document: text, scheduling, published diagrams and renders
//!
//! A `DocumentSession` is the single writer for its document. Hosts either
//! drive it synchronously with `tick`, or hand it to
//! [`LiveSession`](crate::sync::LiveSession) which runs parses and renders on
//! the blocking pool and feeds completions back through `complete_parse` and
//! `complete_render`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};

use crate::config::EngineConfig;
use crate::document::{CursorPosition, DiagramMapper};
use crate::error::{PipelineFault, SessionError, StoreResult};
use crate::parser::manager::ParseOutput;
use crate::parser::{
    DiagramBlock, DiagramId, DiagramPipeline, DiagramRenderer, GrammarChecker, IdentityTracker,
    ParseResult,
};
use crate::render::{Fingerprint, RenderBatch, RenderOutput, RenderPipeline};
use crate::store::{self, DocumentFile, FileStore};
use crate::sync::{ParseScheduler, SchedulerAction};

/// Receives every published parse result
pub type ResultCallback = Box<dyn Fn(&ParseResult) + Send + Sync>;

/// The editor widget, as far as diagram selection needs it
pub trait EditorHost: Send + Sync {
    /// Move the caret to `position` and scroll it into view
    fn reveal_position(&self, position: CursorPosition);
}

/// Everything a worker needs to parse one generation off the session
#[derive(Clone)]
pub struct ParseJob {
    pipeline: Arc<DiagramPipeline>,
    identities: IdentityTracker,
}

impl ParseJob {
    /// # Errors
    ///
    /// Returns a `PipelineFault` if the pipeline panicked
    pub fn run(&self, text: &str, generation: u64) -> Result<ParseOutput, PipelineFault> {
        self.pipeline.run(text, generation, &self.identities)
    }
}

/// Everything a worker needs to render one published generation
pub struct RenderJob {
    renders: RenderPipeline,
    renderer: Arc<dyn DiagramRenderer>,
    result: Arc<ParseResult>,
}

impl RenderJob {
    #[must_use]
    pub fn run(&self) -> RenderBatch {
        self.renders
            .render_generation(&self.result, self.renderer.as_ref())
    }
}

pub struct DocumentSession {
    pipeline: Arc<DiagramPipeline>,
    scheduler: ParseScheduler,
    identities: IdentityTracker,
    mapper: DiagramMapper,
    renders: RenderPipeline,
    renderer: Option<Arc<dyn DiagramRenderer>>,
    editor: Option<Arc<dyn EditorHost>>,
    displayed: HashMap<DiagramId, RenderOutput>,
    listeners: Vec<ResultCallback>,
    text: Arc<str>,
    file: DocumentFile,
    active: Option<DiagramId>,
}

impl DocumentSession {
    /// Create a session for an untitled document
    ///
    /// `checker` replaces the built-in grammar as the primary checker, with
    /// the built-in grammar kept as its fallback.
    #[must_use]
    pub fn new(config: &EngineConfig, checker: Option<Arc<dyn GrammarChecker>>) -> Self {
        Self {
            pipeline: Arc::new(config.build_pipeline(checker)),
            scheduler: ParseScheduler::new(config.scheduler),
            identities: IdentityTracker::new(),
            mapper: DiagramMapper::default(),
            renders: RenderPipeline::default(),
            renderer: None,
            editor: None,
            displayed: HashMap::new(),
            listeners: Vec::new(),
            text: Arc::from(""),
            file: DocumentFile::untitled(),
            active: None,
        }
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn DiagramRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    #[must_use]
    pub fn with_editor(mut self, editor: Arc<dyn EditorHost>) -> Self {
        self.editor = Some(editor);
        self
    }

    pub fn set_renderer(&mut self, renderer: Option<Arc<dyn DiagramRenderer>>) {
        self.renderer = renderer;
    }

    pub fn set_editor(&mut self, editor: Option<Arc<dyn EditorHost>>) {
        self.editor = editor;
    }

    /// Register a callback for every future publication
    pub fn subscribe(&mut self, callback: impl Fn(&ParseResult) + Send + Sync + 'static) {
        self.listeners.push(Box::new(callback));
    }

    // Document lifecycle

    /// Take over a document from the file store and parse it right away
    pub fn open(&mut self, file: DocumentFile, now: Instant) -> Arc<ParseResult> {
        info!(
            name = file.name.as_str(),
            file_type:? = file.file_type,
            bytes = file.content.len();
            "Opening document"
        );

        self.reset();
        self.pipeline = Arc::new(self.pipeline.with_scan_mode(file.file_type.scan_mode()));
        self.scheduler.text_changed(file.content.as_str(), now);
        self.text = Arc::from(file.content.as_str());
        self.file = file;

        self.flush(now);
        self.tick(now);
        self.parse_result()
    }

    /// Read `path` from `store` and open it
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot read the path
    pub fn open_path(
        &mut self,
        store: &dyn FileStore,
        path: &str,
        now: Instant,
    ) -> StoreResult<Arc<ParseResult>> {
        let file = store::load(store, path)?;
        Ok(self.open(file, now))
    }

    /// Write the current text to the document's path
    ///
    /// A pending edit is parsed first so the published result matches what
    /// was saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the document has no path or the store fails
    pub fn save(&mut self, store: &mut dyn FileStore, now: Instant) -> Result<(), SessionError> {
        let path = self.file.path.clone().ok_or(SessionError::MissingPath)?;
        self.save_to(store, &path, now)
    }

    /// Write the current text to `path` and adopt it as the document's path
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    pub fn save_as(
        &mut self,
        store: &mut dyn FileStore,
        path: &str,
        now: Instant,
    ) -> Result<(), SessionError> {
        self.save_to(store, path, now)?;
        let previous = self.file.file_type.scan_mode();
        self.file.set_path(path);

        let mode = self.file.file_type.scan_mode();
        if mode != previous {
            debug!(path = path, mode:? = mode; "File type changed, reparsing");
            self.pipeline = Arc::new(self.pipeline.with_scan_mode(mode));
            self.scheduler.text_changed(Arc::clone(&self.text), now);
            self.flush(now);
            self.tick(now);
        }
        Ok(())
    }

    fn save_to(
        &mut self,
        store: &mut dyn FileStore,
        path: &str,
        now: Instant,
    ) -> Result<(), SessionError> {
        if self.flush(now) {
            self.tick(now);
        }

        store.write_text(path, &self.text)?;
        self.file.content = self.text.to_string();
        self.file.is_saved = true;
        info!(path = path, bytes = self.text.len(); "Saved document");
        Ok(())
    }

    /// Stop scheduling and forget everything derived from the document
    ///
    /// Subscribers receive the empty result so they can clear their views.
    pub fn close(&mut self) {
        info!(name = self.file.name.as_str(); "Closing document");
        self.reset();
        self.text = Arc::from("");
        self.file = DocumentFile::untitled();
        self.notify(&self.parse_result());
    }

    fn reset(&mut self) {
        self.scheduler.cancel();
        let retired = self.identities.reset();
        self.renders.cache().lock().clear();
        self.mapper.publish(Arc::new(ParseResult::empty()));
        self.displayed.clear();
        self.active = None;
        debug!(retired = retired.len(); "Reset document state");
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub const fn file(&self) -> &DocumentFile {
        &self.file
    }

    /// Whether the text differs from what was last opened or saved
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        !self.file.is_saved
    }

    // Scheduling

    /// Record an edit; the parse runs once typing pauses
    pub fn text_changed(&mut self, text: impl Into<Arc<str>>, now: Instant) {
        let text = text.into();
        if *text != *self.text {
            self.file.is_saved = false;
        }
        self.scheduler.text_changed(Arc::clone(&text), now);
        self.text = text;
    }

    /// Make a pending edit due now; returns whether one was pending
    pub fn flush(&mut self, now: Instant) -> bool {
        self.scheduler.flush(now)
    }

    /// Next scheduler action that is due, for hosts running work elsewhere
    pub fn poll(&mut self, now: Instant) -> Option<SchedulerAction> {
        self.scheduler.poll(now)
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Run every due action inline, returning how many ran
    pub fn tick(&mut self, now: Instant) -> usize {
        let mut ran = 0;
        while let Some(action) = self.scheduler.poll(now) {
            ran += 1;
            match action {
                SchedulerAction::StartParse { generation, text } => {
                    let outcome = self.pipeline.run(&text, generation, &self.identities);
                    self.complete_parse(generation, outcome, now);
                }
                SchedulerAction::StartRender { generation } => {
                    if let Some(job) = self.render_job(generation) {
                        let batch = job.run();
                        self.complete_render(batch);
                    }
                }
            }
        }
        ran
    }

    /// Snapshot for parsing off the session
    #[must_use]
    pub fn parse_job(&self) -> ParseJob {
        ParseJob {
            pipeline: Arc::clone(&self.pipeline),
            identities: self.identities.clone(),
        }
    }

    /// Snapshot for rendering `generation` off the session
    ///
    /// None when no renderer is attached or the generation is no longer the
    /// published one.
    #[must_use]
    pub fn render_job(&self, generation: u64) -> Option<RenderJob> {
        let renderer = self.renderer.as_ref()?;
        let result = self.mapper.result();
        if !self.scheduler.is_current(generation) || result.generation != generation {
            return None;
        }

        Some(RenderJob {
            renders: self.renders.clone(),
            renderer: Arc::clone(renderer),
            result: Arc::clone(result),
        })
    }

    /// Hand back the outcome of a parse started from `poll`
    ///
    /// Returns true if the result was published. A completion for a
    /// superseded generation is dropped. A pipeline fault publishes a
    /// degraded result in place of the real one.
    pub fn complete_parse(
        &mut self,
        generation: u64,
        outcome: Result<ParseOutput, PipelineFault>,
        now: Instant,
    ) -> bool {
        if !self.scheduler.complete(generation, now) {
            debug!(
                generation = generation,
                published = self.scheduler.last_published();
                "Discarded stale parse"
            );
            return false;
        }

        let result = match outcome {
            Ok(output) => {
                self.identities.commit(&output.reconciliation);
                output.result
            }
            Err(fault) => {
                warn!(generation = generation, reason = fault.reason.as_str(); "Parse pipeline faulted");
                ParseResult::degraded(generation, fault.to_string())
            }
        };

        self.publish(result);
        true
    }

    fn publish(&mut self, result: ParseResult) {
        let result = Arc::new(result);

        let invalidated = self
            .renders
            .cache()
            .lock()
            .invalidate_failures(&Fingerprint::present_in(&result));

        self.displayed = {
            let cache = self.renders.cache().lock();
            result
                .diagrams
                .iter()
                .map(|diagram| {
                    let output = if diagram.has_error {
                        RenderOutput::SyntaxInvalid(
                            diagram.error_message.clone().unwrap_or_default(),
                        )
                    } else {
                        cache
                            .get(diagram.kind, &diagram.content)
                            .cloned()
                            .map_or(RenderOutput::Pending, RenderOutput::from)
                    };
                    (diagram.id.clone(), output)
                })
                .collect()
        };

        if self
            .active
            .as_ref()
            .is_some_and(|id| result.diagram(id).is_none())
        {
            self.active = None;
        }

        self.mapper.publish(Arc::clone(&result));
        debug!(
            generation = result.generation,
            diagrams = result.diagrams.len(),
            errors = result.errors.len(),
            degraded = result.degraded,
            invalidated = invalidated;
            "Published parse result"
        );

        self.notify(&result);
    }

    fn notify(&self, result: &ParseResult) {
        for listener in &self.listeners {
            listener(result);
        }
    }

    /// Hand back a finished render batch
    ///
    /// Returns true if the batch belongs to the displayed generation and
    /// replaced the displayed outputs. Older batches only feed the cache.
    pub fn complete_render(&mut self, batch: RenderBatch) -> bool {
        if !self.scheduler.is_current(batch.generation)
            || self.mapper.result().generation != batch.generation
        {
            debug!(generation = batch.generation; "Render batch superseded");
            return false;
        }

        self.displayed.extend(batch.outputs);
        true
    }

    /// Drop cached renders for content the published result no longer has
    ///
    /// Returns how many entries were evicted.
    pub fn trim_render_cache(&mut self) -> usize {
        let present = Fingerprint::present_in(self.mapper.result());
        let evicted = self.renders.cache().lock().evict_absent(&present);
        debug!(evicted = evicted; "Trimmed render cache");
        evicted
    }

    // Queries

    /// The latest published result
    #[must_use]
    pub fn parse_result(&self) -> Arc<ParseResult> {
        Arc::clone(self.mapper.result())
    }

    #[must_use]
    pub const fn mapper(&self) -> &DiagramMapper {
        &self.mapper
    }

    #[must_use]
    pub fn diagram_at(&self, position: CursorPosition) -> Option<&DiagramBlock> {
        self.mapper.diagram_at(position)
    }

    /// Track the caret; returns the diagram it is in
    pub fn cursor_moved(&mut self, position: CursorPosition) -> Option<&DiagramBlock> {
        let block = self.mapper.diagram_at(position);
        self.active = block.map(|b| b.id.clone());
        block
    }

    /// Diagram under the caret or last selected
    #[must_use]
    pub const fn active_diagram(&self) -> Option<&DiagramId> {
        self.active.as_ref()
    }

    /// Select a diagram from the preview side
    ///
    /// Returns the caret target and forwards it to the attached editor.
    pub fn select_diagram(&mut self, id: &DiagramId) -> Option<CursorPosition> {
        let target = self.mapper.target_position_for(id)?;
        self.active = Some(id.clone());
        if let Some(editor) = &self.editor {
            editor.reveal_position(target);
        }
        Some(target)
    }

    /// What the preview should show for a diagram of the published result
    #[must_use]
    pub fn render_output(&self, id: &DiagramId) -> Option<RenderOutput> {
        self.mapper.result().diagram(id)?;
        Some(
            self.displayed
                .get(id)
                .cloned()
                .unwrap_or(RenderOutput::Pending),
        )
    }
}

impl Default for DocumentSession {
    fn default() -> Self {
        Self::new(&EngineConfig::default(), None)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::error::{RenderError, StoreError};
    use crate::parser::DiagramKind;
    use crate::store::{FileType, MemoryFileStore};

    const FLOW: &str = "```mermaid\ngraph TD\n    A --> B\n```";

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[derive(Default)]
    struct CountingRenderer {
        calls: AtomicUsize,
    }

    impl DiagramRenderer for CountingRenderer {
        fn render(&self, _diagram_id: &str, diagram_text: &str) -> Result<Vec<u8>, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if diagram_text.contains("explode") {
                Err(RenderError::failed("no layout"))
            } else {
                Ok(diagram_text.as_bytes().to_vec())
            }
        }
    }

    #[derive(Default)]
    struct RecordingEditor {
        revealed: Mutex<Vec<CursorPosition>>,
    }

    impl EditorHost for RecordingEditor {
        fn reveal_position(&self, position: CursorPosition) {
            self.revealed.lock().unwrap().push(position);
        }
    }

    fn start_parse(action: Option<SchedulerAction>) -> (u64, Arc<str>) {
        match action {
            Some(SchedulerAction::StartParse { generation, text }) => (generation, text),
            other => panic!("expected a parse, got {other:?}"),
        }
    }

    #[test]
    fn open_parses_immediately() {
        let mut session = DocumentSession::default();
        let result = session.open(DocumentFile::from_path("a.md", FLOW), Instant::now());

        assert_eq!(result.diagrams.len(), 1);
        assert_eq!(result.diagrams[0].kind, DiagramKind::Flowchart);
        assert!(!result.diagrams[0].has_error);
        assert_eq!((result.diagrams[0].start_line, result.diagrams[0].end_line), (1, 4));
        assert!(!session.is_dirty());
    }

    #[test]
    fn open_mmd_file_scans_whole_document() {
        let mut store = MemoryFileStore::new();
        store.write_text("seq.mmd", "sequenceDiagram\n  A->>B: hi").unwrap();

        let mut session = DocumentSession::default();
        let result = session.open_path(&store, "seq.mmd", Instant::now()).unwrap();

        assert_eq!(session.file().file_type, FileType::Mermaid);
        assert_eq!(result.diagrams.len(), 1);
        assert_eq!(result.diagrams[0].kind, DiagramKind::Sequence);
    }

    #[test]
    fn rapid_edits_publish_once_with_final_text() {
        let t0 = Instant::now();
        let publications = Arc::new(AtomicUsize::new(0));
        let mut session = DocumentSession::default();
        let counter = Arc::clone(&publications);
        session.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        session.text_changed("```mermaid\ngr", t0);
        assert_eq!(session.tick(t0 + ms(100)), 0);
        session.text_changed("```mermaid\ngraph", t0 + ms(100));
        assert_eq!(session.tick(t0 + ms(200)), 0);
        session.text_changed(FLOW, t0 + ms(200));

        session.tick(t0 + ms(500));
        assert_eq!(publications.load(Ordering::SeqCst), 1);

        let result = session.parse_result();
        assert_eq!(result.generation, 1);
        assert_eq!(result.diagrams[0].content, "graph TD\n    A --> B");
        assert_eq!(session.tick(t0 + ms(5000)), 1);
        assert_eq!(publications.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn late_stale_completion_is_discarded() {
        let t0 = Instant::now();
        let mut session = DocumentSession::default();

        session.text_changed("```mermaid\npie\n```", t0);
        let (first, first_text) = start_parse(session.poll(t0 + ms(300)));
        let stale_job = session.parse_job();

        session.text_changed(FLOW, t0 + ms(310));
        let (second, second_text) = start_parse(session.poll(t0 + ms(610)));
        let job = session.parse_job();

        assert!(session.complete_parse(second, job.run(&second_text, second), t0 + ms(620)));
        assert!(!session.complete_parse(
            first,
            stale_job.run(&first_text, first),
            t0 + ms(900)
        ));

        let result = session.parse_result();
        assert_eq!(result.generation, second);
        assert_eq!(result.diagrams[0].kind, DiagramKind::Flowchart);
    }

    #[test]
    fn pipeline_fault_publishes_degraded_result() {
        let t0 = Instant::now();
        let mut session = DocumentSession::default();
        session.open(DocumentFile::from_path("a.md", FLOW), t0);

        session.text_changed("```mermaid\npie\n```", t0);
        let (generation, _) = start_parse(session.poll(t0 + ms(300)));
        assert!(session.complete_parse(
            generation,
            Err(PipelineFault::new("checker exploded")),
            t0 + ms(301)
        ));

        let result = session.parse_result();
        assert!(result.degraded);
        assert!(result.diagrams.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("checker exploded"));
    }

    #[test]
    fn cursor_and_selection_sync() {
        let editor = Arc::new(RecordingEditor::default());
        let mut session = DocumentSession::default().with_editor(editor.clone());
        let text = "# Title\n\n```mermaid\ngraph TD\n  A-->B\n```\n\n```mermaid\npie\n```";
        session.open(DocumentFile::from_path("a.md", text), Instant::now());

        let second = session.parse_result().diagrams[1].id.clone();
        assert_eq!(
            session.cursor_moved(CursorPosition::new(9, 1)).map(|d| d.id.clone()),
            Some(second.clone())
        );
        assert_eq!(session.active_diagram(), Some(&second));
        assert!(session.cursor_moved(CursorPosition::new(7, 1)).is_none());
        assert_eq!(session.active_diagram(), None);

        let target = session.select_diagram(&second).unwrap();
        assert_eq!(target, CursorPosition::new(8, 1));
        assert_eq!(*editor.revealed.lock().unwrap(), vec![CursorPosition::new(8, 1)]);
        assert!(session.select_diagram(&DiagramId::from("missing")).is_none());
    }

    #[test]
    fn identical_blocks_share_one_render() {
        let t0 = Instant::now();
        let renderer = Arc::new(CountingRenderer::default());
        let mut session = DocumentSession::default().with_renderer(renderer.clone());
        let text = format!("{FLOW}\n\n{FLOW}");
        session.open(DocumentFile::from_path("a.md", text), t0);

        let result = session.parse_result();
        let (first, second) = (&result.diagrams[0].id, &result.diagrams[1].id);
        assert_eq!(session.render_output(first), Some(RenderOutput::Pending));

        session.tick(t0 + ms(500));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
        let output = session.render_output(first).unwrap();
        assert!(matches!(output, RenderOutput::Rendered(_)));
        assert_eq!(session.render_output(second), Some(output));
    }

    #[test]
    fn invalid_blocks_report_syntax_error_output() {
        let t0 = Instant::now();
        let renderer = Arc::new(CountingRenderer::default());
        let mut session = DocumentSession::default().with_renderer(renderer.clone());
        session.open(DocumentFile::from_path("a.md", "```mermaid\n```"), t0);
        session.tick(t0 + ms(500));

        let id = session.parse_result().diagrams[0].id.clone();
        assert_eq!(
            session.render_output(&id),
            Some(RenderOutput::SyntaxInvalid("Empty diagram content".to_string()))
        );
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn superseded_render_batch_is_not_displayed() {
        let t0 = Instant::now();
        let renderer = Arc::new(CountingRenderer::default());
        let mut session = DocumentSession::default().with_renderer(renderer.clone());
        session.open(DocumentFile::from_path("a.md", FLOW), t0);
        let job = session.render_job(session.parse_result().generation).unwrap();

        session.text_changed("```mermaid\npie\n```", t0 + ms(10));
        session.tick(t0 + ms(310));

        let batch = job.run();
        assert!(!session.complete_render(batch));
        let id = session.parse_result().diagrams[0].id.clone();
        assert_eq!(session.render_output(&id), Some(RenderOutput::Pending));
        // the stale render still landed in the cache
        assert!(
            session
                .renders
                .cache()
                .get(DiagramKind::Flowchart, "graph TD\n    A --> B")
                .is_some()
        );
    }

    #[test]
    fn failed_render_is_reported_and_cached() {
        let t0 = Instant::now();
        let renderer = Arc::new(CountingRenderer::default());
        let mut session = DocumentSession::default().with_renderer(renderer.clone());
        session.open(
            DocumentFile::from_path("a.md", "```mermaid\ngraph TD\n  explode --> B\n```"),
            t0,
        );
        session.tick(t0 + ms(500));

        let id = session.parse_result().diagrams[0].id.clone();
        assert!(matches!(
            session.render_output(&id),
            Some(RenderOutput::RenderFailed(_))
        ));

        // removing the content invalidates the cached failure
        session.text_changed("```mermaid\npie\n```", t0 + ms(600));
        session.tick(t0 + ms(900));
        assert!(
            session
                .renders
                .cache()
                .get(DiagramKind::Flowchart, "graph TD\n  explode --> B")
                .is_none()
        );
    }

    #[test]
    fn save_writes_current_text() {
        let t0 = Instant::now();
        let mut store = MemoryFileStore::new();
        let mut session = DocumentSession::default();
        session.open(DocumentFile::from_path("notes.md", ""), t0);

        session.text_changed(FLOW, t0);
        assert!(session.is_dirty());
        session.save(&mut store, t0 + ms(1)).unwrap();

        assert_eq!(store.read_text("notes.md").unwrap(), FLOW);
        assert!(!session.is_dirty());
        // saving flushed the pending edit
        assert_eq!(session.parse_result().diagrams.len(), 1);
    }

    #[test]
    fn save_untitled_needs_a_path() {
        let mut store = MemoryFileStore::new();
        let mut session = DocumentSession::default();
        session.text_changed("pie", Instant::now());

        assert_eq!(
            session.save(&mut store, Instant::now()),
            Err(SessionError::MissingPath)
        );
        session.save_as(&mut store, "chart.md", Instant::now()).unwrap();
        assert_eq!(session.file().name, "chart.md");
        assert_eq!(store.read_text("chart.md").unwrap(), "pie");
    }

    #[test]
    fn save_as_mermaid_file_reparses_whole_document() {
        let t0 = Instant::now();
        let mut store = MemoryFileStore::new();
        let mut session = DocumentSession::default();
        session.text_changed("sequenceDiagram\n  A->>B: hi", t0);
        session.tick(t0 + ms(300));
        assert!(session.parse_result().diagrams.is_empty());

        session.save_as(&mut store, "seq.mmd", t0 + ms(400)).unwrap();

        assert_eq!(session.file().file_type, FileType::Mermaid);
        let result = session.parse_result();
        assert_eq!(result.diagrams.len(), 1);
        assert_eq!(result.diagrams[0].kind, DiagramKind::Sequence);
    }

    #[test]
    fn trim_drops_renders_of_removed_content() {
        let t0 = Instant::now();
        let renderer = Arc::new(CountingRenderer::default());
        let mut session = DocumentSession::default().with_renderer(renderer.clone());
        session.open(DocumentFile::from_path("a.md", FLOW), t0);
        session.tick(t0 + ms(500));

        session.text_changed("```mermaid\npie\n```", t0 + ms(600));
        session.tick(t0 + ms(900));
        session.tick(t0 + ms(1400));
        assert_eq!(session.renders.cache().lock().len(), 2);

        assert_eq!(session.trim_render_cache(), 1);
        assert!(
            session
                .renders
                .cache()
                .get(DiagramKind::Flowchart, "graph TD\n    A --> B")
                .is_none()
        );
        assert!(session.renders.cache().get(DiagramKind::Pie, "pie").is_some());
    }

    #[test]
    fn open_missing_path_fails() {
        let store = MemoryFileStore::new();
        let mut session = DocumentSession::default();
        assert!(matches!(
            session.open_path(&store, "gone.md", Instant::now()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn close_forgets_everything() {
        let t0 = Instant::now();
        let renderer = Arc::new(CountingRenderer::default());
        let mut session = DocumentSession::default().with_renderer(renderer.clone());
        session.open(DocumentFile::from_path("a.md", FLOW), t0);
        session.tick(t0 + ms(500));

        let published = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&published);
        session.subscribe(move |result| {
            sink.lock().unwrap().push(result.diagrams.len());
        });

        session.text_changed("```mermaid\npie\n```", t0 + ms(600));
        session.close();

        assert!(session.parse_result().diagrams.is_empty());
        assert_eq!(*published.lock().unwrap(), vec![0]);
        assert!(session.renders.cache().lock().is_empty());
        assert_eq!(session.next_deadline(), None);
        assert_eq!(session.tick(t0 + ms(5000)), 0);
        assert_eq!(session.text(), "");
    }
}
