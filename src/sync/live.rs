//! Async driver that runs a session's scheduled work on a tokio runtime

use std::future;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{self, JoinHandle};
use tokio::time::{self, Instant as TokioInstant};

use super::scheduler::SchedulerAction;
use crate::document::CursorPosition;
use crate::error::{PipelineFault, SessionError};
use crate::parser::manager::ParseOutput;
use crate::parser::{DiagramBlock, DiagramId, ParseResult};
use crate::render::{RenderBatch, RenderOutput};
use crate::session::DocumentSession;
use crate::store::{DocumentFile, FileStore, MemoryFileStore};

const COMMAND_BUFFER: usize = 64;

type Reply<T> = oneshot::Sender<T>;

#[derive(Debug)]
enum Command {
    TextChanged(Arc<str>),
    CursorMoved(CursorPosition, Reply<Option<DiagramBlock>>),
    DiagramAt(CursorPosition, Reply<Option<DiagramBlock>>),
    SelectDiagram(DiagramId, Reply<Option<CursorPosition>>),
    RenderOutput(DiagramId, Reply<Option<RenderOutput>>),
    Open(DocumentFile, Reply<Arc<ParseResult>>),
    OpenPath(String, Reply<Result<Arc<ParseResult>, SessionError>>),
    Save(Reply<Result<(), SessionError>>),
    SaveAs(String, Reply<Result<(), SessionError>>),
    Flush,
    Close,
}

enum Completion {
    Parse {
        generation: u64,
        outcome: Result<ParseOutput, PipelineFault>,
    },
    Render(RenderBatch),
}

/// Host-side handle to a running [`LiveSession`]
///
/// Queries answer from the session task, so they see every edit sent
/// before them. Once the session has stopped, queries return `None` and
/// file operations fail with [`SessionError::Stopped`].
#[derive(Debug, Clone)]
pub struct LiveHandle {
    commands: mpsc::Sender<Command>,
    published: watch::Receiver<Arc<ParseResult>>,
    rendered: watch::Receiver<u64>,
}

impl LiveHandle {
    /// Forward an edit; returns false once the session has stopped
    pub async fn text_changed(&self, text: impl Into<Arc<str>>) -> bool {
        self.send(Command::TextChanged(text.into())).await
    }

    /// Track the caret; returns the diagram it is in
    pub async fn cursor_moved(&self, position: CursorPosition) -> Option<DiagramBlock> {
        self.request(|reply| Command::CursorMoved(position, reply))
            .await
            .flatten()
    }

    pub async fn diagram_at(&self, position: CursorPosition) -> Option<DiagramBlock> {
        self.request(|reply| Command::DiagramAt(position, reply))
            .await
            .flatten()
    }

    /// Select a diagram from the preview, moving the session's editor to it
    pub async fn select_diagram(&self, id: DiagramId) -> Option<CursorPosition> {
        self.request(|reply| Command::SelectDiagram(id, reply))
            .await
            .flatten()
    }

    pub async fn render_output(&self, id: DiagramId) -> Option<RenderOutput> {
        self.request(|reply| Command::RenderOutput(id, reply))
            .await
            .flatten()
    }

    /// Replace the document and parse it right away
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] if the session has shut down
    pub async fn open(&self, file: DocumentFile) -> Result<Arc<ParseResult>, SessionError> {
        self.request(|reply| Command::Open(file, reply))
            .await
            .ok_or(SessionError::Stopped)
    }

    /// Read `path` from the session's store and open it
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot read the path or the session
    /// has shut down
    pub async fn open_path(&self, path: impl Into<String>) -> Result<Arc<ParseResult>, SessionError> {
        let path = path.into();
        self.request(|reply| Command::OpenPath(path, reply))
            .await
            .unwrap_or(Err(SessionError::Stopped))
    }

    /// # Errors
    ///
    /// Returns an error if the document has no path, the store fails or the
    /// session has shut down
    pub async fn save(&self) -> Result<(), SessionError> {
        self.request(Command::Save)
            .await
            .unwrap_or(Err(SessionError::Stopped))
    }

    /// # Errors
    ///
    /// Returns an error if the store fails or the session has shut down
    pub async fn save_as(&self, path: impl Into<String>) -> Result<(), SessionError> {
        let path = path.into();
        self.request(|reply| Command::SaveAs(path, reply))
            .await
            .unwrap_or(Err(SessionError::Stopped))
    }

    /// Parse a pending edit without waiting for the input window
    pub async fn flush(&self) -> bool {
        self.send(Command::Flush).await
    }

    /// Stop the session; the driver task returns it once it has shut down
    pub async fn close(&self) -> bool {
        self.send(Command::Close).await
    }

    async fn send(&self, command: Command) -> bool {
        self.commands.send(command).await.is_ok()
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Option<T> {
        let (reply, response) = oneshot::channel();
        if !self.send(command(reply)).await {
            return None;
        }
        response.await.ok()
    }

    /// Watch published parse results
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<ParseResult>> {
        self.published.clone()
    }

    /// Watch the generation whose renders are on display
    #[must_use]
    pub fn rendered(&self) -> watch::Receiver<u64> {
        self.rendered.clone()
    }

    /// Latest published result
    #[must_use]
    pub fn latest(&self) -> Arc<ParseResult> {
        Arc::clone(&self.published.borrow())
    }
}

/// Owns a [`DocumentSession`] inside a tokio task
///
/// Commands arrive over a channel, timers follow the scheduler's deadlines,
/// and parses and renders run on the blocking pool. Only the task touches
/// the session, so completions are applied in the order they arrive and
/// stale ones are dropped by generation.
pub struct LiveSession {
    session: DocumentSession,
    store: Box<dyn FileStore>,
    commands: mpsc::Receiver<Command>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    published: watch::Sender<Arc<ParseResult>>,
    rendered: watch::Sender<u64>,
}

impl LiveSession {
    /// Start driving `session` on the current runtime, with an in-memory
    /// file store
    ///
    /// The join handle yields the session back after `close`, or after every
    /// handle has been dropped.
    pub fn spawn(session: DocumentSession) -> (LiveHandle, JoinHandle<DocumentSession>) {
        Self::spawn_with_store(session, Box::new(MemoryFileStore::new()))
    }

    /// Start driving `session`, opening and saving through `store`
    pub fn spawn_with_store(
        session: DocumentSession,
        store: Box<dyn FileStore>,
    ) -> (LiveHandle, JoinHandle<DocumentSession>) {
        let (commands_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let (published, published_rx) = watch::channel(session.parse_result());
        let (rendered, rendered_rx) = watch::channel(0);

        let live = Self {
            session,
            store,
            commands,
            completions_tx,
            completions,
            published,
            rendered,
        };
        let handle = LiveHandle {
            commands: commands_tx,
            published: published_rx,
            rendered: rendered_rx,
        };

        (handle, tokio::spawn(live.run()))
    }

    async fn run(mut self) -> DocumentSession {
        info!("Live session started");

        loop {
            let deadline = self.session.next_deadline();
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Close) | None => break,
                    Some(command) => self.handle(command),
                },
                Some(completion) = self.completions.recv() => self.apply(completion),
                () = sleep_until(deadline) => self.dispatch_due(),
            }
        }

        self.session.close();
        self.announce();
        info!("Live session stopped");
        self.session
    }

    fn handle(&mut self, command: Command) {
        // a dropped reply receiver only means the caller stopped waiting
        match command {
            Command::TextChanged(text) => self.session.text_changed(text, now()),
            Command::CursorMoved(position, reply) => {
                let _ = reply.send(self.session.cursor_moved(position).cloned());
            }
            Command::DiagramAt(position, reply) => {
                let _ = reply.send(self.session.diagram_at(position).cloned());
            }
            Command::SelectDiagram(id, reply) => {
                let _ = reply.send(self.session.select_diagram(&id));
            }
            Command::RenderOutput(id, reply) => {
                let _ = reply.send(self.session.render_output(&id));
            }
            Command::Open(file, reply) => {
                let _ = reply.send(self.session.open(file, now()));
            }
            Command::OpenPath(path, reply) => {
                let opened = self
                    .session
                    .open_path(&*self.store, &path, now())
                    .map_err(SessionError::from);
                let _ = reply.send(opened);
            }
            Command::Save(reply) => {
                let _ = reply.send(self.session.save(&mut *self.store, now()));
            }
            Command::SaveAs(path, reply) => {
                let _ = reply.send(self.session.save_as(&mut *self.store, &path, now()));
            }
            Command::Flush => {
                self.session.flush(now());
                self.dispatch_due();
            }
            Command::Close => {}
        }
        self.announce();
    }

    fn dispatch_due(&mut self) {
        while let Some(action) = self.session.poll(now()) {
            match action {
                SchedulerAction::StartParse { generation, text } => {
                    let job = self.session.parse_job();
                    let done = self.completions_tx.clone();
                    debug!(generation = generation; "Starting parse");
                    task::spawn_blocking(move || {
                        let outcome = job.run(&text, generation);
                        // a closed receiver means the session already stopped
                        let _ = done.send(Completion::Parse {
                            generation,
                            outcome,
                        });
                    });
                }
                SchedulerAction::StartRender { generation } => {
                    let Some(job) = self.session.render_job(generation) else {
                        continue;
                    };
                    let done = self.completions_tx.clone();
                    debug!(generation = generation; "Starting render");
                    task::spawn_blocking(move || {
                        let _ = done.send(Completion::Render(job.run()));
                    });
                }
            }
        }
    }

    fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Parse {
                generation,
                outcome,
            } => {
                self.session.complete_parse(generation, outcome, now());
                self.announce();
            }
            Completion::Render(batch) => {
                let generation = batch.generation;
                if self.session.complete_render(batch) {
                    self.rendered.send_replace(generation);
                }
            }
        }
    }

    /// Push the session's result to watchers if it changed
    fn announce(&self) {
        let current = self.session.parse_result();
        let unchanged = Arc::ptr_eq(&current, &self.published.borrow());
        if !unchanged {
            self.published.send_replace(current);
        }
    }
}

fn now() -> Instant {
    TokioInstant::now().into_std()
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(TokioInstant::from_std(deadline)).await,
        None => future::pending().await,
    }
}
