//! Debounce state machine deciding when to parse and when to render
//!
//! The scheduler never runs work itself. Callers feed it edits and clock
//! readings, and it answers with the next action that is due. Time is passed
//! in explicitly so the machine can be driven by a real or a paused clock.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Debounce windows, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Quiet time after the last edit before a parse starts
    pub input_debounce_ms: u64,
    /// Quiet time after a publication before its diagrams are rendered
    pub render_debounce_ms: u64,
}

impl SchedulerConfig {
    #[must_use]
    pub const fn input_debounce(&self) -> Duration {
        Duration::from_millis(self.input_debounce_ms)
    }

    #[must_use]
    pub const fn render_debounce(&self) -> Duration {
        Duration::from_millis(self.render_debounce_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            input_debounce_ms: 300,
            render_debounce_ms: 500,
        }
    }
}

/// Where the parse side of the scheduler stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseState {
    Idle,
    /// An edit is waiting for the input window to elapse
    Pending { text: Arc<str>, deadline: Instant },
    /// A parse for `generation` has been handed out
    Parsing { generation: u64 },
}

/// Work the caller should start now
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerAction {
    StartParse { generation: u64, text: Arc<str> },
    StartRender { generation: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RenderDue {
    generation: u64,
    deadline: Instant,
}

/// Debounced parse/render scheduler for one document
#[derive(Debug, Clone)]
pub struct ParseScheduler {
    config: SchedulerConfig,
    state: ParseState,
    last_generation: u64,
    last_published: u64,
    render_due: Option<RenderDue>,
}

impl ParseScheduler {
    #[must_use]
    pub const fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            state: ParseState::Idle,
            last_generation: 0,
            last_published: 0,
            render_due: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &ParseState {
        &self.state
    }

    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Newest generation that has been published
    #[must_use]
    pub const fn last_published(&self) -> u64 {
        self.last_published
    }

    /// Generation currently handed out for parsing, if any
    #[must_use]
    pub const fn in_flight(&self) -> Option<u64> {
        match self.state {
            ParseState::Parsing { generation } => Some(generation),
            _ => None,
        }
    }

    /// Record an edit
    ///
    /// Restarts the input window and supersedes any parse in flight. A
    /// pending render is pushed back so it only fires once typing pauses.
    pub fn text_changed(&mut self, text: impl Into<Arc<str>>, now: Instant) {
        self.state = ParseState::Pending {
            text: text.into(),
            deadline: now + self.config.input_debounce(),
        };
        if let Some(due) = &mut self.render_due {
            due.deadline = now + self.config.render_debounce();
        }
    }

    /// Make a pending edit due immediately
    ///
    /// Returns true when there was an edit to flush.
    pub fn flush(&mut self, now: Instant) -> bool {
        match &mut self.state {
            ParseState::Pending { deadline, .. } => {
                *deadline = now;
                true
            }
            _ => false,
        }
    }

    /// The next action whose deadline has passed, if any
    pub fn poll(&mut self, now: Instant) -> Option<SchedulerAction> {
        if let ParseState::Pending { text, deadline } = &self.state {
            if *deadline <= now {
                let text = Arc::clone(text);
                self.last_generation += 1;
                let generation = self.last_generation;
                self.state = ParseState::Parsing { generation };
                return Some(SchedulerAction::StartParse { generation, text });
            }
        }

        match self.render_due {
            Some(due) if due.deadline <= now => {
                self.render_due = None;
                Some(SchedulerAction::StartRender {
                    generation: due.generation,
                })
            }
            _ => None,
        }
    }

    /// Earliest instant at which `poll` will have something to return
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        let parse = match &self.state {
            ParseState::Pending { deadline, .. } => Some(*deadline),
            _ => None,
        };
        let render = self.render_due.map(|due| due.deadline);
        match (parse, render) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Report that the parse for `generation` finished
    ///
    /// Returns true when the result should be published. Completions for a
    /// superseded or cancelled generation return false and change nothing.
    pub fn complete(&mut self, generation: u64, now: Instant) -> bool {
        if self.in_flight() != Some(generation) || generation <= self.last_published {
            return false;
        }

        self.state = ParseState::Idle;
        self.last_published = generation;
        self.render_due = Some(RenderDue {
            generation,
            deadline: now + self.config.render_debounce(),
        });
        true
    }

    /// Whether render output for `generation` belongs on screen
    #[must_use]
    pub const fn is_current(&self, generation: u64) -> bool {
        generation == self.last_published
    }

    /// Drop pending work and orphan whatever is in flight
    pub fn cancel(&mut self) {
        self.state = ParseState::Idle;
        self.render_due = None;
    }
}

impl Default for ParseScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}
