//! Keystroke-driven scheduling of parse and render work

pub mod live;
pub mod scheduler;

pub use live::{LiveHandle, LiveSession};
pub use scheduler::{ParseScheduler, ParseState, SchedulerAction, SchedulerConfig};
