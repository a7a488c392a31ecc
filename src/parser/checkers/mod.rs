//! Grammar checker implementations

pub mod builtin;
pub mod fallback;

pub use builtin::BuiltinChecker;
pub use fallback::{FallbackChecker, FallbackPolicy};
