//! Render cache and the per-generation render pass

pub mod cache;
pub mod pipeline;

pub use cache::{CachedRender, Fingerprint, RenderCache, SharedRenderCache};
pub use pipeline::{RenderBatch, RenderOutput, RenderPipeline};
