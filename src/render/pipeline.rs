//! Render pass for one published generation

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, warn};
use rayon::prelude::*;

use super::cache::{CachedRender, Fingerprint, SharedRenderCache};
use crate::error::panic_message;
use crate::parser::{DiagramId, DiagramRenderer, ParseResult};

/// What the host should show for one diagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutput {
    /// Renderer artifact
    Rendered(Arc<[u8]>),
    /// Valid syntax, but the renderer failed
    RenderFailed(String),
    /// The block failed validation and was not rendered
    SyntaxInvalid(String),
    /// No render has completed for the displayed generation yet
    Pending,
}

impl From<CachedRender> for RenderOutput {
    fn from(entry: CachedRender) -> Self {
        match entry {
            CachedRender::Rendered(artifact) => Self::Rendered(artifact),
            CachedRender::Failed(reason) => Self::RenderFailed(reason),
        }
    }
}

/// Render outputs attributed to the generation that requested them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderBatch {
    pub generation: u64,
    pub outputs: HashMap<DiagramId, RenderOutput>,
    /// External renderer calls made for this batch
    pub render_calls: usize,
}

/// Runs the external renderer for cache misses and writes results back
#[derive(Debug, Clone, Default)]
pub struct RenderPipeline {
    cache: SharedRenderCache,
}

impl RenderPipeline {
    #[must_use]
    pub const fn new(cache: SharedRenderCache) -> Self {
        Self { cache }
    }

    #[must_use]
    pub const fn cache(&self) -> &SharedRenderCache {
        &self.cache
    }

    /// Render every valid diagram of `result` that is not cached yet
    ///
    /// Identical content is rendered once, whatever the number of blocks
    /// carrying it. Distinct fingerprints render in parallel.
    pub fn render_generation(
        &self,
        result: &ParseResult,
        renderer: &dyn DiagramRenderer,
    ) -> RenderBatch {
        let mut misses: HashMap<Fingerprint, (&DiagramId, &str)> = HashMap::new();
        {
            let cache = self.cache.lock();
            for diagram in result.diagrams.iter().filter(|d| !d.has_error) {
                let fingerprint = Fingerprint::of(diagram.kind, &diagram.content);
                if cache.lookup(&fingerprint).is_none() {
                    misses
                        .entry(fingerprint)
                        .or_insert((&diagram.id, diagram.content.as_str()));
                }
            }
        }

        let render_calls = misses.len();
        let fresh: HashMap<Fingerprint, CachedRender> = misses
            .into_par_iter()
            .map(|(fingerprint, (id, content))| (fingerprint, render_one(renderer, id, content)))
            .collect();

        let mut cache = self.cache.lock();
        for (fingerprint, entry) in &fresh {
            cache.insert(*fingerprint, entry.clone());
        }

        let outputs = result
            .diagrams
            .iter()
            .map(|diagram| {
                let output = if diagram.has_error {
                    RenderOutput::SyntaxInvalid(diagram.error_message.clone().unwrap_or_default())
                } else {
                    let fingerprint = Fingerprint::of(diagram.kind, &diagram.content);
                    fresh
                        .get(&fingerprint)
                        .or_else(|| cache.lookup(&fingerprint))
                        .cloned()
                        .map_or(RenderOutput::Pending, RenderOutput::from)
                };
                (diagram.id.clone(), output)
            })
            .collect();

        debug!(
            generation = result.generation,
            render_calls = render_calls,
            diagrams = result.diagrams.len();
            "Rendered generation"
        );

        RenderBatch {
            generation: result.generation,
            outputs,
            render_calls,
        }
    }
}

/// One renderer call; a panicking renderer counts as a failed render
fn render_one(renderer: &dyn DiagramRenderer, id: &DiagramId, content: &str) -> CachedRender {
    match panic::catch_unwind(AssertUnwindSafe(|| renderer.render(id.as_str(), content))) {
        Ok(Ok(artifact)) => CachedRender::Rendered(Arc::from(artifact)),
        Ok(Err(err)) => CachedRender::Failed(err.to_string()),
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            warn!(diagram = id.as_str(), reason = reason.as_str(); "Renderer panicked");
            CachedRender::Failed(format!("Renderer panicked: {reason}"))
        }
    }
}
