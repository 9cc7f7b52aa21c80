//! Primary-then-fallback embedder.

use super::{Embedder, HashEmbedder};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{instrument, warn};

/// Wraps a primary embedder and degrades to a [`HashEmbedder`] of the same dimension.
///
/// The first primary failure (an error or a vector of the wrong length) switches the
/// wrapper into degraded mode for the rest of its lifetime, so vectors produced within
/// one process stay in a single embedding space.
pub struct FallbackEmbedder {
    primary: Option<Arc<dyn Embedder>>,
    fallback: HashEmbedder,
    degraded: AtomicBool,
}

impl FallbackEmbedder {
    /// Wrap `primary`, falling back to hashing at the primary's dimension.
    pub fn new(primary: Arc<dyn Embedder>) -> Self {
        let fallback = HashEmbedder::new(primary.dimensions());
        Self {
            primary: Some(primary),
            fallback,
            degraded: AtomicBool::new(false),
        }
    }

    /// An embedder that only ever hashes.
    pub fn hash_only(dimensions: usize) -> Self {
        Self {
            primary: None,
            fallback: HashEmbedder::new(dimensions),
            degraded: AtomicBool::new(true),
        }
    }

    /// Whether the fallback is currently in use.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn active_primary(&self) -> Option<&Arc<dyn Embedder>> {
        if self.is_degraded() {
            None
        } else {
            self.primary.as_ref()
        }
    }

    fn degrade(&self, reason: &str) {
        if !self.degraded.swap(true, Ordering::Relaxed) {
            warn!("Embedding model unavailable ({}); using hash embeddings", reason);
        }
    }
}

#[async_trait]
impl Embedder for FallbackEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(primary) = self.active_primary() {
            match primary.embed(text).await {
                Ok(v) if v.len() == self.fallback.dimensions() => return Ok(v),
                Ok(v) => self.degrade(&format!("dimension {} != {}", v.len(), self.fallback.dimensions())),
                Err(e) => self.degrade(&e.to_string()),
            }
        }
        Ok(self.fallback.embed_text(text))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if let Some(primary) = self.active_primary() {
            match primary.embed_batch(texts).await {
                Ok(vs) if vs.iter().all(|v| v.len() == self.fallback.dimensions()) => return Ok(vs),
                Ok(_) => self.degrade("unexpected dimension in batch"),
                Err(e) => self.degrade(&e.to_string()),
            }
        }
        Ok(texts.iter().map(|t| self.fallback.embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.fallback.dimensions()
    }
}
