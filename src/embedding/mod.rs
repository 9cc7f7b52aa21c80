//! Embedding generation for indexing and querying.
//!
//! [`OpenAIEmbedder`] is the primary model. [`HashEmbedder`] is a deterministic,
//! dependency-free stand-in of the same dimension, and [`FallbackEmbedder`] ties the
//! two together so callers never see an embedding failure.

mod fallback;
mod hash;
mod openai;

pub use fallback::FallbackEmbedder;
pub use hash::HashEmbedder;
pub use openai::OpenAIEmbedder;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}
