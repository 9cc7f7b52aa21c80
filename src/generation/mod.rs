//! Text generation backends used for generative answer composition.

mod openai;

pub use openai::OpenAIGenerator;

use crate::error::Result;
use async_trait::async_trait;

/// A chat-style text generation model.
///
/// Implementations may fail for any reason (missing credentials, network, empty
/// output); callers are expected to fall back rather than surface the error.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce a completion for a system instruction and a user message.
    async fn generate(&self, system: &str, user: &str) -> Result<String>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}
