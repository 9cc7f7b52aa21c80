//! Configuration module for coursebot.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    CompositionSettings, ConfidenceSettings, EmbeddingProvider, EmbeddingSettings,
    EscalationSettings, GeneralSettings, GenerationSettings, IngestSettings, PromptSettings,
    RetrievalSettings, Settings, VectorStoreSettings,
};
