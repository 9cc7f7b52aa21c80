//! Error types for coursebot.

use thiserror::Error;

/// Library-level error type for coursebot operations.
#[derive(Error, Debug)]
pub enum CoursebotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Invalid chunk: {0}")]
    InvalidChunk(String),

    #[error("Ingestion failed: {0}")]
    Ingest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for coursebot operations.
pub type Result<T> = std::result::Result<T, CoursebotError>;
