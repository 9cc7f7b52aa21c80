//! Configuration settings for coursebot.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub vector_store: VectorStoreSettings,
    pub retrieval: RetrievalSettings,
    pub composition: CompositionSettings,
    pub confidence: ConfidenceSettings,
    pub escalation: EscalationSettings,
    pub ingest: IngestSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.coursebot".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Embedding provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// OpenAI embeddings, degrading to hashing when unavailable.
    #[default]
    OpenAI,
    /// Deterministic hash embeddings only (offline).
    Hash,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(EmbeddingProvider::OpenAI),
            "hash" | "offline" => Ok(EmbeddingProvider::Hash),
            _ => Err(format!("Unknown embedding provider: {}", s)),
        }
    }
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProvider::OpenAI => write!(f, "openai"),
            EmbeddingProvider::Hash => write!(f, "hash"),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai, hash).
    pub provider: EmbeddingProvider,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions. The hash fallback uses the same value.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::OpenAI,
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Generative answer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Try generative composition before extractive.
    pub enabled: bool,
    /// LLM model for answer generation.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate per answer.
    pub max_tokens: u32,
    /// Seconds to wait for the model before falling back to extraction.
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            max_tokens: 256,
            timeout_secs: 30,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (sqlite, memory).
    pub provider: String,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.coursebot/vectors.db".to_string(),
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of chunks to retrieve per question.
    pub top_k: usize,
    /// Below this similarity every match counts as irrelevant and keyword fallback runs.
    pub min_relevance: f32,
    /// Score assigned to a keyword fallback match that contains every question keyword.
    pub fallback_score: f32,
    /// Move matches whose title or section mention a question keyword to the front.
    pub prefer_title_matches: bool,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_relevance: 0.3,
            fallback_score: 0.15,
            prefer_title_matches: false,
        }
    }
}

/// Answer composition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionSettings {
    /// Character budget for chunk text placed in the generation prompt.
    pub max_context_chars: usize,
    /// Maximum sentences stitched into an extractive answer.
    pub max_extractive_sentences: usize,
}

impl Default for CompositionSettings {
    fn default() -> Self {
        Self {
            max_context_chars: 6000,
            max_extractive_sentences: 3,
        }
    }
}

/// Confidence scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceSettings {
    /// Matches scoring below this do not count as corroborating evidence.
    pub support_floor: f32,
    /// Share of the headroom above the top score that full corroboration can add.
    pub support_bonus: f32,
    /// Multiplier applied to extractive answers.
    pub extractive_discount: f32,
}

impl Default for ConfidenceSettings {
    fn default() -> Self {
        Self {
            support_floor: 0.3,
            support_bonus: 0.25,
            extractive_discount: 0.85,
        }
    }
}

/// Escalation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationSettings {
    /// Confidence below which an instructor follow-up is suggested.
    pub confidence_threshold: f32,
}

impl Default for EscalationSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.55,
        }
    }
}

/// Document ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Maximum words per chunk.
    pub max_words: usize,
    /// Words shared between consecutive chunks of a section.
    pub overlap_words: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            max_words: 700,
            overlap_words: 120,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::CoursebotError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("coursebot")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [retrieval]
            top_k = 8

            [embedding]
            provider = "hash"
            dimensions = 256
            "#,
        )
        .unwrap();

        assert_eq!(settings.retrieval.top_k, 8);
        assert!((settings.retrieval.min_relevance - 0.3).abs() < f32::EPSILON);
        assert_eq!(settings.embedding.provider, EmbeddingProvider::Hash);
        assert_eq!(settings.embedding.dimensions, 256);
        assert_eq!(settings.embedding.model, "text-embedding-3-small");
        assert!(settings.generation.enabled);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.escalation.confidence_threshold = 0.4;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert!((loaded.escalation.confidence_threshold - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = PathBuf::from("/nonexistent/coursebot/config.toml");
        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.retrieval.top_k, 5);
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("OpenAI".parse::<EmbeddingProvider>(), Ok(EmbeddingProvider::OpenAI));
        assert_eq!("offline".parse::<EmbeddingProvider>(), Ok(EmbeddingProvider::Hash));
        assert!("bert".parse::<EmbeddingProvider>().is_err());
    }
}
