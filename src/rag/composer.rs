//! Answer composition strategies.
//!
//! [`AnswerComposer`] tries an optional richer strategy (normally
//! [`GenerativeComposer`]) and falls back to [`ExtractiveComposer`], which cannot fail
//! for a non-empty match list.

use super::context::{cited_sources, format_context_for_prompt, sanitize_question, select_context};
use super::{ComposedAnswer, CompositionMethod};
use crate::config::Prompts;
use crate::error::{CoursebotError, Result};
use crate::generation::Generator;
use crate::text;
use crate::vector_store::{Chunk, RetrievedMatch};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// One way of turning retrieved matches into an answer.
#[async_trait]
pub trait CompositionStrategy: Send + Sync {
    /// The method recorded on answers from this strategy.
    fn method(&self) -> CompositionMethod;

    /// Compose an answer from a non-empty list of ranked matches.
    async fn compose(&self, question: &str, matches: &[RetrievedMatch]) -> Result<ComposedAnswer>;
}

/// Answers by prompting a language model with the retrieved context.
pub struct GenerativeComposer {
    generator: Arc<dyn Generator>,
    prompts: Prompts,
    max_context_chars: usize,
    timeout: Duration,
}

impl GenerativeComposer {
    /// Create a generative composer with default prompts and limits.
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            prompts: Prompts::default(),
            max_context_chars: 6000,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set the character budget for chunk text in the prompt.
    pub fn with_max_context_chars(mut self, max_context_chars: usize) -> Self {
        self.max_context_chars = max_context_chars;
        self
    }

    /// Set how long to wait for the model.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_user_prompt(&self, question: &str, context: &[RetrievedMatch]) -> String {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), sanitize_question(question));
        vars.insert(
            "context".to_string(),
            format_context_for_prompt(context, self.max_context_chars),
        );
        self.prompts.render_with_custom(&self.prompts.rag.user, &vars)
    }
}

#[async_trait]
impl CompositionStrategy for GenerativeComposer {
    fn method(&self) -> CompositionMethod {
        CompositionMethod::Generative
    }

    #[instrument(skip_all, fields(model = %self.generator.model()))]
    async fn compose(&self, question: &str, matches: &[RetrievedMatch]) -> Result<ComposedAnswer> {
        let context = select_context(matches, self.max_context_chars);
        if context.is_empty() {
            return Err(CoursebotError::Generation("No context to generate from".to_string()));
        }

        let user_prompt = self.build_user_prompt(question, context);
        let system_prompt = self
            .prompts
            .render_with_custom(&self.prompts.rag.system, &HashMap::new());

        let text = tokio::time::timeout(
            self.timeout,
            self.generator.generate(&system_prompt, &user_prompt),
        )
        .await
        .map_err(|_| {
            CoursebotError::Generation(format!("Model timed out after {:?}", self.timeout))
        })??;

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(CoursebotError::Generation("Empty response from model".to_string()));
        }

        let cited = cited_sources(&text, context.len());
        let used_chunks: Vec<Chunk> = if cited.is_empty() {
            context.iter().map(|m| m.chunk.clone()).collect()
        } else {
            cited.iter().map(|&i| context[i].chunk.clone()).collect()
        };

        debug!(
            "Generated answer from {} context chunks, citing {}",
            context.len(),
            used_chunks.len()
        );

        Ok(ComposedAnswer {
            text,
            method: CompositionMethod::Generative,
            used_chunks,
        })
    }
}

/// Answers by stitching together the most relevant source sentences.
#[derive(Debug, Clone)]
pub struct ExtractiveComposer {
    max_sentences: usize,
}

impl ExtractiveComposer {
    /// Create an extractive composer that quotes at most `max_sentences` sentences.
    pub fn new(max_sentences: usize) -> Self {
        Self {
            max_sentences: max_sentences.max(1),
        }
    }

    /// Compose without any fallible dependency.
    ///
    /// Takes the best keyword-bearing sentence from each match, in rank order, until
    /// `max_sentences` are collected. When no sentence mentions a keyword, the lead
    /// sentence of the top match is used.
    pub fn compose_sync(&self, question: &str, matches: &[RetrievedMatch]) -> ComposedAnswer {
        let Some(top) = matches.first() else {
            return ComposedAnswer::no_evidence();
        };

        let keywords = text::keywords(question);
        let mut picked: Vec<(&Chunk, String)> = Vec::new();

        for m in matches {
            if picked.len() >= self.max_sentences {
                break;
            }
            let mut best: Option<(usize, String)> = None;
            for sentence in text::sentences(&m.chunk.text) {
                let hits = text::keyword_hits(&sentence, &keywords);
                if hits > 0 && best.as_ref().map_or(true, |(b, _)| hits > *b) {
                    best = Some((hits, sentence));
                }
            }
            if let Some((_, sentence)) = best {
                picked.push((&m.chunk, sentence));
            }
        }

        if picked.is_empty() {
            picked.push((&top.chunk, lead_sentence(&top.chunk.text)));
        }

        let mut lines = vec!["Here is what I found in the course materials:".to_string()];
        for (i, (_, sentence)) in picked.iter().enumerate() {
            lines.push(format!("- {} [{}]", sentence, i + 1));
        }
        lines.push("Let me know if you need more detail, or check with your instructor.".to_string());

        ComposedAnswer {
            text: lines.join("\n"),
            method: CompositionMethod::Extractive,
            used_chunks: picked.into_iter().map(|(chunk, _)| chunk.clone()).collect(),
        }
    }
}

impl Default for ExtractiveComposer {
    fn default() -> Self {
        Self::new(3)
    }
}

#[async_trait]
impl CompositionStrategy for ExtractiveComposer {
    fn method(&self) -> CompositionMethod {
        CompositionMethod::Extractive
    }

    async fn compose(&self, question: &str, matches: &[RetrievedMatch]) -> Result<ComposedAnswer> {
        Ok(self.compose_sync(question, matches))
    }
}

/// First prose sentence of a chunk, or its leading characters when it has none.
fn lead_sentence(text: &str) -> String {
    text::sentences(text)
        .into_iter()
        .next()
        .unwrap_or_else(|| text.trim().trim_start_matches('#').trim().chars().take(200).collect())
}

/// Picks a composition strategy per question.
pub struct AnswerComposer {
    primary: Option<Arc<dyn CompositionStrategy>>,
    extractive: ExtractiveComposer,
}

impl AnswerComposer {
    /// A composer that only extracts.
    pub fn extractive_only(extractive: ExtractiveComposer) -> Self {
        Self {
            primary: None,
            extractive,
        }
    }

    /// A composer that tries `primary` first and extracts when it fails.
    pub fn with_primary(primary: Arc<dyn CompositionStrategy>, extractive: ExtractiveComposer) -> Self {
        Self {
            primary: Some(primary),
            extractive,
        }
    }

    /// Whether a richer strategy is configured.
    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Compose an answer. Never fails: empty matches give a no-evidence answer and
    /// any primary failure falls through to extraction.
    pub async fn compose(&self, question: &str, matches: &[RetrievedMatch]) -> ComposedAnswer {
        if matches.is_empty() {
            return ComposedAnswer::no_evidence();
        }

        if let Some(primary) = &self.primary {
            match primary.compose(question, matches).await {
                Ok(answer) => return answer,
                Err(e) => warn!("{} composition failed ({}); using extractive answer", primary.method(), e),
            }
        }

        self.extractive.compose_sync(question, matches)
    }
}
