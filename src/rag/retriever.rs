//! Course-scoped retrieval with keyword fallback.

use crate::embedding::Embedder;
use crate::error::Result;
use crate::text;
use crate::vector_store::{is_valid_course_id, RetrievedMatch, VectorStore};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Matches for one question.
#[derive(Debug, Clone, Default)]
pub struct Retrieval {
    /// Ranked matches, best first.
    pub matches: Vec<RetrievedMatch>,
    /// Whether the matches came from keyword fallback rather than vector search.
    pub fallback_used: bool,
}

/// Retrieves the chunks of one course that best answer a question.
pub struct Retriever {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    min_relevance: f32,
    fallback_score: f32,
    prefer_title_matches: bool,
}

impl Retriever {
    /// Create a new retriever.
    pub fn new(vector_store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            vector_store,
            embedder,
            min_relevance: 0.3,
            fallback_score: 0.15,
            prefer_title_matches: false,
        }
    }

    /// Set the similarity below which vector results are treated as irrelevant.
    pub fn with_min_relevance(mut self, min_relevance: f32) -> Self {
        self.min_relevance = min_relevance;
        self
    }

    /// Set the score given to a keyword match containing every question keyword.
    pub fn with_fallback_score(mut self, fallback_score: f32) -> Self {
        self.fallback_score = fallback_score;
        self
    }

    /// Promote matches whose title or section mention a question keyword.
    pub fn with_prefer_title_matches(mut self, prefer: bool) -> Self {
        self.prefer_title_matches = prefer;
        self
    }

    /// The underlying vector store.
    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    /// Retrieve up to `top_k` matches for `question` within `course_id`.
    ///
    /// Unknown, blank, and empty courses yield no matches and never trigger the
    /// fallback. Store errors are returned; embedding errors degrade to keyword search.
    #[instrument(skip(self, question))]
    pub async fn retrieve(&self, course_id: &str, question: &str, top_k: usize) -> Result<Retrieval> {
        if !is_valid_course_id(course_id) || top_k == 0 {
            return Ok(Retrieval::default());
        }

        if self.vector_store.chunk_count(course_id).await? == 0 {
            debug!("Course {} has no indexed chunks", course_id);
            return Ok(Retrieval::default());
        }

        let matches = match self.embedder.embed(question).await {
            Ok(query_embedding) => {
                self.vector_store
                    .search(course_id, &query_embedding, top_k, None)
                    .await?
            }
            Err(e) => {
                warn!("Query embedding failed ({}); using keyword search", e);
                Vec::new()
            }
        };

        let relevant = matches.iter().any(|m| m.score >= self.min_relevance);
        let mut retrieval = if relevant {
            Retrieval {
                matches,
                fallback_used: false,
            }
        } else {
            info!(
                "No vector match above {:.2} in course {}; using keyword fallback",
                self.min_relevance, course_id
            );
            Retrieval {
                matches: self.keyword_fallback(course_id, question, top_k).await?,
                fallback_used: true,
            }
        };

        if self.prefer_title_matches {
            retrieval.matches = prefer_title_matches(retrieval.matches, question);
        }

        debug!(
            "Retrieved {} matches (fallback: {})",
            retrieval.matches.len(),
            retrieval.fallback_used
        );
        Ok(retrieval)
    }

    /// Scan the course's chunks for question keywords.
    async fn keyword_fallback(
        &self,
        course_id: &str,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedMatch>> {
        let keywords = text::keywords(question);
        if keywords.is_empty() {
            return Ok(Vec::new());
        }

        let chunks = self.vector_store.course_chunks(course_id).await?;
        let mut hits: Vec<(usize, RetrievedMatch)> = chunks
            .into_iter()
            .filter_map(|chunk| {
                let count = text::keyword_hits(&chunk.text, &keywords);
                (count > 0).then(|| {
                    let score = self.fallback_score * count as f32 / keywords.len() as f32;
                    (count, RetrievedMatch { chunk, score })
                })
            })
            .collect();

        // Stable: equal hit counts keep insertion order
        hits.sort_by(|a, b| b.0.cmp(&a.0));
        hits.truncate(top_k);

        Ok(hits.into_iter().map(|(_, m)| m).collect())
    }
}

/// Move matches whose title or section mention a question keyword ahead of the rest,
/// keeping the relative order inside each group.
pub fn prefer_title_matches(matches: Vec<RetrievedMatch>, question: &str) -> Vec<RetrievedMatch> {
    let keywords = text::keywords(question);
    if keywords.is_empty() {
        return matches;
    }

    let (preferred, others): (Vec<_>, Vec<_>) = matches.into_iter().partition(|m| {
        let heading = format!(
            "{} {}",
            m.chunk.title,
            m.chunk.section.as_deref().unwrap_or_default()
        );
        text::keyword_hits(&heading, &keywords) > 0
    });

    preferred.into_iter().chain(others).collect()
}
