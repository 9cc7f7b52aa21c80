//! Vector store abstraction for course chunks.
//!
//! Every point lives in exactly one course namespace. Implementations must never
//! return a chunk from a course other than the one asked for, and an unknown or
//! blank course id simply has no points.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::{CoursebotError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The atomic retrievable unit: a piece of course text with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier, unique within the course.
    pub id: String,
    /// Course namespace this chunk belongs to.
    pub course_id: String,
    /// Document title.
    pub title: String,
    /// Optional subsection label.
    pub section: Option<String>,
    /// Human-readable origin, usually a path relative to the course folder.
    pub source_path: String,
    /// Plain text content.
    pub text: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// When this chunk was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl Chunk {
    /// Create a new chunk stamped with the current time.
    pub fn new(
        course_id: impl Into<String>,
        id: impl Into<String>,
        title: impl Into<String>,
        section: Option<String>,
        source_path: impl Into<String>,
        text: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: id.into(),
            course_id: course_id.into(),
            title: title.into(),
            section,
            source_path: source_path.into(),
            text: text.into(),
            embedding,
            indexed_at: Utc::now(),
        }
    }

    /// Reject payloads that would produce broken citations or an unsearchable point.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("course_id", &self.course_id),
            ("id", &self.id),
            ("text", &self.text),
            ("source_path", &self.source_path),
            ("title", &self.title),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CoursebotError::InvalidChunk(format!(
                    "chunk '{}' has an empty {}",
                    self.id, field
                )));
            }
        }
        if self.embedding.is_empty() {
            return Err(CoursebotError::InvalidChunk(format!(
                "chunk '{}' has no embedding",
                self.id
            )));
        }
        Ok(())
    }
}

/// A chunk returned by a search, with its similarity score (higher is better).
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedMatch {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Cosine similarity to the query, or a synthetic score for keyword fallback matches.
    pub score: f32,
}

/// Optional constraints applied to a search.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Only return chunks from this source document.
    pub source_path: Option<String>,
    /// Drop matches scoring below this value.
    pub min_score: Option<f32>,
}

impl SearchFilter {
    fn admits(&self, m: &RetrievedMatch) -> bool {
        if let Some(path) = &self.source_path {
            if &m.chunk.source_path != path {
                return false;
            }
        }
        self.min_score.map_or(true, |min| m.score >= min)
    }
}

/// What a delete call removes within a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteScope {
    /// A single chunk by id.
    Chunk(String),
    /// Every chunk from one source document.
    Source(String),
    /// The whole course namespace.
    Course,
}

/// Summary information about an indexed course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedCourse {
    /// Course id.
    pub course_id: String,
    /// Number of indexed chunks.
    pub chunk_count: u32,
    /// Number of distinct source documents.
    pub source_count: u32,
    /// Most recent indexing time.
    pub indexed_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace one chunk, keyed by `(course_id, id)`. Other chunks are untouched.
    async fn upsert(&self, chunk: &Chunk) -> Result<()>;

    /// Insert or replace many chunks, possibly across courses. Nothing is written if any
    /// chunk is invalid or disagrees with its course's embedding dimension.
    async fn upsert_batch(&self, chunks: &[Chunk]) -> Result<usize>;

    /// Swap every chunk of one source document for `chunks` in a single step.
    ///
    /// Every chunk must belong to `course_id` and `source_path`. Readers see either the
    /// old chunks or the new ones, and on error the old chunks stay in place. Returns
    /// the number of chunks written.
    async fn replace_source(
        &self,
        course_id: &str,
        source_path: &str,
        chunks: &[Chunk],
    ) -> Result<usize>;

    /// Rank a course's chunks by similarity to `query_embedding`, returning at most `top_k`.
    async fn search(
        &self,
        course_id: &str,
        query_embedding: &[f32],
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<RetrievedMatch>>;

    /// Delete chunks from a course. Returns the number removed.
    async fn delete(&self, course_id: &str, scope: &DeleteScope) -> Result<usize>;

    /// All chunks of a course in insertion order.
    async fn course_chunks(&self, course_id: &str) -> Result<Vec<Chunk>>;

    /// Number of chunks indexed for a course.
    async fn chunk_count(&self, course_id: &str) -> Result<usize>;

    /// List all courses that have at least one chunk.
    async fn list_courses(&self) -> Result<Vec<IndexedCourse>>;
}

/// Whether a course id can name a namespace at all.
pub fn is_valid_course_id(course_id: &str) -> bool {
    !course_id.trim().is_empty()
}

/// Group chunks by course, keeping first-appearance order.
pub(crate) fn group_by_course(chunks: &[Chunk]) -> Vec<(&str, Vec<&Chunk>)> {
    let mut groups: Vec<(&str, Vec<&Chunk>)> = Vec::new();
    for chunk in chunks {
        match groups.iter_mut().find(|(id, _)| *id == chunk.course_id) {
            Some((_, group)) => group.push(chunk),
            None => groups.push((chunk.course_id.as_str(), vec![chunk])),
        }
    }
    groups
}

/// Check that one course's incoming chunks share a dimension, and that it matches
/// `stored` (the dimension of the chunks that will remain) when there is one.
pub(crate) fn check_dimensions(course_id: &str, chunks: &[&Chunk], stored: Option<usize>) -> Result<()> {
    let Some(expected) = stored.or_else(|| chunks.first().map(|c| c.embedding.len())) else {
        return Ok(());
    };
    match chunks.iter().find(|c| c.embedding.len() != expected) {
        Some(bad) => Err(CoursebotError::InvalidChunk(format!(
            "chunk '{}' has dimension {}, course '{}' uses {}",
            bad.id,
            bad.embedding.len(),
            course_id,
            expected
        ))),
        None => Ok(()),
    }
}

/// Validate a `replace_source` payload before anything is touched.
pub(crate) fn validate_replacement(course_id: &str, source_path: &str, chunks: &[Chunk]) -> Result<()> {
    if !is_valid_course_id(course_id) || source_path.trim().is_empty() {
        return Err(CoursebotError::InvalidInput(format!(
            "cannot replace source '{}' in course '{}'",
            source_path, course_id
        )));
    }
    for chunk in chunks {
        chunk.validate()?;
        if chunk.course_id != course_id || chunk.source_path != source_path {
            return Err(CoursebotError::InvalidChunk(format!(
                "chunk '{}' belongs to {}:{}, not {}:{}",
                chunk.id, chunk.course_id, chunk.source_path, course_id, source_path
            )));
        }
    }
    Ok(())
}

/// Score chunks against a query and keep the best `top_k`.
///
/// `chunks` must be in insertion order; the sort is stable, so equal scores keep it.
pub fn rank_chunks<I>(
    chunks: I,
    query_embedding: &[f32],
    top_k: usize,
    filter: Option<&SearchFilter>,
) -> Vec<RetrievedMatch>
where
    I: IntoIterator<Item = Chunk>,
{
    let mut results: Vec<RetrievedMatch> = chunks
        .into_iter()
        .map(|chunk| {
            let score = cosine_similarity(query_embedding, &chunk.embedding);
            RetrievedMatch { chunk, score }
        })
        .filter(|m| filter.map_or(true, |f| f.admits(m)))
        .collect();

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(top_k);
    results
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
