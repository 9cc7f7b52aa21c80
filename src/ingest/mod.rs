//! Course material ingestion.
//!
//! Walks a course folder, splits markdown and text documents into sections and
//! word windows, embeds each window and writes the result into the vector store
//! under the course namespace. Chunk ids are derived from the course, source path
//! and window index, so re-ingesting a folder overwrites instead of duplicating.

mod document;
mod window;

pub use document::{is_supported, load_document, parse_markdown, parse_plain_text, ParsedDocument, Section};
pub use window::word_windows;

use crate::embedding::Embedder;
use crate::error::{CoursebotError, Result};
use crate::vector_store::{is_valid_course_id, Chunk, VectorStore};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Totals from one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Documents indexed (including ones that produced no chunks).
    pub documents: usize,
    /// Chunks written.
    pub chunks: usize,
    /// Documents that could not be embedded or stored. Their previous chunks are kept.
    pub failed: usize,
}

/// Deterministic chunk id for the `index`-th window of a source document.
pub fn chunk_id(course_id: &str, source_path: &str, index: usize) -> String {
    let name = format!("{}:{}:{}", course_id, source_path, index);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}

/// Ingests course folders into a vector store.
pub struct Ingestor {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    max_words: usize,
    overlap_words: usize,
    max_concurrent_documents: usize,
}

impl Ingestor {
    pub fn new(vector_store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            vector_store,
            embedder,
            max_words: 700,
            overlap_words: 120,
            max_concurrent_documents: 4,
        }
    }

    /// Set the word window size and overlap.
    pub fn with_window(mut self, max_words: usize, overlap_words: usize) -> Self {
        self.max_words = max_words;
        self.overlap_words = overlap_words;
        self
    }

    /// Set how many documents are embedded at once.
    pub fn with_max_concurrent_documents(mut self, n: usize) -> Self {
        self.max_concurrent_documents = n.max(1);
        self
    }

    /// Supported files under `dir`, recursively, in sorted path order.
    pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![dir.to_path_buf()];

        while let Some(current) = pending.pop() {
            for entry in std::fs::read_dir(&current)? {
                let path = entry?.path();
                if path.is_dir() {
                    pending.push(path);
                } else if is_supported(&path) {
                    files.push(path);
                }
            }
        }

        files.sort();
        Ok(files)
    }

    /// Ingest every supported document under `dir` into `course_id`.
    #[instrument(skip(self, dir), fields(dir = %dir.display()))]
    pub async fn ingest_dir(&self, course_id: &str, dir: &Path) -> Result<IngestReport> {
        if !is_valid_course_id(course_id) {
            return Err(CoursebotError::InvalidInput("Course id must not be empty".to_string()));
        }
        if !dir.is_dir() {
            return Err(CoursebotError::Ingest(format!(
                "Not a directory: {}",
                dir.display()
            )));
        }

        let mut documents = Vec::new();
        for path in Self::discover(dir)? {
            match load_document(dir, &path) {
                Ok(doc) => documents.push(doc),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }
        info!("Found {} documents for course {}", documents.len(), course_id);

        let mut prepared = stream::iter(documents)
            .map(|doc| async move {
                let chunks = self.prepare(course_id, &doc).await;
                (doc, chunks)
            })
            .buffered(self.max_concurrent_documents);

        let mut report = IngestReport::default();
        while let Some((doc, chunks)) = prepared.next().await {
            let written = match chunks {
                Ok(chunks) => self.write_document(course_id, &doc, &chunks).await,
                Err(e) => Err(e),
            };
            match written {
                Ok(count) => {
                    report.chunks += count;
                    report.documents += 1;
                }
                Err(e) => {
                    warn!("Failed to index {}: {}", doc.source_path, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Ingested {} documents ({} chunks, {} failed) into course {}",
            report.documents, report.chunks, report.failed, course_id
        );
        Ok(report)
    }

    /// Ingest one already-parsed document, replacing its previous chunks.
    pub async fn ingest_document(&self, course_id: &str, doc: &ParsedDocument) -> Result<usize> {
        if !is_valid_course_id(course_id) {
            return Err(CoursebotError::InvalidInput("Course id must not be empty".to_string()));
        }
        let chunks = self.prepare(course_id, doc).await?;
        self.write_document(course_id, doc, &chunks).await
    }

    /// Window and embed a document.
    async fn prepare(&self, course_id: &str, doc: &ParsedDocument) -> Result<Vec<Chunk>> {
        let windows: Vec<(&str, String)> = doc
            .sections
            .iter()
            .flat_map(|section| {
                word_windows(&section.content, self.max_words, self.overlap_words)
                    .into_iter()
                    .map(move |text| (section.title.as_str(), text))
            })
            .collect();

        if windows.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = windows.iter().map(|(_, text)| text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != windows.len() {
            return Err(CoursebotError::Embedding(format!(
                "Expected {} embeddings for {}, got {}",
                windows.len(),
                doc.source_path,
                embeddings.len()
            )));
        }

        debug!("Prepared {} chunks from {}", windows.len(), doc.source_path);

        Ok(windows
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, ((section, text), embedding))| {
                Chunk::new(
                    course_id,
                    chunk_id(course_id, &doc.source_path, index),
                    doc.title.as_str(),
                    Some(section.to_string()),
                    doc.source_path.as_str(),
                    text,
                    embedding,
                )
            })
            .collect())
    }

    /// Swap the document's stored chunks for `chunks` in one store call.
    async fn write_document(&self, course_id: &str, doc: &ParsedDocument, chunks: &[Chunk]) -> Result<usize> {
        self.vector_store
            .replace_source(course_id, &doc.source_path, chunks)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::vector_store::MemoryVectorStore;

    fn ingestor(store: Arc<MemoryVectorStore>) -> Ingestor {
        Ingestor::new(store, Arc::new(HashEmbedder::new(64))).with_window(5, 1)
    }

    #[test]
    fn test_chunk_id_is_deterministic() {
        assert_eq!(chunk_id("c1", "a.md", 0), chunk_id("c1", "a.md", 0));
        assert_ne!(chunk_id("c1", "a.md", 0), chunk_id("c1", "a.md", 1));
        assert_ne!(chunk_id("c1", "a.md", 0), chunk_id("c2", "a.md", 0));
    }

    #[tokio::test]
    async fn test_ingest_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("syllabus.md"),
            "# Syllabus\n## Grading\nExams are worth forty percent of the grade.\n",
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("policies")).unwrap();
        std::fs::write(dir.path().join("policies/late.txt"), "Late work loses ten percent.").unwrap();
        std::fs::write(dir.path().join("logo.png"), [0u8, 1, 2]).unwrap();

        let store = Arc::new(MemoryVectorStore::new());
        let report = ingestor(store.clone()).ingest_dir("c1", dir.path()).await.unwrap();

        assert_eq!(report.documents, 2);
        // "Exams are worth forty percent of the grade." is 8 words: windows of 5 with overlap 1
        assert_eq!(report.chunks, 3);

        let chunks = store.course_chunks("c1").await.unwrap();
        let sources: Vec<&str> = chunks.iter().map(|c| c.source_path.as_str()).collect();
        assert_eq!(sources, vec!["policies/late.txt", "syllabus.md", "syllabus.md"]);
        assert_eq!(chunks[1].title, "Syllabus");
        assert_eq!(chunks[1].section.as_deref(), Some("Grading"));
    }

    #[tokio::test]
    async fn test_reingest_replaces_shrunk_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "one two three four five six seven eight nine").unwrap();

        let store = Arc::new(MemoryVectorStore::new());
        let ingestor = ingestor(store.clone());
        ingestor.ingest_dir("c1", dir.path()).await.unwrap();
        assert_eq!(store.chunk_count("c1").await.unwrap(), 2);

        std::fs::write(&path, "one two").unwrap();
        let report = ingestor.ingest_dir("c1", dir.path()).await.unwrap();
        assert_eq!(report.chunks, 1);
        assert_eq!(store.chunk_count("c1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_inputs() {
        let store = Arc::new(MemoryVectorStore::new());
        let ingestor = ingestor(store);
        assert!(matches!(
            ingestor.ingest_dir(" ", Path::new(".")).await,
            Err(CoursebotError::InvalidInput(_))
        ));
        assert!(matches!(
            ingestor.ingest_dir("c1", Path::new("/nonexistent/coursebot")).await,
            Err(CoursebotError::Ingest(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_reingest_keeps_previous_chunks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("rules.txt"), "Bring a calculator to every exam").unwrap();
        std::fs::write(dir.path().join("dates.txt"), "The midterm is in week seven").unwrap();

        let store = Arc::new(MemoryVectorStore::new());
        ingestor(store.clone()).ingest_dir("c1", dir.path()).await.unwrap();
        let before = store.course_chunks("c1").await.unwrap();
        assert_eq!(before.len(), 4);

        // Re-ingest with an embedder whose dimension no longer matches the course
        std::fs::write(dir.path().join("rules.txt"), "Calculators are no longer allowed").unwrap();
        let mismatched = Ingestor::new(store.clone(), Arc::new(HashEmbedder::new(32))).with_window(5, 1);
        let report = mismatched.ingest_dir("c1", dir.path()).await.unwrap();

        assert_eq!(report.failed, 2);
        assert_eq!(report.documents, 0);
        assert_eq!(store.course_chunks("c1").await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_rejected_document_keeps_previous_chunks() {
        let store = Arc::new(MemoryVectorStore::new());
        let ingestor = ingestor(store.clone());
        let doc = |source: &str, title: &str| ParsedDocument {
            title: title.to_string(),
            source_path: source.to_string(),
            sections: vec![Section {
                title: "Notes".to_string(),
                content: "Office hours are on Monday".to_string(),
            }],
        };

        assert_eq!(ingestor.ingest_document("c1", &doc("a.md", "Notes")).await.unwrap(), 1);
        let before = store.course_chunks("c1").await.unwrap();

        let untitled = ingestor.ingest_document("c1", &doc("a.md", "")).await;
        assert!(matches!(untitled, Err(CoursebotError::InvalidChunk(_))));
        assert_eq!(store.course_chunks("c1").await.unwrap(), before);
    }
}
