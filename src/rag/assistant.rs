//! The question-answering pipeline.

use super::{
    select_citations, AnswerComposer, ConfidenceScorer, EscalationPolicy, Response, Retrieval,
    Retriever,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Answers course questions from indexed course material.
pub struct CourseAssistant {
    retriever: Arc<Retriever>,
    composer: AnswerComposer,
    scorer: ConfidenceScorer,
    escalation: EscalationPolicy,
    top_k: usize,
}

impl CourseAssistant {
    /// Create an assistant with default scoring, escalation, and `top_k`.
    pub fn new(retriever: Arc<Retriever>, composer: AnswerComposer) -> Self {
        Self {
            retriever,
            composer,
            scorer: ConfidenceScorer::default(),
            escalation: EscalationPolicy::default(),
            top_k: 5,
        }
    }

    pub fn with_scorer(mut self, scorer: ConfidenceScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_escalation(mut self, escalation: EscalationPolicy) -> Self {
        self.escalation = escalation;
        self
    }

    /// Set how many chunks to retrieve per question.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// The retriever used for every question.
    pub fn retriever(&self) -> Arc<Retriever> {
        self.retriever.clone()
    }

    /// Whether answers may be generated rather than only extracted.
    pub fn generation_enabled(&self) -> bool {
        self.composer.has_primary()
    }

    /// Answer `question` using only material indexed for `course_id`.
    pub async fn answer_question(&self, course_id: &str, question: &str) -> Response {
        self.answer_question_top_k(course_id, question, self.top_k).await
    }

    /// Answer with an explicit retrieval depth.
    ///
    /// Never fails: store errors are logged and answered as if the course had no
    /// material, and composition always has an extractive path.
    #[instrument(skip(self, question), fields(question_len = question.len()))]
    pub async fn answer_question_top_k(&self, course_id: &str, question: &str, top_k: usize) -> Response {
        info!("Answering question for course {}", course_id);

        let retrieval = match self.retriever.retrieve(course_id, question, top_k).await {
            Ok(retrieval) => retrieval,
            Err(e) => {
                warn!("Retrieval failed for course {} ({}); answering without evidence", course_id, e);
                Retrieval::default()
            }
        };

        let composed = self.composer.compose(question, &retrieval.matches).await;
        let confidence = self
            .scorer
            .score(&retrieval.matches, composed.method);
        let citations = select_citations(&composed.used_chunks);
        let escalation_suggested = self.escalation.should_escalate(confidence, composed.method);

        info!(
            "Answered with {} (confidence {:.2}, {} citations, escalate: {})",
            composed.method,
            confidence,
            citations.len(),
            escalation_suggested
        );

        Response {
            answer: composed.text,
            citations,
            confidence,
            escalation_suggested,
            method: composed.method,
            fallback_used: retrieval.fallback_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::error::{CoursebotError, Result};
    use crate::rag::{CompositionMethod, ExtractiveComposer};
    use crate::vector_store::{
        Chunk, DeleteScope, IndexedCourse, MemoryVectorStore, RetrievedMatch, SearchFilter,
        VectorStore,
    };
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl VectorStore for BrokenStore {
        async fn upsert(&self, _chunk: &Chunk) -> Result<()> {
            Err(CoursebotError::VectorStore("offline".to_string()))
        }
        async fn upsert_batch(&self, _chunks: &[Chunk]) -> Result<usize> {
            Err(CoursebotError::VectorStore("offline".to_string()))
        }
        async fn replace_source(&self, _course_id: &str, _source_path: &str, _chunks: &[Chunk]) -> Result<usize> {
            Err(CoursebotError::VectorStore("offline".to_string()))
        }
        async fn search(
            &self,
            _course_id: &str,
            _query: &[f32],
            _top_k: usize,
            _filter: Option<&SearchFilter>,
        ) -> Result<Vec<RetrievedMatch>> {
            Err(CoursebotError::VectorStore("offline".to_string()))
        }
        async fn delete(&self, _course_id: &str, _scope: &DeleteScope) -> Result<usize> {
            Err(CoursebotError::VectorStore("offline".to_string()))
        }
        async fn course_chunks(&self, _course_id: &str) -> Result<Vec<Chunk>> {
            Err(CoursebotError::VectorStore("offline".to_string()))
        }
        async fn chunk_count(&self, _course_id: &str) -> Result<usize> {
            Err(CoursebotError::VectorStore("offline".to_string()))
        }
        async fn list_courses(&self) -> Result<Vec<IndexedCourse>> {
            Err(CoursebotError::VectorStore("offline".to_string()))
        }
    }

    fn extractive_assistant(store: Arc<dyn VectorStore>) -> CourseAssistant {
        let retriever = Retriever::new(store, Arc::new(HashEmbedder::new(256)));
        CourseAssistant::new(
            Arc::new(retriever),
            AnswerComposer::extractive_only(ExtractiveComposer::default()),
        )
    }

    #[tokio::test]
    async fn test_store_failure_is_no_evidence() {
        let assistant = extractive_assistant(Arc::new(BrokenStore));
        let response = assistant.answer_question("c1", "When is the exam?").await;
        assert_eq!(response.method, CompositionMethod::NoEvidence);
        assert_eq!(response.confidence, 0.0);
        assert!(response.escalation_suggested);
        assert!(response.citations.is_empty());
    }

    #[tokio::test]
    async fn test_extractive_answer_cites_source() {
        let embedder = HashEmbedder::new(256);
        let store = Arc::new(MemoryVectorStore::new());
        let text = "The final exam is on December 12 in Hall B.";
        store
            .upsert(&Chunk::new("c1", "x", "Exams", None, "exams.md", text, embedder.embed_text(text)))
            .await
            .unwrap();

        let assistant = extractive_assistant(store);
        assert!(!assistant.generation_enabled());

        let response = assistant.answer_question("c1", "When is the final exam?").await;
        assert_eq!(response.method, CompositionMethod::Extractive);
        assert_eq!(response.citations.len(), 1);
        assert_eq!(response.citations[0].source_path, "exams.md");
        assert!(response.answer.contains("December 12"));
        assert!(response.confidence > 0.0);
    }

    async fn store_with(texts: &[(&str, &str)]) -> Arc<MemoryVectorStore> {
        let embedder = HashEmbedder::new(256);
        let store = Arc::new(MemoryVectorStore::new());
        for (id, text) in texts {
            let chunk = Chunk::new("c1", *id, "Exams", None, format!("{id}.md"), *text, embedder.embed_text(text));
            store.upsert(&chunk).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_exact_match_does_not_escalate() {
        let store = store_with(&[("exam", "When is the final exam?")]).await;
        let response = extractive_assistant(store)
            .answer_question("c1", "When is the final exam?")
            .await;

        assert_eq!(response.method, CompositionMethod::Extractive);
        assert!(response.confidence >= 0.8, "confidence {}", response.confidence);
        assert!(!response.escalation_suggested);
    }

    #[tokio::test]
    async fn test_uniformly_strong_matches_do_not_escalate() {
        let store = store_with(&[
            ("hall", "When is the final exam? It is in Hall B."),
            ("pencil", "When is the final exam? Bring a pencil."),
            ("schedule", "When is the final exam? Check the schedule."),
        ])
        .await;
        let response = extractive_assistant(store)
            .answer_question("c1", "When is the final exam?")
            .await;

        assert_eq!(response.method, CompositionMethod::Extractive);
        assert!(response.confidence > 0.7, "confidence {}", response.confidence);
        assert!(!response.escalation_suggested);
    }
}
