//! End-to-end question answering over an in-memory course index.

use async_trait::async_trait;
use coursebot::embedding::HashEmbedder;
use coursebot::generation::Generator;
use coursebot::rag::{
    AnswerComposer, CompositionMethod, CourseAssistant, ExtractiveComposer, GenerativeComposer,
    Retriever,
};
use coursebot::vector_store::{Chunk, MemoryVectorStore, VectorStore};
use coursebot::{CoursebotError, Result};
use std::sync::Arc;
use std::time::Duration;

const DIM: usize = 1024;

enum Behaviour {
    Reply(&'static str),
    Fail,
    Hang,
}

struct FakeGenerator(Behaviour);

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(&self, _system: &str, _user: &str) -> Result<String> {
        match self.0 {
            Behaviour::Reply(text) => Ok(text.to_string()),
            Behaviour::Fail => Err(CoursebotError::Generation("model unavailable".to_string())),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok("never".to_string())
            }
        }
    }

    fn model(&self) -> &str {
        "fake"
    }
}

async fn course_store() -> Arc<MemoryVectorStore> {
    let embedder = HashEmbedder::new(DIM);
    let store = Arc::new(MemoryVectorStore::new());
    let docs = [
        ("A", "Assignments", "assignments.md", "Assignment 1 is due Friday at 5pm"),
        ("B", "Policies", "policy.md", "Late submissions lose 10%"),
        ("C", "Campus", "other.md", "Campus library hours vary during holidays"),
    ];
    for (id, title, source, text) in docs {
        let chunk = Chunk::new("c1", id, title, None, source, text, embedder.embed_text(text));
        store.upsert(&chunk).await.unwrap();
    }
    store
}

fn assistant(store: Arc<MemoryVectorStore>, generator: Option<FakeGenerator>) -> CourseAssistant {
    let retriever = Retriever::new(store, Arc::new(HashEmbedder::new(DIM)));
    let composer = match generator {
        Some(generator) => AnswerComposer::with_primary(
            Arc::new(
                GenerativeComposer::new(Arc::new(generator)).with_timeout(Duration::from_millis(50)),
            ),
            ExtractiveComposer::default(),
        ),
        None => AnswerComposer::extractive_only(ExtractiveComposer::default()),
    };
    CourseAssistant::new(Arc::new(retriever), composer)
}

#[tokio::test]
async fn round_trip_answers_from_the_right_chunk() {
    let store = course_store().await;

    let retrieval = Retriever::new(store.clone(), Arc::new(HashEmbedder::new(DIM)))
        .retrieve("c1", "When is Assignment 1 due?", 5)
        .await
        .unwrap();
    assert_eq!(retrieval.matches[0].chunk.id, "A");
    assert!(!retrieval.fallback_used);

    let assistant = assistant(
        store,
        Some(FakeGenerator(Behaviour::Reply("Assignment 1 is due Friday at 5pm [1]."))),
    );
    let response = assistant.answer_question("c1", "When is Assignment 1 due?").await;

    assert_eq!(response.method, CompositionMethod::Generative);
    assert!(response
        .citations
        .iter()
        .any(|c| c.source_path == "assignments.md"));
    assert!(response.confidence > 0.55, "confidence {}", response.confidence);
    assert!(!response.escalation_suggested);
}

#[tokio::test]
async fn empty_course_has_no_evidence() {
    let store = course_store().await;
    let assistant = assistant(store, Some(FakeGenerator(Behaviour::Reply("should not be called [1]"))));

    let response = assistant.answer_question("c_empty", "When is Assignment 1 due?").await;

    assert_eq!(response.method, CompositionMethod::NoEvidence);
    assert_eq!(response.confidence, 0.0);
    assert!(response.escalation_suggested);
    assert!(response.citations.is_empty());
    assert!(!response.answer.is_empty());
}

#[tokio::test]
async fn generation_failure_falls_back_to_extraction() {
    let store = course_store().await;
    let question = "When is Assignment 1 due?";

    let generative = assistant(
        store.clone(),
        Some(FakeGenerator(Behaviour::Reply("Friday at 5pm [1]."))),
    )
    .answer_question("c1", question)
    .await;

    let extractive = assistant(store, Some(FakeGenerator(Behaviour::Fail)))
        .answer_question("c1", question)
        .await;

    assert_eq!(extractive.method, CompositionMethod::Extractive);
    assert!(extractive.answer.contains("Assignment 1 is due Friday at 5pm"));
    assert!(extractive.confidence > 0.0);
    assert!(extractive.confidence < generative.confidence);
    assert_eq!(extractive.citations[0].source_path, "assignments.md");
}

#[tokio::test]
async fn slow_generation_times_out_to_extraction() {
    let store = course_store().await;
    let response = assistant(store, Some(FakeGenerator(Behaviour::Hang)))
        .answer_question("c1", "When is Assignment 1 due?")
        .await;

    assert_eq!(response.method, CompositionMethod::Extractive);
    assert!(!response.answer.is_empty());
}

#[tokio::test]
async fn questions_never_cross_courses() {
    let store = course_store().await;
    let other = Chunk::new(
        "c2",
        "Z",
        "Exams",
        None,
        "exams.md",
        "The final exam is in Hall B",
        HashEmbedder::new(DIM).embed_text("The final exam is in Hall B"),
    );
    store.upsert(&other).await.unwrap();

    let response = assistant(store, None)
        .answer_question("c1", "Where is the final exam?")
        .await;

    assert!(response.citations.iter().all(|c| c.source_path != "exams.md"));
}

#[tokio::test]
async fn weak_evidence_uses_keyword_fallback_and_escalates() {
    let store = course_store().await;
    let retriever = Retriever::new(store, Arc::new(HashEmbedder::new(DIM))).with_min_relevance(0.99);
    let assistant = CourseAssistant::new(
        Arc::new(retriever),
        AnswerComposer::extractive_only(ExtractiveComposer::default()),
    );

    let response = assistant.answer_question("c1", "late submissions penalty").await;

    assert!(response.fallback_used);
    assert_eq!(response.method, CompositionMethod::Extractive);
    assert_eq!(response.citations[0].source_path, "policy.md");
    assert!(response.escalation_suggested);
}

#[tokio::test]
async fn repeated_sources_are_cited_once() {
    let embedder = HashEmbedder::new(DIM);
    let store = Arc::new(MemoryVectorStore::new());
    for (id, text) in [("p1", "Late submissions lose 10% per day"), ("p2", "Late submissions over a week score zero")] {
        let chunk = Chunk::new("c1", id, "Policies", None, "policy.md", text, embedder.embed_text(text));
        store.upsert(&chunk).await.unwrap();
    }

    let response = assistant(store, Some(FakeGenerator(Behaviour::Reply("You lose 10% per day [1], zero after a week [2]."))))
        .answer_question("c1", "What happens to late submissions?")
        .await;

    assert_eq!(response.method, CompositionMethod::Generative);
    assert_eq!(response.citations.len(), 1);
    assert_eq!(response.citations[0].source_path, "policy.md");
}
