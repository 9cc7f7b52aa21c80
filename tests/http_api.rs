//! The HTTP surface over a real ingested course.

use coursebot::cli::commands::router;
use coursebot::config::{Prompts, Settings};
use coursebot::embedding::HashEmbedder;
use coursebot::orchestrator::Orchestrator;
use coursebot::vector_store::MemoryVectorStore;
use serde_json::{json, Value};
use std::sync::Arc;

async fn spawn_server() -> (String, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("syllabus.md"),
        "# Syllabus\n\n## Office Hours\nOffice hours are Mondays from 2pm to 4pm in Room 12.\n\n## Grading\nThe final exam is worth 40 percent of the grade.\n",
    )
    .unwrap();

    let orchestrator = Orchestrator::with_components(
        Settings::default(),
        Prompts::default(),
        Arc::new(HashEmbedder::new(512)),
        Arc::new(MemoryVectorStore::new()),
        None,
    );
    let report = orchestrator.ingestor().ingest_dir("bio101", dir.path()).await.unwrap();
    assert_eq!(report.documents, 1);
    assert_eq!(report.chunks, 2);

    let app = router(&orchestrator);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), dir)
}

#[tokio::test]
async fn health_and_courses() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let health: Value = client.get(format!("{base}/health")).send().await.unwrap().json().await.unwrap();
    assert_eq!(health["status"], "ok");

    let courses: Value = client.get(format!("{base}/courses")).send().await.unwrap().json().await.unwrap();
    assert_eq!(courses["total"], 1);
    assert_eq!(courses["courses"][0]["course_id"], "bio101");
    assert_eq!(courses["courses"][0]["chunk_count"], 2);
}

#[tokio::test]
async fn ask_returns_a_cited_response() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let response: Value = client
        .post(format!("{base}/ask"))
        .json(&json!({ "course_id": "bio101", "question": "When are office hours?" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(response["method"], "extractive");
    assert_eq!(response["citations"][0]["source_path"], "syllabus.md");
    assert_eq!(response["citations"][0]["section"], "Office Hours");
    assert!(response["answer"].as_str().unwrap().contains("Mondays"));

    let empty: Value = client
        .post(format!("{base}/ask"))
        .json(&json!({ "course_id": "chem200", "question": "When are office hours?" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(empty["method"], "no_evidence");
    assert_eq!(empty["escalation_suggested"], true);
}

#[tokio::test]
async fn blank_questions_are_rejected() {
    let (base, _dir) = spawn_server().await;
    let status = reqwest::Client::new()
        .post(format!("{base}/ask"))
        .json(&json!({ "course_id": "bio101", "question": "   " }))
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_is_course_scoped() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let found: Value = client
        .post(format!("{base}/search"))
        .json(&json!({ "course_id": "bio101", "query": "final exam grade", "limit": 1 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(found["results"].as_array().unwrap().len(), 1);
    assert_eq!(found["results"][0]["section"], "Grading");

    let other: Value = client
        .post(format!("{base}/search"))
        .json(&json!({ "course_id": "chem200", "query": "final exam grade" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(other["results"].as_array().unwrap().is_empty());
}
