//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for course questions, search, and the course list.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::{CourseAssistant, Retriever};
use crate::vector_store::{IndexedCourse, VectorStore};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state.
struct AppState {
    assistant: CourseAssistant,
    retriever: Retriever,
    vector_store: Arc<dyn VectorStore>,
    default_top_k: usize,
}

/// Build the API router over an orchestrator's components.
pub fn router(orchestrator: &Orchestrator) -> Router {
    let state = Arc::new(AppState {
        assistant: orchestrator.assistant(true),
        retriever: orchestrator.retriever(),
        vector_store: orchestrator.vector_store(),
        default_top_k: orchestrator.settings().retrieval.top_k,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ask", post(ask))
        .route("/search", post(search))
        .route("/courses", get(list_courses))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    let app = router(&orchestrator);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("coursebot API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    if !orchestrator.generation_available() {
        Output::warning("Generation unavailable; answers will be extractive.");
    }
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Ask", "POST /ask");
    Output::kv("Search", "POST /search");
    Output::kv("Courses", "GET  /courses");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct AskRequest {
    course_id: String,
    question: String,
    #[serde(default)]
    top_k: Option<usize>,
}

#[derive(Deserialize)]
struct SearchRequest {
    course_id: String,
    query: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    5
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
    fallback_used: bool,
}

#[derive(Serialize)]
struct SearchResult {
    chunk_id: String,
    title: String,
    section: Option<String>,
    source_path: String,
    text: String,
    score: f32,
}

#[derive(Serialize)]
struct CourseListResponse {
    courses: Vec<IndexedCourse>,
    total: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> axum::response::Response {
    (status, Json(ErrorResponse { error: error.into() })).into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn ask(State(state): State<Arc<AppState>>, Json(req): Json<AskRequest>) -> impl IntoResponse {
    if req.question.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "question must not be empty");
    }

    let top_k = req.top_k.unwrap_or(state.default_top_k).max(1);
    let response = state
        .assistant
        .answer_question_top_k(&req.course_id, &req.question, top_k)
        .await;

    Json(response).into_response()
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> impl IntoResponse {
    match state.retriever.retrieve(&req.course_id, &req.query, req.limit).await {
        Ok(retrieval) => Json(SearchResponse {
            fallback_used: retrieval.fallback_used,
            results: retrieval
                .matches
                .into_iter()
                .map(|m| SearchResult {
                    chunk_id: m.chunk.id,
                    title: m.chunk.title,
                    section: m.chunk.section,
                    source_path: m.chunk.source_path,
                    text: m.chunk.text,
                    score: m.score,
                })
                .collect(),
        })
        .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn list_courses(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.vector_store.list_courses().await {
        Ok(courses) => Json(CourseListResponse {
            total: courses.len(),
            courses,
        })
        .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
