//! coursebot - grounded question answering over course materials
//!
//! A local-first assistant that answers student questions from a course's own
//! documents, with citations, a confidence score, and an escalation hint.
//!
//! # Overview
//!
//! coursebot allows you to:
//! - Index a folder of course documents (syllabi, policies, schedules) per course
//! - Ask questions scoped to exactly one course
//! - Get answers that cite the documents they came from
//! - Keep working without a model backend, using hash embeddings and extractive answers
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management and prompt templates
//! - `text` - Tokenisation shared by embedding, retrieval and extraction
//! - `embedding` - Embedding generation with a deterministic fallback
//! - `vector_store` - Course-scoped vector index abstraction
//! - `generation` - Language model text generation
//! - `rag` - Retrieval, answer composition, confidence, citations, escalation
//! - `ingest` - Document parsing and chunking into the vector store
//! - `orchestrator` - Component wiring from settings
//!
//! # Example
//!
//! ```rust,no_run
//! use coursebot::config::Settings;
//! use coursebot::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     orchestrator
//!         .ingestor()
//!         .ingest_dir("bio101", std::path::Path::new("courses/bio101"))
//!         .await?;
//!
//!     let response = orchestrator
//!         .assistant(true)
//!         .answer_question("bio101", "When is the midterm?")
//!         .await;
//!     println!("{}", response.format_for_display());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod ingest;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod text;
pub mod vector_store;

pub use error::{CoursebotError, Result};
