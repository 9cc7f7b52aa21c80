//! Retrieval-augmented question answering over course documents.
//!
//! A question flows through [`Retriever`] (course-scoped search with keyword
//! fallback), [`AnswerComposer`] (generative, then extractive), [`ConfidenceScorer`],
//! [`select_citations`], and [`EscalationPolicy`]. [`CourseAssistant`] wires them
//! together behind a single `answer_question` call.

mod assistant;
pub mod citations;
pub mod composer;
pub mod confidence;
pub mod context;
pub mod escalation;
pub mod retriever;

pub use assistant::CourseAssistant;
pub use citations::select_citations;
pub use composer::{AnswerComposer, CompositionStrategy, ExtractiveComposer, GenerativeComposer};
pub use confidence::ConfidenceScorer;
pub use escalation::EscalationPolicy;
pub use retriever::{Retrieval, Retriever};

use crate::vector_store::Chunk;
use serde::{Deserialize, Serialize};

/// How an answer was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionMethod {
    /// A language model wrote the answer from retrieved context.
    Generative,
    /// Sentences were lifted from the retrieved chunks.
    Extractive,
    /// Nothing relevant was retrieved.
    NoEvidence,
}

impl std::fmt::Display for CompositionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompositionMethod::Generative => write!(f, "generative"),
            CompositionMethod::Extractive => write!(f, "extractive"),
            CompositionMethod::NoEvidence => write!(f, "no_evidence"),
        }
    }
}

/// Output of answer composition.
#[derive(Debug, Clone)]
pub struct ComposedAnswer {
    /// Answer text.
    pub text: String,
    /// Strategy that produced the text.
    pub method: CompositionMethod,
    /// Chunks whose content the answer draws on, in first-reference order.
    pub used_chunks: Vec<Chunk>,
}

impl ComposedAnswer {
    /// The canned answer for questions with no supporting material.
    pub fn no_evidence() -> Self {
        Self {
            text: "I don't have information on that yet in this course's materials. \
                   You may want to ask your instructor or the course team."
                .to_string(),
            method: CompositionMethod::NoEvidence,
            used_chunks: Vec::new(),
        }
    }
}

/// A source cited in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Document title.
    pub title: String,
    /// Section within the document, if any.
    pub section: Option<String>,
    /// Source document path.
    pub source_path: String,
}

/// The answer handed back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Answer text.
    pub answer: String,
    /// De-duplicated sources, in first-use order.
    pub citations: Vec<Citation>,
    /// Support for the answer, in [0, 1].
    pub confidence: f32,
    /// Whether an instructor follow-up should be offered.
    pub escalation_suggested: bool,
    /// How the answer was composed.
    pub method: CompositionMethod,
    /// Whether retrieval had to fall back to keyword matching.
    pub fallback_used: bool,
}

impl Response {
    /// Format the response for terminal display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if !self.citations.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            for citation in &self.citations {
                match &citation.section {
                    Some(section) => output.push_str(&format!(
                        "\n{} / {} ({})",
                        citation.title, section, citation.source_path
                    )),
                    None => output.push_str(&format!(
                        "\n{} ({})",
                        citation.title, citation.source_path
                    )),
                }
            }
        }

        output.push_str(&format!("\n\nConfidence: {:.2} ({})", self.confidence, self.method));
        if self.escalation_suggested {
            output.push_str("\nThis answer may be incomplete. Consider asking your instructor.");
        }

        output
    }
}
