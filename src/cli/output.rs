//! CLI output formatting utilities.

use crate::rag::Response;
use crate::vector_store::{IndexedCourse, RetrievedMatch};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print an indexed course.
    pub fn course_info(course: &IndexedCourse) {
        println!(
            "  {} {} ({} chunks from {} sources, indexed {})",
            style("*").cyan(),
            style(&course.course_id).bold(),
            course.chunk_count,
            course.source_count,
            style(course.indexed_at.format("%Y-%m-%d %H:%M")).dim()
        );
    }

    /// Print a search match.
    pub fn search_result(m: &RetrievedMatch) {
        let chunk = &m.chunk;
        let heading = match &chunk.section {
            Some(section) if section != &chunk.title => format!("{} / {}", chunk.title, section),
            _ => chunk.title.clone(),
        };
        println!(
            "\n{} {} (score: {:.2})",
            style(">>").green(),
            style(heading).bold(),
            m.score
        );
        println!("   {}", content_preview(&chunk.text, 200));
        println!("   {}", style(&chunk.source_path).dim());
    }

    /// Print an answer with its sources and confidence.
    pub fn response(response: &Response) {
        println!("\n{}\n", response.answer);

        if !response.citations.is_empty() {
            Output::header("Sources");
            for citation in &response.citations {
                let label = match &citation.section {
                    Some(section) => format!("{} / {}", citation.title, section),
                    None => citation.title.clone(),
                };
                println!(
                    "  {} {} ({})",
                    style("*").cyan(),
                    style(label).bold(),
                    style(&citation.source_path).dim()
                );
            }
        }

        println!();
        Output::kv("Confidence", &format!("{:.2}", response.confidence));
        Output::kv("Method", &response.method.to_string());
        if response.fallback_used {
            Output::kv("Retrieval", "keyword fallback");
        }
        if response.escalation_suggested {
            Output::warning("This answer may be incomplete. Consider asking your instructor.");
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Flatten and truncate content with an ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
