//! Ask command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    course: &str,
    top_k: Option<usize>,
    no_generate: bool,
    json: bool,
    settings: Settings,
) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    let assistant = orchestrator.assistant(!no_generate);
    let top_k = top_k.unwrap_or(orchestrator.settings().retrieval.top_k).max(1);

    if !no_generate && !assistant.generation_enabled() && !json {
        Output::info("Generation unavailable; answering from course text only.");
    }

    let spinner = (!json).then(|| Output::spinner("Searching course materials..."));
    let response = assistant.answer_question_top_k(course, question, top_k).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        Output::response(&response);
    }

    Ok(())
}
