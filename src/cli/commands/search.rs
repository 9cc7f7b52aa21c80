//! Search command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, course: &str, limit: usize, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    let retriever = orchestrator.retriever();

    let spinner = Output::spinner("Searching...");
    let results = retriever.retrieve(course, query, limit).await;
    spinner.finish_and_clear();

    match results {
        Ok(retrieval) => {
            if retrieval.matches.is_empty() {
                Output::warning(&format!("No results found in course {}.", course));
            } else {
                let how = if retrieval.fallback_used { " (keyword fallback)" } else { "" };
                Output::success(&format!("Found {} results{}", retrieval.matches.len(), how));

                for m in &retrieval.matches {
                    Output::search_result(m);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
