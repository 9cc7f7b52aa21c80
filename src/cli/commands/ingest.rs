//! Ingest command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ingest command.
pub async fn run_ingest(dir: &str, course: &str, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    let dir = Settings::expand_path(dir);

    let spinner = Output::spinner(&format!("Indexing {} into {}...", dir.display(), course));
    let result = orchestrator.ingestor().ingest_dir(course, &dir).await;
    spinner.finish_and_clear();

    match result {
        Ok(report) if report.documents == 0 && report.failed == 0 => {
            Output::warning(&format!(
                "No .md, .markdown or .txt files found in {}",
                dir.display()
            ));
        }
        Ok(report) => {
            Output::success(&format!(
                "Indexed {} documents ({} chunks) into course {}",
                report.documents, report.chunks, course
            ));
            if report.failed > 0 {
                Output::warning(&format!(
                    "{} documents could not be indexed; their previous chunks were kept (see log)",
                    report.failed
                ));
            }
        }
        Err(e) => {
            Output::error(&format!("Ingestion failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
