//! Delete command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::vector_store::DeleteScope;
use anyhow::Result;

/// Run the delete command.
pub async fn run_delete(
    course: &str,
    source: Option<String>,
    chunk: Option<String>,
    settings: Settings,
) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    let (scope, what) = match (source, chunk) {
        (Some(path), _) => (DeleteScope::Source(path.clone()), format!("source {}", path)),
        (None, Some(id)) => (DeleteScope::Chunk(id.clone()), format!("chunk {}", id)),
        (None, None) => (DeleteScope::Course, "all material".to_string()),
    };

    let removed = orchestrator.vector_store().delete(course, &scope).await?;
    if removed == 0 {
        Output::warning(&format!("Nothing to delete for {} in course {}", what, course));
    } else {
        Output::success(&format!(
            "Removed {} chunks ({}) from course {}",
            removed, what, course
        ));
    }

    Ok(())
}
