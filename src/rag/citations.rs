//! Citation selection.

use super::Citation;
use crate::vector_store::Chunk;
use std::collections::HashSet;

/// Map the chunks an answer drew on to citations, one per source document, in
/// first-use order.
pub fn select_citations(used_chunks: &[Chunk]) -> Vec<Citation> {
    let mut seen = HashSet::new();
    used_chunks
        .iter()
        .filter(|chunk| seen.insert(chunk.source_path.as_str()))
        .map(|chunk| Citation {
            title: chunk.title.clone(),
            section: chunk.section.clone(),
            source_path: chunk.source_path.clone(),
        })
        .collect()
}
