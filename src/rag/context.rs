//! Prompt context building for generative answers.

use crate::vector_store::RetrievedMatch;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

static CITATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+(?:\s*,\s*\d+)*)\]").expect("Invalid regex"));

/// Phrases that commonly open a prompt-injection attempt.
const INJECTION_PATTERNS: &[&str] = &[
    "ignore previous",
    "ignore above",
    "ignore all",
    "disregard",
    "forget everything",
    "new instructions",
    "system instructions",
    "system prompt",
    "you are now",
    "act as",
    "pretend to be",
];

/// Pick the highest-ranked matches whose text fits in `max_chars`.
///
/// The top match is always kept (it is truncated when rendered); lower-ranked
/// matches are dropped first once the budget runs out.
pub fn select_context(matches: &[RetrievedMatch], max_chars: usize) -> &[RetrievedMatch] {
    let mut used = 0usize;
    let mut count = 0usize;
    for m in matches {
        let len = m.chunk.text.chars().count();
        if count > 0 && used + len > max_chars {
            break;
        }
        used += len;
        count += 1;
    }
    &matches[..count]
}

/// Format selected matches as numbered source blocks.
pub fn format_context_for_prompt(matches: &[RetrievedMatch], max_chars: usize) -> String {
    if matches.is_empty() {
        return "No supporting passages.".to_string();
    }

    matches
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let chunk = &m.chunk;
            let excerpt: String = chunk.text.trim().chars().take(max_chars.max(1)).collect();
            format!(
                "[{}] Title: {}\nSection: {}\nSource: {}\nExcerpt:\n{}",
                i + 1,
                chunk.title,
                chunk.section.as_deref().unwrap_or(&chunk.title),
                chunk.source_path,
                excerpt
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Neutralise a student question before it is placed in a prompt.
///
/// Template and delimiter markers are stripped so the question cannot break out of
/// its block. Questions that look like injection attempts are logged and labelled.
pub fn sanitize_question(question: &str) -> String {
    let cleaned = question
        .replace("{{", "")
        .replace("}}", "")
        .replace("<<<", "")
        .replace(">>>", "");
    let cleaned = cleaned.trim();

    let lowered = cleaned.to_lowercase();
    if INJECTION_PATTERNS.iter().any(|p| lowered.contains(p)) {
        warn!("Question contains instruction-like phrasing; treating it as plain content");
        return format!("[User question]: {}", cleaned);
    }

    cleaned.to_string()
}

/// Zero-based source indices cited as `[n]` or `[n, m]` in `text`, in first-reference
/// order. Numbers outside `1..=source_count` are ignored.
pub fn cited_sources(text: &str, source_count: usize) -> Vec<usize> {
    let mut cited = Vec::new();
    for caps in CITATION_RE.captures_iter(text) {
        for number in caps[1].split(',') {
            let Ok(n) = number.trim().parse::<usize>() else {
                continue;
            };
            if (1..=source_count).contains(&n) && !cited.contains(&(n - 1)) {
                cited.push(n - 1);
            }
        }
    }
    cited
}
