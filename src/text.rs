//! Text helpers shared by embedding, retrieval, and extractive composition.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("Invalid regex"));

/// Function words that carry no retrieval signal on their own.
const STOP_WORDS: &[&str] = &[
    "and", "are", "can", "did", "does", "for", "from", "had", "has", "have", "how", "into",
    "its", "not", "of", "our", "that", "the", "their", "there", "this", "was", "were", "what",
    "when", "where", "which", "who", "why", "will", "with", "you", "your",
];

/// Lowercased word tokens in order of appearance (duplicates kept).
pub fn tokens(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Distinct question keywords: tokens longer than two characters that are not stop words.
pub fn keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens(text)
        .into_iter()
        .filter(|t| t.chars().count() > 2 && !STOP_WORDS.contains(&t.as_str()))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Count how many of `keywords` occur as tokens in `text`.
pub fn keyword_hits(text: &str, keywords: &[String]) -> usize {
    if keywords.is_empty() {
        return 0;
    }
    let present: HashSet<String> = tokens(text).into_iter().collect();
    keywords.iter().filter(|k| present.contains(*k)).count()
}

/// Split prose into sentences.
///
/// Markdown heading lines are skipped and list markers stripped. A sentence ends at
/// `.`, `!` or `?` followed by whitespace, or at the end of a line.
pub fn sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line
            .strip_prefix("- ")
            .or_else(|| line.strip_prefix("* "))
            .unwrap_or(line);

        let mut current = String::new();
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            current.push(c);
            let at_boundary = matches!(c, '.' | '!' | '?')
                && chars.peek().map_or(true, |next| next.is_whitespace());
            if at_boundary {
                push_sentence(&mut out, &current);
                current.clear();
            }
        }
        push_sentence(&mut out, &current);
    }

    out
}

fn push_sentence(out: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Title-case a file stem such as `late-policy` into `Late Policy`.
pub fn title_case(stem: &str) -> String {
    stem.split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_drop_short_and_stop_words() {
        let kws = keywords("When is Assignment 1 due? Assignment due!");
        assert_eq!(kws, vec!["assignment".to_string(), "due".to_string()]);
    }

    #[test]
    fn test_keyword_hits_counts_distinct_keywords() {
        let kws = keywords("late submission penalty");
        assert_eq!(keyword_hits("Late submissions lose 10%. Late work is late.", &kws), 1);
        assert_eq!(keyword_hits("anything", &[]), 0);
    }

    #[test]
    fn test_sentences_skip_headings_and_split_on_terminators() {
        let text = "# Assignments\nAssignment 1 is due Friday at 5pm. Submit on the portal!\n- Version 2.0 notes";
        let got = sentences(text);
        assert_eq!(
            got,
            vec![
                "Assignment 1 is due Friday at 5pm.",
                "Submit on the portal!",
                "Version 2.0 notes",
            ]
        );
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("late-policy"), "Late Policy");
        assert_eq!(title_case("course_calendar"), "Course Calendar");
    }
}
