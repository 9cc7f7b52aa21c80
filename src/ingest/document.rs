//! Course document parsing.

use crate::error::Result;
use crate::text;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}\s+(\S.*)$").expect("Invalid regex"));

/// Supported markdown extensions.
const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Supported plain-text extensions.
const TEXT_EXTENSIONS: &[&str] = &["txt"];

/// A titled run of document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub content: String,
}

/// A course document split into sections.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Document title: the first heading, or the title-cased file stem.
    pub title: String,
    /// Path relative to the ingested directory, `/`-separated.
    pub source_path: String,
    /// Non-empty sections in document order.
    pub sections: Vec<Section>,
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Whether `path` is a file type ingestion understands.
pub fn is_supported(path: &Path) -> bool {
    has_extension(path, MARKDOWN_EXTENSIONS) || has_extension(path, TEXT_EXTENSIONS)
}

/// Read and parse the document at `path`, naming it relative to `root`.
pub fn load_document(root: &Path, path: &Path) -> Result<ParsedDocument> {
    let content = std::fs::read_to_string(path)?;
    let source_path = relative_source_path(root, path);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");

    if has_extension(path, MARKDOWN_EXTENSIONS) {
        Ok(parse_markdown(&content, &source_path, stem))
    } else {
        Ok(parse_plain_text(&content, &source_path, stem))
    }
}

/// Split markdown at ATX headings. Text before the first heading is filed under the
/// title-cased file stem.
pub fn parse_markdown(content: &str, source_path: &str, stem: &str) -> ParsedDocument {
    let fallback_title = stem_title(stem);
    let mut first_heading: Option<String> = None;
    let mut current_title = fallback_title.clone();
    let mut buffer: Vec<&str> = Vec::new();
    let mut sections = Vec::new();

    for line in content.lines() {
        if let Some(caps) = HEADING_RE.captures(line.trim_end()) {
            push_section(&mut sections, &current_title, &buffer);
            buffer.clear();
            current_title = match caps[1].trim().trim_end_matches('#').trim() {
                "" => fallback_title.clone(),
                heading => heading.to_string(),
            };
            first_heading.get_or_insert_with(|| current_title.clone());
        } else {
            buffer.push(line);
        }
    }
    push_section(&mut sections, &current_title, &buffer);

    ParsedDocument {
        title: first_heading.unwrap_or(fallback_title),
        source_path: source_path.to_string(),
        sections,
    }
}

/// A plain-text document is one section titled after the file.
pub fn parse_plain_text(content: &str, source_path: &str, stem: &str) -> ParsedDocument {
    let title = stem_title(stem);
    let mut sections = Vec::new();
    push_section(&mut sections, &title, &[content]);
    ParsedDocument {
        title,
        source_path: source_path.to_string(),
        sections,
    }
}

/// Title-cased file stem, or "Untitled" when the stem has no letters to show.
fn stem_title(stem: &str) -> String {
    match text::title_case(stem) {
        title if title.is_empty() => "Untitled".to_string(),
        title => title,
    }
}

fn push_section(sections: &mut Vec<Section>, title: &str, lines: &[&str]) {
    let content = lines.join("\n").trim().to_string();
    if !content.is_empty() {
        sections.push(Section {
            title: title.to_string(),
            content,
        });
    }
}

fn relative_source_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_markdown_sections() {
        let md = "Intro text before headings.\n\n# Course Syllabus\n\n## Grading\nExams 40%.\nProjects 60%.\n\n## Empty\n\n## Office Hours\nMondays 2-4pm.\n";
        let doc = parse_markdown(md, "syllabus.md", "syllabus");

        assert_eq!(doc.title, "Course Syllabus");
        let titles: Vec<&str> = doc.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Syllabus", "Grading", "Office Hours"]);
        assert_eq!(doc.sections[1].content, "Exams 40%.\nProjects 60%.");
    }

    #[test]
    fn test_markdown_without_headings_uses_stem() {
        let doc = parse_markdown("Just text.", "late-policy.md", "late-policy");
        assert_eq!(doc.title, "Late Policy");
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].title, "Late Policy");
    }

    #[test]
    fn test_blank_stems_and_headings_still_get_titles() {
        let doc = parse_markdown("Just text.", "_.md", "_");
        assert_eq!(doc.title, "Untitled");
        assert_eq!(doc.sections[0].title, "Untitled");

        let doc = parse_markdown("# ###
Body.", "rules.md", "rules");
        assert_eq!(doc.title, "Rules");

        assert_eq!(parse_plain_text("Body.", "-.txt", "-").title, "Untitled");
    }

    #[test]
    fn test_plain_text_and_empty_files() {
        let doc = parse_plain_text("Room 101.", "notes/room.txt", "room");
        assert_eq!(doc.sections, vec![Section { title: "Room".to_string(), content: "Room 101.".to_string() }]);
        assert!(parse_plain_text("  \n", "x.txt", "x").sections.is_empty());
    }

    #[test]
    fn test_supported_and_relative_paths() {
        assert!(is_supported(Path::new("a/b.MD")));
        assert!(is_supported(Path::new("notes.txt")));
        assert!(!is_supported(Path::new("calendar.ics")));
        assert_eq!(
            relative_source_path(Path::new("/data/c1"), Path::new("/data/c1/policies/late.md")),
            "policies/late.md"
        );
    }
}
