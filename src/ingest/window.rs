//! Word-window chunking.

/// Split `text` into windows of at most `max_words` words, each sharing
/// `overlap_words` words with the previous one.
///
/// Whitespace is normalised to single spaces. An overlap at or above the window size
/// is reduced so every window advances by at least one word.
pub fn word_windows(text: &str, max_words: usize, overlap_words: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let max_words = max_words.max(1);
    let overlap = overlap_words.min(max_words - 1);

    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + max_words).min(words.len());
        windows.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start = end - overlap;
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_window() {
        assert_eq!(word_windows("  one two\nthree ", 10, 2), vec!["one two three"]);
        assert!(word_windows("   ", 10, 2).is_empty());
    }

    #[test]
    fn test_windows_overlap() {
        let text = (1..=10).map(|n| n.to_string()).collect::<Vec<_>>().join(" ");
        let windows = word_windows(&text, 4, 1);
        assert_eq!(windows, vec!["1 2 3 4", "4 5 6 7", "7 8 9 10"]);
    }

    #[test]
    fn test_oversized_overlap_still_advances() {
        let windows = word_windows("a b c d", 2, 5);
        assert_eq!(windows, vec!["a b", "b c", "c d"]);
    }
}
