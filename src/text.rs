use regex::Regex;

/// A word or phrase matched on word boundaries against lower-cased text.
///
/// `\b` only behaves at word characters, so terms that begin or end with
/// punctuation (`c++`, `.net`, `u.s.`) fall back to "start/end of text or a
/// non-word character" on that side.
#[derive(Debug, Clone)]
pub struct WordPattern {
    word: String,
    regex: Regex,
}

impl WordPattern {
    pub fn new(word: &str) -> Result<Self, regex::Error> {
        let word = word.trim().to_lowercase();
        let starts_wordy = word.chars().next().is_some_and(is_word_char);
        let ends_wordy = word.chars().last().is_some_and(is_word_char);

        let prefix = if starts_wordy { r"\b" } else { r"(?:^|\W)" };
        let suffix = if ends_wordy { r"\b" } else { r"(?:\W|$)" };
        let regex = Regex::new(&format!("{prefix}{}{suffix}", regex::escape(&word)))?;

        Ok(Self { word, regex })
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    /// `haystack` is expected to be lower-cased already.
    pub fn is_match(&self, haystack: &str) -> bool {
        !self.word.is_empty() && self.regex.is_match(haystack)
    }
}

pub fn compile_all<S: AsRef<str>>(words: &[S]) -> Result<Vec<WordPattern>, regex::Error> {
    words
        .iter()
        .map(|w| w.as_ref())
        .filter(|w| !w.trim().is_empty())
        .map(WordPattern::new)
        .collect()
}

/// Words of `patterns` that occur in `haystack`, in pattern order.
pub fn matched_words(patterns: &[WordPattern], haystack: &str) -> Vec<String> {
    patterns
        .iter()
        .filter(|p| p.is_match(haystack))
        .map(|p| p.word().to_string())
        .collect()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Collapse every whitespace run to a single space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip double quotes and surrounding whitespace before a value hits a CSV cell.
pub fn clean_csv_value(value: &str) -> String {
    value.replace('"', "").trim().to_string()
}

/// Split every entry on commas and lower-case/trim the parts, dropping empties.
pub fn split_comma_fragments<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.as_ref().split(','))
        .map(|part| part.trim().to_lowercase())
        .filter(|part| !part.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_whole_words_only() {
        let go = WordPattern::new("go").unwrap();
        assert!(go.is_match("we write go and rust"));
        assert!(go.is_match("go, python"));
        assert!(!go.is_match("a good google engineer"));
    }

    #[test]
    fn matches_terms_with_punctuation_edges() {
        let cpp = WordPattern::new("C++").unwrap();
        assert!(cpp.is_match("experience with c++ and rust"));
        assert!(cpp.is_match("c++"));
        assert!(!cpp.is_match("c+ programming"));

        let us = WordPattern::new("u.s.").unwrap();
        assert!(us.is_match("based in the u.s. only"));
        assert!(!us.is_match("focus.s."));
    }

    #[test]
    fn matches_multi_word_phrases() {
        let wfh = WordPattern::new("work from home").unwrap();
        assert!(wfh.is_match("this role is work from home friendly"));
        assert!(!wfh.is_match("we work from homeland"));
    }

    #[test]
    fn collects_matches_in_pattern_order() {
        let patterns = compile_all(&["react", "sql", "kafka", ""]).unwrap();
        assert_eq!(patterns.len(), 3);
        assert_eq!(
            matched_words(&patterns, "kafka, postgres sql and react"),
            vec!["react", "sql", "kafka"]
        );
    }

    #[test]
    fn cleans_and_splits_values() {
        assert_eq!(clean_csv_value("  \"Acme\" Inc "), "Acme Inc");
        assert_eq!(collapse_whitespace(" a \n\t b  c "), "a b c");
        assert_eq!(
            split_comma_fragments(&["Bengaluru, Karnataka", " INDIA ", ", "]),
            vec!["bengaluru", "karnataka", "india"]
        );
    }
}
