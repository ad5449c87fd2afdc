//! C2: lowercasing, whitespace collapse, punctuation folding, tokenization.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static NON_WORD_NON_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("static regex"));
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// Fixed English stopword list (spec.md §6).
pub static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "the", "and", "or", "but", "if", "because", "as", "what", "when", "where",
        "how", "who", "which", "this", "that", "these", "those", "then", "just", "so", "than",
        "such", "both", "through", "about", "for", "is", "of", "while", "during", "to", "from",
        "in", "out", "on", "off", "over", "under", "again", "further", "once", "here", "there",
        "all", "any", "each", "few", "more", "most", "other", "some", "no", "nor", "not", "only",
        "own", "same", "too", "very", "s", "t", "can", "will", "don", "should", "now", "with",
        "by",
    ]
    .into_iter()
    .collect()
});

/// Lowercase, fold non-word-non-space runs to a single space, collapse
/// whitespace runs, and trim. Idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(s: &str) -> String {
    let lower = s.to_lowercase();
    let folded = NON_WORD_NON_SPACE.replace_all(&lower, " ");
    let collapsed = WHITESPACE_RUN.replace_all(&folded, " ");
    collapsed.trim().to_string()
}

/// Normalize, split on whitespace, drop stopwords. Preserves order, no stemming.
pub fn tokenize(s: &str) -> Vec<String> {
    normalize(s)
        .split_whitespace()
        .filter(|tok| !STOPWORDS.contains(tok))
        .map(|tok| tok.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_punctuation_and_collapses_whitespace() {
        assert_eq!(normalize("  Type-2  Diabetes!!  "), "type 2 diabetes");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize("Hb A1c, elevated.");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn tokenize_drops_stopwords_and_preserves_order() {
        assert_eq!(
            tokenize("history of the chronic kidney disease"),
            vec!["history", "chronic", "kidney", "disease"]
        );
    }
}
