//! Okapi BM25 scoring for [`InMemoryStore`](super::memory::InMemoryStore).
//!
//! Brute force over the namespace: every stored text is tokenized at query
//! time. Fine for tests and small corpora; real backends keep an index.

use std::collections::{HashMap, HashSet};

/// Term-frequency saturation.
pub const BM25_K1: f64 = 1.2;
/// Document-length normalization.
pub const BM25_B: f64 = 0.75;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

/// Lowercase, split on non-alphanumeric characters, drop stop words and
/// single-character tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1 && !STOP_WORDS.contains(t))
        .map(String::from)
        .collect()
}

/// Score every document in `docs` against `query`.
///
/// Returns one score per document, in input order. Documents sharing no
/// term with the query score `0.0`.
pub fn score_all(query: &str, docs: &[&str]) -> Vec<f64> {
    let query_terms: HashSet<String> = tokenize(query).into_iter().collect();
    if query_terms.is_empty() || docs.is_empty() {
        return vec![0.0; docs.len()];
    }

    let tokenized: Vec<Vec<String>> = docs.iter().map(|d| tokenize(d)).collect();
    let n = docs.len() as f64;
    let total_len: usize = tokenized.iter().map(Vec::len).sum();
    let avgdl = (total_len as f64 / n).max(1.0);

    let mut df: HashMap<&str, usize> = HashMap::new();
    for tokens in &tokenized {
        let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
        for term in unique {
            if query_terms.contains(term) {
                *df.entry(term).or_insert(0) += 1;
            }
        }
    }

    tokenized
        .iter()
        .map(|tokens| {
            let dl = tokens.len() as f64;
            let mut tf: HashMap<&str, usize> = HashMap::new();
            for t in tokens {
                if query_terms.contains(t.as_str()) {
                    *tf.entry(t.as_str()).or_insert(0) += 1;
                }
            }
            tf.iter()
                .map(|(term, &count)| {
                    let df = df.get(term).copied().unwrap_or(0) as f64;
                    // IDF: ln((N - df + 0.5) / (df + 0.5) + 1), never negative
                    let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
                    let tf = count as f64;
                    idf * (tf * (BM25_K1 + 1.0))
                        / (tf + BM25_K1 * (1.0 - BM25_B + BM25_B * dl / avgdl))
                })
                .sum()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_filters() {
        assert_eq!(
            tokenize("The Quick-Brown fox, a dog!"),
            vec!["quick", "brown", "fox", "dog"]
        );
        assert!(tokenize("a I the").is_empty());
    }

    #[test]
    fn test_matching_doc_outscores_others() {
        let docs = ["rust borrow checker", "python garbage collector", "cooking pasta"];
        let scores = score_all("borrow checker", &docs);
        assert!(scores[0] > 0.0);
        assert_eq!(scores[1], 0.0);
        assert_eq!(scores[2], 0.0);
    }

    #[test]
    fn test_rarer_term_weighs_more() {
        let docs = ["common rare", "common", "common", "common"];
        let scores = score_all("common rare", &docs);
        assert!(scores[0] > scores[1]);
    }

    #[test]
    fn test_shorter_doc_wins_on_equal_tf() {
        let docs = ["tokio runtime", "tokio runtime plus many other unrelated filler words here"];
        let scores = score_all("tokio", &docs);
        assert!(scores[0] > scores[1]);
    }

    #[test]
    fn test_empty_query_scores_zero() {
        assert_eq!(score_all("the a", &["anything"]), vec![0.0]);
        assert!(score_all("rust", &[]).is_empty());
    }
}
