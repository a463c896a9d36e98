//! TF-IDF vectorizer over normalised description tokens.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A frozen vocabulary plus TF-IDF weighting statistics.
///
/// Built once per training run and never mutated afterwards; a retrain
/// produces a new `Vectorizer`, not an edit of the old one. Apply mode is
/// total: unknown tokens are dropped silently and an empty token sequence
/// maps to the zero vector of the trained dimensionality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vectorizer {
    /// Token → column index, frozen at fit time.
    index: HashMap<String, usize>,
    /// Per-column inverse document frequency, `ln(n_docs / df) + 1`.
    idf: Vec<f32>,
}

impl Vectorizer {
    /// Fit a vocabulary from a tokenised corpus.
    ///
    /// Keeps at most `max_vocabulary` tokens, most frequent first; ties
    /// are broken by first appearance in the corpus so refitting the same
    /// corpus always yields the same vocabulary.
    pub fn fit(corpus: &[Vec<String>], max_vocabulary: usize) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        let mut first_seen: Vec<&str> = Vec::new();

        for doc in corpus {
            let mut seen_in_doc: Vec<&str> = Vec::new();
            for token in doc {
                let entry = counts.entry(token.as_str()).or_insert(0);
                if *entry == 0 {
                    first_seen.push(token.as_str());
                }
                *entry += 1;
                if !seen_in_doc.contains(&token.as_str()) {
                    seen_in_doc.push(token.as_str());
                    *doc_freq.entry(token.as_str()).or_insert(0) += 1;
                }
            }
        }

        // first_seen is already in corpus order; a stable sort by count
        // keeps that order among equally frequent tokens.
        let mut ordered = first_seen;
        ordered.sort_by_key(|t| std::cmp::Reverse(counts[t]));
        ordered.truncate(max_vocabulary);

        let n_docs = corpus.len().max(1) as f32;
        let mut index = HashMap::with_capacity(ordered.len());
        let mut idf = Vec::with_capacity(ordered.len());
        for (i, token) in ordered.iter().enumerate() {
            index.insert((*token).to_string(), i);
            let df = doc_freq.get(token).copied().unwrap_or(1).max(1) as f32;
            idf.push((n_docs / df).ln() + 1.0);
        }

        Vectorizer { index, idf }
    }

    /// Number of columns in every produced vector.
    pub fn dimension(&self) -> usize {
        self.idf.len()
    }

    /// Map a token sequence to an L2-normalised TF-IDF vector.
    pub fn apply(&self, tokens: &[String]) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension()];
        if tokens.is_empty() {
            return vector;
        }

        let total = tokens.len() as f32;
        for token in tokens {
            if let Some(&col) = self.index.get(token.as_str()) {
                vector[col] += self.idf[col] / total;
            }
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }

    /// Whether the vocabulary froze a given token. Mostly for tests.
    pub fn knows(&self, token: &str) -> bool {
        self.index.contains_key(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn fit_indexes_every_corpus_token_under_cap() {
        let corpus = vec![doc(&["grocery", "mart"]), doc(&["taxi", "ride"])];
        let vectorizer = Vectorizer::fit(&corpus, 100);
        assert_eq!(vectorizer.dimension(), 4);
        assert!(vectorizer.knows("grocery"));
        assert!(vectorizer.knows("ride"));
    }

    #[test]
    fn cap_keeps_most_frequent_tokens() {
        let corpus = vec![
            doc(&["uber", "trip"]),
            doc(&["uber", "eats"]),
            doc(&["uber"]),
        ];
        let vectorizer = Vectorizer::fit(&corpus, 1);
        assert_eq!(vectorizer.dimension(), 1);
        assert!(vectorizer.knows("uber"));
        assert!(!vectorizer.knows("trip"));
    }

    #[test]
    fn frequency_ties_break_by_first_appearance() {
        let corpus = vec![doc(&["alpha", "beta"]), doc(&["beta", "alpha"])];
        let vectorizer = Vectorizer::fit(&corpus, 1);
        assert!(vectorizer.knows("alpha"));
    }

    #[test]
    fn apply_drops_unknown_tokens_silently() {
        let corpus = vec![doc(&["grocery", "mart"])];
        let vectorizer = Vectorizer::fit(&corpus, 100);
        let vector = vectorizer.apply(&doc(&["grocery", "spaceship"]));
        assert_eq!(vector.len(), 2);
        assert!(vector.iter().any(|&v| v > 0.0));
    }

    #[test]
    fn apply_on_empty_input_is_zero_vector() {
        let corpus = vec![doc(&["grocery", "mart"])];
        let vectorizer = Vectorizer::fit(&corpus, 100);
        let vector = vectorizer.apply(&[]);
        assert_eq!(vector, vec![0.0, 0.0]);
    }

    #[test]
    fn apply_on_fully_unknown_input_is_zero_vector() {
        let corpus = vec![doc(&["grocery"])];
        let vectorizer = Vectorizer::fit(&corpus, 100);
        assert_eq!(vectorizer.apply(&doc(&["warp", "drive"])), vec![0.0]);
    }

    #[test]
    fn vectors_are_l2_normalised() {
        let corpus = vec![doc(&["grocery", "mart"]), doc(&["grocery", "store"])];
        let vectorizer = Vectorizer::fit(&corpus, 100);
        let vector = vectorizer.apply(&doc(&["grocery", "mart"]));
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_corpus_yields_zero_dimension() {
        let vectorizer = Vectorizer::fit(&[], 100);
        assert_eq!(vectorizer.dimension(), 0);
        assert!(vectorizer.apply(&doc(&["anything"])).is_empty());
    }
}
