// Bag-of-n-grams document vectorization.
//
// Both strategies describe topics through the same counting vectorizer:
// lowercase tokenization, English stop word removal, word n-grams, and
// document-frequency pruning. The vocabulary is sorted so the same corpus
// always produces the same matrix.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use stop_words::{get, LANGUAGE};
use tracing::debug;

/// Vectorizer knobs. `min_df` and `max_df` are proportions of the corpus:
/// a term survives pruning only when the fraction of documents containing
/// it lies within `[min_df, max_df]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizerParams {
    pub min_df: f64,
    pub max_df: f64,
    /// Inclusive range of n-gram lengths to emit — (1, 3) produces
    /// unigrams, bigrams, and trigrams.
    pub ngram_range: (usize, usize),
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            min_df: 0.0,
            max_df: 1.0,
            ngram_range: (1, 3),
        }
    }
}

/// Sparse document-term counts. `rows[d]` holds `(term_id, count)` pairs
/// for document `d`, ordered by term id; `vocabulary[term_id]` is the term
/// text.
#[derive(Debug, Clone)]
pub struct DocumentTermMatrix {
    pub vocabulary: Vec<String>,
    pub rows: Vec<Vec<(usize, u32)>>,
}

impl DocumentTermMatrix {
    pub fn n_terms(&self) -> usize {
        self.vocabulary.len()
    }

    /// Occurrences of each term summed over the whole corpus.
    pub fn corpus_frequencies(&self) -> Vec<u64> {
        let mut freq = vec![0u64; self.vocabulary.len()];
        for row in &self.rows {
            for &(term, count) in row {
                freq[term] += u64::from(count);
            }
        }
        freq
    }
}

/// Tokenizing and counting vectorizer over a document collection.
pub struct CountVectorizer {
    params: VectorizerParams,
    stop_words: HashSet<String>,
    token_pattern: Regex,
}

impl CountVectorizer {
    pub fn new(params: VectorizerParams) -> Self {
        let stop_words: HashSet<String> = get(LANGUAGE::English).into_iter().collect();
        // Runs of at least two lowercase alphanumerics — single characters
        // carry no topical signal.
        let token_pattern = Regex::new("[a-z0-9]{2,}").expect("token pattern is valid");
        Self {
            params,
            stop_words,
            token_pattern,
        }
    }

    /// Lowercase, split on the token pattern, and drop stop words.
    /// Stop words are removed before n-gram generation, so a bigram never
    /// spans one.
    fn tokenize(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        self.token_pattern
            .find_iter(&lower)
            .map(|m| m.as_str())
            .filter(|token| !self.stop_words.contains(*token))
            .map(str::to_owned)
            .collect()
    }

    fn ngrams(&self, tokens: &[String]) -> Vec<String> {
        let (lo, hi) = self.params.ngram_range;
        let mut grams = Vec::new();
        for n in lo..=hi {
            if n > tokens.len() {
                break;
            }
            for window in tokens.windows(n) {
                grams.push(window.join(" "));
            }
        }
        grams
    }

    /// Build the vocabulary and count matrix for `docs` in one pass.
    pub fn fit_transform(&self, docs: &[String]) -> Result<DocumentTermMatrix> {
        if docs.is_empty() {
            anyhow::bail!("No documents to vectorize");
        }
        let (lo, hi) = self.params.ngram_range;
        if lo == 0 || lo > hi {
            anyhow::bail!("Invalid n-gram range ({lo}, {hi})");
        }

        // Term counts per document.
        let mut doc_counts: Vec<HashMap<String, u32>> = Vec::with_capacity(docs.len());
        for doc in docs {
            let tokens = self.tokenize(doc);
            let mut counts: HashMap<String, u32> = HashMap::new();
            for gram in self.ngrams(&tokens) {
                *counts.entry(gram).or_insert(0) += 1;
            }
            doc_counts.push(counts);
        }

        // Document frequency per term.
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for counts in &doc_counts {
            for term in counts.keys() {
                *doc_freq.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        // Prune by document frequency, then fix the vocabulary order.
        let n_docs = docs.len() as f64;
        let mut vocabulary: Vec<String> = doc_freq
            .iter()
            .filter(|&(_, &df)| {
                let df = df as f64;
                df >= self.params.min_df * n_docs && df <= self.params.max_df * n_docs
            })
            .map(|(&term, _)| term.to_owned())
            .collect();
        vocabulary.sort_unstable();

        if vocabulary.is_empty() {
            anyhow::bail!(
                "No terms remain after document-frequency pruning (min_df={}, max_df={})",
                self.params.min_df,
                self.params.max_df
            );
        }

        let term_ids: HashMap<&str, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(id, term)| (term.as_str(), id))
            .collect();

        let rows: Vec<Vec<(usize, u32)>> = doc_counts
            .iter()
            .map(|counts| {
                let mut row: Vec<(usize, u32)> = counts
                    .iter()
                    .filter_map(|(term, &count)| {
                        term_ids.get(term.as_str()).map(|&id| (id, count))
                    })
                    .collect();
                row.sort_unstable_by_key(|&(id, _)| id);
                row
            })
            .collect();

        debug!(
            documents = docs.len(),
            terms = vocabulary.len(),
            "Vectorized corpus"
        );

        Ok(DocumentTermMatrix { vocabulary, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_tokenize_drops_stop_words_and_short_tokens() {
        let vectorizer = CountVectorizer::new(VectorizerParams {
            ngram_range: (1, 1),
            ..VectorizerParams::default()
        });
        let dtm = vectorizer
            .fit_transform(&docs(&["The compiler and the borrow checker, a duo"]))
            .unwrap();
        assert!(dtm.vocabulary.contains(&"compiler".to_string()));
        assert!(dtm.vocabulary.contains(&"borrow".to_string()));
        assert!(!dtm.vocabulary.contains(&"the".to_string()));
        assert!(!dtm.vocabulary.contains(&"and".to_string()));
        assert!(!dtm.vocabulary.contains(&"a".to_string()));
    }

    #[test]
    fn test_ngrams_up_to_three() {
        let vectorizer = CountVectorizer::new(VectorizerParams::default());
        let dtm = vectorizer
            .fit_transform(&docs(&["detecting code smells"]))
            .unwrap();
        assert!(dtm.vocabulary.contains(&"detecting".to_string()));
        assert!(dtm.vocabulary.contains(&"detecting code".to_string()));
        assert!(dtm.vocabulary.contains(&"detecting code smells".to_string()));
    }

    #[test]
    fn test_ngrams_never_span_a_stop_word() {
        let vectorizer = CountVectorizer::new(VectorizerParams::default());
        let dtm = vectorizer
            .fit_transform(&docs(&["code smells in java"]))
            .unwrap();
        // "in" is removed first, so the bigram joins its neighbors.
        assert!(dtm.vocabulary.contains(&"smells java".to_string()));
        assert!(!dtm.vocabulary.iter().any(|t| t.contains(" in ")));
    }

    #[test]
    fn test_min_df_prunes_rare_terms() {
        let vectorizer = CountVectorizer::new(VectorizerParams {
            min_df: 0.5,
            ngram_range: (1, 1),
            ..VectorizerParams::default()
        });
        let dtm = vectorizer
            .fit_transform(&docs(&[
                "rust compiler",
                "rust borrow",
                "rust lifetimes",
                "gardening",
            ]))
            .unwrap();
        // "rust" appears in 3/4 docs, everything else in 1/4.
        assert_eq!(dtm.vocabulary, vec!["rust".to_string()]);
    }

    #[test]
    fn test_max_df_prunes_ubiquitous_terms() {
        let vectorizer = CountVectorizer::new(VectorizerParams {
            max_df: 0.6,
            ngram_range: (1, 1),
            ..VectorizerParams::default()
        });
        let dtm = vectorizer
            .fit_transform(&docs(&["rust compiler", "rust borrow", "rust lifetimes"]))
            .unwrap();
        assert!(!dtm.vocabulary.contains(&"rust".to_string()));
        assert!(dtm.vocabulary.contains(&"compiler".to_string()));
    }

    #[test]
    fn test_counts_are_per_document() {
        let vectorizer = CountVectorizer::new(VectorizerParams {
            ngram_range: (1, 1),
            ..VectorizerParams::default()
        });
        let dtm = vectorizer
            .fit_transform(&docs(&["soup soup soup", "soup salad"]))
            .unwrap();
        let soup = dtm.vocabulary.iter().position(|t| t == "soup").unwrap();
        let count_in = |row: &[(usize, u32)], id: usize| {
            row.iter().find(|&&(t, _)| t == id).map(|&(_, c)| c)
        };
        assert_eq!(count_in(&dtm.rows[0], soup), Some(3));
        assert_eq!(count_in(&dtm.rows[1], soup), Some(1));
    }

    #[test]
    fn test_vocabulary_is_sorted() {
        let vectorizer = CountVectorizer::new(VectorizerParams::default());
        let dtm = vectorizer
            .fit_transform(&docs(&["zebra yak", "yak aardvark"]))
            .unwrap();
        let mut sorted = dtm.vocabulary.clone();
        sorted.sort_unstable();
        assert_eq!(dtm.vocabulary, sorted);
    }

    #[test]
    fn test_empty_corpus_fails() {
        let vectorizer = CountVectorizer::new(VectorizerParams::default());
        assert!(vectorizer.fit_transform(&[]).is_err());
    }

    #[test]
    fn test_all_stop_words_fails() {
        let vectorizer = CountVectorizer::new(VectorizerParams::default());
        let result = vectorizer.fit_transform(&docs(&["the and of", "to is it"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_corpus_frequencies() {
        let vectorizer = CountVectorizer::new(VectorizerParams {
            ngram_range: (1, 1),
            ..VectorizerParams::default()
        });
        let dtm = vectorizer
            .fit_transform(&docs(&["soup soup", "soup salad"]))
            .unwrap();
        let soup = dtm.vocabulary.iter().position(|t| t == "soup").unwrap();
        let salad = dtm.vocabulary.iter().position(|t| t == "salad").unwrap();
        let freq = dtm.corpus_frequencies();
        assert_eq!(freq[soup], 3);
        assert_eq!(freq[salad], 1);
    }
}
