// Embedding-cluster topic extraction, after the BERTopic pipeline:
// embed the documents, cluster the embeddings with HDBSCAN, then describe
// each cluster with its highest-scoring c-TF-IDF terms.
//
// There is no UMAP reduction step — the unit-length embeddings are
// clustered directly, and the neighborhood-size knob maps onto HDBSCAN's
// `min_samples` density neighborhood.

use std::cmp::Ordering;
use std::collections::HashMap;

use anyhow::{Context, Result};
use hdbscan::{Hdbscan, HdbscanHyperParams};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::embedder::{DocumentEmbedder, OnnxEmbedder};
use crate::traits::TopicExtractor;
use crate::vectorizer::{CountVectorizer, DocumentTermMatrix, VectorizerParams};

/// Documents HDBSCAN refuses to cluster land in this bucket; it is
/// reported as a topic of its own when non-empty.
const OUTLIER_LABEL: i32 = -1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BertopicParams {
    /// Words per topic in the output. Topics are typically best represented
    /// by at most 10 words.
    pub top_n_words: usize,
    /// Minimum cluster size. Increasing this produces fewer topics.
    pub min_topic_size: usize,
    /// Density neighborhood size. Larger values favor a more global view of
    /// the embedding structure, smaller values a more local one.
    pub n_neighbors: usize,
}

impl Default for BertopicParams {
    fn default() -> Self {
        Self {
            top_n_words: 10,
            min_topic_size: 10,
            n_neighbors: 15,
        }
    }
}

/// Embedding-cluster topic extractor.
pub struct BertopicExtractor {
    params: BertopicParams,
    embedder: Box<dyn DocumentEmbedder>,
    vectorizer: CountVectorizer,
}

impl BertopicExtractor {
    pub fn new(params: BertopicParams, embedder: Box<dyn DocumentEmbedder>) -> Self {
        // Stop-word / 1-3-gram counting for the topic descriptions. No
        // document-frequency pruning, so small clusters keep their terms.
        let vectorizer = CountVectorizer::new(VectorizerParams::default());
        Self {
            params,
            embedder,
            vectorizer,
        }
    }

    /// Convenience constructor wiring in the local ONNX embedder from its
    /// default model directory.
    pub fn with_local_model(params: BertopicParams) -> Result<Self> {
        let embedder = OnnxEmbedder::load(&OnnxEmbedder::default_model_dir())?;
        Ok(Self::new(params, Box::new(embedder)))
    }

    fn cluster(&self, embeddings: &[Vec<f32>]) -> Result<Vec<i32>> {
        // min_samples cannot exceed the corpus size.
        let min_samples = self
            .params
            .n_neighbors
            .clamp(1, embeddings.len().saturating_sub(1).max(1));
        let hyper = HdbscanHyperParams::builder()
            .min_cluster_size(self.params.min_topic_size.max(2))
            .min_samples(min_samples)
            .build();
        let data = embeddings.to_vec();
        Hdbscan::new(&data, hyper)
            .cluster()
            .map_err(|e| anyhow::anyhow!("HDBSCAN clustering failed: {e}"))
    }
}

impl TopicExtractor for BertopicExtractor {
    fn extract_topics(&self, docs: &[String]) -> Result<Vec<Vec<String>>> {
        if docs.is_empty() {
            anyhow::bail!("No documents to extract topics from");
        }

        let embeddings = self
            .embedder
            .embed(docs)
            .context("Document embedding failed")?;

        let labels = if docs.len() <= self.params.min_topic_size.max(2) {
            // Too few documents to form a single cluster.
            vec![OUTLIER_LABEL; docs.len()]
        } else {
            self.cluster(&embeddings)?
        };

        let groups = group_by_label(&labels);
        let outliers = labels.iter().filter(|&&l| l == OUTLIER_LABEL).count();
        debug!(
            clusters = groups.len(),
            outliers,
            documents = docs.len(),
            "Clustered document embeddings"
        );

        let dtm = self.vectorizer.fit_transform(docs)?;
        let topics = ctfidf_top_terms(&dtm, &groups, self.params.top_n_words);

        info!(
            topics = topics.len(),
            documents = docs.len(),
            "Extracted embedding-cluster topics"
        );

        Ok(topics)
    }
}

/// Group document indices per cluster label: the outlier bucket first, then
/// clusters by size descending (BERTopic's topic ordering).
fn group_by_label(labels: &[i32]) -> Vec<Vec<usize>> {
    let mut by_label: HashMap<i32, Vec<usize>> = HashMap::new();
    for (doc, &label) in labels.iter().enumerate() {
        by_label.entry(label).or_default().push(doc);
    }

    let mut clusters: Vec<(i32, Vec<usize>)> = by_label.into_iter().collect();
    clusters.sort_by(|a, b| match (a.0 == OUTLIER_LABEL, b.0 == OUTLIER_LABEL) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => b.1.len().cmp(&a.1.len()).then(a.0.cmp(&b.0)),
    });

    clusters.into_iter().map(|(_, docs)| docs).collect()
}

/// Class-based TF-IDF: each topic's documents are merged into one class,
/// and term `t` in class `c` scores
///
///   tf(t, c) · ln(1 + A / f(t))
///
/// where `tf` is the term's share of the class token count, `f(t)` is the
/// term's corpus frequency, and `A` is the average token count per class.
/// Terms absent from a class score nothing; a class with fewer distinct
/// terms than `top_n` returns what exists.
fn ctfidf_top_terms(
    dtm: &DocumentTermMatrix,
    groups: &[Vec<usize>],
    top_n: usize,
) -> Vec<Vec<String>> {
    let corpus_freq = dtm.corpus_frequencies();
    let total_tokens: u64 = corpus_freq.iter().sum();
    let avg_class_tokens = total_tokens as f64 / groups.len().max(1) as f64;

    groups
        .iter()
        .map(|members| {
            let mut class_counts = vec![0u64; dtm.n_terms()];
            for &doc in members {
                for &(term, count) in &dtm.rows[doc] {
                    class_counts[term] += u64::from(count);
                }
            }
            let class_total: u64 = class_counts.iter().sum();
            if class_total == 0 {
                return Vec::new();
            }

            let mut scored: Vec<(usize, f64)> = class_counts
                .iter()
                .enumerate()
                .filter(|&(_, &count)| count > 0)
                .map(|(term, &count)| {
                    let tf = count as f64 / class_total as f64;
                    let idf = (1.0 + avg_class_tokens / corpus_freq[term] as f64).ln();
                    (term, tf * idf)
                })
                .collect();
            scored.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

            scored
                .into_iter()
                .take(top_n)
                .map(|(term, _)| dtm.vocabulary[term].clone())
                .collect()
        })
        .collect()
}
