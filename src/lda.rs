// Latent Dirichlet Allocation over bag-of-n-gram counts.
//
// Inference is collapsed Gibbs sampling with a seeded RNG, so repeated runs
// over the same corpus produce the same topics. Priors default to the
// symmetric 1/k unless set explicitly.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::traits::TopicExtractor;
use crate::vectorizer::{CountVectorizer, VectorizerParams};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdaParams {
    /// Number of topics to generate.
    pub n_topics: usize,
    /// Minimum share of documents a term must appear in to enter the
    /// vocabulary.
    pub min_document_frequency: f64,
    /// Document-topic prior; `None` resolves to `1 / n_topics`.
    pub alpha: Option<f64>,
    /// Topic-term prior; `None` resolves to `1 / n_topics`.
    pub beta: Option<f64>,
    /// Gibbs sweeps over the corpus.
    pub iterations: usize,
    /// RNG seed, fixed so extraction is reproducible.
    pub seed: u64,
}

impl Default for LdaParams {
    fn default() -> Self {
        Self {
            n_topics: 10,
            min_document_frequency: 0.0,
            alpha: None,
            beta: None,
            iterations: 500,
            seed: 0,
        }
    }
}

/// LDA topic extractor.
///
/// Each topic in the output ranks the ENTIRE vocabulary by its topic-term
/// weight, most probable term first — callers truncate to taste.
pub struct LdaExtractor {
    params: LdaParams,
    vectorizer: CountVectorizer,
}

impl LdaExtractor {
    pub fn new(params: LdaParams) -> Self {
        let vectorizer = CountVectorizer::new(VectorizerParams {
            min_df: params.min_document_frequency,
            ..VectorizerParams::default()
        });
        Self { params, vectorizer }
    }
}

impl TopicExtractor for LdaExtractor {
    fn extract_topics(&self, docs: &[String]) -> Result<Vec<Vec<String>>> {
        if self.params.n_topics == 0 {
            anyhow::bail!("n_topics must be at least 1");
        }

        let dtm = self.vectorizer.fit_transform(docs)?;
        let k = self.params.n_topics;
        let n_terms = dtm.n_terms();
        let alpha = self.params.alpha.unwrap_or(1.0 / k as f64);
        let beta = self.params.beta.unwrap_or(1.0 / k as f64);

        // Expand the sparse counts into flat token streams. LDA treats a
        // document as an exchangeable bag, so occurrence order is
        // irrelevant.
        let corpus: Vec<Vec<usize>> = dtm
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .flat_map(|&(term, count)| std::iter::repeat_n(term, count as usize))
                    .collect()
            })
            .collect();

        let mut rng = StdRng::seed_from_u64(self.params.seed);

        // Count matrices for the collapsed sampler.
        let mut topic_term = vec![vec![0u32; n_terms]; k];
        let mut doc_topic = vec![vec![0u32; k]; corpus.len()];
        let mut topic_totals = vec![0u32; k];
        let mut assignments: Vec<Vec<usize>> = Vec::with_capacity(corpus.len());

        for (d, tokens) in corpus.iter().enumerate() {
            let mut z = Vec::with_capacity(tokens.len());
            for &term in tokens {
                let topic = rng.random_range(0..k);
                topic_term[topic][term] += 1;
                doc_topic[d][topic] += 1;
                topic_totals[topic] += 1;
                z.push(topic);
            }
            assignments.push(z);
        }

        let v_beta = n_terms as f64 * beta;
        let mut weights = vec![0.0f64; k];

        for sweep in 0..self.params.iterations {
            for (d, tokens) in corpus.iter().enumerate() {
                for (pos, &term) in tokens.iter().enumerate() {
                    let old = assignments[d][pos];
                    topic_term[old][term] -= 1;
                    doc_topic[d][old] -= 1;
                    topic_totals[old] -= 1;

                    // p(t) ∝ (ndk + α) · (nkw + β) / (nk + Vβ)
                    let mut total = 0.0;
                    for (t, weight) in weights.iter_mut().enumerate() {
                        *weight = (f64::from(doc_topic[d][t]) + alpha)
                            * (f64::from(topic_term[t][term]) + beta)
                            / (f64::from(topic_totals[t]) + v_beta);
                        total += *weight;
                    }

                    let new = sample_index(&weights, total, &mut rng);
                    assignments[d][pos] = new;
                    topic_term[new][term] += 1;
                    doc_topic[d][new] += 1;
                    topic_totals[new] += 1;
                }
            }
            if (sweep + 1) % 100 == 0 {
                debug!(
                    sweep = sweep + 1,
                    total = self.params.iterations,
                    "Gibbs sweep"
                );
            }
        }

        // φ[t][w] = (nkw + β) / (nk + Vβ). Ties break by vocabulary order
        // so the ranking is total.
        let topics: Vec<Vec<String>> = (0..k)
            .map(|t| {
                let denom = f64::from(topic_totals[t]) + v_beta;
                let mut ranked: Vec<(usize, f64)> = (0..n_terms)
                    .map(|term| {
                        (term, (f64::from(topic_term[t][term]) + beta) / denom)
                    })
                    .collect();
                ranked.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
                ranked
                    .into_iter()
                    .map(|(term, _)| dtm.vocabulary[term].clone())
                    .collect()
            })
            .collect();

        info!(
            topics = k,
            terms = n_terms,
            documents = docs.len(),
            "Extracted LDA topics"
        );

        Ok(topics)
    }
}

/// Draw an index proportionally to `weights`, whose sum is `total`.
fn sample_index(weights: &[f64], total: f64, rng: &mut impl Rng) -> usize {
    if total <= f64::EPSILON {
        return rng.random_range(0..weights.len());
    }
    let mut remaining = rng.random::<f64>() * total;
    for (i, &weight) in weights.iter().enumerate() {
        remaining -= weight;
        // Strictly negative so zero-weight entries are never drawn.
        if remaining < 0.0 {
            return i;
        }
    }
    weights.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_index_degenerate_mass() {
        let mut rng = StdRng::seed_from_u64(7);
        let weights = vec![0.0, 0.0, 1.0];
        for _ in 0..50 {
            assert_eq!(sample_index(&weights, 1.0, &mut rng), 2);
        }
    }

    #[test]
    fn test_sample_index_zero_total_still_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let weights = vec![0.0, 0.0, 0.0];
        for _ in 0..50 {
            assert!(sample_index(&weights, 0.0, &mut rng) < 3);
        }
    }

    #[test]
    fn test_zero_topics_fails() {
        let extractor = LdaExtractor::new(LdaParams {
            n_topics: 0,
            ..LdaParams::default()
        });
        let docs = vec!["code smells detection".to_string()];
        assert!(extractor.extract_topics(&docs).is_err());
    }

    #[test]
    fn test_empty_corpus_fails() {
        let extractor = LdaExtractor::new(LdaParams::default());
        assert!(extractor.extract_topics(&[]).is_err());
    }
}
