// Strata: topic extraction for document collections.
//
// This is the library root. Two strategies share one output shape — a list
// of topics, each an ordered list of representative words:
//
//   lda       Latent Dirichlet Allocation over bag-of-n-gram counts
//   bertopic  sentence embeddings + HDBSCAN clustering + c-TF-IDF

pub mod bertopic;
pub mod embedder;
pub mod lda;
pub mod strategy;
pub mod traits;
pub mod vectorizer;
