// Topic extractor trait — swap-ready abstraction.
//
// Both strategies produce the same shape: a list of topics, each an ordered
// list of representative words, most representative first. Callers hold
// whichever extractor they configured behind this trait.

use anyhow::Result;

/// Trait for extracting topics from a collection of documents.
pub trait TopicExtractor {
    /// Analyze a set of documents and produce one word list per topic.
    fn extract_topics(&self, docs: &[String]) -> Result<Vec<Vec<String>>>;
}
