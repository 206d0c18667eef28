// Serialization round-trips for the strategy enum and parameter structs.

use strata::bertopic::BertopicParams;
use strata::lda::LdaParams;
use strata::strategy::TopicExtractionStrategy;

#[test]
fn strategy_serializes_as_lowercase_name() {
    let json = serde_json::to_string(&TopicExtractionStrategy::Lda).unwrap();
    assert_eq!(json, "\"lda\"");
    let json = serde_json::to_string(&TopicExtractionStrategy::Bertopic).unwrap();
    assert_eq!(json, "\"bertopic\"");
}

#[test]
fn strategy_deserializes_from_lowercase_name() {
    let strategy: TopicExtractionStrategy = serde_json::from_str("\"bertopic\"").unwrap();
    assert_eq!(strategy, TopicExtractionStrategy::Bertopic);
}

#[test]
fn strategy_rejects_unknown_name() {
    let result = serde_json::from_str::<TopicExtractionStrategy>("\"pca\"");
    assert!(result.is_err());
}

#[test]
fn strategy_display_matches_serialized_form() {
    for strategy in [TopicExtractionStrategy::Lda, TopicExtractionStrategy::Bertopic] {
        let json = serde_json::to_string(&strategy).unwrap();
        assert_eq!(json, format!("\"{strategy}\""));
    }
}

#[test]
fn lda_params_round_trip() {
    let params = LdaParams {
        n_topics: 7,
        min_document_frequency: 0.25,
        alpha: Some(0.1),
        beta: None,
        iterations: 250,
        seed: 42,
    };
    let json = serde_json::to_string(&params).unwrap();
    let back: LdaParams = serde_json::from_str(&json).unwrap();
    assert_eq!(back.n_topics, 7);
    assert_eq!(back.min_document_frequency, 0.25);
    assert_eq!(back.alpha, Some(0.1));
    assert_eq!(back.beta, None);
    assert_eq!(back.iterations, 250);
    assert_eq!(back.seed, 42);
}

#[test]
fn bertopic_params_round_trip() {
    let params = BertopicParams {
        top_n_words: 8,
        min_topic_size: 4,
        n_neighbors: 12,
    };
    let json = serde_json::to_string(&params).unwrap();
    let back: BertopicParams = serde_json::from_str(&json).unwrap();
    assert_eq!(back.top_n_words, 8);
    assert_eq!(back.min_topic_size, 4);
    assert_eq!(back.n_neighbors, 12);
}
