// Strategy selection for topic extraction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The available topic extraction strategies.
///
/// Serializes as the lowercase strategy name ("lda" / "bertopic"), which is
/// also what `FromStr` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicExtractionStrategy {
    /// Latent Dirichlet Allocation over bag-of-n-gram counts.
    Lda,
    /// Embedding-cluster pipeline in the style of BERTopic.
    Bertopic,
}

impl TopicExtractionStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lda => "lda",
            Self::Bertopic => "bertopic",
        }
    }
}

impl fmt::Display for TopicExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopicExtractionStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lda" => Ok(Self::Lda),
            "bertopic" => Ok(Self::Bertopic),
            other => anyhow::bail!("Unknown topic extraction strategy: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_through_str() {
        for strategy in [TopicExtractionStrategy::Lda, TopicExtractionStrategy::Bertopic] {
            let parsed: TopicExtractionStrategy = strategy.as_str().parse().unwrap();
            assert_eq!(parsed, strategy);
        }
    }

    #[test]
    fn test_unknown_name_fails() {
        assert!("nmf".parse::<TopicExtractionStrategy>().is_err());
    }
}
