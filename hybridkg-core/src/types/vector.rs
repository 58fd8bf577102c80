//! Vector search requests and matches.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Record, WorkingSet};

/// A single match returned by a vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    /// Node identifier of the matched entity.
    pub id: String,

    /// Entity type (node label) of the match.
    #[serde(rename = "type")]
    pub node_type: String,

    /// The embedded text content.
    pub content: String,

    /// Similarity score, higher is more similar.
    pub score: f32,
}

impl VectorMatch {
    /// Create a new match.
    pub fn new<I, T, C>(id: I, node_type: T, content: C, score: f32) -> Self
    where
        I: Into<String>,
        T: Into<String>,
        C: Into<String>,
    {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            content: content.into(),
            score,
        }
    }

    /// Convert into a result record without the internal identifier.
    #[must_use]
    pub fn into_record(self) -> Record {
        let mut record = Record::new();
        record.insert("type".to_string(), Value::String(self.node_type));
        record.insert("content".to_string(), Value::String(self.content));
        record.insert("score".to_string(), Value::from(f64::from(self.score)));
        record
    }
}

/// Parameters of one vector store search.
///
/// When `top_k` is set the store returns at most that many matches; when only
/// `threshold` is set every match scoring at least the threshold is returned.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VectorSearch {
    /// The search phrase.
    pub text: String,

    /// Embedding of the search phrase.
    pub embedding: Vec<f32>,

    /// Maximum number of matches to return.
    pub top_k: Option<usize>,

    /// Minimum similarity for a match to be returned.
    pub threshold: Option<f32>,

    /// Restrict candidates to these node ids.
    pub filter_ids: Option<Vec<String>>,
}

impl VectorSearch {
    /// Create a search for the given phrase and its embedding.
    pub fn new<S: Into<String>>(text: S, embedding: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            embedding,
            ..Self::default()
        }
    }

    /// Limit the number of matches.
    #[must_use]
    pub fn with_top_k(mut self, top_k: Option<usize>) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the similarity threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: Option<f32>) -> Self {
        self.threshold = threshold;
        self
    }

    /// Restrict candidates to the given working set.
    #[must_use]
    pub fn restricted_to(mut self, working_set: &WorkingSet) -> Self {
        self.filter_ids = Some(working_set.to_vec());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_into_record_drops_id() {
        let record = VectorMatch::new("B", "FailureMode", "fluid leak at seal", 0.41).into_record();
        assert!(!record.contains_key("id"));
        assert_eq!(record["type"], "FailureMode");
        assert_eq!(record["content"], "fluid leak at seal");
        assert_relative_eq!(record["score"].as_f64().unwrap(), 0.41, epsilon = 1e-6);
    }

    #[test]
    fn test_restricted_search() {
        let set: WorkingSet = vec!["A".to_string(), "B".to_string()].into_iter().collect();
        let search = VectorSearch::new("leak", vec![1.0, 0.0])
            .with_top_k(Some(5))
            .restricted_to(&set);
        assert_eq!(search.top_k, Some(5));
        assert_eq!(search.threshold, None);
        assert_eq!(search.filter_ids, Some(vec!["A".to_string(), "B".to_string()]));
    }
}
