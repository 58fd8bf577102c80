//! Configuration for query rewriting and plan execution.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{HybridKgError, Result};

/// Tunables of the extended query rewriter.
///
/// Both thresholds are tuned empirically per embedding model and full-text
/// index, so they are configuration rather than constants.
///
/// # Examples
///
/// ```rust
/// use hybridkg_core::config::RewriterConfig;
///
/// let config = RewriterConfig::default()
///     .with_semantic_threshold(0.7)
///     .with_fulltext_index("fmea_text");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RewriterConfig {
    /// Minimum full-text score for a fuzzy match.
    pub fuzzy_threshold: f32,

    /// Minimum cosine similarity for a semantic match.
    pub semantic_threshold: f32,

    /// Name of the full-text index queried by fuzzy matches.
    pub fulltext_index: String,

    /// Suffix appended to every token of a fuzzy phrase.
    pub fuzzy_suffix: String,

    /// Native similarity function used for semantic matches.
    pub similarity_function: String,

    /// Node property holding the stored embedding.
    pub embedding_property: String,
}

impl Default for RewriterConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.5,
            semantic_threshold: 0.6418,
            fulltext_index: "entity_text_index".to_string(),
            fuzzy_suffix: "~".to_string(),
            similarity_function: "vector.similarity.cosine".to_string(),
            embedding_property: "embedding".to_string(),
        }
    }
}

impl RewriterConfig {
    /// Set the fuzzy match score threshold.
    #[must_use]
    pub fn with_fuzzy_threshold(mut self, threshold: f32) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    /// Set the semantic match similarity threshold.
    #[must_use]
    pub fn with_semantic_threshold(mut self, threshold: f32) -> Self {
        self.semantic_threshold = threshold;
        self
    }

    /// Set the full-text index name.
    #[must_use]
    pub fn with_fulltext_index<S: Into<String>>(mut self, index: S) -> Self {
        self.fulltext_index = index.into();
        self
    }

    /// Set the native similarity function.
    #[must_use]
    pub fn with_similarity_function<S: Into<String>>(mut self, function: S) -> Self {
        self.similarity_function = function.into();
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(-1.0..=1.0).contains(&self.semantic_threshold) {
            return Err(HybridKgError::configuration(
                "Semantic threshold must be between -1.0 and 1.0",
            ));
        }
        if self.fuzzy_threshold < 0.0 {
            return Err(HybridKgError::configuration(
                "Fuzzy threshold cannot be negative",
            ));
        }
        if self.fulltext_index.trim().is_empty() {
            return Err(HybridKgError::configuration(
                "Full-text index name cannot be empty",
            ));
        }
        if self.similarity_function.trim().is_empty() || self.embedding_property.trim().is_empty()
        {
            return Err(HybridKgError::configuration(
                "Similarity function and embedding property cannot be empty",
            ));
        }
        Ok(())
    }
}

/// Tunables of the plan executor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Number of matches requested from the vector store.
    pub vector_top_k: Option<usize>,

    /// Similarity threshold applied by the vector store.
    pub vector_threshold: Option<f32>,

    /// Column holding node identifiers in non-final structured steps.
    pub id_field: String,

    /// Field name the store uses for node identifiers inside node maps.
    pub node_id_property: String,

    /// Fields removed from node maps in final records.
    pub internal_id_fields: Vec<String>,

    /// Timeout applied to each collaborator call; `None` waits forever.
    pub call_timeout_seconds: Option<u64>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            vector_top_k: Some(25),
            vector_threshold: None,
            id_field: "id".to_string(),
            node_id_property: "external_id".to_string(),
            internal_id_fields: vec!["external_id".to_string(), "embedding".to_string()],
            call_timeout_seconds: None,
        }
    }
}

impl ExecutorConfig {
    /// Set the vector search top-k.
    #[must_use]
    pub fn with_vector_top_k(mut self, top_k: Option<usize>) -> Self {
        self.vector_top_k = top_k;
        self
    }

    /// Set the vector search threshold.
    #[must_use]
    pub fn with_vector_threshold(mut self, threshold: Option<f32>) -> Self {
        self.vector_threshold = threshold;
        self
    }

    /// Set the per-call timeout.
    #[must_use]
    pub fn with_call_timeout(mut self, seconds: u64) -> Self {
        self.call_timeout_seconds = Some(seconds);
        self
    }

    /// Per-call timeout as a duration.
    #[must_use]
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_seconds.map(Duration::from_secs)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.vector_top_k == Some(0) {
            return Err(HybridKgError::configuration(
                "Vector top-k must be greater than 0",
            ));
        }
        if self.vector_top_k.is_none() && self.vector_threshold.is_none() {
            return Err(HybridKgError::configuration(
                "Vector search needs a top-k, a threshold, or both",
            ));
        }
        if self.call_timeout_seconds == Some(0) {
            return Err(HybridKgError::configuration(
                "Timeout must be greater than 0",
            ));
        }
        if self.id_field.is_empty() || self.node_id_property.is_empty() {
            return Err(HybridKgError::configuration(
                "Id field names cannot be empty",
            ));
        }
        Ok(())
    }
}
