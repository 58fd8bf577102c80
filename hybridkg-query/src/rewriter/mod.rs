//! Extended query rewriting.
//!
//! Structured steps may use two pseudo-functions the graph store does not
//! know:
//!
//! - `FUZZY_MATCH(target, 'phrase')` becomes a full-text index subquery
//!   collecting matches into `fuzzy_list_<n>`, and the predicate becomes
//!   `target IN fuzzy_list_<n>`.
//! - `SEMANTIC_MATCH(target, 'phrase')` becomes a similarity projection
//!   `WITH *, sim(entity.embedding, $vector_<n>) AS similarity_<n>` before the
//!   enclosing WHERE, and the predicate becomes `similarity_<n> > threshold`.
//!
//! `IS_FUZZY_MATCH` and `IS_SEMANTIC_MATCH` are accepted as synonyms.
//! Phrase embeddings are bound as query parameters, never inlined.
//!
//! The text transformation is pure ([`expand_extended_predicates`]); only
//! [`ExtendedQueryRewriter`] talks to the embedding model.

pub(crate) mod clauses;
mod fuzzy;
pub(crate) mod literals;
mod predicate;
mod semantic;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use hybridkg_core::config::RewriterConfig;
use hybridkg_core::traits::Embedder;
use hybridkg_core::{HybridKgError, QueryParams, Result};

pub use semantic::PendingVector;

/// Query text ready for the graph store plus its bound parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RewrittenQuery {
    /// Native query text.
    pub text: String,
    /// Parameters referenced by the text; empty when nothing was expanded.
    pub params: QueryParams,
}

impl RewrittenQuery {
    /// A query that needed no rewriting.
    pub fn unchanged<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            params: QueryParams::new(),
        }
    }

    /// Split into text and parameters.
    pub fn into_parts(self) -> (String, QueryParams) {
        (self.text, self.params)
    }
}

/// Result of the pure text stage of rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedQuery {
    /// Native query text.
    pub text: String,
    /// Embeddings still to be computed and bound, in parameter order.
    pub pending_vectors: Vec<PendingVector>,
}

/// Expand extended predicates without computing any embeddings.
///
/// Text without extended predicates is returned byte-identical.
///
/// # Examples
///
/// ```rust
/// use hybridkg_core::config::RewriterConfig;
/// use hybridkg_query::rewriter::expand_extended_predicates;
///
/// let expanded = expand_extended_predicates(
///     "MATCH (fm:FailureMode) WHERE SEMANTIC_MATCH(fm.description, 'corrosion') RETURN fm.rpn",
///     &RewriterConfig::default(),
/// ).unwrap();
/// assert!(expanded.text.contains("WHERE similarity_1 > 0.6418"));
/// assert_eq!(expanded.pending_vectors[0].param, "vector_1");
/// ```
pub fn expand_extended_predicates(query: &str, config: &RewriterConfig) -> Result<ExpandedQuery> {
    let escaped = literals::escape_parens_in_literals(query);
    if predicate::find_all_predicates(&escaped)?.is_empty() {
        return Ok(ExpandedQuery {
            text: query.to_string(),
            pending_vectors: Vec::new(),
        });
    }

    let with_fuzzy = fuzzy::expand_fuzzy(&escaped, config)?;
    let (with_semantic, pending_vectors) = semantic::expand_semantic(&with_fuzzy, config)?;

    Ok(ExpandedQuery {
        text: literals::unescape_parens(&with_semantic),
        pending_vectors,
    })
}

/// Turns extended query text into native query text and parameters.
#[async_trait]
pub trait QueryRewriter: Send + Sync + std::fmt::Debug {
    /// Rewrite `query`.
    async fn rewrite(&self, query: &str) -> Result<RewrittenQuery>;
}

/// The rewriter for `FUZZY_MATCH` and `SEMANTIC_MATCH`.
///
/// # Examples
///
/// ```rust,no_run
/// use hybridkg_core::traits::Embedder;
/// use hybridkg_query::rewriter::{ExtendedQueryRewriter, QueryRewriter};
/// use std::sync::Arc;
///
/// # async fn example(embedder: Arc<dyn Embedder>) -> hybridkg_core::Result<()> {
/// let rewriter = ExtendedQueryRewriter::new(embedder);
/// let rewritten = rewriter
///     .rewrite("MATCH (c:Component) WHERE FUZZY_MATCH(c.name, 'cabin controls') RETURN c.name")
///     .await?;
/// assert!(rewritten.text.contains("c.name IN fuzzy_list_1"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ExtendedQueryRewriter {
    embedder: Arc<dyn Embedder>,
    config: RewriterConfig,
}

impl ExtendedQueryRewriter {
    /// Create a rewriter with default thresholds.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            config: RewriterConfig::default(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: RewriterConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &RewriterConfig {
        &self.config
    }
}

#[async_trait]
impl QueryRewriter for ExtendedQueryRewriter {
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    async fn rewrite(&self, query: &str) -> Result<RewrittenQuery> {
        let expanded = expand_extended_predicates(query, &self.config)?;
        if expanded.text == query {
            return Ok(RewrittenQuery::unchanged(expanded.text));
        }

        let mut params = QueryParams::new();
        if !expanded.pending_vectors.is_empty() {
            let phrases: Vec<&str> = expanded
                .pending_vectors
                .iter()
                .map(|pending| pending.phrase.as_str())
                .collect();
            debug!("Embedding {} semantic match phrases: {:?}", phrases.len(), phrases);
            let embeddings = self.embedder.embed_batch(phrases).await?;
            if embeddings.len() != expanded.pending_vectors.len() {
                return Err(HybridKgError::embedding(format!(
                    "expected {} embeddings, got {}",
                    expanded.pending_vectors.len(),
                    embeddings.len()
                )));
            }
            for (pending, embedding) in expanded.pending_vectors.into_iter().zip(embeddings) {
                params.insert(pending.param, Value::from(embedding));
            }
        }

        info!("Converted query to: {}", expanded.text);
        Ok(RewrittenQuery {
            text: expanded.text,
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct RecordingEmbedder {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Embedder for RecordingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(text.to_string());
            let call_number = calls.len() as f32;
            Ok(vec![call_number, 0.0])
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    #[test]
    fn test_plain_query_round_trips_byte_identical() {
        let query = "MATCH (c:Component) WHERE c.name = 'Valve (main)' AND c.note = \"a)b(\" RETURN c.name";
        let expanded = expand_extended_predicates(query, &RewriterConfig::default()).unwrap();
        assert_eq!(expanded.text, query);
        assert!(expanded.pending_vectors.is_empty());
    }

    #[test]
    fn test_literal_parens_survive_expansion() {
        let query = "MATCH (c:Component) WHERE FUZZY_MATCH(c.name, 'valve (main)') AND c.kind = 'a(b)' RETURN c.name";
        let expanded = expand_extended_predicates(query, &RewriterConfig::default()).unwrap();
        assert!(expanded.text.contains(r"'valve~ \\(main\\)~'"));
        assert!(expanded.text.contains("c.kind = 'a(b)'"));
        assert!(!expanded.text.contains('\u{E000}'));
    }

    #[tokio::test]
    async fn test_rewrite_binds_vectors_in_order() {
        let embedder = Arc::new(RecordingEmbedder::default());
        let rewriter = ExtendedQueryRewriter::new(embedder.clone());

        let rewritten = rewriter
            .rewrite(
                "MATCH (fm:FailureMode)-[:CAUSED_BY]->(fc:FailureCause) \
                 WHERE IS_SEMANTIC_MATCH(fm.description, 'corrosion') \
                 AND SEMANTIC_MATCH(fc.description, 'salt water') \
                 AND FUZZY_MATCH(fm.name, 'pump') RETURN fm.name",
            )
            .await
            .unwrap();

        assert_eq!(
            *embedder.calls.lock().unwrap(),
            vec!["corrosion".to_string(), "salt water".to_string()]
        );
        assert_eq!(rewritten.params.len(), 2);
        assert_eq!(rewritten.params["vector_1"], serde_json::json!([1.0, 0.0]));
        assert_eq!(rewritten.params["vector_2"], serde_json::json!([2.0, 0.0]));
        assert!(rewritten.text.contains("fm.name IN fuzzy_list_1"));
        assert!(rewritten.text.contains("similarity_1 > 0.6418 AND similarity_2 > 0.6418"));
    }

    /// Embedder that only answers batches, counting them.
    #[derive(Debug, Default)]
    struct BatchOnlyEmbedder {
        batches: Mutex<Vec<Vec<String>>>,
        drop_last: bool,
    }

    #[async_trait]
    impl Embedder for BatchOnlyEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(HybridKgError::embedding("single embeds are not expected"))
        }

        async fn embed_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
            self.batches
                .lock()
                .unwrap()
                .push(texts.iter().map(|text| text.to_string()).collect());
            let mut embeddings: Vec<Vec<f32>> = texts.iter().map(|_| vec![0.0, 1.0]).collect();
            if self.drop_last {
                embeddings.pop();
            }
            Ok(embeddings)
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "batch-only"
        }
    }

    const TWO_PHRASES: &str = "MATCH (fm:FailureMode)-[:CAUSED_BY]->(fc:FailureCause) \
                               WHERE SEMANTIC_MATCH(fm.description, 'corrosion') \
                               AND SEMANTIC_MATCH(fc.description, 'salt water') RETURN fm.name";

    #[tokio::test]
    async fn test_rewrite_embeds_all_phrases_in_one_batch() {
        let embedder = Arc::new(BatchOnlyEmbedder::default());
        let rewriter = ExtendedQueryRewriter::new(embedder.clone());

        let rewritten = rewriter.rewrite(TWO_PHRASES).await.unwrap();

        assert_eq!(
            *embedder.batches.lock().unwrap(),
            vec![vec!["corrosion".to_string(), "salt water".to_string()]]
        );
        assert_eq!(rewritten.params["vector_2"], serde_json::json!([0.0, 1.0]));
    }

    #[tokio::test]
    async fn test_short_embedding_batch_is_an_error() {
        let embedder = Arc::new(BatchOnlyEmbedder {
            drop_last: true,
            ..Default::default()
        });
        let err = ExtendedQueryRewriter::new(embedder)
            .rewrite(TWO_PHRASES)
            .await
            .unwrap_err();
        assert!(matches!(err, HybridKgError::Embedding { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_rewrite_without_predicates_skips_embedder() {
        let embedder = Arc::new(RecordingEmbedder::default());
        let rewriter = ExtendedQueryRewriter::new(embedder.clone());

        let rewritten = rewriter.rewrite("MATCH (n) RETURN n.id AS id").await.unwrap();
        assert_eq!(rewritten, RewrittenQuery::unchanged("MATCH (n) RETURN n.id AS id"));
        assert!(embedder.calls.lock().unwrap().is_empty());
    }
}
