//! Embedding generation traits.
//!
//! Embeddings are computed for vector search steps and for every
//! semantic-match predicate the query rewriter expands.

use async_trait::async_trait;

use crate::Result;

/// Generates dense embeddings for text content.
///
/// # Examples
///
/// ```rust,no_run
/// use hybridkg_core::traits::Embedder;
/// use hybridkg_core::Result;
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct ConstantEmbedder {
///     dimension: usize,
/// }
///
/// #[async_trait]
/// impl Embedder for ConstantEmbedder {
///     async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
///         Ok(vec![0.1; self.dimension])
///     }
///
///     fn dimension(&self) -> usize {
///         self.dimension
///     }
///
///     fn model_name(&self) -> &str {
///         "constant"
///     }
/// }
/// ```
#[async_trait]
pub trait Embedder: Send + Sync + std::fmt::Debug {
    /// Generate embedding for a single text.
    ///
    /// The returned vector must have `dimension()` entries.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails due to model
    /// issues, network problems, or rate limiting.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    ///
    /// The default implementation embeds sequentially.
    async fn embed_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Get the dimension of embeddings produced by this embedder.
    fn dimension(&self) -> usize;

    /// Get the name/identifier of the embedding model.
    fn model_name(&self) -> &str;
}
