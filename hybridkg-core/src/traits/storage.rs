//! Vector storage traits.

use async_trait::async_trait;

use crate::{Result, VectorMatch, VectorSearch};

/// Searches stored entity embeddings by similarity.
///
/// # Examples
///
/// ```rust,no_run
/// use hybridkg_core::traits::VectorStore;
/// use hybridkg_core::{Result, VectorMatch, VectorSearch};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct EmptyStore;
///
/// #[async_trait]
/// impl VectorStore for EmptyStore {
///     async fn search(&self, _search: &VectorSearch) -> Result<Vec<VectorMatch>> {
///         Ok(vec![])
///     }
/// }
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync + std::fmt::Debug {
    /// Search for the entities most similar to `search.embedding`.
    ///
    /// Results are sorted by score, highest first, and honour `top_k`,
    /// `threshold` and `filter_ids` when set.
    async fn search(&self, search: &VectorSearch) -> Result<Vec<VectorMatch>>;

    /// Get the total number of stored entities.
    async fn count(&self) -> Result<usize> {
        Ok(0)
    }

    /// Clear all entities from the store.
    async fn clear(&self) -> Result<()> {
        Ok(())
    }
}
