//! In-memory vector store implementation.
//!
//! Keeps every entity embedding in memory and scores searches by cosine
//! similarity. Suitable for tests, demos and small graphs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use hybridkg_core::traits::{Embedder, VectorStore};
use hybridkg_core::{HybridKgError, Result, VectorMatch, VectorSearch};

#[derive(Debug, Clone)]
struct StoredEntity {
    node_type: String,
    content: String,
    embedding: Vec<f32>,
}

/// In-memory vector store implementation.
///
/// Entities are keyed by node id; adding an id twice replaces the entry.
///
/// # Examples
///
/// ```rust
/// use hybridkg_integrations::InMemoryVectorStore;
/// use hybridkg_core::traits::VectorStore;
/// use hybridkg_core::VectorSearch;
///
/// # async fn example() -> hybridkg_core::Result<()> {
/// let store = InMemoryVectorStore::new(2);
/// store.add("A", "FailureMode", "seal leak", vec![1.0, 0.0]).await?;
/// store.add("B", "FailureMode", "bearing wear", vec![0.0, 1.0]).await?;
///
/// let matches = store
///     .search(&VectorSearch::new("leak", vec![1.0, 0.1]).with_top_k(Some(1)))
///     .await?;
/// assert_eq!(matches[0].id, "A");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryVectorStore {
    dimension: usize,
    entities: Arc<RwLock<HashMap<String, StoredEntity>>>,
}

impl InMemoryVectorStore {
    /// Create a store for vectors of `dimension` components.
    pub fn new(dimension: usize) -> Self {
        info!("Creating InMemoryVectorStore with dimension {}", dimension);
        Self {
            dimension,
            entities: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get the vector dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn validate_vector(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(HybridKgError::validation(format!(
                "Vector dimension {} does not match store dimension {}",
                vector.len(),
                self.dimension
            )));
        }
        Ok(())
    }

    /// Store an entity with a precomputed embedding.
    pub async fn add<I, T, C>(&self, id: I, node_type: T, content: C, embedding: Vec<f32>) -> Result<()>
    where
        I: Into<String>,
        T: Into<String>,
        C: Into<String>,
    {
        self.validate_vector(&embedding)?;
        let id = id.into();
        debug!("Adding entity {} to InMemoryVectorStore", id);
        self.entities.write().await.insert(
            id,
            StoredEntity {
                node_type: node_type.into(),
                content: content.into(),
                embedding,
            },
        );
        Ok(())
    }

    /// Embed `content` and store the entity.
    pub async fn add_embedded<I, T, C>(
        &self,
        embedder: &dyn Embedder,
        id: I,
        node_type: T,
        content: C,
    ) -> Result<()>
    where
        I: Into<String>,
        T: Into<String>,
        C: Into<String>,
    {
        let content = content.into();
        let embedding = embedder.embed(&content).await?;
        self.add(id, node_type, content, embedding).await
    }

    /// Remove entities by id; unknown ids are ignored.
    pub async fn delete(&self, ids: &[String]) {
        let mut entities = self.entities.write().await;
        for id in ids {
            entities.remove(id);
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn search(&self, search: &VectorSearch) -> Result<Vec<VectorMatch>> {
        debug!(
            "Searching InMemoryVectorStore with query: '{}', top_k: {:?}, threshold: {:?}",
            search.text, search.top_k, search.threshold
        );
        self.validate_vector(&search.embedding)?;

        let entities = self.entities.read().await;
        let candidates: Vec<(&String, &StoredEntity)> = match &search.filter_ids {
            Some(ids) => ids.iter().filter_map(|id| entities.get_key_value(id)).collect(),
            None => entities.iter().collect(),
        };

        let mut matches: Vec<VectorMatch> = candidates
            .into_iter()
            .filter_map(|(id, entity)| {
                let score = cosine_similarity(&search.embedding, &entity.embedding);
                if search.threshold.is_some_and(|threshold| score < threshold) {
                    return None;
                }
                Some(VectorMatch::new(
                    id.clone(),
                    entity.node_type.clone(),
                    entity.content.clone(),
                    score,
                ))
            })
            .collect();

        // Highest score first, id breaks ties so results are deterministic.
        matches.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        if let Some(top_k) = search.top_k {
            matches.truncate(top_k);
        }

        info!(
            "Search completed, returning {} results out of {} total entities",
            matches.len(),
            entities.len()
        );
        Ok(matches)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entities.read().await.len())
    }

    async fn clear(&self) -> Result<()> {
        debug!("Clearing all entities from InMemoryVectorStore");
        self.entities.write().await.clear();
        Ok(())
    }
}

/// Calculate cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    async fn fmea_store() -> InMemoryVectorStore {
        let store = InMemoryVectorStore::new(2);
        store.add("A", "FailureMode", "seal leak", vec![1.0, 0.0]).await.unwrap();
        store.add("B", "FailureMode", "fluid leak", vec![0.8, 0.6]).await.unwrap();
        store.add("C", "FailureCause", "bearing wear", vec![0.0, 1.0]).await.unwrap();
        store
    }

    fn ids(matches: &[VectorMatch]) -> Vec<&str> {
        matches.iter().map(|m| m.id.as_str()).collect()
    }

    #[test_case(Some(2), None, vec!["A", "B"] ; "top k")]
    #[test_case(None, Some(0.5), vec!["A", "B"] ; "threshold only")]
    #[test_case(Some(1), Some(0.5), vec!["A"] ; "both")]
    #[test_case(None, None, vec!["A", "B", "C"] ; "unbounded")]
    #[tokio::test]
    async fn test_search_limits(top_k: Option<usize>, threshold: Option<f32>, expected: Vec<&str>) {
        let store = fmea_store().await;
        let search = VectorSearch::new("leak", vec![1.0, 0.0])
            .with_top_k(top_k)
            .with_threshold(threshold);
        let matches = store.search(&search).await.unwrap();
        assert_eq!(ids(&matches), expected);
    }

    #[tokio::test]
    async fn test_search_respects_filter_ids() {
        let store = fmea_store().await;
        let search = VectorSearch {
            filter_ids: Some(vec!["B".to_string(), "C".to_string(), "Z".to_string()]),
            ..VectorSearch::new("leak", vec![1.0, 0.0])
        };

        let matches = store.search(&search).await.unwrap();
        assert_eq!(ids(&matches), vec!["B", "C"]);
        assert_relative_eq!(matches[0].score, 0.8, epsilon = 1e-6);
        assert_eq!(matches[0].content, "fluid leak");
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let store = InMemoryVectorStore::new(3);
        assert!(store.add("A", "T", "x", vec![1.0]).await.is_err());
        let search = VectorSearch::new("x", vec![1.0, 0.0]);
        assert!(matches!(
            store.search(&search).await,
            Err(HybridKgError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_count_delete_and_clear() {
        let store = fmea_store().await;
        assert_eq!(store.count().await.unwrap(), 3);
        store.delete(&["A".to_string()]).await;
        assert_eq!(store.count().await.unwrap(), 2);
        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[test]
    fn test_cosine_similarity() {
        assert_relative_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_relative_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_relative_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
