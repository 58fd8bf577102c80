//! Retry and timeout wrappers for collaborator calls.
//!
//! Graph stores, vector stores and model endpoints are remote services that
//! rate-limit and stall. [`Resilient`] decorates any collaborator with a
//! retry policy and an optional per-call timeout, so the executor and the
//! evaluators stay free of retry loops.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::RetryConfig;
use crate::traits::{ChatModel, Embedder, GraphStore, QueryRunner, VectorStore};
use crate::{HybridKgError, QueryParams, Record, Result, VectorMatch, VectorSearch};

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// exhausts `policy.max_retries`.
pub async fn retry_with_policy<T, F, Fut>(
    policy: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retry = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retryable() && retry < policy.max_retries => {
                let delay = policy.delay_for(retry);
                warn!(
                    "{} failed on attempt {}, retrying in {:?}: {}",
                    operation_name,
                    retry + 1,
                    delay,
                    error
                );
                tokio::time::sleep(delay).await;
                retry += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

/// Await `future`, failing with [`HybridKgError::Timeout`] after `timeout`.
///
/// `None` waits indefinitely.
pub async fn with_timeout<T, Fut>(
    timeout: Option<Duration>,
    operation_name: &str,
    future: Fut,
) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| HybridKgError::timeout(format!("{operation_name} after {limit:?}")))?,
        None => future.await,
    }
}

/// A collaborator wrapped with retry and timeout behaviour.
///
/// # Examples
///
/// ```rust,no_run
/// use hybridkg_core::config::RetryConfig;
/// use hybridkg_core::resilience::Resilient;
/// use hybridkg_core::traits::GraphStore;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// fn wrap(store: Arc<dyn GraphStore>) -> Arc<dyn GraphStore> {
///     Arc::new(
///         Resilient::new(store)
///             .with_retry(RetryConfig::default())
///             .with_timeout(Duration::from_secs(30)),
///     )
/// }
/// ```
#[derive(Debug)]
pub struct Resilient<T: ?Sized> {
    inner: Arc<T>,
    retry: RetryConfig,
    timeout: Option<Duration>,
}

impl<T: ?Sized> Resilient<T> {
    /// Wrap `inner` with the default retry policy and no timeout.
    pub fn new(inner: Arc<T>) -> Self {
        Self {
            inner,
            retry: RetryConfig::default(),
            timeout: None,
        }
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Get the wrapped collaborator.
    pub fn inner(&self) -> &Arc<T> {
        &self.inner
    }
}

#[async_trait]
impl<T: Embedder + ?Sized> Embedder for Resilient<T> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        retry_with_policy(&self.retry, "embed", || {
            with_timeout(self.timeout, "embed", self.inner.embed(text))
        })
        .await
    }

    async fn embed_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        retry_with_policy(&self.retry, "embed_batch", || {
            with_timeout(
                self.timeout,
                "embed_batch",
                self.inner.embed_batch(texts.clone()),
            )
        })
        .await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[async_trait]
impl<T: GraphStore + ?Sized> GraphStore for Resilient<T> {
    async fn query(&self, query: &str, params: &QueryParams) -> Result<Vec<Record>> {
        retry_with_policy(&self.retry, "graph query", || {
            with_timeout(self.timeout, "graph query", self.inner.query(query, params))
        })
        .await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }
}

#[async_trait]
impl<T: VectorStore + ?Sized> VectorStore for Resilient<T> {
    async fn search(&self, search: &VectorSearch) -> Result<Vec<VectorMatch>> {
        retry_with_policy(&self.retry, "vector search", || {
            with_timeout(self.timeout, "vector search", self.inner.search(search))
        })
        .await
    }

    async fn count(&self) -> Result<usize> {
        self.inner.count().await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }
}

#[async_trait]
impl<T: ChatModel + ?Sized> ChatModel for Resilient<T> {
    async fn chat(&self, prompt: &str, schema: Option<&serde_json::Value>) -> Result<String> {
        retry_with_policy(&self.retry, "chat", || {
            with_timeout(self.timeout, "chat", self.inner.chat(prompt, schema))
        })
        .await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[async_trait]
impl<T: QueryRunner + ?Sized> QueryRunner for Resilient<T> {
    async fn run(&self, query: &str) -> Result<Vec<Record>> {
        retry_with_policy(&self.retry, "query run", || {
            with_timeout(self.timeout, "query run", self.inner.run(query))
        })
        .await
    }
}
