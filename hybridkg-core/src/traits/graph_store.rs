//! Structured graph store trait.

use async_trait::async_trait;

use crate::{QueryParams, Record, Result};

/// Executes native graph queries.
///
/// Implementations wrap a graph database connection (for example a Cypher
/// endpoint). The text handed to `query` has already been through the
/// extended query rewriter, so it contains only native constructs; vectors
/// and id lists arrive in `params`, never inlined as literals.
#[async_trait]
pub trait GraphStore: Send + Sync + std::fmt::Debug {
    /// Run a query with bound parameters and return its rows.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed query text or connector faults.
    async fn query(&self, query: &str, params: &QueryParams) -> Result<Vec<Record>>;

    /// Remove all data from the store.
    async fn clear(&self) -> Result<()>;
}
