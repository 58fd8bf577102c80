//! # hybridkg
//!
//! Retrieval over a knowledge graph that mixes graph queries with vector
//! similarity, plus the tooling to score retrieval strategies.
//!
//! ## Quick Start
//!
//! ```rust
//! use hybridkg::prelude::*;
//!
//! let query = "MATCH (c:Component) WHERE FUZZY_MATCH(c.name, 'pump') RETURN c.name";
//! let expanded = expand_extended_predicates(query, &RewriterConfig::default()).unwrap();
//! assert!(expanded.text.contains("c.name IN fuzzy_list_1"));
//! ```
//!
//! ## Architecture
//!
//! The framework is organized into several crates:
//!
//! - **hybridkg-core**: plans, records, collaborator traits, configuration
//! - **hybridkg-query**: query rewriting, plan execution, planning and answers
//! - **hybridkg-eval**: result and nugget evaluation
//! - **hybridkg-integrations**: vector stores and model clients

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export all public APIs from sub-crates
pub use hybridkg_core as core;
pub use hybridkg_eval as eval;
pub use hybridkg_integrations as integrations;
pub use hybridkg_query as query;

use tracing_subscriber::EnvFilter;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use hybridkg_query::prelude::*;

    pub use hybridkg_eval::{NuggetEvaluator, PlanOutputEvaluator};
    pub use hybridkg_integrations::InMemoryVectorStore;
}

/// Install a formatted log subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Calling this more
/// than once keeps the first subscriber.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Version information for the hybridkg framework.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
