//! Configuration types for retrieval and evaluation.
//!
//! Every structure is serializable, fills missing fields with defaults and
//! exposes a `validate` method.

pub mod evaluation;
pub mod llm;
pub mod manager;
pub mod retrieval;
pub mod retry;

pub use evaluation::*;
pub use llm::*;
pub use manager::*;
pub use retrieval::*;
pub use retry::*;
