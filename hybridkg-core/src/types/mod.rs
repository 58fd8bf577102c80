//! Core data types.
//!
//! Plans and working sets live for one retrieval call only; records and
//! vector matches are what the storage collaborators hand back.

pub mod plan;
pub mod record;
pub mod vector;
pub mod working_set;

pub use plan::{Plan, Step};
pub use record::{QueryParams, Record, strip_internal_fields, value_text};
pub use vector::{VectorMatch, VectorSearch};
pub use working_set::WorkingSet;
