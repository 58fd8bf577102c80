//! The pool of node identifiers a plan execution is narrowed to.

use std::collections::BTreeSet;

use serde_json::Value;

use super::{Record, VectorMatch, value_text};

/// Node identifiers matched so far within one plan execution.
///
/// A working set is created empty (unrestricted) at the start of every
/// execution and replaced wholesale after each non-final step. It is a plain
/// value threaded through the execution loop, never state shared between
/// executions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingSet {
    ids: BTreeSet<String>,
}

impl WorkingSet {
    /// Create an empty working set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a working set from the id column of structured query results.
    ///
    /// Records without the column, or with a null value in it, contribute
    /// nothing. Non-string ids are kept in their JSON text form.
    #[must_use]
    pub fn from_records(records: &[Record], id_field: &str) -> Self {
        records
            .iter()
            .filter_map(|record| record.get(id_field))
            .filter(|value| !value.is_null())
            .map(value_text)
            .collect()
    }

    /// Build a working set from vector search matches.
    #[must_use]
    pub fn from_matches(matches: &[VectorMatch]) -> Self {
        matches.iter().map(|m| m.id.clone()).collect()
    }

    /// Whether no ids are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of ids held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the id is part of the set.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Iterate over ids in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Ids as an owned list, sorted.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }

    /// Ids as a JSON array suitable for binding as a query parameter.
    #[must_use]
    pub fn to_param(&self) -> Value {
        Value::Array(self.ids.iter().cloned().map(Value::String).collect())
    }
}

impl FromIterator<String> for WorkingSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
