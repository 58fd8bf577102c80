//! Records returned by the graph store.

use serde_json::Value;

/// An ordered mapping from field name to value, as returned by one store call.
///
/// Field order follows the query's projection order.
pub type Record = serde_json::Map<String, Value>;

/// Named parameters bound to a query out of band.
pub type QueryParams = serde_json::Map<String, Value>;

/// Remove internal fields from node maps nested inside records.
///
/// Top-level fields are left alone: anything the query projected explicitly
/// was asked for. Only maps nested below the top level (whole nodes returned
/// by the store) lose the named fields, at any depth.
pub fn strip_internal_fields(records: &mut [Record], fields: &[String]) {
    for record in records.iter_mut() {
        for value in record.values_mut() {
            strip_value(value, fields);
        }
    }
}

fn strip_value(value: &mut Value, fields: &[String]) {
    match value {
        Value::Object(map) => {
            for field in fields {
                map.remove(field);
            }
            for nested in map.values_mut() {
                strip_value(nested, fields);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_value(item, fields);
            }
        }
        _ => {}
    }
}

/// Render a value the way it is compared and displayed in reports.
///
/// Strings are used verbatim, everything else uses its JSON text.
#[must_use]
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
