//! Remote document shape and field coercion
//!
//! Remote records are loosely typed JSON objects. Reading coerces whatever is
//! stored into the expected type; writing always emits every field.

use serde_json::{Map, Value};

/// A remote document: field name to JSON value
pub type Document = Map<String, Value>;

/// Read a field as text; numbers and booleans are stringified, anything else
/// (missing, null, arrays, objects) is empty
#[must_use]
pub fn text(doc: &Document, field: &str) -> String {
    match doc.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Read a field as text, treating the empty string as absent
#[must_use]
pub fn optional_text(doc: &Document, field: &str) -> Option<String> {
    Some(text(doc, field)).filter(|s| !s.is_empty())
}

/// Read a field as epoch milliseconds; numeric strings are accepted
#[must_use]
pub fn millis(doc: &Document, field: &str) -> i64 {
    match doc.get(field) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    }
}

/// Build a document from `(field, value)` pairs
#[must_use]
pub fn from_pairs<const N: usize>(pairs: [(&str, Value); N]) -> Document {
    pairs
        .into_iter()
        .map(|(field, value)| (field.to_string(), value))
        .collect()
}
