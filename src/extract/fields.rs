//! Field probing for JSON child lists
//!
//! Stateless endpoints that answer with JSON do not agree on field names: a
//! village id may be `villId`, `villageId` or `id`. Each conceptual attribute is
//! described by an ordered list of candidate names and the first present,
//! non-placeholder value wins.

use crate::extract::SentinelFilter;
use crate::hierarchy::Node;
use serde_json::{Map, Value};

/// Picks the first usable value among candidate field names
///
/// Strings are trimmed; numbers are rendered as-is. Missing fields, nulls,
/// empty strings and placeholder values are skipped.
pub fn pick(
    record: &Map<String, Value>,
    candidates: &[String],
    sentinels: &SentinelFilter,
) -> Option<String> {
    candidates
        .iter()
        .filter_map(|name| scalar(record, name))
        .find(|value| !sentinels.is_placeholder(value))
}

/// First non-empty scalar among candidate field names, placeholders included
fn first_present(record: &Map<String, Value>, candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|name| scalar(record, name))
        .find(|value| !value.is_empty())
}

fn scalar(record: &Map<String, Value>, name: &str) -> Option<String> {
    match record.get(name)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Extracts child nodes from a JSON payload
///
/// Accepts a top-level array of records, or an object wrapping such an array under
/// any key. Records without a usable id are skipped, as are records whose code or
/// label is a placeholder.
///
/// # Returns
///
/// * `Some(nodes)` - The payload was JSON of a recognized shape
/// * `None` - The payload is not JSON or has no record list
pub fn extract_json_nodes(
    payload: &str,
    id_fields: &[String],
    label_fields: &[String],
    sentinels: &SentinelFilter,
) -> Option<Vec<Node>> {
    let value: Value = serde_json::from_str(payload.trim()).ok()?;

    let records = match value {
        Value::Array(items) => items,
        Value::Object(map) => map.into_iter().find_map(|(_, v)| match v {
            Value::Array(items) => Some(items),
            _ => None,
        })?,
        _ => return None,
    };

    let nodes = records
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|record| {
            let code = pick(record, id_fields, sentinels)?;
            let label = first_present(record, label_fields).unwrap_or_default();
            if sentinels.rejects(&code, &label) {
                return None;
            }
            Some(Node::new(code, label))
        })
        .collect();

    Some(nodes)
}
