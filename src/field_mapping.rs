//! Key-case conversion between the service's camelCase argument/field names
//! and the snake_case names used by the typed records.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::types::Payload;

// Boundary before a capitalised word that follows any character
static WORD_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("valid word boundary pattern"));
// Boundary before a capital that follows a lowercase letter or digit
static CASE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid case boundary pattern"));

/// `likeCount` -> `like_count`, `getAUser` -> `get_a_user`
pub fn camel_to_snake(name: &str) -> String {
    let words = WORD_BOUNDARY.replace_all(name, "${1}_${2}");
    CASE_BOUNDARY
        .replace_all(&words, "${1}_${2}")
        .to_lowercase()
}

/// `like_count` -> `likeCount`
///
/// The first segment is kept as-is; every later segment gets an upper-case
/// first letter and a lower-cased remainder.
pub fn snake_to_camel(name: &str) -> String {
    let mut parts = name.split('_');
    let mut out = parts.next().unwrap_or_default().to_string();
    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }
    out
}

/// Convert a caller-supplied field list to the service's naming
pub fn map_fields_to_camel<S: AsRef<str>>(fields: &[S]) -> Vec<String> {
    fields.iter().map(|f| snake_to_camel(f.as_ref())).collect()
}

/// Rename the top-level keys of a record to snake_case, keeping order
pub fn map_keys_to_snake(data: &Payload) -> Payload {
    data.iter()
        .map(|(k, v)| (camel_to_snake(k), v.clone()))
        .collect()
}

/// Same as [`map_keys_to_snake`] for a record held in a [`Value`]; non-objects pass through
pub fn map_value_keys_to_snake(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(map_keys_to_snake(map)),
        other => other.clone(),
    }
}
