//! Top-level field filtering for JSON payloads.
//!
//! An absent or empty allow-list leaves the payload untouched. Anything that
//! is not a JSON object passes through as-is. Kept values are never rewritten.

use serde_json::Value;

/// An absent or empty allow-list restricts nothing.
pub fn is_unrestricted(allowed: Option<&[String]>) -> bool {
    allowed.is_none_or(|fields| fields.is_empty())
}

/// Remove every top-level key of `target` that is not in `allowed`.
pub fn filter_fields(target: &mut Value, allowed: Option<&[String]>) {
    if is_unrestricted(allowed) {
        return;
    }
    let allowed = allowed.unwrap_or_default();

    if let Value::Object(map) = target {
        map.retain(|key, _| allowed.iter().any(|field| field == key));
    }
}

/// Pure form of [`filter_fields`].
pub fn filtered(target: &Value, allowed: Option<&[String]>) -> Value {
    let mut out = target.clone();
    filter_fields(&mut out, allowed);
    out
}

/// Filter an ordered list of key/value pairs (path parameters, query pairs).
///
/// Repeated keys and ordering are preserved.
pub fn filter_pairs<K, V>(pairs: Vec<(K, V)>, allowed: Option<&[String]>) -> Vec<(K, V)>
where
    K: AsRef<str>,
{
    if is_unrestricted(allowed) {
        return pairs;
    }
    let allowed = allowed.unwrap_or_default();

    pairs
        .into_iter()
        .filter(|(key, _)| allowed.iter().any(|field| field == key.as_ref()))
        .collect()
}
