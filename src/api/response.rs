//! Proxy response normalization
//!
//! The webhook backend is reached either directly or through a CORS proxy,
//! and its field naming drifts between deployments. A login response can be
//! a bare `{token}` object, a proxy wrapper with a stringified
//! `upstreamBody`, a wrapper with an already-parsed `upstreamBody`, or a
//! `message` field holding stringified JSON. Listing responses are just as
//! loose. Everything here classifies the envelope before touching fields,
//! and degrades to `None`/empty instead of erroring.

use serde_json::{json, Value};

/// Depth cap for recursive searches. Proxy wrappers nest two or three
/// levels deep in practice; anything deeper is garbage.
const MAX_SEARCH_DEPTH: usize = 8;

/// Wrapper keys whose string values may hold stringified upstream JSON
const STRING_WRAPPER_KEYS: [&str; 3] = ["message", "upstreamBody", "data"];

/// Named fields checked for listing payloads, before any scanning
const ITEM_FIELD_CANDIDATES: [&str; 3] = ["items", "inventory", "data"];

/// The closed set of envelope shapes the proxy produces
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyEnvelope {
    /// Body already carries a top-level `token`; no proxy in the way
    DirectToken(Value),
    /// `upstreamBody` was a JSON-encoded string; payload is the parsed
    /// value, or `{"raw": <original>}` when it would not parse
    StringWrapped(Value),
    /// `upstreamBody` was already an object
    ObjectWrapped(Value),
    /// A plain object with no recognizable wrapper; passed through as-is
    Unrecognized(Value),
}

impl ProxyEnvelope {
    /// The payload this envelope resolved to
    pub fn into_payload(self) -> Value {
        match self {
            ProxyEnvelope::DirectToken(v)
            | ProxyEnvelope::StringWrapped(v)
            | ProxyEnvelope::ObjectWrapped(v)
            | ProxyEnvelope::Unrecognized(v) => v,
        }
    }
}

/// Classify a response body. `None` for null and primitive bodies, which
/// carry no payload at all.
pub fn classify(body: &Value) -> Option<ProxyEnvelope> {
    // A bare array is a payload in its own right (a listing served with no
    // proxy in the way)
    if body.is_array() {
        return Some(ProxyEnvelope::Unrecognized(body.clone()));
    }

    let obj = body.as_object()?;

    if matches!(obj.get("token"), Some(Value::String(t)) if !t.is_empty()) {
        return Some(ProxyEnvelope::DirectToken(body.clone()));
    }

    match obj.get("upstreamBody") {
        Some(Value::String(raw)) => {
            let payload = serde_json::from_str::<Value>(raw)
                .unwrap_or_else(|_| json!({ "raw": raw }));
            Some(ProxyEnvelope::StringWrapped(payload))
        }
        Some(Value::Object(inner)) => {
            Some(ProxyEnvelope::ObjectWrapped(Value::Object(inner.clone())))
        }
        _ => Some(ProxyEnvelope::Unrecognized(body.clone())),
    }
}

/// Locate the actual upstream payload inside a response body
pub fn unwrap_body(body: &Value) -> Option<Value> {
    classify(body).map(ProxyEnvelope::into_payload)
}

/// Recursive search for the first string-valued `token` field. Objects are
/// searched key by key; array elements are descended into only when they
/// are containers themselves - a bare `[1, 2, 3]` never matches.
pub fn find_token(value: &Value) -> Option<String> {
    find_token_at(value, 0)
}

fn find_token_at(value: &Value, depth: usize) -> Option<String> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }

    match value {
        Value::Object(obj) => {
            if let Some(Value::String(token)) = obj.get("token") {
                if !token.is_empty() {
                    return Some(token.clone());
                }
            }
            obj.values().find_map(|v| find_token_at(v, depth + 1))
        }
        Value::Array(items) => items
            .iter()
            .filter(|v| v.is_object() || v.is_array())
            .find_map(|v| find_token_at(v, depth + 1)),
        _ => None,
    }
}

/// Canonical token extraction order for login responses:
/// 1. a direct `token` field on the unwrapped payload,
/// 2. stringified JSON under a known wrapper key (`message`,
///    `upstreamBody`, `data`),
/// 3. the recursive `find_token` sweep.
///
/// The stored-token last resort lives in the session manager, which owns
/// the credential store.
pub fn extract_token(body: &Value) -> Option<String> {
    let payload = unwrap_body(body)?;

    if let Some(Value::String(token)) = payload.get("token") {
        if !token.is_empty() {
            return Some(token.clone());
        }
    }

    for key in STRING_WRAPPER_KEYS {
        if let Some(Value::String(raw)) = payload.get(key) {
            if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
                if let Some(Value::String(token)) = parsed.get("token") {
                    if !token.is_empty() {
                        return Some(token.clone());
                    }
                }
            }
        }
    }

    find_token(&payload)
}

/// Pull the item rows out of a listing response, whatever shape it arrived
/// in. Never errors: an unrecognizable response is an empty listing.
pub fn extract_items(body: &Value) -> Vec<Value> {
    let payload = match unwrap_body(body) {
        Some(p) => p,
        None => return Vec::new(),
    };

    if let Value::Array(rows) = &payload {
        return rows.clone();
    }

    // Exact field names win over any scanning
    for field in ITEM_FIELD_CANDIDATES {
        match payload.get(field) {
            Some(Value::Array(rows)) => return rows.clone(),
            Some(Value::Object(inner)) => {
                if let Some(Value::Array(rows)) = inner.get("items") {
                    return rows.clone();
                }
            }
            _ => {}
        }
    }

    // Another proxy pattern: a stringified listing under `message`
    if let Some(Value::String(raw)) = payload.get("message") {
        if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
            match parsed {
                Value::Array(rows) => return rows,
                Value::Object(ref obj) => {
                    if let Some(Value::Array(rows)) = obj.get("items") {
                        return rows.clone();
                    }
                }
                _ => {}
            }
        }
    }

    if let Some(rows) = find_first_array(&payload, 0) {
        return rows;
    }

    // A lone row object, recognizable by its column names
    if looks_like_item_row(&payload) {
        return vec![payload];
    }

    tracing::warn!("unrecognized listing response shape, returning no items");
    Vec::new()
}

/// First array whose first element is an object, found by scanning keys
fn find_first_array(value: &Value, depth: usize) -> Option<Vec<Value>> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }

    match value {
        Value::Array(rows) => {
            if matches!(rows.first(), Some(Value::Object(_))) {
                Some(rows.clone())
            } else {
                None
            }
        }
        Value::Object(obj) => obj.values().find_map(|v| find_first_array(v, depth + 1)),
        _ => None,
    }
}

/// Sheet-exported rows use headers like "Item ID" / "Quantity Available";
/// API-native rows use camelCase. Either way the column names give a lone
/// row away.
fn looks_like_item_row(value: &Value) -> bool {
    let obj = match value.as_object() {
        Some(obj) => obj,
        None => return false,
    };
    let re = regex::Regex::new(r"(?i)item\s?id|item\s?name|item\s?price|quantity|description|expiry")
        .expect("Invalid regex pattern - this is a bug in the codebase");
    obj.keys().any(|k| re.is_match(k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_direct_token() {
        let body = json!({"token": "x"});
        assert_eq!(unwrap_body(&body), Some(json!({"token": "x"})));
    }

    #[test]
    fn test_unwrap_string_wrapped() {
        let body = json!({"upstreamBody": "{\"token\":\"x\"}"});
        assert_eq!(unwrap_body(&body), Some(json!({"token": "x"})));
    }

    #[test]
    fn test_unwrap_object_wrapped() {
        let body = json!({"upstreamBody": {"token": "x"}});
        assert_eq!(unwrap_body(&body), Some(json!({"token": "x"})));
    }

    #[test]
    fn test_unwrap_unparseable_string_becomes_raw() {
        let body = json!({"upstreamBody": "not json"});
        assert_eq!(unwrap_body(&body), Some(json!({"raw": "not json"})));
    }

    #[test]
    fn test_unwrap_plain_object_passes_through() {
        let body = json!({"status": "ok", "count": 3});
        assert_eq!(unwrap_body(&body), Some(body.clone()));
    }

    #[test]
    fn test_unwrap_rejects_null_and_primitives() {
        assert_eq!(unwrap_body(&Value::Null), None);
        assert_eq!(unwrap_body(&json!("a string")), None);
        assert_eq!(unwrap_body(&json!(42)), None);
    }

    #[test]
    fn test_classify_variants() {
        assert!(matches!(
            classify(&json!({"token": "x"})),
            Some(ProxyEnvelope::DirectToken(_))
        ));
        assert!(matches!(
            classify(&json!({"upstreamBody": "{}"})),
            Some(ProxyEnvelope::StringWrapped(_))
        ));
        assert!(matches!(
            classify(&json!({"upstreamBody": {}})),
            Some(ProxyEnvelope::ObjectWrapped(_))
        ));
        assert!(matches!(
            classify(&json!({"anything": 1})),
            Some(ProxyEnvelope::Unrecognized(_))
        ));
    }

    #[test]
    fn test_find_token_nested() {
        let value = json!({"a": {"b": {"token": "z"}}});
        assert_eq!(find_token(&value), Some("z".to_string()));
    }

    #[test]
    fn test_find_token_ignores_primitive_array_elements() {
        assert_eq!(find_token(&json!({"a": [1, 2, 3]})), None);
    }

    #[test]
    fn test_find_token_descends_into_object_array_elements() {
        let value = json!({"results": [{"token": "t"}]});
        assert_eq!(find_token(&value), Some("t".to_string()));
    }

    #[test]
    fn test_find_token_skips_non_string_token() {
        assert_eq!(find_token(&json!({"token": 42})), None);
    }

    #[test]
    fn test_extract_token_direct() {
        assert_eq!(
            extract_token(&json!({"token": "a.b.c"})),
            Some("a.b.c".to_string())
        );
    }

    #[test]
    fn test_extract_token_from_message_wrapper() {
        let body = json!({"message": "{\"token\":\"a.b.c\"}"});
        assert_eq!(extract_token(&body), Some("a.b.c".to_string()));
    }

    #[test]
    fn test_extract_token_from_stringified_upstream_body() {
        let body = json!({"upstreamBody": "{\"token\":\"a.b.c\"}"});
        assert_eq!(extract_token(&body), Some("a.b.c".to_string()));
    }

    #[test]
    fn test_extract_token_recursive_fallback() {
        let body = json!({"result": {"auth": {"token": "a.b.c"}}});
        assert_eq!(extract_token(&body), Some("a.b.c".to_string()));
    }

    #[test]
    fn test_extract_token_absent() {
        assert_eq!(extract_token(&json!({"error": "nope"})), None);
        assert_eq!(extract_token(&Value::Null), None);
    }

    #[test]
    fn test_extract_items_bare_array() {
        let body = json!([{"name": "Tea"}, {"name": "Rice"}]);
        assert_eq!(extract_items(&body).len(), 2);

        let wrapped = json!({"upstreamBody": "[{\"name\":\"Tea\"}]"});
        assert_eq!(extract_items(&wrapped).len(), 1);
    }

    #[test]
    fn test_extract_items_named_fields() {
        assert_eq!(extract_items(&json!({"items": [{"a": 1}]})).len(), 1);
        assert_eq!(extract_items(&json!({"inventory": [{"a": 1}]})).len(), 1);
        assert_eq!(extract_items(&json!({"data": [{"a": 1}]})).len(), 1);
        assert_eq!(
            extract_items(&json!({"data": {"items": [{"a": 1}, {"b": 2}]}})).len(),
            2
        );
    }

    #[test]
    fn test_extract_items_prefers_named_field_over_scan() {
        let body = json!({
            "noise": {"rows": [{"x": 1}, {"x": 2}, {"x": 3}]},
            "items": [{"a": 1}],
        });
        assert_eq!(extract_items(&body), vec![json!({"a": 1})]);
    }

    #[test]
    fn test_extract_items_message_wrapper() {
        let body = json!({"message": "[{\"Item ID\":\"7\"}]"});
        assert_eq!(extract_items(&body).len(), 1);
    }

    #[test]
    fn test_extract_items_first_array_scan() {
        let body = json!({"payload": {"rows": [{"Item ID": "1"}]}});
        assert_eq!(extract_items(&body).len(), 1);
    }

    #[test]
    fn test_extract_items_single_row_heuristic() {
        let body = json!({"upstreamBody": {"Item ID": "9", "Item Name": "Salt"}});
        let rows = extract_items(&body);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Item Name"], "Salt");
    }

    #[test]
    fn test_extract_items_unknown_shape_is_empty() {
        assert!(extract_items(&json!({"status": "ok"})).is_empty());
        assert!(extract_items(&Value::Null).is_empty());
    }
}
