//! Key case conversion for descriptor-driven entities: camelCase on the wire, snake_case columns.

use serde_json::{Map, Value};

/// "preferred_date" -> "preferredDate"
pub fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = false;
    for c in s.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// "storeId" -> "store_id"
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Request bodies and query params: rename keys to column names.
pub fn keys_to_snake_case(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter().map(|(k, v)| (to_snake_case(&k), v)).collect()
}

/// Response rows: rename keys to camelCase, recursing into nested objects and arrays.
pub fn keys_to_camel_case(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (to_camel_case(&k), keys_to_camel_case(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(keys_to_camel_case).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_identifiers() {
        assert_eq!(to_camel_case("preferred_date"), "preferredDate");
        assert_eq!(to_snake_case("storeId"), "store_id");
        assert_eq!(to_snake_case("email"), "email");
    }

    #[test]
    fn converts_nested_values() {
        let v = keys_to_camel_case(json!({"created_at": 1, "items": [{"store_id": "x"}]}));
        assert_eq!(v, json!({"createdAt": 1, "items": [{"storeId": "x"}]}));
    }

    #[test]
    fn request_keys_become_columns() {
        let m = keys_to_snake_case(json!({"preferredDate": "2025-01-01", "name": "A"}).as_object().unwrap().clone());
        assert!(m.contains_key("preferred_date"));
        assert!(m.contains_key("name"));
    }
}
