use serde_json::{Map, Value};

/// Deep-merges `src` into `dst`: destination values win, plain objects
/// merge recursively key by key, and arrays are replaced wholesale
/// (never concatenated). This is spec.md's "baseline merge" semantics,
/// used both for the built-in baseline and for applying per-entity
/// default blocks later in the pipeline.
pub fn deep_merge(dst: &mut Value, src: &Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (key, src_val) in src_map {
                match dst_map.get_mut(key) {
                    Some(dst_val) => deep_merge(dst_val, src_val),
                    None => {
                        dst_map.insert(key.clone(), src_val.clone());
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val.clone();
        }
    }
}

/// Merges `defaults` under `value` — i.e. `value`'s own fields win,
/// `defaults` fills in everything missing. Equivalent to
/// `deep_merge(defaults_clone, value)` but reads better at call sites.
pub fn merge_defaults(value: &Value, defaults: &Value) -> Value {
    let mut merged = defaults.clone();
    deep_merge(&mut merged, value);
    merged
}

pub fn as_object(value: &Value) -> Option<&Map<String, Value>> {
    value.as_object()
}

pub fn get_str<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str)
}

pub fn get_string(map: &Map<String, Value>, key: &str, default: &str) -> String {
    get_str(map, key).unwrap_or(default).to_string()
}

pub fn get_bool(map: &Map<String, Value>, key: &str, default: bool) -> bool {
    map.get(key).and_then(Value::as_bool).unwrap_or(default)
}

pub fn get_u32(map: &Map<String, Value>, key: &str, default: u32) -> u32 {
    map.get(key)
        .and_then(Value::as_u64)
        .map(|v| v as u32)
        .unwrap_or(default)
}

pub fn get_u16(map: &Map<String, Value>, key: &str, default: u16) -> u16 {
    map.get(key)
        .and_then(Value::as_u64)
        .map(|v| v as u16)
        .unwrap_or(default)
}

/// Normalizes a "keyed collection" per spec.md "Dynamic keyed
/// collections": either a mapping keyed by name, or a sequence of
/// entries (bare strings or objects carrying a `name` field).
/// Anonymous sequence entries get `unnamed-<uuid>`.
pub fn normalize_keyed_collection(value: Option<&Value>) -> Map<String, Value> {
    match value {
        None => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(Value::Array(items)) => {
            let mut out = Map::new();
            for item in items {
                match item {
                    Value::String(name) => {
                        out.insert(name.clone(), Value::Object(Map::new()));
                    }
                    Value::Object(obj) => {
                        let name = obj
                            .get("name")
                            .and_then(Value::as_str)
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("unnamed-{}", uuid::Uuid::new_v4()));
                        out.insert(name, Value::Object(obj.clone()));
                    }
                    other => {
                        out.insert(format!("unnamed-{}", uuid::Uuid::new_v4()), other.clone());
                    }
                }
            }
            out
        }
        Some(other) => {
            let mut out = Map::new();
            out.insert(format!("unnamed-{}", uuid::Uuid::new_v4()), other.clone());
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merges_plain_objects_recursively() {
        let mut dst = json!({"a": {"b": 1, "c": 2}});
        let src = json!({"a": {"c": 99, "d": 3}});
        deep_merge(&mut dst, &src);
        assert_eq!(dst, json!({"a": {"b": 1, "c": 99, "d": 3}}));
    }

    #[test]
    fn replaces_arrays_instead_of_concatenating() {
        let mut dst = json!({"a": [1, 2, 3]});
        let src = json!({"a": [9]});
        deep_merge(&mut dst, &src);
        assert_eq!(dst, json!({"a": [9]}));
    }

    #[test]
    fn normalizes_sequence_with_bare_strings_and_unnamed_objects() {
        let value = json!(["q1", {"foo": "bar"}]);
        let normalized = normalize_keyed_collection(Some(&value));
        assert_eq!(normalized.len(), 2);
        assert!(normalized.contains_key("q1"));
        assert_eq!(
            normalized.keys().filter(|k| k.starts_with("unnamed-")).count(),
            1
        );
    }
}
