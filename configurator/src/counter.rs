use crate::value_ext::{get_str, merge_defaults};
use serde_json::{Map, Value};
use std::collections::HashMap;
use topology::CounterSpec;

/// Expands `redeliveries.counters` into `topology::CounterSpec` entries.
/// Each entry's `type` defaults to its own key (a counter named
/// `inMemory` is, by default, an `inMemory` counter), and is merged
/// under `defaults.redeliveries.counters.<type>` from the baseline.
pub fn expand_counters(raw: Option<&Value>, defaults: &Value) -> HashMap<String, CounterSpec> {
    let entries = match raw {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::Array(items)) => {
            let mut out = Map::new();
            for item in items {
                if let Value::String(name) = item {
                    out.insert(name.clone(), Value::Object(Map::new()));
                } else if let Value::Object(obj) = item {
                    if let Some(name) = get_str(obj, "name") {
                        out.insert(name.to_string(), Value::Object(obj.clone()));
                    }
                }
            }
            out
        }
        _ => Map::new(),
    };

    let type_defaults = defaults
        .get("redeliveries")
        .and_then(Value::as_object)
        .and_then(|m| m.get("counters"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let mut out = HashMap::new();
    for (name, raw_entry) in entries {
        let raw_obj = raw_entry.as_object().cloned().unwrap_or_default();
        let kind = get_str(&raw_obj, "type").unwrap_or(&name).to_string();
        let kind_defaults = type_defaults
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        let merged = merge_defaults(&raw_entry, &kind_defaults);
        let mut options = merged.as_object().cloned().unwrap_or_default();
        options.remove("type");

        out.insert(
            name.clone(),
            CounterSpec {
                name,
                kind,
                options,
            },
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_type_defaults_to_its_own_name() {
        let raw = serde_json::json!({ "inMemory": {} });
        let counters = expand_counters(Some(&raw), &serde_json::json!({}));
        assert_eq!(counters["inMemory"].kind, "inMemory");
    }

    #[test]
    fn merges_type_level_defaults() {
        let raw = serde_json::json!({ "retries": { "type": "inMemory" } });
        let defaults = serde_json::json!({
            "redeliveries": { "counters": { "inMemory": { "size": 10000 } } }
        });
        let counters = expand_counters(Some(&raw), &defaults);
        let c = &counters["retries"];
        assert_eq!(c.kind, "inMemory");
        assert_eq!(c.options.get("size"), Some(&serde_json::json!(10000)));
    }

    #[test]
    fn array_form_with_bare_strings() {
        let raw = serde_json::json!(["stub"]);
        let counters = expand_counters(Some(&raw), &serde_json::json!({}));
        assert!(counters.contains_key("stub"));
    }
}
