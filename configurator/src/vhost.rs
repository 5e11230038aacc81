use crate::connection::{build_connections, normalize_connection_entries};
use crate::error::ConfigError;
use crate::names::parse_binding_name;
use crate::value_ext::{get_bool, get_str, get_u32, merge_defaults, normalize_keyed_collection};
use serde_json::{Map, Value};
use std::collections::HashMap;
use topology::{qualify, Binding, Exchange, Queue, Vhost};
use uuid::Uuid;

/// Everything expanded out of one vhost entry: the materialized
/// `Vhost` itself, plus any inline `publications`/`subscriptions`
/// that spec.md §4.1.2.7 says get promoted to the root collections.
pub struct ExpandedVhost {
    pub vhost: Vhost,
    pub local_publications: Map<String, Value>,
    pub local_subscriptions: Map<String, Value>,
}

pub fn expand_vhost(
    name: &str,
    raw: &Map<String, Value>,
    global_defaults: &Map<String, Value>,
) -> Result<ExpandedVhost, ConfigError> {
    let global_vhost_defaults = global_defaults
        .get("vhost")
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    let vhost_own_defaults = raw
        .get("defaults")
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    let vhost_defaults = merge_defaults(&vhost_own_defaults, &global_vhost_defaults);
    let vd = vhost_defaults.as_object().expect("vhost defaults is object");

    let namespace = match raw.get("namespace").or_else(|| vd.get("namespace")) {
        Some(Value::Bool(true)) => Uuid::new_v4().to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    };

    let concurrency = get_u32(raw, "concurrency", get_u32(vd, "concurrency", 1));
    let connection_strategy = get_str(raw, "connectionStrategy")
        .or_else(|| get_str(vd, "connectionStrategy"))
        .unwrap_or("fixed")
        .to_string();
    let publication_channel_pools =
        get_u32(raw, "publicationChannelPools", get_u32(vd, "publicationChannelPools", 1));

    let connection_defaults = vd
        .get("connection")
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    let connection_entries = normalize_connection_entries(raw);
    let connections = build_connections(&connection_strategy, &connection_entries, &connection_defaults)?;

    let exchange_defaults = vd
        .get("exchanges")
        .and_then(Value::as_object)
        .and_then(|m| m.get("options"))
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    let exchanges = expand_exchanges(raw.get("exchanges"), &namespace, &exchange_defaults)?;

    let queue_defaults = vd
        .get("queues")
        .and_then(Value::as_object)
        .and_then(|m| m.get("options"))
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    let queues = expand_queues(raw.get("queues"), &namespace, &queue_defaults)?;

    let default_qualify_binding_keys = vd
        .get("bindings")
        .and_then(Value::as_object)
        .map(|m| get_bool(m, "qualifyBindingKeys", false))
        .unwrap_or(false);
    let bindings = expand_bindings(raw.get("bindings"), &namespace, default_qualify_binding_keys)?;

    let local_publications = normalize_keyed_collection(raw.get("publications"));
    let local_subscriptions = normalize_keyed_collection(raw.get("subscriptions"));

    Ok(ExpandedVhost {
        vhost: Vhost {
            name: name.to_string(),
            namespace,
            concurrency,
            connection_strategy,
            publication_channel_pools,
            connections,
            exchanges,
            queues,
            bindings,
        },
        local_publications,
        local_subscriptions,
    })
}

fn expand_exchanges(
    raw: Option<&Value>,
    namespace: &str,
    defaults: &Value,
) -> Result<HashMap<String, Exchange>, ConfigError> {
    let mut entries = normalize_keyed_collection(raw);
    entries
        .entry(String::new())
        .or_insert_with(|| Value::Object(Map::new()));

    let mut out = HashMap::new();
    for (name, raw_entry) in entries {
        let merged = merge_defaults(&raw_entry, defaults);
        let merged_obj = merged.as_object().expect("merged exchange is object");
        let kind = get_str(merged_obj, "type").unwrap_or("direct").to_string();
        let mut options = merged_obj.clone();
        options.remove("type");
        out.insert(
            name.clone(),
            Exchange {
                fully_qualified_name: qualify(&name, namespace, None),
                name,
                kind,
                options,
            },
        );
    }
    Ok(out)
}

fn expand_queues(
    raw: Option<&Value>,
    namespace: &str,
    defaults: &Value,
) -> Result<HashMap<String, Queue>, ConfigError> {
    let entries = normalize_keyed_collection(raw);
    let mut out = HashMap::new();

    for (name, raw_entry) in entries {
        let mut merged = merge_defaults(&raw_entry, defaults);
        let merged_obj = merged.as_object_mut().expect("merged queue is object");

        let reply_tag = match merged_obj.get("replyTo") {
            Some(Value::Bool(true)) => Some(Uuid::new_v4().to_string()),
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        };
        merged_obj.remove("replyTo");

        qualify_dead_letter_exchange(merged_obj, namespace);

        out.insert(
            name.clone(),
            Queue {
                fully_qualified_name: qualify(&name, namespace, reply_tag.as_deref()),
                name,
                options: merged_obj.clone(),
                reply_to: reply_tag,
            },
        );
    }
    Ok(out)
}

fn qualify_dead_letter_exchange(options: &mut Map<String, Value>, namespace: &str) {
    if let Some(Value::String(dlx)) = options.get("x-dead-letter-exchange").cloned() {
        options.insert(
            "x-dead-letter-exchange".to_string(),
            Value::String(qualify(&dlx, namespace, None)),
        );
    }
    if let Some(arguments) = options.get_mut("arguments").and_then(Value::as_object_mut) {
        if let Some(Value::String(dlx)) = arguments.get("x-dead-letter-exchange").cloned() {
            arguments.insert(
                "x-dead-letter-exchange".to_string(),
                Value::String(qualify(&dlx, namespace, None)),
            );
        }
    }
}

fn expand_bindings(
    raw: Option<&Value>,
    namespace: &str,
    default_qualify_binding_keys: bool,
) -> Result<HashMap<String, Binding>, ConfigError> {
    let entries = normalize_keyed_collection(raw);
    let mut out = HashMap::new();

    for (key, raw_entry) in entries {
        let entry_obj = raw_entry.as_object().cloned().unwrap_or_default();
        let parsed = parse_binding_name(&key)?;

        let mut keys = parsed.keys;
        if let Some(single) = get_str(&entry_obj, "bindingKey") {
            if !keys.iter().any(|k| k == single) {
                keys.push(single.to_string());
            }
        }
        if let Some(Value::Array(many)) = entry_obj.get("bindingKeys") {
            for k in many.iter().filter_map(Value::as_str) {
                if !keys.iter().any(|existing| existing == k) {
                    keys.push(k.to_string());
                }
            }
        }

        let qualify_keys = entry_obj
            .get("qualifyBindingKeys")
            .and_then(Value::as_bool)
            .unwrap_or(default_qualify_binding_keys);

        let render_key = |k: &str| -> String {
            if qualify_keys {
                qualify(k, namespace, None)
            } else {
                k.to_string()
            }
        };

        if keys.len() <= 1 {
            out.insert(
                key.clone(),
                Binding {
                    name: key,
                    source: parsed.source,
                    destination: parsed.destination,
                    binding_key: keys.first().map(|k| render_key(k)),
                    qualify_binding_keys: qualify_keys,
                },
            );
        } else {
            for k in &keys {
                let fanned_name = format!("{key}:{k}");
                out.insert(
                    fanned_name.clone(),
                    Binding {
                        name: fanned_name,
                        source: parsed.source.clone(),
                        destination: parsed.destination.clone(),
                        binding_key: Some(render_key(k)),
                        qualify_binding_keys: qualify_keys,
                    },
                );
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_defaults() -> Map<String, Value> {
        Map::new()
    }

    #[test]
    fn default_exchange_is_always_present() {
        let raw = Map::new();
        let expanded = expand_vhost("/", &raw, &empty_defaults()).unwrap();
        assert!(expanded.vhost.exchanges.contains_key(""));
        assert_eq!(expanded.vhost.exchanges[""].fully_qualified_name, "");
    }

    #[test]
    fn binding_fan_out_matches_scenario_s3() {
        let mut raw = Map::new();
        raw.insert(
            "bindings".to_string(),
            serde_json::json!({ "e1[ k1, k2 ]-> q1": {} }),
        );
        let expanded = expand_vhost("/", &raw, &empty_defaults()).unwrap();
        assert!(expanded.vhost.bindings.contains_key("e1[ k1, k2 ]-> q1:k1"));
        assert!(expanded.vhost.bindings.contains_key("e1[ k1, k2 ]-> q1:k2"));
        assert_eq!(
            expanded.vhost.bindings["e1[ k1, k2 ]-> q1:k1"].binding_key,
            Some("k1".to_string())
        );
    }

    #[test]
    fn reply_to_true_generates_fqn_with_uuid_tag() {
        let mut raw = Map::new();
        raw.insert("namespace".to_string(), Value::String("ns".to_string()));
        raw.insert(
            "queues".to_string(),
            serde_json::json!({ "q1": { "replyTo": true } }),
        );
        let expanded = expand_vhost("/", &raw, &empty_defaults()).unwrap();
        let q = &expanded.vhost.queues["q1"];
        assert!(q.fully_qualified_name.starts_with("ns:q1:"));
        assert_eq!(q.reply_to.as_deref(), Some(q.fully_qualified_name.rsplit(':').next().unwrap()));
    }
}
