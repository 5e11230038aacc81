mod baseline;
mod connection;
mod counter;
mod error;
mod names;
mod pubsub;
mod shovel;
mod validator;
mod value_ext;
mod vhost;

pub use error::ConfigError;

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use topology::{EncryptionProfile, ResolvedConfig};
use value_ext::{deep_merge, get_str, normalize_keyed_collection};

/// Loads a raw configuration document from disk. Format is inferred
/// from the extension (toml/yaml/yml/json), mirroring the
/// multi-format loading the CLI layer offers for other files.
pub fn load_raw_config(path: &Path) -> Result<Value, ConfigError> {
    let format = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => config::FileFormat::Toml,
        Some("yaml") | Some("yml") => config::FileFormat::Yaml,
        _ => config::FileFormat::Json,
    };

    let loaded = config::Config::builder()
        .add_source(config::File::from(path).format(format))
        .build()
        .map_err(|e| ConfigError::Malformed(format!("failed to load {}: {e}", path.display())))?;

    loaded
        .try_deserialize::<Value>()
        .map_err(|e| ConfigError::Malformed(format!("failed to parse {}: {e}", path.display())))
}

/// Runs the full configuration pipeline: baseline merge, per-vhost
/// expansion, publication/subscription promotion with cross-vhost
/// uniqueness checking, default pub/sub generation, shovels, counters
/// and finally semantic validation.
pub fn configure(raw: Value) -> Result<ResolvedConfig, ConfigError> {
    let mut merged = baseline::baseline();
    deep_merge(&mut merged, &raw);
    let root = merged.as_object().expect("merged config is object");

    let global_defaults = root
        .get("defaults")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let raw_vhosts = normalize_keyed_collection(root.get("vhosts"));

    let mut vhosts = HashMap::new();
    let mut publications = root
        .get("publications")
        .map(normalize_keyed_collection)
        .unwrap_or_default();
    let mut subscriptions = root
        .get("subscriptions")
        .map(normalize_keyed_collection)
        .unwrap_or_default();
    let mut publication_origin: HashMap<String, String> =
        publications.keys().map(|k| (k.clone(), "<root>".to_string())).collect();
    let mut subscription_origin: HashMap<String, String> =
        subscriptions.keys().map(|k| (k.clone(), "<root>".to_string())).collect();

    for (vhost_name, raw_vhost_value) in &raw_vhosts {
        let raw_vhost_obj = raw_vhost_value.as_object().cloned().unwrap_or_default();
        let expanded = vhost::expand_vhost(vhost_name, &raw_vhost_obj, &global_defaults)?;

        for (name, value) in expanded.local_publications {
            if let Some(existing_origin) = publication_origin.get(&name) {
                if existing_origin != vhost_name {
                    return Err(ConfigError::DuplicatePublication(name));
                }
            }
            publication_origin.insert(name.clone(), vhost_name.clone());
            publications.insert(name, value);
        }
        for (name, value) in expanded.local_subscriptions {
            if let Some(existing_origin) = subscription_origin.get(&name) {
                if existing_origin != vhost_name {
                    return Err(ConfigError::DuplicateSubscription(name));
                }
            }
            subscription_origin.insert(name.clone(), vhost_name.clone());
            subscriptions.insert(name, value);
        }

        vhosts.insert(vhost_name.clone(), expanded.vhost);
    }

    pubsub::fill_auto_created(&vhosts, &mut publications, &mut subscriptions);

    let global_encryption = resolve_global_encryption(root.get("encryption"))?;

    let publication_defaults = global_defaults
        .get("publication")
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    let subscription_defaults = global_defaults
        .get("subscription")
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    let shovel_defaults = global_defaults
        .get("shovel")
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    let redeliveries_defaults = global_defaults
        .get("redeliveries")
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));

    let resolved_publications =
        pubsub::resolve_publications(&publications, &vhosts, &publication_defaults, &global_encryption)?;
    let resolved_subscriptions = pubsub::resolve_subscriptions(
        &subscriptions,
        &vhosts,
        &subscription_defaults,
        &global_encryption,
    )?;

    let shovels = shovel::expand_shovels(root.get("shovels"), &shovel_defaults)?;
    let counters = counter::expand_counters(root.get("redeliveries"), &redeliveries_defaults);

    let config = ResolvedConfig {
        vhosts,
        publications: resolved_publications,
        subscriptions: resolved_subscriptions,
        shovels,
        counters,
        encryption: global_encryption,
    };

    validator::validate(&config)?;

    Ok(config)
}

fn resolve_global_encryption(raw: Option<&Value>) -> Result<HashMap<String, EncryptionProfile>, ConfigError> {
    let entries = normalize_keyed_collection(raw);
    let mut out = HashMap::new();
    for (name, value) in entries {
        let obj = value.as_object().cloned().unwrap_or_default();
        let key = get_str(&obj, "key").unwrap_or_default().to_string();
        let iv_length = obj.get("ivLength").and_then(Value::as_u64).unwrap_or(16) as usize;
        let algorithm = get_str(&obj, "algorithm").unwrap_or("aes-256-cbc").to_string();
        out.insert(
            name.clone(),
            EncryptionProfile {
                name,
                key,
                iv_length,
                algorithm,
            },
        );
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scenario_s1_minimal_config_produces_default_exchange_publication() {
        let raw = json!({ "vhosts": { "/": {} } });
        let config = configure(raw).unwrap();
        assert!(config.vhosts.contains_key("/"));
        assert!(config.publications.contains_key("/"));
    }

    #[test]
    fn scenario_s2_duplicate_publication_across_vhosts_is_rejected() {
        let raw = json!({
            "vhosts": {
                "/": { "publications": { "shared": { "exchange": "" } } },
                "other": { "publications": { "shared": { "exchange": "" } } }
            }
        });
        let err = configure(raw).unwrap_err();
        assert_eq!(err, ConfigError::DuplicatePublication("shared".to_string()));
    }

    #[test]
    fn explicit_publication_overrides_auto_created() {
        let raw = json!({
            "vhosts": { "/": { "exchanges": { "e1": {} } } },
            "publications": { "/e1": { "vhost": "/", "exchange": "e1", "routingKey": "custom" } }
        });
        let config = configure(raw).unwrap();
        let publication = &config.publications["/e1"];
        assert!(!publication.auto_created);
        assert_eq!(publication.routing_key.as_deref(), Some("custom"));
    }

    #[test]
    fn unknown_encryption_profile_reference_is_rejected() {
        let raw = json!({
            "vhosts": { "/": { "exchanges": { "e1": {} } } },
            "publications": {
                "p1": { "vhost": "/", "exchange": "e1", "encryption": "missing" }
            }
        });
        let err = configure(raw).unwrap_err();
        assert_eq!(err, ConfigError::UnknownEncryptionProfile("missing".to_string()));
    }
}
