use crate::error::ConfigError;
use crate::value_ext::{get_bool, get_str, get_u32, merge_defaults};
use serde_json::{Map, Value};
use std::collections::HashMap;
use topology::{EncryptionProfile, Publication, PublicationTarget, Subscription, Vhost};

fn default_publication_name(vhost_name: &str, exchange_name: &str) -> String {
    if vhost_name == "/" {
        format!("/{exchange_name}")
    } else {
        format!("{vhost_name}/{exchange_name}")
    }
}

fn default_subscription_name(vhost_name: &str, queue_name: &str) -> String {
    if vhost_name == "/" {
        format!("/{queue_name}")
    } else {
        format!("{vhost_name}/{queue_name}")
    }
}

/// Generates the auto-created publications/subscriptions for every
/// vhost/exchange and vhost/queue pair (spec.md §4.1.3). Entries that
/// already exist in `existing` (an explicit, user-named entry) are
/// left untouched — explicit always overrides auto-created.
pub fn fill_auto_created(
    vhosts: &HashMap<String, Vhost>,
    publications: &mut Map<String, Value>,
    subscriptions: &mut Map<String, Value>,
) {
    for vhost in vhosts.values() {
        for exchange_name in vhost.exchanges.keys() {
            let name = default_publication_name(&vhost.name, exchange_name);
            publications.entry(name).or_insert_with(|| {
                serde_json::json!({
                    "vhost": vhost.name,
                    "exchange": exchange_name,
                    "autoCreated": true,
                })
            });
        }
        for queue_name in vhost.queues.keys() {
            let name = default_subscription_name(&vhost.name, queue_name);
            subscriptions.entry(name).or_insert_with(|| {
                serde_json::json!({
                    "vhost": vhost.name,
                    "queue": queue_name,
                    "autoCreated": true,
                })
            });
        }
    }
}

fn resolve_encryption(
    raw: Option<&Value>,
    global_encryption: &HashMap<String, EncryptionProfile>,
) -> Result<Option<EncryptionProfile>, ConfigError> {
    match raw {
        None => Ok(None),
        Some(Value::String(profile_name)) => global_encryption
            .get(profile_name)
            .cloned()
            .map(Some)
            .ok_or_else(|| ConfigError::UnknownEncryptionProfile(profile_name.clone())),
        Some(Value::Object(obj)) => {
            let name = get_str(obj, "name")
                .ok_or_else(|| ConfigError::Malformed("inline encryption profile needs a name".into()))?
                .to_string();
            let key = get_str(obj, "key").unwrap_or_default().to_string();
            let iv_length = obj.get("ivLength").and_then(Value::as_u64).unwrap_or(16) as usize;
            let algorithm = get_str(obj, "algorithm").unwrap_or("aes-256-cbc").to_string();
            Ok(Some(EncryptionProfile {
                name,
                key,
                iv_length,
                algorithm,
            }))
        }
        Some(_) => Err(ConfigError::Malformed("encryption must be a string or object".into())),
    }
}

pub fn resolve_publications(
    raw: &Map<String, Value>,
    vhosts: &HashMap<String, Vhost>,
    defaults: &Value,
    global_encryption: &HashMap<String, EncryptionProfile>,
) -> Result<HashMap<String, Publication>, ConfigError> {
    let mut out = HashMap::new();

    for (name, raw_entry) in raw {
        let merged = merge_defaults(raw_entry, defaults);
        let obj = merged.as_object().expect("merged publication is object");

        let vhost_name = get_str(obj, "vhost").unwrap_or("/").to_string();
        let exchange = get_str(obj, "exchange");
        let queue = get_str(obj, "queue");

        let target = match (exchange, queue) {
            (Some(e), None) => PublicationTarget::Exchange(e.to_string()),
            (None, Some(q)) => PublicationTarget::Queue(q.to_string()),
            _ => return Err(ConfigError::AmbiguousPublicationTarget(name.clone())),
        };

        let destination = vhosts.get(&vhost_name).and_then(|vhost| match &target {
            PublicationTarget::Exchange(e) => {
                vhost.exchanges.get(e).map(|x| x.fully_qualified_name.clone())
            }
            PublicationTarget::Queue(q) => vhost.queues.get(q).map(|x| x.fully_qualified_name.clone()),
        });

        let reply_to = match get_str(obj, "replyTo") {
            Some(queue_name) => {
                let vhost = vhosts
                    .get(&vhost_name)
                    .ok_or_else(|| ConfigError::UnknownReplyQueue {
                        publication: name.clone(),
                        queue: queue_name.to_string(),
                    })?;
                let fqn = vhost
                    .queues
                    .get(queue_name)
                    .map(|q| q.fully_qualified_name.clone())
                    .ok_or_else(|| ConfigError::UnknownReplyQueue {
                        publication: name.clone(),
                        queue: queue_name.to_string(),
                    })?;
                Some(fqn)
            }
            None => None,
        };

        let encryption = resolve_encryption(obj.get("encryption"), global_encryption)?;

        out.insert(
            name.clone(),
            Publication {
                name: name.clone(),
                vhost: vhost_name,
                target,
                destination,
                routing_key: get_str(obj, "routingKey").map(str::to_string),
                confirm: get_bool(obj, "confirm", true),
                encryption,
                reply_to,
                deprecated: get_bool(obj, "deprecated", false),
                auto_created: get_bool(obj, "autoCreated", false),
            },
        );
    }

    Ok(out)
}

pub fn resolve_subscriptions(
    raw: &Map<String, Value>,
    vhosts: &HashMap<String, Vhost>,
    defaults: &Value,
    global_encryption: &HashMap<String, EncryptionProfile>,
) -> Result<HashMap<String, Subscription>, ConfigError> {
    let mut out = HashMap::new();

    for (name, raw_entry) in raw {
        let merged = merge_defaults(raw_entry, defaults);
        let obj = merged.as_object().expect("merged subscription is object");

        let vhost_name = get_str(obj, "vhost").unwrap_or("/").to_string();
        let queue = get_str(obj, "queue").unwrap_or_default().to_string();

        let source = vhosts
            .get(&vhost_name)
            .and_then(|vhost| vhost.queues.get(&queue))
            .map(|q| q.fully_qualified_name.clone());

        let encryption = resolve_encryption(obj.get("encryption"), global_encryption)?;

        out.insert(
            name.clone(),
            Subscription {
                name: name.clone(),
                vhost: vhost_name,
                queue,
                source,
                prefetch: get_u32(obj, "prefetch", 1) as u16,
                redeliveries: get_str(obj, "redeliveries").map(str::to_string),
                encryption,
                auto_created: get_bool(obj, "autoCreated", false),
            },
        );
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map2;
    use topology::{Exchange, Vhost as TVhost};

    fn vhost_with_exchange(vhost_name: &str, exchange_name: &str) -> Map2<String, TVhost> {
        let mut exchanges = Map2::new();
        exchanges.insert(
            exchange_name.to_string(),
            Exchange {
                name: exchange_name.to_string(),
                fully_qualified_name: format!(":{exchange_name}"),
                kind: "direct".to_string(),
                options: Map::new(),
            },
        );
        let mut vhosts = Map2::new();
        vhosts.insert(
            vhost_name.to_string(),
            TVhost {
                name: vhost_name.to_string(),
                namespace: String::new(),
                concurrency: 1,
                connection_strategy: "fixed".to_string(),
                publication_channel_pools: 1,
                connections: vec![],
                exchanges,
                queues: Map2::new(),
                bindings: Map2::new(),
            },
        );
        vhosts
    }

    #[test]
    fn scenario_s1_default_publication_creation() {
        let vhosts = vhost_with_exchange("/", "e1");
        let mut publications = Map::new();
        let mut subscriptions = Map::new();
        fill_auto_created(&vhosts, &mut publications, &mut subscriptions);

        assert!(publications.contains_key("/e1"));
        let resolved = resolve_publications(
            &publications,
            &vhosts,
            &serde_json::json!({}),
            &HashMap::new(),
        )
        .unwrap();
        let p = &resolved["/e1"];
        assert!(p.auto_created);
        assert_eq!(p.vhost, "/");
        assert_eq!(p.target, PublicationTarget::Exchange("e1".to_string()));
        assert_eq!(p.destination.as_deref(), Some(":e1"));
    }

    #[test]
    fn ambiguous_target_is_rejected() {
        let vhosts = vhost_with_exchange("/", "e1");
        let mut raw = Map::new();
        raw.insert("p1".to_string(), serde_json::json!({"vhost": "/"}));
        let err = resolve_publications(&raw, &vhosts, &serde_json::json!({}), &HashMap::new())
            .unwrap_err();
        assert_eq!(err, ConfigError::AmbiguousPublicationTarget("p1".to_string()));
    }

    #[test]
    fn missing_reply_queue_is_hard_error() {
        let vhosts = vhost_with_exchange("/", "e1");
        let mut raw = Map::new();
        raw.insert(
            "p1".to_string(),
            serde_json::json!({"vhost": "/", "exchange": "e1", "replyTo": "q9"}),
        );
        let err = resolve_publications(&raw, &vhosts, &serde_json::json!({}), &HashMap::new())
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownReplyQueue {
                publication: "p1".to_string(),
                queue: "q9".to_string()
            }
        );
    }
}
