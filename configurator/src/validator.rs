use crate::error::ConfigError;
use topology::ResolvedConfig;

/// Second semantic-validation pass (spec.md §4.2). The expansion phase
/// already aborts on structural contradictions; this pass collects
/// everything that is merely *unresolved* — a reference to a vhost,
/// exchange, queue or counter type that doesn't exist — into a single
/// aggregated `ConfigError::Validation`.
pub fn validate(config: &ResolvedConfig) -> Result<(), ConfigError> {
    let mut problems = Vec::new();

    for publication in config.publications.values() {
        if !config.vhosts.contains_key(&publication.vhost) {
            problems.push(format!(
                "publication {} refers to an unknown vhost: {}",
                publication.name, publication.vhost
            ));
            continue;
        }
        if publication.destination.is_none() {
            let (kind, target) = match &publication.target {
                topology::PublicationTarget::Exchange(e) => ("exchange", e.clone()),
                topology::PublicationTarget::Queue(q) => ("queue", q.clone()),
            };
            problems.push(format!(
                "publication {} refers to an unknown {}: {}",
                publication.name, kind, target
            ));
        }
    }

    for subscription in config.subscriptions.values() {
        if !config.vhosts.contains_key(&subscription.vhost) {
            problems.push(format!(
                "subscription {} refers to an unknown vhost: {}",
                subscription.name, subscription.vhost
            ));
            continue;
        }
        if subscription.source.is_none() {
            problems.push(format!(
                "subscription {} refers to an unknown queue: {}",
                subscription.name, subscription.queue
            ));
        }
        if let Some(counter_name) = &subscription.redeliveries {
            if !config.counters.contains_key(counter_name) {
                problems.push(format!(
                    "subscription {} refers to an unknown counter: {}",
                    subscription.name, counter_name
                ));
            }
        }
    }

    for shovel in config.shovels.values() {
        if !config.subscriptions.contains_key(&shovel.subscription) {
            problems.push(format!(
                "shovel {} refers to an unknown subscription: {}",
                shovel.name, shovel.subscription
            ));
        }
        if !config.publications.contains_key(&shovel.publication) {
            problems.push(format!(
                "shovel {} refers to an unknown publication: {}",
                shovel.name, shovel.publication
            ));
        }
    }

    for vhost in config.vhosts.values() {
        for connection in &vhost.connections {
            if connection.protocol != "amqp" && connection.protocol != "amqps" {
                problems.push(format!(
                    "vhost {} has a connection with an unsupported protocol: {}",
                    vhost.name, connection.protocol
                ));
            }
        }
    }

    for (name, spec) in &config.counters {
        if counters::CounterKind::parse(&spec.kind).is_err() {
            problems.push(format!("counter {name}: {}", ConfigError::UnknownCounterType(spec.kind.clone())));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(problems))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use topology::{Publication, PublicationTarget};

    fn empty_config() -> ResolvedConfig {
        ResolvedConfig {
            vhosts: HashMap::new(),
            publications: HashMap::new(),
            subscriptions: HashMap::new(),
            shovels: HashMap::new(),
            counters: HashMap::new(),
            encryption: HashMap::new(),
        }
    }

    #[test]
    fn passes_with_nothing_to_validate() {
        assert!(validate(&empty_config()).is_ok());
    }

    #[test]
    fn flags_counter_with_unknown_type() {
        let mut config = empty_config();
        config.counters.insert(
            "c1".to_string(),
            topology::CounterSpec {
                name: "c1".to_string(),
                kind: "bogus".to_string(),
                options: serde_json::Map::new(),
            },
        );
        let err = validate(&config).unwrap_err();
        match err {
            ConfigError::Validation(problems) => {
                assert_eq!(problems.len(), 1);
                assert!(problems[0].contains("c1"));
                assert!(problems[0].contains("Unknown counter type"));
            }
            _ => panic!("expected Validation error"),
        }
    }

    #[test]
    fn flags_publication_with_unknown_vhost() {
        let mut config = empty_config();
        config.publications.insert(
            "p1".to_string(),
            Publication {
                name: "p1".to_string(),
                vhost: "missing".to_string(),
                target: PublicationTarget::Exchange("e1".to_string()),
                destination: None,
                routing_key: None,
                confirm: true,
                encryption: None,
                reply_to: None,
                deprecated: false,
                auto_created: false,
            },
        );
        let err = validate(&config).unwrap_err();
        match err {
            ConfigError::Validation(problems) => {
                assert_eq!(problems.len(), 1);
                assert!(problems[0].contains("unknown vhost"));
            }
            _ => panic!("expected Validation error"),
        }
    }
}
