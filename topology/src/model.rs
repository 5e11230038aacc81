use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A symmetric encryption profile resolved onto a Publication or
/// Subscription. `key` is kept as the original hex string; `crypto`
/// decodes and validates it at use time so that a malformed profile
/// surfaces as an operational error on `publish`, not a configuration
/// error at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncryptionProfile {
    pub name: String,
    pub key: String,
    pub iv_length: usize,
    pub algorithm: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManagementConnection {
    pub hostname: String,
    pub url: String,
    pub loggable_url: String,
    pub auth: (String, String),
}

/// A single failover-ordered AMQP connection, fully merged from
/// URL/config/vhost-default layers. `index` is used only during
/// configuration to order the final `connections` vector; it is not
/// retained by consumers of `ResolvedConfig`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Connection {
    pub protocol: String,
    pub hostname: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub vhost: String,
    pub options: HashMap<String, String>,
    pub socket_options: HashMap<String, String>,
    pub management: ManagementConnection,
    pub url: String,
    pub loggable_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exchange {
    pub name: String,
    pub fully_qualified_name: String,
    pub kind: String,
    pub options: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Queue {
    pub name: String,
    pub fully_qualified_name: String,
    pub options: serde_json::Map<String, serde_json::Value>,
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub source: String,
    pub destination: String,
    pub binding_key: Option<String>,
    pub qualify_binding_keys: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vhost {
    pub name: String,
    pub namespace: String,
    pub concurrency: u32,
    pub connection_strategy: String,
    pub publication_channel_pools: u32,
    pub connections: Vec<Connection>,
    pub exchanges: HashMap<String, Exchange>,
    pub queues: HashMap<String, Queue>,
    pub bindings: HashMap<String, Binding>,
}

/// A Publication refers to exactly one of an exchange or a queue
/// (spec.md invariant 4: `exactly one of {P.exchange, P.queue}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PublicationTarget {
    Exchange(String),
    Queue(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Publication {
    pub name: String,
    pub vhost: String,
    pub target: PublicationTarget,
    /// Fully qualified name of `target`, once the vhost is known to exist.
    pub destination: Option<String>,
    pub routing_key: Option<String>,
    pub confirm: bool,
    pub encryption: Option<EncryptionProfile>,
    /// Fully qualified name of the reply queue, if any.
    pub reply_to: Option<String>,
    pub deprecated: bool,
    pub auto_created: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subscription {
    pub name: String,
    pub vhost: String,
    pub queue: String,
    /// Fully qualified name of `queue`.
    pub source: Option<String>,
    pub prefetch: u16,
    pub redeliveries: Option<String>,
    pub encryption: Option<EncryptionProfile>,
    pub auto_created: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Shovel {
    pub name: String,
    pub subscription: String,
    pub publication: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CounterSpec {
    pub name: String,
    pub kind: String,
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// The output of `configurator::configure`: a fully resolved, validated
/// topology with stable identifiers, ready for `broker::Broker::create`
/// to materialize.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub vhosts: HashMap<String, Vhost>,
    pub publications: HashMap<String, Publication>,
    pub subscriptions: HashMap<String, Subscription>,
    pub shovels: HashMap<String, Shovel>,
    pub counters: HashMap<String, CounterSpec>,
    pub encryption: HashMap<String, EncryptionProfile>,
}

impl ResolvedConfig {
    pub fn vhost(&self, name: &str) -> Option<&Vhost> {
        self.vhosts.get(name)
    }

    pub fn publication(&self, name: &str) -> Option<&Publication> {
        self.publications.get(name)
    }

    pub fn subscription(&self, name: &str) -> Option<&Subscription> {
        self.subscriptions.get(name)
    }
}
