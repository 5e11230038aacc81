use anyhow::{anyhow, Context, Result};
use lapin::options::{
    BasicQosOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::{AMQPValue, FieldTable};
use lapin::options::ConfirmSelectOptions;
use lapin::{Channel, Connection, ConnectionProperties, ExchangeKind};
use log::{debug, info, warn};
use topology::{Connection as ConnectionSpec, Vhost};

/// The live AMQP runtime for one vhost: the connection actually
/// established (the first in the failover list that accepted a
/// connection) and a default channel used for declarations and for
/// publications that aren't otherwise pooled.
pub struct VhostRuntime {
    pub vhost: Vhost,
    pub active: ConnectionSpec,
    pub connection: Connection,
    pub channel: Channel,
}

impl VhostRuntime {
    /// Connects using the vhost's failover-ordered connection list,
    /// trying each in turn, then asserts its exchanges/queues/bindings.
    pub async fn connect(vhost: Vhost) -> Result<Self> {
        let mut last_err = None;
        let mut established = None;

        for candidate in &vhost.connections {
            match Connection::connect(&candidate.url, ConnectionProperties::default()).await {
                Ok(connection) => {
                    info!(
                        "vhost {}: connected via {}",
                        vhost.name, candidate.loggable_url
                    );
                    established = Some((connection, candidate.clone()));
                    break;
                }
                Err(err) => {
                    warn!(
                        "vhost {}: failed to connect via {}: {err}",
                        vhost.name, candidate.loggable_url
                    );
                    last_err = Some(err);
                }
            }
        }

        let (connection, active) = established.ok_or_else(|| {
            anyhow!(
                "vhost {}: exhausted all {} candidate connection(s): {}",
                vhost.name,
                vhost.connections.len(),
                last_err.map(|e| e.to_string()).unwrap_or_default()
            )
        })?;

        let channel = connection
            .create_channel()
            .await
            .context("failed to open default channel")?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .context("failed to enable confirm mode")?;

        let runtime = Self {
            vhost,
            active,
            connection,
            channel,
        };
        runtime.assert_topology().await?;
        Ok(runtime)
    }

    async fn assert_topology(&self) -> Result<()> {
        for exchange in self.vhost.exchanges.values() {
            if exchange.name.is_empty() {
                continue;
            }
            let kind = exchange_kind(&exchange.kind);
            self.channel
                .exchange_declare(
                    &exchange.fully_qualified_name,
                    kind,
                    ExchangeDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    options_to_field_table(&exchange.options),
                )
                .await
                .with_context(|| format!("failed to declare exchange {}", exchange.name))?;
            debug!("vhost {}: declared exchange {}", self.vhost.name, exchange.name);
        }

        for queue in self.vhost.queues.values() {
            self.channel
                .queue_declare(
                    &queue.fully_qualified_name,
                    QueueDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    options_to_field_table(&queue.options),
                )
                .await
                .with_context(|| format!("failed to declare queue {}", queue.name))?;
            debug!("vhost {}: declared queue {}", self.vhost.name, queue.name);
        }

        for binding in self.vhost.bindings.values() {
            let source = self
                .vhost
                .exchanges
                .get(&binding.source)
                .map(|e| e.fully_qualified_name.clone())
                .unwrap_or_else(|| binding.source.clone());
            let destination = self
                .vhost
                .queues
                .get(&binding.destination)
                .map(|q| q.fully_qualified_name.clone())
                .unwrap_or_else(|| binding.destination.clone());

            self.channel
                .queue_bind(
                    &destination,
                    &source,
                    binding.binding_key.as_deref().unwrap_or(""),
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await
                .with_context(|| format!("failed to assert binding {}", binding.name))?;
            debug!("vhost {}: asserted binding {}", self.vhost.name, binding.name);
        }

        Ok(())
    }

    pub async fn qos(&self, prefetch: u16) -> Result<()> {
        self.channel
            .basic_qos(prefetch, BasicQosOptions::default())
            .await
            .context("failed to set prefetch")?;
        Ok(())
    }

    pub async fn purge(&self) -> Result<()> {
        use lapin::options::QueuePurgeOptions;
        for queue in self.vhost.queues.values() {
            self.channel
                .queue_purge(&queue.fully_qualified_name, QueuePurgeOptions::default())
                .await
                .with_context(|| format!("failed to purge queue {}", queue.name))?;
        }
        Ok(())
    }

    pub async fn close(&self) -> Result<()> {
        self.connection
            .close(0, "herald: shutdown")
            .await
            .context("failed to close vhost connection")
    }
}

fn exchange_kind(kind: &str) -> ExchangeKind {
    match kind {
        "fanout" => ExchangeKind::Fanout,
        "topic" => ExchangeKind::Topic,
        "headers" => ExchangeKind::Headers,
        other => ExchangeKind::Custom(other.to_string()),
    }
}

fn options_to_field_table(options: &serde_json::Map<String, serde_json::Value>) -> FieldTable {
    let mut table = FieldTable::default();
    for (key, value) in options {
        if let Some(amqp_value) = json_to_amqp_value(value) {
            table.insert(key.as_str().into(), amqp_value);
        }
    }
    table
}

fn json_to_amqp_value(value: &serde_json::Value) -> Option<AMQPValue> {
    match value {
        serde_json::Value::String(s) => Some(AMQPValue::LongString(s.as_str().into())),
        serde_json::Value::Bool(b) => Some(AMQPValue::Boolean(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(AMQPValue::LongLongInt(i))
            } else {
                n.as_f64().map(AMQPValue::Double)
            }
        }
        _ => None,
    }
}
