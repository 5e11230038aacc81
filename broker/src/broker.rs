use crate::connection::VhostRuntime;
use crate::message::{DeliveredMessage, Payload, PublishOutcome, PublishOverrides, SubscribeOverrides};
use crate::session::Session;
use anyhow::{anyhow, Context, Result};
use counters::RedeliveryCounter;
use crypto::{Aes256CbcProvider, CipherProvider};
use lapin::options::{BasicConsumeOptions, BasicPublishOptions};
use lapin::types::{AMQPValue, FieldTable};
use lapin::BasicProperties;
use log::{info, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use topology::{PublicationTarget, ResolvedConfig, Subscription, TopologyError};
use uuid::Uuid;

const DEFAULT_DEFER_CLOSE_CHANNEL_MS: u64 = 200;

/// Overridable collaborators for `Broker::create` (spec.md §4.3:
/// "optional overrides for counters/encryption providers").
pub struct BrokerComponents {
    pub cipher: Arc<dyn CipherProvider>,
}

impl Default for BrokerComponents {
    fn default() -> Self {
        Self {
            cipher: Arc::new(Aes256CbcProvider),
        }
    }
}

/// A snapshot of one vhost's active connection, returned by
/// `get_connections`/`connect` instead of an opaque handle (see
/// SPEC_FULL.md §5).
#[derive(Debug, Clone)]
pub struct ConnectionSnapshot {
    pub vhost: String,
    pub hostname: String,
    pub port: u16,
    pub loggable_url: String,
}

impl From<&VhostRuntime> for ConnectionSnapshot {
    fn from(runtime: &VhostRuntime) -> Self {
        Self {
            vhost: runtime.vhost.name.clone(),
            hostname: runtime.active.hostname.clone(),
            port: runtime.active.port,
            loggable_url: runtime.active.loggable_url.clone(),
        }
    }
}

/// Live counts exposed purely for the `status` CLI command and tests
/// (SPEC_FULL.md §5); does not change any resolved-config invariant.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub vhosts: usize,
    pub publications: usize,
    pub subscriptions: usize,
    pub sessions: usize,
}

/// The process-wide controller owning the live topology and the
/// public verb surface (spec.md §4.3).
pub struct Broker {
    config: ResolvedConfig,
    vhosts: RwLock<HashMap<String, Arc<VhostRuntime>>>,
    cipher: Arc<dyn CipherProvider>,
    counters: HashMap<String, Arc<dyn RedeliveryCounter>>,
    sessions: Mutex<Vec<Arc<Session>>>,
    shovel_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Broker {
    /// Runs the configurator, then initializes leaf-first: counters ->
    /// vhosts -> publications -> subscriptions -> shovels (spec.md §2).
    pub async fn create(raw_config: Value, components: BrokerComponents) -> Result<Arc<Broker>> {
        let config = configurator::configure(raw_config).context("configuration failed")?;

        let mut counters = HashMap::new();
        for (name, spec) in &config.counters {
            let counter = counters::build(spec)
                .with_context(|| format!("failed to build counter {name}"))?;
            counters.insert(name.clone(), Arc::from(counter));
        }

        let mut vhosts = HashMap::new();
        for (name, vhost) in config.vhosts.clone() {
            let runtime = VhostRuntime::connect(vhost)
                .await
                .with_context(|| format!("failed to initialize vhost {name}"))?;
            vhosts.insert(name, Arc::new(runtime));
        }

        let broker = Arc::new(Broker {
            config,
            vhosts: RwLock::new(vhosts),
            cipher: components.cipher,
            counters,
            sessions: Mutex::new(Vec::new()),
            shovel_tasks: Mutex::new(Vec::new()),
        });

        broker.start_shovels().await;
        Ok(broker)
    }

    async fn start_shovels(self: &Arc<Self>) {
        let mut tasks = self.shovel_tasks.lock().await;
        for shovel in self.config.shovels.values().cloned() {
            let broker = Arc::clone(self);
            let handle = tokio::spawn(async move {
                if let Err(err) = broker.run_shovel(&shovel).await {
                    warn!("shovel {}: terminated: {err}", shovel.name);
                }
            });
            tasks.push(handle);
        }
    }

    async fn run_shovel(self: &Arc<Self>, shovel: &topology::Shovel) -> Result<()> {
        use futures::StreamExt;

        let subscription = self
            .config
            .subscriptions
            .get(&shovel.subscription)
            .ok_or_else(|| anyhow!("shovel {} refers to an unknown subscription", shovel.name))?
            .clone();
        let session = self
            .subscribe(&shovel.subscription, SubscribeOverrides::default())
            .await?;
        info!("shovel {}: forwarding {} -> {}", shovel.name, shovel.subscription, shovel.publication);

        let mut consumer = session.consumer().clone();
        while let Some(delivery) = consumer.next().await {
            let delivery = delivery.context("shovel delivery error")?;
            if delivery.redelivered {
                self.note_redelivery(&subscription, &delivery).await;
            }
            let delivered = DeliveredMessage {
                message_id: delivery.properties.message_id().as_ref().map(|s| s.to_string()),
                content_type: delivery.properties.content_type().as_ref().map(|s| s.to_string()),
                routing_key: delivery.routing_key.to_string(),
                exchange: delivery.exchange.to_string(),
                queue: subscription.queue.clone(),
                payload: delivery.data.clone(),
            };
            match self
                .forward(&shovel.publication, delivered, PublishOverrides::default())
                .await
            {
                Ok(PublishOutcome::Returned { reply_text, .. }) => {
                    warn!("shovel {}: forwarded message was returned by the broker: {reply_text}", shovel.name);
                }
                Ok(PublishOutcome::Success { .. }) => {}
                Err(err) => {
                    warn!("shovel {}: failed to forward message: {err}", shovel.name);
                }
            }
            delivery
                .acker
                .ack(Default::default())
                .await
                .context("failed to ack shoveled message")?;
        }
        Ok(())
    }

    /// Records a redelivery against whatever counter the delivering
    /// subscription names, if any (spec.md §4.1.6). Failures are logged,
    /// not propagated: a broken counter must never block message flow.
    async fn note_redelivery(&self, subscription: &Subscription, delivery: &lapin::message::Delivery) {
        let Some(counter_name) = &subscription.redeliveries else {
            return;
        };
        let Some(counter) = self.counters.get(counter_name) else {
            warn!("subscription {} names unknown counter {counter_name}", subscription.name);
            return;
        };
        let message_id = delivery
            .properties
            .message_id()
            .as_ref()
            .map(|s| s.to_string())
            .unwrap_or_else(|| delivery.delivery_tag.to_string());
        if let Err(err) = counter.increment(&message_id).await {
            warn!("counter {counter_name}: failed to record redelivery of {message_id}: {err}");
        }
    }

    pub fn get_fully_qualified_name(&self, vhost_name: &str, name: &str) -> Result<String> {
        let vhost = self
            .config
            .vhost(vhost_name)
            .ok_or_else(|| TopologyError::UnknownVhost(vhost_name.to_string()))?;
        Ok(topology::qualify(name, &vhost.namespace, None))
    }

    pub async fn connect(&self, vhost_name: &str) -> Result<ConnectionSnapshot> {
        let vhosts = self.vhosts.read().await;
        let runtime = vhosts
            .get(vhost_name)
            .ok_or_else(|| TopologyError::UnknownVhost(vhost_name.to_string()))?;
        Ok(ConnectionSnapshot::from(runtime.as_ref()))
    }

    pub async fn get_connections(&self) -> Vec<ConnectionSnapshot> {
        self.vhosts
            .read()
            .await
            .values()
            .map(|runtime| ConnectionSnapshot::from(runtime.as_ref()))
            .collect()
    }

    pub async fn stats(&self) -> Stats {
        Stats {
            vhosts: self.vhosts.read().await.len(),
            publications: self.config.publications.len(),
            subscriptions: self.config.subscriptions.len(),
            sessions: self.sessions.lock().await.len(),
        }
    }

    pub async fn publish(
        &self,
        name: &str,
        payload: Payload,
        mut overrides: PublishOverrides,
    ) -> Result<PublishOutcome> {
        let publication = self
            .config
            .publications
            .get(name)
            .ok_or_else(|| TopologyError::UnknownPublication(name.to_string()))?;

        let vhosts = self.vhosts.read().await;
        let runtime = vhosts
            .get(&publication.vhost)
            .ok_or_else(|| TopologyError::UnknownVhost(publication.vhost.clone()))?;

        let message_id = overrides
            .message_id
            .take()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut content_type = overrides
            .content_type
            .take()
            .unwrap_or_else(|| payload.default_content_type().to_string());
        let mut body = payload.into_bytes()?;

        let mut headers = FieldTable::default();
        for (key, value) in &overrides.headers {
            headers.insert(key.as_str().into(), AMQPValue::LongString(value.as_str().into()));
        }

        if let Some(profile) = &publication.encryption {
            let encrypted = self
                .cipher
                .encrypt(profile, &body)
                .map_err(|e| anyhow!("encryption failed: {e}"))?;
            headers.insert(
                "rascal.encryption.name".into(),
                AMQPValue::LongString(profile.name.as_str().into()),
            );
            headers.insert(
                "rascal.encryption.originalContentType".into(),
                AMQPValue::LongString(content_type.as_str().into()),
            );
            headers.insert(
                "rascal.encryption.iv".into(),
                AMQPValue::LongString(encrypted.iv_base64.as_str().into()),
            );
            body = encrypted.ciphertext;
            content_type = "application/octet-stream".to_string();
        }

        let (exchange, routing_key) = match &publication.target {
            PublicationTarget::Exchange(_) => (
                publication.destination.clone().unwrap_or_default(),
                overrides
                    .routing_key
                    .clone()
                    .or_else(|| publication.routing_key.clone())
                    .unwrap_or_default(),
            ),
            PublicationTarget::Queue(_) => (
                String::new(),
                publication.destination.clone().unwrap_or_default(),
            ),
        };

        let properties = BasicProperties::default()
            .with_message_id(message_id.clone().into())
            .with_content_type(content_type.into())
            .with_headers(headers);

        let started = Instant::now();
        let mut confirm = runtime
            .channel
            .basic_publish(
                &exchange,
                &routing_key,
                BasicPublishOptions {
                    mandatory: true,
                    ..Default::default()
                },
                &body,
                properties,
            )
            .await
            .context("publish failed")?
            .await
            .context("publish confirmation failed")?;

        if let Some(returned) = confirm.take_message() {
            return Ok(PublishOutcome::Returned {
                message_id,
                reply_code: returned.reply_code,
                reply_text: returned.reply_text.to_string(),
            });
        }

        if !confirm.is_ack() {
            anyhow::bail!("message to publication {name} was not acknowledged by the broker");
        }

        Ok(PublishOutcome::Success {
            message_id,
            duration_ms: started.elapsed().as_millis(),
        })
    }

    /// Re-publishes an inbound message, stamping the forward contract's
    /// headers (spec.md §4.3). The destination publication's own explicit
    /// `routingKey` always wins; the original routing key is only used as a
    /// last resort when neither an override nor the publication names one.
    pub async fn forward(
        &self,
        name: &str,
        message: DeliveredMessage,
        overrides: PublishOverrides,
    ) -> Result<PublishOutcome> {
        let publication = self
            .config
            .publications
            .get(name)
            .ok_or_else(|| TopologyError::UnknownPublication(name.to_string()))?;
        let namespace = self
            .config
            .vhost(&publication.vhost)
            .map(|v| v.namespace.clone())
            .unwrap_or_default();

        let overrides = resolve_forward_overrides(publication.routing_key.as_deref(), &namespace, &message, overrides);
        self.publish(name, Payload::Raw(message.payload), overrides).await
    }

    pub async fn subscribe(
        self: &Arc<Self>,
        name: &str,
        overrides: SubscribeOverrides,
    ) -> Result<Arc<Session>> {
        let subscription = self
            .config
            .subscriptions
            .get(name)
            .ok_or_else(|| TopologyError::UnknownSubscription(name.to_string()))?;

        let vhosts = self.vhosts.read().await;
        let runtime = vhosts
            .get(&subscription.vhost)
            .ok_or_else(|| TopologyError::UnknownVhost(subscription.vhost.clone()))?;

        let prefetch = overrides.prefetch.unwrap_or(subscription.prefetch);
        runtime.qos(prefetch).await?;

        let queue_fqn = subscription
            .source
            .clone()
            .ok_or_else(|| TopologyError::UnknownQueue { vhost: subscription.vhost.clone(), name: subscription.queue.clone() })?;
        let consumer_tag = overrides
            .consumer_tag
            .unwrap_or_else(|| format!("herald-{}", Uuid::new_v4()));

        let consumer = runtime
            .channel
            .basic_consume(&queue_fqn, &consumer_tag, BasicConsumeOptions::default(), FieldTable::default())
            .await
            .context("failed to start consuming")?;

        let max_defer = Duration::from_millis(
            overrides.defer_close_channel_ms.unwrap_or(DEFAULT_DEFER_CLOSE_CHANNEL_MS),
        );
        let session = Arc::new(Session::new(
            name.to_string(),
            name.to_string(),
            consumer,
            max_defer,
            subscription.encryption.clone(),
            Arc::clone(&self.cipher),
        ));
        self.sessions.lock().await.push(Arc::clone(&session));
        Ok(session)
    }

    pub async fn subscribe_all(
        self: &Arc<Self>,
        filter: Option<&dyn Fn(&Subscription) -> bool>,
    ) -> Result<Vec<Arc<Session>>> {
        let names: Vec<String> = self
            .config
            .subscriptions
            .values()
            .filter(|s| filter.map(|f| f(s)).unwrap_or(true))
            .map(|s| s.name.clone())
            .collect();

        let mut sessions = Vec::with_capacity(names.len());
        for name in names {
            sessions.push(self.subscribe(&name, SubscribeOverrides::default()).await?);
        }
        Ok(sessions)
    }

    /// Walks a snapshot of the live sessions, cancelling each, then
    /// waits the largest per-session defer-close-channel horizon
    /// before returning (spec.md §4.4).
    pub async fn unsubscribe_all(&self) -> Result<()> {
        let snapshot: Vec<Arc<Session>> = self.sessions.lock().await.drain(..).collect();
        let mut max_defer = Duration::ZERO;
        for session in &snapshot {
            max_defer = max_defer.max(session.max_defer_close_channel_timeout());
            session.cancel().await?;
        }
        tokio::time::sleep(max_defer).await;
        Ok(())
    }

    pub async fn purge(&self) -> Result<()> {
        let vhosts = self.vhosts.read().await;
        for runtime in vhosts.values() {
            runtime.purge().await?;
        }
        Ok(())
    }

    pub async fn nuke(&self) -> Result<()> {
        self.unsubscribe_all().await?;
        let mut vhosts = self.vhosts.write().await;
        for (_, runtime) in vhosts.drain() {
            runtime.close().await.ok();
        }
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.unsubscribe_all().await?;
        let vhosts = self.vhosts.read().await;
        for runtime in vhosts.values() {
            runtime.close().await?;
        }
        Ok(())
    }

    /// unsubscribeAll, then bounce each vhost (close + reconnect).
    pub async fn bounce(&self) -> Result<()> {
        self.unsubscribe_all().await?;
        let mut vhosts = self.vhosts.write().await;
        let names: Vec<String> = vhosts.keys().cloned().collect();
        for name in names {
            if let Some(old) = vhosts.remove(&name) {
                let vhost_config = old.vhost.clone();
                old.close().await.ok();
                let reconnected = VhostRuntime::connect(vhost_config).await?;
                vhosts.insert(name, Arc::new(reconnected));
            }
        }
        Ok(())
    }
}

/// Resolves the overrides and forward-contract headers for one `forward`
/// call. Pure and broker-free so the routing-key priority rule (publication's
/// own `routingKey` beats the original message's) has direct unit coverage.
fn resolve_forward_overrides(
    publication_routing_key: Option<&str>,
    namespace: &str,
    message: &DeliveredMessage,
    mut overrides: PublishOverrides,
) -> PublishOverrides {
    overrides.message_id = overrides.message_id.or_else(|| message.message_id.clone());
    overrides.content_type = overrides.content_type.or_else(|| message.content_type.clone());
    if overrides.routing_key.is_none() && publication_routing_key.is_none() {
        overrides.routing_key = Some(message.routing_key.clone());
    }

    overrides.headers.insert(
        "rascal.originalQueue".to_string(),
        topology::qualify(&message.queue, namespace, None),
    );
    overrides
        .headers
        .insert("rascal.originalRoutingKey".to_string(), message.routing_key.clone());
    overrides.headers.insert(
        "rascal.originalExchange".to_string(),
        topology::qualify(&message.exchange, namespace, None),
    );
    overrides
        .headers
        .insert("rascal.restoreRoutingHeaders".to_string(), "false".to_string());

    overrides
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(routing_key: &str) -> DeliveredMessage {
        DeliveredMessage {
            message_id: Some("msg-1".to_string()),
            content_type: Some("text/plain".to_string()),
            routing_key: routing_key.to_string(),
            exchange: "orig-exchange".to_string(),
            queue: "orig-queue".to_string(),
            payload: b"hello".to_vec(),
        }
    }

    #[test]
    fn forward_keeps_publications_own_routing_key() {
        let resolved = resolve_forward_overrides(
            Some("from-publication"),
            "ns",
            &message("orig-routing-key"),
            PublishOverrides::default(),
        );
        // Left unset here so `publish` falls through to the publication's
        // own `routingKey` instead of the original message's.
        assert_eq!(resolved.routing_key, None);
    }

    #[test]
    fn forward_falls_back_to_original_routing_key_when_publication_has_none() {
        let resolved =
            resolve_forward_overrides(None, "ns", &message("orig-routing-key"), PublishOverrides::default());
        assert_eq!(resolved.routing_key.as_deref(), Some("orig-routing-key"));
    }

    #[test]
    fn forward_respects_an_explicit_override() {
        let overrides = PublishOverrides::routing_key("explicit");
        let resolved = resolve_forward_overrides(Some("from-publication"), "ns", &message("orig-routing-key"), overrides);
        assert_eq!(resolved.routing_key.as_deref(), Some("explicit"));
    }

    #[test]
    fn forward_stamps_qualified_origin_headers() {
        let resolved = resolve_forward_overrides(None, "ns", &message("orig-routing-key"), PublishOverrides::default());
        assert_eq!(resolved.headers["rascal.originalQueue"], "ns:orig-queue");
        assert_eq!(resolved.headers["rascal.originalExchange"], "ns:orig-exchange");
        assert_eq!(resolved.headers["rascal.originalRoutingKey"], "orig-routing-key");
        assert_eq!(resolved.headers["rascal.restoreRoutingHeaders"], "false");
    }

    #[test]
    fn forward_inherits_message_id_and_content_type_when_unset() {
        let resolved =
            resolve_forward_overrides(None, "ns", &message("rk"), PublishOverrides::default());
        assert_eq!(resolved.message_id.as_deref(), Some("msg-1"));
        assert_eq!(resolved.content_type.as_deref(), Some("text/plain"));
    }
}
