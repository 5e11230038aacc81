use crate::cli::support::{broker_from, topology_path};
use anyhow::{bail, Result};
use broker::{Payload, PublishOutcome, PublishOverrides};
use clap::Args;
use log::info;

#[derive(Debug, Args)]
pub struct Publish {
    /// Name of the publication to send through
    name: String,

    /// Message body, sent as text
    payload: String,

    /// Path to the topology file (defaults to the process config's topology_file)
    #[clap(long)]
    topology: Option<String>,

    /// Override the routing key
    #[clap(long)]
    routing_key: Option<String>,
}

impl Publish {
    pub async fn run(self) -> Result<()> {
        let path = topology_path(self.topology)?;
        let broker = broker_from(&path).await?;

        let overrides = PublishOverrides {
            routing_key: self.routing_key,
            ..Default::default()
        };
        let outcome = broker
            .publish(&self.name, Payload::Text(self.payload), overrides)
            .await?;

        match outcome {
            PublishOutcome::Success { message_id, duration_ms } => {
                info!("published to {}: message_id={message_id} ({duration_ms}ms)", self.name);
            }
            PublishOutcome::Returned { message_id, reply_code, reply_text } => {
                broker.shutdown().await?;
                bail!(
                    "message {message_id} to publication {} was returned by the broker: {reply_text} ({reply_code})",
                    self.name
                );
            }
        }
        broker.shutdown().await?;
        Ok(())
    }
}
