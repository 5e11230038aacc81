use crate::cli::support::{broker_from, topology_path};
use anyhow::{Context, Result};
use broker::SubscribeOverrides;
use clap::Args;
use futures::StreamExt;
use log::info;

#[derive(Debug, Args)]
pub struct Subscribe {
    /// Name of the subscription to consume from
    name: String,

    /// Path to the topology file (defaults to the process config's topology_file)
    #[clap(long)]
    topology: Option<String>,
}

impl Subscribe {
    pub async fn run(self) -> Result<()> {
        let path = topology_path(self.topology)?;
        let broker = broker_from(&path).await?;
        let session = broker
            .subscribe(&self.name, SubscribeOverrides::default())
            .await?;

        info!("subscribed to {}; press Ctrl-C to stop", self.name);
        let mut consumer = session.consumer().clone();

        loop {
            tokio::select! {
                delivery = consumer.next() => {
                    match delivery {
                        Some(Ok(delivery)) => {
                            let headers = delivery.properties.headers().clone().unwrap_or_default();
                            let body = session.decrypt(&headers, &delivery.data)?;
                            println!("{}", String::from_utf8_lossy(&body));
                            delivery
                                .acker
                                .ack(Default::default())
                                .await
                                .context("failed to ack delivery")?;
                        }
                        Some(Err(err)) => {
                            log::warn!("delivery error: {err}");
                        }
                        None => break,
                    }
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        session.cancel().await?;
        broker.shutdown().await?;
        Ok(())
    }
}
