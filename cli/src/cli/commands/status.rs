use crate::cli::support::{broker_from, topology_path};
use anyhow::{anyhow, Result};
use clap::Args;
use log::info;
use serde::Serialize;

#[derive(Debug, Args)]
pub struct Status {
    /// Output format (json, yaml, text)
    #[clap(long, default_value = "text")]
    format: String,

    /// Path to the topology file (defaults to the process config's topology_file)
    #[clap(long)]
    topology: Option<String>,
}

#[derive(Serialize)]
struct BrokerStatus {
    herald_version: String,
    vhosts: usize,
    publications: usize,
    subscriptions: usize,
    sessions: usize,
}

impl Status {
    pub async fn run(self) -> Result<()> {
        let path = topology_path(self.topology)?;
        let broker = broker_from(&path).await?;
        let stats = broker.stats().await;

        let status = BrokerStatus {
            herald_version: env!("CARGO_PKG_VERSION").to_string(),
            vhosts: stats.vhosts,
            publications: stats.publications,
            subscriptions: stats.subscriptions,
            sessions: stats.sessions,
        };

        match self.format.as_str() {
            "json" => info!("{}", serde_json::to_string_pretty(&status)?),
            "yaml" => info!("{}", serde_yaml::to_string(&status)?),
            "text" => {
                info!("Herald version: {}", status.herald_version);
                info!("Vhosts: {}", status.vhosts);
                info!("Publications: {}", status.publications);
                info!("Subscriptions: {}", status.subscriptions);
                info!("Live sessions: {}", status.sessions);
            }
            other => return Err(anyhow!("Invalid format: {other}")),
        }

        broker.shutdown().await?;
        Ok(())
    }
}
