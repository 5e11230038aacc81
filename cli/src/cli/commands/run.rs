use crate::cli::support::{broker_from, topology_path};
use anyhow::Result;
use clap::Args;
use log::info;

#[derive(Debug, Args)]
pub struct Run {
    /// Path to the topology file (defaults to the process config's topology_file)
    #[clap(long)]
    topology: Option<String>,
}

impl Run {
    pub async fn run(self) -> Result<()> {
        let path = topology_path(self.topology)?;
        info!("starting herald against topology file {}", path.display());
        let broker = broker_from(&path).await?;

        broker.subscribe_all(None).await?;
        info!("herald is running; press Ctrl-C to stop");

        tokio::signal::ctrl_c().await?;
        info!("shutting down");
        broker.shutdown().await?;
        Ok(())
    }
}
