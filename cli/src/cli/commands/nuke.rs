use crate::cli::support::{broker_from, topology_path};
use anyhow::Result;
use clap::Args;
use log::info;

#[derive(Debug, Args)]
pub struct Nuke {
    /// Path to the topology file (defaults to the process config's topology_file)
    #[clap(long)]
    topology: Option<String>,
}

impl Nuke {
    pub async fn run(self) -> Result<()> {
        let path = topology_path(self.topology)?;
        let broker = broker_from(&path).await?;
        broker.nuke().await?;
        info!("nuked all vhost connections");
        Ok(())
    }
}
