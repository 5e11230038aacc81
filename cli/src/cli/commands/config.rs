use crate::cli::support::topology_path;
use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use log::info;

#[derive(Debug, Args)]
pub struct Config {
    #[clap(subcommand)]
    command: ConfigCommands,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get the fully resolved topology configuration
    Get {
        /// Output format (json, yaml, toml)
        #[clap(long, default_value = "json")]
        format: String,

        /// Path to the topology file (defaults to the process config's topology_file)
        #[clap(long)]
        topology: Option<String>,
    },
}

impl Config {
    pub async fn run(self) -> Result<()> {
        match self.command {
            ConfigCommands::Get { format, topology } => {
                let path = topology_path(topology)?;
                let raw = configurator::load_raw_config(&path)?;
                let resolved = configurator::configure(raw)?;

                match format.as_str() {
                    "json" => info!("{}", serde_json::to_string_pretty(&resolved)?),
                    "yaml" => info!("{}", serde_yaml::to_string(&resolved)?),
                    "toml" => info!("{}", toml::to_string_pretty(&resolved)?),
                    other => return Err(anyhow!("Invalid format: {other}")),
                }
            }
        }
        Ok(())
    }
}
