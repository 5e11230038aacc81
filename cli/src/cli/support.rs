use anyhow::{Context, Result};
use broker::{Broker, BrokerComponents};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Resolves the topology file path: the `--topology` flag if given,
/// else the process config's `topology_file`.
pub fn topology_path(explicit: Option<String>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(PathBuf::from(path));
    }
    let process_config = common::config::load_config().context("failed to load process config")?;
    Ok(PathBuf::from(process_config.topology_file))
}

/// Loads the topology file and spins up a `Broker` against it. Used by
/// every one-shot subcommand (`publish`, `subscribe`, `status`,
/// `purge`, `nuke`).
pub async fn broker_from(path: &Path) -> Result<Arc<Broker>> {
    let raw = configurator::load_raw_config(path)
        .with_context(|| format!("failed to load topology file {}", path.display()))?;
    Broker::create(raw, BrokerComponents::default())
        .await
        .context("failed to initialize broker")
}
